use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

// ============ Request ============

/// Body of `POST /v1/score` and `POST /v1/score/motivos`.
///
/// Accepts two shapes. The profile shape (`receita_anual`, `divida_total`,
/// `rating`, ...) may be reduced to just `empresa`, in which case the missing
/// fields come from the reference dataset. The activity shape
/// (`faturamento_mensal`, `tempo_atividade_meses`, `empregados`, ...) is always
/// scored from the values sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ScoreRequest {
    /// Company name, as listed in the dataset.
    #[serde(rename = "empresa", skip_serializing_if = "Option::is_none")]
    #[schema(example = "TechNova Soluções")]
    pub company: Option<String>,
    /// Company tax id.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "00.000.000/0001-00")]
    pub cnpj: Option<String>,
    /// Annual revenue (profile shape).
    #[serde(rename = "receita_anual", skip_serializing_if = "Option::is_none")]
    pub annual_revenue: Option<f64>,
    #[serde(rename = "divida_total", skip_serializing_if = "Option::is_none")]
    pub total_debt: Option<f64>,
    /// Average payment term, in days.
    #[serde(rename = "prazo_pagamento_dias", skip_serializing_if = "Option::is_none")]
    pub payment_term_days: Option<u32>,
    #[serde(rename = "setor", skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    /// Credit rating, `A+` .. `E`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
    /// Short summary of recent news about the company.
    #[serde(rename = "noticias_recentes", skip_serializing_if = "Option::is_none")]
    pub recent_news: Option<String>,
    /// Monthly revenue (activity shape).
    #[serde(rename = "faturamento_mensal", skip_serializing_if = "Option::is_none")]
    pub monthly_billing: Option<f64>,
    /// Annual revenue, alternative to `faturamento_mensal`.
    #[serde(rename = "faturamento_anual", skip_serializing_if = "Option::is_none")]
    pub annual_billing: Option<f64>,
    #[serde(rename = "tempo_atividade_meses", skip_serializing_if = "Option::is_none")]
    pub months_active: Option<u32>,
    /// Alternative to `tempo_atividade_meses`.
    #[serde(rename = "meses_operando", skip_serializing_if = "Option::is_none")]
    pub months_operating: Option<u32>,
    #[serde(rename = "inadimplente", skip_serializing_if = "Option::is_none")]
    pub in_default: Option<bool>,
    /// Headcount.
    #[serde(rename = "empregados", skip_serializing_if = "Option::is_none")]
    pub employees: Option<u32>,
}

/// Which of the two scoring formulas a request is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestShape {
    /// Rating/debt based profile, possibly completed from the dataset.
    Profile,
    /// Monthly revenue / headcount / default flag.
    Activity,
}

impl ScoreRequest {
    pub fn shape(&self) -> RequestShape {
        let profile_marker = self.annual_revenue.is_some()
            || self.total_debt.is_some()
            || self.payment_term_days.is_some()
            || self.rating.is_some()
            || self.recent_news.is_some();
        let activity_marker = self.monthly_billing.is_some()
            || self.annual_billing.is_some()
            || self.months_active.is_some()
            || self.months_operating.is_some()
            || self.in_default.is_some()
            || self.employees.is_some();

        if !profile_marker && activity_marker {
            RequestShape::Activity
        } else {
            RequestShape::Profile
        }
    }
}

// ============ Responses ============

/// Risk band derived from a profile score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub enum RiskBand {
    #[serde(rename = "baixíssimo")]
    VeryLow,
    #[serde(rename = "baixo")]
    Low,
    #[serde(rename = "médio")]
    Medium,
    #[serde(rename = "alto")]
    High,
    #[serde(rename = "altíssimo")]
    VeryHigh,
}

impl RiskBand {
    pub fn label(&self) -> &'static str {
        match self {
            RiskBand::VeryLow => "baixíssimo",
            RiskBand::Low => "baixo",
            RiskBand::Medium => "médio",
            RiskBand::High => "alto",
            RiskBand::VeryHigh => "altíssimo",
        }
    }
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// `/v1/score` result for a profile-shaped request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProfileScore {
    pub empresa: String,
    /// 300 ..= 900.
    pub score: i32,
    pub aprovado: bool,
    pub limite_sugerido: u64,
    pub faixa_risco: RiskBand,
}

/// `/v1/score` result for an activity-shaped request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ActivityScore {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cnpj: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empresa: Option<String>,
    /// 0 ..= 1000.
    pub score: i32,
    pub aprovado: bool,
    pub limite_sugerido: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum ScoreResponse {
    Profile(ProfileScore),
    Activity(ActivityScore),
}

/// Contribution of one factor to an activity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FactorBreakdown {
    pub fator: String,
    pub pontos: i32,
    pub explicacao: String,
}

/// `/v1/score/motivos` result for a profile-shaped request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProfileReasons {
    pub empresa: String,
    pub score: i32,
    /// In the order the adjustments were applied.
    pub motivos: Vec<String>,
}

/// `/v1/score/motivos` result for an activity-shaped request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ActivityReasons {
    pub score: i32,
    pub aprovado: bool,
    /// Always five entries: faturamento, tempo_atividade, inadimplencia,
    /// empregados, setor.
    pub breakdown: Vec<FactorBreakdown>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum ReasonsResponse {
    Profile(ProfileReasons),
    Activity(ActivityReasons),
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WelcomeMessage {
    pub mensagem: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthStatus {
    pub status: String,
}
