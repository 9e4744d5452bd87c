//! Credit score formulas.
//!
//! Both formulas are pure: the same record always yields the same
//! assessment, and neither can fail once the record has been normalized.

use crate::models::{FactorBreakdown, RiskBand};
use crate::normalizer::{ActivityRecord, CanonicalRecord, ProfileRecord};

/// Minimum score for approval, in both modes.
pub const APPROVAL_THRESHOLD: i32 = 600;

pub const PROFILE_SCORE_MIN: i32 = 300;
pub const PROFILE_SCORE_MAX: i32 = 900;
pub const ACTIVITY_SCORE_MIN: i32 = 0;
pub const ACTIVITY_SCORE_MAX: i32 = 1000;

const UNKNOWN_RATING_BASE: i32 = 700;
const UNKNOWN_RATING_FRACTION: f64 = 0.18;
/// Debt ratio used when revenue is zero.
const NO_REVENUE_DEBT_RATIO: f64 = 1.5;
const DEBT_PENALTY_CAP: i32 = 250;
/// Payment terms up to this many days carry no penalty.
const PAYMENT_TERM_GRACE_DAYS: u32 = 60;
const NEWS_ADJUSTMENT: i32 = 15;

const POSITIVE_NEWS: &[&str] = &["investimento", "expansão", "oportunidad", "novo produto"];
const NEGATIVE_NEWS: &[&str] = &[
    "inconsist",
    "insatisfa",
    "mudanças clim",
    "cuidado",
    "aumento no custo",
    "legislação",
];

/// (rating, base score, share of annual revenue offered as limit)
const RATINGS: &[(&str, i32, f64)] = &[
    ("A+", 880, 0.45),
    ("A", 850, 0.40),
    ("A-", 820, 0.35),
    ("B+", 780, 0.30),
    ("B", 750, 0.27),
    ("B-", 720, 0.24),
    ("C+", 680, 0.20),
    ("C", 650, 0.17),
    ("C-", 620, 0.14),
    ("D", 580, 0.10),
    ("E", 540, 0.08),
];

/// (folded sector, profile adjustment, activity adjustment)
const SECTORS: &[(&str, i32, i32)] = &[
    ("tecnologia", 20, 40),
    ("saude", 10, 25),
    ("servicos", 0, 15),
    ("comercio", 0, 0),
    ("industria", 0, 10),
    ("agronegocio", 0, 10),
    ("alimentacao", -5, 0),
    ("educacao", -5, 0),
    ("transportes", -10, -10),
    ("turismo", -15, -15),
];

const ACTIVITY_BASE: i32 = 300;
const REVENUE_POINTS_PER_THOUSAND: f64 = 8.0;
const REVENUE_POINTS_CAP: i32 = 200;
const POINTS_PER_MONTH: i32 = 5;
const MONTHS_POINTS_CAP: i32 = 120;
const GOOD_STANDING_POINTS: i32 = 20;
const IN_DEFAULT_POINTS: i32 = -150;
const POINTS_PER_EXTRA_EMPLOYEE: i32 = 4;
const EMPLOYEE_POINTS_CAP: i32 = 40;

/// Outcome of the profile formula.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileAssessment {
    pub score: i32,
    pub approved: bool,
    pub limit: u64,
    pub band: RiskBand,
    pub reasons: Vec<String>,
}

/// Outcome of the activity formula.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityAssessment {
    pub score: i32,
    pub approved: bool,
    pub limit: u64,
    pub breakdown: Vec<FactorBreakdown>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Assessment {
    Profile(ProfileAssessment),
    Activity(ActivityAssessment),
}

pub fn assess(record: &CanonicalRecord) -> Assessment {
    match record {
        CanonicalRecord::Profile(profile) => Assessment::Profile(assess_profile(profile)),
        CanonicalRecord::Activity(activity) => Assessment::Activity(assess_activity(activity)),
    }
}

/// Lower-cases and strips Portuguese diacritics.
pub fn fold_key(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

fn sector_entry(sector: &str) -> Option<&'static (&'static str, i32, i32)> {
    let key = fold_key(sector);
    SECTORS.iter().find(|(name, _, _)| *name == key)
}

fn rating_entry(rating: &str) -> Option<&'static (&'static str, i32, f64)> {
    RATINGS.iter().find(|(name, _, _)| *name == rating)
}

pub fn risk_band(score: i32) -> RiskBand {
    match score {
        s if s >= 800 => RiskBand::VeryLow,
        s if s >= 700 => RiskBand::Low,
        s if s >= 600 => RiskBand::Medium,
        s if s >= 500 => RiskBand::High,
        _ => RiskBand::VeryHigh,
    }
}

/// Debt over revenue, clamped to `[0, 1]`; `1.5` without revenue.
pub fn debt_ratio(annual_revenue: f64, total_debt: f64) -> f64 {
    if annual_revenue > 0.0 {
        (total_debt / annual_revenue).clamp(0.0, 1.0)
    } else {
        NO_REVENUE_DEBT_RATIO
    }
}

fn debt_penalty(ratio: f64) -> i32 {
    ((ratio * 200.0).round() as i32).min(DEBT_PENALTY_CAP)
}

pub fn payment_term_penalty(days: u32) -> i32 {
    (days.saturating_sub(PAYMENT_TERM_GRACE_DAYS) / 2) as i32
}

/// `+15` for good news, `-15` for bad news, `0` for mixed or neutral text.
pub fn news_adjustment(news: &str) -> i32 {
    let text = news.to_lowercase();
    let positive = POSITIVE_NEWS.iter().any(|k| text.contains(k));
    let negative = NEGATIVE_NEWS.iter().any(|k| text.contains(k));

    match (positive, negative) {
        (true, false) => NEWS_ADJUSTMENT,
        (false, true) => -NEWS_ADJUSTMENT,
        _ => 0,
    }
}

pub fn assess_profile(record: &ProfileRecord) -> ProfileAssessment {
    let rating = rating_entry(&record.rating);
    let base = rating.map_or(UNKNOWN_RATING_BASE, |(_, base, _)| *base);
    let fraction = rating.map_or(UNKNOWN_RATING_FRACTION, |(_, _, fraction)| *fraction);

    let ratio = debt_ratio(record.annual_revenue, record.total_debt);
    let term_penalty = payment_term_penalty(record.payment_term_days);
    let sector = sector_entry(&record.sector).map_or(0, |(_, profile, _)| *profile);
    let news = news_adjustment(&record.recent_news);

    let score = (base - debt_penalty(ratio) - term_penalty + sector + news)
        .clamp(PROFILE_SCORE_MIN, PROFILE_SCORE_MAX);

    // 1% less per day beyond the grace period
    let overdue_days = record.payment_term_days.saturating_sub(PAYMENT_TERM_GRACE_DAYS);
    let term_percent = f64::from(100 - overdue_days.min(100));
    let limit =
        (record.annual_revenue * fraction * (1.0 - ratio) * term_percent / 100.0).max(0.0) as u64;

    let mut reasons = Vec::new();
    if record.from_dataset {
        reasons.push("Dados preenchidos a partir do dataset de referência.".to_string());
    }
    reasons.push(debt_reason(record.annual_revenue, record.total_debt).to_string());
    reasons.push(rating_reason(&record.rating));
    if sector > 0 {
        reasons.push(format!("Setor '{}' tradicionalmente resiliente no modelo.", record.sector));
    } else if sector < 0 {
        reasons.push(format!("Setor '{}' com maior volatilidade no modelo.", record.sector));
    }
    if news > 0 {
        reasons.push("Notícia recente positiva.".to_string());
    } else if news < 0 {
        reasons.push("Notícia recente negativa.".to_string());
    }
    if term_penalty > 0 {
        reasons.push(format!(
            "Prazo de pagamento de {} dias aumenta risco de caixa.",
            record.payment_term_days
        ));
    }

    ProfileAssessment {
        score,
        approved: score >= APPROVAL_THRESHOLD,
        limit,
        band: risk_band(score),
        reasons,
    }
}

/// Uses the unclamped ratio so debts above revenue are still reported.
fn debt_reason(annual_revenue: f64, total_debt: f64) -> &'static str {
    if annual_revenue <= 0.0 {
        return "Receita não informada ou zerada: endividamento tratado como elevado.";
    }
    let ratio = total_debt / annual_revenue;
    if ratio <= 0.5 {
        "Endividamento/Receita saudável (até 50%)."
    } else if ratio <= 1.0 {
        "Endividamento moderado (até 100% da receita)."
    } else {
        "Endividamento elevado (acima de 100% da receita)."
    }
}

fn rating_reason(rating: &str) -> String {
    match rating.chars().next() {
        Some('A') => format!("Rating {} favorece aprovação.", rating),
        Some('B') => format!("Rating {} intermediário.", rating),
        _ => format!("Rating {} desfavorável.", rating),
    }
}

pub fn assess_activity(record: &ActivityRecord) -> ActivityAssessment {
    let revenue_points = ((record.monthly_revenue / 1000.0 * REVENUE_POINTS_PER_THOUSAND).floor()
        as i32)
        .min(REVENUE_POINTS_CAP);
    let months_points = (record.months_active.min(MONTHS_POINTS_CAP as u32) as i32
        * POINTS_PER_MONTH)
        .min(MONTHS_POINTS_CAP);
    let default_points = if record.in_default {
        IN_DEFAULT_POINTS
    } else {
        GOOD_STANDING_POINTS
    };
    let extra_employees = record.employees.saturating_sub(1).min(EMPLOYEE_POINTS_CAP as u32) as i32;
    let employee_points = (extra_employees * POINTS_PER_EXTRA_EMPLOYEE).min(EMPLOYEE_POINTS_CAP);
    let sector_points = sector_entry(&record.sector).map_or(0, |(_, _, activity)| *activity);

    let score = (ACTIVITY_BASE
        + revenue_points
        + months_points
        + default_points
        + employee_points
        + sector_points)
        .clamp(ACTIVITY_SCORE_MIN, ACTIVITY_SCORE_MAX);

    let limit = (f64::from(score) * record.monthly_revenue / 1000.0).max(0.0) as u64;

    let breakdown = vec![
        FactorBreakdown {
            fator: "faturamento".to_string(),
            pontos: revenue_points,
            explicacao: format!(
                "Faturamento mensal de R$ {:.2}: {} pontos por mil reais, até {}.",
                record.monthly_revenue, REVENUE_POINTS_PER_THOUSAND, REVENUE_POINTS_CAP
            ),
        },
        FactorBreakdown {
            fator: "tempo_atividade".to_string(),
            pontos: months_points,
            explicacao: format!(
                "{} meses de atividade: {} pontos por mês, até {}.",
                record.months_active, POINTS_PER_MONTH, MONTHS_POINTS_CAP
            ),
        },
        FactorBreakdown {
            fator: "inadimplencia".to_string(),
            pontos: default_points,
            explicacao: if record.in_default {
                "Empresa inadimplente.".to_string()
            } else {
                "Sem registro de inadimplência.".to_string()
            },
        },
        FactorBreakdown {
            fator: "empregados".to_string(),
            pontos: employee_points,
            explicacao: format!(
                "{} empregado(s): {} pontos por empregado além do primeiro, até {}.",
                record.employees, POINTS_PER_EXTRA_EMPLOYEE, EMPLOYEE_POINTS_CAP
            ),
        },
        FactorBreakdown {
            fator: "setor".to_string(),
            pontos: sector_points,
            explicacao: match sector_points {
                0 => format!("Setor '{}' sem ajuste no modelo.", record.sector),
                p if p > 0 => format!("Setor '{}' favorecido no modelo.", record.sector),
                _ => format!("Setor '{}' com maior volatilidade no modelo.", record.sector),
            },
        },
    ];

    ActivityAssessment {
        score,
        approved: score >= APPROVAL_THRESHOLD,
        limit,
        breakdown,
    }
}
