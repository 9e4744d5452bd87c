//! Turns a [`ScoreRequest`] into the [`CanonicalRecord`] the calculator needs.
//!
//! Resolution order: identifier, dataset lookup (profile shape only), revenue
//! and months aliases, defaults, required-field check.

use crate::dataset::{Dataset, DatasetRow};
use crate::errors::AppError;
use crate::models::{RequestShape, ScoreRequest};
use std::future::Future;

pub const DEFAULT_PAYMENT_TERM_DAYS: u32 = 30;
pub const DEFAULT_SECTOR: &str = "Não informado";
pub const DEFAULT_HEADCOUNT: u32 = 1;

/// Largest accepted gap between two revenue fields describing the same amount.
const REVENUE_TOLERANCE: f64 = 0.01;

const PROFILE_REVENUE_FIELDS: &[&str] = &["receita_anual", "faturamento_anual", "faturamento_mensal"];
const ACTIVITY_REVENUE_FIELDS: &[&str] = &["faturamento_mensal", "faturamento_anual"];

/// Fully resolved profile-shaped input.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRecord {
    pub name: String,
    pub annual_revenue: f64,
    pub total_debt: f64,
    pub payment_term_days: u32,
    pub sector: String,
    /// Upper-cased.
    pub rating: String,
    pub recent_news: String,
    /// At least one field was filled from the dataset.
    pub from_dataset: bool,
}

/// Fully resolved activity-shaped input.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRecord {
    pub cnpj: Option<String>,
    pub company: Option<String>,
    pub monthly_revenue: f64,
    pub months_active: u32,
    pub in_default: bool,
    pub sector: String,
    pub employees: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalRecord {
    Profile(ProfileRecord),
    Activity(ActivityRecord),
}

/// Company lookup used to complete profile-shaped requests.
pub trait CompanyDirectory: Send + Sync {
    fn find_company(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<DatasetRow>, AppError>> + Send;
}

impl CompanyDirectory for Dataset {
    async fn find_company(&self, name: &str) -> Result<Option<DatasetRow>, AppError> {
        Ok(self.find(name).cloned())
    }
}

pub async fn normalize<D>(request: &ScoreRequest, directory: &D) -> Result<CanonicalRecord, AppError>
where
    D: CompanyDirectory,
{
    match request.shape() {
        RequestShape::Profile => normalize_profile(request, directory)
            .await
            .map(CanonicalRecord::Profile),
        RequestShape::Activity => normalize_activity(request).map(CanonicalRecord::Activity),
    }
}

fn text(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn amount(field: &str, value: Option<f64>) -> Result<Option<f64>, AppError> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(AppError::invalid_field(
            field,
            "deve ser um número finito e não negativo",
        )),
        other => Ok(other),
    }
}

fn normalize_rating(rating: &str) -> String {
    rating.trim().to_uppercase()
}

/// Revenue expressed both ways, keeping whichever figure was sent untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Revenue {
    annual: f64,
    monthly: f64,
}

/// Reconciles `receita_anual`, `faturamento_anual` and `faturamento_mensal`.
fn resolve_revenue(request: &ScoreRequest) -> Result<Option<Revenue>, AppError> {
    let receita = amount("receita_anual", request.annual_revenue)?;
    let anual = amount("faturamento_anual", request.annual_billing)?;
    let mensal = amount("faturamento_mensal", request.monthly_billing)?;

    let mut annualized: Vec<(&str, f64)> = Vec::new();
    if let Some(v) = receita {
        annualized.push(("receita_anual", v));
    }
    if let Some(v) = anual {
        annualized.push(("faturamento_anual", v));
    }
    if let Some(v) = mensal {
        annualized.push(("faturamento_mensal", v * 12.0));
    }

    let Some(&(_, reference)) = annualized.first() else {
        return Ok(None);
    };
    if annualized
        .iter()
        .any(|(_, v)| (v - reference).abs() > REVENUE_TOLERANCE)
    {
        let fields: Vec<&str> = annualized.iter().map(|(field, _)| *field).collect();
        return Err(AppError::conflicting_fields(
            &fields,
            "valores de receita/faturamento divergentes",
        ));
    }

    let annual = receita.or(anual).unwrap_or(reference);
    let monthly = mensal.unwrap_or(annual / 12.0);
    Ok(Some(Revenue { annual, monthly }))
}

fn resolve_months(request: &ScoreRequest) -> Result<Option<u32>, AppError> {
    match (request.months_active, request.months_operating) {
        (Some(a), Some(b)) if a != b => Err(AppError::conflicting_fields(
            &["tempo_atividade_meses", "meses_operando"],
            "quantidades de meses divergentes",
        )),
        (a, b) => Ok(a.or(b)),
    }
}

/// Rating assumed when none is sent nor found in the dataset.
pub fn infer_rating(months: Option<u32>, in_default: bool) -> &'static str {
    if in_default {
        return "D";
    }
    match months {
        Some(m) if m >= 60 => "B",
        Some(m) if m >= 24 => "B-",
        Some(m) if m >= 12 => "C",
        Some(_) => "C-",
        None => "C",
    }
}

async fn normalize_profile<D>(request: &ScoreRequest, directory: &D) -> Result<ProfileRecord, AppError>
where
    D: CompanyDirectory,
{
    let name = text(&request.company)
        .or_else(|| text(&request.cnpj))
        .ok_or_else(AppError::missing_identifier)?
        .to_string();

    let mut annual_revenue = resolve_revenue(request)?.map(|revenue| revenue.annual);
    let mut total_debt = amount("divida_total", request.total_debt)?;
    let mut payment_term_days = request.payment_term_days;
    let mut sector = text(&request.sector).map(str::to_string);
    let mut rating = text(&request.rating).map(str::to_string);
    let mut recent_news = text(&request.recent_news).map(str::to_string);
    let months = resolve_months(request)?;

    let core_missing = annual_revenue.is_none() || total_debt.is_none();
    let gaps = core_missing
        || payment_term_days.is_none()
        || sector.is_none()
        || rating.is_none()
        || recent_news.is_none();

    // Named companies are completed from the dataset; a cnpj alone only
    // triggers a lookup when the numeric core is missing.
    let mut from_dataset = false;
    if gaps && (core_missing || text(&request.company).is_some()) {
        let row = match directory.find_company(&name).await {
            Ok(row) => row,
            Err(e) if !core_missing => {
                tracing::warn!("Dataset lookup for '{}' failed, using defaults: {}", name, e);
                None
            }
            Err(e) => return Err(e),
        };

        match row {
            Some(row) => {
                tracing::debug!("Completing request for '{}' with dataset row '{}'", name, row.name);

                fn fill<T>(slot: &mut Option<T>, value: Option<T>, filled: &mut bool) {
                    if slot.is_none() && value.is_some() {
                        *slot = value;
                        *filled = true;
                    }
                }

                fill(&mut annual_revenue, row.annual_revenue, &mut from_dataset);
                fill(&mut total_debt, row.total_debt, &mut from_dataset);
                fill(&mut payment_term_days, row.payment_term_days, &mut from_dataset);
                fill(&mut sector, row.sector, &mut from_dataset);
                fill(&mut rating, row.rating, &mut from_dataset);
                fill(&mut recent_news, row.recent_news, &mut from_dataset);
            }
            None if core_missing => {
                return Err(AppError::NotFound(format!(
                    "Empresa '{}' não encontrada no dataset.",
                    name
                )));
            }
            None => tracing::debug!("'{}' not in dataset, applying defaults", name),
        }
    }

    let rating = rating.map(|r| normalize_rating(&r)).unwrap_or_else(|| {
        let inferred = infer_rating(months, request.in_default.unwrap_or(false));
        tracing::debug!("No rating for '{}', inferred {}", name, inferred);
        inferred.to_string()
    });

    let mut missing: Vec<&[&str]> = Vec::new();
    if annual_revenue.is_none() {
        missing.push(PROFILE_REVENUE_FIELDS);
    }
    if total_debt.is_none() {
        missing.push(&["divida_total"]);
    }
    let (Some(annual_revenue), Some(total_debt)) = (annual_revenue, total_debt) else {
        return Err(AppError::missing_fields(&missing));
    };

    Ok(ProfileRecord {
        name,
        annual_revenue,
        total_debt,
        payment_term_days: payment_term_days.unwrap_or(DEFAULT_PAYMENT_TERM_DAYS),
        sector: sector.unwrap_or_else(|| DEFAULT_SECTOR.to_string()),
        rating,
        recent_news: recent_news.unwrap_or_default(),
        from_dataset,
    })
}

fn normalize_activity(request: &ScoreRequest) -> Result<ActivityRecord, AppError> {
    let cnpj = text(&request.cnpj).map(str::to_string);
    let company = text(&request.company).map(str::to_string);
    if cnpj.is_none() && company.is_none() {
        return Err(AppError::missing_identifier());
    }

    let revenue = resolve_revenue(request)?;
    let months = resolve_months(request)?;

    let Some(revenue) = revenue else {
        return Err(AppError::missing_fields(&[ACTIVITY_REVENUE_FIELDS]));
    };

    Ok(ActivityRecord {
        cnpj,
        company,
        monthly_revenue: revenue.monthly,
        months_active: months.unwrap_or(0),
        in_default: request.in_default.unwrap_or(false),
        sector: text(&request.sector)
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_SECTOR.to_string()),
        employees: request.employees.unwrap_or(DEFAULT_HEADCOUNT),
    })
}
