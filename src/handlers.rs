use crate::config::Config;
use crate::errors::{ApiError, AppError, ErrorEnvelope, Traced};
use crate::middleware::TraceId;
use crate::models::*;
use crate::services::ScoreService;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{Method, StatusCode, Uri},
    Extension, Json,
};
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Normalizes and scores requests; owns the dataset and lookup cache.
    pub scorer: ScoreService,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let scorer = ScoreService::from_config(&config);
        Self { config, scorer }
    }
}

/// GET /
///
/// Welcome message.
#[utoipa::path(
    get,
    path = "/",
    tag = "status",
    responses((status = 200, description = "Service is running", body = WelcomeMessage))
)]
pub async fn root() -> Json<WelcomeMessage> {
    Json(WelcomeMessage {
        mensagem: "API de Crédito PME rodando!".to_string(),
    })
}

/// GET /healthz
#[utoipa::path(
    get,
    path = "/healthz",
    tag = "status",
    responses((status = 200, description = "Service is healthy", body = HealthStatus))
)]
pub async fn healthz() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
    })
}

/// POST /v1/score
///
/// Scores a company either from the profile sent or, when only a name is
/// given, from the reference dataset.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `trace_id` - Id assigned to this request by the trace id middleware.
/// * `payload` - The request body, or the reason it could not be decoded.
///
/// # Returns
///
/// * `Result<Json<ScoreResponse>, ApiError>` - The score or an error envelope.
#[utoipa::path(
    post,
    path = "/v1/score",
    tag = "score",
    request_body = ScoreRequest,
    responses(
        (status = 200, description = "Score computed", body = ScoreResponse),
        (status = 404, description = "Company not found in the dataset", body = ErrorEnvelope),
        (status = 422, description = "Missing, conflicting or invalid fields", body = ErrorEnvelope),
        (status = 500, description = "Internal error", body = ErrorEnvelope)
    )
)]
pub async fn score(
    State(state): State<Arc<AppState>>,
    Extension(trace_id): Extension<TraceId>,
    payload: Result<Json<ScoreRequest>, JsonRejection>,
) -> Result<Json<ScoreResponse>, ApiError> {
    let Json(request) = payload.traced(&trace_id)?;
    tracing::info!("POST /v1/score - request: {:?}", request);

    let response = state.scorer.score(&request).await.traced(&trace_id)?;
    Ok(Json(response))
}

/// POST /v1/score/motivos
///
/// Same computation as `/v1/score`, returning the reasons behind the result.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `trace_id` - Id assigned to this request by the trace id middleware.
/// * `payload` - The request body, or the reason it could not be decoded.
///
/// # Returns
///
/// * `Result<Json<ReasonsResponse>, ApiError>` - The reasons or an error envelope.
#[utoipa::path(
    post,
    path = "/v1/score/motivos",
    tag = "score",
    request_body = ScoreRequest,
    responses(
        (status = 200, description = "Reasons computed", body = ReasonsResponse),
        (status = 404, description = "Company not found in the dataset", body = ErrorEnvelope),
        (status = 422, description = "Missing, conflicting or invalid fields", body = ErrorEnvelope),
        (status = 500, description = "Internal error", body = ErrorEnvelope)
    )
)]
pub async fn score_reasons(
    State(state): State<Arc<AppState>>,
    Extension(trace_id): Extension<TraceId>,
    payload: Result<Json<ScoreRequest>, JsonRejection>,
) -> Result<Json<ReasonsResponse>, ApiError> {
    let Json(request) = payload.traced(&trace_id)?;
    tracing::info!("POST /v1/score/motivos - request: {:?}", request);

    let response = state.scorer.explain(&request).await.traced(&trace_id)?;
    Ok(Json(response))
}

/// Fallback for unknown routes.
pub async fn route_not_found(uri: Uri, trace_id: Option<Extension<TraceId>>) -> ApiError {
    let trace_id = trace_id.map_or_else(TraceId::unknown, |Extension(id)| id);
    ApiError::new(
        AppError::Http {
            status: StatusCode::NOT_FOUND,
            message: format!("Rota não encontrada: {}", uri.path()),
        },
        &trace_id,
    )
}

/// Fallback for known routes called with an unsupported method.
pub async fn method_not_allowed(
    method: Method,
    uri: Uri,
    trace_id: Option<Extension<TraceId>>,
) -> ApiError {
    let trace_id = trace_id.map_or_else(TraceId::unknown, |Extension(id)| id);
    ApiError::new(
        AppError::Http {
            status: StatusCode::METHOD_NOT_ALLOWED,
            message: format!("Método {} não permitido em {}", method, uri.path()),
        },
        &trace_id,
    )
}
