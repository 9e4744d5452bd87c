//! OpenAPI document, served as JSON and through Swagger UI.

use crate::errors::{ErrorBody, ErrorEnvelope, FieldIssue};
use crate::handlers;
use crate::models::{
    ActivityReasons, ActivityScore, FactorBreakdown, HealthStatus, ProfileReasons, ProfileScore,
    ReasonsResponse, RiskBand, ScoreRequest, ScoreResponse, WelcomeMessage,
};
use utoipa::OpenApi;

pub const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";
pub const SWAGGER_UI_PATH: &str = "/docs";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Crédito PME API",
        description = "Credit score, suggested limit and score reasons for small and medium businesses."
    ),
    paths(
        handlers::root,
        handlers::healthz,
        handlers::score,
        handlers::score_reasons
    ),
    components(schemas(
        ScoreRequest,
        ScoreResponse,
        ProfileScore,
        ActivityScore,
        RiskBand,
        ReasonsResponse,
        ProfileReasons,
        ActivityReasons,
        FactorBreakdown,
        WelcomeMessage,
        HealthStatus,
        ErrorEnvelope,
        ErrorBody,
        FieldIssue
    )),
    tags(
        (name = "status", description = "Liveness endpoints"),
        (name = "score", description = "Credit scoring")
    )
)]
pub struct ApiDoc;
