use crate::errors;
use crate::handlers::{self, AppState};
use crate::middleware::assign_trace_id;
use crate::openapi::{ApiDoc, OPENAPI_JSON_PATH, SWAGGER_UI_PATH};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Builds the application router.
///
/// Layers, outermost first: request tracing, CORS, trace id, panic
/// recovery, body size limit. The trace id layer sits outside panic recovery
/// so panicking requests still get their `x-trace-id` header. The body limit
/// is enforced by the JSON extractor, so oversized bodies and wrong methods
/// both answer with the error envelope.
pub fn build_router(state: Arc<AppState>) -> Router {
    let max_body_bytes = state.config.max_body_bytes;

    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route(
            "/v1/score",
            post(handlers::score).fallback(handlers::method_not_allowed),
        )
        .route(
            "/v1/score/motivos",
            post(handlers::score_reasons).fallback(handlers::method_not_allowed),
        )
        .merge(SwaggerUi::new(SWAGGER_UI_PATH).url(OPENAPI_JSON_PATH, ApiDoc::openapi()))
        .fallback(handlers::route_not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(assign_trace_id))
                .layer(CatchPanicLayer::custom(errors::panic_response))
                .layer(DefaultBodyLimit::max(max_body_bytes)),
        )
        .with_state(state)
}
