use credito_pme_api::config::Config;
use credito_pme_api::handlers::AppState;
use credito_pme_api::openapi::SWAGGER_UI_PATH;
use credito_pme_api::router::build_router;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the application.
///
/// This function initializes the application, including:
/// - Logging and tracing.
/// - Configuration loading.
/// - Dataset warm-up and the company lookup cache.
/// - HTTP routes and middleware (CORS, body limit, trace id, panic recovery).
///
/// It then starts the Axum server.
///
/// # Returns
///
/// * `anyhow::Result<()>` - Ok if the server runs successfully, or an error if initialization fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "credito_pme_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let state = Arc::new(AppState::new(config.clone()));

    // A missing dataset only fails lookup requests; explicit profiles still score.
    match state.scorer.store().get().await {
        Ok(dataset) => tracing::info!("Dataset ready ({} companies)", dataset.len()),
        Err(e) => tracing::warn!(
            "⚠️  Dataset unavailable in {}: {}. Name-only requests will fail until it is present.",
            config.data_dir.display(),
            e
        ),
    }

    let app = build_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("🚀 {} listening on {}", config.app_name, addr);
    tracing::info!("API docs at http://{}{}", addr, SWAGGER_UI_PATH);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
