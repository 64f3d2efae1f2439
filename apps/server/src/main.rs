//! qnasync HTTP trigger — migrates one Confluence page per request.

mod app;

use std::sync::Arc;

use color_eyre::eyre::Result;
use tower_http::trace::TraceLayer;
use tracing::info;

use app::{AppState, router};
use qnasync_core::Pipeline;
use qnasync_shared::AppConfig;

/// Env var overriding the listen address.
const ENV_BIND_ADDR: &str = "BIND_ADDR";

/// Default listen address.
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let pipeline = Pipeline::from_config(&config)?;

    let state = AppState {
        pipeline: Arc::new(pipeline),
    };
    let app = router(state).layer(TraceLayer::new_for_http());

    let addr = std::env::var(ENV_BIND_ADDR).unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "qnasync server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("qnasync=info,tower_http=info"));

    fmt().with_env_filter(env_filter).with_target(false).init();
}
