//! HTTP API for document classification.
//!
//! Exposes the processing pipeline over a small JSON API:
//! - Text classification without filing
//! - File upload, full pipeline run, and filing under the output tree

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::analytics::AnalyticsLogger;
use crate::config::Settings;
use crate::pipeline::Pipeline;

/// Shared state for the API server.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub analytics: Arc<AnalyticsLogger>,
}

/// Start the API server.
pub async fn serve(settings: &Settings, host: &str, port: u16) -> anyhow::Result<()> {
    let pipeline = Pipeline::from_settings(settings)?;
    let analytics = AnalyticsLogger::open(&settings.analytics_db)?;

    let state = AppState {
        pipeline: Arc::new(pipeline),
        analytics: Arc::new(analytics),
    };
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
