use crate::config::AppConfig;
use anyhow::{anyhow, Context, Result};
use axum::Router;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

/// Router serving the generated files; `/` resolves to `index.html`.
pub fn router(config: &AppConfig) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(&config.output.dir))
        .layer(CorsLayer::permissive())
}

/// Serve the output directory of a previous `generate` run.
pub async fn start_server(config: AppConfig) -> Result<()> {
    let index = config.output.dir.join("index.html");
    if !index.exists() {
        return Err(anyhow!(
            "No generated map at {:?}; run `generate` first",
            index
        ));
    }

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    info!(%addr, dir = ?config.output.dir, "Starting preview server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, router(&config)).await?;
    Ok(())
}
