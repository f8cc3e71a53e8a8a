use std::net::SocketAddr;

use axum::{Router, http::StatusCode, routing::get};
use be_github_updates::{UpdateConfig, init_update_service};

/// Configuration for running the update server.
pub struct ServerConfig {
    pub http_addr: SocketAddr,
    pub update: UpdateConfig,
    pub posthog_api_key: Option<String>,
    /// When this receiver gets a value, the server shuts down gracefully.
    pub shutdown: tokio::sync::watch::Receiver<()>,
}

/// The full HTTP surface: update routes plus a health probe.
pub fn build_router(update: UpdateConfig) -> anyhow::Result<Router> {
    let update_router = init_update_service(update)?;

    let health_route = Router::new().route("/health", get(|| async { StatusCode::OK }));

    Ok(update_router.merge(health_route))
}

pub async fn run_server(
    config: ServerConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if let Some(posthog_key) = config.posthog_api_key.as_deref() {
        be_github_updates::analytics::init(posthog_key).await;
    } else {
        tracing::info!("POSTHOG_API_KEY not set, analytics disabled");
    }

    tracing::info!(
        "Serving updates for {}/{}",
        config.update.owner,
        config.update.repo
    );
    let http_router = match build_router(config.update) {
        Ok(router) => router,
        Err(e) => {
            tracing::error!("Failed to initialize update service: {}", e);
            return Err(e.into());
        }
    };

    tracing::info!("Starting HTTP server at {}", config.http_addr);

    let mut http_shutdown = config.shutdown.clone();
    let http_listener = tokio::net::TcpListener::bind(config.http_addr).await?;
    let http_future = axum::serve(http_listener, http_router).with_graceful_shutdown(async move {
        let _ = http_shutdown.changed().await;
        tracing::info!("Shutting down HTTP server...");
    });

    if let Err(e) = http_future.await {
        tracing::error!("HTTP server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
