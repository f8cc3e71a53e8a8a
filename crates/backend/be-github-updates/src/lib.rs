//! GitHub-backed update service
//!
//! A Tauri-compatible dynamic update endpoint. Each request compares the
//! client's version with the latest published GitHub release and, when a
//! newer build exists, answers with the download URL, the signature text and
//! the release notes of every release the client skipped.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::debug;

pub mod analytics;
pub mod config;
pub mod error;
pub mod github;
pub mod handlers;
pub mod notes;
pub mod service;
pub mod types;
pub mod utils;

use github::ReleaseHost;
use service::AppState;

/// Create the axum router
pub fn create_router<H: ReleaseHost>(state: Arc<AppState<H>>) -> Router {
    Router::new()
        .route("/update", get(handlers::check_update_handler::<H>))
        .route(
            "/update/{target}/{current_version}",
            get(handlers::check_update_path_handler::<H>),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Initialize the update service against GitHub and return the router
pub fn init_update_service(config: UpdateConfig) -> Result<Router> {
    debug!(
        "Initializing update service for {}/{}",
        config.owner, config.repo
    );

    let state = Arc::new(AppState::new(config).context("Failed to create application state")?);

    Ok(create_router(state))
}

// Re-export commonly used types
pub use config::UpdateConfig;
pub use error::UpdateServiceError;
pub use github::GitHubReleaseHost;
pub use types::{Arch, ReleaseRecord, UpdateParams, UpdateResponse};
