use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Json, Response},
};
use tracing::{debug, instrument};

use crate::{github::ReleaseHost, service::AppState, types::UpdateParams, utils::parse_params};

/// `GET /update?target=..&currentVersion=..`
#[instrument(skip(state))]
pub async fn check_update_handler<H: ReleaseHost>(
    State(state): State<Arc<AppState<H>>>,
    uri: Uri,
) -> Response {
    match parse_params(&uri) {
        Ok(params) => respond(&state, params).await,
        Err(e) => e.into_response(),
    }
}

/// `GET /update/{target}/{current_version}`
#[instrument(skip(state), fields(
    target = %params.target,
    current_version = %params.current_version
))]
pub async fn check_update_path_handler<H: ReleaseHost>(
    State(state): State<Arc<AppState<H>>>,
    Path(params): Path<UpdateParams>,
) -> Response {
    respond(&state, params).await
}

async fn respond<H: ReleaseHost>(state: &AppState<H>, params: UpdateParams) -> Response {
    match state.check_for_update(&params).await {
        Ok(Some(update)) => {
            debug!("Update available: version {}", update.version);
            (StatusCode::OK, Json(update)).into_response()
        }
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}
