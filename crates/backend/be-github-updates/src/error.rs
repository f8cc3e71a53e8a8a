use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

#[derive(Debug, thiserror::Error)]
pub enum UpdateServiceError {
    #[error("{0} is not set")]
    ConfigMissing(&'static str),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("Error parsing params: {0}")]
    ParamParse(String),

    #[error("Invalid current version: {0}")]
    InvalidVersion(String),

    #[error("Error parsing version from tag name {0}")]
    InvalidTag(String),

    #[error("Could not find {kind} asset for {arch} in release {tag}")]
    AssetNotFound {
        kind: &'static str,
        arch: String,
        tag: String,
    },

    #[error("Failed to fetch signature from {url}: {reason}")]
    SignatureFetch { url: String, reason: String },

    #[error("Release host request failed: {0}")]
    Upstream(String),
}

impl UpdateServiceError {
    /// Short machine-readable name used for analytics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            UpdateServiceError::ConfigMissing(_) => "config_missing",
            UpdateServiceError::HttpClient(_) => "http_client",
            UpdateServiceError::ParamParse(_) => "param_parse",
            UpdateServiceError::InvalidVersion(_) => "invalid_version",
            UpdateServiceError::InvalidTag(_) => "invalid_tag",
            UpdateServiceError::AssetNotFound { .. } => "asset_not_found",
            UpdateServiceError::SignatureFetch { .. } => "signature_fetch",
            UpdateServiceError::Upstream(_) => "upstream",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            UpdateServiceError::ParamParse(_) | UpdateServiceError::InvalidVersion(_) => {
                StatusCode::BAD_REQUEST
            }
            UpdateServiceError::SignatureFetch { .. } | UpdateServiceError::Upstream(_) => {
                StatusCode::BAD_GATEWAY
            }
            UpdateServiceError::ConfigMissing(_)
            | UpdateServiceError::HttpClient(_)
            | UpdateServiceError::InvalidTag(_)
            | UpdateServiceError::AssetNotFound { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Failures are reported by status code only; the body is always empty.
impl IntoResponse for UpdateServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_client_error() {
            warn!(%status, kind = self.kind(), error = %self, "Rejected update request");
        } else {
            error!(%status, kind = self.kind(), error = %self, "Update check failed");
        }
        status.into_response()
    }
}
