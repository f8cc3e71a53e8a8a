//! Data types and structures for the update service

use semver::Version;
use serde::{Deserialize, Serialize};

/// Tauri updater response format (dynamic server)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UpdateResponse {
    pub version: String,
    pub url: String,
    pub signature: String,
    pub pub_date: Option<String>,
    pub notes: String,
}

/// A release as returned by the GitHub releases API. Only the fields we read.
#[derive(Deserialize, Debug, Clone)]
pub struct ReleaseRecord {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
    pub published_at: Option<String>,
    pub body: Option<String>,
    #[serde(default)]
    pub draft: bool,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
}

/// Query parameters for the update endpoint
#[derive(Deserialize, Debug, Default)]
pub struct UpdateQuery {
    #[serde(rename = "currentVersion", alias = "currentVerson")]
    pub current_version: Option<String>,
    pub target: Option<String>,
}

/// Path parameters for the update endpoint
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UpdateParams {
    pub target: String,
    pub current_version: String,
}

/// Architecture tag used to pick release assets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X64,
    Aarch64,
}

impl Arch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X64 => "x64",
            Arch::Aarch64 => "aarch64",
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The newest published release, reduced to what an update response needs
#[derive(Debug, Clone)]
pub struct LatestRelease {
    pub tag_name: String,
    pub version: Version,
    pub url: String,
    pub signature_url: String,
    pub pub_date: Option<String>,
    /// Cleaned body of this release alone
    pub notes: String,
}
