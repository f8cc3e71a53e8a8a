use crate::error::UpdateServiceError;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_ARCHIVE_SUFFIX: &str = ".tar.gz";
pub const DEFAULT_SIGNATURE_SUFFIX: &str = ".sig";

/// Process-wide settings for the update endpoint.
///
/// Built once at startup and shared read-only by every request.
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    pub owner: String,
    pub repo: String,
    pub token: String,
    pub api_url: String,
    pub archive_suffix: String,
    pub signature_suffix: String,
}

impl UpdateConfig {
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            token: token.into(),
            api_url: DEFAULT_API_URL.to_string(),
            archive_suffix: DEFAULT_ARCHIVE_SUFFIX.to_string(),
            signature_suffix: DEFAULT_SIGNATURE_SUFFIX.to_string(),
        }
    }

    pub fn from_env() -> Result<Self, UpdateServiceError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads every setting through `lookup`, failing on the first missing
    /// required value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, UpdateServiceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(UpdateServiceError::ConfigMissing(key))
        };

        let owner = required("GITHUB_OWNER")?;
        let repo = required("GITHUB_REPO")?;
        let token = required("GITHUB_TOKEN")?;

        let optional = |key: &str, default: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Ok(Self {
            owner,
            repo,
            token,
            api_url: optional("GITHUB_API_URL", DEFAULT_API_URL)
                .trim_end_matches('/')
                .to_string(),
            archive_suffix: optional("UPDATE_ARCHIVE_SUFFIX", DEFAULT_ARCHIVE_SUFFIX),
            signature_suffix: optional("UPDATE_SIGNATURE_SUFFIX", DEFAULT_SIGNATURE_SUFFIX),
        })
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn repo_url(&self) -> String {
        format!("{}/repos/{}/{}", self.api_url, self.owner, self.repo)
    }
}
