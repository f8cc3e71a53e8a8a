//! Release host access: the GitHub releases REST API and asset downloads

use std::{future::Future, time::Duration};

use reqwest::header::{ACCEPT, AUTHORIZATION};
use tracing::{debug, instrument};

use crate::{config::UpdateConfig, error::UpdateServiceError, types::ReleaseRecord};

const GITHUB_API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = "be-github-updates";
const PER_PAGE: usize = 100;
const MAX_PAGES: usize = 10;

/// Source of release metadata and signature files.
pub trait ReleaseHost: Send + Sync + 'static {
    /// The most recent published, non-prerelease release.
    fn latest_release(
        &self,
    ) -> impl Future<Output = Result<ReleaseRecord, UpdateServiceError>> + Send;

    /// Every published release, newest first as the host returns them.
    fn list_releases(
        &self,
    ) -> impl Future<Output = Result<Vec<ReleaseRecord>, UpdateServiceError>> + Send;

    /// Download the text of a signature asset.
    fn fetch_signature(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<String, UpdateServiceError>> + Send;
}

fn build_http_client() -> Result<reqwest::Client, UpdateServiceError> {
    reqwest::ClientBuilder::new()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| UpdateServiceError::HttpClient(e.to_string()))
}

pub struct GitHubReleaseHost {
    http: reqwest::Client,
    repo_url: String,
    token: String,
}

impl GitHubReleaseHost {
    pub fn new(config: &UpdateConfig) -> Result<Self, UpdateServiceError> {
        Ok(Self {
            http: build_http_client()?,
            repo_url: config.repo_url(),
            token: config.token.clone(),
        })
    }

    fn api_get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .get(format!("{}{}", self.repo_url, path))
            .header(ACCEPT, "application/vnd.github+json")
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
    }

    async fn api_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, UpdateServiceError> {
        request
            .send()
            .await
            .map_err(|e| UpdateServiceError::Upstream(e.to_string()))?
            .error_for_status()
            .map_err(|e| UpdateServiceError::Upstream(e.to_string()))?
            .json()
            .await
            .map_err(|e| UpdateServiceError::Upstream(e.to_string()))
    }
}

impl ReleaseHost for GitHubReleaseHost {
    #[instrument(skip(self), fields(repo = %self.repo_url))]
    async fn latest_release(&self) -> Result<ReleaseRecord, UpdateServiceError> {
        debug!("Requesting latest release");
        let release: ReleaseRecord = self.api_json(self.api_get("/releases/latest")).await?;
        debug!("Latest release tag: {}", release.tag_name);
        Ok(release)
    }

    #[instrument(skip(self), fields(repo = %self.repo_url))]
    async fn list_releases(&self) -> Result<Vec<ReleaseRecord>, UpdateServiceError> {
        let mut releases = Vec::new();

        for page in 1..=MAX_PAGES {
            debug!("Requesting release page {}", page);
            let batch: Vec<ReleaseRecord> = self
                .api_json(
                    self.api_get("/releases")
                        .query(&[("per_page", PER_PAGE), ("page", page)]),
                )
                .await?;

            let done = batch.len() < PER_PAGE;
            releases.extend(batch.into_iter().filter(|release| !release.draft));
            if done {
                debug!("Fetched {} published releases", releases.len());
                return Ok(releases);
            }
        }

        // A full final page means older releases were left unread
        Err(UpdateServiceError::Upstream(format!(
            "release history exceeds {} pages of {}",
            MAX_PAGES, PER_PAGE
        )))
    }

    #[instrument(skip(self))]
    async fn fetch_signature(&self, url: &str) -> Result<String, UpdateServiceError> {
        let fetch_error = |reason: String| UpdateServiceError::SignatureFetch {
            url: url.to_string(),
            reason,
        };

        let signature = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?
            .error_for_status()
            .map_err(|e| fetch_error(e.to_string()))?
            .text()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        debug!("Fetched signature (length: {})", signature.len());
        Ok(signature)
    }
}
