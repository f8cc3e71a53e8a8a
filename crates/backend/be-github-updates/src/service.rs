//! Core update check: fetch, compare, aggregate notes, resolve signature

use semver::Version;
use tracing::{debug, info, instrument};

use crate::{
    analytics,
    config::UpdateConfig,
    error::UpdateServiceError,
    github::{GitHubReleaseHost, ReleaseHost},
    notes::{aggregate_notes, clean_notes, needs_history},
    types::{Arch, LatestRelease, ReleaseAsset, ReleaseRecord, UpdateParams, UpdateResponse},
    utils::{is_up_to_date, normalize_target, parse_current_version, version_from_tag},
};

/// Application state: read-only configuration plus the release host client
pub struct AppState<H = GitHubReleaseHost> {
    pub config: UpdateConfig,
    host: H,
}

impl AppState<GitHubReleaseHost> {
    /// Create state backed by the GitHub API described by `config`
    pub fn new(config: UpdateConfig) -> Result<Self, UpdateServiceError> {
        let host = GitHubReleaseHost::new(&config)?;
        Ok(Self { config, host })
    }
}

impl<H: ReleaseHost> AppState<H> {
    pub fn with_host(config: UpdateConfig, host: H) -> Self {
        Self { config, host }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Returns `None` when the client already runs the latest release.
    #[instrument(skip(self), fields(target = %params.target, current_version = %params.current_version))]
    pub async fn check_for_update(
        &self,
        params: &UpdateParams,
    ) -> Result<Option<UpdateResponse>, UpdateServiceError> {
        let result = self.check(params).await;
        if let Err(e) = &result {
            analytics::track_update_check_failed(&params.target, &params.current_version, e.kind());
        }
        result
    }

    async fn check(
        &self,
        params: &UpdateParams,
    ) -> Result<Option<UpdateResponse>, UpdateServiceError> {
        let current = parse_current_version(&params.current_version)?;
        let arch = normalize_target(&params.target);
        debug!("Normalized target {} to {}", params.target, arch);

        let latest = self.fetch_latest(arch).await?;

        if is_up_to_date(&current, &latest.version) {
            info!(latest = %latest.version, "No update available");
            analytics::track_update_check(
                &params.target,
                arch.as_str(),
                &params.current_version,
                false,
                &latest.version.to_string(),
            );
            return Ok(None);
        }

        let notes = self.release_notes(&current, &latest).await?;
        let signature = self.host.fetch_signature(&latest.signature_url).await?;

        info!(latest = %latest.version, tag = %latest.tag_name, "Returning latest release");
        analytics::track_update_check(
            &params.target,
            arch.as_str(),
            &params.current_version,
            true,
            &latest.version.to_string(),
        );

        Ok(Some(UpdateResponse {
            version: latest.version.to_string(),
            url: latest.url,
            signature,
            pub_date: latest.pub_date,
            notes,
        }))
    }

    /// Fetch the latest release and pick the assets for `arch`
    #[instrument(skip(self))]
    pub async fn fetch_latest(&self, arch: Arch) -> Result<LatestRelease, UpdateServiceError> {
        let record = self.host.latest_release().await?;
        latest_from_record(record, arch, &self.config)
    }

    /// Notes for the update: the latest release's own, or the combined notes
    /// of every release the client skipped.
    #[instrument(skip(self, latest), fields(latest = %latest.version))]
    pub async fn release_notes(
        &self,
        current: &Version,
        latest: &LatestRelease,
    ) -> Result<String, UpdateServiceError> {
        if !needs_history(current, &latest.version) {
            return Ok(latest.notes.clone());
        }

        debug!("Client is more than one release behind, collecting history");
        let releases = self.host.list_releases().await?;
        aggregate_notes(current, latest, &releases)
    }
}

/// Reduce a release record to the version, assets and notes for `arch`.
pub fn latest_from_record(
    record: ReleaseRecord,
    arch: Arch,
    config: &UpdateConfig,
) -> Result<LatestRelease, UpdateServiceError> {
    let version = version_from_tag(&record.tag_name)?;

    let asset_url = |suffix: &str, kind: &'static str| {
        find_asset(&record.assets, suffix, arch)
            .map(|asset| asset.browser_download_url.clone())
            .ok_or_else(|| UpdateServiceError::AssetNotFound {
                kind,
                arch: arch.to_string(),
                tag: record.tag_name.clone(),
            })
    };

    let url = asset_url(&config.archive_suffix, "update")?;
    let signature_url = asset_url(&config.signature_suffix, "signature")?;
    debug!("Selected update asset {} for {}", url, arch);

    Ok(LatestRelease {
        notes: clean_notes(record.body.as_deref()),
        tag_name: record.tag_name,
        version,
        url,
        signature_url,
        pub_date: record.published_at,
    })
}

fn find_asset<'a>(assets: &'a [ReleaseAsset], suffix: &str, arch: Arch) -> Option<&'a ReleaseAsset> {
    assets
        .iter()
        .find(|asset| asset.name.ends_with(suffix) && asset.name.contains(arch.as_str()))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    /// In-memory release host that records how often it is called
    pub(crate) struct FakeHost {
        pub latest: ReleaseRecord,
        pub history: Vec<ReleaseRecord>,
        pub signature: Result<String, String>,
        pub latest_calls: AtomicUsize,
        pub list_calls: AtomicUsize,
        pub signature_urls: Mutex<Vec<String>>,
    }

    impl FakeHost {
        pub(crate) fn new(latest: ReleaseRecord) -> Self {
            Self {
                latest,
                history: Vec::new(),
                signature: Ok("dW50cnVzdGVkIGNvbW1lbnQ=".to_string()),
                latest_calls: AtomicUsize::new(0),
                list_calls: AtomicUsize::new(0),
                signature_urls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn signature_calls(&self) -> usize {
            self.signature_urls.lock().unwrap().len()
        }
    }

    impl ReleaseHost for FakeHost {
        async fn latest_release(&self) -> Result<ReleaseRecord, UpdateServiceError> {
            self.latest_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.latest.clone())
        }

        async fn list_releases(&self) -> Result<Vec<ReleaseRecord>, UpdateServiceError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.history.clone())
        }

        async fn fetch_signature(&self, url: &str) -> Result<String, UpdateServiceError> {
            self.signature_urls.lock().unwrap().push(url.to_string());
            self.signature
                .clone()
                .map_err(|reason| UpdateServiceError::SignatureFetch {
                    url: url.to_string(),
                    reason,
                })
        }
    }

    pub(crate) fn record(tag: &str, body: &str) -> ReleaseRecord {
        let version = tag.trim_start_matches(|c: char| !c.is_ascii_digit());
        let asset = |name: String| ReleaseAsset {
            browser_download_url: format!("https://downloads.example.com/{tag}/{name}"),
            name,
        };
        ReleaseRecord {
            tag_name: tag.to_string(),
            assets: vec![
                asset(format!("App_{version}_x64.app.tar.gz")),
                asset(format!("App_{version}_x64.app.tar.gz.sig")),
                asset(format!("App_{version}_aarch64.app.tar.gz")),
                asset(format!("App_{version}_aarch64.app.tar.gz.sig")),
                asset(format!("App_{version}_x64.dmg")),
            ],
            published_at: Some("2024-05-01T12:00:00Z".to_string()),
            body: Some(body.to_string()),
            draft: false,
        }
    }

    fn config() -> UpdateConfig {
        UpdateConfig::new("acme", "desktop", "ghp_test")
    }

    fn params(target: &str, current_version: &str) -> UpdateParams {
        UpdateParams {
            target: target.to_string(),
            current_version: current_version.to_string(),
        }
    }

    #[test]
    fn test_latest_from_record_selects_arch_assets() {
        let latest =
            latest_from_record(record("app-v1.3.0", "* abcdef1 notes"), Arch::Aarch64, &config())
                .unwrap();

        assert_eq!(latest.version, Version::new(1, 3, 0));
        assert_eq!(
            latest.url,
            "https://downloads.example.com/app-v1.3.0/App_1.3.0_aarch64.app.tar.gz"
        );
        assert_eq!(
            latest.signature_url,
            "https://downloads.example.com/app-v1.3.0/App_1.3.0_aarch64.app.tar.gz.sig"
        );
        assert_eq!(latest.notes, "* notes");
        assert_eq!(latest.pub_date.as_deref(), Some("2024-05-01T12:00:00Z"));
    }

    #[test]
    fn test_latest_from_record_missing_archive() {
        let mut release = record("v1.3.0", "");
        release.assets.retain(|a| !a.name.contains("aarch64"));

        let err = latest_from_record(release, Arch::Aarch64, &config()).unwrap_err();

        assert!(matches!(
            err,
            UpdateServiceError::AssetNotFound { kind: "update", ref arch, .. } if arch == "aarch64"
        ));
    }

    #[test]
    fn test_latest_from_record_missing_signature() {
        let mut release = record("v1.3.0", "");
        release.assets.retain(|a| !a.name.ends_with(".sig"));

        let err = latest_from_record(release, Arch::X64, &config()).unwrap_err();

        assert!(matches!(
            err,
            UpdateServiceError::AssetNotFound {
                kind: "signature",
                ..
            }
        ));
    }

    #[test]
    fn test_latest_from_record_bad_tag() {
        let err = latest_from_record(record("nightly", ""), Arch::X64, &config()).unwrap_err();
        assert!(matches!(err, UpdateServiceError::InvalidTag(_)));
    }

    #[tokio::test]
    async fn test_up_to_date_skips_signature() {
        let state = AppState::with_host(config(), FakeHost::new(record("v1.2.3", "notes")));

        let result = state
            .check_for_update(&params("darwin-aarch64", "1.2.3"))
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(state.host().signature_calls(), 0);
        assert_eq!(state.host().list_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_newer_client_is_up_to_date() {
        let state = AppState::with_host(config(), FakeHost::new(record("v1.2.3", "notes")));

        let result = state
            .check_for_update(&params("linux-x86_64", "1.3.0-beta.1"))
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_one_patch_behind_uses_latest_notes() {
        let mut host = FakeHost::new(record("v1.2.3", "* 1a2b3c4 Fix tray icon"));
        host.history = vec![record("v1.2.3", "ignored"), record("v1.2.2", "older")];
        let state = AppState::with_host(config(), host);

        let update = state
            .check_for_update(&params("darwin-aarch64", "1.2.2"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(update.version, "1.2.3");
        assert_eq!(update.notes, "* Fix tray icon");
        assert_eq!(update.signature, "dW50cnVzdGVkIGNvbW1lbnQ=");
        assert_eq!(
            update.url,
            "https://downloads.example.com/v1.2.3/App_1.2.3_aarch64.app.tar.gz"
        );
        assert_eq!(state.host().list_calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            *state.host().signature_urls.lock().unwrap(),
            vec!["https://downloads.example.com/v1.2.3/App_1.2.3_aarch64.app.tar.gz.sig"]
        );
    }

    #[tokio::test]
    async fn test_several_releases_behind_aggregates_notes() {
        let mut host = FakeHost::new(record("v1.1.0", "Minor release"));
        host.history = vec![
            record("v1.1.0", "Minor release"),
            record("v1.0.2", "* 2b3c4d5 Second fix"),
            record("v1.0.1", "First fix"),
            record("v1.0.0", "Initial"),
        ];
        let state = AppState::with_host(config(), host);

        let update = state
            .check_for_update(&params("windows-x86_64", "1.0.0"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            update.notes,
            "1.1.0\nMinor release\n\n1.0.2\n* Second fix\n\n1.0.1\nFirst fix"
        );
        assert_eq!(state.host().list_calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.host().signature_calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_current_version_fails_before_fetch() {
        let state = AppState::with_host(config(), FakeHost::new(record("v1.2.3", "")));

        let err = state
            .check_for_update(&params("linux", "not-a-version"))
            .await
            .unwrap_err();

        assert!(matches!(err, UpdateServiceError::InvalidVersion(_)));
        assert_eq!(state.host().latest_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_signature_failure_fails_request() {
        let mut host = FakeHost::new(record("v2.0.0", ""));
        host.signature = Err("404 Not Found".to_string());
        let state = AppState::with_host(config(), host);

        let err = state
            .check_for_update(&params("linux", "1.9.9"))
            .await
            .unwrap_err();

        assert!(matches!(err, UpdateServiceError::SignatureFetch { .. }));
    }
}
