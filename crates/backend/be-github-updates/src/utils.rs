//! Utility functions for parsing and validation

use axum::{extract::Query, http::Uri};
use semver::Version;
use tracing::{debug, instrument, warn};

use crate::{
    error::UpdateServiceError,
    types::{Arch, UpdateParams, UpdateQuery},
};

/// Extract `target` and `currentVersion` from a request URI.
///
/// Named query parameters are preferred. When either is absent the raw query
/// is read positionally instead: split on `=`, the second token (cut at the
/// first `%`) is the target and the third is the version. Older clients send
/// an encoded `&` between the two values, which this recovers.
#[instrument(skip_all, fields(uri = %uri))]
pub fn parse_params(uri: &Uri) -> Result<UpdateParams, UpdateServiceError> {
    let query = Query::<UpdateQuery>::try_from_uri(uri)
        .map(|Query(query)| query)
        .unwrap_or_default();

    let target = query.target.filter(|t| !t.is_empty());
    let current_version = query.current_version.filter(|v| !v.is_empty());

    if let (Some(target), Some(current_version)) = (target, current_version) {
        return Ok(UpdateParams {
            target,
            current_version,
        });
    }

    debug!("Named parameters incomplete, falling back to positional parsing");
    parse_positional_params(&uri.to_string())
}

fn parse_positional_params(url: &str) -> Result<UpdateParams, UpdateServiceError> {
    let query = url
        .split('?')
        .nth(1)
        .ok_or_else(|| UpdateServiceError::ParamParse(format!("no query string in {url}")))?;

    let tokens: Vec<&str> = query.split('=').collect();

    let target = tokens
        .get(1)
        .and_then(|token| token.split('%').next())
        .filter(|t| !t.is_empty());
    let current_version = tokens.get(2).copied().filter(|v| !v.is_empty());

    match (target, current_version) {
        (Some(target), Some(current_version)) => Ok(UpdateParams {
            target: target.to_string(),
            current_version: current_version.to_string(),
        }),
        _ => Err(UpdateServiceError::ParamParse(format!(
            "unrecognised query string {query}"
        ))),
    }
}

/// Map a free-form platform string to an architecture tag.
/// Anything that doesn't mention aarch64 is treated as x64.
pub fn normalize_target(target: &str) -> Arch {
    if target.contains("aarch64") {
        Arch::Aarch64
    } else {
        Arch::X64
    }
}

/// Derive a version from a release tag such as `app-v1.2.3` or `v1.2.3`
/// by dropping everything before the first digit.
pub fn version_from_tag(tag_name: &str) -> Result<Version, UpdateServiceError> {
    let candidate = tag_name.trim_start_matches(|c: char| !c.is_ascii_digit());
    Version::parse(candidate).map_err(|e| {
        warn!(tag = tag_name, error = %e, "Release tag is not a semantic version");
        UpdateServiceError::InvalidTag(tag_name.to_string())
    })
}

/// Parse the version reported by the client. Surrounding whitespace and a
/// leading `v` or `=` are tolerated; anything else must be strict semver.
pub fn parse_current_version(current_version: &str) -> Result<Version, UpdateServiceError> {
    let trimmed = current_version
        .trim()
        .trim_start_matches(['v', '='])
        .trim_start();
    Version::parse(trimmed)
        .map_err(|_| UpdateServiceError::InvalidVersion(current_version.to_string()))
}

/// `current >= latest` under semver precedence.
pub fn is_up_to_date(current: &Version, latest: &Version) -> bool {
    current >= latest
}

/// The next patch release after `version`. A pre-release resolves to its own
/// release version (`1.2.3-beta.1` -> `1.2.3`). `None` when the patch number
/// cannot be incremented.
pub fn next_patch(version: &Version) -> Option<Version> {
    if version.pre.is_empty() {
        let patch = version.patch.checked_add(1)?;
        Some(Version::new(version.major, version.minor, patch))
    } else {
        Some(Version::new(version.major, version.minor, version.patch))
    }
}
