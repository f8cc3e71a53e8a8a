//! Release note cleaning and multi-release aggregation

use std::sync::LazyLock;

use regex::Regex;
use semver::Version;
use tracing::debug;

use crate::{
    error::UpdateServiceError,
    types::{LatestRelease, ReleaseRecord},
    utils::{next_patch, version_from_tag},
};

/// `* 1a2b3c4 ` at the start of a line, as produced by generated changelogs.
static COMMIT_BULLET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\* (?:[0-9a-fA-F]{7} )+").expect("commit bullet pattern is valid")
});

/// Strip short commit hashes from bulleted lines and trim the body.
/// Cleaning is idempotent.
pub fn clean_notes(body: Option<&str>) -> String {
    let body = body.unwrap_or_default().replace("\r\n", "\n");
    COMMIT_BULLET
        .replace_all(body.trim(), "* ")
        .trim()
        .to_string()
}

/// Whether the client skipped at least one release, i.e. `latest` is newer
/// than the next patch after `current`.
pub fn needs_history(current: &Version, latest: &Version) -> bool {
    next_patch(current).is_none_or(|next| latest > &next)
}

/// Combine the notes of every release in `(current, latest]`, newest first.
///
/// Each entry is `"<version>\n<notes>"` and entries are separated by a blank
/// line. A single matching release is returned without the version header.
/// Any release tag that isn't a semantic version fails the whole call.
pub fn aggregate_notes(
    current: &Version,
    latest: &LatestRelease,
    releases: &[ReleaseRecord],
) -> Result<String, UpdateServiceError> {
    let mut entries: Vec<(Version, String)> = Vec::new();

    for release in releases.iter().filter(|release| !release.draft) {
        let version = version_from_tag(&release.tag_name)?;
        if &version > current && version <= latest.version {
            entries.push((version, clean_notes(release.body.as_deref())));
        }
    }

    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries.reverse();

    debug!(
        "{} releases between {} and {}",
        entries.len(),
        current,
        latest.version
    );

    match entries.len() {
        0 => Ok(latest.notes.clone()),
        1 => Ok(entries.remove(0).1),
        _ => Ok(entries
            .into_iter()
            .map(|(version, notes)| format!("{version}\n{notes}"))
            .collect::<Vec<_>>()
            .join("\n\n")),
    }
}
