use std::{cmp::Ordering, time::Duration};

use {
    reqwest::{Client, header},
    serde::Deserialize,
    tracing::debug,
};

pub const GITHUB_API: &str = "https://api.github.com";
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");
const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateInfo {
    pub available: bool,
    pub latest_version: String,
    pub current_version: String,
    pub download_url: String,
    pub release_notes: String,
}

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    html_url: String,
    #[serde(default)]
    body: Option<String>,
}

/// Numeric components of a version tag, with an optional leading `v`.
/// Each component keeps its leading digits, so `1.2.0-rc1` reads as 1.2.0.
fn parse_version(raw: &str) -> Option<Vec<u64>> {
    let raw = raw.trim();
    let raw = raw.strip_prefix('v').unwrap_or(raw);
    raw.split('.')
        .map(|part| {
            let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().ok()
        })
        .collect()
}

/// Compare two versions; missing trailing components count as zero.
pub fn compare_versions(a: &str, b: &str) -> Option<Ordering> {
    let (a, b) = (parse_version(a)?, parse_version(b)?);
    let len = a.len().max(b.len());
    let at = |v: &[u64], i: usize| v.get(i).copied().unwrap_or(0);
    Some(
        (0..len)
            .map(|i| at(&a, i).cmp(&at(&b, i)))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal),
    )
}

/// Look up the latest GitHub release of `repo` (`owner/name`).
///
/// Any failure (network, status, unparsable tag) yields `None`.
pub async fn check_for_updates(
    http: &Client,
    api_base: &str,
    repo: &str,
    current: &str,
) -> Option<UpdateInfo> {
    let url = format!("{}/repos/{repo}/releases/latest", api_base.trim_end_matches('/'));
    let resp = http
        .get(&url)
        .header(header::USER_AGENT, format!("snaplist/{current}"))
        .header(header::ACCEPT, "application/vnd.github+json")
        .timeout(CHECK_TIMEOUT)
        .send()
        .await
        .map_err(|e| debug!(error = %e, "update check failed"))
        .ok()?;

    if !resp.status().is_success() {
        debug!(status = resp.status().as_u16(), "update check failed");
        return None;
    }
    let release: Release = resp
        .json()
        .await
        .map_err(|e| debug!(error = %e, "unreadable release response"))
        .ok()?;

    let latest = release.tag_name.trim();
    let latest = latest.strip_prefix('v').unwrap_or(latest).to_string();
    let available = compare_versions(&latest, current)? == Ordering::Greater;
    Some(UpdateInfo {
        available,
        latest_version: latest,
        current_version: current.to_string(),
        download_url: release.html_url,
        release_notes: release
            .body
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| "No release notes available".into()),
    })
}

/// Terminal notice for an available update.
pub fn notice(info: &UpdateInfo) -> String {
    let rule = "=".repeat(60);
    let mut notes: String = info.release_notes.chars().take(200).collect();
    if info.release_notes.chars().count() > 200 {
        notes.push_str("...");
    }
    format!(
        "{rule}\nNew version available!\n{rule}\nCurrent version: {}\nLatest version:  {}\n\nRelease notes:\n{notes}\n\nDownload: {}\n{rule}",
        info.current_version, info.latest_version, info.download_url
    )
}
