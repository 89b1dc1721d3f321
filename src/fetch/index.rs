// src/fetch/index.rs

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use reqwest::blocking::Client;
use tracing::{debug, info, instrument};
use url::Url;

/// Look up the current version of `package` in the repository's plain-text `PACKAGES` index.
#[instrument(level = "info", skip(client))]
pub fn fetch_package_version(client: &Client, mirror: &str, package: &str) -> Result<String> {
    let url = Url::parse(&format!("{}/PACKAGES", mirror))
        .with_context(|| format!("parsing index URL under {}", mirror))?;
    debug!(%url, "fetching package index");

    let text = client
        .get(url.clone())
        .send()
        .with_context(|| format!("GET {} failed", url))?
        .error_for_status()
        .with_context(|| format!("Non-success status {}", url))?
        .text()
        .with_context(|| format!("Reading text from {}", url))?;

    let version = parse_package_version(&text, package)
        .ok_or_else(|| anyhow!("Unable to determine {} version from {}", package, url))?;
    info!(package, %version, "resolved package version");
    Ok(version)
}

/// Find the `Version:` line that directly follows `Package: <package>`.
pub fn parse_package_version(index: &str, package: &str) -> Option<String> {
    let pattern = format!(r"Package: {}\nVersion: ([^\n]+)\n", regex::escape(package));
    let re = Regex::new(&pattern).ok()?;
    // tolerate CRLF indexes from some mirrors
    let normalized = index.replace("\r\n", "\n");
    re.captures(&normalized)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|v| !v.is_empty())
}
