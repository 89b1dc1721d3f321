// src/fetch/tarball.rs

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use reqwest::blocking::Client;
use std::{
    fs::{self, File},
    io::BufReader,
    path::{Path, PathBuf},
    time::Instant,
};
use tar::Archive;
use tracing::{info, instrument};
use url::Url;

/// Download the source archive for `package` at `version` into `dest_dir`.
/// Returns the full path of the saved file.
#[instrument(level = "info", skip(client, dest_dir))]
pub fn download_tarball(
    client: &Client,
    mirror: &str,
    package: &str,
    version: &str,
    dest_dir: impl AsRef<Path>,
) -> Result<PathBuf> {
    let dest_dir = dest_dir.as_ref();
    let filename = format!("{}_{}.tar.gz", package, version);
    let url = Url::parse(&format!("{}/{}", mirror, filename))
        .with_context(|| format!("building archive URL for {}", filename))?;
    let dest_path = dest_dir.join(&filename);

    fs::create_dir_all(dest_dir)
        .with_context(|| format!("creating download directory {:?}", dest_dir))?;

    let start = Instant::now();
    let bytes = client
        .get(url.clone())
        .send()
        .with_context(|| format!("GET {} failed", url))?
        .error_for_status()
        .with_context(|| format!("Non-success status {}", url))?
        .bytes()
        .with_context(|| format!("reading body from {}", url))?;
    fs::write(&dest_path, &bytes).with_context(|| format!("writing {:?}", dest_path))?;

    info!(bytes = bytes.len(), elapsed = ?start.elapsed(), "downloaded {}", filename);
    Ok(dest_path)
}

/// Unpack a `.tar.gz` into `dest_dir`, returning `dest_dir` for chaining.
#[instrument(level = "info", skip(tarball_path, dest_dir), fields(tarball = %tarball_path.as_ref().display()))]
pub fn unpack_tarball(tarball_path: impl AsRef<Path>, dest_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let tarball_path = tarball_path.as_ref();
    let dest_dir = dest_dir.as_ref();

    let file = File::open(tarball_path)
        .with_context(|| format!("Failed to open archive: {:?}", tarball_path))?;
    let mut archive = Archive::new(GzDecoder::new(BufReader::new(file)));
    archive
        .unpack(dest_dir)
        .with_context(|| format!("Failed to unpack {:?} into {:?}", tarball_path, dest_dir))?;

    Ok(dest_dir.to_path_buf())
}
