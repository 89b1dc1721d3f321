use anyhow::{Context, Result};
use journeydata::{
    config::{Config, PACKAGE_NAME},
    fetch, logging, process, publish,
};
use std::time::Instant;
use tempfile::TempDir;
use tracing::{info, warn};

fn main() -> Result<()> {
    // ─── 1) init logging + config ────────────────────────────────────
    logging::init_tracing("info");
    let config = Config::from_env()?;
    let layout = config.layout();
    info!(root = %layout.root().display(), slice = ?config.slice, "startup");
    let start = Instant::now();

    // ─── 2) resolve the current package version ─────────────────────
    let client = fetch::build_client(config.http_timeout)?;
    let version = fetch::fetch_package_version(&client, &config.mirror, PACKAGE_NAME)?;
    info!(version = %version, "resolved {}", PACKAGE_NAME);

    // ─── 3) download + unpack into a scratch dir ─────────────────────
    let scratch = TempDir::new().context("creating temporary directory")?;
    let tarball = fetch::download_tarball(
        &client,
        &config.mirror,
        PACKAGE_NAME,
        &version,
        scratch.path(),
    )?;
    let unpacked = fetch::unpack_tarball(&tarball, scratch.path().join("src"))?;
    let data_dir = unpacked.join(PACKAGE_NAME).join("data");

    let files = process::find_rda_files(&data_dir)?;
    if files.is_empty() {
        warn!(dir = %data_dir.display(), "no R data files in package");
    }
    info!(files = files.len(), "found R data files");

    // ─── 4) decode, derive, write into staging ──────────────────────
    let staging = scratch.path().join("staging");
    let source = format!("{} {}", PACKAGE_NAME, version);
    let metadata = process::build_dataset(&files, &staging, &config.slice, &source)?;

    // ─── 5) publish only after every table was written ──────────────
    publish::publish(&staging, &metadata, &layout)?;

    info!(
        tables = metadata.tables.len(),
        total_bytes = metadata.total_bytes,
        elapsed = ?start.elapsed(),
        "done"
    );
    Ok(())
}
