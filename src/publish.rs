// src/publish.rs

use crate::config::DataLayout;
use crate::metadata::DatasetMetadata;
use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, instrument};

/// Move staged Parquet files into `data/parquet`, write `data/metadata.json`
/// and rebuild the `public/data` mirror from scratch.
///
/// Each target directory is assembled next to itself and renamed into place,
/// so a failure part way leaves the previous contents intact.
#[instrument(level = "info", skip_all, fields(root = %layout.root().display()))]
pub fn publish(staging_dir: &Path, metadata: &DatasetMetadata, layout: &DataLayout) -> Result<()> {
    let parquet_dir = layout.parquet_dir();
    let parquet_next = fresh_sibling(&parquet_dir, "new")?;
    let copied = copy_parquet_files(staging_dir, &parquet_next)?;
    let metadata_path = layout.metadata_path();
    let metadata_next = sibling(&metadata_path, "new");
    metadata.save(&metadata_next)?;

    swap_into_place(&parquet_next, &parquet_dir)?;
    fs::rename(&metadata_next, &metadata_path)
        .with_context(|| format!("renaming {:?} to {:?}", metadata_next, metadata_path))?;
    info!(tables = copied, path = %parquet_dir.display(), "published data");

    let public_dir = layout.public_dir();
    let public_next = fresh_sibling(&public_dir, "new")?;
    metadata.save(public_next.join("metadata.json"))?;
    copy_parquet_files(&parquet_dir, &public_next.join("parquet"))?;
    swap_into_place(&public_next, &public_dir)?;
    info!(path = %public_dir.display(), "refreshed public mirror");
    Ok(())
}

/// `path` with `.suffix` appended to its last component.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// Empty sibling directory, clearing any leftover from an interrupted run.
fn fresh_sibling(dir: &Path, suffix: &str) -> Result<PathBuf> {
    let next = sibling(dir, suffix);
    if next.exists() {
        fs::remove_dir_all(&next).with_context(|| format!("removing {:?}", next))?;
    }
    fs::create_dir_all(&next).with_context(|| format!("creating directory {:?}", next))?;
    Ok(next)
}

/// Replace `target` with the fully built `next` directory.
fn swap_into_place(next: &Path, target: &Path) -> Result<()> {
    let old = sibling(target, "old");
    if old.exists() {
        fs::remove_dir_all(&old).with_context(|| format!("removing {:?}", old))?;
    }
    if target.exists() {
        fs::rename(target, &old).with_context(|| format!("renaming {:?} to {:?}", target, old))?;
    }
    fs::rename(next, target).with_context(|| format!("renaming {:?} to {:?}", next, target))?;
    if old.exists() {
        fs::remove_dir_all(&old).with_context(|| format!("removing {:?}", old))?;
    }
    Ok(())
}

/// Copy every `*.parquet` in `from` into `to`. Returns the number copied.
fn copy_parquet_files(from: &Path, to: &Path) -> Result<usize> {
    fs::create_dir_all(to).with_context(|| format!("creating directory {:?}", to))?;
    let mut copied = 0;
    for entry in fs::read_dir(from).with_context(|| format!("listing {:?}", from))? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("parquet") {
            continue;
        }
        let Some(name) = path.file_name() else {
            continue;
        };
        fs::copy(&path, to.join(name))
            .with_context(|| format!("copying {:?} to {:?}", path, to))?;
        copied += 1;
    }
    Ok(copied)
}
