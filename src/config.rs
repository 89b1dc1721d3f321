// src/config.rs

use anyhow::{Context, Result};
use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_CRAN_MIRROR: &str = "https://cran.r-project.org/src/contrib";
pub const PACKAGE_NAME: &str = "completejourney";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;

/// Optional truncation of the transactions table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SliceOptions {
    /// Keep only the first N rows.
    pub rows: Option<usize>,
    /// Keep only rows with `week >= max(week) - N`.
    pub weeks: Option<u32>,
}

/// Runtime settings for the extractor, read from `CJ_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub slice: SliceOptions,
    pub root: PathBuf,
    pub mirror: String,
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let slice = SliceOptions {
            rows: parse_limit(&lookup, "CJ_SLICE_ROWS")?,
            weeks: parse_limit(&lookup, "CJ_SLICE_WEEKS")?,
        };

        let root = resolve_root(&lookup)?;

        let mirror = non_empty(&lookup, "CJ_CRAN_MIRROR")
            .unwrap_or_else(|| DEFAULT_CRAN_MIRROR.to_string())
            .trim_end_matches('/')
            .to_string();

        let http_timeout = match non_empty(&lookup, "CJ_HTTP_TIMEOUT") {
            Some(s) => Duration::from_secs(
                s.trim()
                    .parse()
                    .with_context(|| format!("CJ_HTTP_TIMEOUT must be whole seconds, got {:?}", s))?,
            ),
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        Ok(Self {
            slice,
            root,
            mirror,
            http_timeout,
        })
    }

    pub fn layout(&self) -> DataLayout {
        DataLayout::new(&self.root)
    }
}

/// `CJ_ROOT` if set, else the working directory.
fn resolve_root<F>(lookup: &F) -> Result<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup, "CJ_ROOT") {
        Some(r) => Ok(PathBuf::from(r)),
        None => env::current_dir().context("resolving current directory"),
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.trim().is_empty())
}

/// Unset, empty and zero all mean "no limit".
fn parse_limit<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + Default + PartialEq,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let Some(raw) = non_empty(lookup, key) else {
        return Ok(None);
    };
    let value: T = raw
        .trim()
        .parse()
        .with_context(|| format!("{} must be a non-negative integer, got {:?}", key, raw))?;
    Ok((value != T::default()).then_some(value))
}

/// On-disk layout shared by the extractor and the validator.
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Layout rooted at `CJ_ROOT`, ignoring every other setting.
    pub fn from_env() -> Result<Self> {
        resolve_root(&|key: &str| env::var(key).ok()).map(Self::new)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn parquet_dir(&self) -> PathBuf {
        self.data_dir().join("parquet")
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.data_dir().join("metadata.json")
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.parquet_dir().join(format!("{}.parquet", table))
    }

    pub fn public_dir(&self) -> PathBuf {
        self.root.join("public").join("data")
    }

    pub fn public_parquet_dir(&self) -> PathBuf {
        self.public_dir().join("parquet")
    }
}
