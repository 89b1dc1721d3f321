// src/fetch/mod.rs

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use std::time::Duration;

pub mod index;
pub mod tarball;

pub use index::{fetch_package_version, parse_package_version};
pub use tarball::{download_tarball, unpack_tarball};

/// Blocking HTTP client with a hard timeout on every request.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("journeydata/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("building HTTP client")
}
