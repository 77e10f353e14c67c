// Licensed under the MIT License
// Copyright (c) 2025 Hal <hal.long@outlook.com>

//! Pluggable interface for non-HTTP downloaders (FTP, SFTP, SCP, ...).
//!
//! This crate bundles no protocol handler of its own; [`dispatch_external`]
//! exists so the Engine has a single, typed seam to route to one when a
//! plugin registers support for a scheme.

use std::path::Path;

use async_trait::async_trait;

use crate::error::{FluxionError, Result};

/// Metadata describing an external downloader plugin.
#[derive(Debug, Clone)]
pub struct ExternalDownloaderMeta {
    pub name: String,
    pub version: String,
    pub supported_schemes: Vec<String>,
}

/// A non-HTTP downloader, implemented outside this crate and registered
/// by scheme.
#[async_trait]
pub trait ExternalDownloader: Send + Sync {
    fn meta(&self) -> ExternalDownloaderMeta;

    async fn download(&self, url: &str, output_path: &Path) -> Result<u64>;

    async fn stream(&self, _url: &str) -> Result<reqwest::Response> {
        Err(FluxionError::protocol("streaming is not supported by this downloader"))
    }
}

/// Route a scheme to its external downloader, if one is registered.
/// No downloaders are bundled with this crate, so every recognized
/// non-HTTP scheme currently returns a Protocol error naming the gap.
pub fn dispatch_external(scheme: &str) -> Result<()> {
    match scheme {
        "ftp" | "sftp" | "scp" => Err(FluxionError::protocol(format!(
            "No bundled downloader for scheme {scheme:?}"
        ))
        .with_suggestion("Register an ExternalDownloader plugin for this scheme.")),
        other => Err(FluxionError::protocol(format!("Unsupported scheme: {other:?}"))),
    }
}
