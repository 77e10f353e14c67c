// Licensed under the MIT License
// Copyright (c) 2025 Hal <hal.long@outlook.com>

//! # Fluxion
//!
//! An adaptive parallel-range download engine: probes a URL's transfer
//! characteristics, picks a strategy (parallel-range, single-stream, or an
//! external protocol), and drives it with adaptive concurrency, retry
//! classification, stealth header assembly, and integrity verification.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use fluxion::{FluxionEngine, FetchRequest};
//! use fluxion::http_client::ClientOptions;
//!
//! #[tokio::main]
//! async fn main() -> fluxion::Result<()> {
//!     let engine = FluxionEngine::new(ClientOptions::default());
//!     let result = engine.fetch(FetchRequest::new("https://example.com/file.zip"), None).await?;
//!     println!("Downloaded {} bytes to {}", result.bytes_downloaded, result.output_path.display());
//!     Ok(())
//! }
//! ```

use std::sync::Once;
static INIT_RUSTLS: Once = Once::new();

/// Install the rustls ring crypto provider. Must run before any `reqwest`
/// client is built when compiled against `rustls-no-provider`.
fn init_rustls_provider() {
    INIT_RUSTLS.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

pub mod bandwidth;
pub mod chunker;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod external;
pub mod http_client;
pub mod integrity;
pub mod logging;
pub mod models;
pub mod optimizer;
pub mod progress;
pub mod retry;
pub mod scheduler;
pub mod secure;
pub mod stealth;

pub use config::{ConfigBuilder, ConfigManager, FluxionConfig};
pub use engine::{FluxionEngine, ProgressCallback};
pub use error::{FluxionError, Result};
pub use models::{
    BenchResult, ChunkPlan, ChunkResult, ChunkStatus, FetchRequest, FetchResult, FluxMode, ProbeResult, Protocol,
    RetryDecision, RetryVerdict, TransferPhase, TransferStats,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::ClientOptions;

    #[test]
    fn engine_can_be_constructed_with_default_options() {
        let _engine = FluxionEngine::new(ClientOptions::default());
    }

    #[test]
    fn fetch_request_carries_url_and_sane_defaults() {
        let request = FetchRequest::new("https://example.com/file.zip");
        assert_eq!(request.url, "https://example.com/file.zip");
        assert!(request.resume);
        assert_eq!(request.max_connections, 8);
    }
}
