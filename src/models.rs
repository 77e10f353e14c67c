// Licensed under the MIT License
// Copyright (c) 2025 Hal <hal.long@outlook.com>

//! Core data model: requests, results, stats, and the transfer phase
//! state machine shared by the Engine and its components.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A closed byte interval `[start, end]` tagged with an index.
///
/// `size = end - start + 1`. A complete set of plans partitions
/// `[offset, total_size)` contiguously and without overlap, with dense,
/// monotonic indices starting from 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub index: usize,
    pub start: u64,
    pub end: u64,
}

impl ChunkPlan {
    pub fn size(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn range_header(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Outcome of downloading a single chunk.
#[derive(Debug, Clone)]
pub struct ChunkResult {
    pub index: usize,
    pub start: u64,
    pub end: u64,
    pub bytes: Option<bytes::Bytes>,
    pub elapsed: Duration,
    pub status: ChunkStatus,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStatus {
    Ok,
    Failed,
}

impl ChunkResult {
    pub fn ok(index: usize, start: u64, end: u64, bytes: bytes::Bytes, elapsed: Duration) -> Self {
        Self {
            index,
            start,
            end,
            bytes: Some(bytes),
            elapsed,
            status: ChunkStatus::Ok,
            error: None,
        }
    }

    pub fn failed(index: usize, start: u64, end: u64, elapsed: Duration, error: impl Into<String>) -> Self {
        Self {
            index,
            start,
            end,
            bytes: None,
            elapsed,
            status: ChunkStatus::Failed,
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ChunkStatus::Ok
    }
}

/// A single bandwidth sample: bytes transferred over a wall-clock
/// interval, held in the estimator's fixed-capacity ring buffer.
#[derive(Debug, Clone, Copy)]
pub struct SpeedSample {
    pub bytes: u64,
    pub elapsed: Duration,
}

/// Live transfer state, mutated only by the Engine and observed by
/// progress sinks. Monotonic non-decreasing in `bytes_done`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferStats {
    pub bytes_done: u64,
    pub bytes_total: Option<u64>,
    pub speed_bps: f64,
    pub eta_secs: Option<f64>,
    pub active_streams: usize,
    pub phase: TransferPhase,
    pub mode: FluxMode,
}

impl TransferStats {
    pub fn new(mode: FluxMode) -> Self {
        Self {
            bytes_done: 0,
            bytes_total: None,
            speed_bps: 0.0,
            eta_secs: None,
            active_streams: 0,
            phase: TransferPhase::Resolving,
            mode,
        }
    }
}

/// The transfer state machine. `Error` is an absorbing terminal
/// reachable from any non-terminal state. TLS is skipped for plaintext
/// schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferPhase {
    Resolving,
    Connecting,
    Tls,
    ProtocolLock,
    Stream,
    Verify,
    Complete,
    Error,
}

/// The engine's selected download strategy for one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FluxMode {
    Smart,
    Parallel,
    Single,
    Stream,
    Mirror,
}

/// Negotiated application protocol, inferred from the probe's reported
/// HTTP version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    Http1,
    Http2,
    Http3,
}

impl Protocol {
    pub fn from_version_str(version: &str) -> Self {
        let v = version.to_lowercase();
        if v.contains("h3") || v.contains('3') {
            Protocol::Http3
        } else if v.contains("h2") || v.contains('2') {
            Protocol::Http2
        } else {
            Protocol::Http1
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Http1 => write!(f, "HTTP/1.1"),
            Protocol::Http2 => write!(f, "HTTP/2"),
            Protocol::Http3 => write!(f, "HTTP/3"),
        }
    }
}

/// Input to `Engine::fetch`. Immutable after construction except for a
/// controlled `resume` downgrade performed by the engine itself.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub output: Option<PathBuf>,
    pub headers: HashMap<String, String>,
    pub cookies: HashMap<String, String>,
    pub referer: Option<String>,
    pub browser_profile: Option<String>,
    pub max_connections: usize,
    pub chunk_size: u64,
    pub resume: bool,
    pub verify_tls: bool,
    pub timeout: Duration,
    pub max_retries: u32,
    pub proxy: Option<String>,
    /// When `false` (default, matching the reference), a single-stream
    /// retry truncates the output file. When `true`, a retry resumes
    /// from the byte offset already written during the current attempt.
    pub retry_preserves_partial: bool,
    /// Expected SHA-256 hex digest; when set, `fetch` returns a Security
    /// error if the downloaded file's digest does not match.
    pub expected_sha256: Option<String>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            output: None,
            headers: HashMap::new(),
            cookies: HashMap::new(),
            referer: None,
            browser_profile: None,
            max_connections: 8,
            chunk_size: crate::constants::INITIAL_CHUNK,
            resume: true,
            verify_tls: true,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            proxy: None,
            retry_preserves_partial: false,
            expected_sha256: None,
        }
    }
}

/// Discovered characteristics of a URL, produced by `Engine::probe`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub url: String,
    pub resolved_ip: Option<String>,
    pub tls_version: Option<String>,
    pub cipher: Option<String>,
    pub cert_issuer: Option<String>,
    pub cert_expiry: Option<String>,
    pub http_version: String,
    pub server: Option<String>,
    pub supports_range: bool,
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
    pub latency_ms: f64,
    pub headers: HashMap<String, String>,
}

/// Result of `Engine::bench`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BenchResult {
    pub url: String,
    pub latency_min_ms: f64,
    pub latency_max_ms: f64,
    pub latency_avg_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub jitter_ms: f64,
    pub throughput_mbps: f64,
    pub stability_score: f64,
    pub requests_completed: usize,
    pub requests_failed: usize,
}

/// Terminal result of `Engine::fetch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResult {
    pub url: String,
    pub output_path: PathBuf,
    pub bytes_downloaded: u64,
    pub elapsed_secs: f64,
    pub speed_bps: f64,
    pub protocol: Protocol,
    pub sha256: String,
    pub resumed: bool,
}

/// Verdict returned by the Retry classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryVerdict {
    RetryImmediate,
    RetryBackoff,
    RetryAlternate,
    Fatal,
}

#[derive(Debug, Clone)]
pub struct RetryDecision {
    pub verdict: RetryVerdict,
    pub delay_secs: f64,
    pub reason: String,
}

impl RetryDecision {
    pub fn fatal(reason: impl Into<String>) -> Self {
        Self {
            verdict: RetryVerdict::Fatal,
            delay_secs: 0.0,
            reason: reason.into(),
        }
    }

    pub fn backoff(delay_secs: f64, reason: impl Into<String>) -> Self {
        Self {
            verdict: RetryVerdict::RetryBackoff,
            delay_secs,
            reason: reason.into(),
        }
    }

    pub fn immediate(delay_secs: f64, reason: impl Into<String>) -> Self {
        Self {
            verdict: RetryVerdict::RetryImmediate,
            delay_secs,
            reason: reason.into(),
        }
    }
}

/// Metadata describing an external (non-HTTP) downloader plugin.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginMeta {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub protocols: Vec<String>,
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub entry_point: String,
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_plan_size_is_inclusive() {
        let plan = ChunkPlan {
            index: 0,
            start: 0,
            end: 99,
        };
        assert_eq!(plan.size(), 100);
        assert_eq!(plan.range_header(), "bytes=0-99");
    }

    #[test]
    fn protocol_detection_matches_version_hints() {
        assert_eq!(Protocol::from_version_str("HTTP/2"), Protocol::Http2);
        assert_eq!(Protocol::from_version_str("h3"), Protocol::Http3);
        assert_eq!(Protocol::from_version_str("HTTP/1.1"), Protocol::Http1);
    }

    #[test]
    fn chunk_result_failed_has_no_bytes() {
        let result = ChunkResult::failed(0, 0, 99, Duration::from_millis(5), "timeout");
        assert!(!result.is_ok());
        assert!(result.bytes.is_none());
        assert_eq!(result.error.as_deref(), Some("timeout"));
    }
}
