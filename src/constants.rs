// Licensed under the MIT License
// Copyright (c) 2025 Hal <hal.long@outlook.com>

//! # Constants
//!
//! Centralized constants for the Fluxion transport engine.
//! This module eliminates magic numbers and provides a single source of
//! truth for the defaults used across the Chunker, Optimizer, Bandwidth,
//! Retry, and Integrity components.

/// Smallest chunk size the Chunker will ever plan (256 KiB).
pub const MIN_CHUNK: u64 = 256 * 1024;

/// Largest chunk size the Chunker will ever plan (16 MiB).
pub const MAX_CHUNK: u64 = 16 * 1024 * 1024;

/// Starting chunk size before any throughput feedback (1 MiB).
pub const INITIAL_CHUNK: u64 = 1024 * 1024;

/// EMA smoothing factor shared by Chunker and Bandwidth.
pub const EMA_ALPHA: f64 = 0.3;

/// Bandwidth estimator ring buffer capacity.
pub const BANDWIDTH_WINDOW: usize = 30;

/// Optimizer concurrency bounds and default initial value.
pub const OPTIMIZER_MIN_CONCURRENCY: usize = 1;
pub const OPTIMIZER_MAX_CONCURRENCY: usize = 32;
pub const OPTIMIZER_DEFAULT_INITIAL: usize = 4;

/// Minimum interval between Optimizer probe-driven adjustments.
pub const OPTIMIZER_PROBE_INTERVAL_SECS: f64 = 2.0;

/// Optimizer keeps at most this many throughput samples before truncating.
pub const OPTIMIZER_MAX_HISTORY: usize = 100;

/// Samples retained after an overflow truncation.
pub const OPTIMIZER_TRUNCATED_HISTORY: usize = 50;

/// Retry defaults.
pub const RETRY_MAX_RETRIES: u32 = 3;
pub const RETRY_BASE_BACKOFF_SECS: f64 = 1.0;
pub const RETRY_MAX_BACKOFF_SECS: f64 = 30.0;

/// Chunk size used for single-stream body writes and byte streaming.
pub const STREAM_WRITE_CHUNK: usize = 64 * 1024;

/// Block size for streaming SHA-256 computation.
pub const INTEGRITY_BLOCK_SIZE: usize = 256 * 1024;

/// Parallel mode is only selected when the resource is larger than this
/// multiple of the requested chunk size.
pub const PARALLEL_MODE_SIZE_MULTIPLE: u64 = 2;

/// Number of probe retry attempts for transient server statuses.
pub const PROBE_MAX_RETRIES: u32 = 3;

/// Maximum redirects the shared HTTP client will follow.
pub const MAX_REDIRECTS: usize = 10;

/// Certificate expiry warning window for `secure`, in days.
pub const CERT_EXPIRY_WARN_DAYS: i64 = 30;

/// Byte range requested by `bench`'s throughput measurement (first 1 MiB).
pub const BENCH_THROUGHPUT_RANGE_END: u64 = 1024 * 1024 - 1;

#[cfg(test)]
#[allow(clippy::assertions_on_constants)]
mod tests {
    use super::*;

    #[test]
    fn chunk_bounds_are_ordered() {
        assert!(MIN_CHUNK < INITIAL_CHUNK);
        assert!(INITIAL_CHUNK < MAX_CHUNK);
    }

    #[test]
    fn optimizer_bounds_are_ordered() {
        assert!(OPTIMIZER_MIN_CONCURRENCY <= OPTIMIZER_DEFAULT_INITIAL);
        assert!(OPTIMIZER_DEFAULT_INITIAL <= OPTIMIZER_MAX_CONCURRENCY);
        assert!(OPTIMIZER_TRUNCATED_HISTORY < OPTIMIZER_MAX_HISTORY);
    }

    #[test]
    fn retry_backoff_bounds_are_ordered() {
        assert!(RETRY_BASE_BACKOFF_SECS < RETRY_MAX_BACKOFF_SECS);
    }
}
