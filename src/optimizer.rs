// Licensed under the MIT License
// Copyright (c) 2025 Hal <hal.long@outlook.com>

//! Adaptive connection concurrency.
//!
//! Seeds an initial concurrency from the resource size, then nudges it
//! up or down from a windowed comparison of recent throughput samples,
//! gated by a minimum probe interval. A throttle report halves
//! concurrency immediately and suppresses the next probe adjustment.

use std::time::Instant;

use tracing::debug;

use crate::constants::{
    OPTIMIZER_MAX_HISTORY, OPTIMIZER_MIN_CONCURRENCY, OPTIMIZER_PROBE_INTERVAL_SECS, OPTIMIZER_TRUNCATED_HISTORY,
};

struct Sample {
    throughput: f64,
}

/// Decides active download concurrency and reacts to throttling.
pub struct ConnectionOptimizer {
    concurrency: usize,
    minimum: usize,
    maximum: usize,
    probe_interval_secs: f64,
    history: Vec<Sample>,
    last_probe: Instant,
    throttle_count: u32,
}

impl ConnectionOptimizer {
    pub fn new(initial: usize, minimum: usize, maximum: usize) -> Self {
        Self {
            concurrency: initial.clamp(minimum, maximum),
            minimum,
            maximum,
            probe_interval_secs: OPTIMIZER_PROBE_INTERVAL_SECS,
            history: Vec::new(),
            last_probe: Instant::now(),
            throttle_count: 0,
        }
    }

    pub fn with_probe_interval_secs(mut self, secs: f64) -> Self {
        self.probe_interval_secs = secs;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Seed an initial concurrency from the resource's size. Unknown
    /// size falls back to the configured minimum.
    pub fn suggest_concurrency(content_length: Option<u64>, maximum: usize) -> usize {
        let max = maximum.max(OPTIMIZER_MIN_CONCURRENCY);
        match content_length {
            None => OPTIMIZER_MIN_CONCURRENCY,
            Some(len) if len < 1024 * 1024 => 1,
            Some(len) if len < 10 * 1024 * 1024 => 4.min(max),
            Some(len) if len < 100 * 1024 * 1024 => 8.min(max),
            Some(_) => 16.min(max),
        }
    }

    /// Report observed throughput (bytes/sec) for the current
    /// concurrency level; may trigger an adjustment if the probe
    /// interval has elapsed.
    pub fn report_throughput(&mut self, throughput_bps: f64) {
        self.history.push(Sample {
            throughput: throughput_bps,
        });
        if self.history.len() > OPTIMIZER_MAX_HISTORY {
            let start = self.history.len() - OPTIMIZER_TRUNCATED_HISTORY;
            self.history.drain(0..start);
        }

        let now = Instant::now();
        if now.duration_since(self.last_probe).as_secs_f64() >= self.probe_interval_secs {
            self.adapt();
            self.last_probe = now;
        }
    }

    /// Report that the server throttled a request: halve concurrency
    /// immediately and suppress the next probe-driven adjustment.
    pub fn report_throttle(&mut self) {
        self.throttle_count += 1;
        self.concurrency = (self.concurrency / 2).max(self.minimum);
        debug!(concurrency = self.concurrency, "optimizer throttled, halving concurrency");
    }

    fn adapt(&mut self) {
        let n = self.history.len();
        if n < 8 {
            return;
        }
        if self.throttle_count > 0 {
            self.throttle_count -= 1;
            return;
        }

        let recent = &self.history[n - 4..];
        let older = &self.history[n - 8..n - 4];

        let avg = |s: &[Sample]| s.iter().map(|x| x.throughput).sum::<f64>() / s.len() as f64;
        let avg_recent = avg(recent);
        let avg_older = avg(older);
        let improvement = (avg_recent - avg_older) / avg_older.max(1.0);

        if improvement > 0.05 {
            self.concurrency = (self.concurrency + 1).min(self.maximum);
            debug!(concurrency = self.concurrency, improvement, "optimizer increasing concurrency");
        } else if improvement < -0.10 {
            self.concurrency = (self.concurrency.saturating_sub(1)).max(self.minimum);
            debug!(concurrency = self.concurrency, improvement, "optimizer decreasing concurrency");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggest_concurrency_buckets_by_size() {
        assert_eq!(ConnectionOptimizer::suggest_concurrency(None, 32), 1);
        assert_eq!(ConnectionOptimizer::suggest_concurrency(Some(500_000), 32), 1);
        assert_eq!(ConnectionOptimizer::suggest_concurrency(Some(5_000_000), 32), 4);
        assert_eq!(ConnectionOptimizer::suggest_concurrency(Some(50_000_000), 32), 8);
        assert_eq!(ConnectionOptimizer::suggest_concurrency(Some(500_000_000), 32), 16);
    }

    #[test]
    fn suggest_concurrency_respects_maximum() {
        assert_eq!(ConnectionOptimizer::suggest_concurrency(Some(500_000_000), 4), 4);
    }

    #[test]
    fn throttle_halves_immediately() {
        let mut opt = ConnectionOptimizer::new(8, 1, 32);
        opt.report_throttle();
        assert_eq!(opt.concurrency(), 4);
    }

    #[test]
    fn probe_requires_four_samples_before_adapting() {
        let mut opt = ConnectionOptimizer::new(8, 1, 32).with_probe_interval_secs(0.0);
        opt.report_throughput(100.0);
        opt.report_throughput(100.0);
        opt.report_throughput(100.0);
        assert_eq!(opt.concurrency(), 8);
    }

    #[test]
    fn improvement_increases_concurrency() {
        let mut opt = ConnectionOptimizer::new(8, 1, 32).with_probe_interval_secs(0.0);
        for _ in 0..4 {
            opt.report_throughput(100.0);
        }
        for _ in 0..4 {
            opt.report_throughput(200.0);
        }
        assert_eq!(opt.concurrency(), 9);
    }

    #[test]
    fn regression_decreases_concurrency() {
        let mut opt = ConnectionOptimizer::new(8, 1, 32).with_probe_interval_secs(0.0);
        for _ in 0..4 {
            opt.report_throughput(200.0);
        }
        for _ in 0..4 {
            opt.report_throughput(100.0);
        }
        assert_eq!(opt.concurrency(), 7);
    }

    #[test]
    fn throttle_suppresses_next_adjustment() {
        let mut opt = ConnectionOptimizer::new(8, 1, 32).with_probe_interval_secs(0.0);
        opt.report_throttle();
        assert_eq!(opt.concurrency(), 4);
        for _ in 0..4 {
            opt.report_throughput(100.0);
        }
        for _ in 0..4 {
            opt.report_throughput(200.0);
        }
        // The first post-throttle probe is suppressed.
        assert_eq!(opt.concurrency(), 4);
    }
}
