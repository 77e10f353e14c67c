// Licensed under the MIT License
// Copyright (c) 2025 Hal <hal.long@outlook.com>

//! Adaptive chunk sizing.
//!
//! Plans byte ranges for a fetch and adapts the chunk size used for
//! *future* plans from per-chunk throughput feedback. An executing plan
//! is never re-chunked.

use tracing::debug;

use crate::constants::{EMA_ALPHA, INITIAL_CHUNK, MAX_CHUNK, MIN_CHUNK};
use crate::models::ChunkPlan;

/// Adapts chunk size from an exponential moving average of observed
/// per-chunk throughput: doubling on improvement, halving otherwise.
#[derive(Debug, Clone)]
pub struct AdaptiveChunker {
    current_size: u64,
    min_chunk: u64,
    max_chunk: u64,
    ema_alpha: f64,
    ema_throughput: Option<f64>,
}

impl Default for AdaptiveChunker {
    fn default() -> Self {
        Self::new(INITIAL_CHUNK)
    }
}

impl AdaptiveChunker {
    pub fn new(initial_chunk_size: u64) -> Self {
        Self {
            current_size: initial_chunk_size,
            min_chunk: MIN_CHUNK,
            max_chunk: MAX_CHUNK,
            ema_alpha: EMA_ALPHA,
            ema_throughput: None,
        }
    }

    pub fn with_bounds(mut self, min_chunk: u64, max_chunk: u64) -> Self {
        self.min_chunk = min_chunk;
        self.max_chunk = max_chunk;
        self
    }

    /// Current chunk size that will be used for the next plan.
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    /// EMA throughput in bytes/sec, or 0.0 before the first feedback.
    pub fn avg_throughput(&self) -> f64 {
        self.ema_throughput.unwrap_or(0.0)
    }

    /// Partition `[offset, total_size)` into chunks of `current_size`
    /// (the last chunk may be shorter). Empty when `total_size == 0` or
    /// `offset >= total_size`.
    pub fn plan_chunks(&self, total_size: u64, offset: u64) -> Vec<ChunkPlan> {
        let mut plans = Vec::new();
        if total_size == 0 || offset >= total_size {
            return plans;
        }

        let mut pos = offset;
        let mut index = 0usize;
        while pos < total_size {
            let end = (pos + self.current_size - 1).min(total_size - 1);
            plans.push(ChunkPlan {
                index,
                start: pos,
                end,
            });
            pos = end + 1;
            index += 1;
        }
        plans
    }

    /// Feed back the outcome of one completed chunk. Compares the
    /// observed throughput against the running EMA: at-or-above the EMA
    /// doubles the chunk size (capped at `max`); below it halves the
    /// chunk size (floored at `min`).
    pub fn feedback(&mut self, bytes_transferred: u64, elapsed_secs: f64) {
        if elapsed_secs <= 0.0 {
            return;
        }
        let throughput = bytes_transferred as f64 / elapsed_secs;

        let prior_ema = self.ema_throughput;
        self.ema_throughput = Some(match prior_ema {
            None => throughput,
            Some(ema) => self.ema_alpha * throughput + (1.0 - self.ema_alpha) * ema,
        });

        let baseline = prior_ema.unwrap_or(throughput);
        if throughput >= baseline {
            self.current_size = (self.current_size * 2).min(self.max_chunk);
        } else {
            self.current_size = (self.current_size / 2).max(self.min_chunk);
        }
        debug!(
            throughput,
            ema = self.ema_throughput,
            new_chunk_size = self.current_size,
            "chunker adapted"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plans_partition_the_whole_range() {
        let chunker = AdaptiveChunker::new(1024);
        let plans = chunker.plan_chunks(3000, 0);
        assert_eq!(plans.len(), 3);
        assert_eq!(plans[0].start, 0);
        assert_eq!(plans[0].end, 1023);
        assert_eq!(plans.last().unwrap().end, 2999);
        for w in plans.windows(2) {
            assert_eq!(w[0].end + 1, w[1].start);
        }
        for (i, p) in plans.iter().enumerate() {
            assert_eq!(p.index, i);
        }
    }

    #[test]
    fn empty_plan_for_zero_size_or_offset_past_end() {
        let chunker = AdaptiveChunker::new(1024);
        assert!(chunker.plan_chunks(0, 0).is_empty());
        assert!(chunker.plan_chunks(100, 100).is_empty());
        assert!(chunker.plan_chunks(100, 200).is_empty());
    }

    #[test]
    fn feedback_doubles_on_improvement_and_halves_on_regression() {
        let mut chunker = AdaptiveChunker::new(1024).with_bounds(256, 8192);
        chunker.feedback(1024, 1.0); // first sample seeds the EMA, baseline == throughput -> doubles
        assert_eq!(chunker.current_size(), 2048);

        chunker.feedback(2048, 4.0); // throughput 512 < ema 1024 -> halves
        assert_eq!(chunker.current_size(), 1024);
    }

    #[test]
    fn feedback_respects_min_and_max_bounds() {
        let mut chunker = AdaptiveChunker::new(8192).with_bounds(1024, 16384);
        for _ in 0..10 {
            chunker.feedback(8192, 1.0);
        }
        assert!(chunker.current_size() <= 16384);

        let mut shrinking = AdaptiveChunker::new(8192).with_bounds(1024, 16384);
        shrinking.feedback(8192, 1.0);
        for _ in 0..10 {
            shrinking.feedback(1, 100.0);
        }
        assert!(shrinking.current_size() >= 1024);
    }

    #[test]
    fn non_positive_elapsed_is_ignored() {
        let mut chunker = AdaptiveChunker::new(1024);
        chunker.feedback(1024, 0.0);
        assert_eq!(chunker.current_size(), 1024);
        assert_eq!(chunker.avg_throughput(), 0.0);
    }
}
