// Licensed under the MIT License
// Copyright (c) 2025 Hal <hal.long@outlook.com>

//! Parallel chunk scheduler.
//!
//! Plans the whole chunk set up front, then dispatches each chunk under
//! a concurrency-limiting semaphore. The scheduler does not retry a
//! failed chunk itself — that is the caller's `downloader` closure's
//! job — it only collects whatever the closure returns and feeds the
//! successful results back into the chunker, bandwidth estimator, and
//! optimizer.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;

use crate::bandwidth::BandwidthEstimator;
use crate::chunker::AdaptiveChunker;
use crate::models::{ChunkPlan, ChunkResult};
use crate::optimizer::ConnectionOptimizer;

/// Schedules and executes parallel chunk downloads with adaptive control.
pub struct ParallelScheduler {
    total_size: u64,
    offset: u64,
    chunker: AdaptiveChunker,
    optimizer: ConnectionOptimizer,
    bandwidth: BandwidthEstimator,
    completed_bytes: u64,
}

impl ParallelScheduler {
    pub fn new(total_size: u64, offset: u64) -> Self {
        Self {
            total_size,
            offset,
            chunker: AdaptiveChunker::default(),
            optimizer: ConnectionOptimizer::new(4, 1, 32),
            bandwidth: BandwidthEstimator::default(),
            completed_bytes: 0,
        }
    }

    pub fn with_chunker(mut self, chunker: AdaptiveChunker) -> Self {
        self.chunker = chunker;
        self
    }

    pub fn with_optimizer(mut self, optimizer: ConnectionOptimizer) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn completed_bytes(&self) -> u64 {
        self.completed_bytes
    }

    pub fn current_speed(&self) -> f64 {
        self.bandwidth.current_speed()
    }

    /// Run `downloader` for every planned chunk, honoring the
    /// optimizer's suggested concurrency, and return results sorted by
    /// chunk index. `on_progress(bytes_done, total)` fires after every
    /// successful chunk.
    pub async fn execute<D, Fut>(&mut self, downloader: D, mut on_progress: impl FnMut(u64, u64) + Send) -> Vec<ChunkResult>
    where
        D: Fn(ChunkPlan) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ChunkResult> + Send,
    {
        let plans = self.chunker.plan_chunks(self.total_size, self.offset);
        if plans.is_empty() {
            return Vec::new();
        }

        let concurrency = ConnectionOptimizer::suggest_concurrency(Some(self.total_size), 32).max(1);
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let downloader = Arc::new(downloader);

        let mut handles = Vec::with_capacity(plans.len());
        for plan in plans {
            let semaphore = Arc::clone(&semaphore);
            let downloader = Arc::clone(&downloader);
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.expect("semaphore never closed");
                let t0 = Instant::now();
                let result = downloader(plan).await;
                let elapsed = t0.elapsed();
                (result, elapsed)
            }));
        }

        let mut collected = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Ok(pair) = handle.await {
                collected.push(pair);
            }
        }

        let mut ordered = Vec::with_capacity(collected.len());
        for (result, elapsed) in collected {
            if result.is_ok() {
                let bytes_len = result.bytes.as_ref().map(|b| b.len() as u64).unwrap_or(0);
                self.chunker.feedback(bytes_len, elapsed.as_secs_f64());
                self.bandwidth.record(bytes_len, elapsed);
                self.optimizer.report_throughput(self.bandwidth.current_speed());
                self.completed_bytes += bytes_len;
                on_progress(self.completed_bytes, self.total_size);
            }
            ordered.push(result);
        }

        ordered.sort_by_key(|r| r.index);
        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn executes_all_planned_chunks_in_index_order() {
        let mut scheduler = ParallelScheduler::new(3000, 0).with_chunker(AdaptiveChunker::new(1024));
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);

        let results = scheduler
            .execute(
                move |plan: ChunkPlan| {
                    calls_clone.fetch_add(1, Ordering::SeqCst);
                    async move {
                        let size = plan.size() as usize;
                        ChunkResult::ok(plan.index, plan.start, plan.end, Bytes::from(vec![0u8; size]), Duration::from_millis(1))
                    }
                },
                |_, _| {},
            )
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(results.len(), 3);
        for (i, r) in results.iter().enumerate() {
            assert_eq!(r.index, i);
        }
        assert_eq!(scheduler.completed_bytes(), 3000);
    }

    #[tokio::test]
    async fn empty_range_yields_no_chunks() {
        let mut scheduler = ParallelScheduler::new(0, 0);
        let results = scheduler
            .execute(
                |plan: ChunkPlan| async move { ChunkResult::ok(plan.index, plan.start, plan.end, Bytes::new(), Duration::ZERO) },
                |_, _| {},
            )
            .await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn failed_chunk_does_not_advance_completed_bytes() {
        let mut scheduler = ParallelScheduler::new(1024, 0).with_chunker(AdaptiveChunker::new(1024));
        let results = scheduler
            .execute(
                |plan: ChunkPlan| async move { ChunkResult::failed(plan.index, plan.start, plan.end, Duration::from_millis(1), "boom") },
                |_, _| {},
            )
            .await;
        assert_eq!(results.len(), 1);
        assert!(!results[0].is_ok());
        assert_eq!(scheduler.completed_bytes(), 0);
    }
}
