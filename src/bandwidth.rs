// Licensed under the MIT License
// Copyright (c) 2025 Hal <hal.long@outlook.com>

//! Bandwidth estimation.
//!
//! Tracks transfer speed with EMA smoothing for a responsive "current
//! speed" figure, alongside a cumulative average since the first
//! recorded sample.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::constants::{BANDWIDTH_WINDOW, EMA_ALPHA};
use crate::models::SpeedSample;

pub struct BandwidthEstimator {
    window: VecDeque<SpeedSample>,
    window_size: usize,
    alpha: f64,
    ema_speed: Option<f64>,
    total_bytes: u64,
    start_time: Option<Instant>,
}

impl Default for BandwidthEstimator {
    fn default() -> Self {
        Self::new(BANDWIDTH_WINDOW, EMA_ALPHA)
    }
}

impl BandwidthEstimator {
    pub fn new(window_size: usize, ema_alpha: f64) -> Self {
        Self {
            window: VecDeque::with_capacity(window_size),
            window_size,
            alpha: ema_alpha,
            ema_speed: None,
            total_bytes: 0,
            start_time: None,
        }
    }

    /// Record a completed transfer sample.
    pub fn record(&mut self, bytes_count: u64, elapsed: Duration) {
        let now = Instant::now();
        if self.start_time.is_none() {
            self.start_time = Some(now);
        }

        if self.window.len() == self.window_size {
            self.window.pop_front();
        }
        self.window.push_back(SpeedSample {
            bytes: bytes_count,
            elapsed,
        });
        self.total_bytes += bytes_count;

        let elapsed_secs = elapsed.as_secs_f64().max(0.001);
        let speed = bytes_count as f64 / elapsed_secs;
        self.ema_speed = Some(match self.ema_speed {
            None => speed,
            Some(ema) => self.alpha * speed + (1.0 - self.alpha) * ema,
        });
    }

    /// Smoothed current speed in bytes/sec.
    pub fn current_speed(&self) -> f64 {
        self.ema_speed.unwrap_or(0.0)
    }

    /// Overall average speed in bytes/sec since the first recorded sample.
    pub fn average_speed(&self) -> f64 {
        let Some(start) = self.start_time else {
            return 0.0;
        };
        let elapsed = start.elapsed().as_secs_f64();
        if elapsed <= 0.0 {
            return 0.0;
        }
        self.total_bytes as f64 / elapsed
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Estimate seconds until `remaining_bytes` finishes at the current
    /// speed, or `None` when the speed or remaining bytes are zero.
    pub fn eta_seconds(&self, remaining_bytes: u64) -> Option<f64> {
        let speed = self.current_speed();
        if speed <= 0.0 || remaining_bytes == 0 {
            return None;
        }
        Some(remaining_bytes as f64 / speed)
    }
}

/// Human-readable speed string, e.g. `"4.2 MiB/s"`.
pub fn format_speed(bps: f64) -> String {
    if bps <= 0.0 {
        return "0 B/s".to_string();
    }
    const UNITS: [&str; 4] = ["B/s", "KiB/s", "MiB/s", "GiB/s"];
    let mut val = bps;
    for unit in UNITS {
        if val < 1024.0 {
            return format!("{val:.1} {unit}");
        }
        val /= 1024.0;
    }
    format!("{val:.1} TiB/s")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_accumulate_total_bytes() {
        let mut est = BandwidthEstimator::default();
        est.record(1000, Duration::from_secs(1));
        est.record(2000, Duration::from_secs(1));
        assert_eq!(est.total_bytes(), 3000);
    }

    #[test]
    fn current_speed_is_zero_before_any_sample() {
        let est = BandwidthEstimator::default();
        assert_eq!(est.current_speed(), 0.0);
        assert_eq!(est.eta_seconds(1000), None);
    }

    #[test]
    fn eta_scales_with_remaining_bytes() {
        let mut est = BandwidthEstimator::default();
        est.record(1000, Duration::from_secs(1));
        let eta = est.eta_seconds(2000).unwrap();
        assert!((eta - 2.0).abs() < 0.01);
    }

    #[test]
    fn window_evicts_oldest_sample_past_capacity() {
        let mut est = BandwidthEstimator::new(2, EMA_ALPHA);
        est.record(100, Duration::from_secs(1));
        est.record(200, Duration::from_secs(1));
        est.record(300, Duration::from_secs(1));
        assert_eq!(est.window.len(), 2);
        assert_eq!(est.window.front().unwrap().bytes, 200);
    }

    #[test]
    fn format_speed_picks_appropriate_unit() {
        assert_eq!(format_speed(0.0), "0 B/s");
        assert_eq!(format_speed(512.0), "512.0 B/s");
        assert_eq!(format_speed(2048.0), "2.0 KiB/s");
        assert_eq!(format_speed(5.0 * 1024.0 * 1024.0), "5.0 MiB/s");
    }
}
