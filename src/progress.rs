// Licensed under the MIT License
// Copyright (c) 2025 Hal <hal.long@outlook.com>

//! CLI progress rendering, driven by [`crate::models::TransferStats`].

use indicatif::{ProgressBar, ProgressStyle};

use crate::models::{TransferPhase, TransferStats};

/// Renders an `indicatif` bar from the engine's live transfer state.
///
/// Created lazily on the first callback that knows the total size, so a
/// resource with an unknown length falls back to a spinner instead of a
/// bar stuck at an indeterminate percentage.
pub struct TransferProgressBar {
    bar: ProgressBar,
    sized: bool,
}

impl TransferProgressBar {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}").unwrap());
        Self { bar, sized: false }
    }

    /// Feed one `TransferStats` snapshot into the bar.
    pub fn update(&mut self, stats: &TransferStats) {
        if !self.sized {
            if let Some(total) = stats.bytes_total {
                self.bar = ProgressBar::new(total);
                self.bar.set_style(
                    ProgressStyle::default_bar()
                        .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
                        .unwrap()
                        .progress_chars("#>-"),
                );
                self.sized = true;
            }
        }

        if self.sized {
            self.bar.set_position(stats.bytes_done);
        } else {
            self.bar.set_position(stats.bytes_done);
            self.bar.set_message(format!("{} {}", phase_label(stats.phase), crate::bandwidth::format_speed(stats.speed_bps)));
        }
    }

    pub fn finish(&self, message: impl Into<String>) {
        self.bar.finish_with_message(message.into());
    }

    pub fn abandon(&self, message: impl Into<String>) {
        self.bar.abandon_with_message(message.into());
    }
}

impl Default for TransferProgressBar {
    fn default() -> Self {
        Self::new()
    }
}

fn phase_label(phase: TransferPhase) -> &'static str {
    match phase {
        TransferPhase::Resolving => "resolving",
        TransferPhase::Connecting => "connecting",
        TransferPhase::Tls => "tls",
        TransferPhase::ProtocolLock => "negotiating",
        TransferPhase::Stream => "downloading",
        TransferPhase::Verify => "verifying",
        TransferPhase::Complete => "complete",
        TransferPhase::Error => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_label_covers_every_variant() {
        for phase in [
            TransferPhase::Resolving,
            TransferPhase::Connecting,
            TransferPhase::Tls,
            TransferPhase::ProtocolLock,
            TransferPhase::Stream,
            TransferPhase::Verify,
            TransferPhase::Complete,
            TransferPhase::Error,
        ] {
            assert!(!phase_label(phase).is_empty());
        }
    }

    #[test]
    fn update_without_total_keeps_spinner_mode() {
        let mut bar = TransferProgressBar::new();
        let mut stats = TransferStats::new(crate::models::FluxMode::Stream);
        stats.bytes_done = 100;
        bar.update(&stats);
        assert!(!bar.sized);
    }

    #[test]
    fn update_with_total_switches_to_sized_bar() {
        let mut bar = TransferProgressBar::new();
        let mut stats = TransferStats::new(crate::models::FluxMode::Single);
        stats.bytes_total = Some(1000);
        stats.bytes_done = 100;
        bar.update(&stats);
        assert!(bar.sized);
    }
}
