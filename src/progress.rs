//! Terminal progress for a carve run.
//!
//! [`ScanProgress`] wraps an indicatif bar and is driven by the
//! `(bytes_processed, message)` callback of
//! [`Carver::carve_with_progress`](crate::carve::Carver::carve_with_progress).

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Decimal (kB, MB, GB) rendering of a byte count
pub fn human_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::DECIMAL)
}

/// Byte-count progress bar over the span being scanned
pub struct ScanProgress {
    bar: ProgressBar,
}

impl ScanProgress {
    pub fn new(total: u64) -> Self {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {percent:>3}% {bytes}/{total_bytes} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓▒░"),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    /// Bar that draws nothing (JSON output, tests)
    pub fn hidden(total: u64) -> Self {
        let bar = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::hidden());
        Self { bar }
    }

    /// Progress callback body; positions past the total are clamped.
    pub fn update(&self, bytes_processed: u64, message: &str) {
        let total = self.bar.length().unwrap_or(u64::MAX);
        self.bar.set_position(bytes_processed.min(total));
        self.bar.set_message(message.to_string());
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}
