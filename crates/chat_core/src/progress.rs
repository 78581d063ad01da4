//! Aggregate download progress across every resource fetched in a session.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Formats a byte count with one decimal, e.g. `1536` -> `"1.5 KB"`.
pub fn bytes_for_human(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value > 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// Payload of a `download-progress` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadProgress {
    /// Whole percent, 0..=100.
    pub progress: u8,
    pub file_size: String,
    pub received: String,
}

/// Registry of declared sizes plus the session's cumulative counters.
///
/// The total grows as new resources declare their size, so the raw fraction can
/// move backwards. [`ProgressState::report`] only lets a percent through when it
/// is strictly greater than the last one reported.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressState {
    sizes: HashMap<String, u64>,
    total_bytes_declared: u64,
    bytes_received: u64,
    last_reported_percent: Option<u8>,
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `url` with its declared length the first time it is seen.
    /// Returns false when the url is already known or the length is zero.
    pub fn register(&mut self, url: &str, declared_len: u64) -> bool {
        if declared_len == 0 || self.sizes.contains_key(url) {
            return false;
        }
        self.sizes.insert(url.to_string(), declared_len);
        self.total_bytes_declared = self.sizes.values().sum();
        true
    }

    /// Adds a received chunk and returns the new aggregate fraction.
    pub fn record_chunk(&mut self, len: u64) -> f64 {
        self.bytes_received += len;
        self.fraction()
    }

    /// `min(1.0, received / total)`, or 0 while no size is known.
    pub fn fraction(&self) -> f64 {
        if self.total_bytes_declared == 0 {
            return 0.0;
        }
        (self.bytes_received as f64 / self.total_bytes_declared as f64).min(1.0)
    }

    /// Applies the monotonic gate. Returns the event to emit, if any.
    pub fn report(&mut self, fraction: f64) -> Option<DownloadProgress> {
        let percent = (fraction.clamp(0.0, 1.0) * 100.0).floor() as u8;
        if self
            .last_reported_percent
            .is_some_and(|last| percent <= last)
        {
            return None;
        }
        self.last_reported_percent = Some(percent);
        Some(DownloadProgress {
            progress: percent,
            file_size: bytes_for_human(self.total_bytes_declared),
            received: bytes_for_human(self.bytes_received),
        })
    }

    pub fn declared_size(&self, url: &str) -> Option<u64> {
        self.sizes.get(url).copied()
    }

    pub fn total_bytes_declared(&self) -> u64 {
        self.total_bytes_declared
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    pub fn last_reported_percent(&self) -> Option<u8> {
        self.last_reported_percent
    }
}

#[cfg(test)]
mod tests {
    use super::{bytes_for_human, ProgressState};

    #[test]
    fn formats_human_sizes() {
        assert_eq!(bytes_for_human(0), "0 B");
        assert_eq!(bytes_for_human(512), "512.0 B");
        assert_eq!(bytes_for_human(1024), "1024.0 B");
        assert_eq!(bytes_for_human(1536), "1.5 KB");
        assert_eq!(bytes_for_human(2_621_440), "2.5 MB");
        assert_eq!(bytes_for_human(3 * 1024 * 1024 * 1024 + 1), "3.0 GB");
    }

    #[test]
    fn gigabytes_are_the_largest_unit() {
        assert_eq!(bytes_for_human(2048 * 1024 * 1024 * 1024), "2048.0 GB");
    }

    #[test]
    fn register_only_counts_first_declaration() {
        let mut state = ProgressState::new();
        assert!(state.register("a", 100));
        assert!(!state.register("a", 500));
        assert!(!state.register("b", 0));
        assert!(state.register("b", 300));
        assert_eq!(state.total_bytes_declared(), 400);
        assert_eq!(state.declared_size("a"), Some(100));
        assert_eq!(state.declared_size("b"), Some(300));
    }

    #[test]
    fn fraction_is_zero_without_sizes_and_capped_at_one() {
        let mut state = ProgressState::new();
        assert_eq!(state.record_chunk(10), 0.0);
        state.register("a", 20);
        assert_eq!(state.fraction(), 0.5);
        assert_eq!(state.record_chunk(100), 1.0);
    }

    #[test]
    fn report_only_emits_increasing_percents() {
        let mut state = ProgressState::new();
        state.register("a", 1000);
        state.record_chunk(100);

        let first = state.report(0.10).unwrap();
        assert_eq!(first.progress, 10);
        assert_eq!(first.file_size, "1000.0 B");
        assert_eq!(first.received, "100.0 B");

        assert!(state.report(0.109).is_none());
        assert!(state.report(0.05).is_none());
        assert_eq!(state.report(0.5).unwrap().progress, 50);
        assert_eq!(state.report(2.0).unwrap().progress, 100);
        assert!(state.report(1.0).is_none());
        assert_eq!(state.last_reported_percent(), Some(100));
    }

    #[test]
    fn zero_percent_is_reported_once() {
        let mut state = ProgressState::new();
        assert_eq!(state.report(0.0).unwrap().progress, 0);
        assert!(state.report(0.0).is_none());
    }
}
