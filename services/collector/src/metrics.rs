//! Collector metrics.
//!
//! Counters are kept locally for the shutdown summary and mirrored to the
//! `metrics` recorder, which the binary may export to Prometheus.

use std::sync::atomic::{AtomicU64, Ordering};

use metrics::{counter, gauge};
use serde::Serialize;

use crate::delivery::SendOutcome;

#[derive(Debug, Default)]
pub struct CollectorMetrics {
    files_collected: AtomicU64,
    bulletin_errors: AtomicU64,
    reports_accepted: AtomicU64,
    reports_rejected: AtomicU64,
    reports_retryable: AtomicU64,
    link_down: AtomicU64,
    reports_queued: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub files_collected: u64,
    pub bulletin_errors: u64,
    pub reports_accepted: u64,
    pub reports_rejected: u64,
    pub reports_retryable: u64,
    pub link_down: u64,
    pub reports_queued: u64,
}

impl CollectorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a file whose new content was handed to the decoder.
    pub fn record_file_collected(&self) {
        self.files_collected.fetch_add(1, Ordering::Relaxed);
        counter!("collector_files_collected_total").increment(1);
    }

    /// Record a decode that produced entries in its error log.
    pub fn record_bulletin_error(&self) {
        self.bulletin_errors.fetch_add(1, Ordering::Relaxed);
        counter!("collector_bulletin_errors_total").increment(1);
    }

    /// Record the outcome of one send attempt.
    pub fn record_send(&self, outcome: SendOutcome) {
        let slot = match outcome {
            SendOutcome::Accepted => &self.reports_accepted,
            SendOutcome::Rejected => &self.reports_rejected,
            SendOutcome::Retryable => &self.reports_retryable,
            SendOutcome::LinkDown => &self.link_down,
        };
        slot.fetch_add(1, Ordering::Relaxed);
        counter!("collector_reports_sent_total", "outcome" => outcome.as_str()).increment(1);
    }

    /// Record a report written to the retry queue.
    pub fn record_queued(&self) {
        self.reports_queued.fetch_add(1, Ordering::Relaxed);
        counter!("collector_reports_queued_total").increment(1);
    }

    pub fn set_retry_queue_depth(&self, depth: usize) {
        gauge!("collector_retry_queue_depth").set(depth as f64);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            files_collected: self.files_collected.load(Ordering::Relaxed),
            bulletin_errors: self.bulletin_errors.load(Ordering::Relaxed),
            reports_accepted: self.reports_accepted.load(Ordering::Relaxed),
            reports_rejected: self.reports_rejected.load(Ordering::Relaxed),
            reports_retryable: self.reports_retryable.load(Ordering::Relaxed),
            link_down: self.link_down.load(Ordering::Relaxed),
            reports_queued: self.reports_queued.load(Ordering::Relaxed),
        }
    }
}
