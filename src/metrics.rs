//! Performance metrics and statistics tracking for the scoring service.

use crate::types::verdict::VerdictStatus;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Processing-time samples kept for percentile estimates
const MAX_SAMPLES: usize = 10_000;

/// Metrics collector for pipeline performance
pub struct PipelineMetrics {
    /// Transactions that received a verdict
    pub transactions_scored: AtomicU64,
    /// Requests rejected by validation
    pub transactions_rejected: AtomicU64,
    /// Requests that failed inside inference or persistence
    pub failures: AtomicU64,
    suspicious: AtomicU64,
    normal: AtomicU64,
    unknown: AtomicU64,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PipelineMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            transactions_scored: AtomicU64::new(0),
            transactions_rejected: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            suspicious: AtomicU64::new(0),
            normal: AtomicU64::new(0),
            unknown: AtomicU64::new(0),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
        }
    }

    /// Record a transaction that received a verdict
    pub fn record_verdict(&self, status: VerdictStatus, processing_time: Duration) {
        self.transactions_scored.fetch_add(1, Ordering::Relaxed);
        self.status_counter(status).fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only the most recent window
            if times.len() > MAX_SAMPLES {
                times.drain(0..MAX_SAMPLES / 2);
            }
        }
    }

    /// Record a validation rejection
    pub fn record_rejection(&self) {
        self.transactions_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a server-side failure
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    fn status_counter(&self, status: VerdictStatus) -> &AtomicU64 {
        match status {
            VerdictStatus::Suspicious => &self.suspicious,
            VerdictStatus::Normal => &self.normal,
            VerdictStatus::Unknown => &self.unknown,
        }
    }

    /// Verdicts issued with the given status
    pub fn status_count(&self, status: VerdictStatus) -> u64 {
        self.status_counter(status).load(Ordering::Relaxed)
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let Ok(times) = self.processing_times.read() else {
            return ProcessingStats::default();
        };
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();
        let percentile = |p: f64| sorted[((count as f64 * p) as usize).min(count - 1)];

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: percentile(0.50),
            p95_us: percentile(0.95),
            p99_us: percentile(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Get current throughput (transactions per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.transactions_scored.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Seconds since the collector was created
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let scored = self.transactions_scored.load(Ordering::Relaxed);
        let rejected = self.transactions_rejected.load(Ordering::Relaxed);
        let failures = self.failures.load(Ordering::Relaxed);
        let suspicious = self.status_count(VerdictStatus::Suspicious);
        let suspicious_rate = if scored > 0 {
            (suspicious as f64 / scored as f64) * 100.0
        } else {
            0.0
        };
        let processing = self.get_processing_stats();

        info!(
            scored = scored,
            rejected = rejected,
            failures = failures,
            throughput = format!("{:.1} tx/s", self.get_throughput()),
            "Scoring summary"
        );
        info!(
            suspicious = suspicious,
            normal = self.status_count(VerdictStatus::Normal),
            unknown = self.status_count(VerdictStatus::Unknown),
            suspicious_rate = format!("{:.1}%", suspicious_rate),
            "Verdicts issued"
        );
        info!(
            mean_us = processing.mean_us,
            p50_us = processing.p50_us,
            p95_us = processing.p95_us,
            p99_us = processing.p99_us,
            max_us = processing.max_us,
            "Processing time"
        );
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Periodic metrics reporter
pub struct MetricsReporter {
    metrics: Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
