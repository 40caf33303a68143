//! Throughput and latency statistics for the estimation worker.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for the worker loop
pub struct PipelineMetrics {
    /// Messages taken from the bus
    pub messages_received: AtomicU64,
    /// Estimates published and confirmed
    pub estimates_published: AtomicU64,
    /// Messages with an event type we do not handle
    pub messages_ignored: AtomicU64,
    /// Messages dropped as malformed or failed in the handler
    pub messages_skipped: AtomicU64,
    /// Outbound publishes that were not confirmed
    pub publish_failures: AtomicU64,
    /// Bus errors while polling
    pub poll_errors: AtomicU64,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Recovery probability distribution buckets
    probability_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            messages_received: AtomicU64::new(0),
            estimates_published: AtomicU64::new(0),
            messages_ignored: AtomicU64::new(0),
            messages_skipped: AtomicU64::new(0),
            publish_failures: AtomicU64::new(0),
            poll_errors: AtomicU64::new(0),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            probability_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    pub fn record_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ignored(&self) {
        self.messages_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.messages_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish_failure(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_poll_error(&self) {
        self.poll_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a confirmed estimate
    pub fn record_published(&self, processing_time: Duration, probability: f64) {
        self.estimates_published.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only last 10000 for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        let bucket = (probability.clamp(0.0, 1.0) * 10.0).min(9.0) as usize;
        if let Ok(mut buckets) = self.probability_buckets.write() {
            buckets[bucket] += 1;
        }
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
        let at = |q: f64| sorted[((count as f64 * q) as usize).min(count - 1)];

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: at(0.5),
            p95_us: at(0.95),
            p99_us: at(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Get current throughput (messages per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.messages_received.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_probability_distribution(&self) -> [u64; 10] {
        self.probability_buckets
            .read()
            .map(|buckets| *buckets)
            .unwrap_or_default()
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let received = self.messages_received.load(Ordering::Relaxed);
        let published = self.estimates_published.load(Ordering::Relaxed);
        let ignored = self.messages_ignored.load(Ordering::Relaxed);
        let skipped = self.messages_skipped.load(Ordering::Relaxed);
        let publish_failures = self.publish_failures.load(Ordering::Relaxed);
        let poll_errors = self.poll_errors.load(Ordering::Relaxed);

        let processing = self.get_processing_stats();
        let distribution = self.get_probability_distribution();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║              ESTIMATION ENGINE - METRICS SUMMARY             ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Messages Received:  {:>8}  │  Throughput: {:>6.1} msg/s     ║",
            received,
            self.get_throughput()
        );
        info!(
            "║ Estimates Published: {:>7}  │  Ignored: {:>8}           ║",
            published, ignored
        );
        info!(
            "║ Skipped: {:>8}  │  Publish Failures: {:>6}  │  Poll Errors: {:>6} ║",
            skipped, publish_failures, poll_errors
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Processing Time (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5} ║",
            processing.mean_us, processing.p50_us, processing.p95_us, processing.p99_us
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Recovery Probability Distribution:                           ║");
        let total: u64 = distribution.iter().sum();
        for (i, &count) in distribution.iter().enumerate() {
            let pct = if total > 0 { (count as f64 / total as f64) * 100.0 } else { 0.0 };
            let bar: String = "█".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "║   {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
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

/// Real-time metrics reporter that prints periodic summaries
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
        // first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = PipelineMetrics::new();

        metrics.record_received();
        metrics.record_received();
        metrics.record_published(Duration::from_micros(100), 0.55);
        metrics.record_skipped();

        assert_eq!(metrics.messages_received.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.estimates_published.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.messages_skipped.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.get_probability_distribution()[5], 1);
    }

    #[test]
    fn test_processing_stats() {
        let metrics = PipelineMetrics::new();
        for us in [100, 200, 300, 400] {
            metrics.record_published(Duration::from_micros(us), 0.5);
        }

        let stats = metrics.get_processing_stats();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean_us, 250);
        assert_eq!(stats.max_us, 400);
    }

    #[test]
    fn test_probability_bucket_edges() {
        let metrics = PipelineMetrics::new();
        metrics.record_published(Duration::ZERO, 0.0);
        metrics.record_published(Duration::ZERO, 1.0);

        let distribution = metrics.get_probability_distribution();
        assert_eq!(distribution[0], 1);
        assert_eq!(distribution[9], 1);
    }

    #[test]
    fn test_empty_stats() {
        let stats = PipelineMetrics::new().get_processing_stats();
        assert_eq!(stats.count, 0);
    }
}
