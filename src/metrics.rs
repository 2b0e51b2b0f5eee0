//! Performance metrics and statistics tracking for the scoring service.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for request processing
pub struct ServiceMetrics {
    /// Validation requests processed
    pub requests_validated: AtomicU64,
    /// Validation requests that produced field errors
    pub validation_failures: AtomicU64,
    /// Scoring requests processed
    pub requests_scored: AtomicU64,
    /// Scoring requests that returned an error
    pub scoring_errors: AtomicU64,
    /// Scored requests labeled as fraud
    pub frauds_flagged: AtomicU64,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Fraud probability distribution buckets
    probability_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl ServiceMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            requests_validated: AtomicU64::new(0),
            validation_failures: AtomicU64::new(0),
            requests_scored: AtomicU64::new(0),
            scoring_errors: AtomicU64::new(0),
            frauds_flagged: AtomicU64::new(0),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            probability_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a processed validation request
    pub fn record_validation(&self, processing_time: Duration, is_valid: bool) {
        self.requests_validated.fetch_add(1, Ordering::Relaxed);
        if !is_valid {
            self.validation_failures.fetch_add(1, Ordering::Relaxed);
        }
        self.push_processing_time(processing_time);
    }

    /// Record a scored request
    pub fn record_score(&self, processing_time: Duration, probability: f64, label: u8) {
        self.requests_scored.fetch_add(1, Ordering::Relaxed);
        if label == 1 {
            self.frauds_flagged.fetch_add(1, Ordering::Relaxed);
        }
        self.push_processing_time(processing_time);

        let bucket = (probability * 10.0).min(9.0) as usize;
        if let Ok(mut buckets) = self.probability_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    /// Record a scoring request that failed
    pub fn record_scoring_error(&self) {
        self.requests_scored.fetch_add(1, Ordering::Relaxed);
        self.scoring_errors.fetch_add(1, Ordering::Relaxed);
    }

    fn push_processing_time(&self, processing_time: Duration) {
        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only last 10000 for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let times = self.processing_times.read().unwrap();
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: *sorted.last().unwrap_or(&0),
        }
    }

    /// Get current throughput (requests per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let total = self.requests_validated.load(Ordering::Relaxed)
            + self.requests_scored.load(Ordering::Relaxed);
        if elapsed > 0.0 {
            total as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Get fraud probability distribution
    pub fn get_probability_distribution(&self) -> [u64; 10] {
        *self.probability_buckets.read().unwrap()
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let validated = self.requests_validated.load(Ordering::Relaxed);
        let invalid = self.validation_failures.load(Ordering::Relaxed);
        let scored = self.requests_scored.load(Ordering::Relaxed);
        let errors = self.scoring_errors.load(Ordering::Relaxed);
        let frauds = self.frauds_flagged.load(Ordering::Relaxed);
        let fraud_rate = if scored > 0 {
            (frauds as f64 / scored as f64) * 100.0
        } else {
            0.0
        };

        let processing = self.get_processing_stats();
        let throughput = self.get_throughput();
        let distribution = self.get_probability_distribution();

        info!("╔════════════════════════════════════════════════════════════╗");
        info!("║          FRAUD SCORING SERVICE - METRICS SUMMARY           ║");
        info!("╠════════════════════════════════════════════════════════════╣");
        info!(
            "║ Validated: {:>8} ({:>6} invalid) │ Throughput: {:>6.1}/s ║",
            validated, invalid, throughput
        );
        info!(
            "║ Scored:    {:>8} ({:>6} errors)  │ Fraud Rate: {:>6.1}%  ║",
            scored, errors, fraud_rate
        );
        info!("╠════════════════════════════════════════════════════════════╣");
        info!(
            "║ Processing Time (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5} ║",
            processing.mean_us, processing.p50_us, processing.p95_us, processing.p99_us
        );
        info!("╠════════════════════════════════════════════════════════════╣");
        info!("║ Fraud Probability Distribution:                            ║");
        let total: u64 = distribution.iter().sum();
        for (i, &count) in distribution.iter().enumerate() {
            let pct = if total > 0 {
                (count as f64 / total as f64) * 100.0
            } else {
                0.0
            };
            let bar_len = (pct / 2.0) as usize;
            let bar: String = "█".repeat(bar_len.min(20));
            info!(
                "║   {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
        info!("╚════════════════════════════════════════════════════════════╝");
    }
}

impl Default for ServiceMetrics {
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
    metrics: std::sync::Arc<ServiceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: std::sync::Arc<ServiceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
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
        let metrics = ServiceMetrics::new();

        metrics.record_validation(Duration::from_micros(100), true);
        metrics.record_validation(Duration::from_micros(150), false);
        metrics.record_score(Duration::from_micros(200), 0.8, 1);
        metrics.record_score(Duration::from_micros(120), 0.2, 0);
        metrics.record_scoring_error();

        assert_eq!(metrics.requests_validated.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.validation_failures.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.requests_scored.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.scoring_errors.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.frauds_flagged.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_probability_buckets() {
        let metrics = ServiceMetrics::new();

        metrics.record_score(Duration::from_micros(100), 0.05, 0);
        metrics.record_score(Duration::from_micros(100), 0.95, 1);
        metrics.record_score(Duration::from_micros(100), 1.0, 1);

        let distribution = metrics.get_probability_distribution();
        assert_eq!(distribution[0], 1);
        assert_eq!(distribution[9], 2);
    }

    #[test]
    fn test_processing_stats() {
        let metrics = ServiceMetrics::new();
        for us in [100, 200, 300, 400] {
            metrics.record_validation(Duration::from_micros(us), true);
        }

        let stats = metrics.get_processing_stats();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean_us, 250);
        assert_eq!(stats.max_us, 400);
    }
}
