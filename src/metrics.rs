//! Performance metrics and statistics tracking for the prediction service.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for the serving path
pub struct ServiceMetrics {
    /// Total prediction requests served
    pub requests_processed: AtomicU64,
    /// Requests rejected for invalid coordinates
    pub requests_rejected: AtomicU64,
    /// Cache hits on the feature cache
    cache_hits: AtomicU64,
    /// Cache misses on the feature cache
    cache_misses: AtomicU64,
    /// Predictions by class label
    predictions_by_class: RwLock<HashMap<String, u64>>,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Top-1 confidence distribution buckets
    confidence_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl ServiceMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            requests_processed: AtomicU64::new(0),
            requests_rejected: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            predictions_by_class: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            confidence_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a served prediction
    pub fn record_prediction(&self, processing_time: Duration, label: &str, top_confidence: f64) {
        self.requests_processed.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only the recent window for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        if let Ok(mut by_class) = self.predictions_by_class.write() {
            *by_class.entry(label.to_string()).or_insert(0) += 1;
        }

        let bucket = (top_confidence * 10.0).min(9.0) as usize;
        if let Ok(mut buckets) = self.confidence_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    /// Record a rejected request (bad coordinates)
    pub fn record_rejection(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a feature-cache lookup
    pub fn record_cache_lookup(&self, hit: bool) {
        if hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cache_misses.fetch_add(1, Ordering::Relaxed);
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

    /// Cache hit rate over all lookups (0.0 when no lookups yet)
    pub fn cache_hit_rate(&self) -> f64 {
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        }
    }

    /// Get current throughput (requests per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.requests_processed.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Get confidence distribution
    pub fn get_confidence_distribution(&self) -> [u64; 10] {
        *self.confidence_buckets.read().unwrap()
    }

    /// Get predictions by class label
    pub fn get_predictions_by_class(&self) -> HashMap<String, u64> {
        self.predictions_by_class.read().unwrap().clone()
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let request_count = self.requests_processed.load(Ordering::Relaxed);
        let rejected_count = self.requests_rejected.load(Ordering::Relaxed);
        let processing = self.get_processing_stats();
        let throughput = self.get_throughput();
        let hit_rate = self.cache_hit_rate();
        let by_class = self.get_predictions_by_class();
        let confidence_dist = self.get_confidence_distribution();

        info!("══════════ PREDICTION SERVICE - METRICS SUMMARY ══════════");
        info!(
            "Requests served: {}  │  rejected: {}  │  throughput: {:.2} req/s",
            request_count, rejected_count, throughput
        );
        info!(
            "Processing time (μs): mean={} p50={} p95={} p99={}",
            processing.mean_us, processing.p50_us, processing.p95_us, processing.p99_us
        );
        info!("Feature cache hit rate: {:.1}%", hit_rate * 100.0);

        info!("Predictions by class:");
        for (label, count) in &by_class {
            let pct = if request_count > 0 {
                (*count as f64 / request_count as f64) * 100.0
            } else {
                0.0
            };
            info!("  {:12}: {:>6} ({:>5.1}%)", label, count, pct);
        }

        info!("Top-1 confidence distribution:");
        let total: u64 = confidence_dist.iter().sum();
        for (i, &count) in confidence_dist.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let pct = if total > 0 {
                (count as f64 / total as f64) * 100.0
            } else {
                0.0
            };
            let bar: String = "█".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "  {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
        info!("══════════════════════════════════════════════════════════");
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

/// Periodic metrics reporter
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
        // Skip the immediate first tick so the log starts quiet
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
