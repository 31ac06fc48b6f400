//! Logging setup and run metrics for packshot
//!
//! - Structured logging with tracing (compact text or JSON lines)
//! - Process-wide counters and duration histograms
//! - A drop-recording [`Timer`]

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

/// Images written to the output directory
pub const IMAGES_PROCESSED: &str = "images.processed";
/// Images skipped because their output already existed
pub const IMAGES_SKIPPED: &str = "images.skipped";
/// Images that failed to decode, transform or encode
pub const IMAGES_FAILED: &str = "images.failed";
/// Wall time of one image through the pipeline
pub const PIPELINE_DURATION_MS: &str = "pipeline.duration_ms";
/// Wall time of a whole batch
pub const BATCH_DURATION_MS: &str = "batch.duration_ms";

static METRICS: Lazy<MetricsRegistry> = Lazy::new(MetricsRegistry::new);

static SESSION_ID: Lazy<String> = Lazy::new(|| Uuid::new_v4().to_string());

/// Initialize logging with defaults.
pub fn init() -> anyhow::Result<()> {
    init_with_config(TelemetryConfig::default())
}

/// Initialize logging. `RUST_LOG` wins over `config.log_level`.
pub fn init_with_config(config: TelemetryConfig) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    // Logs go to stderr so `--json` reports on stdout stay parseable.
    let result = if config.json {
        let subscriber = tracing_subscriber::registry().with(filter).with(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(config.show_target)
                .with_thread_ids(config.show_thread_ids),
        );
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = tracing_subscriber::registry().with(filter).with(
            fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_target(config.show_target)
                .with_thread_ids(config.show_thread_ids),
        );
        tracing::subscriber::set_global_default(subscriber)
    };
    result.map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;

    tracing::debug!(
        session_id = %session_id(),
        version = env!("CARGO_PKG_VERSION"),
        "Telemetry initialized"
    );

    Ok(())
}

/// Identifier of this process run, for correlating logs with metrics.
pub fn session_id() -> &'static str {
    &SESSION_ID
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub log_level: String,
    /// Emit JSON lines instead of compact text
    pub json: bool,
    /// Include the event target
    pub show_target: bool,
    /// Include thread ids (useful with the rayon pool)
    pub show_thread_ids: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            json: false,
            show_target: false,
            show_thread_ids: false,
        }
    }
}

impl TelemetryConfig {
    /// Config for the given verbosity (`-v` count).
    pub fn for_verbosity(verbose: u8) -> Self {
        let log_level = match verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        };
        Self {
            log_level: log_level.to_string(),
            show_thread_ids: verbose > 1,
            ..Self::default()
        }
    }
}

/// Counters and histograms, safe to update from worker threads.
pub struct MetricsRegistry {
    counters: RwLock<HashMap<String, AtomicU64>>,
    histograms: RwLock<HashMap<String, Vec<f64>>>,
    start_time: Instant,
}

impl MetricsRegistry {
    fn new() -> Self {
        Self {
            counters: RwLock::new(HashMap::new()),
            histograms: RwLock::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Increment a counter
    pub fn increment(&self, name: &str) {
        self.increment_by(name, 1);
    }

    /// Increment a counter by `value`
    pub fn increment_by(&self, name: &str, value: u64) {
        let counters = self.counters.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(counter) = counters.get(name) {
            counter.fetch_add(value, Ordering::Relaxed);
            return;
        }
        drop(counters);

        let mut counters = self.counters.write().unwrap_or_else(PoisonError::into_inner);
        counters
            .entry(name.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(value, Ordering::Relaxed);
    }

    /// Current value of a counter (0 if never incremented)
    pub fn counter(&self, name: &str) -> u64 {
        self.counters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    /// Record a histogram value
    pub fn histogram(&self, name: &str, value: f64) {
        self.histograms
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    /// Summary of a histogram, if it has been recorded to
    pub fn histogram_stats(&self, name: &str) -> Option<HistogramStats> {
        self.histograms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|v| HistogramStats::from_values(v))
    }

    /// Seconds since the registry was created
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Export metrics as JSON
    pub fn export_json(&self) -> serde_json::Value {
        let counter_values: HashMap<String, u64> = self
            .counters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(k, v)| (k.clone(), v.load(Ordering::Relaxed)))
            .collect();

        let histogram_stats: HashMap<String, HistogramStats> = self
            .histograms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(k, v)| (k.clone(), HistogramStats::from_values(v)))
            .collect();

        serde_json::json!({
            "session_id": session_id(),
            "uptime_secs": self.uptime_secs(),
            "counters": counter_values,
            "histograms": histogram_stats,
        })
    }
}

/// Histogram statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramStats {
    /// Number of samples
    pub count: usize,
    /// Smallest sample
    pub min: f64,
    /// Largest sample
    pub max: f64,
    /// Arithmetic mean
    pub mean: f64,
    /// Median
    pub p50: f64,
    /// 95th percentile
    pub p95: f64,
    /// 99th percentile
    pub p99: f64,
}

impl HistogramStats {
    fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                count: 0,
                min: 0.0,
                max: 0.0,
                mean: 0.0,
                p50: 0.0,
                p95: 0.0,
                p99: 0.0,
            };
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let sum: f64 = sorted.iter().sum();

        Self {
            count,
            min: sorted[0],
            max: sorted[count - 1],
            mean: sum / count as f64,
            p50: percentile(&sorted, 50.0),
            p95: percentile(&sorted, 95.0),
            p99: percentile(&sorted, 99.0),
        }
    }
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// The process-wide registry
pub fn metrics() -> &'static MetricsRegistry {
    &METRICS
}

/// Records its elapsed milliseconds into a histogram when stopped or dropped.
pub struct Timer {
    name: &'static str,
    start: Instant,
    recorded: bool,
}

impl Timer {
    /// Start timing into histogram `name`
    pub fn start(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
            recorded: false,
        }
    }

    /// Stop the timer and record the duration
    pub fn stop(mut self) -> Duration {
        self.record()
    }

    fn record(&mut self) -> Duration {
        let duration = self.start.elapsed();
        if !self.recorded {
            self.recorded = true;
            metrics().histogram(self.name, duration.as_secs_f64() * 1000.0);
            tracing::trace!(
                metric = self.name,
                duration_ms = duration.as_millis() as u64,
                "Timer completed"
            );
        }
        duration
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.record();
    }
}
