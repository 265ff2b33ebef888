// Performance metrics module
//
// Provides lightweight metrics tracking for monitoring pipeline activity

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Global performance metrics
///
/// Uses atomic operations for thread-safe metric tracking without locks.
/// Counters are collected over the application lifetime and logged on
/// shutdown for diagnostics.
#[derive(Debug)]
pub struct Metrics {
    /// Symbols successfully rendered from committed configurations
    pub symbols_rendered: AtomicUsize,

    /// Encoder faults replaced by the fallback symbol
    pub encoder_faults: AtomicUsize,

    /// Configurations rejected by the capacity guard before encoding
    pub capacity_rejections: AtomicUsize,

    /// Exports delivered successfully
    pub exports_completed: AtomicUsize,

    /// Exports refused or aborted
    pub exports_failed: AtomicUsize,

    /// Total time spent in successful export calls, in milliseconds
    pub total_export_time_ms: AtomicU64,

    /// State change events observed by the reactive pipeline
    pub state_events: AtomicU64,

    /// Application start time
    start_time: Instant,
}

impl Metrics {
    /// Create a new Metrics instance
    pub fn new() -> Self {
        Self {
            symbols_rendered: AtomicUsize::new(0),
            encoder_faults: AtomicUsize::new(0),
            capacity_rejections: AtomicUsize::new(0),
            exports_completed: AtomicUsize::new(0),
            exports_failed: AtomicUsize::new(0),
            total_export_time_ms: AtomicU64::new(0),
            state_events: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_symbol_rendered(&self) {
        self.symbols_rendered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_encoder_fault(&self) {
        self.encoder_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_capacity_rejection(&self) {
        self.capacity_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_export_completed(&self) {
        self.exports_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_export_failed(&self) {
        self.exports_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record time spent in a successful export call
    pub fn record_export_time(&self, duration: Duration) {
        self.total_export_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_state_event(&self) {
        self.state_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Get average export time in milliseconds
    pub fn avg_export_time_ms(&self) -> f64 {
        let total = self.total_export_time_ms.load(Ordering::Relaxed);
        let count = self.exports_completed.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        let uptime = self.uptime();
        tracing::info!("=== Pipeline Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", uptime.as_secs_f64());
        tracing::info!(
            "Symbols: {} rendered, {} encoder faults, {} capacity rejections",
            self.symbols_rendered.load(Ordering::Relaxed),
            self.encoder_faults.load(Ordering::Relaxed),
            self.capacity_rejections.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Exports: {} completed, {} failed (avg: {:.2}ms per export)",
            self.exports_completed.load(Ordering::Relaxed),
            self.exports_failed.load(Ordering::Relaxed),
            self.avg_export_time_ms()
        );
        tracing::info!(
            "State events observed: {}",
            self.state_events.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
