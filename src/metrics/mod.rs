//! Prometheus metrics for the booking engine
//!
//! This module provides metrics tracking for:
//! - Availability: queries by booking mode, slot computation duration
//! - Reservations: creations by kind, conflicts by reason, status transitions, expiries
//! - API: requests by endpoint and status
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter, register_counter_vec, register_histogram, register_histogram_vec, Counter,
    CounterVec, Encoder, Histogram, HistogramVec, TextEncoder,
};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for all booking metrics
struct BookingMetrics {
    availability_queries: CounterVec,
    slot_computation: Histogram,
    reservations_created: CounterVec,
    conflicts: CounterVec,
    transitions: CounterVec,
    expired: Counter,
    api_requests: CounterVec,
    api_duration: HistogramVec,
}

/// Global storage for booking metrics
static BOOKING_METRICS: OnceLock<BookingMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// This function should be called once at application startup.
/// If metric registration fails, errors are logged and subsequent
/// metric operations become no-ops.
///
/// # Example
///
/// ```ignore
/// if let Err(e) = termin::metrics::init_metrics() {
///     eprintln!("Warning: Metrics initialization failed: {}", e);
/// }
/// ```
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    // Prevent double initialization
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let metrics = BookingMetrics {
        availability_queries: register_counter_vec!(
            "termin_availability_queries_total",
            "Total availability queries by booking mode",
            &["mode"]
        )?,
        slot_computation: register_histogram!(
            "termin_slot_computation_duration_seconds",
            "Time spent generating slots for one query in seconds",
            vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25]
        )?,
        reservations_created: register_counter_vec!(
            "termin_reservations_created_total",
            "Total reservations created by kind",
            &["kind"]
        )?,
        conflicts: register_counter_vec!(
            "termin_conflicts_total",
            "Total rejected booking requests and transitions by conflict reason",
            &["reason"]
        )?,
        transitions: register_counter_vec!(
            "termin_status_transitions_total",
            "Total applied reservation status transitions by target status",
            &["status"]
        )?,
        expired: register_counter!(
            "termin_reservations_expired_total",
            "Total pending reservations expired"
        )?,
        api_requests: register_counter_vec!(
            "termin_api_requests_total",
            "Total API requests by endpoint and status",
            &["endpoint", "status"]
        )?,
        api_duration: register_histogram_vec!(
            "termin_api_request_duration_seconds",
            "API request duration in seconds",
            &["endpoint"],
            vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
        )?,
    };

    BOOKING_METRICS
        .set(metrics)
        .map_err(|_| "Booking metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    BOOKING_METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record an availability query
pub fn record_availability_query(mode: &str) {
    if let Some(m) = BOOKING_METRICS.get() {
        m.availability_queries.with_label_values(&[mode]).inc();
    }
}

/// Record a created reservation (`calendar` or `day`)
pub fn record_reservation_created(kind: &str) {
    if let Some(m) = BOOKING_METRICS.get() {
        m.reservations_created.with_label_values(&[kind]).inc();
    }
}

/// Record a conflict outcome
pub fn record_conflict(reason: &str) {
    if let Some(m) = BOOKING_METRICS.get() {
        m.conflicts.with_label_values(&[reason]).inc();
    }
}

/// Record an applied status transition
pub fn record_transition(status: &str) {
    if let Some(m) = BOOKING_METRICS.get() {
        m.transitions.with_label_values(&[status]).inc();
    }
}

/// Record expired reservations
pub fn record_expired(count: usize) {
    let Some(m) = BOOKING_METRICS.get() else {
        return;
    };

    if count > 0 {
        m.expired.inc_by(count as f64);
    }
}

/// Record API request
pub fn record_api_request(endpoint: &str, status: u16, duration_secs: f64) {
    let Some(m) = BOOKING_METRICS.get() else {
        return;
    };

    let status_str = status.to_string();
    m.api_requests
        .with_label_values(&[endpoint, &status_str])
        .inc();
    m.api_duration
        .with_label_values(&[endpoint])
        .observe(duration_secs);
}

/// Histogram timer guard that records duration on drop
pub struct MetricsTimer {
    timer: Option<prometheus::HistogramTimer>,
}

impl MetricsTimer {
    fn new(timer: prometheus::HistogramTimer) -> Self {
        Self { timer: Some(timer) }
    }

    /// Create a no-op timer when metrics are not initialized
    fn noop() -> Self {
        Self { timer: None }
    }
}

impl Drop for MetricsTimer {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop_and_record();
        }
    }
}

/// Start a slot computation timer
pub fn start_slot_timer() -> MetricsTimer {
    match BOOKING_METRICS.get() {
        Some(m) => MetricsTimer::new(m.slot_computation.start_timer()),
        None => MetricsTimer::noop(),
    }
}

// ============================================================================
// Tests
// ============================================================================
