//! Prometheus metrics for the warehouse.
//!
//! This module provides metric collection for:
//! - Read cache hits, misses and invalidations
//! - Stock movements by type, and quantity clamps
//! - Assignment lifecycle
//! - Backend query failures
//!
//! # Example
//!
//! ```rust,no_run
//! use kitroom_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! if let Some(text) = server.render() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use kitroom_core::cache::CacheKey;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics recorder handle.
///
/// Installs the global recorder and renders the text exposition format.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    ///
    /// # Arguments
    ///
    /// * `addr` - Address the exposition endpoint is advertised on
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Register metric descriptions and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a recorder is already installed (e.g., in tests), this logs a warning
    /// and succeeds without a handle.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!(addr = %self.addr, "Metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if the recorder was not installed by this server.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    // Cache
    describe_counter!("warehouse_cache_hits_total", "Reads served from the cache");
    describe_counter!("warehouse_cache_misses_total", "Reads that went to the store");
    describe_counter!(
        "warehouse_cache_invalidations_total",
        "Cache entries dropped after a mutation"
    );

    // Stock
    describe_counter!(
        "warehouse_movements_recorded_total",
        "Movements appended to the ledger, by type"
    );
    describe_counter!(
        "warehouse_stock_clamped_total",
        "Outbound movements that exceeded stock and were clamped at zero"
    );
    describe_counter!(
        "warehouse_compensations_total",
        "Variant quantity restores after a failed follow-up write"
    );

    // Assignments
    describe_counter!("warehouse_assignments_opened_total", "Items loaned to players");
    describe_counter!("warehouse_assignments_returned_total", "Loans closed by a return");

    // Store
    describe_counter!("warehouse_query_errors_total", "Backend failures, by table");
    describe_histogram!(
        "warehouse_query_duration_seconds",
        "Round-trip time of backend operations"
    );
    describe_counter!(
        "warehouse_postgres_errors_total",
        "PostgreSQL driver errors, by table"
    );
}

/// Cache metrics recorder.
pub struct CacheMetrics;

impl CacheMetrics {
    /// Record a cache hit.
    pub fn record_hit(key: CacheKey) {
        counter!("warehouse_cache_hits_total", "resource" => key.as_str()).increment(1);
    }

    /// Record a cache miss.
    pub fn record_miss(key: CacheKey) {
        counter!("warehouse_cache_misses_total", "resource" => key.as_str()).increment(1);
    }

    /// Record an invalidation.
    pub fn record_invalidation(key: CacheKey) {
        counter!("warehouse_cache_invalidations_total", "resource" => key.as_str()).increment(1);
    }
}

/// Stock movement metrics recorder.
pub struct StockMetrics;

impl StockMetrics {
    /// Record a movement appended to the ledger.
    pub fn record_movement(movement_type: &'static str) {
        counter!("warehouse_movements_recorded_total", "type" => movement_type).increment(1);
    }

    /// Record an outbound movement clamped at zero.
    pub fn record_clamp() {
        counter!("warehouse_stock_clamped_total").increment(1);
    }

    /// Record a compensating quantity restore.
    pub fn record_compensation() {
        counter!("warehouse_compensations_total").increment(1);
    }
}

/// Assignment metrics recorder.
pub struct AssignmentMetrics;

impl AssignmentMetrics {
    /// Record a new loan.
    pub fn record_opened() {
        counter!("warehouse_assignments_opened_total").increment(1);
    }

    /// Record a return.
    pub fn record_returned() {
        counter!("warehouse_assignments_returned_total").increment(1);
    }
}

/// Backend query metrics recorder.
pub struct QueryMetrics;

impl QueryMetrics {
    /// Record a backend round trip.
    pub fn record_query(table: &'static str, duration: Duration) {
        histogram!("warehouse_query_duration_seconds", "table" => table)
            .record(duration.as_secs_f64());
    }

    /// Record a backend failure.
    pub fn record_error(table: &'static str) {
        counter!("warehouse_query_errors_total", "table" => table).increment(1);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_metrics_server_creation() {
        let addr = "127.0.0.1:0".parse().unwrap();
        let server = MetricsServer::new(addr);
        assert!(server.handle().is_none());
        assert!(server.render().is_none());
    }

    #[test]
    fn test_metrics_server_render() {
        let addr = "127.0.0.1:0".parse().unwrap();
        let mut server = MetricsServer::new(addr);
        server.start().unwrap();

        CacheMetrics::record_hit(CacheKey::WarehouseItems);
        StockMetrics::record_movement("out");
        AssignmentMetrics::record_opened();
        counter!("warehouse_postgres_errors_total", "table" => "item_variants").increment(1);

        // handle is None if another test installed the recorder first
        if let Some(rendered) = server.render() {
            assert!(rendered.contains("# HELP warehouse_postgres_errors_total"));
            assert!(rendered.contains("warehouse_cache_hits_total"));
            assert!(rendered.contains("warehouse_movements_recorded_total"));
            assert!(rendered.contains("warehouse_assignments_opened_total"));
        }
    }
}
