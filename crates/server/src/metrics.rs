//! Prometheus metrics for the restash server.
//!
//! Per-user, per-repository, per-type counters for blob reads, writes and
//! deletes, plus the bytes moved by each.
//!
//! # Security Note
//!
//! The `/metrics` endpoint sits behind the same Basic authentication as the
//! rest of the API. With authentication disabled it is open to anyone who can
//! reach the listener, and the labels expose usernames and repository names.
//! Restrict it at the network level in that case.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

const LABELS: &[&str] = &["user", "repo", "type"];

fn blob_counter(name: &str, help: &str) -> IntCounterVec {
    IntCounterVec::new(Opts::new(name, help), LABELS).expect("metric creation failed")
}

pub static BLOB_READ_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    blob_counter("restash_blob_read_total", "Total number of blobs read")
});

pub static BLOB_READ_BYTES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    blob_counter("restash_blob_read_bytes_total", "Total number of bytes read from blobs")
});

pub static BLOB_WRITE_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    blob_counter("restash_blob_write_total", "Total number of blobs written")
});

pub static BLOB_WRITE_BYTES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    blob_counter("restash_blob_write_bytes_total", "Total number of bytes written to blobs")
});

pub static BLOB_DELETE_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    blob_counter("restash_blob_delete_total", "Total number of blobs deleted")
});

pub static BLOB_DELETE_BYTES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    blob_counter("restash_blob_delete_bytes_total", "Total number of bytes of blobs deleted")
});

static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry. Safe to call repeatedly.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        for counter in [
            &*BLOB_READ_TOTAL,
            &*BLOB_READ_BYTES_TOTAL,
            &*BLOB_WRITE_TOTAL,
            &*BLOB_WRITE_BYTES_TOTAL,
            &*BLOB_DELETE_TOTAL,
            &*BLOB_DELETE_BYTES_TOTAL,
        ] {
            REGISTRY
                .register(Box::new(counter.clone()))
                .expect("metric registration failed");
        }
    });
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Label set for one blob operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobLabels {
    pub user: String,
    pub repo: String,
    pub blob_type: String,
}

impl BlobLabels {
    fn values(&self) -> [&str; 3] {
        [&self.user, &self.repo, &self.blob_type]
    }

    /// Record a completed read of `bytes` bytes.
    pub fn record_read(&self, bytes: u64) {
        BLOB_READ_TOTAL.with_label_values(&self.values()).inc();
        BLOB_READ_BYTES_TOTAL
            .with_label_values(&self.values())
            .inc_by(bytes);
    }

    /// Record a completed write of `bytes` bytes.
    pub fn record_write(&self, bytes: u64) {
        BLOB_WRITE_TOTAL.with_label_values(&self.values()).inc();
        BLOB_WRITE_BYTES_TOTAL
            .with_label_values(&self.values())
            .inc_by(bytes);
    }

    /// Record a delete of an object that was `bytes` bytes long.
    pub fn record_delete(&self, bytes: u64) {
        BLOB_DELETE_TOTAL.with_label_values(&self.values()).inc();
        BLOB_DELETE_BYTES_TOTAL
            .with_label_values(&self.values())
            .inc_by(bytes);
    }
}
