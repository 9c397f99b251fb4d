// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Metrics-collecting wrapper for Strongbox backends.
//
// Wraps any `Backend` and transparently counts reads, writes, deletes and
// scans, with latency sums and record totals. Connection calls are passed
// through untouched.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use crate::backend::{Backend, ScannedRecord};
use crate::error::StorageError;
use crate::schema::SchemaInfo;
use crate::value::Record;

/// Accumulated statistics for a backend.
///
/// All counters are monotonically increasing for the lifetime of the
/// [`MetricsBackend`] that owns them, until [`MetricsBackend::reset_stats`].
#[derive(Debug, Clone, Default)]
pub struct BackendStats {
    /// Number of single-record reads.
    pub read_count: u64,
    /// Number of writes (saves).
    pub write_count: u64,
    /// Number of deletes, whether or not anything was removed.
    pub delete_count: u64,
    /// Number of full scans (`list_ids` and `read_all`).
    pub scan_count: u64,
    /// Number of failed calls of any kind.
    pub error_count: u64,
    /// Cumulative wall-clock latency of all reads, in milliseconds.
    pub read_latency_sum_ms: f64,
    /// Cumulative wall-clock latency of all writes, in milliseconds.
    pub write_latency_sum_ms: f64,
    /// Records returned by reads and scans.
    pub records_read: u64,
}

/// A backend wrapper that collects operation metrics.
///
/// # Example
///
/// ```rust
/// use strongbox_core::{InMemoryBackend, MetricsBackend, StorageEngine};
///
/// let metered = std::sync::Arc::new(MetricsBackend::new(InMemoryBackend::new()));
/// let engine = StorageEngine::from_arc(metered.clone());
/// assert_eq!(engine.backend_name(), "in-memory");
/// assert_eq!(metered.stats().write_count, 0);
/// ```
pub struct MetricsBackend<B: Backend> {
    inner: B,
    stats: Arc<RwLock<BackendStats>>,
}

impl<B: Backend> MetricsBackend<B> {
    /// Wrap `inner` with metrics collection.
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            stats: Arc::new(RwLock::new(BackendStats::default())),
        }
    }

    /// Return a snapshot of the current statistics.
    pub fn stats(&self) -> BackendStats {
        self.stats
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Reset all statistics to zero.
    pub fn reset_stats(&self) {
        let mut s = self.stats.write().unwrap_or_else(PoisonError::into_inner);
        *s = BackendStats::default();
    }

    /// Return a reference to the inner backend.
    pub fn inner(&self) -> &B {
        &self.inner
    }

    fn record<T>(&self, result: &Result<T, StorageError>, update: impl FnOnce(&mut BackendStats)) {
        let mut s = self.stats.write().unwrap_or_else(PoisonError::into_inner);
        update(&mut s);
        if result.is_err() {
            s.error_count += 1;
        }
    }
}

impl<B: Backend> Backend for MetricsBackend<B> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn requires_connection(&self) -> bool {
        self.inner.requires_connection()
    }

    fn connect(&self) -> Result<(), StorageError> {
        self.inner.connect()
    }

    fn close_connection(&self) -> Result<(), StorageError> {
        self.inner.close_connection()
    }

    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    fn read_raw(&self, schema: &SchemaInfo, id: &str) -> Result<Option<Record>, StorageError> {
        let start = Instant::now();
        let result = self.inner.read_raw(schema, id);
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let found = matches!(result, Ok(Some(_)));
        self.record(&result, |s| {
            s.read_count += 1;
            s.read_latency_sum_ms += elapsed_ms;
            if found {
                s.records_read += 1;
            }
        });
        result
    }

    fn write_raw(
        &self,
        schema: &SchemaInfo,
        id: &str,
        record: &Record,
    ) -> Result<(), StorageError> {
        let start = Instant::now();
        let result = self.inner.write_raw(schema, id, record);
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        self.record(&result, |s| {
            s.write_count += 1;
            s.write_latency_sum_ms += elapsed_ms;
        });
        result
    }

    fn delete_raw(&self, schema: &SchemaInfo, id: &str) -> Result<bool, StorageError> {
        let result = self.inner.delete_raw(schema, id);
        self.record(&result, |s| s.delete_count += 1);
        result
    }

    fn list_ids(&self, schema: &SchemaInfo) -> Result<Vec<String>, StorageError> {
        let result = self.inner.list_ids(schema);
        self.record(&result, |s| s.scan_count += 1);
        result
    }

    fn read_all(&self, schema: &SchemaInfo) -> Result<Vec<ScannedRecord>, StorageError> {
        let result = self.inner.read_all(schema);
        let count = result.as_ref().map_or(0, |entries| entries.len() as u64);
        self.record(&result, |s| {
            s.scan_count += 1;
            s.records_read += count;
        });
        result
    }
}
