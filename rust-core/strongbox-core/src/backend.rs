// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The narrow contract every storage adapter implements.
//
// A backend only moves neutral records in and out of its native format,
// keyed by (type, identifier). Marshaling, error containment and the async
// forms all live in `StorageEngine`, so each adapter stays small.

use std::sync::Arc;

use crate::error::StorageError;
use crate::schema::SchemaInfo;
use crate::value::Record;

/// One stored entry from a full scan. Unreadable entries carry their error
/// so the caller can skip them without losing the rest.
pub type ScannedRecord = (String, Result<Record, StorageError>);

/// A pluggable record store.
///
/// Implementations must be safe to share across threads. Calls are
/// synchronous; networked adapters drive their async drivers on a runtime
/// they own.
pub trait Backend: Send + Sync + 'static {
    /// A human-readable name for this backend, used in logging and errors.
    fn name(&self) -> &str;

    /// True if [`Backend::connect`] must be called before any CRUD call.
    fn requires_connection(&self) -> bool {
        false
    }

    /// Establish the client session. A no-op for file-backed stores.
    fn connect(&self) -> Result<(), StorageError> {
        Ok(())
    }

    /// Release the client session. Calling it twice is harmless.
    fn close_connection(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }

    /// Read the record stored for `id`, or `Ok(None)` if there is none.
    fn read_raw(&self, schema: &SchemaInfo, id: &str) -> Result<Option<Record>, StorageError>;

    /// Create or replace the record stored for `id`.
    fn write_raw(&self, schema: &SchemaInfo, id: &str, record: &Record)
        -> Result<(), StorageError>;

    /// Remove the record stored for `id`.
    ///
    /// Returns `Ok(true)` if a record was removed and `Ok(false)` if there
    /// was nothing to remove.
    fn delete_raw(&self, schema: &SchemaInfo, id: &str) -> Result<bool, StorageError>;

    /// Every identifier stored for the type, in no particular order.
    fn list_ids(&self, schema: &SchemaInfo) -> Result<Vec<String>, StorageError>;

    /// Every record stored for the type.
    ///
    /// The default lists identifiers and reads each one. Adapters that can
    /// scan in one round trip override it.
    fn read_all(&self, schema: &SchemaInfo) -> Result<Vec<ScannedRecord>, StorageError> {
        let mut entries = Vec::new();
        for id in self.list_ids(schema)? {
            match self.read_raw(schema, &id) {
                Ok(Some(record)) => entries.push((id, Ok(record))),
                // Removed between the listing and the read.
                Ok(None) => {}
                Err(err) => entries.push((id, Err(err))),
            }
        }
        Ok(entries)
    }
}

impl<B: Backend + ?Sized> Backend for Arc<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn requires_connection(&self) -> bool {
        (**self).requires_connection()
    }

    fn connect(&self) -> Result<(), StorageError> {
        (**self).connect()
    }

    fn close_connection(&self) -> Result<(), StorageError> {
        (**self).close_connection()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn read_raw(&self, schema: &SchemaInfo, id: &str) -> Result<Option<Record>, StorageError> {
        (**self).read_raw(schema, id)
    }

    fn write_raw(
        &self,
        schema: &SchemaInfo,
        id: &str,
        record: &Record,
    ) -> Result<(), StorageError> {
        (**self).write_raw(schema, id, record)
    }

    fn delete_raw(&self, schema: &SchemaInfo, id: &str) -> Result<bool, StorageError> {
        (**self).delete_raw(schema, id)
    }

    fn list_ids(&self, schema: &SchemaInfo) -> Result<Vec<String>, StorageError> {
        (**self).list_ids(schema)
    }

    fn read_all(&self, schema: &SchemaInfo) -> Result<Vec<ScannedRecord>, StorageError> {
        (**self).read_all(schema)
    }
}
