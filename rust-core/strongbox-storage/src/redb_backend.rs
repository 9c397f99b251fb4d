// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// redb-backed embedded backend.
//
// A single redb database file holds one table per persisted type, named
// after the type's stored name. Keys are identifiers; values are the
// record encoded as JSON bytes.
//
// - Read transactions for reads and scans (concurrent, lock-free).
// - One write transaction per save or delete, committed before returning.
// - A table that has never been written reads as empty.

use std::path::{Path, PathBuf};

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, TableError};
use strongbox_core::{Backend, Record, ScannedRecord, SchemaInfo, StorageError};
use tracing::debug;

fn table(schema: &SchemaInfo) -> TableDefinition<'static, &'static str, &'static [u8]> {
    TableDefinition::new(schema.name)
}

fn decode(bytes: &[u8]) -> Result<Record, StorageError> {
    serde_json::from_slice(bytes).map_err(|e| StorageError::CorruptedData(e.to_string()))
}

/// An embedded backend powered by redb.
///
/// Thread-safe: `Database` is `Send + Sync` and handles internal locking.
pub struct RedbBackend {
    db: Database,
    path: PathBuf,
}

impl RedbBackend {
    /// Open or create a redb database at the given path.
    ///
    /// Creates parent directories if they don't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(StorageError::Io)?;
        }

        let db = Database::create(&path).map_err(|e| {
            StorageError::BackendUnavailable(format!(
                "failed to open redb at {}: {}",
                path.display(),
                e
            ))
        })?;

        debug!(path = %path.display(), "opened redb backend");
        Ok(Self { db, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for RedbBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbBackend")
            .field("path", &self.path)
            .finish()
    }
}

impl Backend for RedbBackend {
    fn name(&self) -> &str {
        "redb"
    }

    fn read_raw(&self, schema: &SchemaInfo, id: &str) -> Result<Option<Record>, StorageError> {
        let txn = self
            .db
            .begin_read()
            .map_err(|e| StorageError::BackendUnavailable(format!("read txn: {e}")))?;
        let table = match txn.open_table(table(schema)) {
            Ok(t) => t,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(StorageError::BackendUnavailable(format!("open table: {e}"))),
        };

        match table.get(id) {
            Ok(Some(value)) => decode(value.value()).map(Some),
            Ok(None) => Ok(None),
            Err(e) => Err(StorageError::CorruptedData(format!("get: {e}"))),
        }
    }

    fn write_raw(
        &self,
        schema: &SchemaInfo,
        id: &str,
        record: &Record,
    ) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(record)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        let txn = self
            .db
            .begin_write()
            .map_err(|e| StorageError::BackendUnavailable(format!("write txn: {e}")))?;
        {
            let mut table = txn
                .open_table(table(schema))
                .map_err(|e| StorageError::BackendUnavailable(format!("open table: {e}")))?;
            table
                .insert(id, bytes.as_slice())
                .map_err(|e| StorageError::CorruptedData(format!("insert: {e}")))?;
        }
        txn.commit()
            .map_err(|e| StorageError::CorruptedData(format!("commit: {e}")))?;
        Ok(())
    }

    fn delete_raw(&self, schema: &SchemaInfo, id: &str) -> Result<bool, StorageError> {
        let txn = self
            .db
            .begin_write()
            .map_err(|e| StorageError::BackendUnavailable(format!("write txn: {e}")))?;
        let existed;
        {
            let mut table = txn
                .open_table(table(schema))
                .map_err(|e| StorageError::BackendUnavailable(format!("open table: {e}")))?;
            existed = table
                .remove(id)
                .map_err(|e| StorageError::CorruptedData(format!("remove: {e}")))?
                .is_some();
        }
        txn.commit()
            .map_err(|e| StorageError::CorruptedData(format!("commit: {e}")))?;
        Ok(existed)
    }

    fn list_ids(&self, schema: &SchemaInfo) -> Result<Vec<String>, StorageError> {
        Ok(self
            .read_all(schema)?
            .into_iter()
            .map(|(id, _)| id)
            .collect())
    }

    fn read_all(&self, schema: &SchemaInfo) -> Result<Vec<ScannedRecord>, StorageError> {
        let txn = self
            .db
            .begin_read()
            .map_err(|e| StorageError::BackendUnavailable(format!("read txn: {e}")))?;
        let table = match txn.open_table(table(schema)) {
            Ok(t) => t,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::BackendUnavailable(format!("open table: {e}"))),
        };

        let iter = table
            .iter()
            .map_err(|e| StorageError::CorruptedData(format!("scan: {e}")))?;
        let mut entries = Vec::new();
        for entry in iter {
            let (key, value) =
                entry.map_err(|e| StorageError::CorruptedData(format!("scan entry: {e}")))?;
            entries.push((key.value().to_string(), decode(value.value())));
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strongbox_core::Value;
    use tempfile::tempdir;

    fn schema(name: &'static str) -> SchemaInfo {
        SchemaInfo {
            name,
            fields: Vec::new(),
            has_constructor: false,
        }
    }

    fn record(points: i64) -> Record {
        let mut record = Record::new();
        record.insert("points".to_string(), Value::Int(points));
        record
    }

    #[test]
    fn test_tables_are_per_type() {
        let dir = tempdir().unwrap();
        let backend = RedbBackend::open(dir.path().join("store.redb")).unwrap();
        let profiles = schema("Profile");
        let accounts = schema("Account");

        assert_eq!(backend.read_raw(&profiles, "u1").unwrap(), None);
        assert!(backend.read_all(&profiles).unwrap().is_empty());

        backend.write_raw(&profiles, "u1", &record(10)).unwrap();
        assert_eq!(backend.read_raw(&profiles, "u1").unwrap(), Some(record(10)));
        assert_eq!(backend.read_raw(&accounts, "u1").unwrap(), None);
        assert_eq!(backend.list_ids(&profiles).unwrap(), vec!["u1".to_string()]);
    }

    #[test]
    fn test_persistence_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("store.redb");
        let profiles = schema("Profile");

        {
            let backend = RedbBackend::open(&path).unwrap();
            backend.write_raw(&profiles, "u1", &record(3)).unwrap();
            assert!(backend.delete_raw(&profiles, "u1").unwrap());
            backend.write_raw(&profiles, "u2", &record(4)).unwrap();
        }

        let backend = RedbBackend::open(&path).unwrap();
        assert_eq!(backend.read_raw(&profiles, "u1").unwrap(), None);
        assert_eq!(backend.read_raw(&profiles, "u2").unwrap(), Some(record(4)));
        assert!(!backend.delete_raw(&profiles, "u1").unwrap());
    }
}
