// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory storage backend for Strongbox.
//
// One sorted map of records per type name, behind a `RwLock`. Intended for
// tests, development, and hosts that only need process-lifetime storage.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use crate::backend::{Backend, ScannedRecord};
use crate::error::StorageError;
use crate::schema::SchemaInfo;
use crate::value::Record;

type Tables = HashMap<String, BTreeMap<String, Record>>;

/// An in-memory backend holding one `BTreeMap` per type.
///
/// All data lives in process memory and is lost on drop. Clones share the
/// same storage.
///
/// # Example
///
/// ```rust
/// use strongbox_core::{InMemoryBackend, StorageEngine};
///
/// let engine = StorageEngine::new(InMemoryBackend::new());
/// assert_eq!(engine.backend_name(), "in-memory");
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryBackend {
    /// Create a new, empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records stored for the type named `type_name`.
    pub fn len(&self, type_name: &str) -> usize {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(type_name)
            .map_or(0, BTreeMap::len)
    }

    /// True if nothing at all is stored.
    pub fn is_empty(&self) -> bool {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .all(BTreeMap::is_empty)
    }
}

impl Backend for InMemoryBackend {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn read_raw(&self, schema: &SchemaInfo, id: &str) -> Result<Option<Record>, StorageError> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        Ok(tables
            .get(schema.name)
            .and_then(|table| table.get(id))
            .cloned())
    }

    fn write_raw(
        &self,
        schema: &SchemaInfo,
        id: &str,
        record: &Record,
    ) -> Result<(), StorageError> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        tables
            .entry(schema.name.to_string())
            .or_default()
            .insert(id.to_string(), record.clone());
        Ok(())
    }

    fn delete_raw(&self, schema: &SchemaInfo, id: &str) -> Result<bool, StorageError> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        Ok(tables
            .get_mut(schema.name)
            .is_some_and(|table| table.remove(id).is_some()))
    }

    fn list_ids(&self, schema: &SchemaInfo) -> Result<Vec<String>, StorageError> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        Ok(tables
            .get(schema.name)
            .map(|table| table.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn read_all(&self, schema: &SchemaInfo) -> Result<Vec<ScannedRecord>, StorageError> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        Ok(tables
            .get(schema.name)
            .map(|table| {
                table
                    .iter()
                    .map(|(id, record)| (id.clone(), Ok(record.clone())))
                    .collect()
            })
            .unwrap_or_default())
    }
}
