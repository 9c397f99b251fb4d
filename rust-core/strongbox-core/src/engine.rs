// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The storage engine: one save/load/delete contract over any backend.
//
// Lifecycle is Disconnected -> Connected -> Disconnected. File-backed
// stores are usable straight away; networked stores refuse CRUD until
// `connect()` has succeeded.
//
// Error policy:
// - save: missing identifier, not connected and I/O failures are returned.
// - load: only `NotConnected` is returned; anything else is logged and the
//   object is reported as absent (or skipped, for `load_all`).
// - delete: deleting an absent identifier is not an error.
//
// The async forms run the sync form on tokio's blocking pool and must be
// awaited inside a tokio runtime. Networked backends block on their own
// driver runtime, so code already running on a tokio task should use the
// async forms.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::backend::Backend;
use crate::error::StorageError;
use crate::marshal::marshal;
use crate::schema::Entity;
use crate::unmarshal::unmarshal;

/// A cloneable handle over a shared backend.
#[derive(Clone)]
pub struct StorageEngine {
    backend: Arc<dyn Backend>,
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("backend", &self.backend.name())
            .field("connected", &self.backend.is_connected())
            .finish()
    }
}

impl StorageEngine {
    pub fn new<B: Backend>(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Wrap a backend that is already shared elsewhere.
    pub fn from_arc(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Open the backend's client session. A no-op for file-backed stores.
    pub fn connect(&self) -> Result<(), StorageError> {
        self.backend.connect()?;
        debug!(backend = self.backend.name(), "storage engine connected");
        Ok(())
    }

    /// Release the backend's client session. Idempotent.
    pub fn close_connection(&self) -> Result<(), StorageError> {
        self.backend.close_connection()?;
        debug!(backend = self.backend.name(), "storage engine disconnected");
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        !self.backend.requires_connection() || self.backend.is_connected()
    }

    fn ensure_connected(&self) -> Result<(), StorageError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(StorageError::NotConnected(self.backend.name().to_string()))
        }
    }

    /// Marshal `object` and create or replace its stored record.
    pub fn save_or_update_sync<E: Entity>(&self, object: &E) -> Result<(), StorageError> {
        let marshaled = marshal(object)?;
        self.ensure_connected()?;

        let schema = E::schema_info();
        match self
            .backend
            .write_raw(schema, &marshaled.identifier, &marshaled.record)
        {
            Ok(()) => {
                debug!(
                    backend = self.backend.name(),
                    type_name = schema.name,
                    id = %marshaled.identifier,
                    "saved"
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    backend = self.backend.name(),
                    type_name = schema.name,
                    id = %marshaled.identifier,
                    error = %err,
                    "save failed"
                );
                Err(err)
            }
        }
    }

    /// Load the object stored under `id`, surfacing every failure.
    ///
    /// `Ok(None)` means nothing is stored under `id`.
    pub fn try_load_by_id_sync<E: Entity>(&self, id: &str) -> Result<Option<E>, StorageError> {
        self.ensure_connected()?;
        let schema = E::schema_info();
        match self.backend.read_raw(schema, id)? {
            Some(record) => unmarshal(record, id).map(Some),
            None => Ok(None),
        }
    }

    /// Load the object stored under `id`.
    ///
    /// Unreadable or unreconstructable records are logged and reported as
    /// absent; only `NotConnected` is returned as an error.
    pub fn load_by_id_sync<E: Entity>(&self, id: &str) -> Result<Option<E>, StorageError> {
        match self.try_load_by_id_sync(id) {
            Ok(found) => Ok(found),
            Err(err) if err.is_not_connected() => Err(err),
            Err(err) => {
                error!(
                    backend = self.backend.name(),
                    type_name = E::schema_info().name,
                    id,
                    error = %err,
                    "load failed"
                );
                Ok(None)
            }
        }
    }

    /// Load every stored object of type `E`, in no particular order.
    ///
    /// Entries that cannot be read or reconstructed are logged and skipped.
    pub fn load_all_sync<E: Entity>(&self) -> Result<Vec<E>, StorageError> {
        self.ensure_connected()?;
        let schema = E::schema_info();

        let entries = match self.backend.read_all(schema) {
            Ok(entries) => entries,
            Err(err) if err.is_not_connected() => return Err(err),
            Err(err) => {
                error!(
                    backend = self.backend.name(),
                    type_name = schema.name,
                    error = %err,
                    "load_all failed"
                );
                return Ok(Vec::new());
            }
        };

        let mut objects = Vec::with_capacity(entries.len());
        for (id, record) in entries {
            match record.and_then(|record| unmarshal::<E>(record, &id)) {
                Ok(object) => objects.push(object),
                Err(err) => warn!(
                    backend = self.backend.name(),
                    type_name = schema.name,
                    id = %id,
                    error = %err,
                    "skipping unreadable entry"
                ),
            }
        }
        Ok(objects)
    }

    /// Remove the object stored under `id`. Removing nothing is not an error.
    pub fn delete_by_id_sync<E: Entity>(&self, id: &str) -> Result<(), StorageError> {
        self.ensure_connected()?;
        let schema = E::schema_info();
        let removed = self.backend.delete_raw(schema, id)?;
        debug!(
            backend = self.backend.name(),
            type_name = schema.name,
            id,
            removed,
            "delete"
        );
        Ok(())
    }

    async fn on_worker<T, F>(&self, task: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(StorageEngine) -> Result<T, StorageError> + Send + 'static,
    {
        let engine = self.clone();
        tokio::task::spawn_blocking(move || task(engine))
            .await
            .map_err(|err| StorageError::Worker(err.to_string()))?
    }

    /// [`StorageEngine::save_or_update_sync`] on a blocking worker.
    pub async fn save_or_update_async<E: Entity>(&self, object: E) -> Result<(), StorageError> {
        self.on_worker(move |engine| engine.save_or_update_sync(&object))
            .await
    }

    /// [`StorageEngine::load_by_id_sync`] on a blocking worker.
    pub async fn load_by_id_async<E: Entity>(
        &self,
        id: impl Into<String>,
    ) -> Result<Option<E>, StorageError> {
        let id = id.into();
        self.on_worker(move |engine| engine.load_by_id_sync::<E>(&id))
            .await
    }

    /// [`StorageEngine::load_all_sync`] on a blocking worker.
    pub async fn load_all_async<E: Entity>(&self) -> Result<Vec<E>, StorageError> {
        self.on_worker(|engine| engine.load_all_sync::<E>()).await
    }

    /// [`StorageEngine::delete_by_id_sync`] on a blocking worker.
    pub async fn delete_by_id_async<E: Entity>(
        &self,
        id: impl Into<String>,
    ) -> Result<(), StorageError> {
        let id = id.into();
        self.on_worker(move |engine| engine.delete_by_id_sync::<E>(&id))
            .await
    }
}
