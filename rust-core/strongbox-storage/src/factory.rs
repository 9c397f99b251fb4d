// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Build the configured backend, connect it, and hand it to the host.
//
// Each concrete backend is constructed in one place (`build`) and passed to
// a `Sink`, which either erases it to `Arc<dyn Backend>` or registers it
// under its concrete type in an `EngineRegistry`.

use std::sync::Arc;

use strongbox_core::{
    Backend, EngineRegistry, InMemoryBackend, RegistrationMode, StorageEngine, StorageError,
};
use tracing::info;

use crate::config::{BackendKind, StorageConfig};
use crate::json::JsonFileBackend;

trait Sink {
    type Output;

    fn accept<B: Backend>(self, backend: B) -> Result<Self::Output, StorageError>;
}

struct Erased;

impl Sink for Erased {
    type Output = Arc<dyn Backend>;

    fn accept<B: Backend>(self, backend: B) -> Result<Self::Output, StorageError> {
        Ok(Arc::new(backend))
    }
}

struct Registered<'a> {
    registry: &'a EngineRegistry,
    mode: RegistrationMode,
}

impl Sink for Registered<'_> {
    type Output = StorageEngine;

    fn accept<B: Backend>(self, backend: B) -> Result<Self::Output, StorageError> {
        Ok(self.registry.register(Arc::new(backend), self.mode))
    }
}

#[cfg(not(all(
    feature = "yaml",
    feature = "sql",
    feature = "mongo",
    feature = "redb-backend"
)))]
fn unavailable(kind: BackendKind, feature: &str) -> StorageError {
    StorageError::BackendUnavailable(format!(
        "backend '{kind}' needs the '{feature}' feature of strongbox-storage"
    ))
}

fn connected<B: Backend, S: Sink>(backend: B, sink: S) -> Result<S::Output, StorageError> {
    backend.connect()?;
    info!(backend = backend.name(), "storage backend ready");
    sink.accept(backend)
}

fn build<S: Sink>(config: &StorageConfig, sink: S) -> Result<S::Output, StorageError> {
    match config.backend {
        BackendKind::Json => connected(JsonFileBackend::new(&config.data_root), sink),
        BackendKind::Yaml => {
            #[cfg(feature = "yaml")]
            {
                connected(crate::yaml::YamlFileBackend::new(&config.data_root), sink)
            }
            #[cfg(not(feature = "yaml"))]
            {
                let _ = sink;
                Err(unavailable(config.backend, "yaml"))
            }
        }
        BackendKind::Mysql | BackendKind::Sqlite | BackendKind::Postgres => {
            #[cfg(feature = "sql")]
            {
                let url = config
                    .sql_url()
                    .map_err(|e| StorageError::BackendUnavailable(e.to_string()))?;
                let backend = crate::sql::SqlBackend::new(url, config.sql.max_connections)?;
                connected(backend, sink)
            }
            #[cfg(not(feature = "sql"))]
            {
                let _ = sink;
                Err(unavailable(config.backend, "sql"))
            }
        }
        BackendKind::Mongodb => {
            #[cfg(feature = "mongo")]
            {
                let backend =
                    crate::mongo::MongoBackend::new(&config.mongo.uri, &config.mongo.database)?;
                connected(backend, sink)
            }
            #[cfg(not(feature = "mongo"))]
            {
                let _ = sink;
                Err(unavailable(config.backend, "mongo"))
            }
        }
        BackendKind::Redb => {
            #[cfg(feature = "redb-backend")]
            {
                let backend = crate::redb_backend::RedbBackend::open(config.redb_path())?;
                connected(backend, sink)
            }
            #[cfg(not(feature = "redb-backend"))]
            {
                let _ = sink;
                Err(unavailable(config.backend, "redb-backend"))
            }
        }
        BackendKind::Memory => connected(InMemoryBackend::new(), sink),
    }
}

/// Open and connect the configured backend.
pub fn open_backend(config: &StorageConfig) -> Result<Arc<dyn Backend>, StorageError> {
    build(config, Erased)
}

/// Open and connect the configured backend, register it in `registry`
/// with the configured mode, and return its engine.
pub fn open_engine(
    config: &StorageConfig,
    registry: &EngineRegistry,
) -> Result<StorageEngine, StorageError> {
    build(
        config,
        Registered {
            registry,
            mode: config.registration,
        },
    )
}
