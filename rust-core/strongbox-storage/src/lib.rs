// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Strongbox storage backends.
//
// Adapters behind the `strongbox_core::Backend` contract:
//
// - `JsonFileBackend` / `YamlFileBackend`: one document per object under
//   `<data_root>/<TypeName>/<id>.json|.yml`.
// - `SqlBackend`: MySQL, SQLite and PostgreSQL, one table per type, upsert
//   on save (feature `sql`).
// - `MongoBackend`: one collection per type, `_id` is the identifier
//   (feature `mongo`).
// - `RedbBackend`: embedded single-file store (feature `redb-backend`).
//
// `open_backend` / `open_engine` build whichever one a `StorageConfig`
// selects, and `telemetry` installs the tracing subscriber.

pub mod config;
pub mod factory;
pub mod flat_file;
pub mod json;
#[cfg(feature = "mongo")]
pub mod mongo;
#[cfg(feature = "redb-backend")]
pub mod redb_backend;
#[cfg(any(feature = "sql", feature = "mongo"))]
mod runtime;
#[cfg(feature = "sql")]
pub mod sql;
pub mod telemetry;
#[cfg(feature = "yaml")]
pub mod yaml;

pub use config::{BackendKind, ConfigError, MongoConfig, SqlConfig, StorageConfig};
pub use factory::{open_backend, open_engine};
pub use flat_file::{Codec, FlatFileBackend};
pub use json::{JsonCodec, JsonFileBackend};
#[cfg(feature = "mongo")]
pub use mongo::MongoBackend;
#[cfg(feature = "redb-backend")]
pub use redb_backend::RedbBackend;
#[cfg(feature = "sql")]
pub use sql::{SqlBackend, SqlDialect};
#[cfg(feature = "yaml")]
pub use yaml::{YamlCodec, YamlFileBackend};
