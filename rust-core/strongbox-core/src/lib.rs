// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Strongbox Core
//
// Metadata-driven object persistence. A domain type describes itself once
// (usually with `#[derive(Persist)]`); the marshaler turns instances into a
// neutral `Record` plus identifier, the unmarshaler rebuilds them through
// the type's reconstruction constructor, and `StorageEngine` runs the
// save/load/delete contract over any `Backend`.
//
// # Modules
//
// - [`schema`] -- Field metadata, `Schema<T>` and its builder, `Entity`.
// - [`persist`] -- The `Persist` trait and its std impls.
// - [`classify`] -- Scalar / container / complex classification.
// - [`marshal`] and [`unmarshal`] -- Object <-> record conversion.
// - [`engine`] -- `StorageEngine`, sync and async.
// - [`backend`] -- The narrow `Backend` trait adapters implement.
// - [`registry`] -- Concrete / dual / detached backend registration.
// - [`memory`] and [`metrics`] -- In-memory backend and a metrics wrapper.
//
// # Example
//
// ```rust
// use strongbox_core::{InMemoryBackend, Persist, StorageEngine};
//
// #[derive(Debug, PartialEq, Persist)]
// struct Profile {
//     #[persist(id)]
//     id: String,
//     #[persist(default = "0")]
//     points: i32,
//     tags: Vec<String>,
// }
//
// let engine = StorageEngine::new(InMemoryBackend::new());
// let profile = Profile { id: "u1".into(), points: 10, tags: vec!["a".into(), "b".into()] };
// engine.save_or_update_sync(&profile).unwrap();
//
// let loaded: Profile = engine.load_by_id_sync("u1").unwrap().unwrap();
// assert_eq!(loaded, profile);
// ```

// Lets `#[derive(Persist)]` name `::strongbox_core` from inside this crate.
extern crate self as strongbox_core;

pub mod backend;
pub mod classify;
pub mod convert;
pub mod engine;
pub mod error;
pub mod marshal;
pub mod memory;
pub mod metrics;
pub mod persist;
pub mod registry;
pub mod schema;
pub mod unmarshal;
pub mod value;

#[cfg(test)]
mod fixtures;

pub use backend::{Backend, ScannedRecord};
pub use classify::Class;
pub use engine::StorageEngine;
pub use error::{ConversionError, StorageError};
pub use marshal::{marshal, Marshaled};
pub use memory::InMemoryBackend;
pub use metrics::{BackendStats, MetricsBackend};
pub use persist::{LoadContext, Persist};
pub use registry::{EngineRegistry, RegistrationMode};
pub use schema::{
    Constructor, Entity, FieldSchema, FloatWidth, IntWidth, Kind, Schema, SchemaBuilder,
    SchemaInfo,
};
pub use unmarshal::{unmarshal, Arguments, FieldOutcome};
pub use value::{Record, Value};

/// `#[derive(Persist)]`: generates the `Entity` and `Persist` impls.
pub use strongbox_derive::Persist;
