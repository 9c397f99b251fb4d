// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine registry: where host subsystems look up the storage they were
// configured with.
//
// A backend can be found by its concrete type, by the abstract
// `StorageEngine` slot, by both, or not at all, depending on the
// `RegistrationMode` it was registered with.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::Backend;
use crate::engine::StorageEngine;

/// How [`EngineRegistry::register`] exposes a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationMode {
    /// Under its concrete backend type only.
    #[default]
    Concrete,
    /// Under its concrete type and as the abstract engine.
    Dual,
    /// Nowhere; the caller wires the returned engine by hand.
    Detached,
}

impl std::str::FromStr for RegistrationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "concrete" => Ok(RegistrationMode::Concrete),
            "dual" => Ok(RegistrationMode::Dual),
            "detached" => Ok(RegistrationMode::Detached),
            other => Err(format!("unknown registration mode '{other}'")),
        }
    }
}

struct ConcreteEntry {
    backend: Arc<dyn Any + Send + Sync>,
    engine: StorageEngine,
}

#[derive(Default)]
struct Entries {
    concrete: HashMap<TypeId, ConcreteEntry>,
    engine: Option<StorageEngine>,
}

/// Process-wide lookup of registered backends.
#[derive(Default)]
pub struct EngineRegistry {
    entries: RwLock<Entries>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `backend` according to `mode` and return its engine handle.
    ///
    /// A later registration of the same concrete type (or, in `Dual` mode,
    /// of the abstract engine) replaces the earlier one.
    pub fn register<B: Backend>(&self, backend: Arc<B>, mode: RegistrationMode) -> StorageEngine {
        let engine = StorageEngine::from_arc(backend.clone());
        if mode == RegistrationMode::Detached {
            debug!(backend = backend.name(), "backend left unregistered");
            return engine;
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.concrete.insert(
            TypeId::of::<B>(),
            ConcreteEntry {
                backend: backend.clone(),
                engine: engine.clone(),
            },
        );
        if mode == RegistrationMode::Dual {
            entries.engine = Some(engine.clone());
        }
        debug!(backend = backend.name(), ?mode, "backend registered");
        engine
    }

    /// The backend registered under concrete type `B`.
    pub fn get<B: Backend>(&self) -> Option<Arc<B>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .concrete
            .get(&TypeId::of::<B>())
            .and_then(|entry| entry.backend.clone().downcast::<B>().ok())
    }

    /// The engine over the backend registered under concrete type `B`.
    pub fn engine_for<B: Backend>(&self) -> Option<StorageEngine> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .concrete
            .get(&TypeId::of::<B>())
            .map(|entry| entry.engine.clone())
    }

    /// The engine registered in the abstract slot (`Dual` mode only).
    pub fn engine(&self) -> Option<StorageEngine> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .engine
            .clone()
    }

    pub fn is_registered<B: Backend>(&self) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .concrete
            .contains_key(&TypeId::of::<B>())
    }

    /// Forget every registration.
    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        *entries = Entries::default();
    }
}
