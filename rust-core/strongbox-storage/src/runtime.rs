// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Driver runtime owned by each networked backend.
//
// The sqlx and mongodb drivers are async; the `Backend` contract is not. Each
// networked backend therefore owns a small multi-thread tokio runtime and
// drives every driver future to completion on it with `block_on`. The sync
// engine API must not be called from inside an async task; the engine's
// async forms move the call onto a blocking worker first.

use std::future::IntoFuture;

use strongbox_core::StorageError;
use tokio::runtime::{Builder, EnterGuard, Runtime};

pub(crate) struct DriverRuntime {
    runtime: Option<Runtime>,
}

impl DriverRuntime {
    pub(crate) fn new(backend: &str) -> Result<Self, StorageError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name(format!("strongbox-{backend}"))
            .enable_all()
            .build()?;
        Ok(Self {
            runtime: Some(runtime),
        })
    }

    fn runtime(&self) -> Result<&Runtime, StorageError> {
        self.runtime
            .as_ref()
            .ok_or_else(|| StorageError::BackendUnavailable("driver runtime shut down".to_string()))
    }

    /// Run `future` to completion on the driver runtime.
    ///
    /// Takes `IntoFuture` so the mongodb action builders (`find_one`,
    /// `replace_one`, `shutdown`, ...) can be passed as they are.
    pub(crate) fn block_on<F: IntoFuture>(&self, future: F) -> Result<F::Output, StorageError> {
        Ok(self.runtime()?.block_on(future.into_future()))
    }

    /// Enter the runtime's context, so driver handles can be dropped from
    /// any thread.
    pub(crate) fn enter(&self) -> Option<EnterGuard<'_>> {
        self.runtime.as_ref().map(Runtime::enter)
    }
}

impl Drop for DriverRuntime {
    fn drop(&mut self) {
        // Dropping a runtime from inside another one panics; this does not.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl std::fmt::Debug for DriverRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRuntime")
            .field("running", &self.runtime.is_some())
            .finish()
    }
}
