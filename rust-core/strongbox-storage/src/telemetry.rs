// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tracing bootstrap for host binaries.

use tracing_subscriber::EnvFilter;

fn filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Install a human-readable fmt subscriber. `RUST_LOG` wins over
/// `default_directive` (e.g. `"info"` or `"strongbox_core=debug"`).
pub fn init_tracing(default_directive: &str) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(filter(default_directive))
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

/// Install a JSON subscriber for log shippers.
pub fn init_json_tracing(default_directive: &str) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter(default_directive))
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install JSON tracing subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_install_fails() {
        // Whichever call runs first in this process wins the global slot.
        let first = init_tracing("warn");
        let second = init_json_tracing("warn");
        assert!(first.is_err() || second.is_err());
    }
}
