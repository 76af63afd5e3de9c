// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability: structured log messages and subscriber setup.
//!
//! Call sites never format ad-hoc log strings. They build a message from
//! [`messages`] and call [`messages::StructuredLog::log`] on it, so the text
//! and the structured fields stay together in one place.
//!
//! ```rust
//! use the_buildchain::observability::messages::assembly::AssemblyFailed;
//! use the_buildchain::observability::messages::StructuredLog;
//!
//! AssemblyFailed { problem_count: 2 }.log();
//! ```

use tracing_subscriber::EnvFilter;

pub mod messages;

/// Environment variable holding an `EnvFilter` directive, e.g.
/// `BUILDCHAIN_LOG=the_buildchain=debug`.
pub const LOG_ENV_VAR: &str = "BUILDCHAIN_LOG";

/// Install a fmt subscriber filtered by `BUILDCHAIN_LOG`, or by
/// `default_level` when the variable is unset or invalid.
///
/// Safe to call more than once; only the first call installs anything.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
