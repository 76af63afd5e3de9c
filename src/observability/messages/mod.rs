// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Every log line the crate emits is one of these structs. Each implements
//! `Display` for the human-readable text and [`StructuredLog`] to emit it at
//! its documented level with structured fields attached.
//!
//! # Organization
//!
//! * `assembly` - chain assembly: pruning, problems, the assembled shape
//! * `engine` - run lifecycle and per-step execution events
//!
//! # Usage Pattern
//!
//! ```rust
//! use the_buildchain::observability::messages::engine::RunStarted;
//! use the_buildchain::observability::messages::StructuredLog;
//!
//! let msg = RunStarted {
//!     step_count: 5,
//!     wave_count: 3,
//!     max_concurrency: 4,
//! };
//!
//! msg.log();
//! assert!(msg.to_string().contains("5 steps"));
//! ```

use tracing::Span;

pub mod assembly;
pub mod engine;

/// A log message that knows its own level and structured fields.
pub trait StructuredLog {
    /// Emit the message at its documented level.
    fn log(&self);

    /// Open a span carrying the message's fields.
    fn span(&self, name: &str) -> Span;
}
