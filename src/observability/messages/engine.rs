// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for chain execution events.
//!
//! This module contains message types for logging events related to:
//! * Run lifecycle (start, completion, failure)
//! * Step dispatch and completion
//! * Cancellation after a step failure

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// A run started.
///
/// # Log Level
/// `info!` - Important operational event
pub struct RunStarted {
    pub step_count: usize,
    pub wave_count: usize,
    pub max_concurrency: usize,
}

impl Display for RunStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting build run: {} steps in {} waves, max_concurrency={}",
            self.step_count, self.wave_count, self.max_concurrency
        )
    }
}

impl StructuredLog for RunStarted {
    fn log(&self) {
        tracing::info!(
            step_count = self.step_count,
            wave_count = self.wave_count,
            max_concurrency = self.max_concurrency,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "run",
            span_name = name,
            step_count = self.step_count,
            wave_count = self.wave_count,
            max_concurrency = self.max_concurrency,
        )
    }
}

/// A step was handed to a worker.
///
/// # Log Level
/// `debug!` - Detailed execution flow
///
/// # Example
/// ```
/// use the_buildchain::observability::messages::engine::StepDispatched;
///
/// let msg = StepDispatched { step_id: "compile", wave: 2, in_flight: 3 };
/// assert_eq!(msg.to_string(), "Dispatching step 'compile' (wave 2, 3 in flight)");
/// ```
pub struct StepDispatched<'a> {
    pub step_id: &'a str,
    pub wave: usize,
    pub in_flight: usize,
}

impl Display for StepDispatched<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Dispatching step '{}' (wave {}, {} in flight)",
            self.step_id, self.wave, self.in_flight
        )
    }
}

impl StructuredLog for StepDispatched<'_> {
    fn log(&self) {
        tracing::debug!(
            step_id = self.step_id,
            wave = self.wave,
            in_flight = self.in_flight,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "step",
            span_name = name,
            step_id = self.step_id,
            wave = self.wave,
        )
    }
}

/// A step body returned successfully and its outputs were committed.
///
/// # Log Level
/// `debug!` - Detailed execution flow
pub struct StepCompleted<'a> {
    pub step_id: &'a str,
    pub duration: Duration,
    pub newly_ready: usize,
}

impl Display for StepCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Step '{}' completed in {:?}, {} step(s) became ready",
            self.step_id, self.duration, self.newly_ready
        )
    }
}

impl StructuredLog for StepCompleted<'_> {
    fn log(&self) {
        tracing::debug!(
            step_id = self.step_id,
            duration_ms = self.duration.as_millis() as u64,
            newly_ready = self.newly_ready,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "step_completed",
            span_name = name,
            step_id = self.step_id,
            duration = ?self.duration,
        )
    }
}

/// A step failed.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use the_buildchain::observability::messages::engine::StepFailed;
///
/// let error = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
/// let msg = StepFailed { step_id: "package", location: "src/pkg.rs:4:9", error: &error };
/// assert_eq!(msg.to_string(), "Step 'package' (src/pkg.rs:4:9) failed: disk full");
/// ```
pub struct StepFailed<'a> {
    pub step_id: &'a str,
    pub location: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for StepFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Step '{}' ({}) failed: {}",
            self.step_id, self.location, self.error
        )
    }
}

impl StructuredLog for StepFailed<'_> {
    fn log(&self) {
        tracing::error!(
            step_id = self.step_id,
            location = self.location,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "step_failed",
            span_name = name,
            step_id = self.step_id,
            error = %self.error,
        )
    }
}

/// Dispatch stopped after a failure; queued steps will not run.
///
/// # Log Level
/// `warn!` - Degraded but expected after a failure
pub struct DispatchStopped {
    pub in_flight: usize,
    pub abandoned: usize,
}

impl Display for DispatchStopped {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Stopping dispatch: waiting for {} running step(s), {} ready step(s) abandoned",
            self.in_flight, self.abandoned
        )
    }
}

impl StructuredLog for DispatchStopped {
    fn log(&self) {
        tracing::warn!(
            in_flight = self.in_flight,
            abandoned = self.abandoned,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "dispatch_stopped",
            span_name = name,
            in_flight = self.in_flight,
            abandoned = self.abandoned,
        )
    }
}

/// A run finished and its result was assembled.
///
/// # Log Level
/// `info!` - Important operational event
pub struct RunCompleted {
    pub executed_steps: usize,
    pub final_items: usize,
    pub duration: Duration,
}

impl Display for RunCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Build run completed: {} steps executed, {} final items in {:?}",
            self.executed_steps, self.final_items, self.duration
        )
    }
}

impl StructuredLog for RunCompleted {
    fn log(&self) {
        tracing::info!(
            executed_steps = self.executed_steps,
            final_items = self.final_items,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "run_completed",
            span_name = name,
            executed_steps = self.executed_steps,
            duration = ?self.duration,
        )
    }
}

/// A run failed.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct RunFailed<'a> {
    pub error: &'a dyn std::error::Error,
}

impl Display for RunFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Build run failed: {}", self.error)
    }
}

impl StructuredLog for RunFailed<'_> {
    fn log(&self) {
        tracing::error!(error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("run_failed", span_name = name, error = %self.error)
    }
}
