// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::errors::ContextError;
use crate::item::ItemId;
use crate::step::{Provenance, StepError};

/// Why a single step failed.
#[derive(Debug, Error)]
pub enum FailureCause {
    /// The step body returned an error.
    #[error("{0}")]
    Body(StepError),

    /// The step body misused its context.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// The step body panicked.
    #[error("step panicked: {message}")]
    Panicked { message: String },

    /// The optional per-step timeout elapsed. The body may still be running
    /// on its worker thread; whatever it publishes is discarded.
    #[error("step did not finish within {after:?}")]
    TimedOut { after: Duration },
}

/// A failing step paired with the cause of its failure.
#[derive(Debug)]
pub struct StepFailure {
    pub provenance: Provenance,
    pub wave: usize,
    pub cause: FailureCause,
}

impl StepFailure {
    pub fn step_id(&self) -> &str {
        self.provenance.step_id()
    }
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} failed: {}", self.provenance, self.cause)
    }
}

/// Errors raised while running an assembled chain.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// One or more step bodies failed. Failures are ordered by wave, then by
    /// declaration order, so repeated runs produce the same report.
    #[error("Build failed: {}", format_failures(.failures))]
    StepsFailed { failures: Vec<StepFailure> },

    /// The chain declares an initial item the caller did not supply.
    #[error("Initial item {item} was declared but not provided")]
    MissingInitialItem { item: ItemId },

    /// The caller supplied an item that the chain does not declare as initial.
    #[error("Item {item} was provided but is not a declared initial item")]
    UnexpectedInitialItem { item: ItemId },

    /// The run's cancellation token fired before every step completed.
    #[error("Build run was cancelled before all steps completed")]
    Cancelled,

    #[error("Internal executor error: {message}")]
    Internal { message: String },
}

impl ExecutionError {
    /// Step failures carried by this error; empty for the other variants.
    pub fn failures(&self) -> &[StepFailure] {
        match self {
            ExecutionError::StepsFailed { failures } => failures,
            _ => &[],
        }
    }
}

fn format_failures(failures: &[StepFailure]) -> String {
    let mut out = format!("{} step(s) failed", failures.len());
    for failure in failures {
        out.push_str("\n\t");
        out.push_str(&failure.to_string());
    }
    out
}
