// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod assembly;
mod config;
mod context;
mod execution;

pub use assembly::{AssemblyError, AssemblyProblem, CycleLink};
pub use config::ConfigError;
pub use context::ContextError;
pub use execution::{ExecutionError, FailureCause, StepFailure};

/// Either of the two top-level failure kinds, for callers that assemble and
/// run in one go.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}
