// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for chain assembly.

use std::fmt::{Display, Formatter};

use tracing::Span;

use crate::errors::AssemblyProblem;
use crate::observability::messages::StructuredLog;
use crate::step::Provenance;

/// A chain was assembled successfully.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ChainAssembled {
    pub declared_steps: usize,
    pub surviving_steps: usize,
    pub wave_count: usize,
}

impl Display for ChainAssembled {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Assembled build chain: {} of {} declared steps kept, {} waves",
            self.surviving_steps, self.declared_steps, self.wave_count
        )
    }
}

impl StructuredLog for ChainAssembled {
    fn log(&self) {
        tracing::info!(
            declared_steps = self.declared_steps,
            surviving_steps = self.surviving_steps,
            wave_count = self.wave_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "chain_assembled",
            span_name = name,
            declared_steps = self.declared_steps,
            surviving_steps = self.surviving_steps,
            wave_count = self.wave_count,
        )
    }
}

/// A step was removed because nothing needs its output.
///
/// # Log Level
/// `debug!` - Expected during normal assembly
///
/// # Example
/// ```
/// use the_buildchain::observability::messages::assembly::StepPruned;
/// use the_buildchain::step::Provenance;
///
/// let provenance = Provenance::new("generate_docs", "src/docs.rs", 12, 5);
/// let msg = StepPruned { provenance: &provenance };
/// assert_eq!(
///     msg.to_string(),
///     "Pruned step 'generate_docs' (src/docs.rs:12:5): no final item depends on its output"
/// );
/// ```
pub struct StepPruned<'a> {
    pub provenance: &'a Provenance,
}

impl Display for StepPruned<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pruned step {}: no final item depends on its output",
            self.provenance
        )
    }
}

impl StructuredLog for StepPruned<'_> {
    fn log(&self) {
        tracing::debug!(
            step_id = self.provenance.step_id(),
            location = %self.provenance.location(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "step_pruned",
            span_name = name,
            step_id = self.provenance.step_id(),
        )
    }
}

/// One structural problem found during assembly.
///
/// # Log Level
/// `error!` - The chain cannot be built
pub struct AssemblyProblemDetected<'a> {
    pub problem: &'a AssemblyProblem,
}

impl Display for AssemblyProblemDetected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Assembly problem: {}", self.problem)
    }
}

impl StructuredLog for AssemblyProblemDetected<'_> {
    fn log(&self) {
        tracing::error!(
            steps = ?self.problem.step_ids(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "assembly_problem",
            span_name = name,
            steps = ?self.problem.step_ids(),
        )
    }
}

/// Assembly finished with problems.
///
/// # Log Level
/// `error!` - The chain cannot be built
pub struct AssemblyFailed {
    pub problem_count: usize,
}

impl Display for AssemblyFailed {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Build chain assembly failed with {} problem(s)",
            self.problem_count
        )
    }
}

impl StructuredLog for AssemblyFailed {
    fn log(&self) {
        tracing::error!(problem_count = self.problem_count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "assembly_failed",
            span_name = name,
            problem_count = self.problem_count,
        )
    }
}
