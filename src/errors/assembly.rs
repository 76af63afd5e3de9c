// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

use thiserror::Error;

use crate::item::ItemId;
use crate::step::Provenance;

/// One hop of a dependency cycle: `step` produces `item`, which the next
/// step in the cycle consumes. The last hop feeds back into the first step.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleLink {
    pub step: Provenance,
    pub item: ItemId,
}

/// A single structural problem found while assembling a chain.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssemblyProblem {
    /// Two or more declarations share the same step identity.
    #[error("Duplicate step id '{step_id}' declared at {}", join_locations(.locations))]
    DuplicateStepId {
        step_id: String,
        locations: Vec<Provenance>,
    },

    /// A single-valued item has more than one producer in the same override class.
    #[error(
        "Multiple {}producers of item {item}: {}",
        overridable_prefix(.overridable),
        join_locations(.producers)
    )]
    DuplicateProducer {
        item: ItemId,
        overridable: bool,
        producers: Vec<Provenance>,
    },

    /// A step declares production of an item the caller supplies up front.
    #[error("Item {item} is an initial item and cannot be produced by step {producer}")]
    InitialItemProduced { item: ItemId, producer: Provenance },

    /// A required consumer has no surviving producer.
    #[error("No producers for required item {item} consumed by step {consumer}")]
    MissingProducer { item: ItemId, consumer: Provenance },

    /// A step declares an optional dependency on an item that does not allow it.
    #[error("Step {consumer} consumes {item} optionally, but the item is not weak-consumable")]
    WeakConsumeNotAllowed { item: ItemId, consumer: Provenance },

    /// The producer/consumer relation loops back on itself.
    #[error("Cycle detected: {}", format_cycle(.cycle))]
    DependencyCycle { cycle: Vec<CycleLink> },
}

impl AssemblyProblem {
    /// Step ids named by this problem, in the order they appear in it.
    pub fn step_ids(&self) -> Vec<&str> {
        match self {
            AssemblyProblem::DuplicateStepId { locations, .. } => {
                locations.iter().map(|p| p.step_id()).collect()
            }
            AssemblyProblem::DuplicateProducer { producers, .. } => {
                producers.iter().map(|p| p.step_id()).collect()
            }
            AssemblyProblem::InitialItemProduced { producer, .. } => vec![producer.step_id()],
            AssemblyProblem::MissingProducer { consumer, .. }
            | AssemblyProblem::WeakConsumeNotAllowed { consumer, .. } => vec![consumer.step_id()],
            AssemblyProblem::DependencyCycle { cycle } => {
                cycle.iter().map(|link| link.step.step_id()).collect()
            }
        }
    }
}

fn overridable_prefix(overridable: &bool) -> &'static str {
    if *overridable {
        "overridable "
    } else {
        ""
    }
}

fn join_locations(locations: &[Provenance]) -> String {
    locations
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_cycle(cycle: &[CycleLink]) -> String {
    let mut out = String::new();
    for link in cycle {
        out.push_str(&format!("\n\t\t{} produced {}\n\t\tto ", link.step, link.item));
    }
    if let Some(first) = cycle.first() {
        out.push_str(&first.step.to_string());
    }
    out
}

/// Every structural problem found in one assembly pass.
///
/// Assembly never stops at the first problem: declarations are fixed by
/// editing them, so the caller gets the full list at once.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyError {
    problems: Vec<AssemblyProblem>,
}

impl AssemblyError {
    pub(crate) fn new(problems: Vec<AssemblyProblem>) -> Self {
        Self { problems }
    }

    pub fn problems(&self) -> &[AssemblyProblem] {
        &self.problems
    }

    pub fn into_problems(self) -> Vec<AssemblyProblem> {
        self.problems
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn has_cycle(&self) -> bool {
        self.problems
            .iter()
            .any(|p| matches!(p, AssemblyProblem::DependencyCycle { .. }))
    }
}

impl fmt::Display for AssemblyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Build chain assembly failed with {} problem(s)",
            self.problems.len()
        )?;
        for (i, problem) in self.problems.iter().enumerate() {
            write!(f, "\n  [{}] {}", i + 1, problem)?;
        }
        Ok(())
    }
}

impl std::error::Error for AssemblyError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Item, SimpleItem};

    struct Config;
    impl Item for Config {}
    impl SimpleItem for Config {}

    #[test]
    fn test_missing_producer_names_consumer_and_item() {
        let consumer = Provenance::new("read_config", "src/steps.rs", 10, 5);
        let problem = AssemblyProblem::MissingProducer {
            item: ItemId::simple::<Config>(),
            consumer,
        };
        let message = problem.to_string();
        assert!(message.contains("read_config"));
        assert!(message.contains("src/steps.rs:10:5"));
        assert!(message.contains("Config"));
    }

    #[test]
    fn test_cycle_lists_every_step() {
        let cycle = vec![
            CycleLink {
                step: Provenance::new("a", "lib.rs", 1, 1),
                item: ItemId::simple::<Config>(),
            },
            CycleLink {
                step: Provenance::new("b", "lib.rs", 2, 1),
                item: ItemId::simple::<Config>(),
            },
        ];
        let problem = AssemblyProblem::DependencyCycle { cycle };
        assert_eq!(problem.step_ids(), vec!["a", "b"]);
        let message = problem.to_string();
        assert!(message.starts_with("Cycle detected:"));
        assert!(message.contains("'a'") && message.contains("'b'"));
    }

    #[test]
    fn test_aggregate_display_enumerates_problems() {
        let error = AssemblyError::new(vec![
            AssemblyProblem::DuplicateStepId {
                step_id: "x".into(),
                locations: vec![
                    Provenance::new("x", "a.rs", 1, 1),
                    Provenance::new("x", "b.rs", 2, 2),
                ],
            },
            AssemblyProblem::MissingProducer {
                item: ItemId::simple::<Config>(),
                consumer: Provenance::new("y", "c.rs", 3, 3),
            },
        ]);
        let message = error.to_string();
        assert!(message.contains("2 problem(s)"));
        assert!(message.contains("[1] Duplicate step id 'x'"));
        assert!(message.contains("[2] No producers"));
        assert!(!error.has_cycle());
    }
}
