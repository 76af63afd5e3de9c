// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Chain assembly: from a bag of step declarations to a validated, pruned,
//! layered execution graph.
//!
//! # Assembly Pipeline
//!
//! 1. **Declaration checks**: unique step ids, at most one producer per
//!    single-valued item within each override class, no producers of
//!    initial items, optional consumption only of weak-consumable items
//! 2. **Pruning**: backward reachability from final items and always-run
//!    steps, to a fixpoint
//! 3. **Wiring**: choose the producers of each item among the survivors and
//!    derive producer -> consumer edges
//! 4. **Required inputs**: every required consume edge has a producer
//! 5. **Layering**: Kahn's algorithm assigns each step a wave; if it stalls,
//!    a DFS extracts every cycle for the report
//!
//! Every problem found along the way is collected; the caller gets either a
//! [`Chain`] or one [`AssemblyError`](crate::errors::AssemblyError) listing
//! all of them.
//!
//! ```rust
//! use the_buildchain::chain::ChainBuilder;
//! use the_buildchain::item::{Item, ItemFlags, ItemRegistry, SimpleItem};
//! use the_buildchain::step::{StepContext, StepDeclaration, StepError};
//!
//! struct Greeting(String);
//! impl Item for Greeting {}
//! impl SimpleItem for Greeting {}
//!
//! let mut registry = ItemRegistry::new();
//! registry.register::<Greeting>(ItemFlags::FINAL);
//!
//! let mut builder = ChainBuilder::new(registry);
//! builder.add_step(
//!     StepDeclaration::new("greet", |ctx: &mut StepContext| -> Result<(), StepError> {
//!         ctx.publish(Greeting("hello".into()))?;
//!         Ok(())
//!     })
//!     .produces::<Greeting>(),
//! );
//! let chain = builder.build().unwrap();
//! assert_eq!(chain.len(), 1);
//! assert_eq!(chain.waves().len(), 1);
//! ```

mod builder;
mod dependency_graph;
mod description;
mod graph_output;
mod pruning;
mod validation;

#[cfg(test)]
mod integration_tests;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::item::ItemId;
use crate::step::{Provenance, StepDeclaration};

pub use builder::ChainBuilder;
pub use description::{ChainDescription, EdgeDescription, StepDescription};

/// Position of a step in an assembled chain.
///
/// Surviving steps keep their relative declaration order, so comparing two
/// indices compares declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StepIndex(usize);

impl StepIndex {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StepIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A surviving step with its resolved position in the graph.
#[derive(Debug, Clone)]
pub struct ChainStep {
    declaration: Arc<StepDeclaration>,
    index: StepIndex,
    wave: usize,
    upstream: BTreeSet<StepIndex>,
    downstream: BTreeSet<StepIndex>,
    outputs: BTreeSet<ItemId>,
}

impl ChainStep {
    pub fn declaration(&self) -> &Arc<StepDeclaration> {
        &self.declaration
    }

    pub fn id(&self) -> &str {
        self.declaration.id()
    }

    pub fn provenance(&self) -> &Provenance {
        self.declaration.provenance()
    }

    pub fn index(&self) -> StepIndex {
        self.index
    }

    /// Dependency depth: 0 for steps with no upstream producers.
    pub fn wave(&self) -> usize {
        self.wave
    }

    /// Steps whose outputs this step consumes.
    pub fn upstream(&self) -> &BTreeSet<StepIndex> {
        &self.upstream
    }

    /// Steps that consume something this step produces.
    pub fn downstream(&self) -> &BTreeSet<StepIndex> {
        &self.downstream
    }

    /// Items this step is the wired producer of. A declared production that
    /// lost to a regular producer is not listed.
    pub fn outputs(&self) -> &BTreeSet<ItemId> {
        &self.outputs
    }
}

struct ChainInner {
    steps: Vec<ChainStep>,
    waves: Vec<Vec<StepIndex>>,
    edges: BTreeMap<(StepIndex, StepIndex), BTreeSet<ItemId>>,
    initial_items: BTreeSet<ItemId>,
    final_items: BTreeSet<ItemId>,
    channels: BTreeMap<ItemId, usize>,
    pruned: Vec<Provenance>,
    declared_steps: usize,
}

/// An assembled, validated build chain.
///
/// Immutable and cheap to clone; one chain can be run any number of times.
#[derive(Clone)]
pub struct Chain {
    inner: Arc<ChainInner>,
}

impl Chain {
    pub fn len(&self) -> usize {
        self.inner.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.steps.is_empty()
    }

    /// Surviving steps in declaration order.
    pub fn steps(&self) -> &[ChainStep] {
        &self.inner.steps
    }

    pub fn step(&self, index: StepIndex) -> Option<&ChainStep> {
        self.inner.steps.get(index.0)
    }

    pub fn find(&self, step_id: &str) -> Option<&ChainStep> {
        self.inner.steps.iter().find(|step| step.id() == step_id)
    }

    /// Steps grouped by wave, each group in declaration order.
    pub fn waves(&self) -> &[Vec<StepIndex>] {
        &self.inner.waves
    }

    /// Producer -> consumer edges with the items that flow along each.
    pub fn edges(&self) -> impl Iterator<Item = (StepIndex, StepIndex, &BTreeSet<ItemId>)> {
        self.inner
            .edges
            .iter()
            .map(|((from, to), items)| (*from, *to, items))
    }

    pub fn initial_items(&self) -> &BTreeSet<ItemId> {
        &self.inner.initial_items
    }

    /// Final items: those flagged in the registry plus those added on the builder.
    pub fn final_items(&self) -> &BTreeSet<ItemId> {
        &self.inner.final_items
    }

    /// Steps removed during pruning, in declaration order.
    pub fn pruned_steps(&self) -> &[Provenance] {
        &self.inner.pruned
    }

    pub fn declared_steps(&self) -> usize {
        self.inner.declared_steps
    }

    /// Every item the chain touches, with its number of wired producers.
    pub(crate) fn channels(&self) -> &BTreeMap<ItemId, usize> {
        &self.inner.channels
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("steps", &self.inner.steps.iter().map(|s| s.id()).collect::<Vec<_>>())
            .field("waves", &self.inner.waves)
            .field("pruned", &self.inner.pruned.len())
            .finish()
    }
}
