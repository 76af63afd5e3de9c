// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::chain::dependency_graph::{group_by_wave, DependencyGraph};
use crate::chain::{pruning, validation, Chain, ChainInner, ChainStep, StepIndex};
use crate::errors::AssemblyError;
use crate::item::{ItemId, ItemRegistry, MultiItem, SimpleItem};
use crate::observability::messages::assembly::{
    AssemblyFailed, AssemblyProblemDetected, ChainAssembled, StepPruned,
};
use crate::observability::messages::StructuredLog;
use crate::step::StepDeclaration;

/// Collects step declarations and item roles, then assembles a [`Chain`].
#[derive(Debug)]
pub struct ChainBuilder {
    registry: ItemRegistry,
    steps: Vec<Arc<StepDeclaration>>,
    initial_items: BTreeSet<ItemId>,
    final_items: BTreeSet<ItemId>,
}

impl ChainBuilder {
    pub fn new(registry: ItemRegistry) -> Self {
        Self {
            registry,
            steps: Vec::new(),
            initial_items: BTreeSet::new(),
            final_items: BTreeSet::new(),
        }
    }

    pub fn registry(&self) -> &ItemRegistry {
        &self.registry
    }

    pub fn add_step(&mut self, step: StepDeclaration) -> &mut Self {
        self.steps.push(Arc::new(step));
        self
    }

    pub fn add_steps<I>(&mut self, steps: I) -> &mut Self
    where
        I: IntoIterator<Item = StepDeclaration>,
    {
        self.steps.extend(steps.into_iter().map(Arc::new));
        self
    }

    /// Declare `T` as supplied by the caller when the chain is run.
    pub fn add_initial<T: SimpleItem>(&mut self) -> &mut Self {
        self.initial_items.insert(ItemId::simple::<T>());
        self
    }

    pub fn add_initial_multi<T: MultiItem>(&mut self) -> &mut Self {
        self.initial_items.insert(ItemId::multi::<T>());
        self
    }

    /// Mark `T` final for this chain only, on top of the registry's flags.
    pub fn add_final<T: SimpleItem>(&mut self) -> &mut Self {
        self.final_items.insert(ItemId::simple::<T>());
        self
    }

    pub fn add_final_multi<T: MultiItem>(&mut self) -> &mut Self {
        self.final_items.insert(ItemId::multi::<T>());
        self
    }

    /// Validate, prune, wire and layer the declarations.
    ///
    /// All problems found are returned together in one [`AssemblyError`].
    pub fn build(self) -> Result<Chain, AssemblyError> {
        let ChainBuilder {
            registry,
            steps,
            initial_items,
            mut final_items,
        } = self;
        final_items.extend(registry.final_items());

        let mut problems = validation::check_declarations(&steps, &initial_items, &registry);

        let survivors = pruning::surviving_steps(&steps, &final_items);
        let graph = DependencyGraph::wire(&steps, &survivors, &initial_items);
        problems.extend(validation::check_required_inputs(&steps, &graph, &initial_items));

        let waves = graph.waves();
        if waves.is_none() {
            problems.extend(validation::find_cycles(&steps, &graph));
        }

        let waves = match waves {
            Some(waves) if problems.is_empty() => waves,
            _ => {
                for problem in &problems {
                    AssemblyProblemDetected { problem }.log();
                }
                AssemblyFailed {
                    problem_count: problems.len(),
                }
                .log();
                return Err(AssemblyError::new(problems));
            }
        };

        let survivor_set: BTreeSet<usize> = survivors.iter().copied().collect();
        let pruned: Vec<_> = steps
            .iter()
            .enumerate()
            .filter(|(position, _)| !survivor_set.contains(position))
            .map(|(_, declaration)| declaration.provenance().clone())
            .collect();
        for provenance in &pruned {
            StepPruned { provenance }.log();
        }

        let chain_steps: Vec<ChainStep> = (0..graph.len())
            .map(|node| {
                let index = StepIndex(node);
                ChainStep {
                    declaration: steps[graph.declaration_index(index)].clone(),
                    index,
                    wave: waves[node],
                    upstream: graph.upstream(index).clone(),
                    downstream: graph.downstream(index).clone(),
                    outputs: graph.outputs(index).clone(),
                }
            })
            .collect();

        let channels = channels(&chain_steps, &graph, &initial_items, &final_items);
        let waves = group_by_wave(&waves);

        ChainAssembled {
            declared_steps: steps.len(),
            surviving_steps: chain_steps.len(),
            wave_count: waves.len(),
        }
        .log();

        Ok(Chain {
            inner: Arc::new(ChainInner {
                steps: chain_steps,
                waves,
                edges: graph.edge_items().clone(),
                initial_items,
                final_items,
                channels,
                pruned,
                declared_steps: steps.len(),
            }),
        })
    }
}

/// Every item a run needs storage for, with its wired producer count.
fn channels(
    steps: &[ChainStep],
    graph: &DependencyGraph,
    initial_items: &BTreeSet<ItemId>,
    final_items: &BTreeSet<ItemId>,
) -> BTreeMap<ItemId, usize> {
    let mut channels: BTreeMap<ItemId, usize> = graph
        .producer_map()
        .iter()
        .map(|(item, producers)| (*item, producers.len()))
        .collect();

    let consumed = steps
        .iter()
        .flat_map(|step| step.declaration().consumed().map(|(item, _)| *item));
    for item in consumed
        .chain(initial_items.iter().copied())
        .chain(final_items.iter().copied())
    {
        channels.entry(item).or_insert(0);
    }
    channels
}
