//! Structural checks run during chain assembly.
//!
//! Checks come in three groups, each returning every problem it finds rather
//! than stopping at the first:
//!
//! 1. **Declaration checks** look at every declaration, pruned or not:
//!    duplicate step ids, duplicate producers of single-valued items, steps
//!    producing initial items, and optional consumption of items that are
//!    not weak-consumable.
//! 2. **Required inputs** look at survivors only: each required consume edge
//!    must have a wired producer or be an initial item.
//! 3. **Cycle detection** runs a DFS over the wired graph.
//!
//! # Cycle Detection Algorithm
//! Uses **Depth-First Search (DFS) with an explicit stack**:
//! - **White (unvisited)**: node not yet explored
//! - **Gray (on the stack)**: node on the current DFS path
//! - **Black (done)**: node and all its descendants explored
//!
//! Reaching a gray node closes a cycle; the path segment from that node to
//! the current one is the cycle. Unlike a plain acyclicity check the search
//! keeps going after the first cycle, so every independent cycle is
//! reported. Cycles found from different entry points are deduplicated by
//! rotating each to start at its lowest node.
//!
//! **Time Complexity**: O(V + E)
//! **Space Complexity**: O(V) for colors, path and frames

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::chain::dependency_graph::DependencyGraph;
use crate::chain::StepIndex;
use crate::errors::{AssemblyProblem, CycleLink};
use crate::item::{Cardinality, ItemId, ItemRegistry};
use crate::step::{Provenance, StepDeclaration};

/// Checks that depend only on the declarations themselves.
pub(crate) fn check_declarations(
    declarations: &[Arc<StepDeclaration>],
    initial_items: &BTreeSet<ItemId>,
    registry: &ItemRegistry,
) -> Vec<AssemblyProblem> {
    let mut problems = Vec::new();
    problems.extend(duplicate_step_ids(declarations));
    problems.extend(duplicate_producers(declarations));
    problems.extend(produced_initial_items(declarations, initial_items));
    problems.extend(ineligible_weak_consumers(declarations, registry));
    problems
}

/// Step ids must be unique. Reported once per id, listing every location.
fn duplicate_step_ids(declarations: &[Arc<StepDeclaration>]) -> Vec<AssemblyProblem> {
    let mut by_id: BTreeMap<&str, Vec<Provenance>> = BTreeMap::new();
    for declaration in declarations {
        by_id
            .entry(declaration.id())
            .or_default()
            .push(declaration.provenance().clone());
    }

    by_id
        .into_iter()
        .filter(|(_, locations)| locations.len() > 1)
        .map(|(step_id, locations)| AssemblyProblem::DuplicateStepId {
            step_id: step_id.to_string(),
            locations,
        })
        .collect()
}

/// A single-valued item may have one regular and one overridable producer,
/// but never two of the same class.
fn duplicate_producers(declarations: &[Arc<StepDeclaration>]) -> Vec<AssemblyProblem> {
    let mut by_item: BTreeMap<(ItemId, bool), Vec<Provenance>> = BTreeMap::new();
    for declaration in declarations {
        for (item, flags) in declaration.produced() {
            if item.cardinality() == Cardinality::Single {
                by_item
                    .entry((*item, flags.overridable))
                    .or_default()
                    .push(declaration.provenance().clone());
            }
        }
    }

    by_item
        .into_iter()
        .filter(|(_, producers)| producers.len() > 1)
        .map(|((item, overridable), producers)| AssemblyProblem::DuplicateProducer {
            item,
            overridable,
            producers,
        })
        .collect()
}

/// Initial single-valued items come from the caller; no step may produce them.
fn produced_initial_items(
    declarations: &[Arc<StepDeclaration>],
    initial_items: &BTreeSet<ItemId>,
) -> Vec<AssemblyProblem> {
    declarations
        .iter()
        .flat_map(|declaration| {
            declaration
                .produced()
                .filter(|(item, _)| {
                    item.cardinality() == Cardinality::Single && initial_items.contains(item)
                })
                .map(|(item, _)| AssemblyProblem::InitialItemProduced {
                    item: *item,
                    producer: declaration.provenance().clone(),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

fn ineligible_weak_consumers(
    declarations: &[Arc<StepDeclaration>],
    registry: &ItemRegistry,
) -> Vec<AssemblyProblem> {
    declarations
        .iter()
        .flat_map(|declaration| {
            declaration
                .consumed()
                .filter(|(item, flags)| flags.optional && !registry.is_weak_consumable(item))
                .map(|(item, _)| AssemblyProblem::WeakConsumeNotAllowed {
                    item: *item,
                    consumer: declaration.provenance().clone(),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Every required input of a survivor needs a wired producer. Initial items
/// are satisfied by the caller.
pub(crate) fn check_required_inputs(
    declarations: &[Arc<StepDeclaration>],
    graph: &DependencyGraph,
    initial_items: &BTreeSet<ItemId>,
) -> Vec<AssemblyProblem> {
    let mut problems = Vec::new();
    for node in (0..graph.len()).map(StepIndex) {
        let declaration = &declarations[graph.declaration_index(node)];
        for (item, flags) in declaration.consumed() {
            if flags.optional || initial_items.contains(item) {
                continue;
            }
            if graph.producers(item).is_empty() {
                problems.push(AssemblyProblem::MissingProducer {
                    item: *item,
                    consumer: declaration.provenance().clone(),
                });
            }
        }
    }
    problems
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    White,
    Gray,
    Black,
}

/// Every cycle in the wired graph, one problem per cycle.
pub(crate) fn find_cycles(
    declarations: &[Arc<StepDeclaration>],
    graph: &DependencyGraph,
) -> Vec<AssemblyProblem> {
    collect_cycles(graph)
        .into_iter()
        .map(|cycle| AssemblyProblem::DependencyCycle {
            cycle: describe_cycle(&cycle, declarations, graph),
        })
        .collect()
}

/// Normalized node sequences of every cycle, deduplicated.
fn collect_cycles(graph: &DependencyGraph) -> BTreeSet<Vec<StepIndex>> {
    let mut marks = vec![Mark::White; graph.len()];
    let mut cycles = BTreeSet::new();

    for node in (0..graph.len()).map(StepIndex) {
        if marks[node.0] == Mark::White {
            dfs_cycle_detection(node, graph, &mut marks, &mut cycles);
        }
    }
    cycles
}

/// One DFS tree, driven by an explicit stack so path length is bounded by
/// the heap rather than the thread's stack.
fn dfs_cycle_detection(
    root: StepIndex,
    graph: &DependencyGraph,
    marks: &mut [Mark],
    cycles: &mut BTreeSet<Vec<StepIndex>>,
) {
    // Frames mirror `path`: the node plus a cursor into its downstream list.
    let mut path: Vec<StepIndex> = vec![root];
    let mut frames: Vec<(Vec<StepIndex>, usize)> = vec![(downstream_of(graph, root), 0)];
    marks[root.0] = Mark::Gray;

    while let Some((next_nodes, cursor)) = frames.last_mut() {
        let Some(&next) = next_nodes.get(*cursor) else {
            if let Some(done) = path.pop() {
                marks[done.0] = Mark::Black;
            }
            frames.pop();
            continue;
        };
        *cursor += 1;

        match marks[next.0] {
            Mark::White => {
                marks[next.0] = Mark::Gray;
                path.push(next);
                frames.push((downstream_of(graph, next), 0));
            }
            Mark::Gray => {
                if let Some(start) = path.iter().position(|&n| n == next) {
                    cycles.insert(normalize(&path[start..]));
                }
            }
            Mark::Black => {}
        }
    }
}

fn downstream_of(graph: &DependencyGraph, node: StepIndex) -> Vec<StepIndex> {
    graph.downstream(node).iter().copied().collect()
}

/// Rotate a cycle so it starts at its lowest node.
fn normalize(cycle: &[StepIndex]) -> Vec<StepIndex> {
    let start = cycle
        .iter()
        .enumerate()
        .min_by_key(|(_, node)| **node)
        .map_or(0, |(position, _)| position);
    cycle[start..].iter().chain(&cycle[..start]).copied().collect()
}

/// Pair each step of a cycle with the item it hands to the next one.
fn describe_cycle(
    cycle: &[StepIndex],
    declarations: &[Arc<StepDeclaration>],
    graph: &DependencyGraph,
) -> Vec<CycleLink> {
    cycle
        .iter()
        .enumerate()
        .filter_map(|(position, &from)| {
            let to = cycle[(position + 1) % cycle.len()];
            let item = graph
                .edge_items()
                .get(&(from, to))
                .and_then(|items| items.iter().next())?;
            Some(CycleLink {
                step: declarations[graph.declaration_index(from)].provenance().clone(),
                item: *item,
            })
        })
        .collect()
}
