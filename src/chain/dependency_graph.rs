use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

use crate::chain::StepIndex;
use crate::item::{Cardinality, ItemId};
use crate::step::StepDeclaration;

/// Producer -> consumer graph over the surviving steps.
///
/// Node `i` is the `i`-th survivor in declaration order. An edge `p -> c`
/// exists when `c` consumes an item whose wired producers include `p`.
/// Self-edges are kept so that cycle detection can report them.
#[derive(Debug, Clone)]
pub(crate) struct DependencyGraph {
    nodes: Vec<usize>,
    upstream: Vec<BTreeSet<StepIndex>>,
    downstream: Vec<BTreeSet<StepIndex>>,
    outputs: Vec<BTreeSet<ItemId>>,
    producers: BTreeMap<ItemId, Vec<StepIndex>>,
    edge_items: BTreeMap<(StepIndex, StepIndex), BTreeSet<ItemId>>,
}

impl DependencyGraph {
    /// Wire the survivors.
    ///
    /// For each item the regular producers among the survivors win; only if
    /// there are none do overridable producers get wired. Producers of
    /// initial single-valued items are never wired.
    pub(crate) fn wire(
        declarations: &[Arc<StepDeclaration>],
        survivors: &[usize],
        initial_items: &BTreeSet<ItemId>,
    ) -> Self {
        let node_count = survivors.len();
        let mut regular: BTreeMap<ItemId, Vec<StepIndex>> = BTreeMap::new();
        let mut overridable: BTreeMap<ItemId, Vec<StepIndex>> = BTreeMap::new();

        for (node, &declaration) in survivors.iter().enumerate() {
            for (item, flags) in declarations[declaration].produced() {
                if item.cardinality() == Cardinality::Single && initial_items.contains(item) {
                    continue;
                }
                let class = if flags.overridable {
                    &mut overridable
                } else {
                    &mut regular
                };
                class.entry(*item).or_default().push(StepIndex(node));
            }
        }

        let mut producers = regular;
        for (item, fallbacks) in overridable {
            producers.entry(item).or_insert(fallbacks);
        }

        let mut outputs = vec![BTreeSet::new(); node_count];
        for (item, wired) in &producers {
            for producer in wired {
                outputs[producer.0].insert(*item);
            }
        }

        let mut upstream = vec![BTreeSet::new(); node_count];
        let mut downstream = vec![BTreeSet::new(); node_count];
        let mut edge_items: BTreeMap<(StepIndex, StepIndex), BTreeSet<ItemId>> = BTreeMap::new();
        for (node, &declaration) in survivors.iter().enumerate() {
            let consumer = StepIndex(node);
            for (item, _) in declarations[declaration].consumed() {
                let Some(wired) = producers.get(item) else {
                    continue;
                };
                for &producer in wired {
                    upstream[consumer.0].insert(producer);
                    downstream[producer.0].insert(consumer);
                    edge_items
                        .entry((producer, consumer))
                        .or_default()
                        .insert(*item);
                }
            }
        }

        Self {
            nodes: survivors.to_vec(),
            upstream,
            downstream,
            outputs,
            producers,
            edge_items,
        }
    }

    /// Bare graph from `(producer, consumer)` node pairs, without items.
    #[cfg(test)]
    pub(crate) fn from_edges(node_count: usize, edges: &[(usize, usize)]) -> Self {
        let mut upstream = vec![BTreeSet::new(); node_count];
        let mut downstream = vec![BTreeSet::new(); node_count];
        for &(from, to) in edges {
            downstream[from].insert(StepIndex(to));
            upstream[to].insert(StepIndex(from));
        }
        Self {
            nodes: (0..node_count).collect(),
            upstream,
            downstream,
            outputs: vec![BTreeSet::new(); node_count],
            producers: BTreeMap::new(),
            edge_items: BTreeMap::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Declaration position of a node.
    pub(crate) fn declaration_index(&self, node: StepIndex) -> usize {
        self.nodes[node.0]
    }

    pub(crate) fn upstream(&self, node: StepIndex) -> &BTreeSet<StepIndex> {
        &self.upstream[node.0]
    }

    pub(crate) fn downstream(&self, node: StepIndex) -> &BTreeSet<StepIndex> {
        &self.downstream[node.0]
    }

    pub(crate) fn outputs(&self, node: StepIndex) -> &BTreeSet<ItemId> {
        &self.outputs[node.0]
    }

    /// Wired producers of an item; empty if none.
    pub(crate) fn producers(&self, item: &ItemId) -> &[StepIndex] {
        self.producers.get(item).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn producer_map(&self) -> &BTreeMap<ItemId, Vec<StepIndex>> {
        &self.producers
    }

    pub(crate) fn edge_items(&self) -> &BTreeMap<(StepIndex, StepIndex), BTreeSet<ItemId>> {
        &self.edge_items
    }

    /// Assign every node a wave with Kahn's algorithm: sources are wave 0 and
    /// every other node sits one past its deepest upstream producer.
    ///
    /// Returns `None` if some nodes never become free, which happens exactly
    /// when the graph has a cycle.
    pub(crate) fn waves(&self) -> Option<Vec<usize>> {
        let mut remaining: Vec<usize> = self.upstream.iter().map(BTreeSet::len).collect();
        let mut wave = vec![0; self.len()];
        let mut queue: VecDeque<StepIndex> = (0..self.len())
            .filter(|&node| remaining[node] == 0)
            .map(StepIndex)
            .collect();

        let mut placed = 0;
        while let Some(node) = queue.pop_front() {
            placed += 1;
            for &next in &self.downstream[node.0] {
                wave[next.0] = wave[next.0].max(wave[node.0] + 1);
                remaining[next.0] -= 1;
                if remaining[next.0] == 0 {
                    queue.push_back(next);
                }
            }
        }

        (placed == self.len()).then_some(wave)
    }
}

/// Group nodes by wave, each group in node order.
pub(crate) fn group_by_wave(waves: &[usize]) -> Vec<Vec<StepIndex>> {
    let depth = waves.iter().copied().max().map_or(0, |max| max + 1);
    let mut groups = vec![Vec::new(); depth];
    for (node, &wave) in waves.iter().enumerate() {
        groups[wave].push(StepIndex(node));
    }
    groups
}
