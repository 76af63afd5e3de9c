// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-run item storage.
//!
//! A fresh [`RunState`] is created for every run and dropped with it. It
//! holds one write-once slot per single-valued item and one accumulation
//! buffer per multi-valued item. A multi-valued buffer is frozen into a
//! read-only snapshot when the last of its wired producers commits, which
//! is the only point at which consumers can see it.

use std::any::Any;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, OnceLock};

use crate::chain::Chain;
use crate::errors::ExecutionError;
use crate::item::{Cardinality, Item, ItemId, MultiItem, SimpleItem};
use crate::step::StagedOutputs;

pub(crate) type ErasedItem = Arc<dyn Any + Send + Sync>;

pub(crate) fn erase<T: Item>(value: T) -> ErasedItem {
    Arc::new(value)
}

pub(crate) fn downcast<T: Item>(value: ErasedItem) -> Option<Arc<T>> {
    value.downcast::<T>().ok()
}

/// Items the caller supplies before a run, keyed by type.
///
/// ```rust
/// use the_buildchain::engine::InitialItems;
/// use the_buildchain::item::{Item, SimpleItem};
///
/// struct Workspace(String);
/// impl Item for Workspace {}
/// impl SimpleItem for Workspace {}
///
/// let initial = InitialItems::new().with(Workspace("/tmp/app".into()));
/// assert_eq!(initial.len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct InitialItems {
    singles: HashMap<ItemId, ErasedItem>,
    multis: HashMap<ItemId, Vec<ErasedItem>>,
}

impl InitialItems {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supply the value of a single-valued initial item. A second call for the
    /// same type replaces the first value.
    pub fn with<T: SimpleItem>(mut self, value: T) -> Self {
        self.singles.insert(ItemId::simple::<T>(), erase(value));
        self
    }

    /// Add one value to a multi-valued initial item.
    pub fn with_multi<T: MultiItem>(mut self, value: T) -> Self {
        self.multis
            .entry(ItemId::multi::<T>())
            .or_default()
            .push(erase(value));
        self
    }

    /// Supply a multi-valued initial item with no values at all.
    pub fn with_empty_multi<T: MultiItem>(mut self) -> Self {
        self.multis.entry(ItemId::multi::<T>()).or_default();
        self
    }

    pub fn contains(&self, item: &ItemId) -> bool {
        match item.cardinality() {
            Cardinality::Single => self.singles.contains_key(item),
            Cardinality::Multi => self.multis.contains_key(item),
        }
    }

    /// Number of item types supplied.
    pub fn len(&self) -> usize {
        self.singles.len() + self.multis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.singles.is_empty() && self.multis.is_empty()
    }

    fn ids(&self) -> BTreeSet<ItemId> {
        self.singles.keys().chain(self.multis.keys()).copied().collect()
    }
}

struct MultiBuffer {
    remaining_producers: usize,
    values: Vec<ErasedItem>,
}

struct MultiSlot {
    pending: Mutex<MultiBuffer>,
    frozen: OnceLock<Arc<[ErasedItem]>>,
}

impl MultiSlot {
    fn new(producers: usize, seed: Vec<ErasedItem>) -> Self {
        let slot = Self {
            pending: Mutex::new(MultiBuffer {
                remaining_producers: producers,
                values: Vec::new(),
            }),
            frozen: OnceLock::new(),
        };
        if producers == 0 {
            let _ = slot.frozen.set(Arc::from(seed));
        } else if let Ok(mut buffer) = slot.pending.lock() {
            buffer.values = seed;
        }
        slot
    }
}

/// Run-scoped item storage shared between the executor and step contexts.
pub(crate) struct RunState {
    singles: HashMap<ItemId, OnceLock<ErasedItem>>,
    multis: HashMap<ItemId, MultiSlot>,
}

impl RunState {
    /// Build storage for every channel the chain touches, seeded with the
    /// caller's initial items. Fails if the initial items do not match the
    /// chain's declared set exactly.
    pub(crate) fn new(chain: &Chain, initial: InitialItems) -> Result<Self, ExecutionError> {
        let declared = chain.initial_items();
        for item in declared {
            if !initial.contains(item) {
                return Err(ExecutionError::MissingInitialItem { item: *item });
            }
        }
        if let Some(item) = initial.ids().into_iter().find(|id| !declared.contains(id)) {
            return Err(ExecutionError::UnexpectedInitialItem { item });
        }

        let InitialItems {
            singles: mut initial_singles,
            multis: mut initial_multis,
        } = initial;

        let mut singles = HashMap::new();
        let mut multis = HashMap::new();
        for (item, producers) in chain.channels() {
            match item.cardinality() {
                Cardinality::Single => {
                    let slot = OnceLock::new();
                    if let Some(value) = initial_singles.remove(item) {
                        let _ = slot.set(value);
                    }
                    singles.insert(*item, slot);
                }
                Cardinality::Multi => {
                    let seed = initial_multis.remove(item).unwrap_or_default();
                    multis.insert(*item, MultiSlot::new(*producers, seed));
                }
            }
        }

        Ok(Self { singles, multis })
    }

    pub(crate) fn single(&self, item: &ItemId) -> Option<ErasedItem> {
        self.singles.get(item).and_then(|slot| slot.get()).cloned()
    }

    /// The frozen snapshot of a multi-valued item, or `None` if some wired
    /// producer has not committed yet.
    pub(crate) fn multi(&self, item: &ItemId) -> Option<Arc<[ErasedItem]>> {
        self.multis.get(item).and_then(|slot| slot.frozen.get()).cloned()
    }

    /// Make a successful step's publications visible.
    ///
    /// Only `outputs` (the step's wired produce edges) are committed; anything
    /// else the body staged is dropped. Every wired multi-valued output counts
    /// the step as finished, whether or not it contributed.
    pub(crate) fn commit(
        &self,
        outputs: &BTreeSet<ItemId>,
        mut staged: StagedOutputs,
    ) -> Result<(), ExecutionError> {
        for item in outputs {
            match item.cardinality() {
                Cardinality::Single => {
                    let Some(value) = staged.singles.remove(item) else {
                        continue;
                    };
                    let slot = self.singles.get(item).ok_or_else(|| unknown_channel(item))?;
                    if slot.set(value).is_err() {
                        return Err(ExecutionError::Internal {
                            message: format!("single-valued item {} committed twice", item),
                        });
                    }
                }
                Cardinality::Multi => {
                    let contributions = staged.multis.remove(item).unwrap_or_default();
                    let slot = self.multis.get(item).ok_or_else(|| unknown_channel(item))?;
                    let mut buffer = slot.pending.lock().map_err(|_| ExecutionError::Internal {
                        message: format!("buffer for {} poisoned", item),
                    })?;
                    buffer.values.extend(contributions);
                    buffer.remaining_producers = buffer.remaining_producers.saturating_sub(1);
                    if buffer.remaining_producers == 0 {
                        let values = std::mem::take(&mut buffer.values);
                        if slot.frozen.set(Arc::from(values)).is_err() {
                            return Err(ExecutionError::Internal {
                                message: format!("multi-valued item {} frozen twice", item),
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn unknown_channel(item: &ItemId) -> ExecutionError {
    ExecutionError::Internal {
        message: format!("no storage allocated for item {}", item),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainBuilder;
    use crate::item::{ItemFlags, ItemRegistry};
    use crate::step::{StepContext, StepDeclaration, StepError};

    struct Seed(u32);
    impl Item for Seed {}
    impl SimpleItem for Seed {}

    struct Part(u32);
    impl Item for Part {}
    impl MultiItem for Part {}

    fn noop(_ctx: &mut StepContext) -> Result<(), StepError> {
        Ok(())
    }

    /// Two producers contribute `Part`, which is final.
    fn two_producer_chain() -> Chain {
        let mut registry = ItemRegistry::new();
        registry.register_multi::<Part>(ItemFlags::FINAL);
        let mut builder = ChainBuilder::new(registry);
        builder
            .add_initial::<Seed>()
            .add_step(
                StepDeclaration::new("left", noop)
                    .consumes::<Seed>()
                    .produces_multi::<Part>(),
            )
            .add_step(
                StepDeclaration::new("right", noop)
                    .consumes::<Seed>()
                    .produces_multi::<Part>(),
            );
        builder.build().unwrap()
    }

    fn staged_parts(values: &[u32]) -> StagedOutputs {
        let mut staged = StagedOutputs::default();
        staged.multis.insert(
            ItemId::multi::<Part>(),
            values.iter().map(|v| erase(Part(*v))).collect(),
        );
        staged
    }

    #[test]
    fn test_missing_and_unexpected_initial_items() {
        let chain = two_producer_chain();
        let missing = RunState::new(&chain, InitialItems::new());
        assert!(matches!(
            missing,
            Err(ExecutionError::MissingInitialItem { .. })
        ));

        let unexpected = RunState::new(
            &chain,
            InitialItems::new().with(Seed(1)).with_multi(Part(0)),
        );
        assert!(matches!(
            unexpected,
            Err(ExecutionError::UnexpectedInitialItem { .. })
        ));
    }

    #[test]
    fn test_multi_item_freezes_after_last_producer() {
        let chain = two_producer_chain();
        let state = RunState::new(&chain, InitialItems::new().with(Seed(1))).unwrap();
        let part = ItemId::multi::<Part>();
        let outputs: BTreeSet<ItemId> = [part].into_iter().collect();

        state.commit(&outputs, staged_parts(&[1, 2])).unwrap();
        assert!(state.multi(&part).is_none());

        state.commit(&outputs, staged_parts(&[3])).unwrap();
        let frozen = state.multi(&part).unwrap();
        let mut values: Vec<u32> = frozen
            .iter()
            .cloned()
            .filter_map(downcast::<Part>)
            .map(|p| p.0)
            .collect();
        values.sort();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn test_unwired_publications_are_dropped() {
        let chain = two_producer_chain();
        let state = RunState::new(&chain, InitialItems::new().with(Seed(7))).unwrap();
        let seed = ItemId::simple::<Seed>();

        let mut staged = StagedOutputs::default();
        staged.singles.insert(seed, erase(Seed(99)));
        state.commit(&BTreeSet::new(), staged).unwrap();

        let value = state.single(&seed).and_then(downcast::<Seed>).unwrap();
        assert_eq!(value.0, 7);
    }
}
