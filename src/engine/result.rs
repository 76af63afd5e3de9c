// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::run_state::{downcast, ErasedItem, RunState};
use crate::item::{Cardinality, ItemId, MultiItem, SimpleItem};

/// Immutable snapshot of a successful run, restricted to final items.
#[derive(Clone)]
pub struct BuildResult {
    singles: HashMap<ItemId, ErasedItem>,
    multis: HashMap<ItemId, Arc<[ErasedItem]>>,
    duration: Duration,
}

impl BuildResult {
    pub(crate) fn collect(state: &RunState, final_items: &BTreeSet<ItemId>, duration: Duration) -> Self {
        let mut singles = HashMap::new();
        let mut multis = HashMap::new();
        for item in final_items {
            match item.cardinality() {
                Cardinality::Single => {
                    if let Some(value) = state.single(item) {
                        singles.insert(*item, value);
                    }
                }
                Cardinality::Multi => {
                    if let Some(values) = state.multi(item) {
                        multis.insert(*item, values);
                    }
                }
            }
        }
        Self {
            singles,
            multis,
            duration,
        }
    }

    /// The value of a final single-valued item, if a step produced it.
    pub fn get<T: SimpleItem>(&self) -> Option<Arc<T>> {
        self.singles
            .get(&ItemId::simple::<T>())
            .cloned()
            .and_then(downcast::<T>)
    }

    /// Every value of a final multi-valued item, in no particular order.
    pub fn get_all<T: MultiItem>(&self) -> Vec<Arc<T>> {
        self.multis
            .get(&ItemId::multi::<T>())
            .map(|values| values.iter().cloned().filter_map(downcast::<T>).collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, item: &ItemId) -> bool {
        self.singles.contains_key(item) || self.multis.contains_key(item)
    }

    /// Item types present in the result, sorted.
    pub fn items(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self.singles.keys().chain(self.multis.keys()).copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.singles.len() + self.multis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wall-clock time from dispatch of the first step to the last completion.
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl fmt::Debug for BuildResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildResult")
            .field("items", &self.items())
            .field("duration", &self.duration)
            .finish()
    }
}
