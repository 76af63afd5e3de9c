// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use super::{ItemId, MultiItem, SimpleItem};

/// Per-item flags consulted by the assembler and the executor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemFlags {
    /// The item is kept in the run's result even if no step consumes it.
    pub final_item: bool,
    /// Consumers may declare an optional dependency on this item.
    pub weak_consumable: bool,
}

impl ItemFlags {
    pub const FINAL: ItemFlags = ItemFlags {
        final_item: true,
        weak_consumable: false,
    };

    pub const WEAK: ItemFlags = ItemFlags {
        final_item: false,
        weak_consumable: true,
    };

    pub const FINAL_WEAK: ItemFlags = ItemFlags {
        final_item: true,
        weak_consumable: true,
    };
}

/// Explicit registry of known item types and their flags.
///
/// The registry is built by the caller and passed to
/// [`ChainBuilder::new`](crate::chain::ChainBuilder::new). Items that were
/// never registered behave as if registered with [`ItemFlags::default`].
#[derive(Debug, Clone, Default)]
pub struct ItemRegistry {
    flags: HashMap<ItemId, ItemFlags>,
}

impl ItemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a single-valued item type. Registering twice replaces the flags.
    pub fn register<T: SimpleItem>(&mut self, flags: ItemFlags) -> &mut Self {
        self.flags.insert(ItemId::simple::<T>(), flags);
        self
    }

    /// Register a multi-valued item type. Registering twice replaces the flags.
    pub fn register_multi<T: MultiItem>(&mut self, flags: ItemFlags) -> &mut Self {
        self.flags.insert(ItemId::multi::<T>(), flags);
        self
    }

    pub fn flags(&self, id: &ItemId) -> ItemFlags {
        self.flags.get(id).copied().unwrap_or_default()
    }

    pub fn is_final(&self, id: &ItemId) -> bool {
        self.flags(id).final_item
    }

    pub fn is_weak_consumable(&self, id: &ItemId) -> bool {
        self.flags(id).weak_consumable
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.flags.contains_key(id)
    }

    /// All registered item types flagged final, in deterministic order.
    pub fn final_items(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self
            .flags
            .iter()
            .filter(|(_, flags)| flags.final_item)
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}
