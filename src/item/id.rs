// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::any::TypeId;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::{Cardinality, MultiItem, SimpleItem};

/// Identity of an item channel.
///
/// Equality and hashing use the `TypeId` and cardinality. Ordering sorts by
/// type name first so that every diagnostic listing items comes out in the
/// same order on every run.
#[derive(Clone, Copy)]
pub struct ItemId {
    type_id: TypeId,
    type_name: &'static str,
    cardinality: Cardinality,
}

impl ItemId {
    /// Channel identity of a single-valued item type.
    pub fn simple<T: SimpleItem>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            cardinality: Cardinality::Single,
        }
    }

    /// Channel identity of a multi-valued item type.
    pub fn multi<T: MultiItem>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            cardinality: Cardinality::Multi,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Fully qualified Rust type name, as reported by `std::any::type_name`.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Type name without its module path, used in graph output.
    /// Generic types keep their full name.
    pub fn short_name(&self) -> &'static str {
        if self.type_name.contains('<') {
            return self.type_name;
        }
        self.type_name.rsplit("::").next().unwrap_or(self.type_name)
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn is_multi(&self) -> bool {
        self.cardinality == Cardinality::Multi
    }
}

impl PartialEq for ItemId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.cardinality == other.cardinality
    }
}

impl Eq for ItemId {}

impl Hash for ItemId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.cardinality.hash(state);
    }
}

impl PartialOrd for ItemId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ItemId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.type_name
            .cmp(other.type_name)
            .then_with(|| self.cardinality.cmp(&other.cardinality))
            .then_with(|| self.type_id.cmp(&other.type_id))
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({}, {})", self.type_name, self.cardinality)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name)
    }
}
