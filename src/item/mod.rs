// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Item model: typed, immutable payloads whose Rust type is their channel.
//!
//! A step never names a channel with a string. It names a type. The type
//! chooses its cardinality by implementing exactly one of the two marker
//! traits:
//!
//! * [`SimpleItem`] - at most one producer per chain and one value per run.
//! * [`MultiItem`] - any number of producers, each contributing any number
//!   of values. Consumers see the whole collection once every producer
//!   has finished.
//!
//! ```rust
//! use the_buildchain::item::{Cardinality, Item, ItemId, MultiItem, SimpleItem};
//!
//! struct ApplicationName(String);
//! impl Item for ApplicationName {}
//! impl SimpleItem for ApplicationName {}
//!
//! struct FeatureName(&'static str);
//! impl Item for FeatureName {}
//! impl MultiItem for FeatureName {}
//!
//! assert_eq!(ItemId::simple::<ApplicationName>().cardinality(), Cardinality::Single);
//! assert!(ItemId::multi::<FeatureName>().is_multi());
//! ```
//!
//! Flags (final, weak-consumable) are not part of the type. They live in an
//! [`ItemRegistry`] that the caller builds and hands to the assembler.

mod id;
mod registry;

use std::any::Any;
use std::fmt;

pub use id::ItemId;
pub use registry::{ItemFlags, ItemRegistry};

/// Base trait for every payload that can flow between steps.
///
/// Items are shared between concurrently running steps behind an `Arc`, so
/// they must be `Send + Sync` and own their data.
pub trait Item: Any + Send + Sync {}

/// An item with at most one producer and one instance per run.
pub trait SimpleItem: Item {}

/// An item aggregated from zero or more producers.
pub trait MultiItem: Item {}

/// How many values a channel carries per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Cardinality {
    Single,
    Multi,
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::Single => write!(f, "single"),
            Cardinality::Multi => write!(f, "multi"),
        }
    }
}
