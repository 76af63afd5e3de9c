// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::item::{ItemId, MultiItem, SimpleItem};
use crate::step::{Provenance, StepContext};
use crate::traits::{StepBody, StepError};

/// Flags on a produce edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProduceFlags {
    /// Fallback producer, wired only when no regular producer of the item exists.
    pub overridable: bool,
    /// Producing this item alone does not keep the step alive during pruning.
    pub weak: bool,
}

/// Flags on a consume edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumeFlags {
    /// The step tolerates the item being absent.
    pub optional: bool,
}

/// Everything the assembler needs to know about one step, plus its body.
///
/// ```rust
/// use the_buildchain::item::{Item, MultiItem, SimpleItem};
/// use the_buildchain::step::{StepContext, StepDeclaration, StepError};
///
/// struct SourceRoot(String);
/// impl Item for SourceRoot {}
/// impl SimpleItem for SourceRoot {}
///
/// struct Route(String);
/// impl Item for Route {}
/// impl MultiItem for Route {}
///
/// let step = StepDeclaration::new("scan_routes", |ctx: &mut StepContext| -> Result<(), StepError> {
///     let root = ctx.get::<SourceRoot>()?;
///     ctx.contribute(Route(format!("{}/index", root.0)))?;
///     Ok(())
/// })
/// .consumes::<SourceRoot>()
/// .produces_multi::<Route>();
///
/// assert_eq!(step.consumed().count(), 1);
/// assert_eq!(step.produced().count(), 1);
/// ```
pub struct StepDeclaration {
    provenance: Provenance,
    produces: BTreeMap<ItemId, ProduceFlags>,
    consumes: BTreeMap<ItemId, ConsumeFlags>,
    always_run: bool,
    body: Arc<dyn StepBody>,
}

impl StepDeclaration {
    /// Declare a step whose body is a closure. Provenance is the caller's location.
    #[track_caller]
    pub fn new<F>(id: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut StepContext) -> Result<(), StepError> + Send + Sync + 'static,
    {
        Self::with_provenance(Provenance::caller(id), Arc::new(body))
    }

    /// Declare a step from an existing [`StepBody`] implementation.
    #[track_caller]
    pub fn from_body(id: impl Into<String>, body: Arc<dyn StepBody>) -> Self {
        Self::with_provenance(Provenance::caller(id), body)
    }

    /// Declare a step with an explicit provenance, for front ends that
    /// discover steps somewhere other than the Rust call site.
    pub fn with_provenance(provenance: Provenance, body: Arc<dyn StepBody>) -> Self {
        Self {
            provenance,
            produces: BTreeMap::new(),
            consumes: BTreeMap::new(),
            always_run: false,
            body,
        }
    }

    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.provenance = self.provenance.with_origin(origin);
        self
    }

    pub fn produces<T: SimpleItem>(self) -> Self {
        self.produces_with(ItemId::simple::<T>(), ProduceFlags::default())
    }

    pub fn produces_multi<T: MultiItem>(self) -> Self {
        self.produces_with(ItemId::multi::<T>(), ProduceFlags::default())
    }

    /// Produce `T` only if no regular producer of `T` is declared.
    pub fn produces_overridable<T: SimpleItem>(self) -> Self {
        self.produces_with(
            ItemId::simple::<T>(),
            ProduceFlags {
                overridable: true,
                weak: false,
            },
        )
    }

    /// Produce `T` without letting that production keep the step alive.
    pub fn produces_weak<T: SimpleItem>(self) -> Self {
        self.produces_with(
            ItemId::simple::<T>(),
            ProduceFlags {
                overridable: false,
                weak: true,
            },
        )
    }

    pub fn produces_multi_weak<T: MultiItem>(self) -> Self {
        self.produces_with(
            ItemId::multi::<T>(),
            ProduceFlags {
                overridable: false,
                weak: true,
            },
        )
    }

    /// Declaring the same item twice merges the flags: an edge stays
    /// overridable or weak only if every declaration says so.
    pub fn produces_with(mut self, item: ItemId, flags: ProduceFlags) -> Self {
        self.produces
            .entry(item)
            .and_modify(|existing| {
                existing.overridable &= flags.overridable;
                existing.weak &= flags.weak;
            })
            .or_insert(flags);
        self
    }

    pub fn consumes<T: SimpleItem>(self) -> Self {
        self.consumes_with(ItemId::simple::<T>(), ConsumeFlags::default())
    }

    pub fn consumes_multi<T: MultiItem>(self) -> Self {
        self.consumes_with(ItemId::multi::<T>(), ConsumeFlags::default())
    }

    /// Consume `T` if anything produces it; otherwise the step sees `None`.
    pub fn consumes_optional<T: SimpleItem>(self) -> Self {
        self.consumes_with(ItemId::simple::<T>(), ConsumeFlags { optional: true })
    }

    /// Consume every `T` if anything produces it; otherwise the step sees an
    /// empty collection.
    pub fn consumes_multi_optional<T: MultiItem>(self) -> Self {
        self.consumes_with(ItemId::multi::<T>(), ConsumeFlags { optional: true })
    }

    /// A required declaration wins over an optional one for the same item.
    pub fn consumes_with(mut self, item: ItemId, flags: ConsumeFlags) -> Self {
        self.consumes
            .entry(item)
            .and_modify(|existing| existing.optional &= flags.optional)
            .or_insert(flags);
        self
    }

    /// Keep this step even if nothing needs its output. Used for steps that
    /// exist for their side effects.
    pub fn always_run(mut self) -> Self {
        self.always_run = true;
        self
    }

    pub fn id(&self) -> &str {
        self.provenance.step_id()
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn is_always_run(&self) -> bool {
        self.always_run
    }

    pub fn produced(&self) -> impl Iterator<Item = (&ItemId, &ProduceFlags)> {
        self.produces.iter()
    }

    pub fn consumed(&self) -> impl Iterator<Item = (&ItemId, &ConsumeFlags)> {
        self.consumes.iter()
    }

    pub fn produce_flags(&self, item: &ItemId) -> Option<ProduceFlags> {
        self.produces.get(item).copied()
    }

    pub fn consume_flags(&self, item: &ItemId) -> Option<ConsumeFlags> {
        self.consumes.get(item).copied()
    }

    pub(crate) fn body(&self) -> &Arc<dyn StepBody> {
        &self.body
    }
}

impl fmt::Debug for StepDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDeclaration")
            .field("provenance", &self.provenance)
            .field("produces", &self.produces.keys().collect::<Vec<_>>())
            .field("consumes", &self.consumes.keys().collect::<Vec<_>>())
            .field("always_run", &self.always_run)
            .finish()
    }
}
