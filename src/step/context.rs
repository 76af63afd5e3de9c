// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::engine::run_state::{downcast, erase, ErasedItem, RunState};
use crate::errors::ContextError;
use crate::item::{ItemId, MultiItem, SimpleItem};
use crate::step::{Provenance, StepDeclaration};

/// The narrow view a step body gets of a run.
///
/// Reads are limited to the items the step declared it consumes and writes
/// to the items it declared it produces. Everything published here is
/// staged; the executor commits it only after the body returns `Ok`.
pub struct StepContext {
    declaration: Arc<StepDeclaration>,
    state: Arc<RunState>,
    cancellation: CancellationToken,
    staged: StagedOutputs,
}

/// Publications of one step invocation, not yet visible to anyone else.
#[derive(Default)]
pub(crate) struct StagedOutputs {
    pub(crate) singles: HashMap<ItemId, ErasedItem>,
    pub(crate) multis: HashMap<ItemId, Vec<ErasedItem>>,
}

impl StepContext {
    pub(crate) fn new(
        declaration: Arc<StepDeclaration>,
        state: Arc<RunState>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            declaration,
            state,
            cancellation,
            staged: StagedOutputs::default(),
        }
    }

    pub fn step_id(&self) -> &str {
        self.declaration.id()
    }

    pub fn provenance(&self) -> &Provenance {
        self.declaration.provenance()
    }

    /// True once the run has been cancelled. Long-running bodies may poll this
    /// and return early; their result is discarded either way.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// The single value of `T`. Fails if `T` was not declared as consumed, or
    /// if its producer finished without publishing it.
    pub fn get<T: SimpleItem>(&self) -> Result<Arc<T>, ContextError> {
        let item = ItemId::simple::<T>();
        self.check_consumes(&item)?;
        self.state
            .single(&item)
            .and_then(downcast::<T>)
            .ok_or_else(|| ContextError::NotProduced {
                step_id: self.step_id().to_string(),
                item,
            })
    }

    /// The single value of `T`, or `None` when nothing produced it.
    pub fn get_optional<T: SimpleItem>(&self) -> Result<Option<Arc<T>>, ContextError> {
        let item = ItemId::simple::<T>();
        self.check_consumes(&item)?;
        Ok(self.state.single(&item).and_then(downcast::<T>))
    }

    /// Every contribution to `T`, in no particular order. Empty when `T` has
    /// no producers in this chain.
    pub fn get_all<T: MultiItem>(&self) -> Result<Vec<Arc<T>>, ContextError> {
        let item = ItemId::multi::<T>();
        let optional = self.check_consumes(&item)?;
        match self.state.multi(&item) {
            Some(values) => Ok(values.iter().cloned().filter_map(downcast::<T>).collect()),
            None if optional => Ok(Vec::new()),
            None => Err(ContextError::NotProduced {
                step_id: self.step_id().to_string(),
                item,
            }),
        }
    }

    /// Stage the single value of `T`. Publishing `T` twice in one invocation
    /// is an error.
    pub fn publish<T: SimpleItem>(&mut self, value: T) -> Result<(), ContextError> {
        let item = ItemId::simple::<T>();
        self.check_produces(&item)?;
        if self.staged.singles.contains_key(&item) {
            return Err(ContextError::AlreadyProduced {
                step_id: self.step_id().to_string(),
                item,
            });
        }
        self.staged.singles.insert(item, erase(value));
        Ok(())
    }

    /// Stage one contribution to `T`.
    pub fn contribute<T: MultiItem>(&mut self, value: T) -> Result<(), ContextError> {
        let item = ItemId::multi::<T>();
        self.check_produces(&item)?;
        self.staged.multis.entry(item).or_default().push(erase(value));
        Ok(())
    }

    pub fn contribute_all<T, I>(&mut self, values: I) -> Result<(), ContextError>
    where
        T: MultiItem,
        I: IntoIterator<Item = T>,
    {
        let item = ItemId::multi::<T>();
        self.check_produces(&item)?;
        let buffer = self.staged.multis.entry(item).or_default();
        buffer.extend(values.into_iter().map(erase));
        Ok(())
    }

    pub(crate) fn into_outputs(self) -> StagedOutputs {
        self.staged
    }

    /// Returns whether the consume edge is optional.
    fn check_consumes(&self, item: &ItemId) -> Result<bool, ContextError> {
        self.declaration
            .consume_flags(item)
            .map(|flags| flags.optional)
            .ok_or_else(|| ContextError::UndeclaredConsume {
                step_id: self.step_id().to_string(),
                item: *item,
            })
    }

    fn check_produces(&self, item: &ItemId) -> Result<(), ContextError> {
        match self.declaration.produce_flags(item) {
            Some(_) => Ok(()),
            None => Err(ContextError::UndeclaredProduce {
                step_id: self.step_id().to_string(),
                item: *item,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainBuilder;
    use crate::engine::InitialItems;
    use crate::item::{Item, ItemFlags, ItemRegistry};
    use crate::traits::StepError;

    struct Settings(u32);
    impl Item for Settings {}
    impl SimpleItem for Settings {}

    struct Artifact(&'static str);
    impl Item for Artifact {}
    impl SimpleItem for Artifact {}

    struct Secret;
    impl Item for Secret {}
    impl SimpleItem for Secret {}

    struct Tag(&'static str);
    impl Item for Tag {}
    impl MultiItem for Tag {}

    fn noop(_ctx: &mut StepContext) -> Result<(), StepError> {
        Ok(())
    }

    /// A context for a step that consumes the initial `Settings`, optionally
    /// consumes `Tag` and produces `Artifact`.
    fn context() -> StepContext {
        let mut registry = ItemRegistry::new();
        registry
            .register::<Artifact>(ItemFlags::FINAL)
            .register_multi::<Tag>(ItemFlags::WEAK);
        let step = StepDeclaration::new("package", noop)
            .consumes::<Settings>()
            .consumes_multi_optional::<Tag>()
            .produces::<Artifact>();
        let mut builder = ChainBuilder::new(registry);
        builder.add_initial::<Settings>().add_step(step);
        let chain = builder.build().unwrap();

        let state = RunState::new(&chain, InitialItems::new().with(Settings(3))).unwrap();
        let declaration = chain.steps()[0].declaration().clone();
        StepContext::new(declaration, Arc::new(state), CancellationToken::new())
    }

    #[test]
    fn test_get_declared_item() {
        let ctx = context();
        assert_eq!(ctx.get::<Settings>().unwrap().0, 3);
        assert!(ctx.get_all::<Tag>().unwrap().is_empty());
    }

    #[test]
    fn test_undeclared_access_is_rejected() {
        let mut ctx = context();
        assert!(matches!(
            ctx.get::<Secret>(),
            Err(ContextError::UndeclaredConsume { .. })
        ));
        assert!(matches!(
            ctx.publish(Secret),
            Err(ContextError::UndeclaredProduce { .. })
        ));
        assert!(matches!(
            ctx.contribute(Tag("x")),
            Err(ContextError::UndeclaredProduce { .. })
        ));
    }

    #[test]
    fn test_publish_twice_is_rejected() {
        let mut ctx = context();
        ctx.publish(Artifact("first")).unwrap();
        let err = ctx.publish(Artifact("second")).unwrap_err();
        assert!(matches!(err, ContextError::AlreadyProduced { .. }));

        let outputs = ctx.into_outputs();
        assert_eq!(outputs.singles.len(), 1);
    }

    #[test]
    fn test_cancellation_is_visible() {
        let token = CancellationToken::new();
        let ctx = context();
        let ctx = StepContext::new(ctx.declaration.clone(), ctx.state.clone(), token.clone());
        assert!(!ctx.is_cancelled());
        token.cancel();
        assert!(ctx.is_cancelled());
    }
}
