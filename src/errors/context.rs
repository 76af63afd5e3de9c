// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use crate::item::ItemId;

/// Misuse of a [`StepContext`](crate::step::StepContext) by a step body.
///
/// These are caller contract violations: the body touched a channel it did
/// not declare, or published a single-valued item twice. They fail the step
/// like any other body error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("Step '{step_id}' did not declare consumption of {item}")]
    UndeclaredConsume { step_id: String, item: ItemId },

    #[error("Step '{step_id}' did not declare production of {item}")]
    UndeclaredProduce { step_id: String, item: ItemId },

    #[error("Step '{step_id}' already published single-valued item {item}")]
    AlreadyProduced { step_id: String, item: ItemId },

    /// A required item was declared and wired, but its producer finished
    /// without publishing it.
    #[error("Item {item} requested by step '{step_id}' was never produced")]
    NotProduced { step_id: String, item: ItemId },
}
