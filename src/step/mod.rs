// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Step declarations: what a unit of work consumes, what it produces, where
//! it was declared, and the body that does the work.

mod context;
mod declaration;
mod provenance;

pub(crate) use context::StagedOutputs;
pub use context::StepContext;
pub use declaration::{ConsumeFlags, ProduceFlags, StepDeclaration};
pub use provenance::Provenance;

pub use crate::traits::{StepBody, StepError};
