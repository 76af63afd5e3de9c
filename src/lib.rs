// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod chain;      // assembly: pruning, validation, waves
pub mod config;     // executor options from yaml/toml
pub mod engine;     // concurrent chain executor
pub mod errors;     // error handling
pub mod item;       // typed payloads and their flags
pub mod observability;
pub mod step;       // step declarations and contexts
pub mod traits;     // step body abstraction
