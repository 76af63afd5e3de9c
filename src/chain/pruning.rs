// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Backward reachability from what the caller actually wants.
//!
//! A step survives if it is marked always-run, or if it is a selected
//! producer of an item that is final or consumed by another survivor. The
//! worklist runs until no new step is added.
//!
//! Producer selection mirrors wiring: if any regular (non-overridable)
//! producer of an item is declared, only regular producers are candidates;
//! otherwise the overridable ones are. Weak producers are never candidates,
//! though they may survive for some other reason.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

use crate::item::ItemId;
use crate::step::StepDeclaration;

#[derive(Default)]
struct Candidates {
    has_regular: bool,
    regular: Vec<usize>,
    overridable: Vec<usize>,
}

impl Candidates {
    fn selected(&self) -> &[usize] {
        if self.has_regular {
            &self.regular
        } else {
            &self.overridable
        }
    }
}

/// Declaration positions of the steps that survive, in declaration order.
pub(crate) fn surviving_steps(
    declarations: &[Arc<StepDeclaration>],
    final_items: &BTreeSet<ItemId>,
) -> Vec<usize> {
    let mut candidates: BTreeMap<ItemId, Candidates> = BTreeMap::new();
    for (position, declaration) in declarations.iter().enumerate() {
        for (item, flags) in declaration.produced() {
            let entry = candidates.entry(*item).or_default();
            if !flags.overridable {
                entry.has_regular = true;
            }
            if flags.weak {
                continue;
            }
            if flags.overridable {
                entry.overridable.push(position);
            } else {
                entry.regular.push(position);
            }
        }
    }

    let mut kept = vec![false; declarations.len()];
    let mut needed: VecDeque<ItemId> = final_items.iter().copied().collect();
    let mut seen: BTreeSet<ItemId> = BTreeSet::new();

    for (position, declaration) in declarations.iter().enumerate() {
        if declaration.is_always_run() {
            kept[position] = true;
            needed.extend(declaration.consumed().map(|(item, _)| *item));
        }
    }

    while let Some(item) = needed.pop_front() {
        if !seen.insert(item) {
            continue;
        }
        let Some(producers) = candidates.get(&item) else {
            continue;
        };
        for &position in producers.selected() {
            if !kept[position] {
                kept[position] = true;
                needed.extend(declarations[position].consumed().map(|(item, _)| *item));
            }
        }
    }

    kept.iter()
        .enumerate()
        .filter_map(|(position, &keep)| keep.then_some(position))
        .collect()
}
