use serde::Serialize;

use crate::chain::{Chain, StepIndex};
use crate::step::Provenance;

/// Serializable summary of an assembled chain.
#[derive(Debug, Clone, Serialize)]
pub struct ChainDescription {
    pub steps: Vec<StepDescription>,
    pub edges: Vec<EdgeDescription>,
    pub waves: Vec<Vec<String>>,
    pub initial_items: Vec<String>,
    pub final_items: Vec<String>,
    pub pruned: Vec<Provenance>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepDescription {
    pub index: StepIndex,
    pub id: String,
    pub provenance: Provenance,
    pub wave: usize,
    pub consumes: Vec<String>,
    pub produces: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EdgeDescription {
    pub from: String,
    pub to: String,
    pub items: Vec<String>,
}

impl Chain {
    pub fn describe(&self) -> ChainDescription {
        let id_of = |index: StepIndex| {
            self.step(index)
                .map(|step| step.id().to_string())
                .unwrap_or_default()
        };

        let steps = self
            .steps()
            .iter()
            .map(|step| StepDescription {
                index: step.index(),
                id: step.id().to_string(),
                provenance: step.provenance().clone(),
                wave: step.wave(),
                consumes: step
                    .declaration()
                    .consumed()
                    .map(|(item, flags)| {
                        if flags.optional {
                            format!("{}?", item)
                        } else {
                            item.to_string()
                        }
                    })
                    .collect(),
                produces: step.outputs().iter().map(ToString::to_string).collect(),
            })
            .collect();

        let edges = self
            .edges()
            .map(|(from, to, items)| EdgeDescription {
                from: id_of(from),
                to: id_of(to),
                items: items.iter().map(ToString::to_string).collect(),
            })
            .collect();

        ChainDescription {
            steps,
            edges,
            waves: self
                .waves()
                .iter()
                .map(|wave| wave.iter().map(|&index| id_of(index)).collect())
                .collect(),
            initial_items: self.initial_items().iter().map(ToString::to_string).collect(),
            final_items: self.final_items().iter().map(ToString::to_string).collect(),
            pruned: self.pruned_steps().to_vec(),
        }
    }
}
