//! What-if projection: a scenario expanded breadth-first into possible next states.

use crate::reflect::reflect;
use crate::store::{MemoryStore, RecordKind, StoreError};
use indexmap::IndexMap;

/// State → ordered next states. Same last-write-wins rule as reflection trees.
pub type SimulationTree = IndexMap<String, Vec<String>>;

pub struct SimulationEngine<'a> {
    store: &'a MemoryStore,
}

impl<'a> SimulationEngine<'a> {
    pub fn new(store: &'a MemoryStore) -> Self {
        Self { store }
    }

    /// Expand `scenario` for `depth` layers.
    ///
    /// With `tag_hint`, every state's next states are the questions of the
    /// reflection record stored under the tag's own topic (and carrying that
    /// tag), re-read from disk at each layer. Without it, next states are
    /// fresh reflections on the state itself.
    pub fn simulate(
        &self,
        scenario: &str,
        depth: usize,
        tag_hint: Option<&str>,
    ) -> Result<SimulationTree, StoreError> {
        let mut tree = SimulationTree::new();
        tree.insert(scenario.to_string(), Vec::new());
        let mut frontier = vec![scenario.to_string()];

        for layer in 0..depth {
            let tagged = match tag_hint {
                Some(tag) => Some(self.tagged_states(tag)?),
                None => None,
            };

            let mut next = Vec::new();
            for state in frontier {
                let outs = match &tagged {
                    Some(states) => states.clone(),
                    None => reflect(&[state.as_str()]),
                };
                next.extend(outs.iter().cloned());
                tree.insert(state, outs);
            }
            log::debug!("[simulate] layer {layer}: {} next states", next.len());
            frontier = next;
        }

        Ok(tree)
    }

    fn tagged_states(&self, tag: &str) -> Result<Vec<String>, StoreError> {
        let mut hits = self.store.search_by_tag(RecordKind::Reflection, tag)?;
        Ok(hits.remove(tag).map(|r| r.body).unwrap_or_default())
    }
}

/// `> state` lines, each followed by its indented next states.
pub fn render(tree: &SimulationTree) -> Vec<String> {
    let mut lines = Vec::new();
    for (state, outs) in tree {
        lines.push(format!("> {state}"));
        for out in outs {
            lines.push(format!("  - {out}"));
        }
    }
    lines
}
