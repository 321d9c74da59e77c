//! Pluggable mutator behaviors.

use crate::error::LoadError;
use crate::graph::BlockGraph;

/// A pluggable behavior that can change a block's shape after construction.
///
/// A mutator is attached by the factory at most once per block. Its attach
/// callback may call [`BlockGraph::reshape`] to install mutator-specific
/// inputs; that is the only sanctioned seam for structural changes outside
/// construction. Everything else about a mutator is opaque to the core.
pub trait Mutator {
    /// Called once when the mutator is attached to `block_id`.
    fn on_attached(&mut self, graph: &mut BlockGraph, block_id: &str) -> Result<(), LoadError>;

    /// Rebuilds mutator state from a saved document's `mutation` sub-tree.
    /// May reshape the block. The default ignores the data.
    fn update_from_saved(
        &mut self,
        graph: &mut BlockGraph,
        block_id: &str,
        state: &serde_json::Value,
    ) -> Result<(), LoadError> {
        let _ = (graph, block_id, state);
        Ok(())
    }

    /// The mutator's own `mutation` sub-tree for serialization, if any.
    fn save(&self) -> Option<serde_json::Value> {
        None
    }
}
