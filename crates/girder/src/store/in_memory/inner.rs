//! Core in-memory store data structures.
//!
//! This module contains the inner store structure that holds all data and
//! is wrapped in `Arc<Mutex<>>` for thread safety.

use crate::config::StoreConfig;
use crate::domain::{ChangeEvent, DependencyEdge, EdgeId, MilestoneId, NewDependency};
use crate::error::{Error, Result};
use crate::id_generation::{EdgeIdGenerator, EdgeIdGeneratorConfig};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use std::collections::HashMap;
use tokio::sync::broadcast;

/// Inner store structure (not thread-safe).
///
/// This contains the actual data structures for storing dependency edges
/// and the traversal graph. It's wrapped in `Arc<Mutex<>>` for thread
/// safety.
///
/// # Graph Representation
///
/// Graph edges are directed from **prerequisite to dependent**
/// (`depends_on_id -> milestone_id`); the edge weight is the stored
/// [`EdgeId`]. See the module-level documentation for the full convention.
pub(crate) struct EdgeStoreInner {
    /// Edges indexed by ID for O(1) lookups
    pub(super) edges: HashMap<EdgeId, DependencyEdge>,

    /// Edge IDs in creation order.
    ///
    /// Listing and path tie-breaking iterate this, never the HashMap, so
    /// results are deterministic across runs.
    pub(super) order: Vec<EdgeId>,

    /// Dependency graph using petgraph.
    ///
    /// Nodes contain `MilestoneId` values, edges contain `EdgeId` weights.
    /// Edge direction: source (prerequisite) -> target (dependent).
    pub(super) graph: DiGraph<MilestoneId, EdgeId>,

    /// Mapping from MilestoneId to graph NodeIndex.
    ///
    /// Nodes are created lazily on first reference and retained after
    /// their last edge is removed, keeping indices stable.
    pub(super) node_map: HashMap<MilestoneId, NodeIndex>,

    /// ID generator for creating new edge IDs
    pub(super) id_generator: EdgeIdGenerator,

    /// Change-event fan-out to subscribers
    pub(super) events: broadcast::Sender<ChangeEvent>,

    /// Store tunables
    pub(super) config: StoreConfig,
}

impl EdgeStoreInner {
    /// Create a new empty store instance
    pub(crate) fn new(config: StoreConfig) -> Self {
        let generator_config = EdgeIdGeneratorConfig {
            prefix: config.id_prefix.clone(),
            store_size: 0,
        };
        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        Self {
            edges: HashMap::new(),
            order: Vec::new(),
            graph: DiGraph::new(),
            node_map: HashMap::new(),
            id_generator: EdgeIdGenerator::new(generator_config),
            events,
            config,
        }
    }

    /// Update the ID generator's store size if we've crossed a threshold.
    ///
    /// ID length changes at 500 and 1500 edges, so we only need to rebuild
    /// when crossing these boundaries. This avoids O(n) re-registration on
    /// every create.
    pub(super) fn update_id_generator_if_needed(&mut self) {
        let current_size = self.edges.len();
        let old_size = self.id_generator.store_size();

        let needs_update = match (old_size, current_size) {
            // Crossing 500 boundary (4 -> 5 chars)
            (0..=500, 501..) => true,
            // Crossing 1500 boundary (5 -> 6 chars)
            (0..=1500, 1501..) => true,
            // Crossing backwards (rare, but possible after deletes)
            (501.., 0..=500) => true,
            (1501.., 0..=1500) => true,
            _ => false,
        };

        if needs_update {
            self.id_generator = EdgeIdGenerator::new(EdgeIdGeneratorConfig {
                prefix: self.config.id_prefix.clone(),
                store_size: current_size,
            });

            // Re-register all existing IDs (O(n), but only at thresholds)
            for id in self.edges.keys() {
                self.id_generator.register_id(id.as_str().to_string());
            }
        }
    }

    /// Generate a new unique ID for an edge
    pub(super) fn generate_id(&mut self, new: &NewDependency) -> Result<EdgeId> {
        // Update generator config if we've crossed a length threshold
        self.update_id_generator_if_needed();

        let id_str = self
            .id_generator
            .generate(
                new.milestone_id.as_str(),
                new.depends_on_id.as_str(),
                new.created_by.as_deref(),
            )
            .map_err(|e| Error::Internal(format!("Edge ID generation failed: {}", e)))?;

        Ok(EdgeId::new(id_str))
    }

    /// Graph node for the milestone, created on first reference.
    pub(super) fn ensure_node(&mut self, id: &MilestoneId) -> NodeIndex {
        if let Some(&node) = self.node_map.get(id) {
            return node;
        }
        let node = self.graph.add_node(id.clone());
        self.node_map.insert(id.clone(), node);
        node
    }

    /// The graph edge for an ordered (dependent, prerequisite) pair.
    ///
    /// Returns `None` when either milestone has no node yet or no edge
    /// connects the pair. Pair uniqueness means at most one can exist.
    pub(super) fn find_graph_edge(
        &self,
        milestone_id: &MilestoneId,
        depends_on_id: &MilestoneId,
    ) -> Option<EdgeIndex> {
        let &from = self.node_map.get(depends_on_id)?;
        let &to = self.node_map.get(milestone_id)?;
        self.graph.find_edge(from, to)
    }

    /// Stored edges in creation order.
    pub(super) fn edges_in_order(&self) -> impl Iterator<Item = &DependencyEdge> {
        self.order.iter().filter_map(|id| self.edges.get(id))
    }

    /// Push a change event to subscribers.
    ///
    /// Best-effort fan-out: an error just means nobody is listening.
    pub(super) fn emit(&self, event: ChangeEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_node_is_idempotent() {
        let mut inner = EdgeStoreInner::new(StoreConfig::default());
        let a = inner.ensure_node(&MilestoneId::new("a"));
        let again = inner.ensure_node(&MilestoneId::new("a"));
        assert_eq!(a, again);
        assert_eq!(inner.graph.node_count(), 1);
    }

    #[test]
    fn generate_id_uses_configured_prefix() {
        let mut inner = EdgeStoreInner::new(StoreConfig::with_prefix("plan"));
        let id = inner
            .generate_id(&NewDependency::finish_to_start("b", "a"))
            .unwrap();
        assert!(id.as_str().starts_with("plan-"));
    }
}
