//! Store abstraction layer for girder.
//!
//! This module provides the core dependency-store trait and the factory
//! for constructing store instances. One implementation ships today:
//!
//! - **In-memory**: HashMap + petgraph backed, the authoritative edge set
//!   for an embedding application
//!
//! # Architecture
//!
//! The store uses an async trait so embedders running inside a request
//! loop can share one instance across tasks. The trait is object-safe,
//! allowing dynamic dispatch via `Box<dyn DependencyStore>`.
//!
//! Every mutation is serialized: validation, cycle detection, the write,
//! and the change notification all happen inside one critical section, so
//! two concurrent creates that would each pass cycle detection in
//! isolation can never jointly close a loop.
//!
//! # Test Utilities
//!
//! This module provides a [`MockStore`] implementation for testing code
//! that depends on the [`DependencyStore`] trait. To use it in your tests,
//! enable the `test-util` feature:
//!
//! ```toml
//! [dev-dependencies]
//! girder = { version = "...", features = ["test-util"] }
//! ```
//!
//! # Example
//!
//! ```
//! use girder::config::StoreConfig;
//! use girder::domain::NewDependency;
//! use girder::store::new_in_memory_store;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let mut store = new_in_memory_store(StoreConfig::default());
//!
//!     // "beta" depends on "alpha"
//!     let edge = store
//!         .create(NewDependency::finish_to_start("beta", "alpha"))
//!         .await?;
//!     println!("Created dependency: {}", edge.id);
//!
//!     Ok(())
//! }
//! ```

use crate::domain::{
    ChangeEvent, DependencyEdge, DependencyGraph, DependencyUpdate, EdgeFilter, EdgeId,
    MilestoneId, MilestoneMeta, NewDependency, ValidationReport,
};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::broadcast;

// Store backend implementations
pub mod in_memory;

pub use in_memory::new_in_memory_store;

/// Core store trait for milestone dependency management.
///
/// This trait defines the interface the surrounding CRUD/API layer
/// programs against. Implementations must be `Send + Sync` to support
/// concurrent access in async contexts.
///
/// # Method Categories
///
/// - **Mutations**: `create`, `update`, `delete`
/// - **Lookups**: `get`, `list`, `dependencies_of`, `dependents_of`
/// - **Analysis**: `would_create_cycle`, `max_chain_length`,
///   `validate_set`, `critical_path`, `build_graph`
/// - **Notification**: `subscribe`
///
/// # Error Handling
///
/// All methods return `Result<T>` where the error kinds are:
/// - `SelfDependency`: a milestone referenced itself
/// - `DependencyExists`: duplicate ordered endpoint pair
/// - `CircularDependency`: the mutation would create a cycle
/// - `EdgeNotFound`: unknown edge id on update/delete
/// - `Internal`: unexpected fault; the store is left unmodified
///
/// # Determinism
///
/// Set-valued analysis operations take ordered slices, not hash sets:
/// tie-breaking in the critical path finder and ordering in reports follow
/// the caller's input order and edge creation order, and are stable across
/// runs.
#[async_trait]
pub trait DependencyStore: Send + Sync {
    // ========== Mutations ==========

    /// Create a new dependency edge.
    ///
    /// Generates a unique edge ID, validates the endpoints, and runs cycle
    /// detection before writing. Emits [`ChangeEvent::Created`] on success.
    ///
    /// # Errors
    ///
    /// - `Error::SelfDependency` if the endpoints are equal
    /// - `Error::DependencyExists` if the ordered pair already has an edge
    /// - `Error::CircularDependency` if the edge would close a loop
    /// - `Error::Internal` if ID generation exhausts its collision retries
    async fn create(&mut self, new: NewDependency) -> Result<DependencyEdge>;

    /// Update an existing dependency edge.
    ///
    /// Only fields present in `updates` are modified. Retargeting
    /// `depends_on_id` re-runs uniqueness and cycle checks against the
    /// graph *without* this edge, so swinging a prerequisite sideways in a
    /// chain is not a false positive. Emits [`ChangeEvent::Updated`] on
    /// success and returns the updated edge.
    ///
    /// # Errors
    ///
    /// - `Error::EdgeNotFound` if the edge doesn't exist
    /// - `Error::SelfDependency` if the new prerequisite equals the dependent
    /// - `Error::DependencyExists` if the new pair collides with another edge
    /// - `Error::CircularDependency` if the retarget would close a loop
    async fn update(&mut self, id: &EdgeId, updates: DependencyUpdate) -> Result<DependencyEdge>;

    /// Delete a dependency edge.
    ///
    /// No cycle check is needed: removing an edge can never create a
    /// cycle. Emits [`ChangeEvent::Deleted`] and returns the removed edge
    /// so collaborators can reconcile their own bookkeeping.
    ///
    /// # Errors
    ///
    /// - `Error::EdgeNotFound` if the edge doesn't exist
    async fn delete(&mut self, id: &EdgeId) -> Result<DependencyEdge>;

    // ========== Lookups ==========

    /// Get an edge by ID.
    ///
    /// Returns `None` if the edge doesn't exist.
    async fn get(&self, id: &EdgeId) -> Result<Option<DependencyEdge>>;

    /// List edges matching the given filter, in creation order.
    async fn list(&self, filter: &EdgeFilter) -> Result<Vec<DependencyEdge>>;

    /// All edges where the given milestone is the dependent.
    ///
    /// These are the milestone's own prerequisites.
    async fn dependencies_of(&self, milestone_id: &MilestoneId) -> Result<Vec<DependencyEdge>>;

    /// All edges where the given milestone is the prerequisite.
    ///
    /// These are the milestones gated by it.
    async fn dependents_of(&self, milestone_id: &MilestoneId) -> Result<Vec<DependencyEdge>>;

    // ========== Analysis ==========

    /// Check whether adding `milestone_id depends-on depends_on_id` would
    /// create a cycle.
    ///
    /// Pure query; does not mutate. A self-referencing pair reports `true`
    /// (it is the one-node cycle), though mutations reject that case with
    /// `SelfDependency` before cycle detection runs.
    async fn would_create_cycle(
        &self,
        milestone_id: &MilestoneId,
        depends_on_id: &MilestoneId,
    ) -> Result<bool>;

    /// Longest prerequisite chain depth reachable from the milestone.
    ///
    /// 0 for a milestone with no prerequisites. Advisory only (used for
    /// "dependency chain longer than N levels" warnings); never gates
    /// mutations. Bounded by the configured traversal depth guard.
    async fn max_chain_length(&self, milestone_id: &MilestoneId) -> Result<usize>;

    /// Validate a milestone set for planning.
    ///
    /// Errors: a dependency cycle inside the set. Warnings: members
    /// depending on milestones outside the set, and members whose
    /// prerequisite chain exceeds the configured depth threshold.
    async fn validate_set(&self, milestone_ids: &[MilestoneId]) -> Result<ValidationReport>;

    /// The longest dependency path, by edge count, within the set.
    ///
    /// Returns milestone IDs ordered prerequisite-first, or an empty
    /// vector when the set is empty or contains no internal edges. This is
    /// a structural hop-count metric: `lag_days` and milestone dates are
    /// deliberately ignored.
    async fn critical_path(&self, milestone_ids: &[MilestoneId]) -> Result<Vec<MilestoneId>>;

    /// Assemble a renderable graph for the set.
    ///
    /// One node per requested milestone (populated from `metadata`, with a
    /// bare placeholder when a milestone has no entry), one edge per
    /// stored dependency inside the set, and the critical path computed
    /// over the same set with its nodes and edges flagged.
    async fn build_graph(
        &self,
        milestone_ids: &[MilestoneId],
        metadata: &HashMap<MilestoneId, MilestoneMeta>,
    ) -> Result<DependencyGraph>;

    // ========== Notification ==========

    /// Subscribe to change events.
    ///
    /// Every successful mutation pushes one [`ChangeEvent`] in mutation
    /// order. Delivery is best-effort fan-out: a subscriber that falls
    /// behind the channel capacity observes a lag error, and mutations
    /// never block on slow subscribers.
    async fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}

// ========== Test Utilities ==========

/// The hardcoded edge ID returned by [`MockStore`].
#[cfg(any(test, feature = "test-util"))]
pub const MOCK_EDGE_ID: &str = "dep-test";

/// Mock implementation of [`DependencyStore`] for testing.
///
/// This is a **stateless** mock that provides a minimal implementation of
/// the store trait for verifying trait-object usage. It always answers
/// with hardcoded data for edge "dep-test" and persists nothing between
/// calls.
///
/// # Availability
///
/// This type is available when running tests (`#[cfg(test)]`) or when the
/// `test-util` feature is enabled.
///
/// # Behavior
///
/// - `create`: returns a new edge with ID "dep-test"
/// - `get`: returns `Some` only for ID "dep-test", `None` otherwise
/// - `list`, `dependencies_of`, `dependents_of`: return empty vectors
/// - `would_create_cycle`: always `false`; `max_chain_length`: always 0
/// - `critical_path`: empty; `validate_set`: valid with no findings
/// - `build_graph`: empty graph
/// - `subscribe`: a receiver on a channel nothing ever sends to
/// - `update` / `delete`: unimplemented (panic if called)
///
/// For testing real graph behavior, use
/// [`new_in_memory_store`](in_memory::new_in_memory_store) instead.
#[cfg(any(test, feature = "test-util"))]
#[derive(Clone, Copy)]
#[non_exhaustive]
pub struct MockStore;

#[cfg(any(test, feature = "test-util"))]
impl MockStore {
    /// Create a new MockStore instance.
    pub fn new() -> Self {
        Self
    }

    /// Creates a test edge with the given ID.
    ///
    /// Useful for building expected values in downstream tests that need
    /// to match the shape returned by [`MockStore`].
    pub fn create_test_edge(id: EdgeId) -> DependencyEdge {
        use crate::domain::DependencyType;
        use chrono::Utc;

        DependencyEdge {
            id,
            milestone_id: MilestoneId::new("beta"),
            depends_on_id: MilestoneId::new("alpha"),
            dependency_type: DependencyType::FinishToStart,
            lag_days: 0,
            created_at: Utc::now(),
            created_by: None,
        }
    }
}

#[cfg(any(test, feature = "test-util"))]
impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-util"))]
#[async_trait]
impl DependencyStore for MockStore {
    async fn create(&mut self, _new: NewDependency) -> Result<DependencyEdge> {
        Ok(Self::create_test_edge(EdgeId::new(MOCK_EDGE_ID)))
    }

    async fn update(&mut self, _id: &EdgeId, _updates: DependencyUpdate) -> Result<DependencyEdge> {
        unimplemented!(
            "MockStore::update() is not implemented. Use new_in_memory_store() for full mutation support."
        )
    }

    async fn delete(&mut self, _id: &EdgeId) -> Result<DependencyEdge> {
        unimplemented!(
            "MockStore::delete() is not implemented. Use new_in_memory_store() for full mutation support."
        )
    }

    async fn get(&self, id: &EdgeId) -> Result<Option<DependencyEdge>> {
        if id.as_str() == MOCK_EDGE_ID {
            Ok(Some(Self::create_test_edge(id.clone())))
        } else {
            Ok(None)
        }
    }

    async fn list(&self, _filter: &EdgeFilter) -> Result<Vec<DependencyEdge>> {
        Ok(vec![])
    }

    async fn dependencies_of(&self, _milestone_id: &MilestoneId) -> Result<Vec<DependencyEdge>> {
        Ok(vec![])
    }

    async fn dependents_of(&self, _milestone_id: &MilestoneId) -> Result<Vec<DependencyEdge>> {
        Ok(vec![])
    }

    async fn would_create_cycle(
        &self,
        _milestone_id: &MilestoneId,
        _depends_on_id: &MilestoneId,
    ) -> Result<bool> {
        Ok(false)
    }

    async fn max_chain_length(&self, _milestone_id: &MilestoneId) -> Result<usize> {
        Ok(0)
    }

    async fn validate_set(&self, _milestone_ids: &[MilestoneId]) -> Result<ValidationReport> {
        Ok(ValidationReport {
            is_valid: true,
            errors: vec![],
            warnings: vec![],
        })
    }

    async fn critical_path(&self, _milestone_ids: &[MilestoneId]) -> Result<Vec<MilestoneId>> {
        Ok(vec![])
    }

    async fn build_graph(
        &self,
        _milestone_ids: &[MilestoneId],
        _metadata: &HashMap<MilestoneId, MilestoneMeta>,
    ) -> Result<DependencyGraph> {
        Ok(DependencyGraph {
            nodes: vec![],
            edges: vec![],
            critical_path: vec![],
        })
    }

    async fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        let (tx, rx) = broadcast::channel(1);
        // Sender dropped immediately; the receiver only ever reports Closed.
        drop(tx);
        rx
    }
}
