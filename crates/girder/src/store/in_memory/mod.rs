//! In-memory store backend using HashMap and petgraph.
//!
//! This module provides the authoritative in-memory edge set. All data is
//! held in RAM and owned by whatever service embeds the store; persistence
//! is explicitly out of scope and is the embedding application's concern.
//!
//! # Architecture
//!
//! The implementation uses:
//! - `HashMap<EdgeId, DependencyEdge>` for O(1) edge lookups
//! - a `Vec<EdgeId>` insertion-order index so listings and path
//!   tie-breaking are deterministic (HashMap iteration order is never
//!   exposed)
//! - `petgraph::DiGraph` for the dependency graph traversals
//! - `HashMap<MilestoneId, NodeIndex>` mapping milestone keys to graph
//!   nodes
//! - hash-based edge ID generation with adaptive length (4-6 chars)
//!
//! ## Graph Representation and Edge Direction Convention
//!
//! Graph edges point from **prerequisite to dependent**:
//!
//! - **Edge source**: the milestone being depended upon (`depends_on_id`)
//! - **Edge target**: the milestone that has the dependency (`milestone_id`)
//! - **Edge weight**: the [`EdgeId`](crate::domain::EdgeId) of the stored edge
//!
//! This matches the direction of work flow and of rendered graphs: a walk
//! along outgoing edges visits milestones that are (transitively) gated by
//! the current one, and a walk along incoming edges visits its
//! prerequisites.
//!
//! Cycle detection for a candidate edge `milestone depends-on prerequisite`
//! therefore walks **outgoing** edges from the prerequisite: if the
//! dependent is reachable, the prerequisite already (transitively) depends
//! on it and the candidate would close a loop.
//!
//! Graph nodes are created lazily when a milestone is first referenced by
//! an edge and are retained after their last edge is deleted; an isolated
//! node is unreachable by every traversal, and retaining it keeps node
//! indices stable.
//!
//! # Thread Safety
//!
//! The store is wrapped in `Arc<Mutex<EdgeStoreInner>>`. Every operation
//! acquires the mutex, so the cycle pre-check, the write it gates, and the
//! change notification happen in one critical section; a check-then-act
//! race between two mutations cannot produce a cycle.
//!
//! # Performance Characteristics
//!
//! - Create: O(V + E) for the cycle pre-check, O(1) for the write
//! - Read: O(1) for single edge lookups, O(n) for filtered listings
//! - Update: O(V + E) when retargeting (re-runs the cycle check)
//! - Delete: O(n) (insertion-order index maintenance)
//! - Chain length: O(V + E) memoized walk, bounded by the depth guard
//! - Critical path: exponential in the worst case (exhaustive simple-path
//!   enumeration, as specified); bounded by the caller-controlled set size

mod graph;
mod inner;
mod trait_impl;

use crate::config::StoreConfig;
use crate::store::DependencyStore;
use inner::EdgeStoreInner;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Thread-safe in-memory store.
///
/// This type alias wraps the inner store in `Arc<Mutex<>>` for thread-safe
/// async access. It implements [`DependencyStore`] via the trait
/// implementation in `trait_impl.rs`.
pub(crate) type InMemoryStore = Arc<Mutex<EdgeStoreInner>>;

/// Create a new in-memory store instance.
///
/// # Example
///
/// ```
/// use girder::config::StoreConfig;
/// use girder::store::new_in_memory_store;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let store = new_in_memory_store(StoreConfig::default());
///     // Use store...
/// }
/// ```
pub fn new_in_memory_store(config: StoreConfig) -> Box<dyn DependencyStore> {
    Box::new(Arc::new(Mutex::new(EdgeStoreInner::new(config))))
}
