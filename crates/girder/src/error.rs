//! Error types for girder operations.

use crate::domain::{EdgeId, MilestoneId};
use thiserror::Error;

/// The error type for girder store operations.
///
/// Every variant is an expected, recoverable condition reported
/// synchronously to the caller. A failed mutation never leaves the store
/// partially modified: all validation runs before the first write.
#[derive(Debug, Error)]
pub enum Error {
    /// A milestone cannot depend on itself.
    #[error("Milestone cannot depend on itself: {milestone_id}")]
    SelfDependency {
        /// The milestone that referenced itself.
        milestone_id: MilestoneId,
    },

    /// An edge already exists for this ordered (dependent, prerequisite) pair.
    #[error("Dependency already exists: {milestone_id} -> {depends_on_id}")]
    DependencyExists {
        /// The dependent milestone.
        milestone_id: MilestoneId,
        /// The prerequisite milestone.
        depends_on_id: MilestoneId,
    },

    /// Adding or retargeting this edge would create a dependency cycle.
    #[error("Circular dependency: {milestone_id} -> {depends_on_id} would close a loop")]
    CircularDependency {
        /// The dependent milestone of the rejected edge.
        milestone_id: MilestoneId,
        /// The prerequisite milestone of the rejected edge.
        depends_on_id: MilestoneId,
    },

    /// No edge with the given id exists.
    #[error("Dependency edge not found: {0}")]
    EdgeNotFound(EdgeId),

    /// Unexpected internal fault (e.g. edge ID collision exhaustion).
    ///
    /// Unlike the validation variants above, this indicates a bug or
    /// resource exhaustion rather than bad caller input. The store is
    /// still left unmodified.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for girder operations.
pub type Result<T> = std::result::Result<T, Error>;
