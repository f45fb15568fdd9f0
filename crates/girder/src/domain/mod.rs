//! Domain types for milestone dependency tracking.
//!
//! This module contains the core domain types for the girder dependency
//! store. Milestone content (titles, dates, progress) lives in the
//! surrounding application; girder only keys on milestone identifiers and
//! owns the dependency edges between them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a milestone.
///
/// Opaque string key owned by the surrounding application; girder uses it
/// only as a graph-node key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MilestoneId(pub String);

impl MilestoneId {
    /// Create a new milestone ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MilestoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MilestoneId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MilestoneId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for a dependency edge.
///
/// Generated by the store on creation (see [`crate::id_generation`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub String);

impl EdgeId {
    /// Create a new edge ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EdgeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EdgeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Scheduling semantics of a dependency relationship.
///
/// Carried as metadata only: the graph core treats every type identically
/// for cycle and path purposes. Downstream schedulers interpret it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    /// Prerequisite must finish before the dependent starts (the default)
    FinishToStart,

    /// Both milestones start together
    StartToStart,

    /// Both milestones finish together
    FinishToFinish,

    /// Prerequisite must start before the dependent finishes
    StartToFinish,
}

impl Default for DependencyType {
    fn default() -> Self {
        Self::FinishToStart
    }
}

/// A directed dependency between two milestones.
///
/// `milestone_id` is the dependent node, `depends_on_id` the prerequisite.
/// At most one edge exists per ordered `(milestone_id, depends_on_id)`
/// pair, and the full edge set stays acyclic at all times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// Unique identifier for this edge
    pub id: EdgeId,

    /// The dependent milestone
    pub milestone_id: MilestoneId,

    /// The prerequisite milestone
    pub depends_on_id: MilestoneId,

    /// Scheduling semantics (metadata only)
    pub dependency_type: DependencyType,

    /// Offset in days applied by downstream schedulers (metadata only)
    pub lag_days: u32,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Who created the edge, if the collaborator tracks it
    pub created_by: Option<String>,
}

/// Data for creating a new dependency edge.
#[derive(Debug, Clone)]
pub struct NewDependency {
    /// The dependent milestone
    pub milestone_id: MilestoneId,

    /// The prerequisite milestone
    pub depends_on_id: MilestoneId,

    /// Scheduling semantics
    pub dependency_type: DependencyType,

    /// Offset in days
    pub lag_days: u32,

    /// Creator attribution (optional)
    pub created_by: Option<String>,
}

impl NewDependency {
    /// A finish-to-start dependency with no lag, the common case.
    pub fn finish_to_start(
        milestone_id: impl Into<MilestoneId>,
        depends_on_id: impl Into<MilestoneId>,
    ) -> Self {
        Self {
            milestone_id: milestone_id.into(),
            depends_on_id: depends_on_id.into(),
            dependency_type: DependencyType::FinishToStart,
            lag_days: 0,
            created_by: None,
        }
    }
}

/// Data for updating an existing dependency edge.
///
/// Only fields present are modified. The dependent endpoint of an edge is
/// immutable; retarget the prerequisite via `depends_on_id`, which re-runs
/// the cycle pre-check.
#[derive(Debug, Clone, Default)]
pub struct DependencyUpdate {
    /// New prerequisite milestone (if retargeting)
    pub depends_on_id: Option<MilestoneId>,

    /// New scheduling semantics (if updating)
    pub dependency_type: Option<DependencyType>,

    /// New lag offset (if updating)
    pub lag_days: Option<u32>,
}

/// Filter for querying dependency edges.
#[derive(Debug, Clone, Default)]
pub struct EdgeFilter {
    /// Match edges whose dependent is this milestone
    pub milestone_id: Option<MilestoneId>,

    /// Match edges whose prerequisite is this milestone
    pub depends_on_id: Option<MilestoneId>,

    /// Match edges with this dependency type
    pub dependency_type: Option<DependencyType>,

    /// Limit number of results
    pub limit: Option<usize>,
}

/// Status of a milestone, as reported by the owning application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    /// Not yet started
    Planned,

    /// Currently being worked
    InProgress,

    /// Finished
    Completed,

    /// Abandoned; kept for history
    Cancelled,
}

/// Caller-supplied milestone content consumed by the graph builder.
///
/// Girder holds no milestone records of its own; the collaborator that
/// owns them passes this lookup record per milestone when it wants a
/// renderable graph. All fields, including `is_overdue`, are computed by
/// the caller (date arithmetic is out of scope here).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneMeta {
    /// Display label
    pub label: String,

    /// Caller-defined node kind (e.g. "milestone", "phase", "deliverable")
    pub milestone_type: String,

    /// Current status
    pub status: MilestoneStatus,

    /// Completion percentage, 0-100
    pub progress: u8,

    /// Due date, if set
    pub due_date: Option<DateTime<Utc>>,

    /// Whether the caller considers the milestone overdue
    pub is_overdue: bool,
}

/// A renderable graph node, derived on demand by the graph builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// The milestone this node renders
    pub id: MilestoneId,

    /// Display label (falls back to the id when no metadata was supplied)
    pub label: String,

    /// Caller-defined node kind
    pub node_type: String,

    /// Milestone status, if metadata was supplied
    pub status: Option<MilestoneStatus>,

    /// Completion percentage, 0-100
    pub progress: u8,

    /// Due date, if set
    pub due_date: Option<DateTime<Utc>>,

    /// Caller-computed overdue flag
    pub is_overdue: bool,

    /// Whether this node lies on the critical path
    pub is_critical: bool,
}

/// A renderable graph edge, derived on demand by the graph builder.
///
/// Direction points from prerequisite to dependent (`from = depends_on_id`,
/// `to = milestone_id`), matching visual left-to-right flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// The stored edge this renders
    pub id: EdgeId,

    /// The prerequisite milestone
    pub from: MilestoneId,

    /// The dependent milestone
    pub to: MilestoneId,

    /// Scheduling semantics
    pub dependency_type: DependencyType,

    /// Lag offset in days
    pub lag_days: u32,

    /// Whether this edge lies on the critical path
    pub is_critical: bool,
}

/// A renderable dependency graph restricted to a milestone set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyGraph {
    /// One node per requested milestone, in request order
    pub nodes: Vec<GraphNode>,

    /// Edges with both endpoints in the requested set, in creation order
    pub edges: Vec<GraphEdge>,

    /// The longest path by edge count, prerequisite first
    pub critical_path: Vec<MilestoneId>,
}

/// Category of a blocking validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    /// The restricted milestone set contains a dependency cycle
    CircularDependency,
}

/// Category of an advisory validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationWarningKind {
    /// A member of the set depends on a milestone outside the set
    ExternalDependency,

    /// A member's prerequisite chain exceeds the configured depth threshold
    LongDependencyChain,
}

/// A blocking finding from [`validate_set`](crate::store::DependencyStore::validate_set).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Category of the finding
    pub kind: ValidationErrorKind,

    /// Human-readable description
    pub message: String,

    /// Milestones implicated in the finding
    pub milestone_ids: Vec<MilestoneId>,
}

/// An advisory finding from [`validate_set`](crate::store::DependencyStore::validate_set).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationWarning {
    /// Category of the finding
    pub kind: ValidationWarningKind,

    /// Human-readable description
    pub message: String,

    /// The set member the finding is about
    pub milestone_id: MilestoneId,
}

/// Result of validating a milestone set.
///
/// Errors invalidate the set; warnings are advisory only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// True when no errors were found (warnings do not invalidate)
    pub is_valid: bool,

    /// Blocking findings
    pub errors: Vec<ValidationError>,

    /// Advisory findings
    pub warnings: Vec<ValidationWarning>,
}

/// Change notification emitted after every successful mutation.
///
/// Delivered through the store's broadcast channel (see
/// [`subscribe`](crate::store::DependencyStore::subscribe)) so UI and
/// cache layers can react without polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeEvent {
    /// An edge was created
    Created {
        /// The new edge
        edge: DependencyEdge,
    },

    /// An edge was updated
    Updated {
        /// The edge before the update
        before: DependencyEdge,
        /// The edge after the update
        after: DependencyEdge,
    },

    /// An edge was deleted
    Deleted {
        /// The removed edge
        edge: DependencyEdge,
    },
}
