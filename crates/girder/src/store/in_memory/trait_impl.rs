//! DependencyStore trait implementation for the in-memory store.

use super::graph::{
    critical_path_impl, find_set_cycle, max_chain_length_impl, would_create_cycle_impl,
};
use super::InMemoryStore;
use crate::domain::{
    ChangeEvent, DependencyEdge, DependencyGraph, DependencyUpdate, EdgeFilter, EdgeId, GraphEdge,
    GraphNode, MilestoneId, MilestoneMeta, NewDependency, ValidationError, ValidationErrorKind,
    ValidationReport, ValidationWarning, ValidationWarningKind,
};
use crate::error::{Error, Result};
use crate::store::DependencyStore;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Drop duplicate milestone IDs, keeping first occurrence order.
///
/// Set-valued operations are order-sensitive (tie-breaking, report
/// ordering), so this is a stable dedup rather than a HashSet collect.
fn dedupe_members(milestone_ids: &[MilestoneId]) -> Vec<MilestoneId> {
    let mut seen: HashSet<&MilestoneId> = HashSet::new();
    milestone_ids
        .iter()
        .filter(|id| seen.insert(*id))
        .cloned()
        .collect()
}

#[async_trait]
impl DependencyStore for InMemoryStore {
    async fn create(&mut self, new: NewDependency) -> Result<DependencyEdge> {
        let mut inner = self.lock().await;

        // === Phase 1: All validations (no mutations) ===
        if new.milestone_id == new.depends_on_id {
            return Err(Error::SelfDependency {
                milestone_id: new.milestone_id,
            });
        }

        // Duplicate ordered pair, via graph lookup (one edge per pair)
        if inner
            .find_graph_edge(&new.milestone_id, &new.depends_on_id)
            .is_some()
        {
            return Err(Error::DependencyExists {
                milestone_id: new.milestone_id,
                depends_on_id: new.depends_on_id,
            });
        }

        // Cycle pre-check, in the same critical section as the write
        if would_create_cycle_impl(
            &inner.graph,
            &inner.node_map,
            &new.milestone_id,
            &new.depends_on_id,
            None,
        ) {
            warn!(
                milestone = %new.milestone_id,
                depends_on = %new.depends_on_id,
                "Rejected dependency: would create a cycle"
            );
            return Err(Error::CircularDependency {
                milestone_id: new.milestone_id,
                depends_on_id: new.depends_on_id,
            });
        }

        // === Phase 2: ID generation (last fallible step) ===
        let id = inner.generate_id(&new)?;

        // === Phase 3: Write (all validations passed) ===
        let edge = DependencyEdge {
            id: id.clone(),
            milestone_id: new.milestone_id,
            depends_on_id: new.depends_on_id,
            dependency_type: new.dependency_type,
            lag_days: new.lag_days,
            created_at: Utc::now(),
            created_by: new.created_by,
        };

        let from = inner.ensure_node(&edge.depends_on_id);
        let to = inner.ensure_node(&edge.milestone_id);
        inner.graph.add_edge(from, to, id.clone());
        inner.edges.insert(id.clone(), edge.clone());
        inner.order.push(id);

        // === Phase 4: Notify ===
        debug!(
            edge = %edge.id,
            milestone = %edge.milestone_id,
            depends_on = %edge.depends_on_id,
            "Created dependency edge"
        );
        inner.emit(ChangeEvent::Created { edge: edge.clone() });

        Ok(edge)
    }

    async fn update(&mut self, id: &EdgeId, updates: DependencyUpdate) -> Result<DependencyEdge> {
        let mut inner = self.lock().await;

        let before = inner
            .edges
            .get(id)
            .cloned()
            .ok_or_else(|| Error::EdgeNotFound(id.clone()))?;

        // === Phase 1: All validations (no mutations) ===
        let new_depends_on = updates
            .depends_on_id
            .clone()
            .unwrap_or_else(|| before.depends_on_id.clone());
        let retargeted = new_depends_on != before.depends_on_id;

        if retargeted {
            if new_depends_on == before.milestone_id {
                return Err(Error::SelfDependency {
                    milestone_id: before.milestone_id,
                });
            }

            if inner
                .find_graph_edge(&before.milestone_id, &new_depends_on)
                .is_some()
            {
                return Err(Error::DependencyExists {
                    milestone_id: before.milestone_id,
                    depends_on_id: new_depends_on,
                });
            }

            // Cycle check against the graph without this edge: the old
            // prerequisite link no longer exists once the retarget lands.
            if would_create_cycle_impl(
                &inner.graph,
                &inner.node_map,
                &before.milestone_id,
                &new_depends_on,
                Some(id),
            ) {
                warn!(
                    edge = %id,
                    milestone = %before.milestone_id,
                    depends_on = %new_depends_on,
                    "Rejected retarget: would create a cycle"
                );
                return Err(Error::CircularDependency {
                    milestone_id: before.milestone_id,
                    depends_on_id: new_depends_on,
                });
            }
        }

        // === Phase 2: Write ===
        let mut after = before.clone();
        if let Some(dependency_type) = updates.dependency_type {
            after.dependency_type = dependency_type;
        }
        if let Some(lag_days) = updates.lag_days {
            after.lag_days = lag_days;
        }
        if retargeted {
            after.depends_on_id = new_depends_on.clone();

            // Rewire the graph edge to the new prerequisite
            if let Some(graph_edge) =
                inner.find_graph_edge(&before.milestone_id, &before.depends_on_id)
            {
                inner.graph.remove_edge(graph_edge);
            }
            let from = inner.ensure_node(&new_depends_on);
            let to = inner.ensure_node(&before.milestone_id);
            inner.graph.add_edge(from, to, id.clone());
        }
        inner.edges.insert(id.clone(), after.clone());

        // === Phase 3: Notify ===
        debug!(edge = %id, retargeted, "Updated dependency edge");
        inner.emit(ChangeEvent::Updated {
            before,
            after: after.clone(),
        });

        Ok(after)
    }

    async fn delete(&mut self, id: &EdgeId) -> Result<DependencyEdge> {
        let mut inner = self.lock().await;

        // Removing an edge cannot create a cycle; existence is the only check
        let edge = inner
            .edges
            .remove(id)
            .ok_or_else(|| Error::EdgeNotFound(id.clone()))?;

        inner.order.retain(|ordered| ordered != id);
        if let Some(graph_edge) = inner.find_graph_edge(&edge.milestone_id, &edge.depends_on_id) {
            inner.graph.remove_edge(graph_edge);
        }
        // Milestone nodes are retained; see module docs.

        debug!(
            edge = %edge.id,
            milestone = %edge.milestone_id,
            depends_on = %edge.depends_on_id,
            "Deleted dependency edge"
        );
        inner.emit(ChangeEvent::Deleted { edge: edge.clone() });

        Ok(edge)
    }

    async fn get(&self, id: &EdgeId) -> Result<Option<DependencyEdge>> {
        let inner = self.lock().await;
        Ok(inner.edges.get(id).cloned())
    }

    async fn list(&self, filter: &EdgeFilter) -> Result<Vec<DependencyEdge>> {
        let inner = self.lock().await;

        let mut edges: Vec<DependencyEdge> = inner
            .edges_in_order()
            .filter(|edge| {
                if let Some(milestone_id) = &filter.milestone_id {
                    if &edge.milestone_id != milestone_id {
                        return false;
                    }
                }

                if let Some(depends_on_id) = &filter.depends_on_id {
                    if &edge.depends_on_id != depends_on_id {
                        return false;
                    }
                }

                if let Some(dependency_type) = filter.dependency_type {
                    if edge.dependency_type != dependency_type {
                        return false;
                    }
                }

                true
            })
            .cloned()
            .collect();

        if let Some(limit) = filter.limit {
            edges.truncate(limit);
        }

        Ok(edges)
    }

    async fn dependencies_of(&self, milestone_id: &MilestoneId) -> Result<Vec<DependencyEdge>> {
        let inner = self.lock().await;
        Ok(inner
            .edges_in_order()
            .filter(|edge| &edge.milestone_id == milestone_id)
            .cloned()
            .collect())
    }

    async fn dependents_of(&self, milestone_id: &MilestoneId) -> Result<Vec<DependencyEdge>> {
        let inner = self.lock().await;
        Ok(inner
            .edges_in_order()
            .filter(|edge| &edge.depends_on_id == milestone_id)
            .cloned()
            .collect())
    }

    async fn would_create_cycle(
        &self,
        milestone_id: &MilestoneId,
        depends_on_id: &MilestoneId,
    ) -> Result<bool> {
        let inner = self.lock().await;
        Ok(would_create_cycle_impl(
            &inner.graph,
            &inner.node_map,
            milestone_id,
            depends_on_id,
            None,
        ))
    }

    async fn max_chain_length(&self, milestone_id: &MilestoneId) -> Result<usize> {
        let inner = self.lock().await;
        Ok(max_chain_length_impl(
            &inner.graph,
            &inner.node_map,
            milestone_id,
            inner.config.max_traversal_depth,
        ))
    }

    async fn validate_set(&self, milestone_ids: &[MilestoneId]) -> Result<ValidationReport> {
        let inner = self.lock().await;

        let members = dedupe_members(milestone_ids);
        let member_set: HashSet<&MilestoneId> = members.iter().collect();

        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // Cycle scan over the restricted subgraph. The store keeps the
        // full graph acyclic, so this protects against caller sets built
        // from stale or merged edge data rather than everyday state.
        let restricted: Vec<&DependencyEdge> = inner
            .edges_in_order()
            .filter(|edge| {
                member_set.contains(&edge.milestone_id) && member_set.contains(&edge.depends_on_id)
            })
            .collect();

        if let Some((milestone_id, depends_on_id)) = find_set_cycle(&members, &restricted) {
            errors.push(ValidationError {
                kind: ValidationErrorKind::CircularDependency,
                message: format!(
                    "Dependency cycle detected: {milestone_id} depends on {depends_on_id}, \
                     which transitively depends on {milestone_id}"
                ),
                milestone_ids: vec![milestone_id, depends_on_id],
            });
        }

        // Members gated by milestones outside the set
        for edge in inner.edges_in_order() {
            if member_set.contains(&edge.milestone_id) && !member_set.contains(&edge.depends_on_id)
            {
                warnings.push(ValidationWarning {
                    kind: ValidationWarningKind::ExternalDependency,
                    message: format!(
                        "{} depends on {}, which is not in the selected set",
                        edge.milestone_id, edge.depends_on_id
                    ),
                    milestone_id: edge.milestone_id.clone(),
                });
            }
        }

        // Members with deep prerequisite chains
        let threshold = inner.config.chain_warning_threshold;
        for member in &members {
            let depth = max_chain_length_impl(
                &inner.graph,
                &inner.node_map,
                member,
                inner.config.max_traversal_depth,
            );
            if depth > threshold {
                warnings.push(ValidationWarning {
                    kind: ValidationWarningKind::LongDependencyChain,
                    message: format!(
                        "{member} sits on a dependency chain {depth} levels deep \
                         (threshold {threshold})"
                    ),
                    milestone_id: member.clone(),
                });
            }
        }

        Ok(ValidationReport {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        })
    }

    async fn critical_path(&self, milestone_ids: &[MilestoneId]) -> Result<Vec<MilestoneId>> {
        let inner = self.lock().await;

        let members = dedupe_members(milestone_ids);
        let member_set: HashSet<&MilestoneId> = members.iter().collect();

        let restricted: Vec<&DependencyEdge> = inner
            .edges_in_order()
            .filter(|edge| {
                member_set.contains(&edge.milestone_id) && member_set.contains(&edge.depends_on_id)
            })
            .collect();

        Ok(critical_path_impl(&members, &restricted))
    }

    async fn build_graph(
        &self,
        milestone_ids: &[MilestoneId],
        metadata: &HashMap<MilestoneId, MilestoneMeta>,
    ) -> Result<DependencyGraph> {
        let inner = self.lock().await;

        let members = dedupe_members(milestone_ids);
        let member_set: HashSet<&MilestoneId> = members.iter().collect();

        let restricted: Vec<&DependencyEdge> = inner
            .edges_in_order()
            .filter(|edge| {
                member_set.contains(&edge.milestone_id) && member_set.contains(&edge.depends_on_id)
            })
            .collect();

        let critical_path = critical_path_impl(&members, &restricted);
        let critical_nodes: HashSet<&MilestoneId> = critical_path.iter().collect();
        let critical_hops: HashSet<(&MilestoneId, &MilestoneId)> = critical_path
            .windows(2)
            .map(|hop| (&hop[0], &hop[1]))
            .collect();

        let nodes = members
            .iter()
            .map(|id| match metadata.get(id) {
                Some(meta) => GraphNode {
                    id: id.clone(),
                    label: meta.label.clone(),
                    node_type: meta.milestone_type.clone(),
                    status: Some(meta.status),
                    progress: meta.progress,
                    due_date: meta.due_date,
                    is_overdue: meta.is_overdue,
                    is_critical: critical_nodes.contains(id),
                },
                // No metadata supplied: render a bare placeholder rather
                // than failing the whole graph over missing cosmetics.
                None => GraphNode {
                    id: id.clone(),
                    label: id.to_string(),
                    node_type: "milestone".to_string(),
                    status: None,
                    progress: 0,
                    due_date: None,
                    is_overdue: false,
                    is_critical: critical_nodes.contains(id),
                },
            })
            .collect();

        let edges = restricted
            .iter()
            .map(|edge| GraphEdge {
                id: edge.id.clone(),
                from: edge.depends_on_id.clone(),
                to: edge.milestone_id.clone(),
                dependency_type: edge.dependency_type,
                lag_days: edge.lag_days,
                is_critical: critical_hops.contains(&(&edge.depends_on_id, &edge.milestone_id)),
            })
            .collect();

        Ok(DependencyGraph {
            nodes,
            edges,
            critical_path,
        })
    }

    async fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        let inner = self.lock().await;
        inner.events.subscribe()
    }
}
