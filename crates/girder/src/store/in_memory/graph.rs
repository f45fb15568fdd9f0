//! Dependency graph algorithms.
//!
//! This module provides the graph traversals for the in-memory store:
//! - Cycle detection for candidate edges
//! - Prerequisite chain depth analysis
//! - Cycle scan over a restricted milestone set
//! - Critical path finding (longest simple path by edge count)
//!
//! Every walk uses an explicit stack rather than call recursion, so
//! arbitrarily deep graphs cannot overflow the thread stack.
//!
//! # Edge Direction Reminder
//!
//! Graph edges point from **prerequisite to dependent**
//! (`depends_on_id -> milestone_id`):
//! - `Direction::Incoming` from a node reaches its prerequisites
//! - `Direction::Outgoing` reaches the milestones it gates

use crate::domain::{DependencyEdge, EdgeId, MilestoneId};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Internal implementation of candidate-edge cycle detection.
///
/// Checks whether `milestone_id depends-on depends_on_id` would close a
/// loop: starting from the candidate's prerequisite, the walk follows
/// depends-on links (incoming graph edges) toward ever-deeper
/// prerequisites. Reaching `milestone_id` means the prerequisite is
/// transitively dependent on the candidate, so the new edge would complete
/// a cycle. Revisiting a node on the current DFS path also declares a
/// cycle; that only fires on graphs assembled directly by tests, since
/// store mutations keep the graph acyclic.
///
/// Path membership is tracked per-branch (gray set, removed on exit), with
/// a separate finished set (black), so diamond shapes whose branches
/// reconverge on a shared ancestor are not falsely flagged.
///
/// `exclude` skips the edge with the given id during the walk; updates use
/// this to evaluate a retarget against the graph without the edge being
/// rewritten.
pub(super) fn would_create_cycle_impl(
    graph: &DiGraph<MilestoneId, EdgeId>,
    node_map: &HashMap<MilestoneId, NodeIndex>,
    milestone_id: &MilestoneId,
    depends_on_id: &MilestoneId,
    exclude: Option<&EdgeId>,
) -> bool {
    if milestone_id == depends_on_id {
        return true;
    }

    // A prerequisite with no node has no dependency edges at all.
    let Some(&start) = node_map.get(depends_on_id) else {
        return false;
    };
    // A dependent with no node cannot be reached by any walk.
    let target = node_map.get(milestone_id).copied();

    enum Frame {
        Enter(NodeIndex),
        Exit(NodeIndex),
    }

    let mut stack = vec![Frame::Enter(start)];
    let mut on_path: HashSet<NodeIndex> = HashSet::new();
    let mut done: HashSet<NodeIndex> = HashSet::new();

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Enter(node) => {
                if Some(node) == target {
                    return true;
                }
                if on_path.contains(&node) {
                    return true;
                }
                if done.contains(&node) {
                    continue;
                }
                on_path.insert(node);
                stack.push(Frame::Exit(node));
                for edge in graph.edges_directed(node, Direction::Incoming) {
                    if exclude.is_some_and(|ex| edge.weight() == ex) {
                        continue;
                    }
                    stack.push(Frame::Enter(edge.source()));
                }
            }
            Frame::Exit(node) => {
                on_path.remove(&node);
                done.insert(node);
            }
        }
    }

    false
}

/// Internal implementation of prerequisite chain depth.
///
/// Depth is 0 for a milestone with no prerequisites, otherwise
/// `1 + max(prerequisite depths)`. Memoized post-order walk along
/// incoming (prerequisite) edges.
///
/// The store keeps its graph acyclic, but this function is also exercised
/// on hand-built graphs, so it tolerates cycles: a back edge contributes
/// nothing to the depth, and `max_depth` bounds the walk outright.
pub(super) fn max_chain_length_impl(
    graph: &DiGraph<MilestoneId, EdgeId>,
    node_map: &HashMap<MilestoneId, NodeIndex>,
    milestone_id: &MilestoneId,
    max_depth: usize,
) -> usize {
    let Some(&start) = node_map.get(milestone_id) else {
        return 0;
    };

    enum Frame {
        Enter(NodeIndex, usize),
        Exit(NodeIndex),
    }

    let mut memo: HashMap<NodeIndex, usize> = HashMap::new();
    let mut on_path: HashSet<NodeIndex> = HashSet::new();
    let mut stack = vec![Frame::Enter(start, 0)];

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Enter(node, depth) => {
                // Back edges and already-resolved nodes contribute via the
                // memo (or not at all) when the parent exits.
                if memo.contains_key(&node) || on_path.contains(&node) {
                    continue;
                }
                if depth >= max_depth {
                    warn!(
                        milestone = %graph[node],
                        max_depth,
                        "Chain analysis depth guard tripped; treating node as chain end"
                    );
                    memo.insert(node, 0);
                    continue;
                }
                on_path.insert(node);
                stack.push(Frame::Exit(node));
                for prereq in graph.neighbors_directed(node, Direction::Incoming) {
                    if !memo.contains_key(&prereq) {
                        stack.push(Frame::Enter(prereq, depth + 1));
                    }
                }
            }
            Frame::Exit(node) => {
                let depth = graph
                    .neighbors_directed(node, Direction::Incoming)
                    .filter_map(|prereq| memo.get(&prereq))
                    .max()
                    .map(|d| d + 1)
                    .unwrap_or(0);
                on_path.remove(&node);
                memo.insert(node, depth);
            }
        }
    }

    memo.get(&start).copied().unwrap_or(0)
}

/// Scan a restricted edge set for a dependency cycle.
///
/// Three-color DFS over the subgraph induced by `members` and `edges`
/// (both endpoints already restricted by the caller). Returns the back
/// edge as `(milestone_id, depends_on_id)` of the stored edge that closes
/// the loop, or `None` for an acyclic set.
///
/// Roots are tried in `members` order and adjacency follows edge creation
/// order, so the reported back edge is deterministic.
pub(super) fn find_set_cycle(
    members: &[MilestoneId],
    edges: &[&DependencyEdge],
) -> Option<(MilestoneId, MilestoneId)> {
    let mut adjacency: HashMap<&MilestoneId, Vec<&MilestoneId>> = HashMap::new();
    for edge in edges {
        adjacency
            .entry(&edge.depends_on_id)
            .or_default()
            .push(&edge.milestone_id);
    }

    enum Frame<'a> {
        Enter(&'a MilestoneId),
        Exit(&'a MilestoneId),
    }

    let mut on_path: HashSet<&MilestoneId> = HashSet::new();
    let mut done: HashSet<&MilestoneId> = HashSet::new();

    for root in members {
        if done.contains(root) {
            continue;
        }
        let mut stack = vec![Frame::Enter(root)];
        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(node) => {
                    if done.contains(node) || on_path.contains(node) {
                        continue;
                    }
                    on_path.insert(node);
                    stack.push(Frame::Exit(node));
                    for &dependent in adjacency.get(node).map_or(&[][..], Vec::as_slice) {
                        if on_path.contains(dependent) {
                            // dependent already gates node through the
                            // current path, and this edge gates dependent
                            // on node: the set is cyclic.
                            return Some((dependent.clone(), node.clone()));
                        }
                        if !done.contains(dependent) {
                            stack.push(Frame::Enter(dependent));
                        }
                    }
                }
                Frame::Exit(node) => {
                    on_path.remove(node);
                    done.insert(node);
                }
            }
        }
    }

    None
}

/// Internal implementation of critical path finding.
///
/// # Algorithm
///
/// 1. Index the restricted edges (both endpoints in the set, already
///    filtered by the caller, creation order) as prerequisite -> dependent
///    adjacency.
/// 2. Start nodes: members with no prerequisite inside the set. End
///    nodes: members nothing inside the set depends on.
/// 3. For every (start, end) pair, enumerate all simple paths with a
///    backtracking DFS and a per-path visited set.
/// 4. Keep the path with the most edges; ties go to the first path found,
///    so enumeration order (member input order for the pairs, edge
///    creation order for adjacency) is part of the contract.
///
/// This is a structural hop-count metric by design: `lag_days` and
/// milestone dates never influence the choice.
///
/// Exhaustive simple-path enumeration is exponential in the worst case;
/// the set size is caller-controlled and interactive callers pass one
/// project's milestones at a time.
pub(super) fn critical_path_impl(
    members: &[MilestoneId],
    edges: &[&DependencyEdge],
) -> Vec<MilestoneId> {
    // No members or no internal edges: nothing is connected, no path.
    if members.is_empty() || edges.is_empty() {
        return Vec::new();
    }

    let mut adjacency: HashMap<&MilestoneId, Vec<&MilestoneId>> = HashMap::new();
    let mut has_prereq_in_set: HashSet<&MilestoneId> = HashSet::new();
    let mut has_dependent_in_set: HashSet<&MilestoneId> = HashSet::new();
    for edge in edges {
        adjacency
            .entry(&edge.depends_on_id)
            .or_default()
            .push(&edge.milestone_id);
        has_prereq_in_set.insert(&edge.milestone_id);
        has_dependent_in_set.insert(&edge.depends_on_id);
    }

    let starts: Vec<&MilestoneId> = members
        .iter()
        .filter(|m| !has_prereq_in_set.contains(m))
        .collect();
    let ends: Vec<&MilestoneId> = members
        .iter()
        .filter(|m| !has_dependent_in_set.contains(m))
        .collect();

    let empty: Vec<&MilestoneId> = Vec::new();
    let mut best: Vec<&MilestoneId> = Vec::new();

    for &start in &starts {
        for &end in &ends {
            // Backtracking DFS; cursors[i] is the next-child index for
            // path[i]. The per-path visited set makes paths simple and
            // bounds the walk even on cyclic test input.
            let mut path: Vec<&MilestoneId> = vec![start];
            let mut on_path: HashSet<&MilestoneId> = HashSet::new();
            on_path.insert(start);
            let mut cursors: Vec<usize> = vec![0];

            while let Some(&current) = path.last() {
                if current == end {
                    if path.len() > best.len() {
                        best = path.clone();
                    }
                    on_path.remove(current);
                    path.pop();
                    cursors.pop();
                    continue;
                }

                let children = adjacency.get(current).unwrap_or(&empty);
                // cursors tracks path frame-for-frame
                let Some(cursor) = cursors.last_mut() else {
                    break;
                };
                if *cursor < children.len() {
                    let next = children[*cursor];
                    *cursor += 1;
                    if !on_path.contains(next) {
                        path.push(next);
                        on_path.insert(next);
                        cursors.push(0);
                    }
                } else {
                    on_path.remove(current);
                    path.pop();
                    cursors.pop();
                }
            }
        }
    }

    best.into_iter().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DependencyType;
    use chrono::Utc;

    fn ms(id: &str) -> MilestoneId {
        MilestoneId::new(id)
    }

    fn edge(seq: u32, milestone: &str, depends_on: &str) -> DependencyEdge {
        DependencyEdge {
            id: EdgeId::new(format!("dep-{seq:04}")),
            milestone_id: ms(milestone),
            depends_on_id: ms(depends_on),
            dependency_type: DependencyType::FinishToStart,
            lag_days: 0,
            created_at: Utc::now(),
            created_by: None,
        }
    }

    /// Hand-build a petgraph from (milestone, depends_on) pairs.
    ///
    /// Unlike the store, this applies no acyclicity check, which is what
    /// lets these tests exercise cycle tolerance directly. Edge weights
    /// are "dep-0000", "dep-0001", ... in pair order.
    fn build_graph(
        pairs: &[(&str, &str)],
    ) -> (DiGraph<MilestoneId, EdgeId>, HashMap<MilestoneId, NodeIndex>) {
        let mut graph = DiGraph::new();
        let mut node_map: HashMap<MilestoneId, NodeIndex> = HashMap::new();
        for (seq, (milestone, depends_on)) in pairs.iter().enumerate() {
            let from = *node_map
                .entry(ms(depends_on))
                .or_insert_with(|| graph.add_node(ms(depends_on)));
            let to = *node_map
                .entry(ms(milestone))
                .or_insert_with(|| graph.add_node(ms(milestone)));
            graph.add_edge(from, to, EdgeId::new(format!("dep-{seq:04}")));
        }
        (graph, node_map)
    }

    #[test]
    fn cycle_detected_through_chain() {
        // b depends on a, c depends on b; a depending on c closes the loop
        let (graph, node_map) = build_graph(&[("b", "a"), ("c", "b")]);
        assert!(would_create_cycle_impl(
            &graph,
            &node_map,
            &ms("a"),
            &ms("c"),
            None
        ));
    }

    #[test]
    fn shortcut_edge_is_not_a_cycle() {
        let (graph, node_map) = build_graph(&[("b", "a"), ("c", "b")]);
        // c depending directly on a is a shortcut alongside the chain
        assert!(!would_create_cycle_impl(
            &graph,
            &node_map,
            &ms("c"),
            &ms("a"),
            None
        ));
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        // b and c both depend on a; d depends on both
        let (graph, node_map) = build_graph(&[("b", "a"), ("c", "a"), ("d", "b"), ("d", "c")]);
        for (milestone, depends_on) in [("b", "a"), ("c", "a"), ("d", "b"), ("d", "c")] {
            assert!(
                !would_create_cycle_impl(&graph, &node_map, &ms(milestone), &ms(depends_on), None),
                "diamond edge {milestone} -> {depends_on} flagged as cycle"
            );
        }
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let (graph, node_map) = build_graph(&[("b", "a")]);
        assert!(would_create_cycle_impl(
            &graph,
            &node_map,
            &ms("a"),
            &ms("a"),
            None
        ));
    }

    #[test]
    fn unknown_milestones_cannot_cycle() {
        let (graph, node_map) = build_graph(&[("b", "a")]);
        assert!(!would_create_cycle_impl(
            &graph,
            &node_map,
            &ms("x"),
            &ms("y"),
            None
        ));
    }

    #[test]
    fn excluded_edge_is_ignored() {
        // b depends on a ("dep-0000"), c depends on b ("dep-0001").
        let (graph, node_map) = build_graph(&[("b", "a"), ("c", "b")]);

        // a depending on c cycles through c's chain back to a...
        assert!(would_create_cycle_impl(
            &graph,
            &node_map,
            &ms("a"),
            &ms("c"),
            None
        ));
        // ...but not when the walk excludes the "c depends on b" edge, as
        // an update retargeting that edge would.
        assert!(!would_create_cycle_impl(
            &graph,
            &node_map,
            &ms("a"),
            &ms("c"),
            Some(&EdgeId::new("dep-0001"))
        ));
    }

    #[test]
    fn chain_length_zero_without_prerequisites() {
        let (graph, node_map) = build_graph(&[("b", "a")]);
        assert_eq!(max_chain_length_impl(&graph, &node_map, &ms("a"), 50), 0);
        assert_eq!(max_chain_length_impl(&graph, &node_map, &ms("b"), 50), 1);
    }

    #[test]
    fn chain_length_takes_longest_branch() {
        // d has a three-hop branch through c<-b<-a and a one-hop branch x
        let (graph, node_map) = build_graph(&[("b", "a"), ("c", "b"), ("d", "c"), ("d", "x")]);
        assert_eq!(max_chain_length_impl(&graph, &node_map, &ms("d"), 50), 3);
    }

    #[test]
    fn chain_length_terminates_on_cyclic_input() {
        // a <-> b, with c depending on b. The store never produces this;
        // the analyzer still has to terminate and answer something sane.
        let (graph, node_map) = build_graph(&[("b", "a"), ("a", "b"), ("c", "b")]);
        let depth = max_chain_length_impl(&graph, &node_map, &ms("c"), 50);
        assert!(depth <= 50);
    }

    #[test]
    fn chain_length_respects_depth_guard() {
        let pairs: Vec<(String, String)> = (1..=20)
            .map(|i| (format!("m{}", i), format!("m{}", i - 1)))
            .collect();
        let pair_refs: Vec<(&str, &str)> = pairs
            .iter()
            .map(|(m, d)| (m.as_str(), d.as_str()))
            .collect();
        let (graph, node_map) = build_graph(&pair_refs);
        assert_eq!(max_chain_length_impl(&graph, &node_map, &ms("m20"), 50), 20);
        assert_eq!(max_chain_length_impl(&graph, &node_map, &ms("m20"), 5), 5);
    }

    #[test]
    fn set_cycle_found_and_reported() {
        let e1 = edge(1, "b", "a");
        let e2 = edge(2, "a", "b");
        let members = [ms("a"), ms("b")];
        let found = find_set_cycle(&members, &[&e1, &e2]);
        assert!(found.is_some());
    }

    #[test]
    fn acyclic_set_has_no_cycle() {
        let e1 = edge(1, "b", "a");
        let e2 = edge(2, "c", "b");
        let members = [ms("a"), ms("b"), ms("c")];
        assert_eq!(find_set_cycle(&members, &[&e1, &e2]), None);
    }

    #[test]
    fn critical_path_linear_chain() {
        let e1 = edge(1, "b", "a");
        let e2 = edge(2, "c", "b");
        let members = [ms("a"), ms("b"), ms("c")];
        let path = critical_path_impl(&members, &[&e1, &e2]);
        assert_eq!(path, vec![ms("a"), ms("b"), ms("c")]);
    }

    #[test]
    fn critical_path_empty_without_edges() {
        let members = [ms("a"), ms("b")];
        assert!(critical_path_impl(&members, &[]).is_empty());
        assert!(critical_path_impl(&[], &[]).is_empty());
    }

    #[test]
    fn critical_path_picks_longer_branch_of_diamond() {
        // a -> b -> d and a -> c1 -> c2 -> d
        let e1 = edge(1, "b", "a");
        let e2 = edge(2, "d", "b");
        let e3 = edge(3, "c1", "a");
        let e4 = edge(4, "c2", "c1");
        let e5 = edge(5, "d", "c2");
        let members = [ms("a"), ms("b"), ms("c1"), ms("c2"), ms("d")];
        let path = critical_path_impl(&members, &[&e1, &e2, &e3, &e4, &e5]);
        assert_eq!(path, vec![ms("a"), ms("c1"), ms("c2"), ms("d")]);
    }

    #[test]
    fn critical_path_tie_breaks_by_first_found() {
        // Two disjoint chains of equal length; the one whose start comes
        // first in member order wins.
        let e1 = edge(1, "b", "a");
        let e2 = edge(2, "y", "x");
        let members = [ms("x"), ms("y"), ms("a"), ms("b")];
        let path = critical_path_impl(&members, &[&e1, &e2]);
        assert_eq!(path, vec![ms("x"), ms("y")]);
    }

    #[test]
    fn critical_path_single_internal_edge() {
        let e1 = edge(1, "b", "a");
        let members = [ms("a"), ms("b"), ms("z")];
        let path = critical_path_impl(&members, &[&e1]);
        assert_eq!(path, vec![ms("a"), ms("b")]);
    }
}
