//! Property test: the incremental cycle check must agree with a
//! whole-graph oracle.
//!
//! For any edge set the store accepted, `would_create_cycle(m, d)` is
//! required to answer exactly "does inserting the candidate edge into the
//! full graph make it cyclic" - verified here against petgraph's global
//! `is_cyclic_directed` on a rebuilt graph with the candidate inserted.

use std::collections::HashMap;

use girder::config::StoreConfig;
use girder::domain::{EdgeFilter, MilestoneId, NewDependency};
use girder::store::{new_in_memory_store, DependencyStore};
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use proptest::prelude::*;

fn ms(index: u8) -> MilestoneId {
    MilestoneId::new(format!("m{index}"))
}

proptest! {
    #[test]
    fn would_create_cycle_matches_whole_graph_oracle(
        attempts in prop::collection::vec((0u8..8, 0u8..8), 0..24),
        candidate in (0u8..8, 0u8..8),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("current-thread runtime");

        runtime.block_on(async move {
            let mut store = new_in_memory_store(StoreConfig::default());

            // Feed the store random edges; rejected ones (self, duplicate,
            // cyclic) simply don't land. Whatever survives is a DAG.
            for (milestone, depends_on) in attempts {
                if milestone == depends_on {
                    continue;
                }
                let _ = store
                    .create(NewDependency::finish_to_start(
                        ms(milestone),
                        ms(depends_on),
                    ))
                    .await;
            }

            let (candidate_milestone, candidate_depends_on) = candidate;
            let predicted = store
                .would_create_cycle(&ms(candidate_milestone), &ms(candidate_depends_on))
                .await
                .unwrap();

            // Oracle: rebuild the accepted edges as a petgraph, insert the
            // candidate unconditionally, and ask the global question.
            let accepted = store.list(&EdgeFilter::default()).await.unwrap();
            let mut graph: DiGraph<MilestoneId, ()> = DiGraph::new();
            let mut nodes: HashMap<MilestoneId, NodeIndex> = HashMap::new();
            let mut node = |graph: &mut DiGraph<MilestoneId, ()>, id: MilestoneId| {
                *nodes
                    .entry(id.clone())
                    .or_insert_with(|| graph.add_node(id))
            };
            for edge in &accepted {
                let from = node(&mut graph, edge.depends_on_id.clone());
                let to = node(&mut graph, edge.milestone_id.clone());
                graph.add_edge(from, to, ());
            }
            let from = node(&mut graph, ms(candidate_depends_on));
            let to = node(&mut graph, ms(candidate_milestone));
            graph.add_edge(from, to, ());

            let actual = is_cyclic_directed(&graph);
            prop_assert_eq!(
                predicted,
                actual,
                "candidate m{} depends-on m{} over {} accepted edges",
                candidate_milestone,
                candidate_depends_on,
                accepted.len()
            );
            Ok(())
        })?;
    }

    #[test]
    fn store_never_goes_cyclic(
        attempts in prop::collection::vec((0u8..6, 0u8..6), 0..30),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("current-thread runtime");

        runtime.block_on(async move {
            let mut store = new_in_memory_store(StoreConfig::default());
            for (milestone, depends_on) in attempts {
                let _ = store
                    .create(NewDependency::finish_to_start(
                        ms(milestone),
                        ms(depends_on),
                    ))
                    .await;
            }

            let accepted = store.list(&EdgeFilter::default()).await.unwrap();
            let mut graph: DiGraph<MilestoneId, ()> = DiGraph::new();
            let mut nodes: HashMap<MilestoneId, NodeIndex> = HashMap::new();
            for edge in &accepted {
                let from = *nodes
                    .entry(edge.depends_on_id.clone())
                    .or_insert_with(|| graph.add_node(edge.depends_on_id.clone()));
                let to = *nodes
                    .entry(edge.milestone_id.clone())
                    .or_insert_with(|| graph.add_node(edge.milestone_id.clone()));
                graph.add_edge(from, to, ());
            }

            prop_assert!(
                !is_cyclic_directed(&graph),
                "store accepted a cyclic edge set ({} edges)",
                accepted.len()
            );
            Ok(())
        })?;
    }
}
