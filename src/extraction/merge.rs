//! Graph Merger - per-chapter graphs -> one manuscript graph
//!
//! Nodes merge by case-folded canonical name, edges by the merged id pair.
//! The first graph to mention an entity supplies its id, name and type.
//!
//! `mentions` and `evidence` are concatenated in input order and evidence is
//! then cut to `evidence_limit`, so which snippets survive depends on the
//! order chapters are passed in. Counts (`mentionCount`, `coOccurrences`) do not.

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::config::LoreConfig;
use crate::extraction::finalize_graph;
use crate::extraction::relationship::EdgeTable;
use crate::types::{EntityGraph, EntityNode};

pub fn merge_graphs(graphs: &[EntityGraph]) -> EntityGraph {
    merge_graphs_with(graphs, &LoreConfig::default())
}

pub fn merge_graphs_with(graphs: &[EntityGraph], config: &LoreConfig) -> EntityGraph {
    match graphs {
        [] => return EntityGraph::empty(),
        [only] => return only.clone(),
        _ => {}
    }

    // Pass 1: nodes. Each graph gets an old-id -> merged-slot map.
    let mut nodes: Vec<EntityNode> = Vec::new();
    let mut by_key: HashMap<String, usize> = HashMap::new();
    let mut remaps: Vec<HashMap<&str, usize>> = Vec::with_capacity(graphs.len());

    for graph in graphs {
        let mut remap = HashMap::new();
        for node in &graph.nodes {
            let key = node.key();
            let slot = match by_key.get(&key) {
                Some(&slot) => {
                    absorb(&mut nodes[slot], node);
                    slot
                }
                None => {
                    by_key.insert(key, nodes.len());
                    let mut fresh = node.clone();
                    fresh.mention_count = fresh.mentions.len();
                    nodes.push(fresh);
                    nodes.len() - 1
                }
            };
            remap.insert(node.id.as_str(), slot);
        }
        remaps.push(remap);
    }

    // Pass 2: edges, re-pointed at merged nodes
    let mut table = EdgeTable::new(&nodes);
    let mut dropped = 0usize;
    for (graph, remap) in graphs.iter().zip(&remaps) {
        for edge in &graph.edges {
            let (Some(&a), Some(&b)) = (remap.get(edge.source.as_str()), remap.get(edge.target.as_str()))
            else {
                dropped += 1;
                continue;
            };
            if a == b {
                dropped += 1;
                continue;
            }
            let slot = match table.find(a, b) {
                Some(slot) => {
                    let merged = table.edge(slot);
                    merged.co_occurrences += edge.co_occurrences;
                    merged.upgrade_type(edge.relationship_type);
                    slot
                }
                None => {
                    let slot = table.insert(a, b, edge.relationship_type);
                    let merged = table.edge(slot);
                    merged.co_occurrences = edge.co_occurrences;
                    merged.sentiment = edge.sentiment;
                    slot
                }
            };
            let merged = table.edge(slot);
            for chapter in &edge.chapters {
                merged.add_chapter(chapter);
            }
            merged.evidence.extend(edge.evidence.iter().cloned());
        }
    }
    if dropped > 0 {
        warn!(dropped, "edges with unknown or collapsed endpoints dropped during merge");
    }

    let mut edges = table.into_edges();
    for edge in &mut edges {
        edge.evidence.truncate(config.evidence_limit);
    }

    debug!(
        graphs = graphs.len(),
        nodes = nodes.len(),
        edges = edges.len(),
        "graph merge complete"
    );
    finalize_graph(nodes, edges)
}

fn absorb(into: &mut EntityNode, node: &EntityNode) {
    into.mentions.extend(node.mentions.iter().cloned());
    into.mention_count = into.mentions.len();
    into.first_mention = into.first_mention.min(node.first_mention);
    for alias in &node.aliases {
        into.add_alias(alias);
    }
    for (k, v) in &node.attributes {
        into.attributes.entry(k.clone()).or_insert_with(|| v.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntityEdge, EntityType, RelationshipType};

    fn node(name: &str, chapter: &str, offsets: &[usize]) -> EntityNode {
        let mut n = EntityNode::new(name, EntityType::Character, offsets[0]);
        for &o in offsets {
            n.add_mention(o, chapter);
        }
        n
    }

    fn edge(a: &EntityNode, b: &EntityNode, ty: RelationshipType, co: u32, chapter: &str) -> EntityEdge {
        let mut e = EntityEdge::new(&a.id, &b.id, ty);
        e.co_occurrences = co;
        e.add_chapter(chapter);
        e.evidence = (0..co).map(|i| format!("{} #{}", chapter, i)).collect();
        e
    }

    #[test]
    fn test_zero_and_one() {
        let empty = merge_graphs(&[]);
        assert!(empty.nodes.is_empty() && empty.edges.is_empty());

        let g = EntityGraph::new(vec![node("Sarah", "c1", &[0])], vec![]);
        assert_eq!(merge_graphs(&[g.clone()]), g);
    }

    #[test]
    fn test_nodes_merge_by_name() {
        let mut sarah1 = node("Sarah", "c1", &[5, 9, 30]);
        sarah1.add_alias("the healer");
        let mut sarah2 = node("SARAH", "c2", &[2, 8, 12, 40, 41]);
        sarah2.add_alias("Sal");
        sarah2.attributes.insert("eye_color".into(), "blue".into());

        let merged = merge_graphs(&[
            EntityGraph::new(vec![sarah1.clone()], vec![]),
            EntityGraph::new(vec![sarah2], vec![]),
        ]);
        assert_eq!(merged.nodes.len(), 1);
        let n = &merged.nodes[0];
        assert_eq!(n.id, sarah1.id);
        assert_eq!(n.name, "Sarah");
        assert_eq!(n.mention_count, 8);
        assert_eq!(n.first_mention, 2);
        assert_eq!(n.aliases, vec!["the healer".to_string(), "Sal".to_string()]);
        assert_eq!(n.attributes.get("eye_color").map(String::as_str), Some("blue"));
        assert!(merged.is_consistent());
    }

    #[test]
    fn test_edges_repointed_and_summed() {
        let (s1, m1) = (node("Sarah", "c1", &[0]), node("Marcus", "c1", &[9]));
        let (s2, m2) = (node("Sarah", "c2", &[0]), node("Marcus", "c2", &[9]));
        let g1 = EntityGraph::new(
            vec![s1.clone(), m1.clone()],
            vec![edge(&s1, &m1, RelationshipType::Interacts, 2, "c1")],
        );
        let g2 = EntityGraph::new(
            vec![m2.clone(), s2.clone()],
            vec![edge(&m2, &s2, RelationshipType::Opposes, 3, "c2")],
        );

        let merged = merge_graphs(&[g1, g2]);
        assert_eq!(merged.edges.len(), 1);
        let e = &merged.edges[0];
        assert_eq!(e.co_occurrences, 5);
        assert_eq!(e.relationship_type, RelationshipType::Opposes);
        assert_eq!(e.sentiment, -0.5);
        assert_eq!(e.chapters, vec!["c1".to_string(), "c2".to_string()]);
        assert_eq!(e.evidence.len(), 5);
        assert!(merged.node(&e.source).is_some() && merged.node(&e.target).is_some());
        assert!(merged.is_consistent());
    }

    #[test]
    fn test_evidence_truncated_in_input_order() {
        let (s1, m1) = (node("Sarah", "c1", &[0]), node("Marcus", "c1", &[9]));
        let (s2, m2) = (node("Sarah", "c2", &[0]), node("Marcus", "c2", &[9]));
        let g1 = EntityGraph::new(
            vec![s1.clone(), m1.clone()],
            vec![edge(&s1, &m1, RelationshipType::Interacts, 7, "c1")],
        );
        let g2 = EntityGraph::new(
            vec![s2.clone(), m2.clone()],
            vec![edge(&s2, &m2, RelationshipType::Interacts, 7, "c2")],
        );

        let forward = merge_graphs(&[g1.clone(), g2.clone()]);
        let backward = merge_graphs(&[g2, g1]);
        assert_eq!(forward.edges[0].evidence.len(), 10);
        assert_eq!(forward.edges[0].evidence[0], "c1 #0");
        assert_eq!(backward.edges[0].evidence[0], "c2 #0");
        assert_eq!(forward.edges[0].co_occurrences, backward.edges[0].co_occurrences);
    }

    #[test]
    fn test_dangling_edge_dropped() {
        let (s, m) = (node("Sarah", "c1", &[0]), node("Marcus", "c1", &[9]));
        let ghost = node("Ghost", "c1", &[20]);
        let g1 = EntityGraph::new(
            vec![s.clone(), m.clone()],
            vec![edge(&s, &ghost, RelationshipType::Interacts, 1, "c1")],
        );
        let g2 = EntityGraph::new(vec![node("Sarah", "c2", &[1])], vec![]);
        let merged = merge_graphs(&[g1, g2]);
        assert!(merged.edges.is_empty());
        assert!(merged.is_consistent());
    }

    #[test]
    fn test_output_sorted() {
        let g1 = EntityGraph::new(vec![node("Ann", "c1", &[0]), node("Bob", "c1", &[4, 8])], vec![]);
        let g2 = EntityGraph::new(vec![node("Ann", "c2", &[0, 3, 6])], vec![]);
        let merged = merge_graphs(&[g1, g2]);
        let counts: Vec<_> = merged.nodes.iter().map(|n| n.mention_count).collect();
        assert_eq!(counts, vec![4, 2]);
    }
}
