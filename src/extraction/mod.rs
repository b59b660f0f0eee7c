//! Entity extraction pipeline
//!
//! One call per chapter: scan -> consolidate -> aliases -> pronouns -> relationships.
//!
//! Pronoun resolution must run after consolidation and before relationship
//! inference: resolved pronouns become mentions, and mentions decide which
//! nodes are present in a paragraph.

pub mod alias;
pub mod consolidate;
pub mod coreference;
pub mod merge;
pub mod patterns;
pub mod relationship;
pub mod scanner;

pub use alias::resolve_aliases;
pub use consolidate::consolidate;
pub use coreference::{resolve_pronouns, Gender};
pub use merge::{merge_graphs, merge_graphs_with};
pub use relationship::infer_relationships;
pub use scanner::EntityScanner;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::config::LoreConfig;
use crate::error::{LoreError, LoreResult};
use crate::types::{ClassifiedParagraph, CoReference, DialogueLine, EntityEdge, EntityGraph, EntityNode};

// =============================================================================
// Types
// =============================================================================

/// Timing per pipeline phase, in microseconds
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionTimings {
    pub total_us: u64,
    pub scan_us: u64,
    pub consolidate_us: u64,
    pub alias_us: u64,
    pub coreference_us: u64,
    pub relationship_us: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionStats {
    pub timings: ExtractionTimings,
    pub candidates_found: usize,
    pub aliases_found: usize,
    pub pronouns_resolved: usize,
}

/// Graph plus the by-products of building it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
    pub graph: EntityGraph,
    pub coreferences: Vec<CoReference>,
    pub stats: ExtractionStats,
}

// =============================================================================
// Pipeline
// =============================================================================

/// Build the entity graph for one chapter with default configuration
pub fn extract_entities(
    text: &str,
    paragraphs: &[ClassifiedParagraph],
    dialogues: &[DialogueLine],
    chapter_id: &str,
) -> LoreResult<EntityGraph> {
    extract_entities_with(text, paragraphs, dialogues, chapter_id, &LoreConfig::default())
}

pub fn extract_entities_with(
    text: &str,
    paragraphs: &[ClassifiedParagraph],
    dialogues: &[DialogueLine],
    chapter_id: &str,
    config: &LoreConfig,
) -> LoreResult<EntityGraph> {
    extract_detailed(text, paragraphs, dialogues, chapter_id, config).map(|e| e.graph)
}

/// Full pipeline run, keeping coreferences and per-phase stats
pub fn extract_detailed(
    text: &str,
    paragraphs: &[ClassifiedParagraph],
    dialogues: &[DialogueLine],
    chapter_id: &str,
    config: &LoreConfig,
) -> LoreResult<Extraction> {
    check_input(text, config)?;
    let overall_start = instant::Instant::now();
    let mut stats = ExtractionStats::default();

    // Phase 1: candidate scan
    let phase = instant::Instant::now();
    let raw = EntityScanner::new(config).scan_with_dialogue(text, dialogues);
    stats.timings.scan_us = phase.elapsed().as_micros() as u64;
    stats.candidates_found = raw.len();

    // Phase 2: canonical nodes
    let phase = instant::Instant::now();
    let mut nodes = consolidate(&raw, chapter_id);
    stats.timings.consolidate_us = phase.elapsed().as_micros() as u64;

    // Phase 3: aliases
    let phase = instant::Instant::now();
    stats.aliases_found = resolve_aliases(text, &mut nodes);
    stats.timings.alias_us = phase.elapsed().as_micros() as u64;

    // Phase 4: pronouns (adds mentions, so before relationships)
    let phase = instant::Instant::now();
    let coreferences = resolve_pronouns(text, &mut nodes, chapter_id, config);
    stats.timings.coreference_us = phase.elapsed().as_micros() as u64;
    stats.pronouns_resolved = coreferences.len();

    // Phase 5: relationships
    let phase = instant::Instant::now();
    let edges = infer_relationships(text, &nodes, paragraphs, chapter_id, config);
    stats.timings.relationship_us = phase.elapsed().as_micros() as u64;

    let graph = finalize_graph(nodes, edges);
    stats.timings.total_us = overall_start.elapsed().as_micros() as u64;
    debug!(
        chapter = chapter_id,
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        total_us = stats.timings.total_us,
        "chapter extraction complete"
    );

    Ok(Extraction {
        graph,
        coreferences,
        stats,
    })
}

fn check_input(text: &str, config: &LoreConfig) -> LoreResult<()> {
    // byte length bounds char length from above
    if text.len() <= config.max_input_chars {
        return Ok(());
    }
    let len = text.chars().count();
    if len > config.max_input_chars {
        warn!(len, max = config.max_input_chars, "chapter text rejected");
        return Err(LoreError::InputTooLarge {
            len,
            max: config.max_input_chars,
        });
    }
    Ok(())
}

/// Sort nodes by mention count and edges by co-occurrence (both stable), and
/// point every edge's `source` at the endpoint that comes first in node order.
pub(crate) fn finalize_graph(mut nodes: Vec<EntityNode>, mut edges: Vec<EntityEdge>) -> EntityGraph {
    nodes.sort_by(|a, b| b.mention_count.cmp(&a.mention_count));

    {
        let position: HashMap<&str, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect();
        for edge in &mut edges {
            let s = position.get(edge.source.as_str());
            let t = position.get(edge.target.as_str());
            if let (Some(s), Some(t)) = (s, t) {
                if s > t {
                    std::mem::swap(&mut edge.source, &mut edge.target);
                }
            }
        }
    }
    edges.sort_by(|a, b| b.co_occurrences.cmp(&a.co_occurrences));

    EntityGraph::new(nodes, edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RelationshipType;

    #[test]
    fn test_empty_text() {
        let graph = extract_entities("", &[], &[], "c1").unwrap();
        assert!(graph.nodes.is_empty());
        assert!(graph.edges.is_empty());
        assert!(graph.processed_at > 0);
    }

    #[test]
    fn test_input_guard() {
        let config = LoreConfig {
            max_input_chars: 10,
            ..LoreConfig::default()
        };
        let err = extract_entities_with("Sarah walked far away.", &[], &[], "c1", &config).unwrap_err();
        assert!(matches!(err, LoreError::InputTooLarge { len: 22, max: 10 }));

        // multibyte text within the char limit passes
        assert!(extract_entities_with("Éowyn rode", &[], &[], "c1", &config).is_ok());
    }

    #[test]
    fn test_detailed_reports_coreferences() {
        let text = "Marcus waited by the gate. He was tired.";
        let extraction = extract_detailed(text, &[], &[], "c1", &LoreConfig::default()).unwrap();
        assert_eq!(extraction.coreferences.len(), 1);
        assert_eq!(extraction.stats.pronouns_resolved, 1);
        let marcus = extraction.graph.find_node("Marcus").unwrap();
        assert_eq!(marcus.mention_count, 2);
        assert_eq!(extraction.coreferences[0].resolved_to, marcus.id);
    }

    #[test]
    fn test_finalize_orients_edges_by_node_order() {
        let mut a = EntityNode::new("Ann", crate::types::EntityType::Character, 0);
        a.add_mention(0, "c1");
        let mut b = EntityNode::new("Bob", crate::types::EntityType::Character, 5);
        b.add_mention(5, "c1");
        b.add_mention(9, "c1");
        let edge = EntityEdge::new(&a.id, &b.id, RelationshipType::Interacts);

        let graph = finalize_graph(vec![a.clone(), b.clone()], vec![edge]);
        assert_eq!(graph.nodes[0].id, b.id);
        assert_eq!(graph.edges[0].source, b.id);
        assert_eq!(graph.edges[0].target, a.id);
    }
}
