//! Relationship Inferencer - edges from co-occurrence and explicit phrasing
//!
//! # Method A: paragraph co-occurrence
//! A node is present in a paragraph when its canonical name occurs in the
//! paragraph (case-insensitive) or one of its mentions in this chapter falls
//! inside the paragraph span. Every present pair gets one co-occurrence.
//!
//! # Method B: explicit verb patterns
//! "Sarah helped Marcus" style rules give the pair a specific type. A generic
//! edge is upgraded; a specific edge keeps its type.

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::config::LoreConfig;
use crate::extraction::patterns::{clean_name, PatternLibrary};
use crate::text::{collapse_whitespace, name_key, truncate_chars, TextIndex};
use crate::types::{ClassifiedParagraph, EntityEdge, EntityNode, RelationshipType};

// =============================================================================
// Edge Table
// =============================================================================

/// Per-call edge accumulator keyed by the sorted id pair
pub(crate) struct EdgeTable<'n> {
    nodes: &'n [EntityNode],
    edges: Vec<EntityEdge>,
    index: HashMap<(String, String), usize>,
}

impl<'n> EdgeTable<'n> {
    pub(crate) fn new(nodes: &'n [EntityNode]) -> Self {
        Self {
            nodes,
            edges: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub(crate) fn find(&self, a: usize, b: usize) -> Option<usize> {
        let key = EntityEdge::pair_key(&self.nodes[a].id, &self.nodes[b].id);
        self.index.get(&key).copied()
    }

    /// Source is the endpoint earlier in node order
    pub(crate) fn insert(&mut self, a: usize, b: usize, ty: RelationshipType) -> usize {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        let edge = EntityEdge::new(&self.nodes[first].id, &self.nodes[second].id, ty);
        let slot = self.edges.len();
        self.index.insert(edge.key(), slot);
        self.edges.push(edge);
        slot
    }

    pub(crate) fn edge(&mut self, slot: usize) -> &mut EntityEdge {
        &mut self.edges[slot]
    }

    pub(crate) fn into_edges(self) -> Vec<EntityEdge> {
        self.edges
    }
}

// =============================================================================
// Name Presence
// =============================================================================

/// Case-insensitive, overlapping multi-name matcher over canonical names
struct NamePresence {
    automaton: Option<AhoCorasick>,
    /// pattern id -> node index
    owners: Vec<usize>,
    patterns: Vec<String>,
}

impl NamePresence {
    fn new(nodes: &[EntityNode]) -> Self {
        let mut owners = Vec::new();
        let mut patterns = Vec::new();
        for (i, node) in nodes.iter().enumerate() {
            let lower = node.name.to_lowercase();
            if !lower.is_empty() {
                owners.push(i);
                patterns.push(lower);
            }
        }
        let automaton = if patterns.is_empty() {
            None
        } else {
            match AhoCorasickBuilder::new()
                .match_kind(MatchKind::Standard)
                .build(&patterns)
            {
                Ok(ac) => Some(ac),
                Err(e) => {
                    warn!(error = %e, "name automaton build failed, using substring scan");
                    None
                }
            }
        };
        Self {
            automaton,
            owners,
            patterns,
        }
    }

    fn mark(&self, paragraph: &str, present: &mut [bool]) {
        let lower = paragraph.to_lowercase();
        match &self.automaton {
            Some(ac) => {
                for m in ac.find_overlapping_iter(&lower) {
                    present[self.owners[m.pattern().as_usize()]] = true;
                }
            }
            None => {
                for (owner, pattern) in self.owners.iter().zip(&self.patterns) {
                    if lower.contains(pattern.as_str()) {
                        present[*owner] = true;
                    }
                }
            }
        }
    }
}

// =============================================================================
// Inference
// =============================================================================

pub fn infer_relationships(
    text: &str,
    nodes: &[EntityNode],
    paragraphs: &[ClassifiedParagraph],
    chapter_id: &str,
    config: &LoreConfig,
) -> Vec<EntityEdge> {
    if nodes.len() < 2 {
        return Vec::new();
    }
    let idx = TextIndex::new(text);
    let mut table = EdgeTable::new(nodes);

    co_occurrence(&idx, nodes, paragraphs, chapter_id, config, &mut table);
    explicit_patterns(text, nodes, chapter_id, &mut table);

    let edges = table.into_edges();
    debug!(edges = edges.len(), "relationship inference complete");
    edges
}

fn co_occurrence(
    idx: &TextIndex<'_>,
    nodes: &[EntityNode],
    paragraphs: &[ClassifiedParagraph],
    chapter_id: &str,
    config: &LoreConfig,
    table: &mut EdgeTable<'_>,
) {
    let names = NamePresence::new(nodes);
    let text_len = idx.char_len();

    for paragraph in paragraphs {
        let start = paragraph.offset;
        let end = start.saturating_add(paragraph.length).min(text_len);
        if start >= end {
            warn!(
                offset = paragraph.offset,
                length = paragraph.length,
                text_len,
                "paragraph span outside text ignored"
            );
            continue;
        }
        let body = idx.slice(start, end);

        let mut present = vec![false; nodes.len()];
        names.mark(body, &mut present);
        for (i, node) in nodes.iter().enumerate() {
            if !present[i] {
                present[i] = node
                    .mentions
                    .iter()
                    .any(|m| m.chapter_id == chapter_id && m.offset >= start && m.offset < end);
            }
        }

        let members: Vec<usize> = (0..nodes.len()).filter(|&i| present[i]).collect();
        if members.len() < 2 {
            continue;
        }
        let snippet = truncate_chars(body, config.evidence_snippet_chars);
        for (x, &a) in members.iter().enumerate() {
            for &b in &members[x + 1..] {
                let slot = table
                    .find(a, b)
                    .unwrap_or_else(|| table.insert(a, b, RelationshipType::Interacts));
                let edge = table.edge(slot);
                edge.co_occurrences += 1;
                edge.add_chapter(chapter_id);
                edge.evidence.push(snippet.clone());
            }
        }
    }
}

/// Full capture first, then with leading lexicon words peeled
fn resolve_capture(nodes: &[EntityNode], raw: &str) -> Option<usize> {
    let key = name_key(raw);
    if let Some(i) = nodes.iter().position(|n| n.key() == key) {
        return Some(i);
    }
    let peeled = name_key(&clean_name(raw)?);
    nodes.iter().position(|n| n.key() == peeled)
}

fn explicit_patterns(text: &str, nodes: &[EntityNode], chapter_id: &str, table: &mut EdgeTable<'_>) {
    let lib = PatternLibrary::global();

    for rule in &lib.relationships {
        let ty = rule.category;
        for hit in rule.matches(text) {
            let (Some(a), Some(b)) = (hit.text_of("a"), hit.text_of("b")) else {
                continue;
            };
            let (Some(a), Some(b)) = (resolve_capture(nodes, a), resolve_capture(nodes, b)) else {
                continue;
            };
            if a == b {
                continue;
            }
            let phrase = collapse_whitespace(hit.phrase());
            let edge = match table.find(a, b) {
                Some(slot) => {
                    let edge = table.edge(slot);
                    edge.upgrade_type(ty);
                    edge
                }
                None => {
                    let slot = table.insert(a, b, ty);
                    let edge = table.edge(slot);
                    edge.co_occurrences = 1;
                    edge
                }
            };
            edge.add_chapter(chapter_id);
            edge.evidence.push(phrase);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityType;

    fn character(name: &str, offsets: &[usize]) -> EntityNode {
        let mut n = EntityNode::new(name, EntityType::Character, offsets[0]);
        for &o in offsets {
            n.add_mention(o, "c1");
        }
        n
    }

    fn whole(text: &str) -> Vec<ClassifiedParagraph> {
        vec![ClassifiedParagraph::span(0, text.chars().count())]
    }

    #[test]
    fn test_co_occurrence_creates_generic_edge() {
        let text = "Sarah watched Marcus from the doorway.";
        let nodes = vec![character("Sarah", &[0]), character("Marcus", &[14])];
        let edges = infer_relationships(text, &nodes, &whole(text), "c1", &LoreConfig::default());

        assert_eq!(edges.len(), 1);
        let e = &edges[0];
        assert_eq!(e.relationship_type, RelationshipType::Interacts);
        assert_eq!(e.co_occurrences, 1);
        assert_eq!(e.sentiment, 0.0);
        assert_eq!(e.chapters, vec!["c1".to_string()]);
        assert_eq!(e.source, nodes[0].id);
        assert_eq!(e.evidence[0], text);
    }

    #[test]
    fn test_explicit_pattern_upgrades_generic_edge() {
        let text = "Sarah and Marcus walked together through the garden.";
        let nodes = vec![character("Sarah", &[0]), character("Marcus", &[10])];
        let edges = infer_relationships(text, &nodes, &whole(text), "c1", &LoreConfig::default());

        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].relationship_type, RelationshipType::AlliedWith);
        assert_eq!(edges[0].sentiment, 0.5);
        assert_eq!(edges[0].co_occurrences, 1);
        assert_eq!(edges[0].evidence.len(), 2);
        assert_eq!(edges[0].evidence[1], "Sarah and Marcus walked together");
    }

    #[test]
    fn test_explicit_pattern_without_paragraphs() {
        let text = "Then Marcus attacked Sarah.";
        let nodes = vec![character("Sarah", &[21]), character("Marcus", &[5])];
        let edges = infer_relationships(text, &nodes, &[], "c1", &LoreConfig::default());

        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].relationship_type, RelationshipType::Opposes);
        assert_eq!(edges[0].sentiment, -0.5);
        assert_eq!(edges[0].co_occurrences, 1);
        // Sarah comes first in node order
        assert_eq!(edges[0].source, nodes[0].id);
    }

    #[test]
    fn test_each_verb_family_creates_its_type() {
        use RelationshipType::*;
        let cases = [
            ("Sarah kissed Marcus.", RelatedTo),
            ("Sarah struck Marcus.", Opposes),
            ("Sarah helped Marcus.", AlliedWith),
            ("Sarah saved Marcus.", AlliedWith),
            ("Sarah protected Marcus.", AlliedWith),
            ("Sarah hated Marcus.", Opposes),
            ("Sarah despised Marcus.", Opposes),
            ("Sarah feared Marcus.", Opposes),
            ("Sarah trusted Marcus.", AlliedWith),
            ("Sarah believed in Marcus.", AlliedWith),
            ("Sarah followed Marcus.", AlliedWith),
        ];
        for (text, expected) in cases {
            let marcus = text.find("Marcus").unwrap();
            let nodes = vec![character("Sarah", &[0]), character("Marcus", &[marcus])];
            let edges = infer_relationships(text, &nodes, &[], "c1", &LoreConfig::default());
            assert_eq!(edges.len(), 1, "{}", text);
            assert_eq!(edges[0].relationship_type, expected, "{}", text);
            assert_eq!(edges[0].sentiment, expected.default_sentiment(), "{}", text);
            assert_eq!(edges[0].co_occurrences, 1, "{}", text);
        }
    }

    #[test]
    fn test_specific_type_is_kept() {
        let text = "Sarah loved Marcus. Sarah hated Marcus.";
        let nodes = vec![character("Sarah", &[0]), character("Marcus", &[12])];
        let edges = infer_relationships(text, &nodes, &[], "c1", &LoreConfig::default());
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].relationship_type, RelationshipType::RelatedTo);
        assert_eq!(edges[0].evidence.len(), 2);
    }

    #[test]
    fn test_resolved_pronoun_mention_counts_as_presence() {
        let text = "Sarah waved.\nShe smiled at Marcus.";
        // "She" at offset 13 was resolved to Sarah
        let nodes = vec![character("Sarah", &[0, 13]), character("Marcus", &[27])];
        let paragraphs = vec![ClassifiedParagraph::span(0, 12), ClassifiedParagraph::span(13, 21)];
        let edges = infer_relationships(text, &nodes, &paragraphs, "c1", &LoreConfig::default());
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].co_occurrences, 1);
    }

    #[test]
    fn test_out_of_range_paragraph_ignored() {
        let text = "Sarah met Marcus.";
        let nodes = vec![character("Sarah", &[0]), character("Marcus", &[10])];
        let paragraphs = vec![ClassifiedParagraph::span(500, 20)];
        let edges = infer_relationships(text, &nodes, &paragraphs, "c1", &LoreConfig::default());
        assert!(edges.is_empty());
    }

    #[test]
    fn test_overlapping_names_both_present() {
        let text = "Sarah Connor and Sarah argued.";
        let nodes = vec![character("Sarah Connor", &[0]), character("Sarah", &[17])];
        let edges = infer_relationships(text, &nodes, &whole(text), "c1", &LoreConfig::default());
        assert_eq!(edges.len(), 1);
    }

    #[test]
    fn test_evidence_snippet_truncated() {
        let text = format!("Sarah and Marcus {}", "waited ".repeat(40));
        let nodes = vec![character("Sarah", &[0]), character("Marcus", &[10])];
        let config = LoreConfig {
            evidence_snippet_chars: 16,
            ..LoreConfig::default()
        };
        let edges = infer_relationships(&text, &nodes, &whole(&text), "c1", &config);
        assert_eq!(edges[0].evidence[0], "Sarah and Marcus...");
    }
}
