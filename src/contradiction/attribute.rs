//! Attribute contradictions - conflicting physical descriptions
//!
//! Eye colour, hair colour, age, height and build are read from the text with
//! the Pattern Library's attribute rules, grouped per (entity, category), and
//! every incompatible pair inside a group is reported.

use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::config::LoreConfig;
use crate::extraction::patterns::{
    clean_name, color_buckets, peeled_prefix_len, AttributeCategory, PatternLibrary,
};
use crate::text::{name_key, TextIndex};
use crate::types::{new_id, Claim, Contradiction, ContradictionType, EntityGraph};

pub const ATTRIBUTE_SEVERITY: f64 = 0.8;

/// Maximum age difference still read as the same age
const AGE_TOLERANCE: i64 = 2;

/// One attribute statement found in the text; offsets are chars
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeMention {
    pub category: AttributeCategory,
    pub name: String,
    pub value: String,
    /// Offset of the name inside the statement
    pub name_start: usize,
    pub start: usize,
    pub end: usize,
}

/// Every attribute statement, one per (category, offset), in text order
pub fn extract_attributes(text: &str) -> Vec<AttributeMention> {
    let lib = PatternLibrary::global();
    let idx = TextIndex::new(text);
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for rule in &lib.attributes {
        for hit in rule.matches(text) {
            let (Some((name_start, _, name)), Some(value)) = (hit.group("name"), hit.text_of("value")) else {
                continue;
            };
            let name_start = name_start + peeled_prefix_len(name);
            let Some(name) = clean_name(name) else {
                continue;
            };
            let start = idx.to_char(hit.start());
            if !seen.insert((rule.category, start)) {
                continue;
            }
            out.push(AttributeMention {
                category: rule.category,
                name,
                value: value.trim().to_string(),
                name_start: idx.to_char(name_start),
                start,
                end: idx.to_char(hit.end()),
            });
        }
    }
    out.sort_by_key(|m| m.start);
    out
}

/// Same value, ages within tolerance, or colours sharing a synonym bucket
pub fn values_compatible(category: AttributeCategory, a: &str, b: &str) -> bool {
    if a.to_lowercase() == b.to_lowercase() {
        return true;
    }
    if category == AttributeCategory::Age {
        if let (Ok(x), Ok(y)) = (a.trim().parse::<i64>(), b.trim().parse::<i64>()) {
            return (x - y).abs() <= AGE_TOLERANCE;
        }
    }
    let buckets_a = color_buckets(a);
    !buckets_a.is_empty() && color_buckets(b).iter().any(|i| buckets_a.contains(i))
}

pub fn detect_attribute_contradictions(text: &str, graph: &EntityGraph) -> Vec<Contradiction> {
    detect_attribute_contradictions_with(text, graph, &LoreConfig::default())
}

pub fn detect_attribute_contradictions_with(
    text: &str,
    graph: &EntityGraph,
    config: &LoreConfig,
) -> Vec<Contradiction> {
    if graph.nodes.is_empty() {
        return Vec::new();
    }
    let idx = TextIndex::new(text);
    let mentions = extract_attributes(text);

    // (name key, category) -> mentions, groups kept in first-seen order
    let mut slots: HashMap<(String, AttributeCategory), usize> = HashMap::new();
    let mut groups: Vec<Vec<&AttributeMention>> = Vec::new();
    for m in &mentions {
        let key = (name_key(&m.name), m.category);
        let slot = *slots.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(m);
    }

    let mut found = Vec::new();
    for group in groups.iter().filter(|g| g.len() >= 2) {
        let Some(node) = graph.find_node(&group[0].name) else {
            continue;
        };
        for (i, first) in group.iter().enumerate() {
            for second in &group[i + 1..] {
                if values_compatible(first.category, &first.value, &second.value) {
                    continue;
                }
                let claim = |m: &AttributeMention| Claim {
                    text: idx.context(m.start, m.end, config.context_chars),
                    offset: m.start,
                    value: m.value.clone(),
                    chapter_id: node.chapter_at(m.name_start).map(str::to_string),
                };
                found.push(Contradiction {
                    id: new_id("contra"),
                    contradiction_type: ContradictionType::Attribute,
                    entity_id: node.id.clone(),
                    entity_name: node.name.clone(),
                    claim1: claim(first),
                    claim2: claim(second),
                    severity: ATTRIBUTE_SEVERITY,
                    suggestion: format!(
                        "{}'s {} is described as \"{}\" and later as \"{}\". Pick one or explain the change.",
                        node.name,
                        first.category.label(),
                        first.value,
                        second.value
                    ),
                });
            }
        }
    }

    debug!(
        attributes = mentions.len(),
        contradictions = found.len(),
        "attribute check complete"
    );
    found
}
