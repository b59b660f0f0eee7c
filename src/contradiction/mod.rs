//! Contradiction Engine
//!
//! Second pass over a chapter: raw text + the entity graph (+ timeline) in,
//! contradictions out. Attribute and timeline results are combined and
//! ordered by severity, most severe first.

pub mod attribute;
pub mod timeline;

pub use attribute::{
    detect_attribute_contradictions, detect_attribute_contradictions_with, extract_attributes,
    values_compatible, AttributeMention,
};
pub use timeline::{
    detect_timeline_contradictions, detect_timeline_contradictions_with, find_deaths, DeathRecord,
};

use std::cmp::Ordering;
use tracing::debug;

use crate::config::LoreConfig;
use crate::types::{Contradiction, EntityGraph, Timeline};

pub fn detect_contradictions(text: &str, graph: &EntityGraph, timeline: &Timeline) -> Vec<Contradiction> {
    detect_contradictions_with(text, graph, timeline, &LoreConfig::default())
}

pub fn detect_contradictions_with(
    text: &str,
    graph: &EntityGraph,
    timeline: &Timeline,
    config: &LoreConfig,
) -> Vec<Contradiction> {
    let start = instant::Instant::now();
    let mut all = detect_attribute_contradictions_with(text, graph, config);
    all.extend(detect_timeline_contradictions_with(text, graph, timeline, config));

    // stable: equal severities keep attribute-then-timeline order
    all.sort_by(|a, b| b.severity.partial_cmp(&a.severity).unwrap_or(Ordering::Equal));

    debug!(
        contradictions = all.len(),
        elapsed_us = start.elapsed().as_micros() as u64,
        "contradiction detection complete"
    );
    all
}
