//! Timeline contradictions - characters acting after their death
//!
//! The first death statement per name fixes the death point (end of the
//! phrase). The first later mention followed by an action verb is reported,
//! once per character. On a merged graph only mentions from the chapter the
//! death is read in are inspected. Mentions inside a passage the timeline marks as
//! retrospective (flashback, memory, "years earlier") are skipped.

use std::collections::HashSet;
use tracing::debug;

use crate::config::LoreConfig;
use crate::extraction::patterns::{
    clean_name, is_retrospective, peeled_prefix_len, DeathForm, PatternLibrary,
};
use crate::text::{name_key, TextIndex};
use crate::types::{new_id, Claim, Contradiction, ContradictionType, EntityGraph, Timeline, TimelineEvent};

pub const TIMELINE_SEVERITY: f64 = 0.95;

/// First recorded death of a named entity; offsets are chars
#[derive(Debug, Clone, PartialEq)]
pub struct DeathRecord {
    pub name: String,
    pub form: DeathForm,
    /// Offset of the name inside the death phrase
    pub name_start: usize,
    pub start: usize,
    pub end: usize,
}

/// First death statement per case-folded name, in text order
pub fn find_deaths(text: &str) -> Vec<DeathRecord> {
    let lib = PatternLibrary::global();
    let idx = TextIndex::new(text);

    let mut all = Vec::new();
    for rule in &lib.deaths {
        for hit in rule.matches(text) {
            let Some((name_start, _, raw)) = hit.group("name") else {
                continue;
            };
            let Some(name) = clean_name(raw) else {
                continue;
            };
            let name_start = name_start + peeled_prefix_len(raw);
            all.push(DeathRecord {
                name,
                form: rule.category,
                name_start: idx.to_char(name_start),
                start: idx.to_char(hit.start()),
                end: idx.to_char(hit.end()),
            });
        }
    }
    all.sort_by_key(|d| d.start);

    let mut seen = HashSet::new();
    all.retain(|d| seen.insert(name_key(&d.name)));
    all
}

/// Events sorted by offset; each one governs the text up to the next
struct Passages<'t> {
    events: Vec<&'t TimelineEvent>,
}

impl<'t> Passages<'t> {
    fn new(timeline: &'t Timeline) -> Self {
        let mut events: Vec<&TimelineEvent> = timeline.events.iter().collect();
        events.sort_by_key(|e| e.offset);
        Self { events }
    }

    fn is_retrospective_at(&self, offset: usize) -> bool {
        let upto = self.events.partition_point(|e| e.offset <= offset);
        if upto == 0 {
            return false;
        }
        let event = self.events[upto - 1];
        event.temporal_marker.as_deref().is_some_and(is_retrospective)
            || is_retrospective(&event.description)
    }
}

pub fn detect_timeline_contradictions(
    text: &str,
    graph: &EntityGraph,
    timeline: &Timeline,
) -> Vec<Contradiction> {
    detect_timeline_contradictions_with(text, graph, timeline, &LoreConfig::default())
}

pub fn detect_timeline_contradictions_with(
    text: &str,
    graph: &EntityGraph,
    timeline: &Timeline,
    config: &LoreConfig,
) -> Vec<Contradiction> {
    if graph.nodes.is_empty() {
        return Vec::new();
    }
    let lib = PatternLibrary::global();
    let idx = TextIndex::new(text);
    let text_len = idx.char_len();
    let passages = Passages::new(timeline);
    let deaths = find_deaths(text);

    let mut reported: HashSet<&str> = HashSet::new();
    let mut found = Vec::new();

    for death in &deaths {
        let Some(node) = graph.find_node(&death.name) else {
            continue;
        };
        if reported.contains(node.id.as_str()) {
            continue;
        }

        let chapter = node.chapter_at(death.name_start);
        if chapter.is_none() && node.spans_chapters() {
            debug!(name = %node.name, "death chapter ambiguous in merged graph, skipped");
            continue;
        }

        let mut after: Vec<(usize, &str)> = node
            .mentions
            .iter()
            .filter(|m| chapter.map_or(true, |c| m.chapter_id == c))
            .map(|m| (m.offset, m.chapter_id.as_str()))
            .filter(|&(o, _)| o >= death.end && o < text_len)
            .collect();
        after.sort_unstable();
        after.dedup();

        for (offset, mention_chapter) in after {
            if passages.is_retrospective_at(offset) {
                continue;
            }
            let window_end = offset.saturating_add(config.timeline_context_chars).min(text_len);
            let window = idx.slice(offset, window_end);
            let Some(action) = lib.action_verbs.find(window) else {
                continue;
            };
            let action_end = offset + window[..action.end()].chars().count();

            reported.insert(node.id.as_str());
            found.push(Contradiction {
                id: new_id("contra"),
                contradiction_type: ContradictionType::Timeline,
                entity_id: node.id.clone(),
                entity_name: node.name.clone(),
                claim1: Claim {
                    text: idx.context(death.start, death.end, config.context_chars),
                    offset: death.start,
                    value: "dead".to_string(),
                    chapter_id: chapter.map(str::to_string),
                },
                claim2: Claim {
                    text: idx.context(offset, action_end, config.context_chars),
                    offset,
                    value: action.as_str().to_string(),
                    chapter_id: Some(mention_chapter.to_string()),
                },
                severity: TIMELINE_SEVERITY,
                suggestion: format!(
                    "{} dies earlier in the text but later \"{}\". Move the scene before the death or mark it as a flashback.",
                    node.name,
                    action.as_str()
                ),
            });
            break;
        }
    }

    debug!(
        deaths = deaths.len(),
        contradictions = found.len(),
        "timeline check complete"
    );
    found
}
