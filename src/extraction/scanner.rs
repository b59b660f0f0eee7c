//! EntityScanner - candidate mentions from raw chapter text
//!
//! Runs every name/location/object rule of the Pattern Library over the full
//! text (union of hits, not first-match-wins) and adds dialogue speakers
//! supplied by the structural parser.
//!
//! # Post-processing
//! 1. Normalize + validate each candidate (invalid ones vanish silently)
//! 2. Drop generic proper-noun hits covered by a rule-specific span
//!    ("Darcy" inside "Mr. Darcy", "Shire" inside "in the Shire")
//! 3. Keep one candidate per (name, offset)
//! 4. Order by offset, rule order breaking ties

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::config::LoreConfig;
use crate::extraction::patterns::{clean_name, peeled_prefix_len, NameForm, PatternLibrary};
use crate::text::{name_key, normalize_name, TextIndex};
use crate::types::{CandidateSource, DialogueLine, EntityType, RawEntity};

/// Candidate before context is attached; offsets are chars
#[derive(Debug, Clone)]
struct Candidate {
    name: String,
    entity_type: EntityType,
    start: usize,
    end: usize,
    source: CandidateSource,
}

fn source_type(source: CandidateSource) -> EntityType {
    match source {
        CandidateSource::Location => EntityType::Location,
        CandidateSource::Object => EntityType::Object,
        CandidateSource::DialogueSpeaker
        | CandidateSource::Title
        | CandidateSource::DialogueAttribution
        | CandidateSource::ProperNoun => EntityType::Character,
    }
}

// =============================================================================
// EntityScanner
// =============================================================================

pub struct EntityScanner {
    context_chars: usize,
}

impl Default for EntityScanner {
    fn default() -> Self {
        Self::new(&LoreConfig::default())
    }
}

impl EntityScanner {
    pub fn new(config: &LoreConfig) -> Self {
        Self {
            context_chars: config.context_chars,
        }
    }

    /// Candidates from the text alone
    pub fn scan(&self, text: &str) -> Vec<RawEntity> {
        self.scan_with_dialogue(text, &[])
    }

    /// Candidates from the text plus externally detected dialogue speakers
    pub fn scan_with_dialogue(&self, text: &str, dialogues: &[DialogueLine]) -> Vec<RawEntity> {
        let idx = TextIndex::new(text);
        let mut candidates = Self::speaker_candidates(dialogues);
        candidates.extend(Self::rule_candidates(text, &idx));

        let before = candidates.len();
        let candidates = Self::suppress_covered(candidates);
        let candidates = Self::dedupe(candidates);
        debug!(
            raw = before,
            kept = candidates.len(),
            "entity scan complete"
        );

        candidates
            .into_iter()
            .map(|c| RawEntity {
                context: idx.context(c.start, c.end, self.context_chars),
                name: c.name,
                entity_type: c.entity_type,
                offset: c.start,
                source: c.source,
            })
            .collect()
    }

    fn speaker_candidates(dialogues: &[DialogueLine]) -> Vec<Candidate> {
        dialogues
            .iter()
            .filter_map(|line| {
                let speaker = line.speaker.as_deref()?;
                let name = normalize_name(speaker);
                if name.is_empty() {
                    warn!(dialogue_id = %line.id, "dialogue line with blank speaker ignored");
                    return None;
                }
                Some(Candidate {
                    name,
                    entity_type: EntityType::Character,
                    start: line.offset,
                    end: line.offset,
                    source: CandidateSource::DialogueSpeaker,
                })
            })
            .collect()
    }

    fn rule_candidates(text: &str, idx: &TextIndex<'_>) -> Vec<Candidate> {
        let lib = PatternLibrary::global();
        let mut out = Vec::new();

        for rule in &lib.names {
            for hit in rule.matches(text) {
                let (raw, b_start, b_end) = match rule.category.form {
                    NameForm::WholeMatch => (hit.phrase(), hit.start(), hit.end()),
                    NameForm::Captured => match hit.group("name") {
                        Some((s, e, t)) => (t, s, e),
                        None => continue,
                    },
                };
                let Some(name) = clean_name(raw) else {
                    continue;
                };
                let b_start = b_start + peeled_prefix_len(raw);
                out.push(Candidate {
                    name,
                    entity_type: source_type(rule.category.source),
                    start: idx.to_char(b_start),
                    end: idx.to_char(b_end),
                    source: rule.category.source,
                });
            }
        }
        out
    }

    /// Drop generic hits lying inside any rule-specific span
    fn suppress_covered(candidates: Vec<Candidate>) -> Vec<Candidate> {
        let mut spans: Vec<(usize, usize)> = candidates
            .iter()
            .filter(|c| !c.source.is_generic() && c.end > c.start)
            .map(|c| (c.start, c.end))
            .collect();
        if spans.is_empty() {
            return candidates;
        }
        spans.sort_unstable();

        // furthest end reached by any span starting at or before position i
        let mut reach = Vec::with_capacity(spans.len());
        let mut max_end = 0;
        for &(_, end) in &spans {
            max_end = max_end.max(end);
            reach.push(max_end);
        }

        candidates
            .into_iter()
            .filter(|c| {
                if !c.source.is_generic() {
                    return true;
                }
                let upto = spans.partition_point(|&(s, _)| s <= c.start);
                upto == 0 || reach[upto - 1] < c.end
            })
            .collect()
    }

    /// One candidate per (name, offset); earlier rules win. Result is offset-ordered.
    fn dedupe(candidates: Vec<Candidate>) -> Vec<Candidate> {
        let mut seen = HashSet::new();
        let mut kept: Vec<Candidate> = candidates
            .into_iter()
            .filter(|c| seen.insert((name_key(&c.name), c.start)))
            .collect();
        kept.sort_by_key(|c| c.start);
        kept
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn names(raw: &[RawEntity]) -> Vec<&str> {
        raw.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_empty_text() {
        let scanner = EntityScanner::default();
        assert!(scanner.scan("").is_empty());
    }

    #[test]
    fn test_sentence_start_and_mid_sentence_names() {
        let scanner = EntityScanner::default();
        let raw = scanner.scan("Sarah and Marcus walked together through the garden.");
        assert_eq!(names(&raw), vec!["Sarah", "Marcus"]);
        assert_eq!(raw[1].offset, 10);
        assert!(raw.iter().all(|r| r.entity_type == EntityType::Character));
    }

    #[test]
    fn test_false_positives_discarded() {
        let scanner = EntityScanner::default();
        let raw = scanner.scan("Later, he said nothing. The night was cold. On Monday it rained.");
        assert!(raw.is_empty(), "got {:?}", names(&raw));
    }

    #[test]
    fn test_possessive_stripped() {
        let scanner = EntityScanner::default();
        let raw = scanner.scan("Sarah's blue eyes sparkled.");
        assert_eq!(names(&raw), vec!["Sarah"]);
        assert_eq!(raw[0].offset, 0);
    }

    #[test]
    fn test_titled_name_absorbs_bare_name() {
        let scanner = EntityScanner::default();
        let raw = scanner.scan("Everyone turned. Mr. Darcy bowed.");
        assert_eq!(names(&raw), vec!["Mr. Darcy"]);
        assert_eq!(raw[0].source, CandidateSource::Title);
    }

    #[test]
    fn test_inner_capital_names_kept_whole() {
        let scanner = EntityScanner::default();
        let raw = scanner.scan("McAllister smiled. McBride frowned. Then DeShawn waved.");
        assert_eq!(names(&raw), vec!["McAllister", "McBride", "DeShawn"]);

        let raw = scanner.scan("Mr. McAllister bowed. Jean-Luc waited.");
        assert_eq!(names(&raw), vec!["Mr. McAllister", "Jean-Luc"]);
    }

    #[test]
    fn test_dialogue_attribution_both_orders() {
        let scanner = EntityScanner::default();
        let text = "\"Run,\" said Elena. Then Tobias said, \"No.\"";
        let raw = scanner.scan(text);
        let attributed: Vec<_> = raw
            .iter()
            .filter(|r| r.source == CandidateSource::DialogueAttribution)
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(attributed, vec!["Elena", "Tobias"]);
        let tobias = raw.iter().find(|r| r.name == "Tobias").unwrap();
        assert_eq!(tobias.offset, text.find("Tobias").unwrap());
    }

    #[test]
    fn test_location_candidates() {
        let scanner = EntityScanner::default();
        let raw = scanner.scan("They rode to Rivendell and camped near the Misty Mountain.");
        let locations: Vec<_> = raw
            .iter()
            .filter(|r| r.entity_type == EntityType::Location)
            .map(|r| r.name.as_str())
            .collect();
        assert!(locations.contains(&"Rivendell"));
        assert!(locations.contains(&"Misty Mountain"));
        // the bare proper-noun hits were absorbed by the location spans
        assert!(raw.iter().all(|r| r.source != CandidateSource::ProperNoun));
    }

    #[test]
    fn test_object_candidates() {
        let scanner = EntityScanner::default();
        let raw = scanner.scan("She drew the sword of Elendil. The Elven cloak hung behind her.");
        let objects: Vec<_> = raw
            .iter()
            .filter(|r| r.entity_type == EntityType::Object)
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(objects, vec!["sword of Elendil", "Elven cloak"]);
    }

    #[test]
    fn test_dialogue_speakers_are_candidates() {
        let scanner = EntityScanner::default();
        let dialogues = vec![
            DialogueLine {
                id: "d1".to_string(),
                quote: "Hello".to_string(),
                speaker: Some("Ilsa".to_string()),
                offset: 3,
                ..Default::default()
            },
            DialogueLine {
                id: "d2".to_string(),
                speaker: Some("   ".to_string()),
                ..Default::default()
            },
        ];
        let raw = scanner.scan_with_dialogue("so \"Hello\"", &dialogues);
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].name, "Ilsa");
        assert_eq!(raw[0].offset, 3);
        assert_eq!(raw[0].source, CandidateSource::DialogueSpeaker);
    }

    #[test]
    fn test_offsets_are_chars_for_unicode_text() {
        let scanner = EntityScanner::default();
        let text = "Éowyn rode hard. Merry followed.";
        let raw = scanner.scan(text);
        let merry = raw.iter().find(|r| r.name == "Merry").unwrap();
        assert_eq!(merry.offset, 17);
        assert_eq!(names(&raw)[0], "Éowyn");
    }

    #[test]
    fn test_offset_order() {
        let scanner = EntityScanner::default();
        let raw = scanner.scan("Marcus waited. \"No,\" said Sarah. Marcus nodded.");
        let offsets: Vec<_> = raw.iter().map(|r| r.offset).collect();
        let mut sorted = offsets.clone();
        sorted.sort();
        assert_eq!(offsets, sorted);
        assert_eq!(names(&raw), vec!["Marcus", "Sarah", "Marcus"]);
    }
}
