//! Coreference Resolver - pronouns -> character nodes
//!
//! Resolves he/him/his/himself and she/her/hers/herself to the character
//! whose latest mention sits nearest before the pronoun.
//!
//! # Heuristics
//! 1. Gender from the name's ending ("-ella" female, "-us" male)
//! 2. Otherwise gender from gendered pronouns around the first few mentions
//! 3. Unknown gender is compatible with every pronoun
//! 4. If no candidate is compatible, every character is a candidate
//!
//! Each accepted resolution becomes a mention right away, so it can anchor
//! the next pronoun and later counts toward paragraph co-occurrence.

use serde::{Deserialize, Serialize};
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::LoreConfig;
use crate::extraction::patterns::{PatternLibrary, FEMININE_ENDINGS, MASCULINE_ENDINGS};
use crate::text::TextIndex;
use crate::types::{CoReference, EntityNode, EntityType};

// =============================================================================
// Gender
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unknown,
}

pub fn genders_compatible(entity: Gender, pronoun: Gender) -> bool {
    match (entity, pronoun) {
        (g1, g2) if g1 == g2 => true,
        (Gender::Unknown, _) | (_, Gender::Unknown) => true,
        _ => false,
    }
}

pub fn pronoun_gender(pronoun: &str) -> Gender {
    match pronoun.to_lowercase().as_str() {
        "he" | "him" | "his" | "himself" => Gender::Male,
        "she" | "her" | "hers" | "herself" => Gender::Female,
        _ => Gender::Unknown,
    }
}

/// Gender suggested by the ending of the name's last word
pub fn gender_from_name(name: &str) -> Gender {
    let Some(last) = name.unicode_words().last() else {
        return Gender::Unknown;
    };
    let last = last.to_lowercase();
    let has_ending = |endings: &[&str]| {
        endings
            .iter()
            .any(|e| last.len() > e.len() && last.ends_with(e))
    };
    if has_ending(FEMININE_ENDINGS) {
        Gender::Female
    } else if has_ending(MASCULINE_ENDINGS) {
        Gender::Male
    } else {
        Gender::Unknown
    }
}

/// Majority of gendered pronouns near the node's first mentions
fn gender_from_context(node: &EntityNode, idx: &TextIndex<'_>, config: &LoreConfig) -> Gender {
    let lib = PatternLibrary::global();
    let (mut male, mut female) = (0usize, 0usize);
    for mention in node.mentions.iter().take(config.gender_sample_mentions) {
        let from = mention.offset.saturating_sub(config.gender_window_chars);
        let to = mention.offset.saturating_add(config.gender_window_chars);
        let window = idx.slice(from, to);
        male += lib.male_pronouns.find_iter(window).count();
        female += lib.female_pronouns.find_iter(window).count();
    }
    match male.cmp(&female) {
        std::cmp::Ordering::Greater => Gender::Male,
        std::cmp::Ordering::Less => Gender::Female,
        std::cmp::Ordering::Equal => Gender::Unknown,
    }
}

pub fn infer_gender(node: &EntityNode, idx: &TextIndex<'_>, config: &LoreConfig) -> Gender {
    match gender_from_name(&node.name) {
        Gender::Unknown => gender_from_context(node, idx, config),
        known => known,
    }
}

/// Distance (in chars) from antecedent to pronoun -> confidence
pub fn distance_confidence(distance: usize) -> f64 {
    if distance < 100 {
        0.9
    } else if distance < 300 {
        0.7
    } else {
        0.5
    }
}

const MIN_CONFIDENCE: f64 = 0.5;

// =============================================================================
// Resolver
// =============================================================================

/// One character node eligible as an antecedent
struct Antecedent {
    node: usize,
    gender: Gender,
    /// Sorted offsets of the node's mentions before resolution started
    offsets: Vec<usize>,
    cursor: usize,
    /// Latest mention strictly before the current pronoun
    latest: Option<usize>,
}

impl Antecedent {
    /// Pronouns arrive in ascending offset order, so the cursor only moves forward
    fn advance_to(&mut self, pronoun: usize) {
        while self.cursor < self.offsets.len() && self.offsets[self.cursor] < pronoun {
            let offset = self.offsets[self.cursor];
            self.latest = Some(self.latest.map_or(offset, |l| l.max(offset)));
            self.cursor += 1;
        }
    }
}

/// Appends a mention to every resolved node. Returns the accepted resolutions
/// in text order.
pub fn resolve_pronouns(
    text: &str,
    nodes: &mut [EntityNode],
    chapter_id: &str,
    config: &LoreConfig,
) -> Vec<CoReference> {
    let idx = TextIndex::new(text);
    let mut antecedents: Vec<Antecedent> = nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| n.entity_type == EntityType::Character)
        .map(|(i, n)| {
            let mut offsets: Vec<usize> = n.mentions.iter().map(|m| m.offset).collect();
            offsets.sort_unstable();
            Antecedent {
                node: i,
                gender: infer_gender(n, &idx, config),
                offsets,
                cursor: 0,
                latest: None,
            }
        })
        .collect();
    if antecedents.is_empty() {
        return Vec::new();
    }

    let lib = PatternLibrary::global();
    let mut resolved = Vec::new();

    for hit in lib.pronouns.find_iter(text) {
        let offset = idx.to_char(hit.start());
        let gender = pronoun_gender(hit.as_str());
        for a in antecedents.iter_mut() {
            a.advance_to(offset);
        }

        let any_compatible = antecedents
            .iter()
            .any(|a| genders_compatible(a.gender, gender));

        // nearest preceding mention; earlier node order wins a tie
        let mut best: Option<(usize, usize)> = None;
        for (slot, a) in antecedents.iter().enumerate() {
            if any_compatible && !genders_compatible(a.gender, gender) {
                continue;
            }
            let Some(latest) = a.latest else {
                continue;
            };
            if best.map_or(true, |(_, b)| latest > b) {
                best = Some((slot, latest));
            }
        }

        let Some((slot, latest)) = best else {
            continue;
        };
        let confidence = distance_confidence(offset - latest);
        if confidence < MIN_CONFIDENCE {
            continue;
        }

        let antecedent = &mut antecedents[slot];
        antecedent.latest = Some(offset);
        let node = &mut nodes[antecedent.node];
        node.add_mention(offset, chapter_id);
        resolved.push(CoReference {
            pronoun: hit.as_str().to_string(),
            offset,
            resolved_to: node.id.clone(),
            confidence,
        });
    }

    debug!(resolved = resolved.len(), "pronoun resolution complete");
    resolved
}

// =============================================================================
// Tests
// =============================================================================
