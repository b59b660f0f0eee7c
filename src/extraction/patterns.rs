//! Pattern Library - declarative rule tables for extraction and detection
//!
//! Every rule is a `PatternRule { category, regex }` kept in an ordered table,
//! one table per concern:
//! - names (proper nouns, titles, dialogue attribution)
//! - locations, objects
//! - aliases, relationships
//! - deaths, physical attributes
//!
//! Captures are read through named groups (`name`, `other`, `value`, `a`, `b`)
//! so callers never depend on group positions.
//!
//! The `regex` crate guarantees linear-time matching, so none of these rules
//! can backtrack catastrophically on adversarial input.

use regex::{Captures, Regex};
use std::sync::OnceLock;

use crate::text::normalize_name;
use crate::types::{CandidateSource, RelationshipType};

// =============================================================================
// Lexicons
// =============================================================================

/// Capitalized tokens that are never entity names (compared lowercase)
pub const FALSE_POSITIVES: &[&str] = &[
    // pronouns / determiners
    "i", "he", "she", "it", "we", "you", "they", "him", "her", "his", "hers", "its", "our",
    "your", "their", "them", "me", "my", "mine", "us", "this", "that", "these", "those", "the",
    "a", "an", "there", "here", "who", "what", "where", "when", "why", "how", "which", "whose",
    "someone", "something", "nobody", "nothing", "everyone", "everything", "anyone", "each",
    "every", "all", "both", "some", "none", "another", "other",
    // connectors / sentence openers
    "and", "but", "or", "nor", "so", "yet", "for", "if", "then", "than", "though", "although",
    "because", "while", "after", "before", "later", "soon", "now", "once", "still", "even",
    "just", "only", "also", "again", "meanwhile", "suddenly", "finally", "however", "perhaps",
    "maybe", "instead", "until", "since", "as", "at", "in", "on", "by", "with", "from", "to",
    "into", "of", "not", "no", "yes", "oh", "ah", "well", "okay", "ok", "please", "thanks",
    "hello", "goodbye", "today", "tonight", "tomorrow", "yesterday", "everywhere", "somewhere",
    "outside", "inside", "above", "below", "behind", "beyond", "without", "within", "together",
    "let", "do", "did", "does", "was", "were", "is", "are", "be", "been", "had", "have", "has",
    "can", "could", "would", "should", "will", "shall", "may", "might", "must",
    // days / months
    "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday", "january",
    "february", "march", "april", "june", "july", "august", "september", "october",
    "november", "december",
    // generic nouns
    "chapter", "part", "book", "prologue", "epilogue", "scene", "act", "volume", "section",
    "god", "gods", "lord", "lady", "sir", "madam", "king", "queen", "prince", "princess",
    "captain", "doctor", "professor", "master", "mr", "mrs", "ms", "miss", "dr", "mother",
    "father", "mom", "dad", "mum", "brother", "sister", "uncle", "aunt", "general",
    "commander", "dame", "end", "morning", "evening", "night", "day",
];

/// Honorifics that prefix a titled name
pub const HONORIFICS: &[&str] = &[
    "Mr", "Mrs", "Ms", "Miss", "Dr", "Doctor", "Professor", "Captain", "Lord", "Lady", "Sir",
    "Dame", "King", "Queen", "Prince", "Princess", "General", "Commander", "Master", "Father",
    "Mother", "Sister", "Brother", "Uncle", "Aunt", "Lieutenant", "Sergeant", "Duke",
    "Duchess", "Baron", "Count", "Countess",
];

pub const SPEECH_VERBS: &[&str] = &[
    "said", "asked", "replied", "answered", "whispered", "shouted", "cried", "muttered",
    "exclaimed", "murmured", "yelled", "added", "continued", "responded", "demanded",
    "insisted", "snapped", "growled", "called",
];

pub const LOCATION_PREPOSITIONS: &[&str] = &[
    "in", "at", "near", "from", "to", "toward", "towards", "into", "inside", "outside",
    "beyond", "across", "through", "within",
];

pub const PLACE_NOUNS: &[&str] = &[
    "castle", "forest", "tavern", "inn", "tower", "keep", "fortress", "palace", "temple",
    "city", "village", "town", "mountain", "river", "lake", "sea", "valley", "kingdom",
    "empire", "woods", "hall", "citadel", "cave", "marsh", "desert", "island", "harbor",
    "harbour", "port", "bridge", "gate", "abbey", "manor", "mines", "sanctuary",
];

pub const OBJECT_NOUNS: &[&str] = &[
    "sword", "blade", "crown", "amulet", "ring", "staff", "shield", "dagger", "bow", "helm",
    "cloak", "tome", "scroll", "orb", "chalice", "key", "stone", "gem", "necklace", "hammer",
    "axe", "spear", "wand", "map", "relic", "locket", "talisman", "scepter", "sceptre",
];

/// Name endings that suggest a female name, checked before the male list
pub const FEMININE_ENDINGS: &[&str] = &[
    "ella", "elle", "ette", "ina", "ine", "issa", "ia", "ah", "lyn", "beth", "a",
];

pub const MASCULINE_ENDINGS: &[&str] = &["son", "ius", "us", "ard", "ert", "rick", "os", "o"];

/// Colour synonyms; two values in the same bucket are compatible
pub const COLOR_BUCKETS: &[&[&str]] = &[
    &["blue", "azure", "sky blue", "sapphire", "cerulean", "cobalt", "ice blue", "navy"],
    &["green", "emerald", "jade", "olive", "sea green"],
    &["brown", "hazel", "chestnut", "chocolate", "amber"],
    &["grey", "gray", "silver", "steel", "ash"],
    &["black", "ebony", "jet", "raven", "dark"],
    &["blonde", "blond", "golden", "gold", "flaxen", "fair", "honey"],
    &["red", "auburn", "ginger", "copper", "crimson", "scarlet"],
    &["white", "snowy", "platinum", "silver"],
];

/// Verbs that mean a character is acting on-page
pub const ACTION_VERBS: &[&str] = &[
    "said", "asked", "walked", "ran", "looked", "smiled", "nodded", "shook",
];

/// Timeline markers that put a passage before the narrative present
pub const RETROSPECTIVE_MARKERS: &[&str] = &[
    "flashback", "memory", "memories", "remembered", "recalled", "earlier", "ago", "before",
    "past", "once",
];

const EYE_COLORS: &[&str] = &[
    "blue", "green", "brown", "hazel", "grey", "gray", "black", "amber", "violet", "azure",
    "emerald", "sapphire", "cerulean", "jade", "golden", "gold", "silver", "red", "cobalt",
];

const HAIR_COLORS: &[&str] = &[
    "blonde", "blond", "golden", "red", "auburn", "ginger", "black", "brown", "chestnut",
    "silver", "white", "grey", "gray", "raven", "copper", "flaxen", "dark", "fair", "platinum",
];

const COLOR_MODIFIERS: &str = r"(?:(?:light|dark|pale|deep|bright|ice|sky|steel|sea)[ \t-]+)?";

/// One whole capitalized word: inner capitals ("McAllister", "DeShawn") and
/// hyphenated compounds allowed
const WORD: &str = r"\p{Lu}\p{Ll}+(?:\p{Lu}\p{Ll}+)*(?:-\p{Lu}\p{Ll}+)?\b";

fn alternation(words: &[&str]) -> String {
    words.join("|")
}

/// One or two capitalized words on the same line
fn name2() -> String {
    format!(r"{w}(?:[ \t]+{w})?", w = WORD)
}

// =============================================================================
// Rule Types
// =============================================================================

/// A typed rule: a category tag plus its compiled matcher
#[derive(Debug)]
pub struct PatternRule<C> {
    pub category: C,
    regex: Regex,
}

impl<C: Copy> PatternRule<C> {
    fn new(category: C, pattern: &str) -> Self {
        // Patterns are static; `all_rules_compile` pins them in tests
        let regex = Regex::new(pattern)
            .unwrap_or_else(|e| panic!("invalid static pattern {:?}: {}", pattern, e));
        Self { category, regex }
    }

    pub fn matches<'r, 't>(&'r self, text: &'t str) -> impl Iterator<Item = RuleMatch<'t>> + 'r
    where
        't: 'r,
    {
        self.regex.captures_iter(text).map(|caps| RuleMatch { caps })
    }
}

/// One rule hit; offsets are bytes into the scanned text
#[derive(Debug)]
pub struct RuleMatch<'t> {
    caps: Captures<'t>,
}

impl<'t> RuleMatch<'t> {
    pub fn start(&self) -> usize {
        self.caps.get(0).map_or(0, |m| m.start())
    }

    pub fn end(&self) -> usize {
        self.caps.get(0).map_or(0, |m| m.end())
    }

    pub fn phrase(&self) -> &'t str {
        self.caps.get(0).map_or("", |m| m.as_str())
    }

    /// (start, end, text) of a named group
    pub fn group(&self, name: &str) -> Option<(usize, usize, &'t str)> {
        self.caps.name(name).map(|m| (m.start(), m.end(), m.as_str()))
    }

    pub fn text_of(&self, name: &str) -> Option<&'t str> {
        self.caps.name(name).map(|m| m.as_str())
    }
}

/// How a name candidate rule reads its match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameForm {
    /// Candidate is the `name` group
    Captured,
    /// Candidate is the whole match (honorific + name)
    WholeMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameRuleKind {
    pub source: CandidateSource,
    pub form: NameForm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasForm {
    /// "X, known as Y"
    KnownAs,
    /// "Y, whose real name was X"
    RealName,
    /// "X, the old wizard"
    Descriptor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathForm {
    Died,
    KilledBy,
    Possessive,
}

/// Physical attribute categories checked for contradictions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttributeCategory {
    EyeColor,
    HairColor,
    Age,
    Height,
    Build,
}

impl AttributeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeCategory::EyeColor => "eye_color",
            AttributeCategory::HairColor => "hair_color",
            AttributeCategory::Age => "age",
            AttributeCategory::Height => "height",
            AttributeCategory::Build => "build",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AttributeCategory::EyeColor => "eye color",
            AttributeCategory::HairColor => "hair color",
            AttributeCategory::Age => "age",
            AttributeCategory::Height => "height",
            AttributeCategory::Build => "build",
        }
    }
}

// =============================================================================
// Pattern Library
// =============================================================================

/// All rule tables, compiled once per process and read-only afterwards
#[derive(Debug)]
pub struct PatternLibrary {
    pub names: Vec<PatternRule<NameRuleKind>>,
    pub aliases: Vec<PatternRule<AliasForm>>,
    pub relationships: Vec<PatternRule<RelationshipType>>,
    pub deaths: Vec<PatternRule<DeathForm>>,
    pub attributes: Vec<PatternRule<AttributeCategory>>,
    pub pronouns: Regex,
    pub male_pronouns: Regex,
    pub female_pronouns: Regex,
    pub action_verbs: Regex,
}

static LIBRARY: OnceLock<PatternLibrary> = OnceLock::new();

impl PatternLibrary {
    pub fn global() -> &'static PatternLibrary {
        LIBRARY.get_or_init(PatternLibrary::build)
    }

    fn build() -> Self {
        Self {
            names: Self::name_rules(),
            aliases: Self::alias_rules(),
            relationships: Self::relationship_rules(),
            deaths: Self::death_rules(),
            attributes: Self::attribute_rules(),
            pronouns: compile(r"(?i)\b(?:he|him|his|himself|she|her|hers|herself)\b"),
            male_pronouns: compile(r"(?i)\b(?:he|him|his)\b"),
            female_pronouns: compile(r"(?i)\b(?:she|her|hers)\b"),
            action_verbs: compile(&format!(r"\b(?:{})\b", alternation(ACTION_VERBS))),
        }
    }

    /// Ordered: rule-specific sources first, the generic proper-noun rule last
    fn name_rules() -> Vec<PatternRule<NameRuleKind>> {
        let n2 = name2();
        let speech = alternation(SPEECH_VERBS);
        let kind = |source, form| NameRuleKind { source, form };
        vec![
            // Captain Reyes, Mr. Darcy
            PatternRule::new(
                kind(CandidateSource::Title, NameForm::WholeMatch),
                &format!(r"\b(?:{})\.?[ \t]+(?P<name>{})", alternation(HONORIFICS), WORD),
            ),
            // "...," said Marcus
            PatternRule::new(
                kind(CandidateSource::DialogueAttribution, NameForm::Captured),
                &format!(r"\b(?:{})[ \t]+(?P<name>{})", speech, n2),
            ),
            // Marcus said, "..."  /  "...," Marcus said
            PatternRule::new(
                kind(CandidateSource::DialogueAttribution, NameForm::Captured),
                &format!(r"\b(?P<name>{})[ \t]+(?:{})\b", n2, speech),
            ),
            // in (the) Rivendell
            PatternRule::new(
                kind(CandidateSource::Location, NameForm::Captured),
                &format!(
                    r"\b(?i:{})[ \t]+(?:(?i:the)[ \t]+)?(?P<name>{w}(?:[ \t]+{w}){{0,2}})",
                    alternation(LOCATION_PREPOSITIONS),
                    w = WORD
                ),
            ),
            // the Black Castle
            PatternRule::new(
                kind(CandidateSource::Location, NameForm::Captured),
                &format!(
                    r"\b(?i:the)[ \t]+(?P<name>{w}(?:[ \t]+{w}){{0,2}}[ \t]+(?i:{p})s?)\b",
                    p = alternation(PLACE_NOUNS),
                    w = WORD
                ),
            ),
            // the Elven sword / the King's crown
            PatternRule::new(
                kind(CandidateSource::Object, NameForm::Captured),
                &format!(
                    r"\b(?i:the)[ \t]+(?P<name>{w}(?:'s|’s)?(?:[ \t]+{w})?[ \t]+(?i:{o}))\b",
                    o = alternation(OBJECT_NOUNS),
                    w = WORD
                ),
            ),
            // the sword of Elendil
            PatternRule::new(
                kind(CandidateSource::Object, NameForm::Captured),
                &format!(
                    r"\b(?i:the)[ \t]+(?P<name>(?i:{o})[ \t]+of[ \t]+{n2})",
                    o = alternation(OBJECT_NOUNS),
                    n2 = n2
                ),
            ),
            // any one- or two-word capitalized token (possessive suffix left outside)
            PatternRule::new(
                kind(CandidateSource::ProperNoun, NameForm::Captured),
                &format!(r"\b(?P<name>{})", n2),
            ),
        ]
    }

    fn alias_rules() -> Vec<PatternRule<AliasForm>> {
        let n2 = name2();
        vec![
            PatternRule::new(
                AliasForm::KnownAs,
                &format!(
                    r#"(?P<name>{n2}),[ \t]+(?:also[ \t]+)?(?:known|called|nicknamed)[ \t]+(?:as[ \t]+)?["“]?(?P<other>(?:the[ \t]+)?{w}(?:[ \t]+{w}){{0,2}})"#,
                    n2 = n2,
                    w = WORD
                ),
            ),
            PatternRule::new(
                AliasForm::RealName,
                &format!(
                    r"(?P<other>{n2}),[ \t]+whose[ \t]+(?:real|true)[ \t]+name[ \t]+(?:was|is)[ \t]+(?P<name>{n2})",
                    n2 = n2
                ),
            ),
            PatternRule::new(
                AliasForm::Descriptor,
                &format!(
                    r"(?P<name>{n2}),[ \t]+(?P<other>the[ \t]+\p{{Ll}}+[ \t]+\p{{Ll}}+)\b",
                    n2 = n2
                ),
            ),
        ]
    }

    fn relationship_rules() -> Vec<PatternRule<RelationshipType>> {
        let n2 = name2();
        let verb_rule = |ty, verbs: &str| {
            PatternRule::new(
                ty,
                &format!(r"\b(?P<a>{n2})[ \t]+(?:{v})[ \t]+(?P<b>{n2})", n2 = n2, v = verbs),
            )
        };
        vec![
            verb_rule(RelationshipType::RelatedTo, "loved|kissed|married"),
            verb_rule(RelationshipType::Opposes, "attacked|killed|struck"),
            verb_rule(RelationshipType::AlliedWith, "helped|saved|protected"),
            PatternRule::new(
                RelationshipType::AlliedWith,
                &format!(
                    r"\b(?P<a>{n2})[ \t]+and[ \t]+(?P<b>{n2})[ \t]+(?:walked|traveled|travelled|worked|ran)[ \t]+together",
                    n2 = n2
                ),
            ),
            verb_rule(RelationshipType::Opposes, "hated|despised|feared"),
            verb_rule(RelationshipType::AlliedWith, r"trusted|believed(?:[ \t]+in)?|followed"),
        ]
    }

    fn death_rules() -> Vec<PatternRule<DeathForm>> {
        let n2 = name2();
        vec![
            PatternRule::new(
                DeathForm::Died,
                &format!(
                    r"\b(?P<name>{n2})[ \t]+(?:died|was[ \t]+killed|was[ \t]+slain|was[ \t]+murdered|passed[ \t]+away|perished)\b",
                    n2 = n2
                ),
            ),
            PatternRule::new(
                DeathForm::KilledBy,
                &format!(r"\b(?:killed|murdered|slew)[ \t]+(?P<name>{n2})", n2 = n2),
            ),
            PatternRule::new(
                DeathForm::Possessive,
                &format!(
                    r"\b(?P<name>{n2})(?:'s|’s)[ \t]+(?:death|demise|passing)\b",
                    n2 = n2
                ),
            ),
        ]
    }

    fn attribute_rules() -> Vec<PatternRule<AttributeCategory>> {
        let n2 = name2();
        let eye = format!("{}(?:{})", COLOR_MODIFIERS, alternation(EYE_COLORS));
        let hair = format!("{}(?:{})", COLOR_MODIFIERS, alternation(HAIR_COLORS));
        let intensifier = r"(?:(?:very|quite|rather|unusually)[ \t]+)?";
        let mut rules = Vec::new();

        for (category, color, feature) in [
            (AttributeCategory::EyeColor, &eye, "eyes"),
            (AttributeCategory::HairColor, &hair, "hair"),
        ] {
            // Sarah's blue eyes
            rules.push(PatternRule::new(
                category,
                &format!(
                    r"\b(?P<name>{n2})(?:'s|’s)[ \t]+(?P<value>{c})[ \t]+{f}\b",
                    n2 = n2,
                    c = color,
                    f = feature
                ),
            ));
            // Sarah's eyes were blue
            rules.push(PatternRule::new(
                category,
                &format!(
                    r"\b(?P<name>{n2})(?:'s|’s)[ \t]+{f}[ \t]+(?:was|were|is|are)[ \t]+(?P<value>{c})\b",
                    n2 = n2,
                    c = color,
                    f = feature
                ),
            ));
            // Sarah had blue eyes
            rules.push(PatternRule::new(
                category,
                &format!(
                    r"\b(?P<name>{n2})[ \t]+(?:had|has)[ \t]+(?P<value>{c})[ \t]+{f}\b",
                    n2 = n2,
                    c = color,
                    f = feature
                ),
            ));
        }

        rules.push(PatternRule::new(
            AttributeCategory::Age,
            &format!(
                r"\b(?P<name>{n2}),?[ \t]+(?:was|is|turned)[ \t]+(?P<value>\d{{1,3}})[ \t]+years?[ \t]+(?:old|of[ \t]+age)\b",
                n2 = n2
            ),
        ));
        rules.push(PatternRule::new(
            AttributeCategory::Age,
            &format!(r"\b(?P<name>{n2}),[ \t]+(?:aged?)[ \t]+(?P<value>\d{{1,3}})\b", n2 = n2),
        ));
        rules.push(PatternRule::new(
            AttributeCategory::Age,
            &format!(r"\b(?P<value>\d{{1,3}})-year-old[ \t]+(?P<name>{n2})", n2 = n2),
        ));

        rules.push(PatternRule::new(
            AttributeCategory::Height,
            &format!(
                r"\b(?P<name>{n2})[ \t]+(?:was|is|stood)[ \t]+{i}(?P<value>tall|short|petite|towering|diminutive|lanky)\b",
                n2 = n2,
                i = intensifier
            ),
        ));
        rules.push(PatternRule::new(
            AttributeCategory::Height,
            &format!(
                r"\b(?P<name>{n2})[ \t]+(?:was|is|stood)[ \t]+(?P<value>\d{{1,3}}[ \t]*(?:feet|foot|ft|cm|meters|metres)(?:[ \t]+\d{{1,2}}[ \t]*(?:inches|inch))?)\b",
                n2 = n2
            ),
        ));

        rules.push(PatternRule::new(
            AttributeCategory::Build,
            &format!(
                r"\b(?P<name>{n2})[ \t]+(?:was|is|looked|seemed|appeared)[ \t]+{i}(?P<value>slender|slim|thin|skinny|muscular|stocky|heavyset|burly|lean|wiry|plump|frail|athletic|broad-shouldered|portly|gaunt)\b",
                n2 = n2,
                i = intensifier
            ),
        ));

        rules
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static pattern {:?}: {}", pattern, e))
}

// =============================================================================
// Name Validation
// =============================================================================

pub fn is_false_positive(word: &str) -> bool {
    let lower = word.to_lowercase();
    FALSE_POSITIVES.contains(&lower.as_str())
}

pub fn is_honorific(word: &str) -> bool {
    let word = word.trim_end_matches('.');
    HONORIFICS.iter().any(|h| h.eq_ignore_ascii_case(word))
}

/// Leading word that carries no name information ("Then", "The"); honorifics stay
fn is_peelable(word: &str) -> bool {
    is_false_positive(word) && !is_honorific(word)
}

/// Length in [2, 30], not purely numeric, not a lexicon word
pub fn is_valid_name(name: &str) -> bool {
    let len = name.chars().count();
    if !(2..=30).contains(&len) {
        return false;
    }
    if name.chars().filter(|c| !c.is_whitespace()).all(|c| c.is_ascii_digit()) {
        return false;
    }
    !is_false_positive(name)
}

/// Normalize, peel leading lexicon words off multi-word names ("Then Marcus"),
/// then validate. None means the candidate is silently discarded.
pub fn clean_name(raw: &str) -> Option<String> {
    let normalized = normalize_name(raw);
    let mut words: Vec<&str> = normalized.split(' ').collect();
    while words.len() > 1 && is_peelable(words[0]) {
        words.remove(0);
    }
    let name = words.join(" ");
    is_valid_name(&name).then_some(name)
}

/// Byte length of leading words `clean_name` would peel, so callers can shift offsets
pub fn peeled_prefix_len(raw: &str) -> usize {
    let trimmed = raw.trim_start();
    let mut consumed = raw.len() - trimmed.len();
    let mut rest = trimmed;
    loop {
        let Some(split) = rest.find(char::is_whitespace) else {
            return consumed;
        };
        let (word, tail) = rest.split_at(split);
        if !is_peelable(word) {
            return consumed;
        }
        let tail_trimmed = tail.trim_start();
        consumed += word.len() + (tail.len() - tail_trimmed.len());
        rest = tail_trimmed;
    }
}

// =============================================================================
// Heuristic Tables
// =============================================================================

/// Buckets a colour value falls into: exact entry, or its last word is an entry
pub fn color_buckets(value: &str) -> Vec<usize> {
    let lower = value.to_lowercase();
    let last = lower.rsplit([' ', '-']).next().unwrap_or("");
    COLOR_BUCKETS
        .iter()
        .enumerate()
        .filter(|(_, bucket)| bucket.iter().any(|&c| c == lower || c == last))
        .map(|(i, _)| i)
        .collect()
}

pub fn is_retrospective(marker: &str) -> bool {
    let lower = marker.to_lowercase();
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| RETROSPECTIVE_MARKERS.contains(&w))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_rules_compile() {
        let lib = PatternLibrary::global();
        assert_eq!(lib.names.len(), 8);
        assert_eq!(lib.aliases.len(), 3);
        assert_eq!(lib.relationships.len(), 6);
        assert_eq!(lib.deaths.len(), 3);
        assert!(lib.attributes.len() >= 10);
    }

    #[test]
    fn test_generic_rule_is_last() {
        let lib = PatternLibrary::global();
        let last = lib.names.last().unwrap();
        assert!(last.category.source.is_generic());
        assert!(lib.names[..lib.names.len() - 1]
            .iter()
            .all(|r| !r.category.source.is_generic()));
    }

    #[test]
    fn test_title_rule_captures_whole_phrase() {
        let lib = PatternLibrary::global();
        let rule = &lib.names[0];
        let hits: Vec<_> = rule.matches("Then Captain Reyes nodded.").collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].phrase(), "Captain Reyes");
        assert_eq!(hits[0].text_of("name"), Some("Reyes"));
    }

    #[test]
    fn test_place_rule() {
        let lib = PatternLibrary::global();
        let rule = &lib.names[4];
        let hits: Vec<_> = rule.matches("They reached the Black Castle at dusk.").collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text_of("name"), Some("Black Castle"));
    }

    #[test]
    fn test_object_of_rule() {
        let lib = PatternLibrary::global();
        let rule = &lib.names[6];
        let hits: Vec<_> = rule.matches("She lifted the sword of Elendil.").collect();
        assert_eq!(hits[0].text_of("name"), Some("sword of Elendil"));
    }

    #[test]
    fn test_together_rule() {
        let lib = PatternLibrary::global();
        let rule = &lib.relationships[3];
        let hit = rule
            .matches("Sarah and Marcus walked together through the garden.")
            .next()
            .unwrap();
        assert_eq!(hit.text_of("a"), Some("Sarah"));
        assert_eq!(hit.text_of("b"), Some("Marcus"));
    }

    #[test]
    fn test_eye_color_rule_with_modifier() {
        let lib = PatternLibrary::global();
        let hits: Vec<_> = lib
            .attributes
            .iter()
            .filter(|r| r.category == AttributeCategory::EyeColor)
            .flat_map(|r| r.matches("Lena's pale blue eyes narrowed.").collect::<Vec<_>>())
            .collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text_of("value"), Some("pale blue"));
    }

    #[test]
    fn test_clean_name() {
        assert_eq!(clean_name("Then Marcus"), Some("Marcus".to_string()));
        assert_eq!(clean_name("Sarah's"), Some("Sarah".to_string()));
        assert_eq!(clean_name("Later"), None);
        assert_eq!(clean_name("X"), None);
        assert_eq!(clean_name("1984"), None);
        assert_eq!(clean_name("Monday"), None);
        assert_eq!(clean_name("Captain Reyes"), Some("Captain Reyes".to_string()));
        assert_eq!(clean_name("Captain"), None);
    }

    #[test]
    fn test_peeled_prefix_len() {
        assert_eq!(peeled_prefix_len("Then Marcus"), 5);
        assert_eq!(peeled_prefix_len("Sarah Connor"), 0);
        assert_eq!(peeled_prefix_len("Marcus"), 0);
    }

    #[test]
    fn test_color_buckets() {
        assert_eq!(color_buckets("azure"), color_buckets("blue"));
        assert_eq!(color_buckets("pale blue"), color_buckets("sky blue"));
        assert!(color_buckets("silver").len() == 2);
        assert!(color_buckets("violet").is_empty());
    }

    #[test]
    fn test_retrospective_markers() {
        assert!(is_retrospective("Ten years earlier"));
        assert!(is_retrospective("FLASHBACK"));
        assert!(!is_retrospective("The next morning"));
    }
}
