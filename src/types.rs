//! Shared data model
//!
//! These shapes are the interface contract with UI highlighting, lore queries
//! and agent tools, so field names serialize in camelCase exactly as consumers
//! read them. Offsets are char indices into the text that produced them.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::text::name_key;

// =============================================================================
// External Inputs
// =============================================================================

/// Paragraph classification produced by the structural parser
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClassifiedParagraph {
    pub offset: usize,
    pub length: usize,
    #[serde(rename = "type")]
    pub paragraph_type: String,
    pub speaker_id: Option<String>,
    pub sentiment: f64,
    pub tension: f64,
    pub sentence_count: usize,
    pub avg_sentence_length: f64,
}

impl ClassifiedParagraph {
    /// Minimal paragraph covering `[offset, offset + length)`
    pub fn span(offset: usize, length: usize) -> Self {
        Self {
            offset,
            length,
            paragraph_type: "narration".to_string(),
            ..Default::default()
        }
    }
}

/// Dialogue line produced by the structural parser
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DialogueLine {
    pub id: String,
    pub quote: String,
    pub speaker: Option<String>,
    pub offset: usize,
    pub length: usize,
    pub reply_to: Option<String>,
    pub sentiment: f64,
}

/// One event from the timeline builder
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimelineEvent {
    pub offset: usize,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporal_marker: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeline {
    pub events: Vec<TimelineEvent>,
}

// =============================================================================
// Scanner Output
// =============================================================================

/// Kind of narrative entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Character,
    Location,
    Object,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Character => "character",
            EntityType::Location => "location",
            EntityType::Object => "object",
        }
    }
}

/// Which scanner rule produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    DialogueSpeaker,
    Title,
    DialogueAttribution,
    Location,
    Object,
    ProperNoun,
}

impl CandidateSource {
    /// Generic proper-noun hits yield to any rule-specific candidate covering them
    pub fn is_generic(&self) -> bool {
        matches!(self, CandidateSource::ProperNoun)
    }
}

/// A candidate mention found by the scanner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEntity {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub offset: usize,
    pub context: String,
    pub source: CandidateSource,
}

/// A pronoun resolved to an entity node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoReference {
    pub pronoun: String,
    pub offset: usize,
    pub resolved_to: String,
    pub confidence: f64,
}

// =============================================================================
// Entity Graph
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mention {
    pub offset: usize,
    pub chapter_id: String,
}

/// Canonical record for one character, location or object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub aliases: Vec<String>,
    pub first_mention: usize,
    pub mention_count: usize,
    pub mentions: Vec<Mention>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl EntityNode {
    /// New node with no mentions yet
    pub fn new(name: &str, entity_type: EntityType, first_mention: usize) -> Self {
        Self {
            id: new_id("ent"),
            name: name.to_string(),
            entity_type,
            aliases: Vec::new(),
            first_mention,
            mention_count: 0,
            mentions: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> String {
        name_key(&self.name)
    }

    /// Append a mention, keeping `mention_count` in step
    pub fn add_mention(&mut self, offset: usize, chapter_id: &str) {
        self.mentions.push(Mention {
            offset,
            chapter_id: chapter_id.to_string(),
        });
        self.mention_count = self.mentions.len();
        self.first_mention = self.first_mention.min(offset);
    }

    /// Register an alias unless it is the canonical name or already known.
    /// Returns true if the alias was new.
    pub fn add_alias(&mut self, alias: &str) -> bool {
        let key = name_key(alias);
        if key.is_empty() || key == self.key() {
            return false;
        }
        if self.aliases.iter().any(|a| name_key(a) == key) {
            return false;
        }
        self.aliases.push(crate::text::normalize_name(alias));
        true
    }

    /// Chapter of the mention at `offset`, when only one chapter has a mention there
    pub fn chapter_at(&self, offset: usize) -> Option<&str> {
        let mut chapters = self
            .mentions
            .iter()
            .filter(|m| m.offset == offset)
            .map(|m| m.chapter_id.as_str());
        let first = chapters.next()?;
        chapters.all(|c| c == first).then_some(first)
    }

    /// True once mentions from more than one chapter have been merged in
    pub fn spans_chapters(&self) -> bool {
        match self.mentions.first() {
            Some(first) => self.mentions.iter().any(|m| m.chapter_id != first.chapter_id),
            None => false,
        }
    }

    /// Canonical name or alias match, case-insensitive
    pub fn answers_to(&self, name: &str) -> bool {
        let key = name_key(name);
        self.key() == key || self.aliases.iter().any(|a| name_key(a) == key)
    }
}

/// Relationship kind; `Interacts` is the generic default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    Interacts,
    Opposes,
    AlliedWith,
    RelatedTo,
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::Interacts => "interacts",
            RelationshipType::Opposes => "opposes",
            RelationshipType::AlliedWith => "allied_with",
            RelationshipType::RelatedTo => "related_to",
        }
    }

    pub fn is_specific(&self) -> bool {
        !matches!(self, RelationshipType::Interacts)
    }

    /// Sentiment given to an edge when it first takes this type
    pub fn default_sentiment(&self) -> f64 {
        match self {
            RelationshipType::Interacts => 0.0,
            RelationshipType::Opposes => -0.5,
            RelationshipType::AlliedWith | RelationshipType::RelatedTo => 0.5,
        }
    }
}

/// Undirected relationship between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub relationship_type: RelationshipType,
    pub co_occurrences: u32,
    pub sentiment: f64,
    pub chapters: Vec<String>,
    pub evidence: Vec<String>,
}

impl EntityEdge {
    pub fn new(source: &str, target: &str, relationship_type: RelationshipType) -> Self {
        Self {
            id: new_id("edge"),
            source: source.to_string(),
            target: target.to_string(),
            relationship_type,
            co_occurrences: 0,
            sentiment: relationship_type.default_sentiment(),
            chapters: Vec::new(),
            evidence: Vec::new(),
        }
    }

    /// Dedup key: both endpoint ids in canonical order
    pub fn pair_key(a: &str, b: &str) -> (String, String) {
        if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        }
    }

    pub fn key(&self) -> (String, String) {
        Self::pair_key(&self.source, &self.target)
    }

    pub fn add_chapter(&mut self, chapter_id: &str) {
        if !self.chapters.iter().any(|c| c == chapter_id) {
            self.chapters.push(chapter_id.to_string());
        }
    }

    /// Generic -> specific only. A specific type is never replaced.
    /// Returns true when the type changed.
    pub fn upgrade_type(&mut self, to: RelationshipType) -> bool {
        if self.relationship_type.is_specific() || !to.is_specific() {
            return false;
        }
        self.relationship_type = to;
        self.sentiment = to.default_sentiment();
        true
    }

    pub fn connects(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// Nodes + edges for one chapter or a merged manuscript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityGraph {
    pub nodes: Vec<EntityNode>,
    pub edges: Vec<EntityEdge>,
    /// Epoch milliseconds
    pub processed_at: i64,
}

impl EntityGraph {
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    pub fn new(nodes: Vec<EntityNode>, edges: Vec<EntityEdge>) -> Self {
        Self {
            nodes,
            edges,
            processed_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn node(&self, id: &str) -> Option<&EntityNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Look up by canonical name first, then by alias
    pub fn find_node(&self, name: &str) -> Option<&EntityNode> {
        let key = name_key(name);
        if key.is_empty() {
            return None;
        }
        self.nodes
            .iter()
            .find(|n| n.key() == key)
            .or_else(|| self.nodes.iter().find(|n| n.answers_to(name)))
    }

    pub fn edges_for<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a EntityEdge> + 'a {
        self.edges.iter().filter(move |e| e.connects(node_id))
    }

    /// Nodes sharing an edge with `node_id`, in edge order
    pub fn neighbors(&self, node_id: &str) -> Vec<&EntityNode> {
        self.edges_for(node_id)
            .filter_map(move |e| {
                let other = if e.source == node_id { &e.target } else { &e.source };
                self.node(other)
            })
            .collect()
    }

    /// Checks every structural invariant a returned graph must satisfy
    pub fn is_consistent(&self) -> bool {
        let mut ids = HashSet::new();
        let mut keys = HashSet::new();
        for node in &self.nodes {
            if !ids.insert(node.id.as_str()) || !keys.insert(node.key()) {
                return false;
            }
            if node.mention_count != node.mentions.len() {
                return false;
            }
        }
        let mut pairs = HashSet::new();
        self.edges.iter().all(|e| {
            e.source != e.target
                && ids.contains(e.source.as_str())
                && ids.contains(e.target.as_str())
                && pairs.insert(e.key())
        })
    }
}

// =============================================================================
// Contradictions
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContradictionType {
    Attribute,
    Timeline,
    Location,
    Relationship,
    Existence,
}

impl ContradictionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContradictionType::Attribute => "attribute",
            ContradictionType::Timeline => "timeline",
            ContradictionType::Location => "location",
            ContradictionType::Relationship => "relationship",
            ContradictionType::Existence => "existence",
        }
    }
}

/// One side of a contradiction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub text: String,
    pub offset: usize,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contradiction {
    pub id: String,
    #[serde(rename = "type")]
    pub contradiction_type: ContradictionType,
    pub entity_id: String,
    pub entity_name: String,
    pub claim1: Claim,
    pub claim2: Claim,
    pub severity: f64,
    pub suggestion: String,
}

/// Opaque, collision-resistant id. Never used for ordering.
pub fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}
