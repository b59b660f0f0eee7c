//! Configuration types and defaults for LoreCortex
//!
//! Only the window sizes and bounds are tunable. The heuristic tables
//! (gender endings, colour buckets, lexicons) are fixed in `extraction::patterns`.

use serde::{Deserialize, Serialize};

use crate::error::{LoreError, LoreResult};

// =============================================================================
// Main Configuration
// =============================================================================

/// LoreCortex configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoreConfig {
    /// Reject chapter text longer than this (in chars). Default: 2_000_000
    pub max_input_chars: usize,
    /// Evidence entries kept per edge after a merge. Default: 10
    pub evidence_limit: usize,
    /// Length of the paragraph snippet stored as co-occurrence evidence. Default: 100
    pub evidence_snippet_chars: usize,
    /// Half-width of the pronoun-counting window used for gender fallback. Default: 150
    pub gender_window_chars: usize,
    /// How many of a character's first mentions feed the gender fallback. Default: 5
    pub gender_sample_mentions: usize,
    /// Look-ahead after a post-death mention when searching for action verbs. Default: 100
    pub timeline_context_chars: usize,
    /// Half-width of context snippets on candidates and claims. Default: 40
    pub context_chars: usize,
}

impl Default for LoreConfig {
    fn default() -> Self {
        Self {
            max_input_chars: 2_000_000,
            evidence_limit: 10,
            evidence_snippet_chars: 100,
            gender_window_chars: 150,
            gender_sample_mentions: 5,
            timeline_context_chars: 100,
            context_chars: 40,
        }
    }
}

impl LoreConfig {
    /// Parse a (possibly partial) JSON config; missing fields take defaults.
    pub fn from_json(json: &str) -> LoreResult<Self> {
        let config: LoreConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> LoreResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn validate(&self) -> LoreResult<()> {
        if self.max_input_chars == 0 {
            return Err(LoreError::InvalidConfig("maxInputChars must be > 0".to_string()));
        }
        if self.evidence_limit == 0 {
            return Err(LoreError::InvalidConfig("evidenceLimit must be > 0".to_string()));
        }
        if self.gender_sample_mentions == 0 {
            return Err(LoreError::InvalidConfig(
                "genderSampleMentions must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
