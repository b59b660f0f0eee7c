//! LoreCortex: WASM entry point for entity extraction and consistency checks
//!
//! One cross-boundary call per operation. JS values come in through
//! `serde-wasm-bindgen` and go back out as plain objects (maps become objects,
//! not `Map`s, so `attributes` reads like the rest of the graph).

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::config::LoreConfig;
use crate::contradiction::detect_contradictions_with;
use crate::error::{LoreError, LoreResult};
use crate::extraction::{extract_detailed, merge_graphs_with, EntityScanner, Extraction};
use crate::types::{
    ClassifiedParagraph, Contradiction, DialogueLine, EntityGraph, RawEntity, Timeline,
};

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| {
            web_sys::console::error_1(&format!("[LoreCortex] Serialization failed: {:?}", e).into());
            JsValue::from_str(&format!("Serialization error: {}", e))
        })
}

fn from_js<T: serde::de::DeserializeOwned + Default>(value: JsValue, what: &str) -> Result<T, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(T::default());
    }
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| JsValue::from_str(&format!("Failed to parse {}: {}", what, e)))
}

impl From<LoreError> for JsValue {
    fn from(e: LoreError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}

// =============================================================================
// LoreCortex
// =============================================================================

#[wasm_bindgen]
pub struct LoreCortex {
    config: LoreConfig,
}

impl Default for LoreCortex {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl LoreCortex {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            config: LoreConfig::default(),
        }
    }

    /// Replace the configuration; missing fields take defaults (JS binding)
    #[wasm_bindgen(js_name = setConfig)]
    pub fn js_set_config(&mut self, config: JsValue) -> Result<(), JsValue> {
        let config: LoreConfig = from_js(config, "config")?;
        self.set_config(config).map_err(JsValue::from)
    }

    #[wasm_bindgen(js_name = getConfig)]
    pub fn js_get_config(&self) -> Result<JsValue, JsValue> {
        to_js(&self.config)
    }

    /// Raw candidate mentions, before consolidation (JS binding)
    #[wasm_bindgen(js_name = scanCandidates)]
    pub fn js_scan_candidates(&self, text: &str, dialogues: JsValue) -> Result<JsValue, JsValue> {
        let dialogues: Vec<DialogueLine> = from_js(dialogues, "dialogues")?;
        to_js(&self.scan_candidates(text, &dialogues))
    }

    /// Build one chapter's entity graph (JS binding)
    ///
    /// Returns `{ graph, coreferences, stats }`.
    #[wasm_bindgen(js_name = extractEntities)]
    pub fn js_extract_entities(
        &self,
        text: &str,
        paragraphs: JsValue,
        dialogues: JsValue,
        chapter_id: &str,
    ) -> Result<JsValue, JsValue> {
        let paragraphs: Vec<ClassifiedParagraph> = from_js(paragraphs, "paragraphs")?;
        let dialogues: Vec<DialogueLine> = from_js(dialogues, "dialogues")?;
        let extraction = self.extract(text, &paragraphs, &dialogues, chapter_id)?;
        to_js(&extraction)
    }

    /// Merge per-chapter graphs, in the order given (JS binding)
    #[wasm_bindgen(js_name = mergeGraphs)]
    pub fn js_merge_graphs(&self, graphs: JsValue) -> Result<JsValue, JsValue> {
        let graphs: Vec<EntityGraph> = from_js(graphs, "graphs")?;
        to_js(&self.merge(&graphs))
    }

    /// Attribute and timeline contradictions, most severe first (JS binding)
    #[wasm_bindgen(js_name = detectContradictions)]
    pub fn js_detect_contradictions(
        &self,
        text: &str,
        graph: JsValue,
        timeline: JsValue,
    ) -> Result<JsValue, JsValue> {
        let graph: EntityGraph = if graph.is_undefined() || graph.is_null() {
            EntityGraph::empty()
        } else {
            serde_wasm_bindgen::from_value(graph)
                .map_err(|e| JsValue::from_str(&format!("Failed to parse graph: {}", e)))?
        };
        let timeline: Timeline = from_js(timeline, "timeline")?;
        to_js(&self.detect_contradictions(text, &graph, &timeline))
    }
}

impl LoreCortex {
    pub fn with_config(config: LoreConfig) -> LoreResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LoreConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: LoreConfig) -> LoreResult<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn scan_candidates(&self, text: &str, dialogues: &[DialogueLine]) -> Vec<RawEntity> {
        EntityScanner::new(&self.config).scan_with_dialogue(text, dialogues)
    }

    pub fn extract(
        &self,
        text: &str,
        paragraphs: &[ClassifiedParagraph],
        dialogues: &[DialogueLine],
        chapter_id: &str,
    ) -> LoreResult<Extraction> {
        extract_detailed(text, paragraphs, dialogues, chapter_id, &self.config)
    }

    pub fn merge(&self, graphs: &[EntityGraph]) -> EntityGraph {
        merge_graphs_with(graphs, &self.config)
    }

    pub fn detect_contradictions(
        &self,
        text: &str,
        graph: &EntityGraph,
        timeline: &Timeline,
    ) -> Vec<Contradiction> {
        detect_contradictions_with(text, graph, timeline, &self.config)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_then_detect() {
        let cortex = LoreCortex::new();
        let text = "Marcus died in the battle. Marcus smiled and walked to the door.";
        let extraction = cortex.extract(text, &[], &[], "c1").unwrap();
        let found = cortex.detect_contradictions(text, &extraction.graph, &Timeline::default());
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_set_config_validates() {
        let mut cortex = LoreCortex::new();
        let bad = LoreConfig {
            evidence_limit: 0,
            ..LoreConfig::default()
        };
        assert!(cortex.set_config(bad).is_err());
        assert_eq!(cortex.config().evidence_limit, 10);

        let small = LoreConfig {
            max_input_chars: 5,
            ..LoreConfig::default()
        };
        let cortex = LoreCortex::with_config(small).unwrap();
        assert!(matches!(
            cortex.extract("Sarah smiled.", &[], &[], "c1"),
            Err(LoreError::InputTooLarge { .. })
        ));
    }

    #[test]
    fn test_scan_candidates() {
        let cortex = LoreCortex::default();
        let raw = cortex.scan_candidates("Sarah met Marcus.", &[]);
        assert_eq!(raw.len(), 2);
    }
}
