//! LoreCortex: Narrative Entity Graph + Contradiction Engine
//!
//! A Rust/WASM implementation of the KittClouds manuscript consistency checker.
//! Deterministic rule-based extraction, no model inference.
//!
//! # Architecture
//!
//! ## Extraction (per chapter)
//! - `extraction/patterns.rs` - Pattern Library: typed rule tables + lexicons
//! - `extraction/scanner.rs` - EntityScanner: candidate mentions with offsets
//! - `extraction/consolidate.rs` - candidates -> canonical entity nodes
//! - `extraction/alias.rs` - "X, known as Y" alias linking
//! - `extraction/coreference.rs` - pronoun -> character resolution
//! - `extraction/relationship.rs` - co-occurrence + explicit verb-pattern edges
//! - `extraction/merge.rs` - per-chapter graphs -> manuscript graph
//!
//! ## Contradiction Engine
//! - `contradiction/attribute.rs` - conflicting eye/hair colour, age, height, build
//! - `contradiction/timeline.rs` - characters acting after their death
//!
//! ## Shared
//! - `types.rs` - graph, contradiction and input shapes (camelCase on the wire)
//! - `text.rs` - char offsets and name normalization
//! - `config.rs` / `error.rs`
//! - `cortex.rs` - LoreCortex WASM facade
//!
//! # Usage (WASM)
//! ```javascript,ignore
//! import init, { LoreCortex } from 'lorecortex';
//!
//! await init();
//! const cortex = new LoreCortex();
//!
//! const { graph } = cortex.extractEntities(text, paragraphs, dialogues, 'ch-1');
//! const merged = cortex.mergeGraphs([graph, otherGraph]);
//! const issues = cortex.detectContradictions(text, graph, timeline);
//! ```
//!
//! # Usage (Rust)
//! ```
//! use lorecortex::{detect_contradictions, extract_entities, Timeline};
//!
//! let text = "Marcus died in the battle. Marcus smiled and walked to the door.";
//! let graph = extract_entities(text, &[], &[], "c1").unwrap();
//! let issues = detect_contradictions(text, &graph, &Timeline::default());
//! assert_eq!(issues.len(), 1);
//! ```

pub mod config;
pub mod contradiction;
pub mod cortex;
pub mod error;
pub mod extraction;
pub mod text;
pub mod types;

pub use config::LoreConfig;
pub use contradiction::{
    detect_attribute_contradictions, detect_contradictions, detect_contradictions_with,
    detect_timeline_contradictions,
};
pub use cortex::LoreCortex;
pub use error::{LoreError, LoreResult};
pub use extraction::{
    consolidate, extract_detailed, extract_entities, extract_entities_with, infer_relationships,
    merge_graphs, merge_graphs_with, resolve_aliases, resolve_pronouns, EntityScanner, Extraction,
};
pub use types::*;

use wasm_bindgen::prelude::*;

// When the `wee_alloc` feature is enabled, use `wee_alloc` as the global
// allocator for smaller WASM bundle size.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get version information
#[wasm_bindgen]
pub fn version() -> String {
    format!("lorecortex v{}", env!("CARGO_PKG_VERSION"))
}
