//! Alias Resolver - links alternate surface names to canonical nodes
//!
//! Handles "X, known as Y", "Y, whose real name was X" and the appositive
//! "X, the old wizard". When one side names an existing node, the other
//! side becomes an alias of that node.

use tracing::debug;

use crate::extraction::patterns::{clean_name, PatternLibrary};
use crate::text::{name_key, normalize_name};
use crate::types::EntityNode;

fn valid_alias(raw: &str) -> Option<String> {
    let alias = normalize_name(raw);
    (2..=30).contains(&alias.chars().count()).then_some(alias)
}

fn position_by_name(nodes: &[EntityNode], name: &str) -> Option<usize> {
    let key = name_key(name);
    nodes.iter().position(|n| n.key() == key)
}

/// Mutates `nodes` in place. Returns the number of aliases added.
pub fn resolve_aliases(text: &str, nodes: &mut [EntityNode]) -> usize {
    if nodes.is_empty() {
        return 0;
    }
    let lib = PatternLibrary::global();
    let mut added = 0;

    for rule in &lib.aliases {
        for hit in rule.matches(text) {
            let (Some(name), Some(other)) = (hit.text_of("name"), hit.text_of("other")) else {
                continue;
            };
            let (Some(name), Some(other)) = (clean_name(name), valid_alias(other)) else {
                continue;
            };

            let linked = if let Some(i) = position_by_name(nodes, &name) {
                nodes[i].add_alias(&other)
            } else if let Some(i) = position_by_name(nodes, &other) {
                nodes[i].add_alias(&name)
            } else {
                false
            };
            if linked {
                added += 1;
            }
        }
    }

    debug!(aliases = added, "alias resolution complete");
    added
}
