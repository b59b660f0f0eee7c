//! Entity Consolidator - raw candidates -> canonical nodes
//!
//! Candidates are grouped by case-folded normalized name. The first
//! occurrence names the node; every occurrence (the first included) is a
//! mention. Node type is a vote over the group, ties going to the type seen first.

use std::collections::HashMap;

use crate::text::name_key;
use crate::types::{EntityNode, EntityType, RawEntity};

/// Per-call accumulator for one group of candidates
struct Group {
    node: EntityNode,
    votes: Vec<(EntityType, usize)>,
}

impl Group {
    fn vote(&mut self, ty: EntityType) {
        match self.votes.iter_mut().find(|(t, _)| *t == ty) {
            Some((_, n)) => *n += 1,
            None => self.votes.push((ty, 1)),
        }
    }

    /// Highest count wins; `max_by_key` keeps the last maximum, so iterate reversed
    fn winner(&self) -> EntityType {
        self.votes
            .iter()
            .rev()
            .max_by_key(|(_, n)| *n)
            .map(|(t, _)| *t)
            .unwrap_or(self.node.entity_type)
    }
}

pub fn consolidate(raw: &[RawEntity], chapter_id: &str) -> Vec<EntityNode> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for candidate in raw {
        let key = name_key(&candidate.name);
        if key.is_empty() {
            continue;
        }
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(Group {
                node: EntityNode::new(&candidate.name, candidate.entity_type, candidate.offset),
                votes: Vec::new(),
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];
        group.node.add_mention(candidate.offset, chapter_id);
        group.vote(candidate.entity_type);
    }

    let mut nodes: Vec<EntityNode> = groups
        .into_iter()
        .map(|g| {
            let ty = g.winner();
            let mut node = g.node;
            node.entity_type = ty;
            node
        })
        .collect();

    // stable: ties keep discovery order
    nodes.sort_by(|a, b| b.mention_count.cmp(&a.mention_count));
    nodes
}
