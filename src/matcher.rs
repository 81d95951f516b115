//! Finds subtrees of one tree that are structurally identical to subtrees of another.
//!
//! The synthesizer uses the result to offer "copy this subtree from the input" for every output
//! subtree that already exists somewhere in the input.

use crate::tree::{NodeId, NodeRef, SyntaxTree};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// For every subtree of a target tree, the identical subtrees of a source tree.
#[derive(Debug, Default)]
pub struct Matching {
    matches: HashMap<NodeId, BTreeSet<NodeId>>,
    none: BTreeSet<NodeId>,
}

impl Matching {
    /// The source subtrees identical to `target`, possibly none.
    pub fn get(&self, target: NodeId) -> &BTreeSet<NodeId> {
        self.matches.get(&target).unwrap_or(&self.none)
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Number of target subtrees with at least one match.
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    // a match between two roots implies a match between every pair of aligned descendants
    fn record(&mut self, target: NodeRef<'_>, source: NodeRef<'_>) {
        if !self
            .matches
            .entry(target.id())
            .or_default()
            .insert(source.id())
        {
            return;
        }
        for (t, s) in target.children().zip(source.children()) {
            self.record(t, s);
        }
    }
}

/// Matches every subtree of `target` against the subtrees of `source`.
pub fn match_subtrees(target: &SyntaxTree, source: &SyntaxTree) -> Matching {
    let mut by_hash: HashMap<u64, Vec<NodeRef<'_>>> = HashMap::new();
    for s in source.root().subtrees() {
        by_hash.entry(s.hash()).or_default().push(s);
    }

    let mut matching = Matching::default();
    for t in target.root().subtrees() {
        let Some(candidates) = by_hash.get(&t.hash()) else {
            continue;
        };
        for s in candidates {
            if !matching.get(t.id()).contains(&s.id()) && t.identical_to(*s) {
                matching.record(t, *s);
            }
        }
    }
    debug!(
        matched = matching.len(),
        subtrees = target.len(),
        "matched target subtrees"
    );
    matching
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::testing::*;

    #[test]
    fn matches_descendants() {
        let source = tree(node(
            "block",
            vec![
                assign("x", tok("num", "1")),
                assign("y", tok("num", "1")),
            ],
        ));
        let target = tree(node(
            "block",
            vec![
                assign("y", tok("num", "1")),
                node("stmt", vec![tok("id", "z"), tok("semi", ";")]),
            ],
        ));
        let m = match_subtrees(&target, &source);

        // the whole `y = 1 ;` statement is found once
        let stmt = target.root().child(0).unwrap();
        let found: Vec<_> = m.get(stmt.id()).iter().collect();
        assert_eq!(found.len(), 1);
        assert_eq!(source.node(*found[0]).code(), "y = 1 ;");

        // `1` occurs in both source statements
        assert_eq!(m.get(leaf(&target, "1")).len(), 2);
        // `;` occurs in both source statements, for both target occurrences
        for semi in target.root().leaves().filter(|l| l.code() == ";") {
            assert_eq!(m.get(semi.id()).len(), 2);
        }
        // `z` is new
        assert!(m.get(leaf(&target, "z")).is_empty());
        assert!(m.get(target.root().id()).is_empty());
    }

    #[test]
    fn every_match_is_identical() {
        let source = tree(node(
            "block",
            vec![
                assign("a", tok("num", "1")),
                node("stmt", vec![tok("id", "a"), tok("semi", ";")]),
            ],
        ));
        let target = source.clone();
        let m = match_subtrees(&target, &source);
        for t in target.root().subtrees() {
            assert!(m.get(t.id()).contains(&t.id()));
            for s in m.get(t.id()) {
                assert!(t.identical_to(source.node(*s)));
            }
        }
    }
}
