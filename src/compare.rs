//! Classification of the single edit that turns one tree into another.
//!
//! The comparer walks both trees top-down. Identical subtrees (by [`NodeRef::identical_to`]) are
//! skipped; a node whose children differ in exactly one place delegates to that child; a node that
//! gained or lost exactly one child is explained as an insertion or deletion when every other
//! child lines up. Everything else is reported as an update of the smallest enclosing node. In
//! particular, two or more differing children collapse to an update of their parent: this
//! comparer never decomposes an example into several edits.

use crate::tree::{NodeId, NodeRef, SyntaxTree};
use std::fmt;
use tracing::debug;

/// The edit relating an old tree to a new tree.
///
/// Ids refer to the old tree unless noted otherwise.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Diff {
    Identical,
    /// `node` (new tree) was inserted as the `index`-th child of `parent`.
    Insert {
        parent: NodeId,
        index: usize,
        node: NodeId,
    },
    /// `node` was removed; `new_parent` is its parent's counterpart in the new tree.
    Delete { node: NodeId, new_parent: NodeId },
    /// The subtree at `old` was replaced by the subtree at `new` (new tree).
    Update { old: NodeId, new: NodeId },
}

use Diff::*;

/// Classifies the edit between `old` and `new`.
pub fn classify(old: NodeRef<'_>, new: NodeRef<'_>) -> Diff {
    let diff = compare(old, new);
    debug!(%diff, "classified edit");
    diff
}

fn compare(old: NodeRef<'_>, new: NodeRef<'_>) -> Diff {
    if old.identical_to(new) {
        return Identical;
    }
    let update = Update {
        old: old.id(),
        new: new.id(),
    };
    if old.kind() != new.kind() || old.label() != new.label() || old.is_leaf() {
        return update;
    }

    let old_children: Vec<_> = old.children().collect();
    let new_children: Vec<_> = new.children().collect();
    let (m, n) = (old_children.len(), new_children.len());

    if m == n {
        let mut differing = old_children
            .iter()
            .zip(&new_children)
            .filter(|(a, b)| !a.identical_to(**b));
        return match (differing.next(), differing.next()) {
            (Some((a, b)), None) => compare(*a, *b),
            (None, _) => Identical,
            _ => update,
        };
    }

    if m == n + 1 {
        for i in by_similarity(&old_children, &new_children) {
            if aligned(&without(&old_children, i), &new_children) {
                return Delete {
                    node: old_children[i].id(),
                    new_parent: new.id(),
                };
            }
        }
    } else if n == m + 1 {
        for j in by_similarity(&new_children, &old_children) {
            if aligned(&old_children, &without(&new_children, j)) {
                return Insert {
                    parent: old.id(),
                    index: j,
                    node: new_children[j].id(),
                };
            }
        }
    }
    update
}

fn without<'a>(nodes: &[NodeRef<'a>], i: usize) -> Vec<NodeRef<'a>> {
    nodes
        .iter()
        .enumerate()
        .filter(|&(k, _)| k != i)
        .map(|(_, n)| *n)
        .collect()
}

fn aligned(xs: &[NodeRef<'_>], ys: &[NodeRef<'_>]) -> bool {
    xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| x.identical_to(*y))
}

fn similarity(x: NodeRef<'_>, y: NodeRef<'_>) -> f64 {
    let mut score = 0.0;
    if x.code() == y.code() {
        score += 0.5;
    }
    if x.label() == y.label() {
        score += 0.5;
    }
    score
}

// candidate positions to drop from `longer`, most similar alignment first, ties by position
fn by_similarity(longer: &[NodeRef<'_>], shorter: &[NodeRef<'_>]) -> Vec<usize> {
    let mut scored: Vec<(usize, f64)> = (0..longer.len())
        .map(|i| {
            let rest = without(longer, i);
            let score = rest.iter().zip(shorter).map(|(x, y)| similarity(*x, *y)).sum();
            (i, score)
        })
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.into_iter().map(|(i, _)| i).collect()
}

impl Diff {
    /// Whether two diffs are the same kind of edit.
    pub fn same_kind(&self, other: &Diff) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Applies this edit to `old`, taking inserted and replacement subtrees from `new`.
    pub fn apply(&self, old: &SyntaxTree, new: &SyntaxTree) -> Option<SyntaxTree> {
        match *self {
            Identical => Some(old.clone()),
            Insert {
                parent,
                index,
                node,
            } => old.insert(parent, index, &new.get(node)?.to_partial()),
            Delete { node, .. } => old.delete(node),
            Update { old: o, new: n } => old.replace(o, &new.get(n)?.to_partial()),
        }
    }
}

impl fmt::Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identical => write!(f, "Identical"),
            Insert {
                parent,
                index,
                node,
            } => write!(f, "Insert(#{}, {}, #{})", parent.0, index, node.0),
            Delete { node, .. } => write!(f, "Delete(#{})", node.0),
            Update { old, new } => write!(f, "Update(#{}, #{})", old.0, new.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::testing::*;
    use crate::tree::PartialNode;

    fn call(args: Vec<PartialNode>) -> PartialNode {
        node(
            "stmt",
            vec![
                node(
                    "call",
                    vec![
                        tok("id", "f"),
                        tok("lpar", "("),
                        node("args", args),
                        tok("rpar", ")"),
                    ],
                ),
                tok("semi", ";"),
            ],
        )
    }

    fn assert_sound(old: &SyntaxTree, new: &SyntaxTree) -> Diff {
        let diff = classify(old.root(), new.root());
        let applied = diff.apply(old, new).unwrap();
        assert!(applied.identical_to(new), "{} on\n{}gave\n{}", diff, old, applied);
        diff
    }

    #[test]
    fn identical() {
        let t = tree(node("block", vec![assign("x", tok("num", "1")), call(vec![])]));
        assert_eq!(classify(t.root(), t.root()), Identical);
        let copy = t.clone();
        assert_eq!(classify(t.root(), copy.root()), Identical);
    }

    #[test]
    fn leaf_update() {
        let old = tree(assign("x", tok("num", "1")));
        let new = tree(assign("x", tok("num", "2")));
        let diff = assert_sound(&old, &new);
        assert_eq!(
            diff,
            Update {
                old: leaf(&old, "1"),
                new: leaf(&new, "2")
            }
        );
    }

    #[test]
    fn label_change_is_update() {
        let old = tree(node("block", vec![assign("x", tok("num", "1"))]));
        let new = tree(node("block", vec![assign("x", tok("str", "1"))]));
        assert!(matches!(assert_sound(&old, &new), Update { .. }));
    }

    #[test]
    fn missing_semicolon() {
        let old = tree(node(
            "block",
            vec![
                node("stmt", vec![tok("id", "x"), tok("eq", "="), tok("num", "1")]),
                assign("y", tok("num", "2")),
            ],
        ));
        let new = tree(node(
            "block",
            vec![assign("x", tok("num", "1")), assign("y", tok("num", "2"))],
        ));
        let diff = assert_sound(&old, &new);
        assert_eq!(
            diff,
            Insert {
                parent: find(&old, "stmt"),
                index: 3,
                node: leaf(&new, ";"),
            }
        );
    }

    #[test]
    fn deleted_argument() {
        let old = tree(call(vec![tok("num", "1"), tok("comma", ","), tok("num", "2")]));
        let new = tree(call(vec![tok("num", "1"), tok("comma", ",")]));
        let diff = assert_sound(&old, &new);
        assert_eq!(
            diff,
            Delete {
                node: leaf(&old, "2"),
                new_parent: find(&new, "args"),
            }
        );
    }

    #[test]
    fn insertion_prefers_similar_alignment() {
        // inserting a duplicate: both positions are sound, the first one wins
        let old = tree(node("args", vec![tok("num", "1"), tok("num", "2")]));
        let new = tree(node(
            "args",
            vec![tok("num", "1"), tok("num", "1"), tok("num", "2")],
        ));
        assert!(matches!(assert_sound(&old, &new), Insert { index: 0, .. }));
    }

    #[test]
    fn two_differences_collapse() {
        let block = |a: &str, b: &str| {
            node(
                "block",
                vec![assign("x", tok("num", a)), assign("y", tok("num", b))],
            )
        };
        let old = tree(block("1", "2"));
        let new = tree(block("3", "4"));
        let diff = assert_sound(&old, &new);
        assert_eq!(diff, Update { old: old.root().id(), new: new.root().id() });
    }

    #[test]
    fn count_mismatch_collapses() {
        let old = tree(call(vec![tok("num", "1")]));
        let new = tree(call(vec![tok("num", "1"), tok("comma", ","), tok("num", "2")]));
        let diff = assert_sound(&old, &new);
        assert_eq!(
            diff,
            Update {
                old: find(&old, "args"),
                new: find(&new, "args")
            }
        );

        // one extra child, but the rest do not line up either
        let old = tree(call(vec![tok("num", "1"), tok("num", "2")]));
        let new = tree(call(vec![tok("num", "3")]));
        assert!(matches!(assert_sound(&old, &new), Update { .. }));
    }

    #[test]
    fn edit_kinds() {
        let old = tree(node("stmt", vec![tok("id", "x")]));
        let new = tree(node("stmt", vec![tok("id", "x"), tok("semi", ";")]));
        let diff = classify(old.root(), new.root());
        assert!(matches!(diff, Insert { .. }));
        let other = Insert {
            parent: NodeId(9),
            index: 9,
            node: NodeId(9),
        };
        assert!(diff.same_kind(&other));
        let back = classify(new.root(), old.root());
        assert!(matches!(back, Delete { .. }));
        assert!(!diff.same_kind(&back));
    }
}
