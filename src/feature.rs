//! Local features of a node, used to tell apart candidates that share a label.

use crate::tree::{Label, NodeRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// How far up [`Feature::SubKindOf`] looks.
const SUPER_KINDS: usize = 3;

#[derive(Debug, PartialEq, Eq, Clone, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Feature {
    /// One of the nearest ancestors has this label.
    SubKindOf(Label),
    /// A node on the single-child chain below has this label.
    SuperKindOf(Label),
    /// Some sibling subtree contains a leaf with this label and code.
    SiblingLeaf(Label, String),
    /// Some sibling subtree contains a copy of the error leaf.
    SiblingErrToken,
    /// The node's own subtree contains a copy of the error leaf.
    ContainsErrToken,
}

use Feature::*;

impl Feature {
    pub fn holds(&self, node: NodeRef<'_>, err: NodeRef<'_>) -> bool {
        match self {
            SubKindOf(label) => node.ancestors().take(SUPER_KINDS).any(|a| a.label() == label),
            SuperKindOf(label) => single_child_chain(node).any(|n| n.label() == label),
            SiblingLeaf(label, code) => {
                sibling_leaves(node).any(|l| l.label() == label && l.code() == code)
            }
            SiblingErrToken => sibling_leaves(node).any(|l| is_err_token(l, err)),
            ContainsErrToken => node.leaves().any(|l| is_err_token(l, err)),
        }
    }
}

/// All features of `node`, relative to the error leaf `err`.
pub fn features(node: NodeRef<'_>, err: NodeRef<'_>) -> BTreeSet<Feature> {
    let mut set: BTreeSet<Feature> = node
        .ancestors()
        .take(SUPER_KINDS)
        .map(|a| SubKindOf(a.label().clone()))
        .collect();
    set.extend(single_child_chain(node).map(|n| SuperKindOf(n.label().clone())));
    for l in sibling_leaves(node) {
        if is_err_token(l, err) {
            set.insert(SiblingErrToken);
        }
        set.insert(SiblingLeaf(l.label().clone(), l.code().to_string()));
    }
    if node.leaves().any(|l| is_err_token(l, err)) {
        set.insert(ContainsErrToken);
    }
    set
}

// a leaf with the same label and code as the error leaf, other than the error leaf itself
fn is_err_token(leaf: NodeRef<'_>, err: NodeRef<'_>) -> bool {
    leaf != err && leaf.label() == err.label() && leaf.code() == err.code()
}

fn single_child_chain<'a>(node: NodeRef<'a>) -> impl Iterator<Item = NodeRef<'a>> {
    std::iter::successors(Some(node), |n| {
        if n.child_count() == 1 {
            n.child(0)
        } else {
            None
        }
    })
    .skip(1)
}

// leaves of the siblings at the first ancestor that has more than one child
fn sibling_leaves<'a>(node: NodeRef<'a>) -> impl Iterator<Item = NodeRef<'a>> {
    let mut cur = node;
    let mut scope = None;
    while let Some(p) = cur.parent() {
        if p.child_count() > 1 {
            scope = Some((p, cur));
            break;
        }
        cur = p;
    }
    scope.into_iter().flat_map(|(p, on_path)| {
        p.children()
            .filter(move |c| *c != on_path)
            .flat_map(|c| c.leaves())
    })
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubKindOf(label) => write!(f, "<: {}", label),
            SuperKindOf(label) => write!(f, ">: {}", label),
            SiblingLeaf(label, code) => write!(f, "~{}({:?})", label, code),
            SiblingErrToken => write!(f, "~err"),
            ContainsErrToken => write!(f, "@err"),
        }
    }
}
