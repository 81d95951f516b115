//! Arena-allocated concrete syntax trees.
//!
//! A [`SyntaxTree`] owns all of its nodes in a single vector. Nodes refer to each other by
//! [`NodeId`]; the parent link is a plain index, so walking up the tree is constant time per step
//! and the tree contains no reference cycles. Nodes are read through the lightweight [`NodeRef`]
//! handle.
//!
//! Trees are immutable once built. They are built in two phases: a [`PartialNode`] describes the
//! shape (labels, codes and children) without identities, and [`SyntaxTree::instantiate`] assigns
//! ids in preorder and fixes depths top-down. Edits produce a fresh tree the same way.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A grammar label: a small integer identifying the syntactic category plus a display name.
///
/// Labels compare, hash and order by `id` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub id: u32,
    pub name: String,
}

impl Label {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Label {}

impl Hash for Label {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Label {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Label {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum SyntaxKind {
    /// A leaf carrying source text.
    Token,
    /// An internal node with ordered children.
    Node,
    /// A leaf the parser inserted to recover from a syntax error.
    Error,
}

/// Index of a node inside its tree. Ids are allocated in preorder, so the root is always 0.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// A source position, as reported by the parser and the compiler.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pos {
    pub line: usize,
    pub column: usize,
}

impl Pos {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A tree node without identity or depth.
///
/// Internal nodes derive their code from their leaves, joined by single spaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialNode {
    pub kind: SyntaxKind,
    pub label: Label,
    pub code: String,
    pub pos: Option<Pos>,
    pub children: Vec<PartialNode>,
}

impl PartialNode {
    pub fn token(label: Label, code: impl Into<String>) -> Self {
        Self {
            kind: SyntaxKind::Token,
            label,
            code: code.into(),
            pos: None,
            children: Vec::new(),
        }
    }

    pub fn error(label: Label, code: impl Into<String>) -> Self {
        Self {
            kind: SyntaxKind::Error,
            ..Self::token(label, code)
        }
    }

    pub fn node(label: Label, children: Vec<PartialNode>) -> Self {
        Self {
            kind: SyntaxKind::Node,
            label,
            code: join_code(children.iter().map(|c| c.code.as_str())),
            pos: None,
            children,
        }
    }

    /// Attaches a source position.
    pub fn at(mut self, pos: Pos) -> Self {
        self.pos = Some(pos);
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.kind != SyntaxKind::Node
    }

    pub fn structural_hash(&self) -> u64 {
        if self.is_leaf() {
            leaf_hash(&self.label, &self.code)
        } else {
            node_hash(&self.label, self.children.iter().map(|c| c.structural_hash()))
        }
    }
}

fn join_code<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn leaf_hash(label: &Label, code: &str) -> u64 {
    let mut h = DefaultHasher::new();
    0u8.hash(&mut h);
    label.id.hash(&mut h);
    code.hash(&mut h);
    h.finish()
}

fn node_hash(label: &Label, children: impl Iterator<Item = u64>) -> u64 {
    let mut h = DefaultHasher::new();
    1u8.hash(&mut h);
    label.id.hash(&mut h);
    for c in children {
        c.hash(&mut h);
    }
    h.finish()
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: SyntaxKind,
    label: Label,
    code: String,
    pos: Option<Pos>,
    depth: usize,
    hash: u64,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A concrete syntax tree together with the designated error leaf, if any.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    nodes: Vec<NodeData>,
    err: Option<NodeId>,
}

enum Edit<'e> {
    Replace(NodeId, &'e PartialNode),
    Remove(NodeId),
    Splice(NodeId, usize, &'e PartialNode),
}

impl SyntaxTree {
    /// Builds a tree from a partial description, allocating ids in preorder.
    pub fn instantiate(root: PartialNode) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            err: None,
        };
        tree.alloc(root, None, 0);
        tree
    }

    fn alloc(&mut self, partial: PartialNode, parent: Option<NodeId>, depth: usize) -> NodeId {
        let id = NodeId(self.nodes.len());
        let PartialNode {
            kind,
            label,
            code,
            pos,
            children,
        } = partial;
        self.nodes.push(NodeData {
            kind,
            label,
            code,
            pos,
            depth,
            hash: 0,
            parent,
            children: Vec::new(),
        });
        let child_ids: Vec<NodeId> = children
            .into_iter()
            .map(|c| self.alloc(c, Some(id), depth + 1))
            .collect();
        let hash = {
            let data = &self.nodes[id.0];
            match data.kind {
                SyntaxKind::Node => node_hash(
                    &data.label,
                    child_ids.iter().map(|c| self.nodes[c.0].hash),
                ),
                _ => leaf_hash(&data.label, &data.code),
            }
        };
        let data = &mut self.nodes[id.0];
        data.hash = hash;
        data.children = child_ids;
        id
    }

    /// Parses a tree from the parser's JSON format.
    ///
    /// ```
    /// use treefix::tree::SyntaxTree;
    ///
    /// let tree = SyntaxTree::from_json(r#"{
    ///     "kind": "node", "label": 1, "name": "stmt",
    ///     "children": [
    ///         {"kind": "token", "label": 2, "name": "id", "code": "x", "pos": {"line": 1, "column": 1}},
    ///         {"kind": "token", "label": 3, "name": "semi", "code": ";"}
    ///     ]
    /// }"#).unwrap();
    /// assert_eq!(tree.source_text(), "x ;");
    /// ```
    pub fn from_json(s: &str) -> Result<Self> {
        let raw: RawNode = serde_json::from_str(s)?;
        Ok(Self::instantiate(raw.into()))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&RawNode::from(self.root()))?)
    }

    pub fn root(&self) -> NodeRef<'_> {
        self.node(NodeId(0))
    }

    /// Returns a handle to a node.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not allocated by this tree.
    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        assert!(id.0 < self.nodes.len(), "node {:?} not in tree", id);
        NodeRef { tree: self, id }
    }

    pub fn get(&self, id: NodeId) -> Option<NodeRef<'_>> {
        if id.0 < self.nodes.len() {
            Some(NodeRef { tree: self, id })
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn err(&self) -> Option<NodeRef<'_>> {
        self.err.map(|id| self.node(id))
    }

    pub fn set_err(&mut self, id: NodeId) {
        self.err = Some(id);
    }

    /// Marks the leaf at `pos` as the error leaf.
    pub fn locate_err(&mut self, pos: Pos) -> Result<NodeId> {
        let id = self
            .find_leaf_at(pos)
            .ok_or(Error::ErrorNodeNotFound { pos })?;
        self.err = Some(id);
        Ok(id)
    }

    /// Finds the leaf starting exactly at `pos`.
    pub fn find_leaf_at(&self, pos: Pos) -> Option<NodeId> {
        self.root()
            .leaves()
            .find(|leaf| leaf.pos() == Some(pos))
            .map(|leaf| leaf.id())
    }

    /// The source text of the whole tree, leaves separated by single spaces.
    pub fn source_text(&self) -> &str {
        self.root().code()
    }

    pub fn identical_to(&self, other: &SyntaxTree) -> bool {
        self.root().identical_to(other.root())
    }

    /// Returns a new tree with the subtree at `target` replaced.
    pub fn replace(&self, target: NodeId, with: &PartialNode) -> Option<SyntaxTree> {
        self.get(target)?;
        Some(self.rebuild(Edit::Replace(target, with)))
    }

    /// Returns a new tree with the subtree at `target` removed. The root cannot be removed.
    pub fn delete(&self, target: NodeId) -> Option<SyntaxTree> {
        self.get(target)?.parent()?;
        Some(self.rebuild(Edit::Remove(target)))
    }

    /// Returns a new tree with `child` spliced in as the `index`-th child of `parent`.
    pub fn insert(&self, parent: NodeId, index: usize, child: &PartialNode) -> Option<SyntaxTree> {
        let p = self.get(parent)?;
        if p.is_leaf() || index > p.child_count() {
            return None;
        }
        Some(self.rebuild(Edit::Splice(parent, index, child)))
    }

    fn rebuild(&self, edit: Edit<'_>) -> SyntaxTree {
        SyntaxTree::instantiate(self.rebuild_node(self.root(), &edit))
    }

    fn rebuild_node(&self, node: NodeRef<'_>, edit: &Edit<'_>) -> PartialNode {
        if let Edit::Replace(target, with) = edit {
            if *target == node.id() {
                return (*with).clone();
            }
        }
        if node.is_leaf() {
            return node.to_partial();
        }
        let mut children: Vec<PartialNode> = node
            .children()
            .filter(|c| !matches!(edit, Edit::Remove(t) if *t == c.id()))
            .map(|c| self.rebuild_node(c, edit))
            .collect();
        if let Edit::Splice(parent, index, child) = edit {
            if *parent == node.id() {
                children.insert(*index, (*child).clone());
            }
        }
        PartialNode {
            kind: node.kind(),
            label: node.label().clone(),
            code: join_code(children.iter().map(|c| c.code.as_str())),
            pos: node.pos(),
            children,
        }
    }
}

impl fmt::Display for SyntaxTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in self.root().subtrees() {
            let indent = node.depth() * 2;
            let mark = if self.err == Some(node.id()) { " <- error" } else { "" };
            match node.kind() {
                SyntaxKind::Node => writeln!(f, "{:indent$}{}{}", "", node.label(), mark)?,
                SyntaxKind::Token => {
                    writeln!(f, "{:indent$}{} {:?}{}", "", node.label(), node.code(), mark)?
                }
                SyntaxKind::Error => {
                    writeln!(f, "{:indent$}{} !{:?}{}", "", node.label(), node.code(), mark)?
                }
            }
        }
        Ok(())
    }
}

/// A borrowed handle to one node of a [`SyntaxTree`].
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a SyntaxTree,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    fn data(&self) -> &'a NodeData {
        &self.tree.nodes[self.id.0]
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'a SyntaxTree {
        self.tree
    }

    pub fn kind(&self) -> SyntaxKind {
        self.data().kind
    }

    pub fn label(&self) -> &'a Label {
        &self.data().label
    }

    pub fn code(&self) -> &'a str {
        &self.data().code
    }

    pub fn pos(&self) -> Option<Pos> {
        self.data().pos
    }

    pub fn depth(&self) -> usize {
        self.data().depth
    }

    pub fn hash(&self) -> u64 {
        self.data().hash
    }

    pub fn is_leaf(&self) -> bool {
        self.kind() != SyntaxKind::Node
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        let tree = self.tree;
        self.data().parent.map(|id| NodeRef { tree, id })
    }

    pub fn children(
        &self,
    ) -> impl DoubleEndedIterator<Item = NodeRef<'a>> + ExactSizeIterator + 'a {
        let tree = self.tree;
        self.data()
            .children
            .iter()
            .map(move |&id| NodeRef { tree, id })
    }

    pub fn child(&self, index: usize) -> Option<NodeRef<'a>> {
        let tree = self.tree;
        self.data()
            .children
            .get(index)
            .map(|&id| NodeRef { tree, id })
    }

    pub fn child_count(&self) -> usize {
        self.data().children.len()
    }

    /// Position of this node among its parent's children.
    pub fn index_in_parent(&self) -> Option<usize> {
        self.parent()?.children().position(|c| c.id == self.id)
    }

    /// The `k`-th ancestor; `ancestor(0)` is the node itself.
    pub fn ancestor(&self, k: usize) -> Option<NodeRef<'a>> {
        let mut node = *self;
        for _ in 0..k {
            node = node.parent()?;
        }
        Some(node)
    }

    /// Proper ancestors, nearest first.
    pub fn ancestors(&self) -> Ancestors<'a> {
        Ancestors { next: self.parent() }
    }

    /// This node and all of its descendants, in preorder.
    pub fn subtrees(&self) -> Preorder<'a> {
        Preorder {
            tree: self.tree,
            stack: vec![self.id],
        }
    }

    pub fn descendants(&self) -> impl Iterator<Item = NodeRef<'a>> {
        self.subtrees().skip(1)
    }

    pub fn leaves(&self) -> impl Iterator<Item = NodeRef<'a>> {
        self.subtrees().filter(|n| n.is_leaf())
    }

    /// Whether this node is a proper ancestor of `other`.
    pub fn is_ancestor_of(&self, other: NodeRef<'_>) -> bool {
        other.depth() > self.depth()
            && other.ancestor(other.depth() - self.depth()).map(|a| a.id) == Some(self.id)
    }

    /// Lowest common ancestor of two nodes of the same tree.
    pub fn lca(&self, other: NodeRef<'a>) -> NodeRef<'a> {
        let (mut a, mut b) = (*self, other);
        while a.depth() > b.depth() {
            match a.parent() {
                Some(p) => a = p,
                None => break,
            }
        }
        while b.depth() > a.depth() {
            match b.parent() {
                Some(p) => b = p,
                None => break,
            }
        }
        while a.id != b.id {
            match (a.parent(), b.parent()) {
                (Some(p), Some(q)) => {
                    a = p;
                    b = q;
                }
                _ => break,
            }
        }
        a
    }

    /// Structural equality: same kinds and labels, same leaf codes, same shape.
    ///
    /// Hashes are compared first, but equal hashes alone are not trusted.
    pub fn identical_to(&self, other: NodeRef<'_>) -> bool {
        if self.hash() != other.hash()
            || self.label() != other.label()
            || self.kind() != other.kind()
        {
            return false;
        }
        if self.is_leaf() {
            return self.code() == other.code();
        }
        self.child_count() == other.child_count()
            && self
                .children()
                .zip(other.children())
                .all(|(a, b)| a.identical_to(b))
    }

    pub fn to_partial(&self) -> PartialNode {
        PartialNode {
            kind: self.kind(),
            label: self.label().clone(),
            code: self.code().to_string(),
            pos: self.pos(),
            children: self.children().map(|c| c.to_partial()).collect(),
        }
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for NodeRef<'_> {}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}({:?})", self.label(), self.id.0, self.code())
    }
}

impl fmt::Display for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.label(), self.code())
    }
}

pub struct Ancestors<'a> {
    next: Option<NodeRef<'a>>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = node.parent();
        Some(node)
    }
}

pub struct Preorder<'a> {
    tree: &'a SyntaxTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let tree = self.tree;
        self.stack.extend(tree.nodes[id.0].children.iter().rev());
        Some(NodeRef { tree, id })
    }
}

// the parser's JSON format
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum RawNode {
    Token {
        label: u32,
        name: String,
        code: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pos: Option<Pos>,
    },
    Error {
        label: u32,
        name: String,
        #[serde(default)]
        code: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pos: Option<Pos>,
    },
    Node {
        label: u32,
        name: String,
        #[serde(default)]
        children: Vec<RawNode>,
    },
}

impl From<RawNode> for PartialNode {
    fn from(raw: RawNode) -> Self {
        match raw {
            RawNode::Token {
                label,
                name,
                code,
                pos,
            } => PartialNode {
                pos,
                ..PartialNode::token(Label::new(label, name), code)
            },
            RawNode::Error {
                label,
                name,
                code,
                pos,
            } => PartialNode {
                pos,
                ..PartialNode::error(Label::new(label, name), code)
            },
            RawNode::Node {
                label,
                name,
                children,
            } => PartialNode::node(
                Label::new(label, name),
                children.into_iter().map(PartialNode::from).collect(),
            ),
        }
    }
}

impl From<NodeRef<'_>> for RawNode {
    fn from(node: NodeRef<'_>) -> Self {
        let label = node.label().id;
        let name = node.label().name.clone();
        match node.kind() {
            SyntaxKind::Token => RawNode::Token {
                label,
                name,
                code: node.code().to_string(),
                pos: node.pos(),
            },
            SyntaxKind::Error => RawNode::Error {
                label,
                name,
                code: node.code().to_string(),
                pos: node.pos(),
            },
            SyntaxKind::Node => RawNode::Node {
                label,
                name,
                children: node.children().map(RawNode::from).collect(),
            },
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    fn sample() -> SyntaxTree {
        tree(node(
            "block",
            vec![
                assign("x", tok("num", "1")),
                node("stmt", vec![tok("id", "y"), tok("semi", ";")]),
            ],
        ))
    }

    #[test]
    fn ids_in_preorder() {
        let t = sample();
        let names: Vec<_> = t.root().subtrees().map(|n| n.id().0).collect();
        assert_eq!(names, (0..t.len()).collect::<Vec<_>>());
        assert_eq!(t.root().label().name, "block");
        assert_eq!(t.node(NodeId(2)).code(), "x");
        assert_eq!(t.node(NodeId(2)).depth(), 2);
        assert_eq!(t.source_text(), "x = 1 ; y ;");
    }

    #[test]
    fn parent_links() {
        let t = sample();
        let y = t.node(leaf(&t, "y"));
        let parents: Vec<_> = y.ancestors().map(|a| a.label().name.clone()).collect();
        assert_eq!(parents, vec!["stmt", "block"]);
        assert_eq!(y.ancestor(2), Some(t.root()));
        assert_eq!(y.ancestor(3), None);
        assert_eq!(y.index_in_parent(), Some(0));
        assert!(t.root().is_ancestor_of(y));
        assert!(!y.is_ancestor_of(t.root()));
    }

    #[test]
    fn lca() {
        let t = sample();
        let x = t.node(leaf(&t, "x"));
        let one = t.node(leaf(&t, "1"));
        let y = t.node(leaf(&t, "y"));
        assert_eq!(x.lca(one).label().name, "stmt");
        assert_eq!(x.lca(y), t.root());
        assert_eq!(x.lca(x), x);
        assert_eq!(x.parent().unwrap().lca(one), x.parent().unwrap());
    }

    #[test]
    fn structural_identity() {
        let t1 = sample();
        let t2 = sample();
        assert!(t1.identical_to(&t2));
        assert_eq!(t1.root().hash(), t1.root().to_partial().structural_hash());

        // both `;` leaves are identical to each other, but not to `x`
        let semis: Vec<_> = t1.root().leaves().filter(|l| l.code() == ";").collect();
        assert!(semis[0].identical_to(semis[1]));
        assert!(!semis[0].identical_to(t1.node(leaf(&t1, "x"))));

        // same label and code, different kind
        let t3 = tree(node("block", vec![tok("semi", ";")]));
        let t4 = tree(node("block", vec![node("semi", vec![tok("semi", ";")])]));
        assert!(!t3.identical_to(&t4));
    }

    #[test]
    fn edits() {
        let t = sample();
        let second = t.root().child(1).unwrap().id();

        let deleted = t.delete(second).unwrap();
        assert_eq!(deleted.source_text(), "x = 1 ;");
        assert!(t.delete(t.root().id()).is_none());

        let inserted = t.insert(second, 1, &tok("semi", ";")).unwrap();
        assert_eq!(inserted.source_text(), "x = 1 ; y ; ;");
        assert!(t.insert(second, 3, &tok("semi", ";")).is_none());
        assert!(t.insert(leaf(&t, "y"), 0, &tok("semi", ";")).is_none());

        let replaced = t.replace(leaf(&t, "1"), &tok("num", "2")).unwrap();
        assert_eq!(replaced.source_text(), "x = 2 ; y ;");
        assert_eq!(replaced.len(), t.len());
        // the original tree is untouched
        assert_eq!(t.source_text(), "x = 1 ; y ;");
    }

    #[test]
    fn find_leaf_at() {
        let mut t = tree(node(
            "stmt",
            vec![
                tok("id", "foo").at(Pos::new(3, 5)),
                tok("lpar", "(").at(Pos::new(3, 8)),
                tok("rpar", ")").at(Pos::new(3, 9)),
            ],
        ));
        assert_eq!(t.find_leaf_at(Pos::new(3, 8)), Some(NodeId(2)));
        // positions inside a token or between tokens do not count
        assert_eq!(t.find_leaf_at(Pos::new(3, 7)), None);
        assert_eq!(t.find_leaf_at(Pos::new(3, 10)), None);
        assert_eq!(t.find_leaf_at(Pos::new(4, 1)), None);
        assert!(matches!(
            t.locate_err(Pos::new(1, 1)),
            Err(Error::ErrorNodeNotFound { .. })
        ));
        assert!(t.locate_err(Pos::new(3, 6)).is_err());
        assert!(t.err().is_none());
        assert_eq!(t.locate_err(Pos::new(3, 9)).unwrap(), NodeId(3));
        assert_eq!(t.err().map(|e| e.code()), Some(")"));
    }

    #[test]
    fn json() {
        let t = SyntaxTree::from_json(
            r#"{"kind": "node", "label": 7, "name": "call", "children": [
                {"kind": "token", "label": 1, "name": "id", "code": "f"},
                {"kind": "token", "label": 2, "name": "lpar", "code": "(", "pos": {"line": 2, "column": 4}},
                {"kind": "error", "label": 3, "name": "rpar"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(t.len(), 4);
        assert_eq!(t.node(NodeId(3)).kind(), SyntaxKind::Error);
        assert_eq!(t.node(NodeId(2)).pos(), Some(Pos::new(2, 4)));
        assert_eq!(t.source_text(), "f (");

        let back = SyntaxTree::from_json(&t.to_json().unwrap()).unwrap();
        assert!(back.identical_to(&t));

        assert!(matches!(
            SyntaxTree::from_json(r#"{"kind": "leaf"}"#),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn display() {
        let mut t = tree(node("stmt", vec![tok("id", "x"), tok("semi", ";")]));
        t.set_err(NodeId(2));
        assert_eq!(
            t.to_string(),
            "stmt\n  id \"x\"\n  semi \";\" <- error\n"
        );
    }
}
