//! The tree transformation language.
//!
//! A [`Program`] names a node of the input tree ([`Ref`]) and either inserts a new subtree under
//! it, deletes it, or replaces it. New subtrees are built by [`TreeExpr`]s, whose leaves get their
//! text from [`TokenExpr`]s. Every construct evaluates against an [`Input`] and yields `None` when
//! it does not apply: an ancestor above the root, an unbound variable, no node to select.

use crate::feature::Feature;
use crate::tree::{Label, NodeId, NodeRef, PartialNode, SyntaxTree};
use crate::TreeProgram;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A slot of an error pattern.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnvKey(pub usize);

/// Text captured by an error pattern, by slot.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Env(BTreeMap<EnvKey, String>);

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: EnvKey, value: impl Into<String>) {
        self.0.insert(key, value.into());
    }

    pub fn get(&self, key: EnvKey) -> Option<&str> {
        self.0.get(&key).map(|s| s.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = EnvKey> + '_ {
        self.0.keys().copied()
    }

    /// Slots bound to exactly `value`.
    pub fn keys_for<'a>(&'a self, value: &'a str) -> impl Iterator<Item = EnvKey> + 'a {
        self.0
            .iter()
            .filter(move |(_, v)| v.as_str() == value)
            .map(|(k, _)| *k)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(EnvKey, String)> for Env {
    fn from_iter<I: IntoIterator<Item = (EnvKey, String)>>(iter: I) -> Self {
        Env(iter.into_iter().collect())
    }
}

/// What a program runs on: a tree, its error leaf, and the text bound by the error pattern.
#[derive(Debug, Clone)]
pub struct Input {
    pub tree: SyntaxTree,
    pub err: NodeId,
    pub env: Env,
}

impl Input {
    pub fn new(tree: SyntaxTree, err: NodeId, env: Env) -> Self {
        Self { tree, err, env }
    }

    pub fn err_node(&self) -> NodeRef<'_> {
        self.tree.node(self.err)
    }

    pub fn source(&self, source: &Source) -> Option<NodeRef<'_>> {
        match source {
            Source::Err => Some(self.err_node()),
            Source::Var(key) => var_node(&self.tree, self.env.get(*key)?),
        }
    }
}

/// The shallowest leaf whose code is `value`, first in preorder among equals.
pub fn var_node<'a>(tree: &'a SyntaxTree, value: &str) -> Option<NodeRef<'a>> {
    tree.root()
        .leaves()
        .filter(|l| l.code() == value)
        .min_by_key(|l| l.depth())
}

/// Where a reference starts.
#[derive(Debug, PartialEq, Eq, Clone, Hash, Serialize, Deserialize)]
pub enum Source {
    /// The error leaf.
    Err,
    /// The node bound to an error pattern slot.
    Var(EnvKey),
}

/// Selects an ancestor.
#[derive(Debug, PartialEq, Eq, Clone, Hash, Serialize, Deserialize)]
pub enum Cursor {
    /// The `k`-th ancestor; `Abs(0)` is the node itself.
    Abs(usize),
    /// The `k`-th ancestor (counting from 1) with the label.
    Rel(Label, usize),
}

impl Cursor {
    pub fn run<'a>(&self, node: NodeRef<'a>) -> Option<NodeRef<'a>> {
        match self {
            Cursor::Abs(k) => node.ancestor(*k),
            Cursor::Rel(label, k) => {
                if *k == 0 {
                    return None;
                }
                node.ancestors().filter(|a| a.label() == label).nth(k - 1)
            }
        }
    }
}

/// A condition on the features of a node.
#[derive(Debug, PartialEq, Eq, Clone, Hash, Serialize, Deserialize)]
pub enum Predicate {
    True,
    Has(Feature),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    pub fn holds(&self, node: NodeRef<'_>, err: NodeRef<'_>) -> bool {
        match self {
            Predicate::True => true,
            Predicate::Has(f) => f.holds(node, err),
            Predicate::And(a, b) => a.holds(node, err) && b.holds(node, err),
            Predicate::Or(a, b) => a.holds(node, err) || b.holds(node, err),
        }
    }

    /// The conjunction of `features`; `True` when there are none.
    pub fn all(features: impl IntoIterator<Item = Feature>) -> Self {
        features
            .into_iter()
            .map(Predicate::Has)
            .reduce(|a, b| Predicate::And(Box::new(a), Box::new(b)))
            .unwrap_or(Predicate::True)
    }

    pub fn or(self, other: Predicate) -> Self {
        Predicate::Or(Box::new(self), Box::new(other))
    }
}

/// Picks one node out of the candidates for a [`Ref::Find`].
#[derive(Debug, PartialEq, Eq, Clone, Hash, Serialize, Deserialize)]
pub enum Locator {
    /// The `k`-th candidate counting from 1; negative values count from the end.
    Nth(isize),
    /// The first candidate satisfying the predicate.
    Where(Predicate),
}

impl Locator {
    pub fn select<'a>(&self, candidates: &[NodeRef<'a>], err: NodeRef<'_>) -> Option<NodeRef<'a>> {
        match self {
            Locator::Nth(k) => {
                let n = candidates.len() as isize;
                let k = if *k > 0 { k - 1 } else { n + k };
                if !(0 <= k && k < n) {
                    return None;
                }
                Some(candidates[k as usize])
            }
            Locator::Where(p) => candidates.iter().copied().find(|c| p.holds(*c, err)),
        }
    }
}

/// A reference to a node of the input tree.
#[derive(Debug, PartialEq, Eq, Clone, Hash, Serialize, Deserialize)]
pub enum Ref {
    /// The error leaf itself.
    Just,
    /// An ancestor of the source.
    Move(Source, Cursor),
    /// A node with `label` below an ancestor of the source, chosen by `locator`. Candidates are
    /// taken in preorder.
    Find {
        source: Source,
        scope: Cursor,
        label: Label,
        locator: Locator,
    },
}

impl Ref {
    pub fn run<'a>(&self, input: &'a Input) -> Option<NodeRef<'a>> {
        match self {
            Ref::Just => Some(input.err_node()),
            Ref::Move(source, cursor) => cursor.run(input.source(source)?),
            Ref::Find {
                source,
                scope,
                label,
                locator,
            } => {
                let scope = scope.run(input.source(source)?)?;
                let candidates: Vec<_> = scope
                    .descendants()
                    .filter(|n| n.label() == label)
                    .collect();
                locator.select(&candidates, input.err_node())
            }
        }
    }
}

/// The text of a new leaf.
#[derive(Debug, PartialEq, Eq, Clone, Hash, Serialize, Deserialize)]
pub enum TokenExpr {
    Const(String),
    /// Text bound to an error pattern slot.
    Var(EnvKey),
    /// The error leaf's text.
    Err,
    /// The text of a leaf of the input.
    Copy(Ref),
}

impl TokenExpr {
    pub fn run(&self, input: &Input) -> Option<String> {
        match self {
            TokenExpr::Const(s) => Some(s.clone()),
            TokenExpr::Var(key) => input.env.get(*key).map(String::from),
            TokenExpr::Err => Some(input.err_node().code().to_string()),
            TokenExpr::Copy(r) => {
                let node = r.run(input)?;
                if !node.is_leaf() {
                    return None;
                }
                Some(node.code().to_string())
            }
        }
    }
}

/// Builds a subtree.
#[derive(Debug, PartialEq, Eq, Clone, Hash, Serialize, Deserialize)]
pub enum TreeExpr {
    /// A copy of a subtree of the input.
    Copy(Ref),
    Leaf(Label, TokenExpr),
    Node(Label, Vec<TreeExpr>),
    /// A copy of a node of the input with more children added at the end.
    Append(Ref, Vec<TreeExpr>),
}

impl TreeExpr {
    pub fn run(&self, input: &Input) -> Option<PartialNode> {
        match self {
            TreeExpr::Copy(r) => Some(r.run(input)?.to_partial()),
            TreeExpr::Leaf(label, token) => {
                Some(PartialNode::token(label.clone(), token.run(input)?))
            }
            TreeExpr::Node(label, children) => {
                let children = children
                    .iter()
                    .map(|c| c.run(input))
                    .collect::<Option<Vec<_>>>()?;
                Some(PartialNode::node(label.clone(), children))
            }
            TreeExpr::Append(r, tail) => {
                let base = r.run(input)?;
                if base.is_leaf() {
                    return None;
                }
                let mut children: Vec<_> = base.children().map(|c| c.to_partial()).collect();
                for t in tail {
                    children.push(t.run(input)?);
                }
                Some(PartialNode::node(base.label().clone(), children))
            }
        }
    }
}

/// A whole transformation.
#[derive(Debug, PartialEq, Eq, Clone, Hash, Serialize, Deserialize)]
pub enum Program {
    /// Inserts `tree` as the `index`-th child of `target`; negative indices count from the end,
    /// so -1 appends.
    Insert {
        target: Ref,
        index: isize,
        tree: TreeExpr,
    },
    Delete {
        target: Ref,
    },
    Update {
        target: Ref,
        tree: TreeExpr,
    },
}

impl crate::private::Sealed for Program {}

impl TreeProgram for Program {
    fn run(&self, input: &Input) -> Option<SyntaxTree> {
        match self {
            Program::Insert {
                target,
                index,
                tree,
            } => {
                let parent = target.run(input)?;
                let n = parent.child_count() as isize;
                let k = if *index >= 0 { *index } else { n + 1 + index };
                if !(0 <= k && k <= n) {
                    return None;
                }
                input
                    .tree
                    .insert(parent.id(), k as usize, &tree.run(input)?)
            }
            Program::Delete { target } => input.tree.delete(target.run(input)?.id()),
            Program::Update { target, tree } => {
                let node = target.run(input)?;
                input.tree.replace(node.id(), &tree.run(input)?)
            }
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Err => write!(f, "err"),
            Source::Var(key) => write!(f, "${}", key.0),
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cursor::Abs(k) => write!(f, "Abs({})", k),
            Cursor::Rel(label, k) => write!(f, "Rel({}, {})", label, k),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::True => write!(f, "true"),
            Predicate::Has(feature) => write!(f, "{}", feature),
            Predicate::And(a, b) => write!(f, "({} && {})", a, b),
            Predicate::Or(a, b) => write!(f, "({} || {})", a, b),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Nth(k) => write!(f, "Nth({})", k),
            Locator::Where(p) => write!(f, "Where({})", p),
        }
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ref::Just => write!(f, "Just"),
            Ref::Move(source, cursor) => write!(f, "Move({}, {})", source, cursor),
            Ref::Find {
                source,
                scope,
                label,
                locator,
            } => write!(f, "Find({}, {}, {}, {})", source, scope, label, locator),
        }
    }
}

impl fmt::Display for TokenExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenExpr::Const(s) => write!(f, "{:?}", s),
            TokenExpr::Var(key) => write!(f, "${}", key.0),
            TokenExpr::Err => write!(f, "err"),
            TokenExpr::Copy(r) => write!(f, "Copy({})", r),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[TreeExpr]) -> fmt::Result {
    write!(f, "[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, "]")
}

impl fmt::Display for TreeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeExpr::Copy(r) => write!(f, "Copy({})", r),
            TreeExpr::Leaf(label, token) => write!(f, "Leaf({}, {})", label, token),
            TreeExpr::Node(label, children) => {
                write!(f, "Node({}, ", label)?;
                write_list(f, children)?;
                write!(f, ")")
            }
            TreeExpr::Append(r, tail) => {
                write!(f, "Append({}, ", r)?;
                write_list(f, tail)?;
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Program::Insert {
                target,
                index,
                tree,
            } => write!(f, "Insert({}, {}, {})", target, index, tree),
            Program::Delete { target } => write!(f, "Delete({})", target),
            Program::Update { target, tree } => write!(f, "Update({}, {})", target, tree),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::testing::*;
    use Cursor::*;

    // class C { void f ( ) { int x = 1 ; g ( x ) ; } }
    fn input(err_code: &str, env: &[(usize, &str)]) -> Input {
        let t = tree(node(
            "class",
            vec![
                tok("kw", "class"),
                tok("id", "C"),
                node(
                    "method",
                    vec![
                        tok("id", "void"),
                        tok("id", "f"),
                        node("params", vec![tok("lpar", "("), tok("rpar", ")")]),
                        node(
                            "block",
                            vec![
                                node(
                                    "decl",
                                    vec![
                                        tok("id", "int"),
                                        tok("id", "x"),
                                        tok("eq", "="),
                                        tok("num", "1"),
                                        tok("semi", ";"),
                                    ],
                                ),
                                node(
                                    "stmt",
                                    vec![
                                        node(
                                            "call",
                                            vec![
                                                tok("id", "g"),
                                                tok("lpar", "("),
                                                tok("id", "x"),
                                                tok("rpar", ")"),
                                            ],
                                        ),
                                        tok("semi", ";"),
                                    ],
                                ),
                            ],
                        ),
                    ],
                ),
            ],
        ));
        let err = leaf(&t, err_code);
        let env = env
            .iter()
            .map(|(k, v)| (EnvKey(*k), v.to_string()))
            .collect();
        Input::new(t, err, env)
    }

    fn code_of(r: &Ref, input: &Input) -> Option<String> {
        r.run(input).map(|n| n.code().to_string())
    }

    #[test]
    fn cursors() {
        let input = input("g", &[]);
        let g = input.err_node();
        assert_eq!(Abs(0).run(g), Some(g));
        assert_eq!(Abs(2).run(g).unwrap().label().name, "stmt");
        assert_eq!(Rel(label("block"), 1).run(g).unwrap().label().name, "block");
        assert_eq!(Rel(label("block"), 2).run(g), None);
        assert_eq!(Rel(label("block"), 0).run(g), None);
        assert_eq!(Abs(7).run(g), None);
    }

    #[test]
    fn var_source() {
        let input = input("g", &[(0, "x"), (1, "nothing")]);
        // the declaration's `x` is shallower than the argument `x`
        let x = input.source(&Source::Var(EnvKey(0))).unwrap();
        assert_eq!(x.parent().unwrap().label().name, "decl");
        assert_eq!(input.source(&Source::Var(EnvKey(1))), None);
        assert_eq!(input.source(&Source::Var(EnvKey(2))), None);
    }

    #[test]
    fn refs() {
        let input = input("g", &[(0, "x")]);
        assert_eq!(code_of(&Ref::Just, &input).as_deref(), Some("g"));
        let stmt = Ref::Move(Source::Err, Rel(label("stmt"), 1));
        assert_eq!(code_of(&stmt, &input).as_deref(), Some("g ( x ) ;"));

        let find = |locator| Ref::Find {
            source: Source::Err,
            scope: Rel(label("block"), 1),
            label: label("semi"),
            locator,
        };
        let parent = |l: Locator| {
            let found = find(l).run(&input).unwrap();
            found.parent().unwrap().label().name.clone()
        };
        assert_eq!(parent(Locator::Nth(1)), "decl");
        assert_eq!(parent(Locator::Nth(-1)), "stmt");
        assert_eq!(find(Locator::Nth(3)).run(&input), None);
        assert_eq!(find(Locator::Nth(-3)).run(&input), None);

        let decl_semi = find(Locator::Where(Predicate::Has(Feature::SiblingLeaf(
            label("num"),
            "1".to_string(),
        ))));
        assert_eq!(decl_semi.run(&input), find(Locator::Nth(1)).run(&input));
        let nowhere = find(Locator::Where(Predicate::Has(Feature::SubKindOf(label("class")))));
        assert_eq!(nowhere.run(&input), None);

        let from_var = Ref::Move(Source::Var(EnvKey(0)), Rel(label("decl"), 1));
        assert_eq!(code_of(&from_var, &input).as_deref(), Some("int x = 1 ;"));
    }

    #[test]
    fn tokens() {
        let input = input("g", &[(0, "y")]);
        assert_eq!(TokenExpr::Const(";".into()).run(&input).as_deref(), Some(";"));
        assert_eq!(TokenExpr::Var(EnvKey(0)).run(&input).as_deref(), Some("y"));
        assert_eq!(TokenExpr::Var(EnvKey(1)).run(&input), None);
        assert_eq!(TokenExpr::Err.run(&input).as_deref(), Some("g"));
        let stmt = Ref::Move(Source::Err, Abs(2));
        assert_eq!(TokenExpr::Copy(stmt).run(&input), None);
    }

    #[test]
    fn programs() {
        let input = input("g", &[]);
        let stmt = Ref::Move(Source::Err, Rel(label("stmt"), 1));

        let delete = Program::Delete {
            target: stmt.clone(),
        };
        let out = delete.run(&input).unwrap();
        assert_eq!(out.source_text(), "class C void f ( ) int x = 1 ;");

        // -1 appends, 0 prepends
        let insert = |index| Program::Insert {
            target: stmt.clone(),
            index,
            tree: TreeExpr::Leaf(label("semi"), TokenExpr::Const(";".into())),
        };
        let out = insert(-1).run(&input).unwrap();
        assert!(out.source_text().ends_with("g ( x ) ; ;"));
        let out = insert(0).run(&input).unwrap();
        assert!(out.source_text().ends_with("; g ( x ) ;"));
        assert!(insert(3).run(&input).is_none());
        assert!(insert(-4).run(&input).is_none());

        let update = Program::Update {
            target: Ref::Just,
            tree: TreeExpr::Leaf(label("id"), TokenExpr::Const("h".into())),
        };
        assert!(update.run(&input).unwrap().source_text().ends_with("h ( x ) ;"));
    }

    #[test]
    fn trees() {
        let input = input("g", &[]);
        let call = Ref::Move(Source::Err, Abs(1));
        let append = TreeExpr::Append(
            Ref::Move(Source::Err, Rel(label("stmt"), 1)),
            vec![TreeExpr::Leaf(label("semi"), TokenExpr::Const(";".into()))],
        );
        let built = append.run(&input).unwrap();
        assert_eq!(built.code, "g ( x ) ; ;");
        assert_eq!(built.label, label("stmt"));

        let node = TreeExpr::Node(
            label("stmt"),
            vec![
                TreeExpr::Copy(call),
                TreeExpr::Leaf(label("semi"), TokenExpr::Err),
            ],
        );
        assert_eq!(node.run(&input).unwrap().code, "g ( x ) g");
        assert!(TreeExpr::Append(Ref::Just, vec![]).run(&input).is_none());
    }

    #[test]
    fn display() {
        let p = Program::Insert {
            target: Ref::Move(Source::Err, Rel(label("stmt"), 1)),
            index: -1,
            tree: TreeExpr::Node(
                label("args"),
                vec![
                    TreeExpr::Leaf(label("id"), TokenExpr::Var(EnvKey(0))),
                    TreeExpr::Copy(Ref::Find {
                        source: Source::Var(EnvKey(1)),
                        scope: Abs(2),
                        label: label("num"),
                        locator: Locator::Nth(2),
                    }),
                ],
            ),
        };
        assert_eq!(
            p.to_string(),
            "Insert(Move(err, Rel(stmt, 1)), -1, Node(args, [Leaf(id, $0), \
             Copy(Find($1, Abs(2), num, Nth(2)))]))"
        );
    }
}
