//! Version spaces.
//!
//! A version space is a compact representation of a set of programs: a union of alternatives, or
//! the cross product of the spaces of a constructor's arguments. Spaces are built by the witness
//! functions and only ever shrink; enumerating one yields programs in construction order, and
//! [`TreeSpace::top_k`] yields the best ones by [`rank`](crate::rank).
//!
//! An empty argument space makes the whole constructor empty. The smart constructors apply that
//! rule eagerly, so an empty space is always represented by an empty union.

use crate::language::{Program, Ref, TokenExpr, TreeExpr};
use crate::rank;
use crate::tree::Label;

/// A value with its score.
pub type Scored<T> = (T, f64);

type Exprs<'a, T> = Box<dyn Iterator<Item = T> + 'a>;

/// A set of [`TreeExpr`]s.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeSpace {
    Copy(Vec<Ref>),
    Leaf(Label, Vec<TokenExpr>),
    Node(Label, Vec<TreeSpace>),
    Append(Vec<Ref>, Vec<TreeSpace>),
    Union(Vec<TreeSpace>),
}

use TreeSpace::*;

impl TreeSpace {
    pub fn empty() -> Self {
        Union(vec![])
    }

    pub fn copy(refs: Vec<Ref>) -> Self {
        if refs.is_empty() {
            return Self::empty();
        }
        Copy(refs)
    }

    pub fn leaf(label: Label, tokens: Vec<TokenExpr>) -> Self {
        if tokens.is_empty() {
            return Self::empty();
        }
        Leaf(label, tokens)
    }

    pub fn node(label: Label, children: Vec<TreeSpace>) -> Self {
        if children.iter().any(TreeSpace::is_empty) {
            return Self::empty();
        }
        Node(label, children)
    }

    pub fn append(refs: Vec<Ref>, tail: Vec<TreeSpace>) -> Self {
        if refs.is_empty() || tail.is_empty() || tail.iter().any(TreeSpace::is_empty) {
            return Self::empty();
        }
        Append(refs, tail)
    }

    /// The union of `branches`, dropping empty ones and flattening nested unions.
    pub fn union(branches: Vec<TreeSpace>) -> Self {
        let mut flat = Vec::with_capacity(branches.len());
        for branch in branches {
            match branch {
                Union(inner) => flat.extend(inner.into_iter().filter(|b| !b.is_empty())),
                b if b.is_empty() => {}
                b => flat.push(b),
            }
        }
        if flat.len() == 1 {
            return flat.remove(0);
        }
        Union(flat)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Copy(refs) => refs.is_empty(),
            Leaf(_, tokens) => tokens.is_empty(),
            Node(_, children) => children.iter().any(TreeSpace::is_empty),
            Append(refs, tail) => refs.is_empty() || tail.iter().any(TreeSpace::is_empty),
            Union(branches) => branches.iter().all(TreeSpace::is_empty),
        }
    }

    /// Number of programs in the space, saturating.
    pub fn size(&self) -> u128 {
        match self {
            Copy(refs) => refs.len() as u128,
            Leaf(_, tokens) => tokens.len() as u128,
            Node(_, children) => product_size(children),
            Append(refs, tail) => (refs.len() as u128).saturating_mul(product_size(tail)),
            Union(branches) => branches
                .iter()
                .fold(0u128, |acc, b| acc.saturating_add(b.size())),
        }
    }

    /// Lazily enumerates every program in the space.
    pub fn iter(&self) -> Exprs<'_, TreeExpr> {
        match self {
            Copy(refs) => Box::new(refs.iter().cloned().map(TreeExpr::Copy)),
            Leaf(label, tokens) => {
                Box::new(tokens.iter().map(move |t| TreeExpr::Leaf(label.clone(), t.clone())))
            }
            Node(label, children) => {
                Box::new(product(children).map(move |cs| TreeExpr::Node(label.clone(), cs)))
            }
            Append(refs, tail) => Box::new(refs.iter().flat_map(move |r| {
                product(tail).map(move |cs| TreeExpr::Append(r.clone(), cs))
            })),
            Union(branches) => Box::new(branches.iter().flat_map(TreeSpace::iter)),
        }
    }

    /// The `k` best programs of the space, best first. Ties keep enumeration order.
    pub fn top_k(&self, k: usize) -> Vec<Scored<TreeExpr>> {
        if k == 0 {
            return vec![];
        }
        match self {
            Copy(refs) => best(
                refs.iter()
                    .map(|r| (TreeExpr::Copy(r.clone()), rank::reference(r))),
                k,
            ),
            Leaf(label, tokens) => best(
                tokens
                    .iter()
                    .map(|t| (TreeExpr::Leaf(label.clone(), t.clone()), rank::token(t))),
                k,
            ),
            Node(label, children) => top_product(children, k)
                .into_iter()
                .map(|(cs, score)| (TreeExpr::Node(label.clone(), cs), score))
                .collect(),
            Append(refs, tail) => {
                let bases = top_refs(refs, k);
                let tails = top_product(tail, k);
                best(
                    bases.iter().flat_map(|(r, rs)| {
                        tails.iter().map(move |(cs, ts)| {
                            (TreeExpr::Append(r.clone(), cs.clone()), rank::append(*rs, *ts))
                        })
                    }),
                    k,
                )
            }
            Union(branches) => best(branches.iter().flat_map(|b| b.top_k(k)), k),
        }
    }
}

fn product_size(spaces: &[TreeSpace]) -> u128 {
    spaces
        .iter()
        .fold(1u128, |acc, s| acc.saturating_mul(s.size()))
}

// every combination of one program per space, in order
fn product(spaces: &[TreeSpace]) -> Exprs<'_, Vec<TreeExpr>> {
    let init: Exprs<'_, Vec<TreeExpr>> = Box::new(std::iter::once(Vec::new()));
    spaces.iter().fold(init, |acc, space| {
        Box::new(acc.flat_map(move |prefix| {
            space.iter().map(move |e| {
                let mut cs = prefix.clone();
                cs.push(e);
                cs
            })
        }))
    })
}

// the product is monotone in every factor, so the best k combinations only use the best k
// programs of each space
fn top_product(spaces: &[TreeSpace], k: usize) -> Vec<Scored<Vec<TreeExpr>>> {
    let mut acc: Vec<Scored<Vec<TreeExpr>>> = vec![(Vec::new(), 1.0)];
    for space in spaces {
        let options = space.top_k(k);
        acc = best(
            acc.iter().flat_map(|(prefix, ps)| {
                options.iter().map(move |(e, es)| {
                    let mut cs = prefix.clone();
                    cs.push(e.clone());
                    (cs, rank::node([*ps, *es]))
                })
            }),
            k,
        );
    }
    acc
}

fn top_refs(refs: &[Ref], k: usize) -> Vec<Scored<Ref>> {
    best(refs.iter().map(|r| (r.clone(), rank::reference(r))), k)
}

fn best<T>(items: impl Iterator<Item = Scored<T>>, k: usize) -> Vec<Scored<T>> {
    let mut items: Vec<_> = items.collect();
    items.sort_by(|a, b| b.1.total_cmp(&a.1));
    items.truncate(k);
    items
}

/// A set of [`Program`]s of one kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgramSpace {
    Insert {
        targets: Vec<Ref>,
        indices: Vec<isize>,
        tree: TreeSpace,
    },
    Delete {
        targets: Vec<Ref>,
    },
    Update {
        targets: Vec<Ref>,
        tree: TreeSpace,
    },
}

impl ProgramSpace {
    pub fn insert(targets: Vec<Ref>, indices: Vec<isize>, tree: TreeSpace) -> Option<Self> {
        if targets.is_empty() || indices.is_empty() || tree.is_empty() {
            return None;
        }
        Some(ProgramSpace::Insert {
            targets,
            indices,
            tree,
        })
    }

    pub fn delete(targets: Vec<Ref>) -> Option<Self> {
        if targets.is_empty() {
            return None;
        }
        Some(ProgramSpace::Delete { targets })
    }

    pub fn update(targets: Vec<Ref>, tree: TreeSpace) -> Option<Self> {
        if targets.is_empty() || tree.is_empty() {
            return None;
        }
        Some(ProgramSpace::Update { targets, tree })
    }

    pub fn size(&self) -> u128 {
        match self {
            ProgramSpace::Insert {
                targets,
                indices,
                tree,
            } => (targets.len() as u128)
                .saturating_mul(indices.len() as u128)
                .saturating_mul(tree.size()),
            ProgramSpace::Delete { targets } => targets.len() as u128,
            ProgramSpace::Update { targets, tree } => {
                (targets.len() as u128).saturating_mul(tree.size())
            }
        }
    }

    pub fn iter(&self) -> Exprs<'_, Program> {
        match self {
            ProgramSpace::Insert {
                targets,
                indices,
                tree,
            } => Box::new(targets.iter().flat_map(move |target| {
                indices.iter().flat_map(move |index| {
                    tree.iter().map(move |t| Program::Insert {
                        target: target.clone(),
                        index: *index,
                        tree: t,
                    })
                })
            })),
            ProgramSpace::Delete { targets } => Box::new(
                targets
                    .iter()
                    .map(|target| Program::Delete {
                        target: target.clone(),
                    }),
            ),
            ProgramSpace::Update { targets, tree } => {
                Box::new(targets.iter().flat_map(move |target| {
                    tree.iter().map(move |t| Program::Update {
                        target: target.clone(),
                        tree: t,
                    })
                }))
            }
        }
    }

    /// The `k` best programs of the space, best first.
    pub fn top_k(&self, k: usize) -> Vec<Scored<Program>> {
        if k == 0 {
            return vec![];
        }
        match self {
            ProgramSpace::Insert {
                targets,
                indices,
                tree,
            } => {
                let targets = top_refs(targets, k);
                let trees = tree.top_k(k);
                let trees = &trees;
                best(
                    targets.iter().flat_map(|(target, ts)| {
                        indices.iter().flat_map(move |index| {
                            trees.iter().map(move |(t, s)| {
                                let program = Program::Insert {
                                    target: target.clone(),
                                    index: *index,
                                    tree: t.clone(),
                                };
                                (program, rank::insert(*ts, rank::index(*index), *s))
                            })
                        })
                    }),
                    k,
                )
            }
            ProgramSpace::Delete { targets } => top_refs(targets, k)
                .into_iter()
                .map(|(target, s)| (Program::Delete { target }, s))
                .collect(),
            ProgramSpace::Update { targets, tree } => {
                let targets = top_refs(targets, k);
                let trees = tree.top_k(k);
                best(
                    targets.iter().flat_map(|(target, ts)| {
                        trees.iter().map(move |(t, s)| {
                            let program = Program::Update {
                                target: target.clone(),
                                tree: t.clone(),
                            };
                            (program, rank::update(*ts, *s))
                        })
                    }),
                    k,
                )
            }
        }
    }
}
