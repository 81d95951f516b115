//! Scores for programs.
//!
//! Every construct of the language has a score in `(0, 1]`, computed from the scores of its
//! parts by a combinator that is monotone in each part. Monotonicity lets
//! [`TreeSpace::top_k`](crate::synth::TreeSpace::top_k) find the best programs of a version space
//! from the best programs of its components.
//!
//! The general preferences: small offsets over large ones, non-negative offsets over negative
//! ones of the same magnitude, label-relative cursors over absolute ones, bound text over
//! constants, and copying existing subtrees over rebuilding them.

use crate::feature::Feature;
use crate::language::{Cursor, Locator, Predicate, Program, Ref, Source, TokenExpr, TreeExpr};

/// `1 / (1 + k)` for `k >= 0`, slightly less for the negative offset of the same magnitude.
pub fn offset_score(k: isize) -> f64 {
    if k >= 0 {
        1.0 / (1.0 + k as f64)
    } else {
        1.0 / (1.1 - k as f64)
    }
}

pub fn source(s: &Source) -> f64 {
    match s {
        Source::Err => 1.0,
        Source::Var(_) => 0.9,
    }
}

pub fn cursor(c: &Cursor) -> f64 {
    match c {
        Cursor::Abs(k) => offset_score(*k as isize),
        Cursor::Rel(_, k) => 0.5 + 0.5 * offset_score(*k as isize - 1),
    }
}

/// How well a feature tells candidates apart.
pub fn feature(f: &Feature) -> f64 {
    match f {
        Feature::SiblingLeaf(..) => 1.0,
        Feature::SiblingErrToken | Feature::ContainsErrToken => 0.9,
        Feature::SubKindOf(_) | Feature::SuperKindOf(_) => 0.6,
    }
}

pub fn predicate(p: &Predicate) -> f64 {
    match p {
        Predicate::True => 1.0,
        Predicate::Has(f) => feature(f),
        Predicate::And(a, b) | Predicate::Or(a, b) => predicate(a) * predicate(b) * 0.5,
    }
}

pub fn locator(l: &Locator) -> f64 {
    match l {
        Locator::Nth(k) => 0.5 * offset_score(if *k > 0 { k - 1 } else { *k }),
        Locator::Where(p) => 0.5 * predicate(p),
    }
}

pub fn reference(r: &Ref) -> f64 {
    match r {
        Ref::Just => 1.0,
        Ref::Move(s, c) => source(s) * cursor(c),
        Ref::Find {
            source: s,
            scope,
            locator: l,
            ..
        } => 0.8 * source(s) * cursor(scope) * locator(l),
    }
}

pub fn token(t: &TokenExpr) -> f64 {
    match t {
        TokenExpr::Var(_) => 1.0,
        TokenExpr::Err => 0.95,
        TokenExpr::Const(_) => 0.9,
        TokenExpr::Copy(r) => 0.8 * reference(r),
    }
}

pub fn node(children: impl IntoIterator<Item = f64>) -> f64 {
    children.into_iter().product()
}

pub fn append(base: f64, tail: f64) -> f64 {
    0.9 * base * tail
}

pub fn tree(t: &TreeExpr) -> f64 {
    match t {
        TreeExpr::Copy(r) => reference(r),
        TreeExpr::Leaf(_, tok) => token(tok),
        TreeExpr::Node(_, children) => node(children.iter().map(tree)),
        TreeExpr::Append(r, tail) => append(reference(r), node(tail.iter().map(tree))),
    }
}

pub fn index(i: isize) -> f64 {
    if i >= 0 {
        1.0
    } else {
        0.95
    }
}

pub fn insert(target: f64, index: f64, tree: f64) -> f64 {
    target * index * tree
}

pub fn update(target: f64, tree: f64) -> f64 {
    target * tree
}

pub fn program(p: &Program) -> f64 {
    match p {
        Program::Insert {
            target,
            index: i,
            tree: t,
        } => insert(reference(target), index(*i), tree(t)),
        Program::Delete { target } => reference(target),
        Program::Update { target, tree: t } => update(reference(target), tree(t)),
    }
}
