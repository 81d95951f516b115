//! Witness functions.
//!
//! Each grammar symbol is learned top-down: the witness function of a symbol turns what the
//! examples require of it (the output nodes or texts it must produce) into requirements on its
//! arguments, and the results are intersected across examples. Reference learning is set based:
//! every example yields all references reaching one of its acceptable nodes, and only the ones
//! shared by every example survive.

use super::select::{self, Limits, Selection};
use super::space::{ProgramSpace, TreeSpace};
use super::{Spec, TreeExample};
use crate::compare::Diff;
use crate::config::SynthConfig;
use crate::feature::{self, Feature};
use crate::language::{Cursor, Input, Locator, Ref, Source, TokenExpr};
use crate::matcher::Matching;
use crate::tree::{NodeId, NodeRef, SyntaxKind, SyntaxTree};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::hash::Hash;
use std::rc::Rc;
use std::time::Instant;
use tracing::{debug, warn};

/// Cursors to the lowest shared scopes tried for `Where` locators.
const WHERE_SCOPES: usize = 4;

/// One example with its edit and the output subtrees found in its input.
#[derive(Debug)]
pub struct Context<'a> {
    pub example: &'a TreeExample,
    pub diff: Diff,
    pub matching: Matching,
}

impl<'a> Context<'a> {
    fn input(&self) -> &'a Input {
        &self.example.input
    }

    fn output(&self) -> &'a SyntaxTree {
        &self.example.output
    }
}

#[derive(Debug)]
struct TokenCandidates {
    exprs: Vec<TokenExpr>,
    leaves: Vec<NodeId>,
}

pub struct Learner<'a> {
    contexts: &'a [Context<'a>],
    config: &'a SynthConfig,
    sources: Vec<Source>,
    reach: HashMap<(usize, NodeId), Rc<Vec<Ref>>>,
    tokens: HashMap<(usize, String), Rc<TokenCandidates>>,
    features: HashMap<(usize, NodeId), Rc<BTreeSet<Feature>>>,
    deadline: Option<Instant>,
    timed_out: bool,
}

impl<'a> Learner<'a> {
    pub fn new(
        contexts: &'a [Context<'a>],
        config: &'a SynthConfig,
        deadline: Option<Instant>,
    ) -> Self {
        // a pattern slot is only a usable source if it names a node in every example
        let mut sources = vec![Source::Err];
        if let Some(first) = contexts.first() {
            for key in first.input().env.keys() {
                let source = Source::Var(key);
                if contexts.iter().all(|c| c.input().source(&source).is_some()) {
                    sources.push(source);
                }
            }
        }
        Self {
            contexts,
            config,
            sources,
            reach: HashMap::new(),
            tokens: HashMap::new(),
            features: HashMap::new(),
            deadline,
            timed_out: false,
        }
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    fn expired(&mut self) -> bool {
        if !self.timed_out {
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    warn!("synthesis time budget exhausted");
                    self.timed_out = true;
                }
            }
        }
        self.timed_out
    }

    /// Learns the programs explaining every example's edit.
    pub fn learn_program(&mut self) -> Option<ProgramSpace> {
        let contexts = self.contexts;
        match contexts.first()?.diff {
            Diff::Identical => None,
            Diff::Insert { .. } => {
                let mut parents = Vec::with_capacity(contexts.len());
                let mut indices = Vec::with_capacity(contexts.len());
                let mut nodes = Vec::with_capacity(contexts.len());
                for c in contexts {
                    let Diff::Insert {
                        parent,
                        index,
                        node,
                    } = c.diff
                    else {
                        return None;
                    };
                    let n = c.input().tree.node(parent).child_count() as isize;
                    let k = index as isize;
                    parents.push(Spec::Exact(parent));
                    indices.push(vec![k, k - (n + 1)]);
                    nodes.push(node);
                }
                let targets = self.learn_ref(&parents);
                let indices = intersect_all(indices);
                debug!(targets = targets.len(), indices = ?indices, "insertion point");
                if targets.is_empty() || indices.is_empty() {
                    return None;
                }
                let tree = self.learn_tree(&nodes);
                ProgramSpace::insert(targets, indices, tree)
            }
            Diff::Delete { .. } => {
                let mut nodes = Vec::with_capacity(contexts.len());
                for c in contexts {
                    let Diff::Delete { node, .. } = c.diff else {
                        return None;
                    };
                    nodes.push(Spec::Exact(node));
                }
                ProgramSpace::delete(self.learn_ref(&nodes))
            }
            Diff::Update { .. } => {
                let mut olds = Vec::with_capacity(contexts.len());
                let mut news = Vec::with_capacity(contexts.len());
                for c in contexts {
                    let Diff::Update { old, new } = c.diff else {
                        return None;
                    };
                    olds.push(Spec::Exact(old));
                    news.push(new);
                }
                let targets = self.learn_ref(&olds);
                debug!(targets = targets.len(), "update target");
                if targets.is_empty() {
                    return None;
                }
                let tree = self.learn_tree(&news);
                ProgramSpace::update(targets, tree)
            }
        }
    }

    /// References that, in every example, reach one of the example's acceptable nodes.
    pub fn learn_ref(&mut self, targets: &[Spec<NodeId>]) -> Vec<Ref> {
        if self.expired() {
            return vec![];
        }
        let limit = self.config.max_candidates;
        let mut per_example = Vec::with_capacity(targets.len());
        for (i, spec) in targets.iter().enumerate() {
            // too many acceptable nodes: only the cheap references
            let many = spec.candidates().len() > limit;
            let mut refs = Vec::new();
            for t in spec.candidates() {
                let reach = self.reach(i, *t);
                refs.extend(
                    reach
                        .iter()
                        .filter(|r| !(many && matches!(r, Ref::Find { .. })))
                        .cloned(),
                );
            }
            per_example.push(refs);
        }
        let mut refs = intersect_all(per_example);
        refs.extend(self.learn_where(targets));
        dedup(refs)
    }

    fn reach(&mut self, i: usize, target: NodeId) -> Rc<Vec<Ref>> {
        if let Some(refs) = self.reach.get(&(i, target)) {
            return Rc::clone(refs);
        }
        let input = self.contexts[i].input();
        let t = input.tree.node(target);
        let mut refs = Vec::new();
        for source in &self.sources {
            if let Some(s) = input.source(source) {
                refs.extend(refs_from(source, s, t));
            }
        }
        let refs = Rc::new(refs);
        self.reach.insert((i, target), Rc::clone(&refs));
        refs
    }

    fn learn_where(&mut self, targets: &[Spec<NodeId>]) -> Vec<Ref> {
        let limit = self.config.max_candidates;
        let mut refs = Vec::new();
        for combo in combinations(targets, limit) {
            refs.extend(self.where_refs(&combo));
            if refs.len() >= limit {
                break;
            }
        }
        refs
    }

    // `Find(.., Where(p))` references reaching exactly `targets[i]` in example `i`
    fn where_refs(&mut self, targets: &[NodeId]) -> Vec<Ref> {
        let contexts = self.contexts;
        let nodes: Vec<NodeRef<'a>> = targets
            .iter()
            .zip(contexts)
            .map(|(t, c)| c.input().tree.node(*t))
            .collect();
        let Some(label) = nodes.first().map(|n| n.label()) else {
            return vec![];
        };
        if nodes.iter().any(|n| n.label() != label) {
            return vec![];
        }
        let limits = Limits {
            conjunction: self.config.max_conjunction,
            disjunction: self.config.max_disjunction,
            results: self.config.top_k.max(1),
        };

        let mut refs = Vec::new();
        for source in self.sources.clone() {
            let Some(starts) = contexts
                .iter()
                .map(|c| c.input().source(&source))
                .collect::<Option<Vec<_>>>()
            else {
                continue;
            };
            // ancestors are reached with `Move`
            if starts
                .iter()
                .zip(&nodes)
                .any(|(s, t)| s == t || t.is_ancestor_of(*s))
            {
                continue;
            }
            let scopes = intersect_all(starts.iter().zip(&nodes).map(|(s, t)| {
                let lca = s.lca(*t);
                std::iter::once(lca)
                    .chain(lca.ancestors())
                    .flat_map(|a| cursors(*s, a))
                    .collect::<Vec<_>>()
            }));

            for scope in scopes.into_iter().take(WHERE_SCOPES) {
                let mut selections = Vec::with_capacity(nodes.len());
                for (i, (s, t)) in starts.iter().zip(&nodes).enumerate() {
                    let Some(root) = scope.run(*s) else {
                        break;
                    };
                    let candidates: Vec<NodeRef<'a>> =
                        root.descendants().filter(|n| n.label() == label).collect();
                    let Some(p) = candidates.iter().position(|c| c == t) else {
                        break;
                    };
                    let err = contexts[i].input().err_node();
                    let target = self.features_of(i, *t, err);
                    let before = candidates[..p]
                        .iter()
                        .map(|c| self.features_of(i, *c, err))
                        .collect();
                    selections.push(Selection { target, before });
                }
                // `Nth(1)` already covers targets that come first everywhere
                if selections.len() < nodes.len()
                    || selections.iter().all(|s| s.before.is_empty())
                {
                    continue;
                }
                for predicate in select::learn_predicates(&selections, limits) {
                    refs.push(Ref::Find {
                        source: source.clone(),
                        scope: scope.clone(),
                        label: label.clone(),
                        locator: Locator::Where(predicate),
                    });
                }
            }
        }
        refs
    }

    fn features_of(
        &mut self,
        i: usize,
        node: NodeRef<'_>,
        err: NodeRef<'_>,
    ) -> Rc<BTreeSet<Feature>> {
        Rc::clone(
            self.features
                .entry((i, node.id()))
                .or_insert_with(|| Rc::new(feature::features(node, err))),
        )
    }

    /// Token expressions producing `codes[i]` in example `i`.
    pub fn learn_token(&mut self, codes: &[&str]) -> Vec<TokenExpr> {
        let candidates: Vec<Rc<TokenCandidates>> = codes
            .iter()
            .enumerate()
            .map(|(i, code)| self.token_candidates(i, code))
            .collect();
        let mut exprs = intersect_all(candidates.iter().map(|c| c.exprs.clone()));
        if candidates.iter().all(|c| !c.leaves.is_empty()) {
            let leaves: Vec<Spec<NodeId>> = candidates
                .iter()
                .map(|c| Spec::OneOf(c.leaves.clone()))
                .collect();
            // `Just` and `Move($k, Abs(0))` only restate `Err` and `Var`
            exprs.extend(
                self.learn_ref(&leaves)
                    .into_iter()
                    .filter(|r| !matches!(r, Ref::Just | Ref::Move(_, Cursor::Abs(0))))
                    .map(TokenExpr::Copy),
            );
        }
        exprs
    }

    fn token_candidates(&mut self, i: usize, code: &str) -> Rc<TokenCandidates> {
        let key = (i, code.to_string());
        if let Some(c) = self.tokens.get(&key) {
            return Rc::clone(c);
        }
        let input = self.contexts[i].input();
        let mut exprs = vec![TokenExpr::Const(code.to_string())];
        exprs.extend(input.env.keys_for(code).map(TokenExpr::Var));
        if input.err_node().code() == code {
            exprs.push(TokenExpr::Err);
        }
        let leaves = input
            .tree
            .root()
            .leaves()
            .filter(|l| l.code() == code)
            .map(|l| l.id())
            .collect();
        let candidates = Rc::new(TokenCandidates { exprs, leaves });
        self.tokens.insert(key, Rc::clone(&candidates));
        candidates
    }

    /// Tree expressions producing the output subtree `targets[i]` in example `i`.
    pub fn learn_tree(&mut self, targets: &[NodeId]) -> TreeSpace {
        if self.expired() {
            return TreeSpace::empty();
        }
        let contexts = self.contexts;
        let outs: Vec<NodeRef<'a>> = targets
            .iter()
            .zip(contexts)
            .map(|(t, c)| c.output().node(*t))
            .collect();
        let mut branches = Vec::new();

        let matches: Vec<Spec<NodeId>> = targets
            .iter()
            .zip(contexts)
            .map(|(t, c)| Spec::OneOf(c.matching.get(*t).iter().copied().collect()))
            .collect();
        let mut copied = false;
        if matches.iter().all(|m| !m.is_empty()) {
            let copy = TreeSpace::copy(self.learn_ref(&matches));
            copied = !copy.is_empty();
            branches.push(copy);
        }

        let first = outs[0];
        let label = first.label();
        if outs.iter().all(|o| o.kind() == first.kind() && o.label() == label) {
            match first.kind() {
                SyntaxKind::Token => {
                    let codes: Vec<&str> = outs.iter().map(|o| o.code()).collect();
                    branches.push(TreeSpace::leaf(label.clone(), self.learn_token(&codes)));
                }
                // a copyable subtree is not rebuilt
                SyntaxKind::Node if !copied => {
                    let n = first.child_count();
                    if outs.iter().all(|o| o.child_count() == n) {
                        let children: Option<Vec<TreeSpace>> =
                            (0..n).map(|j| self.learn_child(&outs, j)).collect();
                        if let Some(children) = children {
                            branches.push(TreeSpace::node(label.clone(), children));
                        }
                    }
                    branches.extend(self.learn_append(&outs));
                }
                _ => {}
            }
        }
        TreeSpace::union(branches)
    }

    fn learn_child(&mut self, outs: &[NodeRef<'a>], j: usize) -> Option<TreeSpace> {
        let ids: Vec<NodeId> = outs
            .iter()
            .map(|o| o.child(j).map(|c| c.id()))
            .collect::<Option<_>>()?;
        let space = self.learn_tree(&ids);
        (!space.is_empty()).then_some(space)
    }

    // copies of an input node whose children are a prefix of the output's, plus the rest
    fn learn_append(&mut self, outs: &[NodeRef<'a>]) -> Vec<TreeSpace> {
        let contexts = self.contexts;
        let n = outs[0].child_count();
        if outs.iter().any(|o| o.child_count() != n) {
            return vec![];
        }
        let mut spaces = Vec::new();
        for tail in 1..=self.config.max_append.min(n.saturating_sub(1)) {
            let keep = n - tail;
            let bases: Vec<Spec<NodeId>> = outs
                .iter()
                .zip(contexts)
                .map(|(o, c)| Spec::OneOf(prefix_bases(&c.input().tree, *o, keep)))
                .collect();
            if bases.iter().any(Spec::is_empty) {
                continue;
            }
            let refs = self.learn_ref(&bases);
            if refs.is_empty() {
                continue;
            }
            let tail: Option<Vec<TreeSpace>> =
                (keep..n).map(|j| self.learn_child(outs, j)).collect();
            if let Some(tail) = tail {
                spaces.push(TreeSpace::append(refs, tail));
            }
        }
        spaces
    }
}

// every reference from `s`, the node of `source`, to `t`
fn refs_from<'t>(source: &Source, s: NodeRef<'t>, t: NodeRef<'t>) -> Vec<Ref> {
    if s == t {
        return match source {
            Source::Err => vec![Ref::Just],
            Source::Var(_) => vec![Ref::Move(source.clone(), Cursor::Abs(0))],
        };
    }
    if t.is_ancestor_of(s) {
        return cursors(s, t)
            .into_iter()
            .map(|c| Ref::Move(source.clone(), c))
            .collect();
    }
    let mut refs = Vec::new();
    let lca = s.lca(t);
    for scope in std::iter::once(lca).chain(lca.ancestors()) {
        let candidates: Vec<NodeRef<'t>> = scope
            .descendants()
            .filter(|n| n.label() == t.label())
            .collect();
        let Some(p) = candidates.iter().position(|c| *c == t) else {
            continue;
        };
        let p = p as isize;
        let locators = [
            Locator::Nth(p + 1),
            Locator::Nth(p - candidates.len() as isize),
        ];
        for cursor in cursors(s, scope) {
            for locator in &locators {
                refs.push(Ref::Find {
                    source: source.clone(),
                    scope: cursor.clone(),
                    label: t.label().clone(),
                    locator: locator.clone(),
                });
            }
        }
    }
    refs
}

// cursors from `from` to its ancestor-or-self `to`, label-relative first
fn cursors(from: NodeRef<'_>, to: NodeRef<'_>) -> Vec<Cursor> {
    let dist = from.depth() - to.depth();
    if dist == 0 {
        return vec![Cursor::Abs(0)];
    }
    let k = from
        .ancestors()
        .take(dist)
        .filter(|a| a.label() == to.label())
        .count();
    vec![Cursor::Rel(to.label().clone(), k), Cursor::Abs(dist)]
}

fn prefix_bases(input: &SyntaxTree, out: NodeRef<'_>, keep: usize) -> Vec<NodeId> {
    input
        .root()
        .subtrees()
        .filter(|s| {
            s.kind() == SyntaxKind::Node
                && s.label() == out.label()
                && s.child_count() == keep
                && s.children().zip(out.children()).all(|(a, b)| a.identical_to(b))
        })
        .map(|s| s.id())
        .collect()
}

// one acceptable node per example, at most `limit` combinations
fn combinations(specs: &[Spec<NodeId>], limit: usize) -> Vec<Vec<NodeId>> {
    let mut acc: Vec<Vec<NodeId>> = vec![vec![]];
    for spec in specs {
        acc = acc
            .iter()
            .flat_map(|prefix| {
                spec.candidates().iter().map(move |c| {
                    let mut next = prefix.clone();
                    next.push(*c);
                    next
                })
            })
            .take(limit)
            .collect();
    }
    acc
}

/// The elements of the first set present in all others, in first-set order.
fn intersect_all<T: Clone + Eq + Hash>(sets: impl IntoIterator<Item = Vec<T>>) -> Vec<T> {
    let mut sets = sets.into_iter();
    let Some(first) = sets.next() else {
        return vec![];
    };
    let mut acc = dedup(first);
    for set in sets {
        if acc.is_empty() {
            break;
        }
        let set: HashSet<T> = set.into_iter().collect();
        acc.retain(|x| set.contains(x));
    }
    acc
}

fn dedup<T: Clone + Eq + Hash>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|x| seen.insert(x.clone())).collect()
}
