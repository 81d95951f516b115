//! Learning the selection predicates of `Find(.., Where(p))`.
//!
//! In every example a target node has to be told apart from the candidates that precede it in
//! preorder. A predicate is a disjunction of conjunctions of features; each conjunction covers a
//! group of examples and rejects every preceding candidate of every example, so the first
//! candidate satisfying the predicate is always the target.

use crate::feature::Feature;
use crate::language::Predicate;
use std::collections::BTreeSet;
use std::rc::Rc;

/// The features of the target in one example, and those of the candidates before it.
#[derive(Debug, Clone)]
pub struct Selection {
    pub target: Rc<BTreeSet<Feature>>,
    pub before: Vec<Rc<BTreeSet<Feature>>>,
}

/// Bounds on the predicates considered.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub conjunction: usize,
    pub disjunction: usize,
    pub results: usize,
}

/// Predicates that select the target in every example, fewest disjuncts first.
pub fn learn_predicates(selections: &[Selection], limits: Limits) -> Vec<Predicate> {
    if selections.is_empty() || limits.conjunction == 0 || limits.results == 0 {
        return vec![];
    }
    let negatives: Vec<&BTreeSet<Feature>> = selections
        .iter()
        .flat_map(|s| s.before.iter().map(|f| f.as_ref()))
        .collect();

    for k in 1..=limits.disjunction.min(selections.len()) {
        let mut found = Vec::new();
        for groups in partitions(selections.len(), k) {
            let options: Vec<Vec<Vec<Feature>>> = groups
                .iter()
                .map(|group| conjunctions(selections, group, &negatives, limits.conjunction))
                .collect();
            if options.iter().any(|o| o.is_empty()) {
                continue;
            }
            for choice in choices(&options, limits.results - found.len()) {
                let predicate = choice
                    .into_iter()
                    .map(|conj| Predicate::all(conj.iter().cloned()))
                    .reduce(Predicate::or)
                    .unwrap_or(Predicate::True);
                found.push(predicate);
            }
            if found.len() >= limits.results {
                break;
            }
        }
        if !found.is_empty() {
            return found;
        }
    }
    vec![]
}

// the smallest conjunctions of features shared by the group's targets that reject all negatives
fn conjunctions(
    selections: &[Selection],
    group: &[usize],
    negatives: &[&BTreeSet<Feature>],
    max: usize,
) -> Vec<Vec<Feature>> {
    let Some((first, rest)) = group.split_first() else {
        return vec![];
    };
    let common: Vec<&Feature> = selections[*first]
        .target
        .iter()
        .filter(|f| rest.iter().all(|i| selections[*i].target.contains(*f)))
        .collect();
    let rejects_all = |conj: &[&Feature]| {
        negatives
            .iter()
            .all(|neg| !conj.iter().all(|f| neg.contains(*f)))
    };

    let mut out: Vec<Vec<Feature>> = Vec::new();
    // a feature that works alone is never combined with others
    let mut useful = Vec::new();
    for f in &common {
        if rejects_all(&[*f]) {
            out.push(vec![(*f).clone()]);
        } else {
            useful.push(*f);
        }
    }
    if max >= 2 && out.is_empty() {
        for (i, a) in useful.iter().enumerate() {
            for b in &useful[i + 1..] {
                if rejects_all(&[*a, *b]) {
                    out.push(vec![(*a).clone(), (*b).clone()]);
                }
            }
        }
    }
    out
}

// one option per group, at most `limit` combinations
fn choices<T: Clone>(options: &[Vec<T>], limit: usize) -> Vec<Vec<T>> {
    let mut acc: Vec<Vec<T>> = vec![vec![]];
    for opts in options {
        acc = acc
            .iter()
            .flat_map(|prefix| {
                opts.iter().map(move |o| {
                    let mut next = prefix.clone();
                    next.push(o.clone());
                    next
                })
            })
            .take(limit)
            .collect();
    }
    acc
}

/// All partitions of `0..n` into exactly `k` non-empty groups.
///
/// Groups are listed by their smallest element, so every partition appears once.
pub fn partitions(n: usize, k: usize) -> Vec<Vec<Vec<usize>>> {
    fn go(i: usize, used: usize, k: usize, assign: &mut [usize], out: &mut Vec<Vec<Vec<usize>>>) {
        let n = assign.len();
        if n - i < k - used {
            return;
        }
        if i == n {
            let mut groups = vec![Vec::new(); k];
            for (elem, group) in assign.iter().enumerate() {
                groups[*group].push(elem);
            }
            out.push(groups);
            return;
        }
        for group in 0..(used + 1).min(k) {
            assign[i] = group;
            go(i + 1, used.max(group + 1), k, assign, out);
        }
    }

    let mut out = Vec::new();
    if k == 0 || k > n {
        return out;
    }
    go(0, 0, k, &mut vec![0; n], &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::testing::label;
    use Feature::*;

    fn set(features: &[Feature]) -> Rc<BTreeSet<Feature>> {
        Rc::new(features.iter().cloned().collect())
    }

    fn limits() -> Limits {
        Limits {
            conjunction: 2,
            disjunction: 2,
            results: 8,
        }
    }

    #[test]
    fn partition_counts() {
        // Stirling numbers of the second kind
        assert_eq!(partitions(3, 1), vec![vec![vec![0, 1, 2]]]);
        assert_eq!(partitions(3, 2).len(), 3);
        assert_eq!(partitions(4, 2).len(), 7);
        assert_eq!(partitions(5, 3).len(), 25);
        assert!(partitions(2, 3).is_empty());
        for groups in partitions(4, 2) {
            assert!(groups.iter().all(|g| !g.is_empty()));
            assert_eq!(groups.iter().map(Vec::len).sum::<usize>(), 4);
        }
    }

    #[test]
    fn single_feature() {
        let in_method = SubKindOf(label("method"));
        let in_field = SubKindOf(label("field"));
        let selections = [
            Selection {
                target: set(&[in_method.clone(), SiblingErrToken]),
                before: vec![set(&[in_field.clone()])],
            },
            Selection {
                target: set(&[in_method.clone()]),
                before: vec![set(&[in_field.clone()]), set(&[in_field])],
            },
        ];
        let ps = learn_predicates(&selections, limits());
        assert_eq!(ps, vec![Predicate::Has(in_method)]);
    }

    #[test]
    fn conjunction_when_no_single_feature_works() {
        let a = SubKindOf(label("stmt"));
        let b = SiblingLeaf(label("semi"), ";".into());
        let selections = [Selection {
            target: set(&[a.clone(), b.clone()]),
            before: vec![set(&[a.clone()]), set(&[b.clone()])],
        }];
        let ps = learn_predicates(&selections, limits());
        assert_eq!(ps, vec![Predicate::all([a, b])]);
    }

    #[test]
    fn disjunction_across_examples() {
        let a = SuperKindOf(label("call"));
        let b = SuperKindOf(label("id"));
        let selections = [
            Selection {
                target: set(&[a.clone()]),
                before: vec![set(&[b.clone()])],
            },
            Selection {
                target: set(&[b.clone()]),
                before: vec![set(&[a.clone()])],
            },
        ];
        // each feature appears among the other example's negatives
        assert!(learn_predicates(&selections, limits()).is_empty());

        let c = SuperKindOf(label("lit"));
        let selections = [
            Selection {
                target: set(&[a.clone()]),
                before: vec![set(&[c.clone()])],
            },
            Selection {
                target: set(&[b.clone()]),
                before: vec![set(&[c])],
            },
        ];
        let ps = learn_predicates(&selections, limits());
        assert_eq!(ps, vec![Predicate::Has(a).or(Predicate::Has(b))]);
    }

    #[test]
    fn respects_limits() {
        let a = SubKindOf(label("stmt"));
        let b = SiblingLeaf(label("semi"), ";".into());
        let selections = [Selection {
            target: set(&[a.clone(), b.clone()]),
            before: vec![set(&[a]), set(&[b])],
        }];
        let one = Limits {
            conjunction: 1,
            ..limits()
        };
        assert!(learn_predicates(&selections, one).is_empty());
    }
}
