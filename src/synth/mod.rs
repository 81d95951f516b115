//! Learns tree transformation programs from input-output examples.
//!
//! Learning works in three steps:
//!
//! 1. Every example is [classified](crate::compare::classify) as a single insertion, deletion or
//!    update. All examples must agree on the kind of edit, otherwise nothing is learned.
//! 2. Witness functions build a version space holding every program of the
//!    [language](crate::language) that explains all examples, intersecting the per-example
//!    choices for each grammar symbol.
//! 3. The best programs of the space are [ranked](crate::rank), and the ones that reproduce every
//!    example's output exactly are returned, best first.
//!
//! ```
//! use treefix::TreeProgram;
//! use treefix::config::SynthConfig;
//! use treefix::language::{Env, Input};
//! use treefix::synth::{self, TreeExample};
//! use treefix::tree::{Label, PartialNode, SyntaxTree};
//!
//! // a statement `<id> = <num>` that lacks its semicolon, with the error at the number
//! fn example(var: &str, num: &str, fixed: bool) -> SyntaxTree {
//!     let mut children = vec![
//!         PartialNode::token(Label::new(1, "id"), var),
//!         PartialNode::token(Label::new(2, "eq"), "="),
//!         PartialNode::token(Label::new(3, "num"), num),
//!     ];
//!     if fixed {
//!         children.push(PartialNode::token(Label::new(4, "semi"), ";"));
//!     }
//!     SyntaxTree::instantiate(PartialNode::node(Label::new(0, "stmt"), children))
//! }
//!
//! let input = |var, num| {
//!     let tree = example(var, num, false);
//!     let err = tree.root().child(2).unwrap().id();
//!     Input::new(tree, err, Env::new())
//! };
//! let examples = [
//!     TreeExample::new(input("x", "1"), example("x", "1", true)),
//!     TreeExample::new(input("y", "2"), example("y", "2", true)),
//! ];
//!
//! let programs = synth::learn(&examples, &SynthConfig::default());
//! let best = &programs[0];
//! assert_eq!(best.program.to_string(), r#"Insert(Move(err, Rel(stmt, 1)), 3, Leaf(semi, ";"))"#);
//!
//! let fixed = best.run(&input("z", "3")).unwrap();
//! assert_eq!(fixed.source_text(), "z = 3 ;");
//! ```

mod select;
mod space;
mod witness;

pub use space::{ProgramSpace, Scored, TreeSpace};

use crate::compare::{classify, Diff};
use crate::config::SynthConfig;
use crate::language::{Input, Program};
use crate::matcher::match_subtrees;
use crate::tree::SyntaxTree;
use crate::TreeProgram;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, info_span};
use witness::{Context, Learner};

/// A broken input and its fixed output.
#[derive(Debug, Clone)]
pub struct TreeExample {
    pub input: Input,
    pub output: SyntaxTree,
}

impl TreeExample {
    pub fn new(input: Input, output: SyntaxTree) -> Self {
        Self { input, output }
    }

    /// Whether `program` turns this example's input into exactly its output.
    pub fn accepts<P: TreeProgram>(&self, program: &P) -> bool {
        program
            .run(&self.input)
            .is_some_and(|out| out.identical_to(&self.output))
    }
}

/// A learned program and its [rank](crate::rank) score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedProgram {
    pub program: Program,
    pub score: f64,
}

impl crate::private::Sealed for RankedProgram {}

impl TreeProgram for RankedProgram {
    fn run(&self, input: &Input) -> Option<SyntaxTree> {
        self.program.run(input)
    }
}

/// What a grammar symbol must produce in one example: one specific value, or any of several.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Spec<T> {
    Exact(T),
    OneOf(Vec<T>),
}

impl<T> Spec<T> {
    pub fn candidates(&self) -> &[T] {
        match self {
            Spec::Exact(t) => std::slice::from_ref(t),
            Spec::OneOf(ts) => ts,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.candidates().is_empty()
    }
}

/// Learns programs consistent with all `examples`, best first.
///
/// At most [`top_k`](SynthConfig::top_k) programs are returned, each verified to reproduce every
/// example's output. The result is empty when no program of the language explains all examples,
/// when an example does not change its input, or when the time budget runs out.
pub fn learn(examples: &[TreeExample], config: &SynthConfig) -> Vec<RankedProgram> {
    let span = info_span!("learn", examples = examples.len());
    let _enter = span.enter();
    let start = Instant::now();

    let Some(space) = learn_space(examples, config) else {
        info!("no program explains the examples");
        return vec![];
    };
    // verification can reject top-ranked programs, so look a little deeper
    let pool = space.top_k(config.top_k.saturating_mul(4));
    let programs: Vec<RankedProgram> = pool
        .into_iter()
        .filter(|(program, _)| examples.iter().all(|e| e.accepts(program)))
        .take(config.top_k)
        .map(|(program, score)| RankedProgram { program, score })
        .collect();
    info!(
        programs = programs.len(),
        space = %space.size(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "learned programs"
    );
    programs
}

/// Learns the version space of programs explaining all `examples`, without ranking it.
pub fn learn_space(examples: &[TreeExample], config: &SynthConfig) -> Option<ProgramSpace> {
    let deadline = config.time_budget().map(|budget| Instant::now() + budget);

    let mut diffs = Vec::with_capacity(examples.len());
    for e in examples {
        let diff = classify(e.input.tree.root(), e.output.root());
        if diff == Diff::Identical {
            debug!("example output is identical to its input");
            return None;
        }
        diffs.push(diff);
    }
    let first = *diffs.first()?;
    if !diffs.iter().all(|d| d.same_kind(&first)) {
        debug!("examples disagree on the kind of edit");
        return None;
    }

    let contexts: Vec<Context<'_>> = examples
        .iter()
        .zip(diffs)
        .map(|(example, diff)| Context {
            example,
            diff,
            matching: match_subtrees(&example.output, &example.input.tree),
        })
        .collect();
    let mut learner = Learner::new(&contexts, config, deadline);
    let space = learner.learn_program();
    if learner.timed_out() {
        return None;
    }
    if let Some(space) = &space {
        debug!(size = %space.size(), "version space");
    }
    space
}
