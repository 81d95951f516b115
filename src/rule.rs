//! Rules: an error pattern together with the programs learned from one group of examples.
//!
//! A [`RuleSet`] applies to an error whose message matches its pattern. The captured text is bound
//! into the programs' environment and the programs are tried best first. A [`RuleLib`] holds many
//! rules and uses a [`Checker`] (typically the compiler) to decide which candidate fix to keep,
//! optionally following the next error the checker reports.

use crate::config::SynthConfig;
use crate::error::{Error, Result, MAX_EXAMPLES};
use crate::language::Input;
use crate::pattern::ErrPattern;
use crate::synth::{self, RankedProgram, TreeExample};
use crate::tree::{NodeId, Pos, SyntaxTree};
use crate::TreeProgram;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

/// A broken tree, the leaf the compiler complained about, its message, and the fixed tree.
#[derive(Debug, Clone)]
pub struct Example {
    pub input: SyntaxTree,
    pub err: NodeId,
    pub message: String,
    pub output: SyntaxTree,
}

impl Example {
    /// Creates an example, locating the error leaf at `err_pos`.
    pub fn new(
        mut input: SyntaxTree,
        err_pos: Pos,
        message: impl Into<String>,
        output: SyntaxTree,
    ) -> Result<Self> {
        let err = input.locate_err(err_pos)?;
        Ok(Self {
            input,
            err,
            message: message.into(),
            output,
        })
    }

    // text a message token may be quoting
    fn source_text(&self) -> String {
        format!("{} {}", self.input.source_text(), self.output.source_text())
    }
}

/// Examples of one kind of fix, learned together into one rule.
#[derive(Debug, Clone)]
pub struct ExampleGroup {
    pub name: String,
    examples: Vec<Example>,
}

impl ExampleGroup {
    pub fn new(name: impl Into<String>, examples: Vec<Example>) -> Result<Self> {
        if examples.is_empty() {
            return Err(Error::EmptyGroup);
        }
        if examples.len() > MAX_EXAMPLES {
            return Err(Error::TooManyExamples(examples.len()));
        }
        Ok(Self {
            name: name.into(),
            examples,
        })
    }

    pub fn examples(&self) -> &[Example] {
        &self.examples
    }
}

/// A learned rule. Immutable once learned; a rule without programs never applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub name: String,
    pub pattern: ErrPattern,
    pub programs: Vec<RankedProgram>,
}

impl RuleSet {
    /// Learns a rule from a group of examples.
    ///
    /// Failing to generalize the messages or the edits is not an error: the result is an empty
    /// rule. Use [`try_learn`](Self::try_learn) to tell the two apart.
    pub fn learn(group: &ExampleGroup, config: &SynthConfig) -> Self {
        Self::try_learn(group, config).unwrap_or_else(|e| {
            warn!(rule = %group.name, error = %e, "cannot generalize the error messages");
            Self::empty(&group.name)
        })
    }

    /// Learns a rule from a group of examples, failing with [`Error::Pattern`] when the messages
    /// have no common pattern.
    pub fn try_learn(group: &ExampleGroup, config: &SynthConfig) -> Result<Self> {
        let span = info_span!("rule", name = %group.name);
        let _enter = span.enter();

        let messages: Vec<&str> = group.examples.iter().map(|e| e.message.as_str()).collect();
        let sources: Vec<String> = group.examples.iter().map(Example::source_text).collect();
        let pattern = ErrPattern::synthesize(&messages, &sources)?;

        let examples: Vec<TreeExample> = group
            .examples
            .iter()
            .map(|e| {
                let env = pattern.matches(&e.message).unwrap_or_default();
                TreeExample::new(Input::new(e.input.clone(), e.err, env), e.output.clone())
            })
            .collect();
        let programs = synth::learn(&examples, config);
        info!(%pattern, programs = programs.len(), "learned rule");
        Ok(Self {
            name: group.name.clone(),
            pattern,
            programs,
        })
    }

    fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            pattern: ErrPattern::default(),
            programs: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// The trees produced by the rule's programs, best program first.
    ///
    /// Nothing is produced if `message` does not match the pattern; programs that fail on this
    /// input are skipped.
    pub fn candidates<'r>(
        &'r self,
        tree: &SyntaxTree,
        err: NodeId,
        message: &str,
    ) -> impl Iterator<Item = SyntaxTree> + 'r {
        let input = self
            .pattern
            .matches(message)
            .map(|env| Input::new(tree.clone(), err, env));
        if input.is_none() {
            debug!(rule = %self.name, error = message, "message does not match");
        }
        self.programs
            .iter()
            .filter_map(move |p| p.run(input.as_ref()?))
    }

    /// The output of the best program that applies.
    pub fn try_apply(&self, tree: &SyntaxTree, err: NodeId, message: &str) -> Option<SyntaxTree> {
        self.candidates(tree, err, message).next()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Learns one rule per group, in parallel. Results are in group order.
pub fn learn_groups(groups: &[ExampleGroup], config: &SynthConfig) -> Vec<RuleSet> {
    groups
        .par_iter()
        .map(|group| RuleSet::learn(group, config))
        .collect()
}

/// The judgement of a checker on a candidate fix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Ok,
    /// The first remaining error.
    Error { pos: Pos, message: String },
}

/// Judges candidate fixes, usually by compiling them.
pub trait Checker {
    fn check(&self, tree: &SyntaxTree) -> Verdict;
}

impl<F> Checker for F
where
    F: Fn(&SyntaxTree) -> Verdict,
{
    fn check(&self, tree: &SyntaxTree) -> Verdict {
        self(tree)
    }
}

/// The outcome of applying a rule library.
#[derive(Debug, Clone)]
pub enum Applied {
    /// The checker accepted `tree`. `rule` names the rules applied, in order, joined by `" + "`.
    Success {
        rule: String,
        attempts: usize,
        tree: SyntaxTree,
    },
    /// Some rule matched, but no candidate was accepted.
    Failure { attempts: usize },
    /// No rule matched the message.
    NotApplicable,
}

enum Step {
    Fixed(String, SyntaxTree),
    // a candidate that moved the error elsewhere
    Progress(String, SyntaxTree, Pos, String),
    Stuck,
    Unmatched,
}

/// A collection of rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleLib {
    rules: Vec<RuleSet>,
}

impl RuleLib {
    pub fn new(rules: Vec<RuleSet>) -> Self {
        Self { rules }
    }

    /// Learns a library from example groups, dropping the rules that learned nothing.
    pub fn learn(groups: &[ExampleGroup], config: &SynthConfig) -> Self {
        let rules: Vec<RuleSet> = learn_groups(groups, config)
            .into_iter()
            .filter(|r| !r.is_empty())
            .collect();
        info!(groups = groups.len(), rules = rules.len(), "learned rule library");
        Self::new(rules)
    }

    pub fn rules(&self) -> &[RuleSet] {
        &self.rules
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Tries the candidates of every rule matching `message`, in rule order and then rank order,
    /// until `checker` accepts one.
    pub fn apply<C: Checker>(
        &self,
        tree: &SyntaxTree,
        err: NodeId,
        message: &str,
        checker: &C,
    ) -> Applied {
        let mut attempts = 0;
        match self.step(tree, err, message, checker, &mut attempts) {
            Step::Fixed(rule, tree) => Applied::Success {
                rule,
                attempts,
                tree,
            },
            Step::Unmatched => Applied::NotApplicable,
            Step::Progress(..) | Step::Stuck => Applied::Failure { attempts },
        }
    }

    /// Like [`apply`](Self::apply), but when no candidate is accepted, continues from the first
    /// candidate that moved the error, up to [`max_chain`](SynthConfig::max_chain) rule
    /// applications.
    pub fn apply_chained<C: Checker>(
        &self,
        tree: &SyntaxTree,
        pos: Pos,
        message: &str,
        checker: &C,
        config: &SynthConfig,
    ) -> Applied {
        let mut tree = tree.clone();
        let mut pos = pos;
        let mut message = message.to_string();
        let mut applied: Vec<String> = Vec::new();
        let mut attempts = 0;

        for depth in 0..config.max_chain {
            let Some(err) = tree.find_leaf_at(pos) else {
                warn!(%pos, "no leaf at the reported error position");
                break;
            };
            match self.step(&tree, err, &message, checker, &mut attempts) {
                Step::Fixed(rule, fixed) => {
                    applied.push(rule);
                    return Applied::Success {
                        rule: applied.join(" + "),
                        attempts,
                        tree: fixed,
                    };
                }
                Step::Progress(rule, next, next_pos, next_message) => {
                    debug!(depth, %rule, next = %next_pos, "following the next error");
                    applied.push(rule);
                    tree = next;
                    pos = next_pos;
                    message = next_message;
                }
                Step::Unmatched if depth == 0 => return Applied::NotApplicable,
                Step::Unmatched | Step::Stuck => break,
            }
        }
        Applied::Failure { attempts }
    }

    fn step<C: Checker>(
        &self,
        tree: &SyntaxTree,
        err: NodeId,
        message: &str,
        checker: &C,
        attempts: &mut usize,
    ) -> Step {
        let err_pos = tree.get(err).and_then(|n| n.pos());
        let mut matched = false;
        let mut progress = None;
        for rule in &self.rules {
            if rule.pattern.matches(message).is_none() {
                continue;
            }
            matched = true;
            for candidate in rule.candidates(tree, err, message) {
                *attempts += 1;
                match checker.check(&candidate) {
                    Verdict::Ok => {
                        info!(rule = %rule.name, attempts = *attempts, "fixed");
                        return Step::Fixed(rule.name.clone(), candidate);
                    }
                    Verdict::Error { pos, message: next } => {
                        let moved = Some(pos) != err_pos || next != message;
                        if moved && progress.is_none() {
                            progress =
                                Some(Step::Progress(rule.name.clone(), candidate, pos, next));
                        }
                    }
                }
            }
        }
        match progress {
            _ if !matched => Step::Unmatched,
            Some(step) => step,
            None => Step::Stuck,
        }
    }
}
