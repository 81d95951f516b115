//! Learning syntactic fixes for compilation errors from examples.
//!
//! This crate learns tree transformations that repair compilation errors. Each example pairs a
//! broken program (as a concrete syntax tree), the position and message of the error the compiler
//! reported, and the fixed program. From a handful of examples of the same kind of error, the
//! crate learns a [rule](rule::RuleSet): a pattern over error messages together with a ranked list
//! of programs that, given a new tree with a matching error, produce a candidate fix.
//!
//! Programs are expressed in a small [language](language) of insertions, deletions and updates of
//! subtrees located relative to the error. Programs are learned by [deductive
//! synthesis](synth): the single edit demonstrated by each example is [classified](compare), and
//! the programs explaining every example are collected into a version space, from which the
//! best-[ranked](rank) ones are kept.
//!
//! For example, a statement that lacks its semicolon is reported at its last token. Two examples
//! of the fix are enough to learn a rule that inserts the semicolon as the last child of the
//! statement enclosing the error, whatever the statement's length:
//!
//! ```
//! use treefix::config::SynthConfig;
//! use treefix::rule::{Example, ExampleGroup, RuleSet};
//! use treefix::tree::{Label, PartialNode, Pos, SyntaxTree};
//!
//! # fn main() -> treefix::error::Result<()> {
//! // a single statement on line 1, tokens separated by one space
//! fn stmt(tokens: &[(u32, &str, &str)]) -> SyntaxTree {
//!     let mut column = 1;
//!     let children = tokens
//!         .iter()
//!         .map(|(id, name, code)| {
//!             let pos = Pos::new(1, column);
//!             column += code.len() + 1;
//!             PartialNode::token(Label::new(*id, *name), *code).at(pos)
//!         })
//!         .collect();
//!     SyntaxTree::instantiate(PartialNode::node(Label::new(0, "stmt"), children))
//! }
//! let semi = (1, "semi", ";");
//! let (x, f, a) = ((2, "id", "x"), (2, "id", "f"), (2, "id", "a"));
//! let (eq, num) = ((3, "eq", "="), (4, "num", "1"));
//! let (lpar, rpar) = ((5, "lpar", "("), (6, "rpar", ")"));
//!
//! let group = ExampleGroup::new(
//!     "missing semicolon",
//!     vec![
//!         Example::new(
//!             stmt(&[x, eq, num]),
//!             Pos::new(1, 5),
//!             "; expected",
//!             stmt(&[x, eq, num, semi]),
//!         )?,
//!         Example::new(
//!             stmt(&[f, lpar, a, rpar]),
//!             Pos::new(1, 7),
//!             "; expected",
//!             stmt(&[f, lpar, a, rpar, semi]),
//!         )?,
//!     ],
//! )?;
//! let rule = RuleSet::learn(&group, &SynthConfig::default());
//!
//! let mut broken = stmt(&[x, eq, lpar, num, rpar]);
//! let err = broken.locate_err(Pos::new(1, 9))?;
//! let fixed = rule.try_apply(&broken, err, "; expected").unwrap();
//! assert_eq!(fixed.source_text(), "x = ( 1 ) ;");
//! # Ok(())
//! # }
//! ```
//!
//! Rules can be saved as JSON, collected into a [`RuleLib`](rule::RuleLib), and applied with a
//! checker (usually the compiler) that accepts or rejects each candidate fix.

pub mod compare;
pub mod config;
pub mod error;
pub mod feature;
pub mod language;
pub mod matcher;
pub mod pattern;
pub mod rank;
pub mod rule;
pub mod synth;
pub mod tree;

pub use error::{Error, Result};

use language::Input;
use tree::SyntaxTree;

/// A program that transforms a syntax tree.
///
/// This trait is sealed and not meant to be implemented outside this crate.
pub trait TreeProgram: private::Sealed {
    /// Runs the program on the given input.
    ///
    /// A learned program need not apply to every tree: it may ask for the third ancestor of an
    /// error leaf that is only two levels deep, or for a pattern slot the message did not bind.
    /// Such programs return `None`. Nobody reads the reason a synthesized program failed; the
    /// caller moves on to the next-ranked candidate.
    fn run(&self, input: &Input) -> Option<SyntaxTree>;
}

mod private {
    pub trait Sealed {}
}
