//! Error types for treefix.
//!
//! Only conditions that abort a learning or apply task are errors. A grammar symbol that cannot be
//! unified across examples, or a program that fails on a particular input, is an ordinary empty
//! result and is reported through `Option` or an empty program list instead.

use crate::tree::Pos;
use thiserror::Error;

/// The largest number of examples accepted in one [`ExampleGroup`](crate::rule::ExampleGroup).
pub const MAX_EXAMPLES: usize = 5;

/// Errors from pattern synthesis.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// No error messages were given.
    #[error("no error messages to synthesize a pattern from")]
    NoMessages,

    /// The messages do not all have the same number of tokens.
    #[error("message {index} has {found} tokens, expected {expected}")]
    LengthMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },

    /// The number of source texts does not match the number of messages.
    #[error("got {sources} source texts for {messages} messages")]
    SourceCount { messages: usize, sources: usize },
}

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// The reported error position does not correspond to any leaf of the parsed tree.
    ///
    /// This indicates an inconsistency between the parser and the compiler that reported the
    /// error, not a synthesis defect.
    #[error("error position {pos} not present in the input tree")]
    ErrorNodeNotFound { pos: Pos },

    #[error("example group is empty")]
    EmptyGroup,

    #[error("example group has {0} examples, at most {MAX_EXAMPLES} are supported")]
    TooManyExamples(usize),

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, Error>;
