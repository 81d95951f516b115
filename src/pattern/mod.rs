//! Error message patterns.
//!
//! A pattern is a sequence of [`Matcher`]s, one per whitespace-separated token of a compiler
//! message. Constant tokens must match literally; variable tokens capture the (unquoted) text of
//! the message into an [`Env`] slot, which a learned program can then use to build new leaves or
//! to find the node the message talks about.
//!
//! ```
//! use treefix::pattern::ErrPattern;
//!
//! let pattern = ErrPattern::synthesize(
//!     &["cannot convert 'a' to 'int'", "cannot convert 'b' to 'long'"],
//!     &["a = 1.5 ;", "b = 2.5 ;"],
//! ).unwrap();
//! assert_eq!(pattern.to_string(), "cannot convert '$0' to '$1'");
//!
//! let env = pattern.matches("cannot convert 'c' to 'short'").unwrap();
//! assert_eq!(env.len(), 2);
//! assert!(pattern.matches("cannot convert c to short").is_none());
//! ```

mod quote;

pub use quote::{occurs_in, QuotePair, ALL_QUOTE_PAIRS};

use crate::error::PatternError;
use crate::language::{Env, EnvKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Matches one token of a message.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum Matcher {
    Const(String),
    /// Captures the content of a token wearing `quote` into slot `key`.
    Var { quote: QuotePair, key: EnvKey },
    /// Matches any token without capturing it.
    WildCard,
}

use Matcher::*;

#[derive(Debug, PartialEq, Eq, Clone, Default, Serialize, Deserialize)]
pub struct ErrPattern(Vec<Matcher>);

fn tokenize(message: &str) -> Vec<&str> {
    message.split_whitespace().collect()
}

impl ErrPattern {
    pub fn new(matchers: Vec<Matcher>) -> Self {
        let mut pattern = Self(matchers);
        pattern.label_vars();
        pattern
    }

    /// Synthesizes a pattern matching all `messages`.
    ///
    /// `sources[i]` is the source text associated with `messages[i]` (typically the text of the
    /// broken program followed by the text of the fixed one). With a single message, a token
    /// becomes a variable only if its unquoted content occurs in the source text. With several
    /// messages, tokens shared by all messages become constants and the others become
    /// variables; all messages must have the same number of tokens.
    pub fn synthesize<M, S>(messages: &[M], sources: &[S]) -> Result<Self, PatternError>
    where
        M: AsRef<str>,
        S: AsRef<str>,
    {
        if messages.is_empty() {
            return Err(PatternError::NoMessages);
        }
        if sources.len() != messages.len() {
            return Err(PatternError::SourceCount {
                messages: messages.len(),
                sources: sources.len(),
            });
        }
        let sentences: Vec<Vec<&str>> = messages.iter().map(|m| tokenize(m.as_ref())).collect();
        let expected = sentences[0].len();
        for (index, sentence) in sentences.iter().enumerate() {
            if sentence.len() != expected {
                return Err(PatternError::LengthMismatch {
                    index,
                    expected,
                    found: sentence.len(),
                });
            }
        }

        let matchers = if sentences.len() == 1 {
            let source = sources[0].as_ref();
            sentences[0]
                .iter()
                .map(|word| {
                    let (quote, content) = QuotePair::find(word);
                    if occurs_in(content, source) {
                        Var {
                            quote,
                            key: EnvKey(0),
                        }
                    } else {
                        Const(word.to_string())
                    }
                })
                .collect()
        } else {
            (0..expected)
                .map(|i| {
                    let words: Vec<&str> = sentences.iter().map(|s| s[i]).collect();
                    Self::generalize(&words)
                })
                .collect()
        };
        let pattern = Self::new(matchers);
        debug!(%pattern, "synthesized error pattern");
        Ok(pattern)
    }

    // one token position across several messages
    fn generalize(words: &[&str]) -> Matcher {
        if words.iter().all(|w| *w == words[0]) {
            return Const(words[0].to_string());
        }
        let (quote, _) = QuotePair::find(words[0]);
        if quote != QuotePair::Bare && words.iter().all(|w| QuotePair::find(w).0 == quote) {
            return Var {
                quote,
                key: EnvKey(0),
            };
        }
        Var {
            quote: QuotePair::Bare,
            key: EnvKey(0),
        }
    }

    fn label_vars(&mut self) {
        let mut next = 0;
        for m in &mut self.0 {
            if let Var { key, .. } = m {
                *key = EnvKey(next);
                next += 1;
            }
        }
    }

    /// Matches a message, returning the captured text by slot.
    pub fn matches(&self, message: &str) -> Option<Env> {
        let words = tokenize(message);
        if words.len() != self.0.len() {
            return None;
        }
        let mut env = Env::new();
        for (matcher, word) in self.0.iter().zip(words) {
            match matcher {
                Const(c) => {
                    if c != word {
                        return None;
                    }
                }
                Var { quote, key } => env.insert(*key, quote.strip(word)?),
                WildCard => {}
            }
        }
        Some(env)
    }

    /// Rebuilds a message from captured text. Fails on wildcards and unbound slots.
    pub fn render(&self, env: &Env) -> Option<String> {
        let words = self
            .0
            .iter()
            .map(|m| match m {
                Const(c) => Some(c.clone()),
                Var { quote, key } => env.get(*key).map(|v| quote.wrap(v)),
                WildCard => None,
            })
            .collect::<Option<Vec<_>>>()?;
        Some(words.join(" "))
    }

    pub fn matchers(&self) -> &[Matcher] {
        &self.0
    }

    pub fn vars(&self) -> impl Iterator<Item = EnvKey> + '_ {
        self.0.iter().filter_map(|m| match m {
            Var { key, .. } => Some(*key),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ErrPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, m) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            match m {
                Const(c) => write!(f, "{}", c)?,
                Var { quote, key } => write!(f, "{}${}{}", quote.open(), key.0, quote.close())?,
                WildCard => write!(f, "*")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use QuotePair::*;

    fn var(quote: QuotePair, key: usize) -> Matcher {
        Var {
            quote,
            key: EnvKey(key),
        }
    }

    fn c(s: &str) -> Matcher {
        Const(s.to_string())
    }

    #[test]
    fn single_message() {
        let message = "The name 'foo' does not exist in the current context";
        let source = "class C { void f ( ) { foo ( ) ; } }";
        let p = ErrPattern::synthesize(&[message], &[source]).unwrap();
        assert_eq!(
            p.matchers(),
            &[
                c("The"),
                c("name"),
                var(Single, 0),
                c("does"),
                c("not"),
                c("exist"),
                c("in"),
                c("the"),
                c("current"),
                c("context"),
            ]
        );
        let env = p.matches(message).unwrap();
        assert_eq!(env.get(EnvKey(0)), Some("foo"));
        assert_eq!(p.render(&env).as_deref(), Some(message));
    }

    #[test]
    fn quoted_but_absent_stays_constant() {
        let p = ErrPattern::synthesize(&["cannot convert 'x' to 'int'"], &["x = 1.5 ;"]).unwrap();
        assert_eq!(
            p.matchers(),
            &[c("cannot"), c("convert"), var(Single, 0), c("to"), c("'int'")]
        );
    }

    #[test]
    fn bare_token_in_source() {
        let p = ErrPattern::synthesize(&["; expected"], &["int x = 1 int x = 1 ;"]).unwrap();
        assert_eq!(p.matchers(), &[var(Bare, 0), c("expected")]);
        assert_eq!(p.matches("} expected").unwrap().get(EnvKey(0)), Some("}"));
    }

    #[test]
    fn several_messages() {
        let messages = [
            "cannot convert 'a' to 'int'",
            "cannot convert 'bb' to 'int'",
            "cannot convert 'c' to 'int'",
        ];
        let sources = ["a = x ;", "bb = y ;", "c = z ;"];
        let p = ErrPattern::synthesize(&messages, &sources).unwrap();
        assert_eq!(
            p.matchers(),
            &[c("cannot"), c("convert"), var(Single, 0), c("to"), c("'int'")]
        );
        for (m, expected) in messages.iter().zip(["a", "bb", "c"]) {
            let env = p.matches(m).unwrap();
            assert_eq!(env.get(EnvKey(0)), Some(expected));
            assert_eq!(p.render(&env).as_deref(), Some(*m));
        }
        // quotes must agree with the ones seen while learning
        assert!(p.matches("cannot convert `a' to 'int'").is_none());
        assert!(p.matches("cannot convert 'a' to 'long'").is_none());
        assert!(p.matches("cannot convert 'a' to").is_none());
    }

    #[test]
    fn mixed_quotes_bind_untyped() {
        let messages = ["bad 'x' at 12", "bad \"y\" at 40"];
        let sources = ["x", "y"];
        let p = ErrPattern::synthesize(&messages, &sources).unwrap();
        assert_eq!(p.matchers(), &[c("bad"), var(Bare, 0), c("at"), var(Bare, 1)]);
        for m in messages {
            let env = p.matches(m).unwrap();
            assert_eq!(p.render(&env).as_deref(), Some(m));
        }
        let env = p.matches("bad `z' at 3").unwrap();
        assert_eq!(env.get(EnvKey(0)), Some("`z'"));
        assert_eq!(env.get(EnvKey(1)), Some("3"));
        assert_eq!(p.to_string(), "bad $0 at $1");
    }

    #[test]
    fn wildcards_bind_nothing() {
        let p = ErrPattern::new(vec![c("unused"), WildCard]);
        let env = p.matches("unused foo").unwrap();
        assert!(env.get(EnvKey(0)).is_none());
        assert!(p.matches("unused").is_none());
        assert_eq!(p.render(&env), None);
        assert_eq!(p.to_string(), "unused *");
    }

    #[test]
    fn length_mismatch() {
        let err = ErrPattern::synthesize(&["a b c", "a b"], &["", ""]).unwrap_err();
        assert_eq!(
            err,
            PatternError::LengthMismatch {
                index: 1,
                expected: 3,
                found: 2
            }
        );
        assert_eq!(
            ErrPattern::synthesize::<&str, &str>(&[], &[]).unwrap_err(),
            PatternError::NoMessages
        );
        assert!(matches!(
            ErrPattern::synthesize(&["a"], &["", ""]),
            Err(PatternError::SourceCount { .. })
        ));
    }
}
