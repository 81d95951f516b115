use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// The quotes a compiler wraps around names and types in its messages.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum QuotePair {
    /// `` `name' ``
    Backtick,
    /// `"name"`
    Double,
    /// `'name'`
    Single,
    /// No quotes: the whole token.
    Bare,
}

use QuotePair::*;

/// Quote pairs in the order they are tried. `Bare` always succeeds, so it comes last.
pub const ALL_QUOTE_PAIRS: &[QuotePair] = &[Backtick, Double, Single, Bare];

impl QuotePair {
    pub fn open(&self) -> &'static str {
        match self {
            Backtick => "`",
            Double => "\"",
            Single => "'",
            Bare => "",
        }
    }

    pub fn close(&self) -> &'static str {
        match self {
            Backtick | Single => "'",
            Double => "\"",
            Bare => "",
        }
    }

    /// Returns the quoted content of `token`, if `token` wears this pair of quotes.
    pub fn strip<'t>(&self, token: &'t str) -> Option<&'t str> {
        match self.to_regex() {
            None => Some(token),
            Some(re) => re
                .captures(token)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str()),
        }
    }

    pub fn wrap(&self, content: &str) -> String {
        format!("{}{}{}", self.open(), content, self.close())
    }

    /// Finds the first quote pair `token` wears, together with the quoted content.
    pub fn find(token: &str) -> (QuotePair, &str) {
        ALL_QUOTE_PAIRS
            .iter()
            .find_map(|q| q.strip(token).map(|content| (*q, content)))
            .unwrap_or((Bare, token))
    }

    fn to_regex(&self) -> Option<&Regex> {
        match self {
            Backtick => {
                lazy_static! {
                    static ref RE: Regex = Regex::new(r"^`(.+)'$").unwrap();
                }
                Some(&RE)
            }
            Double => {
                lazy_static! {
                    static ref RE: Regex = Regex::new(r#"^"(.+)"$"#).unwrap();
                }
                Some(&RE)
            }
            Single => {
                lazy_static! {
                    static ref RE: Regex = Regex::new(r"^'(.+)'$").unwrap();
                }
                Some(&RE)
            }
            Bare => None,
        }
    }
}

/// Whether `content` appears in `source` as one token or as a run of adjacent tokens.
///
/// Source text separates leaves by single spaces, so a qualified name such as `System.Console`
/// appears as `System . Console`.
pub fn occurs_in(content: &str, source: &str) -> bool {
    let tokens: Vec<&str> = source.split_whitespace().collect();
    (0..tokens.len()).any(|start| {
        let mut acc = String::new();
        for t in &tokens[start..] {
            acc.push_str(t);
            if acc == content {
                return true;
            }
            if !content.starts_with(acc.as_str()) {
                return false;
            }
        }
        false
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip() {
        assert_eq!(Single.strip("'int'"), Some("int"));
        assert_eq!(Single.strip("`int'"), None);
        assert_eq!(Backtick.strip("`int'"), Some("int"));
        assert_eq!(Double.strip("\"a b\""), Some("a b"));
        assert_eq!(Single.strip("''"), None);
        assert_eq!(Bare.strip("int"), Some("int"));
    }

    #[test]
    fn find_in_order() {
        assert_eq!(QuotePair::find("`x'"), (Backtick, "x"));
        assert_eq!(QuotePair::find("'x'"), (Single, "x"));
        assert_eq!(QuotePair::find("\"x\""), (Double, "x"));
        assert_eq!(QuotePair::find("'x'."), (Bare, "'x'."));
        for q in ALL_QUOTE_PAIRS {
            assert_eq!(q.strip(&q.wrap("List<int>")), Some("List<int>"));
        }
    }

    #[test]
    fn occurrences() {
        let source = "using System ; class C { void f ( ) { System . Console . Write ( x ) ; } }";
        assert!(occurs_in("x", source));
        assert!(occurs_in("System.Console", source));
        assert!(occurs_in("System.Console.Write", source));
        assert!(!occurs_in("Sys", source));
        assert!(!occurs_in("y", source));
        assert!(!occurs_in("Console.Read", source));
    }
}
