//! Synthesis configuration.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Knobs bounding the search performed by [`synth::learn`](crate::synth::learn) and the rule
/// library.
///
/// Every field has a default, so a TOML document only needs to name the values it changes:
///
/// ```
/// use treefix::config::SynthConfig;
///
/// let config = SynthConfig::from_toml_str("top_k = 2\ntime_budget_ms = 500").unwrap();
/// assert_eq!(config.top_k, 2);
/// assert_eq!(config.max_conjunction, SynthConfig::default().max_conjunction);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Number of ranked programs kept per rule.
    pub top_k: usize,
    /// Largest conjunction of features in a selection predicate.
    pub max_conjunction: usize,
    /// Largest disjunction of conjunctions in a selection predicate.
    pub max_disjunction: usize,
    /// Bound on the number of alternatives enumerated for one ambiguous parameter.
    pub max_candidates: usize,
    /// Largest number of children an `Append` adds to a copied node.
    pub max_append: usize,
    /// Wall-clock budget for learning one example group.
    pub time_budget_ms: Option<u64>,
    /// Largest number of chained rule applications.
    pub max_chain: usize,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            max_conjunction: 2,
            max_disjunction: 2,
            max_candidates: 32,
            max_append: 2,
            time_budget_ms: None,
            max_chain: 5,
        }
    }
}

impl SynthConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Renders the configuration as TOML text.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_empty_document() {
        let config = SynthConfig::from_toml_str("").unwrap();
        assert_eq!(config, SynthConfig::default());
        assert_eq!(config.time_budget(), None);
    }

    #[test]
    fn toml_round_trip() {
        let config = SynthConfig {
            top_k: 7,
            time_budget_ms: Some(1500),
            ..Default::default()
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(SynthConfig::from_toml_str(&text).unwrap(), config);
        assert_eq!(config.time_budget(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(SynthConfig::from_toml_str("top_k = \"many\"").is_err());
    }
}
