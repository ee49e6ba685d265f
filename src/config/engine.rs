use crate::combiner::{CombineOptions, CombineStrategy};
use crate::error::Result;
use crate::evaluator::{EvalOptions, StringOrdering};
use serde::{Deserialize, Serialize};

/// Engine configuration
///
/// Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Join used when a combine call does not name one
    pub default_strategy: CombineStrategy,
    /// Share identical subtrees in combined rules
    pub deduplicate: bool,
    /// Treatment of `<`, `>`, `<=`, `>=` between strings
    pub string_ordering: StringOrdering,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_strategy: CombineStrategy::Any,
            deduplicate: true,
            string_ordering: StringOrdering::Reject,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn eval_options(&self) -> EvalOptions {
        EvalOptions {
            string_ordering: self.string_ordering,
        }
    }

    pub fn combine_options(&self) -> CombineOptions {
        CombineOptions {
            deduplicate: self.deduplicate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.default_strategy, CombineStrategy::Any);
        assert!(config.deduplicate);
        assert_eq!(config.string_ordering, StringOrdering::Reject);
    }

    #[test]
    fn test_from_json() {
        let config = EngineConfig::from_json(
            r#"{"default_strategy": "ALL", "deduplicate": false, "string_ordering": "LEXICOGRAPHIC"}"#,
        )
        .unwrap();
        assert_eq!(config.default_strategy, CombineStrategy::All);
        assert!(!config.combine_options().deduplicate);
        assert_eq!(
            config.eval_options().string_ordering,
            StringOrdering::Lexicographic
        );
    }

    #[test]
    fn test_rejects_unknown_strategy() {
        assert!(EngineConfig::from_json(r#"{"default_strategy": "XOR"}"#).is_err());
    }
}
