//! Combine strategies

use crate::error::CombineError;
use crate::rule::LogicalOp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the combined rule joins its sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CombineStrategy {
    /// Matches if any source rule matches (OR-chain)
    #[default]
    #[serde(alias = "any")]
    Any,
    /// Matches only if every source rule matches (AND-chain)
    #[serde(alias = "all")]
    All,
}

impl CombineStrategy {
    pub fn join_operator(self) -> LogicalOp {
        match self {
            CombineStrategy::Any => LogicalOp::Or,
            CombineStrategy::All => LogicalOp::And,
        }
    }
}

impl fmt::Display for CombineStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CombineStrategy::Any => "ANY",
            CombineStrategy::All => "ALL",
        })
    }
}

impl FromStr for CombineStrategy {
    type Err = CombineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ANY" => Ok(CombineStrategy::Any),
            "ALL" => Ok(CombineStrategy::All),
            _ => Err(CombineError::UnknownStrategy(s.to_string())),
        }
    }
}
