//! Stored rule records

use crate::rule::AstNode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Unique rule identifier, assigned by the store at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(pub u64);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RuleId {
    fn from(id: u64) -> Self {
        RuleId(id)
    }
}

/// Rule text paired with its parsed tree
///
/// A rule is never edited in place: modification produces a new `Rule`
/// with the same id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub source_text: String,
    pub ast: Arc<AstNode>,
}

impl Rule {
    pub fn new(id: RuleId, source_text: impl Into<String>, ast: Arc<AstNode>) -> Self {
        Self {
            id,
            source_text: source_text.into(),
            ast,
        }
    }

    /// Canonical rendering of the tree
    pub fn canonical(&self) -> String {
        self.ast.to_string()
    }
}
