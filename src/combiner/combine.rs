//! Rule combiner

use crate::combiner::dedup::deduplicate;
use crate::combiner::strategy::CombineStrategy;
use crate::error::CombineError;
use crate::rule::{AstNode, MAX_TREE_DEPTH};
use std::sync::Arc;
use tracing::debug;

/// Combine knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombineOptions {
    /// Share structurally identical subtrees after joining
    pub deduplicate: bool,
}

impl Default for CombineOptions {
    fn default() -> Self {
        Self { deduplicate: true }
    }
}

/// Combine rules with deduplication enabled
pub fn combine(
    rules: &[Arc<AstNode>],
    strategy: CombineStrategy,
) -> Result<Arc<AstNode>, CombineError> {
    combine_with(rules, strategy, CombineOptions::default())
}

/// Join `rules` in input order into a left-associated chain
///
/// `[r1, r2, r3]` with ANY becomes `(r1 OR r2) OR r3`. The source trees are
/// referenced, not copied. Fails with `TooDeep` when the chain would exceed
/// [`MAX_TREE_DEPTH`] levels.
pub fn combine_with(
    rules: &[Arc<AstNode>],
    strategy: CombineStrategy,
    options: CombineOptions,
) -> Result<Arc<AstNode>, CombineError> {
    let (first, rest) = match rules {
        [first, rest @ ..] if !rest.is_empty() => (first, rest),
        _ => return Err(CombineError::TooFew { count: rules.len() }),
    };

    // Each join adds one level above everything before it
    let depth = rest
        .iter()
        .fold(first.depth(), |acc, rule| acc.max(rule.depth()) + 1);
    if depth > MAX_TREE_DEPTH {
        return Err(CombineError::TooDeep {
            depth,
            max: MAX_TREE_DEPTH,
        });
    }

    let op = strategy.join_operator();
    let joined = rest.iter().fold(Arc::clone(first), |acc, rule| {
        Arc::new(AstNode::Logical {
            op,
            left: acc,
            right: Arc::clone(rule),
        })
    });

    debug!(rules = rules.len(), %strategy, "combined rules");

    if options.deduplicate {
        Ok(deduplicate(&joined))
    } else {
        Ok(joined)
    }
}
