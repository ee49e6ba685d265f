//! Structural deduplication of AST subtrees
//!
//! Hash-consing: children are interned before their parent, so two parents
//! are structurally equal exactly when their interned children are the same
//! allocation. That lets the key of an internal node be its operator plus
//! child addresses instead of a deep hash.

use crate::rule::{AstNode, Comparison, ComparisonOp, Literal, LogicalOp};
use ahash::AHashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, PartialEq, Eq, Hash)]
enum LiteralKey {
    Boolean(bool),
    Number(u64),
    String(String),
}

impl LiteralKey {
    fn new(literal: &Literal) -> Self {
        match literal {
            Literal::Boolean(b) => LiteralKey::Boolean(*b),
            // -0.0 == 0.0, so both get the same key
            Literal::Number(n) if *n == 0.0 => LiteralKey::Number(0.0f64.to_bits()),
            Literal::Number(n) => LiteralKey::Number(n.to_bits()),
            Literal::String(s) => LiteralKey::String(s.clone()),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
enum NodeKey {
    Comparison {
        attribute: String,
        operator: ComparisonOp,
        value: LiteralKey,
    },
    Logical {
        op: LogicalOp,
        left: usize,
        right: usize,
    },
    Not {
        operand: usize,
    },
}

impl NodeKey {
    fn comparison(cmp: &Comparison) -> Self {
        NodeKey::Comparison {
            attribute: cmp.attribute.clone(),
            operator: cmp.operator,
            value: LiteralKey::new(&cmp.value),
        }
    }
}

#[inline]
fn addr(node: &Arc<AstNode>) -> usize {
    Arc::as_ptr(node) as usize
}

/// Interning table. Holds every canonical node it hands out, so the
/// addresses used in keys stay valid for its whole lifetime.
#[derive(Default)]
pub struct SubtreeInterner {
    table: AHashMap<NodeKey, Arc<AstNode>>,
    // Input allocation -> canonical node, so shared inputs are walked once
    visited: AHashMap<usize, Arc<AstNode>>,
    inputs: Vec<Arc<AstNode>>,
    reused: usize,
}

impl SubtreeInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Distinct subtrees seen so far
    pub fn unique_subtrees(&self) -> usize {
        self.table.len()
    }

    /// Positions rewritten to point at an earlier occurrence
    pub fn reused_subtrees(&self) -> usize {
        self.reused
    }

    /// Canonical representative of `node`. The first occurrence of a
    /// structure becomes the representative for all later ones.
    pub fn intern(&mut self, node: &Arc<AstNode>) -> Arc<AstNode> {
        if let Some(done) = self.visited.get(&addr(node)) {
            return Arc::clone(done);
        }

        let canonical = match node.as_ref() {
            AstNode::Comparison(cmp) => self.lookup_or_insert(NodeKey::comparison(cmp), || {
                Arc::clone(node)
            }),
            AstNode::Logical { op, left, right } => {
                let l = self.intern(left);
                let r = self.intern(right);
                let key = NodeKey::Logical {
                    op: *op,
                    left: addr(&l),
                    right: addr(&r),
                };
                self.lookup_or_insert(key, || {
                    if Arc::ptr_eq(&l, left) && Arc::ptr_eq(&r, right) {
                        Arc::clone(node)
                    } else {
                        Arc::new(AstNode::Logical {
                            op: *op,
                            left: l,
                            right: r,
                        })
                    }
                })
            }
            AstNode::Not { operand } => {
                let inner = self.intern(operand);
                let key = NodeKey::Not {
                    operand: addr(&inner),
                };
                self.lookup_or_insert(key, || {
                    if Arc::ptr_eq(&inner, operand) {
                        Arc::clone(node)
                    } else {
                        Arc::new(AstNode::Not { operand: inner })
                    }
                })
            }
        };

        // Keep the input alive so its address cannot be reused while the
        // visited map refers to it
        self.inputs.push(Arc::clone(node));
        self.visited.insert(addr(node), Arc::clone(&canonical));
        canonical
    }

    fn lookup_or_insert(
        &mut self,
        key: NodeKey,
        build: impl FnOnce() -> Arc<AstNode>,
    ) -> Arc<AstNode> {
        if let Some(existing) = self.table.get(&key) {
            self.reused += 1;
            return Arc::clone(existing);
        }
        let node = build();
        self.table.insert(key, Arc::clone(&node));
        node
    }
}

/// Rewrite `root` so that structurally identical subtrees share one
/// allocation. The result is structurally equal to `root`.
pub fn deduplicate(root: &Arc<AstNode>) -> Arc<AstNode> {
    let mut interner = SubtreeInterner::new();
    let result = interner.intern(root);
    debug!(
        unique = interner.unique_subtrees(),
        reused = interner.reused_subtrees(),
        "deduplicated tree"
    );
    result
}
