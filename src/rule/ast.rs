//! Abstract Syntax Tree for rule expressions

use crate::error::{Result, RuleEngineError};
use crate::evaluator::ValueType;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Words the tokenizer never yields as identifiers
pub const RESERVED_WORDS: [&str; 5] = ["AND", "OR", "NOT", "TRUE", "FALSE"];

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Deepest tree, counted in nodes from root to leaf, that parsing, JSON import
/// and combining will build. Every walk over a tree recurses once per level.
pub const MAX_TREE_DEPTH: usize = 512;

/// Whether `name` can appear as an attribute in rule text
pub fn is_valid_attribute(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name)
        && !RESERVED_WORDS
            .iter()
            .any(|word| word.eq_ignore_ascii_case(name))
}

/// AST node for rule expressions
///
/// Children are held behind `Arc` so the combiner can share identical
/// subtrees. Nodes are never mutated after construction, so sharing is never
/// observable: rules parsed from the same text share the cached tree, and a
/// combined tree references its source rules' trees instead of copying them.
///
/// Trees built by hand are not depth-checked; call [`AstNode::validate`]
/// before walking one that may exceed [`MAX_TREE_DEPTH`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AstNode {
    /// Leaf like `Age > 25`
    Comparison(Comparison),
    /// Binary AND / OR
    Logical {
        op: LogicalOp,
        left: Arc<AstNode>,
        right: Arc<AstNode>,
    },
    /// Unary NOT
    Not { operand: Arc<AstNode> },
}

/// Single comparison expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub attribute: String,
    pub operator: ComparisonOp,
    pub value: Literal,
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOp {
    /// Greater than (>)
    #[serde(rename = ">")]
    Greater,
    /// Less than (<)
    #[serde(rename = "<")]
    Less,
    /// Greater than or equal (>=)
    #[serde(rename = ">=")]
    GreaterEqual,
    /// Less than or equal (<=)
    #[serde(rename = "<=")]
    LessEqual,
    /// Equal (=)
    #[serde(rename = "=")]
    Equal,
    /// Not equal (!=)
    #[serde(rename = "!=")]
    NotEqual,
}

impl ComparisonOp {
    pub fn as_str(self) -> &'static str {
        match self {
            ComparisonOp::Greater => ">",
            ComparisonOp::Less => "<",
            ComparisonOp::GreaterEqual => ">=",
            ComparisonOp::LessEqual => "<=",
            ComparisonOp::Equal => "=",
            ComparisonOp::NotEqual => "!=",
        }
    }

    /// `=` and `!=` are the only operators defined on every value type
    pub fn is_equality(self) -> bool {
        matches!(self, ComparisonOp::Equal | ComparisonOp::NotEqual)
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical join operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn as_str(self) -> &'static str {
        match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
        }
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Literal on the right-hand side of a comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Boolean(bool),
    Number(f64),
    String(String),
}

impl Literal {
    pub fn value_type(&self) -> ValueType {
        match self {
            Literal::Boolean(_) => ValueType::Boolean,
            Literal::Number(_) => ValueType::Number,
            Literal::String(_) => ValueType::String,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Number(n) => write!(f, "{}", n),
            Literal::String(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        other => write!(f, "{}", other)?,
                    }
                }
                f.write_str("\"")
            }
        }
    }
}

impl AstNode {
    pub fn comparison(
        attribute: impl Into<String>,
        operator: ComparisonOp,
        value: Literal,
    ) -> Self {
        AstNode::Comparison(Comparison {
            attribute: attribute.into(),
            operator,
            value,
        })
    }

    pub fn logical(
        op: LogicalOp,
        left: impl Into<Arc<AstNode>>,
        right: impl Into<Arc<AstNode>>,
    ) -> Self {
        AstNode::Logical {
            op,
            left: left.into(),
            right: right.into(),
        }
    }

    pub fn and(left: impl Into<Arc<AstNode>>, right: impl Into<Arc<AstNode>>) -> Self {
        Self::logical(LogicalOp::And, left, right)
    }

    pub fn or(left: impl Into<Arc<AstNode>>, right: impl Into<Arc<AstNode>>) -> Self {
        Self::logical(LogicalOp::Or, left, right)
    }

    pub fn negate(operand: impl Into<Arc<AstNode>>) -> Self {
        AstNode::Not {
            operand: operand.into(),
        }
    }

    /// Distinct attribute names in first-occurrence order (left to right)
    pub fn attributes(&self) -> SmallVec<[&str; 8]> {
        let mut names = SmallVec::new();
        self.collect_attributes(&mut names);
        names
    }

    fn collect_attributes<'a>(&'a self, names: &mut SmallVec<[&'a str; 8]>) {
        match self {
            AstNode::Comparison(cmp) => {
                if !names.contains(&cmp.attribute.as_str()) {
                    names.push(cmp.attribute.as_str());
                }
            }
            AstNode::Logical { left, right, .. } => {
                left.collect_attributes(names);
                right.collect_attributes(names);
            }
            AstNode::Not { operand } => operand.collect_attributes(names),
        }
    }

    /// Number of nodes, counting a shared subtree once per position
    pub fn node_count(&self) -> usize {
        match self {
            AstNode::Comparison(_) => 1,
            AstNode::Logical { left, right, .. } => 1 + left.node_count() + right.node_count(),
            AstNode::Not { operand } => 1 + operand.node_count(),
        }
    }

    /// Import a tree from its JSON form, rejecting attributes that could not
    /// have come out of the parser.
    pub fn from_json(json: &str) -> Result<Self> {
        let ast: AstNode = serde_json::from_str(json)?;
        ast.validate()?;
        Ok(ast)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Depth in nodes along the longest root-to-leaf path
    ///
    /// Uses an explicit stack, so it is safe on trees of any depth.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1usize)];
        while let Some((node, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            match node {
                AstNode::Comparison(_) => {}
                AstNode::Logical { left, right, .. } => {
                    stack.push((left.as_ref(), depth + 1));
                    stack.push((right.as_ref(), depth + 1));
                }
                AstNode::Not { operand } => stack.push((operand.as_ref(), depth + 1)),
            }
        }
        deepest
    }

    /// Check that the tree is at most [`MAX_TREE_DEPTH`] deep, every leaf
    /// names a usable attribute and every number is finite
    pub fn validate(&self) -> Result<()> {
        let mut stack = vec![(self, 1usize)];
        while let Some((node, depth)) = stack.pop() {
            if depth > MAX_TREE_DEPTH {
                return Err(RuleEngineError::InvalidAst(format!(
                    "tree deeper than {} levels",
                    MAX_TREE_DEPTH
                )));
            }
            match node {
                AstNode::Comparison(cmp) => validate_comparison(cmp)?,
                AstNode::Logical { left, right, .. } => {
                    stack.push((right.as_ref(), depth + 1));
                    stack.push((left.as_ref(), depth + 1));
                }
                AstNode::Not { operand } => stack.push((operand.as_ref(), depth + 1)),
            }
        }
        Ok(())
    }

    // OR < AND < NOT < comparison
    fn precedence(&self) -> u8 {
        match self {
            AstNode::Logical {
                op: LogicalOp::Or, ..
            } => 1,
            AstNode::Logical {
                op: LogicalOp::And,
                ..
            } => 2,
            AstNode::Not { .. } => 3,
            AstNode::Comparison(_) => 4,
        }
    }
}

fn validate_comparison(cmp: &Comparison) -> Result<()> {
    if !is_valid_attribute(&cmp.attribute) {
        return Err(RuleEngineError::InvalidAst(format!(
            "invalid attribute name: {:?}",
            cmp.attribute
        )));
    }
    if let Literal::Number(n) = cmp.value {
        if !n.is_finite() {
            return Err(RuleEngineError::InvalidAst(format!(
                "non-finite number literal on {}",
                cmp.attribute
            )));
        }
    }
    Ok(())
}

fn write_grouped(f: &mut fmt::Formatter<'_>, node: &AstNode, parens: bool) -> fmt::Result {
    if parens {
        write!(f, "({})", node)
    } else {
        write!(f, "{}", node)
    }
}

/// Canonical rule text. Re-parsing the output yields an equal tree.
impl fmt::Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AstNode::Comparison(cmp) => {
                write!(f, "{} {} {}", cmp.attribute, cmp.operator, cmp.value)
            }
            AstNode::Logical { op, left, right } => {
                let own = self.precedence();
                write_grouped(f, left, left.precedence() < own)?;
                write!(f, " {} ", op)?;
                // Right operand of the same operator must keep its parentheses,
                // otherwise the chain would re-parse left-associated.
                write_grouped(f, right, right.precedence() <= own)
            }
            AstNode::Not { operand } => {
                f.write_str("NOT ")?;
                write_grouped(f, operand, operand.precedence() <= self.precedence())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(attr: &str, value: f64) -> AstNode {
        AstNode::comparison(attr, ComparisonOp::Equal, Literal::Number(value))
    }

    #[test]
    fn test_render_comparison() {
        let ast = AstNode::comparison(
            "Department",
            ComparisonOp::Equal,
            Literal::String("IT".to_string()),
        );
        assert_eq!(ast.to_string(), "Department = \"IT\"");

        let ast = AstNode::comparison("Age", ComparisonOp::GreaterEqual, Literal::Number(25.0));
        assert_eq!(ast.to_string(), "Age >= 25");

        let ast = AstNode::comparison("Ratio", ComparisonOp::Less, Literal::Number(0.75));
        assert_eq!(ast.to_string(), "Ratio < 0.75");

        let ast = AstNode::comparison("Active", ComparisonOp::NotEqual, Literal::Boolean(false));
        assert_eq!(ast.to_string(), "Active != false");
    }

    #[test]
    fn test_render_escapes_strings() {
        let ast = AstNode::comparison(
            "Name",
            ComparisonOp::Equal,
            Literal::String(r#"say "hi" \ bye"#.to_string()),
        );
        assert_eq!(ast.to_string(), r#"Name = "say \"hi\" \\ bye""#);
    }

    #[test]
    fn test_render_precedence() {
        // A OR (B AND C) needs no parentheses
        let ast = AstNode::or(leaf("A", 1.0), AstNode::and(leaf("B", 1.0), leaf("C", 1.0)));
        assert_eq!(ast.to_string(), "A = 1 OR B = 1 AND C = 1");

        // (A OR B) AND C keeps them
        let ast = AstNode::and(AstNode::or(leaf("A", 1.0), leaf("B", 1.0)), leaf("C", 1.0));
        assert_eq!(ast.to_string(), "(A = 1 OR B = 1) AND C = 1");
    }

    #[test]
    fn test_render_right_nested_chain() {
        let left_assoc = AstNode::and(AstNode::and(leaf("A", 1.0), leaf("B", 1.0)), leaf("C", 1.0));
        assert_eq!(left_assoc.to_string(), "A = 1 AND B = 1 AND C = 1");

        let right_assoc = AstNode::and(leaf("A", 1.0), AstNode::and(leaf("B", 1.0), leaf("C", 1.0)));
        assert_eq!(right_assoc.to_string(), "A = 1 AND (B = 1 AND C = 1)");
    }

    #[test]
    fn test_render_not() {
        let ast = AstNode::negate(leaf("A", 1.0));
        assert_eq!(ast.to_string(), "NOT A = 1");

        let ast = AstNode::negate(AstNode::or(leaf("A", 1.0), leaf("B", 2.0)));
        assert_eq!(ast.to_string(), "NOT (A = 1 OR B = 2)");

        let ast = AstNode::negate(AstNode::negate(leaf("A", 1.0)));
        assert_eq!(ast.to_string(), "NOT (NOT A = 1)");
    }

    #[test]
    fn test_attributes_in_first_occurrence_order() {
        let ast = AstNode::or(
            AstNode::and(leaf("Age", 1.0), leaf("Salary", 2.0)),
            AstNode::negate(leaf("Age", 3.0)),
        );
        assert_eq!(ast.attributes().as_slice(), &["Age", "Salary"]);
        assert_eq!(ast.node_count(), 6);
    }

    #[test]
    fn test_json_shape() {
        let ast = AstNode::and(
            AstNode::comparison("Age", ComparisonOp::Greater, Literal::Number(25.0)),
            AstNode::comparison(
                "Department",
                ComparisonOp::Equal,
                Literal::String("IT".to_string()),
            ),
        );
        let json: serde_json::Value = serde_json::from_str(&ast.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "logical");
        assert_eq!(json["op"], "AND");
        assert_eq!(json["left"]["type"], "comparison");
        assert_eq!(json["left"]["operator"], ">");
        assert_eq!(json["right"]["value"], "IT");

        let back = AstNode::from_json(&ast.to_json().unwrap()).unwrap();
        assert_eq!(back, ast);
    }

    #[test]
    fn test_from_json_rejects_bad_attribute() {
        let json = r#"{"type":"comparison","attribute":"two words","operator":"=","value":1}"#;
        assert!(matches!(
            AstNode::from_json(json),
            Err(RuleEngineError::InvalidAst(_))
        ));

        let json = r#"{"type":"comparison","attribute":"and","operator":"=","value":1}"#;
        assert!(AstNode::from_json(json).is_err());

        let json = r#"{"type":"comparison","attribute":"","operator":"=","value":1}"#;
        assert!(AstNode::from_json(json).is_err());
    }

    #[test]
    fn test_depth_and_depth_cap() {
        assert_eq!(leaf("A", 1.0).depth(), 1);
        let ast = AstNode::or(AstNode::negate(leaf("A", 1.0)), leaf("B", 1.0));
        assert_eq!(ast.depth(), 3);

        let mut chain = leaf("A", 0.0);
        for i in 1..MAX_TREE_DEPTH {
            chain = AstNode::or(chain, leaf("A", i as f64));
        }
        assert_eq!(chain.depth(), MAX_TREE_DEPTH);
        assert!(chain.validate().is_ok());

        let too_deep = AstNode::negate(chain);
        assert!(matches!(
            too_deep.validate(),
            Err(RuleEngineError::InvalidAst(_))
        ));
    }

    #[test]
    fn test_valid_attribute_names() {
        assert!(is_valid_attribute("Age"));
        assert!(is_valid_attribute("_private_1"));
        assert!(!is_valid_attribute("1st"));
        assert!(!is_valid_attribute("OR"));
        assert!(!is_valid_attribute("True"));
    }
}
