//! Rule string parser
//!
//! Recursive descent over the token stream:
//!
//! ```text
//! expr       := or_expr
//! or_expr    := and_expr (OR and_expr)*
//! and_expr   := not_expr (AND not_expr)*
//! not_expr   := [NOT] atom
//! atom       := comparison | '(' expr ')'
//! comparison := identifier comparison_op literal
//! ```

use crate::error::{ParseError, Result};
use crate::rule::ast::{AstNode, Literal, LogicalOp, MAX_TREE_DEPTH};
use crate::rule::lexer::{tokenize, Token, TokenKind};
use tracing::debug;

/// Deepest parenthesis nesting accepted before the parser gives up
pub const MAX_NESTING_DEPTH: usize = 256;

/// Node plus the depth of the subtree it roots
type Parsed = std::result::Result<(AstNode, usize), ParseError>;

/// Parse a rule string into an AST
pub fn parse(text: &str) -> Result<AstNode> {
    let tokens = tokenize(text)?;
    let ast = parse_tokens(&tokens)?;
    debug!(tokens = tokens.len(), nodes = ast.node_count(), "parsed rule");
    Ok(ast)
}

/// Parse a complete token stream. Trailing tokens are an error.
pub fn parse_tokens(tokens: &[Token]) -> std::result::Result<AstNode, ParseError> {
    if tokens.is_empty() {
        return Err(ParseError {
            position: 0,
            expected: "rule expression".to_string(),
            found: "end of input".to_string(),
        });
    }

    let mut parser = Parser::new(tokens);
    let (ast, _) = parser.parse_or()?;

    if parser.peek().is_some() {
        return Err(parser.error("AND, OR or end of input"));
    }

    Ok(ast)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek_is(&self, kind: &TokenKind) -> bool {
        self.peek().is_some_and(|t| &t.kind == kind)
    }

    /// Error pointing at the current token, or at end of input
    fn error(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(token) => ParseError {
                position: token.position,
                expected: expected.to_string(),
                found: token.describe(),
            },
            None => ParseError {
                position: self.tokens.last().map(Token::end).unwrap_or(0),
                expected: expected.to_string(),
                found: "end of input".to_string(),
            },
        }
    }

    /// Depth of a node joining two subtrees, checked against the tree cap
    fn join_depth(
        &self,
        op: &Token,
        left: usize,
        right: usize,
    ) -> std::result::Result<usize, ParseError> {
        let depth = left.max(right) + 1;
        if depth > MAX_TREE_DEPTH {
            return Err(ParseError {
                position: op.position,
                expected: format!("at most {} levels of operators", MAX_TREE_DEPTH),
                found: op.describe(),
            });
        }
        Ok(depth)
    }

    fn parse_or(&mut self) -> Parsed {
        let (mut left, mut depth) = self.parse_and()?;
        while let Some(op) = self.peek().filter(|t| t.kind == TokenKind::Or) {
            self.advance();
            let (right, right_depth) = self.parse_and()?;
            depth = self.join_depth(op, depth, right_depth)?;
            left = AstNode::logical(LogicalOp::Or, left, right);
        }
        Ok((left, depth))
    }

    fn parse_and(&mut self) -> Parsed {
        let (mut left, mut depth) = self.parse_not()?;
        while let Some(op) = self.peek().filter(|t| t.kind == TokenKind::And) {
            self.advance();
            let (right, right_depth) = self.parse_not()?;
            depth = self.join_depth(op, depth, right_depth)?;
            left = AstNode::logical(LogicalOp::And, left, right);
        }
        Ok((left, depth))
    }

    fn parse_not(&mut self) -> Parsed {
        if let Some(op) = self.peek().filter(|t| t.kind == TokenKind::Not) {
            self.advance();
            let (operand, depth) = self.parse_atom()?;
            let depth = self.join_depth(op, depth, 0)?;
            return Ok((AstNode::negate(operand), depth));
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Parsed {
        match self.peek().map(|t| &t.kind) {
            Some(TokenKind::OpenParen) => {
                if self.depth >= MAX_NESTING_DEPTH {
                    return Err(self.error("at most 256 nested parentheses"));
                }
                self.advance();
                self.depth += 1;
                let inner = self.parse_or()?;
                if !self.peek_is(&TokenKind::CloseParen) {
                    return Err(self.error("')'"));
                }
                self.advance();
                self.depth -= 1;
                Ok(inner)
            }
            Some(TokenKind::Identifier(name)) => {
                let attribute = name.clone();
                self.advance();
                Ok((self.parse_comparison(attribute)?, 1))
            }
            _ => Err(self.error("attribute name or '('")),
        }
    }

    fn parse_comparison(&mut self, attribute: String) -> std::result::Result<AstNode, ParseError> {
        let operator = match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Comparison(op)) => *op,
            _ => return Err(self.error("comparison operator")),
        };
        self.advance();

        let value = match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Number(n)) => Literal::Number(*n),
            Some(TokenKind::String(s)) => Literal::String(s.clone()),
            Some(TokenKind::Boolean(b)) => Literal::Boolean(*b),
            _ => return Err(self.error("literal value")),
        };
        self.advance();

        Ok(AstNode::comparison(attribute, operator, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuleEngineError;
    use crate::rule::ast::ComparisonOp;

    fn parse_err(text: &str) -> ParseError {
        match parse(text) {
            Err(RuleEngineError::Parse(err)) => err,
            other => panic!("Expected parse error for {:?}, got {:?}", text, other),
        }
    }

    fn leaf(attr: &str, op: ComparisonOp, value: Literal) -> AstNode {
        AstNode::comparison(attr, op, value)
    }

    #[test]
    fn test_parse_simple_rule() {
        let ast = parse(r#"Age > 25 AND Department = "IT""#).unwrap();
        assert_eq!(
            ast,
            AstNode::and(
                leaf("Age", ComparisonOp::Greater, Literal::Number(25.0)),
                leaf(
                    "Department",
                    ComparisonOp::Equal,
                    Literal::String("IT".to_string())
                ),
            )
        );
    }

    #[test]
    fn test_parse_boolean_literal() {
        let ast = parse("Active = TRUE").unwrap();
        assert_eq!(
            ast,
            leaf("Active", ComparisonOp::Equal, Literal::Boolean(true))
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        // A OR B AND C is A OR (B AND C)
        let ast = parse("A = 1 OR B = 1 AND C = 1").unwrap();
        match ast {
            AstNode::Logical {
                op: LogicalOp::Or,
                right,
                ..
            } => assert!(matches!(
                *right,
                AstNode::Logical {
                    op: LogicalOp::And,
                    ..
                }
            )),
            other => panic!("Expected OR at root, got {:?}", other),
        }

        // A AND B OR C AND D is (A AND B) OR (C AND D)
        let ast = parse("A = 1 AND B = 1 OR C = 1 AND D = 1").unwrap();
        match ast {
            AstNode::Logical {
                op: LogicalOp::Or,
                left,
                right,
            } => {
                assert!(matches!(*left, AstNode::Logical { op: LogicalOp::And, .. }));
                assert!(matches!(*right, AstNode::Logical { op: LogicalOp::And, .. }));
            }
            other => panic!("Expected OR at root, got {:?}", other),
        }
    }

    #[test]
    fn test_chains_are_left_associative() {
        let ast = parse("A = 1 OR B = 2 OR C = 3").unwrap();
        let a = leaf("A", ComparisonOp::Equal, Literal::Number(1.0));
        let b = leaf("B", ComparisonOp::Equal, Literal::Number(2.0));
        let c = leaf("C", ComparisonOp::Equal, Literal::Number(3.0));
        assert_eq!(ast, AstNode::or(AstNode::or(a, b), c));
    }

    #[test]
    fn test_parentheses_reset_precedence() {
        let ast = parse("(A = 1 OR B = 1) AND C = 1").unwrap();
        match ast {
            AstNode::Logical {
                op: LogicalOp::And,
                left,
                ..
            } => assert!(matches!(*left, AstNode::Logical { op: LogicalOp::Or, .. })),
            other => panic!("Expected AND at root, got {:?}", other),
        }
    }

    #[test]
    fn test_not_binds_to_atom() {
        let ast = parse("NOT A = 1 AND B = 2").unwrap();
        match ast {
            AstNode::Logical {
                op: LogicalOp::And,
                left,
                ..
            } => assert!(matches!(*left, AstNode::Not { .. })),
            other => panic!("Expected AND at root, got {:?}", other),
        }

        let ast = parse("NOT (A = 1 OR B = 2)").unwrap();
        assert!(matches!(ast, AstNode::Not { .. }));
    }

    #[test]
    fn test_missing_literal() {
        let err = parse_err("Age >");
        assert_eq!(err.position, 5);
        assert_eq!(err.expected, "literal value");
        assert_eq!(err.found, "end of input");
    }

    #[test]
    fn test_identifier_as_value() {
        let err = parse_err("Age > Salary");
        assert_eq!(err.position, 6);
        assert_eq!(err.expected, "literal value");
        assert_eq!(err.found, "identifier 'Salary'");
    }

    #[test]
    fn test_bare_identifier() {
        let err = parse_err("Active AND Age > 3");
        assert_eq!(err.position, 7);
        assert_eq!(err.expected, "comparison operator");
        assert_eq!(err.found, "'AND'");
    }

    #[test]
    fn test_empty_input() {
        let err = parse_err("   ");
        assert_eq!(err.position, 0);
        assert_eq!(err.found, "end of input");
    }

    #[test]
    fn test_unbalanced_parentheses() {
        let err = parse_err("(Age > 3");
        assert_eq!(err.expected, "')'");
        assert_eq!(err.found, "end of input");
        assert_eq!(err.position, 8);

        let err = parse_err("Age > 3)");
        assert_eq!(err.position, 7);
        assert_eq!(err.expected, "AND, OR or end of input");
        assert_eq!(err.found, "')'");

        let err = parse_err("()");
        assert_eq!(err.position, 1);
        assert_eq!(err.found, "')'");
    }

    #[test]
    fn test_missing_operand() {
        let err = parse_err("Age > 3 AND");
        assert_eq!(err.expected, "attribute name or '('");
        assert_eq!(err.found, "end of input");

        let err = parse_err("OR Age > 3");
        assert_eq!(err.position, 0);
        assert_eq!(err.found, "'OR'");
    }

    #[test]
    fn test_comparison_between_groups_rejected() {
        let err = parse_err("(A = 1) > (B = 2)");
        assert_eq!(err.position, 8);
        assert_eq!(err.found, "operator '>'");
    }

    #[test]
    fn test_trailing_tokens() {
        let err = parse_err("Age > 3 4");
        assert_eq!(err.position, 8);
        assert_eq!(err.found, "number 4");
    }

    #[test]
    fn test_double_not_requires_parentheses() {
        assert!(parse("NOT NOT A = 1").is_err());
        assert!(parse("NOT (NOT A = 1)").is_ok());
    }

    #[test]
    fn test_lex_errors_propagate() {
        assert!(matches!(
            parse("Age > 3 & B = 1"),
            Err(RuleEngineError::Lex(_))
        ));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}A = 1{}", "(".repeat(300), ")".repeat(300));
        let err = parse_err(&deep);
        assert_eq!(err.position, MAX_NESTING_DEPTH);

        let ok = format!("{}A = 1{}", "(".repeat(100), ")".repeat(100));
        assert!(parse(&ok).is_ok());
    }

    #[test]
    fn test_long_chain_rejected_at_tree_cap() {
        let text = vec!["A = 1"; 100_000].join(" OR ");
        let err = parse_err(&text);
        // The 512th OR would make the tree 513 levels deep
        assert_eq!(err.position, 512 * "A = 1 OR ".len() - " OR ".len() + 1);
        assert_eq!(err.found, "'OR'");
        assert!(err.expected.contains("levels of operators"));
    }

    #[test]
    fn test_chain_at_tree_cap_round_trips() {
        let text = vec!["A = 1"; MAX_TREE_DEPTH].join(" AND ");
        let ast = parse(&text).unwrap();
        assert_eq!(ast.depth(), MAX_TREE_DEPTH);
        assert_eq!(ast.to_string(), text);
        assert_eq!(parse(&ast.to_string()).unwrap(), ast);

        let one_more = format!("NOT ({})", text);
        assert!(parse(&one_more).is_err());
    }
}
