//! Rule evaluator

use crate::error::EvalError;
use crate::evaluator::value::{Record, Value, ValueType};
use crate::rule::{AstNode, Comparison, ComparisonOp, Literal, LogicalOp};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// How `<`, `>`, `<=`, `>=` treat two strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StringOrdering {
    /// Ordering comparisons on strings are a type mismatch
    #[default]
    #[serde(alias = "reject")]
    Reject,
    /// Byte-wise lexicographic ordering
    #[serde(alias = "lexicographic")]
    Lexicographic,
}

/// Evaluation knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EvalOptions {
    pub string_ordering: StringOrdering,
}

/// Evaluate an AST against a record with default options
pub fn evaluate(ast: &AstNode, record: &Record) -> Result<bool, EvalError> {
    evaluate_with(ast, record, &EvalOptions::default())
}

/// Evaluate an AST against a record
///
/// AND stops at the first false operand and OR at the first true one; the
/// skipped operand is never visited, so it cannot raise an error.
pub fn evaluate_with(
    ast: &AstNode,
    record: &Record,
    options: &EvalOptions,
) -> Result<bool, EvalError> {
    match ast {
        AstNode::Comparison(cmp) => check_comparison(cmp, record, options),
        AstNode::Logical {
            op: LogicalOp::And,
            left,
            right,
        } => Ok(evaluate_with(left, record, options)? && evaluate_with(right, record, options)?),
        AstNode::Logical {
            op: LogicalOp::Or,
            left,
            right,
        } => Ok(evaluate_with(left, record, options)? || evaluate_with(right, record, options)?),
        AstNode::Not { operand } => Ok(!evaluate_with(operand, record, options)?),
    }
}

fn check_comparison(
    cmp: &Comparison,
    record: &Record,
    options: &EvalOptions,
) -> Result<bool, EvalError> {
    let value = record
        .get(&cmp.attribute)
        .ok_or_else(|| EvalError::MissingAttribute {
            name: cmp.attribute.clone(),
        })?;

    match (value, &cmp.value) {
        // Number comparisons
        (Value::Number(v), Literal::Number(l)) => Ok(apply(cmp.operator, v.partial_cmp(l))),

        // String comparisons
        (Value::String(v), Literal::String(l)) => {
            if cmp.operator.is_equality() {
                return Ok(apply(cmp.operator, Some(v.as_str().cmp(l.as_str()))));
            }
            match options.string_ordering {
                StringOrdering::Lexicographic => {
                    Ok(apply(cmp.operator, Some(v.as_bytes().cmp(l.as_bytes()))))
                }
                StringOrdering::Reject => Err(mismatch(cmp, ValueType::Number, ValueType::String)),
            }
        }

        // Booleans only support = and !=
        (Value::Boolean(v), Literal::Boolean(l)) => {
            if cmp.operator.is_equality() {
                Ok(apply(cmp.operator, Some(v.cmp(l))))
            } else {
                Err(mismatch(cmp, ValueType::Number, ValueType::Boolean))
            }
        }

        // No coercion between types
        (value, literal) => Err(mismatch(cmp, literal.value_type(), value.value_type())),
    }
}

fn mismatch(cmp: &Comparison, expected: ValueType, found: ValueType) -> EvalError {
    EvalError::TypeMismatch {
        attribute: cmp.attribute.clone(),
        expected,
        found,
    }
}

/// `None` (NaN involved) satisfies only `!=`
#[inline]
fn apply(op: ComparisonOp, ordering: Option<Ordering>) -> bool {
    match op {
        ComparisonOp::Greater => ordering == Some(Ordering::Greater),
        ComparisonOp::Less => ordering == Some(Ordering::Less),
        ComparisonOp::GreaterEqual => {
            matches!(ordering, Some(Ordering::Greater | Ordering::Equal))
        }
        ComparisonOp::LessEqual => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        ComparisonOp::Equal => ordering == Some(Ordering::Equal),
        ComparisonOp::NotEqual => ordering != Some(Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::parse;

    fn eval(rule: &str, record: &Record) -> Result<bool, EvalError> {
        evaluate(&parse(rule).unwrap(), record)
    }

    #[test]
    fn test_scenario_age_and_department() {
        let ast = parse(r#"Age > 25 AND Department = "IT""#).unwrap();

        let record = Record::new().with("Age", 30).with("Department", "IT");
        assert!(evaluate(&ast, &record).unwrap());

        let record = Record::new().with("Age", 20).with("Department", "IT");
        assert!(!evaluate(&ast, &record).unwrap());
    }

    #[test]
    fn test_numeric_operators() {
        let record = Record::new().with("x", 5);
        assert!(eval("x > 4", &record).unwrap());
        assert!(!eval("x > 5", &record).unwrap());
        assert!(eval("x >= 5", &record).unwrap());
        assert!(eval("x < 5.5", &record).unwrap());
        assert!(eval("x <= 5", &record).unwrap());
        assert!(eval("x = 5.0", &record).unwrap());
        assert!(eval("x != 6", &record).unwrap());
        assert!(eval("x > -1", &record).unwrap());
    }

    #[test]
    fn test_nan_only_satisfies_not_equal() {
        let record = Record::new().with("x", f64::NAN);
        assert!(!eval("x = 1", &record).unwrap());
        assert!(!eval("x > 1", &record).unwrap());
        assert!(!eval("x <= 1", &record).unwrap());
        assert!(eval("x != 1", &record).unwrap());
    }

    #[test]
    fn test_string_equality() {
        let record = Record::new().with("Department", "IT");
        assert!(eval(r#"Department = "IT""#, &record).unwrap());
        assert!(!eval(r#"Department = "it""#, &record).unwrap());
        assert!(eval(r#"Department != "HR""#, &record).unwrap());
    }

    #[test]
    fn test_string_ordering_rejected_by_default() {
        let record = Record::new().with("Name", "bob");
        let err = eval(r#"Name > "alice""#, &record).unwrap_err();
        assert_eq!(
            err,
            EvalError::TypeMismatch {
                attribute: "Name".to_string(),
                expected: ValueType::Number,
                found: ValueType::String,
            }
        );
    }

    #[test]
    fn test_string_ordering_lexicographic() {
        let options = EvalOptions {
            string_ordering: StringOrdering::Lexicographic,
        };
        let record = Record::new().with("Name", "bob");
        let ast = parse(r#"Name > "alice""#).unwrap();
        assert!(evaluate_with(&ast, &record, &options).unwrap());

        let ast = parse(r#"Name <= "Bob""#).unwrap();
        // Upper case sorts before lower case
        assert!(!evaluate_with(&ast, &record, &options).unwrap());
    }

    #[test]
    fn test_boolean_comparisons() {
        let record = Record::new().with("Active", true);
        assert!(eval("Active = true", &record).unwrap());
        assert!(eval("Active != FALSE", &record).unwrap());
        assert_eq!(
            eval("Active > false", &record).unwrap_err(),
            EvalError::TypeMismatch {
                attribute: "Active".to_string(),
                expected: ValueType::Number,
                found: ValueType::Boolean,
            }
        );
    }

    #[test]
    fn test_type_mismatch() {
        let record = Record::new().with("Age", "thirty");
        let err = eval("Age > 25", &record).unwrap_err();
        assert_eq!(
            err,
            EvalError::TypeMismatch {
                attribute: "Age".to_string(),
                expected: ValueType::Number,
                found: ValueType::String,
            }
        );

        // No coercion even for equality
        let record = Record::new().with("Code", 7);
        let err = eval(r#"Code = "7""#, &record).unwrap_err();
        assert!(matches!(
            err,
            EvalError::TypeMismatch {
                expected: ValueType::String,
                found: ValueType::Number,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_attribute() {
        let record = Record::new().with("Age", 30);
        let err = eval("Salary > 100", &record).unwrap_err();
        assert_eq!(
            err,
            EvalError::MissingAttribute {
                name: "Salary".to_string()
            }
        );
    }

    #[test]
    fn test_and_short_circuits() {
        let record = Record::new().with("Age", 20);
        // Right side references a missing attribute but is never reached
        assert!(!eval("Age > 25 AND Salary > 100", &record).unwrap());
        assert!(eval("Age > 25 AND Salary > 100", &Record::new().with("Age", 30)).is_err());
    }

    #[test]
    fn test_or_short_circuits() {
        let record = Record::new().with("Age", 30);
        assert!(eval(r#"Age > 25 OR Name > "x""#, &record).unwrap());
        assert!(eval("Age < 25 OR Salary > 100", &record).is_err());
    }

    #[test]
    fn test_not() {
        let record = Record::new().with("Age", 30);
        assert!(!eval("NOT Age > 25", &record).unwrap());
        assert!(eval("NOT (Age > 40 OR Age < 18)", &record).unwrap());
    }

    #[test]
    fn test_precedence_example() {
        let record = Record::new().with("A", 0).with("B", 1).with("C", 1);
        assert!(eval("A=1 OR B=1 AND C=1", &record).unwrap());
    }
}
