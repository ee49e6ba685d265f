//! Error types for the rule engine core

use crate::evaluator::ValueType;
use crate::store::RuleId;
use thiserror::Error;

/// Tokenizer failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("unexpected character '{ch}' at position {position}")]
    UnexpectedChar { position: usize, ch: char },

    #[error("unterminated string literal starting at position {position}")]
    UnterminatedString { position: usize },

    #[error("number literal at position {position} is out of range")]
    NumberOutOfRange { position: usize },
}

impl LexError {
    /// Character offset the error points at
    pub fn position(&self) -> usize {
        match self {
            LexError::UnexpectedChar { position, .. } => *position,
            LexError::UnterminatedString { position } => *position,
            LexError::NumberOutOfRange { position } => *position,
        }
    }
}

/// Parser failure
///
/// `expected` names what the grammar allowed at `position`, `found` describes
/// the token actually there (or "end of input").
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("expected {expected} at position {position}, found {found}")]
pub struct ParseError {
    pub position: usize,
    pub expected: String,
    pub found: String,
}

/// Combiner failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CombineError {
    #[error("at least two rules are required for combining, got {count}")]
    TooFew { count: usize },

    #[error("combined rule would be {depth} levels deep, the limit is {max}")]
    TooDeep { depth: usize, max: usize },

    #[error("unknown combine strategy: {0} (expected ANY or ALL)")]
    UnknownStrategy(String),
}

/// Evaluation failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("attribute not found in record: {name}")]
    MissingAttribute { name: String },

    /// The record value does not fit the comparison. Normally `expected` is
    /// the literal's type. When `<`, `>`, `<=` or `>=` is applied to strings
    /// (with ordering rejected) or to booleans, `expected` is `Number`, the
    /// only type those operators always accept, and `found` is the shared
    /// type of both sides.
    #[error("type mismatch on attribute {attribute}: expected {expected}, found {found}")]
    TypeMismatch {
        attribute: String,
        expected: ValueType,
        found: ValueType,
    },
}

/// Rule store failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("rule not found: {0}")]
    NotFound(RuleId),
}

/// Main error type for the rule engine core
#[derive(Error, Debug)]
pub enum RuleEngineError {
    #[error("Lex error: {0}")]
    Lex(#[from] LexError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Combine error: {0}")]
    Combine(#[from] CombineError),

    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid AST: {0}")]
    InvalidAst(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(feature = "python")]
impl From<RuleEngineError> for pyo3::PyErr {
    fn from(err: RuleEngineError) -> pyo3::PyErr {
        use pyo3::exceptions::{PyKeyError, PyValueError};

        match err {
            RuleEngineError::Eval(EvalError::MissingAttribute { name }) => {
                PyKeyError::new_err(format!("Attribute not found: {}", name))
            }
            RuleEngineError::Store(StoreError::NotFound(id)) => {
                PyKeyError::new_err(format!("Rule not found: {}", id))
            }
            other => PyValueError::new_err(other.to_string()),
        }
    }
}

/// Result type alias for the rule engine core
pub type Result<T> = std::result::Result<T, RuleEngineError>;
