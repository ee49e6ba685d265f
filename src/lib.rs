//! Rule Engine Core - parse, combine and evaluate conditional rules
//!
//! Rules such as `Age > 25 AND Department = "IT"` are parsed into ASTs,
//! several rules can be joined into one tree, and any tree can be evaluated
//! against a record of attribute values. Python bindings are available
//! behind the `python` feature.
//!
//! ```
//! use rule_engine_core::{combine, evaluate, parse, CombineStrategy, Record};
//! use std::sync::Arc;
//!
//! let it = Arc::new(parse(r#"Age > 25 AND Department = "IT""#).unwrap());
//! let senior = Arc::new(parse("Salary > 50000 AND Experience > 5").unwrap());
//! let either = combine(&[it, senior], CombineStrategy::Any).unwrap();
//!
//! let record = Record::new().with("Age", 30).with("Department", "IT");
//! assert!(evaluate(&either, &record).unwrap());
//! ```

pub mod combiner;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod rule;
pub mod store;

pub use combiner::{combine, combine_with, deduplicate, CombineOptions, CombineStrategy};
pub use config::EngineConfig;
pub use engine::RuleEngine;
pub use error::{
    CombineError, EvalError, LexError, ParseError, Result, RuleEngineError, StoreError,
};
pub use evaluator::{evaluate, evaluate_with, EvalOptions, Record, StringOrdering, Value};
pub use rule::{
    parse, tokenize, AstNode, Comparison, ComparisonOp, Literal, LogicalOp, MAX_TREE_DEPTH,
};
pub use store::{MemoryRuleStore, Rule, RuleId, RuleStore};

#[cfg(feature = "python")]
mod python {
    use crate::combiner::CombineStrategy;
    use crate::config::{deserialize_engine_config, EngineConfig};
    use crate::engine::{deserialize_record, PyRule, RuleEngine};
    use crate::error::RuleEngineError;
    use crate::store::RuleId;
    use once_cell::sync::OnceCell;
    use parking_lot::RwLock;
    use pyo3::prelude::*;
    use pyo3::types::PyDict;
    use std::sync::Arc;

    // ========================================================================
    // Cached Engine
    // ========================================================================

    /// Global engine, created by `init_engine`
    static ENGINE: OnceCell<Arc<RwLock<RuleEngine>>> = OnceCell::new();

    fn engine() -> PyResult<Arc<RwLock<RuleEngine>>> {
        ENGINE.get().cloned().ok_or_else(|| {
            PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(
                "Engine not initialized. Call init_engine() first.",
            )
        })
    }

    fn parse_strategy(strategy: Option<String>) -> PyResult<Option<CombineStrategy>> {
        strategy
            .map(|s| s.parse::<CombineStrategy>().map_err(RuleEngineError::from))
            .transpose()
            .map_err(PyErr::from)
    }

    fn to_ids(ids: Vec<u64>) -> Vec<RuleId> {
        ids.into_iter().map(RuleId).collect()
    }

    // ========================================================================
    // Python Functions
    // ========================================================================

    /// Initialize the rule engine (call once at startup)
    ///
    /// Calling it again replaces the engine, dropping every stored rule.
    ///
    /// # Arguments
    /// * `config` - Optional dict: {"default_strategy": "ANY"|"ALL",
    ///   "deduplicate": bool, "string_ordering": "REJECT"|"LEXICOGRAPHIC"}
    #[pyfunction]
    #[pyo3(signature = (config=None))]
    fn init_engine(config: Option<&Bound<'_, PyDict>>) -> PyResult<()> {
        let engine_config = match config {
            Some(dict) => deserialize_engine_config(dict)?,
            None => EngineConfig::default(),
        };
        let engine = RuleEngine::new(engine_config);

        if let Some(existing) = ENGINE.get() {
            let mut guard = existing.write();
            *guard = engine;
        } else {
            let _ = ENGINE.set(Arc::new(RwLock::new(engine)));
        }

        Ok(())
    }

    /// Check if the engine is initialized
    #[pyfunction]
    fn is_engine_initialized() -> bool {
        ENGINE.get().is_some()
    }

    /// Parse and store a rule
    ///
    /// # Raises
    /// ValueError on a lex or parse error
    #[pyfunction]
    fn create_rule(rule_string: &str) -> PyResult<PyRule> {
        let engine = engine()?;
        let rule = engine.read().create_rule(rule_string)?;
        Ok(PyRule::new(rule))
    }

    /// Fetch a stored rule
    ///
    /// # Raises
    /// KeyError if the id is unknown
    #[pyfunction]
    fn get_rule(rule_id: u64) -> PyResult<PyRule> {
        let engine = engine()?;
        let rule = engine.read().get_rule(RuleId(rule_id))?;
        Ok(PyRule::new(rule))
    }

    /// Replace the text of a stored rule
    #[pyfunction]
    fn modify_rule(rule_id: u64, rule_string: &str) -> PyResult<PyRule> {
        let engine = engine()?;
        let rule = engine.read().modify_rule(RuleId(rule_id), rule_string)?;
        Ok(PyRule::new(rule))
    }

    /// All stored rules, ascending by id
    #[pyfunction]
    fn list_rules() -> PyResult<Vec<PyRule>> {
        let engine = engine()?;
        let rules = engine.read().list_rules();
        Ok(rules.into_iter().map(PyRule::new).collect())
    }

    #[pyfunction]
    fn delete_rule(rule_id: u64) -> PyResult<()> {
        let engine = engine()?;
        engine.read().delete_rule(RuleId(rule_id))?;
        Ok(())
    }

    /// Combine stored rules and return the combined AST as JSON
    ///
    /// # Arguments
    /// * `rule_ids` - At least two rule ids, in join order
    /// * `strategy` - "ANY" (OR) or "ALL" (AND); engine default when omitted
    #[pyfunction]
    #[pyo3(signature = (rule_ids, strategy=None))]
    fn combine_rules(rule_ids: Vec<u64>, strategy: Option<String>) -> PyResult<String> {
        let strategy = parse_strategy(strategy)?;
        let engine = engine()?;
        let combined = engine.read().combine_rules(&to_ids(rule_ids), strategy)?;
        Ok(combined.to_json()?)
    }

    /// Combine stored rules and store the result as a new rule
    #[pyfunction]
    #[pyo3(signature = (rule_ids, strategy=None))]
    fn save_combined(rule_ids: Vec<u64>, strategy: Option<String>) -> PyResult<PyRule> {
        let strategy = parse_strategy(strategy)?;
        let engine = engine()?;
        let rule = engine.read().save_combined(&to_ids(rule_ids), strategy)?;
        Ok(PyRule::new(rule))
    }

    /// Evaluate a stored rule against a dict of attribute values
    ///
    /// # Raises
    /// KeyError if the rule or a reached attribute is missing,
    /// ValueError on a type mismatch
    #[pyfunction]
    fn evaluate_rule(rule_id: u64, data: &Bound<'_, PyDict>) -> PyResult<bool> {
        let record = deserialize_record(data)?;
        let engine = engine()?;
        let result = engine.read().evaluate_rule(RuleId(rule_id), &record)?;
        Ok(result)
    }

    /// Evaluate a stored rule asynchronously
    ///
    /// Runs on Tokio's blocking pool via pyo3-async-runtimes, so the asyncio
    /// event loop stays responsive.
    ///
    /// # Example (Python)
    /// ```python
    /// eligible = await evaluate_async(rule.id, {"Age": 26, "Department": "IT"})
    /// ```
    #[pyfunction]
    fn evaluate_async<'py>(
        py: Python<'py>,
        rule_id: u64,
        data: &Bound<'py, PyDict>,
    ) -> PyResult<Bound<'py, PyAny>> {
        // Convert Python objects before leaving the GIL
        let record = deserialize_record(data)?;
        let engine_arc = engine()?;

        pyo3_async_runtimes::tokio::future_into_py(py, async move {
            let result = tokio::task::spawn_blocking(move || {
                let engine = engine_arc.read();
                engine
                    .evaluate_rule(RuleId(rule_id), &record)
                    .map_err(PyErr::from)
            })
            .await
            .map_err(|e| {
                PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!(
                    "Evaluation task panicked: {}",
                    e
                ))
            })??;

            Ok(result)
        })
    }

    // ========================================================================
    // Python Module Definition
    // ========================================================================

    /// Python module definition
    #[pymodule]
    fn rule_engine_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(init_engine, m)?)?;
        m.add_function(wrap_pyfunction!(is_engine_initialized, m)?)?;
        m.add_function(wrap_pyfunction!(create_rule, m)?)?;
        m.add_function(wrap_pyfunction!(get_rule, m)?)?;
        m.add_function(wrap_pyfunction!(modify_rule, m)?)?;
        m.add_function(wrap_pyfunction!(list_rules, m)?)?;
        m.add_function(wrap_pyfunction!(delete_rule, m)?)?;
        m.add_function(wrap_pyfunction!(combine_rules, m)?)?;
        m.add_function(wrap_pyfunction!(save_combined, m)?)?;
        m.add_function(wrap_pyfunction!(evaluate_rule, m)?)?;
        m.add_function(wrap_pyfunction!(evaluate_async, m)?)?;
        m.add_class::<PyRule>()?;
        Ok(())
    }
}
