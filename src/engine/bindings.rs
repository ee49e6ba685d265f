//! PyRule - rule handle for the Python-Rust boundary
//!
//! Rules stay in Rust heap memory behind an `Arc`; Python reads fields
//! lazily through getters.

use pyo3::prelude::*;
use pyo3::types::{PyBool, PyDict};
use std::sync::Arc;

use crate::error::RuleEngineError;
use crate::evaluator::{Record, Value};
use crate::store::Rule;

/// Stored rule exposed to Python
#[pyclass(name = "Rule", frozen)]
#[derive(Debug, Clone)]
pub struct PyRule {
    inner: Arc<Rule>,
}

impl PyRule {
    pub fn new(inner: Arc<Rule>) -> Self {
        Self { inner }
    }
}

#[pymethods]
impl PyRule {
    #[getter]
    fn id(&self) -> u64 {
        self.inner.id.0
    }

    #[getter]
    fn source_text(&self) -> String {
        self.inner.source_text.clone()
    }

    /// Canonical rule text
    #[getter]
    fn canonical(&self) -> String {
        self.inner.canonical()
    }

    /// AST as a JSON string
    #[getter]
    fn ast_json(&self) -> PyResult<String> {
        Ok(self.inner.ast.to_json()?)
    }

    /// Attribute names the rule reads
    #[getter]
    fn attributes(&self) -> Vec<String> {
        self.inner
            .ast
            .attributes()
            .iter()
            .map(|name| name.to_string())
            .collect()
    }

    fn __repr__(&self) -> String {
        format!("Rule(id={}, source_text={:?})", self.inner.id, self.inner.source_text)
    }
}

/// Deserialize a record from a Python dict of bool / int / float / str values
pub fn deserialize_record(data: &Bound<'_, PyDict>) -> PyResult<Record> {
    let mut record = Record::new();
    for (key, value) in data.iter() {
        let name: String = key.extract()?;
        // bool is a subclass of int in Python, so check it first
        let value = if value.is_instance_of::<PyBool>() {
            Value::Boolean(value.extract()?)
        } else if let Ok(n) = value.extract::<f64>() {
            Value::Number(n)
        } else if let Ok(s) = value.extract::<String>() {
            Value::String(s)
        } else {
            return Err(RuleEngineError::InvalidRecord(format!(
                "unsupported value for attribute {}",
                name
            ))
            .into());
        };
        record.insert(name, value);
    }
    Ok(record)
}
