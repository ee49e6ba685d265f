//! Engine configuration
//!
//! Loaded from JSON, or from a Python dict when built with the `python`
//! feature.

mod engine;

pub use engine::*;

#[cfg(feature = "python")]
use crate::combiner::CombineStrategy;
#[cfg(feature = "python")]
use crate::error::RuleEngineError;
#[cfg(feature = "python")]
use crate::evaluator::StringOrdering;
#[cfg(feature = "python")]
use pyo3::types::{PyAnyMethods, PyDict, PyDictMethods};
#[cfg(feature = "python")]
use pyo3::Bound;

/// Deserialize an engine config from a Python dict
/// Expected format: {"default_strategy": "ANY", "deduplicate": True, "string_ordering": "REJECT"}
/// Missing keys keep their defaults.
#[cfg(feature = "python")]
pub fn deserialize_engine_config(config: &Bound<'_, PyDict>) -> pyo3::PyResult<EngineConfig> {
    let mut engine_config = EngineConfig::default();

    if let Some(strategy) = config.get_item("default_strategy")? {
        let name: String = strategy.extract()?;
        engine_config.default_strategy = name
            .parse::<CombineStrategy>()
            .map_err(RuleEngineError::from)?;
    }

    if let Some(dedup) = config.get_item("deduplicate")? {
        engine_config.deduplicate = dedup.extract()?;
    }

    if let Some(ordering) = config.get_item("string_ordering")? {
        let name: String = ordering.extract()?;
        engine_config.string_ordering = match name.to_ascii_uppercase().as_str() {
            "REJECT" => StringOrdering::Reject,
            "LEXICOGRAPHIC" => StringOrdering::Lexicographic,
            _ => {
                return Err(pyo3::exceptions::PyValueError::new_err(format!(
                    "Invalid string_ordering: {}",
                    name
                )))
            }
        };
    }

    Ok(engine_config)
}
