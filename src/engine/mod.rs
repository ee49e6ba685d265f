//! Rule engine module

mod rule_engine;

#[cfg(feature = "python")]
mod bindings;

pub use rule_engine::*;

#[cfg(feature = "python")]
pub use bindings::*;
