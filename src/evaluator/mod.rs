//! Rule evaluation module
//!
//! This module evaluates rule ASTs against attribute records.

mod eval;
mod value;


pub use eval::*;
pub use value::*;
