//! Rule text handling
//!
//! This module turns rule strings like `Age > 25 AND Department = "IT"`
//! into ASTs and back into canonical text.

mod ast;
pub mod cache;
pub mod lexer;
pub mod parser;


pub use ast::*;
pub use cache::*;
pub use lexer::*;
pub use parser::*;
