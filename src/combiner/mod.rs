//! Rule combining module
//!
//! Joins several rule ASTs into one and shares repeated subtrees.

mod combine;
mod dedup;
mod strategy;


pub use combine::*;
pub use dedup::*;
pub use strategy::*;
