//! Rule store module

mod memory;
mod rule;

pub use memory::*;
pub use rule::*;
