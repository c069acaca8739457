#![forbid(unsafe_code)]

mod arena;
mod leaves;
mod types;

pub use arena::*;
pub use leaves::*;
pub use types::*;
