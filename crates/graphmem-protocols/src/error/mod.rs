//! Error types for the graphmem protocol layer.

mod embedding;
mod memory;
mod store;
mod tool;
mod warning;

pub use embedding::*;
pub use memory::*;
pub use store::*;
pub use tool::*;
pub use warning::*;
