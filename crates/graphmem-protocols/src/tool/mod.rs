//! Tool protocol definitions.
//!
//! Tools are how agent clients reach engine operations.

mod definition;
mod result;
mod traits;

pub use definition::*;
pub use result::*;
pub use traits::*;
