//! Sources of hardware descriptions.

mod json;
pub use json::*;
