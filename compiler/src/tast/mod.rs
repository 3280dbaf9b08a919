//! Typed Abstract Syntax Tree
//!
//! The resolved source tree handed to lowering, together with the symbol
//! table built from it.

pub mod builder;
pub mod id_types;
pub mod node;
pub mod symbols;
pub mod types;

pub use id_types::*;
pub use node::*;
pub use symbols::*;
pub use types::*;
