//! Lowered tree
//!
//! The target of lowering: dispatch is explicit, property access goes through
//! accessors or fields, constructors carry their delegating call and the
//! instance-initializer marker. Declarations live in an [`IrArena`] and are
//! addressed by [`IrDeclId`]; expressions are owned trees.

pub mod dump;
pub mod tree;
pub mod types;
pub mod validation;

pub use tree::*;
pub use types::*;

use crate::tast::id_types::define_id_type;
use serde::Serialize;
use std::fmt;

define_id_type! {
    /// Lowered declaration in an [`IrArena`]
    IrDeclId
}

define_id_type! {
    /// Lowered loop, the target of lowered `break`/`continue`
    IrLoopId
}
