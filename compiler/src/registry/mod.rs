//! Collaborators the lowering pass consumes
//!
//! Each concern is a trait with one in-memory implementation backed by the
//! symbol table.

pub mod declarations;
pub mod members;
pub mod type_converter;

pub use declarations::{DeclarationRegistry, DeclarationStorage, ScopeBalance};
pub use members::{CallableId, MemberResolver, ProcessorAction, SupertypeMemberResolver, UseSiteScope};
pub use type_converter::{TypeConverter, TypeTranslator};
