//! Lowering errors and recovered diagnostics
//!
//! Two channels: [`LoweringError`] aborts the unit and surfaces to the
//! caller, [`LoweringDiagnostic`] records a reference that lowered to an
//! error node and lets the unit complete.

use crate::error_codes::{self, format_error_code, get_error_code};
use crate::ir::{IrDeclId, IrErrorKind};
use crate::tast::{SourceLocation, SymbolId, SymbolKind};
use thiserror::Error;

pub type LoweringResult<T> = Result<T, LoweringError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LoweringError {
    #[error("unsupported construct `{construct}` at {location}")]
    Unsupported {
        construct: String,
        location: SourceLocation,
    },

    #[error("read from empty {stack} stack")]
    EmptyContextStack { stack: &'static str },

    #[error("scope left without a matching enter: {detail}")]
    UnbalancedScope { detail: String },

    #[error("{decl} already has a body")]
    BodyAlreadyAttached { decl: IrDeclId },

    #[error("{child} is owned by {existing}, cannot attach it to {requested}")]
    ParentConflict {
        child: IrDeclId,
        existing: IrDeclId,
        requested: IrDeclId,
    },

    #[error("expected a {expected} at {decl}, found a {found}")]
    UnexpectedDeclaration {
        decl: IrDeclId,
        expected: &'static str,
        found: &'static str,
    },

    #[error("no symbol {0} in the symbol table")]
    UnknownSymbol(SymbolId),

    #[error("{symbol} is a {found}, expected a {expected}")]
    SymbolKindMismatch {
        symbol: SymbolId,
        expected: SymbolKind,
        found: SymbolKind,
    },

    #[error("invalid lowered tree: {0}")]
    InvalidTree(String),
}

impl LoweringError {
    pub fn unsupported(construct: impl Into<String>, location: SourceLocation) -> Self {
        LoweringError::Unsupported {
            construct: construct.into(),
            location,
        }
    }

    /// Stable registry code, see [`crate::error_codes`]
    pub fn code(&self) -> u16 {
        match self {
            LoweringError::Unsupported { .. } => error_codes::UNSUPPORTED_CONSTRUCT,
            LoweringError::EmptyContextStack { .. } => error_codes::EMPTY_CONTEXT_STACK,
            LoweringError::UnbalancedScope { .. } => error_codes::UNBALANCED_SCOPE,
            LoweringError::BodyAlreadyAttached { .. } => error_codes::BODY_ALREADY_ATTACHED,
            LoweringError::ParentConflict { .. } => error_codes::PARENT_CONFLICT,
            LoweringError::UnexpectedDeclaration { .. } => error_codes::UNEXPECTED_DECLARATION,
            LoweringError::UnknownSymbol(_) => error_codes::UNKNOWN_SYMBOL,
            LoweringError::SymbolKindMismatch { .. } => error_codes::SYMBOL_KIND_MISMATCH,
            LoweringError::InvalidTree(_) => error_codes::INVALID_TREE,
        }
    }

    /// Internal errors point at a bug in lowering or a collaborator rather
    /// than at the input
    pub fn is_internal(&self) -> bool {
        !matches!(self, LoweringError::Unsupported { .. })
    }
}

/// An error node produced while lowering a unit
#[derive(Debug, Clone, PartialEq)]
pub struct LoweringDiagnostic {
    pub code: u16,
    pub kind: IrErrorKind,
    pub message: String,
    pub location: SourceLocation,
}

impl LoweringDiagnostic {
    pub fn new(kind: IrErrorKind, message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            code: error_codes::code_for_error_node(kind),
            kind,
            message: message.into(),
            location,
        }
    }

    pub fn format_code(&self) -> String {
        format_error_code(self.code)
    }

    /// Registered description of the code
    pub fn description(&self) -> &'static str {
        get_error_code(self.code).map_or("Lowering error", |entry| entry.description)
    }

    pub fn help(&self) -> Option<&'static str> {
        get_error_code(self.code).and_then(|entry| entry.help)
    }
}

impl std::fmt::Display for LoweringDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} at {}: {}",
            self.format_code(),
            self.description(),
            self.location,
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_is_the_only_input_error() {
        let unsupported = LoweringError::unsupported("operator <", SourceLocation::unknown());
        assert!(!unsupported.is_internal());
        assert!(LoweringError::EmptyContextStack { stack: "function" }.is_internal());
        assert_eq!(unsupported.code(), error_codes::UNSUPPORTED_CONSTRUCT);
    }

    #[test]
    fn diagnostics_carry_the_error_node_code() {
        let diagnostic = LoweringDiagnostic::new(
            IrErrorKind::UnboundLoop,
            "break outside of its loop",
            SourceLocation::new(0, 3, 5, 0),
        );
        assert_eq!(diagnostic.code, error_codes::UNBOUND_LOOP);
        assert_eq!(
            diagnostic.to_string(),
            "E5302 Jump outside of its target loop at 0:3:5: break outside of its loop"
        );
        assert!(diagnostic.help().is_some());
    }
}
