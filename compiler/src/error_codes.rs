//! Error code registry for the lowering pass
//!
//! Codes are stable across releases so that tooling can match on them.
//!
//! # Error Code Ranges
//!
//! - E5300-E5389: Constructs lowering rejects or recovers from
//! - E5390-E5399: Internal invariant violations of the pass and its registry
//!
//! Codes in the first range are tied to the input; codes in the second range
//! always indicate a bug.

use crate::ir::IrErrorKind;
use fxhash::FxHashMap;
use std::fmt;

pub const UNSUPPORTED_CONSTRUCT: u16 = 5300;
pub const UNRESOLVED_REFERENCE: u16 = 5301;
pub const UNBOUND_LOOP: u16 = 5302;
pub const MISSING_BACKING_FIELD: u16 = 5303;

pub const EMPTY_CONTEXT_STACK: u16 = 5390;
pub const UNBALANCED_SCOPE: u16 = 5391;
pub const BODY_ALREADY_ATTACHED: u16 = 5392;
pub const PARENT_CONFLICT: u16 = 5393;
pub const UNEXPECTED_DECLARATION: u16 = 5394;
pub const UNKNOWN_SYMBOL: u16 = 5395;
pub const SYMBOL_KIND_MISMATCH: u16 = 5396;
pub const INVALID_TREE: u16 = 5397;

/// Error code struct containing the numeric code and human-readable description
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    pub code: u16,
    pub category: &'static str,
    pub description: &'static str,
    /// Optional help text with suggestions for fixing the error
    pub help: Option<&'static str>,
}

impl ErrorCode {
    pub const fn new(
        code: u16,
        category: &'static str,
        description: &'static str,
        help: Option<&'static str>,
    ) -> Self {
        Self {
            code,
            category,
            description,
            help,
        }
    }

    /// Format the error code as "E{code:04}" (e.g., "E5301")
    pub fn format_code(&self) -> String {
        format_error_code(self.code)
    }

}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]: {}",
            self.format_code(),
            self.category,
            self.description
        )
    }
}

/// Registry containing all defined error codes
pub struct ErrorCodeRegistry {
    codes: FxHashMap<u16, ErrorCode>,
}

impl ErrorCodeRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            codes: FxHashMap::default(),
        };
        registry.register_all_codes();
        registry
    }

    pub fn get(&self, code: u16) -> Option<&ErrorCode> {
        self.codes.get(&code)
    }

    fn register(&mut self, error_code: ErrorCode) {
        self.codes.insert(error_code.code, error_code);
    }

    fn register_all_codes(&mut self) {
        // ===== RECOVERABLE (E5300-E5389) =====
        self.register(ErrorCode::new(
            UNSUPPORTED_CONSTRUCT,
            "Lowering",
            "Construct has no lowered form",
            Some("Only `==` lowers from the operator family; rewrite the expression as a call"),
        ));
        self.register(ErrorCode::new(
            UNRESOLVED_REFERENCE,
            "Lowering",
            "Unresolved reference",
            Some("Resolution left this reference without a target; check earlier diagnostics"),
        ));
        self.register(ErrorCode::new(
            UNBOUND_LOOP,
            "Lowering",
            "Jump outside of its target loop",
            Some("`break` and `continue` must appear inside the loop they name"),
        ));
        self.register(ErrorCode::new(
            MISSING_BACKING_FIELD,
            "Lowering",
            "Property has no backing field",
            Some("Assign through the property setter, or give the property an initializer"),
        ));

        // ===== INTERNAL (E5390-E5399) =====
        self.register(ErrorCode::new(
            EMPTY_CONTEXT_STACK,
            "Internal",
            "Context stack read while empty",
            None,
        ));
        self.register(ErrorCode::new(
            UNBALANCED_SCOPE,
            "Internal",
            "Registry scope left without a matching enter",
            None,
        ));
        self.register(ErrorCode::new(
            BODY_ALREADY_ATTACHED,
            "Internal",
            "Body attached to a declaration twice",
            None,
        ));
        self.register(ErrorCode::new(
            PARENT_CONFLICT,
            "Internal",
            "Declaration attached to a second parent",
            None,
        ));
        self.register(ErrorCode::new(
            UNEXPECTED_DECLARATION,
            "Internal",
            "Lowered declaration has an unexpected kind",
            None,
        ));
        self.register(ErrorCode::new(
            UNKNOWN_SYMBOL,
            "Internal",
            "Symbol missing from the symbol table",
            Some("Index every file of the module before lowering it"),
        ));
        self.register(ErrorCode::new(
            SYMBOL_KIND_MISMATCH,
            "Internal",
            "Symbol has an unexpected kind",
            None,
        ));
        self.register(ErrorCode::new(
            INVALID_TREE,
            "Internal",
            "Lowered tree violates ownership rules",
            None,
        ));
    }

}

impl Default for ErrorCodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static REGISTRY: std::sync::OnceLock<ErrorCodeRegistry> = std::sync::OnceLock::new();

/// Get the global error code registry
pub fn error_registry() -> &'static ErrorCodeRegistry {
    REGISTRY.get_or_init(ErrorCodeRegistry::new)
}

pub fn get_error_code(code: u16) -> Option<&'static ErrorCode> {
    error_registry().get(code)
}

/// Code reported for an error node of the given kind
pub fn code_for_error_node(kind: IrErrorKind) -> u16 {
    match kind {
        IrErrorKind::UnresolvedReference => UNRESOLVED_REFERENCE,
        IrErrorKind::UnboundLoop => UNBOUND_LOOP,
        IrErrorKind::MissingBackingField => MISSING_BACKING_FIELD,
    }
}

/// Helper function to format error code string (e.g., 5301 -> "E5301")
pub fn format_error_code(code: u16) -> String {
    format!("E{:04}", code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup() {
        let registry = ErrorCodeRegistry::new();
        let unresolved = registry.get(UNRESOLVED_REFERENCE).unwrap();
        assert_eq!(unresolved.description, "Unresolved reference");
        assert_eq!(unresolved.category, "Lowering");
        assert!(registry.get(1).is_none());
    }

    #[test]
    fn test_every_error_code_is_registered() {
        for code in [
            UNSUPPORTED_CONSTRUCT,
            UNRESOLVED_REFERENCE,
            UNBOUND_LOOP,
            MISSING_BACKING_FIELD,
            EMPTY_CONTEXT_STACK,
            UNBALANCED_SCOPE,
            BODY_ALREADY_ATTACHED,
            PARENT_CONFLICT,
            UNEXPECTED_DECLARATION,
            UNKNOWN_SYMBOL,
            SYMBOL_KIND_MISMATCH,
            INVALID_TREE,
        ] {
            let entry = get_error_code(code).unwrap();
            assert_eq!(entry.code, code);
            assert_eq!(entry.category == "Internal", code >= EMPTY_CONTEXT_STACK);
        }
    }

    #[test]
    fn test_every_error_node_kind_has_help() {
        for kind in [
            IrErrorKind::UnresolvedReference,
            IrErrorKind::UnboundLoop,
            IrErrorKind::MissingBackingField,
        ] {
            assert!(get_error_code(code_for_error_node(kind)).unwrap().help.is_some());
        }
    }

    #[test]
    fn test_display_and_format() {
        assert_eq!(format_error_code(5301), "E5301");
        assert_eq!(
            get_error_code(UNBOUND_LOOP).unwrap().to_string(),
            "E5302 [Lowering]: Jump outside of its target loop"
        );
    }
}
