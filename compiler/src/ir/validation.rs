//! Lowered tree validation
//!
//! Checks the ownership invariants of a lowered file before it is handed
//! on: every declaration reachable from the file has exactly one parent,
//! that parent lists it, and synthesized stubs carry no body.

use super::{IrArena, IrDeclId, IrDeclarationKind, IrDeclarationOrigin};
use crate::lower::error::{LoweringError, LoweringResult};
use fxhash::FxHashSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub declaration: IrDeclId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// The unit root is not a file
    NotAFile,

    /// Referenced declaration was never allocated
    Dangling,

    /// Declaration reached from `owner` records another parent
    WrongParent {
        owner: IrDeclId,
        recorded: Option<IrDeclId>,
    },

    /// Declaration reached from two owners
    MultipleOwners { first: IrDeclId, second: IrDeclId },

    /// Fake override with a body
    FakeOverrideWithBody,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ValidationErrorKind::NotAFile => write!(f, "{} is not a file", self.declaration),
            ValidationErrorKind::Dangling => write!(f, "{} is not allocated", self.declaration),
            ValidationErrorKind::WrongParent { owner, recorded } => match recorded {
                Some(recorded) => write!(
                    f,
                    "{} is owned by {} but records {} as parent",
                    self.declaration, owner, recorded
                ),
                None => write!(
                    f,
                    "{} is owned by {} but records no parent",
                    self.declaration, owner
                ),
            },
            ValidationErrorKind::MultipleOwners { first, second } => write!(
                f,
                "{} is owned by both {} and {}",
                self.declaration, first, second
            ),
            ValidationErrorKind::FakeOverrideWithBody => {
                write!(f, "fake override {} has a body", self.declaration)
            }
        }
    }
}

/// Validate the tree rooted at `file`
pub fn validate_file(arena: &IrArena, file: IrDeclId) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    match arena.get(file).map(|decl| &decl.kind) {
        Some(IrDeclarationKind::File(_)) => {}
        Some(_) => {
            errors.push(ValidationError {
                kind: ValidationErrorKind::NotAFile,
                declaration: file,
            });
            return Err(errors);
        }
        None => {
            errors.push(ValidationError {
                kind: ValidationErrorKind::Dangling,
                declaration: file,
            });
            return Err(errors);
        }
    }

    // owner of every visited declaration
    let mut owners = fxhash::FxHashMap::default();
    let mut visited = FxHashSet::default();
    visited.insert(file);
    let mut worklist = vec![file];

    while let Some(owner) = worklist.pop() {
        for child in arena.children(owner) {
            let Some(declaration) = arena.get(child) else {
                errors.push(ValidationError {
                    kind: ValidationErrorKind::Dangling,
                    declaration: child,
                });
                continue;
            };
            if let Some(first) = owners.insert(child, owner) {
                errors.push(ValidationError {
                    kind: ValidationErrorKind::MultipleOwners {
                        first,
                        second: owner,
                    },
                    declaration: child,
                });
                continue;
            }
            if declaration.parent != Some(owner) {
                errors.push(ValidationError {
                    kind: ValidationErrorKind::WrongParent {
                        owner,
                        recorded: declaration.parent,
                    },
                    declaration: child,
                });
            }
            if declaration.origin == IrDeclarationOrigin::FakeOverride
                && matches!(&declaration.kind, IrDeclarationKind::Function(f) if f.body.is_some())
            {
                errors.push(ValidationError {
                    kind: ValidationErrorKind::FakeOverrideWithBody,
                    declaration: child,
                });
            }
            if visited.insert(child) {
                worklist.push(child);
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// [`validate_file`] folded into a single [`LoweringError::InvalidTree`]
pub fn ensure_valid(arena: &IrArena, file: IrDeclId) -> LoweringResult<()> {
    validate_file(arena, file).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        LoweringError::InvalidTree(messages.join("; "))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{IrFile, IrVariable, IrType};
    use crate::tast::SourceLocation;

    fn alloc_file(arena: &mut IrArena) -> IrDeclId {
        arena.alloc(
            IrDeclarationOrigin::Defined,
            SourceLocation::unknown(),
            IrDeclarationKind::File(IrFile {
                name: "f.kt".to_string(),
                package: Vec::new(),
                declarations: Vec::new(),
            }),
        )
    }

    #[test]
    fn accepts_attached_children() {
        let mut arena = IrArena::new();
        let file = alloc_file(&mut arena);
        let variable = arena.alloc(
            IrDeclarationOrigin::Defined,
            SourceLocation::unknown(),
            IrDeclarationKind::Variable(IrVariable {
                name: "v".to_string(),
                ty: IrType::unit(),
                is_mutable: false,
                initializer: None,
            }),
        );
        arena.attach(file, variable).unwrap();
        assert!(validate_file(&arena, file).is_ok());
    }

    #[test]
    fn reports_a_child_without_its_parent_link() {
        let mut arena = IrArena::new();
        let file = alloc_file(&mut arena);
        let other = alloc_file(&mut arena);
        if let Some(IrDeclarationKind::File(f)) = arena.get_mut(file).map(|d| &mut d.kind) {
            f.declarations.push(other);
        }
        let errors = validate_file(&arena, file).unwrap_err();
        assert_eq!(
            errors[0].kind,
            ValidationErrorKind::WrongParent {
                owner: file,
                recorded: None
            }
        );
        assert!(matches!(
            ensure_valid(&arena, file),
            Err(LoweringError::InvalidTree(_))
        ));
    }
}
