//! Types of the lowered tree
//!
//! Aliases are gone at this level; class and type-parameter types keep the
//! symbol of their declaration so that the registry can map them to lowered
//! declarations on demand.

use crate::tast::{PrimitiveType, SymbolId};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum IrType {
    Primitive {
        primitive: PrimitiveType,
        nullable: bool,
    },
    Class {
        classifier: SymbolId,
        arguments: Vec<IrType>,
        nullable: bool,
    },
    TypeParameter {
        owner: SymbolId,
        index: u32,
        nullable: bool,
    },
    Function {
        parameters: Vec<IrType>,
        return_type: Box<IrType>,
        nullable: bool,
    },
    /// Type of error nodes and of references resolution could not type
    Error,
}

impl IrType {
    pub const fn primitive(primitive: PrimitiveType) -> Self {
        IrType::Primitive {
            primitive,
            nullable: false,
        }
    }

    pub const fn unit() -> Self {
        Self::primitive(PrimitiveType::Unit)
    }

    pub const fn boolean() -> Self {
        Self::primitive(PrimitiveType::Boolean)
    }

    pub const fn string() -> Self {
        Self::primitive(PrimitiveType::String)
    }

    pub const fn nothing() -> Self {
        Self::primitive(PrimitiveType::Nothing)
    }

    /// Self type of a class: the class applied to its own type parameters
    pub fn self_type(class: SymbolId, type_parameter_count: usize) -> Self {
        IrType::Class {
            classifier: class,
            arguments: (0..type_parameter_count as u32)
                .map(|index| IrType::TypeParameter {
                    owner: class,
                    index,
                    nullable: false,
                })
                .collect(),
            nullable: false,
        }
    }

    pub fn is_nullable(&self) -> bool {
        match self {
            IrType::Primitive { nullable, .. }
            | IrType::Class { nullable, .. }
            | IrType::TypeParameter { nullable, .. }
            | IrType::Function { nullable, .. } => *nullable,
            IrType::Error => false,
        }
    }

    pub fn make_nullable(mut self) -> Self {
        match &mut self {
            IrType::Primitive { nullable, .. }
            | IrType::Class { nullable, .. }
            | IrType::TypeParameter { nullable, .. }
            | IrType::Function { nullable, .. } => *nullable = true,
            IrType::Error => {}
        }
        self
    }

    pub fn classifier(&self) -> Option<SymbolId> {
        match self {
            IrType::Class { classifier, .. } => Some(*classifier),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, IrType::Error)
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nullable = match self {
            IrType::Primitive { primitive, nullable } => {
                write!(f, "{}", primitive)?;
                *nullable
            }
            IrType::Class {
                classifier,
                arguments,
                nullable,
            } => {
                write!(f, "#{}", classifier.as_raw())?;
                if !arguments.is_empty() {
                    f.write_str("<")?;
                    for (i, argument) in arguments.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{}", argument)?;
                    }
                    f.write_str(">")?;
                }
                *nullable
            }
            IrType::TypeParameter {
                owner,
                index,
                nullable,
            } => {
                write!(f, "T{}@#{}", index, owner.as_raw())?;
                *nullable
            }
            IrType::Function {
                parameters,
                return_type,
                nullable,
            } => {
                f.write_str("(")?;
                for (i, parameter) in parameters.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", parameter)?;
                }
                write!(f, ") -> {}", return_type)?;
                *nullable
            }
            IrType::Error => return f.write_str("<error>"),
        };
        if nullable {
            f.write_str("?")?;
        }
        Ok(())
    }
}
