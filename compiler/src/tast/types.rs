//! Resolved type references carried by the typed tree

use super::SymbolId;
use serde::Serialize;
use std::fmt;

/// Built-in types that need no declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PrimitiveType {
    Unit,
    Boolean,
    Char,
    Int,
    Long,
    Float,
    Double,
    String,
    Any,
    Nothing,
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrimitiveType::Unit => "Unit",
            PrimitiveType::Boolean => "Boolean",
            PrimitiveType::Char => "Char",
            PrimitiveType::Int => "Int",
            PrimitiveType::Long => "Long",
            PrimitiveType::Float => "Float",
            PrimitiveType::Double => "Double",
            PrimitiveType::String => "String",
            PrimitiveType::Any => "Any",
            PrimitiveType::Nothing => "Nothing",
        };
        f.write_str(name)
    }
}

/// A type reference as resolution left it.
///
/// Aliases are kept unexpanded; consumers expand them through the symbol
/// table when they need the underlying classifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Primitive {
        primitive: PrimitiveType,
        nullable: bool,
    },
    /// Class, interface or object type
    Class {
        symbol: SymbolId,
        arguments: Vec<TypeRef>,
        nullable: bool,
    },
    /// Use of a type alias
    Alias {
        symbol: SymbolId,
        arguments: Vec<TypeRef>,
        nullable: bool,
    },
    /// Type parameter `index` of the declaration `owner`
    TypeParameter {
        owner: SymbolId,
        index: u32,
        nullable: bool,
    },
    Function {
        parameters: Vec<TypeRef>,
        return_type: Box<TypeRef>,
        nullable: bool,
    },
    /// Resolution could not determine the type
    Error,
}

impl TypeRef {
    pub const fn primitive(primitive: PrimitiveType) -> Self {
        TypeRef::Primitive {
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

    pub const fn int() -> Self {
        Self::primitive(PrimitiveType::Int)
    }

    pub const fn string() -> Self {
        Self::primitive(PrimitiveType::String)
    }

    pub const fn any() -> Self {
        Self::primitive(PrimitiveType::Any)
    }

    pub const fn nothing() -> Self {
        Self::primitive(PrimitiveType::Nothing)
    }

    /// Non-null class type without type arguments
    pub fn class(symbol: SymbolId) -> Self {
        TypeRef::Class {
            symbol,
            arguments: Vec::new(),
            nullable: false,
        }
    }

    /// Non-null alias use without type arguments
    pub fn alias(symbol: SymbolId) -> Self {
        TypeRef::Alias {
            symbol,
            arguments: Vec::new(),
            nullable: false,
        }
    }

    pub fn is_nullable(&self) -> bool {
        match self {
            TypeRef::Primitive { nullable, .. }
            | TypeRef::Class { nullable, .. }
            | TypeRef::Alias { nullable, .. }
            | TypeRef::TypeParameter { nullable, .. }
            | TypeRef::Function { nullable, .. } => *nullable,
            TypeRef::Error => false,
        }
    }

    /// Same type with the nullability flag replaced
    pub fn with_nullability(mut self, value: bool) -> Self {
        match &mut self {
            TypeRef::Primitive { nullable, .. }
            | TypeRef::Class { nullable, .. }
            | TypeRef::Alias { nullable, .. }
            | TypeRef::TypeParameter { nullable, .. }
            | TypeRef::Function { nullable, .. } => *nullable = value,
            TypeRef::Error => {}
        }
        self
    }

    /// Class symbol this type names directly, without alias expansion
    pub fn classifier(&self) -> Option<SymbolId> {
        match self {
            TypeRef::Class { symbol, .. } => Some(*symbol),
            _ => None,
        }
    }
}
