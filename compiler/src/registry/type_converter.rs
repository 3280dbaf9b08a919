//! Source type references to lowered types

use crate::ir::IrType;
use crate::tast::{SymbolTable, TypeRef};

/// Converts resolved type references into lowered types
pub trait TypeConverter {
    fn to_lowered_type(&self, ty: &TypeRef) -> IrType;
}

/// Converter backed by the symbol table; expands aliases on the way
#[derive(Debug, Clone, Copy)]
pub struct TypeTranslator<'s> {
    symbols: &'s SymbolTable,
}

impl<'s> TypeTranslator<'s> {
    pub fn new(symbols: &'s SymbolTable) -> Self {
        Self { symbols }
    }
}

impl TypeConverter for TypeTranslator<'_> {
    fn to_lowered_type(&self, ty: &TypeRef) -> IrType {
        match self.symbols.expand_alias(ty) {
            TypeRef::Primitive {
                primitive,
                nullable,
            } => IrType::Primitive {
                primitive,
                nullable,
            },
            TypeRef::Class {
                symbol,
                arguments,
                nullable,
            } => IrType::Class {
                classifier: symbol,
                arguments: arguments.iter().map(|arg| self.to_lowered_type(arg)).collect(),
                nullable,
            },
            TypeRef::TypeParameter {
                owner,
                index,
                nullable,
            } => IrType::TypeParameter {
                owner,
                index,
                nullable,
            },
            TypeRef::Function {
                parameters,
                return_type,
                nullable,
            } => IrType::Function {
                parameters: parameters.iter().map(|p| self.to_lowered_type(p)).collect(),
                return_type: Box::new(self.to_lowered_type(&return_type)),
                nullable,
            },
            // an alias that survived expansion is cyclic or unknown
            TypeRef::Alias { .. } | TypeRef::Error => IrType::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tast::builder::TastBuilder;
    use crate::tast::{PrimitiveType, TypedDeclaration};

    #[test]
    fn aliases_disappear_and_unknown_aliases_become_errors() {
        let mut b = TastBuilder::new();
        let alias = b.type_alias("Name", TypeRef::string());
        let alias_id = alias.symbol_id;
        let file = b.file("a.kt", vec![TypedDeclaration::TypeAlias(alias)]);
        let symbols = SymbolTable::from_files(&[file]);
        let translator = TypeTranslator::new(&symbols);

        assert_eq!(
            translator.to_lowered_type(&TypeRef::alias(alias_id).with_nullability(true)),
            IrType::Primitive {
                primitive: PrimitiveType::String,
                nullable: true
            }
        );
        assert_eq!(
            translator.to_lowered_type(&TypeRef::alias(b.fresh_symbol())),
            IrType::Error
        );
    }
}
