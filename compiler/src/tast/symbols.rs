//! Symbol table built from resolved typed files
//!
//! Resolution identifies every declaration with a [`SymbolId`]. The table
//! indexes those declarations so that the lowering pass and its collaborators
//! can answer questions about a reference target without finding its
//! declaration node: its kind and owner, a function's signature, a class's
//! supertypes and members, the flags that decide whether a property needs a
//! backing field.

use super::node::*;
use super::{SymbolId, TypeRef};
use fxhash::FxHashMap;
use serde::Serialize;
use std::fmt;

/// Position of a node in its source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SourceLocation {
    pub file_id: u32,
    /// 1-based
    pub line: u32,
    /// 1-based
    pub column: u32,
    pub byte_offset: u32,
}

impl SourceLocation {
    pub const fn new(file_id: u32, line: u32, column: u32, byte_offset: u32) -> Self {
        Self {
            file_id,
            line,
            column,
            byte_offset,
        }
    }

    pub const fn unknown() -> Self {
        Self::new(u32::MAX, 0, 0, 0)
    }

    pub const fn is_valid(self) -> bool {
        self.file_id != u32::MAX
    }
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}:{}:{}", self.file_id, self.line, self.column)
        } else {
            f.write_str("<unknown>")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Class,
    Function,
    Constructor,
    Property,
    Accessor,
    AnonymousInitializer,
    TypeAlias,
    TypeParameter,
    Parameter,
    Variable,
}

impl SymbolKind {
    /// Members that take part in inheritance and fake-override synthesis
    pub fn is_callable_member(self) -> bool {
        matches!(self, SymbolKind::Function | SymbolKind::Property)
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SymbolKind::Class => "class",
            SymbolKind::Function => "function",
            SymbolKind::Constructor => "constructor",
            SymbolKind::Property => "property",
            SymbolKind::Accessor => "accessor",
            SymbolKind::AnonymousInitializer => "initializer",
            SymbolKind::TypeAlias => "typealias",
            SymbolKind::TypeParameter => "type parameter",
            SymbolKind::Parameter => "parameter",
            SymbolKind::Variable => "variable",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub kind: SymbolKind,
    /// Declaration this symbol is nested in (class for members, function for locals)
    pub owner: Option<SymbolId>,
    /// Package of the file the symbol was declared in
    pub package: Vec<String>,
    /// Declared type of values, return type of functions, self type of classes
    pub ty: TypeRef,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub kind: ClassKind,
    pub modality: Modality,
    pub is_anonymous: bool,
    pub type_parameters: Vec<String>,
    pub supertypes: Vec<TypeRef>,
    /// Member declarations in source order
    pub members: Vec<SymbolId>,
    pub primary_constructor: Option<SymbolId>,
}

#[derive(Debug, Clone)]
pub struct ParameterInfo {
    pub symbol: SymbolId,
    pub name: String,
    pub ty: TypeRef,
    pub has_default: bool,
}

#[derive(Debug, Clone)]
pub struct FunctionSignature {
    pub type_parameters: Vec<String>,
    pub parameters: Vec<ParameterInfo>,
    pub return_type: TypeRef,
    pub modality: Modality,
}

/// Property facts needed to decide on backing storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyInfo {
    pub is_mutable: bool,
    pub modality: Modality,
    pub has_initializer: bool,
    pub has_default_getter: bool,
    pub has_default_setter: bool,
    /// Explicit accessors, present even when they are default ones
    pub getter: Option<SymbolId>,
    pub setter: Option<SymbolId>,
    pub setter_parameter: Option<SymbolId>,
}

impl PropertyInfo {
    pub fn of(property: &TypedProperty) -> Self {
        Self {
            is_mutable: property.is_mutable,
            modality: property.modality,
            has_initializer: property.initializer.is_some(),
            has_default_getter: property.has_default_getter(),
            has_default_setter: property.has_default_setter(),
            getter: property.getter.as_ref().map(|getter| getter.symbol_id),
            setter: property.setter.as_ref().map(|setter| setter.symbol_id),
            setter_parameter: property
                .setter
                .as_ref()
                .and_then(|setter| setter.parameter.as_ref())
                .map(|param| param.symbol_id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AliasInfo {
    pub type_parameters: Vec<String>,
    pub target: TypeRef,
}

/// Aliases deeper than this are treated as cyclic and left unexpanded
const MAX_ALIAS_DEPTH: usize = 64;

#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: FxHashMap<SymbolId, Symbol>,
    classes: FxHashMap<SymbolId, ClassInfo>,
    signatures: FxHashMap<SymbolId, FunctionSignature>,
    properties: FxHashMap<SymbolId, PropertyInfo>,
    aliases: FxHashMap<SymbolId, AliasInfo>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every declaration of the given files
    pub fn from_files(files: &[TypedFile]) -> Self {
        let mut table = Self::new();
        for file in files {
            table.index_file(file);
        }
        table
    }

    pub fn index_file(&mut self, file: &TypedFile) {
        let mut indexer = Indexer {
            table: self,
            package: &file.package,
        };
        for declaration in &file.declarations {
            indexer.declaration(declaration, None);
        }
        for annotation in &file.annotations {
            indexer.annotation(annotation, None);
        }
    }

    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(&id)
    }

    pub fn kind(&self, id: SymbolId) -> Option<SymbolKind> {
        self.symbols.get(&id).map(|symbol| symbol.kind)
    }

    pub fn name(&self, id: SymbolId) -> Option<&str> {
        self.symbols.get(&id).map(|symbol| symbol.name.as_str())
    }

    pub fn class_info(&self, id: SymbolId) -> Option<&ClassInfo> {
        self.classes.get(&id)
    }

    pub fn signature(&self, id: SymbolId) -> Option<&FunctionSignature> {
        self.signatures.get(&id)
    }

    pub fn property_info(&self, id: SymbolId) -> Option<&PropertyInfo> {
        self.properties.get(&id)
    }

    pub fn alias_info(&self, id: SymbolId) -> Option<&AliasInfo> {
        self.aliases.get(&id)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Owner of `id` if that owner is a class, i.e. `id` is a class member
    pub fn owner_class(&self, id: SymbolId) -> Option<SymbolId> {
        let owner = self.symbols.get(&id)?.owner?;
        (self.kind(owner) == Some(SymbolKind::Class)).then_some(owner)
    }

    /// Expand aliases until the type no longer names one.
    ///
    /// Type arguments of the alias use are substituted for the alias's own
    /// type parameters; nullability of the use is kept.
    pub fn expand_alias(&self, ty: &TypeRef) -> TypeRef {
        let mut current = ty.clone();
        for _ in 0..MAX_ALIAS_DEPTH {
            let TypeRef::Alias {
                symbol,
                arguments,
                nullable,
            } = &current
            else {
                return current;
            };
            let Some(info) = self.aliases.get(symbol) else {
                return current;
            };
            let expanded = substitute(&info.target, *symbol, arguments);
            let nullable = *nullable || expanded.is_nullable();
            current = expanded.with_nullability(nullable);
        }
        current
    }

    /// Class symbols of the direct supertypes of `class`, aliases expanded
    pub fn direct_supertypes(&self, class: SymbolId) -> Vec<SymbolId> {
        self.classes
            .get(&class)
            .map(|info| {
                info.supertypes
                    .iter()
                    .filter_map(|ty| self.expand_alias(ty).classifier())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether `class` is `ancestor` or inherits from it
    pub fn is_subclass_of(&self, class: SymbolId, ancestor: SymbolId) -> bool {
        let mut visited = fxhash::FxHashSet::default();
        let mut worklist = vec![class];
        while let Some(current) = worklist.pop() {
            if current == ancestor {
                return true;
            }
            if visited.insert(current) {
                worklist.extend(self.direct_supertypes(current));
            }
        }
        false
    }

    /// Members of `class` itself (not inherited) that carry the given name
    pub fn members_named<'t>(
        &'t self,
        class: SymbolId,
        name: &'t str,
    ) -> impl Iterator<Item = SymbolId> + 't {
        self.classes
            .get(&class)
            .into_iter()
            .flat_map(|info| info.members.iter().copied())
            .filter(move |member| {
                self.symbols
                    .get(member)
                    .is_some_and(|symbol| symbol.kind.is_callable_member() && symbol.name == name)
            })
    }

    fn insert(&mut self, symbol: Symbol) {
        self.symbols.insert(symbol.id, symbol);
    }
}

/// Replace type parameters of `owner` with the given arguments
fn substitute(ty: &TypeRef, owner: SymbolId, arguments: &[TypeRef]) -> TypeRef {
    match ty {
        TypeRef::TypeParameter {
            owner: param_owner,
            index,
            nullable,
        } if *param_owner == owner => match arguments.get(*index as usize) {
            Some(argument) => {
                let nullable = *nullable || argument.is_nullable();
                argument.clone().with_nullability(nullable)
            }
            None => ty.clone(),
        },
        TypeRef::Class {
            symbol,
            arguments: inner,
            nullable,
        } => TypeRef::Class {
            symbol: *symbol,
            arguments: inner.iter().map(|arg| substitute(arg, owner, arguments)).collect(),
            nullable: *nullable,
        },
        TypeRef::Alias {
            symbol,
            arguments: inner,
            nullable,
        } => TypeRef::Alias {
            symbol: *symbol,
            arguments: inner.iter().map(|arg| substitute(arg, owner, arguments)).collect(),
            nullable: *nullable,
        },
        TypeRef::Function {
            parameters,
            return_type,
            nullable,
        } => TypeRef::Function {
            parameters: parameters
                .iter()
                .map(|param| substitute(param, owner, arguments))
                .collect(),
            return_type: Box::new(substitute(return_type, owner, arguments)),
            nullable: *nullable,
        },
        other => other.clone(),
    }
}

/// Walks declarations, including the ones nested in bodies and expressions
struct Indexer<'t, 'f> {
    table: &'t mut SymbolTable,
    package: &'f [String],
}

impl Indexer<'_, '_> {
    fn symbol(
        &mut self,
        id: SymbolId,
        name: &str,
        kind: SymbolKind,
        owner: Option<SymbolId>,
        ty: TypeRef,
        location: SourceLocation,
    ) {
        self.table.insert(Symbol {
            id,
            name: name.to_string(),
            kind,
            owner,
            package: self.package.to_vec(),
            ty,
            location,
        });
    }

    fn declaration(&mut self, declaration: &TypedDeclaration, owner: Option<SymbolId>) {
        match declaration {
            TypedDeclaration::Class(class) => self.class(class, owner, false),
            TypedDeclaration::Function(function) => self.function(function, owner),
            TypedDeclaration::Property(property) => self.property(property, owner),
            TypedDeclaration::Constructor(ctor) => self.constructor(ctor, owner),
            TypedDeclaration::AnonymousInitializer(init) => {
                self.symbol(
                    init.symbol_id,
                    "<init-block>",
                    SymbolKind::AnonymousInitializer,
                    owner,
                    TypeRef::unit(),
                    init.source_location,
                );
                self.block(&init.body, Some(init.symbol_id));
            }
            TypedDeclaration::TypeAlias(alias) => {
                self.symbol(
                    alias.symbol_id,
                    &alias.name,
                    SymbolKind::TypeAlias,
                    owner,
                    alias.target.clone(),
                    alias.source_location,
                );
                self.type_parameters(&alias.type_parameters, alias.symbol_id);
                self.table.aliases.insert(
                    alias.symbol_id,
                    AliasInfo {
                        type_parameters: names_of(&alias.type_parameters),
                        target: alias.target.clone(),
                    },
                );
            }
        }
    }

    fn class(&mut self, class: &TypedClass, owner: Option<SymbolId>, is_anonymous: bool) {
        let self_type = TypeRef::Class {
            symbol: class.symbol_id,
            arguments: (0..class.type_parameters.len() as u32)
                .map(|index| TypeRef::TypeParameter {
                    owner: class.symbol_id,
                    index,
                    nullable: false,
                })
                .collect(),
            nullable: false,
        };
        self.symbol(
            class.symbol_id,
            &class.name,
            SymbolKind::Class,
            owner,
            self_type,
            class.source_location,
        );
        self.type_parameters(&class.type_parameters, class.symbol_id);
        self.table.classes.insert(
            class.symbol_id,
            ClassInfo {
                kind: class.kind,
                modality: class.modality,
                is_anonymous,
                type_parameters: names_of(&class.type_parameters),
                supertypes: class.supertypes.clone(),
                members: class.members.iter().map(TypedDeclaration::symbol_id).collect(),
                primary_constructor: class.primary_constructor().map(|ctor| ctor.symbol_id),
            },
        );
        for member in &class.members {
            self.declaration(member, Some(class.symbol_id));
        }
        for annotation in &class.annotations {
            self.annotation(annotation, Some(class.symbol_id));
        }
    }

    fn function(&mut self, function: &TypedFunction, owner: Option<SymbolId>) {
        self.symbol(
            function.symbol_id,
            &function.name,
            SymbolKind::Function,
            owner,
            function.return_type.clone(),
            function.source_location,
        );
        self.type_parameters(&function.type_parameters, function.symbol_id);
        let signature = FunctionSignature {
            type_parameters: names_of(&function.type_parameters),
            parameters: self.parameters(&function.parameters, function.symbol_id),
            return_type: function.return_type.clone(),
            modality: function.modality,
        };
        self.table.signatures.insert(function.symbol_id, signature);
        if let Some(body) = &function.body {
            self.block(body, Some(function.symbol_id));
        }
    }

    fn constructor(&mut self, ctor: &TypedConstructor, owner: Option<SymbolId>) {
        let return_type = owner
            .and_then(|class| self.table.get(class))
            .map(|class| class.ty.clone())
            .unwrap_or(TypeRef::Error);
        self.symbol(
            ctor.symbol_id,
            "<init>",
            SymbolKind::Constructor,
            owner,
            return_type.clone(),
            ctor.source_location,
        );
        self.type_parameters(&ctor.type_parameters, ctor.symbol_id);
        let signature = FunctionSignature {
            type_parameters: names_of(&ctor.type_parameters),
            parameters: self.parameters(&ctor.parameters, ctor.symbol_id),
            return_type,
            modality: Modality::Final,
        };
        self.table.signatures.insert(ctor.symbol_id, signature);
        if let Some(call) = &ctor.delegated_call {
            for argument in &call.arguments {
                self.expression(argument, Some(ctor.symbol_id));
            }
        }
        if let Some(body) = &ctor.body {
            self.block(body, Some(ctor.symbol_id));
        }
    }

    fn property(&mut self, property: &TypedProperty, owner: Option<SymbolId>) {
        self.symbol(
            property.symbol_id,
            &property.name,
            SymbolKind::Property,
            owner,
            property.property_type.clone(),
            property.source_location,
        );
        self.table
            .properties
            .insert(property.symbol_id, PropertyInfo::of(property));
        if let Some(initializer) = &property.initializer {
            self.expression(initializer, Some(property.symbol_id));
        }
        for accessor in property.getter.iter().chain(property.setter.iter()) {
            self.symbol(
                accessor.symbol_id,
                &property.name,
                SymbolKind::Accessor,
                Some(property.symbol_id),
                property.property_type.clone(),
                accessor.source_location,
            );
            if let Some(parameter) = &accessor.parameter {
                self.parameters(std::slice::from_ref(parameter), accessor.symbol_id);
            }
            if let Some(body) = &accessor.body {
                self.block(body, Some(accessor.symbol_id));
            }
        }
    }

    fn type_parameters(&mut self, params: &[TypedTypeParameter], owner: SymbolId) {
        for (index, param) in params.iter().enumerate() {
            self.symbol(
                param.symbol_id,
                &param.name,
                SymbolKind::TypeParameter,
                Some(owner),
                TypeRef::TypeParameter {
                    owner,
                    index: index as u32,
                    nullable: false,
                },
                SourceLocation::unknown(),
            );
        }
    }

    fn parameters(&mut self, params: &[TypedParameter], owner: SymbolId) -> Vec<ParameterInfo> {
        params
            .iter()
            .map(|param| {
                self.symbol(
                    param.symbol_id,
                    &param.name,
                    SymbolKind::Parameter,
                    Some(owner),
                    param.param_type.clone(),
                    param.source_location,
                );
                if let Some(default) = &param.default_value {
                    self.expression(default, Some(owner));
                }
                ParameterInfo {
                    symbol: param.symbol_id,
                    name: param.name.clone(),
                    ty: param.param_type.clone(),
                    has_default: param.default_value.is_some(),
                }
            })
            .collect()
    }

    fn variable(&mut self, variable: &TypedVariable, owner: Option<SymbolId>) {
        self.symbol(
            variable.symbol_id,
            &variable.name,
            SymbolKind::Variable,
            owner,
            variable.var_type.clone(),
            variable.source_location,
        );
        if let Some(initializer) = &variable.initializer {
            self.expression(initializer, owner);
        }
    }

    fn annotation(&mut self, annotation: &TypedAnnotation, owner: Option<SymbolId>) {
        for argument in &annotation.arguments {
            self.expression(argument, owner);
        }
    }

    fn block(&mut self, block: &TypedBlock, owner: Option<SymbolId>) {
        for statement in &block.statements {
            match statement {
                TypedStatement::Variable(variable) => self.variable(variable, owner),
                TypedStatement::Declaration(declaration) => self.declaration(declaration, owner),
                TypedStatement::Expression(expression) => self.expression(expression, owner),
                TypedStatement::Assignment {
                    receiver, value, ..
                } => {
                    if let Some(receiver) = receiver {
                        self.expression(receiver, owner);
                    }
                    self.expression(value, owner);
                }
                TypedStatement::While {
                    condition, body, ..
                }
                | TypedStatement::DoWhile {
                    condition, body, ..
                } => {
                    self.expression(condition, owner);
                    self.block(body, owner);
                }
            }
        }
    }

    fn expression(&mut self, expression: &TypedExpression, owner: Option<SymbolId>) {
        match &expression.kind {
            TypedExpressionKind::Constant(_)
            | TypedExpressionKind::This { .. }
            | TypedExpressionKind::WhenSubject
            | TypedExpressionKind::Else
            | TypedExpressionKind::Break { .. }
            | TypedExpressionKind::Continue { .. } => {}
            TypedExpressionKind::Access { receiver, .. } => {
                if let Some(receiver) = receiver {
                    self.expression(receiver, owner);
                }
            }
            TypedExpressionKind::Call {
                receiver,
                arguments,
                ..
            } => {
                if let Some(receiver) = receiver {
                    self.expression(receiver, owner);
                }
                for argument in arguments {
                    self.expression(argument, owner);
                }
            }
            TypedExpressionKind::When {
                subject,
                subject_variable,
                branches,
            } => {
                if let Some(subject) = subject {
                    self.expression(subject, owner);
                }
                if let Some(variable) = subject_variable {
                    self.variable(variable, owner);
                }
                for branch in branches {
                    self.expression(&branch.condition, owner);
                    self.block(&branch.result, owner);
                }
            }
            TypedExpressionKind::Return { value, .. } => {
                if let Some(value) = value {
                    self.expression(value, owner);
                }
            }
            TypedExpressionKind::Throw { exception } => self.expression(exception, owner),
            TypedExpressionKind::Try {
                body,
                catches,
                finally,
            } => {
                self.block(body, owner);
                for catch in catches {
                    self.variable(&catch.parameter, owner);
                    self.block(&catch.body, owner);
                }
                if let Some(finally) = finally {
                    self.block(finally, owner);
                }
            }
            TypedExpressionKind::Operator { arguments, .. }
            | TypedExpressionKind::StringTemplate { parts: arguments } => {
                for argument in arguments {
                    self.expression(argument, owner);
                }
            }
            TypedExpressionKind::TypeOperator { argument, .. }
            | TypedExpressionKind::ClassLiteral { argument } => self.expression(argument, owner),
            TypedExpressionKind::AnonymousFunction(function) => self.function(function, owner),
            TypedExpressionKind::AnonymousObject(class) => self.class(class, owner, true),
            TypedExpressionKind::Block(block) => self.block(block, owner),
        }
    }
}

fn names_of(params: &[TypedTypeParameter]) -> Vec<String> {
    params.iter().map(|param| param.name.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tast::builder::TastBuilder;

    #[test]
    fn indexes_members_with_their_owner() {
        let mut b = TastBuilder::new();
        let mut base = b.class("Base");
        let f = b.function("f", TypeRef::unit());
        let f_id = f.symbol_id;
        base.members.push(TypedDeclaration::Function(f));
        let base_id = base.symbol_id;
        let file = b.file("Base.kt", vec![TypedDeclaration::Class(base)]);

        let table = SymbolTable::from_files(&[file]);
        assert_eq!(table.kind(f_id), Some(SymbolKind::Function));
        assert_eq!(table.owner_class(f_id), Some(base_id));
        assert_eq!(table.members_named(base_id, "f").collect::<Vec<_>>(), vec![f_id]);
    }

    #[test]
    fn expands_aliases_transitively_and_keeps_nullability() {
        let mut b = TastBuilder::new();
        let target = b.class("Target");
        let target_id = target.symbol_id;
        let inner = b.type_alias("Inner", TypeRef::class(target_id));
        let outer = b.type_alias("Outer", TypeRef::alias(inner.symbol_id));
        let outer_id = outer.symbol_id;
        let file = b.file(
            "Aliases.kt",
            vec![
                TypedDeclaration::Class(target),
                TypedDeclaration::TypeAlias(inner),
                TypedDeclaration::TypeAlias(outer),
            ],
        );
        let table = SymbolTable::from_files(&[file]);

        let expanded = table.expand_alias(&TypeRef::alias(outer_id).with_nullability(true));
        assert_eq!(expanded.classifier(), Some(target_id));
        assert!(expanded.is_nullable());
    }

    #[test]
    fn subclass_check_walks_through_aliases() {
        let mut b = TastBuilder::new();
        let base = b.class("Base");
        let base_id = base.symbol_id;
        let alias = b.type_alias("BaseAlias", TypeRef::class(base_id));
        let mut derived = b.class("Derived");
        derived.supertypes.push(TypeRef::alias(alias.symbol_id));
        let derived_id = derived.symbol_id;
        let file = b.file(
            "Hierarchy.kt",
            vec![
                TypedDeclaration::Class(base),
                TypedDeclaration::TypeAlias(alias),
                TypedDeclaration::Class(derived),
            ],
        );
        let table = SymbolTable::from_files(&[file]);

        assert!(table.is_subclass_of(derived_id, base_id));
        assert!(!table.is_subclass_of(base_id, derived_id));
    }
}
