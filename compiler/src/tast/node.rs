//! Typed AST nodes
//!
//! The typed tree is what name and type resolution hand to the lowering pass.
//! It is read-only here: every value-producing node carries its resolved
//! [`TypeRef`], and every reference carries the [`SymbolId`] it resolved to,
//! or `None` when resolution gave up.

use super::{LoopId, SourceLocation, SymbolId, TypeRef};
use serde::Serialize;
use std::fmt;

/// A source file, the unit the lowering pass is invoked on
#[derive(Debug, Clone)]
pub struct TypedFile {
    pub name: String,
    pub package: Vec<String>,
    pub declarations: Vec<TypedDeclaration>,
    pub annotations: Vec<TypedAnnotation>,
    pub source_location: SourceLocation,
}

/// Declarations that may appear at file level, in a class body, or locally
#[derive(Debug, Clone)]
pub enum TypedDeclaration {
    Class(TypedClass),
    Function(TypedFunction),
    Property(TypedProperty),
    Constructor(TypedConstructor),
    AnonymousInitializer(TypedAnonymousInitializer),
    TypeAlias(TypedTypeAlias),
}

impl TypedDeclaration {
    pub fn symbol_id(&self) -> SymbolId {
        match self {
            TypedDeclaration::Class(c) => c.symbol_id,
            TypedDeclaration::Function(f) => f.symbol_id,
            TypedDeclaration::Property(p) => p.symbol_id,
            TypedDeclaration::Constructor(c) => c.symbol_id,
            TypedDeclaration::AnonymousInitializer(i) => i.symbol_id,
            TypedDeclaration::TypeAlias(a) => a.symbol_id,
        }
    }

    /// Name under which the declaration is visible as a class member, if any
    pub fn member_name(&self) -> Option<&str> {
        match self {
            TypedDeclaration::Function(f) => Some(&f.name),
            TypedDeclaration::Property(p) => Some(&p.name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ClassKind {
    Class,
    Interface,
    Object,
    EnumClass,
    AnnotationClass,
}

impl fmt::Display for ClassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClassKind::Class => "class",
            ClassKind::Interface => "interface",
            ClassKind::Object => "object",
            ClassKind::EnumClass => "enum class",
            ClassKind::AnnotationClass => "annotation class",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Modality {
    #[default]
    Final,
    Open,
    Abstract,
}

#[derive(Debug, Clone)]
pub struct TypedTypeParameter {
    pub symbol_id: SymbolId,
    pub name: String,
    pub bounds: Vec<TypeRef>,
}

#[derive(Debug, Clone)]
pub struct TypedClass {
    pub symbol_id: SymbolId,
    pub name: String,
    pub kind: ClassKind,
    pub modality: Modality,
    pub type_parameters: Vec<TypedTypeParameter>,
    pub supertypes: Vec<TypeRef>,
    /// Members in source order, including the primary constructor
    pub members: Vec<TypedDeclaration>,
    pub annotations: Vec<TypedAnnotation>,
    pub source_location: SourceLocation,
}

impl TypedClass {
    pub fn primary_constructor(&self) -> Option<&TypedConstructor> {
        self.members.iter().find_map(|member| match member {
            TypedDeclaration::Constructor(ctor) if ctor.is_primary => Some(ctor),
            _ => None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TypedParameter {
    pub symbol_id: SymbolId,
    pub name: String,
    pub param_type: TypeRef,
    pub default_value: Option<TypedExpression>,
    pub source_location: SourceLocation,
}

/// Named function, local function or function literal
#[derive(Debug, Clone)]
pub struct TypedFunction {
    pub symbol_id: SymbolId,
    /// Empty for anonymous functions
    pub name: String,
    /// Label a `return@label` can target, e.g. the call site name of a lambda
    pub label: Option<String>,
    pub modality: Modality,
    pub type_parameters: Vec<TypedTypeParameter>,
    pub parameters: Vec<TypedParameter>,
    pub return_type: TypeRef,
    pub body: Option<TypedBlock>,
    pub annotations: Vec<TypedAnnotation>,
    pub source_location: SourceLocation,
}

/// `: this(...)` or `: super(...)` on a constructor
#[derive(Debug, Clone)]
pub struct TypedDelegatedConstructorCall {
    pub callee: TypedReference,
    /// `this(...)` rather than `super(...)`
    pub is_this: bool,
    pub arguments: Vec<TypedExpression>,
    pub source_location: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct TypedConstructor {
    pub symbol_id: SymbolId,
    pub is_primary: bool,
    pub type_parameters: Vec<TypedTypeParameter>,
    pub parameters: Vec<TypedParameter>,
    pub delegated_call: Option<TypedDelegatedConstructorCall>,
    pub body: Option<TypedBlock>,
    pub annotations: Vec<TypedAnnotation>,
    pub source_location: SourceLocation,
}

/// Property getter or setter.
///
/// A default accessor has no body; lowering synthesizes one that goes
/// through the backing field.
#[derive(Debug, Clone)]
pub struct TypedAccessor {
    pub symbol_id: SymbolId,
    pub is_default: bool,
    /// Setter value parameter
    pub parameter: Option<TypedParameter>,
    pub body: Option<TypedBlock>,
    pub annotations: Vec<TypedAnnotation>,
    pub source_location: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct TypedProperty {
    pub symbol_id: SymbolId,
    pub name: String,
    pub property_type: TypeRef,
    pub is_mutable: bool,
    pub modality: Modality,
    pub initializer: Option<TypedExpression>,
    /// `None` means a default getter
    pub getter: Option<TypedAccessor>,
    /// `None` on a mutable property means a default setter
    pub setter: Option<TypedAccessor>,
    pub annotations: Vec<TypedAnnotation>,
    pub source_location: SourceLocation,
}

impl TypedProperty {
    pub fn has_default_getter(&self) -> bool {
        self.getter.as_ref().map_or(true, |getter| getter.is_default)
    }

    pub fn has_default_setter(&self) -> bool {
        self.is_mutable && self.setter.as_ref().map_or(true, |setter| setter.is_default)
    }
}

/// `init { ... }` block of a class
#[derive(Debug, Clone)]
pub struct TypedAnonymousInitializer {
    pub symbol_id: SymbolId,
    pub body: TypedBlock,
    pub source_location: SourceLocation,
}

/// Type aliases have no lowered counterpart; uses are expanded
#[derive(Debug, Clone)]
pub struct TypedTypeAlias {
    pub symbol_id: SymbolId,
    pub name: String,
    pub type_parameters: Vec<TypedTypeParameter>,
    pub target: TypeRef,
    pub source_location: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct TypedVariable {
    pub symbol_id: SymbolId,
    pub name: String,
    pub var_type: TypeRef,
    pub is_mutable: bool,
    pub initializer: Option<Box<TypedExpression>>,
    pub source_location: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct TypedAnnotation {
    pub annotation_type: TypeRef,
    /// Annotation class constructor, when resolution recorded it
    pub constructor: Option<SymbolId>,
    pub arguments: Vec<TypedExpression>,
    pub source_location: SourceLocation,
}

#[derive(Debug, Clone, Default)]
pub struct TypedBlock {
    pub statements: Vec<TypedStatement>,
    pub source_location: SourceLocation,
}

impl TypedBlock {
    pub fn new(statements: Vec<TypedStatement>) -> Self {
        Self {
            statements,
            source_location: SourceLocation::unknown(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

#[derive(Debug, Clone)]
pub enum TypedStatement {
    Variable(TypedVariable),
    /// Local class or function
    Declaration(TypedDeclaration),
    Expression(TypedExpression),
    Assignment {
        target: TypedReference,
        receiver: Option<TypedExpression>,
        value: TypedExpression,
        source_location: SourceLocation,
    },
    While {
        loop_id: LoopId,
        label: Option<String>,
        condition: TypedExpression,
        body: TypedBlock,
        source_location: SourceLocation,
    },
    DoWhile {
        loop_id: LoopId,
        label: Option<String>,
        body: TypedBlock,
        condition: TypedExpression,
        source_location: SourceLocation,
    },
}

/// Name at a use site and what it resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedReference {
    pub name: String,
    pub resolved: Option<SymbolId>,
    /// `field` inside an accessor: `resolved` names the property and the
    /// access goes to its backing field
    pub backing_field: bool,
}

impl TypedReference {
    pub fn resolved(name: impl Into<String>, symbol: SymbolId) -> Self {
        Self {
            name: name.into(),
            resolved: Some(symbol),
            backing_field: false,
        }
    }

    pub fn unresolved(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resolved: None,
            backing_field: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ConstantValue {
    Null,
    Boolean(bool),
    Char(char),
    Int(i64),
    Long(i64),
    Float(f64),
    Double(f64),
    String(String),
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::Null => f.write_str("null"),
            ConstantValue::Boolean(value) => write!(f, "{}", value),
            ConstantValue::Char(value) => write!(f, "'{}'", value),
            ConstantValue::Int(value) => write!(f, "{}", value),
            ConstantValue::Long(value) => write!(f, "{}L", value),
            ConstantValue::Float(value) => write!(f, "{}F", value),
            ConstantValue::Double(value) => write!(f, "{}", value),
            ConstantValue::String(value) => write!(f, "{:?}", value),
        }
    }
}

/// Operator applications that resolution did not turn into calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    Equal,
    NotEqual,
    Identity,
    NotIdentity,
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
    Not,
    And,
    Or,
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            OperatorKind::Equal => "==",
            OperatorKind::NotEqual => "!=",
            OperatorKind::Identity => "===",
            OperatorKind::NotIdentity => "!==",
            OperatorKind::Less => "<",
            OperatorKind::Greater => ">",
            OperatorKind::LessOrEqual => "<=",
            OperatorKind::GreaterOrEqual => ">=",
            OperatorKind::Not => "!",
            OperatorKind::And => "&&",
            OperatorKind::Or => "||",
        };
        f.write_str(symbol)
    }
}

/// `is`, `!is`, `as`, `as?`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeOperatorKind {
    Is,
    NotIs,
    As,
    SafeAs,
}

#[derive(Debug, Clone)]
pub struct TypedWhenBranch {
    /// [`TypedExpressionKind::Else`] for the trivial `else` branch
    pub condition: TypedExpression,
    pub result: TypedBlock,
    pub source_location: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct TypedCatch {
    pub parameter: TypedVariable,
    pub body: TypedBlock,
    pub source_location: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct TypedExpression {
    pub kind: TypedExpressionKind,
    pub expr_type: TypeRef,
    pub source_location: SourceLocation,
}

impl TypedExpression {
    pub fn new(kind: TypedExpressionKind, expr_type: TypeRef) -> Self {
        Self {
            kind,
            expr_type,
            source_location: SourceLocation::unknown(),
        }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.source_location = location;
        self
    }
}

#[derive(Debug, Clone)]
pub enum TypedExpressionKind {
    Constant(ConstantValue),
    /// Property, value or object access: `receiver.name` or `name`
    Access {
        receiver: Option<Box<TypedExpression>>,
        callee: TypedReference,
    },
    Call {
        receiver: Option<Box<TypedExpression>>,
        callee: TypedReference,
        arguments: Vec<TypedExpression>,
        type_arguments: Vec<TypeRef>,
    },
    /// `this` or `this@Class`
    This { class: Option<SymbolId> },
    /// Implicit reference to the subject of the enclosing `when`
    WhenSubject,
    /// Condition of the trivial `else` branch of a `when`
    Else,
    When {
        subject: Option<Box<TypedExpression>>,
        /// `when (val x = ...)`
        subject_variable: Option<Box<TypedVariable>>,
        branches: Vec<TypedWhenBranch>,
    },
    Break {
        target: LoopId,
        label: Option<String>,
    },
    Continue {
        target: LoopId,
        label: Option<String>,
    },
    Return {
        /// Function the return leaves, when resolution recorded it
        target: Option<SymbolId>,
        label: Option<String>,
        value: Option<Box<TypedExpression>>,
    },
    Throw {
        exception: Box<TypedExpression>,
    },
    Try {
        body: TypedBlock,
        catches: Vec<TypedCatch>,
        finally: Option<TypedBlock>,
    },
    Operator {
        operator: OperatorKind,
        arguments: Vec<TypedExpression>,
    },
    TypeOperator {
        operator: TypeOperatorKind,
        argument: Box<TypedExpression>,
        type_operand: TypeRef,
    },
    /// `expr::class`
    ClassLiteral { argument: Box<TypedExpression> },
    StringTemplate { parts: Vec<TypedExpression> },
    AnonymousFunction(Box<TypedFunction>),
    AnonymousObject(Box<TypedClass>),
    Block(TypedBlock),
}
