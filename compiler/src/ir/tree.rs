//! Declarations and expressions of the lowered tree

use super::{IrDeclId, IrLoopId, IrType};
use crate::lower::error::{LoweringError, LoweringResult};
use crate::tast::{ClassKind, ConstantValue, Modality, SourceLocation, SymbolId};
use serde::Serialize;

/// How a lowered declaration came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IrDeclarationOrigin {
    /// Lowered from a source declaration
    Defined,
    /// Inherited member stub synthesized in a subclass
    FakeOverride,
    /// Accessor synthesized for a property without an explicit one
    DefaultPropertyAccessor,
    PropertyBackingField,
    /// Implicit `this` parameter of a member function
    DispatchReceiver,
    /// Implicit `this` of a class
    InstanceReceiver,
    AnonymousFunction,
    LocalFunction,
    AnonymousObject,
    TemporaryVariable,
    CatchParameter,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrDeclaration {
    pub id: IrDeclId,
    /// `None` only for files and for declarations not yet attached
    pub parent: Option<IrDeclId>,
    pub origin: IrDeclarationOrigin,
    pub location: SourceLocation,
    pub annotations: Vec<IrExpr>,
    pub kind: IrDeclarationKind,
}

#[derive(Debug, Clone, Serialize)]
pub enum IrDeclarationKind {
    File(IrFile),
    Class(IrClass),
    Function(IrFunction),
    Constructor(IrConstructor),
    Property(IrProperty),
    Field(IrField),
    Variable(IrVariable),
    ValueParameter(IrValueParameter),
    TypeParameter(IrTypeParameter),
    AnonymousInitializer(IrAnonymousInitializer),
}

impl IrDeclarationKind {
    pub fn name(&self) -> &'static str {
        match self {
            IrDeclarationKind::File(_) => "file",
            IrDeclarationKind::Class(_) => "class",
            IrDeclarationKind::Function(_) => "function",
            IrDeclarationKind::Constructor(_) => "constructor",
            IrDeclarationKind::Property(_) => "property",
            IrDeclarationKind::Field(_) => "field",
            IrDeclarationKind::Variable(_) => "variable",
            IrDeclarationKind::ValueParameter(_) => "value parameter",
            IrDeclarationKind::TypeParameter(_) => "type parameter",
            IrDeclarationKind::AnonymousInitializer(_) => "anonymous initializer",
        }
    }

    /// Declarations that list their children in a `declarations` vector
    fn container(&mut self) -> Option<&mut Vec<IrDeclId>> {
        match self {
            IrDeclarationKind::File(file) => Some(&mut file.declarations),
            IrDeclarationKind::Class(class) => Some(&mut class.declarations),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IrFile {
    pub name: String,
    pub package: Vec<String>,
    pub declarations: Vec<IrDeclId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrClass {
    pub source: SymbolId,
    pub name: String,
    pub kind: ClassKind,
    pub modality: Modality,
    pub is_anonymous: bool,
    pub type_parameters: Vec<IrDeclId>,
    pub supertypes: Vec<IrType>,
    pub this_receiver: Option<IrDeclId>,
    pub declarations: Vec<IrDeclId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrFunction {
    /// `None` for synthesized functions (fake overrides, default accessors)
    pub source: Option<SymbolId>,
    pub name: String,
    pub modality: Modality,
    pub type_parameters: Vec<IrDeclId>,
    pub dispatch_receiver: Option<IrDeclId>,
    pub value_parameters: Vec<IrDeclId>,
    pub return_type: IrType,
    pub body: Option<IrBlock>,
    /// Declarations this function overrides
    pub overridden: Vec<IrDeclId>,
    /// Property this function is an accessor of
    pub corresponding_property: Option<IrDeclId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrConstructor {
    pub source: SymbolId,
    pub is_primary: bool,
    pub type_parameters: Vec<IrDeclId>,
    pub value_parameters: Vec<IrDeclId>,
    pub return_type: IrType,
    pub body: Option<IrBlock>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrProperty {
    pub source: Option<SymbolId>,
    pub name: String,
    pub ty: IrType,
    pub is_mutable: bool,
    pub modality: Modality,
    pub backing_field: Option<IrDeclId>,
    pub getter: Option<IrDeclId>,
    pub setter: Option<IrDeclId>,
    pub overridden: Vec<IrDeclId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrField {
    pub name: String,
    pub ty: IrType,
    pub initializer: Option<IrExpr>,
    pub corresponding_property: IrDeclId,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrVariable {
    pub name: String,
    pub ty: IrType,
    pub is_mutable: bool,
    pub initializer: Option<IrExpr>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrValueParameter {
    pub name: String,
    pub ty: IrType,
    /// Position among value parameters; `None` for receivers
    pub index: Option<u32>,
    pub default_value: Option<IrExpr>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrTypeParameter {
    pub name: String,
    pub index: u32,
    pub upper_bounds: Vec<IrType>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrAnonymousInitializer {
    pub body: Option<IrBlock>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IrBlock {
    pub statements: Vec<IrStatement>,
}

impl IrBlock {
    pub fn new(statements: Vec<IrStatement>) -> Self {
        Self { statements }
    }
}

#[derive(Debug, Clone, Serialize)]
pub enum IrStatement {
    /// Local declaration owned by the enclosing declaration
    Declaration(IrDeclId),
    Expression(IrExpr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IrBuiltin {
    Equals,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IrTypeOperator {
    InstanceOf,
    NotInstanceOf,
    Cast,
    SafeCast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IrErrorKind {
    UnresolvedReference,
    UnboundLoop,
    MissingBackingField,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrBranch {
    pub condition: IrExpr,
    pub result: IrExpr,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrCatch {
    pub parameter: IrDeclId,
    pub handler: IrExpr,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrExpr {
    pub kind: IrExprKind,
    pub ty: IrType,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub enum IrExprKind {
    Const(ConstantValue),
    GetValue {
        value: IrDeclId,
    },
    SetValue {
        value: IrDeclId,
        new_value: Box<IrExpr>,
    },
    GetField {
        field: IrDeclId,
        receiver: Option<Box<IrExpr>>,
    },
    SetField {
        field: IrDeclId,
        receiver: Option<Box<IrExpr>>,
        new_value: Box<IrExpr>,
    },
    /// Singleton instance of an object class
    GetObject {
        class: IrDeclId,
    },
    Call {
        function: IrDeclId,
        dispatch_receiver: Option<Box<IrExpr>>,
        arguments: Vec<IrExpr>,
        type_arguments: Vec<IrType>,
    },
    ConstructorCall {
        constructor: IrDeclId,
        arguments: Vec<IrExpr>,
        type_arguments: Vec<IrType>,
    },
    DelegatingConstructorCall {
        constructor: IrDeclId,
        arguments: Vec<IrExpr>,
    },
    /// Runs property initializers and `init` blocks of `class`
    InstanceInitializerCall {
        class: IrDeclId,
    },
    FunctionReference {
        function: IrDeclId,
    },
    GetClass {
        argument: Box<IrExpr>,
    },
    BuiltinCall {
        builtin: IrBuiltin,
        arguments: Vec<IrExpr>,
    },
    TypeOperator {
        operator: IrTypeOperator,
        argument: Box<IrExpr>,
        type_operand: IrType,
    },
    StringConcatenation {
        arguments: Vec<IrExpr>,
    },
    When {
        branches: Vec<IrBranch>,
    },
    While {
        loop_id: IrLoopId,
        label: Option<String>,
        condition: Box<IrExpr>,
        body: Box<IrExpr>,
    },
    DoWhile {
        loop_id: IrLoopId,
        label: Option<String>,
        body: Box<IrExpr>,
        condition: Box<IrExpr>,
    },
    Break {
        loop_id: IrLoopId,
        label: Option<String>,
    },
    Continue {
        loop_id: IrLoopId,
        label: Option<String>,
    },
    Return {
        /// Function the return leaves
        target: IrDeclId,
        value: Option<Box<IrExpr>>,
    },
    Throw {
        value: Box<IrExpr>,
    },
    Try {
        try_result: Box<IrExpr>,
        catches: Vec<IrCatch>,
        finally: Option<Box<IrExpr>>,
    },
    Block {
        statements: Vec<IrStatement>,
    },
    /// Statements evaluated for the value of the last one, e.g. a local
    /// declaration followed by a reference to it
    Group {
        statements: Vec<IrStatement>,
    },
    Error {
        kind: IrErrorKind,
        description: String,
    },
}

impl IrExpr {
    pub fn new(kind: IrExprKind, ty: IrType) -> Self {
        Self {
            kind,
            ty,
            location: SourceLocation::unknown(),
        }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }

    pub fn error(kind: IrErrorKind, description: impl Into<String>, ty: IrType) -> Self {
        Self::new(
            IrExprKind::Error {
                kind,
                description: description.into(),
            },
            ty,
        )
    }

    pub fn block(statements: Vec<IrStatement>, ty: IrType) -> Self {
        Self::new(IrExprKind::Block { statements }, ty)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, IrExprKind::Error { .. })
    }

    /// Visit this expression and every expression nested in it, pre-order.
    ///
    /// Nested declarations are not entered; they are reached through the
    /// arena.
    pub fn walk<'e>(&'e self, visit: &mut dyn FnMut(&'e IrExpr)) {
        visit(self);
        match &self.kind {
            IrExprKind::Const(_)
            | IrExprKind::GetValue { .. }
            | IrExprKind::GetObject { .. }
            | IrExprKind::InstanceInitializerCall { .. }
            | IrExprKind::FunctionReference { .. }
            | IrExprKind::Break { .. }
            | IrExprKind::Continue { .. }
            | IrExprKind::Error { .. } => {}
            IrExprKind::SetValue { new_value, .. } => new_value.walk(visit),
            IrExprKind::GetField { receiver, .. } => {
                if let Some(receiver) = receiver {
                    receiver.walk(visit);
                }
            }
            IrExprKind::SetField {
                receiver,
                new_value,
                ..
            } => {
                if let Some(receiver) = receiver {
                    receiver.walk(visit);
                }
                new_value.walk(visit);
            }
            IrExprKind::Call {
                dispatch_receiver,
                arguments,
                ..
            } => {
                if let Some(receiver) = dispatch_receiver {
                    receiver.walk(visit);
                }
                arguments.iter().for_each(|argument| argument.walk(visit));
            }
            IrExprKind::ConstructorCall { arguments, .. }
            | IrExprKind::DelegatingConstructorCall { arguments, .. }
            | IrExprKind::BuiltinCall { arguments, .. } => {
                arguments.iter().for_each(|argument| argument.walk(visit));
            }
            IrExprKind::StringConcatenation { arguments } => {
                arguments.iter().for_each(|argument| argument.walk(visit));
            }
            IrExprKind::GetClass { argument } | IrExprKind::TypeOperator { argument, .. } => {
                argument.walk(visit)
            }
            IrExprKind::When { branches } => {
                for branch in branches {
                    branch.condition.walk(visit);
                    branch.result.walk(visit);
                }
            }
            IrExprKind::While {
                condition, body, ..
            }
            | IrExprKind::DoWhile {
                condition, body, ..
            } => {
                condition.walk(visit);
                body.walk(visit);
            }
            IrExprKind::Return { value, .. } => {
                if let Some(value) = value {
                    value.walk(visit);
                }
            }
            IrExprKind::Throw { value } => value.walk(visit),
            IrExprKind::Try {
                try_result,
                catches,
                finally,
            } => {
                try_result.walk(visit);
                for catch in catches {
                    catch.handler.walk(visit);
                }
                if let Some(finally) = finally {
                    finally.walk(visit);
                }
            }
            IrExprKind::Block { statements } | IrExprKind::Group { statements } => {
                walk_statements(statements, visit)
            }
        }
    }

    /// Declarations introduced inside this expression: declaration
    /// statements and catch parameters, outermost first
    pub fn declared(&self) -> Vec<IrDeclId> {
        let mut declared = Vec::new();
        self.walk(&mut |expr| match &expr.kind {
            IrExprKind::Block { statements } | IrExprKind::Group { statements } => {
                declared.extend(statements.iter().filter_map(|statement| match statement {
                    IrStatement::Declaration(id) => Some(*id),
                    IrStatement::Expression(_) => None,
                }));
            }
            IrExprKind::Try { catches, .. } => {
                declared.extend(catches.iter().map(|catch| catch.parameter));
            }
            _ => {}
        });
        declared
    }
}

pub(crate) fn walk_statements<'e>(statements: &'e [IrStatement], visit: &mut dyn FnMut(&'e IrExpr)) {
    for statement in statements {
        if let IrStatement::Expression(expr) = statement {
            expr.walk(visit);
        }
    }
}

impl IrBlock {
    pub fn walk<'e>(&'e self, visit: &mut dyn FnMut(&'e IrExpr)) {
        walk_statements(&self.statements, visit);
    }

    /// Declarations introduced directly by this block or nested in its
    /// expressions
    pub fn declared(&self) -> Vec<IrDeclId> {
        let mut declared = Vec::new();
        for statement in &self.statements {
            match statement {
                IrStatement::Declaration(id) => declared.push(*id),
                IrStatement::Expression(expr) => declared.extend(expr.declared()),
            }
        }
        declared
    }
}

/// Owner of every lowered declaration of a module
#[derive(Debug, Default, Serialize)]
pub struct IrArena {
    declarations: Vec<IrDeclaration>,
    #[serde(skip)]
    next_loop: u32,
}

impl IrArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(
        &mut self,
        origin: IrDeclarationOrigin,
        location: SourceLocation,
        kind: IrDeclarationKind,
    ) -> IrDeclId {
        let id = IrDeclId::from_raw(self.declarations.len() as u32);
        self.declarations.push(IrDeclaration {
            id,
            parent: None,
            origin,
            location,
            annotations: Vec::new(),
            kind,
        });
        id
    }

    pub fn get(&self, id: IrDeclId) -> Option<&IrDeclaration> {
        self.declarations.get(id.index())
    }

    pub fn get_mut(&mut self, id: IrDeclId) -> Option<&mut IrDeclaration> {
        self.declarations.get_mut(id.index())
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IrDeclaration> {
        self.declarations.iter()
    }

    pub fn new_loop_id(&mut self) -> IrLoopId {
        let id = IrLoopId::from_raw(self.next_loop);
        self.next_loop += 1;
        id
    }

    pub fn declaration(&self, id: IrDeclId) -> LoweringResult<&IrDeclaration> {
        self.get(id)
            .ok_or_else(|| LoweringError::InvalidTree(format!("{} is not allocated", id)))
    }

    pub fn declaration_mut(&mut self, id: IrDeclId) -> LoweringResult<&mut IrDeclaration> {
        self.get_mut(id)
            .ok_or_else(|| LoweringError::InvalidTree(format!("{} is not allocated", id)))
    }

    /// Make `parent` the owner of `child`; files and classes also list it.
    ///
    /// Re-attaching to the same parent is a no-op; attaching to another one is
    /// an error.
    pub fn attach(&mut self, parent: IrDeclId, child: IrDeclId) -> LoweringResult<()> {
        self.attach_owned(parent, child)?;
        if let Some(list) = self.declaration_mut(parent)?.kind.container() {
            if !list.contains(&child) {
                list.push(child);
            }
        }
        Ok(())
    }

    /// Make `parent` the owner of `child` without listing it among the
    /// parent's declarations. For children held in a dedicated slot, such as
    /// a class receiver or type parameter.
    pub fn attach_owned(&mut self, parent: IrDeclId, child: IrDeclId) -> LoweringResult<()> {
        let declaration = self.declaration_mut(child)?;
        match declaration.parent {
            Some(existing) if existing != parent => Err(LoweringError::ParentConflict {
                child,
                existing,
                requested: parent,
            }),
            _ => {
                declaration.parent = Some(parent);
                Ok(())
            }
        }
    }

    pub fn set_origin(&mut self, id: IrDeclId, origin: IrDeclarationOrigin) -> LoweringResult<()> {
        self.declaration_mut(id)?.origin = origin;
        Ok(())
    }

    /// Attach a body to a function, constructor or anonymous initializer
    pub fn set_body(&mut self, id: IrDeclId, body: IrBlock) -> LoweringResult<()> {
        let declaration = self.declaration_mut(id)?;
        let slot = match &mut declaration.kind {
            IrDeclarationKind::Function(function) => &mut function.body,
            IrDeclarationKind::Constructor(ctor) => &mut ctor.body,
            IrDeclarationKind::AnonymousInitializer(init) => &mut init.body,
            other => {
                return Err(LoweringError::UnexpectedDeclaration {
                    decl: id,
                    expected: "function",
                    found: other.name(),
                })
            }
        };
        if slot.is_some() {
            return Err(LoweringError::BodyAlreadyAttached { decl: id });
        }
        *slot = Some(body);
        Ok(())
    }

    pub fn class(&self, id: IrDeclId) -> LoweringResult<&IrClass> {
        match &self.declaration(id)?.kind {
            IrDeclarationKind::Class(class) => Ok(class),
            other => Err(unexpected(id, "class", other)),
        }
    }

    pub fn class_mut(&mut self, id: IrDeclId) -> LoweringResult<&mut IrClass> {
        match &mut self.declaration_mut(id)?.kind {
            IrDeclarationKind::Class(class) => Ok(class),
            other => Err(unexpected(id, "class", other)),
        }
    }

    pub fn function(&self, id: IrDeclId) -> LoweringResult<&IrFunction> {
        match &self.declaration(id)?.kind {
            IrDeclarationKind::Function(function) => Ok(function),
            other => Err(unexpected(id, "function", other)),
        }
    }

    pub fn function_mut(&mut self, id: IrDeclId) -> LoweringResult<&mut IrFunction> {
        match &mut self.declaration_mut(id)?.kind {
            IrDeclarationKind::Function(function) => Ok(function),
            other => Err(unexpected(id, "function", other)),
        }
    }

    pub fn constructor(&self, id: IrDeclId) -> LoweringResult<&IrConstructor> {
        match &self.declaration(id)?.kind {
            IrDeclarationKind::Constructor(ctor) => Ok(ctor),
            other => Err(unexpected(id, "constructor", other)),
        }
    }

    pub fn constructor_mut(&mut self, id: IrDeclId) -> LoweringResult<&mut IrConstructor> {
        match &mut self.declaration_mut(id)?.kind {
            IrDeclarationKind::Constructor(ctor) => Ok(ctor),
            other => Err(unexpected(id, "constructor", other)),
        }
    }

    pub fn property(&self, id: IrDeclId) -> LoweringResult<&IrProperty> {
        match &self.declaration(id)?.kind {
            IrDeclarationKind::Property(property) => Ok(property),
            other => Err(unexpected(id, "property", other)),
        }
    }

    pub fn property_mut(&mut self, id: IrDeclId) -> LoweringResult<&mut IrProperty> {
        match &mut self.declaration_mut(id)?.kind {
            IrDeclarationKind::Property(property) => Ok(property),
            other => Err(unexpected(id, "property", other)),
        }
    }

    pub fn field_mut(&mut self, id: IrDeclId) -> LoweringResult<&mut IrField> {
        match &mut self.declaration_mut(id)?.kind {
            IrDeclarationKind::Field(field) => Ok(field),
            other => Err(unexpected(id, "field", other)),
        }
    }

    pub fn variable_mut(&mut self, id: IrDeclId) -> LoweringResult<&mut IrVariable> {
        match &mut self.declaration_mut(id)?.kind {
            IrDeclarationKind::Variable(variable) => Ok(variable),
            other => Err(unexpected(id, "variable", other)),
        }
    }

    pub fn value_parameter_mut(&mut self, id: IrDeclId) -> LoweringResult<&mut IrValueParameter> {
        match &mut self.declaration_mut(id)?.kind {
            IrDeclarationKind::ValueParameter(param) => Ok(param),
            other => Err(unexpected(id, "value parameter", other)),
        }
    }

    /// Type of the value a `GetValue` of `id` produces
    pub fn value_type(&self, id: IrDeclId) -> LoweringResult<IrType> {
        match &self.declaration(id)?.kind {
            IrDeclarationKind::Variable(variable) => Ok(variable.ty.clone()),
            IrDeclarationKind::ValueParameter(param) => Ok(param.ty.clone()),
            IrDeclarationKind::Field(field) => Ok(field.ty.clone()),
            other => Err(unexpected(id, "value", other)),
        }
    }

    /// Name of a named declaration
    pub fn name_of(&self, id: IrDeclId) -> Option<&str> {
        match &self.get(id)?.kind {
            IrDeclarationKind::File(file) => Some(&file.name),
            IrDeclarationKind::Class(class) => Some(&class.name),
            IrDeclarationKind::Function(function) => Some(&function.name),
            IrDeclarationKind::Property(property) => Some(&property.name),
            IrDeclarationKind::Field(field) => Some(&field.name),
            IrDeclarationKind::Variable(variable) => Some(&variable.name),
            IrDeclarationKind::ValueParameter(param) => Some(&param.name),
            IrDeclarationKind::TypeParameter(param) => Some(&param.name),
            IrDeclarationKind::Constructor(_) => Some("<init>"),
            IrDeclarationKind::AnonymousInitializer(_) => None,
        }
    }

    /// Functions and properties of `class` with the given name
    pub fn members_named(&self, class: IrDeclId, name: &str) -> Vec<IrDeclId> {
        let Ok(class) = self.class(class) else {
            return Vec::new();
        };
        class
            .declarations
            .iter()
            .copied()
            .filter(|member| {
                matches!(
                    self.get(*member).map(|decl| &decl.kind),
                    Some(IrDeclarationKind::Function(_)) | Some(IrDeclarationKind::Property(_))
                ) && self.name_of(*member) == Some(name)
            })
            .collect()
    }

    /// Every declaration owned by `id`, in a stable order.
    ///
    /// Declarations nested in a local variable's initializer belong to the
    /// variable's owner, so they are listed here as well.
    pub fn children(&self, id: IrDeclId) -> Vec<IrDeclId> {
        let mut children = self.direct_children(id);
        let mut next = 0;
        while next < children.len() {
            let nested = self.initializer_declarations(children[next]);
            children.extend(nested);
            next += 1;
        }
        children
    }

    fn direct_children(&self, id: IrDeclId) -> Vec<IrDeclId> {
        let Some(declaration) = self.get(id) else {
            return Vec::new();
        };
        let mut children: Vec<IrDeclId> = Vec::new();
        for annotation in &declaration.annotations {
            children.extend(annotation.declared());
        }
        match &declaration.kind {
            IrDeclarationKind::File(file) => children.extend(&file.declarations),
            IrDeclarationKind::Class(class) => {
                children.extend(&class.type_parameters);
                children.extend(class.this_receiver);
                children.extend(&class.declarations);
            }
            IrDeclarationKind::Function(function) => {
                children.extend(&function.type_parameters);
                children.extend(function.dispatch_receiver);
                children.extend(&function.value_parameters);
                for param in &function.value_parameters {
                    children.extend(self.default_value_declarations(*param));
                }
                if let Some(body) = &function.body {
                    children.extend(body.declared());
                }
            }
            IrDeclarationKind::Constructor(ctor) => {
                children.extend(&ctor.type_parameters);
                children.extend(&ctor.value_parameters);
                for param in &ctor.value_parameters {
                    children.extend(self.default_value_declarations(*param));
                }
                if let Some(body) = &ctor.body {
                    children.extend(body.declared());
                }
            }
            IrDeclarationKind::Property(property) => {
                children.extend(property.backing_field);
                children.extend(property.getter);
                children.extend(property.setter);
            }
            IrDeclarationKind::Field(field) => {
                if let Some(initializer) = &field.initializer {
                    children.extend(initializer.declared());
                }
            }
            IrDeclarationKind::AnonymousInitializer(init) => {
                if let Some(body) = &init.body {
                    children.extend(body.declared());
                }
            }
            IrDeclarationKind::Variable(_)
            | IrDeclarationKind::ValueParameter(_)
            | IrDeclarationKind::TypeParameter(_) => {}
        }
        children
    }

    fn initializer_declarations(&self, id: IrDeclId) -> Vec<IrDeclId> {
        match self.get(id).map(|decl| &decl.kind) {
            Some(IrDeclarationKind::Variable(variable)) => variable
                .initializer
                .as_ref()
                .map(IrExpr::declared)
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    fn default_value_declarations(&self, param: IrDeclId) -> Vec<IrDeclId> {
        match self.get(param).map(|decl| &decl.kind) {
            Some(IrDeclarationKind::ValueParameter(IrValueParameter {
                default_value: Some(default),
                ..
            })) => default.declared(),
            _ => Vec::new(),
        }
    }
}

fn unexpected(decl: IrDeclId, expected: &'static str, found: &IrDeclarationKind) -> LoweringError {
    LoweringError::UnexpectedDeclaration {
        decl,
        expected,
        found: found.name(),
    }
}
