//! Construction helpers for typed trees
//!
//! Resolution normally produces the typed tree. The builder hands out fresh
//! symbol and loop identities so that tests, benches and embedders can put
//! together resolved trees without a front end.

use super::node::*;
use super::{LoopId, SourceLocation, SymbolId, TypeRef};

#[derive(Debug, Default)]
pub struct TastBuilder {
    next_symbol: u32,
    next_loop: u32,
    file_id: u32,
}

impl TastBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start symbol numbering at `first`; used to keep modules built by
    /// separate builders apart
    pub fn starting_at(first: u32) -> Self {
        Self {
            next_symbol: first,
            ..Self::default()
        }
    }

    pub fn fresh_symbol(&mut self) -> SymbolId {
        let id = SymbolId::from_raw(self.next_symbol);
        self.next_symbol += 1;
        id
    }

    pub fn fresh_loop(&mut self) -> LoopId {
        let id = LoopId::from_raw(self.next_loop);
        self.next_loop += 1;
        id
    }

    fn location(&self, line: u32) -> SourceLocation {
        SourceLocation::new(self.file_id, line, 1, 0)
    }

    // Declarations

    pub fn file(&mut self, name: &str, declarations: Vec<TypedDeclaration>) -> TypedFile {
        let file = TypedFile {
            name: name.to_string(),
            package: Vec::new(),
            declarations,
            annotations: Vec::new(),
            source_location: self.location(1),
        };
        self.file_id += 1;
        file
    }

    pub fn class(&mut self, name: &str) -> TypedClass {
        self.class_of_kind(name, ClassKind::Class)
    }

    pub fn interface(&mut self, name: &str) -> TypedClass {
        let mut class = self.class_of_kind(name, ClassKind::Interface);
        class.modality = Modality::Abstract;
        class
    }

    pub fn class_of_kind(&mut self, name: &str, kind: ClassKind) -> TypedClass {
        TypedClass {
            symbol_id: self.fresh_symbol(),
            name: name.to_string(),
            kind,
            modality: Modality::Final,
            type_parameters: Vec::new(),
            supertypes: Vec::new(),
            members: Vec::new(),
            annotations: Vec::new(),
            source_location: self.location(1),
        }
    }

    pub fn type_parameter(&mut self, name: &str) -> TypedTypeParameter {
        TypedTypeParameter {
            symbol_id: self.fresh_symbol(),
            name: name.to_string(),
            bounds: Vec::new(),
        }
    }

    /// Function with an empty body
    pub fn function(&mut self, name: &str, return_type: TypeRef) -> TypedFunction {
        TypedFunction {
            symbol_id: self.fresh_symbol(),
            name: name.to_string(),
            label: None,
            modality: Modality::Final,
            type_parameters: Vec::new(),
            parameters: Vec::new(),
            return_type,
            body: Some(TypedBlock::default()),
            annotations: Vec::new(),
            source_location: self.location(1),
        }
    }

    pub fn abstract_function(&mut self, name: &str, return_type: TypeRef) -> TypedFunction {
        let mut function = self.function(name, return_type);
        function.modality = Modality::Abstract;
        function.body = None;
        function
    }

    /// Function literal; `label` is the name a `return@label` uses
    pub fn lambda(&mut self, label: Option<&str>, return_type: TypeRef) -> TypedFunction {
        let mut function = self.function("", return_type);
        function.label = label.map(str::to_string);
        function
    }

    pub fn parameter(&mut self, name: &str, param_type: TypeRef) -> TypedParameter {
        TypedParameter {
            symbol_id: self.fresh_symbol(),
            name: name.to_string(),
            param_type,
            default_value: None,
            source_location: self.location(1),
        }
    }

    pub fn constructor(&mut self, is_primary: bool, parameters: Vec<TypedParameter>) -> TypedConstructor {
        TypedConstructor {
            symbol_id: self.fresh_symbol(),
            is_primary,
            type_parameters: Vec::new(),
            parameters,
            delegated_call: None,
            body: None,
            annotations: Vec::new(),
            source_location: self.location(1),
        }
    }

    pub fn primary_constructor(&mut self, parameters: Vec<TypedParameter>) -> TypedConstructor {
        self.constructor(true, parameters)
    }

    /// `super(...)` delegation to `callee`
    pub fn super_call(
        &self,
        callee: SymbolId,
        arguments: Vec<TypedExpression>,
    ) -> TypedDelegatedConstructorCall {
        TypedDelegatedConstructorCall {
            callee: TypedReference::resolved("<init>", callee),
            is_this: false,
            arguments,
            source_location: self.location(1),
        }
    }

    /// `this(...)` delegation to `callee`
    pub fn this_call(
        &self,
        callee: SymbolId,
        arguments: Vec<TypedExpression>,
    ) -> TypedDelegatedConstructorCall {
        TypedDelegatedConstructorCall {
            is_this: true,
            ..self.super_call(callee, arguments)
        }
    }

    /// Property with default accessors and no initializer
    pub fn property(&mut self, name: &str, property_type: TypeRef, is_mutable: bool) -> TypedProperty {
        TypedProperty {
            symbol_id: self.fresh_symbol(),
            name: name.to_string(),
            property_type,
            is_mutable,
            modality: Modality::Final,
            initializer: None,
            getter: None,
            setter: None,
            annotations: Vec::new(),
            source_location: self.location(1),
        }
    }

    /// Explicit accessor with a body
    pub fn accessor(&mut self, parameter: Option<TypedParameter>, body: TypedBlock) -> TypedAccessor {
        TypedAccessor {
            symbol_id: self.fresh_symbol(),
            is_default: false,
            parameter,
            body: Some(body),
            annotations: Vec::new(),
            source_location: self.location(1),
        }
    }

    pub fn variable(
        &mut self,
        name: &str,
        var_type: TypeRef,
        initializer: Option<TypedExpression>,
    ) -> TypedVariable {
        TypedVariable {
            symbol_id: self.fresh_symbol(),
            name: name.to_string(),
            var_type,
            is_mutable: false,
            initializer: initializer.map(Box::new),
            source_location: self.location(1),
        }
    }

    pub fn init_block(&mut self, statements: Vec<TypedStatement>) -> TypedAnonymousInitializer {
        TypedAnonymousInitializer {
            symbol_id: self.fresh_symbol(),
            body: TypedBlock::new(statements),
            source_location: self.location(1),
        }
    }

    pub fn type_alias(&mut self, name: &str, target: TypeRef) -> TypedTypeAlias {
        TypedTypeAlias {
            symbol_id: self.fresh_symbol(),
            name: name.to_string(),
            type_parameters: Vec::new(),
            target,
            source_location: self.location(1),
        }
    }

    pub fn annotation(&self, annotation_class: SymbolId) -> TypedAnnotation {
        TypedAnnotation {
            annotation_type: TypeRef::class(annotation_class),
            constructor: None,
            arguments: Vec::new(),
            source_location: self.location(1),
        }
    }

    // Expressions

    pub fn constant(&self, value: ConstantValue, ty: TypeRef) -> TypedExpression {
        TypedExpression::new(TypedExpressionKind::Constant(value), ty)
    }

    pub fn int(&self, value: i64) -> TypedExpression {
        self.constant(ConstantValue::Int(value), TypeRef::int())
    }

    pub fn boolean(&self, value: bool) -> TypedExpression {
        self.constant(ConstantValue::Boolean(value), TypeRef::boolean())
    }

    pub fn string(&self, value: &str) -> TypedExpression {
        self.constant(ConstantValue::String(value.to_string()), TypeRef::string())
    }

    /// Call to a resolved callee, without explicit receiver
    pub fn call(
        &self,
        callee: SymbolId,
        name: &str,
        arguments: Vec<TypedExpression>,
        ty: TypeRef,
    ) -> TypedExpression {
        TypedExpression::new(
            TypedExpressionKind::Call {
                receiver: None,
                callee: TypedReference::resolved(name, callee),
                arguments,
                type_arguments: Vec::new(),
            },
            ty,
        )
    }

    /// Call `receiver.name(...)` to a resolved callee
    pub fn member_call(
        &self,
        receiver: TypedExpression,
        callee: SymbolId,
        name: &str,
        arguments: Vec<TypedExpression>,
        ty: TypeRef,
    ) -> TypedExpression {
        let mut call = self.call(callee, name, arguments, ty);
        if let TypedExpressionKind::Call { receiver: slot, .. } = &mut call.kind {
            *slot = Some(Box::new(receiver));
        }
        call
    }

    /// Call whose callee resolution gave up on
    pub fn unresolved_call(&self, name: &str, arguments: Vec<TypedExpression>) -> TypedExpression {
        TypedExpression::new(
            TypedExpressionKind::Call {
                receiver: None,
                callee: TypedReference::unresolved(name),
                arguments,
                type_arguments: Vec::new(),
            },
            TypeRef::Error,
        )
    }

    /// Read of a resolved value, property or object
    pub fn access(&self, target: SymbolId, name: &str, ty: TypeRef) -> TypedExpression {
        TypedExpression::new(
            TypedExpressionKind::Access {
                receiver: None,
                callee: TypedReference::resolved(name, target),
            },
            ty,
        )
    }

    pub fn read(&self, variable: &TypedVariable) -> TypedExpression {
        self.access(variable.symbol_id, &variable.name, variable.var_type.clone())
    }

    pub fn read_parameter(&self, parameter: &TypedParameter) -> TypedExpression {
        self.access(parameter.symbol_id, &parameter.name, parameter.param_type.clone())
    }

    pub fn this(&self, class: SymbolId) -> TypedExpression {
        TypedExpression::new(
            TypedExpressionKind::This { class: Some(class) },
            TypeRef::class(class),
        )
    }

    pub fn operator(
        &self,
        operator: OperatorKind,
        arguments: Vec<TypedExpression>,
    ) -> TypedExpression {
        TypedExpression::new(
            TypedExpressionKind::Operator {
                operator,
                arguments,
            },
            TypeRef::boolean(),
        )
    }

    pub fn ret(&self, target: Option<SymbolId>, label: Option<&str>, value: Option<TypedExpression>) -> TypedExpression {
        TypedExpression::new(
            TypedExpressionKind::Return {
                target,
                label: label.map(str::to_string),
                value: value.map(Box::new),
            },
            TypeRef::nothing(),
        )
    }

    pub fn break_of(&self, target: LoopId) -> TypedExpression {
        TypedExpression::new(
            TypedExpressionKind::Break {
                target,
                label: None,
            },
            TypeRef::nothing(),
        )
    }

    pub fn continue_of(&self, target: LoopId) -> TypedExpression {
        TypedExpression::new(
            TypedExpressionKind::Continue {
                target,
                label: None,
            },
            TypeRef::nothing(),
        )
    }

    pub fn lambda_expression(&self, function: TypedFunction) -> TypedExpression {
        let ty = TypeRef::Function {
            parameters: function
                .parameters
                .iter()
                .map(|param| param.param_type.clone())
                .collect(),
            return_type: Box::new(function.return_type.clone()),
            nullable: false,
        };
        TypedExpression::new(TypedExpressionKind::AnonymousFunction(Box::new(function)), ty)
    }

    // Statements

    pub fn expr(&self, expression: TypedExpression) -> TypedStatement {
        TypedStatement::Expression(expression)
    }

    /// `while (condition) { body }` for a loop id taken from
    /// [`TastBuilder::fresh_loop`]
    pub fn while_loop(
        &self,
        loop_id: LoopId,
        condition: TypedExpression,
        body: Vec<TypedStatement>,
    ) -> TypedStatement {
        TypedStatement::While {
            loop_id,
            label: None,
            condition,
            body: TypedBlock::new(body),
            source_location: self.location(1),
        }
    }

    pub fn assign(&self, target: SymbolId, name: &str, value: TypedExpression) -> TypedStatement {
        TypedStatement::Assignment {
            target: TypedReference::resolved(name, target),
            receiver: None,
            value,
            source_location: self.location(1),
        }
    }
}
