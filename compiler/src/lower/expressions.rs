//! Statement and expression lowering
//!
//! Resolved references become reads, writes and calls of lowered
//! declarations fetched from the registry. A reference resolution gave up
//! on, or one that names nothing visible here, becomes an error node.

use super::{LoweringError, LoweringResult, LoweringSession};
use crate::ir::*;
use crate::tast::{
    ConstantValue, OperatorKind, SourceLocation, SymbolId, SymbolKind, TypeOperatorKind, TypeRef,
    TypedClass, TypedDeclaration, TypedExpression, TypedExpressionKind, TypedFunction,
    TypedReference, TypedStatement,
};
use log::trace;

fn describe(kind: &TypedExpressionKind) -> &'static str {
    match kind {
        TypedExpressionKind::Constant(_) => "constant",
        TypedExpressionKind::Access { .. } => "access",
        TypedExpressionKind::Call { .. } => "call",
        TypedExpressionKind::This { .. } => "this",
        TypedExpressionKind::WhenSubject => "when subject",
        TypedExpressionKind::Else => "else",
        TypedExpressionKind::When { .. } => "when",
        TypedExpressionKind::Break { .. } => "break",
        TypedExpressionKind::Continue { .. } => "continue",
        TypedExpressionKind::Return { .. } => "return",
        TypedExpressionKind::Throw { .. } => "throw",
        TypedExpressionKind::Try { .. } => "try",
        TypedExpressionKind::Operator { .. } => "operator",
        TypedExpressionKind::TypeOperator { .. } => "type operator",
        TypedExpressionKind::ClassLiteral { .. } => "class literal",
        TypedExpressionKind::StringTemplate { .. } => "string template",
        TypedExpressionKind::AnonymousFunction(_) => "anonymous function",
        TypedExpressionKind::AnonymousObject(_) => "anonymous object",
        TypedExpressionKind::Block(_) => "block",
    }
}

impl LoweringSession<'_> {
    pub(crate) fn lower_statements(
        &mut self,
        statements: &[TypedStatement],
    ) -> LoweringResult<Vec<IrStatement>> {
        let mut lowered = Vec::with_capacity(statements.len());
        for statement in statements {
            if let Some(statement) = self.lower_statement(statement)? {
                lowered.push(statement);
            }
        }
        Ok(lowered)
    }

    fn lower_statement(&mut self, statement: &TypedStatement) -> LoweringResult<Option<IrStatement>> {
        let lowered = match statement {
            TypedStatement::Variable(variable) => {
                IrStatement::Declaration(self.lower_local_variable(variable)?)
            }
            TypedStatement::Declaration(declaration) => match declaration {
                TypedDeclaration::Function(function) => {
                    IrStatement::Declaration(self.lower_local_function(function)?)
                }
                TypedDeclaration::Class(class) => IrStatement::Declaration(self.lower_class(class)?),
                TypedDeclaration::TypeAlias(_) => return Ok(None),
                TypedDeclaration::Property(property) => {
                    return Err(LoweringError::unsupported(
                        "local property",
                        property.source_location,
                    ))
                }
                TypedDeclaration::Constructor(ctor) => {
                    return Err(LoweringError::unsupported(
                        "local constructor",
                        ctor.source_location,
                    ))
                }
                TypedDeclaration::AnonymousInitializer(init) => {
                    return Err(LoweringError::unsupported(
                        "local init block",
                        init.source_location,
                    ))
                }
            },
            TypedStatement::Expression(expression) => {
                IrStatement::Expression(self.lower_expression(expression)?)
            }
            TypedStatement::Assignment {
                target,
                receiver,
                value,
                source_location,
            } => IrStatement::Expression(self.lower_assignment(
                target,
                receiver.as_ref(),
                value,
                *source_location,
            )?),
            TypedStatement::While {
                loop_id,
                label,
                condition,
                body,
                source_location,
            } => IrStatement::Expression(self.lower_while(
                *loop_id,
                label.as_ref(),
                condition,
                body,
                *source_location,
            )?),
            TypedStatement::DoWhile {
                loop_id,
                label,
                body,
                condition,
                source_location,
            } => IrStatement::Expression(self.lower_do_while(
                *loop_id,
                label.as_ref(),
                body,
                condition,
                *source_location,
            )?),
        };
        Ok(Some(lowered))
    }

    pub(crate) fn lower_expression(&mut self, expr: &TypedExpression) -> LoweringResult<IrExpr> {
        trace!("lowering {} at {}", describe(&expr.kind), expr.source_location);
        let location = expr.source_location;
        let lowered = match &expr.kind {
            TypedExpressionKind::Constant(value) => IrExpr::new(
                IrExprKind::Const(value.clone()),
                self.lower_type(&expr.expr_type),
            ),
            TypedExpressionKind::Access { receiver, callee } => {
                self.lower_access(expr, receiver.as_deref(), callee)?
            }
            TypedExpressionKind::Call {
                receiver,
                callee,
                arguments,
                type_arguments,
            } => self.lower_call(expr, receiver.as_deref(), callee, arguments, type_arguments)?,
            TypedExpressionKind::This { class } => self.lower_this(*class, expr)?,
            TypedExpressionKind::WhenSubject => {
                let subject = self.context.current_subject()?;
                let ty = self.registry.arena().value_type(subject)?;
                IrExpr::new(IrExprKind::GetValue { value: subject }, ty)
            }
            TypedExpressionKind::Else => {
                IrExpr::new(IrExprKind::Const(ConstantValue::Boolean(true)), IrType::boolean())
            }
            TypedExpressionKind::When {
                subject,
                subject_variable,
                branches,
            } => self.lower_when(expr, subject.as_deref(), subject_variable.as_deref(), branches)?,
            TypedExpressionKind::Break { target, label } => {
                self.lower_jump(*target, label.as_ref(), false, location)
            }
            TypedExpressionKind::Continue { target, label } => {
                self.lower_jump(*target, label.as_ref(), true, location)
            }
            TypedExpressionKind::Return {
                target,
                label,
                value,
            } => self.lower_return(*target, label.as_deref(), value.as_deref())?,
            TypedExpressionKind::Throw { exception } => {
                let value = self.lower_expression(exception)?;
                IrExpr::new(
                    IrExprKind::Throw {
                        value: Box::new(value),
                    },
                    IrType::nothing(),
                )
            }
            TypedExpressionKind::Try {
                body,
                catches,
                finally,
            } => self.lower_try(expr, body, catches, finally.as_ref())?,
            TypedExpressionKind::Operator {
                operator,
                arguments,
            } => self.lower_operator(*operator, arguments, location)?,
            TypedExpressionKind::TypeOperator {
                operator,
                argument,
                type_operand,
            } => self.lower_type_operator(*operator, argument, type_operand)?,
            TypedExpressionKind::ClassLiteral { argument } => {
                let argument = self.lower_expression(argument)?;
                IrExpr::new(
                    IrExprKind::GetClass {
                        argument: Box::new(argument),
                    },
                    self.lower_type(&expr.expr_type),
                )
            }
            TypedExpressionKind::StringTemplate { parts } => {
                let arguments = parts
                    .iter()
                    .map(|part| self.lower_expression(part))
                    .collect::<LoweringResult<Vec<_>>>()?;
                IrExpr::new(IrExprKind::StringConcatenation { arguments }, IrType::string())
            }
            TypedExpressionKind::AnonymousFunction(function) => {
                self.lower_anonymous_function(function, expr)?
            }
            TypedExpressionKind::AnonymousObject(class) => {
                self.lower_anonymous_object(class, expr)?
            }
            TypedExpressionKind::Block(block) => {
                let statements = self.lower_statements(&block.statements)?;
                IrExpr::block(statements, self.lower_type(&expr.expr_type))
            }
        };
        Ok(lowered.at(location))
    }

    pub(crate) fn lower_arguments(
        &mut self,
        arguments: &[TypedExpression],
    ) -> LoweringResult<Vec<IrExpr>> {
        arguments
            .iter()
            .map(|argument| self.lower_expression(argument))
            .collect()
    }

    fn lower_call(
        &mut self,
        expr: &TypedExpression,
        receiver: Option<&TypedExpression>,
        callee: &TypedReference,
        arguments: &[TypedExpression],
        type_arguments: &[TypeRef],
    ) -> LoweringResult<IrExpr> {
        let ty = self.lower_type(&expr.expr_type);
        let Some(symbol) = callee.resolved else {
            return Ok(self.unresolved(&callee.name, ty, expr.source_location));
        };
        let type_arguments: Vec<IrType> = type_arguments
            .iter()
            .map(|argument| self.lower_type(argument))
            .collect();

        match self.symbols.kind(symbol) {
            Some(SymbolKind::Function) | Some(SymbolKind::Accessor) => {
                let function = self.registry.get_lowered_function_symbol(symbol)?;
                let dispatch_receiver = self.lower_dispatch_receiver(receiver, symbol)?;
                let arguments = self.lower_arguments(arguments)?;
                Ok(IrExpr::new(
                    IrExprKind::Call {
                        function,
                        dispatch_receiver,
                        arguments,
                        type_arguments,
                    },
                    ty,
                ))
            }
            Some(SymbolKind::Constructor) => {
                let constructor = self.registry.get_lowered_constructor(symbol)?;
                let arguments = self.lower_arguments(arguments)?;
                Ok(IrExpr::new(
                    IrExprKind::ConstructorCall {
                        constructor,
                        arguments,
                        type_arguments,
                    },
                    ty,
                ))
            }
            _ => Ok(self.unresolved(&callee.name, ty, expr.source_location)),
        }
    }

    fn lower_access(
        &mut self,
        expr: &TypedExpression,
        receiver: Option<&TypedExpression>,
        callee: &TypedReference,
    ) -> LoweringResult<IrExpr> {
        let ty = self.lower_type(&expr.expr_type);
        let location = expr.source_location;
        let Some(symbol) = callee.resolved else {
            return Ok(self.unresolved(&callee.name, ty, location));
        };
        if callee.backing_field {
            return self.read_backing_field(symbol, &callee.name, receiver, ty, location);
        }

        match self.symbols.kind(symbol) {
            Some(SymbolKind::Variable) | Some(SymbolKind::Parameter) => {
                match self.registry.get_lowered_value(symbol) {
                    Some(value) => Ok(IrExpr::new(IrExprKind::GetValue { value }, ty)),
                    None => Ok(self.unresolved(&callee.name, ty, location)),
                }
            }
            Some(SymbolKind::Property) => {
                let property = self.registry.get_lowered_property(symbol)?;
                let getter = self.registry.arena().property(property)?.getter;
                let dispatch_receiver = self.lower_dispatch_receiver(receiver, symbol)?;
                match getter {
                    Some(function) => Ok(IrExpr::new(
                        IrExprKind::Call {
                            function,
                            dispatch_receiver,
                            arguments: Vec::new(),
                            type_arguments: Vec::new(),
                        },
                        ty,
                    )),
                    None => match self.backing_field_of(symbol)? {
                        Some(field) => Ok(IrExpr::new(
                            IrExprKind::GetField {
                                field,
                                receiver: dispatch_receiver,
                            },
                            ty,
                        )),
                        None => Ok(self.missing_backing_field(&callee.name, ty, location)),
                    },
                }
            }
            Some(SymbolKind::Class) => {
                let class = self.registry.get_lowered_class(symbol)?;
                Ok(IrExpr::new(IrExprKind::GetObject { class }, ty))
            }
            Some(SymbolKind::Function) => {
                let function = self.registry.get_lowered_function(symbol)?;
                Ok(IrExpr::new(IrExprKind::FunctionReference { function }, ty))
            }
            _ => Ok(self.unresolved(&callee.name, ty, location)),
        }
    }

    /// `field` inside an accessor
    fn read_backing_field(
        &mut self,
        property: SymbolId,
        name: &str,
        receiver: Option<&TypedExpression>,
        ty: IrType,
        location: SourceLocation,
    ) -> LoweringResult<IrExpr> {
        if self.symbols.kind(property) != Some(SymbolKind::Property) {
            return Ok(self.unresolved(name, ty, location));
        }
        let Some(field) = self.backing_field_of(property)? else {
            return Ok(self.missing_backing_field(name, ty, location));
        };
        let receiver = self.lower_dispatch_receiver(receiver, property)?;
        Ok(IrExpr::new(IrExprKind::GetField { field, receiver }, ty))
    }

    fn missing_backing_field(&mut self, name: &str, ty: IrType, location: SourceLocation) -> IrExpr {
        self.error_node(
            IrErrorKind::MissingBackingField,
            format!("property `{}` has no backing field", name),
            ty,
            location,
        )
    }

    fn lower_assignment(
        &mut self,
        target: &TypedReference,
        receiver: Option<&TypedExpression>,
        value: &TypedExpression,
        location: SourceLocation,
    ) -> LoweringResult<IrExpr> {
        let Some(symbol) = target.resolved else {
            return Ok(self.unresolved(&target.name, IrType::unit(), location));
        };
        let new_value = Box::new(self.lower_expression(value)?);

        let kind = match self.symbols.kind(symbol) {
            Some(SymbolKind::Variable) | Some(SymbolKind::Parameter) => {
                match self.registry.get_lowered_value(symbol) {
                    Some(value) => IrExprKind::SetValue { value, new_value },
                    None => return Ok(self.unresolved(&target.name, IrType::unit(), location)),
                }
            }
            Some(SymbolKind::Property) => match self.backing_field_of(symbol)? {
                Some(field) => {
                    let receiver = self.lower_dispatch_receiver(receiver, symbol)?;
                    IrExprKind::SetField {
                        field,
                        receiver,
                        new_value,
                    }
                }
                None => return Ok(self.missing_backing_field(&target.name, IrType::unit(), location)),
            },
            _ => return Ok(self.unresolved(&target.name, IrType::unit(), location)),
        };
        Ok(IrExpr::new(kind, IrType::unit()).at(location))
    }

    /// The explicit receiver, or the implicit `this` when `callee` is a class
    /// member called without one
    fn lower_dispatch_receiver(
        &mut self,
        receiver: Option<&TypedExpression>,
        callee: SymbolId,
    ) -> LoweringResult<Option<Box<IrExpr>>> {
        if let Some(receiver) = receiver {
            return Ok(Some(Box::new(self.lower_expression(receiver)?)));
        }
        let member = match self.symbols.get(callee) {
            Some(symbol) if symbol.kind == SymbolKind::Accessor => symbol.owner.unwrap_or(callee),
            _ => callee,
        };
        let Some(class) = self.symbols.owner_class(member) else {
            return Ok(None);
        };
        Ok(self.implicit_receiver(Some(class))?.map(Box::new))
    }

    /// Read of the `this` visible here for members of `class`.
    ///
    /// Enclosing functions are searched innermost first for a receiver of
    /// `class` or a subclass, then enclosing classes, then any function
    /// receiver. `None` for `class` takes the innermost receiver.
    fn implicit_receiver(&self, class: Option<SymbolId>) -> LoweringResult<Option<IrExpr>> {
        let symbols = self.symbols;
        let accepts = |candidate: SymbolId| match class {
            Some(wanted) => symbols.is_subclass_of(candidate, wanted),
            None => true,
        };
        let receiver = self
            .context
            .functions()
            .find(|frame| {
                frame.receiver.is_some()
                    && frame
                        .receiver_class
                        .is_some_and(|candidate| accepts(candidate))
            })
            .and_then(|frame| frame.receiver)
            .or_else(|| {
                self.context
                    .classes()
                    .find(|frame| accepts(frame.source))
                    .and_then(|frame| frame.this_receiver)
            })
            .or_else(|| self.context.functions().find_map(|frame| frame.receiver));
        receiver
            .map(|value| {
                let ty = self.registry.arena().value_type(value)?;
                Ok(IrExpr::new(IrExprKind::GetValue { value }, ty))
            })
            .transpose()
    }

    fn lower_this(&mut self, class: Option<SymbolId>, expr: &TypedExpression) -> LoweringResult<IrExpr> {
        match self.implicit_receiver(class)? {
            Some(receiver) => Ok(receiver),
            None => {
                let ty = self.lower_type(&expr.expr_type);
                Ok(self.unresolved("this", ty, expr.source_location))
            }
        }
    }

    /// `==` is the only operator with a lowered form; the others are
    /// supposed to be calls by now
    fn lower_operator(
        &mut self,
        operator: OperatorKind,
        arguments: &[TypedExpression],
        location: SourceLocation,
    ) -> LoweringResult<IrExpr> {
        match operator {
            OperatorKind::Equal => {
                let arguments = self.lower_arguments(arguments)?;
                Ok(IrExpr::new(
                    IrExprKind::BuiltinCall {
                        builtin: IrBuiltin::Equals,
                        arguments,
                    },
                    IrType::boolean(),
                ))
            }
            other => Err(LoweringError::unsupported(
                format!("operator `{}`", other),
                location,
            )),
        }
    }

    fn lower_type_operator(
        &mut self,
        operator: TypeOperatorKind,
        argument: &TypedExpression,
        type_operand: &TypeRef,
    ) -> LoweringResult<IrExpr> {
        let argument = Box::new(self.lower_expression(argument)?);
        let type_operand = self.lower_type(type_operand);
        let (operator, ty) = match operator {
            TypeOperatorKind::Is => (IrTypeOperator::InstanceOf, IrType::boolean()),
            TypeOperatorKind::NotIs => (IrTypeOperator::NotInstanceOf, IrType::boolean()),
            TypeOperatorKind::As => (IrTypeOperator::Cast, type_operand.clone()),
            TypeOperatorKind::SafeAs => (IrTypeOperator::SafeCast, type_operand.clone().make_nullable()),
        };
        Ok(IrExpr::new(
            IrExprKind::TypeOperator {
                operator,
                argument,
                type_operand,
            },
            ty,
        ))
    }

    /// The function declaration followed by a reference to it
    fn lower_anonymous_function(
        &mut self,
        function: &TypedFunction,
        expr: &TypedExpression,
    ) -> LoweringResult<IrExpr> {
        let ty = self.lower_type(&expr.expr_type);
        let id = self.lower_function(function)?;
        let reference = IrExpr::new(IrExprKind::FunctionReference { function: id }, ty.clone())
            .at(expr.source_location);
        Ok(IrExpr::new(
            IrExprKind::Group {
                statements: vec![IrStatement::Declaration(id), IrStatement::Expression(reference)],
            },
            ty,
        ))
    }

    /// The class declaration followed by a call of its constructor
    fn lower_anonymous_object(
        &mut self,
        class: &TypedClass,
        expr: &TypedExpression,
    ) -> LoweringResult<IrExpr> {
        let Some(primary) = class.primary_constructor() else {
            return Err(LoweringError::unsupported(
                "anonymous object without a constructor",
                expr.source_location,
            ));
        };
        let ty = self.lower_type(&expr.expr_type);
        let id = self.lower_class_as(class, true)?;
        let constructor = self.registry.get_lowered_constructor(primary.symbol_id)?;
        let call = IrExpr::new(
            IrExprKind::ConstructorCall {
                constructor,
                arguments: Vec::new(),
                type_arguments: Vec::new(),
            },
            ty.clone(),
        )
        .at(expr.source_location);
        Ok(IrExpr::new(
            IrExprKind::Group {
                statements: vec![IrStatement::Declaration(id), IrStatement::Expression(call)],
            },
            ty,
        ))
    }
}
