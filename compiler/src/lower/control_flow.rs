//! Loops, jumps, returns, `when`, `try` and `throw`
//!
//! A loop is registered under its source identity while its condition and
//! body are lowered, so `break` and `continue` inside can name the lowered
//! loop. A jump whose loop is not being lowered becomes an error node.

use super::{LoweringResult, LoweringSession};
use crate::ir::*;
use crate::tast::{
    LoopId, SourceLocation, SymbolId, TypedBlock, TypedCatch, TypedExpression,
    TypedExpressionKind, TypedVariable, TypedWhenBranch,
};

impl LoweringSession<'_> {
    fn with_loop<T>(
        &mut self,
        source: LoopId,
        lowered: IrLoopId,
        f: impl FnOnce(&mut Self) -> LoweringResult<T>,
    ) -> LoweringResult<T> {
        self.loops.register(source, lowered);
        let result = f(self);
        self.loops.deregister(source);
        result
    }

    fn lower_loop_body(&mut self, body: &TypedBlock) -> LoweringResult<IrExpr> {
        let statements = self.lower_statements(&body.statements)?;
        Ok(IrExpr::block(statements, IrType::unit()).at(body.source_location))
    }

    pub(crate) fn lower_while(
        &mut self,
        loop_id: LoopId,
        label: Option<&String>,
        condition: &TypedExpression,
        body: &TypedBlock,
        location: SourceLocation,
    ) -> LoweringResult<IrExpr> {
        let lowered = self.registry.arena_mut().new_loop_id();
        let (condition, body) = self.with_loop(loop_id, lowered, |s| {
            let condition = s.lower_expression(condition)?;
            let body = s.lower_loop_body(body)?;
            Ok((condition, body))
        })?;
        Ok(IrExpr::new(
            IrExprKind::While {
                loop_id: lowered,
                label: label.cloned(),
                condition: Box::new(condition),
                body: Box::new(body),
            },
            IrType::unit(),
        )
        .at(location))
    }

    pub(crate) fn lower_do_while(
        &mut self,
        loop_id: LoopId,
        label: Option<&String>,
        body: &TypedBlock,
        condition: &TypedExpression,
        location: SourceLocation,
    ) -> LoweringResult<IrExpr> {
        let lowered = self.registry.arena_mut().new_loop_id();
        let (body, condition) = self.with_loop(loop_id, lowered, |s| {
            let body = s.lower_loop_body(body)?;
            let condition = s.lower_expression(condition)?;
            Ok((body, condition))
        })?;
        Ok(IrExpr::new(
            IrExprKind::DoWhile {
                loop_id: lowered,
                label: label.cloned(),
                body: Box::new(body),
                condition: Box::new(condition),
            },
            IrType::unit(),
        )
        .at(location))
    }

    /// `break` or `continue` of the loop `target`
    pub(crate) fn lower_jump(
        &mut self,
        target: LoopId,
        label: Option<&String>,
        is_continue: bool,
        location: SourceLocation,
    ) -> IrExpr {
        let Some(loop_id) = self.loops.lookup(target) else {
            let keyword = if is_continue { "continue" } else { "break" };
            return self.error_node(
                IrErrorKind::UnboundLoop,
                format!("`{}` outside of loop {}", keyword, target),
                IrType::nothing(),
                location,
            );
        };
        let label = label.cloned();
        let kind = if is_continue {
            IrExprKind::Continue { loop_id, label }
        } else {
            IrExprKind::Break { loop_id, label }
        };
        IrExpr::new(kind, IrType::nothing())
    }

    pub(crate) fn lower_return(
        &mut self,
        target: Option<SymbolId>,
        label: Option<&str>,
        value: Option<&TypedExpression>,
    ) -> LoweringResult<IrExpr> {
        let target = self.resolve_return_target(target, label)?;
        let value = value
            .map(|value| self.lower_expression(value))
            .transpose()?
            .map(Box::new);
        Ok(IrExpr::new(IrExprKind::Return { target, value }, IrType::nothing()))
    }

    /// The recorded target if it is being lowered, else the innermost
    /// function carrying `label`, else the innermost function
    fn resolve_return_target(
        &self,
        target: Option<SymbolId>,
        label: Option<&str>,
    ) -> LoweringResult<IrDeclId> {
        if let Some(target) = target {
            if let Some(frame) = self.context.functions().find(|frame| frame.source == Some(target)) {
                return Ok(frame.decl);
            }
        }
        if let Some(label) = label {
            if let Some(frame) = self
                .context
                .functions()
                .find(|frame| frame.label.as_deref() == Some(label))
            {
                return Ok(frame.decl);
            }
        }
        Ok(self.context.current_function()?.decl)
    }

    /// A `when` with a subject becomes a block declaring the subject
    /// variable followed by the branches
    pub(crate) fn lower_when(
        &mut self,
        expr: &TypedExpression,
        subject: Option<&TypedExpression>,
        subject_variable: Option<&TypedVariable>,
        branches: &[TypedWhenBranch],
    ) -> LoweringResult<IrExpr> {
        if let Some(variable) = subject_variable {
            // `when (val x = ..)` keeps `x` to its branches
            return self.in_registry_scope(variable.symbol_id, |s| {
                let subject = s.lower_local_variable(variable)?;
                s.lower_when_branches(expr, Some(subject), branches)
            });
        }
        let subject = match subject {
            Some(subject) => {
                let value = self.lower_expression(subject)?;
                let parent = self.context.current_parent()?;
                Some(self.registry.declare_temporary_variable(parent, value, "subject")?)
            }
            None => None,
        };
        self.lower_when_branches(expr, subject, branches)
    }

    fn lower_when_branches(
        &mut self,
        expr: &TypedExpression,
        subject: Option<IrDeclId>,
        branches: &[TypedWhenBranch],
    ) -> LoweringResult<IrExpr> {
        let ty = self.lower_type(&expr.expr_type);
        let branches = match subject {
            Some(subject) => self.with_subject(subject, |s| s.lower_branches(branches, &ty))?,
            None => self.lower_branches(branches, &ty)?,
        };
        let when = IrExpr::new(IrExprKind::When { branches }, ty.clone()).at(expr.source_location);
        Ok(match subject {
            Some(subject) => IrExpr::block(
                vec![IrStatement::Declaration(subject), IrStatement::Expression(when)],
                ty,
            ),
            None => when,
        })
    }

    fn lower_branches(
        &mut self,
        branches: &[TypedWhenBranch],
        ty: &IrType,
    ) -> LoweringResult<Vec<IrBranch>> {
        let mut lowered = Vec::with_capacity(branches.len());
        for branch in branches {
            // `else -> {}` contributes nothing
            if matches!(branch.condition.kind, TypedExpressionKind::Else) && branch.result.is_empty() {
                continue;
            }
            let condition = self.lower_expression(&branch.condition)?;
            let statements = self.lower_statements(&branch.result.statements)?;
            lowered.push(IrBranch {
                condition,
                result: IrExpr::block(statements, ty.clone()).at(branch.source_location),
            });
        }
        Ok(lowered)
    }

    /// Each catch parameter lives in its own registry scope
    pub(crate) fn lower_try(
        &mut self,
        expr: &TypedExpression,
        body: &TypedBlock,
        catches: &[TypedCatch],
        finally: Option<&TypedBlock>,
    ) -> LoweringResult<IrExpr> {
        let ty = self.lower_type(&expr.expr_type);
        let try_result = IrExpr::block(self.lower_statements(&body.statements)?, ty.clone());

        let mut lowered_catches = Vec::with_capacity(catches.len());
        for catch in catches {
            let lowered = self.in_registry_scope(catch.parameter.symbol_id, |s| {
                let parameter = s.lower_variable_with_origin(
                    &catch.parameter,
                    IrDeclarationOrigin::CatchParameter,
                )?;
                let handler = IrExpr::block(s.lower_statements(&catch.body.statements)?, ty.clone())
                    .at(catch.source_location);
                Ok(IrCatch { parameter, handler })
            })?;
            lowered_catches.push(lowered);
        }

        let finally = finally
            .map(|block| {
                self.lower_statements(&block.statements)
                    .map(|statements| Box::new(IrExpr::block(statements, IrType::unit())))
            })
            .transpose()?;

        Ok(IrExpr::new(
            IrExprKind::Try {
                try_result: Box::new(try_result),
                catches: lowered_catches,
                finally,
            },
            ty,
        ))
    }
}
