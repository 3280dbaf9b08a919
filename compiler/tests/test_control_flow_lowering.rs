mod common;

use common::*;
use compiler::error_codes;
use compiler::ir::*;
use compiler::tast::builder::TastBuilder;
use compiler::tast::*;

fn function_with(b: &mut TastBuilder, name: &str, statements: Vec<TypedStatement>) -> TypedFunction {
    let mut function = b.function(name, TypeRef::unit());
    function.body = Some(TypedBlock::new(statements));
    function
}

fn block_statements(expr: &IrExpr) -> &[IrStatement] {
    match &expr.kind {
        IrExprKind::Block { statements } | IrExprKind::Group { statements } => statements,
        other => panic!("expected a block, got {:?}", other),
    }
}

#[test]
fn test_break_targets_its_loop() {
    let mut b = TastBuilder::new();
    let loop_id = b.fresh_loop();
    let loop_body = vec![b.expr(b.break_of(loop_id))];
    let while_loop = b.while_loop(loop_id, b.boolean(true), loop_body);
    let run = function_with(&mut b, "run", vec![while_loop]);
    let file = b.file("loop.kt", vec![TypedDeclaration::Function(run)]);

    let lowered = lower(vec![file]);
    assert!(!lowered.has_errors());
    let arena = &lowered.arena;
    let statements = body(arena, function_named(arena, "run"));
    match &expression(&statements[0]).kind {
        IrExprKind::While {
            loop_id,
            condition,
            body,
            ..
        } => {
            assert!(matches!(
                condition.kind,
                IrExprKind::Const(ConstantValue::Boolean(true))
            ));
            let inner = block_statements(body);
            match &expression(&inner[0]).kind {
                IrExprKind::Break { loop_id: target, .. } => assert_eq!(target, loop_id),
                other => panic!("expected a break, got {:?}", other),
            }
        }
        other => panic!("expected a while loop, got {:?}", other),
    }
}

#[test]
fn test_nested_loops_keep_their_targets() {
    let mut b = TastBuilder::new();
    let outer = b.fresh_loop();
    let inner = b.fresh_loop();
    let inner_loop = b.while_loop(
        inner,
        b.boolean(true),
        vec![b.expr(b.continue_of(outer)), b.expr(b.break_of(inner))],
    );
    let outer_loop = b.while_loop(outer, b.boolean(true), vec![inner_loop]);
    let run = function_with(&mut b, "run", vec![outer_loop]);
    let file = b.file("nested.kt", vec![TypedDeclaration::Function(run)]);

    let lowered = lower(vec![file]);
    let arena = &lowered.arena;
    let statements = body(arena, function_named(arena, "run"));
    let IrExprKind::While {
        loop_id: outer_id,
        body: outer_body,
        ..
    } = &expression(&statements[0]).kind
    else {
        panic!("expected the outer loop");
    };
    let IrExprKind::While {
        loop_id: inner_id,
        body: inner_body,
        ..
    } = &expression(&block_statements(outer_body)[0]).kind
    else {
        panic!("expected the inner loop");
    };
    assert_ne!(outer_id, inner_id);
    let jumps = block_statements(inner_body);
    assert!(matches!(
        &expression(&jumps[0]).kind,
        IrExprKind::Continue { loop_id, .. } if loop_id == outer_id
    ));
    assert!(matches!(
        &expression(&jumps[1]).kind,
        IrExprKind::Break { loop_id, .. } if loop_id == inner_id
    ));
}

#[test]
fn test_do_while_lowers_body_before_condition() {
    let mut b = TastBuilder::new();
    let loop_id = b.fresh_loop();
    let do_while = TypedStatement::DoWhile {
        loop_id,
        label: Some("retry".to_string()),
        body: TypedBlock::new(vec![b.expr(b.continue_of(loop_id))]),
        condition: b.boolean(false),
        source_location: SourceLocation::unknown(),
    };
    let run = function_with(&mut b, "run", vec![do_while]);
    let file = b.file("do.kt", vec![TypedDeclaration::Function(run)]);

    let lowered = lower(vec![file]);
    assert!(!lowered.has_errors());
    let arena = &lowered.arena;
    match &expression(&body(arena, function_named(arena, "run"))[0]).kind {
        IrExprKind::DoWhile {
            loop_id,
            label,
            body,
            ..
        } => {
            assert_eq!(label.as_deref(), Some("retry"));
            assert!(matches!(
                &expression(&block_statements(body)[0]).kind,
                IrExprKind::Continue { loop_id: target, .. } if target == loop_id
            ));
        }
        other => panic!("expected a do-while loop, got {:?}", other),
    }
}

#[test]
fn test_break_outside_loop_is_an_error_node() {
    let mut b = TastBuilder::new();
    let stray = b.fresh_loop();
    let statements = vec![b.expr(b.break_of(stray))];
    let run = function_with(&mut b, "run", statements);
    let file = b.file("stray.kt", vec![TypedDeclaration::Function(run)]);

    let lowered = lower(vec![file]);
    assert!(lowered.has_errors());
    assert_eq!(lowered.diagnostics.len(), 1);
    let diagnostic = &lowered.diagnostics[0];
    assert_eq!(diagnostic.kind, IrErrorKind::UnboundLoop);
    assert_eq!(diagnostic.code, error_codes::UNBOUND_LOOP);
    assert!(diagnostic.message.contains("break"));

    let arena = &lowered.arena;
    let node = expression(&body(arena, function_named(arena, "run"))[0]);
    assert!(node.is_error());
    assert_eq!(node.ty, IrType::nothing());
}

#[test]
fn test_break_to_finished_loop_is_an_error_node() {
    let mut b = TastBuilder::new();
    let first = b.fresh_loop();
    let second = b.fresh_loop();
    let first_body = vec![b.expr(b.break_of(first))];
    let first_loop = b.while_loop(first, b.boolean(true), first_body);
    // the second loop jumps to the first one, which is no longer open
    let second_body = vec![b.expr(b.break_of(first))];
    let second_loop = b.while_loop(second, b.boolean(true), second_body);
    let run = function_with(&mut b, "run", vec![first_loop, second_loop]);
    let file = b.file("siblings.kt", vec![TypedDeclaration::Function(run)]);

    let lowered = lower(vec![file]);
    assert_eq!(lowered.diagnostics.len(), 1);
    assert_eq!(lowered.diagnostics[0].kind, IrErrorKind::UnboundLoop);

    let arena = &lowered.arena;
    let statements = body(arena, function_named(arena, "run"));
    match &expression(&statements[0]).kind {
        IrExprKind::While { loop_id, body, .. } => assert!(matches!(
            &expression(&block_statements(body)[0]).kind,
            IrExprKind::Break { loop_id: target, .. } if target == loop_id
        )),
        other => panic!("expected a while loop, got {:?}", other),
    }
    match &expression(&statements[1]).kind {
        IrExprKind::While { body, .. } => {
            assert!(expression(&block_statements(body)[0]).is_error())
        }
        other => panic!("expected a while loop, got {:?}", other),
    }
}

#[test]
fn test_labeled_return_leaves_the_lambda() {
    let mut b = TastBuilder::new();
    let mut lambda = b.lambda(Some("forEach"), TypeRef::unit());
    lambda.body = Some(TypedBlock::new(vec![b.expr(b.ret(None, Some("forEach"), None))]));
    let lambda_symbol = lambda.symbol_id;
    let lambda_expr = b.lambda_expression(lambda);

    let mut inner_lambda = b.lambda(None, TypeRef::unit());
    inner_lambda.body = Some(TypedBlock::new(vec![b.expr(b.ret(None, Some("outer"), None))]));
    let inner_expr = b.lambda_expression(inner_lambda);

    let statements = vec![b.expr(lambda_expr), b.expr(inner_expr)];
    let outer = function_with(&mut b, "outer", statements);
    let file = b.file("labels.kt", vec![TypedDeclaration::Function(outer)]);

    let lowered = lower(vec![file]);
    assert!(!lowered.has_errors(), "{:?}", lowered.diagnostics);
    let arena = &lowered.arena;
    let outer = function_named(arena, "outer");
    let statements = body(arena, outer);

    let group = block_statements(expression(&statements[0]));
    let lambda = declaration(&group[0]);
    assert_eq!(arena.get(lambda).unwrap().parent, Some(outer));
    assert_eq!(
        arena.get(lambda).unwrap().origin,
        IrDeclarationOrigin::AnonymousFunction
    );
    assert_eq!(arena.function(lambda).unwrap().source, Some(lambda_symbol));
    assert!(matches!(
        &expression(&group[1]).kind,
        IrExprKind::FunctionReference { function } if *function == lambda
    ));
    assert!(matches!(
        &expression(&body(arena, lambda)[0]).kind,
        IrExprKind::Return { target, .. } if *target == lambda
    ));

    // `return@outer` from a nested lambda leaves the named function
    let inner = declaration(&block_statements(expression(&statements[1]))[0]);
    assert!(matches!(
        &expression(&body(arena, inner)[0]).kind,
        IrExprKind::Return { target, .. } if *target == outer
    ));
}

#[test]
fn test_unlabeled_return_leaves_innermost_function() {
    let mut b = TastBuilder::new();
    let mut lambda = b.lambda(None, TypeRef::unit());
    lambda.body = Some(TypedBlock::new(vec![b.expr(b.ret(None, None, None))]));
    let lambda_expr = b.lambda_expression(lambda);
    let statements = vec![b.expr(lambda_expr)];
    let outer = function_with(&mut b, "outer", statements);
    let file = b.file("plain.kt", vec![TypedDeclaration::Function(outer)]);

    let lowered = lower(vec![file]);
    let arena = &lowered.arena;
    let outer = function_named(arena, "outer");
    let lambda = declaration(&block_statements(expression(&body(arena, outer)[0]))[0]);
    assert!(matches!(
        &expression(&body(arena, lambda)[0]).kind,
        IrExprKind::Return { target, .. } if *target == lambda
    ));
}

#[test]
fn test_when_with_subject_declares_temporary() {
    let mut b = TastBuilder::new();
    let x = b.parameter("x", TypeRef::int());
    let subject = TypedExpression::new(TypedExpressionKind::WhenSubject, TypeRef::int());
    let branches = vec![
        TypedWhenBranch {
            condition: b.operator(OperatorKind::Equal, vec![subject, b.int(1)]),
            result: TypedBlock::new(vec![b.expr(b.string("one"))]),
            source_location: SourceLocation::unknown(),
        },
        TypedWhenBranch {
            condition: TypedExpression::new(TypedExpressionKind::Else, TypeRef::boolean()),
            result: TypedBlock::default(),
            source_location: SourceLocation::unknown(),
        },
    ];
    let when = TypedExpression::new(
        TypedExpressionKind::When {
            subject: Some(Box::new(b.read_parameter(&x))),
            subject_variable: None,
            branches,
        },
        TypeRef::unit(),
    );
    let statements = vec![b.expr(when)];
    let mut describe = function_with(&mut b, "describe", statements);
    describe.parameters.push(x);
    let file = b.file("when.kt", vec![TypedDeclaration::Function(describe)]);

    let lowered = lower(vec![file]);
    assert!(!lowered.has_errors(), "{:?}", lowered.diagnostics);
    let arena = &lowered.arena;
    let describe = function_named(arena, "describe");
    let parameter = arena.function(describe).unwrap().value_parameters[0];

    let block = block_statements(expression(&body(arena, describe)[0]));
    assert_eq!(block.len(), 2);
    let temporary = declaration(&block[0]);
    let temporary_decl = arena.get(temporary).unwrap();
    assert_eq!(temporary_decl.origin, IrDeclarationOrigin::TemporaryVariable);
    assert_eq!(temporary_decl.parent, Some(describe));
    match &temporary_decl.kind {
        IrDeclarationKind::Variable(variable) => {
            assert!(variable.name.ends_with("_subject"));
            assert!(matches!(
                variable.initializer.as_ref().unwrap().kind,
                IrExprKind::GetValue { value } if value == parameter
            ));
        }
        other => panic!("expected a variable, got {:?}", other),
    }

    match &expression(&block[1]).kind {
        IrExprKind::When { branches } => {
            // the empty else branch is dropped
            assert_eq!(branches.len(), 1);
            match &branches[0].condition.kind {
                IrExprKind::BuiltinCall { builtin, arguments } => {
                    assert_eq!(*builtin, IrBuiltin::Equals);
                    assert!(matches!(
                        arguments[0].kind,
                        IrExprKind::GetValue { value } if value == temporary
                    ));
                }
                other => panic!("expected an equality check, got {:?}", other),
            }
        }
        other => panic!("expected a when, got {:?}", other),
    }
}

#[test]
fn test_when_subject_variable_is_scoped_to_the_when() {
    let mut b = TastBuilder::new();
    let code = b.variable("code", TypeRef::int(), Some(b.int(1)));
    let branches = vec![TypedWhenBranch {
        condition: b.operator(OperatorKind::Equal, vec![b.read(&code), b.int(1)]),
        result: TypedBlock::new(vec![b.expr(b.read(&code))]),
        source_location: SourceLocation::unknown(),
    }];
    let after = b.read(&code);
    let when = TypedExpression::new(
        TypedExpressionKind::When {
            subject: None,
            subject_variable: Some(Box::new(code)),
            branches,
        },
        TypeRef::unit(),
    );
    let statements = vec![b.expr(when), b.expr(after)];
    let check = function_with(&mut b, "check", statements);
    let file = b.file("when_val.kt", vec![TypedDeclaration::Function(check)]);

    let lowered = lower(vec![file]);
    // only the read after the `when` fails to resolve
    assert_eq!(lowered.diagnostics.len(), 1);
    assert_eq!(lowered.diagnostics[0].kind, IrErrorKind::UnresolvedReference);
    assert!(lowered.diagnostics[0].message.contains("code"));

    let arena = &lowered.arena;
    let check = function_named(arena, "check");
    let statements = body(arena, check);
    let block = block_statements(expression(&statements[0]));
    let variable = declaration(&block[0]);
    assert_eq!(arena.get(variable).unwrap().parent, Some(check));
    match &expression(&block[1]).kind {
        IrExprKind::When { branches } => {
            let result = block_statements(&branches[0].result);
            assert!(matches!(
                expression(&result[0]).kind,
                IrExprKind::GetValue { value } if value == variable
            ));
        }
        other => panic!("expected a when, got {:?}", other),
    }
    assert!(expression(&statements[1]).is_error());
}

#[test]
fn test_when_without_subject_keeps_else_with_result() {
    let mut b = TastBuilder::new();
    let branches = vec![
        TypedWhenBranch {
            condition: b.boolean(false),
            result: TypedBlock::new(vec![b.expr(b.int(1))]),
            source_location: SourceLocation::unknown(),
        },
        TypedWhenBranch {
            condition: TypedExpression::new(TypedExpressionKind::Else, TypeRef::boolean()),
            result: TypedBlock::new(vec![b.expr(b.int(2))]),
            source_location: SourceLocation::unknown(),
        },
    ];
    let when = TypedExpression::new(
        TypedExpressionKind::When {
            subject: None,
            subject_variable: None,
            branches,
        },
        TypeRef::int(),
    );
    let statements = vec![b.expr(when)];
    let pick = function_with(&mut b, "pick", statements);
    let file = b.file("pick.kt", vec![TypedDeclaration::Function(pick)]);

    let lowered = lower(vec![file]);
    let arena = &lowered.arena;
    match &expression(&body(arena, function_named(arena, "pick"))[0]).kind {
        IrExprKind::When { branches } => {
            assert_eq!(branches.len(), 2);
            assert!(matches!(
                branches[1].condition.kind,
                IrExprKind::Const(ConstantValue::Boolean(true))
            ));
        }
        other => panic!("expected a bare when, got {:?}", other),
    }
}

#[test]
fn test_catch_parameter_is_scoped_to_its_handler() {
    let mut b = TastBuilder::new();
    let error = b.variable("e", TypeRef::any(), None);
    let catch = TypedCatch {
        body: TypedBlock::new(vec![b.expr(b.read(&error))]),
        parameter: error.clone(),
        source_location: SourceLocation::unknown(),
    };
    let try_expr = TypedExpression::new(
        TypedExpressionKind::Try {
            body: TypedBlock::new(vec![b.expr(b.int(1))]),
            catches: vec![catch],
            finally: Some(TypedBlock::new(vec![b.expr(b.int(2))])),
        },
        TypeRef::int(),
    );
    // reading `e` after the try is out of scope
    let after = b.read(&error);
    let statements = vec![b.expr(try_expr), b.expr(after)];
    let guarded = function_with(&mut b, "guarded", statements);
    let file = b.file("try.kt", vec![TypedDeclaration::Function(guarded)]);

    let lowered = lower(vec![file]);
    let arena = &lowered.arena;
    let guarded = function_named(arena, "guarded");
    let statements = body(arena, guarded);

    match &expression(&statements[0]).kind {
        IrExprKind::Try {
            catches, finally, ..
        } => {
            assert_eq!(catches.len(), 1);
            let parameter = catches[0].parameter;
            assert_eq!(
                arena.get(parameter).unwrap().origin,
                IrDeclarationOrigin::CatchParameter
            );
            assert_eq!(arena.get(parameter).unwrap().parent, Some(guarded));
            let handler = block_statements(&catches[0].handler);
            assert!(matches!(
                expression(&handler[0]).kind,
                IrExprKind::GetValue { value } if value == parameter
            ));
            assert_eq!(finally.as_ref().unwrap().ty, IrType::unit());
        }
        other => panic!("expected a try, got {:?}", other),
    }

    assert!(expression(&statements[1]).is_error());
    assert_eq!(lowered.diagnostics.len(), 1);
    assert_eq!(lowered.diagnostics[0].kind, IrErrorKind::UnresolvedReference);
}

#[test]
fn test_throw_is_typed_nothing() {
    let mut b = TastBuilder::new();
    let throw = TypedExpression::new(
        TypedExpressionKind::Throw {
            exception: Box::new(b.string("boom")),
        },
        TypeRef::nothing(),
    );
    let statements = vec![b.expr(throw)];
    let fail = function_with(&mut b, "fail", statements);
    let file = b.file("throw.kt", vec![TypedDeclaration::Function(fail)]);

    let lowered = lower(vec![file]);
    let arena = &lowered.arena;
    let thrown = expression(&body(arena, function_named(arena, "fail"))[0]);
    assert!(matches!(thrown.kind, IrExprKind::Throw { .. }));
    assert_eq!(thrown.ty, IrType::nothing());
}
