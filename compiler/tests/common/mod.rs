#![allow(dead_code)]

use compiler::driver::{lower_module, LoweredModule, TypedModule};
use compiler::ir::{IrArena, IrDeclId, IrDeclarationKind, IrDeclarationOrigin, IrExpr, IrStatement};
use compiler::tast::TypedFile;
use compiler::LoweringConfig;

pub fn lower(files: Vec<TypedFile>) -> LoweredModule {
    lower_with(files, &LoweringConfig::default())
}

pub fn lower_with(files: Vec<TypedFile>, config: &LoweringConfig) -> LoweredModule {
    compiler::logging::init_test();
    let module = TypedModule::new("test", files);
    match lower_module(&module, config) {
        Ok(lowered) => lowered,
        Err(e) => panic!("lowering failed: {}", e),
    }
}

/// First declaration named `name` that matches `kind`
pub fn find(arena: &IrArena, name: &str, kind: fn(&IrDeclarationKind) -> bool) -> IrDeclId {
    arena
        .iter()
        .find(|decl| kind(&decl.kind) && arena.name_of(decl.id) == Some(name))
        .map(|decl| decl.id)
        .unwrap_or_else(|| panic!("no declaration named {}", name))
}

pub fn class_named(arena: &IrArena, name: &str) -> IrDeclId {
    find(arena, name, |kind| matches!(kind, IrDeclarationKind::Class(_)))
}

pub fn property_named(arena: &IrArena, name: &str) -> IrDeclId {
    find(arena, name, |kind| matches!(kind, IrDeclarationKind::Property(_)))
}

/// Source-defined function named `name`
pub fn function_named(arena: &IrArena, name: &str) -> IrDeclId {
    arena
        .iter()
        .find(|decl| {
            matches!(decl.kind, IrDeclarationKind::Function(_))
                && decl.origin != IrDeclarationOrigin::FakeOverride
                && arena.name_of(decl.id) == Some(name)
        })
        .map(|decl| decl.id)
        .unwrap_or_else(|| panic!("no function named {}", name))
}

/// Body statements of a function or constructor
pub fn body(arena: &IrArena, id: IrDeclId) -> &[IrStatement] {
    let body = match arena.get(id).map(|decl| &decl.kind) {
        Some(IrDeclarationKind::Function(function)) => function.body.as_ref(),
        Some(IrDeclarationKind::Constructor(ctor)) => ctor.body.as_ref(),
        other => panic!("{} is not a function: {:?}", id, other),
    };
    match body {
        Some(body) => &body.statements,
        None => panic!("{} has no body", id),
    }
}

pub fn expression(statement: &IrStatement) -> &IrExpr {
    match statement {
        IrStatement::Expression(expr) => expr,
        IrStatement::Declaration(id) => panic!("expected an expression, found declaration {}", id),
    }
}

pub fn declaration(statement: &IrStatement) -> IrDeclId {
    match statement {
        IrStatement::Declaration(id) => *id,
        IrStatement::Expression(expr) => panic!("expected a declaration, found {:?}", expr.kind),
    }
}
