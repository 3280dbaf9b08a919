//! Lowered tree dump
//!
//! Pretty-prints a lowered file as an indented tree, one node per line.
//! Output is deterministic so that it can be compared in tests and logged
//! when `dump` is enabled in the lowering configuration.

use super::{
    IrArena, IrBlock, IrDeclId, IrDeclaration, IrDeclarationKind, IrDeclarationOrigin, IrExpr,
    IrExprKind, IrStatement,
};
use serde::Serialize;

/// Dump the file `file` and everything it owns.
pub fn dump_file(arena: &IrArena, file: IrDeclId) -> String {
    let mut dumper = Dumper {
        arena,
        out: String::new(),
        depth: 0,
    };
    dumper.declaration(file);
    dumper.out
}

/// Dump a single expression tree.
pub fn dump_expr(arena: &IrArena, expr: &IrExpr) -> String {
    let mut dumper = Dumper {
        arena,
        out: String::new(),
        depth: 0,
    };
    dumper.expr(expr);
    dumper.out
}

#[derive(Serialize)]
struct FileView<'a> {
    root: IrDeclId,
    declarations: Vec<&'a IrDeclaration>,
}

/// Render the file `file` and every declaration it owns as JSON, in
/// allocation order.
pub fn to_json(arena: &IrArena, file: IrDeclId) -> serde_json::Result<String> {
    let mut owned = vec![file];
    let mut next = 0;
    while next < owned.len() {
        let children = arena.children(owned[next]);
        owned.extend(children);
        next += 1;
    }
    owned.sort();
    owned.dedup();
    let view = FileView {
        root: file,
        declarations: owned.iter().filter_map(|id| arena.get(*id)).collect(),
    };
    serde_json::to_string_pretty(&view)
}

struct Dumper<'a> {
    arena: &'a IrArena,
    out: String,
    depth: usize,
}

impl Dumper<'_> {
    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn nested(&mut self, f: impl FnOnce(&mut Self)) {
        self.depth += 1;
        f(self);
        self.depth -= 1;
    }

    fn name(&self, id: IrDeclId) -> String {
        match self.arena.name_of(id) {
            Some(name) if !name.is_empty() => format!("{}:{}", name, id.as_raw()),
            _ => format!("<anonymous>:{}", id.as_raw()),
        }
    }

    fn declaration(&mut self, id: IrDeclId) {
        let arena = self.arena;
        let Some(decl) = arena.get(id) else {
            self.line(&format!("DANGLING {}", id));
            return;
        };
        let origin = match decl.origin {
            IrDeclarationOrigin::Defined => String::new(),
            other => format!(" origin:{:?}", other),
        };
        match &decl.kind {
            IrDeclarationKind::File(file) => {
                self.line(&format!("FILE name:{}", file.name));
                self.nested(|d| file.declarations.iter().for_each(|child| d.declaration(*child)));
            }
            IrDeclarationKind::Class(class) => {
                let supertypes: Vec<String> =
                    class.supertypes.iter().map(ToString::to_string).collect();
                self.line(&format!(
                    "CLASS {} name:{} modality:{:?} supertypes:[{}]{}",
                    class.kind.to_string().to_uppercase(),
                    self.name(id),
                    class.modality,
                    supertypes.join(", "),
                    origin
                ));
                self.nested(|d| {
                    class.type_parameters.iter().for_each(|p| d.declaration(*p));
                    if let Some(receiver) = class.this_receiver {
                        d.declaration(receiver);
                    }
                    class.declarations.iter().for_each(|child| d.declaration(*child));
                });
            }
            IrDeclarationKind::Function(function) => {
                let overridden: Vec<String> =
                    function.overridden.iter().map(|o| self.name(*o)).collect();
                let overrides = if overridden.is_empty() {
                    String::new()
                } else {
                    format!(" overrides:[{}]", overridden.join(", "))
                };
                self.line(&format!(
                    "FUN name:{} returns:{} modality:{:?}{}{}",
                    self.name(id),
                    function.return_type,
                    function.modality,
                    overrides,
                    origin
                ));
                self.nested(|d| {
                    function.type_parameters.iter().for_each(|p| d.declaration(*p));
                    if let Some(receiver) = function.dispatch_receiver {
                        d.declaration(receiver);
                    }
                    function.value_parameters.iter().for_each(|p| d.declaration(*p));
                    if let Some(body) = &function.body {
                        d.body(body);
                    }
                });
            }
            IrDeclarationKind::Constructor(ctor) => {
                self.line(&format!(
                    "CONSTRUCTOR {} primary:{} returns:{}",
                    self.name(id),
                    ctor.is_primary,
                    ctor.return_type
                ));
                self.nested(|d| {
                    ctor.type_parameters.iter().for_each(|p| d.declaration(*p));
                    ctor.value_parameters.iter().for_each(|p| d.declaration(*p));
                    if let Some(body) = &ctor.body {
                        d.body(body);
                    }
                });
            }
            IrDeclarationKind::Property(property) => {
                self.line(&format!(
                    "PROPERTY name:{} type:{} mutable:{} modality:{:?}{}",
                    self.name(id),
                    property.ty,
                    property.is_mutable,
                    property.modality,
                    origin
                ));
                self.nested(|d| {
                    for part in [property.backing_field, property.getter, property.setter]
                        .into_iter()
                        .flatten()
                    {
                        d.declaration(part);
                    }
                });
            }
            IrDeclarationKind::Field(field) => {
                self.line(&format!("FIELD name:{} type:{}{}", self.name(id), field.ty, origin));
                if let Some(initializer) = &field.initializer {
                    self.nested(|d| d.expr(initializer));
                }
            }
            IrDeclarationKind::Variable(variable) => {
                self.line(&format!(
                    "VAR name:{} type:{} mutable:{}{}",
                    self.name(id),
                    variable.ty,
                    variable.is_mutable,
                    origin
                ));
                if let Some(initializer) = &variable.initializer {
                    self.nested(|d| d.expr(initializer));
                }
            }
            IrDeclarationKind::ValueParameter(param) => {
                let index = param
                    .index
                    .map_or_else(|| "receiver".to_string(), |i| i.to_string());
                self.line(&format!(
                    "VALUE_PARAMETER name:{} index:{} type:{}{}",
                    self.name(id),
                    index,
                    param.ty,
                    origin
                ));
                if let Some(default) = &param.default_value {
                    self.nested(|d| d.expr(default));
                }
            }
            IrDeclarationKind::TypeParameter(param) => {
                self.line(&format!(
                    "TYPE_PARAMETER name:{} index:{}",
                    self.name(id),
                    param.index
                ));
            }
            IrDeclarationKind::AnonymousInitializer(init) => {
                self.line(&format!("ANONYMOUS_INITIALIZER {}", id.as_raw()));
                if let Some(body) = &init.body {
                    self.nested(|d| d.body(body));
                }
            }
        }
        if !decl.annotations.is_empty() {
            self.nested(|d| {
                d.line("ANNOTATIONS");
                d.nested(|d| decl.annotations.iter().for_each(|a| d.expr(a)));
            });
        }
    }

    fn body(&mut self, body: &IrBlock) {
        self.line("BLOCK_BODY");
        self.nested(|d| d.statements(&body.statements));
    }

    fn statements(&mut self, statements: &[IrStatement]) {
        for statement in statements {
            match statement {
                IrStatement::Declaration(id) => self.declaration(*id),
                IrStatement::Expression(expr) => self.expr(expr),
            }
        }
    }

    fn expr(&mut self, expr: &IrExpr) {
        let ty = &expr.ty;
        match &expr.kind {
            IrExprKind::Const(value) => self.line(&format!("CONST {} type:{}", value, ty)),
            IrExprKind::GetValue { value } => {
                self.line(&format!("GET_VAR {} type:{}", self.name(*value), ty))
            }
            IrExprKind::SetValue { value, new_value } => {
                self.line(&format!("SET_VAR {}", self.name(*value)));
                self.nested(|d| d.expr(new_value));
            }
            IrExprKind::GetField { field, receiver } => {
                self.line(&format!("GET_FIELD {} type:{}", self.name(*field), ty));
                if let Some(receiver) = receiver {
                    self.nested(|d| d.expr(receiver));
                }
            }
            IrExprKind::SetField {
                field,
                receiver,
                new_value,
            } => {
                self.line(&format!("SET_FIELD {}", self.name(*field)));
                self.nested(|d| {
                    if let Some(receiver) = receiver {
                        d.expr(receiver);
                    }
                    d.expr(new_value);
                });
            }
            IrExprKind::GetObject { class } => {
                self.line(&format!("GET_OBJECT {}", self.name(*class)))
            }
            IrExprKind::Call {
                function,
                dispatch_receiver,
                arguments,
                ..
            } => {
                self.line(&format!("CALL {} type:{}", self.name(*function), ty));
                self.nested(|d| {
                    if let Some(receiver) = dispatch_receiver {
                        d.line("$this:");
                        d.nested(|d| d.expr(receiver));
                    }
                    arguments.iter().for_each(|a| d.expr(a));
                });
            }
            IrExprKind::ConstructorCall {
                constructor,
                arguments,
                ..
            } => {
                self.line(&format!("CONSTRUCTOR_CALL {} type:{}", self.name(*constructor), ty));
                self.nested(|d| arguments.iter().for_each(|a| d.expr(a)));
            }
            IrExprKind::DelegatingConstructorCall {
                constructor,
                arguments,
            } => {
                self.line(&format!("DELEGATING_CONSTRUCTOR_CALL {}", self.name(*constructor)));
                self.nested(|d| arguments.iter().for_each(|a| d.expr(a)));
            }
            IrExprKind::InstanceInitializerCall { class } => {
                self.line(&format!("INSTANCE_INITIALIZER_CALL {}", self.name(*class)))
            }
            IrExprKind::FunctionReference { function } => {
                self.line(&format!("FUNCTION_REFERENCE {} type:{}", self.name(*function), ty))
            }
            IrExprKind::GetClass { argument } => {
                self.line(&format!("GET_CLASS type:{}", ty));
                self.nested(|d| d.expr(argument));
            }
            IrExprKind::BuiltinCall { builtin, arguments } => {
                self.line(&format!("BUILTIN {:?} type:{}", builtin, ty));
                self.nested(|d| arguments.iter().for_each(|a| d.expr(a)));
            }
            IrExprKind::TypeOperator {
                operator,
                argument,
                type_operand,
            } => {
                self.line(&format!("TYPE_OP {:?} {} type:{}", operator, type_operand, ty));
                self.nested(|d| d.expr(argument));
            }
            IrExprKind::StringConcatenation { arguments } => {
                self.line("STRING_CONCATENATION");
                self.nested(|d| arguments.iter().for_each(|a| d.expr(a)));
            }
            IrExprKind::When { branches } => {
                self.line(&format!("WHEN type:{}", ty));
                self.nested(|d| {
                    for branch in branches {
                        d.line("BRANCH");
                        d.nested(|d| {
                            d.expr(&branch.condition);
                            d.expr(&branch.result);
                        });
                    }
                });
            }
            IrExprKind::While {
                loop_id,
                label,
                condition,
                body,
            } => {
                self.line(&format!("WHILE {}{}", loop_id, label_suffix(label)));
                self.nested(|d| {
                    d.expr(condition);
                    d.expr(body);
                });
            }
            IrExprKind::DoWhile {
                loop_id,
                label,
                body,
                condition,
            } => {
                self.line(&format!("DO_WHILE {}{}", loop_id, label_suffix(label)));
                self.nested(|d| {
                    d.expr(body);
                    d.expr(condition);
                });
            }
            IrExprKind::Break { loop_id, label } => {
                self.line(&format!("BREAK {}{}", loop_id, label_suffix(label)))
            }
            IrExprKind::Continue { loop_id, label } => {
                self.line(&format!("CONTINUE {}{}", loop_id, label_suffix(label)))
            }
            IrExprKind::Return { target, value } => {
                self.line(&format!("RETURN from:{}", self.name(*target)));
                if let Some(value) = value {
                    self.nested(|d| d.expr(value));
                }
            }
            IrExprKind::Throw { value } => {
                self.line("THROW");
                self.nested(|d| d.expr(value));
            }
            IrExprKind::Try {
                try_result,
                catches,
                finally,
            } => {
                self.line(&format!("TRY type:{}", ty));
                self.nested(|d| {
                    d.expr(try_result);
                    for catch in catches {
                        d.line("CATCH");
                        d.nested(|d| {
                            d.declaration(catch.parameter);
                            d.expr(&catch.handler);
                        });
                    }
                    if let Some(finally) = finally {
                        d.line("FINALLY");
                        d.nested(|d| d.expr(finally));
                    }
                });
            }
            IrExprKind::Block { statements } => {
                self.line(&format!("BLOCK type:{}", ty));
                self.nested(|d| d.statements(statements));
            }
            IrExprKind::Group { statements } => {
                self.line(&format!("GROUP type:{}", ty));
                self.nested(|d| d.statements(statements));
            }
            IrExprKind::Error { kind, description } => {
                self.line(&format!("ERROR {:?} {:?}", kind, description))
            }
        }
    }
}

fn label_suffix(label: &Option<String>) -> String {
    label
        .as_ref()
        .map(|label| format!(" label:{}", label))
        .unwrap_or_default()
}
