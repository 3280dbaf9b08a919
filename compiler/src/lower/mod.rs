//! Lowering from the typed tree to the lowered IR
//!
//! A [`LoweringSession`] walks one typed file at a time and builds its
//! declarations in the registry's arena. The walk keeps five context stacks
//! (see [`context`]) and pushes and pops them through scoped helpers, so
//! every push has its pop on both the success and the error path.
//!
//! Two failure channels exist:
//!
//! - unresolved references, loop jumps without an enclosing loop and
//!   writes to properties without a backing field become error nodes plus a
//!   [`LoweringDiagnostic`]; the unit still completes
//! - unsupported constructs and broken internal invariants abort the unit
//!   with a [`LoweringError`]

pub mod context;
pub mod control_flow;
pub mod declarations;
pub mod error;
pub mod expressions;
pub mod fake_overrides;

use crate::config::LoweringConfig;
use crate::ir::dump::dump_file;
use crate::ir::validation::ensure_valid;
use crate::ir::*;
use crate::registry::{DeclarationRegistry, MemberResolver, TypeConverter};
use crate::tast::{SourceLocation, SymbolId, SymbolTable, TypeRef, TypedFile};
use context::{ClassFrame, ContextStacks, FunctionFrame, LoopRegistry};
use log::{debug, info, warn};

pub use error::{LoweringDiagnostic, LoweringError, LoweringResult};

/// A lowered file and the error nodes produced while lowering it
#[derive(Debug, Clone)]
pub struct LoweredUnit {
    pub file: IrDeclId,
    pub diagnostics: Vec<LoweringDiagnostic>,
}

impl LoweredUnit {
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

pub struct LoweringSession<'a> {
    symbols: &'a SymbolTable,
    registry: &'a mut dyn DeclarationRegistry,
    types: &'a dyn TypeConverter,
    members: &'a dyn MemberResolver,
    config: LoweringConfig,
    context: ContextStacks,
    loops: LoopRegistry,
    diagnostics: Vec<LoweringDiagnostic>,
}

impl<'a> LoweringSession<'a> {
    pub fn new(
        symbols: &'a SymbolTable,
        registry: &'a mut dyn DeclarationRegistry,
        types: &'a dyn TypeConverter,
        members: &'a dyn MemberResolver,
        config: LoweringConfig,
    ) -> Self {
        Self {
            symbols,
            registry,
            types,
            members,
            config,
            context: ContextStacks::new(),
            loops: LoopRegistry::default(),
            diagnostics: Vec::new(),
        }
    }

    pub fn arena(&self) -> &IrArena {
        self.registry.arena()
    }

    pub fn config(&self) -> &LoweringConfig {
        &self.config
    }

    /// Lower `file` and every declaration in it
    pub fn lower_file(&mut self, file: &TypedFile) -> LoweringResult<LoweredUnit> {
        info!("lowering file {}", file.name);
        let file_id = self.registry.arena_mut().alloc(
            IrDeclarationOrigin::Defined,
            file.source_location,
            IrDeclarationKind::File(IrFile {
                name: file.name.clone(),
                package: file.package.clone(),
                declarations: Vec::new(),
            }),
        );

        self.with_parent(file_id, |s| {
            for declaration in &file.declarations {
                s.lower_declaration(declaration)?;
            }
            s.annotate(file_id, &file.annotations)
        })?;

        if !self.context.is_empty() || !self.loops.is_empty() {
            return Err(LoweringError::InvalidTree(format!(
                "context stacks not empty after lowering {}",
                file.name
            )));
        }
        if self.config.validate {
            ensure_valid(self.registry.arena(), file_id)?;
        }
        if self.config.dump {
            debug!("lowered {}:\n{}", file.name, dump_file(self.registry.arena(), file_id));
        }

        let diagnostics = std::mem::take(&mut self.diagnostics);
        if !diagnostics.is_empty() {
            info!("{}: {} error node(s)", file.name, diagnostics.len());
        }
        Ok(LoweredUnit {
            file: file_id,
            diagnostics,
        })
    }

    // Scoped context helpers

    fn with_parent<T>(
        &mut self,
        parent: IrDeclId,
        f: impl FnOnce(&mut Self) -> LoweringResult<T>,
    ) -> LoweringResult<T> {
        self.context.push_parent(parent);
        let result = f(self);
        self.context.pop_parent();
        result
    }

    fn with_function<T>(
        &mut self,
        frame: FunctionFrame,
        f: impl FnOnce(&mut Self) -> LoweringResult<T>,
    ) -> LoweringResult<T> {
        self.context.push_function(frame);
        let result = f(self);
        self.context.pop_function();
        result
    }

    fn with_class<T>(
        &mut self,
        frame: ClassFrame,
        f: impl FnOnce(&mut Self) -> LoweringResult<T>,
    ) -> LoweringResult<T> {
        self.context.push_class(frame);
        let result = f(self);
        self.context.pop_class();
        result
    }

    fn with_property<T>(
        &mut self,
        property: IrDeclId,
        f: impl FnOnce(&mut Self) -> LoweringResult<T>,
    ) -> LoweringResult<T> {
        self.context.push_property(property);
        let result = f(self);
        self.context.pop_property();
        result
    }

    fn with_subject<T>(
        &mut self,
        subject: IrDeclId,
        f: impl FnOnce(&mut Self) -> LoweringResult<T>,
    ) -> LoweringResult<T> {
        self.context.push_subject(subject);
        let result = f(self);
        self.context.pop_subject();
        result
    }

    /// Run `f` inside a registry scope owned by `owner`. The scope is left
    /// even when `f` fails; the first error wins.
    fn in_registry_scope<T>(
        &mut self,
        owner: SymbolId,
        f: impl FnOnce(&mut Self) -> LoweringResult<T>,
    ) -> LoweringResult<T> {
        self.registry.enter_scope(owner);
        let result = f(self);
        let left = self.registry.leave_scope(owner);
        let value = result?;
        left?;
        Ok(value)
    }

    // Shared helpers

    fn lower_type(&self, ty: &TypeRef) -> IrType {
        self.types.to_lowered_type(ty)
    }

    /// Build an error node and record it as a diagnostic
    fn error_node(
        &mut self,
        kind: IrErrorKind,
        description: String,
        ty: IrType,
        location: SourceLocation,
    ) -> IrExpr {
        let diagnostic = LoweringDiagnostic::new(kind, description.clone(), location);
        match diagnostic.help() {
            Some(help) => warn!("{} (help: {})", diagnostic, help),
            None => warn!("{}", diagnostic),
        }
        self.diagnostics.push(diagnostic);
        IrExpr::error(kind, description, ty).at(location)
    }

    fn unresolved(&mut self, name: &str, ty: IrType, location: SourceLocation) -> IrExpr {
        self.error_node(
            IrErrorKind::UnresolvedReference,
            format!("unresolved reference `{}`", name),
            ty,
            location,
        )
    }

    fn attach_to_current_parent(&mut self, child: IrDeclId) -> LoweringResult<IrDeclId> {
        let parent = self.context.current_parent()?;
        self.registry.arena_mut().attach(parent, child)?;
        Ok(parent)
    }
}
