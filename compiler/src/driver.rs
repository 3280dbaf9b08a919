//! Module-level lowering driver
//!
//! Builds the symbol table, registry and resolvers for a module, lowers its
//! files in order with one [`LoweringSession`], and checks afterwards that
//! every registry scope that was entered has been left. Independent modules
//! can be lowered in parallel.

use crate::config::LoweringConfig;
use crate::ir::dump::dump_file;
use crate::ir::{IrArena, IrDeclId, IrDeclarationKind, IrDeclarationOrigin};
use crate::lower::{LoweringDiagnostic, LoweringError, LoweringResult, LoweringSession};
use crate::registry::{DeclarationRegistry, DeclarationStorage, SupertypeMemberResolver, TypeTranslator};
use crate::tast::{SymbolTable, TypedFile};
use log::info;
use rayon::prelude::*;
use std::time::Instant;

/// Typed files that are lowered together and may refer to each other
#[derive(Debug, Clone)]
pub struct TypedModule {
    pub name: String,
    pub files: Vec<TypedFile>,
}

impl TypedModule {
    pub fn new(name: impl Into<String>, files: Vec<TypedFile>) -> Self {
        Self {
            name: name.into(),
            files,
        }
    }
}

/// Statistics collected while lowering a module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoweringStats {
    /// Number of files lowered
    pub files_lowered: usize,

    /// Declarations in the arena, including synthesized ones
    pub declarations: usize,

    /// Fake overrides synthesized
    pub fake_overrides: usize,

    /// Error nodes produced
    pub error_nodes: usize,

    /// Total lowering time in microseconds
    pub lowering_time_us: u64,
}

#[derive(Debug)]
pub struct LoweredModule {
    pub name: String,
    pub arena: IrArena,
    /// Lowered files, in input order
    pub files: Vec<IrDeclId>,
    pub diagnostics: Vec<LoweringDiagnostic>,
    pub stats: LoweringStats,
}

impl LoweredModule {
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// Dumps of every lowered file, in input order
    pub fn dump(&self) -> String {
        self.files
            .iter()
            .map(|file| dump_file(&self.arena, *file))
            .collect()
    }
}

/// Lower every file of `module`.
///
/// Error nodes do not fail the module; they are returned as diagnostics.
pub fn lower_module(module: &TypedModule, config: &LoweringConfig) -> LoweringResult<LoweredModule> {
    let start = Instant::now();
    info!("lowering module {} ({} files)", module.name, module.files.len());

    let symbols = SymbolTable::from_files(&module.files);
    let types = TypeTranslator::new(&symbols);
    let members = SupertypeMemberResolver::new(&symbols);
    let mut registry = DeclarationStorage::new(&symbols);

    let mut files = Vec::with_capacity(module.files.len());
    let mut diagnostics = Vec::new();
    {
        let mut session =
            LoweringSession::new(&symbols, &mut registry, &types, &members, config.clone());
        for file in &module.files {
            let unit = session.lower_file(file)?;
            files.push(unit.file);
            diagnostics.extend(unit.diagnostics);
        }
    }

    let balance = registry.scope_balance();
    if !balance.is_balanced() {
        return Err(LoweringError::UnbalancedScope {
            detail: format!(
                "{} scopes entered, {} left in module {}",
                balance.entered, balance.left, module.name
            ),
        });
    }

    let arena = registry.into_arena();
    let stats = LoweringStats {
        files_lowered: files.len(),
        declarations: arena.len(),
        fake_overrides: arena
            .iter()
            .filter(|decl| {
                decl.origin == IrDeclarationOrigin::FakeOverride
                    && decl
                        .parent
                        .and_then(|parent| arena.get(parent))
                        .is_some_and(|parent| matches!(parent.kind, IrDeclarationKind::Class(_)))
            })
            .count(),
        error_nodes: diagnostics.len(),
        lowering_time_us: start.elapsed().as_micros() as u64,
    };
    info!(
        "lowered module {}: {} declarations, {} error node(s) in {}us",
        module.name, stats.declarations, stats.error_nodes, stats.lowering_time_us
    );

    Ok(LoweredModule {
        name: module.name.clone(),
        arena,
        files,
        diagnostics,
        stats,
    })
}

/// Lower independent modules on the rayon pool; results keep input order
pub fn lower_modules_parallel(
    modules: &[TypedModule],
    config: &LoweringConfig,
) -> Vec<LoweringResult<LoweredModule>> {
    modules
        .par_iter()
        .map(|module| lower_module(module, config))
        .collect()
}
