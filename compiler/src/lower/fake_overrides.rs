//! Fake-override synthesis
//!
//! A class inherits every function and property of its supertypes that it
//! does not redeclare. For each such member name the nearest supertype's
//! declaration gets a bodiless stub in the class, linked to it through
//! `overridden`.
//!
//! Only the first candidate per name is taken, so overloads inherited under
//! one name collapse into a single stub.

use super::{LoweringResult, LoweringSession};
use crate::ir::IrDeclId;
use crate::registry::{ProcessorAction, UseSiteScope};
use crate::tast::{SymbolId, SymbolTable, TypedClass, TypedDeclaration};
use fxhash::FxHashSet;
use indexmap::IndexSet;
use log::debug;

/// Function and property names declared in the supertypes of `scope`,
/// nearest supertype first
pub fn inherited_member_names(symbols: &SymbolTable, scope: &UseSiteScope) -> IndexSet<String> {
    let mut names = IndexSet::new();
    for supertype in &scope.linearization {
        let Some(info) = symbols.class_info(*supertype) else {
            continue;
        };
        for member in &info.members {
            if let Some(symbol) = symbols.get(*member) {
                if symbol.kind.is_callable_member() {
                    names.insert(symbol.name.clone());
                }
            }
        }
    }
    names
}

impl LoweringSession<'_> {
    /// Declare the fake overrides of `class` and attach them to `class_decl`
    pub(crate) fn add_fake_overrides(
        &mut self,
        class: &TypedClass,
        class_decl: IrDeclId,
    ) -> LoweringResult<Vec<IrDeclId>> {
        let declared: FxHashSet<&str> = class
            .members
            .iter()
            .filter_map(TypedDeclaration::member_name)
            .collect();
        let scope = self.members.build_use_site_scope(class.symbol_id);

        let mut stubs = Vec::new();
        for name in inherited_member_names(self.symbols, &scope) {
            if declared.contains(name.as_str()) {
                continue;
            }
            let mut inherited: Option<SymbolId> = None;
            self.members
                .process_members_by_name(&scope, &name, &mut |member| {
                    inherited = Some(member);
                    ProcessorAction::Stop
                });
            let Some(original) = inherited else {
                continue;
            };
            let stub = self.registry.declare_fake_override(class_decl, original)?;
            debug!("fake override {}.{} of {}", class.name, name, original);
            stubs.push(stub);
        }
        Ok(stubs)
    }
}
