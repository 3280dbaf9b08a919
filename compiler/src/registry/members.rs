//! Member lookup through class hierarchies

use crate::tast::{SymbolId, SymbolKind, SymbolTable};
use fxhash::FxHashSet;
use std::collections::VecDeque;

/// Supertypes of a class as seen from inside it, nearest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseSiteScope {
    pub class: SymbolId,
    pub linearization: Vec<SymbolId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorAction {
    Next,
    Stop,
}

/// Qualified name of a function, property or constructor (`<init>`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallableId {
    pub package: Vec<String>,
    pub class_name: Option<String>,
    pub callable: String,
}

impl CallableId {
    pub const CONSTRUCTOR_NAME: &'static str = "<init>";

    pub fn constructor_of(package: Vec<String>, class_name: impl Into<String>) -> Self {
        Self {
            package,
            class_name: Some(class_name.into()),
            callable: Self::CONSTRUCTOR_NAME.to_string(),
        }
    }
}

pub trait MemberResolver {
    fn build_use_site_scope(&self, class: SymbolId) -> UseSiteScope;

    /// Feed inherited members named `name` to `processor`, nearest
    /// supertype first, until it returns [`ProcessorAction::Stop`]
    fn process_members_by_name(
        &self,
        scope: &UseSiteScope,
        name: &str,
        processor: &mut dyn FnMut(SymbolId) -> ProcessorAction,
    );

    fn resolve_callable_symbols(&self, id: &CallableId) -> Vec<SymbolId>;
}

/// Resolver that walks declared supertypes in breadth-first order
#[derive(Debug, Clone, Copy)]
pub struct SupertypeMemberResolver<'s> {
    symbols: &'s SymbolTable,
}

impl<'s> SupertypeMemberResolver<'s> {
    pub fn new(symbols: &'s SymbolTable) -> Self {
        Self { symbols }
    }
}

impl MemberResolver for SupertypeMemberResolver<'_> {
    fn build_use_site_scope(&self, class: SymbolId) -> UseSiteScope {
        let mut seen = FxHashSet::default();
        seen.insert(class);
        let mut linearization = Vec::new();
        let mut queue: VecDeque<SymbolId> = self.symbols.direct_supertypes(class).into();
        while let Some(supertype) = queue.pop_front() {
            if !seen.insert(supertype) {
                continue;
            }
            linearization.push(supertype);
            queue.extend(self.symbols.direct_supertypes(supertype));
        }
        UseSiteScope {
            class,
            linearization,
        }
    }

    fn process_members_by_name(
        &self,
        scope: &UseSiteScope,
        name: &str,
        processor: &mut dyn FnMut(SymbolId) -> ProcessorAction,
    ) {
        for supertype in &scope.linearization {
            for member in self.symbols.members_named(*supertype, name) {
                if processor(member) == ProcessorAction::Stop {
                    return;
                }
            }
        }
    }

    fn resolve_callable_symbols(&self, id: &CallableId) -> Vec<SymbolId> {
        let wanted_kind = if id.callable == CallableId::CONSTRUCTOR_NAME {
            SymbolKind::Constructor
        } else {
            SymbolKind::Function
        };
        let mut found: Vec<SymbolId> = self
            .symbols
            .symbols()
            .filter(|symbol| symbol.kind == wanted_kind && symbol.package == id.package)
            .filter(|symbol| wanted_kind == SymbolKind::Constructor || symbol.name == id.callable)
            .filter(|symbol| {
                let owner_name = self
                    .symbols
                    .owner_class(symbol.id)
                    .and_then(|owner| self.symbols.name(owner));
                owner_name == id.class_name.as_deref()
            })
            .map(|symbol| symbol.id)
            .collect();
        found.sort();
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tast::builder::TastBuilder;
    use crate::tast::{TypeRef, TypedDeclaration};

    #[test]
    fn nearest_supertype_wins_and_processing_stops() {
        let mut b = TastBuilder::new();
        let mut base = b.class("Base");
        let base_f = b.function("f", TypeRef::unit());
        let base_f_id = base_f.symbol_id;
        base.members.push(TypedDeclaration::Function(base_f));
        let mut middle = b.class("Middle");
        middle.supertypes.push(TypeRef::class(base.symbol_id));
        let middle_f = b.function("f", TypeRef::unit());
        let middle_f_id = middle_f.symbol_id;
        middle.members.push(TypedDeclaration::Function(middle_f));
        let mut leaf = b.class("Leaf");
        leaf.supertypes.push(TypeRef::class(middle.symbol_id));
        let leaf_id = leaf.symbol_id;
        let file = b.file(
            "h.kt",
            vec![
                TypedDeclaration::Class(base),
                TypedDeclaration::Class(middle),
                TypedDeclaration::Class(leaf),
            ],
        );
        let symbols = SymbolTable::from_files(&[file]);
        let resolver = SupertypeMemberResolver::new(&symbols);

        let scope = resolver.build_use_site_scope(leaf_id);
        assert_eq!(scope.linearization.len(), 2);

        let mut seen = Vec::new();
        resolver.process_members_by_name(&scope, "f", &mut |member| {
            seen.push(member);
            ProcessorAction::Stop
        });
        assert_eq!(seen, vec![middle_f_id]);

        let mut all = Vec::new();
        resolver.process_members_by_name(&scope, "f", &mut |member| {
            all.push(member);
            ProcessorAction::Next
        });
        assert_eq!(all, vec![middle_f_id, base_f_id]);
    }

    #[test]
    fn resolves_constructors_by_class_name() {
        let mut b = TastBuilder::new();
        let mut marker = b.class("Marker");
        let ctor = b.primary_constructor(Vec::new());
        let ctor_id = ctor.symbol_id;
        marker.members.push(TypedDeclaration::Constructor(ctor));
        let mut file = b.file("m.kt", vec![TypedDeclaration::Class(marker)]);
        file.package = vec!["app".to_string()];
        let symbols = SymbolTable::from_files(&[file]);
        let resolver = SupertypeMemberResolver::new(&symbols);

        let id = CallableId::constructor_of(vec!["app".to_string()], "Marker");
        assert_eq!(resolver.resolve_callable_symbols(&id), vec![ctor_id]);
        let elsewhere = CallableId::constructor_of(Vec::new(), "Marker");
        assert!(resolver.resolve_callable_symbols(&elsewhere).is_empty());
    }
}
