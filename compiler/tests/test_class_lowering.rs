mod common;

use common::*;
use compiler::ir::*;
use compiler::lower::{LoweringError, LoweringSession};
use compiler::registry::{DeclarationRegistry, DeclarationStorage, SupertypeMemberResolver, TypeTranslator};
use compiler::tast::builder::TastBuilder;
use compiler::tast::*;
use compiler::LoweringConfig;

fn constructor_of(arena: &IrArena, source: SymbolId) -> IrDeclId {
    arena
        .iter()
        .find(|decl| matches!(&decl.kind, IrDeclarationKind::Constructor(ctor) if ctor.source == source))
        .map(|decl| decl.id)
        .unwrap_or_else(|| panic!("no constructor for {}", source))
}

/// `open class Base { open fun f() }` and `class Derived : Base()`
fn base_and_derived(b: &mut TastBuilder) -> (TypedClass, TypedClass) {
    let mut base = b.class("Base");
    base.modality = Modality::Open;
    let mut f = b.function("f", TypeRef::unit());
    f.modality = Modality::Open;
    f.parameters.push(b.parameter("n", TypeRef::int()));
    base.members.push(TypedDeclaration::Function(f));

    let mut derived = b.class("Derived");
    derived.supertypes.push(TypeRef::class(base.symbol_id));
    (base, derived)
}

#[test]
fn test_inherited_function_gets_one_fake_override() {
    let mut b = TastBuilder::new();
    let (base, derived) = base_and_derived(&mut b);
    let file = b.file(
        "inherit.kt",
        vec![TypedDeclaration::Class(base), TypedDeclaration::Class(derived)],
    );

    let lowered = lower(vec![file]);
    let arena = &lowered.arena;
    let base_f = function_named(arena, "f");
    let derived_class = class_named(arena, "Derived");

    let stubs = arena.members_named(derived_class, "f");
    assert_eq!(stubs.len(), 1);
    let stub_decl = arena.get(stubs[0]).unwrap();
    assert_eq!(stub_decl.origin, IrDeclarationOrigin::FakeOverride);
    assert_eq!(stub_decl.parent, Some(derived_class));

    let stub = arena.function(stubs[0]).unwrap();
    assert_eq!(stub.overridden, vec![base_f]);
    assert!(stub.body.is_none());
    assert!(stub.dispatch_receiver.is_some());
    assert_eq!(stub.value_parameters.len(), 1);
    assert_eq!(arena.name_of(stub.value_parameters[0]), Some("n"));

    // the base class inherits nothing
    assert!(arena.members_named(class_named(arena, "Base"), "f") == vec![base_f]);
    assert_eq!(lowered.stats.fake_overrides, 1);
}

#[test]
fn test_redeclared_member_is_not_faked() {
    let mut b = TastBuilder::new();
    let (base, mut derived) = base_and_derived(&mut b);
    let own_f = b.function("f", TypeRef::unit());
    derived.members.push(TypedDeclaration::Function(own_f));
    let file = b.file(
        "redeclare.kt",
        vec![TypedDeclaration::Class(base), TypedDeclaration::Class(derived)],
    );

    let lowered = lower(vec![file]);
    let arena = &lowered.arena;
    let members = arena.members_named(class_named(arena, "Derived"), "f");
    assert_eq!(members.len(), 1);
    assert_eq!(arena.get(members[0]).unwrap().origin, IrDeclarationOrigin::Defined);
    assert_eq!(lowered.stats.fake_overrides, 0);
}

#[test]
fn test_nearest_supertype_wins() {
    let mut b = TastBuilder::new();
    let (base, mut middle) = base_and_derived(&mut b);
    middle.modality = Modality::Open;
    let mut middle_f = b.function("f", TypeRef::unit());
    middle_f.modality = Modality::Open;
    let middle_f_symbol = middle_f.symbol_id;
    middle.members.push(TypedDeclaration::Function(middle_f));
    let mut leaf = b.class("Leaf");
    leaf.supertypes.push(TypeRef::class(middle.symbol_id));
    let file = b.file(
        "chain.kt",
        vec![
            TypedDeclaration::Class(base),
            TypedDeclaration::Class(middle),
            TypedDeclaration::Class(leaf),
        ],
    );

    let lowered = lower(vec![file]);
    let arena = &lowered.arena;
    let middle_f = arena
        .iter()
        .find(|decl| matches!(&decl.kind, IrDeclarationKind::Function(f) if f.source == Some(middle_f_symbol)))
        .map(|decl| decl.id)
        .unwrap();
    let stubs = arena.members_named(class_named(arena, "Leaf"), "f");
    assert_eq!(stubs.len(), 1);
    assert_eq!(arena.function(stubs[0]).unwrap().overridden, vec![middle_f]);
}

#[test]
fn test_inherited_property_fake_override() {
    let mut b = TastBuilder::new();
    let mut base = b.class("Base");
    base.modality = Modality::Open;
    let mut size = b.property("size", TypeRef::int(), false);
    size.initializer = Some(b.int(0));
    base.members.push(TypedDeclaration::Property(size));
    let mut derived = b.class("Derived");
    derived.supertypes.push(TypeRef::class(base.symbol_id));
    let file = b.file(
        "props.kt",
        vec![TypedDeclaration::Class(base), TypedDeclaration::Class(derived)],
    );

    let lowered = lower(vec![file]);
    let arena = &lowered.arena;
    let base_size = property_named(arena, "size");
    let stubs = arena.members_named(class_named(arena, "Derived"), "size");
    assert_eq!(stubs.len(), 1);
    assert_ne!(stubs[0], base_size);

    let stub = arena.property(stubs[0]).unwrap();
    assert_eq!(stub.overridden, vec![base_size]);
    assert!(stub.backing_field.is_none());
    assert!(stub.setter.is_none());
    let getter = arena.function(stub.getter.unwrap()).unwrap();
    assert!(getter.body.is_none());
    assert_eq!(
        getter.overridden,
        vec![arena.property(base_size).unwrap().getter.unwrap()]
    );
}

#[test]
fn test_fake_overrides_can_be_disabled() {
    let mut b = TastBuilder::new();
    let (base, derived) = base_and_derived(&mut b);
    let file = b.file(
        "off.kt",
        vec![TypedDeclaration::Class(base), TypedDeclaration::Class(derived)],
    );
    let config = LoweringConfig {
        fake_overrides: false,
        ..LoweringConfig::default()
    };

    let lowered = lower_with(vec![file], &config);
    let arena = &lowered.arena;
    assert!(arena.members_named(class_named(arena, "Derived"), "f").is_empty());
    assert_eq!(lowered.stats.fake_overrides, 0);
}

#[test]
fn test_primary_constructor_prologue() {
    let mut b = TastBuilder::new();
    let mut base = b.class("Base");
    base.modality = Modality::Open;
    let base_ctor = b.primary_constructor(Vec::new());
    let base_ctor_symbol = base_ctor.symbol_id;
    base.members.push(TypedDeclaration::Constructor(base_ctor));

    let mut derived = b.class("Derived");
    derived.supertypes.push(TypeRef::class(base.symbol_id));
    let mut derived_ctor = b.primary_constructor(Vec::new());
    derived_ctor.delegated_call = Some(b.super_call(base_ctor_symbol, Vec::new()));
    let derived_ctor_symbol = derived_ctor.symbol_id;
    derived.members.push(TypedDeclaration::Constructor(derived_ctor));
    let file = b.file(
        "ctor.kt",
        vec![TypedDeclaration::Class(base), TypedDeclaration::Class(derived)],
    );

    let lowered = lower(vec![file]);
    let arena = &lowered.arena;
    let base_ctor = constructor_of(arena, base_ctor_symbol);
    let derived_ctor = constructor_of(arena, derived_ctor_symbol);
    assert!(arena.constructor(derived_ctor).unwrap().is_primary);
    assert_eq!(arena.get(derived_ctor).unwrap().parent, Some(class_named(arena, "Derived")));

    let statements = body(arena, derived_ctor);
    assert_eq!(statements.len(), 2);
    match &expression(&statements[0]).kind {
        IrExprKind::DelegatingConstructorCall { constructor, .. } => {
            assert_eq!(*constructor, base_ctor)
        }
        other => panic!("expected delegating call, got {:?}", other),
    }
    match &expression(&statements[1]).kind {
        IrExprKind::InstanceInitializerCall { class } => {
            assert_eq!(*class, class_named(arena, "Derived"))
        }
        other => panic!("expected instance initializer call, got {:?}", other),
    }

    // no delegation: only the initializer call
    let base_statements = body(arena, base_ctor);
    assert_eq!(base_statements.len(), 1);
    assert!(matches!(
        expression(&base_statements[0]).kind,
        IrExprKind::InstanceInitializerCall { .. }
    ));
}

#[test]
fn test_secondary_constructor_delegating_to_this_skips_initializer() {
    let mut b = TastBuilder::new();
    let mut point = b.class("Point");
    let x = b.parameter("x", TypeRef::int());
    let primary = b.primary_constructor(vec![x]);
    let primary_symbol = primary.symbol_id;
    let mut secondary = b.constructor(false, Vec::new());
    secondary.delegated_call = Some(b.this_call(primary_symbol, vec![b.int(0)]));
    let secondary_symbol = secondary.symbol_id;
    point.members.push(TypedDeclaration::Constructor(primary));
    point.members.push(TypedDeclaration::Constructor(secondary));
    let file = b.file("point.kt", vec![TypedDeclaration::Class(point)]);

    let lowered = lower(vec![file]);
    let arena = &lowered.arena;
    let secondary = constructor_of(arena, secondary_symbol);
    assert!(!arena.constructor(secondary).unwrap().is_primary);

    let statements = body(arena, secondary);
    assert_eq!(statements.len(), 1);
    match &expression(&statements[0]).kind {
        IrExprKind::DelegatingConstructorCall {
            constructor,
            arguments,
        } => {
            assert_eq!(*constructor, constructor_of(arena, primary_symbol));
            assert_eq!(arguments.len(), 1);
        }
        other => panic!("expected delegating call, got {:?}", other),
    }
}

#[test]
fn test_primary_constructor_parameters_visible_in_initializers() {
    let mut b = TastBuilder::new();
    let mut holder = b.class("Holder");
    let x = b.parameter("x", TypeRef::int());
    let mut y = b.property("y", TypeRef::int(), false);
    y.initializer = Some(b.read_parameter(&x));
    let ctor = b.primary_constructor(vec![x]);
    let ctor_symbol = ctor.symbol_id;
    holder.members.push(TypedDeclaration::Constructor(ctor));
    holder.members.push(TypedDeclaration::Property(y));
    let file = b.file("holder.kt", vec![TypedDeclaration::Class(holder)]);

    let lowered = lower(vec![file]);
    assert!(!lowered.has_errors(), "{:?}", lowered.diagnostics);
    let arena = &lowered.arena;
    let parameter = arena
        .constructor(constructor_of(arena, ctor_symbol))
        .unwrap()
        .value_parameters[0];
    let field = arena
        .property(property_named(arena, "y"))
        .unwrap()
        .backing_field
        .unwrap();
    match &arena.get(field).unwrap().kind {
        IrDeclarationKind::Field(field) => match &field.initializer.as_ref().unwrap().kind {
            IrExprKind::GetValue { value } => assert_eq!(*value, parameter),
            other => panic!("expected a parameter read, got {:?}", other),
        },
        other => panic!("expected a field, got {:?}", other),
    }
}

#[test]
fn test_class_annotation_becomes_constructor_call() {
    let mut b = TastBuilder::new();
    let mut marker = b.class_of_kind("Marker", ClassKind::AnnotationClass);
    let marker_ctor = b.primary_constructor(Vec::new());
    let marker_ctor_symbol = marker_ctor.symbol_id;
    marker.members.push(TypedDeclaration::Constructor(marker_ctor));
    let mut tagged = b.class("Tagged");
    tagged.annotations.push(b.annotation(marker.symbol_id));
    let file = b.file(
        "annotated.kt",
        vec![TypedDeclaration::Class(marker), TypedDeclaration::Class(tagged)],
    );

    let lowered = lower(vec![file]);
    let arena = &lowered.arena;
    let marker_ctor = constructor_of(arena, marker_ctor_symbol);
    // annotation classes get no synthesized body
    assert!(arena.constructor(marker_ctor).unwrap().body.is_none());

    let annotations = &arena.get(class_named(arena, "Tagged")).unwrap().annotations;
    assert_eq!(annotations.len(), 1);
    match &annotations[0].kind {
        IrExprKind::ConstructorCall { constructor, .. } => assert_eq!(*constructor, marker_ctor),
        other => panic!("expected constructor call, got {:?}", other),
    }
}

#[test]
fn test_annotation_without_constructor_is_an_error_node() {
    let mut b = TastBuilder::new();
    let marker = b.class_of_kind("Marker", ClassKind::AnnotationClass);
    let mut tagged = b.class("Tagged");
    tagged.annotations.push(b.annotation(marker.symbol_id));
    let file = b.file(
        "broken.kt",
        vec![TypedDeclaration::Class(marker), TypedDeclaration::Class(tagged)],
    );

    let lowered = lower(vec![file]);
    assert_eq!(lowered.diagnostics.len(), 1);
    assert!(lowered.diagnostics[0].message.contains("Marker"));
    let annotations = &lowered.arena.get(class_named(&lowered.arena, "Tagged")).unwrap().annotations;
    assert!(annotations[0].is_error());
}

#[test]
fn test_member_functions_get_dispatch_receivers() {
    let mut b = TastBuilder::new();
    let mut class = b.class("Counter");
    class.members.push(TypedDeclaration::Function(b.function("tick", TypeRef::unit())));
    let top_level = b.function("main", TypeRef::unit());
    let file = b.file(
        "receivers.kt",
        vec![TypedDeclaration::Class(class), TypedDeclaration::Function(top_level)],
    );

    let lowered = lower(vec![file]);
    let arena = &lowered.arena;
    let tick = function_named(arena, "tick");
    let receiver = arena.function(tick).unwrap().dispatch_receiver.unwrap();
    assert_eq!(arena.get(receiver).unwrap().parent, Some(tick));
    assert_eq!(
        arena.get(receiver).unwrap().origin,
        IrDeclarationOrigin::DispatchReceiver
    );
    assert!(arena.function(function_named(arena, "main")).unwrap().dispatch_receiver.is_none());
    assert!(arena.class(class_named(arena, "Counter")).unwrap().this_receiver.is_some());
}

#[test]
fn test_registry_scopes_balance_even_when_lowering_fails() {
    let mut b = TastBuilder::new();
    let mut class = b.class("C");
    let mut broken = b.function("broken", TypeRef::unit());
    let less = b.operator(OperatorKind::Less, vec![b.int(1), b.int(2)]);
    broken.body = Some(TypedBlock::new(vec![b.expr(less)]));
    class.members.push(TypedDeclaration::Function(broken));
    let file = b.file("broken.kt", vec![TypedDeclaration::Class(class)]);

    let symbols = SymbolTable::from_files(std::slice::from_ref(&file));
    let types = TypeTranslator::new(&symbols);
    let members = SupertypeMemberResolver::new(&symbols);
    let mut registry = DeclarationStorage::new(&symbols);
    let result = {
        let mut session = LoweringSession::new(
            &symbols,
            &mut registry,
            &types,
            &members,
            LoweringConfig::default(),
        );
        session.lower_file(&file)
    };

    assert!(matches!(result, Err(LoweringError::Unsupported { .. })));
    let balance = registry.scope_balance();
    assert!(balance.entered > 0);
    assert!(balance.is_balanced());
}

#[test]
fn test_type_parameters_belong_to_their_class() {
    let mut b = TastBuilder::new();
    let mut boxed = b.class("Box");
    boxed.type_parameters.push(b.type_parameter("T"));
    let file = b.file("generic.kt", vec![TypedDeclaration::Class(boxed)]);

    let lowered = lower(vec![file]);
    let arena = &lowered.arena;
    let class = class_named(arena, "Box");
    let parameters = &arena.class(class).unwrap().type_parameters;
    assert_eq!(parameters.len(), 1);
    assert_eq!(arena.name_of(parameters[0]), Some("T"));
    assert_eq!(arena.get(parameters[0]).unwrap().parent, Some(class));
}

#[test]
fn test_generic_class_with_members_validates() {
    let mut b = TastBuilder::new();
    let mut boxed = b.class("Box");
    boxed.type_parameters.push(b.type_parameter("T"));
    let mut item = b.property("item", TypeRef::int(), false);
    item.initializer = Some(b.int(0));
    boxed.members.push(TypedDeclaration::Property(item));
    boxed
        .members
        .push(TypedDeclaration::Function(b.function("f", TypeRef::unit())));
    let file = b.file("box.kt", vec![TypedDeclaration::Class(boxed)]);

    let config = LoweringConfig::default();
    assert!(config.validate);
    let lowered = lower_with(vec![file], &config);
    let arena = &lowered.arena;
    assert!(validation::validate_file(arena, lowered.files[0]).is_ok());

    let class_id = class_named(arena, "Box");
    let class = arena.class(class_id).unwrap();
    let receiver = class.this_receiver.unwrap();
    let parameter = class.type_parameters[0];
    // receiver and type parameters have their own slots
    assert!(!class.declarations.contains(&receiver));
    assert!(!class.declarations.contains(&parameter));
    assert_eq!(arena.get(receiver).unwrap().parent, Some(class_id));
    assert_eq!(arena.get(parameter).unwrap().parent, Some(class_id));
    assert_eq!(class.declarations.len(), 2);
}

/// `typealias B = Base` with `class Derived : B`, in the given declaration order
fn lower_through_alias(derived_first: bool) -> compiler::LoweredModule {
    let mut b = TastBuilder::new();
    let (base, mut derived) = base_and_derived(&mut b);
    let alias = b.type_alias("B", TypeRef::class(base.symbol_id));
    derived.supertypes = vec![TypeRef::alias(alias.symbol_id)];
    let declarations = if derived_first {
        vec![
            TypedDeclaration::Class(derived),
            TypedDeclaration::TypeAlias(alias),
            TypedDeclaration::Class(base),
        ]
    } else {
        vec![
            TypedDeclaration::Class(base),
            TypedDeclaration::TypeAlias(alias),
            TypedDeclaration::Class(derived),
        ]
    };
    let file = b.file("alias.kt", declarations);
    lower(vec![file])
}

#[test]
fn test_fake_override_through_type_alias() {
    for derived_first in [false, true] {
        let lowered = lower_through_alias(derived_first);
        let arena = &lowered.arena;
        let base_f = function_named(arena, "f");
        let derived_class = class_named(arena, "Derived");

        let stubs = arena.members_named(derived_class, "f");
        assert_eq!(stubs.len(), 1, "derived first: {}", derived_first);
        assert_eq!(arena.get(stubs[0]).unwrap().origin, IrDeclarationOrigin::FakeOverride);
        assert_eq!(arena.function(stubs[0]).unwrap().overridden, vec![base_f]);
        assert_eq!(lowered.stats.fake_overrides, 1);
    }
}
