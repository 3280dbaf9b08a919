//! Declaration lowering
//!
//! Files, classes, constructors, functions, properties with their
//! accessors and backing fields, local variables and `init` blocks. Every
//! lowered declaration is attached to the declaration on top of the parent
//! stack, and its own children are lowered with it pushed.

use super::context::{ClassFrame, FunctionFrame};
use super::{LoweringError, LoweringResult, LoweringSession};
use crate::ir::*;
use crate::registry::CallableId;
use crate::tast::{
    ClassKind, Modality, PropertyInfo, SymbolId, SymbolKind, TypeRef, TypedAccessor,
    TypedAnnotation, TypedAnonymousInitializer, TypedClass, TypedConstructor, TypedDeclaration,
    TypedDelegatedConstructorCall, TypedFunction, TypedParameter, TypedProperty,
    TypedTypeParameter, TypedVariable,
};
use log::debug;

/// Whether a property stores its value in a backing field.
///
/// Abstract properties and interface properties never do; otherwise an
/// initializer, a default getter or a default setter of a mutable property
/// needs one.
pub fn requires_backing_field(info: &PropertyInfo, owner_kind: Option<ClassKind>) -> bool {
    if info.modality == Modality::Abstract || owner_kind == Some(ClassKind::Interface) {
        return false;
    }
    info.has_initializer || info.has_default_getter || info.has_default_setter
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccessorKind {
    Getter,
    Setter,
}

impl LoweringSession<'_> {
    /// Lower a file-level or member declaration. Type aliases have no
    /// lowered counterpart.
    pub(crate) fn lower_declaration(
        &mut self,
        declaration: &TypedDeclaration,
    ) -> LoweringResult<Option<IrDeclId>> {
        let lowered = match declaration {
            TypedDeclaration::Class(class) => self.lower_class(class)?,
            TypedDeclaration::Function(function) => self.lower_function(function)?,
            TypedDeclaration::Property(property) => self.lower_property(property)?,
            TypedDeclaration::Constructor(ctor) => self.lower_constructor(ctor)?,
            TypedDeclaration::AnonymousInitializer(init) => {
                self.lower_anonymous_initializer(init)?
            }
            TypedDeclaration::TypeAlias(alias) => {
                debug!("skipping type alias {}", alias.name);
                return Ok(None);
            }
        };
        Ok(Some(lowered))
    }

    pub(crate) fn lower_class(&mut self, class: &TypedClass) -> LoweringResult<IrDeclId> {
        self.lower_class_as(class, false)
    }

    pub(crate) fn lower_class_as(
        &mut self,
        class: &TypedClass,
        anonymous: bool,
    ) -> LoweringResult<IrDeclId> {
        debug!("lowering {} {}", class.kind, class.name);
        let id = if anonymous {
            self.registry.get_lowered_anonymous_class(class.symbol_id)?
        } else {
            self.registry.get_lowered_class(class.symbol_id)?
        };
        self.attach_to_current_parent(id)?;

        let supertypes: Vec<IrType> = class
            .supertypes
            .iter()
            .map(|ty| self.lower_type(ty))
            .collect();
        let type_parameters =
            self.lower_type_parameters(class.symbol_id, id, &class.type_parameters)?;
        let this_receiver = {
            let lowered = self.registry.arena_mut().class_mut(id)?;
            lowered.supertypes = supertypes;
            lowered.type_parameters = type_parameters;
            lowered.this_receiver
        };

        let frame = ClassFrame {
            decl: id,
            source: class.symbol_id,
            kind: class.kind,
            this_receiver,
        };
        self.with_class(frame, |s| {
            s.with_parent(id, |s| {
                s.in_registry_scope(class.symbol_id, |s| s.lower_class_body(class, id))
            })
        })?;
        Ok(id)
    }

    fn lower_class_body(&mut self, class: &TypedClass, id: IrDeclId) -> LoweringResult<()> {
        match class.primary_constructor() {
            // primary constructor parameters stay visible to member initializers
            Some(primary) => self.in_registry_scope(primary.symbol_id, |s| {
                s.lower_constructor_in_open_scope(primary)?;
                s.lower_class_members(class, id, Some(primary.symbol_id))
            }),
            None => self.lower_class_members(class, id, None),
        }
    }

    fn lower_class_members(
        &mut self,
        class: &TypedClass,
        id: IrDeclId,
        primary: Option<SymbolId>,
    ) -> LoweringResult<()> {
        for member in &class.members {
            if Some(member.symbol_id()) == primary {
                continue;
            }
            self.lower_declaration(member)?;
        }
        if self.config.fake_overrides {
            self.add_fake_overrides(class, id)?;
        }
        self.annotate(id, &class.annotations)
    }

    fn lower_type_parameters(
        &mut self,
        owner: SymbolId,
        owner_decl: IrDeclId,
        parameters: &[TypedTypeParameter],
    ) -> LoweringResult<Vec<IrDeclId>> {
        let mut lowered = Vec::with_capacity(parameters.len());
        for (index, parameter) in parameters.iter().enumerate() {
            let id = self
                .registry
                .get_lowered_type_parameter(owner, index as u32)?;
            let bounds: Vec<IrType> = parameter
                .bounds
                .iter()
                .map(|bound| self.lower_type(bound))
                .collect();
            let arena = self.registry.arena_mut();
            arena.attach_owned(owner_decl, id)?;
            if let IrDeclarationKind::TypeParameter(lowered_parameter) =
                &mut arena.declaration_mut(id)?.kind
            {
                lowered_parameter.upper_bounds = bounds;
            }
            lowered.push(id);
        }
        Ok(lowered)
    }

    // Constructors

    pub(crate) fn lower_constructor(&mut self, ctor: &TypedConstructor) -> LoweringResult<IrDeclId> {
        self.in_registry_scope(ctor.symbol_id, |s| s.lower_constructor_in_open_scope(ctor))
    }

    /// Lower a constructor whose registry scope the caller has opened.
    ///
    /// The body starts with the delegating constructor call and, unless the
    /// constructor delegates to another constructor of its own class, the
    /// instance initializer call. Annotation classes get neither.
    fn lower_constructor_in_open_scope(
        &mut self,
        ctor: &TypedConstructor,
    ) -> LoweringResult<IrDeclId> {
        let class = self.context.current_class()?;
        let id = self.registry.get_lowered_constructor(ctor.symbol_id)?;
        debug!(
            "lowering {} constructor of {}",
            if ctor.is_primary { "primary" } else { "secondary" },
            class.source
        );
        self.attach_to_current_parent(id)?;
        let type_parameters =
            self.lower_type_parameters(ctor.symbol_id, id, &ctor.type_parameters)?;
        self.registry.arena_mut().constructor_mut(id)?.type_parameters = type_parameters;

        let frame = FunctionFrame {
            decl: id,
            source: Some(ctor.symbol_id),
            label: None,
            receiver: class.this_receiver,
            receiver_class: Some(class.source),
        };
        self.with_parent(id, |s| {
            s.with_function(frame, |s| {
                let parameters = s.registry.declare_parameters(id, ctor.symbol_id)?;
                s.lower_default_values(&ctor.parameters, &parameters)?;

                let mut statements = Vec::new();
                if class.kind != ClassKind::AnnotationClass {
                    let mut delegates_to_own_class = false;
                    if let Some(call) = &ctor.delegated_call {
                        delegates_to_own_class = call.is_this
                            || call
                                .callee
                                .resolved
                                .and_then(|callee| s.symbols.owner_class(callee))
                                == Some(class.source);
                        statements.push(IrStatement::Expression(s.lower_delegated_call(call)?));
                    }
                    if !delegates_to_own_class {
                        let initializer = IrExpr::new(
                            IrExprKind::InstanceInitializerCall { class: class.decl },
                            IrType::unit(),
                        )
                        .at(ctor.source_location);
                        statements.push(IrStatement::Expression(initializer));
                    }
                }
                if let Some(body) = &ctor.body {
                    statements.extend(s.lower_statements(&body.statements)?);
                }
                if class.kind != ClassKind::AnnotationClass || ctor.body.is_some() {
                    s.registry.arena_mut().set_body(id, IrBlock::new(statements))?;
                }
                s.annotate(id, &ctor.annotations)
            })
        })?;
        Ok(id)
    }

    fn lower_delegated_call(
        &mut self,
        call: &TypedDelegatedConstructorCall,
    ) -> LoweringResult<IrExpr> {
        let callee = call
            .callee
            .resolved
            .filter(|callee| self.symbols.kind(*callee) == Some(SymbolKind::Constructor));
        let Some(callee) = callee else {
            return Ok(self.unresolved(&call.callee.name, IrType::unit(), call.source_location));
        };
        let constructor = self.registry.get_lowered_constructor(callee)?;
        let arguments = self.lower_arguments(&call.arguments)?;
        Ok(IrExpr::new(
            IrExprKind::DelegatingConstructorCall {
                constructor,
                arguments,
            },
            IrType::unit(),
        )
        .at(call.source_location))
    }

    // Functions

    pub(crate) fn lower_function(&mut self, function: &TypedFunction) -> LoweringResult<IrDeclId> {
        let id = self.registry.get_lowered_function(function.symbol_id)?;
        self.lower_function_into(function, id)
    }

    pub(crate) fn lower_local_function(
        &mut self,
        function: &TypedFunction,
    ) -> LoweringResult<IrDeclId> {
        let id = self.registry.get_lowered_local_function(function.symbol_id)?;
        self.lower_function_into(function, id)
    }

    fn lower_function_into(
        &mut self,
        function: &TypedFunction,
        id: IrDeclId,
    ) -> LoweringResult<IrDeclId> {
        if function.name.is_empty() {
            debug!("lowering anonymous function {}", function.symbol_id);
        } else {
            debug!("lowering function {}", function.name);
        }
        self.attach_to_current_parent(id)?;
        let type_parameters =
            self.lower_type_parameters(function.symbol_id, id, &function.type_parameters)?;
        self.registry.arena_mut().function_mut(id)?.type_parameters = type_parameters;

        // only direct class members get a dispatch receiver
        let owner_class = self.symbols.owner_class(function.symbol_id);
        let label = function
            .label
            .clone()
            .or_else(|| (!function.name.is_empty()).then(|| function.name.clone()));

        self.with_parent(id, |s| {
            s.in_registry_scope(function.symbol_id, |s| {
                let receiver = match owner_class {
                    Some(class) => Some(s.registry.declare_dispatch_receiver(id, class)?),
                    None => None,
                };
                let frame = FunctionFrame {
                    decl: id,
                    source: Some(function.symbol_id),
                    label,
                    receiver,
                    receiver_class: owner_class,
                };
                s.with_function(frame, |s| {
                    let parameters = s.registry.declare_parameters(id, function.symbol_id)?;
                    s.lower_default_values(&function.parameters, &parameters)?;
                    if let Some(body) = &function.body {
                        let statements = s.lower_statements(&body.statements)?;
                        s.registry.arena_mut().set_body(id, IrBlock::new(statements))?;
                    }
                    s.annotate(id, &function.annotations)
                })
            })
        })?;
        Ok(id)
    }

    fn lower_default_values(
        &mut self,
        parameters: &[TypedParameter],
        lowered: &[IrDeclId],
    ) -> LoweringResult<()> {
        for (parameter, decl) in parameters.iter().zip(lowered) {
            if let Some(default) = &parameter.default_value {
                let value = self.lower_expression(default)?;
                self.registry
                    .arena_mut()
                    .value_parameter_mut(*decl)?
                    .default_value = Some(value);
            }
        }
        Ok(())
    }

    // Properties

    pub(crate) fn lower_property(&mut self, property: &TypedProperty) -> LoweringResult<IrDeclId> {
        debug!("lowering property {}", property.name);
        let id = self.registry.get_lowered_property(property.symbol_id)?;
        self.attach_to_current_parent(id)?;
        let owner_class = self.symbols.owner_class(property.symbol_id);

        self.with_parent(id, |s| {
            s.with_property(id, |s| {
                let field = s.backing_field_of(property.symbol_id)?;
                if let (Some(field), Some(initializer)) = (field, &property.initializer) {
                    let value = s.with_parent(field, |s| s.lower_expression(initializer))?;
                    s.registry.arena_mut().field_mut(field)?.initializer = Some(value);
                }

                let (getter, setter) = {
                    let lowered = s.registry.arena().property(id)?;
                    (lowered.getter, lowered.setter)
                };
                if let Some(getter) = getter {
                    s.lower_accessor(
                        property,
                        getter,
                        property.getter.as_ref(),
                        AccessorKind::Getter,
                        owner_class,
                        field,
                    )?;
                }
                if let Some(setter) = setter {
                    s.lower_accessor(
                        property,
                        setter,
                        property.setter.as_ref(),
                        AccessorKind::Setter,
                        owner_class,
                        field,
                    )?;
                }
                s.annotate(id, &property.annotations)
            })
        })?;
        Ok(id)
    }

    /// Backing field of `property`, declared on first request; `None` when
    /// the property stores nothing
    pub(crate) fn backing_field_of(&mut self, property: SymbolId) -> LoweringResult<Option<IrDeclId>> {
        let symbols = self.symbols;
        let info = symbols
            .property_info(property)
            .ok_or(LoweringError::UnknownSymbol(property))?;
        let owner_kind = symbols
            .owner_class(property)
            .and_then(|class| symbols.class_info(class))
            .map(|class| class.kind);
        if !requires_backing_field(info, owner_kind) {
            return Ok(None);
        }
        let lowered = self.registry.get_lowered_property(property)?;
        self.registry.declare_backing_field(lowered).map(Some)
    }

    fn lower_accessor(
        &mut self,
        property: &TypedProperty,
        id: IrDeclId,
        accessor: Option<&TypedAccessor>,
        kind: AccessorKind,
        owner_class: Option<SymbolId>,
        field: Option<IrDeclId>,
    ) -> LoweringResult<()> {
        let scope_owner = accessor.map_or(property.symbol_id, |accessor| accessor.symbol_id);
        self.with_parent(id, |s| {
            s.in_registry_scope(scope_owner, |s| {
                let receiver = match owner_class {
                    Some(class) => Some(s.registry.declare_dispatch_receiver(id, class)?),
                    None => None,
                };
                let frame = FunctionFrame {
                    decl: id,
                    source: accessor.map(|accessor| accessor.symbol_id),
                    label: None,
                    receiver,
                    receiver_class: owner_class,
                };
                s.with_function(frame, |s| {
                    let body = match accessor.and_then(|accessor| accessor.body.as_ref()) {
                        Some(body) => Some(s.lower_statements(&body.statements)?),
                        None => s.default_accessor_body(id, kind, receiver, field)?,
                    };
                    if let Some(statements) = body {
                        s.registry.arena_mut().set_body(id, IrBlock::new(statements))?;
                    }
                    match accessor {
                        Some(accessor) => s.annotate(id, &accessor.annotations),
                        None => Ok(()),
                    }
                })
            })
        })
    }

    /// `return this.field` or `this.field = value`; nothing without a field
    fn default_accessor_body(
        &mut self,
        accessor: IrDeclId,
        kind: AccessorKind,
        receiver: Option<IrDeclId>,
        field: Option<IrDeclId>,
    ) -> LoweringResult<Option<Vec<IrStatement>>> {
        let Some(field) = field else {
            return Ok(None);
        };
        let arena = self.registry.arena();
        let receiver = receiver
            .map(|receiver| {
                arena.value_type(receiver).map(|ty| {
                    Box::new(IrExpr::new(IrExprKind::GetValue { value: receiver }, ty))
                })
            })
            .transpose()?;
        let statement = match kind {
            AccessorKind::Getter => {
                let read = IrExpr::new(
                    IrExprKind::GetField { field, receiver },
                    arena.value_type(field)?,
                );
                IrExpr::new(
                    IrExprKind::Return {
                        target: accessor,
                        value: Some(Box::new(read)),
                    },
                    IrType::nothing(),
                )
            }
            AccessorKind::Setter => {
                let value = arena
                    .function(accessor)?
                    .value_parameters
                    .first()
                    .copied()
                    .ok_or_else(|| {
                        LoweringError::InvalidTree(format!("setter {} has no value parameter", accessor))
                    })?;
                let new_value = IrExpr::new(IrExprKind::GetValue { value }, arena.value_type(value)?);
                IrExpr::new(
                    IrExprKind::SetField {
                        field,
                        receiver,
                        new_value: Box::new(new_value),
                    },
                    IrType::unit(),
                )
            }
        };
        Ok(Some(vec![IrStatement::Expression(statement)]))
    }

    // Locals and initializers

    pub(crate) fn lower_local_variable(&mut self, variable: &TypedVariable) -> LoweringResult<IrDeclId> {
        self.lower_variable_with_origin(variable, IrDeclarationOrigin::Defined)
    }

    /// Register `variable` under the current parent, then lower its
    /// initializer; the initializer already sees the variable
    pub(crate) fn lower_variable_with_origin(
        &mut self,
        variable: &TypedVariable,
        origin: IrDeclarationOrigin,
    ) -> LoweringResult<IrDeclId> {
        let parent = self.context.current_parent()?;
        let id = self
            .registry
            .create_and_register_local_variable(parent, variable, origin)?;
        if let Some(initializer) = &variable.initializer {
            let value = self.lower_expression(initializer)?;
            self.registry.arena_mut().variable_mut(id)?.initializer = Some(value);
        }
        Ok(id)
    }

    pub(crate) fn lower_anonymous_initializer(
        &mut self,
        init: &TypedAnonymousInitializer,
    ) -> LoweringResult<IrDeclId> {
        debug!("lowering init block {}", init.symbol_id);
        let id = self.registry.get_lowered_anonymous_initializer(init.symbol_id)?;
        self.attach_to_current_parent(id)?;
        self.with_parent(id, |s| {
            s.in_registry_scope(init.symbol_id, |s| {
                let statements = s.lower_statements(&init.body.statements)?;
                s.registry.arena_mut().set_body(id, IrBlock::new(statements))
            })
        })?;
        Ok(id)
    }

    // Annotations

    /// Lower `annotations` onto `decl`; a no-op when annotations are off
    pub(crate) fn annotate(
        &mut self,
        decl: IrDeclId,
        annotations: &[TypedAnnotation],
    ) -> LoweringResult<()> {
        if annotations.is_empty() || !self.config.annotations {
            return Ok(());
        }
        let lowered = annotations
            .iter()
            .map(|annotation| self.lower_annotation(annotation))
            .collect::<LoweringResult<Vec<_>>>()?;
        self.registry.arena_mut().declaration_mut(decl)?.annotations = lowered;
        Ok(())
    }

    /// Annotation as a constructor call of its annotation class
    fn lower_annotation(&mut self, annotation: &TypedAnnotation) -> LoweringResult<IrExpr> {
        let ty = self.lower_type(&annotation.annotation_type);
        let constructor = annotation
            .constructor
            .or_else(|| self.annotation_constructor(&annotation.annotation_type));
        let Some(constructor) = constructor else {
            let symbols = self.symbols;
            let name = symbols
                .expand_alias(&annotation.annotation_type)
                .classifier()
                .and_then(|class| symbols.name(class))
                .unwrap_or("<annotation>");
            return Ok(self.unresolved(name, ty, annotation.source_location));
        };
        let constructor = self.registry.get_lowered_constructor(constructor)?;
        let arguments = self.lower_arguments(&annotation.arguments)?;
        Ok(IrExpr::new(
            IrExprKind::ConstructorCall {
                constructor,
                arguments,
                type_arguments: Vec::new(),
            },
            ty,
        )
        .at(annotation.source_location))
    }

    /// Constructor of an annotation class found by its qualified name
    fn annotation_constructor(&self, annotation_type: &TypeRef) -> Option<SymbolId> {
        let class = self.symbols.expand_alias(annotation_type).classifier()?;
        let symbol = self.symbols.get(class)?;
        let id = CallableId::constructor_of(symbol.package.clone(), symbol.name.clone());
        self.members
            .resolve_callable_symbols(&id)
            .into_iter()
            .find(|ctor| self.symbols.owner_class(*ctor) == Some(class))
    }
}
