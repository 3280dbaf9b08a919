//! Declaration registry
//!
//! Maps source symbols to lowered declarations with create-or-fetch
//! semantics: the first request for a symbol allocates a shell declaration
//! from the symbol table, every later request returns the same node. The
//! lowering pass fills shells in when it reaches their declarations; calls
//! that refer to a declaration before that point still get a stable target.
//!
//! Values (parameters and locals) are additionally scoped: they become
//! invisible when the registry scope that declared them is left.

use super::type_converter::{TypeConverter, TypeTranslator};
use crate::ir::*;
use crate::lower::error::{LoweringError, LoweringResult};
use crate::tast::{
    Modality, SourceLocation, Symbol, SymbolId, SymbolKind, SymbolTable, TypeRef, TypedVariable,
};
use fxhash::FxHashMap;
use log::trace;

/// Counters of `enter_scope`/`leave_scope` calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopeBalance {
    pub entered: usize,
    pub left: usize,
}

impl ScopeBalance {
    pub fn is_balanced(&self) -> bool {
        self.entered == self.left
    }
}

pub trait DeclarationRegistry {
    fn arena(&self) -> &IrArena;
    fn arena_mut(&mut self) -> &mut IrArena;

    fn get_lowered_class(&mut self, class: SymbolId) -> LoweringResult<IrDeclId>;
    fn get_lowered_anonymous_class(&mut self, class: SymbolId) -> LoweringResult<IrDeclId>;
    fn get_lowered_function(&mut self, function: SymbolId) -> LoweringResult<IrDeclId>;
    fn get_lowered_local_function(&mut self, function: SymbolId) -> LoweringResult<IrDeclId>;
    fn get_lowered_constructor(&mut self, constructor: SymbolId) -> LoweringResult<IrDeclId>;
    /// Property together with its accessor shells
    fn get_lowered_property(&mut self, property: SymbolId) -> LoweringResult<IrDeclId>;
    fn get_lowered_type_parameter(&mut self, owner: SymbolId, index: u32)
        -> LoweringResult<IrDeclId>;
    /// Function, constructor or accessor, whichever `symbol` is
    fn get_lowered_function_symbol(&mut self, symbol: SymbolId) -> LoweringResult<IrDeclId>;
    fn get_lowered_anonymous_initializer(&mut self, init: SymbolId) -> LoweringResult<IrDeclId>;
    /// Parameter or local variable visible in the open scopes
    fn get_lowered_value(&self, value: SymbolId) -> Option<IrDeclId>;

    fn enter_scope(&mut self, owner: SymbolId);
    fn leave_scope(&mut self, owner: SymbolId) -> LoweringResult<()>;
    fn scope_balance(&self) -> ScopeBalance;

    /// Value parameters of `function` (a function or constructor) from its
    /// signature, registered in the innermost scope
    fn declare_parameters(
        &mut self,
        function: IrDeclId,
        source: SymbolId,
    ) -> LoweringResult<Vec<IrDeclId>>;
    fn create_and_register_local_variable(
        &mut self,
        parent: IrDeclId,
        variable: &TypedVariable,
        origin: IrDeclarationOrigin,
    ) -> LoweringResult<IrDeclId>;
    fn declare_temporary_variable(
        &mut self,
        parent: IrDeclId,
        initializer: IrExpr,
        name_hint: &str,
    ) -> LoweringResult<IrDeclId>;
    fn declare_backing_field(&mut self, property: IrDeclId) -> LoweringResult<IrDeclId>;
    /// Implicit `this` of a member function, typed at the class's self type
    fn declare_dispatch_receiver(
        &mut self,
        function: IrDeclId,
        class: SymbolId,
    ) -> LoweringResult<IrDeclId>;
    /// Stub in `class` for the inherited function or property `original`
    fn declare_fake_override(
        &mut self,
        class: IrDeclId,
        original: SymbolId,
    ) -> LoweringResult<IrDeclId>;
}

#[derive(Debug)]
struct LocalScope {
    owner: SymbolId,
    values: Vec<SymbolId>,
}

pub struct DeclarationStorage<'s> {
    symbols: &'s SymbolTable,
    types: TypeTranslator<'s>,
    arena: IrArena,
    classes: FxHashMap<SymbolId, IrDeclId>,
    functions: FxHashMap<SymbolId, IrDeclId>,
    constructors: FxHashMap<SymbolId, IrDeclId>,
    properties: FxHashMap<SymbolId, IrDeclId>,
    initializers: FxHashMap<SymbolId, IrDeclId>,
    type_parameters: FxHashMap<(SymbolId, u32), IrDeclId>,
    values: FxHashMap<SymbolId, IrDeclId>,
    backing_fields: FxHashMap<IrDeclId, IrDeclId>,
    dispatch_receivers: FxHashMap<IrDeclId, IrDeclId>,
    fake_overrides: FxHashMap<(IrDeclId, SymbolId), IrDeclId>,
    scopes: Vec<LocalScope>,
    balance: ScopeBalance,
    temporaries: u32,
}

impl<'s> DeclarationStorage<'s> {
    pub fn new(symbols: &'s SymbolTable) -> Self {
        Self {
            symbols,
            types: TypeTranslator::new(symbols),
            arena: IrArena::new(),
            classes: FxHashMap::default(),
            functions: FxHashMap::default(),
            constructors: FxHashMap::default(),
            properties: FxHashMap::default(),
            initializers: FxHashMap::default(),
            type_parameters: FxHashMap::default(),
            values: FxHashMap::default(),
            backing_fields: FxHashMap::default(),
            dispatch_receivers: FxHashMap::default(),
            fake_overrides: FxHashMap::default(),
            scopes: Vec::new(),
            balance: ScopeBalance::default(),
            temporaries: 0,
        }
    }

    pub fn into_arena(self) -> IrArena {
        self.arena
    }

    fn symbol(&self, id: SymbolId) -> LoweringResult<&'s Symbol> {
        let symbols = self.symbols;
        symbols.get(id).ok_or(LoweringError::UnknownSymbol(id))
    }

    fn symbol_of_kind(&self, id: SymbolId, expected: SymbolKind) -> LoweringResult<&'s Symbol> {
        let symbol = self.symbol(id)?;
        if symbol.kind != expected {
            return Err(LoweringError::SymbolKindMismatch {
                symbol: id,
                expected,
                found: symbol.kind,
            });
        }
        Ok(symbol)
    }

    fn lower_type(&self, ty: &TypeRef) -> IrType {
        self.types.to_lowered_type(ty)
    }

    /// Remember `value` in the innermost scope so that leaving it hides the value
    fn register_value(&mut self, symbol: SymbolId, decl: IrDeclId) {
        self.values.insert(symbol, decl);
        if let Some(scope) = self.scopes.last_mut() {
            scope.values.push(symbol);
        }
    }

    fn new_parameter(
        &mut self,
        parent: IrDeclId,
        name: &str,
        ty: IrType,
        index: Option<u32>,
        origin: IrDeclarationOrigin,
    ) -> LoweringResult<IrDeclId> {
        let param = self.arena.alloc(
            origin,
            SourceLocation::unknown(),
            IrDeclarationKind::ValueParameter(IrValueParameter {
                name: name.to_string(),
                ty,
                index,
                default_value: None,
            }),
        );
        self.arena.attach_owned(parent, param)?;
        Ok(param)
    }

    fn new_function(
        &mut self,
        source: Option<SymbolId>,
        name: String,
        modality: Modality,
        return_type: IrType,
        origin: IrDeclarationOrigin,
        location: SourceLocation,
    ) -> IrDeclId {
        self.arena.alloc(
            origin,
            location,
            IrDeclarationKind::Function(IrFunction {
                source,
                name,
                modality,
                type_parameters: Vec::new(),
                dispatch_receiver: None,
                value_parameters: Vec::new(),
                return_type,
                body: None,
                overridden: Vec::new(),
                corresponding_property: None,
            }),
        )
    }

    fn class_shell(&mut self, class: SymbolId, origin: IrDeclarationOrigin) -> LoweringResult<IrDeclId> {
        if let Some(existing) = self.classes.get(&class) {
            return Ok(*existing);
        }
        let symbol = self.symbol_of_kind(class, SymbolKind::Class)?;
        let symbols = self.symbols;
        let info = symbols
            .class_info(class)
            .ok_or(LoweringError::UnknownSymbol(class))?;
        let id = self.arena.alloc(
            origin,
            symbol.location,
            IrDeclarationKind::Class(IrClass {
                source: class,
                name: symbol.name.clone(),
                kind: info.kind,
                modality: info.modality,
                is_anonymous: info.is_anonymous,
                type_parameters: Vec::new(),
                supertypes: Vec::new(),
                this_receiver: None,
                declarations: Vec::new(),
            }),
        );
        let self_type = IrType::self_type(class, info.type_parameters.len());
        let receiver = self.new_parameter(
            id,
            "<this>",
            self_type,
            None,
            IrDeclarationOrigin::InstanceReceiver,
        )?;
        self.arena.class_mut(id)?.this_receiver = Some(receiver);
        self.classes.insert(class, id);
        trace!("registered class {} as {}", symbol.name, id);
        Ok(id)
    }

    fn function_shell(
        &mut self,
        function: SymbolId,
        origin: Option<IrDeclarationOrigin>,
    ) -> LoweringResult<IrDeclId> {
        if let Some(existing) = self.functions.get(&function) {
            return Ok(*existing);
        }
        let symbol = self.symbol_of_kind(function, SymbolKind::Function)?;
        let symbols = self.symbols;
        let signature = symbols
            .signature(function)
            .ok_or(LoweringError::UnknownSymbol(function))?;
        let origin = origin.unwrap_or_else(|| {
            if symbol.name.is_empty() {
                IrDeclarationOrigin::AnonymousFunction
            } else if symbol.owner.is_some() && symbols.owner_class(function).is_none() {
                IrDeclarationOrigin::LocalFunction
            } else {
                IrDeclarationOrigin::Defined
            }
        });
        let return_type = self.lower_type(&signature.return_type);
        let id = self.new_function(
            Some(function),
            symbol.name.clone(),
            signature.modality,
            return_type,
            origin,
            symbol.location,
        );
        self.functions.insert(function, id);
        Ok(id)
    }

    fn accessor_shell(
        &mut self,
        property: IrDeclId,
        name: String,
        ty: IrType,
        modality: Modality,
        origin: IrDeclarationOrigin,
        source: Option<SymbolId>,
    ) -> LoweringResult<IrDeclId> {
        let accessor = self.new_function(
            source,
            name,
            modality,
            ty,
            origin,
            SourceLocation::unknown(),
        );
        self.arena.function_mut(accessor)?.corresponding_property = Some(property);
        self.arena.attach(property, accessor)?;
        if let Some(source) = source {
            self.functions.insert(source, accessor);
        }
        Ok(accessor)
    }

    /// Fresh copies of `original`'s value parameters under `function`
    fn copy_parameters(&mut self, function: IrDeclId, original: SymbolId) -> LoweringResult<Vec<IrDeclId>> {
        let symbols = self.symbols;
        let Some(signature) = symbols.signature(original) else {
            return Ok(Vec::new());
        };
        signature
            .parameters
            .iter()
            .enumerate()
            .map(|(index, param)| {
                let ty = self.lower_type(&param.ty);
                self.new_parameter(
                    function,
                    &param.name,
                    ty,
                    Some(index as u32),
                    IrDeclarationOrigin::FakeOverride,
                )
            })
            .collect()
    }

    fn fake_override_function(
        &mut self,
        class: IrDeclId,
        class_symbol: SymbolId,
        original: SymbolId,
    ) -> LoweringResult<IrDeclId> {
        let lowered_original = self.get_lowered_function(original)?;
        let (name, modality, return_type) = {
            let function = self.arena.function(lowered_original)?;
            (function.name.clone(), function.modality, function.return_type.clone())
        };
        let stub = self.new_function(
            None,
            name,
            modality,
            return_type,
            IrDeclarationOrigin::FakeOverride,
            SourceLocation::unknown(),
        );
        self.arena.attach(class, stub)?;
        let receiver = self.declare_dispatch_receiver(stub, class_symbol)?;
        self.arena.set_origin(receiver, IrDeclarationOrigin::FakeOverride)?;
        let params = self.copy_parameters(stub, original)?;
        let function = self.arena.function_mut(stub)?;
        function.value_parameters = params;
        function.overridden.push(lowered_original);
        Ok(stub)
    }

    fn fake_override_property(
        &mut self,
        class: IrDeclId,
        class_symbol: SymbolId,
        original: SymbolId,
    ) -> LoweringResult<IrDeclId> {
        let lowered_original = self.get_lowered_property(original)?;
        let original_property = self.arena.property(lowered_original)?.clone();
        let stub = self.arena.alloc(
            IrDeclarationOrigin::FakeOverride,
            SourceLocation::unknown(),
            IrDeclarationKind::Property(IrProperty {
                source: None,
                name: original_property.name.clone(),
                ty: original_property.ty.clone(),
                is_mutable: original_property.is_mutable,
                modality: original_property.modality,
                backing_field: None,
                getter: None,
                setter: None,
                overridden: vec![lowered_original],
            }),
        );
        self.arena.attach(class, stub)?;

        for (slot, original_accessor) in [
            (AccessorSlot::Getter, original_property.getter),
            (AccessorSlot::Setter, original_property.setter),
        ] {
            let Some(original_accessor) = original_accessor else {
                continue;
            };
            let (name, return_type) = {
                let function = self.arena.function(original_accessor)?;
                (function.name.clone(), function.return_type.clone())
            };
            let accessor = self.accessor_shell(
                stub,
                name,
                return_type,
                original_property.modality,
                IrDeclarationOrigin::FakeOverride,
                None,
            )?;
            let receiver = self.declare_dispatch_receiver(accessor, class_symbol)?;
            self.arena.set_origin(receiver, IrDeclarationOrigin::FakeOverride)?;
            if slot == AccessorSlot::Setter {
                let value = self.new_parameter(
                    accessor,
                    "value",
                    original_property.ty.clone(),
                    Some(0),
                    IrDeclarationOrigin::FakeOverride,
                )?;
                self.arena.function_mut(accessor)?.value_parameters.push(value);
            }
            self.arena
                .function_mut(accessor)?
                .overridden
                .push(original_accessor);
            let property = self.arena.property_mut(stub)?;
            match slot {
                AccessorSlot::Getter => property.getter = Some(accessor),
                AccessorSlot::Setter => property.setter = Some(accessor),
            }
        }
        Ok(stub)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccessorSlot {
    Getter,
    Setter,
}

impl DeclarationRegistry for DeclarationStorage<'_> {
    fn arena(&self) -> &IrArena {
        &self.arena
    }

    fn arena_mut(&mut self) -> &mut IrArena {
        &mut self.arena
    }

    fn get_lowered_class(&mut self, class: SymbolId) -> LoweringResult<IrDeclId> {
        self.class_shell(class, IrDeclarationOrigin::Defined)
    }

    fn get_lowered_anonymous_class(&mut self, class: SymbolId) -> LoweringResult<IrDeclId> {
        self.class_shell(class, IrDeclarationOrigin::AnonymousObject)
    }

    fn get_lowered_function(&mut self, function: SymbolId) -> LoweringResult<IrDeclId> {
        self.function_shell(function, None)
    }

    fn get_lowered_local_function(&mut self, function: SymbolId) -> LoweringResult<IrDeclId> {
        self.function_shell(function, Some(IrDeclarationOrigin::LocalFunction))
    }

    fn get_lowered_constructor(&mut self, constructor: SymbolId) -> LoweringResult<IrDeclId> {
        if let Some(existing) = self.constructors.get(&constructor) {
            return Ok(*existing);
        }
        let symbol = self.symbol_of_kind(constructor, SymbolKind::Constructor)?;
        let is_primary = symbol
            .owner
            .and_then(|owner| self.symbols.class_info(owner))
            .is_some_and(|info| info.primary_constructor == Some(constructor));
        let return_type = self.lower_type(&symbol.ty);
        let id = self.arena.alloc(
            IrDeclarationOrigin::Defined,
            symbol.location,
            IrDeclarationKind::Constructor(IrConstructor {
                source: constructor,
                is_primary,
                type_parameters: Vec::new(),
                value_parameters: Vec::new(),
                return_type,
                body: None,
            }),
        );
        self.constructors.insert(constructor, id);
        Ok(id)
    }

    fn get_lowered_property(&mut self, property: SymbolId) -> LoweringResult<IrDeclId> {
        if let Some(existing) = self.properties.get(&property) {
            return Ok(*existing);
        }
        let symbol = self.symbol_of_kind(property, SymbolKind::Property)?;
        let symbols = self.symbols;
        let info = symbols
            .property_info(property)
            .ok_or(LoweringError::UnknownSymbol(property))?;
        let ty = self.lower_type(&symbol.ty);
        let id = self.arena.alloc(
            IrDeclarationOrigin::Defined,
            symbol.location,
            IrDeclarationKind::Property(IrProperty {
                source: Some(property),
                name: symbol.name.clone(),
                ty: ty.clone(),
                is_mutable: info.is_mutable,
                modality: info.modality,
                backing_field: None,
                getter: None,
                setter: None,
                overridden: Vec::new(),
            }),
        );
        self.properties.insert(property, id);

        let origin_of = |is_default: bool| {
            if is_default {
                IrDeclarationOrigin::DefaultPropertyAccessor
            } else {
                IrDeclarationOrigin::Defined
            }
        };
        let getter = self.accessor_shell(
            id,
            format!("<get-{}>", symbol.name),
            ty.clone(),
            info.modality,
            origin_of(info.has_default_getter),
            info.getter,
        )?;
        self.arena.property_mut(id)?.getter = Some(getter);

        if info.is_mutable {
            let setter = self.accessor_shell(
                id,
                format!("<set-{}>", symbol.name),
                IrType::unit(),
                info.modality,
                origin_of(info.has_default_setter),
                info.setter,
            )?;
            let value = self.new_parameter(
                setter,
                "value",
                ty,
                Some(0),
                IrDeclarationOrigin::Defined,
            )?;
            self.arena.function_mut(setter)?.value_parameters.push(value);
            if let Some(parameter) = info.setter_parameter {
                // only the setter body can name it
                self.values.insert(parameter, value);
            }
            self.arena.property_mut(id)?.setter = Some(setter);
        }
        trace!("registered property {} as {}", symbol.name, id);
        Ok(id)
    }

    fn get_lowered_type_parameter(
        &mut self,
        owner: SymbolId,
        index: u32,
    ) -> LoweringResult<IrDeclId> {
        if let Some(existing) = self.type_parameters.get(&(owner, index)) {
            return Ok(*existing);
        }
        let symbols = self.symbols;
        let names = symbols
            .class_info(owner)
            .map(|info| &info.type_parameters)
            .or_else(|| symbols.signature(owner).map(|sig| &sig.type_parameters))
            .or_else(|| symbols.alias_info(owner).map(|alias| &alias.type_parameters))
            .ok_or(LoweringError::UnknownSymbol(owner))?;
        let name = names
            .get(index as usize)
            .cloned()
            .unwrap_or_else(|| format!("T{}", index));
        let id = self.arena.alloc(
            IrDeclarationOrigin::Defined,
            SourceLocation::unknown(),
            IrDeclarationKind::TypeParameter(IrTypeParameter {
                name,
                index,
                upper_bounds: Vec::new(),
            }),
        );
        self.type_parameters.insert((owner, index), id);
        Ok(id)
    }

    fn get_lowered_function_symbol(&mut self, symbol: SymbolId) -> LoweringResult<IrDeclId> {
        let found = self.symbol(symbol)?;
        match found.kind {
            SymbolKind::Function => self.get_lowered_function(symbol),
            SymbolKind::Constructor => self.get_lowered_constructor(symbol),
            SymbolKind::Accessor => {
                let property = found.owner.ok_or(LoweringError::UnknownSymbol(symbol))?;
                self.get_lowered_property(property)?;
                self.functions
                    .get(&symbol)
                    .copied()
                    .ok_or(LoweringError::UnknownSymbol(symbol))
            }
            other => Err(LoweringError::SymbolKindMismatch {
                symbol,
                expected: SymbolKind::Function,
                found: other,
            }),
        }
    }

    fn get_lowered_anonymous_initializer(&mut self, init: SymbolId) -> LoweringResult<IrDeclId> {
        if let Some(existing) = self.initializers.get(&init) {
            return Ok(*existing);
        }
        let symbol = self.symbol_of_kind(init, SymbolKind::AnonymousInitializer)?;
        let id = self.arena.alloc(
            IrDeclarationOrigin::Defined,
            symbol.location,
            IrDeclarationKind::AnonymousInitializer(IrAnonymousInitializer { body: None }),
        );
        self.initializers.insert(init, id);
        Ok(id)
    }

    fn get_lowered_value(&self, value: SymbolId) -> Option<IrDeclId> {
        self.values.get(&value).copied()
    }

    fn enter_scope(&mut self, owner: SymbolId) {
        self.balance.entered += 1;
        self.scopes.push(LocalScope {
            owner,
            values: Vec::new(),
        });
    }

    fn leave_scope(&mut self, owner: SymbolId) -> LoweringResult<()> {
        self.balance.left += 1;
        let scope = self.scopes.pop().ok_or_else(|| LoweringError::UnbalancedScope {
            detail: format!("no scope is open for {}", owner),
        })?;
        if scope.owner != owner {
            return Err(LoweringError::UnbalancedScope {
                detail: format!("innermost scope belongs to {}, not {}", scope.owner, owner),
            });
        }
        for value in scope.values {
            self.values.remove(&value);
        }
        Ok(())
    }

    fn scope_balance(&self) -> ScopeBalance {
        self.balance
    }

    fn declare_parameters(
        &mut self,
        function: IrDeclId,
        source: SymbolId,
    ) -> LoweringResult<Vec<IrDeclId>> {
        let symbols = self.symbols;
        let signature = symbols
            .signature(source)
            .ok_or(LoweringError::UnknownSymbol(source))?;
        let existing = match &self.arena.declaration(function)?.kind {
            IrDeclarationKind::Function(f) => f.value_parameters.clone(),
            IrDeclarationKind::Constructor(c) => c.value_parameters.clone(),
            other => {
                return Err(LoweringError::UnexpectedDeclaration {
                    decl: function,
                    expected: "function",
                    found: other.name(),
                })
            }
        };
        if !existing.is_empty() {
            for (param, decl) in signature.parameters.iter().zip(&existing) {
                self.register_value(param.symbol, *decl);
            }
            return Ok(existing);
        }

        let mut declared = Vec::with_capacity(signature.parameters.len());
        for (index, param) in signature.parameters.iter().enumerate() {
            let ty = self.lower_type(&param.ty);
            let decl = self.new_parameter(
                function,
                &param.name,
                ty,
                Some(index as u32),
                IrDeclarationOrigin::Defined,
            )?;
            if let Some(symbol) = symbols.get(param.symbol) {
                self.arena.declaration_mut(decl)?.location = symbol.location;
            }
            self.register_value(param.symbol, decl);
            declared.push(decl);
        }
        match &mut self.arena.declaration_mut(function)?.kind {
            IrDeclarationKind::Function(f) => f.value_parameters = declared.clone(),
            IrDeclarationKind::Constructor(c) => c.value_parameters = declared.clone(),
            _ => {}
        }
        Ok(declared)
    }

    fn create_and_register_local_variable(
        &mut self,
        parent: IrDeclId,
        variable: &TypedVariable,
        origin: IrDeclarationOrigin,
    ) -> LoweringResult<IrDeclId> {
        let ty = self.lower_type(&variable.var_type);
        let id = self.arena.alloc(
            origin,
            variable.source_location,
            IrDeclarationKind::Variable(IrVariable {
                name: variable.name.clone(),
                ty,
                is_mutable: variable.is_mutable,
                initializer: None,
            }),
        );
        self.arena.attach(parent, id)?;
        self.register_value(variable.symbol_id, id);
        Ok(id)
    }

    fn declare_temporary_variable(
        &mut self,
        parent: IrDeclId,
        initializer: IrExpr,
        name_hint: &str,
    ) -> LoweringResult<IrDeclId> {
        let name = format!("tmp{}_{}", self.temporaries, name_hint);
        self.temporaries += 1;
        let location = initializer.location;
        let id = self.arena.alloc(
            IrDeclarationOrigin::TemporaryVariable,
            location,
            IrDeclarationKind::Variable(IrVariable {
                name,
                ty: initializer.ty.clone(),
                is_mutable: false,
                initializer: Some(initializer),
            }),
        );
        self.arena.attach(parent, id)?;
        Ok(id)
    }

    fn declare_backing_field(&mut self, property: IrDeclId) -> LoweringResult<IrDeclId> {
        if let Some(existing) = self.backing_fields.get(&property) {
            return Ok(*existing);
        }
        let (name, ty) = {
            let lowered = self.arena.property(property)?;
            (lowered.name.clone(), lowered.ty.clone())
        };
        let location = self.arena.declaration(property)?.location;
        let field = self.arena.alloc(
            IrDeclarationOrigin::PropertyBackingField,
            location,
            IrDeclarationKind::Field(IrField {
                name,
                ty,
                initializer: None,
                corresponding_property: property,
            }),
        );
        self.arena.attach(property, field)?;
        self.arena.property_mut(property)?.backing_field = Some(field);
        self.backing_fields.insert(property, field);
        Ok(field)
    }

    fn declare_dispatch_receiver(
        &mut self,
        function: IrDeclId,
        class: SymbolId,
    ) -> LoweringResult<IrDeclId> {
        if let Some(existing) = self.dispatch_receivers.get(&function) {
            return Ok(*existing);
        }
        let type_parameter_count = self
            .symbols
            .class_info(class)
            .map_or(0, |info| info.type_parameters.len());
        let receiver = self.new_parameter(
            function,
            "<this>",
            IrType::self_type(class, type_parameter_count),
            None,
            IrDeclarationOrigin::DispatchReceiver,
        )?;
        self.arena.function_mut(function)?.dispatch_receiver = Some(receiver);
        self.dispatch_receivers.insert(function, receiver);
        Ok(receiver)
    }

    fn declare_fake_override(
        &mut self,
        class: IrDeclId,
        original: SymbolId,
    ) -> LoweringResult<IrDeclId> {
        if let Some(existing) = self.fake_overrides.get(&(class, original)) {
            return Ok(*existing);
        }
        let class_symbol = self.arena.class(class)?.source;
        let stub = match self.symbol(original)?.kind {
            SymbolKind::Function => self.fake_override_function(class, class_symbol, original)?,
            SymbolKind::Property => self.fake_override_property(class, class_symbol, original)?,
            other => {
                return Err(LoweringError::SymbolKindMismatch {
                    symbol: original,
                    expected: SymbolKind::Function,
                    found: other,
                })
            }
        };
        self.fake_overrides.insert((class, original), stub);
        Ok(stub)
    }
}
