//! Scope stacks of a lowering session
//!
//! Five independent LIFO stacks track where the traversal is: the
//! declaration that owns newly lowered children, the enclosing functions,
//! properties and classes, and the subjects of enclosing `when`s. The loop
//! registry maps source loops to lowered loops while they are being
//! lowered.

use super::error::{LoweringError, LoweringResult};
use crate::ir::{IrDeclId, IrLoopId};
use crate::tast::{ClassKind, LoopId, SymbolId};
use fxhash::FxHashMap;
use smallvec::SmallVec;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionFrame {
    pub decl: IrDeclId,
    pub source: Option<SymbolId>,
    /// Name a labeled `return` can use to leave this function
    pub label: Option<String>,
    /// Implicit `this` available in the body
    pub receiver: Option<IrDeclId>,
    pub receiver_class: Option<SymbolId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassFrame {
    pub decl: IrDeclId,
    pub source: SymbolId,
    pub kind: ClassKind,
    pub this_receiver: Option<IrDeclId>,
}

#[derive(Debug, Default)]
pub struct ContextStacks {
    parents: SmallVec<[IrDeclId; 8]>,
    functions: SmallVec<[FunctionFrame; 4]>,
    properties: SmallVec<[IrDeclId; 2]>,
    classes: SmallVec<[ClassFrame; 4]>,
    subjects: SmallVec<[IrDeclId; 2]>,
}

fn top<T: Clone>(stack: &[T], name: &'static str) -> LoweringResult<T> {
    stack
        .last()
        .cloned()
        .ok_or(LoweringError::EmptyContextStack { stack: name })
}

impl ContextStacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_parent(&mut self, parent: IrDeclId) {
        self.parents.push(parent);
    }

    pub fn pop_parent(&mut self) -> Option<IrDeclId> {
        self.parents.pop()
    }

    pub fn current_parent(&self) -> LoweringResult<IrDeclId> {
        top(&self.parents, "parent")
    }

    pub fn push_function(&mut self, frame: FunctionFrame) {
        self.functions.push(frame);
    }

    pub fn pop_function(&mut self) -> Option<FunctionFrame> {
        self.functions.pop()
    }

    pub fn current_function(&self) -> LoweringResult<FunctionFrame> {
        top(&self.functions, "function")
    }

    /// Enclosing functions, innermost first
    pub fn functions(&self) -> impl Iterator<Item = &FunctionFrame> {
        self.functions.iter().rev()
    }

    pub fn push_property(&mut self, property: IrDeclId) {
        self.properties.push(property);
    }

    pub fn pop_property(&mut self) -> Option<IrDeclId> {
        self.properties.pop()
    }

    pub fn current_property(&self) -> LoweringResult<IrDeclId> {
        top(&self.properties, "property")
    }

    pub fn push_class(&mut self, frame: ClassFrame) {
        self.classes.push(frame);
    }

    pub fn pop_class(&mut self) -> Option<ClassFrame> {
        self.classes.pop()
    }

    pub fn current_class(&self) -> LoweringResult<ClassFrame> {
        top(&self.classes, "class")
    }

    /// Enclosing classes, innermost first
    pub fn classes(&self) -> impl Iterator<Item = &ClassFrame> {
        self.classes.iter().rev()
    }

    pub fn push_subject(&mut self, subject: IrDeclId) {
        self.subjects.push(subject);
    }

    pub fn pop_subject(&mut self) -> Option<IrDeclId> {
        self.subjects.pop()
    }

    pub fn current_subject(&self) -> LoweringResult<IrDeclId> {
        top(&self.subjects, "when subject")
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
            && self.functions.is_empty()
            && self.properties.is_empty()
            && self.classes.is_empty()
            && self.subjects.is_empty()
    }
}

/// Source loops currently being lowered
#[derive(Debug, Default)]
pub struct LoopRegistry {
    active: FxHashMap<LoopId, IrLoopId>,
}

impl LoopRegistry {
    pub fn register(&mut self, source: LoopId, lowered: IrLoopId) {
        self.active.insert(source, lowered);
    }

    pub fn deregister(&mut self, source: LoopId) -> Option<IrLoopId> {
        self.active.remove(&source)
    }

    pub fn lookup(&self, source: LoopId) -> Option<IrLoopId> {
        self.active.get(&source).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
