//! # Semantic Analyzer
//!
//! Walks a [`TypedProgram`] top-down and fills in every type slot:
//!
//! - Scopes: a stack of function frames, each a stack of blocks. Function
//!   versions are analyzed inside the scope chain of the literal's definition
//!   site, not the call site that asked for them.
//! - Captures: reading a variable owned by an enclosing function makes every
//!   function between the owner and the reader capture it.
//! - Calls go through the call-site driver (`function_call`), which resolves
//!   overloads and asks the specialization engine (`specialization`) for
//!   versions of user functions.
//!
//! Errors never stop the walk: the failing construct is typed `never` and a
//! diagnostic is recorded.

use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::arena::InternedString;
use crate::diagnostics::{DiagnosticCollector, ErrorKind};
use crate::error::AnalysisResult;
use crate::function::{Capture, CaptureSource, FunctionId, FunctionTable, VersionSlot};
use crate::source::Span;
use crate::specialization::InFlight;
use crate::standard_library::StandardLibrary;
use crate::type_registry::{FunctionType, PlaceholderKind, TypeId, TypeKind, TypeRegistry};
use crate::typed_ast::*;

/// Analyzer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerOptions {
    /// Nesting limit for specializations started from inside other ones
    pub max_specialization_depth: usize,
    /// Re-analysis passes of a recursive version before its return type is
    /// taken as final
    pub max_recursion_passes: usize,
    /// Errors kept by the diagnostic collector
    pub max_errors: usize,
    /// Give function values stored in array literals an all-`any` version
    /// for dynamic calls
    pub box_array_functions: bool,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            max_specialization_depth: 64,
            max_recursion_passes: 4,
            max_errors: 256,
            box_array_functions: true,
        }
    }
}

impl AnalyzerOptions {
    /// Options from JSON; missing fields keep their defaults
    pub fn from_json(text: &str) -> AnalysisResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Handle to a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VarId(u32);

impl VarId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarScope {
    Local,
    Parameter,
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: InternedString,
    pub ty: TypeId,
    pub scope: VarScope,
    /// Function whose frame declared the variable; `None` for main
    pub owner: Option<FunctionId>,
    /// User function the variable is bound to
    pub value: Option<FunctionId>,
    pub span: Span,
}

/// Scope state of one function being analyzed
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub(crate) function: Option<FunctionId>,
    pub(crate) blocks: Vec<HashMap<InternedString, VarId>>,
    pub(crate) returns: Vec<TypeId>,
    pub(crate) throws: bool,
}

impl Frame {
    pub(crate) fn new(function: Option<FunctionId>) -> Self {
        Self { function, blocks: vec![HashMap::new()], ..Self::default() }
    }
}

pub struct SemanticAnalyzer {
    pub(crate) registry: TypeRegistry,
    pub(crate) library: Rc<StandardLibrary>,
    pub(crate) functions: FunctionTable,
    pub(crate) variables: Vec<Variable>,
    pub(crate) frames: Vec<Frame>,
    pub(crate) in_flight: HashMap<(FunctionId, Vec<TypeId>), InFlight>,
    /// Specializations currently being built, outermost first
    pub(crate) depth: usize,
    pub(crate) diagnostics: DiagnosticCollector,
    pub(crate) options: AnalyzerOptions,
}

impl SemanticAnalyzer {
    pub fn new() -> Self {
        Self::with_options(AnalyzerOptions::default())
    }

    pub fn with_options(options: AnalyzerOptions) -> Self {
        Self::with_library(options, StandardLibrary::new)
    }

    /// Analyzer over a custom standard library catalog
    pub fn with_library(
        options: AnalyzerOptions,
        library: impl FnOnce(&mut TypeRegistry) -> StandardLibrary,
    ) -> Self {
        let mut registry = TypeRegistry::new();
        let library = Rc::new(library(&mut registry));
        Self {
            registry,
            library,
            functions: FunctionTable::new(),
            variables: Vec::new(),
            frames: Vec::new(),
            in_flight: HashMap::new(),
            depth: 0,
            diagnostics: DiagnosticCollector::with_max_errors(options.max_errors),
            options,
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut TypeRegistry {
        &mut self.registry
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    pub fn library(&self) -> &StandardLibrary {
        &self.library
    }

    pub fn diagnostics(&self) -> &DiagnosticCollector {
        &self.diagnostics
    }

    pub fn options(&self) -> &AnalyzerOptions {
        &self.options
    }

    pub fn variable(&self, id: VarId) -> &Variable {
        &self.variables[id.index()]
    }

    /// Analyze a whole program; returns the type of its trailing expression
    pub fn analyze(&mut self, program: &mut TypedProgram) -> TypeId {
        log::debug!("[ANALYZE] program of {} statement(s)", program.body.statements.len());
        self.frames.push(Frame::new(None));
        let value = self.analyze_block(&mut program.body);
        self.frames.pop();
        self.finish();
        let registry = &mut self.registry;
        program.body.visit_types_mut(&mut |ty: &mut TypeId| *ty = registry.erase_placeholders(*ty));
        log::debug!(
            "[ANALYZE] done: {} function(s), {} type(s), {} error(s)",
            self.functions.len(),
            self.registry.len(),
            self.diagnostics.error_count()
        );
        self.registry.erase_placeholders(value)
    }

    /// Prepare results for the backend: default versions are compiled boxed,
    /// so placeholders become `any` in every version's signature and body.
    pub fn finish(&mut self) {
        let registry = &mut self.registry;
        for id in self.functions.ids() {
            for version in self.functions.get_mut(id).all_versions_mut() {
                version.ty = registry.erase_placeholders(version.ty);
                version.return_type = registry.erase_placeholders(version.return_type);
                version.body.visit_types_mut(&mut |ty: &mut TypeId| *ty = registry.erase_placeholders(*ty));
            }
        }
    }

    // ====== SCOPES ======

    pub(crate) fn enter_block(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.blocks.push(HashMap::new());
        }
    }

    pub(crate) fn leave_block(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.blocks.pop();
        }
    }

    pub(crate) fn current_function(&self) -> Option<FunctionId> {
        self.frames.last().and_then(|frame| frame.function)
    }

    pub(crate) fn declare(
        &mut self,
        name: InternedString,
        ty: TypeId,
        scope: VarScope,
        span: Span,
    ) -> VarId {
        let id = VarId(self.variables.len() as u32);
        self.variables.push(Variable {
            name,
            ty,
            scope,
            owner: self.current_function(),
            value: None,
            span,
        });
        if let Some(block) = self.frames.last_mut().and_then(|frame| frame.blocks.last_mut()) {
            block.insert(name, id);
        }
        id
    }

    /// Innermost variable named `name` and the depth of the frame owning it
    fn lookup(&self, name: InternedString) -> Option<(usize, VarId)> {
        self.frames.iter().enumerate().rev().find_map(|(depth, frame)| {
            frame
                .blocks
                .iter()
                .rev()
                .find_map(|block| block.get(&name).copied())
                .map(|id| (depth, id))
        })
    }

    pub(crate) fn lookup_variable(&self, name: InternedString) -> Option<VarId> {
        self.lookup(name).map(|(_, id)| id)
    }

    /// Reading `variable` from a deeper frame captures it in every function
    /// between its owner and the reader.
    fn capture_if_outer(&mut self, owner_depth: usize, variable: VarId) {
        let top = self.frames.len().saturating_sub(1);
        if owner_depth >= top {
            return;
        }
        let bound_to = self.variables[variable.index()].value;
        let mut source = CaptureSource::Local;
        for level in owner_depth + 1..=top {
            let Some(function) = self.frames[level].function else {
                continue;
            };
            if bound_to == Some(function) {
                // A function naming itself needs no capture.
                source = CaptureSource::Local;
                continue;
            }
            let index = self.capture(function, variable, source);
            source = CaptureSource::Parent(index);
        }
    }

    /// Make `function` capture `variable`; every existing version becomes a
    /// closure, and versions created later are closures from the start.
    pub fn capture(&mut self, function: FunctionId, variable: VarId, source: CaptureSource) -> usize {
        let name = self.variables[variable.index()].name;
        let target = self.functions.get_mut(function);
        if let Some(index) = target.capture_index(variable) {
            return index;
        }
        log::debug!("[CAPTURE] {} captures `{}` ({:?})", target.display_name(), name, source);
        target.captures.push(Capture { name, variable, source });
        let index = target.captures.len() - 1;
        self.promote_to_closure(function);
        index
    }

    /// Every existing version of `function` becomes closure kind
    pub(crate) fn promote_to_closure(&mut self, function: FunctionId) {
        let registry = &mut self.registry;
        for version in self.functions.get_mut(function).all_versions_mut() {
            version.ty = registry.as_closure(version.ty);
        }
    }

    // ====== STATEMENTS ======

    pub(crate) fn analyze_block(&mut self, block: &mut TypedBlock) -> TypeId {
        self.enter_block();
        let mut value = TypeId::VOID;
        for statement in &mut block.statements {
            value = self.analyze_statement(statement);
        }
        self.leave_block();
        value
    }

    fn analyze_statement(&mut self, statement: &mut TypedStmt) -> TypeId {
        let span = statement.span;
        let value = match &mut statement.node {
            TypedStatement::Expression(expr) => {
                self.analyze_expression(expr);
                expr.ty
            }
            TypedStatement::Let { name, value } => {
                self.analyze_let(*name, value, span);
                TypeId::VOID
            }
            TypedStatement::Return(value) => {
                let returned = match value {
                    Some(expr) => {
                        self.analyze_expression(expr);
                        self.check_value(expr.ty, expr.span, "return")
                    }
                    None => TypeId::VOID,
                };
                if let Some(frame) = self.frames.last_mut() {
                    frame.returns.push(returned);
                }
                TypeId::NEVER
            }
        };
        statement.ty = value;
        value
    }

    fn analyze_let(&mut self, name: InternedString, value: &mut TypedExpr, span: Span) {
        if let TypedExpression::Function(literal) = &mut value.node {
            // Declared before the literal is analyzed so the body can call
            // itself by name.
            let variable = self.declare(name, TypeId::NEVER, VarScope::Local, span);
            let function = self.register_function(literal, value.span);
            self.functions.get_mut(function).name.get_or_insert(name);
            self.variables[variable.index()].value = Some(function);
            self.ensure_default_version(function);
            let ty = self.function_value_type(function);
            value.ty = ty;
            self.variables[variable.index()].ty = ty;
            return;
        }
        self.analyze_expression(value);
        let ty = self.check_value(value.ty, value.span, &name.to_string());
        let ty = self.registry.not_temporary(ty);
        self.declare(name, ty, VarScope::Local, span);
    }

    /// `never` instead of a possibly `void` type where a value is needed,
    /// with a diagnostic
    pub(crate) fn check_value(&mut self, ty: TypeId, span: Span, receiver: &str) -> TypeId {
        let void = self.registry.alternatives(ty).into_iter().any(|t| self.registry.is_void(t));
        if !void {
            return ty;
        }
        self.diagnostics.report(ErrorKind::CantAssignVoid, span).param(receiver).emit();
        TypeId::NEVER
    }

    // ====== EXPRESSIONS ======

    pub(crate) fn analyze_expression(&mut self, expr: &mut TypedExpr) {
        let span = expr.span;
        let ty = match &mut expr.node {
            TypedExpression::Literal(literal) => self.literal_type(literal),
            TypedExpression::Variable(name) => self.analyze_variable(*name, span),
            TypedExpression::Array(elements) => {
                let element = self.analyze_elements(elements, "array element");
                self.registry.tmp_array(element)
            }
            TypedExpression::Set(elements) => {
                let element = self.analyze_elements(elements, "set element");
                let set = self.registry.set(element);
                self.registry.temporary(set)
            }
            TypedExpression::Map(entries) => self.analyze_map(entries),
            TypedExpression::Interval(start, end) => {
                self.analyze_expression(start);
                self.analyze_expression(end);
                self.check_value(start.ty, start.span, "interval bound");
                self.check_value(end.ty, end.span, "interval bound");
                TypeId::INTERVAL
            }
            TypedExpression::Binary(binary) => self.analyze_binary(binary, span),
            TypedExpression::Unary(unary) => self.analyze_unary(unary, span),
            TypedExpression::If(branch) => self.analyze_if(branch),
            TypedExpression::Block(block) => self.analyze_block(block),
            TypedExpression::Function(literal) => {
                let function = self.register_function(literal, span);
                self.ensure_default_version(function);
                self.function_value_type(function)
            }
            TypedExpression::Call(call) => self.analyze_call(call, span),
            TypedExpression::ObjectAccess(access) => self.analyze_object_access(access, span),
            TypedExpression::Index(collection, key) => self.analyze_index(collection, key, span),
        };
        expr.ty = ty;
    }

    fn literal_type(&mut self, literal: &TypedLiteral) -> TypeId {
        match literal {
            TypedLiteral::Null => TypeId::NULL,
            TypedLiteral::Boolean(_) => TypeId::BOOLEAN,
            TypedLiteral::Integer(_) => TypeId::INTEGER,
            TypedLiteral::Long(_) => TypeId::LONG,
            TypedLiteral::Real(_) => TypeId::REAL,
            TypedLiteral::Mpz(_) => self.registry.temporary(TypeId::MPZ),
            TypedLiteral::String(_) => self.registry.temporary(TypeId::STRING),
        }
    }

    fn analyze_variable(&mut self, name: InternedString, span: Span) -> TypeId {
        if let Some((depth, variable)) = self.lookup(name) {
            self.capture_if_outer(depth, variable);
            let Variable { value, ty, .. } = self.variables[variable.index()];
            return match value {
                Some(function) => self.function_value_type(function),
                None => ty,
            };
        }
        if self.library.module(name).is_some() {
            return self.registry.class(name);
        }
        self.diagnostics
            .report(ErrorKind::UndefinedVariable, span)
            .param(name.to_string())
            .emit();
        TypeId::NEVER
    }

    /// Element type of a literal: the join of its elements, no longer temporary
    fn analyze_elements(&mut self, elements: &mut [TypedExpr], what: &str) -> TypeId {
        let mut element = TypeId::NEVER;
        for expr in elements.iter_mut() {
            self.analyze_expression(expr);
            expr.ty = self.check_value(expr.ty, expr.span, what);
            if self.options.box_array_functions {
                self.box_function_value(expr.ty);
            }
            element = self.registry.join(element, expr.ty);
        }
        self.registry.not_temporary(element)
    }

    /// Function values stored in a container may be called dynamically
    fn box_function_value(&mut self, ty: TypeId) {
        if let Some(function) = self.registry.bound_function(ty) {
            let arity = self.functions.get(function).parameters.len();
            self.will_take(function, &vec![TypeId::ANY; arity], 1);
        }
    }

    fn analyze_map(&mut self, entries: &mut [(TypedExpr, TypedExpr)]) -> TypeId {
        let (mut key, mut element) = (TypeId::NEVER, TypeId::NEVER);
        for (k, v) in entries.iter_mut() {
            self.analyze_expression(k);
            self.analyze_expression(v);
            k.ty = self.check_value(k.ty, k.span, "map key");
            v.ty = self.check_value(v.ty, v.span, "map value");
            key = self.registry.join(key, k.ty);
            element = self.registry.join(element, v.ty);
        }
        let key = self.registry.not_temporary(key);
        let element = self.registry.not_temporary(element);
        let map = self.registry.map(key, element);
        self.registry.temporary(map)
    }

    fn analyze_if(&mut self, branch: &mut TypedIf) -> TypeId {
        self.analyze_expression(&mut branch.condition);
        self.check_value(branch.condition.ty, branch.condition.span, "condition");
        let then = self.analyze_block(&mut branch.then_branch);
        match &mut branch.else_branch {
            Some(otherwise) => {
                let otherwise = self.analyze_block(otherwise);
                self.registry.join(then, otherwise)
            }
            None if self.registry.is_void(then) => TypeId::VOID,
            None => self.registry.join(then, TypeId::NULL),
        }
    }

    fn analyze_index(&mut self, collection: &mut TypedExpr, key: &mut TypedExpr, span: Span) -> TypeId {
        self.analyze_expression(collection);
        self.analyze_expression(key);
        if let Some(placeholder) = self.registry.placeholder_in(collection.ty) {
            return placeholder;
        }
        let folded = self.registry.fold(collection.ty);
        let numeric_key = self.registry.is_number(key.ty)
            || self.registry.is_any(key.ty)
            || self.registry.is_never(key.ty)
            || self.registry.is_placeholder(key.ty);
        match self.registry.kind(folded).clone() {
            TypeKind::Array(_) | TypeKind::String | TypeKind::Interval if !numeric_key => {
                self.diagnostics
                    .report(ErrorKind::ArrayAccessKeyMustBeNumber, span)
                    .focus(key.span)
                    .param(self.registry.display(key.ty).to_string())
                    .emit();
                TypeId::NEVER
            }
            TypeKind::Array(element) => element,
            TypeKind::Map { element, .. } => element,
            TypeKind::String => TypeId::STRING,
            TypeKind::Interval => TypeId::INTEGER,
            TypeKind::Any => TypeId::ANY,
            TypeKind::Never => TypeId::NEVER,
            _ => {
                self.diagnostics
                    .report(ErrorKind::ValueNotIndexable, span)
                    .focus(collection.span)
                    .param(self.registry.display(collection.ty).to_string())
                    .emit();
                TypeId::NEVER
            }
        }
    }

    // ====== FUNCTIONS ======

    /// Function behind a literal, created the first time the literal is seen.
    /// Default values are analyzed here, in the defining scope.
    pub(crate) fn register_function(&mut self, literal: &mut TypedFunction, span: Span) -> FunctionId {
        if let Some(id) = literal.id {
            return id;
        }
        let mut default_types = Vec::with_capacity(literal.parameters.len());
        for parameter in &mut literal.parameters {
            default_types.push(match &mut parameter.default {
                Some(default) => {
                    self.analyze_expression(default);
                    let ty = self.check_value(default.ty, default.span, "default value");
                    Some(self.registry.canonical(ty))
                }
                None => None,
            });
        }
        let parameters = literal.parameters.iter().map(|p| p.name).collect::<Vec<_>>();
        let placeholders = parameters
            .iter()
            .map(|_| self.registry.placeholder(PlaceholderKind::Parameter))
            .collect();
        let parent = self.current_function();
        let id = self.functions.add(parameters, literal.body.clone(), self.frames.clone(), span);
        let function = self.functions.get_mut(id);
        function.default_types = default_types;
        function.placeholders = placeholders;
        function.parent = parent;
        literal.id = Some(id);
        log::trace!("[FUNCTION] registered {:?} (parent {:?})", id, parent);
        id
    }

    /// Type of a function used as a value: its default version's type
    pub(crate) fn function_value_type(&mut self, function: FunctionId) -> TypeId {
        let f = self.functions.get(function);
        match f.default_type() {
            Some(ty) => ty,
            None => {
                // Default version still being analyzed.
                let signature = FunctionType {
                    arguments: f.placeholders.clone(),
                    return_type: TypeId::ANY,
                    closure: f.is_closure(),
                    function: Some(function),
                };
                self.registry.function_type(signature)
            }
        }
    }
}

impl Default for SemanticAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
