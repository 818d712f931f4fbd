//! # Function Specialization
//!
//! `will_take` makes a user function accept a tuple of argument types by
//! producing (or reusing) a version analyzed with exactly those types.
//!
//! - Versions are memoized on the canonical argument tuple, after trailing
//!   default values are appended.
//! - Tuples that still contain placeholders are not specialized; the default
//!   version answers for them.
//! - A version asked for while it is being analyzed answers with a provisional
//!   return type. The first pass uses a recursion placeholder; when the body
//!   turns out to be recursive it is analyzed again with the return type found
//!   by the previous pass, until the type stops changing. A recursion
//!   placeholder nested inside the result (`array<?R>`) becomes `any`.
//! - `level > 1` drills into curried calls: `f(a)(b)` specializes the function
//!   returned by the current version of `f`.

use crate::arena::InternedString;
use crate::callable::{Callable, CallableVersion, Implementation, ResolutionHost};
use crate::diagnostics::ErrorKind;
use crate::function::{FunctionId, FunctionVersion, VersionRef, VersionSlot};
use crate::semantic_analyzer::{Frame, SemanticAnalyzer, VarScope};
use crate::type_registry::{FunctionType, PlaceholderKind, TypeId, TypeRegistry};
use crate::typed_ast::TypedBlock;

/// Outcome of asking a function to take some argument types
#[derive(Debug, Clone, PartialEq)]
pub enum Specialization {
    /// This version handles the call
    Ready(VersionRef),
    /// Arguments not known well enough; the default version handles the call
    Deferred,
    /// The version is being analyzed right now
    InFlight { version: VersionRef, provisional: TypeId },
    /// The arguments cannot fill the parameters
    Mismatch,
}

/// Version under analysis
#[derive(Debug, Clone)]
pub(crate) struct InFlight {
    version: VersionRef,
    provisional: TypeId,
    /// The body reached this version again
    hit: bool,
}

impl SemanticAnalyzer {
    /// Make `function` (or, for `level > 1`, the function it returns
    /// `level - 1` calls deep) accept `arguments`.
    pub fn will_take(&mut self, function: FunctionId, arguments: &[TypeId], level: usize) -> Specialization {
        if level > 1 {
            return self.will_take_nested(function, arguments, level);
        }
        self.ensure_default_version(function);
        let key = self.specialization_key(function, arguments);
        if key.len() != self.functions.get(function).parameters.len() {
            return Specialization::Mismatch;
        }
        if let Some(state) = self.in_flight.get_mut(&(function, key.clone())) {
            state.hit = true;
            return Specialization::InFlight { version: state.version.clone(), provisional: state.provisional };
        }
        if let Some(found) = self.functions.get(function).lookup(&key) {
            return Specialization::Ready(found);
        }
        if key.iter().any(|ty| self.registry.has_unresolved(*ty)) {
            return Specialization::Deferred;
        }
        if self.depth >= self.options.max_specialization_depth {
            let f = self.functions.get(function);
            self.diagnostics
                .report(ErrorKind::SpecializationTooDeep, f.span)
                .param(f.display_name())
                .param(self.depth.to_string())
                .emit();
            return Specialization::Deferred;
        }

        log::debug!(
            "[SPECIALIZE] {}({})",
            self.functions.get(function).display_name(),
            self.registry.display_list(&key)
        );
        // Reserve the slot first so recursive calls can name it.
        let reserved = FunctionVersion {
            arguments: key.clone(),
            ty: self.registry.function(key.clone(), TypeId::ANY),
            return_type: TypeId::ANY,
            body: TypedBlock::default(),
            returns_function: None,
            recursive: false,
            throws: false,
        };
        let slot = self.functions.get_mut(function).insert_version(reserved);
        let version = self.build_version(function, key, slot.clone());
        if let Some(entry) = self.functions.get_mut(function).get_mut(&slot) {
            *entry = version;
        }
        Specialization::Ready(VersionRef { function, slot })
    }

    fn will_take_nested(&mut self, function: FunctionId, arguments: &[TypeId], level: usize) -> Specialization {
        let Some(outer) = self.current_version_ref(function) else {
            return Specialization::Deferred;
        };
        let Some(inner) = self.functions.version(&outer).and_then(|version| version.returns_function) else {
            return Specialization::Deferred;
        };
        let result = self.will_take(inner, arguments, level - 1);
        let returned = if level == 2 {
            self.version_type(inner, arguments)
        } else {
            self.current_type(inner)
        };
        // The outer version now returns the specialized inner function.
        let closure = self.functions.get(function).is_closure();
        if let Some(version) = self.functions.get_mut(function).get_mut(&outer.slot) {
            version.return_type = returned;
            version.ty = self.registry.function_type(FunctionType {
                arguments: version.arguments.clone(),
                return_type: returned,
                closure,
                function: Some(function),
            });
        }
        result
    }

    /// Remember which version the next nested call goes through
    pub fn set_version(&mut self, function: FunctionId, arguments: &[TypeId], level: usize) {
        if level <= 1 {
            let key = self.specialization_key(function, arguments);
            self.functions.get_mut(function).current_version = Some(key);
            return;
        }
        let inner = self
            .current_version_ref(function)
            .and_then(|outer| self.functions.version(&outer))
            .and_then(|version| version.returns_function);
        if let Some(inner) = inner {
            self.set_version(inner, arguments, level - 1);
        }
    }

    fn current_version_ref(&self, function: FunctionId) -> Option<VersionRef> {
        let f = self.functions.get(function);
        match &f.current_version {
            Some(key) => f.lookup(key),
            None => f.default_version().map(|_| VersionRef { function, slot: VersionSlot::Default }),
        }
    }

    fn current_type(&mut self, function: FunctionId) -> TypeId {
        let current = self
            .current_version_ref(function)
            .and_then(|r| self.functions.version(&r))
            .map(|version| version.ty);
        match current {
            Some(ty) => ty,
            None => self.function_value_type(function),
        }
    }

    /// Type of the version `function` uses for `arguments`: the specialized
    /// one, the provisional one while in flight, the default one otherwise.
    pub fn version_type(&mut self, function: FunctionId, arguments: &[TypeId]) -> TypeId {
        let key = self.specialization_key(function, arguments);
        if let Some(state) = self.in_flight.get(&(function, key.clone())) {
            let provisional = state.provisional;
            let closure = self.functions.get(function).is_closure();
            return self.registry.function_type(FunctionType {
                arguments: key,
                return_type: provisional,
                closure,
                function: Some(function),
            });
        }
        let f = self.functions.get(function);
        let found = f.lookup(&key).and_then(|found| f.get(&found.slot)).map(|version| version.ty);
        match found {
            Some(ty) => ty,
            None => self.function_value_type(function),
        }
    }

    /// Canonical arguments with trailing defaults appended
    pub(crate) fn specialization_key(&mut self, function: FunctionId, arguments: &[TypeId]) -> Vec<TypeId> {
        let canonical: Vec<TypeId> = arguments.iter().map(|ty| self.registry.canonical(*ty)).collect();
        self.functions.get(function).fill_defaults(&canonical)
    }

    /// Analyze the default version once, keyed by the parameter placeholders
    pub(crate) fn ensure_default_version(&mut self, function: FunctionId) {
        let f = self.functions.get(function);
        if f.default_version().is_some() {
            return;
        }
        let key = f.placeholders.clone();
        if self.in_flight.contains_key(&(function, key.clone())) {
            return;
        }
        let version = self.build_version(function, key, VersionSlot::Default);
        self.functions.get_mut(function).set_default_version(version);
    }

    /// Analyze a fresh copy of the body with parameters typed `arguments`,
    /// inside the scope chain of the function's definition.
    fn build_version(&mut self, function: FunctionId, arguments: Vec<TypeId>, slot: VersionSlot) -> FunctionVersion {
        let (mut body, parameters, environment) = {
            let f = self.functions.get(function);
            (f.body.clone(), f.parameters.clone(), f.environment.clone())
        };
        let key = (function, arguments.clone());
        let recursion = self.registry.placeholder(PlaceholderKind::Recursion);
        self.in_flight.insert(
            key.clone(),
            InFlight { version: VersionRef { function, slot }, provisional: recursion, hit: false },
        );
        let outer = std::mem::replace(&mut self.frames, environment);
        self.depth += 1;

        let mut recursive = false;
        let mut passes = 0;
        let (return_type, throws) = loop {
            passes += 1;
            let (returned, throws) = self.analyze_body(function, &parameters, &arguments, &mut body);
            let returned = self.registry.without_recursion(returned);
            let Some(state) = self.in_flight.get_mut(&key) else {
                break (returned, throws);
            };
            if !state.hit {
                break (returned, throws);
            }
            recursive = true;
            if state.provisional == returned {
                break (returned, throws);
            }
            if passes >= self.options.max_recursion_passes {
                log::warn!(
                    "[SPECIALIZE] recursive {:?} did not settle after {} passes; returning {}",
                    function,
                    passes,
                    self.registry.display(returned)
                );
                break (returned, throws);
            }
            log::trace!("[SPECIALIZE] recursive {:?}: pass {} returned {}", function, passes, self.registry.display(returned));
            state.provisional = returned;
            state.hit = false;
        };

        self.depth -= 1;
        self.frames = outer;
        self.in_flight.remove(&key);
        if recursive {
            self.functions.get_mut(function).recursive = true;
        }
        let returns_closure = self.registry.signature(return_type).map_or(false, |signature| signature.closure);
        if returns_closure && !self.functions.get(function).returns_closure {
            // The returned closure's environment is built from this frame.
            self.functions.get_mut(function).returns_closure = true;
            self.promote_to_closure(function);
        }
        let closure = self.functions.get(function).is_closure();
        let ty = self.registry.function_type(FunctionType {
            arguments: arguments.clone(),
            return_type,
            closure,
            function: Some(function),
        });
        let returns_function = body.single_function().and_then(|literal| literal.id);
        FunctionVersion { arguments, ty, return_type, body, returns_function, recursive, throws }
    }

    /// Returned type of the body: explicit returns joined with the trailing value
    fn analyze_body(
        &mut self,
        function: FunctionId,
        parameters: &[InternedString],
        arguments: &[TypeId],
        body: &mut TypedBlock,
    ) -> (TypeId, bool) {
        let span = self.functions.get(function).span;
        self.frames.push(Frame::new(Some(function)));
        for (name, ty) in parameters.iter().zip(arguments) {
            self.declare(*name, *ty, VarScope::Parameter, span);
        }
        let value = self.analyze_block(body);
        let (returns, throws) = self
            .frames
            .pop()
            .map(|frame| (frame.returns, frame.throws))
            .unwrap_or_default();
        let returned = self.registry.join_all(returns.into_iter().chain(std::iter::once(value)));
        (returned, throws)
    }

    /// Every version of a user function as an overload set
    pub(crate) fn function_callable(&mut self, function: FunctionId) -> Callable {
        let name = self.functions.get(function).display_name();
        let mut callable = Callable::new(name.clone());
        if self.functions.get(function).default_version().is_none() {
            let ty = self.function_value_type(function);
            let version = VersionRef { function, slot: VersionSlot::Default };
            callable.add_version(CallableVersion::new(name.clone(), ty, Implementation::User(version)));
        }
        for (slot, version) in self.functions.get(function).all_versions() {
            let mut candidate = CallableVersion::new(
                name.clone(),
                version.ty,
                Implementation::User(VersionRef { function, slot }),
            );
            candidate.flags.throws = version.throws;
            callable.add_version(candidate);
        }
        callable
    }
}

impl ResolutionHost for SemanticAnalyzer {
    fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    fn registry_mut(&mut self) -> &mut TypeRegistry {
        &mut self.registry
    }

    fn specialize(&mut self, function: FunctionId, arguments: &[TypeId]) -> TypeId {
        self.will_take(function, arguments, 1);
        self.version_type(function, arguments)
    }

    fn default_argument(&self, function: FunctionId, index: usize) -> Option<TypeId> {
        self.functions.get(function).default_types.get(index).copied().flatten()
    }
}
