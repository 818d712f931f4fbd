//! # Call Sites
//!
//! Drives one call expression (plain call, method call, operator):
//!
//! 1. Analyze the callee and the arguments, left to right.
//! 2. A placeholder in the callee or an argument defers the call: its result
//!    is that placeholder and it is dispatched dynamically.
//! 3. A user function callee is asked to take the arguments (curried callees
//!    forward the request one level deeper).
//! 4. The callee type gives an overload set, which is resolved.
//! 5. The chosen version's mutators update the receiver variable, and user
//!    functions passed as function-typed arguments are specialized for the
//!    parameter's argument types.

use std::rc::Rc;

use crate::arena::InternedString;
use crate::callable::{Callable, CallableVersion, Implementation, TypeMutator};
use crate::diagnostics::ErrorKind;
use crate::error::AnalysisError;
use crate::semantic_analyzer::SemanticAnalyzer;
use crate::source::Span;
use crate::specialization::Specialization;
use crate::type_registry::{TypeId, TypeKind};
use crate::typed_ast::*;

impl SemanticAnalyzer {
    pub(crate) fn analyze_call(&mut self, call: &mut TypedCall, span: Span) -> TypeId {
        if matches!(call.callee.node, TypedExpression::ObjectAccess(_)) {
            return self.analyze_method_call(call, span);
        }
        self.analyze_expression(&mut call.callee);
        let arguments = self.analyze_arguments(&mut call.arguments);

        if let Some(deferred) = self.deferred_by(Some(call.callee.ty), &arguments) {
            call.resolved = Some(ResolvedCall::dynamic(false));
            return deferred;
        }

        match self.callee_will_take(&mut call.callee, &arguments, 1) {
            Specialization::InFlight { version, provisional } => {
                // Recursive call into the version being analyzed.
                let ty = self.version_type(version.function, &arguments);
                let name = self.functions.get(version.function).display_name();
                let version = CallableVersion::new(name, ty, Implementation::User(version));
                call.resolved = Some(ResolvedCall::of(version, false));
                return provisional;
            }
            _ => self.set_callee_version(&call.callee, &arguments, 1),
        }

        let callee_ty = call.callee.ty;
        let Some(callable) = self.callable_of(callee_ty) else {
            self.diagnostics
                .report(ErrorKind::CannotCallValue, span)
                .focus(call.callee.span)
                .param(self.registry.display(callee_ty).to_string())
                .emit();
            return TypeId::NEVER;
        };
        match callable.resolve(self, &arguments) {
            Ok(resolved) => {
                let (returned, resolved) = self.apply_resolution(resolved.version, &mut call.arguments, None);
                call.resolved = Some(resolved);
                returned
            }
            Err(error) => {
                self.report_call_failure(&error, &call.callee, &arguments, span);
                TypeId::NEVER
            }
        }
    }

    fn analyze_method_call(&mut self, call: &mut TypedCall, span: Span) -> TypeId {
        let TypedExpression::ObjectAccess(access) = &mut call.callee.node else {
            return TypeId::NEVER;
        };
        self.analyze_expression(&mut access.object);
        let receiver = access.object.ty;
        let field = access.field;
        let arguments = self.analyze_arguments(&mut call.arguments);
        let library = Rc::clone(&self.library);

        if let Some(deferred) = self.deferred_by(Some(receiver), &arguments) {
            call.resolved = Some(ResolvedCall::dynamic(true));
            call.callee.ty = deferred;
            return deferred;
        }

        if let TypeKind::Class(class) = self.registry.kind(receiver).clone() {
            let found = library.module(class).and_then(|module| module.static_method(field));
            let Some(callable) = found else {
                self.report_static_not_found(class, field, &arguments, span);
                return TypeId::NEVER;
            };
            return match callable.resolve(self, &arguments) {
                Ok(resolved) => {
                    call.callee.ty = resolved.version.ty;
                    let (returned, resolved) =
                        self.apply_resolution(resolved.version, &mut call.arguments, None);
                    call.resolved = Some(resolved);
                    returned
                }
                Err(error) => {
                    if !self.report_conflict(&error, span) {
                        self.report_static_not_found(class, field, &arguments, span);
                    }
                    TypeId::NEVER
                }
            };
        }

        let folded = self.registry.fold(receiver);
        if self.registry.is_any(folded) {
            // Unknown receiver: dispatched at runtime.
            self.mark_must_return_any(&call.arguments);
            call.resolved = Some(ResolvedCall::dynamic(true));
            call.callee.ty = TypeId::ANY;
            return TypeId::ANY;
        }
        if self.registry.is_never(folded) {
            return TypeId::NEVER;
        }

        let found = library.module_for(&self.registry, folded).and_then(|module| module.method(field));
        let mut with_receiver = Vec::with_capacity(arguments.len() + 1);
        with_receiver.push(receiver);
        with_receiver.extend_from_slice(&arguments);
        let resolved = match found {
            Some(callable) => callable.resolve(self, &with_receiver),
            None => Err(AnalysisError::unresolvable(field.to_string(), String::new(), None)),
        };
        match resolved {
            Ok(resolved) => {
                let version_ty = resolved.version.ty;
                let TypedExpression::ObjectAccess(access) = &mut call.callee.node else {
                    return TypeId::NEVER;
                };
                let (returned, resolved) =
                    self.apply_resolution(resolved.version, &mut call.arguments, Some(&access.object));
                call.callee.ty = version_ty;
                call.resolved = Some(resolved);
                returned
            }
            Err(error) => {
                if !self.report_conflict(&error, span) {
                    self.diagnostics
                        .report(ErrorKind::MethodNotFound, span)
                        .param(self.registry.display(receiver).to_string())
                        .param(field.to_string())
                        .param(self.registry.display_list(&arguments))
                        .emit();
                }
                TypeId::NEVER
            }
        }
    }

    /// `object.field` read outside a call
    pub(crate) fn analyze_object_access(&mut self, access: &mut TypedObjectAccess, span: Span) -> TypeId {
        self.analyze_expression(&mut access.object);
        let receiver = access.object.ty;
        if let Some(placeholder) = self.registry.placeholder_in(receiver) {
            return placeholder;
        }
        let library = Rc::clone(&self.library);
        // A method read through its class is a function value.
        let method = match self.registry.kind(receiver).clone() {
            TypeKind::Class(class) => library
                .module(class)
                .and_then(|module| module.static_method(access.field))
                .and_then(|callable| callable.versions.first())
                .map(|version| version.ty),
            _ => None,
        };
        if let Some(ty) = method {
            return ty;
        }
        let folded = self.registry.fold(receiver);
        if self.registry.is_any(folded) || self.registry.is_never(folded) {
            return folded;
        }
        self.diagnostics
            .report(ErrorKind::MethodNotFound, span)
            .focus(access.field_span)
            .param(self.registry.display(receiver).to_string())
            .param(access.field.to_string())
            .param("")
            .emit();
        TypeId::NEVER
    }

    pub(crate) fn analyze_binary(&mut self, binary: &mut TypedBinary, span: Span) -> TypeId {
        self.analyze_expression(&mut binary.left);
        self.analyze_expression(&mut binary.right);
        let operands = [
            self.check_value(binary.left.ty, binary.left.span, "operand"),
            self.check_value(binary.right.ty, binary.right.span, "operand"),
        ];
        let returned = self.resolve_operator(
            binary.op.symbol(),
            self.library.operator(binary.op).cloned(),
            &operands,
            &mut binary.resolved,
            span,
        );
        let mutators = binary
            .resolved
            .as_ref()
            .and_then(|resolved| resolved.version.as_ref())
            .map(|version| version.mutators.clone())
            .unwrap_or_default();
        if let TypedExpression::Variable(target) = &binary.left.node {
            for mutator in mutators {
                self.apply_mutator(mutator, *target, binary.right.ty);
            }
        }
        returned
    }

    pub(crate) fn analyze_unary(&mut self, unary: &mut TypedUnary, span: Span) -> TypeId {
        self.analyze_expression(&mut unary.operand);
        let operand = [self.check_value(unary.operand.ty, unary.operand.span, "operand")];
        self.resolve_operator(unary.op.symbol(), self.library.unary_operator(unary.op).cloned(), &operand, &mut unary.resolved, span)
    }

    fn resolve_operator(
        &mut self,
        symbol: &str,
        callable: Option<Callable>,
        operands: &[TypeId],
        slot: &mut Option<ResolvedCall>,
        span: Span,
    ) -> TypeId {
        if let Some(deferred) = self.deferred_by(None, operands) {
            *slot = Some(ResolvedCall::dynamic(false));
            return deferred;
        }
        let resolved = match callable {
            Some(callable) => callable.resolve(self, operands),
            None => Err(AnalysisError::unresolvable(symbol, String::new(), None)),
        };
        match resolved {
            Ok(resolved) => {
                let returned = resolved.version.return_type(&self.registry);
                *slot = Some(ResolvedCall::of(resolved.version, false));
                returned
            }
            Err(_) if operands.iter().any(|ty| self.registry.is_any(*ty)) => {
                // Boxed operands: the runtime picks the operation.
                *slot = Some(ResolvedCall::dynamic(false));
                TypeId::ANY
            }
            Err(error) => {
                if !self.report_conflict(&error, span) {
                    self.diagnostics
                        .report(ErrorKind::NoSuchOperator, span)
                        .param(symbol)
                        .param(self.registry.display_list(operands))
                        .emit();
                }
                TypeId::NEVER
            }
        }
    }

    fn analyze_arguments(&mut self, arguments: &mut [TypedExpr]) -> Vec<TypeId> {
        arguments
            .iter_mut()
            .map(|argument| {
                self.analyze_expression(argument);
                argument.ty = self.check_value(argument.ty, argument.span, "argument");
                argument.ty
            })
            .collect()
    }

    /// First placeholder among the callee and arguments, which the call's
    /// result stands for until the enclosing version is specialized
    fn deferred_by(&self, callee: Option<TypeId>, arguments: &[TypeId]) -> Option<TypeId> {
        callee
            .and_then(|ty| self.registry.placeholder_in(ty))
            .or_else(|| arguments.iter().find_map(|ty| self.registry.placeholder_in(*ty)))
    }

    /// Ask the user function behind `callee` to take `arguments`
    fn callee_will_take(&mut self, callee: &mut TypedExpr, arguments: &[TypeId], level: usize) -> Specialization {
        if let TypedExpression::Call(inner) = &mut callee.node {
            let result = self.callee_will_take(&mut inner.callee, arguments, level + 1);
            // The inner call may now return a specialized function.
            if let Some(function) = self.registry.bound_function(inner.callee.ty) {
                let key = self.specialization_key(function, &inner.argument_types());
                let f = self.functions.get(function);
                let version = f.lookup(&key).and_then(|found| f.get(&found.slot));
                if let Some(version) = version {
                    callee.ty = version.return_type;
                    if let Some(resolved) = inner.resolved.as_mut().and_then(|r| r.version.as_mut()) {
                        resolved.ty = version.ty;
                    }
                }
            }
            return result;
        }
        if level == 1 {
            if let Some(result) = self.indexed_will_take(callee, arguments, 0) {
                return result;
            }
        }
        match self.registry.bound_function(callee.ty) {
            Some(function) => self.will_take(function, arguments, level),
            None => Specialization::Deferred,
        }
    }

    /// Specialize the functions reached by indexing into nested array
    /// literals (`[[f]][0][0](x)`), then retype the literals and the index
    /// chain. `None` when the chain does not end at an array literal.
    fn indexed_will_take(&mut self, expr: &mut TypedExpr, arguments: &[TypeId], depth: usize) -> Option<Specialization> {
        if matches!(expr.node, TypedExpression::Array(_)) {
            if depth == 0 {
                return None;
            }
            return Some(self.elements_will_take(expr, arguments, depth - 1));
        }
        let TypedExpression::Index(collection, _) = &mut expr.node else {
            return None;
        };
        let result = self.indexed_will_take(collection, arguments, depth + 1)?;
        let folded = self.registry.fold(collection.ty);
        if let Some(element) = self.registry.element(folded) {
            expr.ty = element;
        }
        Some(result)
    }

    /// `level` is the number of nested literals between `array` and the
    /// function elements. The element type is recomputed as the meet of the
    /// specialized elements.
    fn elements_will_take(&mut self, array: &mut TypedExpr, arguments: &[TypeId], level: usize) -> Specialization {
        let TypedExpression::Array(elements) = &mut array.node else {
            return Specialization::Deferred;
        };
        let mut result = Specialization::Deferred;
        for element in elements.iter_mut() {
            if level > 0 && matches!(element.node, TypedExpression::Array(_)) {
                result = self.elements_will_take(element, arguments, level - 1);
            } else if let Some(function) = self.registry.bound_function(element.ty) {
                result = self.will_take(function, arguments, 1);
                element.ty = self.version_type(function, arguments);
            }
        }
        let mut types = elements.iter().map(|element| element.ty);
        let Some(first) = types.next() else {
            return result;
        };
        let narrowed = types.fold(first, |acc, ty| self.registry.meet(acc, ty));
        let narrowed = self.registry.not_temporary(narrowed);
        array.ty = self.registry.tmp_array(narrowed);
        result
    }

    fn set_callee_version(&mut self, callee: &TypedExpr, arguments: &[TypeId], level: usize) {
        match &callee.node {
            TypedExpression::Call(inner) => self.set_callee_version(&inner.callee, arguments, level + 1),
            _ => {
                if let Some(function) = self.registry.bound_function(callee.ty) {
                    self.set_version(function, arguments, level);
                }
            }
        }
    }

    /// Overload set of a callee type; `None` when the value cannot be called
    fn callable_of(&mut self, ty: TypeId) -> Option<Callable> {
        let folded = self.registry.fold(ty);
        match self.registry.kind(folded).clone() {
            TypeKind::Function(signature) => Some(match signature.function {
                Some(function) => self.function_callable(function),
                None => Callable::new("<value>")
                    .with_version(CallableVersion::new("<value>", ty, Implementation::Value)),
            }),
            TypeKind::Any => {
                let unknown = self.registry.function(Vec::new(), TypeId::ANY);
                Some(Callable::new("<dynamic>").with_version(CallableVersion::unknown("<dynamic>", unknown)))
            }
            TypeKind::Never => {
                let unreachable = self.registry.function(Vec::new(), TypeId::NEVER);
                Some(Callable::new("<never>").with_version(CallableVersion::unknown("<never>", unreachable)))
            }
            _ => None,
        }
    }

    /// Effects of the chosen version on the call's surroundings
    fn apply_resolution(
        &mut self,
        version: CallableVersion,
        arguments: &mut [TypedExpr],
        receiver: Option<&TypedExpr>,
    ) -> (TypeId, ResolvedCall) {
        let with_receiver = receiver.is_some();
        let offset = usize::from(with_receiver);

        if !version.mutators.is_empty() {
            let (target, stored) = match receiver {
                Some(receiver) => (Some(receiver), arguments.first().map(|a| a.ty)),
                None => (arguments.first(), arguments.get(1).map(|a| a.ty)),
            };
            let target = target.and_then(|t| match &t.node {
                TypedExpression::Variable(name) => Some(*name),
                _ => None,
            });
            if let (Some(target), Some(stored)) = (target, stored) {
                for mutator in &version.mutators {
                    self.apply_mutator(*mutator, target, stored);
                }
            }
        }

        if version.flags.unknown {
            self.mark_must_return_any(arguments);
        } else {
            let parameters = version.arguments(&self.registry).to_vec();
            for (i, argument) in arguments.iter_mut().enumerate() {
                let Some(parameter) = parameters.get(i + offset).copied() else {
                    continue;
                };
                if !self.registry.is_function(parameter) {
                    continue;
                }
                let Some(function) = self.registry.bound_function(argument.ty) else {
                    continue;
                };
                let expected = self.registry.arguments(parameter).to_vec();
                if expected.iter().any(|ty| self.registry.is_void(*ty)) {
                    continue;
                }
                self.will_take(function, &expected, 1);
                self.set_version(function, &expected, 1);
                argument.ty = self.version_type(function, &expected);
            }
        }

        if version.flags.throws {
            if let Some(frame) = self.frames.last_mut() {
                frame.throws = true;
            }
        }
        let returned = version.return_type(&self.registry);
        let resolved = if version.flags.unknown {
            ResolvedCall::dynamic(with_receiver)
        } else {
            ResolvedCall::of(version, with_receiver)
        };
        (returned, resolved)
    }

    fn apply_mutator(&mut self, mutator: TypeMutator, target: InternedString, stored: TypeId) {
        let Some(variable) = self.lookup_variable(target) else {
            return;
        };
        let current = self.variables[variable.index()].ty;
        let stored = self.registry.canonical(stored);
        let updated = match mutator {
            TypeMutator::WillStore => match self.registry.kind(current).clone() {
                TypeKind::Array(element) => {
                    let element = self.registry.join(element, stored);
                    self.registry.array(element)
                }
                TypeKind::Set(element) => {
                    let element = self.registry.join(element, stored);
                    self.registry.set(element)
                }
                _ => current,
            },
            TypeMutator::ChangeValue => {
                self.variables[variable.index()].value = self.registry.bound_function(stored);
                stored
            }
        };
        if updated != current {
            log::trace!(
                "[MUTATE] `{}`: {} -> {}",
                target,
                self.registry.display(current),
                self.registry.display(updated)
            );
            self.variables[variable.index()].ty = updated;
        }
    }

    /// User functions handed to a dynamic call must produce boxed results
    fn mark_must_return_any(&mut self, arguments: &[TypedExpr]) {
        for argument in arguments {
            if let Some(function) = self.registry.bound_function(argument.ty) {
                self.functions.get_mut(function).must_return_any = true;
            }
        }
    }

    /// Internal unification failure; reported instead of the user-level error
    fn report_conflict(&mut self, error: &AnalysisError, span: Span) -> bool {
        let Some(AnalysisError::UnificationConflict { template, bound, attempted }) = error.conflict() else {
            return false;
        };
        self.diagnostics
            .report(ErrorKind::UnificationConflict, span)
            .param(template.as_str())
            .param(bound.as_str())
            .param(attempted.as_str())
            .emit();
        true
    }

    fn report_static_not_found(&mut self, class: InternedString, field: InternedString, arguments: &[TypeId], span: Span) {
        self.diagnostics
            .report(ErrorKind::StaticMethodNotFound, span)
            .param(class.to_string())
            .param(field.to_string())
            .param(self.registry.display_list(arguments))
            .emit();
    }

    fn report_call_failure(&mut self, error: &AnalysisError, callee: &TypedExpr, arguments: &[TypeId], span: Span) {
        if self.report_conflict(error, span) {
            return;
        }
        let name = match &callee.node {
            TypedExpression::Variable(name) => name.to_string(),
            _ => match self.registry.bound_function(callee.ty) {
                Some(function) => self.functions.get(function).display_name(),
                None => self.registry.display(callee.ty).to_string(),
            },
        };
        let expected = match self.registry.bound_function(callee.ty) {
            Some(function) => {
                let f = self.functions.get(function);
                let range = f.required_arguments()..=f.parameters.len();
                (!range.contains(&arguments.len())).then_some(f.parameters.len())
            }
            None => self
                .registry
                .signature(callee.ty)
                .map(|signature| signature.arguments.len())
                .filter(|expected| *expected != arguments.len()),
        };
        match expected {
            Some(expected) => {
                let signature = self.registry.erase_placeholders(callee.ty);
                self.diagnostics
                    .report(ErrorKind::WrongArgumentCount, span)
                    .param(name)
                    .param(expected.to_string())
                    .param(arguments.len().to_string())
                    .param(self.registry.display(signature).to_string())
                    .emit()
            }
            None => self
                .diagnostics
                .report(ErrorKind::MethodNotFound, span)
                .param(self.registry.display(callee.ty).to_string())
                .param(name)
                .param(self.registry.display_list(arguments))
                .emit(),
        }
    }
}
