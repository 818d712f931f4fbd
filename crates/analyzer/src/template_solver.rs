//! # Template Unification
//!
//! Solves the templates of a generic callable version against the argument
//! types of one call:
//!
//! 1. Formal parameters that are templates themselves bind first.
//! 2. Structured parameters recurse: array/set elements, map key then
//!    element, and function signatures. A function argument known to be a
//!    user function is specialized against the formal parameter types built
//!    so far, and the formal return type unifies with the *specialized*
//!    return type.
//!
//! Unification is soft. A pair that cannot be matched leaves its template
//! unbound, `build` turns unbound templates into `void`, and the candidate
//! then loses at scoring. Only rebinding a template to a different type is an
//! error.

use std::collections::HashMap;

use crate::callable::ResolutionHost;
use crate::error::{AnalysisError, AnalysisResult};
use crate::type_registry::{FunctionType, TypeId, TypeKind, TypeRegistry};

/// Template bindings for one resolution attempt
#[derive(Debug, Default, Clone)]
pub struct UnificationContext {
    bindings: HashMap<TypeId, TypeId>,
}

impl UnificationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `template` to `ty`. Binding again to the same type is a no-op.
    pub fn implement(
        &mut self,
        registry: &TypeRegistry,
        template: TypeId,
        ty: TypeId,
    ) -> AnalysisResult<()> {
        match self.bindings.get(&template) {
            None => {
                log::trace!(
                    "[UNIFY] {} := {}",
                    registry.display(template),
                    registry.display(ty)
                );
                self.bindings.insert(template, ty);
                Ok(())
            }
            Some(bound) if *bound == ty => Ok(()),
            Some(bound) => Err(AnalysisError::unification_conflict(
                registry.display(template).to_string(),
                registry.display(*bound).to_string(),
                registry.display(ty).to_string(),
            )),
        }
    }

    pub fn binding(&self, template: TypeId) -> Option<TypeId> {
        self.bindings.get(&template).copied()
    }

    pub fn is_bound(&self, template: TypeId) -> bool {
        self.bindings.contains_key(&template)
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    /// `ty` with every template replaced by its binding, `void` when unbound
    pub fn build(&self, registry: &mut TypeRegistry, ty: TypeId) -> TypeId {
        let modifiers = registry.modifiers(ty);
        let built = match registry.kind(ty).clone() {
            TypeKind::Template { .. } => return self.binding(ty).unwrap_or(TypeId::VOID),
            TypeKind::Array(element) => {
                let element = self.build(registry, element);
                registry.array(element)
            }
            TypeKind::Set(element) => {
                let element = self.build(registry, element);
                registry.set(element)
            }
            TypeKind::Map { key, element } => {
                let key = self.build(registry, key);
                let element = self.build(registry, element);
                registry.map(key, element)
            }
            TypeKind::Function(signature) => {
                let arguments =
                    signature.arguments.iter().map(|t| self.build(registry, *t)).collect();
                let return_type = self.build(registry, signature.return_type);
                registry.function_type(FunctionType { arguments, return_type, ..signature })
            }
            TypeKind::Compound { alternatives, .. } => {
                let alternatives: Vec<TypeId> =
                    alternatives.iter().map(|t| self.build(registry, *t)).collect();
                return registry.compound(alternatives);
            }
            _ => return ty,
        };
        registry.with_modifiers(built, modifiers)
    }
}

/// Unify formal parameter types with actual argument types, direct
/// templates first.
pub fn solve_arguments<H: ResolutionHost + ?Sized>(
    host: &mut H,
    context: &mut UnificationContext,
    formals: &[TypeId],
    actuals: &[TypeId],
) -> AnalysisResult<()> {
    for (formal, actual) in formals.iter().zip(actuals) {
        if host.registry().is_template(*formal) && !host.registry().is_never(*actual) {
            let actual = host.registry_mut().canonical(*actual);
            context.implement(host.registry(), *formal, actual)?;
        }
    }
    for (formal, actual) in formals.iter().zip(actuals) {
        if !host.registry().is_template(*formal) {
            solve(host, context, *formal, *actual)?;
        }
    }
    Ok(())
}

/// Structural unification of one formal type against one actual type
pub fn solve<H: ResolutionHost + ?Sized>(
    host: &mut H,
    context: &mut UnificationContext,
    formal: TypeId,
    actual: TypeId,
) -> AnalysisResult<()> {
    let formal_kind = host.registry().kind(formal).clone();
    let actual_kind = host.registry().kind(actual).clone();
    match (formal_kind, actual_kind) {
        // `never` fits every binding; it must not pin a template.
        (_, TypeKind::Never) => Ok(()),
        (TypeKind::Template { .. }, _) => {
            let actual = host.registry_mut().canonical(actual);
            context.implement(host.registry(), formal, actual)
        }
        (TypeKind::Array(f), TypeKind::Array(a)) | (TypeKind::Set(f), TypeKind::Set(a)) => {
            solve(host, context, f, a)
        }
        (
            TypeKind::Map { key: fk, element: fe },
            TypeKind::Map { key: ak, element: ae },
        ) => {
            solve(host, context, fk, ak)?;
            solve(host, context, fe, ae)
        }
        (TypeKind::Function(formal_signature), TypeKind::Function(actual_signature)) => {
            match actual_signature.function {
                Some(function) => {
                    let arguments: Vec<TypeId> = formal_signature
                        .arguments
                        .iter()
                        .map(|t| context.build(host.registry_mut(), *t))
                        .collect();
                    if arguments.iter().any(|t| host.registry().is_void(*t)) {
                        // An argument template is still unbound; specializing
                        // against void would only produce a useless version.
                        return Ok(());
                    }
                    let version = host.specialize(function, &arguments);
                    match host.registry().return_type(version) {
                        Some(returned) => solve(host, context, formal_signature.return_type, returned),
                        None => Ok(()),
                    }
                }
                None => {
                    for (f, a) in formal_signature.arguments.iter().zip(&actual_signature.arguments) {
                        solve(host, context, *f, *a)?;
                    }
                    solve(host, context, formal_signature.return_type, actual_signature.return_type)
                }
            }
        }
        (_, TypeKind::Compound { folded, .. }) => solve(host, context, formal, folded),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_implement_is_idempotent() {
        let mut registry = TypeRegistry::new();
        let t = registry.template("T");
        let mut context = UnificationContext::new();
        context.implement(&registry, t, TypeId::INTEGER).unwrap();
        context.implement(&registry, t, TypeId::INTEGER).unwrap();
        assert_eq!(context.binding(t), Some(TypeId::INTEGER));
    }

    #[test]
    fn test_rebinding_is_a_conflict() {
        let mut registry = TypeRegistry::new();
        let t = registry.template("T");
        let mut context = UnificationContext::new();
        context.implement(&registry, t, TypeId::INTEGER).unwrap();
        let error = context.implement(&registry, t, TypeId::STRING).unwrap_err();
        assert!(matches!(error, AnalysisError::UnificationConflict { .. }));
        assert_eq!(context.binding(t), Some(TypeId::INTEGER));
    }

    #[test]
    fn test_build_substitutes_and_voids_unbound() {
        let mut registry = TypeRegistry::new();
        let k = registry.template("K");
        let v = registry.template("V");
        let map = registry.map(k, v);
        let mut context = UnificationContext::new();
        context.implement(&registry, k, TypeId::STRING).unwrap();
        let built = context.build(&mut registry, map);
        assert_eq!(registry.key(built), Some(TypeId::STRING));
        assert_eq!(registry.element(built), Some(TypeId::VOID));
    }
}
