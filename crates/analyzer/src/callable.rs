//! # Callables and Overload Resolution
//!
//! A [`Callable`] is an ordered overload set: a standard library method, an
//! operator, or the versions of a user function gathered at a call site.
//! Resolution scores every candidate against the argument types and keeps
//! the cheapest one:
//!
//! 1. Generic candidates are instantiated into a non-generic shadow copy by
//!    unifying their templates with the arguments (bindings are dropped
//!    right after, so the catalog entry stays generic).
//! 2. Arity: too many arguments rejects; every missing parameter must be
//!    covered by a default value of the underlying user function.
//! 3. A user function passed where a function is expected is specialized
//!    for that parameter's argument types before it is measured.
//! 4. The score is the sum of argument-to-parameter distances.
//! 5. The first candidate with the lowest score wins; later candidates with
//!    an equal score never replace it, so declaration order is the
//!    tie-breaker.

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};
use crate::function::{FunctionId, VersionRef};
use crate::template_solver::{self, UnificationContext};
use crate::type_registry::{TypeId, TypeRegistry};

/// What the overload resolver needs from its surroundings
pub trait ResolutionHost {
    fn registry(&self) -> &TypeRegistry;

    fn registry_mut(&mut self) -> &mut TypeRegistry;

    /// Make `function` take `arguments` and return the type of the version
    /// that will be used: the specialized one when it could be created, the
    /// default one otherwise.
    fn specialize(&mut self, function: FunctionId, arguments: &[TypeId]) -> TypeId;

    /// Type of the default value of parameter `index`, if it has one
    fn default_argument(&self, function: FunctionId, index: usize) -> Option<TypeId>;
}

/// How the backend reaches the code of a version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Implementation {
    /// Native runtime symbol
    Native(String),
    /// Inline code generation hook
    Intrinsic(String),
    /// Version of a user function
    User(VersionRef),
    /// Indirect call through a function value
    Value,
    /// Boxed dynamic call
    Dynamic,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionFlags {
    pub throws: bool,
    /// Method style: the receiver is the first parameter
    pub method: bool,
    /// Signature unknown at compile time; accepts anything
    pub unknown: bool,
}

/// Side effect of a call on the static type of its receiver variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeMutator {
    /// The receiver container now also holds the stored argument's type
    WillStore,
    /// The receiver variable takes the argument's type
    ChangeValue,
}

/// One overload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallableVersion {
    pub name: String,
    /// Function type: parameters and return
    pub ty: TypeId,
    pub implementation: Implementation,
    pub templates: Vec<TypeId>,
    pub mutators: Vec<TypeMutator>,
    pub flags: VersionFlags,
}

impl CallableVersion {
    pub fn new(name: impl Into<String>, ty: TypeId, implementation: Implementation) -> Self {
        Self {
            name: name.into(),
            ty,
            implementation,
            templates: Vec::new(),
            mutators: Vec::new(),
            flags: VersionFlags::default(),
        }
    }

    /// Accepts any arguments; result type is whatever `ty` returns
    pub fn unknown(name: impl Into<String>, ty: TypeId) -> Self {
        let mut version = Self::new(name, ty, Implementation::Dynamic);
        version.flags.unknown = true;
        version
    }

    pub fn with_templates(mut self, templates: Vec<TypeId>) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_mutator(mut self, mutator: TypeMutator) -> Self {
        self.mutators.push(mutator);
        self
    }

    pub fn method(mut self) -> Self {
        self.flags.method = true;
        self
    }

    pub fn throws(mut self) -> Self {
        self.flags.throws = true;
        self
    }

    pub fn user_function(&self) -> Option<FunctionId> {
        match &self.implementation {
            Implementation::User(version) => Some(version.function),
            _ => None,
        }
    }

    pub fn arguments<'r>(&self, registry: &'r TypeRegistry) -> &'r [TypeId] {
        registry.arguments(self.ty)
    }

    pub fn return_type(&self, registry: &TypeRegistry) -> TypeId {
        registry.return_type(self.ty).unwrap_or(TypeId::ANY)
    }

    /// Instantiate templates against `arguments`, producing a non-generic
    /// copy. Bindings live only for the duration of this call.
    fn instantiate<H: ResolutionHost + ?Sized>(
        &self,
        host: &mut H,
        arguments: &[TypeId],
    ) -> AnalysisResult<CallableVersion> {
        if self.templates.is_empty() {
            return Ok(self.clone());
        }
        let mut context = UnificationContext::new();
        let formals = self.arguments(host.registry()).to_vec();
        template_solver::solve_arguments(host, &mut context, &formals, arguments)?;
        let ty = context.build(host.registry_mut(), self.ty);
        Ok(CallableVersion { ty, templates: Vec::new(), ..self.clone() })
    }

    /// Score of this version for `arguments`, with the instantiated copy.
    /// `Ok(None)` means the version does not apply.
    pub fn score<H: ResolutionHost + ?Sized>(
        &self,
        host: &mut H,
        arguments: &[TypeId],
    ) -> AnalysisResult<Option<(u32, CallableVersion)>> {
        let version = self.instantiate(host, arguments)?;
        if version.flags.unknown {
            return Ok(Some((0, version)));
        }

        let parameters = version.arguments(host.registry()).to_vec();
        if arguments.len() > parameters.len() {
            return Ok(None);
        }

        let mut total = 0;
        for (i, parameter) in parameters.iter().enumerate() {
            let mut argument = match arguments.get(i) {
                Some(argument) => *argument,
                None => match version
                    .user_function()
                    .and_then(|function| host.default_argument(function, i))
                {
                    Some(default) => default,
                    None => return Ok(None),
                },
            };
            if host.registry().is_function(*parameter) {
                if let Some(function) = host.registry().bound_function(argument) {
                    let expected = host.registry().arguments(*parameter).to_vec();
                    if !expected.iter().any(|t| host.registry().is_void(*t)) {
                        argument = host.specialize(function, &expected);
                    }
                }
            }
            match host.registry().distance(argument, *parameter) {
                Some(distance) => total += distance,
                None => return Ok(None),
            }
        }
        Ok(Some((total, version)))
    }
}

/// Chosen version and its score
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub score: u32,
    pub version: CallableVersion,
}

/// Ordered overload set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Callable {
    pub name: String,
    pub versions: Vec<CallableVersion>,
}

impl Callable {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), versions: Vec::new() }
    }

    pub fn with_version(mut self, version: CallableVersion) -> Self {
        self.add_version(version);
        self
    }

    pub fn add_version(&mut self, version: CallableVersion) {
        self.versions.push(version);
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Cheapest version for `arguments`; the earliest declared wins ties
    pub fn resolve<H: ResolutionHost + ?Sized>(
        &self,
        host: &mut H,
        arguments: &[TypeId],
    ) -> AnalysisResult<Resolved> {
        let mut best: Option<Resolved> = None;
        let mut conflict = None;
        for candidate in &self.versions {
            match candidate.score(host, arguments) {
                Ok(Some((score, version))) => {
                    log::trace!(
                        "[RESOLVE] {} candidate {} scores {}",
                        self.name,
                        host.registry().display(version.ty),
                        score
                    );
                    if best.as_ref().map_or(true, |b| score < b.score) {
                        best = Some(Resolved { score, version });
                    }
                }
                Ok(None) => {}
                Err(error) => {
                    log::warn!("[RESOLVE] {}: {}", self.name, error);
                    conflict.get_or_insert(error);
                }
            }
        }
        match best {
            Some(resolved) => {
                log::debug!(
                    "[RESOLVE] {}({}) -> {} (score {})",
                    self.name,
                    host.registry().display_list(arguments),
                    host.registry().display(resolved.version.ty),
                    resolved.score
                );
                Ok(resolved)
            }
            None => Err(AnalysisError::unresolvable(
                self.name.clone(),
                host.registry().display_list(arguments),
                conflict,
            )),
        }
    }
}
