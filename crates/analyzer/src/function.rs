//! # User Functions and Their Versions
//!
//! One [`Function`] exists per function literal in the analyzed tree. It owns:
//! - a pristine copy of the literal's body, cloned for every version
//! - the default version, analyzed once with placeholder parameter types
//! - a cache from canonical argument tuple to specialized [`FunctionVersion`]
//! - the variables it captures from enclosing functions
//!
//! Versions are appended and never removed, so a [`VersionRef`] stays valid
//! for the whole analysis run.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::arena::InternedString;
use crate::semantic_analyzer::{Frame, VarId};
use crate::source::Span;
use crate::type_registry::TypeId;
use crate::typed_ast::TypedBlock;

/// Handle to a function in a [`FunctionTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FunctionId(u32);

impl FunctionId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VersionSlot {
    Default,
    Specialized(usize),
}

/// Stable reference to one version of one function
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionRef {
    pub function: FunctionId,
    pub slot: VersionSlot,
}

/// One monomorphic (or, for the default, placeholder-typed) body
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionVersion {
    /// Canonical argument tuple this version was built for
    pub arguments: Vec<TypeId>,
    /// Function type of the version, bound to its function
    pub ty: TypeId,
    pub return_type: TypeId,
    pub body: TypedBlock,
    /// Function literal making up the whole body, if any
    pub returns_function: Option<FunctionId>,
    /// The body calls this same version
    pub recursive: bool,
    pub throws: bool,
}

/// Where a captured variable comes from when the closure is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureSource {
    /// A local of the immediately enclosing function
    Local,
    /// The enclosing function's own capture at this index
    Parent(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    pub name: InternedString,
    pub variable: VarId,
    pub source: CaptureSource,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub id: FunctionId,
    /// Name of the `let` binding the literal was assigned to
    pub name: Option<InternedString>,
    pub span: Span,
    pub parameters: Vec<InternedString>,
    /// Analyzed type of each parameter's default value
    pub default_types: Vec<Option<TypeId>>,
    pub parent: Option<FunctionId>,
    pub captures: Vec<Capture>,
    /// Some version returns a closure
    pub returns_closure: bool,
    /// Version selected by the last call through this function
    pub current_version: Option<Vec<TypeId>>,
    pub recursive: bool,
    /// Passed somewhere that calls it dynamically
    pub must_return_any: bool,
    pub(crate) body: TypedBlock,
    /// Scope chain at the definition site; versions are analyzed inside it
    pub(crate) environment: Vec<Frame>,
    pub(crate) placeholders: Vec<TypeId>,
    default_version: Option<FunctionVersion>,
    versions: Vec<FunctionVersion>,
    index: HashMap<Vec<TypeId>, usize>,
}

impl Function {
    pub(crate) fn new(
        id: FunctionId,
        parameters: Vec<InternedString>,
        body: TypedBlock,
        environment: Vec<Frame>,
        span: Span,
    ) -> Self {
        Self {
            id,
            name: None,
            span,
            default_types: vec![None; parameters.len()],
            parameters,
            parent: None,
            captures: Vec::new(),
            returns_closure: false,
            current_version: None,
            recursive: false,
            must_return_any: false,
            body,
            environment,
            placeholders: Vec::new(),
            default_version: None,
            versions: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn display_name(&self) -> String {
        self.name
            .map(|name| name.to_string())
            .unwrap_or_else(|| "<function>".to_string())
    }

    /// Captures a variable, or hands out a closure built in its own frame
    pub fn is_closure(&self) -> bool {
        !self.captures.is_empty() || self.returns_closure
    }

    /// Parameters without a default value
    pub fn required_arguments(&self) -> usize {
        self.default_types.iter().take_while(|d| d.is_none()).count()
    }

    /// Append the default types of missing trailing parameters
    pub fn fill_defaults(&self, arguments: &[TypeId]) -> Vec<TypeId> {
        let mut filled = arguments.to_vec();
        for default in self.default_types.iter().skip(arguments.len()) {
            match default {
                Some(ty) => filled.push(*ty),
                None => break,
            }
        }
        filled
    }

    pub fn default_version(&self) -> Option<&FunctionVersion> {
        self.default_version.as_ref()
    }

    pub(crate) fn set_default_version(&mut self, version: FunctionVersion) {
        self.default_version = Some(version);
    }

    pub fn default_type(&self) -> Option<TypeId> {
        self.default_version.as_ref().map(|version| version.ty)
    }

    /// Specialized versions in creation order
    pub fn versions(&self) -> &[FunctionVersion] {
        &self.versions
    }

    pub fn version_index(&self, arguments: &[TypeId]) -> Option<usize> {
        self.index.get(arguments).copied()
    }

    pub fn version(&self, arguments: &[TypeId]) -> Option<&FunctionVersion> {
        self.version_index(arguments).map(|i| &self.versions[i])
    }

    /// Default version when `arguments` is its key, otherwise the specialized one
    pub fn lookup(&self, arguments: &[TypeId]) -> Option<VersionRef> {
        if let Some(i) = self.version_index(arguments) {
            return Some(VersionRef { function: self.id, slot: VersionSlot::Specialized(i) });
        }
        match &self.default_version {
            Some(default) if default.arguments == arguments => {
                Some(VersionRef { function: self.id, slot: VersionSlot::Default })
            }
            _ => None,
        }
    }

    pub fn get(&self, slot: &VersionSlot) -> Option<&FunctionVersion> {
        match slot {
            VersionSlot::Default => self.default_version.as_ref(),
            VersionSlot::Specialized(i) => self.versions.get(*i),
        }
    }

    pub(crate) fn get_mut(&mut self, slot: &VersionSlot) -> Option<&mut FunctionVersion> {
        match slot {
            VersionSlot::Default => self.default_version.as_mut(),
            VersionSlot::Specialized(i) => self.versions.get_mut(*i),
        }
    }

    /// Default first, then specializations in creation order
    pub fn all_versions(&self) -> impl Iterator<Item = (VersionSlot, &FunctionVersion)> {
        self.default_version
            .iter()
            .map(|version| (VersionSlot::Default, version))
            .chain(
                self.versions
                    .iter()
                    .enumerate()
                    .map(|(i, version)| (VersionSlot::Specialized(i), version)),
            )
    }

    pub(crate) fn all_versions_mut(&mut self) -> impl Iterator<Item = &mut FunctionVersion> {
        self.default_version.iter_mut().chain(self.versions.iter_mut())
    }

    pub(crate) fn insert_version(&mut self, version: FunctionVersion) -> VersionSlot {
        let slot = self.versions.len();
        self.index.insert(version.arguments.clone(), slot);
        self.versions.push(version);
        VersionSlot::Specialized(slot)
    }

    pub fn capture_index(&self, variable: VarId) -> Option<usize> {
        self.captures.iter().position(|capture| capture.variable == variable)
    }
}

/// Every function literal seen during one analysis run
#[derive(Debug, Default)]
pub struct FunctionTable {
    functions: Vec<Function>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(
        &mut self,
        parameters: Vec<InternedString>,
        body: TypedBlock,
        environment: Vec<Frame>,
        span: Span,
    ) -> FunctionId {
        let id = FunctionId(self.functions.len() as u32);
        self.functions.push(Function::new(id, parameters, body, environment, span));
        id
    }

    pub fn get(&self, id: FunctionId) -> &Function {
        &self.functions[id.index()]
    }

    pub(crate) fn get_mut(&mut self, id: FunctionId) -> &mut Function {
        &mut self.functions[id.index()]
    }

    pub fn version(&self, version: &VersionRef) -> Option<&FunctionVersion> {
        self.get(version.function).get(&version.slot)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter()
    }

    pub fn ids(&self) -> Vec<FunctionId> {
        (0..self.functions.len() as u32).map(FunctionId).collect()
    }

    /// First function bound to a `let` of this name
    pub fn find_by_name(&self, name: &str) -> Option<&Function> {
        self.functions
            .iter()
            .find(|function| function.name.map_or(false, |n| n.is(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function(defaults: Vec<Option<TypeId>>) -> Function {
        let parameters = (0..defaults.len())
            .map(|i| InternedString::from(format!("p{}", i).as_str()))
            .collect();
        let mut function =
            Function::new(FunctionId(0), parameters, TypedBlock::default(), Vec::new(), Span::default());
        function.default_types = defaults;
        function
    }

    #[test]
    fn test_fill_defaults_only_trailing() {
        let f = function(vec![None, Some(TypeId::INTEGER), Some(TypeId::STRING)]);
        assert_eq!(f.required_arguments(), 1);
        assert_eq!(
            f.fill_defaults(&[TypeId::REAL]),
            vec![TypeId::REAL, TypeId::INTEGER, TypeId::STRING]
        );
        assert_eq!(f.fill_defaults(&[]), Vec::<TypeId>::new());
    }

    #[test]
    fn test_versions_are_append_only() {
        let mut f = function(vec![None]);
        let version = |arguments: Vec<TypeId>| FunctionVersion {
            arguments,
            ty: TypeId::ANY,
            return_type: TypeId::ANY,
            body: TypedBlock::default(),
            returns_function: None,
            recursive: false,
            throws: false,
        };
        let first = f.insert_version(version(vec![TypeId::INTEGER]));
        let second = f.insert_version(version(vec![TypeId::STRING]));
        assert_eq!(first, VersionSlot::Specialized(0));
        assert_eq!(second, VersionSlot::Specialized(1));
        assert_eq!(
            f.lookup(&[TypeId::INTEGER]),
            Some(VersionRef { function: FunctionId(0), slot: VersionSlot::Specialized(0) })
        );
        assert!(f.lookup(&[TypeId::REAL]).is_none());
    }
}
