//! # Type Registry
//!
//! Owns and interns every type of an analysis run. Types are handed out as
//! [`TypeId`] handles into the registry's arena:
//!
//! - Structurally equal types (same variant, same modifiers, same parameters)
//!   always get the same handle, so type equality is handle equality
//! - The arena only grows; a handle stays valid for the registry's lifetime
//! - Handles are meaningful only for the registry that issued them, except
//!   for the builtin leaves which are interned first and in a fixed order
//!
//! Templates and placeholders are minted fresh on every request: two templates
//! named `T` are different types. Template bindings live in a
//! [`crate::template_solver::UnificationContext`], never in the type itself.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::arena::InternedString;
use crate::function::FunctionId;

/// Handle to an interned type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(u32);

impl TypeId {
    pub const VOID: TypeId = TypeId(0);
    pub const NEVER: TypeId = TypeId(1);
    pub const ANY: TypeId = TypeId(2);
    pub const BOOLEAN: TypeId = TypeId(3);
    pub const INTEGER: TypeId = TypeId(4);
    pub const LONG: TypeId = TypeId(5);
    pub const REAL: TypeId = TypeId(6);
    pub const MPZ: TypeId = TypeId(7);
    pub const NULL: TypeId = TypeId(8);
    pub const STRING: TypeId = TypeId(9);
    pub const OBJECT: TypeId = TypeId(10);
    pub const INTERVAL: TypeId = TypeId(11);

    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Orthogonal modifier bits. Part of the interning key, stripped by `fold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Modifiers {
    pub constant: bool,
    /// The value is owned by the expression and may be moved into its consumer
    pub temporary: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers { constant: false, temporary: false };
    pub const CONSTANT: Modifiers = Modifiers { constant: true, temporary: false };
    pub const TEMPORARY: Modifiers = Modifiers { constant: false, temporary: true };
}

/// Why a placeholder exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaceholderKind {
    /// Type of an unannotated parameter in a default version
    Parameter,
    /// Provisional return type of an in-flight recursive specialization
    Recursion,
}

/// Function signature, optionally bound to the user function it came from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub arguments: Vec<TypeId>,
    pub return_type: TypeId,
    /// The value carries captured variables
    pub closure: bool,
    /// User function this value is known to be
    pub function: Option<FunctionId>,
}

/// Closed set of type variants
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Void,
    Never,
    Any,
    Boolean,
    Integer,
    Long,
    Real,
    Mpz,
    Null,
    String,
    Object,
    Interval,
    /// Reference to a named class, e.g. the receiver of `String.size(s)`
    Class(InternedString),
    Function(FunctionType),
    Array(TypeId),
    Set(TypeId),
    Map { key: TypeId, element: TypeId },
    /// Sorted, duplicate-free alternatives plus their folded representative
    Compound { alternatives: Vec<TypeId>, folded: TypeId },
    Template { id: u32, name: InternedString },
    Placeholder { id: u32, kind: PlaceholderKind },
}

/// Interning key: a variant plus its modifiers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeData {
    pub kind: TypeKind,
    pub modifiers: Modifiers,
}

impl TypeData {
    pub fn new(kind: TypeKind) -> Self {
        Self { kind, modifiers: Modifiers::NONE }
    }
}

/// Arena of interned types
#[derive(Debug)]
pub struct TypeRegistry {
    types: Vec<TypeData>,
    interned: HashMap<TypeData, TypeId>,
    next_template: u32,
    next_placeholder: u32,
}

impl TypeRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            types: Vec::new(),
            interned: HashMap::new(),
            next_template: 0,
            next_placeholder: 0,
        };
        // Same order as the TypeId constants.
        for kind in [
            TypeKind::Void,
            TypeKind::Never,
            TypeKind::Any,
            TypeKind::Boolean,
            TypeKind::Integer,
            TypeKind::Long,
            TypeKind::Real,
            TypeKind::Mpz,
            TypeKind::Null,
            TypeKind::String,
            TypeKind::Object,
            TypeKind::Interval,
        ] {
            registry.intern(TypeData::new(kind));
        }
        debug_assert_eq!(registry.kind(TypeId::INTERVAL), &TypeKind::Interval);
        registry
    }

    /// Canonical handle for `data`, created on first request
    pub fn intern(&mut self, data: TypeData) -> TypeId {
        if let Some(&id) = self.interned.get(&data) {
            return id;
        }
        let id = TypeId(self.types.len() as u32);
        log::trace!("[TYPES] interning {:?} as {:?}", data, id);
        self.types.push(data.clone());
        self.interned.insert(data, id);
        id
    }

    fn intern_kind(&mut self, kind: TypeKind) -> TypeId {
        self.intern(TypeData::new(kind))
    }

    /// Number of distinct types interned so far
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    // ====== CONSTRUCTORS ======

    pub fn array(&mut self, element: TypeId) -> TypeId {
        self.intern_kind(TypeKind::Array(element))
    }

    pub fn tmp_array(&mut self, element: TypeId) -> TypeId {
        let array = self.array(element);
        self.temporary(array)
    }

    pub fn set(&mut self, element: TypeId) -> TypeId {
        self.intern_kind(TypeKind::Set(element))
    }

    pub fn map(&mut self, key: TypeId, element: TypeId) -> TypeId {
        self.intern_kind(TypeKind::Map { key, element })
    }

    pub fn class(&mut self, name: InternedString) -> TypeId {
        self.intern_kind(TypeKind::Class(name))
    }

    /// Plain function signature with no bound user function
    pub fn function(&mut self, arguments: Vec<TypeId>, return_type: TypeId) -> TypeId {
        self.function_type(FunctionType { arguments, return_type, closure: false, function: None })
    }

    pub fn function_type(&mut self, signature: FunctionType) -> TypeId {
        self.intern_kind(TypeKind::Function(signature))
    }

    /// Fresh template; never equal to any other template
    pub fn template(&mut self, name: impl Into<InternedString>) -> TypeId {
        let id = self.next_template;
        self.next_template += 1;
        self.intern_kind(TypeKind::Template { id, name: name.into() })
    }

    /// Fresh placeholder; never equal to any other placeholder
    pub fn placeholder(&mut self, kind: PlaceholderKind) -> TypeId {
        let id = self.next_placeholder;
        self.next_placeholder += 1;
        self.intern_kind(TypeKind::Placeholder { id, kind })
    }

    pub fn with_modifiers(&mut self, ty: TypeId, modifiers: Modifiers) -> TypeId {
        let data = self.get(ty);
        if data.modifiers == modifiers {
            return ty;
        }
        let kind = data.kind.clone();
        self.intern(TypeData { kind, modifiers })
    }

    pub fn temporary(&mut self, ty: TypeId) -> TypeId {
        let modifiers = Modifiers { temporary: true, ..self.modifiers(ty) };
        self.with_modifiers(ty, modifiers)
    }

    pub fn constant(&mut self, ty: TypeId) -> TypeId {
        let modifiers = Modifiers { constant: true, ..self.modifiers(ty) };
        self.with_modifiers(ty, modifiers)
    }

    /// Drop the temporary bit; compounds drop it from every alternative too
    pub fn not_temporary(&mut self, ty: TypeId) -> TypeId {
        if let TypeKind::Compound { alternatives, .. } = self.kind(ty) {
            let alternatives = alternatives.clone();
            let stripped: Vec<TypeId> =
                alternatives.into_iter().map(|alt| self.not_temporary(alt)).collect();
            return self.compound(stripped);
        }
        let modifiers = Modifiers { temporary: false, ..self.modifiers(ty) };
        self.with_modifiers(ty, modifiers)
    }

    pub fn not_constant(&mut self, ty: TypeId) -> TypeId {
        let modifiers = Modifiers { constant: false, ..self.modifiers(ty) };
        self.with_modifiers(ty, modifiers)
    }

    /// Strip every modifier at the top level. Specialization keys are canonical.
    pub fn canonical(&mut self, ty: TypeId) -> TypeId {
        let ty = self.not_temporary(ty);
        self.with_modifiers(ty, Modifiers::NONE)
    }

    /// Same signature, promoted to closure kind
    pub fn as_closure(&mut self, ty: TypeId) -> TypeId {
        match self.kind(ty) {
            TypeKind::Function(signature) if !signature.closure => {
                let signature = FunctionType { closure: true, ..signature.clone() };
                let modifiers = self.modifiers(ty);
                self.intern(TypeData { kind: TypeKind::Function(signature), modifiers })
            }
            _ => ty,
        }
    }

    // ====== ACCESSORS ======

    pub fn get(&self, ty: TypeId) -> &TypeData {
        &self.types[ty.index()]
    }

    pub fn kind(&self, ty: TypeId) -> &TypeKind {
        &self.get(ty).kind
    }

    pub fn modifiers(&self, ty: TypeId) -> Modifiers {
        self.get(ty).modifiers
    }

    pub fn is_temporary(&self, ty: TypeId) -> bool {
        self.modifiers(ty).temporary
    }

    pub fn is_constant(&self, ty: TypeId) -> bool {
        self.modifiers(ty).constant
    }

    pub fn is_void(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::Void)
    }

    pub fn is_never(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::Never)
    }

    pub fn is_any(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::Any)
    }

    pub fn is_template(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::Template { .. })
    }

    pub fn is_function(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::Function(_))
    }

    pub fn is_compound(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::Compound { .. })
    }

    pub fn is_number(&self, ty: TypeId) -> bool {
        matches!(
            self.kind(ty),
            TypeKind::Integer | TypeKind::Long | TypeKind::Real | TypeKind::Mpz
        )
    }

    /// Integral numbers usable as array keys
    pub fn is_integral(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::Integer | TypeKind::Long | TypeKind::Mpz)
    }

    /// Values passed around by reference at runtime
    pub fn is_reference(&self, ty: TypeId) -> bool {
        matches!(
            self.kind(ty),
            TypeKind::Null
                | TypeKind::String
                | TypeKind::Object
                | TypeKind::Interval
                | TypeKind::Class(_)
                | TypeKind::Function(_)
                | TypeKind::Array(_)
                | TypeKind::Set(_)
                | TypeKind::Map { .. }
        )
    }

    /// Element type of an array or set
    pub fn element(&self, ty: TypeId) -> Option<TypeId> {
        match self.kind(ty) {
            TypeKind::Array(element) | TypeKind::Set(element) => Some(*element),
            TypeKind::Map { element, .. } => Some(*element),
            _ => None,
        }
    }

    pub fn key(&self, ty: TypeId) -> Option<TypeId> {
        match self.kind(ty) {
            TypeKind::Map { key, .. } => Some(*key),
            _ => None,
        }
    }

    pub fn signature(&self, ty: TypeId) -> Option<&FunctionType> {
        match self.kind(ty) {
            TypeKind::Function(signature) => Some(signature),
            _ => None,
        }
    }

    /// Parameter types of a function type; empty for anything else
    pub fn arguments(&self, ty: TypeId) -> &[TypeId] {
        self.signature(ty).map(|s| s.arguments.as_slice()).unwrap_or(&[])
    }

    pub fn return_type(&self, ty: TypeId) -> Option<TypeId> {
        self.signature(ty).map(|s| s.return_type)
    }

    /// User function a function-typed value is known to be
    pub fn bound_function(&self, ty: TypeId) -> Option<FunctionId> {
        self.signature(ty).and_then(|s| s.function)
    }

    /// Alternatives of a compound, or the type itself
    pub fn alternatives(&self, ty: TypeId) -> Vec<TypeId> {
        match self.kind(ty) {
            TypeKind::Compound { alternatives, .. } => alternatives.clone(),
            _ => vec![ty],
        }
    }

    pub fn display(&self, ty: TypeId) -> TypeDisplay<'_> {
        TypeDisplay { registry: self, ty }
    }

    /// Comma separated rendering of an argument list
    pub fn display_list(&self, types: &[TypeId]) -> String {
        types
            .iter()
            .map(|t| self.display(*t).to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Human readable rendering of a type, used in diagnostics and logs
pub struct TypeDisplay<'a> {
    registry: &'a TypeRegistry,
    ty: TypeId,
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry;
        let data = registry.get(self.ty);
        if data.modifiers.constant {
            write!(f, "const ")?;
        }
        match &data.kind {
            TypeKind::Void => write!(f, "void"),
            TypeKind::Never => write!(f, "never"),
            TypeKind::Any => write!(f, "any"),
            TypeKind::Boolean => write!(f, "bool"),
            TypeKind::Integer => write!(f, "int"),
            TypeKind::Long => write!(f, "long"),
            TypeKind::Real => write!(f, "real"),
            TypeKind::Mpz => write!(f, "mpz"),
            TypeKind::Null => write!(f, "null"),
            TypeKind::String => write!(f, "string"),
            TypeKind::Object => write!(f, "object"),
            TypeKind::Interval => write!(f, "interval"),
            TypeKind::Class(name) => write!(f, "class<{}>", name),
            TypeKind::Array(element) => write!(f, "array<{}>", registry.display(*element)),
            TypeKind::Set(element) => write!(f, "set<{}>", registry.display(*element)),
            TypeKind::Map { key, element } => write!(
                f,
                "map<{}, {}>",
                registry.display(*key),
                registry.display(*element)
            ),
            TypeKind::Function(signature) => write!(
                f,
                "{}({}) => {}",
                if signature.closure { "closure" } else { "fun" },
                registry.display_list(&signature.arguments),
                registry.display(signature.return_type)
            ),
            TypeKind::Compound { alternatives, .. } => {
                for (i, alternative) in alternatives.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{}", registry.display(*alternative))?;
                }
                Ok(())
            }
            TypeKind::Template { name, .. } => write!(f, "{}", name),
            TypeKind::Placeholder { id, .. } => write!(f, "?{}", id),
        }
    }
}
