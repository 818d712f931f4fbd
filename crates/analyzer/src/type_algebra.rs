//! # Type Algebra
//!
//! Operations over interned types:
//!
//! - `join` (`+`): the type of a value that may come from either side. `never`
//!   is the identity; distinct types make a compound.
//! - `meet` (`*`): the narrowest type satisfying both sides, `never` if none.
//! - `distance`: conversion cost from one type to another, `None` when no
//!   implicit conversion exists. Drives overload scoring.
//! - `fold`: strips modifiers and replaces a compound by its representative.
//!
//! All of these live on [`TypeRegistry`] because every result is interned.

use crate::type_registry::{
    FunctionType, Modifiers, PlaceholderKind, TypeData, TypeId, TypeKind, TypeRegistry,
};

/// Cost of boxing a reference value into `any`
const BOX_REFERENCE: u32 = 1;
/// Cost of boxing a primitive value into `any`
const BOX_PRIMITIVE: u32 = 2;

impl TypeRegistry {
    /// Flattened, order-independent union of `types`.
    ///
    /// Nested compounds are flattened, `never` is dropped, alternatives lose
    /// their temporary bit (the compound keeps it when every alternative had
    /// it). Zero alternatives give `never`, one gives that alternative.
    pub fn compound(&mut self, types: impl IntoIterator<Item = TypeId>) -> TypeId {
        let mut temporary = true;
        let mut flat = Vec::new();
        for ty in types {
            let nested = match self.kind(ty) {
                TypeKind::Compound { alternatives, .. } => alternatives.clone(),
                TypeKind::Never => continue,
                _ => vec![ty],
            };
            temporary &= self.is_temporary(ty);
            for alternative in nested {
                let modifiers = Modifiers { temporary: false, ..self.modifiers(alternative) };
                flat.push(self.with_modifiers(alternative, modifiers));
            }
        }
        flat.sort();
        flat.dedup();

        match flat.len() {
            0 => TypeId::NEVER,
            1 if temporary => self.temporary(flat[0]),
            1 => flat[0],
            _ => {
                let folded = self.fold_alternatives(&flat);
                self.intern(TypeData {
                    kind: TypeKind::Compound { alternatives: flat, folded },
                    modifiers: Modifiers { constant: false, temporary },
                })
            }
        }
    }

    /// Single representative of a set of alternatives
    fn fold_alternatives(&mut self, alternatives: &[TypeId]) -> TypeId {
        let mut folded = Vec::with_capacity(alternatives.len());
        for alternative in alternatives {
            folded.push(self.fold(*alternative));
        }
        folded.sort();
        folded.dedup();
        if let [single] = folded.as_slice() {
            return *single;
        }

        if folded.iter().all(|t| self.is_number(*t)) {
            let has = |kind: TypeKind| folded.iter().any(|t| *self.kind(*t) == kind);
            return match (has(TypeKind::Real), has(TypeKind::Mpz), has(TypeKind::Long)) {
                (true, true, _) => TypeId::ANY,
                (true, false, _) => TypeId::REAL,
                (false, true, _) => TypeId::MPZ,
                (false, false, true) => TypeId::LONG,
                (false, false, false) => TypeId::INTEGER,
            };
        }

        let elements: Option<Vec<TypeId>> = folded
            .iter()
            .map(|t| match self.kind(*t) {
                TypeKind::Array(element) => Some(*element),
                _ => None,
            })
            .collect();
        if let Some(elements) = elements {
            let element = self.compound(elements);
            return self.array(element);
        }

        let elements: Option<Vec<TypeId>> = folded
            .iter()
            .map(|t| match self.kind(*t) {
                TypeKind::Set(element) => Some(*element),
                _ => None,
            })
            .collect();
        if let Some(elements) = elements {
            let element = self.compound(elements);
            return self.set(element);
        }

        let entries: Option<Vec<(TypeId, TypeId)>> = folded
            .iter()
            .map(|t| match self.kind(*t) {
                TypeKind::Map { key, element } => Some((*key, *element)),
                _ => None,
            })
            .collect();
        if let Some(entries) = entries {
            let key = self.compound(entries.iter().map(|(k, _)| *k));
            let element = self.compound(entries.iter().map(|(_, e)| *e));
            return self.map(key, element);
        }

        TypeId::ANY
    }

    /// Strip modifiers; a compound becomes its folded representative
    pub fn fold(&mut self, ty: TypeId) -> TypeId {
        match self.kind(ty) {
            TypeKind::Compound { folded, .. } => *folded,
            _ => self.with_modifiers(ty, Modifiers::NONE),
        }
    }

    /// `a + b`
    pub fn join(&mut self, a: TypeId, b: TypeId) -> TypeId {
        if a == b || self.is_never(b) {
            return a;
        }
        if self.is_never(a) {
            return b;
        }
        self.compound([a, b])
    }

    pub fn join_all(&mut self, types: impl IntoIterator<Item = TypeId>) -> TypeId {
        types.into_iter().fold(TypeId::NEVER, |acc, ty| self.join(acc, ty))
    }

    /// `a * b`: narrows instead of widening
    pub fn meet(&mut self, a: TypeId, b: TypeId) -> TypeId {
        if a == b {
            return a;
        }
        if self.is_never(a) || self.is_never(b) {
            return TypeId::NEVER;
        }
        if self.is_any(a) || self.is_placeholder(a) {
            return b;
        }
        if self.is_any(b) || self.is_placeholder(b) {
            return a;
        }
        if self.is_compound(a) || self.is_compound(b) {
            let mut narrowed = Vec::new();
            for left in self.alternatives(a) {
                for right in self.alternatives(b) {
                    let m = self.meet(left, right);
                    if !self.is_never(m) {
                        narrowed.push(m);
                    }
                }
            }
            return self.compound(narrowed);
        }
        match (self.kind(a).clone(), self.kind(b).clone()) {
            (TypeKind::Array(x), TypeKind::Array(y)) => {
                let element = self.meet(x, y);
                self.array(element)
            }
            (TypeKind::Set(x), TypeKind::Set(y)) => {
                let element = self.meet(x, y);
                self.set(element)
            }
            (TypeKind::Map { key: k1, element: e1 }, TypeKind::Map { key: k2, element: e2 }) => {
                let key = self.meet(k1, k2);
                let element = self.meet(e1, e2);
                self.map(key, element)
            }
            _ if self.distance(a, b).is_some() => a,
            _ if self.distance(b, a).is_some() => b,
            _ => TypeId::NEVER,
        }
    }

    /// Conversion cost from `from` to `to`; `None` means incompatible.
    ///
    /// Identical types cost 0. Containers recurse and add up their parts.
    /// A compound source first checks that a non-temporary value is not
    /// handed to a temporary slot, then converts its folded representative.
    pub fn distance(&self, from: TypeId, to: TypeId) -> Option<u32> {
        if from == to {
            return Some(0);
        }
        let (source, target) = (self.modifiers(from), self.modifiers(to));
        if let TypeKind::Compound { folded, .. } = self.kind(from) {
            if !source.temporary && target.temporary {
                return None;
            }
            return self.shape_distance(*folded, to);
        }
        if self.is_reference(from) {
            if target.temporary && !source.temporary {
                return None;
            }
            if source.constant && !target.constant {
                return None;
            }
        }
        self.shape_distance(from, to)
    }

    /// Distance ignoring the top-level modifiers of both sides
    fn shape_distance(&self, from: TypeId, to: TypeId) -> Option<u32> {
        use TypeKind::*;

        let (source, target) = (self.kind(from), self.kind(to));
        if source == target {
            return Some(0);
        }
        match (source, target) {
            (Compound { folded, .. }, _) => self.shape_distance(*folded, to),
            (Never, _) => Some(0),
            (_, Compound { alternatives, folded }) => alternatives
                .iter()
                .filter_map(|alternative| self.distance(from, *alternative))
                .min()
                .or_else(|| self.shape_distance(from, *folded)),
            (Void, _) | (_, Void) => None,
            (Template { .. }, _) | (_, Template { .. }) => None,
            (Placeholder { .. }, Any | Placeholder { .. }) | (Any, Placeholder { .. }) => Some(0),
            (Placeholder { .. }, _) | (Any, _) => None,
            (_, Any | Placeholder { .. }) if self.is_reference(from) => Some(BOX_REFERENCE),
            (_, Any | Placeholder { .. }) => Some(BOX_PRIMITIVE),

            (Integer, Long) => Some(1),
            (Integer, Real) => Some(2),
            (Integer, Mpz) => Some(3),
            (Long, Real) => Some(1),
            (Long, Mpz) => Some(2),

            (Array(a), Array(b)) | (Set(a), Set(b)) => self.distance(*a, *b),
            (Map { key: k1, element: e1 }, Map { key: k2, element: e2 }) => {
                Some(self.distance(*k1, *k2)? + self.distance(*e1, *e2)?)
            }
            (Function(a), Function(b)) => self.function_distance(a, b),
            _ => None,
        }
    }

    /// Parameters are contravariant, the return type covariant. A value may
    /// take fewer parameters than the slot offers; a `void` slot return
    /// accepts any return type.
    fn function_distance(&self, from: &FunctionType, to: &FunctionType) -> Option<u32> {
        if from.arguments.len() > to.arguments.len() {
            return None;
        }
        let mut total = 0;
        for (provided, expected) in from.arguments.iter().zip(&to.arguments) {
            total += self.distance(*expected, *provided)?;
        }
        if !self.is_void(to.return_type) {
            total += self.distance(from.return_type, to.return_type)?;
        }
        Some(total)
    }

    // ====== PLACEHOLDERS ======

    /// Top-level placeholder, possibly as a compound alternative
    pub fn is_placeholder(&self, ty: TypeId) -> bool {
        self.placeholder_in(ty).is_some()
    }

    /// First top-level placeholder in `ty`
    pub fn placeholder_in(&self, ty: TypeId) -> Option<TypeId> {
        match self.kind(ty) {
            TypeKind::Placeholder { .. } => Some(ty),
            TypeKind::Compound { alternatives, .. } => alternatives
                .iter()
                .copied()
                .find(|alternative| matches!(self.kind(*alternative), TypeKind::Placeholder { .. })),
            _ => None,
        }
    }

    /// Placeholder anywhere in the value's data (containers, compounds), but
    /// not inside function signatures: a generic function value is resolved
    /// enough to be passed around.
    pub fn has_unresolved(&self, ty: TypeId) -> bool {
        match self.kind(ty) {
            TypeKind::Placeholder { .. } => true,
            TypeKind::Array(element) | TypeKind::Set(element) => self.has_unresolved(*element),
            TypeKind::Map { key, element } => {
                self.has_unresolved(*key) || self.has_unresolved(*element)
            }
            TypeKind::Compound { alternatives, .. } => {
                alternatives.iter().any(|alternative| self.has_unresolved(*alternative))
            }
            _ => false,
        }
    }

    /// Placeholder anywhere in `ty`, function signatures included
    pub fn mentions_placeholder(&self, ty: TypeId) -> bool {
        match self.kind(ty) {
            TypeKind::Placeholder { .. } => true,
            TypeKind::Array(element) | TypeKind::Set(element) => self.mentions_placeholder(*element),
            TypeKind::Map { key, element } => {
                self.mentions_placeholder(*key) || self.mentions_placeholder(*element)
            }
            TypeKind::Compound { alternatives, .. } => {
                alternatives.iter().any(|alternative| self.mentions_placeholder(*alternative))
            }
            TypeKind::Function(signature) => {
                signature.arguments.iter().any(|argument| self.mentions_placeholder(*argument))
                    || self.mentions_placeholder(signature.return_type)
            }
            _ => false,
        }
    }

    /// Remove recursion placeholders from a return type. Top-level ones never
    /// produce a value and are dropped; nested ones (`array<?R>`) become `any`.
    pub fn without_recursion(&mut self, ty: TypeId) -> TypeId {
        let alternatives = self.alternatives(ty);
        let kept: Vec<TypeId> = alternatives
            .iter()
            .copied()
            .filter(|t| {
                !matches!(
                    self.kind(*t),
                    TypeKind::Placeholder { kind: PlaceholderKind::Recursion, .. }
                )
            })
            .collect();
        let stripped = if kept.len() == alternatives.len() { ty } else { self.compound(kept) };
        self.replace_placeholders(stripped, Some(PlaceholderKind::Recursion))
    }

    /// Replace every placeholder with `any`, deeply
    pub fn erase_placeholders(&mut self, ty: TypeId) -> TypeId {
        self.replace_placeholders(ty, None)
    }

    /// Replace placeholders of `only` that kind (all of them for `None`) with `any`
    fn replace_placeholders(&mut self, ty: TypeId, only: Option<PlaceholderKind>) -> TypeId {
        let modifiers = self.modifiers(ty);
        let replaced = match self.kind(ty).clone() {
            TypeKind::Placeholder { kind, .. } if only.map_or(true, |only| only == kind) => {
                return TypeId::ANY
            }
            TypeKind::Array(element) => {
                let element = self.replace_placeholders(element, only);
                self.array(element)
            }
            TypeKind::Set(element) => {
                let element = self.replace_placeholders(element, only);
                self.set(element)
            }
            TypeKind::Map { key, element } => {
                let key = self.replace_placeholders(key, only);
                let element = self.replace_placeholders(element, only);
                self.map(key, element)
            }
            TypeKind::Compound { alternatives, .. } => {
                let alternatives: Vec<TypeId> =
                    alternatives.into_iter().map(|t| self.replace_placeholders(t, only)).collect();
                self.compound(alternatives)
            }
            TypeKind::Function(signature) => {
                let arguments = signature
                    .arguments
                    .iter()
                    .map(|t| self.replace_placeholders(*t, only))
                    .collect();
                let return_type = self.replace_placeholders(signature.return_type, only);
                self.function_type(FunctionType { arguments, return_type, ..signature })
            }
            _ => return ty,
        };
        self.with_modifiers(replaced, modifiers)
    }
}
