//! # Standard Library Catalog
//!
//! Signatures of the built-in modules and operators, as overload sets the
//! resolver can score. Methods take their receiver as the first parameter;
//! calling one through the module name (`Array.size(a)`) passes the receiver
//! explicitly.

use std::collections::HashMap;

use crate::arena::InternedString;
use crate::callable::{Callable, CallableVersion, Implementation, TypeMutator};
use crate::type_registry::{TypeId, TypeKind, TypeRegistry};
use crate::typed_ast::{BinaryOp, UnaryOp};

/// Methods of one built-in class
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub name: String,
    pub methods: HashMap<InternedString, Callable>,
    pub static_methods: HashMap<InternedString, Callable>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    pub fn method(&self, name: InternedString) -> Option<&Callable> {
        self.methods.get(&name)
    }

    /// Static method, or a method called with an explicit receiver
    pub fn static_method(&self, name: InternedString) -> Option<&Callable> {
        self.static_methods.get(&name).or_else(|| self.methods.get(&name))
    }
}

#[derive(Debug, Clone, Default)]
pub struct StandardLibrary {
    modules: HashMap<InternedString, Module>,
    operators: HashMap<BinaryOp, Callable>,
    unary_operators: HashMap<UnaryOp, Callable>,
}

impl StandardLibrary {
    /// Catalog with nothing in it
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in catalog
    pub fn new(registry: &mut TypeRegistry) -> Self {
        let mut library = Self::empty();
        library.add_operators(registry);
        library.add_module(number_module(registry));
        library.add_module(string_module(registry));
        library.add_module(array_module(registry));
        library.add_module(map_module(registry));
        library.add_module(set_module(registry));
        library.add_module(interval_module(registry));
        library.add_module(system_module(registry));
        for name in ["Boolean", "Null", "Object", "Function", "Class"] {
            library.add_module(Module::new(name));
        }
        log::debug!("[STDLIB] {} module(s), {} operator(s)", library.modules.len(), library.operators.len());
        library
    }

    pub fn add_module(&mut self, module: Module) {
        self.modules.insert(InternedString::from(module.name.as_str()), module);
    }

    pub fn add_operator(&mut self, op: BinaryOp, callable: Callable) {
        self.operators.insert(op, callable);
    }

    pub fn module(&self, name: InternedString) -> Option<&Module> {
        self.modules.get(&name)
    }

    /// Module whose methods apply to values of `ty` (modifiers stripped)
    pub fn module_for(&self, registry: &TypeRegistry, ty: TypeId) -> Option<&Module> {
        let name = match registry.kind(ty) {
            TypeKind::Integer | TypeKind::Long | TypeKind::Real | TypeKind::Mpz => "Number",
            TypeKind::Boolean => "Boolean",
            TypeKind::String => "String",
            TypeKind::Array(_) => "Array",
            TypeKind::Map { .. } => "Map",
            TypeKind::Set(_) => "Set",
            TypeKind::Interval => "Interval",
            TypeKind::Null => "Null",
            TypeKind::Object => "Object",
            TypeKind::Function(_) => "Function",
            TypeKind::Class(_) => "Class",
            _ => return None,
        };
        self.modules.get(&InternedString::from(name))
    }

    pub fn operator(&self, op: BinaryOp) -> Option<&Callable> {
        self.operators.get(&op)
    }

    pub fn unary_operator(&self, op: UnaryOp) -> Option<&Callable> {
        self.unary_operators.get(&op)
    }

    fn add_operators(&mut self, registry: &mut TypeRegistry) {
        use TypeId as T;
        let numbers = [T::INTEGER, T::LONG, T::REAL, T::MPZ];

        let mut add = numeric(registry, "+", &numbers);
        add.add_version(native(registry, "+", vec![T::STRING, T::ANY], T::STRING));
        add.add_version(native(registry, "+", vec![T::ANY, T::STRING], T::STRING));
        self.add_operator(BinaryOp::Add, add);

        for op in [BinaryOp::Sub, BinaryOp::Mul, BinaryOp::Mod] {
            self.add_operator(op, numeric(registry, op.symbol(), &numbers));
        }
        // Division and power of integers produce reals.
        let mut div = Callable::new("/");
        div.add_version(native(registry, "/", vec![T::REAL, T::REAL], T::REAL));
        div.add_version(native(registry, "/", vec![T::MPZ, T::MPZ], T::MPZ));
        self.add_operator(BinaryOp::Div, div);
        let mut pow = Callable::new("**");
        pow.add_version(native(registry, "**", vec![T::INTEGER, T::INTEGER], T::INTEGER));
        pow.add_version(native(registry, "**", vec![T::REAL, T::REAL], T::REAL));
        pow.add_version(native(registry, "**", vec![T::MPZ, T::INTEGER], T::MPZ));
        self.add_operator(BinaryOp::Pow, pow);

        for op in [BinaryOp::Eq, BinaryOp::Ne] {
            let callable = Callable::new(op.symbol())
                .with_version(intrinsic(registry, op.symbol(), vec![T::ANY, T::ANY], T::BOOLEAN));
            self.add_operator(op, callable);
        }
        for op in [BinaryOp::Lt, BinaryOp::Le, BinaryOp::Gt, BinaryOp::Ge] {
            let mut callable = Callable::new(op.symbol());
            for number in numbers {
                callable.add_version(native(registry, op.symbol(), vec![number, number], T::BOOLEAN));
            }
            callable.add_version(native(registry, op.symbol(), vec![T::STRING, T::STRING], T::BOOLEAN));
            callable.add_version(native(registry, op.symbol(), vec![T::ANY, T::ANY], T::BOOLEAN));
            self.add_operator(op, callable);
        }
        for op in [BinaryOp::And, BinaryOp::Or] {
            let callable = Callable::new(op.symbol())
                .with_version(intrinsic(registry, op.symbol(), vec![T::ANY, T::ANY], T::BOOLEAN));
            self.add_operator(op, callable);
        }

        // The assigned variable takes the value's type.
        let t = registry.template("T");
        let assign = intrinsic(registry, "=", vec![T::ANY, t], t)
            .with_templates(vec![t])
            .with_mutator(TypeMutator::ChangeValue);
        self.add_operator(BinaryOp::Assign, Callable::new("=").with_version(assign));

        let mut neg = Callable::new("-");
        for number in numbers {
            neg.add_version(native(registry, "-", vec![number], number));
        }
        self.unary_operators.insert(UnaryOp::Neg, neg);
        let not = Callable::new("!").with_version(native(registry, "!", vec![T::ANY], T::BOOLEAN));
        self.unary_operators.insert(UnaryOp::Not, not);
    }
}

fn native(registry: &mut TypeRegistry, symbol: &str, arguments: Vec<TypeId>, returns: TypeId) -> CallableVersion {
    let ty = registry.function(arguments, returns);
    CallableVersion::new(symbol, ty, Implementation::Native(symbol.to_string()))
}

/// Operator the backend expands inline
fn intrinsic(registry: &mut TypeRegistry, symbol: &str, arguments: Vec<TypeId>, returns: TypeId) -> CallableVersion {
    let ty = registry.function(arguments, returns);
    CallableVersion::new(symbol, ty, Implementation::Intrinsic(symbol.to_string()))
}

/// Same-type version for each numeric type, in widening order
fn numeric(registry: &mut TypeRegistry, symbol: &str, numbers: &[TypeId]) -> Callable {
    let mut callable = Callable::new(symbol);
    for number in numbers {
        callable.add_version(native(registry, symbol, vec![*number, *number], *number));
    }
    callable
}

struct ModuleBuilder<'r> {
    registry: &'r mut TypeRegistry,
    module: Module,
}

impl<'r> ModuleBuilder<'r> {
    fn new(registry: &'r mut TypeRegistry, name: &str) -> Self {
        Self { registry, module: Module::new(name) }
    }

    fn symbol(&self, name: &str) -> String {
        format!("{}.{}", self.module.name, name)
    }

    fn method(&mut self, name: &str, versions: Vec<CallableVersion>) -> &mut Self {
        let mut callable = Callable::new(self.symbol(name));
        for version in versions {
            callable.add_version(version.method());
        }
        self.module.methods.insert(InternedString::from(name), callable);
        self
    }

    fn static_method(&mut self, name: &str, versions: Vec<CallableVersion>) -> &mut Self {
        let mut callable = Callable::new(self.symbol(name));
        for version in versions {
            callable.add_version(version);
        }
        self.module.static_methods.insert(InternedString::from(name), callable);
        self
    }

    fn native(&mut self, name: &str, arguments: Vec<TypeId>, returns: TypeId) -> CallableVersion {
        let symbol = self.symbol(name);
        native(self.registry, &symbol, arguments, returns)
    }

    fn build(self) -> Module {
        self.module
    }
}

fn number_module(registry: &mut TypeRegistry) -> Module {
    use TypeId as T;
    let mut m = ModuleBuilder::new(registry, "Number");
    let abs = vec![
        m.native("abs", vec![T::INTEGER], T::INTEGER),
        m.native("abs", vec![T::LONG], T::LONG),
        m.native("abs", vec![T::REAL], T::REAL),
    ];
    let sqrt = vec![m.native("sqrt", vec![T::REAL], T::REAL)];
    let cos = vec![m.native("cos", vec![T::REAL], T::REAL)];
    let floor = vec![m.native("floor", vec![T::REAL], T::INTEGER)];
    let max = vec![
        m.native("max", vec![T::INTEGER, T::INTEGER], T::INTEGER),
        m.native("max", vec![T::REAL, T::REAL], T::REAL),
    ];
    m.method("abs", abs).method("sqrt", sqrt).method("cos", cos).method("floor", floor).method("max", max);
    m.build()
}

fn string_module(registry: &mut TypeRegistry) -> Module {
    use TypeId as T;
    let mut m = ModuleBuilder::new(registry, "String");
    let tmp_string = m.registry.temporary(T::STRING);
    let strings = m.registry.array(T::STRING);
    let tmp_strings = m.registry.temporary(strings);
    let size = vec![m.native("size", vec![T::STRING], T::INTEGER)];
    let upper = vec![m.native("toUpper", vec![T::STRING], tmp_string)];
    let lower = vec![m.native("toLower", vec![T::STRING], tmp_string)];
    let substring = vec![m.native("substring", vec![T::STRING, T::INTEGER, T::INTEGER], tmp_string)];
    let replace = vec![m.native("replace", vec![T::STRING, T::STRING, T::STRING], tmp_string)];
    let split = vec![m.native("split", vec![T::STRING, T::STRING], tmp_strings)];
    let contains = vec![m.native("contains", vec![T::STRING, T::STRING], T::BOOLEAN)];
    m.method("size", size)
        .method("toUpper", upper)
        .method("toLower", lower)
        .method("substring", substring)
        .method("replace", replace)
        .method("split", split)
        .method("contains", contains);
    m.build()
}

fn array_module(registry: &mut TypeRegistry) -> Module {
    use TypeId as T;
    let mut m = ModuleBuilder::new(registry, "Array");
    let r = &mut *m.registry;
    let any_array = r.array(T::ANY);
    let const_any_array = r.constant(any_array);
    let int_array = r.array(T::INTEGER);
    let real_array = r.array(T::REAL);
    let t = r.template("T");
    let u = r.template("R");
    let array_t = r.array(t);
    let tmp_array_t = r.tmp_array(t);
    let tmp_array_u = r.tmp_array(u);
    let mapper = r.function(vec![t], u);
    let predicate = r.function(vec![t], T::BOOLEAN);
    let folder = r.function(vec![u, t], u);
    let tmp_string = r.temporary(T::STRING);

    let size = vec![m.native("size", vec![const_any_array], T::INTEGER)];
    let push = vec![
        m.native("push", vec![int_array, T::INTEGER], int_array).with_mutator(TypeMutator::WillStore),
        m.native("push", vec![real_array, T::REAL], real_array).with_mutator(TypeMutator::WillStore),
        m.native("push", vec![any_array, T::ANY], any_array).with_mutator(TypeMutator::WillStore),
    ];
    let map = vec![m.native("map", vec![array_t, mapper], tmp_array_u).with_templates(vec![t, u])];
    let filter = vec![m.native("filter", vec![array_t, predicate], tmp_array_t).with_templates(vec![t])];
    let fold = vec![m.native("foldLeft", vec![array_t, folder, u], u).with_templates(vec![t, u])];
    let first = vec![m.native("first", vec![array_t], t).with_templates(vec![t])];
    let contains = vec![m.native("contains", vec![const_any_array, T::ANY], T::BOOLEAN)];
    let join = vec![m.native("join", vec![const_any_array, T::STRING], tmp_string)];
    m.method("size", size)
        .method("push", push)
        .method("map", map)
        .method("filter", filter)
        .method("foldLeft", fold)
        .method("first", first)
        .method("contains", contains)
        .method("join", join);
    m.build()
}

fn map_module(registry: &mut TypeRegistry) -> Module {
    use TypeId as T;
    let mut m = ModuleBuilder::new(registry, "Map");
    let r = &mut *m.registry;
    let any_map = r.map(T::ANY, T::ANY);
    let k = r.template("K");
    let v = r.template("T");
    let u = r.template("R");
    let map_kv = r.map(k, v);
    let keys = r.tmp_array(k);
    let values = r.tmp_array(v);
    let folder = r.function(vec![u, k, v], u);

    let size = vec![m.native("size", vec![any_map], T::INTEGER)];
    let keys = vec![m.native("keys", vec![map_kv], keys).with_templates(vec![k, v])];
    let values = vec![m.native("values", vec![map_kv], values).with_templates(vec![k, v])];
    let fold = vec![m.native("foldLeft", vec![map_kv, folder, u], u).with_templates(vec![k, v, u])];
    let contains = vec![m.native("contains", vec![any_map, T::ANY], T::BOOLEAN)];
    let insert = vec![m.native("insert", vec![any_map, T::ANY, T::ANY], T::BOOLEAN)];
    m.method("size", size)
        .method("keys", keys)
        .method("values", values)
        .method("foldLeft", fold)
        .method("contains", contains)
        .method("insert", insert);
    m.build()
}

fn set_module(registry: &mut TypeRegistry) -> Module {
    use TypeId as T;
    let mut m = ModuleBuilder::new(registry, "Set");
    let any_set = m.registry.set(T::ANY);
    let size = vec![m.native("size", vec![any_set], T::INTEGER)];
    let insert = vec![m.native("insert", vec![any_set, T::ANY], T::BOOLEAN).with_mutator(TypeMutator::WillStore)];
    let contains = vec![m.native("contains", vec![any_set, T::ANY], T::BOOLEAN)];
    m.method("size", size).method("insert", insert).method("contains", contains);
    m.build()
}

fn interval_module(registry: &mut TypeRegistry) -> Module {
    let mut m = ModuleBuilder::new(registry, "Interval");
    let size = vec![m.native("size", vec![TypeId::INTERVAL], TypeId::INTEGER)];
    m.method("size", size);
    m.build()
}

fn system_module(registry: &mut TypeRegistry) -> Module {
    let mut m = ModuleBuilder::new(registry, "System");
    let print = vec![m.native("print", vec![TypeId::ANY], TypeId::VOID)];
    let fail = vec![m.native("throw", vec![TypeId::ANY], TypeId::NEVER).throws()];
    m.static_method("print", print).static_method("throw", fail);
    m.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_for_number_kinds() {
        let mut registry = TypeRegistry::new();
        let library = StandardLibrary::new(&mut registry);
        for ty in [TypeId::INTEGER, TypeId::LONG, TypeId::REAL, TypeId::MPZ] {
            assert_eq!(library.module_for(&registry, ty).map(|m| m.name.as_str()), Some("Number"));
        }
        let strings = registry.array(TypeId::STRING);
        assert_eq!(library.module_for(&registry, strings).map(|m| m.name.as_str()), Some("Array"));
        assert!(library.module_for(&registry, TypeId::ANY).is_none());
    }

    #[test]
    fn test_equality_is_inline() {
        let mut registry = TypeRegistry::new();
        let library = StandardLibrary::new(&mut registry);
        let eq = library.operator(BinaryOp::Eq).unwrap();
        assert_eq!(eq.versions[0].implementation, Implementation::Intrinsic("==".to_string()));
        let add = library.operator(BinaryOp::Add).unwrap();
        assert!(matches!(add.versions[0].implementation, Implementation::Native(_)));
    }

    #[test]
    fn test_static_lookup_falls_back_to_methods() {
        let mut registry = TypeRegistry::new();
        let library = StandardLibrary::new(&mut registry);
        let array = library.module(InternedString::from("Array")).unwrap();
        assert!(array.static_method(InternedString::from("size")).is_some());
        let system = library.module(InternedString::from("System")).unwrap();
        assert!(system.method(InternedString::from("print")).is_none());
        assert!(system.static_method(InternedString::from("print")).is_some());
    }
}
