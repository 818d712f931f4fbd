//! # Type Algebra Tests
//!
//! Interning, distance, join/meet and placeholder handling on the registry.

use leek_analyzer::*;

#[cfg(test)]
mod type_algebra_tests {
    use super::*;

    #[test]
    fn test_structural_interning() {
        let mut registry = TypeRegistry::new();
        let a = registry.array(TypeId::INTEGER);
        let b = registry.array(TypeId::INTEGER);
        assert_eq!(a, b);

        let f = registry.function(vec![TypeId::INTEGER, a], TypeId::REAL);
        let g = registry.function(vec![TypeId::INTEGER, b], TypeId::REAL);
        assert_eq!(f, g);

        let tmp = registry.tmp_array(TypeId::INTEGER);
        assert_ne!(a, tmp);
        assert_eq!(registry.canonical(tmp), a);
    }

    #[test]
    fn test_templates_and_placeholders_are_fresh() {
        let mut registry = TypeRegistry::new();
        assert_ne!(registry.template("T"), registry.template("T"));
        let p = registry.placeholder(PlaceholderKind::Parameter);
        let q = registry.placeholder(PlaceholderKind::Parameter);
        assert_ne!(p, q);
    }

    #[test]
    fn test_distance_identity_and_widening() {
        let mut registry = TypeRegistry::new();
        let strings = registry.array(TypeId::STRING);
        for ty in [TypeId::INTEGER, TypeId::REAL, TypeId::STRING, strings] {
            assert_eq!(registry.distance(ty, ty), Some(0));
        }
        assert_eq!(registry.distance(TypeId::INTEGER, TypeId::LONG), Some(1));
        assert_eq!(registry.distance(TypeId::INTEGER, TypeId::REAL), Some(2));
        assert_eq!(registry.distance(TypeId::INTEGER, TypeId::MPZ), Some(3));
        assert_eq!(registry.distance(TypeId::REAL, TypeId::INTEGER), None);
        assert_eq!(registry.distance(TypeId::ANY, TypeId::INTEGER), None);
    }

    #[test]
    fn test_boxing_costs() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.distance(TypeId::STRING, TypeId::ANY), Some(1));
        assert_eq!(registry.distance(TypeId::INTEGER, TypeId::ANY), Some(2));
        assert_eq!(registry.distance(TypeId::NEVER, TypeId::STRING), Some(0));
        assert_eq!(registry.distance(TypeId::VOID, TypeId::ANY), None);
    }

    #[test]
    fn test_containers_sum_element_distances() {
        let mut registry = TypeRegistry::new();
        let ints = registry.array(TypeId::INTEGER);
        let reals = registry.array(TypeId::REAL);
        assert_eq!(registry.distance(ints, reals), Some(2));
        assert_eq!(registry.distance(reals, ints), None);

        let int_map = registry.map(TypeId::INTEGER, TypeId::INTEGER);
        let any_map = registry.map(TypeId::ANY, TypeId::ANY);
        assert_eq!(registry.distance(int_map, any_map), Some(4));
    }

    #[test]
    fn test_temporary_slot_rejects_stored_values() {
        let mut registry = TypeRegistry::new();
        let stored = registry.array(TypeId::INTEGER);
        let tmp = registry.tmp_array(TypeId::INTEGER);
        assert_eq!(registry.distance(tmp, stored), Some(0));
        assert_eq!(registry.distance(stored, tmp), None);
    }

    #[test]
    fn test_function_values_are_contravariant() {
        let mut registry = TypeRegistry::new();
        let takes_real = registry.function(vec![TypeId::REAL], TypeId::INTEGER);
        let takes_int = registry.function(vec![TypeId::INTEGER], TypeId::INTEGER);
        // A function accepting reals can stand where ints are passed.
        assert_eq!(registry.distance(takes_real, takes_int), Some(2));
        assert_eq!(registry.distance(takes_int, takes_real), None);

        let fewer = registry.function(vec![], TypeId::INTEGER);
        assert_eq!(registry.distance(fewer, takes_int), Some(0));
        let returns_void = registry.function(vec![TypeId::INTEGER], TypeId::VOID);
        assert_eq!(registry.distance(takes_int, returns_void), Some(0));
    }

    #[test]
    fn test_join_laws() {
        let mut registry = TypeRegistry::new();
        assert_eq!(registry.join(TypeId::NEVER, TypeId::STRING), TypeId::STRING);
        assert_eq!(registry.join(TypeId::REAL, TypeId::NEVER), TypeId::REAL);
        assert_eq!(registry.join(TypeId::INTEGER, TypeId::INTEGER), TypeId::INTEGER);

        let ab = registry.join(TypeId::INTEGER, TypeId::STRING);
        let ba = registry.join(TypeId::STRING, TypeId::INTEGER);
        assert_eq!(ab, ba);
        assert!(registry.is_compound(ab));
        assert_eq!(registry.join(ab, TypeId::INTEGER), ab);
    }

    #[test]
    fn test_compound_folding() {
        let mut registry = TypeRegistry::new();
        let numbers = registry.compound([TypeId::INTEGER, TypeId::REAL]);
        assert_eq!(registry.fold(numbers), TypeId::REAL);
        let big = registry.compound([TypeId::INTEGER, TypeId::MPZ]);
        assert_eq!(registry.fold(big), TypeId::MPZ);
        let mixed = registry.compound([TypeId::REAL, TypeId::MPZ]);
        assert_eq!(registry.fold(mixed), TypeId::ANY);
        let unrelated = registry.compound([TypeId::INTEGER, TypeId::STRING]);
        assert_eq!(registry.fold(unrelated), TypeId::ANY);

        let ints = registry.array(TypeId::INTEGER);
        let strings = registry.array(TypeId::STRING);
        let arrays = registry.compound([ints, strings]);
        let folded = registry.fold(arrays);
        let element = registry.element(folded).unwrap();
        assert_eq!(registry.alternatives(element), vec![TypeId::INTEGER, TypeId::STRING]);
    }

    #[test]
    fn test_compound_target_takes_cheapest_alternative() {
        let mut registry = TypeRegistry::new();
        let target = registry.compound([TypeId::REAL, TypeId::STRING]);
        assert_eq!(registry.distance(TypeId::STRING, target), Some(0));
        assert_eq!(registry.distance(TypeId::INTEGER, target), Some(2));
    }

    #[test]
    fn test_meet_narrows() {
        let mut registry = TypeRegistry::new();
        assert_eq!(registry.meet(TypeId::ANY, TypeId::INTEGER), TypeId::INTEGER);
        assert_eq!(registry.meet(TypeId::INTEGER, TypeId::REAL), TypeId::INTEGER);
        assert_eq!(registry.meet(TypeId::STRING, TypeId::INTEGER), TypeId::NEVER);
        assert_eq!(registry.meet(TypeId::NEVER, TypeId::ANY), TypeId::NEVER);

        let either = registry.compound([TypeId::INTEGER, TypeId::STRING]);
        assert_eq!(registry.meet(either, TypeId::STRING), TypeId::STRING);
    }

    #[test]
    fn test_placeholder_helpers() {
        let mut registry = TypeRegistry::new();
        let parameter = registry.placeholder(PlaceholderKind::Parameter);
        let recursion = registry.placeholder(PlaceholderKind::Recursion);

        let pending = registry.join(TypeId::INTEGER, recursion);
        assert!(registry.is_placeholder(pending));
        assert_eq!(registry.without_recursion(pending), TypeId::INTEGER);
        assert_eq!(registry.without_recursion(recursion), TypeId::NEVER);
        assert_eq!(registry.without_recursion(parameter), parameter);

        let nested = registry.array(parameter);
        assert!(!registry.is_placeholder(nested));
        assert!(registry.has_unresolved(nested));
        let signature = registry.function(vec![parameter], parameter);
        assert!(!registry.has_unresolved(signature));

        let erased = registry.erase_placeholders(nested);
        assert_eq!(erased, registry.array(TypeId::ANY));
    }

    #[test]
    fn test_display() {
        let mut registry = TypeRegistry::new();
        let ints = registry.array(TypeId::INTEGER);
        assert_eq!(registry.display(ints).to_string(), "array<int>");
        let f = registry.function(vec![TypeId::INTEGER, TypeId::STRING], TypeId::REAL);
        assert_eq!(registry.display(f).to_string(), "fun(int, string) => real");
        let either = registry.compound([TypeId::STRING, TypeId::INTEGER]);
        assert_eq!(registry.display(either).to_string(), "int | string");
    }
}
