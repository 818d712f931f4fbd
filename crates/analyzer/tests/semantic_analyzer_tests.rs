//! # Semantic Analyzer Tests
//!
//! Typing of literals, control flow and built-in calls, and the diagnostics
//! reported for ill-typed programs. Analysis keeps going after an error, so
//! several tests check more than one statement.

use leek_analyzer::*;

#[cfg(test)]
mod semantic_analyzer_tests {
    use super::*;

    fn span() -> Span {
        Span::new(0, 10)
    }

    fn analyze(statements: Vec<TypedStmt>) -> (SemanticAnalyzer, TypeId) {
        let _ = env_logger::builder().is_test(true).try_init();
        let b = TypedASTBuilder::new();
        let mut program = b.program(statements, span());
        let mut analyzer = SemanticAnalyzer::new();
        let ty = analyzer.analyze(&mut program);
        (analyzer, ty)
    }

    fn single_error(analyzer: &SemanticAnalyzer, kind: ErrorKind) -> Diagnostic {
        let found: Vec<&Diagnostic> = analyzer.diagnostics().of_kind(kind).collect();
        assert_eq!(found.len(), 1, "diagnostics: {:?}", analyzer.diagnostics().diagnostics());
        found[0].clone()
    }

    // ====== LITERALS AND CONTAINERS ======

    #[test]
    fn test_literal_types() {
        let b = TypedASTBuilder::new();
        let s = span();
        let cases = vec![
            (b.null_literal(s), TypeId::NULL),
            (b.bool_literal(true, s), TypeId::BOOLEAN),
            (b.int_literal(12, s), TypeId::INTEGER),
            (b.long_literal(1 << 40, s), TypeId::LONG),
            (b.real_literal(0.5, s), TypeId::REAL),
        ];
        for (literal, expected) in cases {
            let (analyzer, ty) = analyze(vec![b.expression_statement(literal)]);
            assert!(!analyzer.diagnostics().has_errors());
            assert_eq!(ty, expected);
        }

        let (analyzer, ty) = analyze(vec![b.expression_statement(b.string_literal("leek", s))]);
        assert!(analyzer.registry().is_temporary(ty));
        assert!(matches!(analyzer.registry().kind(ty), TypeKind::String));
    }

    #[test]
    fn test_heterogeneous_array_has_compound_element() {
        let b = TypedASTBuilder::new();
        let s = span();
        let array = b.array_literal(
            vec![b.int_literal(1, s), b.string_literal("a", s), b.bool_literal(true, s)],
            s,
        );
        let (analyzer, ty) = analyze(vec![b.expression_statement(array)]);
        assert!(!analyzer.diagnostics().has_errors());

        let registry = analyzer.registry();
        let element = registry.element(ty).unwrap();
        assert!(registry.is_compound(element));
        assert_eq!(
            registry.alternatives(element),
            vec![TypeId::BOOLEAN, TypeId::INTEGER, TypeId::STRING]
        );
    }

    #[test]
    fn test_empty_array_holds_never() {
        let b = TypedASTBuilder::new();
        let s = span();
        let (analyzer, ty) = analyze(vec![b.expression_statement(b.array_literal(vec![], s))]);
        assert_eq!(analyzer.registry().element(ty), Some(TypeId::NEVER));
    }

    #[test]
    fn test_map_and_set_literals() {
        let b = TypedASTBuilder::new();
        let s = span();
        let map = b.map_literal(vec![(b.string_literal("a", s), b.int_literal(1, s))], s);
        let (analyzer, ty) = analyze(vec![b.expression_statement(map)]);
        let registry = analyzer.registry();
        assert!(registry.is_temporary(ty));
        assert_eq!(registry.key(ty), Some(TypeId::STRING));
        assert_eq!(registry.element(ty), Some(TypeId::INTEGER));

        let set = b.set_literal(vec![b.real_literal(1.0, s), b.real_literal(2.0, s)], s);
        let (analyzer, ty) = analyze(vec![b.expression_statement(set)]);
        assert!(matches!(analyzer.registry().kind(ty), TypeKind::Set(TypeId::REAL)));
    }

    #[test]
    fn test_index_types() {
        let b = TypedASTBuilder::new();
        let s = span();
        let interval = b.interval(b.int_literal(1, s), b.int_literal(5, s), s);
        let (_, ty) = analyze(vec![b.expression_statement(b.index(interval, b.int_literal(0, s), s))]);
        assert_eq!(ty, TypeId::INTEGER);

        let map = b.map_literal(vec![(b.string_literal("a", s), b.real_literal(1.5, s))], s);
        let (analyzer, ty) =
            analyze(vec![b.expression_statement(b.index(map, b.string_literal("a", s), s))]);
        assert!(!analyzer.diagnostics().has_errors());
        assert_eq!(ty, TypeId::REAL);
    }

    // ====== CONTROL FLOW ======

    #[test]
    fn test_if_without_else_may_be_null() {
        let b = TypedASTBuilder::new();
        let s = span();
        let branch = b.if_expr(
            b.bool_literal(true, s),
            b.block(vec![b.expression_statement(b.int_literal(1, s))]),
            None,
            s,
        );
        let (analyzer, ty) = analyze(vec![b.expression_statement(branch)]);
        assert_eq!(analyzer.registry().alternatives(ty), vec![TypeId::INTEGER, TypeId::NULL]);
    }

    #[test]
    fn test_early_return_joins_with_trailing_value() {
        // let f = x -> { if x { return 1.5 } 2 }; f(true)
        let b = TypedASTBuilder::new();
        let s = span();
        let early = b.if_expr(
            b.variable("x", s),
            b.block(vec![b.return_stmt(Some(b.real_literal(1.5, s)), s)]),
            None,
            s,
        );
        let body = b.block(vec![b.expression_statement(early), b.expression_statement(b.int_literal(2, s))]);
        let (analyzer, ty) = analyze(vec![
            b.let_statement("f", b.function(vec![b.parameter("x", s)], body, s), s),
            b.expression_statement(b.call(b.variable("f", s), vec![b.bool_literal(true, s)], s)),
        ]);
        assert!(!analyzer.diagnostics().has_errors());
        assert_eq!(analyzer.registry().alternatives(ty), vec![TypeId::INTEGER, TypeId::REAL]);
    }

    #[test]
    fn test_throwing_function() {
        // let fail = x -> System.throw(x); fail(1)
        let b = TypedASTBuilder::new();
        let s = span();
        let throw = b.method_call(b.variable("System", s), "throw", vec![b.variable("x", s)], s);
        let (analyzer, ty) = analyze(vec![
            b.let_statement("fail", b.lambda(&["x"], throw, s), s),
            b.expression_statement(b.call(b.variable("fail", s), vec![b.int_literal(1, s)], s)),
        ]);
        assert!(!analyzer.diagnostics().has_errors());
        assert_eq!(ty, TypeId::NEVER);
        let fail = analyzer.functions().find_by_name("fail").unwrap();
        assert!(fail.version(&[TypeId::INTEGER]).unwrap().throws);
    }

    // ====== BUILT-IN CALLS ======

    #[test]
    fn test_push_widens_receiver_variable() {
        // let a = []; a.push(1); a
        let b = TypedASTBuilder::new();
        let s = span();
        let (mut analyzer, ty) = analyze(vec![
            b.let_statement("a", b.array_literal(vec![], s), s),
            b.expression_statement(b.method_call(b.variable("a", s), "push", vec![b.int_literal(1, s)], s)),
            b.expression_statement(b.variable("a", s)),
        ]);
        assert!(!analyzer.diagnostics().has_errors());
        assert_eq!(ty, analyzer.registry_mut().array(TypeId::INTEGER));
    }

    #[test]
    fn test_filter_keeps_element_type() {
        // [1, 2, 3].filter(x -> x > 1)
        let b = TypedASTBuilder::new();
        let s = span();
        let array = b.array_literal(vec![b.int_literal(1, s), b.int_literal(2, s), b.int_literal(3, s)], s);
        let predicate = b.lambda(&["x"], b.binary(BinaryOp::Gt, b.variable("x", s), b.int_literal(1, s), s), s);
        let (analyzer, ty) = analyze(vec![b.expression_statement(b.method_call(array, "filter", vec![predicate], s))]);
        assert!(!analyzer.diagnostics().has_errors());
        assert_eq!(analyzer.registry().element(ty), Some(TypeId::INTEGER));
    }

    #[test]
    fn test_static_call_through_module_name() {
        // Number.abs(-3)
        let b = TypedASTBuilder::new();
        let s = span();
        let negative = b.unary(UnaryOp::Neg, b.int_literal(3, s), s);
        let (analyzer, ty) = analyze(vec![b.expression_statement(b.method_call(
            b.variable("Number", s),
            "abs",
            vec![negative],
            s,
        ))]);
        assert!(!analyzer.diagnostics().has_errors());
        assert_eq!(ty, TypeId::INTEGER);
    }

    #[test]
    fn test_dynamic_method_on_parameter_is_silent() {
        // let g = x -> x.foo(1)
        let b = TypedASTBuilder::new();
        let s = span();
        let body = b.method_call(b.variable("x", s), "foo", vec![b.int_literal(1, s)], s);
        let (analyzer, _) = analyze(vec![b.let_statement("g", b.lambda(&["x"], body, s), s)]);
        assert!(!analyzer.diagnostics().has_errors());
    }

    // ====== DIAGNOSTICS ======

    #[test]
    fn test_undefined_variable() {
        let b = TypedASTBuilder::new();
        let s = span();
        let (analyzer, ty) = analyze(vec![b.expression_statement(b.variable("y", s))]);
        assert_eq!(ty, TypeId::NEVER);
        let error = single_error(&analyzer, ErrorKind::UndefinedVariable);
        assert_eq!(error.parameters, vec!["y"]);
        assert_eq!(error.code, codes::E0001);
    }

    #[test]
    fn test_wrong_argument_count() {
        let b = TypedASTBuilder::new();
        let s = span();
        let sum = || b.binary(BinaryOp::Add, b.variable("x", s), b.variable("y", s), s);

        let (analyzer, _) = analyze(vec![
            b.let_statement("f", b.lambda(&["x", "y"], sum(), s), s),
            b.expression_statement(b.call(b.variable("f", s), vec![b.int_literal(5, s)], s)),
        ]);
        let error = single_error(&analyzer, ErrorKind::WrongArgumentCount);
        assert_eq!(error.parameters, vec!["f", "2", "1", "fun(any, any) => any"]);

        let (analyzer, _) = analyze(vec![
            b.let_statement("add", b.lambda(&["x", "y"], sum(), s), s),
            b.expression_statement(b.call(
                b.variable("add", s),
                vec![b.int_literal(5, s), b.int_literal(12, s), b.int_literal(13, s)],
                s,
            )),
        ]);
        let error = single_error(&analyzer, ErrorKind::WrongArgumentCount);
        assert_eq!(error.parameters, vec!["add", "2", "3", "fun(any, any) => any"]);
        assert_eq!(error.message(), "`add` expects 2 argument(s), 3 given");

        let identity = b.lambda(&["x"], b.variable("x", s), s);
        let (analyzer, _) = analyze(vec![b.expression_statement(b.call(identity, vec![], s))]);
        let error = single_error(&analyzer, ErrorKind::WrongArgumentCount);
        assert_eq!(error.parameters, vec!["<function>", "1", "0", "fun(any) => any"]);
    }

    #[test]
    fn test_cannot_call_value() {
        let b = TypedASTBuilder::new();
        let s = span();
        let (analyzer, ty) = analyze(vec![b.expression_statement(b.call(b.null_literal(s), vec![], s))]);
        assert_eq!(ty, TypeId::NEVER);
        let error = single_error(&analyzer, ErrorKind::CannotCallValue);
        assert_eq!(error.parameters, vec!["null"]);
    }

    #[test]
    fn test_method_not_found() {
        let b = TypedASTBuilder::new();
        let s = span();
        let call = b.method_call(b.string_literal("hello", s), "foo", vec![], s);
        let (analyzer, _) = analyze(vec![b.expression_statement(call)]);
        let error = single_error(&analyzer, ErrorKind::MethodNotFound);
        assert_eq!(error.parameters[1], "foo");
    }

    #[test]
    fn test_static_method_not_found() {
        let b = TypedASTBuilder::new();
        let s = span();
        let call = b.method_call(b.variable("String", s), "foo", vec![b.string_literal("a", s)], s);
        let (analyzer, _) = analyze(vec![b.expression_statement(call)]);
        let error = single_error(&analyzer, ErrorKind::StaticMethodNotFound);
        assert_eq!(error.parameters[0], "String");
        assert_eq!(error.parameters[1], "foo");
    }

    #[test]
    fn test_array_key_must_be_number() {
        let b = TypedASTBuilder::new();
        let s = span();
        let array = b.array_literal(vec![b.int_literal(1, s), b.int_literal(2, s)], s);
        let access = b.index(array, b.string_literal("a", s), s);
        let (analyzer, ty) = analyze(vec![b.expression_statement(access)]);
        assert_eq!(ty, TypeId::NEVER);
        single_error(&analyzer, ErrorKind::ArrayAccessKeyMustBeNumber);
    }

    #[test]
    fn test_value_not_indexable() {
        let b = TypedASTBuilder::new();
        let s = span();
        let access = b.index(b.int_literal(12, s), b.int_literal(0, s), s);
        let (analyzer, _) = analyze(vec![b.expression_statement(access)]);
        let error = single_error(&analyzer, ErrorKind::ValueNotIndexable);
        assert_eq!(error.parameters, vec!["int"]);
    }

    #[test]
    fn test_cant_assign_void() {
        // let a = System.print(1)
        let b = TypedASTBuilder::new();
        let s = span();
        let print = b.method_call(b.variable("System", s), "print", vec![b.int_literal(1, s)], s);
        let (analyzer, _) = analyze(vec![b.let_statement("a", print, s)]);
        let error = single_error(&analyzer, ErrorKind::CantAssignVoid);
        assert_eq!(error.parameters, vec!["a"]);
    }

    #[test]
    fn test_possibly_void_branch_is_not_a_value() {
        // let v = if true { } else { 1 }; v
        let b = TypedASTBuilder::new();
        let s = span();
        let branch = b.if_expr(
            b.bool_literal(true, s),
            b.block(vec![]),
            Some(b.block(vec![b.expression_statement(b.int_literal(1, s))])),
            s,
        );
        let (analyzer, ty) = analyze(vec![
            b.let_statement("v", branch, s),
            b.expression_statement(b.variable("v", s)),
        ]);
        let error = single_error(&analyzer, ErrorKind::CantAssignVoid);
        assert_eq!(error.parameters, vec!["v"]);
        assert_eq!(ty, TypeId::NEVER);
    }

    #[test]
    fn test_assignment_changes_variable_type() {
        // let a = 1; a = 'x'; a
        let b = TypedASTBuilder::new();
        let s = span();
        let mut program = b.program(
            vec![
                b.let_statement("a", b.int_literal(1, s), s),
                b.expression_statement(b.assign("a", b.string_literal("x", s), s)),
                b.expression_statement(b.variable("a", s)),
            ],
            s,
        );
        let mut analyzer = SemanticAnalyzer::new();
        assert_eq!(analyzer.analyze(&mut program), TypeId::STRING);
        assert!(!analyzer.diagnostics().has_errors());

        let TypedStatement::Expression(assignment) = &program.body.statements[1].node else {
            panic!("expected an expression statement");
        };
        assert_eq!(assignment.ty, TypeId::STRING);
        let TypedExpression::Binary(binary) = &assignment.node else {
            panic!("expected a binary expression");
        };
        let version = binary.resolved.as_ref().and_then(|r| r.version.as_ref()).unwrap();
        assert_eq!(version.mutators, vec![TypeMutator::ChangeValue]);
    }

    #[test]
    fn test_no_such_operator() {
        let b = TypedASTBuilder::new();
        let s = span();
        let difference = b.binary(BinaryOp::Sub, b.string_literal("a", s), b.int_literal(1, s), s);
        let (analyzer, ty) = analyze(vec![b.expression_statement(difference)]);
        assert_eq!(ty, TypeId::NEVER);
        let error = single_error(&analyzer, ErrorKind::NoSuchOperator);
        assert_eq!(error.parameters[0], "-");
    }

    #[test]
    fn test_analysis_continues_after_errors() {
        let b = TypedASTBuilder::new();
        let s = span();
        let (analyzer, ty) = analyze(vec![
            b.expression_statement(b.variable("missing", s)),
            b.expression_statement(b.call(b.null_literal(s), vec![], s)),
            b.expression_statement(b.binary(BinaryOp::Add, b.int_literal(1, s), b.real_literal(1.5, s), s)),
        ]);
        assert_eq!(analyzer.diagnostics().error_count(), 2);
        assert_eq!(ty, TypeId::REAL);
    }

    #[test]
    fn test_error_cap_from_options() {
        let b = TypedASTBuilder::new();
        let s = span();
        let mut program = b.program(
            vec![
                b.expression_statement(b.variable("a", s)),
                b.expression_statement(b.variable("b", s)),
                b.expression_statement(b.variable("c", s)),
            ],
            s,
        );
        let options = AnalyzerOptions::from_json(r#"{ "max_errors": 2 }"#).unwrap();
        let mut analyzer = SemanticAnalyzer::with_options(options);
        analyzer.analyze(&mut program);
        assert_eq!(analyzer.diagnostics().error_count(), 3);
        assert_eq!(analyzer.diagnostics().diagnostics().len(), 2);
    }
}
