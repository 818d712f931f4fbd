//! # Function Specialization Demonstration
//!
//! Analyzes a small Leek program and prints every version the analyzer
//! generated for each user function, with the diagnostics it collected.
//!
//! ```leek
//! let fact = x -> if x == 1 { 1 } else { fact(x - 1) * x }
//! let twice = x -> x + x
//! twice(fact(10))
//! twice(2.5)
//! [1, 2].map(x -> x * 0.5)
//! ```
//!
//! Run with `RUST_LOG=debug` to see resolution and specialization traces.

use leek_analyzer::{BinaryOp, SemanticAnalyzer, TypedASTBuilder, TypedProgram};

fn program(b: &TypedASTBuilder) -> TypedProgram {
    let s = b.dummy_span();

    let condition = b.binary(BinaryOp::Eq, b.variable("x", s), b.int_literal(1, s), s);
    let previous = b.binary(BinaryOp::Sub, b.variable("x", s), b.int_literal(1, s), s);
    let recursion = b.call(b.variable("fact", s), vec![previous], s);
    let product = b.binary(BinaryOp::Mul, recursion, b.variable("x", s), s);
    let fact = b.if_expr(
        condition,
        b.block(vec![b.expression_statement(b.int_literal(1, s))]),
        Some(b.block(vec![b.expression_statement(product)])),
        s,
    );
    let twice = b.binary(BinaryOp::Add, b.variable("x", s), b.variable("x", s), s);
    let half = b.binary(BinaryOp::Mul, b.variable("x", s), b.real_literal(0.5, s), s);
    let array = b.array_literal(vec![b.int_literal(1, s), b.int_literal(2, s)], s);

    b.program(
        vec![
            b.let_statement("fact", b.lambda(&["x"], fact, s), s),
            b.let_statement("twice", b.lambda(&["x"], twice, s), s),
            b.expression_statement(b.call(
                b.variable("twice", s),
                vec![b.call(b.variable("fact", s), vec![b.int_literal(10, s)], s)],
                s,
            )),
            b.expression_statement(b.call(b.variable("twice", s), vec![b.real_literal(2.5, s)], s)),
            b.expression_statement(b.method_call(array, "map", vec![b.lambda(&["x"], half, s)], s)),
        ],
        s,
    )
}

fn main() {
    env_logger::init();

    let b = TypedASTBuilder::new();
    let mut program = program(&b);
    let mut analyzer = SemanticAnalyzer::new();
    let result = analyzer.analyze(&mut program);
    let registry = analyzer.registry();

    println!("Program value: {}\n", registry.display(result));
    for function in analyzer.functions().iter() {
        println!(
            "{}{}",
            function.display_name(),
            if function.recursive { " (recursive)" } else { "" }
        );
        for (slot, version) in function.all_versions() {
            println!("  {:?}: {}", slot, registry.display(version.ty));
        }
    }

    if analyzer.diagnostics().has_errors() {
        println!("\nDiagnostics:");
        for diagnostic in analyzer.diagnostics().diagnostics() {
            println!("  {}", diagnostic);
        }
    }
}
