//! # LeekScript Analyzer
//!
//! Front-end type system of the LeekScript compiler: the interned type model,
//! overload resolution, template unification, the function specialization
//! engine and the call-site driver that ties them together.
//!
//! ## Overview
//!
//! LeekScript is dynamically typed at the surface, but the compiler infers
//! static types where it can and generates one monomorphic version of each
//! user function per argument-type tuple it is called with:
//!
//! - **Type Model**: interned [`TypeId`] handles, compounds, templates and
//!   placeholders, with a distance metric driving overload selection
//! - **Overload Resolution**: cheapest version wins, earliest declared on ties
//! - **Specialization**: memoized versions, recursion fixpoint, closures and
//!   curried calls
//! - **Diagnostics**: structured errors, analysis never stops at the first one
//!
//! ## Architecture
//!
//! 1. The parser produces a [`TypedProgram`] with empty type slots
//! 2. [`SemanticAnalyzer::analyze`] walks it and fills every slot
//! 3. Call and operator nodes receive a [`ResolvedCall`] for the backend
//! 4. Default versions have placeholders erased before handoff
//!
//! ## Usage
//!
//! ```rust,no_run
//! use leek_analyzer::{BinaryOp, SemanticAnalyzer, TypedASTBuilder, TypeId};
//!
//! let b = TypedASTBuilder::new();
//! let s = b.dummy_span();
//!
//! // let inc = x -> x + 1; inc(12)
//! let body = b.binary(BinaryOp::Add, b.variable("x", s), b.int_literal(1, s), s);
//! let mut program = b.program(
//!     vec![
//!         b.let_statement("inc", b.lambda(&["x"], body, s), s),
//!         b.expression_statement(b.call(b.variable("inc", s), vec![b.int_literal(12, s)], s)),
//!     ],
//!     s,
//! );
//!
//! let mut analyzer = SemanticAnalyzer::new();
//! assert_eq!(analyzer.analyze(&mut program), TypeId::INTEGER);
//! assert!(!analyzer.diagnostics().has_errors());
//! ```

pub mod arena;

pub mod source;
pub mod error;
pub mod diagnostics;

pub mod type_registry;
pub mod type_algebra;
pub mod typed_ast;
pub mod typed_builder;

pub mod callable;
pub mod template_solver;
pub mod standard_library;
pub mod function;
pub mod semantic_analyzer;
pub mod specialization;
pub mod function_call;

// Re-exports for convenience
pub use arena::InternedString;

pub use source::{Location, SourceFile, Span};
pub use error::{AnalysisError, AnalysisResult};
pub use diagnostics::{
    codes, Diagnostic, DiagnosticBuilder, DiagnosticCode, DiagnosticCollector, DiagnosticLevel,
    ErrorKind,
};

pub use type_registry::{
    FunctionType, Modifiers, PlaceholderKind, TypeData, TypeId, TypeKind, TypeRegistry,
};

pub use typed_ast::{
    BinaryOp, ResolvedCall, TypedBlock, TypedCall, TypedExpr, TypedExpression, TypedFunction,
    TypedLiteral, TypedNode, TypedProgram, TypedStatement, TypedStmt, UnaryOp,
};
pub use typed_builder::TypedASTBuilder;

pub use callable::{
    Callable, CallableVersion, Implementation, ResolutionHost, Resolved, TypeMutator, VersionFlags,
};
pub use template_solver::UnificationContext;
pub use standard_library::{Module, StandardLibrary};
pub use function::{
    Capture, CaptureSource, Function, FunctionId, FunctionTable, FunctionVersion, VersionRef,
    VersionSlot,
};
pub use semantic_analyzer::{AnalyzerOptions, SemanticAnalyzer, VarId, VarScope, Variable};
pub use specialization::Specialization;
