//! # TypedAST Builder
//!
//! Fluent builder for untyped-yet trees handed to the analyzer. Every node is
//! created with a `void` type slot that analysis fills in.

use crate::arena::InternedString;
use crate::source::{SourceFile, Span};
use crate::typed_ast::*;

/// Fluent builder for TypedAST
#[derive(Debug, Default)]
pub struct TypedASTBuilder {
    source: Option<SourceFile>,
}

impl TypedASTBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the source file information for span tracking
    pub fn set_source(&mut self, file_name: impl Into<String>, content: impl Into<String>) {
        self.source = Some(SourceFile::new(file_name, content));
    }

    pub fn source(&self) -> Option<&SourceFile> {
        self.source.as_ref()
    }

    pub fn intern(&self, s: &str) -> InternedString {
        InternedString::from(s)
    }

    // ====== SPAN HELPERS ======

    pub fn span(&self, start: usize, end: usize) -> Span {
        Span::new(start, end)
    }

    /// Create a dummy span for testing
    pub fn dummy_span(&self) -> Span {
        Span::new(0, 0)
    }

    // ====== LITERALS ======

    pub fn null_literal(&self, span: Span) -> TypedExpr {
        TypedNode::new(TypedExpression::Literal(TypedLiteral::Null), span)
    }

    pub fn bool_literal(&self, value: bool, span: Span) -> TypedExpr {
        TypedNode::new(TypedExpression::Literal(TypedLiteral::Boolean(value)), span)
    }

    pub fn int_literal(&self, value: i32, span: Span) -> TypedExpr {
        TypedNode::new(TypedExpression::Literal(TypedLiteral::Integer(value)), span)
    }

    pub fn long_literal(&self, value: i64, span: Span) -> TypedExpr {
        TypedNode::new(TypedExpression::Literal(TypedLiteral::Long(value)), span)
    }

    pub fn real_literal(&self, value: f64, span: Span) -> TypedExpr {
        TypedNode::new(TypedExpression::Literal(TypedLiteral::Real(value)), span)
    }

    pub fn mpz_literal(&self, digits: &str, span: Span) -> TypedExpr {
        TypedNode::new(TypedExpression::Literal(TypedLiteral::Mpz(digits.to_string())), span)
    }

    pub fn string_literal(&self, value: &str, span: Span) -> TypedExpr {
        TypedNode::new(TypedExpression::Literal(TypedLiteral::String(value.to_string())), span)
    }

    // ====== EXPRESSIONS ======

    pub fn variable(&self, name: &str, span: Span) -> TypedExpr {
        TypedNode::new(TypedExpression::Variable(self.intern(name)), span)
    }

    pub fn array_literal(&self, elements: Vec<TypedExpr>, span: Span) -> TypedExpr {
        TypedNode::new(TypedExpression::Array(elements), span)
    }

    pub fn set_literal(&self, elements: Vec<TypedExpr>, span: Span) -> TypedExpr {
        TypedNode::new(TypedExpression::Set(elements), span)
    }

    pub fn map_literal(&self, entries: Vec<(TypedExpr, TypedExpr)>, span: Span) -> TypedExpr {
        TypedNode::new(TypedExpression::Map(entries), span)
    }

    pub fn interval(&self, start: TypedExpr, end: TypedExpr, span: Span) -> TypedExpr {
        TypedNode::new(TypedExpression::Interval(Box::new(start), Box::new(end)), span)
    }

    pub fn binary(&self, op: BinaryOp, left: TypedExpr, right: TypedExpr, span: Span) -> TypedExpr {
        TypedNode::new(
            TypedExpression::Binary(TypedBinary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                resolved: None,
            }),
            span,
        )
    }

    /// `name = value`
    pub fn assign(&self, name: &str, value: TypedExpr, span: Span) -> TypedExpr {
        self.binary(BinaryOp::Assign, self.variable(name, span), value, span)
    }

    pub fn unary(&self, op: UnaryOp, operand: TypedExpr, span: Span) -> TypedExpr {
        TypedNode::new(
            TypedExpression::Unary(TypedUnary { op, operand: Box::new(operand), resolved: None }),
            span,
        )
    }

    pub fn if_expr(
        &self,
        condition: TypedExpr,
        then_branch: TypedBlock,
        else_branch: Option<TypedBlock>,
        span: Span,
    ) -> TypedExpr {
        TypedNode::new(
            TypedExpression::If(TypedIf { condition: Box::new(condition), then_branch, else_branch }),
            span,
        )
    }

    pub fn block_expr(&self, block: TypedBlock, span: Span) -> TypedExpr {
        TypedNode::new(TypedExpression::Block(block), span)
    }

    pub fn parameter(&self, name: &str, span: Span) -> TypedParameter {
        TypedParameter { name: self.intern(name), default: None, span }
    }

    pub fn parameter_with_default(&self, name: &str, default: TypedExpr, span: Span) -> TypedParameter {
        TypedParameter { name: self.intern(name), default: Some(default), span }
    }

    pub fn function(&self, parameters: Vec<TypedParameter>, body: TypedBlock, span: Span) -> TypedExpr {
        TypedNode::new(TypedExpression::Function(TypedFunction { parameters, body, id: None }), span)
    }

    /// `(a, b) -> expr`
    pub fn lambda(&self, parameters: &[&str], body: TypedExpr, span: Span) -> TypedExpr {
        let parameters = parameters.iter().map(|name| self.parameter(name, span)).collect();
        let body = self.block(vec![self.expression_statement(body)]);
        self.function(parameters, body, span)
    }

    pub fn call(&self, callee: TypedExpr, arguments: Vec<TypedExpr>, span: Span) -> TypedExpr {
        TypedNode::new(
            TypedExpression::Call(TypedCall { callee: Box::new(callee), arguments, resolved: None }),
            span,
        )
    }

    pub fn field_access(&self, object: TypedExpr, field: &str, span: Span) -> TypedExpr {
        TypedNode::new(
            TypedExpression::ObjectAccess(TypedObjectAccess {
                object: Box::new(object),
                field: self.intern(field),
                field_span: span,
            }),
            span,
        )
    }

    /// `object.method(arguments)`
    pub fn method_call(&self, object: TypedExpr, method: &str, arguments: Vec<TypedExpr>, span: Span) -> TypedExpr {
        let callee = self.field_access(object, method, span);
        self.call(callee, arguments, span)
    }

    pub fn index(&self, collection: TypedExpr, key: TypedExpr, span: Span) -> TypedExpr {
        TypedNode::new(TypedExpression::Index(Box::new(collection), Box::new(key)), span)
    }

    // ====== STATEMENTS ======

    pub fn let_statement(&self, name: &str, value: TypedExpr, span: Span) -> TypedStmt {
        TypedNode::new(TypedStatement::Let { name: self.intern(name), value }, span)
    }

    pub fn expression_statement(&self, expr: TypedExpr) -> TypedStmt {
        let span = expr.span;
        TypedNode::new(TypedStatement::Expression(expr), span)
    }

    pub fn return_stmt(&self, value: Option<TypedExpr>, span: Span) -> TypedStmt {
        TypedNode::new(TypedStatement::Return(value), span)
    }

    pub fn block(&self, statements: Vec<TypedStmt>) -> TypedBlock {
        TypedBlock::new(statements)
    }

    pub fn program(&self, statements: Vec<TypedStmt>, span: Span) -> TypedProgram {
        TypedProgram { body: self.block(statements), span }
    }
}
