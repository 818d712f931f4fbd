//! # Typed AST
//!
//! Expression tree handed over by the parser. Every node carries a mutable
//! `ty` slot that semantic analysis fills in; call and operator nodes also
//! get the [`ResolvedCall`] the backend needs to emit the call.

use serde::{Deserialize, Serialize};

use crate::arena::InternedString;
use crate::callable::CallableVersion;
use crate::function::FunctionId;
use crate::source::Span;
use crate::type_registry::TypeId;

/// Every node wraps its content with type and span information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedNode<T> {
    pub node: T,
    pub ty: TypeId,
    pub span: Span,
}

impl<T> TypedNode<T> {
    /// Node whose type is not known yet
    pub fn new(node: T, span: Span) -> Self {
        Self { node, ty: TypeId::VOID, span }
    }

    pub fn with_type(node: T, ty: TypeId, span: Span) -> Self {
        Self { node, ty, span }
    }
}

pub type TypedExpr = TypedNode<TypedExpression>;
pub type TypedStmt = TypedNode<TypedStatement>;

/// Root of an analyzed program: the body of the implicit main function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedProgram {
    pub body: TypedBlock,
    pub span: Span,
}

/// Statements; the value of a block is its trailing expression statement
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TypedBlock {
    pub statements: Vec<TypedStmt>,
}

impl TypedBlock {
    pub fn new(statements: Vec<TypedStmt>) -> Self {
        Self { statements }
    }

    /// Function literal when the block is exactly one such expression
    pub fn single_function(&self) -> Option<&TypedFunction> {
        match self.statements.as_slice() {
            [TypedNode { node: TypedStatement::Expression(expr), .. }] => match &expr.node {
                TypedExpression::Function(function) => Some(function),
                _ => None,
            },
            _ => None,
        }
    }
}

impl TypedBlock {
    /// Visit every type slot under the block, including the types of the
    /// versions recorded in resolved calls
    pub fn visit_types_mut(&mut self, visit: &mut impl FnMut(&mut TypeId)) {
        for statement in &mut self.statements {
            visit(&mut statement.ty);
            match &mut statement.node {
                TypedStatement::Expression(expr)
                | TypedStatement::Let { value: expr, .. }
                | TypedStatement::Return(Some(expr)) => expr.visit_types_mut(visit),
                TypedStatement::Return(None) => {}
            }
        }
    }
}

impl TypedNode<TypedExpression> {
    pub fn visit_types_mut(&mut self, visit: &mut impl FnMut(&mut TypeId)) {
        visit(&mut self.ty);
        match &mut self.node {
            TypedExpression::Literal(_) | TypedExpression::Variable(_) => {}
            TypedExpression::Array(elements) | TypedExpression::Set(elements) => {
                for element in elements {
                    element.visit_types_mut(visit);
                }
            }
            TypedExpression::Map(entries) => {
                for (key, value) in entries {
                    key.visit_types_mut(visit);
                    value.visit_types_mut(visit);
                }
            }
            TypedExpression::Interval(start, end) | TypedExpression::Index(start, end) => {
                start.visit_types_mut(visit);
                end.visit_types_mut(visit);
            }
            TypedExpression::Binary(binary) => {
                binary.left.visit_types_mut(visit);
                binary.right.visit_types_mut(visit);
                visit_resolved(&mut binary.resolved, visit);
            }
            TypedExpression::Unary(unary) => {
                unary.operand.visit_types_mut(visit);
                visit_resolved(&mut unary.resolved, visit);
            }
            TypedExpression::If(branch) => {
                branch.condition.visit_types_mut(visit);
                branch.then_branch.visit_types_mut(visit);
                if let Some(otherwise) = &mut branch.else_branch {
                    otherwise.visit_types_mut(visit);
                }
            }
            TypedExpression::Block(block) => block.visit_types_mut(visit),
            TypedExpression::Function(literal) => {
                for default in literal.parameters.iter_mut().filter_map(|p| p.default.as_mut()) {
                    default.visit_types_mut(visit);
                }
            }
            TypedExpression::Call(call) => {
                call.callee.visit_types_mut(visit);
                for argument in &mut call.arguments {
                    argument.visit_types_mut(visit);
                }
                visit_resolved(&mut call.resolved, visit);
            }
            TypedExpression::ObjectAccess(access) => access.object.visit_types_mut(visit),
        }
    }
}

fn visit_resolved(resolved: &mut Option<ResolvedCall>, visit: &mut impl FnMut(&mut TypeId)) {
    if let Some(version) = resolved.as_mut().and_then(|r| r.version.as_mut()) {
        visit(&mut version.ty);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypedStatement {
    Expression(TypedExpr),
    Let { name: InternedString, value: TypedExpr },
    Return(Option<TypedExpr>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypedLiteral {
    Null,
    Boolean(bool),
    Integer(i32),
    Long(i64),
    Real(f64),
    /// Arbitrary precision integer, kept as its decimal text
    Mpz(String),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    /// `variable = value`
    Assign,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Assign => "=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypedExpression {
    Literal(TypedLiteral),
    Variable(InternedString),
    Array(Vec<TypedExpr>),
    Set(Vec<TypedExpr>),
    Map(Vec<(TypedExpr, TypedExpr)>),
    Interval(Box<TypedExpr>, Box<TypedExpr>),
    Binary(TypedBinary),
    Unary(TypedUnary),
    If(TypedIf),
    Block(TypedBlock),
    Function(TypedFunction),
    Call(TypedCall),
    /// `object.field`; as a callee this is a method call
    ObjectAccess(TypedObjectAccess),
    /// `collection[key]`
    Index(Box<TypedExpr>, Box<TypedExpr>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedBinary {
    pub op: BinaryOp,
    pub left: Box<TypedExpr>,
    pub right: Box<TypedExpr>,
    pub resolved: Option<ResolvedCall>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedUnary {
    pub op: UnaryOp,
    pub operand: Box<TypedExpr>,
    pub resolved: Option<ResolvedCall>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedIf {
    pub condition: Box<TypedExpr>,
    pub then_branch: TypedBlock,
    pub else_branch: Option<TypedBlock>,
}

/// Function literal. `id` is assigned the first time the literal is analyzed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedFunction {
    pub parameters: Vec<TypedParameter>,
    pub body: TypedBlock,
    pub id: Option<FunctionId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedParameter {
    pub name: InternedString,
    pub default: Option<TypedExpr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedCall {
    pub callee: Box<TypedExpr>,
    pub arguments: Vec<TypedExpr>,
    pub resolved: Option<ResolvedCall>,
}

impl TypedCall {
    pub fn argument_types(&self) -> Vec<TypeId> {
        self.arguments.iter().map(|argument| argument.ty).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedObjectAccess {
    pub object: Box<TypedExpr>,
    pub field: InternedString,
    pub field_span: Span,
}

/// What the backend needs to emit a call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedCall {
    /// Chosen version with concrete types; `None` for dynamic calls
    pub version: Option<CallableVersion>,
    /// Dispatch through the boxed runtime call
    pub dynamic: bool,
    /// The receiver of a method call is passed as the first argument
    pub with_receiver: bool,
}

impl ResolvedCall {
    pub fn of(version: CallableVersion, with_receiver: bool) -> Self {
        Self { version: Some(version), dynamic: false, with_receiver }
    }

    pub fn dynamic(with_receiver: bool) -> Self {
        Self { version: None, dynamic: true, with_receiver }
    }
}
