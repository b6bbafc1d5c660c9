//! The expression language: the small first-order language used
//! by `size_expr`, `available_expr`, dimension expressions, and user
//! evaluation requests.
//!
//! Grounded on `til::function::Function`'s argument-list AST shape
//! (recursive `Box`ed nodes with a small closed operator set), generalized
//! into a full parse/eval pipeline. The type checker lives in the
//! evaluator, not a separate pass: the AST only distinguishes
//! node-producing from value-producing syntax at evaluation time, the way
//! the original C implementation does, but every arm is total (no panics on
//! mismatch — an `Expression` error instead).

pub mod eval;
pub mod parser;

use crate::cursor::Cursor;
use crate::error::Result;

/// Runtime value of an evaluated expression.
#[derive(Debug, Clone)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(Vec<u8>),
    Node(Cursor),
    Void,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Node(_) => "node",
            Value::Void => "void",
        }
    }
}

/// AST node. Parsed once (see [`parser::parse`]) and walked recursively by
/// [`eval`].
#[derive(Debug, Clone)]
pub enum Expression {
    IntegerConstant(i64),
    FloatConstant(f64),
    StringConstant(Vec<u8>),
    BooleanConstant(bool),

    /// The cursor position the expression is being evaluated at (`.` in the
    /// CODA expression language).
    This,
    Root(Box<Expression>),
    Parent(Box<Expression>),
    FieldByName(Box<Expression>, String),
    ArrayIndex(Box<Expression>, Box<Expression>),

    Not(Box<Expression>),
    Neg(Box<Expression>),
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
    Add(Box<Expression>, Box<Expression>),
    Sub(Box<Expression>, Box<Expression>),
    Mul(Box<Expression>, Box<Expression>),
    Div(Box<Expression>, Box<Expression>),
    Mod(Box<Expression>, Box<Expression>),
    Eq(Box<Expression>, Box<Expression>),
    Ne(Box<Expression>, Box<Expression>),
    Lt(Box<Expression>, Box<Expression>),
    Le(Box<Expression>, Box<Expression>),
    Gt(Box<Expression>, Box<Expression>),
    Ge(Box<Expression>, Box<Expression>),

    ToInteger(Box<Expression>),
    ToFloat(Box<Expression>),
    ToString(Box<Expression>),

    /// `exists(node)`: does the path resolve without error? (used to probe
    /// optional record fields from an `available_expr` on a sibling).
    Exists(Box<Expression>),
    /// `num_elements(node)` (array element count / record field count).
    NumElements(Box<Expression>),
    /// `index(node)` (current array index or field index of the frame).
    Index(Box<Expression>),
    /// `length(node)` (string length in bytes).
    Length(Box<Expression>),
    /// `unboundindex(node, i)`: array element without a bounds check — used
    /// by fast size expressions.
    UnboundIndex(Box<Expression>, Box<Expression>),
}

impl Expression {
    /// `is_constant`: `true` if evaluating this expression never reads
    /// cursor-dependent state, i.e. it may be evaluated with a null cursor.
    pub fn is_constant(&self) -> bool {
        match self {
            Expression::IntegerConstant(_)
            | Expression::FloatConstant(_)
            | Expression::StringConstant(_)
            | Expression::BooleanConstant(_) => true,
            Expression::Not(e) | Expression::Neg(e) | Expression::ToInteger(e) => e.is_constant(),
            Expression::ToFloat(e) | Expression::ToString(e) => e.is_constant(),
            Expression::And(a, b)
            | Expression::Or(a, b)
            | Expression::Add(a, b)
            | Expression::Sub(a, b)
            | Expression::Mul(a, b)
            | Expression::Div(a, b)
            | Expression::Mod(a, b)
            | Expression::Eq(a, b)
            | Expression::Ne(a, b)
            | Expression::Lt(a, b)
            | Expression::Le(a, b)
            | Expression::Gt(a, b)
            | Expression::Ge(a, b) => a.is_constant() && b.is_constant(),
            Expression::This
            | Expression::Root(_)
            | Expression::Parent(_)
            | Expression::FieldByName(_, _)
            | Expression::ArrayIndex(_, _)
            | Expression::Exists(_)
            | Expression::NumElements(_)
            | Expression::Index(_)
            | Expression::Length(_)
            | Expression::UnboundIndex(_, _) => false,
        }
    }

    pub fn parse(source: &str) -> Result<Expression> {
        parser::parse(source)
    }
}

pub fn evaluate_integer(expr: &Expression, cursor: Option<&Cursor>) -> Result<i64> {
    eval::evaluate_integer(expr, cursor)
}

pub fn evaluate_float(expr: &Expression, cursor: Option<&Cursor>) -> Result<f64> {
    eval::evaluate_float(expr, cursor)
}

pub fn evaluate_boolean(expr: &Expression, cursor: Option<&Cursor>) -> Result<bool> {
    eval::evaluate_boolean(expr, cursor)
}

pub fn evaluate_string(expr: &Expression, cursor: Option<&Cursor>) -> Result<Vec<u8>> {
    eval::evaluate_string(expr, cursor)
}

pub fn evaluate_node(expr: &Expression, cursor: Option<&Cursor>) -> Result<Cursor> {
    eval::evaluate_node(expr, cursor)
}
