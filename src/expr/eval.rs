//! Expression evaluation: a total, recursive walk of the AST.
//! Every arm returns an [`crate::error::CodaError::Expression`] on a type
//! or navigation mismatch rather than panicking.

use crate::cursor::Cursor;
use crate::error::{CodaError, Result};
use crate::expr::{Expression, Value};

fn err(cursor: Option<&Cursor>, message: impl Into<String>) -> CodaError {
    let path = cursor.map(Cursor::path_string).unwrap_or_else(|| "<null cursor>".to_string());
    CodaError::expression(path, message)
}

fn type_error(cursor: Option<&Cursor>, expected: &str, got: &Value) -> CodaError {
    err(
        cursor,
        format!("expected a {expected} value, found a {} value", got.type_name()),
    )
}

pub fn eval(expr: &Expression, cursor: Option<&Cursor>) -> Result<Value> {
    match expr {
        Expression::IntegerConstant(v) => Ok(Value::Integer(*v)),
        Expression::FloatConstant(v) => Ok(Value::Float(*v)),
        Expression::StringConstant(v) => Ok(Value::String(v.clone())),
        Expression::BooleanConstant(v) => Ok(Value::Boolean(*v)),

        Expression::This => cursor
            .cloned()
            .map(Value::Node)
            .ok_or_else(|| err(cursor, "'this' has no meaning without a cursor")),

        Expression::Root(inner) => {
            let mut node = eval_node(inner, cursor)?;
            node.goto_root();
            Ok(Value::Node(node))
        }
        Expression::Parent(inner) => {
            let mut node = eval_node(inner, cursor)?;
            node.goto_parent()?;
            Ok(Value::Node(node))
        }
        Expression::FieldByName(inner, name) => {
            let mut node = eval_node(inner, cursor)?;
            node.goto_record_field_by_name(name)?;
            Ok(Value::Node(node))
        }
        Expression::ArrayIndex(inner, index_expr) => {
            let mut node = eval_node(inner, cursor)?;
            let index = evaluate_integer(index_expr, cursor)?;
            let index = u64::try_from(index)
                .map_err(|_| err(cursor, format!("array index {index} is negative")))?;
            node.goto_array_element_by_index(index)?;
            Ok(Value::Node(node))
        }

        Expression::Not(inner) => Ok(Value::Boolean(!evaluate_boolean(inner, cursor)?)),
        Expression::Neg(inner) => match eval(inner, cursor)? {
            Value::Integer(v) => Ok(Value::Integer(-v)),
            Value::Float(v) => Ok(Value::Float(-v)),
            other => Err(type_error(cursor, "numeric", &other)),
        },

        Expression::And(a, b) => {
            Ok(Value::Boolean(evaluate_boolean(a, cursor)? && evaluate_boolean(b, cursor)?))
        }
        Expression::Or(a, b) => {
            Ok(Value::Boolean(evaluate_boolean(a, cursor)? || evaluate_boolean(b, cursor)?))
        }

        Expression::Add(a, b) => numeric_op(a, b, cursor, "+", |x, y| x.checked_add(y), |x, y| x + y),
        Expression::Sub(a, b) => numeric_op(a, b, cursor, "-", |x, y| x.checked_sub(y), |x, y| x - y),
        Expression::Mul(a, b) => numeric_op(a, b, cursor, "*", |x, y| x.checked_mul(y), |x, y| x * y),
        Expression::Div(a, b) => div_op(a, b, cursor, false),
        Expression::Mod(a, b) => div_op(a, b, cursor, true),

        Expression::Eq(a, b) => Ok(Value::Boolean(compare(a, b, cursor)? == std::cmp::Ordering::Equal)),
        Expression::Ne(a, b) => Ok(Value::Boolean(compare(a, b, cursor)? != std::cmp::Ordering::Equal)),
        Expression::Lt(a, b) => Ok(Value::Boolean(compare(a, b, cursor)? == std::cmp::Ordering::Less)),
        Expression::Le(a, b) => Ok(Value::Boolean(compare(a, b, cursor)? != std::cmp::Ordering::Greater)),
        Expression::Gt(a, b) => Ok(Value::Boolean(compare(a, b, cursor)? == std::cmp::Ordering::Greater)),
        Expression::Ge(a, b) => Ok(Value::Boolean(compare(a, b, cursor)? != std::cmp::Ordering::Less)),

        Expression::ToInteger(inner) => Ok(Value::Integer(evaluate_integer(inner, cursor)?)),
        Expression::ToFloat(inner) => Ok(Value::Float(evaluate_float(inner, cursor)?)),
        Expression::ToString(inner) => Ok(Value::String(evaluate_string(inner, cursor)?)),

        Expression::Exists(inner) => Ok(Value::Boolean(eval_node(inner, cursor).is_ok())),
        Expression::NumElements(inner) => {
            let node = eval_node(inner, cursor)?;
            Ok(Value::Integer(node.get_num_elements()?))
        }
        Expression::Index(inner) => {
            let node = eval_node(inner, cursor)?;
            Ok(Value::Integer(node.index()))
        }
        Expression::Length(inner) => {
            let node = eval_node(inner, cursor)?;
            Ok(Value::Integer(node.get_string_length()?))
        }
        Expression::UnboundIndex(inner, index_expr) => {
            let mut node = eval_node(inner, cursor)?;
            let index = evaluate_integer(index_expr, cursor)?;
            let index = u64::try_from(index)
                .map_err(|_| err(cursor, format!("array index {index} is negative")))?;
            node.goto_array_element_by_index_unchecked(index)?;
            Ok(Value::Node(node))
        }
    }
}

fn eval_node(expr: &Expression, cursor: Option<&Cursor>) -> Result<Cursor> {
    match eval(expr, cursor)? {
        Value::Node(node) => Ok(node),
        other => Err(type_error(cursor, "node", &other)),
    }
}

/// Both operands coerced to a common numeric representation: integer if
/// both sides are integer, float otherwise.
fn numeric_op(
    a: &Expression,
    b: &Expression,
    cursor: Option<&Cursor>,
    op_name: &str,
    int_op: impl Fn(i64, i64) -> Option<i64>,
    float_op: impl Fn(f64, f64) -> f64,
) -> Result<Value> {
    let va = eval(a, cursor)?;
    let vb = eval(b, cursor)?;
    match (as_number(&va, cursor)?, as_number(&vb, cursor)?) {
        (Number::Integer(x), Number::Integer(y)) => int_op(x, y)
            .map(Value::Integer)
            .ok_or_else(|| err(cursor, format!("integer overflow evaluating {x} {op_name} {y}"))),
        (x, y) => Ok(Value::Float(float_op(x.as_f64(), y.as_f64()))),
    }
}

fn div_op(a: &Expression, b: &Expression, cursor: Option<&Cursor>, modulo: bool) -> Result<Value> {
    let va = eval(a, cursor)?;
    let vb = eval(b, cursor)?;
    match (as_number(&va, cursor)?, as_number(&vb, cursor)?) {
        (Number::Integer(x), Number::Integer(y)) => {
            if y == 0 {
                return Err(err(cursor, "division by zero in integer expression"));
            }
            Ok(Value::Integer(if modulo { x % y } else { x / y }))
        }
        (x, y) => {
            let (x, y) = (x.as_f64(), y.as_f64());
            Ok(Value::Float(if modulo { x % y } else { x / y }))
        }
    }
}

enum Number {
    Integer(i64),
    Float(f64),
}

impl Number {
    fn as_f64(&self) -> f64 {
        match self {
            Number::Integer(v) => *v as f64,
            Number::Float(v) => *v,
        }
    }
}

fn as_number(value: &Value, cursor: Option<&Cursor>) -> Result<Number> {
    match value {
        Value::Integer(v) => Ok(Number::Integer(*v)),
        Value::Float(v) => Ok(Number::Float(*v)),
        Value::Node(node) => {
            let read = node.read_value()?;
            if let Some(i) = read.as_i64() {
                Ok(Number::Integer(i))
            } else if let Some(f) = read.as_f64() {
                Ok(Number::Float(f))
            } else {
                Err(err(cursor, "node did not resolve to a numeric value"))
            }
        }
        other => Err(type_error(cursor, "numeric", other)),
    }
}

fn compare(a: &Expression, b: &Expression, cursor: Option<&Cursor>) -> Result<std::cmp::Ordering> {
    let va = eval(a, cursor)?;
    let vb = eval(b, cursor)?;
    match (&va, &vb) {
        (Value::Boolean(x), Value::Boolean(y)) => Ok(x.cmp(y)),
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        _ => {
            let (x, y) = (as_number(&va, cursor)?, as_number(&vb, cursor)?);
            x.as_f64()
                .partial_cmp(&y.as_f64())
                .ok_or_else(|| err(cursor, "cannot compare NaN"))
        }
    }
}

pub fn evaluate_integer(expr: &Expression, cursor: Option<&Cursor>) -> Result<i64> {
    match eval(expr, cursor)? {
        Value::Integer(v) => Ok(v),
        Value::Float(v) => Ok(v as i64),
        Value::Boolean(v) => Ok(i64::from(v)),
        Value::Node(node) => node
            .read_value()?
            .as_i64()
            .ok_or_else(|| err(cursor, "node did not resolve to an integer")),
        other => Err(type_error(cursor, "integer", &other)),
    }
}

pub fn evaluate_float(expr: &Expression, cursor: Option<&Cursor>) -> Result<f64> {
    match eval(expr, cursor)? {
        Value::Integer(v) => Ok(v as f64),
        Value::Float(v) => Ok(v),
        Value::Node(node) => node
            .read_value()?
            .as_f64()
            .ok_or_else(|| err(cursor, "node did not resolve to a float")),
        other => Err(type_error(cursor, "float", &other)),
    }
}

pub fn evaluate_boolean(expr: &Expression, cursor: Option<&Cursor>) -> Result<bool> {
    match eval(expr, cursor)? {
        Value::Boolean(v) => Ok(v),
        Value::Integer(v) => Ok(v != 0),
        Value::Node(node) => node
            .read_value()?
            .as_bool()
            .ok_or_else(|| err(cursor, "node did not resolve to a boolean")),
        other => Err(type_error(cursor, "boolean", &other)),
    }
}

pub fn evaluate_string(expr: &Expression, cursor: Option<&Cursor>) -> Result<Vec<u8>> {
    match eval(expr, cursor)? {
        Value::String(v) => Ok(v),
        Value::Integer(v) => Ok(v.to_string().into_bytes()),
        Value::Float(v) => Ok(v.to_string().into_bytes()),
        Value::Boolean(v) => Ok(v.to_string().into_bytes()),
        Value::Node(node) => node
            .read_value()?
            .as_bytes()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| err(cursor, "node did not resolve to a string")),
        other => Err(type_error(cursor, "string", &other)),
    }
}

pub fn evaluate_node(expr: &Expression, cursor: Option<&Cursor>) -> Result<Cursor> {
    eval_node(expr, cursor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::Product;
    use crate::types::{
        number::Endianness, Field, NativeType, NumberType, RecordType, TypeBuilder, TypeKind,
    };
    use std::rc::Rc;

    fn two_field_cursor() -> Cursor {
        let a = TypeBuilder::new(
            crate::types::Format::Binary,
            NativeType::Int32,
            TypeKind::Integer(NumberType::new(Endianness::Big)),
        )
        .bit_size(32)
        .build();
        let b = a.clone();
        let record = TypeBuilder::new(
            crate::types::Format::Binary,
            NativeType::NotAvailable,
            TypeKind::Record(RecordType::new(
                vec![Field::new("a", a), Field::new("b", b)],
                false,
            )),
        )
        .build();
        let product = Rc::new(Product::from_buffer(
            crate::types::Format::Binary,
            record,
            vec![0, 0, 0, 10, 0, 0, 0, 20],
        ));
        Cursor::set_product(product)
    }

    #[test]
    fn arithmetic_on_constants() {
        let expr = Expression::Add(
            Box::new(Expression::IntegerConstant(2)),
            Box::new(Expression::IntegerConstant(3)),
        );
        assert_eq!(evaluate_integer(&expr, None).unwrap(), 5);
    }

    #[test]
    fn field_by_name_reads_sibling_value() {
        let cursor = two_field_cursor();
        let expr = Expression::FieldByName(Box::new(Expression::This), "b".to_string());
        assert_eq!(evaluate_integer(&expr, Some(&cursor)).unwrap(), 20);
    }

    #[test]
    fn exists_reflects_navigation_success() {
        let cursor = two_field_cursor();
        let ok = Expression::Exists(Box::new(Expression::FieldByName(
            Box::new(Expression::This),
            "b".to_string(),
        )));
        let missing = Expression::Exists(Box::new(Expression::FieldByName(
            Box::new(Expression::This),
            "z".to_string(),
        )));
        assert!(evaluate_boolean(&ok, Some(&cursor)).unwrap());
        assert!(!evaluate_boolean(&missing, Some(&cursor)).unwrap());
    }

    #[test]
    fn integer_division_by_zero_is_an_error() {
        let expr = Expression::Div(
            Box::new(Expression::IntegerConstant(1)),
            Box::new(Expression::IntegerConstant(0)),
        );
        let err = evaluate_integer(&expr, None).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Expression);
    }

    #[test]
    fn mixed_integer_float_promotes_to_float() {
        let expr = Expression::Add(
            Box::new(Expression::IntegerConstant(1)),
            Box::new(Expression::FloatConstant(0.5)),
        );
        assert_eq!(evaluate_float(&expr, None).unwrap(), 1.5);
    }
}
