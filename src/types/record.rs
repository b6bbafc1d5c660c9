//! `record` type class fields. Grounded on `til::r#struct::Struct`
//! for the ordered-fields-plus-name-lookup shape, generalized with the
//! union flag and per-field availability expression that CODA records need.

use std::collections::HashMap;

use crate::expr::Expression;
use crate::types::Type;

/// One field of a [`RecordType`].
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub field_type: Type,
    pub real_name: Option<String>,
    pub hidden: bool,
    /// For a union field, the expression that decides whether this field is
    /// the one instantiated.
    pub available_expr: Option<Expression>,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: Type) -> Self {
        Field {
            name: name.into(),
            field_type,
            real_name: None,
            hidden: false,
            available_expr: None,
        }
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn real_name(mut self, real_name: impl Into<String>) -> Self {
        self.real_name = Some(real_name.into());
        self
    }

    pub fn available_expr(mut self, expr: Expression) -> Self {
        self.available_expr = Some(expr);
        self
    }
}

/// An ordered list of fields plus a name index, and a union flag.
#[derive(Debug, Clone)]
pub struct RecordType {
    pub fields: Vec<Field>,
    pub union: bool,
    name_index: HashMap<String, usize>,
}

impl RecordType {
    pub fn new(fields: Vec<Field>, union: bool) -> Self {
        let name_index = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect();
        RecordType {
            fields,
            union,
            name_index,
        }
    }

    pub fn empty() -> Self {
        RecordType::new(Vec::new(), false)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.name_index.get(name).copied()
    }

    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{number::Endianness, NativeType, NumberType, TypeBuilder, TypeKind};

    fn int_field(name: &str) -> Field {
        let t = TypeBuilder::new(
            crate::types::Format::Binary,
            NativeType::Int32,
            TypeKind::Integer(NumberType::new(Endianness::Big)),
        )
        .bit_size(32)
        .build();
        Field::new(name, t)
    }

    #[test]
    fn name_lookup_matches_insertion_order_index() {
        let rec = RecordType::new(vec![int_field("a"), int_field("b"), int_field("c")], false);
        assert_eq!(rec.field_index("b"), Some(1));
        assert_eq!(rec.field_index("missing"), None);
        assert_eq!(rec.field(1).unwrap().name, "b");
    }
}
