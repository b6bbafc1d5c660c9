//! The type graph: static type objects shared across a
//! product via reference counting, closed over a DAG by construction.
//!
//! Grounded on `til::Type` in `til.rs` (a tagged `enum` over type kinds,
//! `Rc`-free there only because TIL types are deduplicated by ordinal
//! lookup instead of being shared subgraphs). Type classes are a closed,
//! exhaustively-matched `enum`, not a trait object hierarchy, so a new kind
//! is a compile error everywhere it isn't handled.

pub mod array;
pub mod number;
pub mod raw;
pub mod record;
pub mod special;
pub mod text;

pub use array::ArrayType;
pub use number::{Conversion, Mapping, MappingValue, NumberType};
pub use raw::RawType;
pub use record::{Field, RecordType};
pub use special::{SpecialKind, SpecialType};
pub use text::{SpecialTextType, TextType};

use std::rc::Rc;

use crate::expr::Expression;

/// Format tag: governs backend dispatch, not the public type
/// class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Format {
    Ascii,
    Binary,
    Xml,
    Hdf4,
    Hdf5,
    Cdf,
    NetCdf,
}

impl Format {
    /// `true` for the container backends that materialize a [`crate::dynamic::MemoryNode`]
    /// tree at open time rather than navigating a static type graph directly.
    pub fn is_container(self) -> bool {
        matches!(self, Format::Hdf4 | Format::Hdf5 | Format::Cdf | Format::NetCdf)
    }
}

/// The user-visible kind of a type node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum TypeClass {
    Record,
    Array,
    Integer,
    Real,
    Text,
    Raw,
    Special,
}

/// The value representation requested on a typed read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum NativeType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float,
    Double,
    Char,
    String,
    Bytes,
    NotAvailable,
}

/// `bit_size` sentinels.
pub const BIT_SIZE_VARIABLE: i64 = -1;
pub const BIT_SIZE_EXPR_IN_BYTES: i64 = -8;

/// Class-specific payload of a [`Type`] node.
#[derive(Debug, Clone)]
pub enum TypeKind {
    Record(RecordType),
    Array(ArrayType),
    Integer(NumberType),
    Real(NumberType),
    Text(TextType),
    Raw(RawType),
    Special(SpecialType),
}

impl TypeKind {
    pub fn class(&self) -> TypeClass {
        match self {
            TypeKind::Record(_) => TypeClass::Record,
            TypeKind::Array(_) => TypeClass::Array,
            TypeKind::Integer(_) => TypeClass::Integer,
            TypeKind::Real(_) => TypeClass::Real,
            TypeKind::Text(_) => TypeClass::Text,
            TypeKind::Raw(_) => TypeClass::Raw,
            TypeKind::Special(_) => TypeClass::Special,
        }
    }
}

/// A static type node. Shared via [`Type`] (`Rc`); immutable after
/// [`TypeBuilder::build`] freezes it. An array's base type, or a record
/// field's type, may be the same `Rc` referenced from multiple parents —
/// the type graph is a DAG by construction, and nothing in this module
/// creates a cycle (there is no "set base type to self" operation after
/// freezing).
#[derive(Debug)]
pub struct TypeNode {
    pub format: Format,
    pub name: Option<String>,
    pub description: Option<String>,
    pub bit_size: i64,
    pub size_expr: Option<Expression>,
    pub attributes: Option<Type>,
    pub read_type: NativeType,
    pub kind: TypeKind,
}

/// Shared handle to a [`TypeNode`]. Cheap to clone; this is what a record
/// field's `type` slot, an array's base type, and a special type's base all
/// hold.
pub type Type = Rc<TypeNode>;

impl TypeNode {
    pub fn class(&self) -> TypeClass {
        self.kind.class()
    }

    /// `true` if this node declares a fixed size.
    pub fn has_fixed_bit_size(&self) -> bool {
        self.bit_size >= 0
    }
}

/// Construction is a distinct phase from use: build up a
/// [`TypeNode`] through the builder, then [`build`](TypeBuilder::build) it
/// into a shared, immutable [`Type`].
pub struct TypeBuilder {
    format: Format,
    name: Option<String>,
    description: Option<String>,
    bit_size: i64,
    size_expr: Option<Expression>,
    attributes: Option<Type>,
    read_type: NativeType,
    kind: TypeKind,
}

impl TypeBuilder {
    pub fn new(format: Format, read_type: NativeType, kind: TypeKind) -> Self {
        TypeBuilder {
            format,
            name: None,
            description: None,
            bit_size: BIT_SIZE_VARIABLE,
            size_expr: None,
            attributes: None,
            read_type,
            kind,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn bit_size(mut self, bit_size: i64) -> Self {
        self.bit_size = bit_size;
        self
    }

    pub fn size_expr(mut self, expr: Expression) -> Self {
        self.size_expr = Some(expr);
        self
    }

    pub fn attributes(mut self, attributes: Type) -> Self {
        self.attributes = Some(attributes);
        self
    }

    pub fn build(self) -> Type {
        Rc::new(TypeNode {
            format: self.format,
            name: self.name,
            description: self.description,
            bit_size: self.bit_size,
            size_expr: self.size_expr,
            attributes: self.attributes,
            read_type: self.read_type,
            kind: self.kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_base_type_is_one_allocation() {
        let base = TypeBuilder::new(
            Format::Binary,
            NativeType::Int32,
            TypeKind::Integer(NumberType::new(number::Endianness::Big)),
        )
        .bit_size(32)
        .build();

        let array_a = ArrayType::new(Rc::clone(&base), vec![array::Dimension::Fixed(4)]);
        let array_b = ArrayType::new(Rc::clone(&base), vec![array::Dimension::Fixed(8)]);
        assert_eq!(Rc::strong_count(&base), 3);
        assert_eq!(array_a.base.bit_size, array_b.base.bit_size);
    }
}
