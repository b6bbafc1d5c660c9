//! `special` type class fields: a logical view over a physical
//! base type.

use crate::types::{NativeType, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum SpecialKind {
    NoData,
    VsfInteger,
    Time,
    Complex,
}

impl SpecialKind {
    /// The special class's caller-visible read type is derived from its
    /// meaning, independent of the base type's own
    /// `read_type`.
    pub fn derived_read_type(self) -> NativeType {
        match self {
            SpecialKind::NoData => NativeType::NotAvailable,
            SpecialKind::VsfInteger => NativeType::Double,
            SpecialKind::Time => NativeType::Double,
            SpecialKind::Complex => NativeType::NotAvailable,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpecialType {
    pub kind: SpecialKind,
    /// The physical encoding: an ASCII text for `time`, an integer for
    /// `vsf_integer`, a two-field record for `complex`.
    pub base: Type,
}

impl SpecialType {
    pub fn new(kind: SpecialKind, base: Type) -> Self {
        SpecialType { kind, base }
    }
}
