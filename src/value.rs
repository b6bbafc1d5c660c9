//! The scalar value produced by a typed cursor read. Grounded on `til::Type`'s
//! sibling `Value` representation in other retrieved readers: one tagged
//! union mirroring the type-class enum, rather than a trait-object value.

/// A scalar value read through a cursor, tagged by the native type it was
/// read as.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float(f32),
    Double(f64),
    Char(u8),
    String(Vec<u8>),
    Bytes(Vec<u8>),
    NotAvailable,
}

impl NativeValue {
    /// Coerce to a 64-bit integer, the way the expression evaluator and
    /// `ToInteger` casts do.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            NativeValue::Int8(v) => Some(i64::from(*v)),
            NativeValue::Int16(v) => Some(i64::from(*v)),
            NativeValue::Int32(v) => Some(i64::from(*v)),
            NativeValue::Int64(v) => Some(*v),
            NativeValue::UInt8(v) => Some(i64::from(*v)),
            NativeValue::UInt16(v) => Some(i64::from(*v)),
            NativeValue::UInt32(v) => Some(i64::from(*v)),
            NativeValue::UInt64(v) => i64::try_from(*v).ok(),
            NativeValue::Float(v) => Some(*v as i64),
            NativeValue::Double(v) => Some(*v as i64),
            NativeValue::Char(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            NativeValue::Int8(v) => Some(f64::from(*v)),
            NativeValue::Int16(v) => Some(f64::from(*v)),
            NativeValue::Int32(v) => Some(f64::from(*v)),
            NativeValue::Int64(v) => Some(*v as f64),
            NativeValue::UInt8(v) => Some(f64::from(*v)),
            NativeValue::UInt16(v) => Some(f64::from(*v)),
            NativeValue::UInt32(v) => Some(f64::from(*v)),
            NativeValue::UInt64(v) => Some(*v as f64),
            NativeValue::Float(v) => Some(f64::from(*v)),
            NativeValue::Double(v) => Some(*v),
            NativeValue::Char(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            NativeValue::String(b) | NativeValue::Bytes(b) => Some(b),
            NativeValue::Char(b) => Some(std::slice::from_ref(b)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_i64().map(|v| v != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_widths_coerce_to_i64() {
        assert_eq!(NativeValue::Int8(-5).as_i64(), Some(-5));
        assert_eq!(NativeValue::UInt32(42).as_i64(), Some(42));
    }

    #[test]
    fn not_available_coerces_to_nothing() {
        assert_eq!(NativeValue::NotAvailable.as_i64(), None);
        assert_eq!(NativeValue::NotAvailable.as_f64(), None);
        assert_eq!(NativeValue::NotAvailable.as_bytes(), None);
    }
}
