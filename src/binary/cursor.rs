//! Binary scalar reads: endianness normalization, sign
//! extension via 64-bit masks, and special-type dispatch.
//!
//! Grounded on `ida_reader.rs`'s shift/mask byte assembly, generalized over
//! declared endianness and arbitrary signed widths.

use crate::cursor::Cursor;
use crate::error::{CodaError, Result};
use crate::types::{
    number::{Endianness, NumberType},
    special::{SpecialKind, SpecialType},
    NativeType, RawType, TextType, Type, TypeKind,
};
use crate::value::NativeValue;

pub fn read_value(t: &Type, cursor: &Cursor) -> Result<NativeValue> {
    match &t.kind {
        TypeKind::Integer(num) | TypeKind::Real(num) => read_number(t, num, cursor),
        TypeKind::Text(text) => read_text(text, cursor),
        TypeKind::Raw(raw) => read_raw(raw, cursor),
        TypeKind::Special(special) => read_special(special, cursor),
        TypeKind::Record(_) | TypeKind::Array(_) => Err(CodaError::InvalidArgument(
            "cannot read a scalar value from a record/array node".into(),
        )),
    }
}

/// Read the `bit_size`-bit magnitude at the cursor's position, applying
/// declared endianness (only meaningful for byte-aligned fields: a
/// non-byte-multiple bit field has no independent byte order, and is read
/// as a plain big-endian-within-the-bitstream run).
fn read_raw_magnitude(cursor: &Cursor, bit_size: u32, endianness: Endianness) -> Result<u64> {
    if bit_size % 8 == 0 && bit_size > 0 {
        let nbytes = (bit_size / 8) as usize;
        let mut buf = vec![0u8; nbytes];
        cursor.read_bytes(&mut buf, 0)?;
        if endianness == Endianness::Little {
            buf.reverse();
        }
        let mut full = [0u8; 8];
        full[8 - nbytes..].copy_from_slice(&buf);
        Ok(u64::from_be_bytes(full))
    } else {
        let mut buf = [0u8; 8];
        cursor.read_bits(&mut buf, 0, bit_size)?;
        Ok(u64::from_be_bytes(buf))
    }
}

/// Sign-extend the low `bit_size` bits of `value` to a full `i64` using a
/// shift pair rather than the original implementation's native-`int`
/// two's-complement trick, which only holds up to the platform's `int`
/// width.
fn sign_extend(value: u64, bit_size: u32) -> i64 {
    if bit_size == 0 {
        return 0;
    }
    if bit_size >= 64 {
        return value as i64;
    }
    let shift = 64 - bit_size;
    ((value << shift) as i64) >> shift
}

fn read_number(t: &Type, num: &NumberType, cursor: &Cursor) -> Result<NativeValue> {
    let bit_size = cursor.get_bit_size()?;
    if bit_size < 0 || bit_size > 64 {
        return Err(CodaError::DataDefinition(format!(
            "binary number field has an unreadable bit size ({bit_size})"
        )));
    }
    let bit_size = bit_size as u32;
    let magnitude = read_raw_magnitude(cursor, bit_size, num.endianness)?;

    let is_signed = matches!(
        t.read_type,
        NativeType::Int8 | NativeType::Int16 | NativeType::Int32 | NativeType::Int64
    );
    let numeric = if is_signed {
        sign_extend(magnitude, bit_size) as f64
    } else {
        match t.read_type {
            NativeType::Float => f64::from(f32::from_bits(magnitude as u32)),
            NativeType::Double => f64::from_bits(magnitude),
            _ => magnitude as f64,
        }
    };

    if let Some(conversion) = &num.conversion {
        if crate::config::perform_conversions() {
            return Ok(NativeValue::Double(conversion.apply(numeric)));
        }
    }

    Ok(match t.read_type {
        NativeType::Int8 => NativeValue::Int8(sign_extend(magnitude, bit_size) as i8),
        NativeType::Int16 => NativeValue::Int16(sign_extend(magnitude, bit_size) as i16),
        NativeType::Int32 => NativeValue::Int32(sign_extend(magnitude, bit_size) as i32),
        NativeType::Int64 => NativeValue::Int64(sign_extend(magnitude, bit_size)),
        NativeType::UInt8 => NativeValue::UInt8(magnitude as u8),
        NativeType::UInt16 => NativeValue::UInt16(magnitude as u16),
        NativeType::UInt32 => NativeValue::UInt32(magnitude as u32),
        NativeType::UInt64 => NativeValue::UInt64(magnitude),
        NativeType::Float => NativeValue::Float(f32::from_bits(magnitude as u32)),
        NativeType::Double => NativeValue::Double(f64::from_bits(magnitude)),
        other => {
            return Err(CodaError::InvalidType(format!(
                "{other:?} is not a numeric native type"
            )))
        }
    })
}

fn aligned_bytes(cursor: &Cursor) -> Result<Vec<u8>> {
    let bit_size = cursor.get_bit_size()?;
    if bit_size < 0 || bit_size % 8 != 0 {
        return Err(CodaError::DataDefinition(
            "binary text/raw field does not resolve to a whole number of bytes".into(),
        ));
    }
    let mut buf = vec![0u8; (bit_size / 8) as usize];
    cursor.read_bytes(&mut buf, 0)?;
    Ok(buf)
}

fn read_text(text: &TextType, cursor: &Cursor) -> Result<NativeValue> {
    let buf = aligned_bytes(cursor)?;
    if let Some(fixed) = &text.fixed_value {
        if buf != *fixed {
            return Err(CodaError::product(
                cursor.path_string(),
                "fixed text value did not match the declared literal",
            ));
        }
    }
    Ok(NativeValue::String(buf))
}

fn read_raw(raw: &RawType, cursor: &Cursor) -> Result<NativeValue> {
    let buf = aligned_bytes(cursor)?;
    if let Some(fixed) = &raw.fixed_value {
        if buf != *fixed {
            return Err(CodaError::product(
                cursor.path_string(),
                "fixed raw value did not match the declared literal",
            ));
        }
    }
    Ok(NativeValue::Bytes(buf))
}

fn read_special(special: &SpecialType, cursor: &Cursor) -> Result<NativeValue> {
    let mut base_cursor = cursor.clone();
    base_cursor.use_base_type_of_special_type()?;
    if crate::config::bypass_special_types() {
        return base_cursor.read_value();
    }
    match special.kind {
        SpecialKind::NoData | SpecialKind::Complex => Ok(NativeValue::NotAvailable),
        SpecialKind::VsfInteger => {
            let base_value = base_cursor.read_value()?;
            let v = base_value.as_i64().ok_or_else(|| {
                CodaError::InvalidType("vsf_integer base type did not yield an integer".into())
            })?;
            Ok(NativeValue::Double(v as f64))
        }
        SpecialKind::Time => {
            let base_value = base_cursor.read_value()?;
            let text = base_value
                .as_bytes()
                .ok_or_else(|| CodaError::InvalidType("time base type did not yield text".into()))?;
            let s = std::str::from_utf8(text)
                .map_err(|_| CodaError::InvalidDatetime("time text is not valid UTF-8".into()))?;
            let seconds = crate::special_time::parse_to_seconds(s)?;
            Ok(NativeValue::Double(seconds))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::Product;
    use crate::types::TypeBuilder;
    use std::rc::Rc;

    fn int_cursor(bytes: Vec<u8>, bit_size: i64, endianness: Endianness, read_type: NativeType) -> Cursor {
        let t = TypeBuilder::new(crate::types::Format::Binary, read_type, TypeKind::Integer(NumberType::new(endianness)))
            .bit_size(bit_size)
            .build();
        let product = Rc::new(Product::from_buffer(crate::types::Format::Binary, t, bytes));
        Cursor::set_product(product)
    }

    #[test]
    fn signed_12_bit_negative_pattern() {
        // 0xFF 0xE0 as a 12-bit signed big-endian int = -2.
        let cursor = int_cursor(vec![0xFF, 0xE0, 0x00], 12, Endianness::Big, NativeType::Int16);
        let value = cursor.read_value().unwrap();
        assert_eq!(value, NativeValue::Int16(-2));
    }

    #[test]
    fn little_endian_byte_aligned_reorders_bytes() {
        let cursor = int_cursor(vec![0x01, 0x00, 0x00, 0x00], 32, Endianness::Little, NativeType::Int32);
        assert_eq!(cursor.read_value().unwrap(), NativeValue::Int32(1));
    }

    #[test]
    fn big_endian_byte_aligned_is_identity() {
        let cursor = int_cursor(vec![0x00, 0x00, 0x00, 0x01], 32, Endianness::Big, NativeType::Int32);
        assert_eq!(cursor.read_value().unwrap(), NativeValue::Int32(1));
    }

    #[test]
    fn full_width_unsigned_64_reads_without_truncation() {
        let cursor = int_cursor(
            vec![0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF],
            64,
            Endianness::Big,
            NativeType::UInt64,
        );
        assert_eq!(cursor.read_value().unwrap(), NativeValue::UInt64(u64::MAX));
    }
}
