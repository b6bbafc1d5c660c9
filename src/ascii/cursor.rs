//! The ASCII backend's size-resolution algorithm and scalar
//! value reads. Numeric and text leaves without a fixed `bit_size` are
//! discovered by scanning a bounded window of the product buffer: an
//! ASCII product generally cannot declare how many bytes a number takes up
//! front, so the cursor has to look at the bytes to find out.

use crate::ascii::number_parser::{parse_double, parse_signed_integer, parse_unsigned_integer};
use crate::ascii::{EolConvention, MAX_ASCII_NUMBER_LENGTH};
use crate::cursor::Cursor;
use crate::error::{CodaError, Result};
use crate::types::{
    number::NumberType,
    text::{SpecialTextType, TextType},
    NativeType, Type, TypeKind,
};
use crate::value::NativeValue;

/// Resolve the bit size of an ASCII leaf at `cursor`'s position. Dispatches to a size expression if one is declared, otherwise
/// scans the buffer.
pub fn resolve_ascii_size(definition: &Type, cursor: &Cursor, available_bits: u64) -> Result<i64> {
    if let Some(expr) = &definition.size_expr {
        return crate::size::eval_size_expr(definition, expr, cursor);
    }
    match &definition.kind {
        TypeKind::Special(special) => {
            let mut base_cursor = cursor.clone();
            base_cursor.use_base_type_of_special_type()?;
            crate::size::get_bit_size(&special.base, &base_cursor, available_bits)
        }
        TypeKind::Text(text) => resolve_text_size(text, cursor, available_bits),
        TypeKind::Integer(num) | TypeKind::Real(num) => {
            resolve_number_size(definition, num, cursor, available_bits)
        }
        TypeKind::Raw(_) => Err(CodaError::DataDefinition(
            "an ASCII raw type requires a fixed bit_size or a size_expr".into(),
        )),
        TypeKind::Record(_) | TypeKind::Array(_) => {
            unreachable!("records/arrays are resolved by get_bit_size_ascbin before reaching here")
        }
    }
}

fn resolve_text_size(text: &TextType, cursor: &Cursor, available_bits: u64) -> Result<i64> {
    match text.special_kind() {
        SpecialTextType::Default => Ok(available_bits as i64),
        SpecialTextType::Whitespace => {
            let window = read_window(cursor, available_bits)?;
            let n = window
                .iter()
                .take_while(|&&b| b == b' ' || b == b'\t')
                .count();
            Ok((n * 8) as i64)
        }
        kind @ (SpecialTextType::LineSeparator
        | SpecialTextType::LineWithEol
        | SpecialTextType::LineWithoutEol) => line_size(cursor, kind),
    }
}

fn line_size(cursor: &Cursor, kind: SpecialTextType) -> Result<i64> {
    let offset = cursor.byte_offset()?;
    let (line_end, unterminated) = cursor
        .product()
        .line_index()?
        .line_end_after(offset)
        .ok_or_else(|| CodaError::product(cursor.path_string(), "no more lines in the product"))?;
    let eol_width = if unterminated {
        0
    } else {
        cursor
            .product()
            .line_index()?
            .convention()
            .map(EolConvention::width)
            .unwrap_or(0)
    };
    let bytes = match kind {
        SpecialTextType::LineSeparator => eol_width,
        SpecialTextType::LineWithEol => line_end - offset,
        SpecialTextType::LineWithoutEol => (line_end - offset).saturating_sub(eol_width),
        SpecialTextType::Default | SpecialTextType::Whitespace => unreachable!(),
    };
    Ok((bytes * 8) as i64)
}

fn resolve_number_size(
    definition: &Type,
    num: &NumberType,
    cursor: &Cursor,
    available_bits: u64,
) -> Result<i64> {
    let scan_bits = available_bits.min((MAX_ASCII_NUMBER_LENGTH as u64) * 8);
    let window = read_window(cursor, scan_bits)?;
    if let Some(mapping) = num.matching_mapping(&window) {
        let mapping_bits = (mapping.literal.len() * 8) as i64;
        if definition.has_fixed_bit_size() && mapping_bits != definition.bit_size {
            return Err(CodaError::invalid_format(
                cursor.path_string(),
                "mapping literal length does not match the field's fixed bit size",
            ));
        }
        return Ok(mapping_bits);
    }
    let consumed = match definition.read_type {
        NativeType::Float | NativeType::Double => parse_double(&window, true)?.1,
        NativeType::Int8 | NativeType::Int16 | NativeType::Int32 | NativeType::Int64 => {
            parse_signed_integer(&window, true)?.1
        }
        _ => parse_unsigned_integer(&window, true)?.1,
    };
    Ok((consumed * 8) as i64)
}

fn read_window(cursor: &Cursor, max_bits: u64) -> Result<Vec<u8>> {
    let offset = cursor.byte_offset()?;
    let max_bytes = max_bits / 8;
    let remaining = cursor.product().file_size().saturating_sub(offset);
    let len = max_bytes.min(remaining) as usize;
    cursor.product().bytes.read_vec_at(offset, len)
}

/// Read the scalar value at `cursor`'s position.
pub fn read_value(t: &Type, cursor: &Cursor) -> Result<NativeValue> {
    match &t.kind {
        TypeKind::Special(special) => {
            let mut base_cursor = cursor.clone();
            base_cursor.use_base_type_of_special_type()?;
            if crate::config::bypass_special_types() {
                return base_cursor.read_value();
            }
            match special.kind {
                crate::types::special::SpecialKind::NoData
                | crate::types::special::SpecialKind::Complex => Ok(NativeValue::NotAvailable),
                crate::types::special::SpecialKind::VsfInteger => {
                    let base_value = base_cursor.read_value()?;
                    let v = base_value.as_i64().ok_or_else(|| {
                        CodaError::InvalidType("vsf_integer base type did not yield an integer".into())
                    })?;
                    Ok(NativeValue::Double(v as f64))
                }
                crate::types::special::SpecialKind::Time => {
                    let base_value = base_cursor.read_value()?;
                    let bytes = base_value.as_bytes().ok_or_else(|| {
                        CodaError::InvalidType("time base type did not yield text".into())
                    })?;
                    let s = std::str::from_utf8(bytes).map_err(|_| {
                        CodaError::InvalidDatetime("time text is not valid UTF-8".into())
                    })?;
                    Ok(NativeValue::Double(crate::special_time::parse_to_seconds(s)?))
                }
            }
        }
        TypeKind::Text(_) => {
            let len = cursor.get_byte_size()? as usize;
            let window = cursor.product().bytes.read_vec_at(cursor.byte_offset()?, len)?;
            Ok(NativeValue::String(window))
        }
        TypeKind::Raw(_) => {
            let len = cursor.get_byte_size()? as usize;
            let window = cursor.product().bytes.read_vec_at(cursor.byte_offset()?, len)?;
            Ok(NativeValue::Bytes(window))
        }
        TypeKind::Integer(num) | TypeKind::Real(num) => read_number_value(t, num, cursor),
        TypeKind::Record(_) | TypeKind::Array(_) => Err(CodaError::InvalidArgument(
            "cannot read a scalar value from a record/array node".into(),
        )),
    }
}

fn read_number_value(t: &Type, num: &NumberType, cursor: &Cursor) -> Result<NativeValue> {
    let len = cursor.get_byte_size()? as usize;
    let window = cursor.product().bytes.read_vec_at(cursor.byte_offset()?, len)?;

    let raw = if let Some(mapping) = num.matching_mapping(&window) {
        let mapping_bits = (mapping.literal.len() * 8) as i64;
        if t.has_fixed_bit_size() && mapping_bits != t.bit_size {
            return Err(CodaError::invalid_format(
                cursor.path_string(),
                "mapping literal length does not match the field's fixed bit size",
            ));
        }
        match mapping.value {
            crate::types::number::MappingValue::Integer(i) => i as f64,
            crate::types::number::MappingValue::Float(f) => f,
        }
    } else {
        match t.read_type {
            NativeType::Float | NativeType::Double => parse_double(&window, true)?.0,
            NativeType::Int8 | NativeType::Int16 | NativeType::Int32 | NativeType::Int64 => {
                parse_signed_integer(&window, true)?.0 as f64
            }
            _ => parse_unsigned_integer(&window, true)?.0 as f64,
        }
    };

    if let Some(conversion) = &num.conversion {
        if crate::config::perform_conversions() {
            return Ok(NativeValue::Double(conversion.apply(raw)));
        }
    }

    Ok(match t.read_type {
        NativeType::Int8 => NativeValue::Int8(narrow_signed(cursor, raw, i8::MIN as i64, i8::MAX as i64)? as i8),
        NativeType::Int16 => {
            NativeValue::Int16(narrow_signed(cursor, raw, i16::MIN as i64, i16::MAX as i64)? as i16)
        }
        NativeType::Int32 => {
            NativeValue::Int32(narrow_signed(cursor, raw, i32::MIN as i64, i32::MAX as i64)? as i32)
        }
        NativeType::Int64 => NativeValue::Int64(raw as i64),
        NativeType::UInt8 => NativeValue::UInt8(narrow_unsigned(cursor, raw, u8::MAX as u64)? as u8),
        NativeType::UInt16 => {
            NativeValue::UInt16(narrow_unsigned(cursor, raw, u16::MAX as u64)? as u16)
        }
        NativeType::UInt32 => {
            NativeValue::UInt32(narrow_unsigned(cursor, raw, u32::MAX as u64)? as u32)
        }
        NativeType::UInt64 => NativeValue::UInt64(raw as u64),
        NativeType::Float => NativeValue::Float(raw as f32),
        NativeType::Double => NativeValue::Double(raw),
        other => {
            return Err(CodaError::InvalidType(format!(
                "{other:?} is not a numeric native type"
            )))
        }
    })
}

/// Range-check a parsed value against a narrow signed native type before
/// the caller narrows it with `as`. The file declared e.g. `int8` but the
/// text carried a wider value: that is a `product` error, not a silent
/// wraparound.
fn narrow_signed(cursor: &Cursor, raw: f64, min: i64, max: i64) -> Result<i64> {
    let v = raw as i64;
    if v < min || v > max {
        return Err(CodaError::product(
            cursor.path_string(),
            format!("value {v} does not fit in the declared narrow integer type"),
        ));
    }
    Ok(v)
}

fn narrow_unsigned(cursor: &Cursor, raw: f64, max: u64) -> Result<u64> {
    let v = raw as u64;
    if raw < 0.0 || v > max {
        return Err(CodaError::product(
            cursor.path_string(),
            format!("value {raw} does not fit in the declared narrow unsigned type"),
        ));
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::Product;
    use crate::types::{number::Endianness, Format, TypeBuilder};
    use std::rc::Rc;

    fn ascii_int_cursor(data: &str) -> Cursor {
        let t = TypeBuilder::new(Format::Ascii, NativeType::Int32, TypeKind::Integer(NumberType::new(Endianness::Big)))
            .build();
        let product = Rc::new(Product::from_buffer(Format::Ascii, t, data.as_bytes().to_vec()));
        Cursor::set_product(product)
    }

    #[test]
    fn variable_length_integer_discovers_its_own_size() {
        let cursor = ascii_int_cursor("123 ");
        assert_eq!(cursor.get_bit_size().unwrap(), (3 * 8));
        assert_eq!(cursor.read_value().unwrap(), NativeValue::Int32(123));
    }

    #[test]
    fn integer_mapping_takes_precedence_over_numeric_parse() {
        let t = TypeBuilder::new(
            Format::Ascii,
            NativeType::Int32,
            TypeKind::Integer(
                NumberType::new(Endianness::Big).with_mappings(vec![crate::types::Mapping::new(
                    "N/A",
                    crate::types::MappingValue::Integer(-1),
                )]),
            ),
        )
        .build();
        let product = Rc::new(Product::from_buffer(Format::Ascii, t, b"N/A".to_vec()));
        let cursor = Cursor::set_product(product);
        assert_eq!(cursor.get_bit_size().unwrap(), 3 * 8);
        assert_eq!(cursor.read_value().unwrap(), NativeValue::Int32(-1));
    }

    #[test]
    fn mapping_shorter_than_fixed_size_is_rejected() {
        let t = TypeBuilder::new(
            Format::Ascii,
            NativeType::Int32,
            TypeKind::Integer(
                NumberType::new(Endianness::Big).with_mappings(vec![crate::types::Mapping::new(
                    "N/A",
                    crate::types::MappingValue::Integer(-1),
                )]),
            ),
        )
        .bit_size(8 * 8)
        .build();
        let product = Rc::new(Product::from_buffer(Format::Ascii, t, b"N/A     ".to_vec()));
        let cursor = Cursor::set_product(product);
        assert!(cursor.read_value().is_err());
    }

    #[test]
    fn narrow_integer_overflow_is_a_product_error() {
        let t = TypeBuilder::new(
            Format::Ascii,
            NativeType::Int8,
            TypeKind::Integer(NumberType::new(Endianness::Big)),
        )
        .build();
        let product = Rc::new(Product::from_buffer(Format::Ascii, t, b"200".to_vec()));
        let cursor = Cursor::set_product(product);
        assert!(cursor.read_value().is_err());
    }
}
