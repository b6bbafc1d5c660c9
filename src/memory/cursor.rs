//! Scalar reads over a materialized [`MemoryNode`]: a data leaf
//! delegates to the ASCII or binary backend over its own inline window; a
//! special leaf applies the same special-kind dispatch the static backends
//! use, rooted at the node's instantiated base.

use crate::cursor::Cursor;
use crate::dynamic::{MemoryContent, MemoryNode};
use crate::error::{CodaError, Result};
use crate::types::{special::SpecialKind, Format};
use crate::value::NativeValue;

pub fn read_value(mem: &MemoryNode, cursor: &Cursor) -> Result<NativeValue> {
    match &mem.content {
        MemoryContent::Data { format, .. } => match format {
            Format::Ascii => crate::ascii::cursor::read_value(&mem.definition, cursor),
            Format::Binary => crate::binary::cursor::read_value(&mem.definition, cursor),
            other => Err(CodaError::InvalidArgument(format!(
                "memory data node declares a format with no direct scalar read: {other:?}"
            ))),
        },
        MemoryContent::Special(base) => read_special(mem, base, cursor),
        MemoryContent::Record(_) | MemoryContent::Array(_) => Err(CodaError::InvalidArgument(
            "cannot read a scalar value from a record/array node".into(),
        )),
    }
}

fn read_special(mem: &MemoryNode, base: &MemoryNode, cursor: &Cursor) -> Result<NativeValue> {
    let crate::types::TypeKind::Special(special) = &mem.definition.kind else {
        return Err(CodaError::InvalidArgument(
            "memory node's definition is not a special type".into(),
        ));
    };
    let mut base_cursor = cursor.clone();
    base_cursor.use_base_type_of_special_type()?;
    if crate::config::bypass_special_types() {
        return base_cursor.read_value();
    }
    match special.kind {
        SpecialKind::NoData | SpecialKind::Complex => Ok(NativeValue::NotAvailable),
        SpecialKind::VsfInteger => {
            let base_value = read_value(base, &base_cursor)?;
            let v = base_value.as_i64().ok_or_else(|| {
                CodaError::InvalidType("vsf_integer base type did not yield an integer".into())
            })?;
            Ok(NativeValue::Double(v as f64))
        }
        SpecialKind::Time => {
            let base_value = read_value(base, &base_cursor)?;
            let bytes = base_value
                .as_bytes()
                .ok_or_else(|| CodaError::InvalidType("time base type did not yield text".into()))?;
            let s = std::str::from_utf8(bytes)
                .map_err(|_| CodaError::InvalidDatetime("time text is not valid UTF-8".into()))?;
            Ok(NativeValue::Double(crate::special_time::parse_to_seconds(s)?))
        }
    }
}
