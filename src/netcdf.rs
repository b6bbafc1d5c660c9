//! netCDF classic (v1/v2) header parser: the
//! core's own reader for the one container format that needs no external
//! vendor library, producing a [`crate::dynamic::MemoryNode`] tree over the
//! original file's bytes.
//!
//! Grounded on the classic format's byte layout directly (magic, numrecs,
//! `dim_array`/`gatt_array`/`att_array`/`var_array` tags, nc_type codes,
//! vsize, 32- or 64-bit `begin`, all big-endian); the string/attribute
//! padding and record-variable interleaving rules follow the classic
//! format's own convention (CF attributes such as `scale_factor` wire
//! into a numeric conversion at open time).

use std::path::Path;

use crate::bytes_source::BytesSource;
use crate::dynamic::MemoryNode;
use crate::error::{CodaError, Result};
use crate::product::Product;
use crate::types::number::{Conversion, Endianness, NumberType};
use crate::types::{ArrayType, Format, NativeType, TextType, TypeBuilder, TypeKind};

const NC_DIMENSION: u32 = 10;
const NC_VARIABLE: u32 = 11;
const NC_ATTRIBUTE: u32 = 12;
const ABSENT_TAG: u32 = 0;

fn nc_type_size(nc_type: u32) -> Result<usize> {
    match nc_type {
        1 | 2 => Ok(1), // byte, char
        3 => Ok(2),     // short
        4 | 5 => Ok(4), // int, float
        6 => Ok(8),     // double
        other => Err(CodaError::invalid_format(
            "<netcdf>",
            format!("unknown nc_type {other}"),
        )),
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Reader { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or_else(truncated)?;
        if end > self.data.len() {
            return Err(truncated());
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        Ok(u64::from_be_bytes(b.try_into().unwrap()))
    }

    fn skip_padding(&mut self, unpadded_len: usize) -> Result<()> {
        let padded = padded_len(unpadded_len);
        self.take(padded - unpadded_len)?;
        Ok(())
    }

    fn name(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        let raw = self.take(len)?.to_vec();
        self.skip_padding(len)?;
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }
}

fn truncated() -> CodaError {
    CodaError::invalid_format("<netcdf>", "header ends before declared data")
}

/// Round `len` up to the next multiple of 4 (classic format's name/value
/// byte-alignment rule).
fn padded_len(len: usize) -> usize {
    (len + 3) & !3
}

#[derive(Debug, Clone)]
struct NcDim {
    #[allow(dead_code)]
    name: String,
    /// 0 means this is the record (appendable) dimension.
    length: u32,
}

#[derive(Debug, Clone)]
struct NcAttr {
    name: String,
    nc_type: u32,
    count: u32,
    values: Vec<u8>,
}

impl NcAttr {
    /// The attribute's first element as a float, for CF-convention
    /// `scale_factor`/`add_offset`/`_FillValue` attributes.
    fn as_f64(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        let mut r = Reader::new(&self.values);
        match self.nc_type {
            1 => r.take(1).ok().map(|b| b[0] as i8 as f64),
            2 => r.take(1).ok().map(|b| b[0] as f64),
            3 => r.take(2).ok().map(|b| i16::from_be_bytes([b[0], b[1]]) as f64),
            4 => r.u32().ok().map(|v| v as i32 as f64),
            5 => r.u32().ok().map(|v| f32::from_bits(v) as f64),
            6 => r.u64().ok().map(|v| f64::from_bits(v)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct NcVar {
    name: String,
    dimids: Vec<u32>,
    attrs: Vec<NcAttr>,
    nc_type: u32,
    vsize: u32,
    begin: u64,
}

impl NcVar {
    fn attr(&self, name: &str) -> Option<&NcAttr> {
        self.attrs.iter().find(|a| a.name == name)
    }

    fn is_record_variable(&self, header: &ClassicHeader) -> bool {
        matches!(self.dimids.first(), Some(&id) if header.dims[id as usize].length == 0)
    }
}

/// A parsed classic netCDF header: dimensions, global attributes, and
/// variable descriptors, ready to be turned into a memory-cursor tree via
/// [`ClassicHeader::build_root`].
#[derive(Debug, Clone)]
pub struct ClassicHeader {
    pub version: u8,
    pub numrecs: u32,
    dims: Vec<NcDim>,
    #[allow(dead_code)]
    global_attrs: Vec<NcAttr>,
    vars: Vec<NcVar>,
}

impl ClassicHeader {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 4 {
            return Err(truncated());
        }
        let version = match &data[0..4] {
            b"CDF\x01" => 1,
            b"CDF\x02" => 2,
            _ => {
                return Err(CodaError::invalid_format(
                    "<netcdf>",
                    "missing CDF magic bytes",
                ))
            }
        };
        let mut r = Reader::new(data);
        r.take(4)?;
        let numrecs = r.u32()?;
        let dims = parse_list(&mut r, NC_DIMENSION, |r| {
            let name = r.name()?;
            let length = r.u32()?;
            Ok(NcDim { name, length })
        })?;
        let global_attrs = parse_list(&mut r, NC_ATTRIBUTE, parse_attr)?;
        let vars = parse_list(&mut r, NC_VARIABLE, |r| parse_var(r, version))?;

        for var in &vars {
            for &id in &var.dimids {
                if id as usize >= dims.len() {
                    return Err(CodaError::invalid_format(
                        "<netcdf>",
                        format!("variable {} references unknown dimension {id}", var.name),
                    ));
                }
            }
        }

        Ok(ClassicHeader {
            version,
            numrecs,
            dims,
            global_attrs,
            vars,
        })
    }

    /// Resolve `var`'s declared dimension lengths, substituting `numrecs`
    /// for the record dimension.
    fn resolve_dims(&self, var: &NcVar) -> Vec<u64> {
        var.dimids
            .iter()
            .map(|&id| {
                let dim = &self.dims[id as usize];
                if dim.length == 0 {
                    u64::from(self.numrecs)
                } else {
                    u64::from(dim.length)
                }
            })
            .collect()
    }

    /// Total per-record byte span: the sum of every record variable's
    /// `vsize`, already 4-byte padded per the classic format.
    fn record_size(&self) -> u64 {
        self.vars
            .iter()
            .filter(|v| v.is_record_variable(self))
            .map(|v| u64::from(v.vsize))
            .sum()
    }

    /// Build the materialized root node: a record whose fields are this
    /// header's variables.
    pub fn build_root(&self) -> Result<std::rc::Rc<MemoryNode>> {
        let mut fields = Vec::with_capacity(self.vars.len());
        let mut field_nodes = Vec::with_capacity(self.vars.len());
        for var in &self.vars {
            let (field_type, node) = self.build_variable(var)?;
            fields.push(crate::types::Field::new(var.name.clone(), field_type));
            field_nodes.push(Some(node));
        }
        let record_type = crate::types::RecordType::new(fields, false);
        let root_type = TypeBuilder::new(
            Format::NetCdf,
            NativeType::NotAvailable,
            TypeKind::Record(record_type),
        )
        .build();
        Ok(MemoryNode::record(root_type, field_nodes))
    }

    fn conversion_for(&self, var: &NcVar) -> Option<Conversion> {
        let scale_factor = var.attr("scale_factor").and_then(NcAttr::as_f64);
        let add_offset = var.attr("add_offset").and_then(NcAttr::as_f64);
        let fill_value = var.attr("_FillValue").and_then(NcAttr::as_f64);
        if scale_factor.is_none() && add_offset.is_none() && fill_value.is_none() {
            return None;
        }
        Some(Conversion {
            numerator: scale_factor.unwrap_or(1.0),
            denominator: 1.0,
            add_offset: add_offset.unwrap_or(0.0),
            invalid_value: fill_value.unwrap_or(f64::NAN),
        })
    }

    fn numeric_element_type(&self, var: &NcVar) -> Result<crate::types::Type> {
        let bit_size = (nc_type_size(var.nc_type)? * 8) as i64;
        let read_type = match var.nc_type {
            1 => NativeType::Int8,
            3 => NativeType::Int16,
            4 => NativeType::Int32,
            5 => NativeType::Float,
            6 => NativeType::Double,
            other => {
                return Err(CodaError::invalid_format(
                    "<netcdf>",
                    format!("unsupported numeric nc_type {other} for variable {}", var.name),
                ))
            }
        };
        let mut num = NumberType::new(Endianness::Big);
        if let Some(conversion) = self.conversion_for(var) {
            num = num.with_conversion(conversion);
        }
        Ok(TypeBuilder::new(Format::Binary, read_type, TypeKind::Integer(num))
            .bit_size(bit_size)
            .build())
    }

    /// Build `var`'s type and materialized node. A `char` variable is a
    /// string array over all but the last dimension unless it is
    /// one-dimensional and that sole dimension is the record dimension.
    fn build_variable(&self, var: &NcVar) -> Result<(crate::types::Type, std::rc::Rc<MemoryNode>)> {
        let dims = self.resolve_dims(var);
        let is_record = var.is_record_variable(self);
        let record_size = if is_record { self.record_size() } else { 0 };

        let is_char_string = var.nc_type == 2 && !(dims.len() == 1 && is_record);

        if is_char_string {
            return self.build_string_variable(var, &dims, is_record, record_size);
        }

        let elem_size = nc_type_size(var.nc_type)?;
        let elem_type = if var.nc_type == 2 {
            TypeBuilder::new(
                Format::Binary,
                NativeType::String,
                TypeKind::Text(TextType::new()),
            )
            .bit_size(8)
            .build()
        } else {
            self.numeric_element_type(var)?
        };

        self.build_array(var, &dims, is_record, record_size, elem_type, elem_size)
    }

    fn build_string_variable(
        &self,
        var: &NcVar,
        dims: &[u64],
        is_record: bool,
        record_size: u64,
    ) -> Result<(crate::types::Type, std::rc::Rc<MemoryNode>)> {
        let string_len = *dims.last().unwrap_or(&0);
        let outer_dims = &dims[..dims.len().saturating_sub(1)];
        let elem_type = TypeBuilder::new(
            Format::Binary,
            NativeType::String,
            TypeKind::Text(TextType::new()),
        )
        .bit_size((string_len * 8) as i64)
        .build();

        if outer_dims.is_empty() {
            let node = MemoryNode::data(elem_type.clone(), var.begin, string_len, Format::Binary);
            return Ok((elem_type, node));
        }

        let num_elements: u64 = outer_dims.iter().product();
        let mut elements = Vec::with_capacity(num_elements as usize);
        for i in 0..num_elements {
            let offset = element_offset(var, i, string_len, is_record, record_size);
            elements.push(MemoryNode::data(
                elem_type.clone(),
                offset,
                string_len,
                Format::Binary,
            ));
        }
        let array_type = TypeBuilder::new(
            Format::NetCdf,
            NativeType::NotAvailable,
            TypeKind::Array(ArrayType::new(
                elem_type,
                outer_dims
                    .iter()
                    .map(|&n| crate::types::array::Dimension::Fixed(n as u32))
                    .collect(),
            )),
        )
        .build();
        let node = MemoryNode::array(array_type.clone(), elements);
        Ok((array_type, node))
    }

    fn build_array(
        &self,
        var: &NcVar,
        dims: &[u64],
        is_record: bool,
        record_size: u64,
        elem_type: crate::types::Type,
        elem_size: usize,
    ) -> Result<(crate::types::Type, std::rc::Rc<MemoryNode>)> {
        if dims.is_empty() {
            let node = MemoryNode::data(elem_type.clone(), var.begin, elem_size as u64, Format::Binary);
            return Ok((elem_type, node));
        }

        let num_elements: u64 = dims.iter().product();
        let mut elements = Vec::with_capacity(num_elements as usize);
        for i in 0..num_elements {
            let offset = element_offset(var, i, elem_size as u64, is_record, record_size);
            elements.push(MemoryNode::data(elem_type.clone(), offset, elem_size as u64, Format::Binary));
        }
        let array_type = TypeBuilder::new(
            Format::NetCdf,
            NativeType::NotAvailable,
            TypeKind::Array(ArrayType::new(
                elem_type,
                dims.iter()
                    .map(|&n| crate::types::array::Dimension::Fixed(n as u32))
                    .collect(),
            )),
        )
        .build();
        let node = MemoryNode::array(array_type.clone(), elements);
        Ok((array_type, node))
    }
}

/// Byte offset of flat element `i` (C order over the variable's resolved
/// dims) of `elem_size` bytes each. A record variable's record index (the
/// flat index divided by the product of the non-record dims) selects which
/// `record_size`-byte slab to start from; the remainder addresses within
/// that slab exactly as a non-record array would.
fn element_offset(var: &NcVar, i: u64, elem_size: u64, is_record: bool, record_size: u64) -> u64 {
    if !is_record {
        return var.begin + i * elem_size;
    }
    let per_record_elements = u64::from(var.vsize) / elem_size.max(1);
    let record_index = i / per_record_elements.max(1);
    let within_record = i % per_record_elements.max(1);
    var.begin + record_index * record_size + within_record * elem_size
}

fn parse_list<T>(
    r: &mut Reader,
    expected_tag: u32,
    mut parse_item: impl FnMut(&mut Reader) -> Result<T>,
) -> Result<Vec<T>> {
    let tag = r.u32()?;
    let nelems = r.u32()?;
    if tag == ABSENT_TAG {
        return Ok(Vec::new());
    }
    if tag != expected_tag {
        return Err(CodaError::invalid_format(
            "<netcdf>",
            format!("expected list tag {expected_tag}, got {tag}"),
        ));
    }
    (0..nelems).map(|_| parse_item(r)).collect()
}

fn parse_attr(r: &mut Reader) -> Result<NcAttr> {
    let name = r.name()?;
    let nc_type = r.u32()?;
    let count = r.u32()?;
    let elem_size = nc_type_size(nc_type)?;
    let total = count as usize * elem_size;
    let values = r.take(total)?.to_vec();
    r.skip_padding(total)?;
    Ok(NcAttr {
        name,
        nc_type,
        count,
        values,
    })
}

fn parse_var(r: &mut Reader, version: u8) -> Result<NcVar> {
    let name = r.name()?;
    let ndims = r.u32()?;
    let dimids = (0..ndims).map(|_| r.u32()).collect::<Result<Vec<_>>>()?;
    let attrs = parse_list(r, NC_ATTRIBUTE, parse_attr)?;
    let nc_type = r.u32()?;
    let vsize = r.u32()?;
    let begin = if version == 1 { r.u32()? as u64 } else { r.u64()? };
    Ok(NcVar {
        name,
        dimids,
        attrs,
        nc_type,
        vsize,
        begin,
    })
}

/// Open a classic netCDF file from disk.
pub fn open(path: &Path) -> Result<Product> {
    let bytes = BytesSource::open_file(path)?.into_slurped()?;
    let data = bytes
        .as_slice()
        .expect("a slurped BytesSource is always buffer-backed")
        .to_vec();
    let header = ClassicHeader::parse(&data)?;
    let root = header.build_root()?;
    Ok(Product::container(
        Format::NetCdf,
        root,
        bytes,
        Some(path.display().to_string()),
    ))
}

/// Open a classic netCDF product already resident in memory (used heavily
/// by tests, and by callers that have already read the file themselves).
pub fn open_buffer(data: Vec<u8>) -> Result<Product> {
    let header = ClassicHeader::parse(&data)?;
    let root = header.build_root()?;
    Ok(Product::container(
        Format::NetCdf,
        root,
        BytesSource::from_buffer(data),
        None,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::Cursor;

    /// Hand-assembles a minimal classic (v1) file with one dimension pair
    /// `[4,3]` and one `float` variable `data`, big-endian, carrying a
    /// `scale_factor` attribute of `0.5`.
    fn scenario_bytes() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"CDF\x01");
        buf.extend_from_slice(&0u32.to_be_bytes()); // numrecs

        // dim_array: tag 10, 2 dims
        buf.extend_from_slice(&NC_DIMENSION.to_be_bytes());
        buf.extend_from_slice(&2u32.to_be_bytes());
        push_name(&mut buf, "y");
        buf.extend_from_slice(&4u32.to_be_bytes());
        push_name(&mut buf, "x");
        buf.extend_from_slice(&3u32.to_be_bytes());

        // gatt_array: absent
        buf.extend_from_slice(&ABSENT_TAG.to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes());

        // var_array: tag 11, 1 var
        buf.extend_from_slice(&NC_VARIABLE.to_be_bytes());
        buf.extend_from_slice(&1u32.to_be_bytes());
        push_name(&mut buf, "data");
        buf.extend_from_slice(&2u32.to_be_bytes()); // ndims
        buf.extend_from_slice(&0u32.to_be_bytes()); // dimid y
        buf.extend_from_slice(&1u32.to_be_bytes()); // dimid x
        // vatt_array: tag 12, 1 attr (scale_factor, float, 0.5)
        buf.extend_from_slice(&NC_ATTRIBUTE.to_be_bytes());
        buf.extend_from_slice(&1u32.to_be_bytes());
        push_name(&mut buf, "scale_factor");
        buf.extend_from_slice(&5u32.to_be_bytes()); // nc_type float
        buf.extend_from_slice(&1u32.to_be_bytes()); // count
        buf.extend_from_slice(&0.5f32.to_be_bytes());
        // nc_type, vsize, begin
        buf.extend_from_slice(&5u32.to_be_bytes()); // float
        buf.extend_from_slice(&(12 * 4u32).to_be_bytes()); // vsize = 48
        let begin = buf.len() as u32 + 4; // begin written right after this field
        buf.extend_from_slice(&begin.to_be_bytes());

        // variable data: 12 floats, row-major [4,3], value = flat index
        for i in 0..12u32 {
            buf.extend_from_slice(&(i as f32).to_be_bytes());
        }
        buf
    }

    fn push_name(buf: &mut Vec<u8>, name: &str) {
        buf.extend_from_slice(&(name.len() as u32).to_be_bytes());
        buf.extend_from_slice(name.as_bytes());
        let pad = padded_len(name.len()) - name.len();
        buf.extend(std::iter::repeat(0u8).take(pad));
    }

    #[test]
    fn parses_header_and_resolves_fixed_dims() {
        let data = scenario_bytes();
        let header = ClassicHeader::parse(&data).unwrap();
        assert_eq!(header.dims.len(), 2);
        let var = &header.vars[0];
        assert_eq!(header.resolve_dims(var), vec![4, 3]);
    }

    #[test]
    fn scale_factor_attribute_applies_conversion_on_read() {
        let data = scenario_bytes();
        let product = open_buffer(data).unwrap();
        let cursor = Cursor::set_product(std::rc::Rc::new(product));
        let mut data_cursor = cursor.clone();
        data_cursor.goto_record_field_by_name("data").unwrap();
        // element [1,2] of shape [4,3]: flat index 1*3+2 = 5.
        data_cursor.goto_array_element_by_index(5).unwrap();
        let value = data_cursor.read_value().unwrap();
        assert_eq!(value.as_f64(), Some(0.5 * 5.0));
    }

    #[test]
    fn rejects_bad_magic() {
        let err = ClassicHeader::parse(b"nope").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidFormat);
    }

    #[test]
    fn unlimited_dim_resolves_from_numrecs() {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"CDF\x02");
        buf.extend_from_slice(&7u32.to_be_bytes()); // numrecs = 7
        buf.extend_from_slice(&NC_DIMENSION.to_be_bytes());
        buf.extend_from_slice(&1u32.to_be_bytes());
        push_name(&mut buf, "time");
        buf.extend_from_slice(&0u32.to_be_bytes()); // unlimited
        buf.extend_from_slice(&ABSENT_TAG.to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(&ABSENT_TAG.to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes());
        let header = ClassicHeader::parse(&buf).unwrap();
        assert_eq!(header.numrecs, 7);
        assert_eq!(header.dims[0].length, 0);
    }
}
