//! Crate-level scenario tests: each one exercises a full product — buffer
//! plus type graph — through [`Cursor`] rather than a single internal
//! function, the way `til::section::TILSection`'s round-trip tests exercise
//! a whole parsed section instead of one accessor.

use std::rc::Rc;

use crate::cursor::Cursor;
use crate::expr::parser::parse as parse_expr;
use crate::product::Product;
use crate::types::number::Endianness;
use crate::types::{Field, Format, Mapping, MappingValue, NativeType, NumberType, RecordType, TypeBuilder, TypeKind};

/// Binary signed 12-bit integer, big-endian, value `0xFFE` (-2).
#[test]
fn binary_signed_12_bit_integer_scenario() {
    let field = TypeBuilder::new(
        Format::Binary,
        NativeType::Int16,
        TypeKind::Integer(NumberType::new(Endianness::Big)),
    )
    .bit_size(12)
    .build();
    let product = Rc::new(Product::from_buffer(Format::Binary, field, vec![0xFF, 0xE0]));
    let cursor = Cursor::set_product(product);
    assert_eq!(cursor.read_value().unwrap().as_i64(), Some(-2));
}

/// ASCII float with trailing whitespace, dynamic size. The
/// trailing whitespace does not change the parsed value regardless of
/// exactly how many of those bytes the size-resolution scan reports as
/// consumed.
#[test]
fn ascii_float_trailing_whitespace_scenario() {
    let field = TypeBuilder::new(
        Format::Ascii,
        NativeType::Double,
        TypeKind::Real(NumberType::new(Endianness::Big)),
    )
    .build();
    let product = Rc::new(Product::from_buffer(
        Format::Ascii,
        field,
        b" -3.5e2 \t".to_vec(),
    ));
    let cursor = Cursor::set_product(product);
    assert_eq!(cursor.read_value().unwrap().as_f64(), Some(-350.0));
}

/// ASCII integer mapping. `"N/A"` and the empty string are
/// recognized sentinels; anything else falls through to ordinary numeric
/// parsing.
#[test]
fn ascii_integer_mapping_scenario() {
    let mapped_field = |data: &[u8]| {
        let field = TypeBuilder::new(
            Format::Ascii,
            NativeType::Int32,
            TypeKind::Integer(
                NumberType::new(Endianness::Big)
                    .with_mappings(vec![
                        Mapping::new("N/A", MappingValue::Integer(-1)),
                        Mapping::new("", MappingValue::Integer(0)),
                    ])
                    .with_default_bit_size(24),
            ),
        )
        .build();
        let product = Rc::new(Product::from_buffer(Format::Ascii, field, data.to_vec()));
        Cursor::set_product(product)
    };

    let cursor = mapped_field(b"N/Axxx");
    assert_eq!(cursor.get_bit_size().unwrap(), 3 * 8);
    assert_eq!(cursor.read_value().unwrap().as_i64(), Some(-1));

    let cursor = mapped_field(b"");
    assert_eq!(cursor.read_value().unwrap().as_i64(), Some(0));

    let cursor = mapped_field(b"007");
    assert_eq!(cursor.read_value().unwrap().as_i64(), Some(7));
}

/// End-of-line detection lock-in. A file whose first line ends
/// `CRLF` and a later line ends `LF` is a `product` error when the line
/// index is built.
#[test]
fn eol_detection_lock_in_scenario() {
    let field = TypeBuilder::new(
        Format::Ascii,
        NativeType::NotAvailable,
        TypeKind::Text(crate::types::TextType::new()),
    )
    .bit_size(crate::types::BIT_SIZE_VARIABLE)
    .build();
    let data = b"first\r\nsecond\nthird\r\n".to_vec();
    let product = Rc::new(Product::from_buffer(Format::Ascii, field, data));
    let err = product.line_index().unwrap_err();
    assert_eq!(err.kind(), crate::error::ErrorKind::Product);
}

/// Union availability. A record marked `union=true` with three
/// fields whose availability expressions are `x==0`, `x==1`, `x==2`; the
/// cursor's sibling scalar `x` (a field of the enclosing, non-union
/// record) holds `1`, so `goto_available_union_field` selects index 1.
#[test]
fn union_availability_scenario() {
    let int_field = || {
        TypeBuilder::new(
            Format::Binary,
            NativeType::Int32,
            TypeKind::Integer(NumberType::new(Endianness::Big)),
        )
        .bit_size(32)
        .build()
    };

    let union_record = RecordType::new(
        vec![
            Field::new("branch0", int_field()).available_expr(parse_expr("parent(this).x==0").unwrap()),
            Field::new("branch1", int_field()).available_expr(parse_expr("parent(this).x==1").unwrap()),
            Field::new("branch2", int_field()).available_expr(parse_expr("parent(this).x==2").unwrap()),
        ],
        true,
    );
    let union_type =
        TypeBuilder::new(Format::Binary, NativeType::NotAvailable, TypeKind::Record(union_record)).build();

    let outer_record = RecordType::new(
        vec![Field::new("x", int_field()), Field::new("payload", union_type)],
        false,
    );
    let root = TypeBuilder::new(Format::Binary, NativeType::NotAvailable, TypeKind::Record(outer_record)).build();

    let mut data = Vec::new();
    data.extend_from_slice(&1i32.to_be_bytes()); // x == 1
    data.extend_from_slice(&99i32.to_be_bytes()); // union payload, read as branch1
    let product = Rc::new(Product::from_buffer(Format::Binary, root, data));

    let mut cursor = Cursor::set_product(product);
    cursor.goto_record_field_by_name("payload").unwrap();
    cursor.goto_available_union_field().unwrap();
    assert_eq!(cursor.index(), 1);
    assert_eq!(cursor.read_value().unwrap().as_i64(), Some(99));
}

/// netCDF classic scenario. One `float` variable `data`, shape
/// `[4, 3]`, `scale_factor = 0.5`. Reading element `[1, 2]` returns
/// `0.5 * raw`.
#[test]
fn netcdf_scale_factor_scenario() {
    let bytes = build_netcdf_scale_factor_fixture();
    let product = Rc::new(crate::netcdf::open_buffer(bytes).unwrap());
    let mut cursor = Cursor::set_product(product);
    cursor.goto_record_field_by_name("data").unwrap();
    // flattened index for [1, 2] over shape [4, 3] (row-major) is 1*3+2 = 5
    cursor.goto_array_element_by_index(5).unwrap();
    let raw = 5.0f32;
    assert_eq!(cursor.read_value().unwrap().as_f64(), Some(0.5 * raw as f64));
}

fn build_netcdf_scale_factor_fixture() -> Vec<u8> {
    // Hand-assembled classic v1 header: two dims (y=4, x=3), one float
    // variable `data` over [y, x] with a scale_factor attribute, followed
    // by 12 sequential big-endian f32 values 0.0..11.0.
    fn push_name(buf: &mut Vec<u8>, name: &str) {
        buf.extend_from_slice(&(name.len() as u32).to_be_bytes());
        buf.extend_from_slice(name.as_bytes());
        let padded = (name.len() + 3) & !3;
        buf.resize(buf.len() + (padded - name.len()), 0);
    }

    let mut buf = Vec::new();
    buf.extend_from_slice(b"CDF\x01");
    buf.extend_from_slice(&0u32.to_be_bytes()); // numrecs

    // dim_array
    buf.extend_from_slice(&10u32.to_be_bytes()); // NC_DIMENSION
    buf.extend_from_slice(&2u32.to_be_bytes()); // nelems
    push_name(&mut buf, "y");
    buf.extend_from_slice(&4u32.to_be_bytes());
    push_name(&mut buf, "x");
    buf.extend_from_slice(&3u32.to_be_bytes());

    // gatt_array: absent
    buf.extend_from_slice(&0u32.to_be_bytes());
    buf.extend_from_slice(&0u32.to_be_bytes());

    // var_array
    buf.extend_from_slice(&11u32.to_be_bytes()); // NC_VARIABLE
    buf.extend_from_slice(&1u32.to_be_bytes()); // nelems
    push_name(&mut buf, "data");
    buf.extend_from_slice(&2u32.to_be_bytes()); // ndims
    buf.extend_from_slice(&0u32.to_be_bytes()); // dimid y
    buf.extend_from_slice(&1u32.to_be_bytes()); // dimid x
    // vatt_array: one attribute, scale_factor = 0.5f
    buf.extend_from_slice(&12u32.to_be_bytes()); // NC_ATTRIBUTE
    buf.extend_from_slice(&1u32.to_be_bytes());
    push_name(&mut buf, "scale_factor");
    buf.extend_from_slice(&5u32.to_be_bytes()); // nc_type = float
    buf.extend_from_slice(&1u32.to_be_bytes()); // nelems
    buf.extend_from_slice(&0.5f32.to_be_bytes());
    buf.extend_from_slice(&5u32.to_be_bytes()); // nc_type = float
    buf.extend_from_slice(&48u32.to_be_bytes()); // vsize = 12 * 4
    let begin_offset_pos = buf.len();
    buf.extend_from_slice(&0u32.to_be_bytes()); // begin, patched below

    let begin = buf.len() as u32;
    buf[begin_offset_pos..begin_offset_pos + 4].copy_from_slice(&begin.to_be_bytes());
    for i in 0..12 {
        buf.extend_from_slice(&(i as f32).to_be_bytes());
    }

    buf
}
