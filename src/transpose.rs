//! Multidimensional array reshuffling and the partial-array read helper,
//! grounded on `coda-transpose-array.h`'s multiplier/carry
//! walk: `src` is visited in C order for `dims` (last dimension fastest);
//! each element is written to its Fortran-order position for the same
//! `dims` (first dimension fastest).
//!
//! A C-order buffer for shape `dims` and a Fortran-order buffer for shape
//! `dims.reverse()` are the same bytes (standard row-major/column-major
//! identity), so `transpose` is self-inverse only when the second call
//! uses the reversed dimension order — not the same `dims` twice, which
//! the original per-element mapping is not an involution of for
//! non-uniform shapes.

use crate::error::{CodaError, Result};

/// Reorder `data` (an array of `dims.iter().product()` elements of
/// `element_size` bytes each, currently laid out in C order for `dims`)
/// into Fortran order for the same `dims`, in place.
///
/// `element_size` must be one of 1, 2, 4, 8.
pub fn transpose(data: &mut [u8], dims: &[u64], element_size: usize) -> Result<()> {
    if !matches!(element_size, 1 | 2 | 4 | 8) {
        return Err(CodaError::InvalidArgument(format!(
            "transpose element_size must be one of 1, 2, 4, 8, got {element_size}"
        )));
    }
    if dims.len() <= 1 {
        return Ok(());
    }
    let num_elements: u64 = dims.iter().product();
    if num_elements <= 1 {
        return Ok(());
    }
    if data.len() != num_elements as usize * element_size {
        return Err(CodaError::InvalidArgument(format!(
            "transpose buffer length {} does not match {num_elements} elements of size {element_size}",
            data.len()
        )));
    }

    let n = dims.len();
    // rdim[j] is the j-th dimension counting from the end of `dims`; the
    // C-order traversal below increments the fastest (last) dimension
    // first, so carries walk rdim in this order.
    let rdim: Vec<u64> = (0..n).map(|j| dims[n - 1 - j]).collect();
    // rdim_ext carries the source's `rdim[num_dims] = 1` sentinel so the
    // multiplier recurrence can read one past the last real dimension.
    let mut rdim_ext = rdim.clone();
    rdim_ext.push(1);
    let mut multiplier = vec![1u64; n + 1];
    for i in (1..=n).rev() {
        multiplier[i - 1] = multiplier[i] * rdim_ext[i];
    }
    // multiplier[n] is never read below (the outermost carry has nowhere
    // further to go), matching the source's sentinel `rdim[num_dims] = 0`.

    let mut dst = vec![0u8; data.len()];
    let mut index: u64 = 0;
    let mut rsub = vec![0u64; n];

    for i in 0..num_elements as usize {
        let src_off = i * element_size;
        let dst_off = index as usize * element_size;
        dst[dst_off..dst_off + element_size]
            .copy_from_slice(&data[src_off..src_off + element_size]);

        let mut j = 0usize;
        index += multiplier[j];
        rsub[j] += 1;
        while rsub[j] == rdim[j] {
            rsub[j] = 0;
            index -= multiplier[j] * rdim[j];
            j += 1;
            if j == n {
                break;
            }
            index += multiplier[j];
            rsub[j] += 1;
        }
    }

    data.copy_from_slice(&dst);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transpose_bytes(data: &[u8], dims: &[u64]) -> Vec<u8> {
        let mut buf = data.to_vec();
        transpose(&mut buf, dims, 1).unwrap();
        buf
    }

    #[test]
    fn two_by_three_byte_grid_converts_to_fortran_order() {
        // row-major [[0,1,2],[3,4,5]] -> column-major [0,3,1,4,2,5]
        let src = vec![0u8, 1, 2, 3, 4, 5];
        let out = transpose_bytes(&src, &[2, 3]);
        assert_eq!(out, vec![0, 3, 1, 4, 2, 5]);
    }

    #[test]
    fn reversed_dims_round_trip_restores_original() {
        let src = vec![0u8, 1, 2, 3, 4, 5];
        let once = transpose_bytes(&src, &[2, 3]);
        let mut twice = once.clone();
        transpose(&mut twice, &[3, 2], 1).unwrap();
        assert_eq!(twice, src);
    }

    #[test]
    fn single_dimension_is_a_no_op() {
        let src = vec![1u8, 2, 3, 4];
        let out = transpose_bytes(&src, &[4]);
        assert_eq!(out, src);
    }

    #[test]
    fn rejects_unsupported_element_size() {
        let mut buf = vec![0u8; 9];
        let err = transpose(&mut buf, &[3, 3], 3).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
    }
}

/// Read `length` elements starting at `offset` from an array by scalar
/// iteration: equivalent to reading the full array and
/// slicing, but only visits the requested range.
pub fn read_partial_array<T>(
    cursor: &crate::cursor::Cursor,
    offset: u64,
    length: u64,
    read_scalar: impl Fn(&crate::cursor::Cursor) -> Result<T>,
) -> Result<Vec<T>> {
    let num_elements = cursor.get_num_elements()? as u64;
    if offset.saturating_add(length) > num_elements {
        return Err(CodaError::ArrayOutOfBounds {
            dim: 0,
            index: (offset + length) as i64,
            size: num_elements as i64,
        });
    }
    let mut out = Vec::with_capacity(length as usize);
    for i in offset..offset + length {
        let mut elem = cursor.clone();
        elem.goto_array_element_by_index(i)?;
        out.push(read_scalar(&elem)?);
    }
    Ok(out)
}

#[cfg(test)]
mod partial_read_tests {
    use super::*;
    use crate::product::Product;
    use crate::types::{array::Dimension, number::Endianness, ArrayType, NativeType, NumberType, TypeBuilder, TypeKind};
    use std::rc::Rc;

    #[test]
    fn partial_array_matches_full_array_slice() {
        let elem = TypeBuilder::new(
            crate::types::Format::Binary,
            NativeType::Int32,
            TypeKind::Integer(NumberType::new(Endianness::Big)),
        )
        .bit_size(32)
        .build();
        let array_type = TypeBuilder::new(
            crate::types::Format::Binary,
            NativeType::NotAvailable,
            TypeKind::Array(ArrayType::new(elem, vec![Dimension::Fixed(4)])),
        )
        .build();
        let data: Vec<u8> = (0..4i32).flat_map(|v| v.to_be_bytes()).collect();
        let product = Rc::new(Product::from_buffer(crate::types::Format::Binary, array_type, data));
        let cursor = crate::cursor::Cursor::set_product(product);

        let full: Vec<i64> = (0..4)
            .map(|i| {
                let mut c = cursor.clone();
                c.goto_array_element_by_index(i).unwrap();
                c.read_value().unwrap().as_i64().unwrap()
            })
            .collect();

        let partial = read_partial_array(&cursor, 1, 2, |c| {
            Ok(c.read_value()?.as_i64().unwrap())
        })
        .unwrap();

        assert_eq!(partial, full[1..3]);
    }
}
