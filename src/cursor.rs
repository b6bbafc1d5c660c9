//! The cursor core: navigation primitives, stack discipline,
//! and uniform dispatch across backends.
//!
//! Grounded on `ida_reader.rs`'s `Read + Seek` position discipline for the
//! idea of "a cheap, clonable read/navigation head", generalized into a
//! bounded stack of frames. [`Cursor`] is exposed as a single concrete type
//! whose operations dispatch on a tagged union of backends; [`Node`] is the
//! closed, exhaustively-matched backend tag.

use std::fmt::Write as _;
use std::rc::Rc;

use crate::dynamic::{MemoryContent, MemoryNode};
use crate::error::{CodaError, Result};
use crate::product::Product;
use crate::types::{Format, NativeType, RecordType, Type, TypeClass, TypeKind};

/// Cursor stack bound.
pub const MAX_STACK_DEPTH: usize = 32;

/// Backend tag for a single stack frame.
#[derive(Debug, Clone)]
pub enum Node {
    /// ASCII or binary backend: the static type graph is the only state
    /// needed; the frame's `bit_offset` tracks position.
    AsciiBinary(Type),
    /// Memory (and, by extension, container) backend: a per-product
    /// instantiation.
    Memory(Rc<MemoryNode>),
}

impl Node {
    pub fn definition(&self) -> &Type {
        match self {
            Node::AsciiBinary(t) => t,
            Node::Memory(m) => &m.definition,
        }
    }

    pub fn format(&self) -> Format {
        self.definition().format
    }
}

/// One stack frame: the dynamic type at this position, a signed
/// index (array index, field index, or `-1` for the root/attributes), and
/// a bit offset (`-1` if not applicable, e.g. in container backends).
#[derive(Debug, Clone)]
pub struct Frame {
    pub node: Node,
    pub index: i64,
    pub bit_offset: i64,
}

/// A label for one step of a cursor's path, used only for error messages
/// and `append_path`.
#[derive(Debug, Clone)]
enum PathLabel {
    Field(String),
    Index(i64),
    Attributes,
}

/// The cursor: a bounded navigation stack into a [`Product`]. Cheap to
/// [`Clone`] — every frame is self-sufficient and none embeds a pointer
/// back into a parent cursor.
#[derive(Clone)]
pub struct Cursor {
    product: Rc<Product>,
    stack: Vec<Frame>,
    labels: Vec<PathLabel>,
}

impl Cursor {
    /// Initialize a cursor at the product root with one stack frame.
    pub fn set_product(product: Rc<Product>) -> Self {
        let root_node = product.root.clone();
        let bit_offset = match root_node {
            Node::AsciiBinary(_) => 0,
            Node::Memory(_) => -1,
        };
        Cursor {
            product,
            stack: vec![Frame {
                node: root_node,
                index: -1,
                bit_offset,
            }],
            labels: Vec::new(),
        }
    }

    pub fn product(&self) -> &Product {
        &self.product
    }

    fn top(&self) -> &Frame {
        self.stack.last().expect("cursor stack is never empty")
    }

    fn top_mut(&mut self) -> &mut Frame {
        self.stack.last_mut().expect("cursor stack is never empty")
    }

    pub fn definition(&self) -> &Type {
        self.top().node.definition()
    }

    pub fn class(&self) -> TypeClass {
        self.definition().class()
    }

    pub fn bit_offset(&self) -> i64 {
        self.top().bit_offset
    }

    /// The cursor's position as an absolute byte offset into its product's
    /// bytes; an error if the cursor isn't byte-aligned (every ASCII
    /// position is, by construction).
    pub fn byte_offset(&self) -> Result<u64> {
        let bits = self.absolute_bit_offset()?;
        if bits % 8 != 0 {
            return Err(CodaError::InvalidArgument(
                "cursor is not at a byte-aligned position".into(),
            ));
        }
        Ok(bits / 8)
    }

    pub fn index(&self) -> i64 {
        self.top().index
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Render the navigation path from root to the current frame, for
    /// error messages.
    pub fn path_string(&self) -> String {
        let mut s = String::new();
        for label in &self.labels {
            match label {
                PathLabel::Field(name) => {
                    let _ = write!(s, "/{name}");
                }
                PathLabel::Index(i) => {
                    let _ = write!(s, "[{i}]");
                }
                PathLabel::Attributes => {
                    let _ = write!(s, ".attributes");
                }
            }
        }
        if s.is_empty() {
            "/".to_string()
        } else {
            s
        }
    }

    fn push(&mut self, frame: Frame, label: PathLabel) -> Result<()> {
        if self.stack.len() >= MAX_STACK_DEPTH {
            return Err(CodaError::DataDefinition(format!(
                "cursor stack exceeded MAX_STACK_DEPTH ({MAX_STACK_DEPTH})"
            )));
        }
        self.stack.push(frame);
        self.labels.push(label);
        Ok(())
    }

    // ---- navigation -------------------------------------------------

    pub fn goto_root(&mut self) {
        self.stack.truncate(1);
        self.labels.clear();
    }

    pub fn goto_parent(&mut self) -> Result<()> {
        if self.stack.len() == 1 {
            return Err(CodaError::NoParent);
        }
        self.stack.pop();
        self.labels.pop();
        Ok(())
    }

    fn record(&self) -> Result<&RecordType> {
        match &self.definition().kind {
            TypeKind::Record(r) => Ok(r),
            _ => Err(CodaError::InvalidArgument(
                "cursor is not positioned on a record".into(),
            )),
        }
    }

    pub fn goto_record_field_by_index(&mut self, field_index: usize) -> Result<()> {
        let record = self.record()?;
        let field = record
            .field(field_index)
            .ok_or_else(|| CodaError::InvalidIndex {
                index: field_index as i64,
                num_elements: record.num_fields() as i64,
            })?
            .clone();
        log::trace!("goto_record_field_by_index({field_index}) -> {}", field.name);

        match self.top().node.clone() {
            Node::AsciiBinary(_) => {
                let bit_offset = self.compute_field_bit_offset(field_index)?;
                let frame = Frame {
                    node: Node::AsciiBinary(field.field_type),
                    index: field_index as i64,
                    bit_offset,
                };
                self.push(frame, PathLabel::Field(field.name))
            }
            Node::Memory(mem) => {
                let MemoryContent::Record(fields) = &mem.content else {
                    return Err(CodaError::InvalidArgument(
                        "memory node is not a record".into(),
                    ));
                };
                let child = match fields.get(field_index).and_then(|f| f.as_ref()) {
                    Some(node) => Rc::clone(node),
                    None => MemoryNode::no_data_sentinel(self.product.format),
                };
                let frame = Frame {
                    node: Node::Memory(child),
                    index: field_index as i64,
                    bit_offset: -1,
                };
                self.push(frame, PathLabel::Field(field.name))
            }
        }
    }

    /// Sum the bit sizes of fields `0..field_index` to find where field
    /// `field_index` starts. Union fields all share the record's own offset.
    fn compute_field_bit_offset(&self, field_index: usize) -> Result<i64> {
        let base_offset = self.bit_offset();
        if base_offset < 0 {
            return Ok(-1);
        }
        let record = self.record()?;
        if record.union {
            return Ok(base_offset);
        }
        let mut offset = base_offset as u64;
        let mut remaining = self.bits_remaining_in_window();
        for i in 0..field_index {
            let field = record.field(i).expect("index range validated by caller");
            let mut field_cursor = self.clone();
            field_cursor.push(
                Frame {
                    node: Node::AsciiBinary(Rc::clone(&field.field_type)),
                    index: i as i64,
                    bit_offset: offset as i64,
                },
                PathLabel::Field(field.name.clone()),
            )?;
            let size = crate::size::get_bit_size(&field.field_type, &field_cursor, remaining)? as u64;
            offset += size;
            remaining = remaining.saturating_sub(size);
        }
        Ok(offset as i64)
    }

    pub fn goto_record_field_by_name(&mut self, name: &str) -> Result<()> {
        let index = self
            .record()?
            .field_index(name)
            .ok_or_else(|| CodaError::InvalidName { name: name.into() })?;
        self.goto_record_field_by_index(index)
    }

    pub fn goto_first_record_field(&mut self) -> Result<()> {
        self.goto_record_field_by_index(0)
    }

    pub fn goto_next_record_field(&mut self) -> Result<()> {
        let parent_index = self.index();
        self.goto_parent()?;
        self.goto_record_field_by_index((parent_index + 1) as usize)
    }

    /// Resolve each candidate field's `available_expr`, with the cursor
    /// positioned at the record itself (so a bare field name in the
    /// expression resolves as a sibling field of this record). Returns
    /// `None` if the record has no availability-governed fields (not a
    /// proper discriminated union), `Some(index)` on a unique match, and
    /// `Err(Product)` on zero or multiple matches.
    pub fn union_selected_field(&self, definition: &Type) -> Result<Option<usize>> {
        let TypeKind::Record(record) = &definition.kind else {
            return Ok(None);
        };
        if !record.union {
            return Ok(None);
        }
        let mut matches = Vec::new();
        for (i, field) in record.fields.iter().enumerate() {
            let Some(expr) = &field.available_expr else {
                continue;
            };
            if crate::expr::evaluate_boolean(expr, Some(self))? {
                matches.push(i);
            }
        }
        match matches.len() {
            0 => {
                if record.fields.iter().any(|f| f.available_expr.is_some()) {
                    Err(CodaError::product(
                        self.path_string(),
                        "no union field's availability expression resolved to true",
                    ))
                } else {
                    Ok(None)
                }
            }
            1 => Ok(Some(matches[0])),
            _ => Err(CodaError::product(
                self.path_string(),
                format!("{} union fields resolved to available simultaneously", matches.len()),
            )),
        }
    }

    pub fn goto_available_union_field(&mut self) -> Result<()> {
        let definition = Rc::clone(self.definition());
        let selected = self
            .union_selected_field(&definition)?
            .ok_or_else(|| CodaError::product(self.path_string(), "record is not a union"))?;
        self.goto_record_field_by_index(selected)
    }

    fn array(&self) -> Result<&crate::types::ArrayType> {
        match &self.definition().kind {
            TypeKind::Array(a) => Ok(a),
            _ => Err(CodaError::InvalidArgument(
                "cursor is not positioned on an array".into(),
            )),
        }
    }

    pub fn get_num_elements(&self) -> Result<i64> {
        match &self.top().node {
            Node::Memory(mem) => match &mem.content {
                MemoryContent::Array(elems) => Ok(elems.len() as i64),
                MemoryContent::Record(fields) => Ok(fields.len() as i64),
                _ => Err(CodaError::InvalidArgument(
                    "node has no element/field count".into(),
                )),
            },
            Node::AsciiBinary(_) => match &self.definition().kind {
                TypeKind::Array(array) => {
                    let mut total = 1u64;
                    for dim in &array.dimensions {
                        total *= crate::size::eval_dimension(dim, self)?;
                    }
                    Ok(total as i64)
                }
                TypeKind::Record(record) => Ok(record.num_fields() as i64),
                _ => Err(CodaError::InvalidArgument(
                    "node has no element/field count".into(),
                )),
            },
        }
    }

    /// `n`-dimensional element index -> flat C-order index.
    fn flatten_indices(&self, subs: &[i64]) -> Result<u64> {
        let dims = self.array_dims()?;
        if subs.len() != dims.len() {
            return Err(CodaError::ArrayNumDimsMismatch {
                expected: dims.len() as u8,
                got: subs.len() as u8,
            });
        }
        let mut flat = 0u64;
        for (dim_idx, (&sub, &size)) in subs.iter().zip(dims.iter()).enumerate() {
            if crate::config::perform_boundary_checks() && (sub < 0 || sub as u64 >= size) {
                return Err(CodaError::ArrayOutOfBounds {
                    dim: dim_idx as u8,
                    index: sub,
                    size: size as i64,
                });
            }
            flat = flat * size + sub as u64;
        }
        Ok(flat)
    }

    pub fn array_dims(&self) -> Result<Vec<u64>> {
        match &self.top().node {
            Node::Memory(mem) => match &mem.content {
                MemoryContent::Array(elems) => Ok(vec![elems.len() as u64]),
                _ => Err(CodaError::InvalidArgument("node is not an array".into())),
            },
            Node::AsciiBinary(_) => {
                let array = self.array()?;
                array
                    .dimensions
                    .iter()
                    .map(|d| crate::size::eval_dimension(d, self))
                    .collect()
            }
        }
    }

    pub fn get_array_dim(&self) -> Result<Vec<u64>> {
        self.array_dims()
    }

    pub fn goto_array_element_by_index(&mut self, index: u64) -> Result<()> {
        match self.top().node.clone() {
            Node::AsciiBinary(_) => {
                let array = self.array()?.clone();
                if crate::config::perform_boundary_checks() {
                    let n = self.get_num_elements()? as u64;
                    if index >= n {
                        return Err(CodaError::ArrayOutOfBounds {
                            dim: 0,
                            index: index as i64,
                            size: n as i64,
                        });
                    }
                }
                let elem_bit_size = if array.base.bit_size >= 0 {
                    array.base.bit_size as u64
                } else {
                    // we don't know the element size without visiting
                    // preceding (variable-size) siblings; this is only
                    // exact for fixed-size elements, which is the common
                    // case this helper is used for internally (size.rs
                    // visits elements in order and doesn't rely on this
                    // arithmetic for the variable case).
                    0
                };
                let base_offset = self.bit_offset();
                let bit_offset = if base_offset < 0 {
                    -1
                } else {
                    base_offset + (index * elem_bit_size) as i64
                };
                let frame = Frame {
                    node: Node::AsciiBinary(array.base),
                    index: index as i64,
                    bit_offset,
                };
                self.push(frame, PathLabel::Index(index as i64))
            }
            Node::Memory(mem) => {
                let MemoryContent::Array(elems) = &mem.content else {
                    return Err(CodaError::InvalidArgument("node is not an array".into()));
                };
                if crate::config::perform_boundary_checks() && index as usize >= elems.len() {
                    return Err(CodaError::ArrayOutOfBounds {
                        dim: 0,
                        index: index as i64,
                        size: elems.len() as i64,
                    });
                }
                let child = Rc::clone(&elems[index as usize]);
                let frame = Frame {
                    node: Node::Memory(child),
                    index: index as i64,
                    bit_offset: -1,
                };
                self.push(frame, PathLabel::Index(index as i64))
            }
        }
    }

    pub fn goto_array_element_by_index_unchecked(&mut self, index: u64) -> Result<()> {
        let previous = crate::config::perform_boundary_checks();
        crate::config::set_perform_boundary_checks(false);
        let result = self.goto_array_element_by_index(index);
        crate::config::set_perform_boundary_checks(previous);
        result
    }

    pub fn goto_array_element(&mut self, subs: &[i64]) -> Result<()> {
        let flat = self.flatten_indices(subs)?;
        self.goto_array_element_by_index(flat)
    }

    pub fn goto_first_array_element(&mut self) -> Result<()> {
        self.goto_array_element_by_index(0)
    }

    pub fn goto_next_array_element(&mut self) -> Result<()> {
        let next = self.index() + 1;
        self.goto_parent()?;
        self.goto_array_element_by_index(next as u64)
    }

    pub fn goto_attributes(&mut self) -> Result<()> {
        let attrs = self.definition().attributes.clone();
        let frame = match attrs {
            Some(attr_type) => Frame {
                node: Node::AsciiBinary(attr_type),
                index: -1,
                bit_offset: -1,
            },
            None => Frame {
                node: Node::AsciiBinary(crate::types::TypeBuilder::new(
                    self.definition().format,
                    NativeType::NotAvailable,
                    TypeKind::Record(RecordType::empty()),
                ).build()),
                index: -1,
                bit_offset: -1,
            },
        };
        self.push(frame, PathLabel::Attributes)
    }

    /// Replace the top frame's type with a special type's base type,
    /// without navigating into a new stack position.
    pub fn use_base_type_of_special_type(&mut self) -> Result<()> {
        match self.top().node.clone() {
            Node::AsciiBinary(t) => {
                let TypeKind::Special(special) = &t.kind else {
                    return Err(CodaError::InvalidArgument(
                        "cursor is not positioned on a special type".into(),
                    ));
                };
                self.top_mut().node = Node::AsciiBinary(Rc::clone(&special.base));
                Ok(())
            }
            Node::Memory(mem) => {
                let MemoryContent::Special(base) = &mem.content else {
                    return Err(CodaError::InvalidArgument(
                        "cursor is not positioned on a special type".into(),
                    ));
                };
                self.top_mut().node = Node::Memory(Rc::clone(base));
                Ok(())
            }
        }
    }

    // ---- size resolution ---------------------------------------------

    /// Bits remaining between the cursor's current position and the end of
    /// its enclosing window. For a top-level ASCII/binary product this is
    /// the distance to the end of the product's byte buffer; for a
    /// container-backed node it is the data node's own window.
    pub fn bits_remaining_in_window(&self) -> u64 {
        match &self.top().node {
            Node::AsciiBinary(_) => {
                let offset_bits = self.bit_offset().max(0) as u64;
                let total_bits = self.product.file_size() * 8;
                total_bits.saturating_sub(offset_bits)
            }
            Node::Memory(mem) => match mem.content {
                MemoryContent::Data { length, .. } => length * 8,
                _ => 0,
            },
        }
    }

    pub fn get_bit_size(&self) -> Result<i64> {
        match &self.top().node {
            Node::Memory(mem) => match &mem.content {
                MemoryContent::Data { length, .. } => Ok((*length * 8) as i64),
                _ => crate::size::get_bit_size(&mem.definition, self, self.bits_remaining_in_window()),
            },
            Node::AsciiBinary(t) => {
                crate::size::get_bit_size(t, self, self.bits_remaining_in_window())
            }
        }
    }

    pub fn get_byte_size(&self) -> Result<i64> {
        let bits = self.get_bit_size()?;
        if bits % 8 != 0 {
            return Err(CodaError::product(
                self.path_string(),
                format!("bit size {bits} is not a whole number of bytes"),
            ));
        }
        Ok(bits / 8)
    }

    pub fn get_string_length(&self) -> Result<i64> {
        self.get_byte_size()
    }

    // ---- scalar/raw reads ---------------------------------------------

    pub fn read_bits(&self, dst: &mut [u8], bit_offset: u64, length: u32) -> Result<()> {
        let abs_offset = self.absolute_bit_offset()? + bit_offset;
        let value = crate::bit_reader::read_bits(&self.product.bytes, abs_offset, length)?;
        let bytes = value.to_be_bytes();
        let nbytes = (length as usize).div_ceil(8);
        dst[..nbytes].copy_from_slice(&bytes[8 - nbytes..]);
        Ok(())
    }

    pub fn read_bytes(&self, dst: &mut [u8], byte_offset: u64) -> Result<()> {
        let abs_offset = self.absolute_bit_offset()? / 8 + byte_offset;
        self.product.bytes.read_at(abs_offset, dst)
    }

    pub(crate) fn absolute_bit_offset(&self) -> Result<u64> {
        match &self.top().node {
            Node::AsciiBinary(_) => {
                let offset = self.bit_offset();
                if offset < 0 {
                    return Err(CodaError::InvalidArgument(
                        "cursor has no defined bit offset".into(),
                    ));
                }
                Ok(offset as u64)
            }
            Node::Memory(mem) => match mem.content {
                MemoryContent::Data { offset, .. } => Ok(offset * 8),
                _ => Err(CodaError::InvalidArgument(
                    "cursor is not positioned on raw data".into(),
                )),
            },
        }
    }

    pub fn read_value(&self) -> Result<crate::value::NativeValue> {
        match &self.top().node {
            Node::AsciiBinary(t) => match t.format {
                Format::Ascii => crate::ascii::cursor::read_value(t, self),
                Format::Binary => crate::binary::cursor::read_value(t, self),
                _ => Err(CodaError::InvalidArgument(format!(
                    "cursor format {:?} has no direct ASCII/binary scalar read",
                    t.format
                ))),
            },
            Node::Memory(mem) => crate::memory::cursor::read_value(mem, self),
        }
    }

    /// Read every element of the array at the cursor's position, in
    /// declared C order or reindexed into Fortran order.
    ///
    /// Iterates by visiting each element and delegating to [`Cursor::read_value`];
    /// Fortran ordering is obtained by permuting the resulting element
    /// indices through [`crate::transpose::transpose`] rather than
    /// reindexing by hand.
    pub fn read_array(&self, order: ArrayOrder) -> Result<Vec<crate::value::NativeValue>> {
        let num_elements = self.get_num_elements()? as u64;
        let mut values = Vec::with_capacity(num_elements as usize);
        for i in 0..num_elements {
            let mut elem = self.clone();
            elem.goto_array_element_by_index(i)?;
            values.push(elem.read_value()?);
        }
        match order {
            ArrayOrder::C => Ok(values),
            ArrayOrder::Fortran => {
                let dims = self.array_dims()?;
                fortran_reorder(&dims, values)
            }
        }
    }

    /// Read `length` elements starting at `offset`, validating the range
    /// against the element count before reading any of them.
    pub fn read_partial_array(
        &self,
        offset: u64,
        length: u64,
    ) -> Result<Vec<crate::value::NativeValue>> {
        crate::transpose::read_partial_array(self, offset, length, |c| c.read_value())
    }
}

/// Ordering requested for a full array read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayOrder {
    C,
    Fortran,
}

/// Reorder `values` (currently in C order for `dims`) into Fortran order by
/// running the same index through [`crate::transpose::transpose`] that
/// would be applied to a raw byte buffer, rather than reshuffling `values`
/// directly: this lets the helper serve arrays of any element type,
/// including variable-length text/raw elements that have no fixed byte
/// width of their own.
fn fortran_reorder(
    dims: &[u64],
    values: Vec<crate::value::NativeValue>,
) -> Result<Vec<crate::value::NativeValue>> {
    let num_elements = values.len();
    let mut index_bytes: Vec<u8> = (0..num_elements as u32)
        .flat_map(|i| i.to_le_bytes())
        .collect();
    crate::transpose::transpose(&mut index_bytes, dims, 4)?;
    index_bytes
        .chunks_exact(4)
        .map(|chunk| {
            let idx = u32::from_le_bytes(chunk.try_into().unwrap()) as usize;
            values.get(idx).cloned().ok_or_else(|| {
                CodaError::InvalidArgument("transposed index out of range".into())
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::Product;
    use crate::types::{
        number::Endianness, Field, NumberType, RecordType, TypeBuilder,
    };

    fn simple_record_product() -> Rc<Product> {
        let a = TypeBuilder::new(
            Format::Binary,
            NativeType::Int32,
            TypeKind::Integer(NumberType::new(Endianness::Big)),
        )
        .bit_size(32)
        .build();
        let b = TypeBuilder::new(
            Format::Binary,
            NativeType::Int32,
            TypeKind::Integer(NumberType::new(Endianness::Big)),
        )
        .bit_size(32)
        .build();
        let record = TypeBuilder::new(
            Format::Binary,
            NativeType::NotAvailable,
            TypeKind::Record(RecordType::new(
                vec![Field::new("a", a), Field::new("b", b)],
                false,
            )),
        )
        .build();
        Rc::new(Product::from_buffer(
            Format::Binary,
            record,
            vec![0, 0, 0, 1, 0, 0, 0, 2],
        ))
    }

    #[test]
    fn stack_discipline_round_trips() {
        let product = simple_record_product();
        let mut cursor = Cursor::set_product(product);
        let before_depth = cursor.depth();
        cursor.goto_record_field_by_index(0).unwrap();
        cursor.goto_parent().unwrap();
        assert_eq!(cursor.depth(), before_depth);
        assert_eq!(cursor.index(), -1);
    }

    #[test]
    fn goto_parent_on_root_fails() {
        let product = simple_record_product();
        let mut cursor = Cursor::set_product(product);
        let err = cursor.goto_parent().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NoParent);
    }

    #[test]
    fn fixed_bit_size_is_position_independent() {
        let product = simple_record_product();
        let mut cursor = Cursor::set_product(product);
        cursor.goto_record_field_by_index(1).unwrap();
        assert_eq!(cursor.get_bit_size().unwrap(), 32);
    }

    fn grid_2x3_product() -> Rc<Product> {
        use crate::types::array::{ArrayType, Dimension};

        let elem = TypeBuilder::new(
            Format::Binary,
            NativeType::Int32,
            TypeKind::Integer(NumberType::new(Endianness::Big)),
        )
        .bit_size(32)
        .build();
        let array_type = TypeBuilder::new(
            Format::Binary,
            NativeType::NotAvailable,
            TypeKind::Array(ArrayType::new(elem, vec![Dimension::Fixed(2), Dimension::Fixed(3)])),
        )
        .build();
        let data: Vec<u8> = (0..6i32).flat_map(|v| v.to_be_bytes()).collect();
        Rc::new(Product::from_buffer(Format::Binary, array_type, data))
    }

    #[test]
    fn read_array_c_order_matches_declaration_order() {
        let cursor = Cursor::set_product(grid_2x3_product());
        let values = cursor.read_array(ArrayOrder::C).unwrap();
        let ints: Vec<i64> = values.iter().map(|v| v.as_i64().unwrap()).collect();
        assert_eq!(ints, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn read_array_fortran_order_matches_transpose() {
        let cursor = Cursor::set_product(grid_2x3_product());
        let values = cursor.read_array(ArrayOrder::Fortran).unwrap();
        let ints: Vec<i64> = values.iter().map(|v| v.as_i64().unwrap()).collect();
        // row-major [[0,1,2],[3,4,5]] -> column-major [0,3,1,4,2,5]
        assert_eq!(ints, vec![0, 3, 1, 4, 2, 5]);
    }

    #[test]
    fn read_partial_array_matches_full_array_slice() {
        let cursor = Cursor::set_product(grid_2x3_product());
        let full = cursor.read_array(ArrayOrder::C).unwrap();
        let partial = cursor.read_partial_array(2, 3).unwrap();
        assert_eq!(partial, full[2..5]);
    }

    #[test]
    fn read_partial_array_rejects_out_of_bounds_range() {
        let cursor = Cursor::set_product(grid_2x3_product());
        assert!(cursor.read_partial_array(4, 4).is_err());
    }
}
