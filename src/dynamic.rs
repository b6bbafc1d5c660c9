//! The dynamic type layer: per-product state layered on top of
//! a static [`Type`] definition.
//!
//! ASCII and binary backends need no extra per-node state beyond the bit
//! offset already carried in a cursor frame, so they navigate the static [`Type`] graph
//! directly. Container backends materialize a tree of [`MemoryNode`]s at
//! open time: sparse record field availability, an
//! array's actual element count, an instantiated special-type base, and
//! inline `(offset, length)` windows for embedded ASCII/binary blocks.
//! Grounded on `til::struct::Struct`/`til::array::Array` for "definition
//! plus instantiated members" shape.

use std::rc::Rc;

use crate::types::Format;
use crate::types::Type;

/// A per-product instantiation of a [`Type`], used by the memory cursor
/// and produced by container backends at open time.
#[derive(Debug, Clone)]
pub struct MemoryNode {
    pub definition: Type,
    pub content: MemoryContent,
}

#[derive(Debug, Clone)]
pub enum MemoryContent {
    /// A record whose fields may be sparsely available; `None` means the
    /// field was not present in this instance.
    Record(Vec<Option<Rc<MemoryNode>>>),
    /// An array's materialized elements, possibly heterogeneous in type.
    Array(Vec<Rc<MemoryNode>>),
    /// An instantiated special type's base representation.
    Special(Rc<MemoryNode>),
    /// An inline ASCII/binary-encoded leaf: numeric/string reads delegate
    /// to the ASCII or binary cursor over this window, per the data node's
    /// declared format tag.
    Data { offset: u64, length: u64, format: Format },
}

impl MemoryNode {
    pub fn record(definition: Type, fields: Vec<Option<Rc<MemoryNode>>>) -> Rc<Self> {
        Rc::new(MemoryNode {
            definition,
            content: MemoryContent::Record(fields),
        })
    }

    pub fn array(definition: Type, elements: Vec<Rc<MemoryNode>>) -> Rc<Self> {
        Rc::new(MemoryNode {
            definition,
            content: MemoryContent::Array(elements),
        })
    }

    pub fn special(definition: Type, base: Rc<MemoryNode>) -> Rc<Self> {
        Rc::new(MemoryNode {
            definition,
            content: MemoryContent::Special(base),
        })
    }

    pub fn data(definition: Type, offset: u64, length: u64, format: Format) -> Rc<Self> {
        Rc::new(MemoryNode {
            definition,
            content: MemoryContent::Data {
                offset,
                length,
                format,
            },
        })
    }

    /// Process-wide `no_data` sentinel: what a cursor lands on when it
    /// navigates to an absent union/optional record field.
    pub fn no_data_sentinel(format: Format) -> Rc<MemoryNode> {
        use crate::types::{special::SpecialKind, NativeType, SpecialType, TypeBuilder, TypeKind};
        thread_local! {
            static SENTINELS: std::cell::RefCell<Vec<(Format, Rc<MemoryNode>)>> =
                const { std::cell::RefCell::new(Vec::new()) };
        }
        SENTINELS.with(|cell| {
            let mut cell = cell.borrow_mut();
            if let Some((_, node)) = cell.iter().find(|(f, _)| *f == format) {
                return Rc::clone(node);
            }
            let base = TypeBuilder::new(
                format,
                NativeType::NotAvailable,
                TypeKind::Raw(crate::types::RawType::new()),
            )
            .bit_size(0)
            .build();
            let definition = TypeBuilder::new(
                format,
                NativeType::NotAvailable,
                TypeKind::Special(SpecialType::new(SpecialKind::NoData, Rc::clone(&base))),
            )
            .bit_size(0)
            .build();
            let node = MemoryNode::special(
                definition,
                MemoryNode::data(base, 0, 0, format),
            );
            cell.push((format, Rc::clone(&node)));
            node
        })
    }
}
