//! Memory backend: navigation over a materialized [`crate::dynamic::MemoryNode`]
//! tree, delegating scalar reads to the ASCII/binary backend over each
//! data node's inline window.

pub mod cursor;
