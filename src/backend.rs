//! The container backend protocol: the seam between the core and
//! external-format collaborators (HDF4, HDF5, netCDF, and anything else
//! that is not plain ASCII/binary governed solely by a declared type
//! graph). The core's cursor dispatches on the backend tag stored in each
//! frame's node ([`crate::cursor::Node`]); a backend's only job is to
//! produce that tag once at open time and otherwise stay out of the way.
//!
//! Grounded on [`crate::netcdf`], the one backend the core ships: it
//! parses a header up front, builds a [`crate::dynamic::MemoryNode`] tree
//! for structure/metadata, and leaves bulk array data addressed by
//! `(offset, length)` windows into the product's own bytes so the ordinary
//! ASCII/binary scalar-read path does the actual decoding. This trait
//! exists so a future HDF4/HDF5 backend can plug into the same seam
//! without the core caring how it gets there.

use std::path::Path;
use std::rc::Rc;

use crate::bytes_source::BytesSource;
use crate::dynamic::MemoryNode;
use crate::error::Result;
use crate::types::Format;

/// What a backend hands back after opening a file: the format tag, the
/// materialized root node, and the bytes the node's `Data` windows are
/// offsets into.
pub struct OpenedContainer {
    pub format: Format,
    pub root: Rc<MemoryNode>,
    pub bytes: BytesSource,
}

/// One external collaborator, one per non-ASCII/binary format.
/// A backend parses just enough of a file to build the type/instance graph
/// for navigation; it does not need to expose anything beyond `open` to
/// the core, since every subsequent read goes through the ordinary cursor
/// operations (§4.10) against the materialized tree and shared bytes.
pub trait ContainerBackend {
    /// The format tag this backend produces (used for dispatch and for
    /// matching against `RecognizedProduct::format` when a catalog already
    /// identified the file).
    fn format(&self) -> Format;

    /// Recognize whether `data`'s leading bytes look like this backend's
    /// format, without doing a full parse. Used by [`open_path`] to pick a
    /// backend when no external recognition result is available.
    fn recognize(&self, leading_bytes: &[u8]) -> bool;

    /// Parse `path` and materialize its root node plus backing bytes.
    fn open(&self, path: &Path) -> Result<OpenedContainer>;

    /// Parse an in-memory buffer the same way (tests, and products that
    /// were already read off disk by the caller).
    fn open_buffer(&self, data: Vec<u8>) -> Result<OpenedContainer>;
}

/// The netCDF classic backend, wrapping [`crate::netcdf`]
/// behind the [`ContainerBackend`] seam.
pub struct NetCdfBackend;

impl ContainerBackend for NetCdfBackend {
    fn format(&self) -> Format {
        Format::NetCdf
    }

    fn recognize(&self, leading_bytes: &[u8]) -> bool {
        leading_bytes.len() >= 4 && &leading_bytes[..3] == b"CDF" && matches!(leading_bytes[3], 1 | 2)
    }

    fn open(&self, path: &Path) -> Result<OpenedContainer> {
        let product = crate::netcdf::open(path)?;
        Ok(OpenedContainer {
            format: product.format,
            root: match product.root {
                crate::cursor::Node::Memory(root) => root,
                crate::cursor::Node::AsciiBinary(_) => {
                    unreachable!("netcdf::open always produces a Memory node")
                }
            },
            bytes: product.bytes,
        })
    }

    fn open_buffer(&self, data: Vec<u8>) -> Result<OpenedContainer> {
        let product = crate::netcdf::open_buffer(data)?;
        Ok(OpenedContainer {
            format: product.format,
            root: match product.root {
                crate::cursor::Node::Memory(root) => root,
                crate::cursor::Node::AsciiBinary(_) => {
                    unreachable!("netcdf::open_buffer always produces a Memory node")
                }
            },
            bytes: product.bytes,
        })
    }
}

/// The registry of backends the core ships with. A full product-open path
/// (the recognition catalog itself is an external collaborator, out of
/// scope here) would consult something like this to pick a backend when no
/// external recognition result is supplied.
pub fn builtin_backends() -> Vec<Box<dyn ContainerBackend>> {
    vec![Box::new(NetCdfBackend)]
}

/// Try each builtin backend's [`ContainerBackend::recognize`] against a
/// buffer's leading bytes and open with the first match.
pub fn open_buffer_autodetect(data: Vec<u8>) -> Result<Option<OpenedContainer>> {
    for backend in builtin_backends() {
        if backend.recognize(&data) {
            return backend.open_buffer(data).map(Some);
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn netcdf_backend_recognizes_v1_and_v2_magic() {
        let backend = NetCdfBackend;
        assert!(backend.recognize(b"CDF\x01"));
        assert!(backend.recognize(b"CDF\x02"));
        assert!(!backend.recognize(b"CDF\x03"));
        assert!(!backend.recognize(b"HDF\x01"));
        assert!(!backend.recognize(b"CD"));
    }

    #[test]
    fn autodetect_returns_none_for_unrecognized_bytes() {
        let result = open_buffer_autodetect(vec![0u8; 16]).unwrap();
        assert!(result.is_none());
    }
}
