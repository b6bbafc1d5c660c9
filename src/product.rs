//! A product: the open file/buffer plus its resolved root type. Grounded on `idb_rs`'s `IDBFormats`/section-open dance in `lib.rs`
//! (open, pick a variant, keep the backing reader alive for the handle's
//! lifetime), generalized over CODA's backend tag.

use std::path::Path;
use std::sync::OnceLock;

use crate::bytes_source::BytesSource;
use crate::cursor::Node;
use crate::error::Result;
use crate::types::{Format, Type};

/// External collaborator result: what product recognition hands
/// back to `Product::open`. The catalog itself (mapping a file to a
/// product class/type/version) is out of core scope; the core only
/// consumes the result once per open. For ASCII/binary products `root` is
/// `Node::AsciiBinary`; container backends hand back a
/// `Node::Memory` tree materialized at open time.
pub struct RecognizedProduct {
    pub format: Format,
    pub class: Option<String>,
    pub product_type: Option<String>,
    pub version: Option<i32>,
    pub root: Node,
}

/// An open product: filename, size, format, root node, backing bytes, and
/// (for ASCII) a lazily built line index.
pub struct Product {
    pub filename: Option<String>,
    pub format: Format,
    pub root: Node,
    pub bytes: BytesSource,
    line_index: OnceLock<Result<crate::ascii::LineIndex>>,
}

impl Product {
    /// Open a product backed by a file on disk. `recognized` is supplied by
    /// the external recognition collaborator; this function only
    /// wires up the bytes source, applying the `use_mmap` toggle.
    pub fn open(path: &Path, recognized: RecognizedProduct) -> Result<Self> {
        let mut bytes = BytesSource::open_file(path)?;
        if !crate::config::use_mmap() {
            bytes = bytes.into_slurped()?;
        }
        Ok(Product {
            filename: Some(path.display().to_string()),
            format: recognized.format,
            root: recognized.root,
            bytes,
            line_index: OnceLock::new(),
        })
    }

    /// Wrap an in-memory buffer as an ASCII/binary product (used heavily by
    /// tests and by container backends for attribute/inline data windows).
    pub fn from_buffer(format: Format, root: Type, data: Vec<u8>) -> Self {
        Product {
            filename: None,
            format,
            root: Node::AsciiBinary(root),
            bytes: BytesSource::from_buffer(data),
            line_index: OnceLock::new(),
        }
    }

    /// Wrap a materialized memory tree as a container-backed product (used
    /// by container backends and their tests).
    pub fn from_memory_root(format: Format, root: std::rc::Rc<crate::dynamic::MemoryNode>) -> Self {
        Product {
            filename: None,
            format,
            root: Node::Memory(root),
            bytes: BytesSource::from_buffer(Vec::new()),
            line_index: OnceLock::new(),
        }
    }

    /// Wrap a materialized memory tree backed by real file/buffer bytes
    ///. Used by container backend
    /// implementations (e.g. [`crate::netcdf`]) that parse a header up
    /// front but leave the bulk data in place.
    pub fn container(
        format: Format,
        root: std::rc::Rc<crate::dynamic::MemoryNode>,
        bytes: BytesSource,
        filename: Option<String>,
    ) -> Self {
        Product {
            filename,
            format,
            root: Node::Memory(root),
            bytes,
            line_index: OnceLock::new(),
        }
    }

    pub fn file_size(&self) -> u64 {
        self.bytes.len()
    }

    /// Lazily build (once) and return the ASCII line index for this
    /// product's buffer. Guarded by a once-init primitive; subsequent calls
    /// observe the committed state without locking.
    pub fn line_index(&self) -> Result<&crate::ascii::LineIndex> {
        let result = self.line_index.get_or_init(|| {
            let data = self
                .bytes
                .as_slice()
                .map(|s| s.to_vec())
                .unwrap_or_else(|| self.bytes.read_vec_at(0, self.bytes.len() as usize).unwrap_or_default());
            log::debug!("building ASCII line index ({} bytes)", data.len());
            let index = crate::ascii::LineIndex::build(&data);
            if let Ok(idx) = &index {
                log::debug!("committed end-of-line convention: {:?}", idx.convention());
            }
            index
        });
        match result {
            Ok(idx) => Ok(idx),
            Err(e) => Err(clone_for_cache(e)),
        }
    }
}

/// [`crate::error::CodaError`] doesn't implement `Clone` (it wraps
/// `std::io::Error`/`anyhow::Error`), so a cached `Result` is re-rendered
/// into a fresh, message-equivalent error on each access after the first.
fn clone_for_cache(e: &crate::error::CodaError) -> crate::error::CodaError {
    e.to_string().into()
}

impl From<String> for crate::error::CodaError {
    fn from(message: String) -> Self {
        crate::error::CodaError::Product {
            path: String::new(),
            message,
        }
    }
}
