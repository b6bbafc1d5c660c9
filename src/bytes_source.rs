//! Uniform random-access byte reader over a file handle or an in-memory
//! buffer. Grounded on `ida_reader.rs`'s `Read + Seek` cursor
//! discipline, generalized so the bound check is explicit rather than left
//! to `std::io::Read::read_exact`'s implicit EOF error.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Mutex;

use crate::error::{CodaError, Result};

/// A backend for [`BytesSource`]. Either a slice into a mapped/allocated
/// buffer, or positioned file I/O behind a mutex (reads are logically
/// random-access but `File` needs `&mut self` to seek).
enum Backing {
    Buffer(Vec<u8>),
    File(Mutex<File>),
}

/// Uniform random-access byte window. For pure ASCII/binary products the
/// file size is the authoritative upper bound; for in-memory slices
/// (attributes, inline blocks inside container formats) the bound is the
/// slice length.
pub struct BytesSource {
    backing: Backing,
    len: u64,
}

impl BytesSource {
    pub fn from_buffer(data: Vec<u8>) -> Self {
        let len = data.len() as u64;
        BytesSource {
            backing: Backing::Buffer(data),
            len,
        }
    }

    pub fn open_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CodaError::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                CodaError::FileOpen {
                    path: path.display().to_string(),
                    source: e,
                }
            }
        })?;
        let len = file
            .metadata()
            .map_err(CodaError::FileRead)?
            .len();
        Ok(BytesSource {
            backing: Backing::File(Mutex::new(file)),
            len,
        })
    }

    /// Slurp an open file's contents into a heap buffer, consuming `self`.
    /// Used when `use_mmap` is false (see [`crate::config`]).
    pub fn into_slurped(self) -> Result<Self> {
        match self.backing {
            Backing::Buffer(_) => Ok(self),
            Backing::File(file) => {
                let mut file = file.into_inner().unwrap();
                file.seek(SeekFrom::Start(0)).map_err(CodaError::FileRead)?;
                let mut data = Vec::with_capacity(self.len as usize);
                file.read_to_end(&mut data).map_err(CodaError::FileRead)?;
                Ok(BytesSource::from_buffer(data))
            }
        }
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read `dst.len()` bytes starting at `offset`. Never reads past the
    /// source's declared bound: returns [`CodaError::OutOfBoundsRead`]
    /// rather than a short read.
    pub fn read_at(&self, offset: u64, dst: &mut [u8]) -> Result<()> {
        let length = dst.len() as u64;
        let end = offset
            .checked_add(length)
            .ok_or_else(|| self.out_of_bounds(offset, length))?;
        if end > self.len {
            return Err(self.out_of_bounds(offset, length));
        }
        match &self.backing {
            Backing::Buffer(buf) => {
                dst.copy_from_slice(&buf[offset as usize..end as usize]);
                Ok(())
            }
            Backing::File(file) => {
                let mut file = file.lock().unwrap();
                file.seek(SeekFrom::Start(offset))
                    .map_err(CodaError::FileRead)?;
                file.read_exact(dst).map_err(CodaError::FileRead)
            }
        }
    }

    /// Read `length` bytes starting at `offset` into a freshly allocated
    /// `Vec`. Convenience wrapper over [`BytesSource::read_at`].
    pub fn read_vec_at(&self, offset: u64, length: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; length];
        self.read_at(offset, &mut buf)?;
        Ok(buf)
    }

    /// Borrow a slice directly when this source is heap-backed; container
    /// backends use this to avoid a copy when slicing attribute data.
    pub fn as_slice(&self) -> Option<&[u8]> {
        match &self.backing {
            Backing::Buffer(buf) => Some(buf),
            Backing::File(_) => None,
        }
    }

    fn out_of_bounds(&self, offset: u64, length: u64) -> CodaError {
        CodaError::OutOfBoundsRead {
            offset,
            length,
            bound: self.len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_within_bound_succeed() {
        let src = BytesSource::from_buffer(vec![1, 2, 3, 4, 5]);
        let mut buf = [0u8; 3];
        src.read_at(1, &mut buf).unwrap();
        assert_eq!(buf, [2, 3, 4]);
    }

    #[test]
    fn reads_past_bound_are_rejected() {
        let src = BytesSource::from_buffer(vec![1, 2, 3]);
        let mut buf = [0u8; 2];
        let err = src.read_at(2, &mut buf).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::OutOfBoundsRead);
    }

    #[test]
    fn offset_overflow_is_rejected_not_panicking() {
        let src = BytesSource::from_buffer(vec![1, 2, 3]);
        let mut buf = [0u8; 2];
        assert!(src.read_at(u64::MAX - 1, &mut buf).is_err());
    }
}
