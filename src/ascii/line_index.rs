//! The ASCII line-offset index. Built
//! lazily with one scan of the product buffer; the detected end-of-line
//! convention is committed on first occurrence and any subsequent
//! occurrence of a different convention is rejected as a `product` error.

use crate::error::{CodaError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum EolConvention {
    Lf,
    Cr,
    CrLf,
}

impl EolConvention {
    pub fn width(self) -> u64 {
        match self {
            EolConvention::Lf | EolConvention::Cr => 1,
            EolConvention::CrLf => 2,
        }
    }
}

/// Ascending array of line-end byte offsets (the offset just past the EOL
/// sequence, i.e. the start of the next line), plus whether the last line
/// is unterminated.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// `line_ends[i]` is the byte offset immediately following line i's EOL
    /// sequence (or, for the last entry when `last_line_unterminated`, the
    /// file size).
    line_ends: Vec<u64>,
    convention: Option<EolConvention>,
    last_line_unterminated: bool,
}

impl LineIndex {
    /// Scan `data` once, building the line index and committing the EOL
    /// convention on first sight.
    pub fn build(data: &[u8]) -> Result<Self> {
        let mut line_ends = Vec::new();
        let mut convention: Option<EolConvention> = None;
        let mut i = 0usize;
        let mut line_start = 0usize;
        while i < data.len() {
            match data[i] {
                b'\n' => {
                    Self::commit(&mut convention, EolConvention::Lf)?;
                    line_ends.push((i + 1) as u64);
                    i += 1;
                    line_start = i;
                }
                b'\r' => {
                    if data.get(i + 1) == Some(&b'\n') {
                        Self::commit(&mut convention, EolConvention::CrLf)?;
                        line_ends.push((i + 2) as u64);
                        i += 2;
                    } else {
                        Self::commit(&mut convention, EolConvention::Cr)?;
                        line_ends.push((i + 1) as u64);
                        i += 1;
                    }
                    line_start = i;
                }
                _ => i += 1,
            }
        }
        let last_line_unterminated = line_start < data.len();
        if last_line_unterminated {
            line_ends.push(data.len() as u64);
        }
        Ok(LineIndex {
            line_ends,
            convention,
            last_line_unterminated,
        })
    }

    fn commit(slot: &mut Option<EolConvention>, found: EolConvention) -> Result<()> {
        match slot {
            None => {
                *slot = Some(found);
                Ok(())
            }
            Some(existing) if *existing == found => Ok(()),
            Some(existing) => Err(CodaError::product(
                "",
                format!(
                    "inconsistent end-of-line convention: product started with {existing:?}, \
                     found {found:?}"
                ),
            )),
        }
    }

    pub fn convention(&self) -> Option<EolConvention> {
        self.convention
    }

    pub fn num_lines(&self) -> usize {
        self.line_ends.len()
    }

    /// Binary search for the smallest recorded line end strictly greater
    /// than `offset`. Returns `(line_end, is_last_unterminated)`.
    pub fn line_end_after(&self, offset: u64) -> Option<(u64, bool)> {
        let idx = self.line_ends.partition_point(|&end| end <= offset);
        let end = *self.line_ends.get(idx)?;
        let is_last = idx == self.line_ends.len() - 1 && self.last_line_unterminated;
        Some((end, is_last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_eol_conventions_rejected() {
        let data = b"first line\r\nsecond line\nthird";
        let err = LineIndex::build(data).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Product);
    }

    #[test]
    fn consistent_lf_builds_index() {
        let data = b"aaa\nbbbb\ncc";
        let idx = LineIndex::build(data).unwrap();
        assert_eq!(idx.convention(), Some(EolConvention::Lf));
        assert_eq!(idx.num_lines(), 3);
        let (end, unterminated) = idx.line_end_after(0).unwrap();
        assert_eq!(end, 4);
        assert!(!unterminated);
        let (end, unterminated) = idx.line_end_after(9).unwrap();
        assert_eq!(end, 11);
        assert!(unterminated);
    }

    #[test]
    fn lookup_returns_smallest_end_greater_than_offset() {
        let data = b"ab\ncd\nef";
        let idx = LineIndex::build(data).unwrap();
        for offset in 0..data.len() as u64 {
            let (end, _) = idx.line_end_after(offset).unwrap();
            assert!(end > offset);
        }
    }
}
