//! Error taxonomy and thread-local error shim.
//!
//! Grounded on `apfs-core::error` (a `thiserror`-derived error enum per
//! subsystem) and on `coda-errno.c`'s "set error / format message / query"
//! convention, which is preserved here only as a compatibility shim: all
//! internal code threads [`Result`] normally.

use std::cell::RefCell;
use std::fmt;

/// Fieldless view of [`CodaError`], for callers that want to `match` on the
/// taxonomy without destructuring the data-carrying variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    OutOfMemory,
    FileNotFound,
    FileOpen,
    FileRead,
    FileWrite,
    InvalidArgument,
    InvalidIndex,
    InvalidName,
    InvalidFormat,
    InvalidDatetime,
    InvalidType,
    ArrayNumDimsMismatch,
    ArrayOutOfBounds,
    NoParent,
    UnsupportedProduct,
    Product,
    OutOfBoundsRead,
    DataDefinition,
    Expression,
    Hdf4,
    Hdf5,
    Xml,
    NoHdf4Support,
    NoHdf5Support,
}

/// The core error type. One variant per row of the error taxonomy table.
///
/// Each variant carries whatever data is needed to format the default
/// message; callers that need a custom message can attach one with
/// [`CodaError::with_message`].
#[derive(Debug, thiserror::Error)]
pub enum CodaError {
    #[error("out of memory")]
    OutOfMemory,

    #[error("file not found: {path}")]
    FileNotFound { path: String },
    #[error("could not open file {path}: {source}")]
    FileOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not read data from file: {0}")]
    FileRead(#[source] std::io::Error),
    #[error("could not write data to file: {0}")]
    FileWrite(#[source] std::io::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid index argument: {index} (num elements: {num_elements})")]
    InvalidIndex { index: i64, num_elements: i64 },
    #[error("invalid name argument: {name}")]
    InvalidName { name: String },
    #[error("invalid format ({path}): {message}")]
    InvalidFormat { path: String, message: String },
    #[error("invalid date/time argument: {0}")]
    InvalidDatetime(String),
    #[error("invalid type: {0}")]
    InvalidType(String),

    #[error("incorrect number of dimensions argument: expected {expected}, got {got}")]
    ArrayNumDimsMismatch { expected: u8, got: u8 },
    #[error("array index {index} out of bounds for dimension {dim} of size {size}")]
    ArrayOutOfBounds { dim: u8, index: i64, size: i64 },

    #[error("cursor has no parent")]
    NoParent,

    #[error("unsupported product file: {0}")]
    UnsupportedProduct(String),

    #[error("product error ({path}): {message}")]
    Product { path: String, message: String },

    #[error("out of bounds read at offset {offset} length {length} (bound {bound})")]
    OutOfBoundsRead {
        offset: u64,
        length: u64,
        bound: u64,
    },

    #[error("data definition error: {0}")]
    DataDefinition(String),

    #[error("expression error ({path}): {message}")]
    Expression { path: String, message: String },

    #[error("an error occurred in the HDF4 library: {0}")]
    Hdf4(#[source] anyhow::Error),
    #[error("an error occurred in the HDF5 library: {0}")]
    Hdf5(#[source] anyhow::Error),
    #[error("an error occurred while parsing an XML data block: {0}")]
    Xml(#[source] anyhow::Error),
    #[error("no HDF4 support built into this build")]
    NoHdf4Support,
    #[error("no HDF5 support built into this build")]
    NoHdf5Support,

    /// A taxonomy variant with its default message overridden by the
    /// caller, preserving [`ErrorKind`] classification. Mirrors
    /// `coda_set_error(code, "custom message")` in the source.
    #[error("{message}")]
    WithMessage {
        kind: ErrorKind,
        message: String,
        #[source]
        source: Option<Box<CodaError>>,
    },
}

impl CodaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CodaError::OutOfMemory => ErrorKind::OutOfMemory,
            CodaError::FileNotFound { .. } => ErrorKind::FileNotFound,
            CodaError::FileOpen { .. } => ErrorKind::FileOpen,
            CodaError::FileRead(_) => ErrorKind::FileRead,
            CodaError::FileWrite(_) => ErrorKind::FileWrite,
            CodaError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            CodaError::InvalidIndex { .. } => ErrorKind::InvalidIndex,
            CodaError::InvalidName { .. } => ErrorKind::InvalidName,
            CodaError::InvalidFormat { .. } => ErrorKind::InvalidFormat,
            CodaError::InvalidDatetime(_) => ErrorKind::InvalidDatetime,
            CodaError::InvalidType(_) => ErrorKind::InvalidType,
            CodaError::ArrayNumDimsMismatch { .. } => ErrorKind::ArrayNumDimsMismatch,
            CodaError::ArrayOutOfBounds { .. } => ErrorKind::ArrayOutOfBounds,
            CodaError::NoParent => ErrorKind::NoParent,
            CodaError::UnsupportedProduct(_) => ErrorKind::UnsupportedProduct,
            CodaError::Product { .. } => ErrorKind::Product,
            CodaError::OutOfBoundsRead { .. } => ErrorKind::OutOfBoundsRead,
            CodaError::DataDefinition(_) => ErrorKind::DataDefinition,
            CodaError::Expression { .. } => ErrorKind::Expression,
            CodaError::Hdf4(_) => ErrorKind::Hdf4,
            CodaError::Hdf5(_) => ErrorKind::Hdf5,
            CodaError::Xml(_) => ErrorKind::Xml,
            CodaError::NoHdf4Support => ErrorKind::NoHdf4Support,
            CodaError::NoHdf5Support => ErrorKind::NoHdf5Support,
            CodaError::WithMessage { kind, .. } => *kind,
        }
    }

    /// Override this error's message, keeping its [`ErrorKind`]. Mirrors
    /// `coda_set_error` being called with a caller-supplied format string.
    pub fn with_message(self, message: impl Into<String>) -> Self {
        let kind = self.kind();
        CodaError::WithMessage {
            kind,
            message: message.into(),
            source: Some(Box::new(self)),
        }
    }

    pub(crate) fn product(path: impl Into<String>, message: impl Into<String>) -> Self {
        CodaError::Product {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_format(path: impl Into<String>, message: impl Into<String>) -> Self {
        CodaError::InvalidFormat {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn expression(path: impl Into<String>, message: impl Into<String>) -> Self {
        CodaError::Expression {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CodaError>;

thread_local! {
    static LAST_ERROR: RefCell<Option<(ErrorKind, String)>> = const { RefCell::new(None) };
}

/// Record `err` as the thread's last error, for the `coda_errno`-style
/// compatibility shim, and hand it back unchanged so this can wrap a `?`
/// expression at a public entry point boundary. Internal code should just
/// propagate `Result` without calling this.
pub fn set_last_error(err: CodaError) -> CodaError {
    LAST_ERROR.with(|cell| {
        *cell.borrow_mut() = Some((err.kind(), err.to_string()));
    });
    err
}

/// The current thread's last recorded error kind, or `None` if no fallible
/// core operation has failed yet on this thread.
pub fn coda_errno() -> Option<ErrorKind> {
    LAST_ERROR.with(|cell| cell.borrow().as_ref().map(|(kind, _)| *kind))
}

/// Format the current thread's last error: the custom message if one was
/// attached via [`CodaError::with_message`], otherwise the default message
/// for the code.
pub fn coda_errno_to_string() -> String {
    LAST_ERROR.with(|cell| match cell.borrow().as_ref() {
        Some((_, message)) => message.clone(),
        None => "no error".to_string(),
    })
}

/// Walk a cursor-like path writer, appending each navigation step (field
/// name, array index, `.attributes`) through `f`. Used to annotate
/// [`CodaError::Expression`]/[`CodaError::Product`] messages with the
/// cursor path active when the failure occurred.
pub fn append_path<W: fmt::Write>(
    steps: impl IntoIterator<Item = PathStep>,
    out: &mut W,
) -> fmt::Result {
    for step in steps {
        match step {
            PathStep::Field(name) => write!(out, "/{name}")?,
            PathStep::Index(i) => write!(out, "[{i}]")?,
            PathStep::Attributes => write!(out, ".attributes")?,
        }
    }
    Ok(())
}

/// One step of a cursor path, as rendered by [`append_path`].
#[derive(Debug, Clone)]
pub enum PathStep {
    Field(String),
    Index(i64),
    Attributes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_roundtrips_through_with_message() {
        let err = CodaError::NoParent.with_message("ascended above the document root");
        assert_eq!(err.kind(), ErrorKind::NoParent);
        assert_eq!(err.to_string(), "ascended above the document root");
    }

    #[test]
    fn append_path_renders_steps() {
        let steps = vec![
            PathStep::Field("header".into()),
            PathStep::Field("records".into()),
            PathStep::Index(3),
            PathStep::Attributes,
        ];
        let mut s = String::new();
        append_path(steps, &mut s).unwrap();
        assert_eq!(s, "/header/records[3].attributes");
    }
}
