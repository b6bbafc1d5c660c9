//! ASCII backend: variable-length number parsing, value-to-code mappings,
//! the line-offset index, and the ASCII cursor's size-resolution algorithm.

pub mod cursor;
pub mod line_index;
pub mod number_parser;

pub use line_index::{EolConvention, LineIndex};
pub use number_parser::{parse_double, parse_signed_integer, parse_unsigned_integer};

/// Maximum bytes read into the stack buffer when resolving a variable
/// number's size.
pub const MAX_ASCII_NUMBER_LENGTH: usize = 64;
