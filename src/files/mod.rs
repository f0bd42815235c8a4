//! Feature-file readers and writers.
//!
//! Three on-disk formats load into a [`Dataset`](crate::dataset::Dataset):
//! packed little-endian binary (dense or sparse), whitespace-separated
//! ASCII (dense rows, possibly ragged), and SVMlight-like sparse-index
//! text. Parsing is strict: a malformed or truncated record is an error,
//! never a skipped row.

mod ascii;
mod binary;
mod svmlight;

pub use ascii::read_ascii_file;
pub use binary::{read_binary_file, write_binary_file};
pub use svmlight::read_svmlight_file;

use std::fmt::{self, Display};
use std::io;

pub type Result<T> = std::result::Result<T, DataError>;

/// Failures while reading or writing feature files.
#[derive(Debug)]
pub enum DataError {
    Io(io::Error),
    /// Unrecognized binary header byte.
    BadHeader(u8),
    /// EOF inside a binary record.
    Truncated { what: &'static str },
    /// Label token is missing or not in the accepted set.
    BadLabel { line: usize, got: String },
    /// Malformed numeric or `index:value` token.
    BadToken { line: usize, got: String },
    /// A line's namespace token differs from the first one seen.
    NamespaceMismatch {
        line: usize,
        expected: String,
        got: String,
    },
}

impl Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataError::Io(e) => write!(f, "io error: {e}"),
            DataError::BadHeader(b) => write!(f, "bad feature-file header byte {b:#04x}"),
            DataError::Truncated { what } => write!(f, "truncated record: could not read {what}"),
            DataError::BadLabel { line, got } => {
                write!(f, "bad label at line {line}: got {got:?}")
            }
            DataError::BadToken { line, got } => {
                write!(f, "bad feature token at line {line}: got {got:?}")
            }
            DataError::NamespaceMismatch {
                line,
                expected,
                got,
            } => write!(
                f,
                "namespace mismatch at line {line}: expected {expected:?}, got {got:?}"
            ),
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for DataError {
    fn from(e: io::Error) -> Self {
        DataError::Io(e)
    }
}
