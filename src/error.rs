//! [`Error`] reported by [`Bucket`](crate::Bucket) operations.

use std::fmt;

/// Errors returned by mutating [`Bucket`](crate::Bucket) operations.
///
/// Every variant signals a programming error in the caller, therefore none of them is ever
/// retried internally.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    /// An argument did not satisfy the requirements of the operation.
    InvalidArgument(&'static str),
}

impl fmt::Display for Error {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument(msg) => write!(f, "illegal parameter: {msg}"),
        }
    }
}

impl std::error::Error for Error {}
