//! Error types that can be emitted from this library

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// The path passed to [`crate::read::load`] does not exist
    #[error("the expected file {path} does not exist")]
    FileNotFound {
        /// Path that was checked
        path: PathBuf,
    },

    /// The path passed to [`crate::read::load`] is not a regular file
    #[error("the expected file {path} is not a file")]
    NotAFile {
        /// Path that was checked
        path: PathBuf,
    },

    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent wrapper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// The first record of the stream is absent or does not carry the header tag
    #[error("stream does not start with a TES3 header record")]
    MalformedHeader,

    /// A length field is negative or runs past the end of its enclosing block
    #[error("corrupt length field: {0}")]
    CorruptLength(String),

    /// A string was packed into a field too small to hold it
    #[error("value of {found} bytes does not fit a {expected} byte field")]
    ValueTooLarge {
        /// Size of the value in bytes
        found: usize,
        /// Size of the target field in bytes
        expected: usize,
    },

    /// A save was attempted on a plugin with no header record
    #[error("plugin has no TES3 header record")]
    MissingHeader,

    /// A type tag was built from a string that is not exactly four bytes
    #[error("type tags are exactly four bytes: {0:?}")]
    InvalidTag(String),
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
