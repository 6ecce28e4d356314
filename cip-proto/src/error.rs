//! Defines the error type and status-code table used throughout this crate.

use std::io;
use thiserror::Error;

/// A CIP-layer error, carrying a diagnostic status code alongside a human-readable message.
///
/// Every failure produced by this crate uses this single type rather than an open-ended
/// hierarchy, since the status codes below are the only thing a caller needs to branch on; the
/// message is for humans.
#[derive(Debug, Clone, Error)]
#[error("{message} (status {code})")]
pub struct DataError {
    pub message: String,
    pub code: u8,
}

impl DataError {
    /// Value does not fit the declared CIP type.
    pub const ENCODING: u8 = 0;
    /// Unknown CIP general status in a fragment/template reply.
    pub const UNKNOWN_STATUS: u8 = 1;
    /// Fragment parse failure with extended status.
    pub const FRAGMENT: u8 = 2;
    /// Encapsulation or CIP status other than SUCCESS/0x06.
    pub const STATUS: u8 = 3;
    /// Read failure (connection setup, bad request path).
    pub const READ: u8 = 6;
    /// Array read failure.
    pub const ARRAY_READ: u8 = 7;
    /// Write failure.
    pub const WRITE: u8 = 8;
    /// Array write failure.
    pub const ARRAY_WRITE: u8 = 9;
    /// Tag-list retrieval failure.
    pub const TAG_LIST: u8 = 10;

    pub fn new<S: Into<String>>(code: u8, message: S) -> Self {
        Self { message: message.into(), code }
    }
}

impl From<io::Error> for DataError {
    fn from(err: io::Error) -> Self {
        DataError::new(DataError::READ, err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
