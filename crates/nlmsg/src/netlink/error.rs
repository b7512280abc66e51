//! Error types for netlink encoding, decoding and transport.

use std::io;

/// Result type for netlink operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building, parsing or exchanging messages.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error from socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Kernel returned an error code.
    #[error("kernel error: {message} (errno {errno})")]
    Kernel {
        /// The errno value from the kernel (always positive).
        errno: u32,
        /// Human-readable error message.
        message: String,
    },

    /// A value does not fit the requested integer width.
    #[error("value {value} out of range for u{bits}")]
    OutOfRange {
        /// The rejected value, formatted.
        value: String,
        /// Width of the target integer in bits.
        bits: u32,
    },

    /// Attribute value too large for the 16-bit length field.
    #[error("attribute too large: {len} bytes does not fit a u16 length")]
    AttributeTooLarge {
        /// Encoded length that was requested.
        len: usize,
    },

    /// Attribute value has the wrong width for the requested getter.
    #[error("attribute width mismatch: expected {expected} bytes, got {actual}")]
    WidthMismatch {
        /// Width the getter needs.
        expected: usize,
        /// Width of the stored value.
        actual: usize,
    },

    /// Message was encoded without a payload attached.
    #[error("message has no payload attached")]
    MissingPayload,

    /// Buffer ended before a declared structure did.
    #[error("message truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Expected length.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// Invalid message format.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Invalid attribute format.
    #[error("invalid attribute: {0}")]
    InvalidAttribute(String),

    /// Sequence number mismatch.
    #[error("sequence mismatch: expected {expected}, got {actual}")]
    SequenceMismatch {
        /// Expected sequence number.
        expected: u32,
        /// Actual sequence number received.
        actual: u32,
    },

    /// Port ID mismatch.
    #[error("port id mismatch: expected {expected}, got {actual}")]
    PortIdMismatch {
        /// Expected port ID.
        expected: u32,
        /// Actual port ID received.
        actual: u32,
    },

    /// Parse error.
    #[error("parse error: {0}")]
    Parse(String),

    /// Generic netlink family not registered with the controller.
    #[error("generic netlink family not found: {name}")]
    FamilyNotFound {
        /// The family name that was looked up.
        name: String,
    },
}

impl Error {
    /// Create a kernel error from an errno value of either sign.
    pub fn from_errno(errno: i32) -> Self {
        let errno = errno.unsigned_abs();
        Self::Kernel {
            errno,
            message: super::message::error_string(errno),
        }
    }

    /// Check if this is a "not found" error (ENOENT, ENODEV, etc.).
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Kernel { errno, .. } => {
                matches!(*errno as i32, libc::ENOENT | libc::ENODEV)
            }
            Self::FamilyNotFound { .. } => true,
            _ => false,
        }
    }

    /// Check if this is a permission error (EPERM, EACCES).
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::Kernel { errno, .. } => matches!(*errno as i32, libc::EPERM | libc::EACCES),
            _ => false,
        }
    }

    /// Check if this is a "already exists" error (EEXIST).
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::Kernel { errno, .. } if *errno as i32 == libc::EEXIST)
    }

    /// Check if this is a "device busy" error (EBUSY).
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Kernel { errno, .. } if *errno as i32 == libc::EBUSY)
    }

    /// Get the errno value if this is a kernel error.
    pub fn errno(&self) -> Option<u32> {
        match self {
            Self::Kernel { errno, .. } => Some(*errno),
            _ => None,
        }
    }
}
