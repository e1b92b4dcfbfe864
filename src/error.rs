use thiserror::Error;

use crate::status::Status;

/// Failure to decode bytes into a quote structure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("underflow reading {field}: need {needed} bytes, {remaining} remaining")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },
    #[error("{field} declares {declared} bytes but {actual} are available")]
    LengthMismatch {
        field: &'static str,
        declared: usize,
        actual: usize,
    },
    #[error("unsupported quote version {0}")]
    UnsupportedVersion(u16),
    #[error("unsupported tee type {0:#x}")]
    UnsupportedTeeType(u32),
}

/// A well-formed quote rejected by one of the allow-list rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("quote version {0} is not supported")]
    Version(u16),
    #[error("attestation key type {0} is not supported")]
    AttestationKeyType(u16),
    #[error("tee type {0:#x} is not supported")]
    TeeType(u32),
    #[error("qe vendor id {0} is not the Intel QE vendor id")]
    QeVendorId(String),
    #[error("quote v{version} does not support tee type {tee_type:#x}")]
    VersionTeeType { version: u16, tee_type: u32 },
    #[error("certification data type {0} is not allowed here")]
    CertificationDataType(u16),
}

/// Failure of a certificate, CRL or JSON document parser.
///
/// `Format` means the input is not the expected structure at all; `InvalidExtension` means
/// the structure is there but some value inside it is not acceptable. Entry points map the
/// two to different statuses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unsupported format: {0}")]
    Format(String),
    #[error("invalid extension: {0}")]
    InvalidExtension(String),
    #[error("{0}: {1}")]
    Status(Status, String),
}

impl ParseError {
    pub fn format(msg: impl Into<String>) -> Self {
        ParseError::Format(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        ParseError::InvalidExtension(msg.into())
    }

    /// Collapse into a status, using `format` and `invalid` for the two generic kinds.
    pub fn to_status(&self, format: Status, invalid: Status) -> Status {
        match self {
            ParseError::Format(_) => format,
            ParseError::InvalidExtension(_) => invalid,
            ParseError::Status(status, _) => *status,
        }
    }
}
