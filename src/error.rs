//! Resolution error registry
//!
//! Every failure the pipeline can produce, with a stable code, the process
//! exit code the CLI uses and the terminal state the resolver ends in.

use std::fmt;
use std::io;

use crate::resolver::ResolutionState;

/// Stable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Required layer could not be read
    SourceUnavailable,
    /// Layer content is malformed
    ParseError,
    /// One or more schema violations
    ValidationFailed,
    /// Release signing requested but a secret is absent
    MissingSecret,
    /// Schema definition could not be loaded
    InvalidSchema,
    /// Unexpected I/O failure
    IoError,
    /// Descriptor could not be serialized
    SerializeError,
}

impl ErrorCode {
    /// Returns the string representation of the error code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::SourceUnavailable => "SOURCE_UNAVAILABLE",
            ErrorCode::ParseError => "PARSE_ERROR",
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::MissingSecret => "MISSING_SECRET",
            ErrorCode::InvalidSchema => "INVALID_SCHEMA",
            ErrorCode::IoError => "IO_ERROR",
            ErrorCode::SerializeError => "SERIALIZE_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single schema violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub key: String,
    pub reason: String,
}

impl Violation {
    pub fn new(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.reason)
    }
}

/// Resolution error type
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Required layer unavailable: {locator}")]
    SourceUnavailable { locator: String },

    #[error("Parse error in {location} at line {line}: {message}")]
    Parse {
        location: String,
        line: usize,
        message: String,
    },

    #[error("Validation failed with {} violation(s): {}", .0.len(), join_violations(.0))]
    Validation(Vec<Violation>),

    #[error("Missing secret: {key}")]
    MissingSecret { key: String },

    #[error("Invalid schema: {0}")]
    Schema(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Canonicalization error: {0}")]
    Canonical(String),
}

impl ResolveError {
    /// Returns the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            ResolveError::SourceUnavailable { .. } => ErrorCode::SourceUnavailable,
            ResolveError::Parse { .. } => ErrorCode::ParseError,
            ResolveError::Validation(_) => ErrorCode::ValidationFailed,
            ResolveError::MissingSecret { .. } => ErrorCode::MissingSecret,
            ResolveError::Schema(_) => ErrorCode::InvalidSchema,
            ResolveError::Io(_) => ErrorCode::IoError,
            ResolveError::Serialize(_) | ResolveError::Canonical(_) => ErrorCode::SerializeError,
        }
    }

    /// Process exit code: 2 validation, 3 missing secret, 1 everything else
    pub fn exit_code(&self) -> i32 {
        match self {
            ResolveError::Validation(_) => 2,
            ResolveError::MissingSecret { .. } => 3,
            _ => 1,
        }
    }

    /// Terminal resolver state this error leads to
    pub fn failure_state(&self) -> ResolutionState {
        match self {
            ResolveError::Validation(_) => ResolutionState::FailedValidation,
            ResolveError::MissingSecret { .. } => ResolutionState::FailedSigning,
            _ => ResolutionState::FailedLoad,
        }
    }

    /// Violations carried by a validation failure (empty otherwise)
    pub fn violations(&self) -> &[Violation] {
        match self {
            ResolveError::Validation(v) => v,
            _ => &[],
        }
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
