//! Error types for `framekit`.
//!
//! This module provides a unified error type for all wrapper operations.
//! Error codes follow the pattern `FRAME-XXX` for easy debugging.

use thiserror::Error;

/// Result type alias for `framekit` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in `framekit` operations.
///
/// Each variant includes a descriptive error message suitable for end-users.
#[derive(Error, Debug)]
pub enum Error {
    /// Attribute/column resolution failure (FRAME-001).
    ///
    /// The name resolved neither locally, nor as a column, nor on the host value.
    #[error("[FRAME-001] No such attribute or column '{0}'")]
    NameNotFound(String),

    /// Reserved metadata key conflict (FRAME-002).
    ///
    /// Metadata keys must not collide with the host value type's reserved
    /// constructor-parameter names.
    #[error("[FRAME-002] Metadata key '{0}' collides with a reserved host constructor parameter")]
    ReservedKey(String),

    /// Default boxer misbehaved (FRAME-003).
    ///
    /// Surfaced at first use of a configured default boxer that fails or
    /// produces an invalid wrap.
    #[error("[FRAME-003] Default boxer failed for column '{column}': {message}")]
    BoxerConfiguration {
        /// Column being boxed when the rule failed.
        column: String,
        /// Failure description.
        message: String,
    },

    /// Unsupported snapshot schema version (FRAME-004).
    #[error("[FRAME-004] Unsupported snapshot schema version {0}")]
    SchemaVersion(u32),

    /// A typed column read found a different derived class (FRAME-005).
    #[error("[FRAME-005] '{name}' holds class '{actual}', not '{requested}'")]
    ClassMismatch {
        /// Column or snapshot name.
        name: String,
        /// Class requested by the caller.
        requested: &'static str,
        /// Class actually stored.
        actual: String,
    },

    /// Snapshot restore met an unregistered series class (FRAME-006).
    #[error("[FRAME-006] No registered series class named '{0}'")]
    UnknownClass(String),

    /// Buffer/column length mismatch (FRAME-007).
    #[error("[FRAME-007] Length mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Fused-expression error (FRAME-008).
    ///
    /// Wraps expression parse errors and evaluation shape errors.
    #[error("[FRAME-008] Expression error: {0}")]
    Eval(String),

    /// Serialization error (FRAME-009).
    #[error("[FRAME-009] Serialization error: {0}")]
    Serialization(String),

    /// IO error (FRAME-010).
    #[error("[FRAME-010] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A host field write received a value of the wrong shape (FRAME-011).
    #[error("[FRAME-011] Invalid value for host field '{field}': expected {expected}")]
    InvalidFieldValue {
        /// Host field name.
        field: String,
        /// Expected value shape.
        expected: &'static str,
    },

    /// Operation rejected with invalid arguments (FRAME-012).
    #[error("[FRAME-012] Invalid operation: {0}")]
    InvalidOperation(String),
}

impl Error {
    /// Returns the error code (e.g., "FRAME-001").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NameNotFound(_) => "FRAME-001",
            Self::ReservedKey(_) => "FRAME-002",
            Self::BoxerConfiguration { .. } => "FRAME-003",
            Self::SchemaVersion(_) => "FRAME-004",
            Self::ClassMismatch { .. } => "FRAME-005",
            Self::UnknownClass(_) => "FRAME-006",
            Self::LengthMismatch { .. } => "FRAME-007",
            Self::Eval(_) => "FRAME-008",
            Self::Serialization(_) => "FRAME-009",
            Self::Io(_) => "FRAME-010",
            Self::InvalidFieldValue { .. } => "FRAME-011",
            Self::InvalidOperation(_) => "FRAME-012",
        }
    }
}

/// Conversion from fused-expression `ParseError`.
impl From<crate::host::eval::ParseError> for Error {
    fn from(err: crate::host::eval::ParseError) -> Self {
        Self::Eval(err.to_string())
    }
}
