//! Error types for fused-expression parsing.

use std::fmt;

/// Error that occurred during expression parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Kind of error.
    pub kind: ParseErrorKind,
    /// Position in the input where the error occurred.
    pub position: usize,
    /// The problematic input fragment.
    pub fragment: String,
    /// Human-readable message.
    pub message: String,
}

impl ParseError {
    /// Creates a new parse error.
    #[must_use]
    pub fn new(
        kind: ParseErrorKind,
        position: usize,
        fragment: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            position,
            fragment: fragment.into(),
            message: message.into(),
        }
    }

    /// Creates a syntax error.
    #[must_use]
    pub fn syntax(
        position: usize,
        fragment: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ParseErrorKind::SyntaxError, position, fragment, message)
    }

    /// Creates an invalid-number error.
    #[must_use]
    pub fn invalid_number(position: usize, fragment: impl Into<String>) -> Self {
        let frag = fragment.into();
        Self::new(
            ParseErrorKind::InvalidNumber,
            position,
            frag.clone(),
            format!("Invalid numeric literal '{frag}'"),
        )
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} at position {}: {} (near '{}')",
            self.kind, self.position, self.message, self.fragment
        )
    }
}

impl std::error::Error for ParseError {}

/// Classification of expression parse failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The input does not match the expression grammar.
    SyntaxError,
    /// A numeric literal could not be read as `f64`.
    InvalidNumber,
}
