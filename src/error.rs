/// Error handling module for the Markdown engine.
///
/// Two tiers live here. `MarkdownError` covers contract violations and limits
/// that abort a call (or, outside strict mode, turn into an error document).
/// `ErrorInfo` records recoverable malformations that the parser worked
/// around; those are collected per parse and never change the result.
use crate::lexer::Position;
use thiserror::Error;

/// Main error type for the Markdown engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkdownError {
    /// Parsing errors (AST construction phase).
    #[error("Parse error at line {}, column {}: {message}", position.line, position.column)]
    Parse { position: Position, message: String },

    /// A header node was built with a level outside `1..=6`.
    #[error("Invalid header level {level}: expected a value between 1 and 6")]
    InvalidHeaderLevel { level: u8 },

    /// Input rejected before tokenizing.
    #[error("Input of {size} bytes exceeds maximum allowed size of {max} bytes")]
    InputTooLarge { size: usize, max: usize },
}

/// Convenience type alias for Results in the Markdown engine.
pub type Result<T> = std::result::Result<T, MarkdownError>;

impl MarkdownError {
    /// Creates a new parse error with position information.
    pub fn parse_error(position: Position, message: impl Into<String>) -> Self {
        MarkdownError::Parse {
            position,
            message: message.into(),
        }
    }

    /// Returns the position associated with this error, if any.
    pub fn position(&self) -> Option<Position> {
        match self {
            MarkdownError::Parse { position, .. } => Some(*position),
            _ => None,
        }
    }

    /// Returns true if a non-strict driver may replace the failed result with
    /// an error document.
    pub fn is_recoverable(&self) -> bool {
        match self {
            MarkdownError::Parse { .. } => true,
            MarkdownError::InputTooLarge { .. } => true,
            MarkdownError::InvalidHeaderLevel { .. } => false,
        }
    }
}

/// Error severity levels for diagnostics collected during a parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Structural limits were hit; fatal in strict mode.
    Error,
    /// Malformed input that was recovered from.
    Warning,
}

/// Detailed diagnostic with severity and source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub severity: ErrorSeverity,
    pub position: Option<Position>,
    pub message: String,
}

impl ErrorInfo {
    /// Creates a new diagnostic with the given severity and message.
    pub fn new(severity: ErrorSeverity, message: impl Into<String>) -> Self {
        ErrorInfo {
            severity,
            position: None,
            message: message.into(),
        }
    }

    /// Sets the position for this diagnostic.
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// Converts the diagnostic into a hard parse error (used by strict mode).
    pub fn into_error(self) -> MarkdownError {
        MarkdownError::parse_error(self.position.unwrap_or_default(), self.message)
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.position {
            Some(position) => write!(
                f,
                "line {}, column {}: {}",
                position.line, position.column, self.message
            ),
            None => f.write_str(&self.message),
        }
    }
}
