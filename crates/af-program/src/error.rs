//! Error types for blueprint programs
//!
//! - [`ParseError`]: a blueprint fails the grammar
//! - [`ProgramError`]: a point index falls outside the program
//! - [`ValueError`]: a literal cannot be read as its declared type

/// Errors raised while parsing a blueprint
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Blueprint has no code section
    #[error("blueprint has no code section")]
    Empty,

    /// Token that cannot start or continue a point
    #[error("unexpected token '{token}' at position {position}")]
    UnexpectedToken { token: String, position: usize },

    /// Input ended while a point was incomplete
    #[error("unexpected end of code after '{after}'")]
    UnexpectedEnd { after: String },

    /// A `block {` was never closed
    #[error("unterminated block opened at token {position}")]
    UnterminatedBlock { position: usize },

    /// Tokens left over after the root point
    #[error("trailing code after the root point: '{0}'")]
    TrailingCode(String),

    /// Footnote line does not match `«TypeName» value`
    #[error("malformed footnote on line {line}: '{text}'")]
    MalformedFootnote { line: usize, text: String },

    /// Type tag does not match `[A-Za-z][A-Za-z0-9_]*`
    #[error("invalid type name: '{0}'")]
    InvalidTypeName(String),

    /// A `value «T»` placeholder has no `«T»` footnote left
    #[error("no footnote left for value «{type_name}»")]
    MissingFootnote { type_name: String },
}

/// Errors raised by point-indexed program edits
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgramError {
    /// Point index outside `1..=points`
    #[error("point {index} is out of range (program has {points} points)")]
    IndexOutOfRange { index: usize, points: usize },

    /// Replacement text did not parse
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
}

impl ProgramError {
    /// Check whether this is an index error
    #[inline]
    #[must_use]
    pub fn is_index_error(&self) -> bool {
        matches!(self, Self::IndexOutOfRange { .. })
    }
}

/// Errors raised while reading a literal value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    /// No literal type registered under this name
    #[error("unknown literal type: {0}")]
    UnknownType(String),

    /// Text is not a valid literal of the type
    #[error("'{text}' is not a valid {type_name} literal")]
    Invalid { type_name: String, text: String },
}

impl ValueError {
    /// Create an invalid-literal error
    pub fn invalid(type_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Invalid {
            type_name: type_name.into(),
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_display() {
        let err = ParseError::MissingFootnote {
            type_name: "int".to_string(),
        };
        assert_eq!(err.to_string(), "no footnote left for value «int»");
    }

    #[test]
    fn program_error_from_parse() {
        let err: ProgramError = ParseError::Empty.into();
        assert!(!err.is_index_error());
        assert!(ProgramError::IndexOutOfRange { index: 9, points: 3 }.is_index_error());
    }
}
