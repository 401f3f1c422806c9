//! Error types for the obfuscator
//!
//! Errors come in two disjoint families: [`ParseError`] for source text that
//! does not conform to the grammar, and [`ObfuscationError`] for trees the
//! engine refuses to rewrite. Both are folded into [`Error`] for the pipeline.

use thiserror::Error;

/// The main error type returned by the pipeline
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The pattern could not be parsed
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The parsed tree could not be rewritten
    #[error("obfuscation error: {0}")]
    Obfuscation(#[from] ObfuscationError),
}

/// A parse failure, positioned at the offending character
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind} at position {position}")]
pub struct ParseError {
    /// Character offset into the pattern
    pub position: usize,
    /// What went wrong
    pub kind: ParseErrorKind,
}

impl ParseError {
    /// Create a new parse error at `position`
    pub fn new(position: usize, kind: ParseErrorKind) -> Self {
        ParseError { position, kind }
    }
}

/// Specific kinds of parse errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    /// A group was opened but never closed
    #[error("unterminated group: expected `)`, found {found}")]
    UnterminatedGroup {
        /// What was found instead of `)`
        found: String,
    },

    /// A character class was opened but never closed
    #[error("unterminated character class: expected `]`, found end of pattern")]
    UnterminatedCharacterClass,

    /// An escape that is not part of the supported grammar
    #[error("invalid escape sequence `{0}`")]
    InvalidEscapeSequence(String),

    /// `{m,n}` with `m > n`
    #[error("invalid quantifier range: expected min <= max, found {{{min},{max}}}")]
    InvalidQuantifierRange {
        /// Lower bound as written
        min: u32,
        /// Upper bound as written
        max: u32,
    },

    /// A repetition count that does not fit the counter
    #[error("repetition count `{0}` is too large")]
    RepetitionTooLarge(String),

    /// A quantifier with nothing to apply to
    #[error("dangling quantifier: expected an expression before {0}")]
    DanglingQuantifier(String),

    /// An unrecognised `(?...` prefix
    #[error("unknown group construct `{0}`")]
    UnknownGroupConstruct(String),

    /// A backreference to a group that does not exist
    #[error("invalid backreference `{0}`: no such capturing group")]
    InvalidBackreference(String),

    /// A class range whose bounds are out of order
    #[error("invalid class range: `{lo}` is greater than `{hi}`")]
    InvalidClassRange {
        /// Start of the range
        lo: char,
        /// End of the range
        hi: char,
    },

    /// Class set operations (`&&`, `--`, `~~`) and nested or POSIX classes
    #[error("unsupported class syntax `{0}`")]
    UnsupportedClassSyntax(String),

    /// A malformed group name
    #[error("invalid group name `{0}`")]
    InvalidGroupName(String),

    /// Two groups sharing one name
    #[error("duplicate group name `{0}`")]
    DuplicateGroupName(String),

    /// Groups nested past the recursion limit
    #[error("group nesting deeper than {0}")]
    NestingTooDeep(usize),

    /// Unexpected token encountered
    #[error("expected {expected}, found {found}")]
    UnexpectedToken {
        /// What was expected
        expected: String,
        /// What was actually found
        found: String,
    },
}

/// Errors raised by the obfuscation engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ObfuscationError {
    /// A construct the engine cannot rewrite without changing its meaning
    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(String),
}

/// A span representing a location in the source pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Start position (inclusive)
    pub start: usize,
    /// End position (exclusive)
    pub end: usize,
}

impl Span {
    /// Create a new span
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// Create a span for a single character
    pub fn single(pos: usize) -> Self {
        Span {
            start: pos,
            end: pos + 1,
        }
    }

    /// Build a parse error located at the start of this span
    pub fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(self.start, kind)
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new(5, ParseErrorKind::InvalidEscapeSequence("\\q".to_string()));
        assert_eq!(err.to_string(), "invalid escape sequence `\\q` at position 5");
    }

    #[test]
    fn test_unterminated_group_display() {
        let err = ParseError::new(
            0,
            ParseErrorKind::UnterminatedGroup {
                found: "end of pattern".to_string(),
            },
        );
        assert_eq!(
            err.to_string(),
            "unterminated group: expected `)`, found end of pattern at position 0"
        );
    }

    #[test]
    fn test_quantifier_range_display() {
        let kind = ParseErrorKind::InvalidQuantifierRange { min: 5, max: 2 };
        assert_eq!(
            kind.to_string(),
            "invalid quantifier range: expected min <= max, found {5,2}"
        );
    }

    #[test]
    fn test_error_from_parse_error() {
        let parse_err = ParseError::new(3, ParseErrorKind::UnterminatedCharacterClass);
        let err: Error = parse_err.into();
        assert_eq!(
            err.to_string(),
            "parse error: unterminated character class: expected `]`, found end of pattern at position 3"
        );
    }

    #[test]
    fn test_error_from_obfuscation_error() {
        let err: Error = ObfuscationError::UnsupportedConstruct("`(?x)`".to_string()).into();
        assert_eq!(err.to_string(), "obfuscation error: unsupported construct: `(?x)`");
    }

    #[test]
    fn test_span_creation() {
        let span = Span::new(10, 20);
        assert_eq!(span.start, 10);
        assert_eq!(span.end, 20);
    }

    #[test]
    fn test_span_single() {
        let span = Span::single(5);
        assert_eq!((span.start, span.end), (5, 6));
        let err = span.error(ParseErrorKind::DanglingQuantifier("`*`".to_string()));
        assert_eq!(err.position, 5);
    }
}
