//! The parse, rewrite and serialize pipeline
//!
//! This module wires the parser, the obfuscation engine and the serializer
//! into the two public entry points of the crate.

use std::fmt;

use tracing::{debug, instrument};

use crate::config::Options;
use crate::error::Result;
use crate::obfuscator::Obfuscator;
use crate::parser::parse_with;

/// Obfuscate a regex pattern
///
/// The result matches exactly the strings `pattern` matches and keeps its
/// capture groups, but spells every literal character as a code point.
///
/// # Example
/// ```
/// use obfusrex::{Options, obfuscate};
///
/// let result = obfuscate("(a)\\1", &Options::default()).unwrap();
/// assert_eq!(result, r"([\u{61}])(?:\1)");
/// ```
///
/// # Errors
///
/// Fails with [`Error::Parse`](crate::Error::Parse) on malformed input and
/// with [`Error::Obfuscation`](crate::Error::Obfuscation) when the pattern
/// uses a construct the engine refuses to rewrite.
#[instrument(level = "debug", skip(options))]
pub fn obfuscate(pattern: &str, options: &Options) -> Result<String> {
    let ast = parse_with(pattern, options)?;
    debug!(captures = ast.capture_count(), "parsed pattern");

    let obfuscated = Obfuscator::new(*options).obfuscate(&ast)?;
    let output = obfuscated.to_string();
    debug!(input_len = pattern.len(), output_len = output.len(), "obfuscated pattern");

    Ok(output)
}

/// Obfuscate with every intermediate stage kept, for debugging
pub fn obfuscate_debug(pattern: &str, options: &Options) -> Result<ObfuscationReport> {
    let ast = parse_with(pattern, options)?;
    let round_trip = ast.to_string();
    let obfuscated = Obfuscator::new(*options).obfuscate(&ast)?;
    let output = obfuscated.to_string();

    Ok(ObfuscationReport {
        input: pattern.to_string(),
        ast: format!("{:?}", ast.root),
        obfuscated_ast: format!("{:?}", obfuscated.root),
        round_trip,
        output,
    })
}

/// Result of an obfuscation with debug information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObfuscationReport {
    /// The original input pattern
    pub input: String,
    /// The parsed tree (debug format)
    pub ast: String,
    /// The rewritten tree (debug format)
    pub obfuscated_ast: String,
    /// The parsed tree serialized without rewriting
    pub round_trip: String,
    /// The obfuscated output
    pub output: String,
}

impl fmt::Display for ObfuscationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Obfuscation Report")?;
        writeln!(f, "==================")?;
        writeln!(f, "Input:      {}", self.input)?;
        writeln!(f, "AST:        {}", self.ast)?;
        writeln!(f, "Round trip: {}", self.round_trip)?;
        writeln!(f, "Rewritten:  {}", self.obfuscated_ast)?;
        write!(f, "Output:     {}", self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ObfuscationError, ParseErrorKind};

    #[test]
    fn test_obfuscate_scenarios() {
        let options = Options::default();
        for (input, expected) in [
            ("a", r"[\u{61}]"),
            ("[abc]", "(?:[a]|[b]|[c])"),
            (".", r"[^\n]"),
            ("a*", r"[\u{61}]{0,}"),
            ("(abc)", r"([\u{61}][\u{62}][\u{63}])"),
            (r"(a)\1", r"([\u{61}])(?:\1)"),
            ("(?=a)", r"(?=(?:[\u{61}]))"),
        ] {
            assert_eq!(obfuscate(input, &options).unwrap(), expected, "input: {input}");
        }
    }

    #[test]
    fn test_obfuscate_dot_all() {
        let options = Options::new().with_dot_all(true);
        assert_eq!(obfuscate(".", &options).unwrap(), r"[\s\S]");
    }

    #[test]
    fn test_obfuscate_empty() {
        assert_eq!(obfuscate("", &Options::default()).unwrap(), "");
    }

    #[test]
    fn test_parse_error_is_propagated() {
        let err = obfuscate("(ab", &Options::default()).unwrap_err();
        let Error::Parse(err) = err else {
            panic!("expected a parse error, got {err:?}");
        };
        assert_eq!(err.position, 0);
        assert!(matches!(err.kind, ParseErrorKind::UnterminatedGroup { .. }));
    }

    #[test]
    fn test_obfuscation_error_is_propagated() {
        let err = obfuscate("(?x) a", &Options::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::Obfuscation(ObfuscationError::UnsupportedConstruct(_))
        ));
    }

    #[test]
    fn test_obfuscate_debug() {
        let report = obfuscate_debug("(?P<n>a)", &Options::default()).unwrap();
        assert_eq!(report.input, "(?P<n>a)");
        assert_eq!(report.round_trip, "(?<n>a)");
        assert_eq!(report.output, r"(?<n>[\u{61}])");
        assert!(report.ast.contains("Named"));
        assert!(report.obfuscated_ast.contains("CodePoint"));

        let text = report.to_string();
        assert!(text.starts_with("Obfuscation Report"));
        assert!(text.ends_with(r"Output:     (?<n>[\u{61}])"));
    }
}
