//! Obfusrex Core Library
//!
//! Rewrites regular expressions into equivalent patterns that hide their
//! literal content: the pattern is parsed into an AST, rewritten by a fixed
//! set of semantics-preserving rules, and serialized back into regex source.

pub mod ast;
pub mod config;
pub mod error;
pub mod groups;
pub mod lexer;
pub mod obfuscator;
pub mod parser;
pub mod pipeline;
pub mod serializer;

pub use ast::{Ast, Node};
pub use config::Options;
pub use error::{Error, ObfuscationError, ParseError, ParseErrorKind, Result, Span};
pub use groups::{GroupCollector, GroupInfo, GroupRegistry, GroupRegistryError};
pub use lexer::{Lexer, Token};
pub use obfuscator::Obfuscator;
pub use parser::{Parser, parse, parse_with};
pub use pipeline::{ObfuscationReport, obfuscate, obfuscate_debug};
pub use serializer::serialize;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_to_end() {
        // string -> tokens -> AST -> rewritten AST -> string
        let result = obfuscate("(?<year>19|20)x", &Options::default()).unwrap();
        assert_eq!(
            result,
            r"(?<year>[\u{31}][\u{39}]|[\u{32}][\u{30}])[\u{78}]"
        );
    }

    #[test]
    fn test_output_parses_back() {
        let options = Options::default();
        let output = obfuscate(r"^[a-c]+\.(\d{2,})?$", &options).unwrap();
        let reparsed = parse(&output).unwrap();
        assert_eq!(reparsed.capture_count(), 1);
        assert_eq!(
            output,
            r"^(?:[a]|[b]|[c]){1,}[\u{2e}](\d{2,}){0,1}$"
        );
    }
}
