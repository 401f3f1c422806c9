//! Parser for regex patterns
//!
//! This module provides a recursive descent parser that converts
//! tokens into an [`Ast`].
//!
//! Grammar (in order of precedence, lowest to highest):
//!   regex       := alternation
//!   alternation := sequence ( '|' sequence )*
//!   sequence    := quantified*
//!   quantified  := atom quantifier?
//!   quantifier  := ( '*' | '+' | '?' | '{' m '}' | '{' m ',}' | '{' m ',' n '}' ) '?'?
//!   atom        := literal | '.' | class | group | anchor | shorthand | backref
//!                | lookaround | modifiers
//!   group       := '(' alternation ')' | '(?:' alternation ')'
//!                | '(?<' name '>' alternation ')' | '(?' flags ':' alternation ')'
//!   lookaround  := ( '(?=' | '(?!' | '(?<=' | '(?<!' ) alternation ')'
//!   modifiers   := '(?' flags ')'
//!   class       := '[' '^'? ']'? ( char | char '-' char | shorthand )* ']'
//!
//! Capture indices are handed out when a group's opening delimiter is read.
//! Backreferences are checked only once the whole pattern is parsed, since
//! forward references are legal.

use crate::ast::{Anchor, Ast, BackrefTarget, ClassItem, GroupKind, Node};
use crate::config::Options;
use crate::error::{ParseError, ParseErrorKind, Span};
use crate::groups::GroupRegistry;
use crate::lexer::{ClassToken, GroupOpen, Lexer, Spanned, Token};

/// Maximum depth of nested groups and lookarounds
pub const MAX_NESTING: usize = 250;

/// Parser for regex patterns
pub struct Parser {
    lexer: Lexer,
    current: Spanned<Token>,
    groups: GroupRegistry,
    backrefs: Vec<Spanned<BackrefTarget>>,
    depth: usize,
    dot_all: bool,
}

impl Parser {
    /// Create a new parser for the given input string
    ///
    /// # Errors
    ///
    /// Fails if the first token of the input is malformed.
    pub fn new(input: &str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current,
            groups: GroupRegistry::new(),
            backrefs: Vec::new(),
            depth: 0,
            dot_all: false,
        })
    }

    /// Set the dot interpretation context recorded on the resulting tree
    pub fn dot_all(mut self, dot_all: bool) -> Self {
        self.dot_all = dot_all;
        self
    }

    /// Advance to the next token
    fn advance(&mut self) -> Result<(), ParseError> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    /// Take the current token and advance past it
    fn take(&mut self) -> Result<Spanned<Token>, ParseError> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        self.current.span.error(kind)
    }

    fn dangling_quantifier(&self) -> ParseError {
        self.error(ParseErrorKind::DanglingQuantifier(
            self.current.value.to_string(),
        ))
    }

    /// Parse the entire input, consuming the parser
    pub fn parse(mut self) -> Result<Ast, ParseError> {
        let root = self.parse_alternation()?;

        // Only a stray `)` can stop the top-level alternation early
        if self.current.value != Token::Eof {
            return Err(self.error(ParseErrorKind::UnexpectedToken {
                expected: "end of pattern".to_string(),
                found: self.current.value.to_string(),
            }));
        }

        self.validate_backreferences()?;

        Ok(Ast {
            root,
            groups: self.groups,
            dot_all: self.dot_all,
        })
    }

    /// Parse alternation (lowest precedence)
    /// alternation := sequence ( '|' sequence )*
    fn parse_alternation(&mut self) -> Result<Node, ParseError> {
        let mut branches = vec![self.parse_sequence()?];

        while self.current.value == Token::Pipe {
            self.advance()?;
            branches.push(self.parse_sequence()?);
        }

        Ok(Node::alternation(branches))
    }

    /// Parse a sequence (concatenation)
    /// sequence := quantified*
    fn parse_sequence(&mut self) -> Result<Vec<Node>, ParseError> {
        let mut nodes = Vec::new();
        while !self.is_sequence_end() {
            nodes.push(self.parse_quantified()?);
        }
        Ok(nodes)
    }

    /// Check if we've reached the end of a sequence
    fn is_sequence_end(&self) -> bool {
        matches!(
            self.current.value,
            Token::Eof | Token::RightParen | Token::Pipe
        )
    }

    /// Parse a quantified expression
    /// quantified := atom quantifier?
    fn parse_quantified(&mut self) -> Result<Node, ParseError> {
        let atom = self.parse_atom()?;

        let Token::Quantifier(quantifier) = self.current.value else {
            return Ok(atom);
        };

        if matches!(atom, Node::SetFlags(_)) {
            return Err(self.dangling_quantifier());
        }

        if let Some(max) = quantifier.max
            && quantifier.min > max
        {
            return Err(self.error(ParseErrorKind::InvalidQuantifierRange {
                min: quantifier.min,
                max,
            }));
        }

        self.advance()?;

        // A second quantifier has nothing left to apply to
        if matches!(self.current.value, Token::Quantifier(_)) {
            return Err(self.dangling_quantifier());
        }

        Ok(Node::quantified(atom, quantifier))
    }

    /// Parse an atomic expression
    fn parse_atom(&mut self) -> Result<Node, ParseError> {
        if matches!(self.current.value, Token::Quantifier(_)) {
            return Err(self.dangling_quantifier());
        }

        let Spanned { value, span } = self.take()?;
        let node = match value {
            Token::Literal(c) => Node::Literal(c),
            Token::Dot => Node::Dot,
            Token::Caret => Node::Anchor(Anchor::Start),
            Token::Dollar => Node::Anchor(Anchor::End),
            Token::WordBoundary => Node::Anchor(Anchor::WordBoundary),
            Token::NonWordBoundary => Node::Anchor(Anchor::NonWordBoundary),
            Token::Shorthand(shorthand) => Node::Shorthand(shorthand),
            Token::Backreference(target) => {
                self.backrefs.push(Spanned::new(target.clone(), span));
                Node::Backreference(target)
            }
            Token::Class { negated, items } => Self::build_class(negated, &items)?,
            Token::GroupOpen(open) => self.parse_group(open, span)?,
            Token::SetFlags(modifiers) => Node::SetFlags(modifiers),
            other @ (Token::Quantifier(_) | Token::Pipe | Token::RightParen | Token::Eof) => {
                return Err(span.error(ParseErrorKind::UnexpectedToken {
                    expected: "expression".to_string(),
                    found: other.to_string(),
                }));
            }
        };

        Ok(node)
    }

    /// Parse a group whose opener was read at `span`
    fn parse_group(&mut self, open: GroupOpen, span: Span) -> Result<Node, ParseError> {
        let kind = match open {
            GroupOpen::Lookaround { kind, negated } => {
                let body = self.parse_group_body(span)?;
                return Ok(Node::lookaround(kind, negated, body));
            }
            GroupOpen::Capturing => GroupKind::Capturing(self.register(None, span)?),
            GroupOpen::Named(name) => {
                let index = self.register(Some(name.clone()), span)?;
                GroupKind::Named { name, index }
            }
            GroupOpen::NonCapturing => GroupKind::NonCapturing,
            GroupOpen::Modifiers(modifiers) => GroupKind::Modifiers(modifiers),
        };

        let body = self.parse_group_body(span)?;
        Ok(Node::group(kind, body))
    }

    /// Parse everything up to and including the `)` closing a group
    fn parse_group_body(&mut self, span: Span) -> Result<Node, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(span.error(ParseErrorKind::NestingTooDeep(MAX_NESTING)));
        }

        self.depth += 1;
        let body = self.parse_alternation()?;
        self.depth -= 1;

        if self.current.value != Token::RightParen {
            return Err(span.error(ParseErrorKind::UnterminatedGroup {
                found: self.current.value.to_string(),
            }));
        }
        self.advance()?;
        Ok(body)
    }

    fn register(&mut self, name: Option<String>, span: Span) -> Result<u32, ParseError> {
        self.groups
            .register_group(name)
            .map_err(|err| span.error(err.into()))
    }

    /// Assemble class members, joining `a`, `-`, `z` into ranges
    fn build_class(negated: bool, items: &[Spanned<ClassToken>]) -> Result<Node, ParseError> {
        let mut members = Vec::with_capacity(items.len());
        let mut i = 0;

        while i < items.len() {
            let lo = match &items[i].value {
                ClassToken::Char(c) => Some(*c),
                ClassToken::Hyphen => Some('-'),
                ClassToken::Shorthand(_) => None,
            };

            let hyphen = items.get(i + 1).map(|t| &t.value);
            let end = items.get(i + 2).map(|t| &t.value);
            if let (Some(lo), Some(ClassToken::Hyphen), Some(ClassToken::Char(hi))) = (lo, hyphen, end)
            {
                if lo > *hi {
                    return Err(items[i]
                        .span
                        .error(ParseErrorKind::InvalidClassRange { lo, hi: *hi }));
                }
                members.push(ClassItem::Range(lo, *hi));
                i += 3;
                continue;
            }

            members.push(match &items[i].value {
                ClassToken::Char(c) => ClassItem::Char(*c),
                ClassToken::Hyphen => ClassItem::Char('-'),
                ClassToken::Shorthand(s) => ClassItem::Shorthand(s.clone()),
            });
            i += 1;
        }

        Ok(Node::class(negated, members))
    }

    /// Check every backreference against the finished group registry
    fn validate_backreferences(&self) -> Result<(), ParseError> {
        for backref in &self.backrefs {
            self.groups
                .resolve(&backref.value)
                .map_err(|err| backref.span.error(err.into()))?;
        }
        Ok(())
    }
}

/// Parse a regex pattern string into an AST
pub fn parse(input: &str) -> Result<Ast, ParseError> {
    Parser::new(input)?.parse()
}

/// Parse a regex pattern string with the given options
pub fn parse_with(input: &str, options: &Options) -> Result<Ast, ParseError> {
    Parser::new(input)?.dot_all(options.dot_all).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{LookaroundKind, Quantifier, Shorthand};

    fn root(input: &str) -> Node {
        parse(input).unwrap().root
    }

    fn error(input: &str) -> ParseError {
        parse(input).unwrap_err()
    }

    #[test]
    fn test_parse_literal() {
        assert_eq!(root("a"), Node::literal('a'));
    }

    #[test]
    fn test_parse_sequence() {
        assert_eq!(
            root("abc"),
            Node::Sequence(vec![
                Node::literal('a'),
                Node::literal('b'),
                Node::literal('c'),
            ])
        );
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(root(""), Node::empty());
    }

    #[test]
    fn test_parse_alternation() {
        assert_eq!(
            root("ab|c|"),
            Node::Alternation(vec![
                vec![Node::literal('a'), Node::literal('b')],
                vec![Node::literal('c')],
                vec![],
            ])
        );
    }

    #[test]
    fn test_parse_quantifiers() {
        assert_eq!(
            root("a*?"),
            Node::quantified(Node::literal('a'), Quantifier::star(false))
        );
        assert_eq!(
            root("a{2,5}"),
            Node::quantified(Node::literal('a'), Quantifier::braces(2, Some(5), true))
        );
    }

    #[test]
    fn test_parse_groups_and_indices() {
        let ast = parse("(a)(?:b)(?<name>c(d))").unwrap();
        assert_eq!(ast.capture_count(), 3);
        assert_eq!(ast.groups.get_by_name("name"), Some(2));
        assert_eq!(
            ast.root,
            Node::Sequence(vec![
                Node::capturing(1, Node::literal('a')),
                Node::non_capturing(Node::literal('b')),
                Node::named(
                    "name",
                    2,
                    Node::Sequence(vec![Node::literal('c'), Node::capturing(3, Node::literal('d'))])
                ),
            ])
        );
    }

    #[test]
    fn test_parse_lookaround() {
        assert_eq!(
            root("(?<!a)"),
            Node::lookaround(LookaroundKind::Behind, true, Node::literal('a'))
        );
    }

    #[test]
    fn test_parse_anchors_and_shorthands() {
        assert_eq!(
            root(r"^\d\b$"),
            Node::Sequence(vec![
                Node::Anchor(Anchor::Start),
                Node::Shorthand(Shorthand::Digit),
                Node::Anchor(Anchor::WordBoundary),
                Node::Anchor(Anchor::End),
            ])
        );
    }

    #[test]
    fn test_parse_class_ranges() {
        assert_eq!(
            root(r"[a-c\d-]"),
            Node::class(
                false,
                vec![
                    ClassItem::Range('a', 'c'),
                    ClassItem::Shorthand(Shorthand::Digit),
                    ClassItem::Char('-'),
                ]
            )
        );
        assert_eq!(
            root("[-a]"),
            Node::class(false, vec![ClassItem::Char('-'), ClassItem::Char('a')])
        );
        assert_eq!(
            root("[^]]"),
            Node::class(true, vec![ClassItem::Char(']')])
        );
    }

    #[test]
    fn test_parse_class_range_from_hyphen() {
        assert_eq!(
            root(r"[\--/]"),
            Node::class(false, vec![ClassItem::Range('-', '/')])
        );
    }

    #[test]
    fn test_class_set_syntax_fails_parse() {
        for (input, position) in [
            ("^[a-c&&b]$", 5),
            ("^[[:digit:]]$", 2),
            ("^[a-z--b]$", 5),
            ("[a~~b]", 2),
            ("[--/]", 1),
        ] {
            let err = error(input);
            assert_eq!(err.position, position, "input: {input}");
            assert!(
                matches!(err.kind, ParseErrorKind::UnsupportedClassSyntax(_)),
                "input: {input}"
            );
        }
    }

    #[test]
    fn test_invalid_class_range() {
        let err = error("x[z-a]");
        assert_eq!(err.position, 2);
        assert_eq!(err.kind, ParseErrorKind::InvalidClassRange { lo: 'z', hi: 'a' });
    }

    #[test]
    fn test_backreferences() {
        let ast = parse(r"(a)\1").unwrap();
        assert_eq!(
            ast.root,
            Node::Sequence(vec![
                Node::capturing(1, Node::literal('a')),
                Node::backreference(1),
            ])
        );

        // Forward references are resolved after parsing
        assert!(parse(r"\1(a)").is_ok());
        assert!(parse(r"(?<w>a)\k<w>").is_ok());
    }

    #[test]
    fn test_invalid_backreferences() {
        let err = error(r"(a)\2");
        assert_eq!(err.position, 3);
        assert_eq!(
            err.kind,
            ParseErrorKind::InvalidBackreference("\\2".to_string())
        );

        let err = error(r"(?<w>a)\k<x>");
        assert_eq!(err.position, 7);
        assert_eq!(
            err.kind,
            ParseErrorKind::InvalidBackreference("\\k<x>".to_string())
        );
    }

    #[test]
    fn test_duplicate_group_name() {
        let err = error("(?<a>x)(?<a>y)");
        assert_eq!(err.position, 7);
        assert_eq!(err.kind, ParseErrorKind::DuplicateGroupName("a".to_string()));
    }

    #[test]
    fn test_dangling_quantifiers() {
        for (input, position) in [("*a", 0), ("a**", 2), ("a|*", 2), ("(*)", 1), ("(?i)*", 4)] {
            let err = error(input);
            assert_eq!(err.position, position, "input: {input}");
            assert!(
                matches!(err.kind, ParseErrorKind::DanglingQuantifier(_)),
                "input: {input}"
            );
        }
    }

    #[test]
    fn test_lazy_quantifier_is_not_dangling() {
        assert!(parse("a+?").is_ok());
        assert!(parse("a{2}?").is_ok());
    }

    #[test]
    fn test_invalid_quantifier_range() {
        let err = error("ab{3,1}");
        assert_eq!(err.position, 2);
        assert_eq!(err.kind, ParseErrorKind::InvalidQuantifierRange { min: 3, max: 1 });
    }

    #[test]
    fn test_unterminated_group() {
        let err = error("x(ab");
        assert_eq!(err.position, 1);
        assert!(matches!(err.kind, ParseErrorKind::UnterminatedGroup { .. }));
        assert!(err.to_string().contains("end of pattern"));
    }

    #[test]
    fn test_stray_close_paren() {
        let err = error("ab)");
        assert_eq!(err.position, 2);
        assert!(matches!(err.kind, ParseErrorKind::UnexpectedToken { .. }));
    }

    #[test]
    fn test_nesting_limit() {
        // Debug builds use large frames; give the recursion room
        std::thread::Builder::new()
            .stack_size(32 * 1024 * 1024)
            .spawn(|| {
                let ok = format!("{}a{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
                assert!(parse(&ok).is_ok());

                let deep = format!(
                    "{}a{}",
                    "(".repeat(MAX_NESTING + 1),
                    ")".repeat(MAX_NESTING + 1)
                );
                let err = error(&deep);
                assert_eq!(err.position, MAX_NESTING);
                assert_eq!(err.kind, ParseErrorKind::NestingTooDeep(MAX_NESTING));
            })
            .unwrap()
            .join()
            .unwrap();
    }

    #[test]
    fn test_inline_modifiers() {
        let ast = parse("(?i)a(?s:.)").unwrap();
        let Node::Sequence(nodes) = ast.root else {
            panic!("expected a sequence");
        };
        assert!(matches!(nodes[0], Node::SetFlags(_)));
        assert!(matches!(
            nodes[2],
            Node::Group {
                kind: GroupKind::Modifiers(_),
                ..
            }
        ));
    }

    #[test]
    fn test_positions_count_characters() {
        let err = error("ééé\\q");
        assert_eq!(err.position, 3);
    }

    #[test]
    fn test_dot_all_context() {
        assert!(!parse(".").unwrap().dot_all);
        assert!(parse_with(".", &Options::new().with_dot_all(true)).unwrap().dot_all);
        assert!(Parser::new(".").unwrap().dot_all(true).parse().unwrap().dot_all);
    }
}
