//! Lexer for tokenizing regex patterns
//!
//! Regex syntax is context sensitive, so the lexer does more than split
//! characters: it decodes escapes, recognises group openers and quantifier
//! syntax, and reads a whole bracketed class into a single token. Every token
//! carries the character span it was read from.

use std::fmt;

use crate::ast::{
    BackrefTarget, Flag, LookaroundKind, Modifiers, Quantifier, Repetition, Shorthand,
};
use crate::error::{ParseError, ParseErrorKind, Span};

/// A value tagged with its location in the pattern
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    /// The value
    pub value: T,
    /// Where it was read from
    pub span: Span,
}

impl<T> Spanned<T> {
    /// Tag a value with a span
    pub fn new(value: T, span: Span) -> Self {
        Spanned { value, span }
    }
}

/// A token in a regex pattern
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A literal character, escaped or not
    Literal(char),
    /// Dot `.`
    Dot,
    /// Caret `^`
    Caret,
    /// Dollar `$`
    Dollar,
    /// Pipe `|`
    Pipe,
    /// Right parenthesis `)`
    RightParen,
    /// Any group opener, `(`, `(?:`, `(?<name>`, `(?=`, ...
    GroupOpen(GroupOpen),
    /// A complete unscoped modifier group such as `(?i)`
    SetFlags(Modifiers),
    /// A complete bracketed class
    Class {
        /// Whether the class started with `^`
        negated: bool,
        /// Class members, ranges not yet assembled
        items: Vec<Spanned<ClassToken>>,
    },
    /// A quantifier with its lazy suffix already applied
    Quantifier(Quantifier),
    /// A shorthand class (`\d`, `\p{L}`, ...)
    Shorthand(Shorthand),
    /// Word boundary `\b`
    WordBoundary,
    /// Non-word boundary `\B`
    NonWordBoundary,
    /// A backreference (`\1`, `\k<name>`)
    Backreference(BackrefTarget),
    /// End of input
    Eof,
}

/// The opening delimiter of a group
#[derive(Debug, Clone, PartialEq)]
pub enum GroupOpen {
    /// `(`
    Capturing,
    /// `(?:`
    NonCapturing,
    /// `(?<name>` or `(?P<name>`
    Named(String),
    /// `(?flags:`
    Modifiers(Modifiers),
    /// `(?=`, `(?!`, `(?<=`, `(?<!`
    Lookaround {
        /// Direction of the assertion
        kind: LookaroundKind,
        /// Whether the assertion is negative
        negated: bool,
    },
}

/// A token inside a bracketed class
#[derive(Debug, Clone, PartialEq)]
pub enum ClassToken {
    /// A character, escaped or not
    Char(char),
    /// A shorthand class
    Shorthand(Shorthand),
    /// An unescaped `-`, which may form a range
    Hyphen,
}

/// A decoded escape sequence
#[derive(Debug, Clone, PartialEq)]
enum Escape {
    Char(char),
    Shorthand(Shorthand),
    WordBoundary,
    NonWordBoundary,
    Backreference(BackrefTarget),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Literal(c) => write!(f, "literal `{}`", c.escape_debug()),
            Token::Dot => write!(f, "`.`"),
            Token::Caret => write!(f, "`^`"),
            Token::Dollar => write!(f, "`$`"),
            Token::Pipe => write!(f, "`|`"),
            Token::RightParen => write!(f, "`)`"),
            Token::GroupOpen(_) => write!(f, "group"),
            Token::SetFlags(_) => write!(f, "inline modifiers"),
            Token::Class { .. } => write!(f, "character class"),
            Token::Quantifier(q) => match q.notation {
                Repetition::Star => write!(f, "quantifier `*`"),
                Repetition::Plus => write!(f, "quantifier `+`"),
                Repetition::Question => write!(f, "quantifier `?`"),
                Repetition::Braces => write!(f, "quantifier `{{`"),
            },
            Token::Shorthand(_) => write!(f, "shorthand class"),
            Token::WordBoundary => write!(f, "boundary `\\b`"),
            Token::NonWordBoundary => write!(f, "boundary `\\B`"),
            Token::Backreference(_) => write!(f, "backreference"),
            Token::Eof => write!(f, "end of pattern"),
        }
    }
}

/// Check if a string is a valid group name
pub fn is_valid_group_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {
            chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Lexer for tokenizing regex patterns
pub struct Lexer {
    chars: Vec<char>,
    position: usize,
}

impl Lexer {
    /// Create a new lexer for the given input string
    pub fn new(input: &str) -> Self {
        Lexer {
            chars: input.chars().collect(),
            position: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.position + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position += 1;
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    /// The source text from `start` up to the current position
    fn slice(&self, start: usize) -> String {
        self.chars[start..self.position].iter().collect()
    }

    fn read_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let start = self.position;
        while self.peek().is_some_and(&pred) {
            self.position += 1;
        }
        self.slice(start)
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> Result<Spanned<Token>, ParseError> {
        let start = self.position;
        let Some(c) = self.bump() else {
            return Ok(Spanned::new(Token::Eof, Span::new(start, start)));
        };

        let token = match c {
            '\\' => match self.read_escape(start)? {
                Escape::Char(c) => Token::Literal(c),
                Escape::Shorthand(s) => Token::Shorthand(s),
                Escape::WordBoundary => Token::WordBoundary,
                Escape::NonWordBoundary => Token::NonWordBoundary,
                Escape::Backreference(target) => Token::Backreference(target),
            },
            '(' => self.read_group_open(start)?,
            ')' => Token::RightParen,
            '[' => self.read_class(start)?,
            '|' => Token::Pipe,
            '^' => Token::Caret,
            '$' => Token::Dollar,
            '.' => Token::Dot,
            '*' => Token::Quantifier(Quantifier::star(self.read_greedy())),
            '+' => Token::Quantifier(Quantifier::plus(self.read_greedy())),
            '?' => Token::Quantifier(Quantifier::question(self.read_greedy())),
            '{' => match self.read_braces(start)? {
                Some(quantifier) => Token::Quantifier(quantifier),
                None => Token::Literal('{'),
            },
            c => Token::Literal(c),
        };

        Ok(Spanned::new(token, Span::new(start, self.position)))
    }

    /// Tokenize the entire input, ending with [`Token::Eof`]
    pub fn tokenize(&mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?.value;
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    /// Consume a lazy `?` suffix, returning whether the quantifier is greedy
    fn read_greedy(&mut self) -> bool {
        !self.eat('?')
    }

    /// Read `{m}`, `{m,}` or `{m,n}` after the opening brace. Anything else
    /// leaves the position untouched and yields `None`, making `{` a literal.
    fn read_braces(&mut self, start: usize) -> Result<Option<Quantifier>, ParseError> {
        let resume = self.position;
        let min = self.read_while(|c| c.is_ascii_digit());
        if min.is_empty() {
            return Ok(None);
        }

        let max = if self.eat(',') {
            Some(self.read_while(|c| c.is_ascii_digit()))
        } else {
            None
        };

        if !self.eat('}') {
            self.position = resume;
            return Ok(None);
        }

        let count = |digits: &str| {
            digits.parse::<u32>().map_err(|_| {
                ParseError::new(start, ParseErrorKind::RepetitionTooLarge(digits.to_string()))
            })
        };

        let min_count = count(&min)?;
        let max_count = match max.as_deref() {
            None => Some(min_count),
            Some("") => None,
            Some(digits) => Some(count(digits)?),
        };

        Ok(Some(Quantifier::braces(min_count, max_count, self.read_greedy())))
    }

    /// Decode an escape sequence; the backslash at `start` is already consumed
    fn read_escape(&mut self, start: usize) -> Result<Escape, ParseError> {
        let Some(c) = self.bump() else {
            return Err(self.invalid_escape(start));
        };

        let escape = match c {
            'n' => Escape::Char('\n'),
            't' => Escape::Char('\t'),
            'r' => Escape::Char('\r'),
            'f' => Escape::Char('\x0C'),
            'v' => Escape::Char('\x0B'),
            '0' => Escape::Char('\0'),
            'x' => Escape::Char(self.read_code_point(start, 2)?),
            'u' => Escape::Char(self.read_code_point(start, 4)?),
            'd' => Escape::Shorthand(Shorthand::Digit),
            'D' => Escape::Shorthand(Shorthand::NotDigit),
            'w' => Escape::Shorthand(Shorthand::Word),
            'W' => Escape::Shorthand(Shorthand::NotWord),
            's' => Escape::Shorthand(Shorthand::Space),
            'S' => Escape::Shorthand(Shorthand::NotSpace),
            'p' | 'P' => Escape::Shorthand(self.read_property(start, c == 'P')?),
            'b' => Escape::WordBoundary,
            'B' => Escape::NonWordBoundary,
            'k' => Escape::Backreference(BackrefTarget::Name(self.read_backref_name(start)?)),
            '1'..='9' => {
                let digits = format!("{c}{}", self.read_while(|c| c.is_ascii_digit()));
                let number = digits.parse::<u32>().map_err(|_| {
                    ParseError::new(start, ParseErrorKind::InvalidBackreference(format!("\\{digits}")))
                })?;
                Escape::Backreference(BackrefTarget::Number(number))
            }
            c if c.is_ascii_punctuation() || c == ' ' => Escape::Char(c),
            _ => return Err(self.invalid_escape(start)),
        };

        Ok(escape)
    }

    fn invalid_escape(&self, start: usize) -> ParseError {
        ParseError::new(
            start,
            ParseErrorKind::InvalidEscapeSequence(self.slice(start)),
        )
    }

    /// Read the hex digits of `\x` / `\u`: either braced or exactly `width`
    fn read_code_point(&mut self, start: usize, width: usize) -> Result<char, ParseError> {
        let digits = if self.eat('{') {
            let digits = self.read_while(|c| c.is_ascii_hexdigit());
            if !self.eat('}') || digits.is_empty() || digits.len() > 6 {
                return Err(self.invalid_escape(start));
            }
            digits
        } else {
            let digits: String = (0..width).map_while(|i| self.peek_at(i)).collect();
            if digits.chars().count() != width || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
                self.position += digits.chars().take_while(|c| c.is_ascii_hexdigit()).count();
                return Err(self.invalid_escape(start));
            }
            self.position += width;
            digits
        };

        u32::from_str_radix(&digits, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.invalid_escape(start))
    }

    /// Read the name of `\p{Name}` or the single letter of `\pL`
    fn read_property(&mut self, start: usize, negated: bool) -> Result<Shorthand, ParseError> {
        let name = if self.eat('{') {
            let name = self.read_while(|c| c.is_alphanumeric() || matches!(c, '_' | '=' | '-'));
            if !self.eat('}') || name.is_empty() {
                return Err(self.invalid_escape(start));
            }
            name
        } else {
            match self.bump() {
                Some(c) if c.is_ascii_alphabetic() => c.to_string(),
                _ => return Err(self.invalid_escape(start)),
            }
        };
        Ok(Shorthand::Property { name, negated })
    }

    /// Read the `<name>` or `{name}` part of `\k`
    fn read_backref_name(&mut self, start: usize) -> Result<String, ParseError> {
        let close = match self.bump() {
            Some('<') => '>',
            Some('{') => '}',
            _ => return Err(self.invalid_escape(start)),
        };
        let name = self.read_while(|c| c != close);
        if !self.eat(close) {
            return Err(self.invalid_escape(start));
        }
        if !is_valid_group_name(&name) {
            return Err(ParseError::new(start, ParseErrorKind::InvalidGroupName(name)));
        }
        Ok(name)
    }

    /// Read a group opener; the `(` at `start` is already consumed
    fn read_group_open(&mut self, start: usize) -> Result<Token, ParseError> {
        if !self.eat('?') {
            return Ok(Token::GroupOpen(GroupOpen::Capturing));
        }

        let open = match (self.peek(), self.peek_at(1)) {
            (Some(':'), _) => {
                self.position += 1;
                GroupOpen::NonCapturing
            }
            (Some('='), _) | (Some('!'), _) => {
                let negated = self.bump() == Some('!');
                GroupOpen::Lookaround {
                    kind: LookaroundKind::Ahead,
                    negated,
                }
            }
            (Some('<'), Some('=')) | (Some('<'), Some('!')) => {
                self.position += 1;
                let negated = self.bump() == Some('!');
                GroupOpen::Lookaround {
                    kind: LookaroundKind::Behind,
                    negated,
                }
            }
            (Some('<'), _) => {
                self.position += 1;
                GroupOpen::Named(self.read_group_name()?)
            }
            (Some('P'), Some('<')) => {
                self.position += 2;
                GroupOpen::Named(self.read_group_name()?)
            }
            _ => return self.read_modifiers(start),
        };

        Ok(Token::GroupOpen(open))
    }

    /// Read a group name up to and including the closing `>`
    fn read_group_name(&mut self) -> Result<String, ParseError> {
        let name_start = self.position;
        let name = self.read_while(|c| c != '>' && c != ')');
        if !self.eat('>') || !is_valid_group_name(&name) {
            return Err(ParseError::new(
                name_start,
                ParseErrorKind::InvalidGroupName(name),
            ));
        }
        Ok(name)
    }

    /// Read inline modifiers after `(?`: either `flags)` or `flags:`
    fn read_modifiers(&mut self, start: usize) -> Result<Token, ParseError> {
        let mut modifiers = Modifiers::default();
        let mut disabling = false;

        loop {
            match self.bump() {
                Some(close @ (')' | ':')) => {
                    let empty = modifiers.enable.is_empty() && modifiers.disable.is_empty();
                    if empty || (disabling && modifiers.disable.is_empty()) {
                        break;
                    }
                    return Ok(if close == ')' {
                        Token::SetFlags(modifiers)
                    } else {
                        Token::GroupOpen(GroupOpen::Modifiers(modifiers))
                    });
                }
                Some('-') if !disabling => disabling = true,
                Some(c) => {
                    let Some(flag) = Flag::from_char(c) else {
                        break;
                    };
                    let (list, other) = if disabling {
                        (&mut modifiers.disable, &modifiers.enable)
                    } else {
                        (&mut modifiers.enable, &modifiers.disable)
                    };
                    if other.contains(flag) || !list.push(flag) {
                        break;
                    }
                }
                None => break,
            }
        }

        Err(ParseError::new(
            start,
            ParseErrorKind::UnknownGroupConstruct(self.slice(start)),
        ))
    }

    /// Read a bracketed class; the `[` at `start` is already consumed
    ///
    /// Nested classes (an unescaped `[`, including POSIX `[:alpha:]`) and the
    /// set operators `&&`, `--` and `~~` are rejected.
    fn read_class(&mut self, start: usize) -> Result<Token, ParseError> {
        let negated = self.eat('^');
        let mut items = Vec::new();

        if self.peek() == Some(']') {
            items.push(Spanned::new(
                ClassToken::Char(']'),
                Span::single(self.position),
            ));
            self.position += 1;
        }

        loop {
            let item_start = self.position;
            let Some(c) = self.bump() else {
                return Err(ParseError::new(
                    start,
                    ParseErrorKind::UnterminatedCharacterClass,
                ));
            };

            let token = match c {
                ']' => break,
                '[' => {
                    return Err(ParseError::new(
                        item_start,
                        ParseErrorKind::UnsupportedClassSyntax("[".to_string()),
                    ));
                }
                '&' | '-' | '~' if self.peek() == Some(c) => {
                    return Err(ParseError::new(
                        item_start,
                        ParseErrorKind::UnsupportedClassSyntax(format!("{c}{c}")),
                    ));
                }
                '\\' => match self.read_escape(item_start)? {
                    Escape::Char(c) => ClassToken::Char(c),
                    Escape::Shorthand(s) => ClassToken::Shorthand(s),
                    Escape::WordBoundary
                    | Escape::NonWordBoundary
                    | Escape::Backreference(_) => return Err(self.invalid_escape(item_start)),
                },
                '-' => ClassToken::Hyphen,
                c => ClassToken::Char(c),
            };
            items.push(Spanned::new(token, Span::new(item_start, self.position)));
        }

        Ok(Token::Class { negated, items })
    }
}
