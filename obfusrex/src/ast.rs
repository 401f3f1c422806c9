//! Abstract Syntax Tree (AST) for regex patterns
//!
//! This module defines the node vocabulary shared by the parser, the
//! obfuscation engine and the serializer. Supports:
//! - Literals, character classes, dot, shorthand classes
//! - Quantifiers (*, +, ?, {m}, {m,}, {m,n}) in greedy and lazy form
//! - Groups (capturing, named, non-capturing, inline modifiers)
//! - Alternation, anchors, backreferences and lookarounds
//!
//! Trees are built once and never mutated; rewriting produces a new tree.

use crate::groups::GroupRegistry;

/// A parsed pattern together with its capture bookkeeping
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    /// Root of the tree
    pub root: Node,
    /// Every capturing group, in order of its opening delimiter
    pub groups: GroupRegistry,
    /// Whether `.` is interpreted in dot-all mode at the top level
    pub dot_all: bool,
}

impl Ast {
    /// Number of capturing groups in the pattern
    pub fn capture_count(&self) -> usize {
        self.groups.group_count()
    }
}

/// A node in the AST
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A single literal character
    Literal(char),

    /// Any character (dot)
    Dot,

    /// A character class `[abc]`, `[^abc]` or `[a-z]`
    Class(CharClass),

    /// A zero-width anchor
    Anchor(Anchor),

    /// A shorthand class used outside brackets (`\d`, `\w`, `\p{L}`, ...)
    Shorthand(Shorthand),

    /// Concatenation
    Sequence(Vec<Node>),

    /// Disjunction; each branch is a sequence and the first match wins
    Alternation(Vec<Vec<Node>>),

    /// A parenthesised group
    Group {
        /// What kind of group this is
        kind: GroupKind,
        /// The pattern inside the group
        body: Box<Node>,
    },

    /// Unscoped inline modifiers `(?i)`, active until the enclosing group ends
    SetFlags(Modifiers),

    /// Quantified expression (e.g., a*, a+?, a{3,5})
    Quantified {
        /// The expression being quantified
        body: Box<Node>,
        /// The quantifier
        quantifier: Quantifier,
    },

    /// Backreference to a capturing group
    Backreference(BackrefTarget),

    /// Lookahead or lookbehind assertion
    Lookaround {
        /// Direction of the assertion
        kind: LookaroundKind,
        /// Whether the assertion is negative
        negated: bool,
        /// The asserted pattern
        body: Box<Node>,
    },
}

/// A character class
#[derive(Debug, Clone, PartialEq)]
pub struct CharClass {
    /// Whether the class is negated `[^...]`
    pub negated: bool,
    /// The members of the class, in source order
    pub items: Vec<ClassItem>,
    /// How character members are written out
    pub notation: Notation,
}

/// A member of a character class
#[derive(Debug, Clone, PartialEq)]
pub enum ClassItem {
    /// A single character
    Char(char),
    /// An inclusive character range
    Range(char, char),
    /// A shorthand class (`\d`, `\w`, ...)
    Shorthand(Shorthand),
}

/// Rendering style for the characters of a class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Notation {
    /// Characters as themselves, escaped only where required
    #[default]
    Plain,
    /// Every character as a `\u{hex}` escape
    CodePoint,
}

/// Built-in shorthand classes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shorthand {
    /// `\d`
    Digit,
    /// `\D`
    NotDigit,
    /// `\w`
    Word,
    /// `\W`
    NotWord,
    /// `\s`
    Space,
    /// `\S`
    NotSpace,
    /// `\p{Name}` or, negated, `\P{Name}`
    Property {
        /// Property or category name, e.g. `L` or `Greek`
        name: String,
        /// Whether the property is negated
        negated: bool,
    },
}

/// Zero-width anchors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// `^`
    Start,
    /// `$`
    End,
    /// `\b`
    WordBoundary,
    /// `\B`
    NonWordBoundary,
}

/// Kinds of group
#[derive(Debug, Clone, PartialEq)]
pub enum GroupKind {
    /// `(...)` with its 1-based index
    Capturing(u32),
    /// `(?<name>...)` with its 1-based index
    Named {
        /// The group name
        name: String,
        /// The group index
        index: u32,
    },
    /// `(?:...)`
    NonCapturing,
    /// `(?i-s:...)`
    Modifiers(Modifiers),
}

/// Inline matching flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    /// `i`
    CaseInsensitive,
    /// `m`
    MultiLine,
    /// `s`
    DotAll,
    /// `x`
    Extended,
}

impl Flag {
    /// Parse a flag letter
    pub fn from_char(c: char) -> Option<Flag> {
        match c {
            'i' => Some(Flag::CaseInsensitive),
            'm' => Some(Flag::MultiLine),
            's' => Some(Flag::DotAll),
            'x' => Some(Flag::Extended),
            _ => None,
        }
    }

    /// The flag letter
    pub fn as_char(self) -> char {
        match self {
            Flag::CaseInsensitive => 'i',
            Flag::MultiLine => 'm',
            Flag::DotAll => 's',
            Flag::Extended => 'x',
        }
    }
}

/// A set of inline modifier changes, e.g. `i-s`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    /// Flags switched on, in source order
    pub enable: FlagList,
    /// Flags switched off, in source order
    pub disable: FlagList,
}

impl Modifiers {
    /// The effect of these modifiers on a flag: `Some(true)` when enabled,
    /// `Some(false)` when disabled, `None` when untouched
    pub fn effect(&self, flag: Flag) -> Option<bool> {
        if self.enable.contains(flag) {
            Some(true)
        } else if self.disable.contains(flag) {
            Some(false)
        } else {
            None
        }
    }
}

/// An ordered, duplicate-free list of at most four flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlagList {
    flags: [Option<Flag>; 4],
    len: usize,
}

impl FlagList {
    /// Append a flag; returns `false` if it was already present
    pub fn push(&mut self, flag: Flag) -> bool {
        if self.contains(flag) {
            return false;
        }
        self.flags[self.len] = Some(flag);
        self.len += 1;
        true
    }

    /// Check whether a flag is present
    pub fn contains(&self, flag: Flag) -> bool {
        self.iter().any(|f| f == flag)
    }

    /// Iterate over the flags in source order
    pub fn iter(&self) -> impl Iterator<Item = Flag> + '_ {
        self.flags[..self.len].iter().flatten().copied()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl FromIterator<Flag> for FlagList {
    fn from_iter<I: IntoIterator<Item = Flag>>(iter: I) -> Self {
        let mut list = FlagList::default();
        for flag in iter {
            list.push(flag);
        }
        list
    }
}

/// A quantifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantifier {
    /// Minimum number of repetitions
    pub min: u32,
    /// Maximum number of repetitions, `None` when unbounded
    pub max: Option<u32>,
    /// Greedy (`*`) or lazy (`*?`)
    pub greedy: bool,
    /// The textual form the quantifier is written in
    pub notation: Repetition,
}

/// Textual form of a quantifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repetition {
    /// `*`
    Star,
    /// `+`
    Plus,
    /// `?`
    Question,
    /// `{m}`, `{m,}` or `{m,n}`
    Braces,
}

impl Quantifier {
    /// Zero or more (`*`)
    pub fn star(greedy: bool) -> Self {
        Quantifier {
            min: 0,
            max: None,
            greedy,
            notation: Repetition::Star,
        }
    }

    /// One or more (`+`)
    pub fn plus(greedy: bool) -> Self {
        Quantifier {
            min: 1,
            max: None,
            greedy,
            notation: Repetition::Plus,
        }
    }

    /// Zero or one (`?`)
    pub fn question(greedy: bool) -> Self {
        Quantifier {
            min: 0,
            max: Some(1),
            greedy,
            notation: Repetition::Question,
        }
    }

    /// Counted repetition in brace form
    pub fn braces(min: u32, max: Option<u32>, greedy: bool) -> Self {
        Quantifier {
            min,
            max,
            greedy,
            notation: Repetition::Braces,
        }
    }

    /// The same bounds re-expressed in brace form
    pub fn to_braces(self) -> Self {
        Quantifier {
            notation: Repetition::Braces,
            ..self
        }
    }
}

/// Target of a backreference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackrefTarget {
    /// `\1`, `\2`, ...
    Number(u32),
    /// `\k<name>`
    Name(String),
}

/// Direction of a lookaround
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookaroundKind {
    /// `(?=...)` / `(?!...)`
    Ahead,
    /// `(?<=...)` / `(?<!...)`
    Behind,
}

impl Node {
    /// Create a literal node
    pub fn literal(c: char) -> Self {
        Node::Literal(c)
    }

    /// Create a sequence, collapsing a single element to itself
    pub fn sequence(mut nodes: Vec<Node>) -> Self {
        if nodes.len() == 1 {
            nodes.remove(0)
        } else {
            Node::Sequence(nodes)
        }
    }

    /// Create an empty sequence (matches the empty string)
    pub fn empty() -> Self {
        Node::Sequence(Vec::new())
    }

    /// Create an alternation, collapsing a single branch to its sequence
    pub fn alternation(mut branches: Vec<Vec<Node>>) -> Self {
        if branches.len() == 1 {
            Node::sequence(branches.remove(0))
        } else {
            Node::Alternation(branches)
        }
    }

    /// Create a character class in plain notation
    pub fn class(negated: bool, items: Vec<ClassItem>) -> Self {
        Node::Class(CharClass {
            negated,
            items,
            notation: Notation::Plain,
        })
    }

    /// Create a quantified expression
    pub fn quantified(body: Node, quantifier: Quantifier) -> Self {
        Node::Quantified {
            body: Box::new(body),
            quantifier,
        }
    }

    /// Create a group of the given kind
    pub fn group(kind: GroupKind, body: Node) -> Self {
        Node::Group {
            kind,
            body: Box::new(body),
        }
    }

    /// Create a capturing group
    pub fn capturing(index: u32, body: Node) -> Self {
        Node::group(GroupKind::Capturing(index), body)
    }

    /// Create a named capturing group
    pub fn named(name: impl Into<String>, index: u32, body: Node) -> Self {
        Node::group(
            GroupKind::Named {
                name: name.into(),
                index,
            },
            body,
        )
    }

    /// Create a non-capturing group
    pub fn non_capturing(body: Node) -> Self {
        Node::group(GroupKind::NonCapturing, body)
    }

    /// Create a lookaround assertion
    pub fn lookaround(kind: LookaroundKind, negated: bool, body: Node) -> Self {
        Node::Lookaround {
            kind,
            negated,
            body: Box::new(body),
        }
    }

    /// Create a backreference by number
    pub fn backreference(n: u32) -> Self {
        Node::Backreference(BackrefTarget::Number(n))
    }

    /// Whether the node is a single syntactic unit that a quantifier can
    /// follow without extra grouping
    pub fn is_atom(&self) -> bool {
        match self {
            Node::Literal(_)
            | Node::Dot
            | Node::Class(_)
            | Node::Anchor(_)
            | Node::Shorthand(_)
            | Node::Group { .. }
            | Node::Backreference(_)
            | Node::Lookaround { .. } => true,
            Node::Sequence(nodes) => nodes.len() == 1 && nodes[0].is_atom(),
            Node::Alternation(_) | Node::SetFlags(_) | Node::Quantified { .. } => false,
        }
    }
}
