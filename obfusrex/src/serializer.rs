//! Rendering trees back into regex source
//!
//! Serialization is total: every tree renders to some pattern, and for trees
//! coming out of the parser the rendering describes the same language as the
//! source. Escaping is kept to what the grammar needs, so output reads close
//! to hand-written patterns.

use std::fmt::{self, Write};

use crate::ast::{
    Anchor, Ast, BackrefTarget, CharClass, ClassItem, GroupKind, LookaroundKind, Modifiers, Node,
    Notation, Quantifier, Repetition, Shorthand,
};

/// Render a node as regex source
///
/// # Example
/// ```
/// use obfusrex::ast::Node;
/// use obfusrex::serializer::serialize;
///
/// let node = Node::quantified(Node::literal('.'), obfusrex::ast::Quantifier::plus(true));
/// assert_eq!(serialize(&node), r"\.+");
/// ```
pub fn serialize(node: &Node) -> String {
    node.to_string()
}

impl fmt::Display for Ast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Literal(c) => write_literal(f, *c),
            Node::Dot => f.write_char('.'),
            Node::Class(class) => write!(f, "{class}"),
            Node::Anchor(anchor) => f.write_str(match anchor {
                Anchor::Start => "^",
                Anchor::End => "$",
                Anchor::WordBoundary => "\\b",
                Anchor::NonWordBoundary => "\\B",
            }),
            Node::Shorthand(shorthand) => write!(f, "{shorthand}"),
            Node::Sequence(nodes) => write_sequence(f, nodes),
            Node::Alternation(branches) => {
                for (i, branch) in branches.iter().enumerate() {
                    if i > 0 {
                        f.write_char('|')?;
                    }
                    write_sequence(f, branch)?;
                }
                Ok(())
            }
            Node::Group { kind, body } => {
                match kind {
                    GroupKind::Capturing(_) => f.write_char('(')?,
                    GroupKind::Named { name, .. } => write!(f, "(?<{name}>")?,
                    GroupKind::NonCapturing => f.write_str("(?:")?,
                    GroupKind::Modifiers(modifiers) => write!(f, "(?{modifiers}:")?,
                }
                write!(f, "{body})")
            }
            Node::SetFlags(modifiers) => write!(f, "(?{modifiers})"),
            Node::Quantified { body, quantifier } => {
                if body.is_atom() {
                    write!(f, "{body}")?;
                } else {
                    write!(f, "(?:{body})")?;
                }
                write!(f, "{quantifier}")
            }
            Node::Backreference(target) => write!(f, "{target}"),
            Node::Lookaround {
                kind,
                negated,
                body,
            } => {
                let open = match (kind, negated) {
                    (LookaroundKind::Ahead, false) => "(?=",
                    (LookaroundKind::Ahead, true) => "(?!",
                    (LookaroundKind::Behind, false) => "(?<=",
                    (LookaroundKind::Behind, true) => "(?<!",
                };
                write!(f, "{open}{body})")
            }
        }
    }
}

/// Write the elements of a sequence, grouping those that would otherwise
/// bind differently once concatenated
fn write_sequence(f: &mut fmt::Formatter<'_>, nodes: &[Node]) -> fmt::Result {
    for (i, node) in nodes.iter().enumerate() {
        let needs_group = match node {
            Node::Alternation(_) => true,
            Node::Sequence(inner) => inner.len() > 1,
            // `\1` followed by `0` would read back as `\10`
            Node::Backreference(BackrefTarget::Number(_)) => {
                nodes.get(i + 1).is_some_and(starts_with_digit)
            }
            _ => false,
        };

        if needs_group {
            write!(f, "(?:{node})")?;
        } else {
            write!(f, "{node}")?;
        }
    }
    Ok(())
}

fn starts_with_digit(node: &Node) -> bool {
    match node {
        Node::Literal(c) => c.is_ascii_digit(),
        Node::Quantified { body, .. } => body.is_atom() && starts_with_digit(body),
        Node::Sequence(nodes) => nodes.len() == 1 && starts_with_digit(&nodes[0]),
        _ => false,
    }
}

fn write_literal(f: &mut fmt::Formatter<'_>, c: char) -> fmt::Result {
    match c {
        '\\' | '.' | '+' | '*' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$' => {
            write!(f, "\\{c}")
        }
        c => write_plain_char(f, c),
    }
}

/// Write a character that needs no metacharacter escaping
fn write_plain_char(f: &mut fmt::Formatter<'_>, c: char) -> fmt::Result {
    match c {
        '\t' => f.write_str("\\t"),
        '\n' => f.write_str("\\n"),
        '\r' => f.write_str("\\r"),
        c if c.is_control() => write_code_point(f, c),
        c => f.write_char(c),
    }
}

fn write_code_point(f: &mut fmt::Formatter<'_>, c: char) -> fmt::Result {
    write!(f, "\\u{{{:x}}}", c as u32)
}

impl fmt::Display for CharClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('[')?;
        if self.negated {
            f.write_char('^')?;
        }

        let last = self.items.len().saturating_sub(1);
        for (i, item) in self.items.iter().enumerate() {
            match item {
                ClassItem::Char(c) => {
                    // A trailing `-` after an unescaped leading one would read as `--`
                    let edge = i == 0
                        || (i == last && !matches!(self.items[i - 1], ClassItem::Char('-')));
                    self.write_member(f, *c, i == 0, edge)?
                }
                ClassItem::Range(lo, hi) => {
                    self.write_member(f, *lo, true, false)?;
                    f.write_char('-')?;
                    self.write_member(f, *hi, true, false)?;
                }
                ClassItem::Shorthand(shorthand) => write!(f, "{shorthand}")?,
            }
        }

        f.write_char(']')
    }
}

impl CharClass {
    /// Write one character of the class. `first` marks a position where `^`
    /// would read as negation; `edge` a position where `-` is literal.
    fn write_member(
        &self,
        f: &mut fmt::Formatter<'_>,
        c: char,
        first: bool,
        edge: bool,
    ) -> fmt::Result {
        if self.notation == Notation::CodePoint {
            return write_code_point(f, c);
        }

        match c {
            '\\' | ']' | '[' | '&' | '~' => write!(f, "\\{c}"),
            '^' if first => f.write_str("\\^"),
            '-' if !edge => f.write_str("\\-"),
            c => write_plain_char(f, c),
        }
    }
}

impl fmt::Display for Shorthand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shorthand::Digit => f.write_str("\\d"),
            Shorthand::NotDigit => f.write_str("\\D"),
            Shorthand::Word => f.write_str("\\w"),
            Shorthand::NotWord => f.write_str("\\W"),
            Shorthand::Space => f.write_str("\\s"),
            Shorthand::NotSpace => f.write_str("\\S"),
            Shorthand::Property { name, negated } => {
                write!(f, "\\{}{{{name}}}", if *negated { 'P' } else { 'p' })
            }
        }
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for flag in self.enable.iter() {
            f.write_char(flag.as_char())?;
        }
        if !self.disable.is_empty() {
            f.write_char('-')?;
            for flag in self.disable.iter() {
                f.write_char(flag.as_char())?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Quantifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.notation {
            Repetition::Star => f.write_char('*')?,
            Repetition::Plus => f.write_char('+')?,
            Repetition::Question => f.write_char('?')?,
            Repetition::Braces => match self.max {
                Some(max) if max == self.min => write!(f, "{{{}}}", self.min)?,
                Some(max) => write!(f, "{{{},{max}}}", self.min)?,
                None => write!(f, "{{{},}}", self.min)?,
            },
        }
        if !self.greedy {
            f.write_char('?')?;
        }
        Ok(())
    }
}

impl fmt::Display for BackrefTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackrefTarget::Number(n) => write!(f, "\\{n}"),
            BackrefTarget::Name(name) => write!(f, "\\k<{name}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn round_trip(pattern: &str) -> String {
        parse(pattern).unwrap().to_string()
    }

    #[test]
    fn test_round_trip_is_stable() {
        for pattern in [
            "abc",
            "a|b|",
            "(a)(?:b)(?<n>c)",
            r"^\d+\b\s*$",
            "a*?b+c?d{2}e{2,}f{2,5}?",
            "(?=a)(?!b)(?<=c)(?<!d)",
            r"(a)\1\k<n>(?<n>x)",
            "[a-z0-9_]",
            r"[^\]a]",
            r"\p{Greek}\P{L}",
            "(?i)a(?s-m:.)",
        ] {
            assert_eq!(round_trip(pattern), pattern, "pattern: {pattern}");
        }
    }

    #[test]
    fn test_literal_escaping() {
        assert_eq!(
            serialize(&Node::Sequence(
                r"\.+*?()|[]{}^$".chars().map(Node::literal).collect()
            )),
            r"\\\.\+\*\?\(\)\|\[\]\{\}\^\$"
        );
        assert_eq!(serialize(&Node::literal('\t')), r"\t");
        assert_eq!(serialize(&Node::literal('\u{7}')), r"\u{7}");
        assert_eq!(serialize(&Node::literal('é')), "é");
        assert_eq!(serialize(&Node::literal('-')), "-");
    }

    #[test]
    fn test_class_escaping() {
        let class = Node::class(
            false,
            vec![
                ClassItem::Char('^'),
                ClassItem::Char('-'),
                ClassItem::Char('&'),
                ClassItem::Char('^'),
                ClassItem::Char('-'),
            ],
        );
        assert_eq!(serialize(&class), r"[\^\-\&^-]");

        let class = Node::class(false, vec![ClassItem::Char('-'), ClassItem::Char('a')]);
        assert_eq!(serialize(&class), "[-a]");

        let class = Node::class(false, vec![ClassItem::Range('-', '/')]);
        assert_eq!(serialize(&class), r"[\--/]");

        let class = Node::class(false, vec![ClassItem::Char('-'), ClassItem::Char('-')]);
        assert_eq!(serialize(&class), r"[-\-]");
    }

    #[test]
    fn test_class_never_renders_set_operators() {
        let class = Node::class(
            false,
            vec![
                ClassItem::Char('&'),
                ClassItem::Char('&'),
                ClassItem::Char('~'),
                ClassItem::Char('~'),
                ClassItem::Char('['),
                ClassItem::Char('-'),
                ClassItem::Char('-'),
            ],
        );
        let rendered = serialize(&class);
        assert_eq!(rendered, r"[\&\&\~\~\[\-\-]");
        assert_eq!(parse(&rendered).unwrap().root, class);
    }

    #[test]
    fn test_code_point_class() {
        let class = Node::Class(CharClass {
            negated: true,
            items: vec![
                ClassItem::Range('x', 'z'),
                ClassItem::Shorthand(Shorthand::Word),
                ClassItem::Char('\u{1F600}'),
            ],
            notation: Notation::CodePoint,
        });
        assert_eq!(serialize(&class), r"[^\u{78}-\u{7a}\w\u{1f600}]");
    }

    #[test]
    fn test_grouping_is_inserted() {
        let node = Node::quantified(
            Node::Sequence(vec![Node::literal('a'), Node::literal('b')]),
            Quantifier::star(true),
        );
        assert_eq!(serialize(&node), "(?:ab)*");

        let node = Node::quantified(
            Node::quantified(Node::literal('a'), Quantifier::plus(true)),
            Quantifier::question(true),
        );
        assert_eq!(serialize(&node), "(?:a+)?");

        let node = Node::Sequence(vec![
            Node::literal('x'),
            Node::Alternation(vec![vec![Node::literal('a')], vec![Node::literal('b')]]),
        ]);
        assert_eq!(serialize(&node), "x(?:a|b)");

        assert_eq!(
            serialize(&Node::quantified(Node::empty(), Quantifier::star(true))),
            "(?:)*"
        );
    }

    #[test]
    fn test_backreference_before_digit() {
        let ast = parse(r"(a)\1\x30").unwrap();
        assert_eq!(ast.to_string(), r"(a)(?:\1)0");
        assert_eq!(parse(&ast.to_string()).unwrap().to_string(), r"(a)(?:\1)0");

        let node = Node::Sequence(vec![
            Node::backreference(1),
            Node::quantified(Node::literal('2'), Quantifier::star(true)),
        ]);
        assert_eq!(serialize(&node), r"(?:\1)2*");
        assert_eq!(
            serialize(&Node::Sequence(vec![Node::backreference(1), Node::literal('a')])),
            r"\1a"
        );
    }

    #[test]
    fn test_brace_forms() {
        assert_eq!(Quantifier::braces(3, Some(3), true).to_string(), "{3}");
        assert_eq!(Quantifier::braces(0, None, false).to_string(), "{0,}?");
        assert_eq!(Quantifier::question(true).to_braces().to_string(), "{0,1}");
    }

    #[test]
    fn test_named_groups_render_angle_form() {
        assert_eq!(round_trip("(?P<n>a)"), "(?<n>a)");
    }

    #[test]
    fn test_escaped_round_trip() {
        let pattern = r"a\.b\{2\}[\]\\]\n";
        let ast = parse(pattern).unwrap();
        let reparsed = parse(&ast.to_string()).unwrap();
        assert_eq!(reparsed.root, ast.root);
    }
}
