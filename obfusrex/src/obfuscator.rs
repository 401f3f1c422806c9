//! The obfuscation engine
//!
//! Rewrites a parsed tree into an equivalent one that no longer shows its
//! literal content. The engine makes a single depth-first pass: children are
//! rewritten first and the rule for the parent then wraps or replaces the
//! result, so nodes produced by a rule are never visited again.
//!
//! | Node                       | Rewrite                                   |
//! |----------------------------|-------------------------------------------|
//! | `a`                        | `[\u{61}]`                                |
//! | `[abc]`, `[a-c]`           | `(?:[a]\|[b]\|[c])`                       |
//! | `[^x-z]`                   | `[^\u{78}-\u{7a}]`                        |
//! | `.`                        | `[^\n]`, or `[\s\S]` in dot-all mode      |
//! | `a*`, `a+`, `a?`           | `{0,}`, `{1,}`, `{0,1}`                   |
//! | `\1`, `\k<name>`           | `(?:\1)`, `(?:\k<name>)`                  |
//! | `(?=a)`                    | `(?=(?:[\u{61}]))`                        |
//!
//! Groups keep their delimiter, index and name. Anchors, shorthand classes
//! and inline modifiers are left as they are.

use std::collections::HashSet;

use tracing::debug;

use crate::ast::{
    Ast, CharClass, ClassItem, Flag, GroupKind, Modifiers, Node, Notation, Shorthand,
};
use crate::config::Options;
use crate::error::ObfuscationError;

/// Applies the rewrite rules to a tree
#[derive(Debug, Clone, Copy, Default)]
pub struct Obfuscator {
    options: Options,
}

impl Obfuscator {
    /// Create an engine with the given options
    pub fn new(options: Options) -> Self {
        Obfuscator { options }
    }

    /// Rewrite a whole tree
    ///
    /// The capture layout of the result is the one of `ast`. Dots are read in
    /// dot-all mode when either the tree was parsed that way or the options
    /// ask for it.
    ///
    /// # Errors
    ///
    /// Returns [`ObfuscationError::UnsupportedConstruct`] when the pattern
    /// switches on extended mode, whose whitespace and comment rules the
    /// tree does not model. Nothing is returned in that case.
    pub fn obfuscate(&self, ast: &Ast) -> Result<Ast, ObfuscationError> {
        let context = ast.dot_all || self.options.dot_all;
        let mut dot_all = context;
        let root = self.rewrite(&ast.root, &mut dot_all)?;

        debug!(captures = ast.capture_count(), dot_all = context, "rewrite complete");

        Ok(Ast {
            root,
            groups: ast.groups.clone(),
            dot_all: context,
        })
    }

    /// Rewrite one node. `dot_all` is the dot-all state at this point of the
    /// enclosing group; unscoped modifiers update it in place.
    fn rewrite(&self, node: &Node, dot_all: &mut bool) -> Result<Node, ObfuscationError> {
        let rewritten = match node {
            Node::Literal(c) => code_point(*c),
            Node::Dot => any_char(*dot_all),
            Node::Class(class) => self.rewrite_class(class),
            Node::Anchor(_) | Node::Shorthand(_) => node.clone(),

            Node::Sequence(nodes) => Node::Sequence(self.rewrite_all(nodes, dot_all)?),

            Node::Alternation(branches) => {
                // An unscoped modifier in one branch stays active in the next
                let mut rewritten = Vec::with_capacity(branches.len());
                for branch in branches {
                    rewritten.push(self.rewrite_all(branch, dot_all)?);
                }
                Node::Alternation(rewritten)
            }

            Node::SetFlags(modifiers) => {
                check_modifiers(modifiers)?;
                if let Some(enabled) = modifiers.effect(Flag::DotAll) {
                    *dot_all = enabled;
                }
                node.clone()
            }

            Node::Group { kind, body } => {
                let mut scoped = *dot_all;
                if let GroupKind::Modifiers(modifiers) = kind {
                    check_modifiers(modifiers)?;
                    if let Some(enabled) = modifiers.effect(Flag::DotAll) {
                        scoped = enabled;
                    }
                }
                Node::group(kind.clone(), self.rewrite(body, &mut scoped)?)
            }

            Node::Quantified { body, quantifier } => {
                let mut scoped = *dot_all;
                Node::quantified(self.rewrite(body, &mut scoped)?, quantifier.to_braces())
            }

            Node::Backreference(_) => Node::non_capturing(node.clone()),

            Node::Lookaround {
                kind,
                negated,
                body,
            } => {
                let mut scoped = *dot_all;
                let body = self.rewrite(body, &mut scoped)?;
                Node::lookaround(*kind, *negated, Node::non_capturing(body))
            }
        };

        Ok(rewritten)
    }

    fn rewrite_all(&self, nodes: &[Node], dot_all: &mut bool) -> Result<Vec<Node>, ObfuscationError> {
        let mut rewritten = Vec::with_capacity(nodes.len());
        for node in nodes {
            rewritten.push(self.rewrite(node, dot_all)?);
        }
        Ok(rewritten)
    }

    fn rewrite_class(&self, class: &CharClass) -> Node {
        if class.negated {
            return in_code_points(class);
        }

        match self.enumerate(&class.items) {
            Some(members) => {
                let branches = members
                    .into_iter()
                    .map(|member| vec![Node::class(false, vec![member])])
                    .collect();
                Node::non_capturing(Node::Alternation(branches))
            }
            None => {
                debug!(
                    items = class.items.len(),
                    limit = self.options.max_class_expansion,
                    "class too large to enumerate, keeping it in code-point notation"
                );
                in_code_points(class)
            }
        }
    }

    /// List the distinct members of a class, ranges expanded, in first
    /// occurrence order. `None` once the list would outgrow the limit.
    fn enumerate(&self, items: &[ClassItem]) -> Option<Vec<ClassItem>> {
        let limit = self.options.max_class_expansion;
        let mut seen = HashSet::new();
        let mut members = Vec::new();

        for item in items {
            match item {
                ClassItem::Char(c) => {
                    if seen.insert(*c) {
                        members.push(ClassItem::Char(*c));
                    }
                }
                ClassItem::Range(lo, hi) => {
                    for c in *lo..=*hi {
                        if seen.insert(c) {
                            members.push(ClassItem::Char(c));
                            if members.len() > limit {
                                return None;
                            }
                        }
                    }
                }
                ClassItem::Shorthand(_) => {
                    if !members.contains(item) {
                        members.push(item.clone());
                    }
                }
            }

            if members.len() > limit {
                return None;
            }
        }

        Some(members)
    }
}

/// `c` as a one-member class written in code-point notation
fn code_point(c: char) -> Node {
    Node::Class(CharClass {
        negated: false,
        items: vec![ClassItem::Char(c)],
        notation: Notation::CodePoint,
    })
}

/// The class matching what `.` matches
fn any_char(dot_all: bool) -> Node {
    if dot_all {
        Node::class(
            false,
            vec![
                ClassItem::Shorthand(Shorthand::Space),
                ClassItem::Shorthand(Shorthand::NotSpace),
            ],
        )
    } else {
        Node::class(true, vec![ClassItem::Char('\n')])
    }
}

fn in_code_points(class: &CharClass) -> Node {
    Node::Class(CharClass {
        notation: Notation::CodePoint,
        ..class.clone()
    })
}

fn check_modifiers(modifiers: &Modifiers) -> Result<(), ObfuscationError> {
    if modifiers.enable.contains(Flag::Extended) {
        return Err(ObfuscationError::UnsupportedConstruct(
            "extended mode flag `x`".to_string(),
        ));
    }
    Ok(())
}
