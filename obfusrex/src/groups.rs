//! Group registry for tracking capture groups
//!
//! The parser registers every capturing group here in order of its opening
//! delimiter, which fixes the group's index. The registry is then used to:
//! - Reject duplicate group names
//! - Validate backreferences once the whole pattern has been read
//! - Check that obfuscation left the capture layout untouched

use std::collections::HashMap;

use thiserror::Error;

use crate::ast::{BackrefTarget, GroupKind, Node};
use crate::error::ParseErrorKind;

/// Information about a capture group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    /// The index of the group (1-based, matching `\1`, `\2`, ...)
    pub index: u32,
    /// The name of the group, for named groups
    pub name: Option<String>,
}

/// Registry for tracking capture groups
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRegistry {
    groups: Vec<GroupInfo>,
    name_to_index: HashMap<String, u32>,
    next_index: u32,
}

impl Default for GroupRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        GroupRegistry {
            groups: Vec::new(),
            name_to_index: HashMap::new(),
            next_index: 1,
        }
    }

    /// Register a new capture group and return its index
    ///
    /// # Errors
    /// Returns an error if the name is already in use
    pub fn register_group(&mut self, name: Option<String>) -> Result<u32, GroupRegistryError> {
        if let Some(ref group_name) = name {
            if self.name_to_index.contains_key(group_name) {
                return Err(GroupRegistryError::DuplicateGroupName(group_name.clone()));
            }
            self.name_to_index.insert(group_name.clone(), self.next_index);
        }

        let index = self.next_index;
        self.next_index += 1;
        self.groups.push(GroupInfo { index, name });
        Ok(index)
    }

    /// Get group index by name
    pub fn get_by_name(&self, name: &str) -> Option<u32> {
        self.name_to_index.get(name).copied()
    }

    /// Get the total number of capture groups
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Resolve a backreference to the index of the group it names
    pub fn resolve(&self, target: &BackrefTarget) -> Result<u32, GroupRegistryError> {
        match target {
            BackrefTarget::Number(n) => {
                if *n == 0 || *n >= self.next_index {
                    Err(GroupRegistryError::InvalidBackreference(format!("\\{n}")))
                } else {
                    Ok(*n)
                }
            }
            BackrefTarget::Name(name) => self
                .get_by_name(name)
                .ok_or_else(|| GroupRegistryError::InvalidBackreference(format!("\\k<{name}>"))),
        }
    }
}

/// Errors that can occur in the group registry
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GroupRegistryError {
    /// A group name is used more than once
    #[error("duplicate group name: {0}")]
    DuplicateGroupName(String),
    /// A backreference refers to a non-existent group
    #[error("invalid backreference: {0}")]
    InvalidBackreference(String),
}

impl From<GroupRegistryError> for ParseErrorKind {
    fn from(err: GroupRegistryError) -> Self {
        match err {
            GroupRegistryError::DuplicateGroupName(name) => ParseErrorKind::DuplicateGroupName(name),
            GroupRegistryError::InvalidBackreference(target) => {
                ParseErrorKind::InvalidBackreference(target)
            }
        }
    }
}

/// A visitor that lists the capture groups of a tree
///
/// Groups are reported in pre-order, which is the order of their opening
/// delimiters in the serialized pattern.
pub struct GroupCollector;

impl GroupCollector {
    /// Collect all capture groups of `node`
    pub fn collect(node: &Node) -> Vec<GroupInfo> {
        let mut groups = Vec::new();
        Self::visit(node, &mut groups);
        groups
    }

    fn visit(node: &Node, groups: &mut Vec<GroupInfo>) {
        match node {
            Node::Literal(_)
            | Node::Dot
            | Node::Class(_)
            | Node::Anchor(_)
            | Node::Shorthand(_)
            | Node::SetFlags(_)
            | Node::Backreference(_) => {}

            Node::Sequence(nodes) => {
                for node in nodes {
                    Self::visit(node, groups);
                }
            }

            Node::Alternation(branches) => {
                for node in branches.iter().flatten() {
                    Self::visit(node, groups);
                }
            }

            Node::Group { kind, body } => {
                match kind {
                    GroupKind::Capturing(index) => groups.push(GroupInfo {
                        index: *index,
                        name: None,
                    }),
                    GroupKind::Named { name, index } => groups.push(GroupInfo {
                        index: *index,
                        name: Some(name.clone()),
                    }),
                    GroupKind::NonCapturing | GroupKind::Modifiers(_) => {}
                }
                Self::visit(body, groups);
            }

            Node::Quantified { body, .. } | Node::Lookaround { body, .. } => {
                Self::visit(body, groups)
            }
        }
    }
}
