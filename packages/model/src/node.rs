//! # Nodes
//!
//! Owned node values. These are what fragments carry, what the markup parser
//! produces before a [`Tree`](crate::Tree) is assembled, and what the tree
//! hands back when a subtree is detached.
//!
//! ## Sizes
//!
//! A leaf's size is the number of chars in its text. A branch or root counts
//! its children plus one unit for each of its open and close boundaries, so
//! entering and leaving a branch is addressable.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute map, ordered so serialization is deterministic
pub type Attributes = BTreeMap<String, String>;

/// Structural shape of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Root,
    Branch,
    Leaf,
}

impl NodeKind {
    pub fn is_leaf(self) -> bool {
        matches!(self, NodeKind::Leaf)
    }
}

/// Everything that identifies a node apart from its content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub kind: NodeKind,
    pub component: String,
    #[serde(default)]
    pub part: String,
    pub id: String,
    #[serde(default)]
    pub attributes: Attributes,
}

impl Identity {
    /// Same component, part and attributes. Ids are ignored.
    pub fn mergeable_with(&self, other: &Identity) -> bool {
        self.kind == other.kind
            && self.component == other.component
            && self.part == other.part
            && self.attributes == other.attributes
    }
}

/// An owned document node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub identity: Identity,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    pub fn leaf(component: impl Into<String>, id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            identity: Identity {
                kind: NodeKind::Leaf,
                component: component.into(),
                part: String::new(),
                id: id.into(),
                attributes: Attributes::new(),
            },
            text: text.into(),
            children: Vec::new(),
        }
    }

    pub fn branch(component: impl Into<String>, id: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            identity: Identity {
                kind: NodeKind::Branch,
                component: component.into(),
                part: String::new(),
                id: id.into(),
                attributes: Attributes::new(),
            },
            text: String::new(),
            children,
        }
    }

    pub fn root(component: impl Into<String>, id: impl Into<String>, children: Vec<Node>) -> Self {
        let mut node = Self::branch(component, id, children);
        node.identity.kind = NodeKind::Root;
        node
    }

    /// A content-less copy of an identity, used to describe a node that is
    /// entered rather than inserted whole
    pub fn shell(identity: Identity) -> Self {
        Self {
            identity,
            text: String::new(),
            children: Vec::new(),
        }
    }

    pub fn with_part(mut self, part: impl Into<String>) -> Self {
        self.identity.part = part.into();
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.identity.attributes.insert(name.into(), value.into());
        self
    }

    pub fn kind(&self) -> NodeKind {
        self.identity.kind
    }

    pub fn id(&self) -> &str {
        &self.identity.id
    }

    pub fn is_leaf(&self) -> bool {
        self.identity.kind.is_leaf()
    }

    pub fn size(&self) -> usize {
        if self.is_leaf() {
            self.text.chars().count()
        } else {
            self.children.iter().map(Node::size).sum::<usize>() + 2
        }
    }

    /// Number of nodes in this subtree, including this one
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Node::count).sum::<usize>()
    }
}
