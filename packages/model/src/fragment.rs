//! # Fragments
//!
//! Units of content that are inserted into or removed from a tree.
//!
//! A fragment is either text (depth 0, spliced into a leaf) or a list of
//! nodes at some depth `d > 0`, placed as children `d` levels above the leaf
//! level of the position it is applied at. A sequence of fragments mirrors a
//! slice of a balanced token stream: depths first rise (leaving nodes) and
//! then fall (entering nodes).
//!
//! ## Open ends
//!
//! A node list may be `open`: its last node is not inserted whole but
//! entered. Its identity is given to the node that follows the insertion
//! point at that depth, and the fragments after it fill that node's start.
//! This is how a removal that joined two nodes records the identity of the
//! node that was joined away.

use crate::node::Node;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Fragment {
    Text { text: String },
    Nodes {
        depth: usize,
        nodes: Vec<Node>,
        #[serde(default)]
        open: bool,
    },
}

impl Fragment {
    pub fn text(text: impl Into<String>) -> Self {
        Fragment::Text { text: text.into() }
    }

    pub fn nodes(depth: usize, nodes: Vec<Node>) -> Self {
        Fragment::Nodes {
            depth,
            nodes,
            open: false,
        }
    }

    /// Node list whose last node is entered rather than closed
    pub fn open_nodes(depth: usize, nodes: Vec<Node>) -> Self {
        Fragment::Nodes {
            depth,
            nodes,
            open: true,
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            Fragment::Text { .. } => 0,
            Fragment::Nodes { depth, .. } => *depth,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Fragment::Nodes { open: true, .. })
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Fragment::Text { text } => text.is_empty(),
            Fragment::Nodes { nodes, .. } => nodes.is_empty(),
        }
    }

    /// Offset units this fragment contributes on its own. Open shells add
    /// nothing here: the boundaries they imply are counted by the split that
    /// creates them.
    pub fn size(&self) -> usize {
        match self {
            Fragment::Text { text } => text.chars().count(),
            Fragment::Nodes { nodes, open, .. } => {
                let whole = if *open {
                    &nodes[..nodes.len().saturating_sub(1)]
                } else {
                    &nodes[..]
                };
                whole.iter().map(Node::size).sum()
            }
        }
    }
}

/// Whether depths rise and then fall, with open lists only on the falling
/// side
pub fn is_well_nested(fragments: &[Fragment]) -> bool {
    let mut falling = false;
    for pair in fragments.windows(2) {
        let (a, b) = (pair[0].depth(), pair[1].depth());
        if b < a {
            falling = true;
        } else if falling && b > a {
            return false;
        }
        if a == b && matches!(pair[0], Fragment::Nodes { .. }) {
            // Adjacent lists at one depth must be a single list
            return false;
        }
        if pair[0].is_open() && b >= a {
            return false;
        }
    }
    true
}
