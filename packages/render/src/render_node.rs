//! # Render Nodes
//!
//! Presentation-side mirror of the model. Attributes are resolved into an
//! inherited style, blocks gain a synthetic line-break leaf, and open/close
//! boundaries disappear: a render container's size is just the sum of its
//! children.
//!
//! Each node also records the model-space size of the subtree it mirrors, so
//! offsets can be translated without touching the model.

use folio_model::{ComponentRegistry, LayoutRole, NodeKey, Style, Tree};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RenderKind {
    Container,
    Text,
    /// Synthetic end-of-block marker: one render unit, no model units
    LineBreak,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderNode {
    pub id: String,
    pub component: String,
    pub kind: RenderKind,
    pub role: LayoutRole,
    pub style: Style,
    pub text: String,
    pub children: Vec<RenderNode>,
    pub size: usize,
    pub model_size: usize,
    /// Content changed since the layout last consumed this node
    pub needs_layout: bool,
}

impl RenderNode {
    pub fn line_break(block_id: &str, style: &Style) -> Self {
        Self {
            id: format!("{}:break", block_id),
            component: "break".to_string(),
            kind: RenderKind::LineBreak,
            role: LayoutRole::Inline,
            style: style.clone(),
            text: String::new(),
            children: Vec::new(),
            size: 1,
            model_size: 0,
            needs_layout: true,
        }
    }

    pub fn is_line_break(&self) -> bool {
        self.kind == RenderKind::LineBreak
    }

    /// Recompute this node's sizes from its own content
    pub fn recompute(&mut self) {
        match self.kind {
            RenderKind::Text => {
                self.size = self.text.chars().count();
                self.model_size = self.size;
            }
            RenderKind::LineBreak => {
                self.size = 1;
                self.model_size = 0;
            }
            RenderKind::Container => {
                self.size = self.children.iter().map(|child| child.size).sum();
                self.model_size = self.children.iter().map(|child| child.model_size).sum::<usize>() + 2;
            }
        }
    }

    /// Leaves (text and line breaks) in document order
    pub fn leaves(&self) -> Vec<&RenderNode> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a RenderNode>) {
        if self.kind == RenderKind::Container {
            for child in &self.children {
                child.collect_leaves(out);
            }
        } else {
            out.push(self);
        }
    }

    /// Child index path from this node to the node with `id`
    pub fn find_path(&self, id: &str) -> Option<Vec<usize>> {
        if self.id == id {
            return Some(Vec::new());
        }
        for (index, child) in self.children.iter().enumerate() {
            if let Some(mut path) = child.find_path(id) {
                path.insert(0, index);
                return Some(path);
            }
        }
        None
    }

    pub fn find(&self, id: &str) -> Option<&RenderNode> {
        let path = self.find_path(id)?;
        Some(self.at_path(&path))
    }

    pub(crate) fn at_path(&self, path: &[usize]) -> &RenderNode {
        path.iter().fold(self, |node, index| &node.children[*index])
    }

    /// Clear `needs_layout` on every flagged node. Unflagged subtrees are
    /// already clean.
    pub fn clear_layout_flags(&mut self) {
        if !self.needs_layout {
            return;
        }
        self.needs_layout = false;
        for child in &mut self.children {
            child.clear_layout_flags();
        }
    }
}

/// Build the render subtree for a model node. `inherited` is the resolved
/// style of the render parent.
pub fn build_tree(
    model: &Tree,
    key: NodeKey,
    registry: &ComponentRegistry,
    inherited: &Style,
) -> RenderNode {
    let identity = model.identity(key);
    let hints = registry.render_hints(identity);

    let mut style = inherited.clone();
    style.extend(hints.style);

    let mut node = RenderNode {
        id: identity.id.clone(),
        component: identity.component.clone(),
        kind: RenderKind::Container,
        role: hints.role,
        style,
        text: String::new(),
        children: Vec::new(),
        size: 0,
        model_size: 0,
        needs_layout: true,
    };

    if model.is_leaf(key) {
        node.kind = RenderKind::Text;
        node.text = model.text_of(key).to_string();
    } else {
        node.children = model
            .children(key)
            .iter()
            .map(|child| build_tree(model, *child, registry, &node.style))
            .collect();
        if hints.line_break {
            node.children.push(RenderNode::line_break(&node.id, &node.style));
        }
    }

    node.recompute();
    node
}
