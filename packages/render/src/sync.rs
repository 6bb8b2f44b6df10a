//! # Render Tree Sync
//!
//! Keeps the render tree in step with the model one updated subtree at a
//! time. The subtree is rebuilt from the model and diffed against the old
//! render subtree; nodes the diff finds unchanged are marked as not needing
//! layout so the layout engine skips them.
//!
//! ## Matching
//!
//! Children are matched by id rather than by index, so inserting a block
//! does not flag every block after it.

use crate::error::{RenderError, RenderResult};
use crate::render_node::{build_tree, RenderNode};
use folio_model::{ComponentRegistry, Style, Tree};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RenderPatch {
    Insert { id: String, parent: String, index: usize },
    Remove { id: String },
    Replace { id: String },
    UpdateText { id: String },
    UpdateStyle { id: String },
}

/// Result of syncing one updated subtree
#[derive(Debug, Clone, PartialEq)]
pub struct RenderUpdate {
    /// Id of the rebuilt render subtree
    pub id: String,
    pub patches: Vec<RenderPatch>,
}

impl RenderUpdate {
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderTree {
    root: RenderNode,
}

impl RenderTree {
    pub fn build(model: &Tree, registry: &ComponentRegistry) -> Self {
        let root = build_tree(model, model.root(), registry, &Style::new());
        debug!(size = root.size, "[Render] Built render tree");
        Self { root }
    }

    pub fn root(&self) -> &RenderNode {
        &self.root
    }

    /// Size in render units
    pub fn size(&self) -> usize {
        self.root.size
    }

    pub fn model_size(&self) -> usize {
        self.root.model_size
    }

    pub fn find(&self, id: &str) -> Option<&RenderNode> {
        self.root.find(id)
    }

    /// Rebuild the subtree mirroring model node `id` and splice it in
    #[instrument(skip(self, model, registry))]
    pub fn sync(
        &mut self,
        model: &Tree,
        id: &str,
        registry: &ComponentRegistry,
    ) -> RenderResult<RenderUpdate> {
        let key = model.key_of(id)?;
        let path = self
            .root
            .find_path(id)
            .ok_or_else(|| RenderError::UnknownNode(id.to_string()))?;

        let inherited = match path.split_last() {
            Some((_, parent_path)) => self.root.at_path(parent_path).style.clone(),
            None => Style::new(),
        };
        let mut fresh = build_tree(model, key, registry, &inherited);

        let mut patches = Vec::new();
        let old = self.root.at_path(&path);
        let changed = diff_render_node(old, &mut fresh, &mut patches);

        splice(&mut self.root, &path, fresh, changed);

        debug!(
            id,
            patches = patches.len(),
            size = self.root.size,
            "[Render] Synced subtree"
        );
        Ok(RenderUpdate {
            id: id.to_string(),
            patches,
        })
    }

    /// Acknowledge that layout has consumed every pending change
    pub fn mark_laid_out(&mut self) {
        self.root.clear_layout_flags();
    }
}

/// Replace the node at `path`, then refresh ancestor sizes on the way out
fn splice(node: &mut RenderNode, path: &[usize], fresh: RenderNode, changed: bool) {
    match path.split_first() {
        None => *node = fresh,
        Some((index, rest)) => {
            splice(&mut node.children[*index], rest, fresh, changed);
            node.recompute();
            node.needs_layout |= changed;
        }
    }
}

/// Diff `new` against `old`, recording patches and setting `needs_layout`
/// on `new`. Returns whether anything under `new` changed.
fn diff_render_node(old: &RenderNode, new: &mut RenderNode, patches: &mut Vec<RenderPatch>) -> bool {
    if old.id != new.id || old.kind != new.kind || old.component != new.component {
        patches.push(RenderPatch::Replace { id: new.id.clone() });
        return true;
    }

    let mut changed = false;
    if old.style != new.style {
        patches.push(RenderPatch::UpdateStyle { id: new.id.clone() });
        changed = true;
    }
    if old.text != new.text {
        patches.push(RenderPatch::UpdateText { id: new.id.clone() });
        changed = true;
    }

    let old_children: HashMap<&str, &RenderNode> = old
        .children
        .iter()
        .map(|child| (child.id.as_str(), child))
        .collect();
    let mut order_changed = old.children.len() != new.children.len();

    for (index, child) in new.children.iter_mut().enumerate() {
        match old_children.get(child.id.as_str()) {
            Some(old_child) => {
                if old.children.get(index).map(|c| c.id.as_str()) != Some(child.id.as_str()) {
                    order_changed = true;
                }
                changed |= diff_render_node(old_child, child, patches);
            }
            None => {
                patches.push(RenderPatch::Insert {
                    id: child.id.clone(),
                    parent: new.id.clone(),
                    index,
                });
                changed = true;
            }
        }
    }

    for child in &old.children {
        if !new.children.iter().any(|c| c.id == child.id) {
            patches.push(RenderPatch::Remove {
                id: child.id.clone(),
            });
            changed = true;
        }
    }

    changed |= order_changed;
    new.needs_layout = changed;
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_model::{parse_markup, Node};

    fn registry() -> ComponentRegistry {
        ComponentRegistry::with_defaults()
    }

    fn two_paragraphs() -> Tree {
        parse_markup(
            r#"<doc id="d"><paragraph id="p1"><text id="a">one</text></paragraph><paragraph id="p2"><text id="b">two</text></paragraph></doc>"#,
            &registry(),
        )
        .unwrap()
    }

    #[test]
    fn test_sync_text_change_flags_only_that_block() {
        let mut model = two_paragraphs();
        let mut render = RenderTree::build(&model, &registry());
        render.mark_laid_out();

        let a = model.key_of("a").unwrap();
        model.splice_text(a, 3..3, "!").unwrap();
        let update = render.sync(&model, "p1", &registry()).unwrap();

        assert_eq!(update.patches, vec![RenderPatch::UpdateText { id: "a".to_string() }]);
        assert!(render.find("p1").unwrap().needs_layout);
        assert!(!render.find("p2").unwrap().needs_layout);
        assert!(!render.find("p1:break").unwrap().needs_layout);
        assert_eq!(render.size(), 9);
        assert_eq!(render.model_size(), model.size());
    }

    #[test]
    fn test_sync_inserted_block_does_not_flag_followers() {
        let mut model = two_paragraphs();
        let mut render = RenderTree::build(&model, &registry());
        render.mark_laid_out();

        let root = model.root();
        model
            .attach(
                root,
                1,
                vec![Node::branch("paragraph", "new", vec![Node::leaf("text", "n", "x")])],
            )
            .unwrap();
        let update = render.sync(&model, "d", &registry()).unwrap();

        assert_eq!(
            update.patches,
            vec![RenderPatch::Insert {
                id: "new".to_string(),
                parent: "d".to_string(),
                index: 1
            }]
        );
        assert!(render.find("new").unwrap().needs_layout);
        assert!(!render.find("p1").unwrap().needs_layout);
        assert!(!render.find("p2").unwrap().needs_layout);
    }

    #[test]
    fn test_sync_removed_block() {
        let mut model = two_paragraphs();
        let mut render = RenderTree::build(&model, &registry());

        let root = model.root();
        model.detach(root, 0..1);
        let update = render.sync(&model, "d", &registry()).unwrap();

        assert!(update
            .patches
            .contains(&RenderPatch::Remove { id: "p1".to_string() }));
        assert!(render.find("p1").is_none());
        assert_eq!(render.size(), 4);
    }

    #[test]
    fn test_sync_unknown_id() {
        let model = two_paragraphs();
        let mut render = RenderTree::build(&model, &registry());

        assert!(render.sync(&model, "zzz", &registry()).is_err());
    }

    #[test]
    fn test_patch_serializes_tagged() {
        let json = serde_json::to_string(&RenderPatch::Remove { id: "p".to_string() }).unwrap();
        assert_eq!(json, r#"{"type":"remove","id":"p"}"#);
    }
}
