//! # Position Mapper
//!
//! Converts offsets between render space and model space by walking the
//! render tree once from the root, keeping both running totals in lock-step.
//! Every render node stores the model size of its subtree, so a conversion
//! costs O(depth × fan-out) rather than O(document).
//!
//! ## Boundaries
//!
//! - Render containers have no boundary units; entering one in model space
//!   costs one unit.
//! - A block's line-break leaf sits where the block's close boundary sits in
//!   model space.
//! - A model open boundary maps to the start of the container in render
//!   space.

use crate::error::{RenderError, RenderResult};
use crate::render_node::{RenderKind, RenderNode};
use crate::sync::RenderTree;

impl RenderTree {
    /// Model offset of a render offset
    pub fn to_model_offset(&self, offset: usize) -> RenderResult<usize> {
        let root = self.root();
        if offset >= root.size {
            return Err(RenderError::out_of_range(offset, root.size));
        }

        let mut node = root;
        let mut local = offset;
        let mut model = 0;

        loop {
            match node.kind {
                RenderKind::Text => return Ok(model + local),
                // All preceding siblings have been counted, so this is the
                // parent's close boundary
                RenderKind::LineBreak => return Ok(model),
                RenderKind::Container => {
                    model += 1;
                    let mut next = None;
                    for child in &node.children {
                        if local < child.size {
                            next = Some(child);
                            break;
                        }
                        local -= child.size;
                        model += child.model_size;
                    }
                    match next {
                        Some(child) => node = child,
                        None => return Err(RenderError::out_of_range(offset, root.size)),
                    }
                }
            }
        }
    }

    /// Render offset of a model offset
    pub fn to_render_offset(&self, model_offset: usize) -> RenderResult<usize> {
        let root = self.root();
        if model_offset >= root.model_size {
            return Err(RenderError::out_of_range(model_offset, root.model_size));
        }

        let mut node = root;
        let mut local = model_offset;
        let mut render = 0;

        loop {
            match node.kind {
                RenderKind::Text => return Ok(render + local),
                RenderKind::LineBreak => return Ok(render),
                RenderKind::Container => {
                    if local == 0 {
                        return Ok(render);
                    }
                    local -= 1;
                    let mut next = None;
                    for child in &node.children {
                        if local < child.model_size {
                            next = Some(child);
                            break;
                        }
                        local -= child.model_size;
                        render += child.size;
                    }
                    match next {
                        Some(child) => node = child,
                        None => return Ok(close_boundary(node, render, root.size)),
                    }
                }
            }
        }
    }
}

/// Render offset of a container's close boundary, given the render offset
/// just past its content
fn close_boundary(node: &RenderNode, end: usize, total: usize) -> usize {
    match node.children.last() {
        Some(last) if last.is_line_break() => end - 1,
        _ => end.min(total.saturating_sub(1)),
    }
}
