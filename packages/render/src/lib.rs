//! # Folio Render
//!
//! Derived render tree and the model ⇄ render position mapper.
//!
//! ## Design
//!
//! - `build_tree` mirrors a model subtree, resolving component attributes
//!   into an inherited style and closing each block with a synthetic
//!   line-break leaf.
//! - `RenderTree::sync` rebuilds only the subtree a mutation reports as
//!   updated and diffs it against what it replaces. The `needs_layout` flag
//!   tells the layout engine which nodes actually changed.
//! - Offsets in render space count text chars and line breaks only; model
//!   boundaries are accounted for through each node's stored `model_size`.

pub mod error;
pub mod position;
pub mod render_node;
pub mod sync;

pub use error::{RenderError, RenderResult};
pub use render_node::{build_tree, RenderKind, RenderNode};
pub use sync::{RenderPatch, RenderTree, RenderUpdate};
