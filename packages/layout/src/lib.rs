//! # Folio Layout
//!
//! Line breaking and pagination over the render tree.
//!
//! ## Architecture
//!
//! ```text
//! RenderTree ──build/sync──▶ LayoutTree ──flow──▶ pages, lines
//!                                 │
//!                                 └── queries: offset_at_point, bounding_box
//! ```
//!
//! ## Design
//!
//! - Text measurement is an injected [`TextMetrics`] capability.
//!   [`FixedMetrics`] gives every char the same advance.
//! - Flow is incremental: a sync rebuilds only blocks whose render node
//!   needs layout, then flows pending lines and pages under the lowest
//!   common ancestor of what it touched.
//! - Layout offsets are render offsets.

pub mod build;
pub mod error;
pub mod flow;
pub mod metrics;
pub mod query;
pub mod sync;
pub mod tree;

pub use build::segment_words;
pub use error::{LayoutError, LayoutResult};
pub use flow::FlowReport;
pub use metrics::{FixedMetrics, TextMetrics, TextSize};
pub use query::Rect;
pub use sync::LayoutUpdate;
pub use tree::{FlowState, LayoutKey, LayoutLevel, LayoutNode, LayoutOptions, LayoutTree, Padding};
