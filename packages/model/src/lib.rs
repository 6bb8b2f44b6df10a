//! # Folio Model
//!
//! The document model beneath the Folio editing engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ markup: string ⇄ token stream               │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ tree: arena of root/branch/leaf nodes       │
//! │  - offset addressing + resolve_position     │
//! │  - eager size maintenance                   │
//! │  - splice/split/merge primitives            │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ components: kind lookup, validation, hints  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Offsets
//!
//! Every leaf char is one unit; every branch adds one unit for its open and
//! one for its close boundary. Offsets run over `[0, size)`, with 0 and
//! `size - 1` on the root's own boundaries.
//!
//! ## Usage
//!
//! ```rust
//! use folio_model::{parse_markup, ComponentRegistry};
//!
//! let registry = ComponentRegistry::with_defaults();
//! let tree = parse_markup(
//!     r#"<doc id="d"><paragraph id="p"><text id="t">Hello</text></paragraph></doc>"#,
//!     &registry,
//! )?;
//!
//! assert_eq!(tree.size(), 9);
//! let position = tree.resolve_position(3)?;
//! assert_eq!(tree.id(position.deepest().node), "t");
//! # Ok::<(), folio_model::ModelError>(())
//! ```

pub mod component;
pub mod error;
pub mod fragment;
pub mod id_generator;
pub mod markup;
pub mod node;
pub mod token;
pub mod tree;

pub use component::{Component, ComponentRegistry, LayoutRole, RenderHints, Style};
#[cfg(feature = "pretty-errors")]
pub use error::format_error;
pub use error::{ModelError, ModelResult, SerializationError};
pub use fragment::{is_well_nested, Fragment};
pub use id_generator::{document_seed, IdGenerator};
pub use markup::{parse_markup, to_markup, to_markup_pretty, token_span, MarkupTokenizer};
pub use node::{Attributes, Identity, Node, NodeKind};
pub use token::{OpenTag, Token};
pub use tree::{NodeKey, PathEntry, Position, Tree};
