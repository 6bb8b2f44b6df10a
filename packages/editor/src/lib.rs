//! # Folio Editor
//!
//! Editing engine on top of the Folio document model.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ session: cursor + history + pipeline        │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ transformation: ordered replace changes     │
//! │  - offset threading between changes         │
//! │  - reverse transformation for undo          │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ mutation: remove a balanced range, insert   │
//! │ fragments, join matching neighbours         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ pipeline: render sync → layout sync         │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **The model is the source of truth**: render and layout are derived
//! 2. **Every change is invertible**: applying the reverse restores a
//!    token-equal document
//! 3. **Failed changes leave no trace**: the model is restored on error
//! 4. **Incremental updates**: only the updated subtree is rebuilt
//!
//! ## Usage
//!
//! ```rust
//! use folio_editor::{EditSession, EngineConfig};
//! use folio_layout::FixedMetrics;
//! use folio_model::ComponentRegistry;
//! use std::sync::Arc;
//!
//! let mut session = EditSession::from_markup(
//!     r#"<doc id="d"><paragraph id="p"><text id="t">Hello world</text></paragraph></doc>"#,
//!     ComponentRegistry::with_defaults(),
//!     Arc::new(FixedMetrics::new(10.0, 20.0)),
//!     EngineConfig::default(),
//! )?;
//!
//! session.set_cursor(6, 6, None)?;
//! session.insert_text("there ")?;
//! assert_eq!(session.model().text(), "Hello there world");
//!
//! session.undo()?;
//! assert_eq!(session.model().text(), "Hello world");
//! # Ok::<(), folio_editor::EditError>(())
//! ```

mod config;
mod cursor;
mod errors;
mod history;
mod mutation;
mod pipeline;
mod session;
mod transformation;

pub use config::{EngineConfig, DEFAULT_CONFIG_NAME};
pub use cursor::Cursor;
pub use errors::{EditError, EditResult};
pub use history::{Action, Clock, History, HistoryEntry, HistoryStep, ManualClock, SystemClock};
pub use mutation::{Assoc, Bias, ChangeResult, ReplaceChange, StepMap};
pub use pipeline::{Pipeline, PipelineResult};
pub use session::{EditSession, SessionUpdate};
pub use transformation::{map_through, Applied, CursorTarget, Mapping, Transformation};
