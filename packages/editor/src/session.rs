//! # Edit Session
//!
//! One editing session over a document: the model, the derived render and
//! layout trees, the cursor and the undo history.
//!
//! ## Flow
//!
//! ```text
//! insert_text / delete_range / apply
//!   → Transformation::apply (model)
//!   → History::record (reverse, with the cursor to restore)
//!   → Pipeline::sync (render, layout)
//!   → cursor mapped back to render offsets
//! ```
//!
//! The cursor lives in render offsets. Offsets are converted to model space
//! only to build changes and back when a transformation sets a cursor.

use crate::config::EngineConfig;
use crate::cursor::Cursor;
use crate::errors::{EditError, EditResult};
use crate::history::{Clock, History};
use crate::mutation::ReplaceChange;
use crate::pipeline::Pipeline;
use crate::transformation::{CursorTarget, Transformation};
use folio_layout::{LayoutTree, LayoutUpdate, TextMetrics};
use folio_model::{ComponentRegistry, IdGenerator, MarkupTokenizer, ModelError, Tree};
use folio_render::{RenderError, RenderTree, RenderUpdate};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// What one session edit changed
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUpdate {
    /// Model subtrees reported by the applied changes
    pub updated: Vec<String>,
    pub render: RenderUpdate,
    pub layout: LayoutUpdate,
    pub cursor: Cursor,
}

pub struct EditSession {
    model: Tree,
    ids: IdGenerator,
    pipeline: Pipeline,
    cursor: Cursor,
    history: History,
    config: EngineConfig,
    last_update: Option<SessionUpdate>,
}

impl EditSession {
    pub fn new(
        model: Tree,
        ids: IdGenerator,
        registry: ComponentRegistry,
        metrics: Arc<dyn TextMetrics>,
        config: EngineConfig,
    ) -> Self {
        let (pipeline, report) = Pipeline::new(&model, registry, metrics, config.layout_options());
        debug!(
            pages = report.pages_flowed,
            size = model.size(),
            "[Session] Opened"
        );
        Self {
            model,
            ids,
            pipeline,
            cursor: Cursor::default(),
            history: History::from_config(&config),
            config,
            last_update: None,
        }
    }

    /// Parse markup and open a session over it
    pub fn from_markup(
        source: &str,
        registry: ComponentRegistry,
        metrics: Arc<dyn TextMetrics>,
        config: EngineConfig,
    ) -> EditResult<Self> {
        let mut tokenizer = MarkupTokenizer::new(source).strict_ids(config.strict_ids);
        let tokens = tokenizer.tokenize().map_err(ModelError::from)?;
        let model = Tree::from_token_stream(&tokens, &registry)?;
        let ids = tokenizer.into_id_generator();
        Ok(Self::new(model, ids, registry, metrics, config))
    }

    /// Swap the history clock, keeping configured limits
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.history = History::from_config(&self.config).with_clock(clock);
        self
    }

    /// Replace the selection with `text` and collapse the cursor after it
    pub fn insert_text(&mut self, text: &str) -> EditResult<SessionUpdate> {
        let (from, to) = self.model_range()?;
        let transformation = Transformation::single(ReplaceChange::text(from, to, text))
            .with_cursor(CursorTarget::collapsed(from))
            .with_description("insert text");
        self.apply(transformation)
    }

    /// Delete between two render offsets
    pub fn delete_range(&mut self, from: usize, to: usize) -> EditResult<SessionUpdate> {
        let (from, to) = (from.min(to), from.max(to));
        let render = self.pipeline.render();
        let model_from = render.to_model_offset(from)?;
        let model_to = render.to_model_offset(to)?;
        let transformation = Transformation::single(ReplaceChange::delete(model_from, model_to))
            .with_cursor(CursorTarget::collapsed(model_from))
            .with_description("delete");
        self.apply(transformation)
    }

    /// Apply a transformation, record it and bring render and layout up
    /// to date
    #[instrument(skip_all, fields(changes = transformation.changes.len()))]
    pub fn apply(&mut self, transformation: Transformation) -> EditResult<SessionUpdate> {
        let before = self.model_cursor()?;
        let applied = transformation.apply(&mut self.model, &mut self.ids)?;

        let reverse = Transformation {
            cursor: Some(before),
            ..applied.reverse
        };
        self.history.record(transformation, reverse);
        self.finish(applied.updated, applied.cursor)
    }

    /// Undo the last action. `Ok(false)` when there is nothing to undo.
    pub fn undo(&mut self) -> EditResult<bool> {
        match self.history.undo(&mut self.model, &mut self.ids) {
            Ok(Some(step)) => match self.finish(step.updated, step.cursor) {
                Ok(_) => Ok(true),
                Err(error) => Err(self.recover(error)),
            },
            Ok(None) => Ok(false),
            Err(error) => {
                warn!(%error, "[Session] Undo failed, model unchanged");
                Err(error)
            }
        }
    }

    /// Redo the last undone action. `Ok(false)` when there is nothing to
    /// redo.
    pub fn redo(&mut self) -> EditResult<bool> {
        match self.history.redo(&mut self.model, &mut self.ids) {
            Ok(Some(step)) => match self.finish(step.updated, step.cursor) {
                Ok(_) => Ok(true),
                Err(error) => Err(self.recover(error)),
            },
            Ok(None) => Ok(false),
            Err(error) => {
                warn!(%error, "[Session] Redo failed, model unchanged");
                Err(error)
            }
        }
    }

    pub fn get_cursor(&self) -> Cursor {
        self.cursor
    }

    /// Place the cursor at render offsets
    pub fn set_cursor(&mut self, anchor: usize, head: usize, left_lock: Option<f32>) -> EditResult<()> {
        let size = self.pipeline.render().size();
        for offset in [anchor, head] {
            if offset >= size {
                return Err(RenderError::out_of_range(offset, size).into());
            }
        }
        self.cursor = Cursor {
            anchor,
            head,
            left_lock,
        };
        Ok(())
    }

    pub fn model(&self) -> &Tree {
        &self.model
    }

    pub fn render(&self) -> &RenderTree {
        self.pipeline.render()
    }

    pub fn layout(&self) -> &LayoutTree {
        self.pipeline.layout()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Outcome of the most recent edit, undo or redo
    pub fn last_update(&self) -> Option<&SessionUpdate> {
        self.last_update.as_ref()
    }

    fn model_range(&self) -> EditResult<(usize, usize)> {
        let (start, end) = self.cursor.range();
        let render = self.pipeline.render();
        Ok((render.to_model_offset(start)?, render.to_model_offset(end)?))
    }

    fn model_cursor(&self) -> EditResult<CursorTarget> {
        let render = self.pipeline.render();
        Ok(CursorTarget {
            anchor: render.to_model_offset(self.cursor.anchor)?,
            head: render.to_model_offset(self.cursor.head)?,
            keep_left_lock: self.cursor.left_lock.is_some(),
        })
    }

    fn finish(
        &mut self,
        updated: Vec<String>,
        target: Option<CursorTarget>,
    ) -> EditResult<SessionUpdate> {
        let synced = self.pipeline.sync(&self.model, &updated)?;

        if let Some(target) = target {
            let render = self.pipeline.render();
            self.cursor = Cursor {
                anchor: render.to_render_offset(target.anchor)?,
                head: render.to_render_offset(target.head)?,
                left_lock: self.cursor.left_lock.filter(|_| target.keep_left_lock),
            };
        } else {
            let last = self.pipeline.render().size().saturating_sub(1);
            self.cursor.anchor = self.cursor.anchor.min(last);
            self.cursor.head = self.cursor.head.min(last);
        }

        let update = SessionUpdate {
            updated,
            render: synced.render,
            layout: synced.layout,
            cursor: self.cursor,
        };
        debug!(cursor = ?self.cursor, "[Session] Updated");
        self.last_update = Some(update.clone());
        Ok(update)
    }

    /// The model moved on but render and layout did not follow; rebuild them
    fn recover(&mut self, error: EditError) -> EditError {
        warn!(%error, "[Session] Sync after history step failed, rebuilding");
        self.pipeline.rebuild(&self.model);
        let last = self.pipeline.render().size().saturating_sub(1);
        self.cursor = Cursor::collapsed(self.cursor.head.min(last));
        error
    }
}
