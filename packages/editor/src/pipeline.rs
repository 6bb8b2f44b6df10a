//! # Update Pipeline
//!
//! Carries a model change through the derived trees: Mutate → Render sync →
//! Layout sync.
//!
//! The pipeline owns the render and layout trees. Each sync picks one
//! render subtree to rebuild: the deepest model branch holding every
//! updated node that the render tree also mirrors.

use crate::errors::EditResult;
use folio_layout::{FlowReport, LayoutOptions, LayoutTree, LayoutUpdate, TextMetrics};
use folio_model::{ComponentRegistry, NodeKey, Tree};
use folio_render::{RenderTree, RenderUpdate};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Keeps render and layout in step with a model
pub struct Pipeline {
    registry: ComponentRegistry,
    render: RenderTree,
    layout: LayoutTree,
}

/// Output of one sync
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult {
    pub render: RenderUpdate,
    pub layout: LayoutUpdate,
}

impl Pipeline {
    /// Build render and layout for a model
    pub fn new(
        model: &Tree,
        registry: ComponentRegistry,
        metrics: Arc<dyn TextMetrics>,
        options: LayoutOptions,
    ) -> (Self, FlowReport) {
        let mut render = RenderTree::build(model, &registry);
        let (layout, report) = LayoutTree::build(&render, metrics, options);
        render.mark_laid_out();
        (
            Self {
                registry,
                render,
                layout,
            },
            report,
        )
    }

    /// Sync after the nodes in `updated` changed
    #[instrument(skip(self, model))]
    pub fn sync(&mut self, model: &Tree, updated: &[String]) -> EditResult<PipelineResult> {
        let target = self.sync_target(model, updated);
        let id = model.id(target).to_string();

        let render = self.render.sync(model, &id, &self.registry)?;
        let layout = self.layout.sync(&self.render);
        self.render.mark_laid_out();

        debug!(
            id,
            patches = render.patches.len(),
            rebuilt = layout.rebuilt,
            "[Pipeline] Synced"
        );
        Ok(PipelineResult { render, layout })
    }

    /// Full rebuild, for recovery when the derived trees are out of step
    pub fn rebuild(&mut self, model: &Tree) -> FlowReport {
        let metrics = self.layout.metrics();
        let options = *self.layout.options();
        let mut render = RenderTree::build(model, &self.registry);
        let (layout, report) = LayoutTree::build(&render, metrics, options);
        render.mark_laid_out();
        self.render = render;
        self.layout = layout;
        report
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn render(&self) -> &RenderTree {
        &self.render
    }

    pub fn layout(&self) -> &LayoutTree {
        &self.layout
    }

    fn sync_target(&self, model: &Tree, updated: &[String]) -> NodeKey {
        let live: Vec<NodeKey> = updated.iter().filter_map(|id| model.get(id)).collect();
        let mut target = lowest_common_ancestor(model, &live).unwrap_or(model.root());
        while self.render.find(model.id(target)).is_none() {
            match model.parent(target) {
                Some(parent) => target = parent,
                None => break,
            }
        }
        target
    }
}

fn lowest_common_ancestor(model: &Tree, keys: &[NodeKey]) -> Option<NodeKey> {
    let (first, rest) = keys.split_first()?;
    let mut chain = model.ancestry(*first);
    for key in rest {
        let other = model.ancestry(*key);
        let shared = chain
            .iter()
            .zip(&other)
            .take_while(|(a, b)| a == b)
            .count();
        chain.truncate(shared);
    }
    chain.last().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::ReplaceChange;
    use folio_layout::FixedMetrics;
    use folio_model::{parse_markup, IdGenerator};

    fn setup(source: &str) -> (Tree, Pipeline) {
        let registry = ComponentRegistry::with_defaults();
        let model = parse_markup(source, &registry).unwrap();
        let (pipeline, _) = Pipeline::new(
            &model,
            registry,
            Arc::new(FixedMetrics::new(10.0, 20.0)),
            LayoutOptions::default(),
        );
        (model, pipeline)
    }

    #[test]
    fn test_sync_rebuilds_updated_paragraph() {
        let (mut model, mut pipeline) = setup(
            r#"<doc id="d"><paragraph id="p"><text id="t">Hello</text></paragraph><paragraph id="q"><text id="u">world</text></paragraph></doc>"#,
        );
        let mut ids = IdGenerator::default();
        let result = ReplaceChange::text(7, 7, "!")
            .apply(&mut model, &mut ids)
            .unwrap();

        let synced = pipeline.sync(&model, &[result.updated]).unwrap();
        assert_eq!(synced.render.id, "p");
        assert_eq!(pipeline.render().size(), 13);
        assert_eq!(pipeline.layout().line_texts()[0], "Hello!↵");
    }

    #[test]
    fn test_lowest_common_ancestor_of_siblings() {
        let (model, pipeline) = setup(
            r#"<doc id="d"><paragraph id="p"><text id="t">a</text></paragraph><paragraph id="q"><text id="u">b</text></paragraph></doc>"#,
        );
        let target = pipeline.sync_target(&model, &["t".to_string(), "u".to_string()]);
        assert_eq!(model.id(target), "d");

        let target = pipeline.sync_target(&model, &["gone".to_string()]);
        assert_eq!(target, model.root());
    }
}
