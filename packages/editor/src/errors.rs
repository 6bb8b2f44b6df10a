//! Error types for the editor

use folio_layout::LayoutError;
use folio_model::ModelError;
use folio_render::RenderError;
use thiserror::Error;

pub type EditResult<T> = Result<T, EditError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    #[error("Invalid range {from}..{to}")]
    InvalidRange { from: usize, to: usize },

    #[error("Fragment depth {depth} does not fit at this position (max {max})")]
    FragmentDepthMismatch { depth: usize, max: usize },

    #[error("Fragments are not well nested")]
    MalformedFragments,

    #[error("No text node to insert into at offset {offset}")]
    NoLeafAt { offset: usize },

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),
}

impl EditError {
    pub fn invalid_range(from: usize, to: usize) -> Self {
        EditError::InvalidRange { from, to }
    }
}
