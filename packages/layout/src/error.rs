use folio_render::RenderError;
use thiserror::Error;

pub type LayoutResult<T> = Result<T, LayoutError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("Offset {offset} is out of range (size {size})")]
    OutOfRange { offset: usize, size: usize },

    #[error(transparent)]
    Render(#[from] RenderError),
}
