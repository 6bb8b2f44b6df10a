use folio_model::ModelError;
use thiserror::Error;

pub type RenderResult<T> = Result<T, RenderError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Offset {offset} is out of range (size {size})")]
    OutOfRange { offset: usize, size: usize },

    #[error("No render node with id {0:?}")]
    UnknownNode(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl RenderError {
    pub fn out_of_range(offset: usize, size: usize) -> Self {
        RenderError::OutOfRange { offset, size }
    }
}
