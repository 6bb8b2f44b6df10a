//! Error types for the document model

use std::ops::Range;
use thiserror::Error;

/// Result type for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Addressing and structural failures raised by the tree
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Offset {offset} is out of range for a document of size {size}")]
    OutOfRange { offset: usize, size: usize },

    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Node {0} would be left without children")]
    EmptyBranch(String),

    #[error("Node {0} is a leaf and cannot hold children")]
    NotABranch(String),

    #[error("Node {0} is a branch and cannot hold text")]
    NotALeaf(String),

    #[error("Duplicate node id: {0}")]
    DuplicateId(String),

    #[error("Unknown component: {0}")]
    UnknownComponent(String),

    #[error("Invalid attribute {name:?} on {component}: {message}")]
    InvalidAttribute {
        component: String,
        name: String,
        message: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),
}

impl ModelError {
    pub fn out_of_range(offset: usize, size: usize) -> Self {
        Self::OutOfRange { offset, size }
    }

    pub fn invalid_attribute(
        component: impl Into<String>,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidAttribute {
            component: component.into(),
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Malformed markup or token streams.
///
/// `index` is the position of the offending token in the stream being
/// produced or consumed; `span` is the byte range in the markup source when
/// one is available.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SerializationError {
    #[error("Token {index}: tag <{tag}> has no id")]
    MissingId {
        index: usize,
        tag: String,
        span: Range<usize>,
    },

    #[error("Token {index}: empty tag name")]
    EmptyTagName { index: usize, span: Range<usize> },

    #[error("Token {index}: unterminated string")]
    UnterminatedString { index: usize, span: Range<usize> },

    #[error("Token {index}: closing </{found}> does not match <{expected}>")]
    TagMismatch {
        index: usize,
        expected: String,
        found: String,
        span: Range<usize>,
    },

    #[error("Token {index}: expected {expected}, found {found}")]
    UnexpectedToken {
        index: usize,
        expected: String,
        found: String,
        span: Option<Range<usize>>,
    },

    #[error("Token {index}: unexpected end of input, expected {expected}")]
    UnexpectedEnd { index: usize, expected: String },

    #[error("Tokenizer has already been run")]
    AlreadyTokenized,
}

impl SerializationError {
    pub fn unexpected_token(
        index: usize,
        expected: impl Into<String>,
        found: impl Into<String>,
        span: Option<Range<usize>>,
    ) -> Self {
        Self::UnexpectedToken {
            index,
            expected: expected.into(),
            found: found.into(),
            span,
        }
    }

    pub fn unexpected_end(index: usize, expected: impl Into<String>) -> Self {
        Self::UnexpectedEnd {
            index,
            expected: expected.into(),
        }
    }

    /// Index of the offending token, if the error concerns one
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::MissingId { index, .. }
            | Self::EmptyTagName { index, .. }
            | Self::UnterminatedString { index, .. }
            | Self::TagMismatch { index, .. }
            | Self::UnexpectedToken { index, .. }
            | Self::UnexpectedEnd { index, .. } => Some(*index),
            Self::AlreadyTokenized => None,
        }
    }

    pub fn span(&self) -> Option<Range<usize>> {
        match self {
            Self::MissingId { span, .. }
            | Self::EmptyTagName { span, .. }
            | Self::UnterminatedString { span, .. }
            | Self::TagMismatch { span, .. } => Some(span.clone()),
            Self::UnexpectedToken { span, .. } => span.clone(),
            Self::UnexpectedEnd { .. } | Self::AlreadyTokenized => None,
        }
    }
}

/// Pretty-print a markup error with source context using ariadne
#[cfg(feature = "pretty-errors")]
pub fn format_error(source: &str, filename: &str, error: &SerializationError) -> String {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let span = error
        .span()
        .unwrap_or(source.len().saturating_sub(1)..source.len());

    let label = match error {
        SerializationError::MissingId { .. } => "add an id=\"...\" attribute".to_string(),
        SerializationError::TagMismatch { expected, .. } => format!("expected </{}>", expected),
        SerializationError::UnexpectedToken { expected, .. }
        | SerializationError::UnexpectedEnd { expected, .. } => format!("expected {}", expected),
        other => other.to_string(),
    };

    let mut output = Vec::new();
    let report = Report::build(ReportKind::Error, filename, span.start)
        .with_message(error.to_string())
        .with_label(
            Label::new((filename, span.start..span.end))
                .with_color(Color::Red)
                .with_message(label),
        )
        .finish();

    if report
        .write((filename, Source::from(source)), &mut output)
        .is_err()
    {
        return error.to_string();
    }

    String::from_utf8(output).unwrap_or_else(|_| error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_index() {
        let err = SerializationError::EmptyTagName { index: 4, span: 10..11 };
        assert_eq!(err.index(), Some(4));
        assert_eq!(err.span(), Some(10..11));
        assert_eq!(SerializationError::AlreadyTokenized.index(), None);
    }

    #[test]
    fn test_serialization_converts_to_model_error() {
        let err: ModelError = SerializationError::unexpected_end(3, "</doc>").into();
        assert!(matches!(err, ModelError::Serialization(_)));
        assert!(err.to_string().contains("Token 3"));
    }
}
