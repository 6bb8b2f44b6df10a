pub mod edit;
pub mod layout;
pub mod parse;

pub use edit::{edit, EditArgs};
pub use layout::{layout, LayoutArgs};
pub use parse::{parse, ParseArgs};

use anyhow::{anyhow, Result};
use folio_editor::EngineConfig;
use folio_model::{format_error, ComponentRegistry, MarkupTokenizer, Tree};
use std::fs;
use std::path::Path;

/// Read and parse a markup file, rendering tokenizer errors with context
pub(crate) fn load_document(path: &Path, config: &EngineConfig) -> Result<Tree> {
    let source = fs::read_to_string(path)
        .map_err(|e| anyhow!("Cannot read {}: {}", path.display(), e))?;
    let filename = path.display().to_string();

    let tokens = MarkupTokenizer::new(&source)
        .strict_ids(config.strict_ids)
        .tokenize()
        .map_err(|e| anyhow!("{}", format_error(&source, &filename, &e)))?;
    let tree = Tree::from_token_stream(&tokens, &ComponentRegistry::with_defaults())?;
    Ok(tree)
}
