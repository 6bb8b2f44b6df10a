use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use folio_editor::{EditError, EditSession, EngineConfig};
use folio_layout::FixedMetrics;
use folio_model::{format_error, to_markup_pretty, ComponentRegistry, ModelError};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct EditArgs {
    /// Markup file to edit
    pub file: PathBuf,

    /// Render offset to insert at
    #[arg(long)]
    pub at: usize,

    /// Text to insert
    #[arg(long)]
    pub insert: String,

    /// Replace the selection up to this render offset
    #[arg(long)]
    pub to: Option<usize>,

    /// Write the result back to the file
    #[arg(short, long)]
    pub write: bool,
}

pub fn edit(args: EditArgs, cwd: &str) -> Result<()> {
    let config = EngineConfig::load(cwd)?;
    let source = fs::read_to_string(&args.file)
        .map_err(|e| anyhow!("Cannot read {}: {}", args.file.display(), e))?;

    let mut session = EditSession::from_markup(
        &source,
        ComponentRegistry::with_defaults(),
        Arc::new(FixedMetrics::default()),
        config,
    )
    .map_err(|e| match e {
        EditError::Model(ModelError::Serialization(error)) => {
            anyhow!("{}", format_error(&source, &args.file.display().to_string(), &error))
        }
        other => other.into(),
    })?;

    session.set_cursor(args.at, args.to.unwrap_or(args.at), None)?;
    let update = session.insert_text(&args.insert)?;

    eprintln!(
        "{} inserted {} chars, updated {}, cursor at {}",
        "✓".green(),
        args.insert.chars().count(),
        update.updated.join(", "),
        update.cursor.head
    );

    let markup = to_markup_pretty(session.model());
    if args.write {
        fs::write(&args.file, &markup)?;
        eprintln!("  {} {}", "→".dimmed(), args.file.display());
    } else {
        println!("{}", markup);
    }
    Ok(())
}
