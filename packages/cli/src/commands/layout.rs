use super::load_document;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use folio_editor::EngineConfig;
use folio_layout::{FixedMetrics, LayoutLevel, LayoutTree};
use folio_model::ComponentRegistry;
use folio_render::RenderTree;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct LayoutArgs {
    /// Markup file to lay out
    pub file: PathBuf,

    /// Line width (overrides config)
    #[arg(long)]
    pub width: Option<f32>,

    /// Page height (overrides config)
    #[arg(long)]
    pub height: Option<f32>,

    /// Advance of every char
    #[arg(long, default_value = "10.0")]
    pub char_width: f32,

    #[arg(long, default_value = "20.0")]
    pub line_height: f32,
}

pub fn layout(args: LayoutArgs, cwd: &str) -> Result<()> {
    let config = EngineConfig::load(cwd)?;
    let model = load_document(&args.file, &config)?;

    let mut options = config.layout_options();
    if let Some(width) = args.width {
        options.line_width = width;
    }
    if let Some(height) = args.height {
        options.page_height = height;
    }

    let registry = ComponentRegistry::with_defaults();
    let render = RenderTree::build(&model, &registry);
    let metrics = Arc::new(FixedMetrics::new(args.char_width, args.line_height));
    let (tree, report) = LayoutTree::build(&render, metrics, options);

    println!(
        "{}",
        format!(
            "📄 {} pages, {} lines ({} splits, {} joins)",
            tree.page_count(),
            tree.line_count(),
            report.splits,
            report.joins
        )
        .bright_blue()
        .bold()
    );

    let texts = tree.line_texts();
    let mut current_page = None;
    let mut page_number = 0;
    for (line, text) in tree.lines().into_iter().zip(texts) {
        let page = tree.ancestor_at(line, LayoutLevel::Page);
        if page != current_page {
            current_page = page;
            page_number += 1;
            println!("{}", format!("Page {}", page_number).yellow());
        }
        let node = tree.node(line);
        println!(
            "  {:>7.1} {} {}",
            node.height,
            "│".dimmed(),
            text
        );
    }
    Ok(())
}
