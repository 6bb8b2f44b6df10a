use super::load_document;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use folio_editor::EngineConfig;
use folio_model::{NodeKey, Tree};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ParseArgs {
    /// Markup file to parse
    pub file: PathBuf,

    /// Print the document back as markup instead of an outline
    #[arg(long)]
    pub markup: bool,
}

pub fn parse(args: ParseArgs, cwd: &str) -> Result<()> {
    let config = EngineConfig::load(cwd)?;
    let tree = load_document(&args.file, &config)?;

    if args.markup {
        println!("{}", folio_model::to_markup_pretty(&tree));
        return Ok(());
    }

    println!(
        "{} {} ({} units, {} chars)",
        "✓".green(),
        args.file.display(),
        tree.size(),
        tree.text().chars().count()
    );
    print_outline(&tree, tree.root(), 1);
    Ok(())
}

fn print_outline(tree: &Tree, key: NodeKey, indent: usize) {
    let pad = "  ".repeat(indent);
    let component = tree.identity(key).component.as_str();
    if tree.is_leaf(key) {
        println!(
            "{}{} {} {:?}",
            pad,
            component.cyan(),
            tree.id(key).dimmed(),
            tree.text_of(key)
        );
        return;
    }
    println!(
        "{}{} {} [{}]",
        pad,
        component.bright_blue().bold(),
        tree.id(key).dimmed(),
        tree.node_size(key)
    );
    for child in tree.children(key) {
        print_outline(tree, *child, indent + 1);
    }
}
