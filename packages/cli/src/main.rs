mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{edit, layout, parse, EditArgs, LayoutArgs, ParseArgs};

/// Folio CLI - structured document editing engine
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Tokenize and parse a markup file
    Parse(ParseArgs),

    /// Lay a document out into pages and lines
    Layout(LayoutArgs),

    /// Insert text through an edit session
    Edit(EditArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir.display().to_string(),
        Err(err) => {
            eprintln!("{} Cannot get current directory: {}", "Error:".red().bold(), err);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Parse(args) => parse(args, &cwd),
        Command::Layout(args) => layout(args, &cwd),
        Command::Edit(args) => edit(args, &cwd),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
