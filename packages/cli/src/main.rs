mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{init, pending, place, responsive, InitArgs, PendingArgs, PlaceArgs, ResponsiveArgs};
use tracing_subscriber::EnvFilter;

/// Pagegrid CLI - inspect grid layouts and offline drafts
#[derive(Parser, Debug)]
#[command(name = "pagegrid")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default pagegrid.config.json
    Init(InitArgs),

    /// Derive the tablet or mobile arrangement of a blocks file
    Responsive(ResponsiveArgs),

    /// Show the coalesced operations of a persisted draft
    Pending(PendingArgs),

    /// Show where a new block would land
    Place(PlaceArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
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
        Command::Init(args) => init(args, &cwd),
        Command::Responsive(args) => responsive(args, &cwd),
        Command::Pending(args) => pending(args, &cwd),
        Command::Place(args) => place(args, &cwd),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
