//! Patchwerk CLI - Command-line interface for the patchwerk dataflow patcher.

mod commands;

use clap::{Parser, Subcommand};
use patchwerk_config::Settings;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "patchwerk")]
#[command(author, version, about = "Patchwerk dataflow patcher CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List built-in node types, or describe one
    Objects(commands::objects::ObjectsArgs),

    /// Show the nodes and links of a patch
    Info(commands::info::InfoArgs),

    /// Send a message into a node of a patch and print the console output
    Send(commands::send::SendArgs),

    /// Validate a patch and rewrite it in canonical form
    Format(commands::format::FormatArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = match Settings::load_or_default() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("warning: ignoring settings file: {err}");
            Settings::default()
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Objects(args) => commands::objects::run(args),
        Commands::Info(args) => commands::info::run(args, &settings),
        Commands::Send(args) => commands::send::run(args, &settings),
        Commands::Format(args) => commands::format::run(args, &settings),
    }
}
