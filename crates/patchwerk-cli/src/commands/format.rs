//! Patch formatting command.

use std::path::PathBuf;

use clap::Args;
use patchwerk_config::{Settings, write_document};

use super::common::load_patch;

#[derive(Args)]
pub struct FormatArgs {
    /// Patch name or path
    #[arg(value_name = "PATCH")]
    patch: String,

    /// Write the result to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Write everything on one line
    #[arg(long)]
    compact: bool,
}

pub fn run(args: FormatArgs, settings: &Settings) -> anyhow::Result<()> {
    let loaded = load_patch(&args.patch, settings, None)?;
    let document = loaded.patcher.write();

    match &args.output {
        Some(output) if !args.compact => {
            let filename = output
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| anyhow::anyhow!("Invalid output path: {}", output.display()))?;
            let directory = output.parent().map(PathBuf::from).unwrap_or_default();
            write_document(&document, filename, directory)?;
            eprintln!("Wrote {}", output.display());
        }
        Some(output) => {
            let mut text = document.to_compact_text();
            text.push('\n');
            std::fs::write(output, text)
                .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", output.display(), e))?;
            eprintln!("Wrote {}", output.display());
        }
        None if args.compact => println!("{}", document.to_compact_text()),
        None => println!("{}", document.to_text()),
    }
    Ok(())
}
