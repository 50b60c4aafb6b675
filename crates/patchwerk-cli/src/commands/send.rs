//! Message sending command.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use patchwerk_config::Settings;
use patchwerk_core::{ConsoleHistory, Level, MessageDisplay, parse_words};

use super::common::load_patch;

#[derive(Args)]
pub struct SendArgs {
    /// Patch name or path
    #[arg(value_name = "PATCH")]
    patch: String,

    /// Node ID as written in the patch file, or the node's text or type name
    #[arg(value_name = "NODE")]
    node: String,

    /// Inlet index
    #[arg(value_name = "INLET")]
    inlet: usize,

    /// Message words, e.g. `3` or `set volume`
    #[arg(value_name = "MESSAGE", allow_negative_numbers = true)]
    message: Vec<String>,

    /// Keep the patch running this many milliseconds so scheduled output fires
    #[arg(long, value_name = "MS", default_value = "0")]
    wait: u64,
}

pub fn run(args: SendArgs, settings: &Settings) -> anyhow::Result<()> {
    let history = Arc::new(ConsoleHistory::new());
    let loaded = load_patch(&args.patch, settings, Some(&history))?;

    let node = loaded
        .find_node(&args.node)
        .ok_or_else(|| anyhow::anyhow!("No node '{}' in {}", args.node, loaded.path.display()))?;
    let message = parse_words(loaded.runtime.tags(), &args.message.join(" "));

    tracing::debug!(
        "send {} -> {}:{}",
        MessageDisplay(&message),
        args.node,
        args.inlet
    );
    loaded.patcher.send(node, args.inlet, &message)?;

    if args.wait > 0 {
        std::thread::sleep(Duration::from_millis(args.wait));
    }

    for message in history.messages() {
        match message.level {
            Level::Post => println!("{message}"),
            level => println!("{}: {message}", level.name()),
        }
    }
    Ok(())
}
