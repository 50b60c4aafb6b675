//! Patch information command.

#![allow(clippy::print_literal)] // Table headers use literal strings intentionally

use clap::Args;
use patchwerk_config::Settings;
use patchwerk_core::{LinkKind, MessageDisplay, Node};

use super::common::load_patch;

#[derive(Args)]
pub struct InfoArgs {
    /// Patch name or path
    #[arg(value_name = "PATCH")]
    patch: String,

    /// Also list the attributes of every node
    #[arg(long)]
    attributes: bool,
}

pub fn run(args: InfoArgs, settings: &Settings) -> anyhow::Result<()> {
    let loaded = load_patch(&args.patch, settings, None)?;
    let patcher = &loaded.patcher;

    println!("Patch: {}", loaded.path.display());
    println!("Nodes: {}", patcher.node_count());
    println!("Links: {}", patcher.link_count());

    let nodes = patcher.nodes();
    if !nodes.is_empty() {
        println!();
        println!("  {:>4}  {:24}  {:>6}  {:>7}  {}", "ID", "Text", "Inlets", "Outlets", "Position");
        println!("  {:>4}  {:24}  {:>6}  {:>7}  {}", "--", "----", "------", "-------", "--------");
        for node in &nodes {
            let position = node.position();
            println!(
                "  {:>4}  {:24}  {:>6}  {:>7}  {}, {}",
                loaded.file_id(node.id()),
                node.text(),
                ports(node, true),
                ports(node, false),
                position.x,
                position.y
            );
            if args.attributes {
                print_attributes(node);
            }
        }
    }

    let links = patcher.links();
    if !links.is_empty() {
        println!();
        println!("Links:");
        for link in links {
            println!(
                "  {}:{} -> {}:{}  ({})",
                loaded.file_id(link.from),
                link.outlet,
                loaded.file_id(link.to),
                link.inlet,
                link_kind(link.kind)
            );
        }
    }

    Ok(())
}

/// Counts the ports on one side, marking signal ports with `~`.
fn ports(node: &Node, inlets: bool) -> String {
    let (count, signals) = if inlets {
        let count = node.num_inlets();
        let signals = (0..count)
            .filter(|&i| node.inlet_kind(i).is_some_and(|k| k.is_signal()))
            .count();
        (count, signals)
    } else {
        let count = node.num_outlets();
        let signals = (0..count)
            .filter(|&i| node.outlet_kind(i).is_some_and(|k| k.is_signal()))
            .count();
        (count, signals)
    };
    if signals == 0 {
        count.to_string()
    } else {
        format!("{count} ({signals}~)")
    }
}

fn print_attributes(node: &Node) {
    for name in node.attribute_names() {
        let values = node.attribute(&name);
        println!("  {:>4}  @{} {}", "", name, MessageDisplay(&values));
    }
}

fn link_kind(kind: LinkKind) -> &'static str {
    match kind {
        LinkKind::Data => "data",
        LinkKind::Signal => "signal",
    }
}
