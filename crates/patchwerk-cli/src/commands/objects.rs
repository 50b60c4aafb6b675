//! Node type listing and information command.

#![allow(clippy::print_literal)] // Table headers use literal strings intentionally

use clap::Args;
use patchwerk_registry::{NodeCategory, NodeDescriptor, NodeRegistry};

#[derive(Args)]
pub struct ObjectsArgs {
    /// Show details for a specific node type (name or alias)
    #[arg(value_name = "NAME")]
    name: Option<String>,
}

pub fn run(args: ObjectsArgs) -> anyhow::Result<()> {
    let registry = NodeRegistry::new();

    if let Some(name) = &args.name {
        let descriptor = registry
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown node type: {}", name))?;
        print_details(descriptor);
        return Ok(());
    }

    println!("Available Objects");
    println!("=================");

    for category in NodeCategory::ALL {
        let nodes = registry.nodes_in_category(category);
        if nodes.is_empty() {
            continue;
        }

        println!();
        println!("{} - {}", category.name(), category.description());
        println!();
        println!("  {:20}  {}", "Usage", "Description");
        println!("  {:20}  {}", "-----", "-----------");
        for node in nodes {
            println!("  {:20}  {}", node.usage, node.description);
        }
    }

    println!();
    println!("Use 'patchwerk objects <NAME>' for details on a node type.");
    Ok(())
}

fn print_details(descriptor: &NodeDescriptor) {
    println!("{}", descriptor.id);
    println!("{}", "=".repeat(descriptor.id.len()));
    println!();
    println!("{}", descriptor.description);
    println!();
    println!("  Usage:     {}", descriptor.usage);
    println!("  Category:  {}", descriptor.category.name());
    if !descriptor.aliases.is_empty() {
        println!("  Aliases:   {}", descriptor.aliases.join(", "));
    }
    println!("  Inlets:    {}", descriptor.inlets);
    println!("  Outlets:   {}", descriptor.outlets);
}
