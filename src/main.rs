//! `diagraph-check` - offline configuration validator.
//!
//! Loads a graph configuration and prints the file-inclusion tree, the
//! resolved unit list, and per-node port traversal. Exits non-zero with the
//! specific load error on a broken configuration. Useful for validating a
//! configuration change without bringing up the surrounding system.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use diagraph::{ConfigFile, ConfigLoader, LogicTable, Unit, UnitKind};

#[derive(Parser, Debug)]
#[command(name = "diagraph-check")]
#[command(about = "Validate a diagnostic graph configuration and dump its structure")]
struct Args {
    /// Path to the root configuration file
    path: PathBuf,

    /// Print only the file-inclusion tree
    #[arg(long)]
    files: bool,

    /// Print only the resolved unit list
    #[arg(long)]
    units: bool,

    /// Print only the per-node port traversal
    #[arg(long)]
    ports: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let loader = ConfigLoader::load(&args.path, &LogicTable::builtin())?;

    let all = !(args.files || args.units || args.ports);
    if all || args.files {
        println!("Files:");
        dump_file_tree(loader.file_tree(), "");
    }
    if all || args.units {
        println!("Units:");
        for unit in loader.graph().units() {
            println!("{}", text_unit(unit));
        }
    }
    if all || args.ports {
        println!("Ports:");
        dump_ports(&loader);
    }
    Ok(())
}

fn dump_file_tree(file: &ConfigFile, indent: &str) {
    println!("{indent}- {}", file.path().display());
    let indent = format!("{indent}  ");
    for include in file.includes() {
        dump_file_tree(include, &indent);
    }
}

fn text_unit(unit: &Unit) -> String {
    match unit.kind() {
        UnitKind::Node(node) => format!(
            "| {:<4} | {:<5} | {:<13} | {}",
            unit.index(),
            node.level().symbol(),
            node.kind(),
            node.path()
        ),
        UnitKind::Leaf(leaf) => format!(
            "| {:<4} | {:<5} | {:<13} | {}",
            unit.index(),
            leaf.level().symbol(),
            "diag",
            leaf.name()
        ),
    }
}

fn dump_ports(loader: &ConfigLoader) {
    let graph = loader.graph();
    for unit in graph.units() {
        let UnitKind::Node(node) = unit.kind() else {
            continue;
        };
        println!("{}", node.path());
        for port in node.ports() {
            println!(" - {}", text_unit(&graph.units()[port.index()]));
        }
    }
}
