use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use tfblocks::{extract_with, Block, BlockKind, Blocks, ExtractOptions, TargetNames};

#[derive(Parser)]
#[command(name = "tfblocks")]
#[command(about = "Extract Terraform declaration blocks, their source text and key attributes")]
#[command(version)]
#[command(after_long_help = r#"
EXAMPLES:
    # List every declaration in the current module
    tfblocks list

    # Only resources, also scraping machine_type
    tfblocks list ./infra --kind managed --attr machine_type

    # Resources whose type mentions compute or sql
    tfblocks list --type-filter compute --type-filter sql

    # Print the source of one declaration
    tfblocks show google_compute_instance.web --path ./infra

    # Scraped attributes as JSON
    tfblocks attrs ./infra --format json
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List declarations ordered by line
    List {
        /// Path to the module directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Only these kinds (managed, data, variable, module)
        #[arg(long)]
        kind: Vec<String>,

        /// Extra attribute names to scrape
        #[arg(long)]
        attr: Vec<String>,

        /// Only declarations whose type contains one of these (case-insensitive)
        #[arg(long)]
        type_filter: Vec<String>,

        /// Scrape variables and module calls too
        #[arg(long)]
        scrape_all: bool,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Print the source text of one declaration
    Show {
        /// Address such as google_compute_instance.web, data.x.y, var.region or module.net
        address: String,

        /// Path to the module directory
        #[arg(long, default_value = ".")]
        path: PathBuf,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Print scraped attributes per declaration
    Attrs {
        /// Path to the module directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Extra attribute names to scrape
        #[arg(long)]
        attr: Vec<String>,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

fn options(attr: &[String], scrape_all: bool) -> ExtractOptions {
    let mut targets = TargetNames::new();
    targets.extend(attr.iter().cloned());
    ExtractOptions::new()
        .with_targets(targets)
        .with_scrape_all_kinds(scrape_all)
}

fn load(path: &Path, options: &ExtractOptions) -> anyhow::Result<Blocks> {
    extract_with(path, options)
        .with_context(|| format!("Failed to extract blocks from {}", path.display()))
}

fn parse_kinds(kinds: &[String]) -> anyhow::Result<Vec<BlockKind>> {
    kinds
        .iter()
        .map(|k| {
            BlockKind::from_str(k).with_context(|| {
                format!("Unknown kind '{}' (expected managed, data, variable or module)", k)
            })
        })
        .collect()
}

/// Lists declarations of a module.
pub fn list_blocks(
    path: &Path,
    kinds: &[String],
    attr: &[String],
    type_filter: &[String],
    scrape_all: bool,
    format: &str,
) -> anyhow::Result<()> {
    let kinds = parse_kinds(kinds)?;
    let blocks = load(path, &options(attr, scrape_all))?;
    let type_filter: TargetNames = type_filter.iter().cloned().collect();

    let selected: Vec<&Block> = blocks
        .iter()
        .filter(|b| kinds.is_empty() || kinds.contains(&b.kind))
        .filter(|b| type_filter.is_empty() || type_filter.matches(&b.type_name))
        .collect();

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&selected)?);
        return Ok(());
    }

    if selected.is_empty() {
        println!("No declarations found");
        return Ok(());
    }

    for block in selected {
        println!("{}", format_block_line(block));
    }

    Ok(())
}

/// Prints the verbatim text of the declaration at `address`.
pub fn show_block(path: &Path, address: &str, format: &str) -> anyhow::Result<()> {
    let blocks = load(path, &ExtractOptions::default())?;
    let Some(block) = blocks.find(address) else {
        bail!("No declaration '{}' in {}", address, path.display());
    };

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(block)?);
    } else {
        println!("# {}:{}", block.file().display(), block.start_line());
        if let Some(version) = &block.version {
            println!("# version {}", version);
        }
        println!("{}", block.text);
    }

    Ok(())
}

/// Prints the scraped attributes of every declaration that has any.
pub fn show_attributes(path: &Path, attr: &[String], format: &str) -> anyhow::Result<()> {
    let blocks = load(path, &options(attr, false))?;
    let scraped: BTreeMap<String, &BTreeMap<String, String>> = blocks
        .iter()
        .filter(|b| !b.attr.is_empty())
        .map(|b| (b.address(), &b.attr))
        .collect();

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&scraped)?);
        return Ok(());
    }

    if scraped.is_empty() {
        println!("No attributes found");
        return Ok(());
    }

    for (address, attrs) in scraped {
        println!("{}:", address);
        for (name, value) in attrs {
            println!("  {} = {}", name, value);
        }
    }

    Ok(())
}

fn format_block_line(block: &Block) -> String {
    let type_name = if block.type_name.is_empty() {
        "-"
    } else {
        block.type_name.as_str()
    };
    let mut line = format!(
        "{:>5}  {:<8}  {}  ({})",
        block.start_line(),
        block.kind.as_str(),
        block.address(),
        type_name
    );
    if !block.attr.is_empty() {
        let attrs: Vec<String> = block
            .attr
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        line.push_str("  ");
        line.push_str(&attrs.join(" "));
    }
    line
}
