mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tfblocks=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List {
            path,
            kind,
            attr,
            type_filter,
            scrape_all,
            format,
        } => {
            cli::list_blocks(&path, &kind, &attr, &type_filter, scrape_all, &format)?;
        }
        Commands::Show {
            address,
            path,
            format,
        } => {
            cli::show_block(&path, &address, &format)?;
        }
        Commands::Attrs { path, attr, format } => {
            cli::show_attributes(&path, &attr, &format)?;
        }
    }

    Ok(())
}
