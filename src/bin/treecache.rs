//! Treecache CLI Binary

use anyhow::Context;
use clap::Parser;
use treecache::logging::init_logging;
use treecache::tooling::cli::{Cli, CliContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = cli.resolve_config().context("loading configuration")?;
    init_logging(Some(&config.logging)).context("initializing logging")?;

    let context = CliContext::new(cli.command.root(), &config, cli.format)
        .with_context(|| format!("opening {}", cli.command.root().display()))?;
    let output = context.execute(&cli.command).await?;
    println!("{}", output);
    Ok(())
}
