use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rsslite::app::AppContext;
use rsslite::cli::{commands, Cli, Commands};
use rsslite::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default to info level unless RUST_LOG says otherwise
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Init) => {
            commands::init(&cli.config)?;
        }
        Some(Commands::Check) => {
            commands::check(&load_config(&cli)?);
        }
        Some(Commands::Refresh { slug }) => {
            let ctx = AppContext::new(load_config(&cli)?)?;
            commands::refresh(&ctx, slug).await?;
        }
        Some(Commands::Serve) | None => {
            let ctx = Arc::new(AppContext::new(load_config(&cli)?)?);
            commands::serve(ctx).await?;
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::load(&cli.config)
        .with_context(|| format!("run `rsslite init` to create {}", cli.config.display()))?;
    cli.apply(&mut config);
    Ok(config)
}
