//! blescout CLI entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use blescout_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan(args) => {
            blescout_cli::scan::execute(args).await?;
        }
        Commands::Resolve(args) => {
            blescout_cli::resolve::execute(args)?;
        }
        Commands::Keys(args) => {
            blescout_cli::keys::execute(args)?;
        }
        Commands::Version => {
            println!("blescout {}", env!("CARGO_PKG_VERSION"));
            println!("engine version: {}", blescout_core::VERSION);
        }
    }

    Ok(())
}
