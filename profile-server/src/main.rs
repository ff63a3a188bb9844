mod config;
mod render;
mod webserver;

use anyhow::Context;
use clap::{Parser, Subcommand};
use profile_store::SledStore;
use tracing::Level;

use crate::config::ServerConfig;

#[derive(Parser)]
#[command(name = "profile-server")]
#[command(about = "Profile book HTTP server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Start the profile server")]
    Start {
        #[command(flatten)]
        config: ServerConfig,

        /// Log at debug level
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start { config, verbose } => {
            let level = if verbose { Level::DEBUG } else { Level::INFO };
            let collector = tracing_subscriber::fmt().with_max_level(level).finish();
            tracing::subscriber::set_global_default(collector)
                .context("there was a problem setting up tracing")?;

            let addr = config.addr()?;

            let rt = tokio::runtime::Runtime::new()?;

            let store = SledStore::open(&config.db_path)
                .with_context(|| format!("failed to open database {}", config.db_path.display()))?;

            let page_path = config.page_path();
            let page = rt
                .block_on(tokio::fs::read_to_string(&page_path))
                .with_context(|| format!("failed to read page {}", page_path.display()))?;

            rt.block_on(webserver::serve(
                addr,
                store.clone(),
                page,
                &config.public_dir,
                config.enable_purge,
            ))?;

            // Drain sled's pending writes before the process goes away.
            rt.block_on(store.close())?;
        }
    }

    Ok(())
}
