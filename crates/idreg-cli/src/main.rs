/*!
 * idreg
 *
 * Console for the identity registry:
 * 1. Handle a single `id ...` command on behalf of a sender
 * 2. Feed `<sender> <command>` lines from stdin, one concurrent task each
 * 3. Inspect identities and senders
 *
 * Usage:
 *   idreg exec --sender npub1... id alice
 *   idreg exec --sender npub1... id alice admin npub1...
 *   idreg feed < commands.txt
 *   idreg show alice
 *   idreg whois npub1...
 */

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use idreg_core::IdentityRegistryService;
use idreg_storage::RocksDbStorage;
use std::{path::PathBuf, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;

// CLI structure
#[derive(Parser)]
#[command(name = "idreg")]
#[command(about = "Identity registry console")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RocksDB database path (overrides IDREG_DATABASE_PATH)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle one command on behalf of a sender
    Exec {
        /// Sender key the command comes from
        #[arg(short, long)]
        sender: String,

        /// Command text, e.g. `id alice member npub1...`
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Handle `<sender> <command>` lines from stdin concurrently
    Feed,
    /// Show an identity and its members
    Show {
        /// Identity name
        name: String,
    },
    /// Show a sender's primary identity and memberships
    Whois {
        /// Sender key
        sender: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries outcomes only
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "idreg=info,idreg_core=info,idreg_storage=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(database) = cli.database {
        config.database_path = database;
    }

    let registry = Arc::new(open_registry(&config)?);

    match cli.command {
        Commands::Exec { sender, command } => {
            commands::exec::exec(registry.as_ref(), &sender, &command.join(" ")).await?
        }

        Commands::Feed => commands::feed::feed(registry).await?,

        Commands::Show { name } => commands::show::show_identity(registry.as_ref(), &name).await?,

        Commands::Whois { sender } => {
            commands::show::show_sender(registry.as_ref(), &sender).await?
        }
    }

    Ok(())
}

fn open_registry(config: &Config) -> Result<IdentityRegistryService<RocksDbStorage>> {
    std::fs::create_dir_all(&config.database_path)?;
    let storage = RocksDbStorage::open(&config.database_path)?;
    tracing::debug!("Opened registry at {}", config.database_path.display());

    Ok(IdentityRegistryService::with_config(
        Arc::new(storage),
        config.registry.clone(),
    ))
}
