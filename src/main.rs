use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "boardcard")]
#[command(version, about = "Item card, file relay and Google Drive push for monday.com boards")]
pub struct Cli {
    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Config file (defaults to ./boardcard.toml, then the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Item to operate on. Overrides ITEM_ID.
    #[arg(long, global = true)]
    pub item: Option<String>,

    /// Board the item lives on. Overrides BOARD_ID.
    #[arg(long, global = true)]
    pub board: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the file relay
    Relay {
        /// Port to listen on. Overrides PROXY_PORT.
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Show the item card
    Show {
        /// Print the projected fields as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit one field of the item
    Edit {
        /// Field key from the mapping table (e.g. notes)
        key: String,
        /// New text value
        value: String,
    },
    /// Change the item's status; prompts when no label is given
    Status { label: Option<String> },
    /// Delete the item
    Delete {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Push one of the item's files to a Google Drive folder
    Push {
        /// Name of the file to push (prompts when the item has several)
        #[arg(long)]
        file: Option<String>,
        /// Revoke the Google session when done
        #[arg(long)]
        sign_out: bool,
    },
    /// Show the resolved configuration
    Config,
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let mut settings = boardcard::config::Settings::load(cli.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(board) = &cli.board {
        settings.board_id = Some(board.clone());
    }
    if let Some(item) = &cli.item {
        settings.item_id = Some(item.clone());
    }

    match &cli.command {
        Commands::Relay { port } => cmd::cmd_relay(settings, *port).await?,
        Commands::Show { json } => cmd::cmd_show(&settings, *json).await?,
        Commands::Edit { key, value } => cmd::cmd_edit(&settings, key, value).await?,
        Commands::Status { label } => cmd::cmd_status(&settings, label.as_deref()).await?,
        Commands::Delete { yes } => cmd::cmd_delete(&settings, *yes).await?,
        Commands::Push { file, sign_out } => {
            cmd::cmd_push(&settings, file.as_deref(), *sign_out).await?
        }
        Commands::Config => cmd::cmd_config(&settings),
    }

    Ok(())
}
