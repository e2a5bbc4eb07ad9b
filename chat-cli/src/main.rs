//! # chat-cli
//!
//! Command-line client for the relaychat relay.
//!
//! ## Commands
//!
//! - `init`: Store this device's phone and relay url
//! - `send`: Send a text, image or audio message
//! - `listen`: Receive and store messages until Ctrl-C
//! - `history`: Print one conversation
//! - `conversations`: List local conversations
//! - `contact` / `contacts`: Name phones
//! - `delete`: Delete a conversation or one message
//!
//! ## Example
//!
//! ```bash
//! chat-cli init --phone "+34 600 000 001" --server ws://localhost:9090
//! chat-cli contact +34600000002 Bob
//! chat-cli send +34600000002 "Hello"
//! chat-cli send +34600000002 --image photo.jpg
//! chat-cli listen
//! chat-cli history +34600000002
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{contact, contacts, conversations, delete, history, init, listen, send};

/// Command-line client for the relaychat relay.
#[derive(Parser, Debug)]
#[command(name = "chat-cli")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory for config, contacts, conversations and media
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store this device's phone number and relay url
    Init {
        /// Our phone number
        #[arg(long, short)]
        phone: String,

        /// Relay WebSocket url
        #[arg(long, short)]
        server: Option<String>,

        /// Display name
        #[arg(long, short)]
        name: Option<String>,
    },

    /// Send a message to a peer
    Send {
        /// Recipient phone number
        peer: String,

        /// Text to send
        #[arg(conflicts_with_all = ["image", "audio"])]
        text: Option<String>,

        /// Image file to send
        #[arg(long, conflicts_with = "audio")]
        image: Option<PathBuf>,

        /// Audio file to send
        #[arg(long)]
        audio: Option<PathBuf>,
    },

    /// Receive and store messages until Ctrl-C
    Listen,

    /// Print the conversation with a peer
    History {
        /// Peer phone number
        peer: String,
    },

    /// List local conversations
    Conversations,

    /// Name a phone number (an empty name removes it)
    Contact {
        /// Phone number
        phone: String,

        /// Display name
        name: String,
    },

    /// List contacts
    Contacts,

    /// Delete a conversation, or one message in it
    Delete {
        /// Peer phone number
        peer: String,

        /// Only delete the message with this id
        #[arg(long)]
        message: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    tokio::fs::create_dir_all(&data_dir)
        .await
        .context("Failed to create data directory")?;

    match cli.command {
        Commands::Init {
            phone,
            server,
            name,
        } => init::run(&data_dir, &phone, server.as_deref(), name.as_deref()).await?,
        Commands::Send {
            peer,
            text,
            image,
            audio,
        } => {
            let outgoing = if let Some(path) = image {
                send::Outgoing::Image(path)
            } else if let Some(path) = audio {
                send::Outgoing::Audio(path)
            } else if let Some(text) = text {
                send::Outgoing::Text(text)
            } else {
                anyhow::bail!("Must specify text, --image or --audio");
            };
            send::run(&data_dir, &peer, outgoing).await?;
        }
        Commands::Listen => listen::run(&data_dir).await?,
        Commands::History { peer } => history::run(&data_dir, &peer).await?,
        Commands::Conversations => conversations::run(&data_dir).await?,
        Commands::Contact { phone, name } => contact::run(&data_dir, &phone, &name).await?,
        Commands::Contacts => contacts::run(&data_dir).await?,
        Commands::Delete { peer, message } => {
            delete::run(&data_dir, &peer, message.as_deref()).await?
        }
    }

    Ok(())
}

/// Get the default data directory for chat-cli.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "relaychat", "chat-cli")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
