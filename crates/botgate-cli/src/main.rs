//! Botgate CLI - operator webhook switching and diagnostics
//!
//! Talks to a running botgate-server over its operator API.

mod api;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use uuid::Uuid;

use api::GatewayClient;

#[derive(Parser)]
#[command(name = "botgate")]
#[command(about = "Botgate CLI - webhook switching and diagnostics", long_about = None)]
#[command(version)]
struct Cli {
    /// Botgate server base URL
    #[arg(long, env = "BOTGATE_SERVER_URL", default_value = "http://localhost:8080")]
    server: String,

    /// Operator API key
    #[arg(long, env = "BOTGATE_API_KEY")]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a messenger's webhook with its provider
    Activate {
        /// Messenger id
        id: Uuid,
    },

    /// Remove a messenger's webhook registration
    Deactivate {
        /// Messenger id
        id: Uuid,
    },

    /// Show the provider-side bot profile
    Profile {
        /// Messenger id
        id: Uuid,
    },

    /// Check the server is up
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = GatewayClient::new(&cli.server, cli.api_key.clone());

    match cli.command {
        Commands::Activate { id } => {
            let messenger = client.activate(id).await?;
            println!(
                "{} {} ({}) -> {}",
                "activated".green().bold(),
                messenger.title,
                messenger.platform,
                messenger.webhook_path
            );
        }
        Commands::Deactivate { id } => {
            let messenger = client.deactivate(id).await?;
            println!(
                "{} {} ({})",
                "deactivated".yellow().bold(),
                messenger.title,
                messenger.platform
            );
        }
        Commands::Profile { id } => {
            let profile = client.profile(id).await?;
            println!(
                "{} {}",
                "profile".cyan().bold(),
                profile.username.as_deref().unwrap_or("<unnamed>")
            );
            if let Some(bot_id) = &profile.id {
                println!("  id:     {}", bot_id);
            }
            if let Some(avatar) = &profile.avatar {
                println!("  avatar: {}", avatar);
            }
            println!("  info:   {}", serde_json::to_string_pretty(&profile.info)?);
        }
        Commands::Health => {
            let health = client.health().await?;
            println!(
                "{} version {}",
                health.status.green().bold(),
                health.version
            );
        }
    }

    Ok(())
}
