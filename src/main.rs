use deskagent::{cli, tools};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "deskagent", version, about = "Conversational desk agent for ticket checks and IP lookups")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the interactive chat loop (default)
    Chat,
    /// Run the ticket workflow once, without the chat loop
    Tickets {
        /// Name or ID of the Google Sheet holding ticket numbers
        #[arg(long)]
        sheet: String,
        /// Base URL the ticket ID is appended to
        #[arg(long)]
        base_url: String,
    },
    /// Geolocate an IP address
    Lookup {
        /// IP address to look up
        ip: String,
    },
    /// Fetch AbuseIPDB details for an IP address
    Abuse {
        /// IP address to look up
        ip: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let config_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from("config.yaml"));

    tools::init();

    match cli.command {
        Some(Command::Chat) | None => cli::chat(&config_path).await,
        Some(Command::Tickets { sheet, base_url }) => {
            cli::run_tickets(&config_path, &sheet, &base_url).await
        }
        Some(Command::Lookup { ip }) => cli::lookup_ip(&config_path, &ip).await,
        Some(Command::Abuse { ip }) => cli::lookup_abuse(&config_path, &ip).await,
    }
}
