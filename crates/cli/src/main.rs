//! cnbchat CLI: the main entry point.
//!
//! Commands:
//! - `onboard` : Create `~/.cnbchat/config.toml`
//! - `ask`     : Answer one question and exit
//! - `chat`    : Interactive session, one command per line
//! - `doctor`  : Check the configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "cnbchat",
    about = "Ask a CNB repository's knowledge base",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Onboard,

    /// Ask a single question, e.g. `cnbchat ask -m "owner/repo how do I fork?"`
    Ask {
        /// The command text, with or without a leading `/cnb`
        #[arg(short, long)]
        message: String,
    },

    /// Start an interactive session
    Chat,

    /// Diagnose configuration problems
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so replies on stdout stay clean.
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Ask { message } => commands::ask::run(message).await?,
        Commands::Chat => commands::chat::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
