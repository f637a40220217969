//! Wardrobe CLI - garment attribute extraction and outfit-match training.
//!
//! The `extract` command resizes garment photos onto white squares, sends
//! them to a multimodal model, and writes structured attributes as JSON.
//! The `train` command turns those attributes plus user-scored top/bottom
//! combinations into a small binary match classifier.
//!
//! # Usage
//!
//! ```bash
//! # Extract attributes for a directory of photos
//! wardrobe extract ./data/images --output ./data/attributes.json
//!
//! # Train the match classifier
//! wardrobe train ./data/attributes.json ./data/combinations.txt
//!
//! # View configuration
//! wardrobe config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Wardrobe - garment attribute extraction and outfit-match training.
#[derive(Parser, Debug)]
#[command(name = "wardrobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract garment attributes from photos via a vision LLM
    Extract(cli::extract::ExtractArgs),

    /// Train the outfit-match classifier from attributes and scored pairs
    Train(cli::train::TrainArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging from config, with CLI verbose override.
    // Note: logging isn't initialized yet, so use eprintln for config warnings.
    let config = match wardrobe_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `wardrobe config path`."
            );
            wardrobe_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Wardrobe v{}", wardrobe_core::VERSION);

    // Dispatch to the appropriate command handler
    match cli.command {
        Commands::Extract(args) => cli::extract::execute(args).await,
        Commands::Train(args) => cli::train::execute(args).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
