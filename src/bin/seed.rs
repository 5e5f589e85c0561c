//! Loads or clears sample data.
//!
//! ```bash
//! cargo run --bin seed -- import
//! cargo run --bin seed -- delete
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

use eventhub::{config::AppConfig, seed, state};

#[derive(Parser)]
#[command(about = "Load or clear eventhub sample data")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replace all users and events with the sample set
    Import,
    /// Delete all users and events
    Delete,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "eventhub=info".to_string()),
        )
        .init();

    let args = Args::parse();
    let config = AppConfig::from_env()?;
    let db = state::connect(&config).await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    match args.command {
        Command::Import => {
            seed::import(
                &db,
                &config.default_avatar_url,
                &config.default_event_image_url,
            )
            .await?
        }
        Command::Delete => seed::destroy(&db).await?,
    }
    Ok(())
}
