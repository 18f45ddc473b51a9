//! Bookshop CLI - migrations, accounts and catalog seeding.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! bookshop-cli migrate
//!
//! # Create a staff account (password from BOOKSHOP_NEW_USER_PASSWORD)
//! bookshop-cli user create -u admin -e admin@example.com --staff
//!
//! # Load publishers, authors and books from a YAML file
//! bookshop-cli seed catalog.yaml
//! ```
//!
//! # Environment Variables
//!
//! - `BOOKSHOP_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bookshop-cli")]
#[command(author, version, about = "Bookshop operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply database migrations
    Migrate,
    /// Manage accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Insert catalog records from a YAML file (books already present by title are skipped)
    Seed {
        /// Path to the YAML file
        file: String,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create an account
    Create {
        /// Login name
        #[arg(short, long)]
        username: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Grant staff rights
        #[arg(long)]
        staff: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::Create {
                username,
                email,
                staff,
            } => {
                commands::user::create(&username, &email, staff).await?;
            }
        },
        Commands::Seed { file } => commands::seed::catalog(&file).await?,
    }
    Ok(())
}
