//! Storehouse CLI - schema bootstrap and staff provisioning.
//!
//! # Usage
//!
//! ```bash
//! # Create missing tables and indexes
//! storehouse bootstrap
//!
//! # Create a staff account
//! storehouse staff create -e ops@example.com -n Ada -s Lovelace -p 'Str0ng!pass'
//! ```
//!
//! Both commands read the same environment as the server
//! (`STOREHOUSE_DB_DRIVER`, `STOREHOUSE_DATABASE_URL`, ...).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "storehouse")]
#[command(author, version, about = "Storehouse CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the managed tables and indexes
    Bootstrap,
    /// Manage staff accounts
    Staff {
        #[command(subcommand)]
        action: StaffAction,
    },
}

#[derive(Subcommand)]
enum StaffAction {
    /// Create a new staff account
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// First name
        #[arg(short, long)]
        name: String,

        /// Surname
        #[arg(short, long)]
        surname: String,

        /// Password (8+ characters with upper, lower, digit, and symbol)
        #[arg(short, long)]
        password: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Bootstrap => commands::bootstrap::run().await?,
        Commands::Staff { action } => match action {
            StaffAction::Create {
                email,
                name,
                surname,
                password,
            } => {
                commands::staff::create(&email, &password, name, surname).await?;
            }
        },
    }
    Ok(())
}
