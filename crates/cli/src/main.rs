//! TechMart CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! techmart-cli migrate
//!
//! # Create an admin account
//! techmart-cli admin create -e admin@techmart.vn -n "Admin Name" -p 'S3cure-pass'
//!
//! # Promote an existing account to admin
//! techmart-cli admin promote -e staff@techmart.vn
//! ```
//!
//! # Environment Variables
//!
//! - `TECHMART_DATABASE_URL` - `PostgreSQL` connection string (read from `.env` too)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "techmart-cli")]
#[command(author, version, about = "TechMart CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin account with a password
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,

        /// Initial password
        #[arg(short, long)]
        password: String,
    },
    /// Give an existing account the admin role
    Promote {
        /// Email of the account
        #[arg(short, long)]
        email: String,
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

async fn run(cli: Cli) -> Result<(), CliError> {
    let pool = commands::connect().await?;
    match cli.command {
        Commands::Migrate => commands::migrate::run(&pool).await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                password,
            } => {
                commands::admin::create(&pool, &email, &name, &password).await?;
            }
            AdminAction::Promote { email } => {
                commands::admin::promote(&pool, &email).await?;
            }
        },
    }
    Ok(())
}
