//! Furnish CLI - database and local development tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! furnish-cli migrate
//!
//! # Load the demo catalog (products and coupons)
//! furnish-cli seed
//! furnish-cli seed --file path/to/catalog.yaml
//!
//! # Create a user
//! furnish-cli user create -e ada@example.com -f Ada -l Lovelace
//!
//! # Print a bearer token for a user
//! furnish-cli token --user-id 1
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

use commands::CommandError;

#[derive(Parser)]
#[command(name = "furnish-cli")]
#[command(author, version, about = "Furnish CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed products and coupons from a YAML file
    Seed {
        /// Path to the catalog file
        #[arg(short, long, default_value = commands::seed::DEFAULT_CATALOG)]
        file: String,
    },
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Print a bearer token for an existing user
    Token {
        /// User to issue the token for
        #[arg(short, long)]
        user_id: i32,

        /// Override the stored role (`user` or `admin`)
        #[arg(short, long)]
        role: Option<String>,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// First name
        #[arg(short, long)]
        first_name: String,

        /// Last name
        #[arg(short, long)]
        last_name: String,

        /// Role (`user` or `admin`)
        #[arg(short, long, default_value = "user")]
        role: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await,
        Commands::Seed { file } => commands::seed::catalog(&file).await,
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                first_name,
                last_name,
                role,
            } => commands::user::create(&email, &first_name, &last_name, &role).await,
        },
        Commands::Token { user_id, role } => commands::token::issue(user_id, role.as_deref()).await,
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
