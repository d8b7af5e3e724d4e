pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "signature-admin")]
#[command(about = "Signature API administration - migrations, bootstrap and password hashing")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run pending database migrations against DATABASE_URL")]
    Migrate,

    #[command(about = "Create a Super Admin, or promote an existing account")]
    Bootstrap {
        #[arg(long, help = "Username of the Super Admin")]
        username: String,
        #[arg(long, help = "Password used when the account is created")]
        password: String,
    },

    #[command(about = "Print an Argon2id PHC string for a password")]
    HashPassword {
        #[arg(help = "Plain text password")]
        password: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Migrate => commands::migrate::handle(output_format).await,
        Commands::Bootstrap { username, password } => {
            commands::bootstrap::handle(&username, &password, output_format).await
        }
        Commands::HashPassword { password } => commands::password::handle(&password, output_format),
    }
}
