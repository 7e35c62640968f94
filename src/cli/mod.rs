pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "authctl")]
#[command(about = "Operate the auth template API: serve, migrate, manage users and tokens")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server")]
    Serve(commands::serve::ServeArgs),

    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "User management")]
    User {
        #[command(subcommand)]
        cmd: commands::user::UserCommands,
    },

    #[command(about = "Session token utilities")]
    Token {
        #[command(subcommand)]
        cmd: commands::token::TokenCommands,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
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
        Commands::Serve(args) => commands::serve::handle(args).await,
        Commands::Migrate => commands::migrate::handle(output_format).await,
        Commands::User { cmd } => commands::user::handle(cmd, output_format).await,
        Commands::Token { cmd } => commands::token::handle(cmd, output_format).await,
    }
}
