pub mod commands;

use clap::{Parser, Subcommand};

use crate::database::models::Role;

#[derive(Parser)]
#[command(name = "integriting-api")]
#[command(about = "Integriting API - publishing and whistleblower intake backend")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve,

    #[command(about = "Create tables and seed defaults, then exit")]
    Migrate,

    #[command(about = "Create an admin or editor account")]
    CreateUser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "editor", value_parser = parse_role)]
        role: Role,
        #[arg(long, env = "NEW_USER_PASSWORD", help = "Read from NEW_USER_PASSWORD when omitted")]
        password: String,
    },
}

fn parse_role(raw: &str) -> Result<Role, String> {
    raw.parse()
}

#[derive(Debug, Clone, Copy)]
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
    let config = crate::config::config().clone();
    config.validate()?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => commands::serve::handle(config).await,
        Commands::Migrate => commands::migrate::handle(config).await,
        Commands::CreateUser {
            username,
            email,
            role,
            password,
        } => commands::user::create(config, &username, &email, &password, role, output_format).await,
    }
}
