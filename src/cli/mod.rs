//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了CLI命令行接口。

use crate::config::Config;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "oxfanout")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(short, long, default_value = "oxfanout.toml", help = "Path to the TOML configuration file")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(name = "put", about = "Write a user record to all stores")]
    Put(PutArgs),

    #[command(name = "get", about = "Read and reconcile a user record")]
    Get(GetArgs),

    #[command(name = "status", about = "Probe every configured backend")]
    Status,

    #[command(name = "listen", about = "Consume user events and record received usernames")]
    Listen,

    #[command(name = "received", about = "List usernames recorded by the listener")]
    Received,
}

#[derive(Parser, Debug)]
pub struct PutArgs {
    #[arg(short, long, help = "Username (identity key)")]
    pub username: String,

    #[arg(short, long = "attr", value_name = "KEY=VALUE", help = "Attribute, repeatable; VALUE is parsed as JSON when possible")]
    pub attributes: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct GetArgs {
    #[arg(help = "Username to read")]
    pub username: String,

    #[arg(short, long, help = "Show per-source results and repair action")]
    pub verbose: bool,
}

mod get;
mod listen;
mod put;
mod status;

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_file(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    crate::telemetry::init_tracing(&config.telemetry)?;

    match &cli.command {
        Commands::Put(args) => put::execute(&config, args).await,
        Commands::Get(args) => get::execute(&config, args).await,
        Commands::Status => status::execute(&config).await,
        Commands::Listen => listen::execute(&config).await,
        Commands::Received => listen::list_received(&config).await,
    }
}
