//! Auction price comparison CLI
//!
//! Runs normalization, offline scoring or the full comparison pipeline
//! from the terminal.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cmd;
mod config;
mod output;

use config::Config;

#[derive(Parser)]
#[command(name = "compare")]
#[command(about = "Compare auction lot prices with current web prices")]
#[command(version)]
struct Cli {
    /// Print raw JSON instead of the formatted report
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a lot title and print its signatures
    Normalize {
        /// Raw lot title
        title: String,

        /// Two-letter locale of the title
        #[arg(short, long, default_value = "en")]
        locale: String,
    },

    /// Score saved web results against an auction price (no network)
    Score {
        /// Auction total price, premium included
        #[arg(short, long)]
        price: f64,

        /// JSON array of web price results
        #[arg(short, long)]
        results: PathBuf,

        /// Lot title; when given, results are relevance-filtered first
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Run the full comparison for an auction record
    Compare {
        /// JSON auction record (camelCase fields)
        #[arg(short, long)]
        auction: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,price_compare=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::Normalize { title, locale } => cmd::normalize::run(&config, &title, &locale, cli.json).await,
        Commands::Score {
            price,
            results,
            title,
        } => cmd::score::run(&config, price, &results, title.as_deref(), cli.json),
        Commands::Compare { auction } => cmd::compare::run(&config, &auction, cli.json).await,
    }
}
