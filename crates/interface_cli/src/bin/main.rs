//! Prior Authorization CLI Binary
//!
//! Offline conversion between canonical claims and partner service reviews,
//! and partner status normalisation.
//!
//! # Usage
//!
//! ```bash
//! prior-auth convert claim.json --pretty
//! prior-auth revert review.json
//! prior-auth status A4 "Pended (Complete)"
//!
//! # Override a partner code
//! PRIOR_AUTH_DEFAULTS__SERVICE_TYPE_CODE=1 prior-auth convert claim.json
//! ```
//!
//! Output goes to stdout as JSON; logs go to stderr.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use interface_cli::{commands, AppConfig};

#[derive(Parser)]
#[command(name = "prior-auth")]
#[command(about = "Prior authorization bridge between canonical claims and partner service reviews")]
struct Cli {
    /// Configuration file layered over `prior-auth.toml`
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a canonical claim into a partner service review
    Convert {
        /// Claim JSON file
        file: PathBuf,
    },
    /// Convert a partner service review into a canonical claim
    Revert {
        /// Service review JSON file, wrapped or bare
        file: PathBuf,
    },
    /// Normalise a partner status code
    Status {
        /// Partner status code
        code: String,
        /// Partner status text
        #[arg(default_value = "")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    config.validate()?;
    init_tracing(&config.log_level);

    match cli.command {
        Commands::Convert { file } => {
            let payload = read_json(&file).await?;
            let review = commands::convert(&payload, &config.defaults)?;
            print_json(&review, cli.pretty)?;
        }
        Commands::Revert { file } => {
            let payload = read_json(&file).await?;
            let claim = commands::revert(&payload, &config.defaults)
                .with_context(|| format!("{} is not a service review", file.display()))?;
            print_json(&claim, cli.pretty)?;
        }
        Commands::Status { code, text } => {
            let report = commands::describe_status(&code, &text);
            print_json(&report, cli.pretty)?;
        }
    }

    Ok(())
}

/// Initializes the tracing subscriber, writing to stderr
///
/// `RUST_LOG` wins over the configured level.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();
}

async fn read_json(path: &Path) -> anyhow::Result<Value> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{rendered}");
    Ok(())
}
