//! easyai - prompt workbench and call log for several LLM providers.
//!
//! `easyai ui` serves the dashboard API; every other command works on the
//! project workspace directly.

mod cli;
mod config;
mod error;
mod models;
mod routes;
mod server;
mod services;
mod state;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("easyai=info,tower_http=info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = cli::Cli::parse();
    if let Err(e) = cli::run(cli).await {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
