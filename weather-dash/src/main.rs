//! Binary crate for the `weather-dash` dashboard.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Serving the JSON endpoints and the HTML dashboard
//! - Human-friendly terminal output

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod render;
mod server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    init_tracing(cmd.verbose);
    cmd.run().await
}

/// `RUST_LOG` wins; otherwise `info`, or `debug` with `--verbose`.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
