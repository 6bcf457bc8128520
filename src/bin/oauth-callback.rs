use clap::Parser;

use pacing_sync::cli::CallbackCli;
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt};

fn main() {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = CallbackCli::parse();

    if let Err(e) = cli.run() {
        error!("Error: {}", e);
        std::process::exit(1);
    }
}
