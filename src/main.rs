use clap::Parser;
use tracing_subscriber::EnvFilter;

use near_cli::cli::{self, Cli};

/// Logs go to stderr so command output on stdout stays clean
fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "near_cli=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Any unhandled error ends the process here
    if let Err(e) = cli::run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
