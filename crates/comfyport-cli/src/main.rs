//! comfyport CLI binary.
//!
//! Entry point for the `comfyport` command-line tool. It initializes
//! logging via `tracing`, parses arguments with `clap`, and dispatches to
//! the build or release handler. Handlers that talk to GitHub start their
//! own runtime, so `main` stays synchronous.

mod cli;
mod commands;

use miette::Result;

fn main() -> Result<()> {
    let args = cli::parse();

    let default_filter = if args.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    commands::dispatch(args)
}
