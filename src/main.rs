//! Canopy CLI entry point

use canopy::cli::{Cli, Commands};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_env("CANOPY_LOG"))
        .init();

    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Index(args) => canopy::cli::index::run(args, cli.db, cli.format),
        Commands::Query(args) => canopy::cli::query::run(args, cli.db, cli.format),
    };
    std::process::exit(code);
}
