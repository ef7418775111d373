use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "sift", version, about = "Plan partial, chunked MySQL dumps")]
struct Cli {
    /// Configuration file
    #[arg(long, short, global = true, default_value = "sift.yaml")]
    config: PathBuf,

    /// Log filter (e.g. "debug", "sift_runtime=debug"); overrides RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the filters of the configuration and report conflicts
    Check,

    /// Build the instance cache and print the chunking plan as JSON
    Plan {
        /// Print the whole instance cache instead of the plan
        #[arg(long, default_value_t = false)]
        cache: bool,

        /// Build even when the filters contain conflicts
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match cli.cmd {
        Command::Check => commands::check::run(&cli.config)?,
        Command::Plan { cache, force } => commands::plan::run(&cli.config, cache, force).await?,
    }

    Ok(())
}

/// Logs go to stderr; stdout carries the JSON output.
fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
