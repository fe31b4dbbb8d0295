use clap::{Parser, Subcommand};

mod commands;

use commands::{EvaluateArgs, ScheduleArgs};

#[derive(Parser)]
#[command(name = "basket-hedge")]
#[command(about = "Delta hedge monitor for a basket-token position", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate the hedge once and report the decision
    Evaluate(EvaluateArgs),
    /// Evaluate on a fixed interval until a check fails or Ctrl+C
    Schedule(ScheduleArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so `--json` output stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Evaluate(args) => commands::evaluate::run(args).await,
        Commands::Schedule(args) => commands::schedule::run(args).await,
    };

    if let Err(e) = result {
        tracing::error!("Halting: {e:#}");
        std::process::exit(1);
    }
}
