use anyhow::Result;
use clap::Parser;
use pgopf_cli::{Cli, Commands};
use tracing::debug;
use tracing_subscriber::FmtSubscriber;

mod commands;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON on stdout stays machine-readable.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    debug!(command = ?cli.command, "starting");

    match &cli.command {
        Commands::Inspect { case, json } => commands::inspect::handle(case, *json),
        Commands::Features {
            case,
            num_iterations,
            no_solve,
            out,
        } => commands::features::handle(case, *num_iterations, *no_solve, out.as_deref()),
        Commands::Forward {
            case,
            config,
            seed,
            out,
        } => commands::forward::handle(case, config.as_deref(), *seed, out.as_deref()),
        Commands::Models => commands::models::handle(),
    }
}
