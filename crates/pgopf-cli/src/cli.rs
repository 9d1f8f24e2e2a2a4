use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Physics-guided OPF feature construction", long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Summarize a case: element counts, admittance sparsity, import diagnostics
    Inspect {
        /// MATPOWER file or built-in case name (e.g. case6ww)
        case: String,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Build the stacked voltage-iterate features for a case
    Features {
        /// MATPOWER file or built-in case name (e.g. case6ww)
        case: String,
        /// Number of iterates K (output has 2K columns)
        #[arg(short = 'k', long, default_value_t = 4)]
        num_iterations: usize,
        /// Use the snapshot as-is instead of running a power flow first
        #[arg(long)]
        no_solve: bool,
        /// Write JSON to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Run a freshly initialised model on a case's features
    Forward {
        /// MATPOWER file or built-in case name (e.g. case6ww)
        case: String,
        /// Experiment configuration (TOML); defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,
        /// Override the configured seed
        #[arg(long)]
        seed: Option<u64>,
        /// Write JSON to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// List supported model ids
    Models,
}
