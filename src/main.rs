#![forbid(unsafe_code)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

use circom_bench::config::BenchConfig;
use circom_bench::run_cmd::RunArgs;
use circom_bench::{BenchResult, artifacts_cmd, explore_cmd, run_cmd};

#[derive(Parser, Debug)]
#[command(name = "circom-bench")]
#[command(about = "Compare Circom witness generators and Groth16 provers", long_about = None)]
struct Cli {
    /// Enable verbose logging (or set CIRCOM_BENCH_LOG)
    #[arg(long, global = true)]
    verbose: bool,

    /// Config file (defaults to ./circom-bench.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the circuit artifacts
    #[arg(long, global = true)]
    artifacts_dir: Option<PathBuf>,

    /// Base URL the artifacts are fetched from
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Device label for the summary line
    #[arg(long, global = true)]
    device: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the benchmark circuits and their artifacts
    Circuits {
        /// Show the exploration circuit instead
        #[arg(long)]
        exploration: bool,
    },

    /// Show artifact status, optionally downloading missing files
    Artifacts {
        /// Fetch artifacts that are not present locally
        #[arg(long)]
        download: bool,
        /// Print the SHA-256 of each present artifact
        #[arg(long)]
        hash: bool,
        /// Use the exploration circuit's artifacts
        #[arg(long)]
        exploration: bool,
    },

    /// Run the witness and proof benchmark over all circuits
    Run {
        /// Fetch missing artifacts first
        #[arg(long)]
        download: bool,
        /// Verify proofs for circuits that carry a verification key
        #[arg(long)]
        verify: bool,
        /// Use mock backends instead of the native libraries
        #[arg(long)]
        mock: bool,
        /// Write the result table as JSON to this file
        #[arg(long)]
        json: Option<PathBuf>,
        /// Write the result table as CSV to this file
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Witness, prove and verify the standalone circuit
    Explore {
        /// Fetch missing artifacts first
        #[arg(long)]
        download: bool,
        /// Write the exploration report as JSON to this file
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let env = std::env::var("CIRCOM_BENCH_LOG").unwrap_or_else(|_| {
        if verbose { "circom_bench=debug".to_string() } else { "circom_bench=info".to_string() }
    });
    let _ = tracing_subscriber::fmt()
        .with_span_events(FmtSpan::ACTIVE)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_env_filter(EnvFilter::new(env))
        .try_init();
}

fn load_config(cli: &Cli) -> BenchResult<BenchConfig> {
    let mut config = BenchConfig::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.artifacts_dir {
        config.artifacts_dir = dir.clone();
    }
    if let Some(url) = &cli.base_url {
        config.base_url = url.clone();
    }
    if let Some(device) = &cli.device {
        config.device = Some(device.clone());
    }
    Ok(config)
}

fn main() {
    color_eyre::install().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = load_config(&cli).and_then(|config| match cli.command {
        Commands::Circuits { exploration } => artifacts_cmd::list_circuits(&config, exploration),
        Commands::Artifacts { download, hash, exploration } => {
            artifacts_cmd::run(&config, download, hash, exploration)
        }
        Commands::Run { download, verify, mock, json, csv } => {
            run_cmd::run(&config, RunArgs { download, verify, mock, json, csv })
        }
        Commands::Explore { download, json } => explore_cmd::run(&config, download, json),
    });

    if let Err(e) = result {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
