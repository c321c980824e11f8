/*
cargo run --release --bin setup

cargo run --release --bin setup -- \
    --config config/setup.yaml \
    --data-root data \
    --verbose
*/

use anyhow::Result;
use clap::Parser;
use log::{error, info};
use simplelog::LevelFilter;
use std::path::PathBuf;

use finetune_setup::logging::init_logging;
use finetune_setup::runner::run_setup;
use finetune_setup::{load_args, DataLayout};

/// Download the base model and split the fine-tuning dataset.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// YAML with hf_model_id, hf_data_parquet_url and optional test_split
    #[arg(long, value_name = "PATH", default_value = "config/setup.yaml")]
    config: PathBuf,

    /// Root of the models/ and datasets/ trees
    #[arg(long = "data-root", value_name = "DIR", default_value = "data")]
    data_root: PathBuf,

    /// Directory for the per-run log file
    #[arg(long = "log-dir", value_name = "DIR", default_value = "logs")]
    log_dir: PathBuf,

    /// Log at DEBUG instead of INFO
    #[arg(long)]
    verbose: bool,

    /// HF access token (falls back to cached creds)
    #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    let log_path = init_logging(&cli.log_dir, "setup", level)?;

    info!("Starting setup process (log: {})", log_path.display());
    info!("Using config file: {}", cli.config.display());

    let layout = DataLayout::new(&cli.data_root);
    let outcome = match load_args(&cli.config) {
        Ok(args) => run_setup(&args, cli.token, &layout).await.map(|_| ()),
        Err(e) => Err(e),
    };
    if let Err(e) = &outcome {
        error!("Setup failed: {e:#}");
    }
    outcome
}
