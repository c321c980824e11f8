/*
cargo run --bin clean_data -- --data_type test --error-log logs/job_errors.txt

pbpaste | cargo run --bin clean_data -- --data_type train

cargo run --bin clean_data -- \
    --file data/datasets/function-calling-chatml/test/test.jsonl \
    --error-log -
*/

use anyhow::Result;
use clap::Parser;
use simplelog::LevelFilter;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use finetune_setup::logging::init_term_logging;
use finetune_setup::layout::jsonl_target;
use finetune_setup::cleaner::read_error_log;
use finetune_setup::remove_lines_from_jsonl;

/// Drop the JSONL lines a fine-tuning job reported as malformed.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Split to clean (train / test)
    #[arg(long = "data_type", default_value = "train")]
    data_type: String,

    /// Dataset directory name under <data-root>/datasets
    #[arg(long, default_value = "function-calling-chatml")]
    dataset: String,

    /// Root of the datasets/ tree
    #[arg(long = "data-root", value_name = "DIR", default_value = "data")]
    data_root: PathBuf,

    /// Explicit JSONL path, overrides --data_type/--dataset
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Error log file; "-" or omitted reads stdin
    #[arg(long = "error-log", value_name = "PATH")]
    error_log: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_term_logging(LevelFilter::Warn)?;

    let jsonl_file = jsonl_target(
        cli.file.as_deref(),
        &cli.data_root,
        &cli.dataset,
        &cli.data_type,
    );
    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    let error_log = read_error_log(cli.error_log.as_deref(), stdin.lock(), interactive)?;

    let stats = remove_lines_from_jsonl(&jsonl_file, &error_log)?;

    println!("Processed {} lines", stats.lines_processed);
    println!("Removed {} lines", stats.lines_removed);
    Ok(())
}
