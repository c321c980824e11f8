// Dataset preparation for fine-tuning runs.
//
// `cleaner` scrubs JSONL files using a validation error log, the remaining
// modules back the one-time `setup` binary (model pull + dataset split).

pub mod cleaner;
pub mod config;
pub mod dataset;
pub mod layout;
pub mod logging;
pub mod model;
pub mod runner;
pub mod split;

pub use cleaner::{extract_line_numbers, remove_lines_from_jsonl, CleanStats};
pub use config::{load_args, SetupArgs};
pub use layout::DataLayout;

/// What a setup task ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Output was already complete, nothing fetched.
    Skipped,
    Completed,
}
