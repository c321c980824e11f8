use anyhow::{Context, Result};
use chrono::Local;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, LevelFilter, TermLogger, TerminalMode,
    WriteLogger,
};
use std::fs::{create_dir_all, File};
use std::path::{Path, PathBuf};

fn log_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        // transport crates are chatty at debug level
        .add_filter_ignore_str("hyper")
        .add_filter_ignore_str("h2")
        .add_filter_ignore_str("rustls")
        .add_filter_ignore_str("reqwest")
        .build()
}

/// Logs to stderr and to `<log_dir>/<name>_<timestamp>.log`.
/// Returns the log file path.
pub fn init_logging(log_dir: &Path, name: &str, level: LevelFilter) -> Result<PathBuf> {
    create_dir_all(log_dir).with_context(|| format!("creating {}", log_dir.display()))?;
    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let log_path = log_dir.join(format!("{name}_{ts}.log"));

    CombinedLogger::init(vec![
        TermLogger::new(level, log_config(), TerminalMode::Stderr, ColorChoice::Auto),
        WriteLogger::new(
            level,
            log_config(),
            File::create(&log_path).with_context(|| format!("creating {}", log_path.display()))?,
        ),
    ])?;
    Ok(log_path)
}

/// Terminal-only logging for short-lived tools.
pub fn init_term_logging(level: LevelFilter) -> Result<()> {
    TermLogger::init(level, log_config(), TerminalMode::Stderr, ColorChoice::Auto)?;
    Ok(())
}
