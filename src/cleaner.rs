use anyhow::{bail, Context, Result};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::IgnoredAny;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

// Message emitted by the fine-tuning job's dataset validator, e.g.
// "The data in line 1704 of dataset /opt/ml/input/data/test/test.jsonl is incorrectly formatted."
static LINE_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"The data in line (\d+) of dataset").expect("static regex"));

/// Suffix of the scratch file written next to the JSONL being cleaned.
pub const TEMP_SUFFIX: &str = ".jsonl.temp";

/// 1-based line numbers referenced by `error_log`, in order of appearance.
pub fn extract_line_numbers(error_log: &str) -> Vec<usize> {
    LINE_REF
        .captures_iter(error_log)
        .filter_map(|caps| caps[1].parse().ok())
        .collect()
}

/// Error log text from `path`, or from `stdin` when `path` is `None` or `-`.
///
/// Refuses to wait on an `interactive` stdin so a missing flag fails fast.
pub fn read_error_log<R: Read>(path: Option<&Path>, mut stdin: R, interactive: bool) -> Result<String> {
    match path {
        Some(path) if path.as_os_str() != "-" => fs::read_to_string(path)
            .with_context(|| format!("reading error log {}", path.display())),
        _ => {
            if interactive {
                bail!("no error log given: pass --error-log <PATH> or pipe the log into stdin");
            }
            let mut text = String::new();
            stdin
                .read_to_string(&mut text)
                .context("reading error log from stdin")?;
            Ok(text)
        }
    }
}

/// Per-line decision made while rewriting a JSONL file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineVerdict {
    /// Not valid JSON; dropped without being counted.
    Malformed,
    Keep,
    /// Valid JSON but flagged by the error log.
    Remove,
}

impl LineVerdict {
    pub fn classify(index: usize, line: &str, to_remove: &HashSet<usize>) -> Self {
        if serde_json::from_str::<IgnoredAny>(line.trim()).is_err() {
            LineVerdict::Malformed
        } else if to_remove.contains(&index) {
            LineVerdict::Remove
        } else {
            LineVerdict::Keep
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanStats {
    /// Lines that parsed as JSON (kept or removed).
    pub lines_processed: usize,
    pub lines_removed: usize,
}

impl CleanStats {
    /// Folds one verdict into the counters. Returns true when the line is written out.
    pub fn record(&mut self, verdict: LineVerdict) -> bool {
        match verdict {
            LineVerdict::Malformed => false,
            LineVerdict::Remove => {
                self.lines_processed += 1;
                self.lines_removed += 1;
                false
            }
            LineVerdict::Keep => {
                self.lines_processed += 1;
                true
            }
        }
    }
}

/// Rewrites `jsonl_file` in place without the lines named in `error_log`
/// and without any line that is not valid JSON.
///
/// Output goes to a `*.jsonl.temp` sibling that is renamed over the
/// original once fully written. The scratch file never outlives the call.
pub fn remove_lines_from_jsonl<P: AsRef<Path>>(jsonl_file: P, error_log: &str) -> Result<CleanStats> {
    let path = jsonl_file.as_ref();
    let to_remove: HashSet<usize> = extract_line_numbers(error_log)
        .into_iter()
        .filter_map(|n| n.checked_sub(1))
        .collect();
    debug!("{} line(s) flagged for removal in {}", to_remove.len(), path.display());

    let input = File::open(path).with_context(|| format!("opening {}", path.display()))?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    // removed on drop unless persisted
    let scratch = tempfile::Builder::new()
        .prefix(&format!("{stem}."))
        .suffix(TEMP_SUFFIX)
        .tempfile_in(dir)
        .with_context(|| format!("creating scratch file in {}", dir.display()))?;

    let mut reader = BufReader::new(input);
    let mut writer = BufWriter::new(scratch);
    let mut stats = CleanStats::default();
    let mut line = String::new();
    let mut index = 0usize;

    loop {
        line.clear();
        let read = reader
            .read_line(&mut line)
            .with_context(|| format!("reading line {} of {}", index + 1, path.display()))?;
        if read == 0 {
            break;
        }
        let verdict = LineVerdict::classify(index, &line, &to_remove);
        if stats.record(verdict) {
            writer.write_all(line.as_bytes())?;
        }
        index += 1;
    }

    let scratch = writer.into_inner().map_err(|e| e.into_error())?;
    scratch.as_file().sync_all()?;
    scratch
        .persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("replacing {}", path.display()))?;

    Ok(stats)
}
