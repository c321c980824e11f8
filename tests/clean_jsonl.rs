use anyhow::Result;
use finetune_setup::{remove_lines_from_jsonl, CleanStats, DataLayout};
use std::fs;
use tempfile::tempdir;

// Shape of the validator output the cleaner is fed with.
const JOB_LOG: &str = "
 The data in line 2 of dataset /opt/ml/input/data/train/train.jsonl is incorrectly formatted.Assistant message must have either content or tool_calls, but not both.
 The data in line 4 of dataset /opt/ml/input/data/train/train.jsonl is incorrectly formatted.Assistant message must have either content or tool_calls, but not both.
";

#[test]
fn cleans_split_file_in_layout() -> Result<()> {
    let dir = tempdir()?;
    let layout = DataLayout::new(dir.path());
    let path = layout.split_file("function-calling-chatml", "train");
    fs::create_dir_all(path.parent().unwrap())?;

    let rows: Vec<String> = (0..6)
        .map(|i| format!(r#"{{"messages":[{{"role":"user","content":"q{i}"}}]}}"#))
        .collect();
    fs::write(&path, rows.join("\n") + "\n")?;

    let stats = remove_lines_from_jsonl(&path, JOB_LOG)?;
    assert_eq!(
        stats,
        CleanStats {
            lines_processed: 6,
            lines_removed: 2
        }
    );

    let out = fs::read_to_string(&path)?;
    let kept: Vec<&str> = out.lines().collect();
    assert_eq!(
        kept,
        vec![rows[0].as_str(), rows[2].as_str(), rows[4].as_str(), rows[5].as_str()]
    );

    let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".jsonl.temp"))
        .collect();
    assert!(leftovers.is_empty());
    Ok(())
}
