use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Sentinel written once a setup task finished writing its output.
pub const COMPLETE_MARKER: &str = ".setup-complete";

/// Local directory convention shared by the setup tasks and `clean_data`.
///
/// ```text
/// <root>/models/<model_name>/...
/// <root>/datasets/<dataset_name>/train/train.jsonl
/// <root>/datasets/<dataset_name>/test/test.jsonl
/// ```
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl Default for DataLayout {
    fn default() -> Self {
        Self::new("data")
    }
}

impl DataLayout {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn model_dir(&self, model_name: &str) -> PathBuf {
        self.root.join("models").join(model_name)
    }

    pub fn dataset_dir(&self, dataset_name: &str) -> PathBuf {
        self.root.join("datasets").join(dataset_name)
    }

    /// `<root>/datasets/<dataset>/<split>/<split>.jsonl`
    pub fn split_file(&self, dataset_name: &str, split: &str) -> PathBuf {
        self.dataset_dir(dataset_name)
            .join(split)
            .join(format!("{split}.jsonl"))
    }
}

/// JSONL file `clean_data` works on: `explicit` if given, otherwise
/// `<root>/datasets/<dataset>/<split>/<split>.jsonl`.
pub fn jsonl_target(explicit: Option<&Path>, root: &Path, dataset: &str, split: &str) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => DataLayout::new(root).split_file(dataset, split),
    }
}

/// "mistralai/Mistral-7B-Instruct-v0.3" -> "Mistral-7B-Instruct-v0.3"
pub fn model_name_from_id(model_id: &str) -> &str {
    model_id.rsplit('/').next().unwrap_or(model_id)
}

/// Name of the dataset repo in a locator of the form
/// `.../datasets/<owner>/<name>/...`.
pub fn dataset_name_from_url(url: &str) -> Result<&str> {
    let (_, tail) = url
        .split_once("/datasets/")
        .with_context(|| format!("no '/datasets/' segment in {url}"))?;
    tail.split('/')
        .nth(1)
        .filter(|name| !name.is_empty())
        .with_context(|| format!("no dataset name after '/datasets/<owner>/' in {url}"))
}

pub fn is_complete(dir: &Path) -> bool {
    dir.join(COMPLETE_MARKER).is_file()
}

pub fn mark_complete(dir: &Path) -> Result<()> {
    let marker = dir.join(COMPLETE_MARKER);
    fs::write(&marker, b"")
        .with_context(|| format!("writing completion marker {}", marker.display()))
}
