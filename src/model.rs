use anyhow::{bail, Context, Result};
use hf_hub::api::tokio::ApiBuilder;
use hf_hub::{Repo, RepoType};
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::layout::{is_complete, mark_complete, model_name_from_id, DataLayout};
use crate::TaskOutcome;

/// The only checkpoint files pulled from the model repo.
pub const MODEL_FILES: [&str; 3] = ["params.json", "consolidated.safetensors", "tokenizer.model.v3"];

/// Pulls [`MODEL_FILES`] of `model_id` into `<root>/models/<model_name>`.
///
/// `token` falls back to the cached Hub credentials when `None`.
pub async fn download_model(
    model_id: &str,
    token: Option<String>,
    layout: &DataLayout,
) -> Result<TaskOutcome> {
    info!("Starting model download for {model_id}");
    let models_path = layout.model_dir(model_name_from_id(model_id));

    if is_complete(&models_path) {
        info!("Model {model_id} already exists in {}", models_path.display());
        return Ok(TaskOutcome::Skipped);
    }

    info!("Creating directory: {}", models_path.display());
    fs::create_dir_all(&models_path)
        .with_context(|| format!("creating {}", models_path.display()))?;

    match pull_files(model_id, token, &models_path).await {
        Ok(count) => {
            mark_complete(&models_path)?;
            info!(
                "Successfully downloaded {count} model file(s) to {}",
                models_path.display()
            );
            Ok(TaskOutcome::Completed)
        }
        Err(e) => {
            error!("Failed to download model {model_id}: {e:#}");
            Err(e)
        }
    }
}

async fn pull_files(model_id: &str, token: Option<String>, dst: &Path) -> Result<usize> {
    info!("Downloading model files...");
    let mut builder = ApiBuilder::new().with_progress(true);
    if token.is_some() {
        builder = builder.with_token(token);
    }
    let api = builder.build()?;
    let handle = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

    let remote: HashSet<String> = handle
        .info()
        .await
        .with_context(|| format!("listing files of {model_id}"))?
        .siblings
        .into_iter()
        .map(|sib| sib.rfilename)
        .collect();

    let (present, missing) = select_files(&remote);
    for name in &missing {
        warn!("{name} not found in {model_id}, skipping");
    }
    if present.is_empty() {
        bail!("none of {MODEL_FILES:?} exist in {model_id}");
    }

    for name in &present {
        // download into the hub cache (or reuse it), then place in the target tree
        let cached = handle
            .get(name)
            .await
            .with_context(|| format!("downloading {name} from {model_id}"))?;
        link_or_copy(&cached, &dst.join(name))?;
        debug!("{name} -> {}", dst.display());
    }
    Ok(present.len())
}

/// Splits [`MODEL_FILES`] into (available, missing) given the remote listing.
pub fn select_files(remote: &HashSet<String>) -> (Vec<&'static str>, Vec<&'static str>) {
    MODEL_FILES
        .iter()
        .copied()
        .partition(|name| remote.contains(*name))
}

fn link_or_copy(cached: &Path, local: &Path) -> Result<()> {
    if let Some(parent) = local.parent() {
        fs::create_dir_all(parent)?;
    }
    // leftover from an interrupted run; copying onto a hard link would truncate the cache
    if local.exists() {
        fs::remove_file(local)?;
    }
    if fs::hard_link(cached, local).is_err() {
        fs::copy(cached, local)
            .with_context(|| format!("copying {} to {}", cached.display(), local.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::COMPLETE_MARKER;
    use tempfile::tempdir;

    #[test]
    fn selects_allow_listed_files_only() {
        let remote: HashSet<String> = [
            "params.json",
            "consolidated.safetensors",
            "model-00001-of-00003.safetensors",
            "README.md",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        let (present, missing) = select_files(&remote);
        assert_eq!(present, vec!["params.json", "consolidated.safetensors"]);
        assert_eq!(missing, vec!["tokenizer.model.v3"]);
    }

    #[test]
    fn link_or_copy_replaces_stale_file() {
        let dir = tempdir().unwrap();
        let cached = dir.path().join("cache.bin");
        let local = dir.path().join("out/params.json");
        fs::write(&cached, b"fresh").unwrap();
        fs::create_dir_all(local.parent().unwrap()).unwrap();
        fs::write(&local, b"stale").unwrap();

        link_or_copy(&cached, &local).unwrap();
        assert_eq!(fs::read(&local).unwrap(), b"fresh");
        assert_eq!(fs::read(&cached).unwrap(), b"fresh");
    }

    #[tokio::test]
    async fn completed_model_is_skipped() {
        let dir = tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        let model_dir = layout.model_dir("Some-Model");
        fs::create_dir_all(&model_dir).unwrap();
        fs::write(model_dir.join(COMPLETE_MARKER), b"").unwrap();

        let outcome = download_model("nobody/Some-Model", None, &layout).await.unwrap();
        assert_eq!(outcome, TaskOutcome::Skipped);
    }
}
