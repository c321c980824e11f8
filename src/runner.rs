use anyhow::{Context, Result};
use log::{error, info};
use std::future::Future;

use crate::config::SetupArgs;
use crate::dataset::download_dataset;
use crate::layout::DataLayout;
use crate::model::download_model;
use crate::TaskOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupReport {
    pub model: TaskOutcome,
    pub dataset: TaskOutcome,
}

/// Runs the model pull and the dataset split side by side.
pub async fn run_setup(
    args: &SetupArgs,
    token: Option<String>,
    layout: &DataLayout,
) -> Result<SetupReport> {
    let model_task = {
        let (model_id, token, layout) = (args.hf_model_id.clone(), token.clone(), layout.clone());
        async move { download_model(&model_id, token, &layout).await }
    };
    let dataset_task = {
        let (url, test_split, layout) = (args.hf_data_parquet_url.clone(), args.test_split, layout.clone());
        async move { download_dataset(&url, test_split, token.as_deref(), &layout).await }
    };

    let report = run_both(model_task, dataset_task).await?;
    info!("Setup completed successfully");
    Ok(report)
}

/// Spawns both tasks and waits for each to finish before looking at either.
///
/// Results are checked in submission order (model first); the first failure
/// is returned and neither task is cancelled by the other.
pub async fn run_both<M, D>(model_task: M, dataset_task: D) -> Result<SetupReport>
where
    M: Future<Output = Result<TaskOutcome>> + Send + 'static,
    D: Future<Output = Result<TaskOutcome>> + Send + 'static,
{
    let model = tokio::spawn(model_task);
    let dataset = tokio::spawn(dataset_task);

    let (model, dataset) = tokio::join!(model, dataset);

    let mut outcomes = Vec::with_capacity(2);
    for (task, joined) in [("model download", model), ("dataset download", dataset)] {
        let outcome = joined
            .with_context(|| format!("{task} task panicked"))
            .and_then(|res| res);
        match outcome {
            Ok(done) => {
                info!("{task}: {done:?}");
                outcomes.push(done);
            }
            Err(e) => {
                error!("Task failed ({task}): {e:#}");
                return Err(e.context(format!("{task} failed")));
            }
        }
    }

    Ok(SetupReport {
        model: outcomes[0],
        dataset: outcomes[1],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{is_complete, mark_complete};
    use anyhow::bail;
    use std::path::PathBuf;
    use tempfile::tempdir;

    async fn settle() {
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
    }

    async fn fail_now(msg: &'static str) -> Result<TaskOutcome> {
        bail!(msg)
    }

    async fn fail_later(msg: &'static str) -> Result<TaskOutcome> {
        settle().await;
        bail!(msg)
    }

    async fn finish(outcome: TaskOutcome) -> Result<TaskOutcome> {
        Ok(outcome)
    }

    async fn finish_later(dir: PathBuf) -> Result<TaskOutcome> {
        settle().await;
        mark_complete(&dir)?;
        Ok(TaskOutcome::Completed)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn model_failure_is_reported_first() {
        let err = run_both(fail_now("hub unreachable"), fail_later("bad parquet"))
            .await
            .unwrap_err();

        let msg = format!("{err:#}");
        assert!(msg.contains("model download failed"), "{msg}");
        assert!(msg.contains("hub unreachable"), "{msg}");
        assert!(!msg.contains("bad parquet"), "{msg}");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn model_failure_does_not_cancel_dataset() {
        let dir = tempdir().unwrap();
        let dataset_dir = dir.path().to_path_buf();

        let err = run_both(fail_now("auth required"), finish_later(dataset_dir.clone()))
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("model download failed"));
        assert!(is_complete(&dataset_dir));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn dataset_failure_after_model_success() {
        let dir = tempdir().unwrap();
        let model_dir = dir.path().to_path_buf();

        let err = run_both(finish_later(model_dir.clone()), fail_now("no rows"))
            .await
            .unwrap_err();

        let msg = format!("{err:#}");
        assert!(msg.contains("dataset download failed"), "{msg}");
        assert!(is_complete(&model_dir));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn both_succeed() {
        let report = run_both(finish(TaskOutcome::Skipped), finish(TaskOutcome::Completed))
            .await
            .unwrap();
        assert_eq!(
            report,
            SetupReport {
                model: TaskOutcome::Skipped,
                dataset: TaskOutcome::Completed,
            }
        );
    }
}
