use anyhow::{bail, Context, Result};
use arrow::array::UInt64Array;
use arrow::compute::{concat_batches, take_record_batch};
use arrow::json::writer::{LineDelimited, WriterBuilder};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::layout::{dataset_name_from_url, is_complete, mark_complete, DataLayout};
use crate::split::{split_indices, SPLIT_SEED};
use crate::TaskOutcome;

const HUB_ENDPOINT: &str = "https://huggingface.co";

/// Where the parquet bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    Http(String),
    Local(PathBuf),
}

impl DatasetSource {
    /// `hf://datasets/<owner>/<name>/<file>` resolves against the Hub's main
    /// revision, `http(s)://` is fetched as is, anything else is a local path.
    pub fn parse(locator: &str) -> Result<Self> {
        if let Some(rest) = locator.strip_prefix("hf://datasets/") {
            let mut parts = rest.splitn(3, '/');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(owner), Some(name), Some(file))
                    if !owner.is_empty() && !name.is_empty() && !file.is_empty() =>
                {
                    Ok(Self::Http(format!(
                        "{HUB_ENDPOINT}/datasets/{owner}/{name}/resolve/main/{file}"
                    )))
                }
                _ => bail!("expected hf://datasets/<owner>/<name>/<file>, got {locator}"),
            }
        } else if locator.starts_with("https://") || locator.starts_with("http://") {
            Ok(Self::Http(locator.to_string()))
        } else {
            Ok(Self::Local(PathBuf::from(locator)))
        }
    }
}

fn is_hub_host(url: &str) -> bool {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h == "huggingface.co" || h.ends_with(".huggingface.co")))
        .unwrap_or(false)
}

/// Fetches the parquet file at `data_parquet_url`, splits it and writes
/// `train/train.jsonl` and `test/test.jsonl` under the dataset directory.
pub async fn download_dataset(
    data_parquet_url: &str,
    test_split: f64,
    token: Option<&str>,
    layout: &DataLayout,
) -> Result<TaskOutcome> {
    info!("Starting dataset download from {data_parquet_url}");
    let outcome = fetch_and_split(data_parquet_url, test_split, token, layout).await;
    if let Err(e) = &outcome {
        error!("Failed to process dataset {data_parquet_url}: {e:#}");
    }
    outcome
}

async fn fetch_and_split(
    url: &str,
    test_split: f64,
    token: Option<&str>,
    layout: &DataLayout,
) -> Result<TaskOutcome> {
    let dataset_name = dataset_name_from_url(url)?;
    let dataset_dir = layout.dataset_dir(dataset_name);
    if is_complete(&dataset_dir) {
        info!("Dataset {dataset_name} already exists in {}", dataset_dir.display());
        return Ok(TaskOutcome::Skipped);
    }

    let train_path = layout.split_file(dataset_name, "train");
    let test_path = layout.split_file(dataset_name, "test");
    info!("Creating directory structure...");
    for path in [&train_path, &test_path] {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
    }

    let raw = match DatasetSource::parse(url)? {
        DatasetSource::Http(remote) => fetch_bytes(&remote, token).await?,
        DatasetSource::Local(path) => {
            info!("Reading parquet file {}...", path.display());
            let bytes = tokio::task::spawn_blocking(move || {
                fs::read(&path).with_context(|| format!("reading {}", path.display()))
            })
            .await
            .context("local read task panicked")??;
            Bytes::from(bytes)
        }
    };

    tokio::task::spawn_blocking(move || split_and_save(raw, test_split, &train_path, &test_path))
        .await
        .context("dataset split task panicked")??;

    mark_complete(&dataset_dir)?;
    info!("Dataset processing completed successfully");
    Ok(TaskOutcome::Completed)
}

async fn fetch_bytes(url: &str, token: Option<&str>) -> Result<Bytes> {
    info!("Reading parquet file...");
    let client = reqwest::Client::builder().build()?;
    let mut request = client.get(url);
    if let Some(token) = token.filter(|_| is_hub_host(url)) {
        request = request.bearer_auth(token);
    }
    let mut response = request
        .send()
        .await
        .with_context(|| format!("GET {url}"))?
        .error_for_status()
        .with_context(|| format!("GET {url}"))?;

    let bar = match response.content_length() {
        Some(len) => {
            let bar = ProgressBar::new(len);
            bar.set_style(ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )?);
            bar
        }
        None => ProgressBar::new_spinner(),
    };

    let mut buf = Vec::with_capacity(response.content_length().unwrap_or(0) as usize);
    while let Some(chunk) = response
        .chunk()
        .await
        .with_context(|| format!("downloading {url}"))?
    {
        bar.inc(chunk.len() as u64);
        buf.extend_from_slice(&chunk);
    }
    bar.finish_and_clear();
    debug!("Downloaded {} bytes from {url}", buf.len());
    Ok(Bytes::from(buf))
}

/// Decodes every row group of a parquet file into a single batch.
pub fn read_parquet(raw: Bytes) -> Result<RecordBatch> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(raw).context("reading parquet metadata")?;
    let schema = builder.schema().clone();
    let batches = builder
        .build()?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("decoding parquet row groups")?;
    Ok(concat_batches(&schema, &batches)?)
}

fn take_rows(table: &RecordBatch, rows: &[usize]) -> Result<RecordBatch> {
    let indices = UInt64Array::from_iter_values(rows.iter().map(|&i| i as u64));
    Ok(take_record_batch(table, &indices)?)
}

/// One JSON object per row, nulls kept as explicit `null`.
pub fn write_jsonl(path: &Path, batch: &RecordBatch) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = WriterBuilder::new()
        .with_explicit_nulls(true)
        .build::<_, LineDelimited>(BufWriter::new(file));
    writer
        .write(batch)
        .with_context(|| format!("serialising rows to {}", path.display()))?;
    writer.finish()?;
    writer.into_inner().flush()?;
    Ok(())
}

/// Splits the parquet table with the fixed seed and writes both partitions.
/// Returns `(train_rows, test_rows)`.
pub fn split_and_save(
    raw: Bytes,
    test_split: f64,
    train_path: &Path,
    test_path: &Path,
) -> Result<(usize, usize)> {
    let table = read_parquet(raw)?;
    info!("Dataset loaded with {} rows", table.num_rows());

    info!("Splitting dataset with test_split={test_split}");
    let split = split_indices(table.num_rows(), test_split, SPLIT_SEED)?;
    debug!(
        "Train set size: {}, Eval set size: {}",
        split.train.len(),
        split.test.len()
    );

    info!("Saving train set...");
    write_jsonl(train_path, &take_rows(&table, &split.train)?)?;
    info!("Saving eval set...");
    write_jsonl(test_path, &take_rows(&table, &split.test)?)?;

    Ok((split.train.len(), split.test.len()))
}
