use anyhow::{bail, Context, Result};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_test_split() -> f64 {
    0.05
}

/// Contents of `config/setup.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SetupArgs {
    // Hub repository of the base model, e.g. "mistralai/Mistral-7B-Instruct-v0.3"
    pub hf_model_id: String,
    // Parquet locator containing "/datasets/<owner>/<name>/"
    pub hf_data_parquet_url: String,
    // Fraction of rows held out for evaluation; range is checked at split time
    #[serde(default = "default_test_split")]
    pub test_split: f64,
}

impl SetupArgs {
    pub fn validate(&self) -> Result<()> {
        if self.hf_model_id.trim().is_empty() {
            bail!("hf_model_id must not be empty");
        }
        if self.hf_data_parquet_url.trim().is_empty() {
            bail!("hf_data_parquet_url must not be empty");
        }
        Ok(())
    }
}

pub fn load_args(config_path: &Path) -> Result<SetupArgs> {
    info!("Loading configuration from {}", config_path.display());
    let loaded = read_args(config_path);
    if let Err(e) = &loaded {
        error!("Failed to load config from {}: {e:#}", config_path.display());
    }
    loaded
}

fn read_args(config_path: &Path) -> Result<SetupArgs> {
    let text = fs::read_to_string(config_path)
        .with_context(|| format!("reading {}", config_path.display()))?;
    let args: SetupArgs = serde_yaml::from_str(&text)
        .with_context(|| format!("parsing {}", config_path.display()))?;
    debug!("Loaded config: {args:?}");
    args.validate()?;
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn load_str(yaml: &str) -> Result<SetupArgs> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("setup.yaml");
        fs::write(&path, yaml).unwrap();
        load_args(&path)
    }

    #[test]
    fn test_split_defaults() {
        let args = load_str(
            "hf_model_id: mistralai/Mistral-7B-Instruct-v0.3\n\
             hf_data_parquet_url: hf://datasets/owner/chatml/data/train.parquet\n",
        )
        .unwrap();
        assert_eq!(args.hf_model_id, "mistralai/Mistral-7B-Instruct-v0.3");
        assert_eq!(args.test_split, 0.05);
    }

    #[test]
    fn explicit_split_and_extra_keys() {
        let args = load_str(
            "hf_model_id: a/b\nhf_data_parquet_url: hf://datasets/o/n/x.parquet\ntest_split: 0.2\nnotes: ignored\n",
        )
        .unwrap();
        assert_eq!(args.test_split, 0.2);
    }

    #[test]
    fn out_of_range_split_loads() {
        // rejected later by the splitter, not here
        let args = load_str("hf_model_id: a/b\nhf_data_parquet_url: u/datasets/o/n\ntest_split: 1.5\n").unwrap();
        assert_eq!(args.test_split, 1.5);
    }

    #[test]
    fn missing_or_empty_fields_fail() {
        assert!(load_str("hf_model_id: a/b\n").is_err());
        assert!(load_str("hf_model_id: ''\nhf_data_parquet_url: x\n").is_err());
        assert!(load_str("hf_model_id: a/b\nhf_data_parquet_url: '  '\n").is_err());
    }

    #[test]
    fn missing_file_names_path() {
        let err = load_args(Path::new("does/not/exist.yaml")).unwrap_err();
        assert!(format!("{err:#}").contains("does/not/exist.yaml"));
    }
}
