use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use std::collections::HashSet;

/// Seed for the train/test sample; fixed so reruns reproduce the same split.
pub const SPLIT_SEED: u64 = 200;

/// Row indices of each partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    /// Sampled rows, in sample order.
    pub train: Vec<usize>,
    /// Every row not in `train`, in original order.
    pub test: Vec<usize>,
}

/// Number of training rows for `rows` rows and a held-out fraction of
/// `test_split` (round half to even).
pub fn train_size(rows: usize, test_split: f64) -> Result<usize> {
    if !(0.0..1.0).contains(&test_split) {
        bail!("test_split must be in [0, 1), got {test_split}");
    }
    let n = (rows as f64 * (1.0 - test_split)).round_ties_even() as usize;
    Ok(n.min(rows))
}

pub fn split_indices(rows: usize, test_split: f64, seed: u64) -> Result<SplitIndices> {
    let n_train = train_size(rows, test_split)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let train = sample(&mut rng, rows, n_train).into_vec();

    let picked: HashSet<usize> = train.iter().copied().collect();
    let test = (0..rows).filter(|i| !picked.contains(i)).collect();

    Ok(SplitIndices { train, test })
}
