//! Extending a training set with symmetry images of its configurations.

use std::collections::BTreeMap;

use crate::basis::{SpinConfig, MAX_SPINS};
use crate::error::{SwoError, SwoResult};

/// Site permutation: spin `i` of the image is spin `permutation[i]` of the original.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symmetry {
    permutation: Vec<usize>,
}

impl Symmetry {
    pub fn new(permutation: Vec<usize>) -> SwoResult<Self> {
        if permutation.len() > MAX_SPINS {
            return Err(SwoError::InvalidOptions(format!(
                "a permutation of {} sites does not fit into a packed configuration",
                permutation.len()
            )));
        }
        let mut seen = vec![false; permutation.len()];
        for &p in &permutation {
            if p >= permutation.len() || seen[p] {
                return Err(SwoError::InvalidOptions(format!(
                    "{permutation:?} is not a permutation"
                )));
            }
            seen[p] = true;
        }
        Ok(Self { permutation })
    }

    /// All cyclic shifts of a ring of `n` sites, identity included.
    pub fn translations(n: usize) -> Vec<Self> {
        (0..n)
            .map(|shift| Self {
                permutation: (0..n).map(|i| (i + shift) % n).collect(),
            })
            .collect()
    }

    pub fn number_spins(&self) -> usize {
        self.permutation.len()
    }

    pub fn apply(&self, config: SpinConfig) -> SpinConfig {
        let bits = self
            .permutation
            .iter()
            .enumerate()
            .filter(|&(_, &p)| config.is_up(p))
            .fold(0u64, |b, (i, _)| b | (1 << i));
        SpinConfig::from_bits(bits)
    }
}

/// Add the distinct symmetry images of every sample, then replace each group
/// of equal configurations by one entry carrying the mean of their targets.
///
/// The result is sorted by configuration.
pub fn extend_using_symmetries(
    configs: &[SpinConfig],
    targets: &[f64],
    symmetries: &[Symmetry],
) -> SwoResult<(Vec<SpinConfig>, Vec<f64>)> {
    if configs.len() != targets.len() {
        return Err(SwoError::InvalidOptions(format!(
            "{} configurations but {} targets",
            configs.len(),
            targets.len()
        )));
    }
    let mut groups: BTreeMap<SpinConfig, (f64, usize)> = BTreeMap::new();
    let mut push = |c: SpinConfig, y: f64| {
        let slot = groups.entry(c).or_insert((0.0, 0));
        slot.0 += y;
        slot.1 += 1;
    };
    for (&x, &y) in configs.iter().zip(targets) {
        push(x, y);
        for symmetry in symmetries {
            let image = symmetry.apply(x);
            if image != x {
                push(image, y);
            }
        }
    }
    Ok(groups
        .into_iter()
        .map(|(c, (sum, n))| (c, sum / n as f64))
        .unzip())
}
