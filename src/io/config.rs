//! YAML run configuration.
//!
//! ```yaml
//! number_spins: 10
//! magnetisation: 0
//! hamiltonian: 1x10.hamiltonian
//! roots:
//!   - [1.0200078895671043, 0.8629637153606778]
//!   - [1.0200078895671043, -0.8629637153606778]
//! epochs: 20
//! steps: { number_chains: 4, start: 50, stop: 250, step: 1 }
//! amplitude: { epochs: 100, batch_size: 64, learning_rate: 0.003 }
//! phase: { epochs: 100, batch_size: 64, learning_rate: 0.003 }
//! ```

use std::path::{Path, PathBuf};

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{SwoError, SwoResult};
use crate::sampling::ChainSteps;
use crate::training::FitOptions;

/// Where the training configurations of each iteration come from.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    #[default]
    MonteCarlo,
    /// Every configuration of the sector, count 1 each.
    Exhaustive,
}

fn default_batch_size() -> usize {
    1024
}

fn default_seed() -> u64 {
    42
}

fn default_difference_sampling() -> bool {
    true
}

/// Everything one SWO run needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SwoConfig {
    pub number_spins: usize,
    #[serde(default)]
    pub magnetisation: Option<i32>,
    /// Hamiltonian file, relative paths are taken relative to the config file.
    pub hamiltonian: PathBuf,
    /// Filter roots as `[re, im]` pairs, applied in order.
    pub roots: Vec<[f64; 2]>,
    pub epochs: usize,
    pub steps: ChainSteps,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// 0 uses the global rayon pool.
    #[serde(default)]
    pub threads: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_difference_sampling")]
    pub difference_sampling: bool,
    #[serde(default)]
    pub data_source: DataSource,
    #[serde(default)]
    pub amplitude: FitOptions,
    #[serde(default)]
    pub phase: FitOptions,
    /// Site permutations used to augment amplitude targets.
    #[serde(default)]
    pub symmetries: Vec<Vec<usize>>,
    /// Files with explicit eigenstates to report overlaps against.
    #[serde(default)]
    pub references: Vec<PathBuf>,
}

impl SwoConfig {
    pub fn roots(&self) -> Vec<Complex64> {
        self.roots.iter().map(|&[re, im]| Complex64::new(re, im)).collect()
    }

    pub fn validate(&self) -> SwoResult<()> {
        if self.roots.is_empty() {
            return Err(SwoError::InvalidOptions("at least one filter root is required".into()));
        }
        if self.batch_size == 0 {
            return Err(SwoError::InvalidOptions("batch_size must be at least 1".into()));
        }
        self.steps.validate()
    }

    fn resolve_paths(&mut self, base: &Path) {
        if self.hamiltonian.is_relative() {
            self.hamiltonian = base.join(&self.hamiltonian);
        }
        for reference in &mut self.references {
            if reference.is_relative() {
                *reference = base.join(&*reference);
            }
        }
    }
}

/// Read and validate a run configuration.
pub fn read_config<P: AsRef<Path>>(path: P) -> SwoResult<SwoConfig> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let mut config: SwoConfig = serde_yaml::from_reader(reader)?;
    config.validate()?;
    if let Some(base) = path.parent() {
        config.resolve_paths(base);
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "
number_spins: 10
magnetisation: 0
hamiltonian: 1x10.hamiltonian
roots:
  - [1.0200078895671043, 0.8629637153606778]
  - [1.0200078895671043, -0.8629637153606778]
epochs: 5
steps: { number_chains: 4, start: 50, stop: 250, step: 1 }
";

    #[test]
    fn test_defaults() {
        let config: SwoConfig = serde_yaml::from_str(MINIMAL).unwrap();
        config.validate().unwrap();
        assert_eq!(config.batch_size, 1024);
        assert_eq!(config.data_source, DataSource::MonteCarlo);
        assert!(config.difference_sampling);
        assert_eq!(config.amplitude, FitOptions::default());
        assert_eq!(config.steps, ChainSteps::new(4, 50, 250, 1));
        assert_eq!(config.roots()[1], Complex64::new(1.0200078895671043, -0.8629637153606778));
    }

    #[test]
    fn test_exhaustive_source_and_paths() {
        let text = format!("{MINIMAL}data_source: exhaustive\nreferences: [ground.txt, /abs/excited.txt]\n");
        let mut config: SwoConfig = serde_yaml::from_str(&text).unwrap();
        assert_eq!(config.data_source, DataSource::Exhaustive);
        config.resolve_paths(Path::new("runs"));
        assert_eq!(config.hamiltonian, Path::new("runs/1x10.hamiltonian"));
        assert_eq!(config.references[0], Path::new("runs/ground.txt"));
        assert_eq!(config.references[1], Path::new("/abs/excited.txt"));
    }

    #[test]
    fn test_no_roots_rejected() {
        let text = MINIMAL.replace(
            "roots:\n  - [1.0200078895671043, 0.8629637153606778]\n  - [1.0200078895671043, -0.8629637153606778]\n",
            "roots: []\n",
        );
        let config: SwoConfig = serde_yaml::from_str(&text).unwrap();
        assert!(config.validate().is_err());
    }
}
