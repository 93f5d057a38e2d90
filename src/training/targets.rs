//! Supervised targets derived from ensemble values.

use num_complex::Complex64;

use super::models::Trainable;
use crate::basis::SpinConfig;
use crate::sampling::Ensemble;
use crate::wavefunction::{PhaseModel, Sign};

/// `|v|` for every value.
pub fn amplitude_targets(values: &[Complex64]) -> Vec<f64> {
    values.iter().map(|v| v.norm()).collect()
}

/// Sign class of every value: positive when `Re v ≥ 0`.
pub fn sign_targets(values: &[Complex64]) -> Vec<Sign> {
    values.iter().map(|&v| Sign::of_value(v)).collect()
}

/// Training set for the amplitude regressor and the sign classifier.
#[derive(Clone, Debug, Default)]
pub struct TrainingData {
    pub configs: Vec<SpinConfig>,
    pub amplitudes: Vec<f64>,
    pub signs: Vec<Sign>,
}

impl TrainingData {
    pub fn from_ensemble(ensemble: &Ensemble) -> Self {
        let values = ensemble.values();
        Self {
            configs: ensemble.configs(),
            amplitudes: amplitude_targets(&values),
            signs: sign_targets(&values),
        }
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

/// Fraction of configurations whose predicted sign matches the target.
pub fn accuracy<P: PhaseModel + Trainable<Target = Sign>>(model: &P, configs: &[SpinConfig], signs: &[Sign]) -> f64 {
    if configs.is_empty() {
        return 0.0;
    }
    let correct = configs
        .iter()
        .zip(signs)
        .filter(|&(c, &s)| Sign::from_logits(&model.logits(c)) == s)
        .count();
    correct as f64 / configs.len() as f64
}
