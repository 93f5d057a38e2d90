//! Wave functions given explicitly as a table of amplitudes.

use std::collections::HashMap;

use num_complex::Complex64;

use super::traits::TargetState;
use crate::basis::SpinConfig;

/// Dictionary-backed state; configurations not in the table have amplitude 0.
#[derive(Clone, Debug, Default)]
pub struct ExplicitState {
    number_spins: usize,
    amplitudes: HashMap<SpinConfig, Complex64>,
}

impl ExplicitState {
    pub fn new(number_spins: usize, amplitudes: HashMap<SpinConfig, Complex64>) -> Self {
        Self { number_spins, amplitudes }
    }

    pub fn len(&self) -> usize {
        self.amplitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.amplitudes.is_empty()
    }

    pub fn amplitudes(&self) -> &HashMap<SpinConfig, Complex64> {
        &self.amplitudes
    }
}

impl TargetState for ExplicitState {
    fn number_spins(&self) -> usize {
        self.number_spins
    }

    fn evaluate(&self, config: &SpinConfig) -> Complex64 {
        self.amplitudes.get(config).copied().unwrap_or_default()
    }
}
