//! Sparse state vectors over spin configurations.

use std::collections::HashMap;

use num_complex::Complex64;

use crate::basis::SpinConfig;

/// Linear combination `Σ cᵢ |xᵢ⟩` that keeps its configurations in the order
/// they were first added, so that floating-point accumulation is reproducible.
#[derive(Clone, Debug, Default)]
pub struct SparseVector {
    entries: Vec<(SpinConfig, Complex64)>,
    index: HashMap<SpinConfig, usize>,
}

impl SparseVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    pub fn basis_vector(config: SpinConfig) -> Self {
        let mut v = Self::with_capacity(1);
        v.add(config, Complex64::new(1.0, 0.0));
        v
    }

    /// `self[config] += weight`.
    #[inline]
    pub fn add(&mut self, config: SpinConfig, weight: Complex64) {
        match self.index.get(&config) {
            Some(&i) => self.entries[i].1 += weight,
            None => {
                self.index.insert(config, self.entries.len());
                self.entries.push((config, weight));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(SpinConfig, Complex64)> {
        self.entries.iter()
    }

    pub fn scale(&mut self, factor: f64) {
        for (_, w) in self.entries.iter_mut() {
            *w *= factor;
        }
    }

    /// Entries with exactly zero weight are dropped.
    pub fn into_vec(self) -> Vec<(SpinConfig, Complex64)> {
        self.entries
            .into_iter()
            .filter(|(_, w)| w.re != 0.0 || w.im != 0.0)
            .collect()
    }
}
