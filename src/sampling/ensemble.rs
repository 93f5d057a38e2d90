//! Deduplicated sets of sampled configurations with their target values.

use std::collections::HashMap;

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;

use crate::basis::SpinConfig;
use crate::error::{SwoError, SwoResult};

/// One sampled configuration.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EnsembleEntry {
    pub config: SpinConfig,
    /// Current best estimate of the filtered amplitude at `config`.
    pub value: Complex64,
    /// Visitation multiplicity.
    pub count: u64,
}

/// Flattened ensemble, one row per entry.
#[derive(Clone, Debug, PartialEq)]
pub struct EnsembleTensors {
    /// `len × number_spins` matrix of σᶻ = ±1.
    pub configurations: DMatrix<f64>,
    pub values: DVector<Complex64>,
    pub counts: DVector<u64>,
}

impl EnsembleTensors {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Configuration-keyed collection of `(config, value, count)` triples.
///
/// At most one entry exists per configuration; entries keep insertion order.
#[derive(Clone, Debug)]
pub struct Ensemble {
    number_spins: usize,
    entries: Vec<EnsembleEntry>,
    index: HashMap<SpinConfig, usize>,
}

impl Ensemble {
    pub fn new(number_spins: usize) -> Self {
        Self {
            number_spins,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn number_spins(&self) -> usize {
        self.number_spins
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EnsembleEntry> {
        self.entries.iter()
    }

    pub fn get(&self, config: &SpinConfig) -> Option<&EnsembleEntry> {
        self.index.get(config).map(|&i| &self.entries[i])
    }

    pub fn configs(&self) -> Vec<SpinConfig> {
        self.entries.iter().map(|e| e.config).collect()
    }

    pub fn values(&self) -> Vec<Complex64> {
        self.entries.iter().map(|e| e.value).collect()
    }

    /// Sum of all visitation counts.
    pub fn total_count(&self) -> u64 {
        self.entries.iter().map(|e| e.count).sum()
    }

    /// Add an entry, combining with an existing one the same way [`merge`](Self::merge) does.
    pub fn insert(&mut self, config: SpinConfig, value: Complex64, count: u64) {
        match self.index.get(&config) {
            Some(&i) => {
                let entry = &mut self.entries[i];
                let total = entry.count + count;
                if total > 0 {
                    entry.value = (entry.value * entry.count as f64 + value * count as f64) / total as f64;
                } else {
                    entry.value = value;
                }
                entry.count = total;
            }
            None => {
                self.index.insert(config, self.entries.len());
                self.entries.push(EnsembleEntry { config, value, count });
            }
        }
    }

    /// In-place union with `other`.
    ///
    /// Counts of shared configurations add up and their values become the
    /// count-weighted mean of both sides. Configurations only in `other` are
    /// appended in `other`'s order.
    pub fn merge(&mut self, other: &Ensemble) -> SwoResult<()> {
        if other.number_spins != self.number_spins {
            return Err(SwoError::IncompatibleEnsemble {
                expected: self.number_spins,
                found: other.number_spins,
            });
        }
        for entry in &other.entries {
            self.insert(entry.config, entry.value, entry.count);
        }
        Ok(())
    }

    /// Replace all values, keeping configurations and counts.
    pub fn set_values(&mut self, values: &[Complex64]) -> SwoResult<()> {
        if values.len() != self.entries.len() {
            return Err(SwoError::InvalidOptions(format!(
                "expected {} values, got {}",
                self.entries.len(),
                values.len()
            )));
        }
        for (entry, &value) in self.entries.iter_mut().zip(values) {
            entry.value = value;
        }
        Ok(())
    }

    pub fn map_values<F: FnMut(&EnsembleEntry) -> Complex64>(&mut self, mut f: F) {
        for entry in self.entries.iter_mut() {
            entry.value = f(entry);
        }
    }

    pub fn to_tensors(&self) -> EnsembleTensors {
        let n = self.number_spins;
        let configurations = DMatrix::from_fn(self.entries.len(), n, |row, col| self.entries[row].config.spin(col));
        let values = DVector::from_iterator(self.entries.len(), self.entries.iter().map(|e| e.value));
        let counts = DVector::from_iterator(self.entries.len(), self.entries.iter().map(|e| e.count));
        EnsembleTensors {
            configurations,
            values,
            counts,
        }
    }

    pub fn from_tensors(number_spins: usize, tensors: &EnsembleTensors) -> SwoResult<Self> {
        let rows = tensors.configurations.nrows();
        if tensors.configurations.ncols() != number_spins {
            return Err(SwoError::IncompatibleEnsemble {
                expected: number_spins,
                found: tensors.configurations.ncols(),
            });
        }
        if tensors.values.len() != rows || tensors.counts.len() != rows {
            return Err(SwoError::InvalidOptions(format!(
                "tensor lengths disagree: {} configurations, {} values, {} counts",
                rows,
                tensors.values.len(),
                tensors.counts.len()
            )));
        }
        let mut ensemble = Self::new(number_spins);
        for row in 0..rows {
            let spins: Vec<f64> = tensors.configurations.row(row).iter().copied().collect();
            let config = SpinConfig::from_spins(&spins)?;
            ensemble.insert(config, tensors.values[row], tensors.counts[row]);
        }
        Ok(ensemble)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::BTreeSet;

    fn c(re: f64) -> Complex64 {
        Complex64::new(re, 0.0)
    }

    fn ensemble(number_spins: usize, items: &[(u64, f64, u64)]) -> Ensemble {
        let mut e = Ensemble::new(number_spins);
        for &(bits, value, count) in items {
            e.insert(SpinConfig::from_bits(bits), c(value), count);
        }
        e
    }

    fn keys(e: &Ensemble) -> BTreeSet<SpinConfig> {
        e.iter().map(|x| x.config).collect()
    }

    #[test]
    fn test_merge_is_a_union() {
        let a = ensemble(4, &[(0b0011, 1.0, 2), (0b0101, -0.5, 1)]);
        let b = ensemble(4, &[(0b0101, -0.5, 3), (0b1100, 0.25, 4)]);

        let mut ab = a.clone();
        ab.merge(&b).unwrap();
        let mut ba = b.clone();
        ba.merge(&a).unwrap();

        assert_eq!(keys(&ab), keys(&ba));
        assert_eq!(ab.len(), 3);
        let shared = ab.get(&SpinConfig::from_bits(0b0101)).unwrap();
        assert_eq!(shared.count, 4);
        assert_relative_eq!(shared.value.re, -0.5);
        assert_eq!(ab.total_count(), 10);
    }

    #[test]
    fn test_merge_shared_values_are_count_weighted() {
        let mut a = ensemble(2, &[(0b01, 1.0, 1)]);
        let b = ensemble(2, &[(0b01, 3.0, 3)]);
        a.merge(&b).unwrap();
        let entry = a.get(&SpinConfig::from_bits(0b01)).unwrap();
        assert_relative_eq!(entry.value.re, 2.5);
        assert_eq!(entry.count, 4);
    }

    #[test]
    fn test_merge_of_disjoint_ensembles_keeps_values() {
        let mut a = ensemble(3, &[(0b001, 0.1, 1)]);
        let b = ensemble(3, &[(0b010, 0.2, 5)]);
        a.merge(&b).unwrap();
        assert_eq!(a.get(&SpinConfig::from_bits(0b001)).unwrap().value, c(0.1));
        assert_eq!(a.get(&SpinConfig::from_bits(0b010)).unwrap().value, c(0.2));
        assert_eq!(a.configs(), vec![SpinConfig::from_bits(0b001), SpinConfig::from_bits(0b010)]);
    }

    #[test]
    fn test_merge_rejects_different_spin_counts() {
        let mut a = Ensemble::new(4);
        let b = Ensemble::new(6);
        assert!(matches!(
            a.merge(&b),
            Err(SwoError::IncompatibleEnsemble { expected: 4, found: 6 })
        ));
    }

    #[test]
    fn test_tensor_roundtrip() {
        let e = ensemble(5, &[(0b00111, 0.3, 2), (0b11000, -1.5, 7), (0b10101, 0.0, 1)]);
        let tensors = e.to_tensors();
        assert_eq!(tensors.configurations.shape(), (3, 5));
        assert_eq!(tensors.configurations[(1, 3)], 1.0);
        assert_eq!(tensors.configurations[(1, 0)], -1.0);

        let back = Ensemble::from_tensors(5, &tensors).unwrap();
        let original: Vec<_> = e.iter().copied().collect();
        let restored: Vec<_> = back.iter().copied().collect();
        assert_eq!(original, restored);
        assert_eq!(back.to_tensors(), tensors);
    }

    #[test]
    fn test_set_values_checks_length() {
        let mut e = ensemble(2, &[(0b01, 1.0, 1), (0b10, 1.0, 1)]);
        assert!(e.set_values(&[c(1.0)]).is_err());
        e.set_values(&[c(2.0), c(-3.0)]).unwrap();
        assert_eq!(e.values(), vec![c(2.0), c(-3.0)]);
    }
}
