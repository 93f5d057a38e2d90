//! Polynomial spectral filters `P(H) = scale · Π_i (H − r_i)`.
//!
//! Applying the filter to a basis state multiplies in one root at a time, in
//! the order the roots were given, so results are bit-for-bit reproducible.

use std::sync::Arc;

use num_complex::Complex64;

use super::hamiltonian::Operator;
use super::sparse::SparseVector;
use crate::basis::SpinConfig;
use crate::error::{SwoError, SwoResult};

#[derive(Clone, Debug)]
pub struct PolynomialFilter {
    operator: Arc<Operator>,
    roots: Vec<Complex64>,
    scale: f64,
}

impl PolynomialFilter {
    pub fn new(operator: Arc<Operator>, roots: Vec<Complex64>, scale: f64) -> SwoResult<Self> {
        if !scale.is_finite() {
            return Err(SwoError::InvalidOptions(format!("filter scale must be finite, got {scale}")));
        }
        if let Some(r) = roots.iter().find(|r| !r.is_finite()) {
            return Err(SwoError::InvalidOptions(format!("filter root must be finite, got {r}")));
        }
        Ok(Self { operator, roots, scale })
    }

    /// Filter with `scale = 1`.
    pub fn unscaled(operator: Arc<Operator>, roots: Vec<Complex64>) -> SwoResult<Self> {
        Self::new(operator, roots, 1.0)
    }

    /// Same operator and roots, different scale.
    pub fn with_scale(&self, scale: f64) -> SwoResult<Self> {
        Self::new(Arc::clone(&self.operator), self.roots.clone(), scale)
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    pub fn roots(&self) -> &[Complex64] {
        &self.roots
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn degree(&self) -> usize {
        self.roots.len()
    }

    /// `P(H) |config⟩` as `(output, weight)` pairs, one per output configuration.
    pub fn apply(&self, config: SpinConfig) -> SwoResult<Vec<(SpinConfig, Complex64)>> {
        self.operator.basis().check(config)?;
        let mut state = SparseVector::basis_vector(config);
        for &root in &self.roots {
            let mut next = SparseVector::with_capacity(state.len() * (self.operator.terms().len() + 1));
            for &(c, w) in state.iter() {
                self.operator.accumulate(c, w, &mut next);
                next.add(c, -root * w);
            }
            state = next;
        }
        state.scale(self.scale);
        Ok(state.into_vec())
    }
}
