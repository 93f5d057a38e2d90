//! Spin Hamiltonians as weighted sums of local terms.
//!
//!   H = Σ_k  J_k · O_k
//!
//! where every `O_k` acts on a handful of sites and is either diagonal in the
//! σᶻ basis or flips spins. Couplings are real, so `H` is a real symmetric
//! matrix within its magnetisation sector.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::sparse::SparseVector;
use crate::basis::{Basis, SpinConfig};
use crate::error::{SwoError, SwoResult};

/// How a term acts on a basis state.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermKind {
    /// `J · Π σᶻ_i`: leaves the configuration unchanged.
    Diagonal,
    /// Flips every listed site when that keeps the magnetisation, i.e. when the
    /// sites hold as many up as down spins; zero otherwise. On a pair this is
    /// `J · (σ⁺_i σ⁻_j + σ⁻_i σ⁺_j)`.
    Flip,
}

/// One local term `(sites, coupling, kind)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperatorTerm {
    pub sites: Vec<usize>,
    pub coupling: f64,
    pub kind: TermKind,
}

impl OperatorTerm {
    pub fn new(kind: TermKind, coupling: f64, sites: Vec<usize>) -> Self {
        Self { sites, coupling, kind }
    }

    pub fn diagonal(coupling: f64, sites: Vec<usize>) -> Self {
        Self::new(TermKind::Diagonal, coupling, sites)
    }

    pub fn flip(coupling: f64, sites: Vec<usize>) -> Self {
        Self::new(TermKind::Flip, coupling, sites)
    }

    /// Matrix element and target of this term acting on `config`, if nonzero.
    #[inline]
    fn act(&self, config: SpinConfig) -> Option<(SpinConfig, f64)> {
        if self.coupling == 0.0 {
            return None;
        }
        match self.kind {
            TermKind::Diagonal => {
                let sign: f64 = self.sites.iter().map(|&i| config.spin(i)).product();
                Some((config, self.coupling * sign))
            }
            TermKind::Flip => {
                let ups = self.sites.iter().filter(|&&i| config.is_up(i)).count();
                if 2 * ups == self.sites.len() {
                    Some((config.flipped(&self.sites), self.coupling))
                } else {
                    None
                }
            }
        }
    }
}

/// Immutable Hamiltonian over a fixed basis.
#[derive(Clone, Debug)]
pub struct Operator {
    basis: Basis,
    terms: Vec<OperatorTerm>,
}

impl Operator {
    pub fn new(basis: Basis, terms: Vec<OperatorTerm>) -> SwoResult<Self> {
        let n = basis.number_spins();
        for (k, term) in terms.iter().enumerate() {
            if let Some(&site) = term.sites.iter().find(|&&i| i >= n) {
                return Err(SwoError::InvalidOptions(format!(
                    "term {k} acts on site {site} but the system only has {n} spins"
                )));
            }
            let mut sorted = term.sites.clone();
            sorted.sort_unstable();
            if sorted.windows(2).any(|w| w[0] == w[1]) {
                return Err(SwoError::InvalidOptions(format!(
                    "term {k} lists a site more than once: {:?}",
                    term.sites
                )));
            }
            if term.kind == TermKind::Flip && term.sites.len() % 2 != 0 {
                return Err(SwoError::InvalidOptions(format!(
                    "flip term {k} acts on an odd number of sites and never conserves magnetisation"
                )));
            }
            if !term.coupling.is_finite() {
                return Err(SwoError::InvalidOptions(format!(
                    "term {k} has a non-finite coupling {}",
                    term.coupling
                )));
            }
        }
        Ok(Self { basis, terms })
    }

    /// Heisenberg model `Σ J σ_i·σ_j` from `(J, edges)` groups.
    ///
    /// Each edge contributes `J σᶻ_i σᶻ_j` and an exchange `2J (σ⁺_i σ⁻_j + σ⁻_i σ⁺_j)`.
    pub fn heisenberg(basis: Basis, couplings: &[(f64, Vec<(usize, usize)>)]) -> SwoResult<Self> {
        let mut terms = Vec::new();
        for (coupling, edges) in couplings {
            for &(i, j) in edges {
                terms.push(OperatorTerm::diagonal(*coupling, vec![i, j]));
                terms.push(OperatorTerm::flip(2.0 * coupling, vec![i, j]));
            }
        }
        Self::new(basis, terms)
    }

    pub fn basis(&self) -> &Basis {
        &self.basis
    }

    pub fn number_spins(&self) -> usize {
        self.basis.number_spins()
    }

    pub fn terms(&self) -> &[OperatorTerm] {
        &self.terms
    }

    /// `H |config⟩` as a list of `(output, weight)`, one entry per output.
    pub fn apply(&self, config: SpinConfig) -> SwoResult<Vec<(SpinConfig, Complex64)>> {
        self.basis.check(config)?;
        let mut out = SparseVector::with_capacity(self.terms.len());
        self.accumulate(config, Complex64::new(1.0, 0.0), &mut out);
        Ok(out.into_vec())
    }

    /// `out += factor · H |config⟩`. The caller guarantees `config` is valid.
    pub(crate) fn accumulate(&self, config: SpinConfig, factor: Complex64, out: &mut SparseVector) {
        for term in &self.terms {
            if let Some((target, weight)) = term.act(config) {
                out.add(target, factor * weight);
            }
        }
    }
}
