//! Overlaps of a trained state with known eigenstates.

use num_complex::Complex64;

use crate::basis::SpinConfig;
use crate::error::{SwoError, SwoResult};
use crate::wavefunction::{evaluate_checked, ExplicitState, TargetState};

/// Explicitly known eigenstate together with its energy and degeneracy label.
#[derive(Clone, Debug)]
pub struct ReferenceState {
    pub energy: f64,
    pub label: i64,
    pub state: ExplicitState,
}

/// Overlap of the trained state with one degenerate subspace.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlapReport {
    pub energy: f64,
    pub label: i64,
    pub overlap: f64,
}

fn norm_sqr(values: &[Complex64]) -> f64 {
    values.iter().map(|v| v.norm_sqr()).sum()
}

/// `sqrt(Σ_y |⟨ψ, y⟩|² / (‖ψ‖² ‖y‖²))` for every run of references sharing a label.
///
/// Both states are evaluated on `configs`, which should span the sector.
/// Consecutive references with the same label form one subspace; the energy
/// of the first one is reported.
pub fn overlaps<S: TargetState + ?Sized>(
    state: &S,
    configs: &[SpinConfig],
    references: &[ReferenceState],
) -> SwoResult<Vec<OverlapReport>> {
    let psi = evaluate_checked(state, configs)?;
    let psi_norm = norm_sqr(&psi);
    if psi_norm == 0.0 {
        return Err(SwoError::ZeroNorm("trained state vanishes on the sector".into()));
    }

    let mut reports: Vec<OverlapReport> = Vec::new();
    let mut current: Option<(i64, f64, f64)> = None;
    for reference in references {
        let y = reference.state.evaluate_batch(configs);
        let y_norm = norm_sqr(&y);
        if y_norm == 0.0 {
            return Err(SwoError::ZeroNorm(format!(
                "reference state with label {} vanishes on the sector",
                reference.label
            )));
        }
        let inner: Complex64 = y.iter().zip(&psi).map(|(y, p)| y.conj() * p).sum();
        let term = inner.norm_sqr() / (psi_norm * y_norm);
        current = match current {
            Some((label, energy, acc)) if label == reference.label => Some((label, energy, acc + term)),
            Some((label, energy, acc)) => {
                reports.push(OverlapReport { energy, label, overlap: acc.sqrt() });
                Some((reference.label, reference.energy, term))
            }
            None => Some((reference.label, reference.energy, term)),
        };
    }
    if let Some((label, energy, acc)) = current {
        reports.push(OverlapReport { energy, label, overlap: acc.sqrt() });
    }
    Ok(reports)
}
