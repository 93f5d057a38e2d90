//! Exact filtered amplitudes `(P(H)ψ)(x)` for a set of configurations.

use std::collections::HashMap;

use num_complex::Complex64;
use rayon::prelude::*;

use crate::basis::SpinConfig;
use crate::error::{SwoError, SwoResult};
use crate::operator::PolynomialFilter;
use crate::wavefunction::{evaluate_checked, TargetState};

/// `(P(H)ψ)(x) = Σ_y ⟨y|P(H)|x⟩ ψ(y)` for every `x` in `configs`.
///
/// `H` is real symmetric, so the row of `P(H)` at `x` equals the column
/// `P(H)|x⟩`. Configurations are processed `batch_size` at a time; within a
/// batch every distinct `y` is evaluated exactly once, in one call.
pub fn filtered_values<S: TargetState + ?Sized>(
    state: &S,
    filter: &PolynomialFilter,
    configs: &[SpinConfig],
    batch_size: usize,
) -> SwoResult<Vec<Complex64>> {
    if batch_size == 0 {
        return Err(SwoError::InvalidOptions("batch_size must be at least 1".into()));
    }
    let batches: Vec<Vec<Complex64>> = configs
        .par_chunks(batch_size)
        .map(|chunk| filtered_batch(state, filter, chunk))
        .collect::<SwoResult<_>>()?;
    Ok(batches.into_iter().flatten().collect())
}

fn filtered_batch<S: TargetState + ?Sized>(
    state: &S,
    filter: &PolynomialFilter,
    chunk: &[SpinConfig],
) -> SwoResult<Vec<Complex64>> {
    let expansions = chunk
        .iter()
        .map(|&x| filter.apply(x))
        .collect::<SwoResult<Vec<_>>>()?;

    let mut unique: Vec<SpinConfig> = Vec::new();
    let mut index: HashMap<SpinConfig, usize> = HashMap::new();
    for terms in &expansions {
        for (y, _) in terms {
            index.entry(*y).or_insert_with(|| {
                unique.push(*y);
                unique.len() - 1
            });
        }
    }
    let psi = evaluate_checked(state, &unique)?;

    Ok(expansions
        .iter()
        .map(|terms| terms.iter().map(|(y, w)| w * psi[index[y]]).sum::<Complex64>())
        .collect())
}
