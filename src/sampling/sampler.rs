//! Monte Carlo sampling of filtered wave functions.
//!
//! Independent chains explore `|ψ|²`, their recorded configurations are
//! merged into visit counts, and the exact filtered amplitudes of the distinct
//! configurations become the ensemble values.

use std::collections::HashMap;

use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{debug, info};

use super::chain::{ChainOptions, ChainRecord, ChainStats, MarkovChain};
use super::ensemble::Ensemble;
use super::values::filtered_values;
use crate::basis::{Basis, SectorCache, SpinConfig};
use crate::error::{SwoError, SwoResult};
use crate::operator::PolynomialFilter;
use crate::wavefunction::{evaluate_checked, TargetState};

/// Sample configurations from `|ψ|²` and attach `(P(H)ψ)(x)` to each.
pub fn sample_some<S: TargetState + ?Sized>(
    state: &S,
    filter: &PolynomialFilter,
    options: &ChainOptions,
) -> SwoResult<Ensemble> {
    let basis = prepare(state.number_spins(), filter, options)?;
    with_pool(options.threads, || {
        let visits = run_chains(state, basis, options)?;
        let configs: Vec<SpinConfig> = visits.iter().map(|(c, _)| *c).collect();
        let values = filtered_values(state, filter, &configs, options.batch_size)?;
        Ok(assemble(options.number_spins, &visits, &values))
    })
}

/// Sample from `|ψ_new|²` and attach `(P(H)ψ_old)(x) − ψ_new(x)` to each configuration.
///
/// Any rescaling is expected to be part of `filter`.
pub fn sample_difference<N, O>(
    new: &N,
    old: &O,
    filter: &PolynomialFilter,
    options: &ChainOptions,
) -> SwoResult<Ensemble>
where
    N: TargetState + ?Sized,
    O: TargetState + ?Sized,
{
    let basis = prepare(new.number_spins(), filter, options)?;
    if old.number_spins() != new.number_spins() {
        return Err(SwoError::InvalidOptions(format!(
            "old state has {} spins, new state has {}",
            old.number_spins(),
            new.number_spins()
        )));
    }
    with_pool(options.threads, || {
        let visits = run_chains(new, basis, options)?;
        let configs: Vec<SpinConfig> = visits.iter().map(|(c, _)| *c).collect();
        let filtered = filtered_values(old, filter, &configs, options.batch_size)?;
        let current = evaluate_checked(new, &configs)?;
        let values: Vec<Complex64> = filtered.iter().zip(current.iter()).map(|(f, c)| f - c).collect();
        Ok(assemble(options.number_spins, &visits, &values))
    })
}

/// Every configuration of `basis` with count 1 and its filtered amplitude.
pub fn sample_exhaustive<S: TargetState + ?Sized>(
    state: &S,
    filter: &PolynomialFilter,
    basis: &Basis,
    cache: &mut SectorCache,
    batch_size: usize,
) -> SwoResult<Ensemble> {
    if filter.operator().basis() != basis || state.number_spins() != basis.number_spins() {
        return Err(SwoError::InvalidOptions(
            "state, filter and basis disagree on the Hilbert space".into(),
        ));
    }
    let configs = cache.get(basis);
    let values = filtered_values(state, filter, configs, batch_size)?;
    let mut ensemble = Ensemble::new(basis.number_spins());
    for (&config, value) in configs.iter().zip(values) {
        ensemble.insert(config, value, 1);
    }
    Ok(ensemble)
}

fn prepare(number_spins: usize, filter: &PolynomialFilter, options: &ChainOptions) -> SwoResult<Basis> {
    let basis = options.validate()?;
    if number_spins != options.number_spins {
        return Err(SwoError::InvalidOptions(format!(
            "state has {number_spins} spins, chain options ask for {}",
            options.number_spins
        )));
    }
    if filter.operator().basis() != &basis {
        return Err(SwoError::InvalidOptions(format!(
            "filter acts on {:?}, chain options describe {:?}",
            filter.operator().basis(),
            basis
        )));
    }
    Ok(basis)
}

fn with_pool<T: Send, F>(threads: usize, f: F) -> SwoResult<T>
where
    F: FnOnce() -> SwoResult<T> + Send,
{
    if threads == 0 {
        return f();
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| SwoError::InvalidOptions(format!("cannot build thread pool: {e}")))?;
    pool.install(f)
}

/// Run all chains and merge their visit counts, keeping chain order.
fn run_chains<S: TargetState + ?Sized>(
    guide: &S,
    basis: Basis,
    options: &ChainOptions,
) -> SwoResult<Vec<(SpinConfig, u64)>> {
    let records: Vec<ChainRecord> = (0..options.steps.number_chains)
        .into_par_iter()
        .map(|i| {
            let rng = StdRng::seed_from_u64(options.seed.wrapping_add(i as u64));
            MarkovChain::new(guide, basis, rng)?.run(&options.steps, options.deadline)
        })
        .collect::<SwoResult<_>>()?;

    let mut merged: Vec<(SpinConfig, u64)> = Vec::new();
    let mut index: HashMap<SpinConfig, usize> = HashMap::new();
    let mut stats = ChainStats::default();
    for record in records {
        stats = stats.combine(record.stats);
        for (config, count) in record.visits {
            match index.get(&config) {
                Some(&k) => merged[k].1 += count,
                None => {
                    index.insert(config, merged.len());
                    merged.push((config, count));
                }
            }
        }
    }

    let visited: u64 = merged.iter().map(|(_, n)| n).sum();
    info!("Visited {} configurations during Monte Carlo sampling", visited);
    debug!(
        "{} distinct configurations, acceptance rate {:.3}",
        merged.len(),
        stats.acceptance_rate()
    );
    Ok(merged)
}

fn assemble(number_spins: usize, visits: &[(SpinConfig, u64)], values: &[Complex64]) -> Ensemble {
    let mut ensemble = Ensemble::new(number_spins);
    for (&(config, count), &value) in visits.iter().zip(values) {
        ensemble.insert(config, value, count);
    }
    ensemble
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::Operator;
    use crate::sampling::ChainSteps;
    use crate::wavefunction::ExplicitState;
    use approx::assert_relative_eq;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Instant;

    fn heisenberg_ring(n: usize) -> Arc<Operator> {
        let basis = Basis::new(n, Some(0)).unwrap();
        let edges = (0..n).map(|i| (i, (i + 1) % n)).collect();
        Arc::new(Operator::heisenberg(basis, &[(1.0, edges)]).unwrap())
    }

    /// Smooth positive state over the whole sector: ψ(x) = 1 + bits(x) / 2^n.
    fn smooth_state(n: usize) -> ExplicitState {
        let basis = Basis::new(n, Some(0)).unwrap();
        let table = basis
            .enumerate()
            .into_iter()
            .map(|c| (c, Complex64::new(1.0 + c.bits() as f64 / (1u64 << n) as f64, 0.0)))
            .collect();
        ExplicitState::new(n, table)
    }

    #[test]
    fn test_entries_are_unique_for_any_schedule() {
        let h = heisenberg_ring(8);
        let filter = PolynomialFilter::unscaled(h, vec![Complex64::new(1.0, 0.0)]).unwrap();
        let state = smooth_state(8);
        for &(chains, start, stop, step) in &[(1, 0, 50, 1), (3, 10, 200, 3), (8, 0, 40, 7)] {
            let options = ChainOptions::new(8, Some(0), ChainSteps::new(chains, start, stop, step))
                .with_batch_size(16)
                .with_seed(42);
            let ensemble = sample_some(&state, &filter, &options).unwrap();
            let distinct: HashSet<SpinConfig> = ensemble.iter().map(|e| e.config).collect();
            assert_eq!(distinct.len(), ensemble.len());
            assert_eq!(
                ensemble.total_count() as usize,
                chains * options.steps.samples_per_chain()
            );
        }
    }

    #[test]
    fn test_values_are_filtered_amplitudes() {
        let h = heisenberg_ring(6);
        let roots = vec![Complex64::new(0.5, 0.25), Complex64::new(0.5, -0.25)];
        let filter = PolynomialFilter::unscaled(h, roots).unwrap();
        let state = smooth_state(6);
        let options = ChainOptions::new(6, Some(0), ChainSteps::new(2, 5, 60, 1)).with_seed(1);
        let ensemble = sample_some(&state, &filter, &options).unwrap();

        let configs = ensemble.configs();
        let expected = filtered_values(&state, &filter, &configs, 7).unwrap();
        for (entry, value) in ensemble.iter().zip(expected) {
            assert_relative_eq!(entry.value.re, value.re, epsilon = 1e-12);
            assert_relative_eq!(entry.value.im, value.im, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_same_seed_same_ensemble() {
        let h = heisenberg_ring(6);
        let filter = PolynomialFilter::unscaled(h, vec![Complex64::new(2.0, 0.0)]).unwrap();
        let state = smooth_state(6);
        let options = ChainOptions::new(6, Some(0), ChainSteps::new(4, 10, 100, 2)).with_seed(9);
        let a = sample_some(&state, &filter, &options).unwrap();
        let b = sample_some(&state, &filter, &options.clone().with_threads(2)).unwrap();
        let a: Vec<_> = a.iter().copied().collect();
        let b: Vec<_> = b.iter().copied().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_difference_of_identical_states_vanishes_for_identity_filter() {
        let h = heisenberg_ring(6);
        let filter = PolynomialFilter::unscaled(h, vec![]).unwrap();
        let state = smooth_state(6);
        let options = ChainOptions::new(6, Some(0), ChainSteps::new(2, 0, 50, 1)).with_seed(4);
        let ensemble = sample_difference(&state, &state, &filter, &options).unwrap();
        assert!(!ensemble.is_empty());
        for entry in ensemble.iter() {
            assert_relative_eq!(entry.value.norm(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_exhaustive_covers_sector() {
        let h = heisenberg_ring(6);
        let basis = *h.basis();
        let filter = PolynomialFilter::unscaled(h, vec![Complex64::new(0.0, 0.0)]).unwrap();
        let state = smooth_state(6);
        let mut cache = SectorCache::new();
        let ensemble = sample_exhaustive(&state, &filter, &basis, &mut cache, 8).unwrap();
        assert_eq!(ensemble.len(), 20);
        assert!(ensemble.iter().all(|e| e.count == 1));
    }

    #[test]
    fn test_mismatched_options_are_rejected() {
        let h = heisenberg_ring(6);
        let filter = PolynomialFilter::unscaled(h, vec![]).unwrap();
        let state = smooth_state(6);
        let wrong_sector = ChainOptions::new(6, Some(2), ChainSteps::new(1, 0, 10, 1));
        assert!(sample_some(&state, &filter, &wrong_sector).is_err());
        let wrong_size = ChainOptions::new(8, Some(0), ChainSteps::new(1, 0, 10, 1));
        assert!(sample_some(&state, &filter, &wrong_size).is_err());
    }

    #[test]
    fn test_expired_deadline_yields_empty_ensemble() {
        let h = heisenberg_ring(8);
        let filter = PolynomialFilter::unscaled(h, vec![Complex64::new(0.0, 0.0)]).unwrap();
        let state = smooth_state(8);
        let options = ChainOptions::new(8, Some(0), ChainSteps::new(2, 10, 100, 1)).with_deadline(Instant::now());
        let ensemble = sample_some(&state, &filter, &options).unwrap();
        assert!(ensemble.is_empty());
    }
}
