//! Metropolis Markov chains over spin configurations of fixed magnetisation.
//!
//! A proposal swaps one up spin with one down spin, which keeps the
//! magnetisation and is symmetric, so the plain Metropolis rule
//!
//!   accept  ⇔  |ψ(x')|² / |ψ(x)|² ≥ u,   u ~ U[0, 1)
//!
//! samples `|ψ|²`.

use std::collections::HashMap;
use std::time::Instant;

use num_complex::Complex64;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::basis::{Basis, SpinConfig};
use crate::error::{SwoError, SwoResult};
use crate::wavefunction::{check_finite, TargetState};

/// Chain schedule: `number_chains` chains, recording every `step`-th
/// configuration with step index in `start..stop`. `start` is the burn-in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSteps {
    pub number_chains: usize,
    pub start: usize,
    pub stop: usize,
    pub step: usize,
}

impl ChainSteps {
    pub fn new(number_chains: usize, start: usize, stop: usize, step: usize) -> Self {
        Self {
            number_chains,
            start,
            stop,
            step,
        }
    }

    /// Samples recorded by a single chain.
    pub fn samples_per_chain(&self) -> usize {
        if self.stop <= self.start || self.step == 0 {
            0
        } else {
            (self.stop - self.start).div_ceil(self.step)
        }
    }

    pub(crate) fn validate(&self) -> SwoResult<()> {
        if self.number_chains == 0 {
            return Err(SwoError::InvalidOptions("number_chains must be at least 1".into()));
        }
        if self.step == 0 {
            return Err(SwoError::InvalidOptions("step must be at least 1".into()));
        }
        if self.stop < self.start {
            return Err(SwoError::InvalidOptions(format!(
                "stop ({}) must not be smaller than start ({})",
                self.stop, self.start
            )));
        }
        Ok(())
    }
}

impl From<(usize, usize, usize, usize)> for ChainSteps {
    fn from((number_chains, start, stop, step): (usize, usize, usize, usize)) -> Self {
        Self::new(number_chains, start, stop, step)
    }
}

/// Options of one sampling run.
#[derive(Clone, Debug)]
pub struct ChainOptions {
    pub number_spins: usize,
    pub magnetisation: Option<i32>,
    /// Configurations per target-state call when computing filtered values.
    pub batch_size: usize,
    pub steps: ChainSteps,
    /// Chain `i` draws from a generator seeded with `seed + i`.
    pub seed: u64,
    /// Worker threads; 0 uses the global rayon pool.
    pub threads: usize,
    /// Chains stop proposing once this instant has passed.
    pub deadline: Option<Instant>,
}

impl ChainOptions {
    pub fn new(number_spins: usize, magnetisation: Option<i32>, steps: ChainSteps) -> Self {
        Self {
            number_spins,
            magnetisation,
            batch_size: 1024,
            steps,
            seed: 0,
            threads: 0,
            deadline: None,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn basis(&self) -> SwoResult<Basis> {
        Basis::new(self.number_spins, self.magnetisation)
    }

    pub(crate) fn validate(&self) -> SwoResult<Basis> {
        if self.batch_size == 0 {
            return Err(SwoError::InvalidOptions("batch_size must be at least 1".into()));
        }
        self.steps.validate()?;
        self.basis()
    }
}

/// Per-chain acceptance statistics.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ChainStats {
    pub proposed: u64,
    pub accepted: u64,
}

impl ChainStats {
    pub fn acceptance_rate(&self) -> f64 {
        if self.proposed == 0 {
            0.0
        } else {
            self.accepted as f64 / self.proposed as f64
        }
    }

    pub fn combine(self, other: Self) -> Self {
        Self {
            proposed: self.proposed + other.proposed,
            accepted: self.accepted + other.accepted,
        }
    }
}

/// Visit counts collected by one chain, in first-visit order.
#[derive(Clone, Debug, Default)]
pub struct ChainRecord {
    pub visits: Vec<(SpinConfig, u64)>,
    pub stats: ChainStats,
}

/// State of a single Markov chain.
pub struct MarkovChain<'a, S: TargetState + ?Sized, R: Rng> {
    state: &'a S,
    basis: Basis,
    rng: R,
    current: SpinConfig,
    weight: f64,
    steps_taken: usize,
    stats: ChainStats,
    memo: HashMap<SpinConfig, f64>,
}

impl<'a, S: TargetState + ?Sized, R: Rng> MarkovChain<'a, S, R> {
    /// Start from a uniformly random configuration of `basis`.
    pub fn new(state: &'a S, basis: Basis, mut rng: R) -> SwoResult<Self> {
        let current = basis.random(&mut rng);
        Self::starting_at(state, basis, rng, current)
    }

    pub fn starting_at(state: &'a S, basis: Basis, rng: R, current: SpinConfig) -> SwoResult<Self> {
        basis.check(current)?;
        let mut chain = Self {
            state,
            basis,
            rng,
            current,
            weight: 0.0,
            steps_taken: 0,
            stats: ChainStats::default(),
            memo: HashMap::new(),
        };
        chain.weight = chain.weight_of(current)?;
        Ok(chain)
    }

    pub fn current(&self) -> SpinConfig {
        self.current
    }

    pub fn steps_taken(&self) -> usize {
        self.steps_taken
    }

    pub fn stats(&self) -> ChainStats {
        self.stats
    }

    /// `|ψ(x)|²`, memoised per chain.
    fn weight_of(&mut self, config: SpinConfig) -> SwoResult<f64> {
        if let Some(&w) = self.memo.get(&config) {
            return Ok(w);
        }
        let value: Complex64 = check_finite(config, self.state.evaluate(&config))?;
        let w = value.norm_sqr();
        self.memo.insert(config, w);
        Ok(w)
    }

    /// Swap a random up spin with a random down spin.
    fn propose(&mut self) -> Option<SpinConfig> {
        let n = self.basis.number_spins();
        let ups = self.current.count_ups() as usize;
        if ups == 0 || ups == n {
            return None;
        }
        let up = nth_site(self.current, true, self.rng.gen_range(0..ups), n);
        let down = nth_site(self.current, false, self.rng.gen_range(0..n - ups), n);
        Some(self.current.flipped(&[up, down]))
    }

    /// One Metropolis update. Returns whether the proposal was accepted.
    pub fn step(&mut self) -> SwoResult<bool> {
        self.steps_taken += 1;
        let Some(proposal) = self.propose() else {
            return Ok(false);
        };
        self.stats.proposed += 1;
        let proposed_weight = self.weight_of(proposal)?;
        let accept = if self.weight == 0.0 {
            true
        } else {
            let ratio = proposed_weight / self.weight;
            ratio >= 1.0 || self.rng.gen::<f64>() < ratio
        };
        if accept {
            self.current = proposal;
            self.weight = proposed_weight;
            self.stats.accepted += 1;
        }
        Ok(accept)
    }

    /// Run the schedule and collect visit counts of recorded configurations.
    pub fn run(mut self, steps: &ChainSteps, deadline: Option<Instant>) -> SwoResult<ChainRecord> {
        let mut visits: Vec<(SpinConfig, u64)> = Vec::new();
        let mut index: HashMap<SpinConfig, usize> = HashMap::new();
        for i in 0..steps.stop {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                break;
            }
            if i > 0 {
                self.step()?;
            }
            if i >= steps.start && (i - steps.start) % steps.step == 0 {
                match index.get(&self.current) {
                    Some(&k) => visits[k].1 += 1,
                    None => {
                        index.insert(self.current, visits.len());
                        visits.push((self.current, 1));
                    }
                }
            }
        }
        Ok(ChainRecord {
            visits,
            stats: self.stats,
        })
    }
}

/// Index of the `k`-th site (in increasing order) whose spin is up (`up = true`) or down.
fn nth_site(config: SpinConfig, up: bool, k: usize, n: usize) -> usize {
    let mut seen = 0;
    for i in 0..n {
        if config.is_up(i) == up {
            if seen == k {
                return i;
            }
            seen += 1;
        }
    }
    n - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wavefunction::ExplicitState;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Uniform(usize);

    impl TargetState for Uniform {
        fn number_spins(&self) -> usize {
            self.0
        }

        fn evaluate(&self, _: &SpinConfig) -> Complex64 {
            Complex64::new(1.0, 0.0)
        }
    }

    struct Infinite;

    impl TargetState for Infinite {
        fn number_spins(&self) -> usize {
            4
        }

        fn evaluate(&self, config: &SpinConfig) -> Complex64 {
            if config.is_up(0) {
                Complex64::new(f64::INFINITY, 0.0)
            } else {
                Complex64::new(1.0, 0.0)
            }
        }
    }

    #[test]
    fn test_samples_per_chain() {
        assert_eq!(ChainSteps::new(4, 50, 250, 1).samples_per_chain(), 200);
        assert_eq!(ChainSteps::new(1, 0, 10, 3).samples_per_chain(), 4);
        assert_eq!(ChainSteps::new(1, 5, 5, 1).samples_per_chain(), 0);
    }

    #[test]
    fn test_invalid_schedules() {
        let basis_ok = |steps| ChainOptions::new(6, Some(0), steps).validate().is_ok();
        assert!(!basis_ok(ChainSteps::new(0, 0, 10, 1)));
        assert!(!basis_ok(ChainSteps::new(1, 0, 10, 0)));
        assert!(!basis_ok(ChainSteps::new(1, 10, 5, 1)));
        assert!(basis_ok(ChainSteps::new(2, 0, 10, 2)));
        assert!(ChainOptions::new(6, Some(1), ChainSteps::new(1, 0, 1, 1)).validate().is_err());
    }

    #[test]
    fn test_moves_preserve_magnetisation() {
        let basis = Basis::new(10, Some(2)).unwrap();
        let state = Uniform(10);
        let mut chain = MarkovChain::new(&state, basis, StdRng::seed_from_u64(3)).unwrap();
        let mut accepted = 0;
        for _ in 0..500 {
            if chain.step().unwrap() {
                accepted += 1;
            }
            assert_eq!(chain.current().magnetisation(10), 2);
        }
        // Flat |ψ|² accepts everything.
        assert_eq!(accepted, 500);
        assert_eq!(chain.stats().acceptance_rate(), 1.0);
    }

    #[test]
    fn test_zero_weight_states_are_never_entered() {
        let mut table = HashMap::new();
        table.insert(SpinConfig::from_bits(0b0011), Complex64::new(1.0, 0.0));
        table.insert(SpinConfig::from_bits(0b0101), Complex64::new(1.0, 0.0));
        let state = ExplicitState::new(4, table);
        let basis = Basis::new(4, Some(0)).unwrap();
        let mut chain =
            MarkovChain::starting_at(&state, basis, StdRng::seed_from_u64(11), SpinConfig::from_bits(0b0011)).unwrap();
        for _ in 0..200 {
            chain.step().unwrap();
            let bits = chain.current().bits();
            assert!(bits == 0b0011 || bits == 0b0101);
        }
    }

    #[test]
    fn test_record_counts_match_schedule() {
        let basis = Basis::new(8, Some(0)).unwrap();
        let state = Uniform(8);
        let steps = ChainSteps::new(1, 10, 60, 5);
        let chain = MarkovChain::new(&state, basis, StdRng::seed_from_u64(5)).unwrap();
        let record = chain.run(&steps, None).unwrap();
        let total: u64 = record.visits.iter().map(|(_, n)| n).sum();
        assert_eq!(total as usize, steps.samples_per_chain());
        let mut configs: Vec<_> = record.visits.iter().map(|(c, _)| *c).collect();
        configs.sort();
        configs.dedup();
        assert_eq!(configs.len(), record.visits.len());
    }

    #[test]
    fn test_polarised_sector_never_moves() {
        let basis = Basis::new(5, Some(5)).unwrap();
        let state = Uniform(5);
        let chain = MarkovChain::new(&state, basis, StdRng::seed_from_u64(1)).unwrap();
        let record = chain.run(&ChainSteps::new(1, 0, 20, 1), None).unwrap();
        assert_eq!(record.visits, vec![(SpinConfig::from_bits(0b11111), 20)]);
        assert_eq!(record.stats.proposed, 0);
    }

    #[test]
    fn test_non_finite_amplitude_is_an_error() {
        let basis = Basis::new(4, Some(0)).unwrap();
        let mut chain =
            MarkovChain::starting_at(&Infinite, basis, StdRng::seed_from_u64(2), SpinConfig::from_bits(0b1100)).unwrap();
        let mut failed = false;
        for _ in 0..100 {
            match chain.step() {
                Ok(_) => {}
                Err(SwoError::EvaluationFailure { .. }) => {
                    failed = true;
                    break;
                }
                Err(other) => panic!("unexpected error {other}"),
            }
        }
        assert!(failed);
    }

    #[test]
    fn test_expired_deadline_yields_empty_record() {
        let basis = Basis::new(6, Some(0)).unwrap();
        let state = Uniform(6);
        let chain = MarkovChain::new(&state, basis, StdRng::seed_from_u64(9)).unwrap();
        let record = chain.run(&ChainSteps::new(1, 0, 100, 1), Some(Instant::now())).unwrap();
        assert!(record.visits.is_empty());
    }
}
