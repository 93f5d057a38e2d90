//! The sampling-while-optimizing loop.
//!
//! Every iteration freezes the current models, samples configurations from the
//! frozen state, attaches filtered amplitudes `(P(H)ψ)(x)` and fits the models
//! to them. An optional difference round then samples from the freshly trained
//! state to cover configurations the old state rarely visited.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use super::models::Trainable;
use super::optimizer::fit;
use super::overlap::{overlaps, ReferenceState};
use super::scale::optimise_scale;
use super::symmetry::{extend_using_symmetries, Symmetry};
use super::targets::{accuracy, amplitude_targets, TrainingData};
use crate::basis::{Basis, SectorCache};
use crate::error::{SwoError, SwoResult};
use crate::io::{read_hamiltonian, read_reference_state, DataSource, SwoConfig};
use crate::operator::{Operator, PolynomialFilter};
use crate::sampling::{sample_difference, sample_exhaustive, sample_some, ChainOptions, Ensemble};
use crate::wavefunction::{AmplitudeModel, CombiningState, PhaseModel, Sign, TargetState};

/// Outcome of [`Swo::run`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub completed: usize,
    pub failed: usize,
}

/// Orchestrator owning the filter, the sector cache and the run's random stream.
pub struct Swo {
    config: SwoConfig,
    basis: Basis,
    filter: PolynomialFilter,
    cache: SectorCache,
    symmetries: Vec<Symmetry>,
    references: Vec<ReferenceState>,
    rng: StdRng,
}

impl Swo {
    /// Build from a configuration and an already constructed Hamiltonian.
    /// Reference states listed in the configuration are read here.
    pub fn new(config: SwoConfig, operator: Arc<Operator>) -> SwoResult<Self> {
        config.validate()?;
        let basis = Basis::new(config.number_spins, config.magnetisation)?;
        if operator.basis() != &basis {
            return Err(SwoError::InvalidOptions(format!(
                "Hamiltonian acts on {:?}, configuration describes {:?}",
                operator.basis(),
                basis
            )));
        }
        let filter = PolynomialFilter::unscaled(operator, config.roots())?;
        let symmetries = config
            .symmetries
            .iter()
            .map(|p| {
                let symmetry = Symmetry::new(p.clone())?;
                if symmetry.number_spins() != basis.number_spins() {
                    return Err(SwoError::InvalidOptions(format!(
                        "symmetry {p:?} does not act on {} spins",
                        basis.number_spins()
                    )));
                }
                Ok(symmetry)
            })
            .collect::<SwoResult<Vec<_>>>()?;
        let references = config
            .references
            .iter()
            .map(|path| read_reference_state(path, basis.number_spins()))
            .collect::<SwoResult<Vec<_>>>()?;
        let rng = StdRng::seed_from_u64(config.seed);

        Ok(Self {
            config,
            basis,
            filter,
            cache: SectorCache::new(),
            symmetries,
            references,
            rng,
        })
    }

    /// Build from a configuration, reading the Hamiltonian file it names.
    pub fn from_config(config: SwoConfig) -> SwoResult<Self> {
        let basis = Basis::new(config.number_spins, config.magnetisation)?;
        let operator = read_hamiltonian(&config.hamiltonian, basis)?;
        Self::new(config, Arc::new(operator))
    }

    pub fn with_references(mut self, references: Vec<ReferenceState>) -> Self {
        self.references.extend(references);
        self
    }

    pub fn config(&self) -> &SwoConfig {
        &self.config
    }

    pub fn basis(&self) -> &Basis {
        &self.basis
    }

    pub fn filter(&self) -> &PolynomialFilter {
        &self.filter
    }

    fn chain_options(&mut self) -> ChainOptions {
        ChainOptions::new(self.config.number_spins, self.config.magnetisation, self.config.steps)
            .with_batch_size(self.config.batch_size)
            .with_threads(self.config.threads)
            .with_seed(self.rng.gen())
    }

    fn generate<S: TargetState + ?Sized>(&mut self, state: &S) -> SwoResult<Ensemble> {
        match self.config.data_source {
            DataSource::MonteCarlo => {
                let options = self.chain_options();
                sample_some(state, &self.filter, &options)
            }
            DataSource::Exhaustive => sample_exhaustive(
                state,
                &self.filter,
                &self.basis,
                &mut self.cache,
                self.config.batch_size,
            ),
        }
    }

    fn fit_models<A, P>(&mut self, amplitude: &mut A, phase: &mut P, ensemble: &Ensemble) -> SwoResult<()>
    where
        A: AmplitudeModel + Trainable<Target = f64>,
        P: PhaseModel + Trainable<Target = Sign>,
    {
        let data = TrainingData::from_ensemble(ensemble);

        let (configs, targets) = if self.symmetries.is_empty() {
            (data.configs.clone(), data.amplitudes.clone())
        } else {
            extend_using_symmetries(&data.configs, &data.amplitudes, &self.symmetries)?
        };
        info!("Training amplitude network on {} configurations...", configs.len());
        fit("amplitude", amplitude, &configs, &targets, &self.config.amplitude, &mut self.rng)?;

        info!("Training phase network on {} configurations...", data.len());
        info!("Initial accuracy: {:.4}", accuracy(&*phase, &data.configs, &data.signs));
        fit("phase", phase, &data.configs, &data.signs, &self.config.phase, &mut self.rng)?;
        info!("Final accuracy: {:.4}", accuracy(&*phase, &data.configs, &data.signs));
        Ok(())
    }

    /// Sample from the newly trained state and merge what it finds into `ensemble`.
    fn difference_round<A, P>(
        &mut self,
        old: &CombiningState<A, P>,
        amplitude: &mut A,
        phase: &mut P,
        ensemble: &mut Ensemble,
    ) -> SwoResult<()>
    where
        A: AmplitudeModel + Trainable<Target = f64>,
        P: PhaseModel + Trainable<Target = Sign>,
    {
        let configs = ensemble.configs();
        let phi = amplitude_targets(&ensemble.values());
        let scale = optimise_scale(&*amplitude, &configs, &phi)?.abs();
        if scale == 0.0 {
            return Err(SwoError::ZeroNorm("trained amplitudes vanish on the sampled configurations".into()));
        }
        info!("scale = {}", scale);

        let filter = self.filter.with_scale(scale)?;
        let new = CombiningState::new(amplitude.clone(), phase.clone());
        let options = self.chain_options();
        let mut difference = sample_difference(&new, old, &filter, &options)?;
        // s·Pψ_old − ψ_new  →  Pψ_old, comparable with the first ensemble
        difference.map_values(|entry| (entry.value + new.evaluate(&entry.config)) / scale);
        ensemble.merge(&difference)?;

        self.fit_models(amplitude, phase, ensemble)
    }

    /// One SWO iteration, updating the models in place.
    ///
    /// On error the models may be partially trained; [`Swo::run`] only keeps
    /// the result of successful iterations.
    pub fn step<A, P>(&mut self, amplitude: &mut A, phase: &mut P) -> SwoResult<()>
    where
        A: AmplitudeModel + Trainable<Target = f64>,
        P: PhaseModel + Trainable<Target = Sign>,
    {
        let snapshot = CombiningState::new(amplitude.clone(), phase.clone());
        let mut ensemble = self.generate(&snapshot)?;
        self.fit_models(amplitude, phase, &ensemble)?;

        if self.config.difference_sampling && self.config.data_source == DataSource::MonteCarlo {
            match self.difference_round(&snapshot, amplitude, phase, &mut ensemble) {
                Ok(()) => {}
                Err(SwoError::ZeroNorm(reason)) => warn!("Skipping difference sampling: {}", reason),
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Run `epochs` iterations. A failed iteration is logged and the models
    /// from before it are kept.
    pub fn run<A, P>(&mut self, amplitude: &mut A, phase: &mut P) -> RunSummary
    where
        A: AmplitudeModel + Trainable<Target = f64>,
        P: PhaseModel + Trainable<Target = Sign>,
    {
        let mut summary = RunSummary::default();
        for i in 0..self.config.epochs {
            info!("{}{}{}", "-".repeat(10), i + 1, "-".repeat(10));
            let mut next_amplitude = amplitude.clone();
            let mut next_phase = phase.clone();
            match self.step(&mut next_amplitude, &mut next_phase) {
                Ok(()) => {
                    *amplitude = next_amplitude;
                    *phase = next_phase;
                    summary.completed += 1;
                }
                Err(e) => {
                    warn!("Iteration {} failed, keeping previous models: {}", i + 1, e);
                    summary.failed += 1;
                }
            }
            if !self.references.is_empty() {
                self.report_overlaps(amplitude, phase);
            }
        }
        summary
    }

    fn report_overlaps<A: AmplitudeModel + Clone, P: PhaseModel + Clone>(&mut self, amplitude: &A, phase: &P) {
        let state = CombiningState::new(amplitude.clone(), phase.clone());
        let configs = self.cache.get(&self.basis);
        match overlaps(&state, configs, &self.references) {
            Ok(reports) => {
                for report in reports {
                    info!("E = {:.6} (label {}): overlap = {:.6}", report.energy, report.label, report.overlap);
                }
            }
            Err(e) => warn!("Cannot compute overlaps: {}", e),
        }
    }
}
