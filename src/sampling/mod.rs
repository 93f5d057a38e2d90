//! Sampling module - Markov chains, the sampler, and the ensembles it returns.

mod chain;
mod ensemble;
mod sampler;
mod values;

pub use chain::{ChainOptions, ChainRecord, ChainStats, ChainSteps, MarkovChain};
pub use ensemble::{Ensemble, EnsembleEntry, EnsembleTensors};
pub use sampler::{sample_difference, sample_exhaustive, sample_some};
pub use values::filtered_values;
