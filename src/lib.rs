//! NQS SWO - sampling-while-optimizing for neural quantum states in Rust
//!
//! This crate provides a Monte Carlo sampler that attaches polynomially
//! filtered amplitudes `(P(H)ψ)(x)` to configurations of spin-½ systems with a
//! conserved magnetisation, together with the supervised training loop that
//! repeatedly fits a wave function to those amplitudes.

pub mod error;
pub mod basis;
pub mod operator;
pub mod wavefunction;
pub mod sampling;
pub mod training;
pub mod io;

// Re-export commonly used types at crate root
pub use error::{SwoError, SwoResult};
pub use basis::{Basis, SectorCache, SpinConfig, MAX_SPINS};
pub use operator::{Operator, OperatorTerm, PolynomialFilter, SparseVector, TermKind};
pub use wavefunction::{evaluate_checked, AmplitudeModel, CombiningState, ExplicitState, PhaseModel, Sign, TargetState};
pub use sampling::{filtered_values, sample_difference, sample_exhaustive, sample_some, ChainOptions, ChainSteps, Ensemble, EnsembleEntry, EnsembleTensors, MarkovChain};
pub use training::{fit, optimise_scale, overlaps, FitOptions, LinearPhase, LogLinearAmplitude, ReferenceState, RunSummary, Swo, Symmetry, Trainable};
pub use io::{parse_hamiltonian, read_config, read_hamiltonian, read_reference_state, DataSource, SwoConfig};
