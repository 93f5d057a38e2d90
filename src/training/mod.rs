//! Training module - supervised fits and the SWO loop around the sampler.

mod models;
mod optimizer;
mod overlap;
mod scale;
mod swo;
mod symmetry;
mod targets;

pub use models::{LinearPhase, LogLinearAmplitude, Trainable};
pub use optimizer::{checkpoint_epochs, fit, Adam, FitOptions, FitReport};
pub use overlap::{overlaps, OverlapReport, ReferenceState};
pub use scale::optimise_scale;
pub use swo::{RunSummary, Swo};
pub use symmetry::{extend_using_symmetries, Symmetry};
pub use targets::{accuracy, amplitude_targets, sign_targets, TrainingData};
