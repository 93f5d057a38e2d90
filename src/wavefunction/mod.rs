//! Wavefunction module - target states the sampler evaluates.

mod combining;
mod explicit;
mod traits;

pub use combining::{CombiningState, Sign, SIGN_CLASSES};
pub use explicit::ExplicitState;
pub use traits::{evaluate_checked, AmplitudeModel, PhaseModel, TargetState};
pub(crate) use traits::check_finite;
