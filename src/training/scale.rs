//! Least-squares scale between old targets and a new amplitude prediction.

use crate::basis::SpinConfig;
use crate::error::{SwoError, SwoResult};
use crate::wavefunction::AmplitudeModel;

/// `−⟨φ, ψ⟩ / ⟨φ, φ⟩` with `φ` the old target amplitudes and `ψ` the model's
/// prediction on the same configurations.
///
/// Callers in the training loop use the magnitude of the result.
pub fn optimise_scale<A: AmplitudeModel + ?Sized>(model: &A, configs: &[SpinConfig], phi: &[f64]) -> SwoResult<f64> {
    if configs.len() != phi.len() {
        return Err(SwoError::InvalidOptions(format!(
            "{} configurations but {} target amplitudes",
            configs.len(),
            phi.len()
        )));
    }
    let a: f64 = phi.iter().map(|p| p * p).sum();
    if a == 0.0 {
        return Err(SwoError::ZeroNorm("⟨φ, φ⟩ = 0, no training signal to fit a scale to".into()));
    }
    let b: f64 = configs
        .iter()
        .zip(phi)
        .map(|(c, p)| p * model.amplitude(c))
        .sum();
    Ok(-b / a)
}
