//! Wave function traits for the sampler and the training loop.
//!
//! `TargetState` is what the sampler sees: something that maps spin
//! configurations to complex amplitudes. `AmplitudeModel` and `PhaseModel` are
//! the two halves a trained state is composed of.

use num_complex::Complex64;

use super::combining::Sign;
use crate::basis::SpinConfig;
use crate::error::{SwoError, SwoResult};

/// Wave function `ψ(x)` over spin configurations.
///
/// Implementations are shared read-only between sampling threads.
pub trait TargetState: Send + Sync {
    fn number_spins(&self) -> usize;

    /// Evaluate `ψ(x)` at a single configuration.
    fn evaluate(&self, config: &SpinConfig) -> Complex64;

    /// Evaluate `ψ` over a batch. Override when batching is cheaper.
    fn evaluate_batch(&self, configs: &[SpinConfig]) -> Vec<Complex64> {
        configs.iter().map(|c| self.evaluate(c)).collect()
    }
}

impl<T: TargetState + ?Sized> TargetState for &T {
    fn number_spins(&self) -> usize {
        (**self).number_spins()
    }

    fn evaluate(&self, config: &SpinConfig) -> Complex64 {
        (**self).evaluate(config)
    }

    fn evaluate_batch(&self, configs: &[SpinConfig]) -> Vec<Complex64> {
        (**self).evaluate_batch(configs)
    }
}

/// Regressor predicting `|ψ(x)|`.
pub trait AmplitudeModel: Send + Sync {
    fn number_spins(&self) -> usize;
    fn amplitude(&self, config: &SpinConfig) -> f64;
}

/// Classifier predicting the sign of `ψ(x)` from one logit per [`Sign`] class.
pub trait PhaseModel: Send + Sync {
    fn number_spins(&self) -> usize;
    fn logits(&self, config: &SpinConfig) -> [f64; Sign::COUNT];
}

/// Batched evaluation that refuses NaN and Inf.
pub fn evaluate_checked<S: TargetState + ?Sized>(state: &S, configs: &[SpinConfig]) -> SwoResult<Vec<Complex64>> {
    let values = state.evaluate_batch(configs);
    if values.len() != configs.len() {
        return Err(SwoError::InvalidOptions(format!(
            "target state returned {} values for {} configurations",
            values.len(),
            configs.len()
        )));
    }
    for (config, value) in configs.iter().zip(values.iter()) {
        check_finite(*config, *value)?;
    }
    Ok(values)
}

#[inline]
pub(crate) fn check_finite(config: SpinConfig, value: Complex64) -> SwoResult<Complex64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SwoError::EvaluationFailure {
            config: config.bits(),
            re: value.re,
            im: value.im,
        })
    }
}
