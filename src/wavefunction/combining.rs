//! Combining an amplitude regressor and a sign classifier into one wave function.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::traits::{AmplitudeModel, PhaseModel, TargetState};
use crate::basis::SpinConfig;

/// Sign of a real wave function amplitude, as predicted by the phase classifier.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sign {
    Positive,
    Negative,
}

/// Classifier output index → sign.
pub const SIGN_CLASSES: [Sign; Sign::COUNT] = [Sign::Positive, Sign::Negative];

impl Sign {
    pub const COUNT: usize = 2;

    pub fn from_class(class: usize) -> Option<Self> {
        SIGN_CLASSES.get(class).copied()
    }

    pub fn class(self) -> usize {
        match self {
            Sign::Positive => 0,
            Sign::Negative => 1,
        }
    }

    pub fn factor(self) -> f64 {
        match self {
            Sign::Positive => 1.0,
            Sign::Negative => -1.0,
        }
    }

    /// Sign of the largest logit; on ties the lowest class wins.
    pub fn from_logits(logits: &[f64; Sign::COUNT]) -> Self {
        let mut best = 0;
        for (i, &z) in logits.iter().enumerate().skip(1) {
            if z > logits[best] {
                best = i;
            }
        }
        SIGN_CLASSES[best]
    }

    /// Training label for a target value: `Re v ≥ 0` is positive.
    pub fn of_value(value: Complex64) -> Self {
        if value.re >= 0.0 {
            Sign::Positive
        } else {
            Sign::Negative
        }
    }
}

/// `ψ(x) = A(x) · sign(argmax φ(x))`.
#[derive(Clone, Debug)]
pub struct CombiningState<A, P> {
    amplitude: A,
    phase: P,
}

impl<A: AmplitudeModel, P: PhaseModel> CombiningState<A, P> {
    pub fn new(amplitude: A, phase: P) -> Self {
        Self { amplitude, phase }
    }

    pub fn amplitude(&self) -> &A {
        &self.amplitude
    }

    pub fn phase(&self) -> &P {
        &self.phase
    }

    pub fn into_parts(self) -> (A, P) {
        (self.amplitude, self.phase)
    }
}

impl<A: AmplitudeModel, P: PhaseModel> TargetState for CombiningState<A, P> {
    fn number_spins(&self) -> usize {
        self.amplitude.number_spins()
    }

    fn evaluate(&self, config: &SpinConfig) -> Complex64 {
        let a = self.amplitude.amplitude(config);
        let sign = Sign::from_logits(&self.phase.logits(config));
        Complex64::new(a * sign.factor(), 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    struct ConstAmplitude(f64);

    impl AmplitudeModel for ConstAmplitude {
        fn number_spins(&self) -> usize {
            4
        }

        fn amplitude(&self, _: &SpinConfig) -> f64 {
            self.0
        }
    }

    struct ConstPhase([f64; 2]);

    impl PhaseModel for ConstPhase {
        fn number_spins(&self) -> usize {
            4
        }

        fn logits(&self, _: &SpinConfig) -> [f64; 2] {
            self.0
        }
    }

    #[test]
    fn test_negative_class_flips_sign() {
        let state = CombiningState::new(ConstAmplitude(2.0), ConstPhase([0.1, 0.9]));
        let value = state.evaluate(&SpinConfig::from_bits(0b0011));
        assert_relative_eq!(value.re, -2.0);
        assert_relative_eq!(value.im, 0.0);
    }

    #[test]
    fn test_positive_class_keeps_sign() {
        let state = CombiningState::new(ConstAmplitude(0.75), ConstPhase([1.3, -0.2]));
        assert_relative_eq!(state.evaluate(&SpinConfig::from_bits(0b0101)).re, 0.75);
    }

    #[test]
    fn test_argmax_tie_picks_first_class() {
        assert_eq!(Sign::from_logits(&[0.5, 0.5]), Sign::Positive);
        let state = CombiningState::new(ConstAmplitude(1.0), ConstPhase([0.5, 0.5]));
        assert_relative_eq!(state.evaluate(&SpinConfig::from_bits(0)).re, 1.0);
    }

    #[test]
    fn test_class_table() {
        for (i, sign) in SIGN_CLASSES.iter().enumerate() {
            assert_eq!(sign.class(), i);
            assert_eq!(Sign::from_class(i), Some(*sign));
        }
        assert_eq!(Sign::from_class(2), None);
        assert_eq!(Sign::of_value(Complex64::new(0.0, 0.0)), Sign::Positive);
        assert_eq!(Sign::of_value(Complex64::new(-1e-9, 0.0)), Sign::Negative);
    }
}
