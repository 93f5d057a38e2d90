//! Small trainable models for the two halves of a wave function.
//!
//! - `LogLinearAmplitude`: Jastrow-like `A(x) = exp(b + Σ_i w_i s_i + Σ_{i<j} J_ij s_i s_j)`
//! - `LinearPhase`: two logits, each affine in the spins
//!
//! Both expose their parameters as a flat vector together with the loss and
//! its gradient on a mini-batch, which is all the fit loop needs.

use nalgebra::DVector;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::debug;

use crate::basis::SpinConfig;
use crate::error::{SwoError, SwoResult};
use crate::wavefunction::{AmplitudeModel, PhaseModel, Sign};

/// Model with a flat parameter vector and a differentiable loss.
pub trait Trainable: Clone + Send + Sync {
    /// Per-sample training label.
    type Target: Copy + Send + Sync;

    fn num_params(&self) -> usize;

    fn get_params(&self) -> Vec<f64>;

    /// Fails with `InvalidOptions` unless `params.len() == num_params()`.
    fn set_params(&mut self, params: &[f64]) -> SwoResult<()>;

    /// Loss on a mini-batch and its gradient with respect to the parameters.
    fn loss_and_gradient(&self, configs: &[SpinConfig], targets: &[Self::Target]) -> (f64, Vec<f64>);
}

fn check_len(expected: usize, params: &[f64]) -> SwoResult<()> {
    if params.len() != expected {
        return Err(SwoError::InvalidOptions(format!(
            "model has {expected} parameters, got {}",
            params.len()
        )));
    }
    Ok(())
}

fn init_params<R: Rng + ?Sized>(len: usize, std_dev: f64, rng: &mut R) -> DVector<f64> {
    match Normal::new(0.0, std_dev) {
        Ok(normal) => DVector::from_fn(len, |_, _| normal.sample(rng)),
        Err(_) => DVector::zeros(len),
    }
}

/// Amplitude regressor with one- and two-body log-linear terms.
#[derive(Clone, Debug, PartialEq)]
pub struct LogLinearAmplitude {
    number_spins: usize,
    /// `[b, w_0..w_{n-1}, J_01, J_02, .., J_{n-2,n-1}]`
    params: DVector<f64>,
}

impl LogLinearAmplitude {
    pub fn num_features(number_spins: usize) -> usize {
        1 + number_spins + number_spins * number_spins.saturating_sub(1) / 2
    }

    pub fn zeros(number_spins: usize) -> Self {
        Self {
            number_spins,
            params: DVector::zeros(Self::num_features(number_spins)),
        }
    }

    pub fn random<R: Rng + ?Sized>(number_spins: usize, rng: &mut R) -> Self {
        Self {
            number_spins,
            params: init_params(Self::num_features(number_spins), 0.01, rng),
        }
    }

    fn features(&self, config: &SpinConfig) -> DVector<f64> {
        let n = self.number_spins;
        let spins = config.to_spins(n);
        let mut f = DVector::zeros(Self::num_features(n));
        f[0] = 1.0;
        for i in 0..n {
            f[1 + i] = spins[i];
        }
        let mut k = 1 + n;
        for i in 0..n {
            for j in i + 1..n {
                f[k] = spins[i] * spins[j];
                k += 1;
            }
        }
        f
    }

    pub fn log_amplitude(&self, config: &SpinConfig) -> f64 {
        self.params.dot(&self.features(config))
    }
}

impl AmplitudeModel for LogLinearAmplitude {
    fn number_spins(&self) -> usize {
        self.number_spins
    }

    fn amplitude(&self, config: &SpinConfig) -> f64 {
        self.log_amplitude(config).exp()
    }
}

impl Trainable for LogLinearAmplitude {
    type Target = f64;

    fn num_params(&self) -> usize {
        self.params.len()
    }

    fn get_params(&self) -> Vec<f64> {
        self.params.as_slice().to_vec()
    }

    fn set_params(&mut self, params: &[f64]) -> SwoResult<()> {
        check_len(self.params.len(), params)?;
        self.params.copy_from_slice(params);
        Ok(())
    }

    /// Negative log overlap `−ln(⟨p, e⟩ / (‖p‖ ‖e‖))` between predictions and targets.
    ///
    /// The loss does not depend on the overall scale of `p`, so predictions are
    /// shifted in log space before exponentiating.
    fn loss_and_gradient(&self, configs: &[SpinConfig], targets: &[f64]) -> (f64, Vec<f64>) {
        let features: Vec<DVector<f64>> = configs.iter().map(|c| self.features(c)).collect();
        let logs: Vec<f64> = features.iter().map(|f| self.params.dot(f)).collect();
        let shift = logs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let p: Vec<f64> = logs.iter().map(|l| (l - shift).exp()).collect();

        let ee: f64 = targets.iter().map(|e| e * e).sum();
        let pe: f64 = p.iter().zip(targets).map(|(p, e)| p * e).sum();
        let pp: f64 = p.iter().map(|p| p * p).sum();
        if ee == 0.0 || pe <= 0.0 {
            debug!(
                "No amplitude signal in a batch of {} (|e|² = {:.3e}, <p, e> = {:.3e}), skipping update",
                configs.len(),
                ee,
                pe
            );
            return (0.0, vec![0.0; self.num_params()]);
        }

        let loss = -pe.ln() + 0.5 * pp.ln() + 0.5 * ee.ln();
        let mut grad = DVector::zeros(self.num_params());
        for ((f, &p), &e) in features.iter().zip(&p).zip(targets) {
            grad.axpy(p * p / pp - e * p / pe, f, 1.0);
        }
        (loss, grad.as_slice().to_vec())
    }
}

/// Sign classifier with logits `z_c = b_c + Σ_i W_ci s_i`.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearPhase {
    number_spins: usize,
    /// Row-major `[b_0, W_0.., b_1, W_1..]`.
    params: DVector<f64>,
}

impl LinearPhase {
    pub fn zeros(number_spins: usize) -> Self {
        Self {
            number_spins,
            params: DVector::zeros(Sign::COUNT * (number_spins + 1)),
        }
    }

    pub fn random<R: Rng + ?Sized>(number_spins: usize, rng: &mut R) -> Self {
        Self {
            number_spins,
            params: init_params(Sign::COUNT * (number_spins + 1), 0.1, rng),
        }
    }

    fn row(&self, class: usize) -> std::ops::Range<usize> {
        let width = self.number_spins + 1;
        class * width..(class + 1) * width
    }

    fn inputs(&self, config: &SpinConfig) -> DVector<f64> {
        let mut x = DVector::zeros(self.number_spins + 1);
        x[0] = 1.0;
        for i in 0..self.number_spins {
            x[1 + i] = config.spin(i);
        }
        x
    }
}

impl PhaseModel for LinearPhase {
    fn number_spins(&self) -> usize {
        self.number_spins
    }

    fn logits(&self, config: &SpinConfig) -> [f64; Sign::COUNT] {
        let x = self.inputs(config);
        let mut z = [0.0; Sign::COUNT];
        for (c, zc) in z.iter_mut().enumerate() {
            *zc = self.params.rows_range(self.row(c)).dot(&x);
        }
        z
    }
}

impl Trainable for LinearPhase {
    type Target = Sign;

    fn num_params(&self) -> usize {
        self.params.len()
    }

    fn get_params(&self) -> Vec<f64> {
        self.params.as_slice().to_vec()
    }

    fn set_params(&mut self, params: &[f64]) -> SwoResult<()> {
        check_len(self.params.len(), params)?;
        self.params.copy_from_slice(params);
        Ok(())
    }

    /// Mean cross-entropy of the softmax over the logits.
    fn loss_and_gradient(&self, configs: &[SpinConfig], targets: &[Sign]) -> (f64, Vec<f64>) {
        let mut loss = 0.0;
        let mut grad = DVector::zeros(self.num_params());
        if configs.is_empty() {
            return (loss, grad.as_slice().to_vec());
        }
        let scale = 1.0 / configs.len() as f64;
        for (config, target) in configs.iter().zip(targets) {
            let x = self.inputs(config);
            let z = self.logits(config);
            let max = z.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let norm: f64 = z.iter().map(|zc| (zc - max).exp()).sum();
            let label = target.class();
            loss -= scale * (z[label] - max - norm.ln());
            for (c, &zc) in z.iter().enumerate() {
                let prob = (zc - max).exp() / norm;
                let delta = prob - if c == label { 1.0 } else { 0.0 };
                let mut row = grad.rows_range_mut(self.row(c));
                row.axpy(scale * delta, &x, 1.0);
            }
        }
        (loss, grad.as_slice().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn numerical_gradient<M: Trainable>(model: &M, configs: &[SpinConfig], targets: &[M::Target], h: f64) -> Vec<f64> {
        let params = model.get_params();
        (0..params.len())
            .map(|i| {
                let mut fwd = model.clone();
                let mut bwd = model.clone();
                let mut p = params.clone();
                p[i] += h;
                fwd.set_params(&p).unwrap();
                p[i] -= 2.0 * h;
                bwd.set_params(&p).unwrap();
                (fwd.loss_and_gradient(configs, targets).0 - bwd.loss_and_gradient(configs, targets).0) / (2.0 * h)
            })
            .collect()
    }

    fn configs() -> Vec<SpinConfig> {
        ["1100", "1010", "0110", "0101", "0011"]
            .iter()
            .map(|s| SpinConfig::from_bits_str(s).unwrap())
            .collect()
    }

    #[test]
    fn test_feature_count() {
        assert_eq!(LogLinearAmplitude::num_features(4), 1 + 4 + 6);
        assert_eq!(LogLinearAmplitude::zeros(10).num_params(), 56);
        assert_eq!(LinearPhase::zeros(10).num_params(), 22);
    }

    #[test]
    fn test_zero_amplitude_model_is_flat() {
        let model = LogLinearAmplitude::zeros(4);
        for c in configs() {
            assert_relative_eq!(model.amplitude(&c), 1.0);
        }
    }

    #[test]
    fn test_amplitude_gradient_matches_finite_differences() {
        let mut rng = StdRng::seed_from_u64(17);
        let mut model = LogLinearAmplitude::random(4, &mut rng);
        let params: Vec<f64> = model.get_params().iter().map(|p| p * 20.0).collect();
        model.set_params(&params).unwrap();
        let targets = vec![0.1, 0.5, 0.3, 0.9, 0.2];
        let (_, analytical) = model.loss_and_gradient(&configs(), &targets);
        let numerical = numerical_gradient(&model, &configs(), &targets, 1e-6);
        for (a, n) in analytical.iter().zip(&numerical) {
            assert_relative_eq!(a, n, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_amplitude_loss_vanishes_at_perfect_overlap() {
        let model = LogLinearAmplitude::zeros(4);
        let (loss, grad) = model.loss_and_gradient(&configs(), &[2.0; 5]);
        assert_relative_eq!(loss, 0.0, epsilon = 1e-12);
        assert!(grad.iter().all(|g| g.abs() < 1e-12));
    }

    #[test]
    fn test_all_zero_targets_give_no_update() {
        let mut rng = StdRng::seed_from_u64(2);
        let model = LogLinearAmplitude::random(4, &mut rng);
        let (loss, grad) = model.loss_and_gradient(&configs(), &[0.0; 5]);
        assert_eq!(loss, 0.0);
        assert_eq!(grad.len(), model.num_params());
        assert!(grad.iter().all(|&g| g == 0.0));
    }

    #[test]
    fn test_set_params_checks_length() {
        let mut amplitude = LogLinearAmplitude::zeros(4);
        assert!(matches!(amplitude.set_params(&[1.0; 3]), Err(SwoError::InvalidOptions(_))));
        assert_eq!(amplitude, LogLinearAmplitude::zeros(4));
        amplitude.set_params(&[0.5; 11]).unwrap();
        assert_eq!(amplitude.get_params(), vec![0.5; 11]);

        let mut phase = LinearPhase::zeros(4);
        assert!(phase.set_params(&[0.0; 11]).is_err());
        assert!(phase.set_params(&[0.0; 10]).is_ok());
    }

    #[test]
    fn test_phase_gradient_matches_finite_differences() {
        let mut rng = StdRng::seed_from_u64(5);
        let model = LinearPhase::random(4, &mut rng);
        let targets = vec![Sign::Positive, Sign::Negative, Sign::Negative, Sign::Positive, Sign::Negative];
        let (loss, analytical) = model.loss_and_gradient(&configs(), &targets);
        assert!(loss > 0.0);
        let numerical = numerical_gradient(&model, &configs(), &targets, 1e-6);
        for (a, n) in analytical.iter().zip(&numerical) {
            assert_relative_eq!(a, n, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_zero_phase_model_has_log2_loss() {
        let model = LinearPhase::zeros(4);
        let (loss, _) = model.loss_and_gradient(&configs(), &[Sign::Negative; 5]);
        assert_relative_eq!(loss, std::f64::consts::LN_2, epsilon = 1e-12);
        assert_eq!(Sign::from_logits(&model.logits(&configs()[0])), Sign::Positive);
    }
}
