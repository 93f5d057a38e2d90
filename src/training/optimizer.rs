//! Mini-batch gradient descent with Adam.

use std::time::Instant;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::models::Trainable;
use crate::basis::SpinConfig;
use crate::error::{SwoError, SwoResult};

/// Options of one supervised fit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    #[serde(default = "default_beta1")]
    pub beta1: f64,
    #[serde(default = "default_beta2")]
    pub beta2: f64,
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
}

fn default_beta1() -> f64 {
    0.9
}

fn default_beta2() -> f64 {
    0.999
}

fn default_epsilon() -> f64 {
    1e-8
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            epochs: 100,
            batch_size: 64,
            learning_rate: 0.003,
            beta1: default_beta1(),
            beta2: default_beta2(),
            epsilon: default_epsilon(),
        }
    }
}

impl FitOptions {
    pub fn new(epochs: usize, batch_size: usize, learning_rate: f64) -> Self {
        Self {
            epochs,
            batch_size,
            learning_rate,
            ..Self::default()
        }
    }
}

/// Adam optimiser state.
#[derive(Clone, Debug)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    m: Vec<f64>,
    v: Vec<f64>,
    t: i32,
}

impl Adam {
    pub fn new(num_params: usize, options: &FitOptions) -> Self {
        Self {
            learning_rate: options.learning_rate,
            beta1: options.beta1,
            beta2: options.beta2,
            epsilon: options.epsilon,
            m: vec![0.0; num_params],
            v: vec![0.0; num_params],
            t: 0,
        }
    }

    pub fn step(&mut self, params: &mut [f64], grad: &[f64]) {
        self.t += 1;
        let bias1 = 1.0 - self.beta1.powi(self.t);
        let bias2 = 1.0 - self.beta2.powi(self.t);
        for i in 0..params.len() {
            self.m[i] = self.beta1 * self.m[i] + (1.0 - self.beta1) * grad[i];
            self.v[i] = self.beta2 * self.v[i] + (1.0 - self.beta2) * grad[i] * grad[i];
            let m_hat = self.m[i] / bias1;
            let v_hat = self.v[i] / bias2;
            params[i] -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
        }
    }
}

/// Loss history of a fit.
#[derive(Clone, Debug, Default)]
pub struct FitReport {
    /// Mean mini-batch loss of every epoch.
    pub epoch_losses: Vec<f64>,
}

impl FitReport {
    pub fn final_loss(&self) -> Option<f64> {
        self.epoch_losses.last().copied()
    }
}

/// Epochs at which progress is logged: all of them for short runs, otherwise
/// every tenth of the run plus the last one.
pub fn checkpoint_epochs(epochs: usize) -> Vec<usize> {
    if epochs <= 10 {
        return (0..epochs).collect();
    }
    let mut out: Vec<usize> = (0..epochs).step_by(epochs / 10).collect();
    if out.last() != Some(&(epochs - 1)) {
        out.push(epochs - 1);
    }
    out
}

/// Shuffled mini-batch training of `model` on `(configs, targets)`.
pub fn fit<M, R>(
    name: &'static str,
    model: &mut M,
    configs: &[SpinConfig],
    targets: &[M::Target],
    options: &FitOptions,
    rng: &mut R,
) -> SwoResult<FitReport>
where
    M: Trainable,
    R: Rng + ?Sized,
{
    if configs.len() != targets.len() {
        return Err(SwoError::InvalidOptions(format!(
            "{} configurations but {} targets",
            configs.len(),
            targets.len()
        )));
    }
    if options.batch_size == 0 {
        return Err(SwoError::InvalidOptions("batch_size must be at least 1".into()));
    }
    let start = Instant::now();
    let mut report = FitReport::default();
    if configs.is_empty() {
        return Ok(report);
    }

    let checkpoints = checkpoint_epochs(options.epochs);
    let mut adam = Adam::new(model.num_params(), options);
    let mut params = model.get_params();
    let mut order: Vec<usize> = (0..configs.len()).collect();
    let mut batch_configs = Vec::with_capacity(options.batch_size);
    let mut batch_targets = Vec::with_capacity(options.batch_size);

    for epoch in 0..options.epochs {
        order.shuffle(rng);
        let mut losses = Vec::with_capacity(configs.len().div_ceil(options.batch_size));
        for chunk in order.chunks(options.batch_size) {
            batch_configs.clear();
            batch_targets.clear();
            batch_configs.extend(chunk.iter().map(|&i| configs[i]));
            batch_targets.extend(chunk.iter().map(|&i| targets[i]));

            let (loss, grad) = model.loss_and_gradient(&batch_configs, &batch_targets);
            if !loss.is_finite() || grad.iter().any(|g| !g.is_finite()) {
                return Err(SwoError::Diverged { model: name, epoch });
            }
            losses.push(loss);
            adam.step(&mut params, &grad);
            model.set_params(&params)?;
        }

        let n = losses.len() as f64;
        let mean = losses.iter().sum::<f64>() / n;
        report.epoch_losses.push(mean);
        if checkpoints.binary_search(&epoch).is_ok() {
            let std = if losses.len() > 1 {
                (losses.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
            } else {
                0.0
            };
            let min = losses.iter().copied().fold(f64::INFINITY, f64::min);
            let max = losses.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            info!(
                "{}%: loss = {:.5e} ± {:.2e}; loss ∈ [{:.5e}, {:.5e}]",
                100 * (epoch + 1) / options.epochs,
                mean,
                std,
                min,
                max
            );
        }
    }

    info!("Done in {:.2} seconds!", start.elapsed().as_secs_f64());
    Ok(report)
}
