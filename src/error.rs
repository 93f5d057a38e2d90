//! Error types for the sampling engine and the training loop around it.

use thiserror::Error;

use crate::basis::SpinConfig;

/// Errors produced by the engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SwoError {
    /// Spin vector has the wrong length or violates the magnetisation sector.
    #[error("invalid spin configuration {config:#x}: {reason}")]
    InvalidConfiguration {
        /// Packed configuration that was rejected.
        config: u64,
        /// Human readable explanation.
        reason: String,
    },

    /// The target state returned NaN or Inf.
    #[error("target state returned a non-finite value {re} + {im}i at configuration {config:#x}")]
    EvaluationFailure {
        /// Packed configuration at which evaluation failed.
        config: u64,
        /// Real part of the offending value.
        re: f64,
        /// Imaginary part of the offending value.
        im: f64,
    },

    /// Ensembles over different numbers of spins cannot be merged.
    #[error("cannot merge ensembles over {found} spins into one over {expected} spins")]
    IncompatibleEnsemble {
        /// Spin count of the receiving ensemble.
        expected: usize,
        /// Spin count of the other ensemble.
        found: usize,
    },

    /// Scale optimisation with a degenerate denominator.
    #[error("zero norm: {0}")]
    ZeroNorm(String),

    /// Training produced a non-finite loss.
    #[error("{model} training diverged at epoch {epoch}")]
    Diverged {
        model: &'static str,
        epoch: usize,
    },

    /// Sampler or training options that make no sense.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// Malformed input file.
    #[error("parse error at line {line}: {message}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SwoError {
    pub(crate) fn invalid_configuration(config: SpinConfig, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            config: config.bits(),
            reason: reason.into(),
        }
    }
}

/// Result type used throughout the crate.
pub type SwoResult<T> = Result<T, SwoError>;
