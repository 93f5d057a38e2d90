//! Explicit eigenstates used as overlap references.
//!
//! ```text
//! energy=-4.515446354
//! label=0
//! 0101010101 0.0385 0.0
//! 1010101010 -0.0385
//! ```
//!
//! Each amplitude line is a `0`/`1` string with site 0 first, the real part
//! and an optional imaginary part.

use std::collections::HashMap;
use std::path::Path;

use num_complex::Complex64;

use crate::basis::SpinConfig;
use crate::error::{SwoError, SwoResult};
use crate::training::ReferenceState;
use crate::wavefunction::ExplicitState;

fn parse_error(line: usize, message: impl Into<String>) -> SwoError {
    SwoError::Parse {
        line,
        message: message.into(),
    }
}

fn parse_f64(line: usize, what: &str, s: &str) -> SwoResult<f64> {
    s.parse()
        .map_err(|e| parse_error(line, format!("invalid {what} {s:?}: {e}")))
}

pub fn parse_reference_state(text: &str, number_spins: usize) -> SwoResult<ReferenceState> {
    let mut energy = None;
    let mut label = None;
    let mut amplitudes = HashMap::new();
    for (k, raw) in text.lines().enumerate() {
        let line_no = k + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(value) = line.strip_prefix("energy=") {
            energy = Some(parse_f64(line_no, "energy", value.trim())?);
            continue;
        }
        if let Some(value) = line.strip_prefix("label=") {
            let value = value.trim();
            label = Some(
                value
                    .parse::<i64>()
                    .map_err(|e| parse_error(line_no, format!("invalid label {value:?}: {e}")))?,
            );
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if !(2..=3).contains(&fields.len()) {
            return Err(parse_error(line_no, format!("expected `<spins> <re> [<im>]`, found {line:?}")));
        }
        if fields[0].len() != number_spins {
            return Err(parse_error(
                line_no,
                format!("{:?} does not have {number_spins} spins", fields[0]),
            ));
        }
        let config = SpinConfig::from_bits_str(fields[0]).map_err(|e| parse_error(line_no, e.to_string()))?;
        let re = parse_f64(line_no, "real part", fields[1])?;
        let im = match fields.get(2) {
            Some(s) => parse_f64(line_no, "imaginary part", s)?,
            None => 0.0,
        };
        amplitudes.insert(config, Complex64::new(re, im));
    }

    let energy = energy.ok_or_else(|| parse_error(0, "missing `energy=` header"))?;
    let label = label.ok_or_else(|| parse_error(0, "missing `label=` header"))?;
    Ok(ReferenceState {
        energy,
        label,
        state: ExplicitState::new(number_spins, amplitudes),
    })
}

/// Read one reference state file.
pub fn read_reference_state<P: AsRef<Path>>(path: P, number_spins: usize) -> SwoResult<ReferenceState> {
    let text = std::fs::read_to_string(path)?;
    parse_reference_state(&text, number_spins)
}
