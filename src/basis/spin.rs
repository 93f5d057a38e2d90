//! Packed spin configurations.
//!
//! A configuration of up to 64 spin-½ sites is stored as the bits of a `u64`:
//! bit `i` set means spin `i` points up (σᶻ = +1), cleared means down (σᶻ = −1).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SwoError, SwoResult};

/// Largest number of spins a packed configuration can hold.
pub const MAX_SPINS: usize = 64;

/// A single basis state, packed into an integer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpinConfig(u64);

impl SpinConfig {
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Build from σᶻ values. Anything other than `±1` is rejected.
    pub fn from_spins(spins: &[f64]) -> SwoResult<Self> {
        if spins.len() > MAX_SPINS {
            return Err(SwoError::InvalidOptions(format!(
                "{} spins do not fit into a packed configuration",
                spins.len()
            )));
        }
        let mut bits = 0u64;
        for (i, &s) in spins.iter().enumerate() {
            if s == 1.0 {
                bits |= 1 << i;
            } else if s != -1.0 {
                return Err(SwoError::invalid_configuration(
                    Self(bits),
                    format!("spin {i} has value {s}, expected ±1"),
                ));
            }
        }
        Ok(Self(bits))
    }

    /// Parse a string of `0`/`1` characters, site 0 first.
    pub fn from_bits_str(s: &str) -> SwoResult<Self> {
        if s.len() > MAX_SPINS {
            return Err(SwoError::InvalidOptions(format!(
                "{} spins do not fit into a packed configuration",
                s.len()
            )));
        }
        let mut bits = 0u64;
        for (i, c) in s.chars().enumerate() {
            match c {
                '1' => bits |= 1 << i,
                '0' => {}
                other => {
                    return Err(SwoError::InvalidOptions(format!(
                        "unexpected character {other:?} in spin string {s:?}"
                    )))
                }
            }
        }
        Ok(Self(bits))
    }

    #[inline]
    pub fn is_up(self, site: usize) -> bool {
        (self.0 >> site) & 1 == 1
    }

    /// σᶻ at `site` as `±1`.
    #[inline]
    pub fn spin(self, site: usize) -> f64 {
        if self.is_up(site) {
            1.0
        } else {
            -1.0
        }
    }

    /// Copy with every listed site flipped.
    #[inline]
    pub fn flipped(self, sites: &[usize]) -> Self {
        let mask = sites.iter().fold(0u64, |m, &i| m ^ (1 << i));
        Self(self.0 ^ mask)
    }

    #[inline]
    pub fn count_ups(self) -> u32 {
        self.0.count_ones()
    }

    /// Number of up spins minus number of down spins.
    #[inline]
    pub fn magnetisation(self, number_spins: usize) -> i32 {
        2 * self.count_ups() as i32 - number_spins as i32
    }

    /// σᶻ values of the first `number_spins` sites.
    pub fn to_spins(self, number_spins: usize) -> Vec<f64> {
        (0..number_spins).map(|i| self.spin(i)).collect()
    }

    /// `0`/`1` string of the first `number_spins` sites.
    pub fn to_bits_string(self, number_spins: usize) -> String {
        (0..number_spins)
            .map(|i| if self.is_up(i) { '1' } else { '0' })
            .collect()
    }
}

impl fmt::Display for SpinConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
