//! Magnetisation sectors of the spin Hilbert space.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::spin::{SpinConfig, MAX_SPINS};
use crate::error::{SwoError, SwoResult};

/// The set of valid configurations: a fixed number of spins and, optionally,
/// a fixed magnetisation (ups − downs).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Basis {
    number_spins: usize,
    magnetisation: Option<i32>,
}

impl Basis {
    pub fn new(number_spins: usize, magnetisation: Option<i32>) -> SwoResult<Self> {
        if number_spins == 0 || number_spins > MAX_SPINS {
            return Err(SwoError::InvalidOptions(format!(
                "number_spins must be in 1..={MAX_SPINS}, got {number_spins}"
            )));
        }
        if let Some(m) = magnetisation {
            let n = number_spins as i32;
            if m.abs() > n || (n + m) % 2 != 0 {
                return Err(SwoError::InvalidConfiguration {
                    config: 0,
                    reason: format!("magnetisation {m} is impossible for {number_spins} spins"),
                });
            }
        }
        Ok(Self {
            number_spins,
            magnetisation,
        })
    }

    pub fn number_spins(&self) -> usize {
        self.number_spins
    }

    pub fn magnetisation(&self) -> Option<i32> {
        self.magnetisation
    }

    /// Number of up spins fixed by the magnetisation, if any.
    pub fn number_ups(&self) -> Option<usize> {
        self.magnetisation
            .map(|m| ((self.number_spins as i32 + m) / 2) as usize)
    }

    /// Reject configurations with bits beyond `number_spins` or the wrong magnetisation.
    pub fn check(&self, config: SpinConfig) -> SwoResult<()> {
        if self.number_spins < MAX_SPINS && config.bits() >> self.number_spins != 0 {
            return Err(SwoError::invalid_configuration(
                config,
                format!("bits set beyond the {} spins of the basis", self.number_spins),
            ));
        }
        if let Some(m) = self.magnetisation {
            let actual = config.magnetisation(self.number_spins);
            if actual != m {
                return Err(SwoError::invalid_configuration(
                    config,
                    format!("magnetisation {actual}, expected {m}"),
                ));
            }
        }
        Ok(())
    }

    /// Uniformly random valid configuration.
    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> SpinConfig {
        let ups = match self.number_ups() {
            Some(ups) => ups,
            None => rng.gen_range(0..=self.number_spins),
        };
        let mut sites: Vec<usize> = (0..self.number_spins).collect();
        sites.shuffle(rng);
        let bits = sites[..ups].iter().fold(0u64, |b, &i| b | (1 << i));
        SpinConfig::from_bits(bits)
    }

    /// Size of the sector.
    pub fn dimension(&self) -> u64 {
        match self.number_ups() {
            Some(k) => binomial(self.number_spins as u64, k as u64),
            None if self.number_spins == MAX_SPINS => u64::MAX,
            None => 1u64 << self.number_spins,
        }
    }

    /// Every configuration of the sector in increasing packed order.
    pub fn enumerate(&self) -> Vec<SpinConfig> {
        match self.number_ups() {
            Some(k) => combinations(self.number_spins, k),
            None => (0..=(u64::MAX >> (MAX_SPINS - self.number_spins)))
                .map(SpinConfig::from_bits)
                .collect(),
        }
    }
}

fn binomial(n: u64, k: u64) -> u64 {
    let k = k.min(n - k) as u128;
    let n = n as u128;
    let c = (0..k).fold(1u128, |acc, i| acc * (n - i) / (i + 1));
    u64::try_from(c).unwrap_or(u64::MAX)
}

/// All `n`-bit integers with exactly `k` bits set, ascending (Gosper's hack).
fn combinations(n: usize, k: usize) -> Vec<SpinConfig> {
    if k == 0 {
        return vec![SpinConfig::from_bits(0)];
    }
    let limit = if n == MAX_SPINS { None } else { Some(1u64 << n) };
    let mut out = Vec::new();
    let mut v: u64 = if k == MAX_SPINS { u64::MAX } else { (1u64 << k) - 1 };
    loop {
        if let Some(limit) = limit {
            if v >= limit {
                break;
            }
        }
        out.push(SpinConfig::from_bits(v));
        let t = v | (v - 1);
        let Some(next_base) = t.checked_add(1) else { break };
        let v_next = next_base | (((!t & next_base) - 1) >> (v.trailing_zeros() + 1));
        if v_next <= v {
            break;
        }
        v = v_next;
    }
    out
}

/// Cache of a fully enumerated sector, keyed by `(number_spins, magnetisation)`.
///
/// Owned by whoever needs the exhaustive basis; recomputed when the key changes.
#[derive(Debug, Default)]
pub struct SectorCache {
    entry: Option<(Basis, Vec<SpinConfig>)>,
}

impl SectorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, basis: &Basis) -> &[SpinConfig] {
        let stale = !matches!(&self.entry, Some((cached, _)) if cached == basis);
        if stale {
            self.entry = Some((*basis, basis.enumerate()));
        }
        match &self.entry {
            Some((_, configs)) => configs,
            None => &[],
        }
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_rejects_impossible_magnetisation() {
        assert!(Basis::new(10, Some(1)).is_err());
        assert!(Basis::new(4, Some(6)).is_err());
        assert!(Basis::new(65, None).is_err());
        assert!(Basis::new(4, Some(-2)).is_ok());
    }

    #[test]
    fn test_sector_dimension_and_enumeration() {
        let basis = Basis::new(10, Some(0)).unwrap();
        assert_eq!(basis.dimension(), 252);
        let all = basis.enumerate();
        assert_eq!(all.len(), 252);
        assert!(all.windows(2).all(|w| w[0] < w[1]));
        assert!(all.iter().all(|&c| basis.check(c).is_ok()));
    }

    #[test]
    fn test_enumeration_without_magnetisation() {
        let basis = Basis::new(4, None).unwrap();
        assert_eq!(basis.enumerate().len(), 16);
        assert_eq!(basis.dimension(), 16);
    }

    #[test]
    fn test_check() {
        let basis = Basis::new(4, Some(0)).unwrap();
        assert!(basis.check(SpinConfig::from_bits(0b0011)).is_ok());
        assert!(basis.check(SpinConfig::from_bits(0b0111)).is_err());
        assert!(basis.check(SpinConfig::from_bits(0b10001)).is_err());
    }

    #[test]
    fn test_random_is_valid() {
        let basis = Basis::new(12, Some(2)).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            assert!(basis.check(basis.random(&mut rng)).is_ok());
        }
    }

    #[test]
    fn test_sector_cache_invalidates_on_key_change() {
        let mut cache = SectorCache::new();
        let a = Basis::new(6, Some(0)).unwrap();
        let b = Basis::new(6, Some(2)).unwrap();
        assert_eq!(cache.get(&a).len(), 20);
        assert_eq!(cache.get(&b).len(), 15);
        assert_eq!(cache.get(&a).len(), 20);
    }
}
