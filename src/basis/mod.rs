//! Basis module - spin configurations and magnetisation sectors.

mod sector;
mod spin;

pub use sector::{Basis, SectorCache};
pub use spin::{SpinConfig, MAX_SPINS};
