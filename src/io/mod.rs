//! IO module - run configuration, Hamiltonian files and reference states.

mod config;
mod hamiltonian;
mod reference;

pub use config::{read_config, DataSource, SwoConfig};
pub use hamiltonian::{parse_hamiltonian, read_hamiltonian};
pub use reference::{parse_reference_state, read_reference_state};
