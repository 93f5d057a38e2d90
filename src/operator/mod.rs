//! Operator module - Hamiltonians and polynomial filters built from them.

mod hamiltonian;
mod polynomial;
mod sparse;

pub use hamiltonian::{Operator, OperatorTerm, TermKind};
pub use polynomial::PolynomialFilter;
pub use sparse::SparseVector;
