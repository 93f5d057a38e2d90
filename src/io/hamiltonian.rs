//! Text format for Heisenberg Hamiltonians.
//!
//! One coupling group per line, a coupling constant followed by its edges:
//!
//! ```text
//! # 1x4 ring
//! 1.0 [[0, 1], [1, 2], [2, 3], [3, 0]]
//! ```
//!
//! Blank lines and everything after `#` are ignored.

use std::path::Path;

use crate::basis::Basis;
use crate::error::{SwoError, SwoResult};
use crate::operator::Operator;

/// Parse Hamiltonian text into an operator on `basis`.
pub fn parse_hamiltonian(text: &str, basis: Basis) -> SwoResult<Operator> {
    let mut couplings: Vec<(f64, Vec<(usize, usize)>)> = Vec::new();
    for (k, raw) in text.lines().enumerate() {
        let line_no = k + 1;
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let (coupling, edges) = line.split_once(char::is_whitespace).ok_or_else(|| SwoError::Parse {
            line: line_no,
            message: format!("expected `<coupling> [[i, j], ...]`, found {line:?}"),
        })?;
        let coupling: f64 = coupling.parse().map_err(|e| SwoError::Parse {
            line: line_no,
            message: format!("invalid coupling {coupling:?}: {e}"),
        })?;
        let edges: Vec<[usize; 2]> = serde_yaml::from_str(edges.trim()).map_err(|e| SwoError::Parse {
            line: line_no,
            message: format!("invalid edge list: {e}"),
        })?;
        if let Some(site) = edges.iter().flatten().find(|&&i| i >= basis.number_spins()) {
            return Err(SwoError::Parse {
                line: line_no,
                message: format!("site {site} does not exist, the system has {} spins", basis.number_spins()),
            });
        }
        couplings.push((coupling, edges.into_iter().map(|[i, j]| (i, j)).collect()));
    }
    Operator::heisenberg(basis, &couplings)
}

/// Read a Hamiltonian file.
pub fn read_hamiltonian<P: AsRef<Path>>(path: P, basis: Basis) -> SwoResult<Operator> {
    let text = std::fs::read_to_string(path)?;
    parse_hamiltonian(&text, basis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::SpinConfig;

    #[test]
    fn test_parse_ring() {
        let basis = Basis::new(4, Some(0)).unwrap();
        let text = "# ring\n\n1.0 [[0, 1], [1, 2], [2, 3], [3, 0]]  # nearest\n";
        let h = parse_hamiltonian(text, basis).unwrap();
        assert_eq!(h.terms().len(), 8);
        let neel = SpinConfig::from_bits_str("1010").unwrap();
        let diagonal: f64 = h
            .apply(neel)
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == neel)
            .map(|(_, w)| w.re)
            .sum();
        assert_eq!(diagonal, -4.0);
    }

    #[test]
    fn test_several_groups() {
        let basis = Basis::new(4, Some(0)).unwrap();
        let text = "1.0 [[0, 1], [2, 3]]\n0.5 [[0, 2]]\n";
        assert_eq!(parse_hamiltonian(text, basis).unwrap().terms().len(), 6);
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        let basis = Basis::new(4, Some(0)).unwrap();
        assert!(matches!(
            parse_hamiltonian("1.0 [[0, 1]]\nabc [[1, 2]]\n", basis),
            Err(SwoError::Parse { line: 2, .. })
        ));
        assert!(matches!(
            parse_hamiltonian("1.0 [[0, 1, 2]]\n", basis),
            Err(SwoError::Parse { line: 1, .. })
        ));
        assert!(matches!(
            parse_hamiltonian("1.0\n", basis),
            Err(SwoError::Parse { line: 1, .. })
        ));
        // site 4 does not exist
        assert!(matches!(
            parse_hamiltonian("# ring\n1.0 [[0, 4]]\n", basis),
            Err(SwoError::Parse { line: 2, .. })
        ));
    }
}
