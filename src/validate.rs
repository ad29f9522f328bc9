//! Fast deterministic validation of known strongly regular graphs.

use crate::error::{Result, SrgError};
use crate::graph::{RegularGraph, parse_adjacency_matrix};
use crate::score::{Score, score};

const PALEY9: &str = include_str!("../graph_paley9.txt");

// ============================================================================
// Public API
// ============================================================================

/// Validates the bundled witness graphs:
/// - the Paley graph of order 9, an SRG(9, 4, 1, 2)
///
/// # Errors
/// `InvalidWitness` if any bundled graph fails validation.
pub fn validate_known_graphs() -> Result<()> {
    validate_witness(PALEY9, "graph_paley9.txt", 4)?;
    Ok(())
}

/// The bundled Paley graph of order 9.
///
/// # Errors
/// `InvalidWitness` if the bundled text is damaged.
pub fn bundled_paley9() -> Result<RegularGraph> {
    validate_witness(PALEY9, "graph_paley9.txt", 4)?;
    RegularGraph::parse(PALEY9, 4)
}

/// Parses `text` and checks it is a k-regular graph with zero defects.
///
/// Returns the graph's score (`triangles + squares == n(n-1)/2`).
///
/// # Errors
/// `InvalidWitness` naming `name` and the first failed check.
pub fn validate_witness(text: &str, name: &str, k: usize) -> Result<Score> {
    let parsed = parse_adjacency_matrix(text).map_err(|e| witness(name, e.to_string()))?;
    let graph = RegularGraph::from_parsed(&parsed, k).map_err(|e| witness(name, e.to_string()))?;
    validate_srg(&graph).map_err(|e| match e {
        SrgError::InvalidWitness { detail, .. } => witness(name, detail),
        other => other,
    })
}

/// Checks that `graph` is regular at its target degree and has no defects.
///
/// # Errors
/// `InvalidWitness` describing the first violation.
pub fn validate_srg(graph: &RegularGraph) -> Result<Score> {
    if let Some(detail) = graph.regularity_violation(graph.k()) {
        return Err(witness("graph", detail));
    }
    let s = score(graph);
    let defects = s.defects(graph.n());
    if defects != 0 {
        return Err(witness(
            "graph",
            format!(
                "{defects} defective pairs (triangles={}, squares={})",
                s.triangles, s.squares
            ),
        ));
    }
    Ok(s)
}

// ============================================================================
// Internal
// ============================================================================

fn witness(name: &str, detail: String) -> SrgError {
    SrgError::InvalidWitness {
        name: name.to_owned(),
        detail,
    }
}

/// Paley(9) for tests in other modules.
#[cfg(test)]
pub(crate) fn paley9() -> RegularGraph {
    bundled_paley9().unwrap()
}

// ============================================================================
// Tests
// ============================================================================
