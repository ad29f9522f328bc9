//! Error types shared by every stage of the search.

use crate::graph::GraphParseError;
use thiserror::Error;

/// Unified error type for construction, scoring and search.
#[derive(Error, Debug)]
pub enum SrgError {
    /// Malformed parameters (`n`, `k`, temperature, decay factor, run count).
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// A vertex pair that is a self-loop or lies outside the graph.
    #[error("invalid vertex pair ({i}, {j}) for a graph on {n} vertices")]
    InvalidVertex {
        /// First vertex.
        i: usize,
        /// Second vertex.
        j: usize,
        /// Number of vertices in the graph.
        n: usize,
    },

    /// A swap whose preconditions do not hold on the graph it was applied to.
    ///
    /// The graph is left untouched when this is returned.
    #[error("swap does not apply: {0}")]
    InvalidMove(String),

    /// The feasibility solver proved that no assignment exists.
    #[error("no {k}-regular graph on {n} vertices: {reason}")]
    Infeasible {
        /// Number of vertices.
        n: usize,
        /// Target degree.
        k: usize,
        /// Solver-provided explanation.
        reason: String,
    },

    /// The feasibility solver gave up without an answer either way.
    #[error("solver '{solver}' gave up: {detail}")]
    SolverExhausted {
        /// Solver name.
        solver: &'static str,
        /// What limit was reached.
        detail: String,
    },

    /// The solver returned an assignment that does not decode to a regular graph.
    #[error("construction invariant violated: {0}")]
    ConstructionInvariantViolated(String),

    /// A committed move broke degree regularity. Fatal.
    #[error("regularity invariant violated at iteration {iteration}: {detail}")]
    RegularityInvariantViolated {
        /// Iteration at which the check ran.
        iteration: u64,
        /// First violation found.
        detail: String,
    },

    /// The incrementally maintained score disagrees with a full recomputation. Fatal.
    #[error(
        "incremental score {incremental:?} drifted from recomputed score {recomputed:?} at iteration {iteration}"
    )]
    ScoreDrift {
        /// Iteration at which the check ran.
        iteration: u64,
        /// `(triangles, squares)` tracked incrementally.
        incremental: (usize, usize),
        /// `(triangles, squares)` from the full product.
        recomputed: (usize, usize),
    },

    /// A bundled or user-supplied graph is not the strongly regular graph it claims to be.
    #[error("{name}: {detail}")]
    InvalidWitness {
        /// Where the graph came from.
        name: String,
        /// First failed check.
        detail: String,
    },

    /// Malformed adjacency-matrix text.
    #[error("parse error: {0}")]
    Parse(#[from] GraphParseError),

    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SrgError {
    /// Creates an invalid-parameters error.
    pub fn invalid(message: impl Into<String>) -> Self {
        SrgError::InvalidParameters(message.into())
    }

    /// Creates a construction-invariant error.
    pub fn construction(message: impl Into<String>) -> Self {
        SrgError::ConstructionInvariantViolated(message.into())
    }

    /// Returns `true` for errors that indicate a logic bug rather than bad input.
    ///
    /// Callers should abort the run instead of retrying on these.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SrgError::ConstructionInvariantViolated(_)
                | SrgError::RegularityInvariantViolated { .. }
                | SrgError::ScoreDrift { .. }
        )
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SrgError>;
