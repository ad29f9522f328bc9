//! # SRG Search Engine
//!
//! Simulated-annealing search for strongly regular graphs with `λ = 1`, `μ = 2`,
//! such as the Paley graph of order 9 and the conjectured SRG(99, 14, 1, 2).
//!
//! This crate provides:
//! - A multi-word bitset graph with degree-preserving 2-edge swaps.
//! - A feasibility constructor for k-regular starting graphs behind a pluggable solver trait.
//! - A structural score with **incremental** common-neighbor tracking.
//! - A seed-reproducible annealer and a parallel portfolio of independent runs.
//!
//! ## Quick Start
//!
//! ```no_run
//! use srg::search::{run_search, SearchConfig};
//!
//! let cfg = SearchConfig::default().with_iterations(200_000).with_seed(12345);
//! let outcome = run_search(&cfg).expect("valid configuration");
//! println!("best cost {} after {} iterations", outcome.best_cost, outcome.stats.iterations);
//! ```
//!
//! ## Validating Known Graphs
//!
//! ```
//! use srg::validate::validate_known_graphs;
//!
//! validate_known_graphs().expect("bundled graphs should be strongly regular");
//! ```
//!
//! ## Working with Graphs Directly
//!
//! ```
//! use srg::construction::{CirculantSolver, FeasibilityConstructor};
//! use srg::moves::propose_swap;
//! use srg::state::SearchState;
//!
//! let graph = FeasibilityConstructor::new(CirculantSolver).construct(9, 4).unwrap();
//! let mut state = SearchState::new(graph);
//! let before = state.cost();
//!
//! let mv = propose_swap(state.graph(), 0, 4, 0, 0).unwrap();
//! state.apply_swap(&mv).unwrap();
//! state.apply_swap(&mv.inverse()).unwrap();
//!
//! assert_eq!(state.cost(), before);
//! assert!(state.graph().check_regular(4));
//! ```
//!
//! ## Modules
//!
//! - [`graph`]: Bitset adjacency matrix, parsing and file helpers.
//! - [`construction`]: Regularity model, solvers and validated decoding.
//! - [`score`]: Triangle/square pair counts and cost.
//! - [`state`]: Graph plus incrementally maintained score.
//! - [`moves`]: Degree-preserving swap proposal.
//! - [`stream`]: Pre-generated random draws.
//! - [`search`]: Annealing controller.
//! - [`portfolio`]: Parallel independent runs.
//! - [`validate`]: Deterministic validation of known graphs.
//!
//! ## Performance Notes
//!
//! - Rows are `ceil(n/64)` words, so common-neighbor counts are a handful of popcounts.
//! - A swap is rescored in O(k) pair updates instead of O(n³).
//! - For maximum performance, compile with: `RUSTFLAGS="-C target-cpu=native" cargo build --release`

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::inline_always)] // Intentional for hot-path code
#![allow(clippy::many_single_char_names)] // Mathematical variable names
#![allow(clippy::needless_range_loop)] // Often clearer for matrix indexing
#![allow(clippy::doc_markdown)] // Mathematical notation in docs
#![allow(clippy::multiple_crate_versions)] // Cargo.lock management is external

pub mod construction;
pub mod error;
pub mod graph;
pub mod moves;
pub mod portfolio;
pub mod score;
pub mod search;
pub mod state;
pub mod stream;
pub mod validate;

/// Re-export commonly used types for convenience.
pub mod prelude {
    pub use crate::construction::{
        CirculantSolver, FeasibilityConstructor, FeasibilitySolver, HavelHakimiSolver, RegularityModel,
    };
    pub use crate::error::{Result, SrgError};
    pub use crate::graph::{RegularGraph, parse_adjacency_matrix};
    pub use crate::moves::{SwapMove, propose_swap};
    pub use crate::portfolio::run_portfolio;
    pub use crate::score::{Score, score};
    pub use crate::search::{Annealer, Phase, SearchConfig, SearchOutcome, run_search, run_search_with};
    pub use crate::validate::validate_known_graphs;
}
