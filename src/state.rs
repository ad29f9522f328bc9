//! Search state with incremental common-neighbor bookkeeping.
//!
//! Rescoring from scratch costs O(n³/64) per move. Toggling one edge `(a,b)`
//! only changes `B[a][w]` for `w ∈ N(b)` and `B[b][w]` for `w ∈ N(a)`, plus the
//! class of the pair `{a,b}` itself, so a swap is rescored in O(k) pair updates.
//! [`crate::score::score`] stays the oracle for periodic cross-checks.

use crate::error::Result;
use crate::graph::RegularGraph;
use crate::moves::SwapMove;
use crate::score::{self, Score, classify_pair};

/// A graph plus its common-neighbor matrix and score, kept in sync on every swap.
#[derive(Clone, Debug)]
pub struct SearchState {
    graph: RegularGraph,
    /// Row-major `B = A·A`; the diagonal holds degrees.
    common: Vec<u32>,
    score: Score,
}

impl SearchState {
    /// Wraps a graph, computing the bookkeeping from scratch.
    pub fn new(graph: RegularGraph) -> Self {
        let common = score::common_neighbor_matrix(&graph);
        let score = score::score(&graph);
        Self {
            graph,
            common,
            score,
        }
    }

    /// The current graph.
    #[inline(always)]
    pub fn graph(&self) -> &RegularGraph {
        &self.graph
    }

    /// Gives up the bookkeeping and returns the graph.
    pub fn into_graph(self) -> RegularGraph {
        self.graph
    }

    /// Incrementally maintained score.
    #[inline(always)]
    pub fn score(&self) -> Score {
        self.score
    }

    /// Incrementally maintained cost (defect count).
    #[inline(always)]
    pub fn cost(&self) -> usize {
        self.score.cost(self.graph.n())
    }

    /// Tracked `B[u][v]`.
    #[inline(always)]
    pub fn common_neighbor_count(&self, u: usize, v: usize) -> usize {
        let n = self.graph.n();
        self.common[u * n + v] as usize
    }

    /// Recomputes the score from the matrix, ignoring the bookkeeping.
    pub fn recompute_score(&self) -> Score {
        score::score(&self.graph)
    }

    /// Applies a swap atomically and updates the bookkeeping.
    ///
    /// The swap is validated before anything changes, so on error neither the
    /// graph nor the score moves.
    ///
    /// # Errors
    /// `InvalidMove` if the swap does not apply to the current graph.
    pub fn apply_swap(&mut self, mv: &SwapMove) -> Result<()> {
        mv.check(&self.graph)?;
        for (a, b, present) in mv.edits() {
            self.toggle(a, b, present)?;
        }
        Ok(())
    }

    /// Writes edge `{a,b}` (which must currently be `!present`) and patches
    /// `common` and `score`.
    fn toggle(&mut self, a: usize, b: usize, present: bool) -> Result<()> {
        let n = self.graph.n();
        debug_assert_ne!(self.graph.has_edge(a, b), present);

        // The pair itself only changes adjacency; B[a][b] is unaffected.
        let ab = self.common[a * n + b] as usize;
        self.score.remove(classify_pair(!present, ab));
        self.score.add(classify_pair(present, ab));

        // b enters or leaves N(a): every w ∈ N(b) \ {a} gains or loses b as a
        // common neighbor with a, and symmetrically for N(a) \ {b}. Neither
        // set contains the other endpoint while (a,b) is absent, and we skip it
        // explicitly while it is present.
        for (x, y) in [(a, b), (b, a)] {
            for w in self.graph.neighbors(y) {
                if w == x {
                    continue;
                }
                let idx = x * n + w;
                let old = self.common[idx];
                let new = if present { old + 1 } else { old - 1 };
                let adjacent = self.graph.has_edge(x, w);
                self.score.remove(classify_pair(adjacent, old as usize));
                self.score.add(classify_pair(adjacent, new as usize));
                self.common[idx] = new;
                self.common[w * n + x] = new;
            }
        }

        let delta: i32 = if present { 1 } else { -1 };
        for v in [a, b] {
            let d = &mut self.common[v * n + v];
            *d = d.saturating_add_signed(delta);
        }

        self.graph.set_edge(a, b, present)
    }

    #[cfg(test)]
    fn recompute_common_for_test(&self) -> Vec<u32> {
        score::common_neighbor_matrix(&self.graph)
    }
}
