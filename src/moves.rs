//! Degree-preserving 2-edge swaps, the only move the search makes.
//!
//! For vertices `u != v`, pick `f` from `N(v) − N(u) − {u}` and `r` from
//! `N(u) − N(v) − {v}`. The swap removes `(u,r)` and `(v,f)` and adds `(u,f)`
//! and `(v,r)`: each of `u, v, f, r` loses exactly one edge and gains exactly
//! one, so every degree is unchanged.

use crate::error::{Result, SrgError};
use crate::graph::{RegularGraph, nth_set_bit};
use rand::Rng;

// ============================================================================
// SwapMove
// ============================================================================

/// A 4-edge swap between `u` and `v`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SwapMove {
    /// First pivot; trades `loss` for `gain`.
    pub u: usize,
    /// Second pivot; trades `gain` for `loss`.
    pub v: usize,
    /// Former neighbor of `v` that becomes a neighbor of `u` (`f`).
    pub gain: usize,
    /// Former neighbor of `u` that becomes a neighbor of `v` (`r`).
    pub loss: usize,
}

impl SwapMove {
    /// Creates a swap.
    pub const fn new(u: usize, v: usize, gain: usize, loss: usize) -> Self {
        Self { u, v, gain, loss }
    }

    /// The exact undo: remove `(u,f)`, `(v,r)`; add `(u,r)`, `(v,f)`.
    #[inline]
    pub const fn inverse(&self) -> Self {
        Self {
            u: self.u,
            v: self.v,
            gain: self.loss,
            loss: self.gain,
        }
    }

    /// The four edge writes as `(a, b, present)`, removals first.
    #[inline]
    pub const fn edits(&self) -> [(usize, usize, bool); 4] {
        [
            (self.u, self.loss, false),
            (self.v, self.gain, false),
            (self.u, self.gain, true),
            (self.v, self.loss, true),
        ]
    }

    /// Checks every precondition of the swap against `graph` without mutating it.
    ///
    /// # Errors
    /// `InvalidMove` naming the first failed precondition.
    pub fn check(&self, graph: &RegularGraph) -> Result<()> {
        let Self { u, v, gain, loss } = *self;
        let n = graph.n();
        if u >= n || v >= n || gain >= n || loss >= n {
            return Err(SrgError::InvalidMove(format!("{self:?} has a vertex outside 0..{n}")));
        }
        if u == v || gain == loss || gain == u || gain == v || loss == u || loss == v {
            return Err(SrgError::InvalidMove(format!("{self:?} repeats a vertex")));
        }
        for (a, b, present) in self.edits() {
            // Removals need the edge, additions need its absence.
            if graph.has_edge(a, b) == present {
                let state = if present { "already present" } else { "missing" };
                return Err(SrgError::InvalidMove(format!("{self:?}: edge ({a},{b}) is {state}")));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Candidate sets
// ============================================================================

/// `N(keep) − N(drop) − {drop}`, evaluated word by word without allocating.
#[derive(Clone, Copy, Debug)]
struct Difference<'a> {
    keep: &'a [u64],
    drop: &'a [u64],
    drop_vertex: usize,
}

impl<'a> Difference<'a> {
    fn new(graph: &'a RegularGraph, keep: usize, drop: usize) -> Self {
        Self {
            keep: graph.row(keep),
            drop: graph.row(drop),
            drop_vertex: drop,
        }
    }

    #[inline(always)]
    fn word(&self, w: usize) -> u64 {
        let mut word = self.keep[w] & !self.drop[w];
        if self.drop_vertex / 64 == w {
            word &= !(1u64 << (self.drop_vertex % 64));
        }
        word
    }

    #[inline]
    fn words(self) -> impl Iterator<Item = u64> + 'a {
        (0..self.keep.len()).map(move |w| self.word(w))
    }

    #[inline]
    fn len(self) -> usize {
        self.words().map(|w| w.count_ones() as usize).sum()
    }

    #[inline]
    fn nth(self, idx: usize) -> Option<usize> {
        nth_set_bit(self.words(), idx)
    }

    fn to_vec(self) -> Vec<usize> {
        (0..self.len()).filter_map(|i| self.nth(i)).collect()
    }
}

/// Neighbors of `v` that `u` could newly connect to: `N(v) − N(u) − {u}`.
pub fn gain_set(graph: &RegularGraph, u: usize, v: usize) -> Vec<usize> {
    Difference::new(graph, v, u).to_vec()
}

/// Neighbors of `u` that could be handed to `v`: `N(u) − N(v) − {v}`.
pub fn loss_set(graph: &RegularGraph, u: usize, v: usize) -> Vec<usize> {
    Difference::new(graph, u, v).to_vec()
}

// ============================================================================
// Proposal
// ============================================================================

/// Maps a uniform 32-bit draw onto `0..len` (multiply-shift, no modulo bias worth noting).
#[inline(always)]
fn scale_pick(pick: u32, len: usize) -> usize {
    ((u64::from(pick) * len as u64) >> 32) as usize
}

/// Proposes a swap for `(u, v)` using pre-drawn picks for `f` and `r`.
///
/// Returns `None` ("no move") when `u == v` or either candidate set is empty.
/// That is an expected outcome of random pair selection, not an error.
pub fn propose_swap(
    graph: &RegularGraph,
    u: usize,
    v: usize,
    gain_pick: u32,
    loss_pick: u32,
) -> Option<SwapMove> {
    if u == v {
        return None;
    }
    let gains = Difference::new(graph, v, u);
    let losses = Difference::new(graph, u, v);
    let (gain_len, loss_len) = (gains.len(), losses.len());
    if gain_len == 0 || loss_len == 0 {
        return None;
    }
    let gain = gains.nth(scale_pick(gain_pick, gain_len))?;
    let loss = losses.nth(scale_pick(loss_pick, loss_len))?;
    Some(SwapMove { u, v, gain, loss })
}

/// Like [`propose_swap`], drawing the picks from `rng`.
pub fn propose_random_swap<R: Rng>(
    graph: &RegularGraph,
    u: usize,
    v: usize,
    rng: &mut R,
) -> Option<SwapMove> {
    propose_swap(graph, u, v, rng.random(), rng.random())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::construction::{CirculantSolver, FeasibilityConstructor};
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    fn circulant(n: usize, k: usize) -> RegularGraph {
        FeasibilityConstructor::new(CirculantSolver).construct(n, k).unwrap()
    }

    #[test]
    fn candidate_sets_follow_definition() {
        // C6: N(0) = {1,5}, N(2) = {1,3}.
        let g = circulant(6, 2);
        assert_eq!(gain_set(&g, 0, 2), vec![3]);
        assert_eq!(loss_set(&g, 0, 2), vec![5]);
        // Adjacent pivots never hand themselves over.
        assert_eq!(gain_set(&g, 0, 1), vec![2]);
        assert_eq!(loss_set(&g, 0, 1), vec![5]);
    }

    #[test]
    fn swap_preserves_degrees_and_symmetry() {
        let mut g = circulant(9, 4);
        let mv = propose_swap(&g, 0, 4, 0, 0).expect("C9(1,2) has a swap for (0,4)");
        g.apply_swap(&mv).unwrap();
        assert!(g.check_regular(4));
        assert!(g.has_edge(mv.u, mv.gain));
        assert!(g.has_edge(mv.v, mv.loss));
        assert!(!g.has_edge(mv.u, mv.loss));
        assert!(!g.has_edge(mv.v, mv.gain));
    }

    #[test]
    fn inverse_restores_graph() {
        let mut rng = XorShiftRng::seed_from_u64(0xBEEF);
        let mut g = circulant(20, 6);
        for _ in 0..500 {
            let u = rng.random_range(0..20);
            let v = rng.random_range(0..20);
            let Some(mv) = propose_random_swap(&g, u, v, &mut rng) else {
                continue;
            };
            let before = g.clone();
            g.apply_swap(&mv).unwrap();
            assert!(g.check_regular(6));
            assert_ne!(g, before);
            g.apply_swap(&mv.inverse()).unwrap();
            assert_eq!(g, before);
            // Walk on so later iterations start from different graphs.
            g.apply_swap(&mv).unwrap();
        }
    }

    #[test]
    fn empty_gain_set_is_no_move() {
        // Two disjoint triangles: 0 and 1 share every other neighbor, so
        // N(1) − N(0) − {0} is empty.
        let g = RegularGraph::from_edges(6, 2, &[(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3)])
            .unwrap();
        assert!(gain_set(&g, 0, 1).is_empty());
        let before = g.clone();
        assert_eq!(propose_swap(&g, 0, 1, 123, 456), None);
        assert_eq!(g, before);
    }

    #[test]
    fn same_vertex_is_no_move() {
        let g = circulant(9, 4);
        assert_eq!(propose_swap(&g, 3, 3, 0, 0), None);
    }

    #[test]
    fn invalid_swap_leaves_graph_untouched() {
        let mut g = circulant(9, 4);
        let before = g.clone();
        // (0,1) is an edge, so adding it as a gain must fail.
        let mv = SwapMove::new(0, 5, 1, 2);
        assert!(matches!(g.apply_swap(&mv), Err(SrgError::InvalidMove(_))));
        assert_eq!(g, before);

        let repeated = SwapMove::new(0, 0, 3, 4);
        assert!(matches!(g.apply_swap(&repeated), Err(SrgError::InvalidMove(_))));
        let outside = SwapMove::new(0, 1, 9, 4);
        assert!(matches!(g.apply_swap(&outside), Err(SrgError::InvalidMove(_))));
        assert_eq!(g, before);
    }

    #[test]
    fn picks_cover_every_candidate() {
        let g = circulant(13, 4);
        let gains = gain_set(&g, 0, 6);
        let mut seen = std::collections::BTreeSet::new();
        for pick in (0..=u32::MAX).step_by(1 << 20) {
            if let Some(mv) = propose_swap(&g, 0, 6, pick, 0) {
                seen.insert(mv.gain);
            }
        }
        assert_eq!(seen.into_iter().collect::<Vec<_>>(), gains);
    }

    #[test]
    fn scale_pick_stays_in_range() {
        for len in 1..50 {
            assert_eq!(scale_pick(0, len), 0);
            assert_eq!(scale_pick(u32::MAX, len), len - 1);
        }
    }
}
