//! Structural score: how many vertex pairs already look strongly regular.
//!
//! For `B = A·A`, an adjacent pair `{i,j}` is a *triangle* pair when
//! `B[i][j] == LAMBDA` and a non-adjacent pair is a *square* pair when
//! `B[i][j] == MU`. Every other pair is a defect.

use crate::graph::RegularGraph;

/// Required common-neighbor count for adjacent pairs.
pub const LAMBDA: usize = 1;

/// Required common-neighbor count for non-adjacent pairs.
pub const MU: usize = 2;

/// Number of unordered vertex pairs, `n(n-1)/2`.
#[inline(always)]
pub const fn pair_count(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// How a single unordered pair contributes to the score.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PairClass {
    /// Adjacent with exactly `LAMBDA` common neighbors.
    Triangle,
    /// Non-adjacent with exactly `MU` common neighbors.
    Square,
    /// Anything else.
    Defect,
}

/// Classifies a pair from its adjacency and common-neighbor count.
#[inline(always)]
pub const fn classify_pair(adjacent: bool, common: usize) -> PairClass {
    match (adjacent, common) {
        (true, LAMBDA) => PairClass::Triangle,
        (false, MU) => PairClass::Square,
        _ => PairClass::Defect,
    }
}

/// `(triangles, squares)` pair counts for a graph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Score {
    /// Adjacent pairs with exactly `LAMBDA` common neighbors.
    pub triangles: usize,
    /// Non-adjacent pairs with exactly `MU` common neighbors.
    pub squares: usize,
}

impl Score {
    /// Pairs that already satisfy their constraint.
    #[inline(always)]
    pub const fn satisfied(&self) -> usize {
        self.triangles + self.squares
    }

    /// Pairs that violate their constraint on an `n`-vertex graph.
    #[inline(always)]
    pub const fn defects(&self, n: usize) -> usize {
        pair_count(n) - self.satisfied()
    }

    /// Search cost `C − (triangles + squares)` with `C = n(n-1)/2`.
    ///
    /// Equal to the defect count, so a true SRG has cost 0.
    #[inline(always)]
    pub const fn cost(&self, n: usize) -> usize {
        self.defects(n)
    }

    /// `true` if every pair satisfies its constraint.
    #[inline]
    pub const fn is_perfect(&self, n: usize) -> bool {
        self.defects(n) == 0
    }

    /// As a plain tuple.
    #[inline]
    pub const fn as_tuple(&self) -> (usize, usize) {
        (self.triangles, self.squares)
    }

    #[inline(always)]
    pub(crate) fn add(&mut self, class: PairClass) {
        match class {
            PairClass::Triangle => self.triangles += 1,
            PairClass::Square => self.squares += 1,
            PairClass::Defect => {}
        }
    }

    #[inline(always)]
    pub(crate) fn remove(&mut self, class: PairClass) {
        match class {
            PairClass::Triangle => self.triangles -= 1,
            PairClass::Square => self.squares -= 1,
            PairClass::Defect => {}
        }
    }
}

/// Computes the score from scratch.
///
/// Walks the upper triangle of `A·A` with one popcount per word; the diagonal
/// (vertex degrees) is excluded. A pure function of the matrix.
pub fn score(graph: &RegularGraph) -> Score {
    let n = graph.n();
    let mut out = Score::default();
    for i in 0..n {
        for j in (i + 1)..n {
            out.add(classify_pair(graph.has_edge(i, j), graph.common_neighbor_count(i, j)));
        }
    }
    out
}

/// The full common-neighbor matrix `B = A·A`, row-major, `n * n` entries.
///
/// `B[v][v]` is the degree of `v`.
pub fn common_neighbor_matrix(graph: &RegularGraph) -> Vec<u32> {
    let n = graph.n();
    let mut out = vec![0u32; n * n];
    for i in 0..n {
        out[i * n + i] = graph.degree(i) as u32;
        for j in (i + 1)..n {
            let c = graph.common_neighbor_count(i, j) as u32;
            out[i * n + j] = c;
            out[j * n + i] = c;
        }
    }
    out
}
