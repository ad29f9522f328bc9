//! Bitset adjacency matrix for undirected, loop-free graphs with a target degree.

use crate::error::{Result, SrgError};
use crate::moves::SwapMove;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

// ============================================================================
// Bit helpers
// ============================================================================

/// Number of `u64` words needed for a row of `n` bits.
#[inline(always)]
pub(crate) const fn word_count(n: usize) -> usize {
    n.div_ceil(64)
}

#[inline(always)]
const fn bit(v: usize) -> u64 {
    1u64 << (v % 64)
}

/// Iterator over the set bits of a multi-word bitset, lowest first.
#[derive(Clone, Debug)]
pub struct Bits<'a> {
    words: &'a [u64],
    current: u64,
    index: usize,
}

impl<'a> Bits<'a> {
    pub(crate) fn new(words: &'a [u64]) -> Self {
        Self {
            words,
            current: words.first().copied().unwrap_or(0),
            index: 0,
        }
    }
}

impl Iterator for Bits<'_> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        while self.current == 0 {
            self.index += 1;
            self.current = *self.words.get(self.index)?;
        }
        let t = self.current.trailing_zeros() as usize;
        self.current &= self.current - 1;
        Some(self.index * 64 + t)
    }
}

/// Total number of set bits.
#[inline]
pub(crate) fn count_bits(words: &[u64]) -> usize {
    words.iter().map(|w| w.count_ones() as usize).sum()
}

/// Returns the position of the `idx`-th set bit (0-based), if any.
pub(crate) fn nth_set_bit(words: impl IntoIterator<Item = u64>, mut idx: usize) -> Option<usize> {
    for (w, word) in words.into_iter().enumerate() {
        let ones = word.count_ones() as usize;
        if idx < ones {
            let mut t = word;
            for _ in 0..idx {
                t &= t - 1;
            }
            return Some(w * 64 + t.trailing_zeros() as usize);
        }
        idx -= ones;
    }
    None
}

/// Checks that a k-regular simple graph on `n` vertices can exist.
///
/// # Errors
/// `InvalidParameters` if `n == 0`, `k >= n`, or `n * k` is odd.
pub fn validate_params(n: usize, k: usize) -> Result<()> {
    if n == 0 {
        return Err(SrgError::invalid("graph must have at least one vertex"));
    }
    if k >= n {
        return Err(SrgError::invalid(format!(
            "degree k={k} must be smaller than the vertex count n={n}"
        )));
    }
    if (n * k) % 2 != 0 {
        return Err(SrgError::invalid(format!(
            "n*k = {} is odd; a {k}-regular graph on {n} vertices cannot exist",
            n * k
        )));
    }
    Ok(())
}

// ============================================================================
// RegularGraph
// ============================================================================

/// Undirected simple graph on `n` vertices with a target degree `k`.
///
/// Representation: row `v` is a bitset of `ceil(n/64)` words holding the
/// neighbors of `v`. Every write goes through [`RegularGraph::set_edge`] (or the
/// swap transaction built on it), which updates both `A[i][j]` and `A[j][i]`,
/// so the matrix is symmetric with a zero diagonal at all times.
///
/// The target degree is recorded, not enforced: a freshly created graph has no
/// edges. Use [`RegularGraph::check_regular`] to verify regularity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RegularGraph {
    n: usize,
    k: usize,
    words: usize,
    rows: Vec<u64>,
}

impl RegularGraph {
    /// Allocates an empty graph on `n` vertices with target degree `k`.
    ///
    /// # Errors
    /// `InvalidParameters` if no k-regular simple graph on `n` vertices exists.
    pub fn new(n: usize, k: usize) -> Result<Self> {
        validate_params(n, k)?;
        let words = word_count(n);
        Ok(Self {
            n,
            k,
            words,
            rows: vec![0u64; n * words],
        })
    }

    /// Builds a graph from an edge list.
    ///
    /// # Errors
    /// Fails on invalid parameters or an invalid vertex pair.
    pub fn from_edges(n: usize, k: usize, edges: &[(usize, usize)]) -> Result<Self> {
        let mut graph = Self::new(n, k)?;
        for &(i, j) in edges {
            graph.set_edge(i, j, true)?;
        }
        Ok(graph)
    }

    /// Builds a graph from a parsed 0/1 matrix.
    ///
    /// # Errors
    /// Fails if `(n, k)` is invalid for the matrix order.
    pub fn from_parsed(parsed: &ParsedAdjacencyMatrix, k: usize) -> Result<Self> {
        let mut graph = Self::new(parsed.n, k)?;
        for i in 0..parsed.n {
            for j in Bits::new(parsed.row(i)) {
                if i < j {
                    graph.write_pair(i, j, true);
                }
            }
        }
        Ok(graph)
    }

    /// Parses a 0/1 matrix and builds a graph with target degree `k`.
    ///
    /// # Errors
    /// Fails on malformed text or invalid parameters.
    pub fn parse(text: &str, k: usize) -> Result<Self> {
        let parsed = parse_adjacency_matrix(text)?;
        Self::from_parsed(&parsed, k)
    }

    /// Number of vertices.
    #[inline(always)]
    pub fn n(&self) -> usize {
        self.n
    }

    /// Target degree.
    #[inline(always)]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Neighbor bitset of vertex `v`.
    #[inline(always)]
    pub fn row(&self, v: usize) -> &[u64] {
        debug_assert!(v < self.n);
        &self.rows[v * self.words..(v + 1) * self.words]
    }

    /// Neighbors of `v` in increasing order.
    #[inline]
    pub fn neighbors(&self, v: usize) -> Bits<'_> {
        Bits::new(self.row(v))
    }

    /// Returns whether the edge `(u, v)` exists.
    #[inline(always)]
    pub fn has_edge(&self, u: usize, v: usize) -> bool {
        debug_assert!(u < self.n && v < self.n);
        self.rows[u * self.words + v / 64] & bit(v) != 0
    }

    /// Degree of `v` (row popcount).
    #[inline]
    pub fn degree(&self, v: usize) -> usize {
        count_bits(self.row(v))
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        count_bits(&self.rows) / 2
    }

    /// Number of common neighbors of `u` and `v`, i.e. `(A·A)[u][v]`.
    #[inline]
    pub fn common_neighbor_count(&self, u: usize, v: usize) -> usize {
        self.row(u)
            .iter()
            .zip(self.row(v))
            .map(|(a, b)| (a & b).count_ones() as usize)
            .sum()
    }

    /// Iterates over edges `(i, j)` with `i < j`.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.n).flat_map(move |i| self.neighbors(i).filter(move |&j| j > i).map(move |j| (i, j)))
    }

    /// Sets or clears the edge `{i, j}` (both matrix cells).
    ///
    /// # Errors
    /// `InvalidVertex` if `i == j` or either index is out of range.
    pub fn set_edge(&mut self, i: usize, j: usize, present: bool) -> Result<()> {
        if i == j || i >= self.n || j >= self.n {
            return Err(SrgError::InvalidVertex { i, j, n: self.n });
        }
        self.write_pair(i, j, present);
        Ok(())
    }

    /// Writes both cells of a pair already known to be valid.
    #[inline(always)]
    fn write_pair(&mut self, i: usize, j: usize, present: bool) {
        debug_assert!(i != j && i < self.n && j < self.n);
        let (ij, ji) = (i * self.words + j / 64, j * self.words + i / 64);
        if present {
            self.rows[ij] |= bit(j);
            self.rows[ji] |= bit(i);
        } else {
            self.rows[ij] &= !bit(j);
            self.rows[ji] &= !bit(i);
        }
    }

    /// Applies a degree-preserving swap as one transaction.
    ///
    /// All four preconditions are checked before the first write, so on error the
    /// graph is unchanged.
    ///
    /// # Errors
    /// `InvalidMove` if the swap does not apply to this graph.
    pub fn apply_swap(&mut self, mv: &SwapMove) -> Result<()> {
        mv.check(self)?;
        for (a, b, present) in mv.edits() {
            self.write_pair(a, b, present);
        }
        Ok(())
    }

    /// Returns `true` iff the matrix is symmetric, has a zero diagonal and every
    /// row sums to `k`.
    ///
    /// This is O(n²); call it from tests and periodic sanity checks, not per move.
    pub fn check_regular(&self, k: usize) -> bool {
        self.regularity_violation(k).is_none()
    }

    /// Describes the first regularity violation, if any.
    pub fn regularity_violation(&self, k: usize) -> Option<String> {
        for v in 0..self.n {
            if self.has_edge(v, v) {
                return Some(format!("self-loop at vertex {v}"));
            }
        }
        for i in 0..self.n {
            for j in (i + 1)..self.n {
                if self.has_edge(i, j) != self.has_edge(j, i) {
                    return Some(format!("matrix is not symmetric at ({i},{j})"));
                }
            }
        }
        // Padding bits past column n-1 would count towards the degree.
        if self.n % 64 != 0 {
            let pad = !((1u64 << (self.n % 64)) - 1);
            for v in 0..self.n {
                if self.row(v)[self.words - 1] & pad != 0 {
                    return Some(format!("row {v} has bits outside the matrix"));
                }
            }
        }
        (0..self.n).find_map(|v| {
            let d = self.degree(v);
            (d != k).then(|| format!("vertex {v} has degree {d}, expected {k}"))
        })
    }

    /// Dense copy of the matrix, one `Vec<u8>` per row.
    pub fn to_matrix(&self) -> Vec<Vec<u8>> {
        (0..self.n)
            .map(|i| (0..self.n).map(|j| u8::from(self.has_edge(i, j))).collect())
            .collect()
    }

    /// Writes the graph as a 0/1 adjacency matrix, one row per line.
    ///
    /// # Errors
    /// Propagates writer errors.
    pub fn write_to<W: Write>(&self, mut w: W) -> std::io::Result<()> {
        write!(w, "{self}")?;
        w.flush()
    }

    /// Saves the graph as a 0/1 adjacency matrix.
    ///
    /// # Errors
    /// Fails if the file cannot be created or written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        self.write_to(BufWriter::new(file))?;
        Ok(())
    }

    /// Loads a graph from a 0/1 adjacency-matrix file.
    ///
    /// # Errors
    /// Fails on I/O errors, malformed text or invalid parameters.
    pub fn load_from_file(path: impl AsRef<Path>, k: usize) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, k)
    }
}

impl fmt::Display for RegularGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.n {
            for j in 0..self.n {
                f.write_str(if self.has_edge(i, j) { "1" } else { "0" })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parsed adjacency matrix (0/1) representation.
#[derive(Clone, Debug)]
pub struct ParsedAdjacencyMatrix {
    /// Number of vertices (rows/cols).
    pub n: usize,
    words: usize,
    rows: Vec<u64>,
}

impl ParsedAdjacencyMatrix {
    /// Row bitset of vertex `v`.
    pub fn row(&self, v: usize) -> &[u64] {
        &self.rows[v * self.words..(v + 1) * self.words]
    }

    /// Row sum of vertex `v`.
    pub fn degree(&self, v: usize) -> usize {
        count_bits(self.row(v))
    }
}

/// Errors encountered while parsing an adjacency matrix.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum GraphParseError {
    /// No non-empty rows were found.
    #[error("adjacency matrix is empty")]
    Empty,
    /// Matrix is not square.
    #[error("adjacency matrix is not square: row {row} has length {got}, expected {expected}")]
    NonSquare {
        /// The row index with wrong length.
        row: usize,
        /// Expected length.
        expected: usize,
        /// Actual length.
        got: usize,
    },
    /// Encountered a non `0/1` character.
    #[error("invalid character at ({row}, {col}): {ch:?} (expected '0' or '1')")]
    InvalidChar {
        /// Row index.
        row: usize,
        /// Column index.
        col: usize,
        /// The invalid character.
        ch: char,
    },
    /// Diagonal contains a `1`.
    #[error("self-loop detected at vertex {vertex}")]
    SelfLoop {
        /// The vertex with a self-loop.
        vertex: usize,
    },
    /// `A[i][j] != A[j][i]`.
    #[error("matrix is not symmetric at ({i},{j}): A[i][j]={a_ij}, A[j][i]={a_ji}")]
    NotSymmetric {
        /// Row index.
        i: usize,
        /// Column index.
        j: usize,
        /// Value at A[i][j].
        a_ij: u8,
        /// Value at A[j][i].
        a_ji: u8,
    },
}

/// Parses a `0/1` adjacency matrix from text.
///
/// Rules:
/// - Blank lines are ignored, surrounding whitespace is trimmed.
/// - The matrix must be square, symmetric, and have a zero diagonal.
///
/// # Errors
/// Returns an error if the input is empty, non-square, contains invalid characters,
/// has self-loops, or is not symmetric.
pub fn parse_adjacency_matrix(text: &str) -> std::result::Result<ParsedAdjacencyMatrix, GraphParseError> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    if lines.is_empty() {
        return Err(GraphParseError::Empty);
    }
    let n = lines.len();
    let words = word_count(n);

    let mut rows = vec![0u64; n * words];
    for (i, line) in lines.iter().enumerate() {
        let bytes = line.as_bytes();
        if bytes.len() != n {
            return Err(GraphParseError::NonSquare {
                row: i,
                expected: n,
                got: bytes.len(),
            });
        }
        for (j, &b) in bytes.iter().enumerate() {
            match b {
                b'0' => {}
                b'1' => rows[i * words + j / 64] |= bit(j),
                _ => {
                    return Err(GraphParseError::InvalidChar {
                        row: i,
                        col: j,
                        ch: b as char,
                    });
                }
            }
        }
    }

    let cell = |i: usize, j: usize| u8::from(rows[i * words + j / 64] & bit(j) != 0);
    for i in 0..n {
        if cell(i, i) != 0 {
            return Err(GraphParseError::SelfLoop { vertex: i });
        }
    }
    for i in 0..n {
        for j in (i + 1)..n {
            let (a_ij, a_ji) = (cell(i, j), cell(j, i));
            if a_ij != a_ji {
                return Err(GraphParseError::NotSymmetric { i, j, a_ij, a_ji });
            }
        }
    }

    Ok(ParsedAdjacencyMatrix { n, words, rows })
}

// ============================================================================
// Tests
// ============================================================================
