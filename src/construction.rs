//! Feasibility construction of k-regular starting graphs.
//!
//! The constructor states the problem as a binary model (one variable per
//! unordered vertex pair, one degree equality per vertex), hands it to a
//! [`FeasibilitySolver`], and decodes the returned assignment. Decoding never
//! trusts the solver: values are rounded against a tolerance and the resulting
//! graph is re-checked for regularity before it is returned.

use crate::error::{Result, SrgError};
use crate::graph::{RegularGraph, validate_params};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

/// Largest distance from 0 or 1 a solver value may have and still be read as binary.
pub const ROUNDING_TOLERANCE: f64 = 1e-6;

// ============================================================================
// Model
// ============================================================================

/// Equality constraint `sum(variables) == rhs` for one vertex.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DegreeConstraint {
    /// The vertex whose degree is constrained.
    pub vertex: usize,
    /// Indices of the pair variables incident to `vertex`.
    pub variables: Vec<usize>,
    /// Required degree.
    pub rhs: usize,
}

/// Binary feasibility model for a k-regular simple graph on `n` vertices.
///
/// Variable `x_{a,b}` (`a < b`) is 1 iff the edge `{a,b}` is present. Working
/// on unordered pairs makes symmetry structural and the diagonal absent.
#[derive(Clone, Debug)]
pub struct RegularityModel {
    n: usize,
    k: usize,
    variables: Vec<(usize, usize)>,
    constraints: Vec<DegreeConstraint>,
}

impl RegularityModel {
    /// Builds the model.
    ///
    /// # Errors
    /// `InvalidParameters` if no k-regular graph on `n` vertices can exist.
    pub fn new(n: usize, k: usize) -> Result<Self> {
        validate_params(n, k)?;
        let mut variables = Vec::with_capacity(n * (n - 1) / 2);
        let mut constraints: Vec<DegreeConstraint> = (0..n)
            .map(|vertex| DegreeConstraint {
                vertex,
                variables: Vec::with_capacity(n - 1),
                rhs: k,
            })
            .collect();
        for a in 0..n {
            for b in (a + 1)..n {
                let idx = variables.len();
                variables.push((a, b));
                constraints[a].variables.push(idx);
                constraints[b].variables.push(idx);
            }
        }
        Ok(Self {
            n,
            k,
            variables,
            constraints,
        })
    }

    /// Number of vertices.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Target degree.
    pub fn k(&self) -> usize {
        self.k
    }

    /// The pair `(a, b)` behind each variable, `a < b`, in index order.
    pub fn variables(&self) -> &[(usize, usize)] {
        &self.variables
    }

    /// One degree constraint per vertex.
    pub fn constraints(&self) -> &[DegreeConstraint] {
        &self.constraints
    }

    /// Required degree of every vertex, indexed by vertex.
    pub fn target_degrees(&self) -> Vec<usize> {
        self.constraints.iter().map(|c| c.rhs).collect()
    }

    /// Index of the variable for pair `{a, b}` (either order).
    pub fn variable_index(&self, a: usize, b: usize) -> Option<usize> {
        let (a, b) = (a.min(b), a.max(b));
        if a == b || b >= self.n {
            return None;
        }
        // Row a of the upper triangle starts after (n-1) + (n-2) + ... + (n-a) entries.
        Some(a * self.n - a * (a + 1) / 2 + (b - a - 1))
    }

    /// Whether a 0/1 assignment satisfies every constraint.
    pub fn is_satisfied_by(&self, values: &[bool]) -> bool {
        values.len() == self.variables.len()
            && self
                .constraints
                .iter()
                .all(|c| c.variables.iter().filter(|&&i| values[i]).count() == c.rhs)
    }

    /// Translates a solver assignment into a graph, verifying it on the way.
    ///
    /// # Errors
    /// `ConstructionInvariantViolated` if the assignment has the wrong length,
    /// holds a value that is not within [`ROUNDING_TOLERANCE`] of 0 or 1, or
    /// decodes to a graph that is not k-regular.
    pub fn decode(&self, assignment: &Assignment) -> Result<RegularGraph> {
        let values = assignment.values();
        if values.len() != self.variables.len() {
            return Err(SrgError::construction(format!(
                "assignment has {} values for {} variables",
                values.len(),
                self.variables.len()
            )));
        }

        let mut graph = RegularGraph::new(self.n, self.k)?;
        for (&(a, b), &value) in self.variables.iter().zip(values) {
            if !value.is_finite() {
                return Err(SrgError::construction(format!(
                    "variable ({a},{b}) has non-finite value {value}"
                )));
            }
            let rounded = value.round();
            if (value - rounded).abs() > ROUNDING_TOLERANCE || !(0.0..=1.0).contains(&rounded) {
                return Err(SrgError::construction(format!(
                    "variable ({a},{b}) has non-binary value {value}"
                )));
            }
            if rounded > 0.5 {
                graph.set_edge(a, b, true)?;
            }
        }

        if let Some(detail) = graph.regularity_violation(self.k) {
            return Err(SrgError::construction(detail));
        }
        Ok(graph)
    }
}

/// A solver's answer: one value per model variable, as reported by the engine.
#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    values: Vec<f64>,
}

impl Assignment {
    /// Wraps raw solver values.
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// An all-zero assignment for `model`.
    pub fn zeros(model: &RegularityModel) -> Self {
        Self::new(vec![0.0; model.variables().len()])
    }

    /// Sets the variable for pair `{a, b}` to 1. Returns `false` if the pair is invalid.
    pub fn select(&mut self, model: &RegularityModel, a: usize, b: usize) -> bool {
        match model.variable_index(a, b) {
            Some(idx) => {
                self.values[idx] = 1.0;
                true
            }
            None => false,
        }
    }

    /// Raw values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

// ============================================================================
// Solvers
// ============================================================================

/// Something that can find a feasible assignment for a [`RegularityModel`].
pub trait FeasibilitySolver {
    /// Short name for logs and errors.
    fn name(&self) -> &'static str;

    /// Solves the model.
    ///
    /// # Errors
    /// `Infeasible` if no assignment exists, `SolverExhausted` if the solver
    /// gave up without deciding.
    fn solve(&self, model: &RegularityModel) -> Result<Assignment>;
}

impl<S: FeasibilitySolver + ?Sized> FeasibilitySolver for &S {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn solve(&self, model: &RegularityModel) -> Result<Assignment> {
        (**self).solve(model)
    }
}

impl<S: FeasibilitySolver + ?Sized> FeasibilitySolver for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn solve(&self, model: &RegularityModel) -> Result<Assignment> {
        (**self).solve(model)
    }
}

/// Deterministic circulant construction.
///
/// Vertex `i` is joined to `i ± d (mod n)` for `d = 1..=k/2`; when `k` is odd
/// (so `n` is even) it is also joined to the antipode `i + n/2`.
#[derive(Clone, Copy, Debug, Default)]
pub struct CirculantSolver;

impl FeasibilitySolver for CirculantSolver {
    fn name(&self) -> &'static str {
        "circulant"
    }

    fn solve(&self, model: &RegularityModel) -> Result<Assignment> {
        let (n, k) = (model.n(), model.k());
        let mut offsets: Vec<usize> = (1..=k / 2).collect();
        if k % 2 == 1 {
            offsets.push(n / 2);
        }

        let mut assignment = Assignment::zeros(model);
        for i in 0..n {
            for &d in &offsets {
                if !assignment.select(model, i, (i + d) % n) {
                    return Err(SrgError::SolverExhausted {
                        solver: self.name(),
                        detail: format!("offset {d} is degenerate for n={n}"),
                    });
                }
            }
        }
        Ok(assignment)
    }
}

/// Exact constructive solver based on the Havel–Hakimi lay-off.
///
/// Vertices are laid off one at a time; each is joined to the remaining vertices
/// with the largest residual degree. This succeeds whenever the degree sequence
/// is graphical and proves infeasibility otherwise. With a seed, both the lay-off
/// order and tie-breaking are shuffled, giving varied starting graphs.
#[derive(Clone, Copy, Debug, Default)]
pub struct HavelHakimiSolver {
    seed: Option<u64>,
}

impl HavelHakimiSolver {
    /// Deterministic lay-off in vertex order.
    pub fn new() -> Self {
        Self { seed: None }
    }

    /// Randomized lay-off order and tie-breaking.
    pub fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }
}

impl FeasibilitySolver for HavelHakimiSolver {
    fn name(&self) -> &'static str {
        "havel-hakimi"
    }

    fn solve(&self, model: &RegularityModel) -> Result<Assignment> {
        let degrees = model.target_degrees();
        let mut order: Vec<usize> = (0..model.n()).collect();
        if let Some(seed) = self.seed {
            order.shuffle(&mut SmallRng::seed_from_u64(seed));
        }

        let edges = lay_off(&degrees, &order).map_err(|reason| SrgError::Infeasible {
            n: model.n(),
            k: model.k(),
            reason,
        })?;

        let mut assignment = Assignment::zeros(model);
        for (a, b) in edges {
            assignment.select(model, a, b);
        }
        Ok(assignment)
    }
}

/// Realizes `degrees` by laying off vertices in `order`.
///
/// Ties in residual degree are broken by position in `order`.
fn lay_off(degrees: &[usize], order: &[usize]) -> std::result::Result<Vec<(usize, usize)>, String> {
    let mut residual = degrees.to_vec();
    let mut edges = Vec::with_capacity(degrees.iter().sum::<usize>() / 2);
    let mut pending: Vec<usize> = order.to_vec();

    while let Some(v) = pending.first().copied() {
        pending.remove(0);
        let d = residual[v];
        residual[v] = 0;
        if d == 0 {
            continue;
        }
        // Stable sort keeps the shuffled order among equal residuals.
        pending.sort_by(|&x, &y| residual[y].cmp(&residual[x]));
        if pending.len() < d || residual[pending[d - 1]] == 0 {
            return Err(format!(
                "vertex {v} needs {d} more neighbors but only {} vertices have spare degree",
                pending.iter().filter(|&&w| residual[w] > 0).count()
            ));
        }
        for &w in &pending[..d] {
            residual[w] -= 1;
            edges.push((v.min(w), v.max(w)));
        }
    }
    Ok(edges)
}

// ============================================================================
// Constructor
// ============================================================================

/// Builds k-regular starting graphs with a solver handle.
#[derive(Clone, Debug, Default)]
pub struct FeasibilityConstructor<S> {
    solver: S,
}

impl<S: FeasibilitySolver> FeasibilityConstructor<S> {
    /// Wraps a solver.
    pub fn new(solver: S) -> Self {
        Self { solver }
    }

    /// The solver handle.
    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Produces a graph that passes `check_regular(k)`.
    ///
    /// # Errors
    /// `InvalidParameters` for impossible `(n, k)`; solver errors are propagated
    /// unchanged; `ConstructionInvariantViolated` if the solver's answer does
    /// not decode to a k-regular graph.
    pub fn construct(&self, n: usize, k: usize) -> Result<RegularGraph> {
        let model = RegularityModel::new(n, k)?;
        log::debug!(
            "solving regularity model: n={n} k={k} variables={} solver={}",
            model.variables().len(),
            self.solver.name()
        );
        let assignment = self.solver.solve(&model)?;
        let graph = model.decode(&assignment)?;
        log::debug!("constructed {k}-regular graph on {n} vertices ({} edges)", graph.edge_count());
        Ok(graph)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedAnswer(Assignment);

    impl FeasibilitySolver for FixedAnswer {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn solve(&self, _model: &RegularityModel) -> Result<Assignment> {
            Ok(self.0.clone())
        }
    }

    struct AlwaysInfeasible;

    impl FeasibilitySolver for AlwaysInfeasible {
        fn name(&self) -> &'static str {
            "never"
        }

        fn solve(&self, model: &RegularityModel) -> Result<Assignment> {
            Err(SrgError::Infeasible {
                n: model.n(),
                k: model.k(),
                reason: "mock".into(),
            })
        }
    }

    fn circulant_values(n: usize, k: usize) -> Vec<f64> {
        let model = RegularityModel::new(n, k).unwrap();
        CirculantSolver.solve(&model).unwrap().values().to_vec()
    }

    // -------------------------------------------------------------------------
    // Model
    // -------------------------------------------------------------------------

    #[test]
    fn model_has_one_variable_per_unordered_pair() {
        let model = RegularityModel::new(6, 3).unwrap();
        assert_eq!(model.variables().len(), 15);
        assert_eq!(model.constraints().len(), 6);
        for c in model.constraints() {
            assert_eq!(c.variables.len(), 5);
            assert_eq!(c.rhs, 3);
        }
        for (idx, &(a, b)) in model.variables().iter().enumerate() {
            assert!(a < b);
            assert_eq!(model.variable_index(a, b), Some(idx));
            assert_eq!(model.variable_index(b, a), Some(idx));
        }
        assert_eq!(model.variable_index(2, 2), None);
        assert_eq!(model.variable_index(0, 6), None);
    }

    #[test]
    fn model_rejects_impossible_parameters() {
        assert!(matches!(RegularityModel::new(7, 3), Err(SrgError::InvalidParameters(_))));
        assert!(matches!(RegularityModel::new(4, 4), Err(SrgError::InvalidParameters(_))));
        assert!(matches!(RegularityModel::new(0, 0), Err(SrgError::InvalidParameters(_))));
    }

    #[test]
    fn model_checks_binary_assignments() {
        let model = RegularityModel::new(4, 2).unwrap();
        let mut values = vec![false; 6];
        for (a, b) in [(0, 1), (1, 2), (2, 3), (0, 3)] {
            values[model.variable_index(a, b).unwrap()] = true;
        }
        assert!(model.is_satisfied_by(&values));
        values[model.variable_index(0, 2).unwrap()] = true;
        assert!(!model.is_satisfied_by(&values));
    }

    // -------------------------------------------------------------------------
    // Solvers
    // -------------------------------------------------------------------------

    #[test]
    fn nine_four_rows_and_columns_sum_to_four() {
        for graph in [
            FeasibilityConstructor::new(CirculantSolver).construct(9, 4).unwrap(),
            FeasibilityConstructor::new(HavelHakimiSolver::seeded(42)).construct(9, 4).unwrap(),
        ] {
            let m = graph.to_matrix();
            for i in 0..9 {
                let row: usize = m[i].iter().map(|&x| usize::from(x)).sum();
                let col: usize = (0..9).map(|r| usize::from(m[r][i])).sum();
                assert_eq!(row, 4);
                assert_eq!(col, 4);
            }
            let diagonal: usize = (0..9).map(|i| usize::from(m[i][i])).sum();
            assert_eq!(diagonal, 0);
        }
    }

    #[test]
    fn solvers_cover_parameter_grid() {
        let hh = FeasibilityConstructor::new(HavelHakimiSolver::seeded(1));
        let circ = FeasibilityConstructor::new(CirculantSolver);
        for n in 1..=24 {
            for k in 0..n {
                if (n * k) % 2 != 0 {
                    continue;
                }
                let g = circ.construct(n, k).unwrap_or_else(|e| panic!("circulant ({n},{k}): {e}"));
                assert!(g.check_regular(k));
                let g = hh.construct(n, k).unwrap_or_else(|e| panic!("havel-hakimi ({n},{k}): {e}"));
                assert!(g.check_regular(k));
            }
        }
    }

    #[test]
    fn conway_parameters_construct() {
        let g = FeasibilityConstructor::new(HavelHakimiSolver::seeded(99))
            .construct(99, 14)
            .unwrap();
        assert!(g.check_regular(14));
        assert_eq!(g.edge_count(), 99 * 14 / 2);
    }

    #[test]
    fn seeded_havel_hakimi_varies() {
        let graphs: std::collections::HashSet<_> = (0..10)
            .map(|seed| {
                FeasibilityConstructor::new(HavelHakimiSolver::seeded(seed))
                    .construct(12, 4)
                    .unwrap()
            })
            .collect();
        assert!(graphs.len() > 1);
        let a = FeasibilityConstructor::new(HavelHakimiSolver::seeded(5)).construct(12, 4).unwrap();
        let b = FeasibilityConstructor::new(HavelHakimiSolver::seeded(5)).construct(12, 4).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn lay_off_detects_non_graphical_sequences() {
        // Two vertices of degree 3 need two more partners than the others can give.
        let err = lay_off(&[3, 3, 1, 1], &[0, 1, 2, 3]).unwrap_err();
        assert!(err.contains("spare degree"), "{err}");
        assert!(lay_off(&[2, 2, 2, 2], &[3, 1, 0, 2]).is_ok());
    }

    // -------------------------------------------------------------------------
    // Decode / constructor
    // -------------------------------------------------------------------------

    #[test]
    fn decode_tolerates_float_noise() {
        let noisy: Vec<f64> = circulant_values(9, 4)
            .into_iter()
            .map(|v| if v > 0.5 { 1.0 - 1e-9 } else { 1e-9 })
            .collect();
        let g = FeasibilityConstructor::new(FixedAnswer(Assignment::new(noisy)))
            .construct(9, 4)
            .unwrap();
        assert!(g.check_regular(4));
    }

    #[test]
    fn decode_rejects_fractional_values() {
        let mut values = circulant_values(9, 4);
        values[0] = 0.5;
        let err = FeasibilityConstructor::new(FixedAnswer(Assignment::new(values)))
            .construct(9, 4)
            .unwrap_err();
        assert!(matches!(err, SrgError::ConstructionInvariantViolated(_)), "{err}");

        let mut values = circulant_values(9, 4);
        values[3] = f64::NAN;
        let err = FeasibilityConstructor::new(FixedAnswer(Assignment::new(values)))
            .construct(9, 4)
            .unwrap_err();
        assert!(matches!(err, SrgError::ConstructionInvariantViolated(_)));

        let mut values = circulant_values(9, 4);
        values[3] = 2.0;
        let err = FeasibilityConstructor::new(FixedAnswer(Assignment::new(values)))
            .construct(9, 4)
            .unwrap_err();
        assert!(matches!(err, SrgError::ConstructionInvariantViolated(_)));
    }

    #[test]
    fn decode_rejects_wrong_degrees_and_length() {
        let mut values = circulant_values(9, 4);
        let idx = values.iter().position(|&v| v == 0.0).unwrap();
        values[idx] = 1.0;
        let err = FeasibilityConstructor::new(FixedAnswer(Assignment::new(values)))
            .construct(9, 4)
            .unwrap_err();
        assert!(err.to_string().contains("degree 5"), "{err}");

        let err = FeasibilityConstructor::new(FixedAnswer(Assignment::new(vec![1.0; 3])))
            .construct(9, 4)
            .unwrap_err();
        assert!(matches!(err, SrgError::ConstructionInvariantViolated(_)));
    }

    #[test]
    fn infeasible_is_propagated() {
        let err = FeasibilityConstructor::new(AlwaysInfeasible).construct(9, 4).unwrap_err();
        assert!(matches!(err, SrgError::Infeasible { n: 9, k: 4, .. }));
    }

    #[test]
    fn solver_handles_are_passed_by_reference_or_box() {
        let solver = CirculantSolver;
        assert!(FeasibilityConstructor::new(&solver).construct(10, 3).is_ok());
        let boxed: Box<dyn FeasibilitySolver> = Box::new(HavelHakimiSolver::new());
        let constructor = FeasibilityConstructor::new(boxed);
        assert_eq!(constructor.solver().name(), "havel-hakimi");
        assert!(constructor.construct(10, 3).unwrap().check_regular(3));
    }
}
