//! Simulated-annealing driver over degree-preserving swaps.

use crate::construction::{FeasibilityConstructor, FeasibilitySolver, HavelHakimiSolver};
use crate::error::{Result, SrgError};
use crate::graph::{RegularGraph, validate_params};
use crate::moves::propose_swap;
use crate::score::Score;
use crate::state::SearchState;
use crate::stream::{Draw, RandomStream, entropy_seed, splitmix64};

// ============================================================================
// Configuration
// ============================================================================

/// Iterations between full regularity and score cross-checks.
pub const SANITY_CHECK_EVERY: u64 = 1024;

/// Search configuration parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchConfig {
    /// Number of vertices.
    pub n: usize,
    /// Target degree.
    pub k: usize,
    /// Iteration budget; skipped and infeasible draws count towards it.
    pub iterations: u64,
    /// Starting temperature.
    pub temperature: f64,
    /// Per-iteration multiplicative decay (`1.0` keeps the temperature constant).
    pub alpha: f64,
    /// Optional deterministic seed. `None` draws one from OS entropy.
    pub seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            n: 9,
            k: 4,
            iterations: 100_000,
            temperature: 10.0,
            alpha: 0.9999,
            seed: None,
        }
    }
}

impl SearchConfig {
    /// Sets the vertex count.
    pub fn with_n(mut self, n: usize) -> Self {
        self.n = n;
        self
    }

    /// Sets the target degree.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Sets the iteration budget.
    pub fn with_iterations(mut self, iterations: u64) -> Self {
        self.iterations = iterations;
        self
    }

    /// Sets the starting temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the decay factor.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Fixes the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Checks every parameter.
    ///
    /// # Errors
    /// `InvalidParameters` naming the first bad value.
    pub fn validate(&self) -> Result<()> {
        validate_params(self.n, self.k)?;
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(SrgError::invalid(format!(
                "temperature must be finite and non-negative, got {}",
                self.temperature
            )));
        }
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(SrgError::invalid(format!(
                "alpha must lie in (0, 1], got {}",
                self.alpha
            )));
        }
        if usize::try_from(self.iterations).is_err() {
            return Err(SrgError::invalid(format!(
                "iteration budget {} does not fit in memory",
                self.iterations
            )));
        }
        Ok(())
    }

    /// The configured seed, or a fresh one from OS entropy (logged so the run can be replayed).
    pub fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| {
            let seed = entropy_seed();
            log::warn!("no seed configured; drew {seed} from OS entropy");
            seed
        })
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Where a run is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Budget remaining, no perfect graph seen yet.
    Running,
    /// A zero-cost graph is in hand; iteration continues until the budget is spent.
    Converged,
    /// Budget exhausted.
    Terminated,
}

/// Per-run counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Iterations consumed.
    pub iterations: u64,
    /// Draws with `u == v`.
    pub skipped: u64,
    /// Draws whose gain or loss set was empty.
    pub infeasible: u64,
    /// Accepted moves that lowered the cost.
    pub accepted_improving: u64,
    /// Accepted moves that kept the cost.
    pub accepted_sideways: u64,
    /// Accepted moves that raised the cost.
    pub accepted_uphill: u64,
    /// Moves undone by the Metropolis test.
    pub rejected: u64,
    /// Times the best cost went down.
    pub improvements: u64,
    /// Full cross-checks performed.
    pub sanity_checks: u64,
}

impl SearchStats {
    /// All accepted moves.
    pub fn accepted(&self) -> u64 {
        self.accepted_improving + self.accepted_sideways + self.accepted_uphill
    }
}

/// What a finished run hands back.
#[derive(Clone, Debug)]
pub struct SearchOutcome {
    /// Lowest-cost graph seen.
    pub best_graph: RegularGraph,
    /// Score of `best_graph`.
    pub best_score: Score,
    /// Cost of `best_graph`; 0 means a strongly regular graph.
    pub best_cost: usize,
    /// Temperature after the last iteration.
    pub final_temperature: f64,
    /// Iteration at which cost 0 was first reached.
    pub converged_at: Option<u64>,
    /// Seed the run's stream was generated from.
    pub seed: u64,
    /// Counters.
    pub stats: SearchStats,
}

impl SearchOutcome {
    /// `true` if the best graph has no defects.
    pub fn is_perfect(&self) -> bool {
        self.best_cost == 0
    }
}

// ============================================================================
// Annealer
// ============================================================================

/// Metropolis rule: non-worsening moves always pass; a worsening move passes
/// iff `threshold < exp((current - new) / temperature)`.
#[inline]
pub fn accept_move(current: usize, new: usize, temperature: f64, threshold: f64) -> bool {
    if new <= current {
        return true;
    }
    if temperature <= 0.0 {
        return false;
    }
    let prob = (-((new - current) as f64) / temperature).exp();
    threshold < prob
}

/// One annealing run, driven a step at a time or to completion.
#[derive(Clone, Debug)]
pub struct Annealer {
    state: SearchState,
    stream: RandomStream,
    k: usize,
    budget: u64,
    iteration: u64,
    temperature: f64,
    alpha: f64,
    best_graph: RegularGraph,
    best_score: Score,
    best_cost: usize,
    phase: Phase,
    converged_at: Option<u64>,
    stats: SearchStats,
}

impl Annealer {
    /// Prepares a run from `initial`.
    ///
    /// # Errors
    /// `InvalidParameters` for a bad config or a graph of the wrong shape;
    /// `RegularityInvariantViolated` (iteration 0) if `initial` is not k-regular.
    pub fn new(initial: RegularGraph, cfg: &SearchConfig) -> Result<Self> {
        cfg.validate()?;
        if initial.n() != cfg.n || initial.k() != cfg.k {
            return Err(SrgError::invalid(format!(
                "initial graph has n={} k={}, config asks for n={} k={}",
                initial.n(),
                initial.k(),
                cfg.n,
                cfg.k
            )));
        }
        if let Some(detail) = initial.regularity_violation(cfg.k) {
            return Err(SrgError::RegularityInvariantViolated { iteration: 0, detail });
        }

        let seed = cfg.resolve_seed();
        let len = usize::try_from(cfg.iterations)
            .map_err(|_| SrgError::invalid("iteration budget does not fit in memory"))?;
        let stream = RandomStream::generate(cfg.n, len, seed)?;

        let state = SearchState::new(initial);
        let best_cost = state.cost();
        let (phase, converged_at) = if best_cost == 0 {
            (Phase::Converged, Some(0))
        } else {
            (Phase::Running, None)
        };

        Ok(Self {
            best_graph: state.graph().clone(),
            best_score: state.score(),
            best_cost,
            state,
            stream,
            k: cfg.k,
            budget: cfg.iterations,
            iteration: 0,
            temperature: cfg.temperature,
            alpha: cfg.alpha,
            phase,
            converged_at,
            stats: SearchStats::default(),
        })
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Iterations consumed so far.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Current temperature.
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Cost of the current graph.
    pub fn current_cost(&self) -> usize {
        self.state.cost()
    }

    /// The current (not necessarily best) graph.
    pub fn current_graph(&self) -> &RegularGraph {
        self.state.graph()
    }

    /// Lowest cost seen.
    pub fn best_cost(&self) -> usize {
        self.best_cost
    }

    /// Lowest-cost graph seen.
    pub fn best_graph(&self) -> &RegularGraph {
        &self.best_graph
    }

    /// Counters so far.
    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    /// Seed the stream was generated from.
    pub fn seed(&self) -> u64 {
        self.stream.seed()
    }

    /// Runs one iteration and returns the phase afterwards.
    ///
    /// Stepping a terminated annealer is a no-op.
    ///
    /// # Errors
    /// `RegularityInvariantViolated` or `ScoreDrift` from a failed cross-check,
    /// `InvalidMove` if a proposed swap did not apply. All are fatal.
    pub fn step(&mut self) -> Result<Phase> {
        if self.phase == Phase::Terminated {
            return Ok(self.phase);
        }
        let Some(&draw) = usize::try_from(self.iteration)
            .ok()
            .and_then(|i| self.stream.get(i))
        else {
            self.finish()?;
            return Ok(self.phase);
        };

        self.iteration += 1;
        self.stats.iterations += 1;
        self.try_move(draw)?;

        if self.iteration % SANITY_CHECK_EVERY == 0 {
            self.sanity_check()?;
        }
        self.temperature *= self.alpha;

        if self.iteration >= self.budget {
            self.finish()?;
        }
        Ok(self.phase)
    }

    /// Steps until the budget is spent.
    ///
    /// # Errors
    /// Any fatal error from [`Annealer::step`].
    pub fn run(mut self) -> Result<SearchOutcome> {
        log::info!(
            "annealing n={} k={}: {} iterations, T0={}, alpha={}, seed={}, initial cost {}",
            self.state.graph().n(),
            self.k,
            self.budget,
            self.temperature,
            self.alpha,
            self.seed(),
            self.best_cost
        );
        while self.step()? != Phase::Terminated {}
        Ok(self.into_outcome())
    }

    /// Packages the best graph and counters.
    pub fn into_outcome(self) -> SearchOutcome {
        SearchOutcome {
            seed: self.stream.seed(),
            best_graph: self.best_graph,
            best_score: self.best_score,
            best_cost: self.best_cost,
            final_temperature: self.temperature,
            converged_at: self.converged_at,
            stats: self.stats,
        }
    }

    fn try_move(&mut self, draw: Draw) -> Result<()> {
        if draw.u == draw.v {
            self.stats.skipped += 1;
            return Ok(());
        }
        let Some(mv) = propose_swap(self.state.graph(), draw.u, draw.v, draw.gain_pick, draw.loss_pick)
        else {
            self.stats.infeasible += 1;
            return Ok(());
        };

        let current = self.state.cost();
        self.state.apply_swap(&mv)?;
        let new = self.state.cost();

        if new < current {
            self.stats.accepted_improving += 1;
            if new < self.best_cost {
                self.record_best();
            }
        } else if accept_move(current, new, self.temperature, draw.threshold) {
            if new == current {
                self.stats.accepted_sideways += 1;
            } else {
                self.stats.accepted_uphill += 1;
            }
        } else {
            self.state.apply_swap(&mv.inverse())?;
            self.stats.rejected += 1;
            debug_assert_eq!(self.state.cost(), current);
        }
        Ok(())
    }

    fn record_best(&mut self) {
        self.best_graph = self.state.graph().clone();
        self.best_score = self.state.score();
        self.best_cost = self.state.cost();
        self.stats.improvements += 1;
        log::debug!(
            "iteration {}: new best cost {} (triangles={}, squares={}, T={:.5})",
            self.iteration,
            self.best_cost,
            self.best_score.triangles,
            self.best_score.squares,
            self.temperature
        );
        if self.best_cost == 0 && self.phase == Phase::Running {
            self.phase = Phase::Converged;
            self.converged_at = Some(self.iteration);
            log::info!("iteration {}: found a strongly regular graph", self.iteration);
        }
    }

    fn sanity_check(&mut self) -> Result<()> {
        self.stats.sanity_checks += 1;
        if let Some(detail) = self.state.graph().regularity_violation(self.k) {
            return Err(SrgError::RegularityInvariantViolated {
                iteration: self.iteration,
                detail,
            });
        }
        let recomputed = self.state.recompute_score();
        if recomputed != self.state.score() {
            return Err(SrgError::ScoreDrift {
                iteration: self.iteration,
                incremental: self.state.score().as_tuple(),
                recomputed: recomputed.as_tuple(),
            });
        }
        log::debug!(
            "iteration {}: cost {} best {} T={:.5}",
            self.iteration,
            self.state.cost(),
            self.best_cost,
            self.temperature
        );
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.phase == Phase::Terminated {
            return Ok(());
        }
        self.sanity_check()?;
        self.phase = Phase::Terminated;
        log::info!(
            "finished after {} iterations: best cost {} (triangles={}, squares={}), {} accepted, {} rejected",
            self.iteration,
            self.best_cost,
            self.best_score.triangles,
            self.best_score.squares,
            self.stats.accepted(),
            self.stats.rejected
        );
        Ok(())
    }
}

// ============================================================================
// Pipelines
// ============================================================================

/// Builds a starting graph with a seeded Havel–Hakimi lay-off and anneals it.
///
/// # Errors
/// Any configuration, construction or fatal search error.
pub fn run_search(cfg: &SearchConfig) -> Result<SearchOutcome> {
    cfg.validate()?;
    let seed = cfg.resolve_seed();
    let cfg = cfg.clone().with_seed(seed);
    run_search_with(&cfg, HavelHakimiSolver::seeded(splitmix64(seed)))
}

/// Builds a starting graph with `solver` and anneals it.
///
/// # Errors
/// Any configuration, construction or fatal search error.
pub fn run_search_with<S: FeasibilitySolver>(cfg: &SearchConfig, solver: S) -> Result<SearchOutcome> {
    cfg.validate()?;
    let initial = FeasibilityConstructor::new(solver).construct(cfg.n, cfg.k)?;
    Annealer::new(initial, cfg)?.run()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::construction::CirculantSolver;
    use crate::validate::paley9;

    fn start(seed: u64) -> RegularGraph {
        FeasibilityConstructor::new(HavelHakimiSolver::seeded(seed))
            .construct(9, 4)
            .unwrap()
    }

    #[test]
    fn search_config_default_is_valid() {
        let cfg = SearchConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!((cfg.n, cfg.k, cfg.iterations), (9, 4, 100_000));
        assert_eq!(cfg.seed, None);
    }

    #[test]
    fn builder_sets_every_field() {
        let cfg = SearchConfig::default()
            .with_n(10)
            .with_k(3)
            .with_iterations(5)
            .with_temperature(2.5)
            .with_alpha(1.0)
            .with_seed(9);
        assert_eq!(
            cfg,
            SearchConfig {
                n: 10,
                k: 3,
                iterations: 5,
                temperature: 2.5,
                alpha: 1.0,
                seed: Some(9),
            }
        );
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let base = SearchConfig::default();
        for cfg in [
            base.clone().with_k(9),
            base.clone().with_n(7).with_k(3),
            base.clone().with_temperature(-1.0),
            base.clone().with_temperature(f64::NAN),
            base.clone().with_temperature(f64::INFINITY),
            base.clone().with_alpha(0.0),
            base.clone().with_alpha(1.5),
            base.clone().with_alpha(f64::NAN),
        ] {
            assert!(
                matches!(cfg.validate(), Err(SrgError::InvalidParameters(_))),
                "{cfg:?}"
            );
        }
        assert!(matches!(
            run_search(&base.with_k(0).with_n(0)),
            Err(SrgError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_accept_move_metropolis() {
        // Non-worsening always passes, whatever the threshold.
        assert!(accept_move(100, 50, 1.0, 0.999));
        assert!(accept_move(100, 100, 0.0, 0.999));
        // T = 0 never goes uphill.
        assert!(!accept_move(100, 101, 0.0, 0.0));
        // exp(-1/100) ≈ 0.990.
        assert!(accept_move(100, 101, 100.0, 0.5));
        assert!(!accept_move(100, 101, 100.0, 0.995));
        // exp(-1) ≈ 0.368.
        assert!(accept_move(100, 101, 1.0, 0.3));
        assert!(!accept_move(100, 101, 1.0, 0.4));
    }

    #[test]
    fn zero_iterations_returns_initial_graph() {
        let initial = start(3);
        let cfg = SearchConfig::default().with_iterations(0).with_seed(1);
        let outcome = Annealer::new(initial.clone(), &cfg).unwrap().run().unwrap();
        assert_eq!(outcome.best_graph, initial);
        assert_eq!(outcome.best_score, crate::score::score(&initial));
        assert_eq!(outcome.stats.iterations, 0);
        assert_eq!(outcome.stats.sanity_checks, 1);
        assert!((outcome.final_temperature - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn search_is_deterministic() {
        let cfg = SearchConfig::default().with_iterations(20_000).with_seed(7);
        let a = run_search(&cfg).unwrap();
        let b = run_search(&cfg).unwrap();
        assert_eq!(a.best_graph, b.best_graph);
        assert_eq!(a.best_cost, b.best_cost);
        assert_eq!(a.stats, b.stats);
        assert_eq!(a.converged_at, b.converged_at);
        assert_eq!(a.seed, 7);
    }

    #[test]
    fn best_cost_never_increases_and_regularity_holds() {
        let initial = start(11);
        let initial_cost = crate::score::score(&initial).cost(9);
        let cfg = SearchConfig::default().with_iterations(10_000).with_seed(5);
        let mut annealer = Annealer::new(initial, &cfg).unwrap();
        let mut last_best = annealer.best_cost();
        assert_eq!(last_best, initial_cost);

        while annealer.step().unwrap() != Phase::Terminated {
            assert!(annealer.best_cost() <= last_best);
            assert!(annealer.best_cost() <= annealer.current_cost());
            last_best = annealer.best_cost();
        }
        assert!(annealer.current_graph().check_regular(4));
        assert!(annealer.best_graph().check_regular(4));
        assert_eq!(
            crate::score::score(annealer.best_graph()).cost(9),
            annealer.best_cost()
        );
        assert_eq!(annealer.iteration(), 10_000);
        // Terminated is absorbing.
        assert_eq!(annealer.step().unwrap(), Phase::Terminated);
        assert_eq!(annealer.iteration(), 10_000);
    }

    #[test]
    fn every_iteration_is_accounted_for() {
        let cfg = SearchConfig::default().with_iterations(4_096).with_seed(21);
        let outcome = run_search(&cfg).unwrap();
        let s = outcome.stats;
        assert_eq!(s.iterations, 4_096);
        assert_eq!(s.skipped + s.infeasible + s.accepted() + s.rejected, s.iterations);
        assert!(s.skipped > 0);
        // Four periodic checks plus the one at termination.
        assert_eq!(s.sanity_checks, 5);
    }

    #[test]
    fn zero_temperature_never_goes_uphill() {
        let cfg = SearchConfig::default()
            .with_iterations(5_000)
            .with_temperature(0.0)
            .with_seed(3);
        let outcome = run_search_with(&cfg, CirculantSolver).unwrap();
        assert_eq!(outcome.stats.accepted_uphill, 0);
    }

    #[test]
    fn temperature_decays_geometrically() {
        let cfg = SearchConfig::default()
            .with_iterations(1_000)
            .with_alpha(0.99)
            .with_seed(4);
        let outcome = run_search(&cfg).unwrap();
        let expected = 10.0 * 0.99f64.powi(1_000);
        assert!((outcome.final_temperature - expected).abs() < 1e-9);

        let constant = run_search(&cfg.with_alpha(1.0)).unwrap();
        assert!((constant.final_temperature - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn perfect_start_converges_without_early_exit() {
        let cfg = SearchConfig::default().with_iterations(2_000).with_seed(8);
        let mut annealer = Annealer::new(paley9(), &cfg).unwrap();
        assert_eq!(annealer.phase(), Phase::Converged);
        assert_eq!(annealer.step().unwrap(), Phase::Converged);
        let outcome = annealer.run().unwrap();
        assert_eq!(outcome.stats.iterations, 2_000);
        assert_eq!(outcome.best_cost, 0);
        assert_eq!(outcome.converged_at, Some(0));
        assert_eq!(outcome.best_graph, paley9());
        assert!(outcome.is_perfect());
    }

    #[test]
    fn mismatched_initial_graph_is_rejected() {
        let cfg = SearchConfig::default().with_seed(1);
        let wrong_n = FeasibilityConstructor::new(CirculantSolver).construct(10, 4).unwrap();
        assert!(matches!(
            Annealer::new(wrong_n, &cfg),
            Err(SrgError::InvalidParameters(_))
        ));

        let empty = RegularGraph::new(9, 4).unwrap();
        assert!(matches!(
            Annealer::new(empty, &cfg),
            Err(SrgError::RegularityInvariantViolated { iteration: 0, .. })
        ));
    }

    #[test]
    fn run_search_never_worsens_the_start() {
        let seed = 17;
        let cfg = SearchConfig::default().with_iterations(30_000).with_seed(seed);
        let initial = FeasibilityConstructor::new(HavelHakimiSolver::seeded(splitmix64(seed)))
            .construct(9, 4)
            .unwrap();
        let outcome = run_search(&cfg).unwrap();
        assert!(outcome.best_cost <= crate::score::score(&initial).cost(9));
        assert!(outcome.best_graph.check_regular(4));
    }
}
