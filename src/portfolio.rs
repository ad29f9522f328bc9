//! Independent annealing runs in parallel, reduced to the best one.
//!
//! Each run gets a private clone of the starting graph and its own stream,
//! seeded with `splitmix64(base ^ run_id)`. Runs share nothing; the only
//! synchronisation is the final reduction, which picks the lowest
//! `(best_cost, run_id)` so ties resolve the same way on every machine.

use crate::error::{Result, SrgError};
use crate::graph::RegularGraph;
use crate::search::{Annealer, SearchConfig, SearchOutcome};
use crate::stream::splitmix64;
use rayon::prelude::*;

/// Per-run summary kept alongside the winning outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    /// Run index in `0..runs`.
    pub run_id: usize,
    /// Seed the run's stream was generated from.
    pub seed: u64,
    /// Best cost the run reached.
    pub best_cost: usize,
    /// Iteration at which the run first reached cost 0.
    pub converged_at: Option<u64>,
}

/// Result of [`run_portfolio`].
#[derive(Clone, Debug)]
pub struct PortfolioOutcome {
    /// Index of the winning run.
    pub best_run: usize,
    /// The winning run's outcome.
    pub best: SearchOutcome,
    /// Every run, in `run_id` order.
    pub runs: Vec<RunSummary>,
}

/// Seed for run `run_id` under base seed `base`.
#[inline]
pub fn run_seed(base: u64, run_id: usize) -> u64 {
    splitmix64(base ^ run_id as u64)
}

/// Anneals `runs` private copies of `initial` in parallel and keeps the best.
///
/// # Errors
/// `InvalidParameters` if `runs == 0` or the config is invalid; the first
/// fatal error from any run otherwise.
pub fn run_portfolio(initial: &RegularGraph, cfg: &SearchConfig, runs: usize) -> Result<PortfolioOutcome> {
    if runs == 0 {
        return Err(SrgError::invalid("portfolio needs at least one run"));
    }
    cfg.validate()?;
    let base = cfg.resolve_seed();
    log::info!("portfolio of {runs} runs, base seed {base}");

    let outcomes = (0..runs)
        .into_par_iter()
        .map(|run_id| {
            let run_cfg = cfg.clone().with_seed(run_seed(base, run_id));
            Annealer::new(initial.clone(), &run_cfg)?
                .run()
                .map(|outcome| (run_id, outcome))
        })
        .collect::<Result<Vec<_>>>()?;

    let runs: Vec<RunSummary> = outcomes
        .iter()
        .map(|(run_id, o)| RunSummary {
            run_id: *run_id,
            seed: o.seed,
            best_cost: o.best_cost,
            converged_at: o.converged_at,
        })
        .collect();

    let (best_run, best) = outcomes
        .into_iter()
        .min_by_key(|(run_id, o)| (o.best_cost, *run_id))
        .ok_or_else(|| SrgError::invalid("portfolio produced no runs"))?;

    log::info!(
        "portfolio best: run {best_run} with cost {} ({} of {} runs converged)",
        best.best_cost,
        runs.iter().filter(|r| r.best_cost == 0).count(),
        runs.len()
    );
    Ok(PortfolioOutcome { best_run, best, runs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::construction::{FeasibilityConstructor, HavelHakimiSolver};
    use crate::validate::paley9;

    fn start() -> RegularGraph {
        FeasibilityConstructor::new(HavelHakimiSolver::seeded(2))
            .construct(9, 4)
            .unwrap()
    }

    #[test]
    fn zero_runs_is_invalid() {
        let cfg = SearchConfig::default().with_seed(1);
        assert!(matches!(
            run_portfolio(&start(), &cfg, 0),
            Err(SrgError::InvalidParameters(_))
        ));
    }

    #[test]
    fn portfolio_returns_the_minimum() {
        let cfg = SearchConfig::default().with_iterations(3_000).with_seed(99);
        let out = run_portfolio(&start(), &cfg, 6).unwrap();
        assert_eq!(out.runs.len(), 6);
        let min = out.runs.iter().map(|r| r.best_cost).min().unwrap();
        assert_eq!(out.best.best_cost, min);
        let first_min = out.runs.iter().find(|r| r.best_cost == min).unwrap();
        assert_eq!(out.best_run, first_min.run_id);
        for (i, r) in out.runs.iter().enumerate() {
            assert_eq!(r.run_id, i);
            assert_eq!(r.seed, run_seed(99, i));
        }
    }

    #[test]
    fn runs_match_serial_annealers() {
        let cfg = SearchConfig::default().with_iterations(2_000).with_seed(5);
        let initial = start();
        let out = run_portfolio(&initial, &cfg, 4).unwrap();
        for r in &out.runs {
            let serial = Annealer::new(initial.clone(), &cfg.clone().with_seed(r.seed))
                .unwrap()
                .run()
                .unwrap();
            assert_eq!(serial.best_cost, r.best_cost);
        }
        let again = run_portfolio(&initial, &cfg, 4).unwrap();
        assert_eq!(again.runs, out.runs);
        assert_eq!(again.best.best_graph, out.best.best_graph);
    }

    #[test]
    fn ties_go_to_the_lowest_run_id() {
        let cfg = SearchConfig::default().with_iterations(500).with_seed(3);
        let out = run_portfolio(&paley9(), &cfg, 5).unwrap();
        assert!(out.runs.iter().all(|r| r.best_cost == 0));
        assert_eq!(out.best_run, 0);
        assert_eq!(out.best.best_graph, paley9());
    }
}
