//! The narrow evaluation interface between the search loop and the
//! staking simulation.
//!
//! The search core only ever sees [`Evaluator::run_trial`]: one stochastic
//! simulation run for a fixed gain triple, returning five scalar metrics.
//! Everything about the economy behind it is a black box. A blanket impl
//! lets tests plug in plain closures as evaluators.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use thiserror::Error;

use crate::types::TrialOutcome;

/// Controller flavor selected for a trial.
///
/// The tuner always runs the discrete controller; the enum mirrors the
/// simulator interface, which also knows analogue and Takahashi variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerKind {
    Analogue,
    #[default]
    Discrete,
    Takahashi,
}

/// Everything a single stochastic trial needs.
#[derive(Debug, Clone)]
pub struct TrialRequest<'a> {
    /// Nodes participating in this trial (first `node_count` balances used).
    pub node_count: usize,
    /// Slots to simulate, before optional duration randomization.
    pub run_slots: usize,
    pub controller: ControllerKind,
    /// Searched gains, driving the secondary reward controller.
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Fixed gains of the primary winning-frequency controller.
    pub reference_kp: f64,
    pub reference_ki: f64,
    pub reference_kd: f64,
    /// Initial per-node balances, length >= node_count.
    pub distribution: &'a [f64],
    /// Draw the effective run length at random below `run_slots`.
    pub randomize_duration: bool,
    /// Compensated summation for reward accounting.
    pub high_precision: bool,
}

/// A trial that could not produce usable metrics.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("simulation diverged: {0}")]
    Diverged(String),

    #[error("non-finite {metric} for kp: {kp}, ki: {ki}, kd: {kd}")]
    NonFinite {
        metric: &'static str,
        kp: f64,
        ki: f64,
        kd: f64,
    },

    #[error("distribution holds {got} balances, trial needs {need}")]
    ShortDistribution { got: usize, need: usize },

    #[error("controller kind {0:?} not supported by this evaluator")]
    UnsupportedController(ControllerKind),
}

/// One stochastic run of the simulation for a fixed gain triple.
///
/// Implementations must not average or clamp internally; a run that cannot
/// produce finite metrics is an error, never a silent zero.
pub trait Evaluator {
    fn run_trial(&mut self, req: &TrialRequest) -> Result<TrialOutcome, EvalError>;
}

impl<F> Evaluator for F
where
    F: FnMut(&TrialRequest) -> Result<TrialOutcome, EvalError>,
{
    fn run_trial(&mut self, req: &TrialRequest) -> Result<TrialOutcome, EvalError> {
        self(req)
    }
}

/// Initial balances for a trial population.
///
/// Roughly uniform around the per-node share of total supply with a 10%
/// relative spread, floored at zero. Generated once per crawl pass so every
/// candidate in the pass competes under identical population conditions.
pub fn population<R: Rng>(node_count: usize, total_supply: f64, rng: &mut R) -> Vec<f64> {
    let mean = total_supply / node_count.max(1) as f64;
    match Normal::new(mean, mean.abs() * 0.1) {
        Ok(normal) => (0..node_count)
            .map(|_| normal.sample(rng).max(0.0))
            .collect(),
        // Degenerate spread (zero/non-finite mean): fall back to equal shares
        Err(_) => vec![mean; node_count],
    }
}
