//! Core tuning-state types shared across the search loop.
//!
//! All mutable search state lives in three shapes:
//! - [`GainTriple`]: the current global best (kp, ki, kd)
//! - [`SearchState`]: per-dimension neighborhood (range multiplier + step)
//! - [`BestRecord`]: the best trial-averaged result found so far
//!
//! The outer loop owns one of each (see `search::outer::SearchCtx`); the
//! crawler and controller only ever see them by reference.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reference tuning constants for the discrete staking controller.
pub mod consts {
    /// Annualized reward rate the controller is tuned to track.
    pub const TARGET_RATE: f64 = 0.12;
    /// Acceptance band around the target rate for a record.
    pub const RATE_TOLERANCE: f64 = 0.08;
    /// Stochastic trials averaged per candidate gain triple.
    pub const TRIALS_PER_CANDIDATE: usize = 10;
    /// Outward shift applied when widening a degenerate bracket.
    pub const SHIFT: f64 = 0.05;
    /// Minimum candidate count for a crawl pass.
    pub const MIN_CANDIDATES: usize = 10;
    /// Ceiling on candidates per pass enforced by the controller.
    pub const MAX_PASS_STEPS: usize = 500;
    /// Initial per-dimension range multiplier.
    pub const INITIAL_RANGE_MULTIPLIER: f64 = 2.0;
    /// Initial per-dimension step size.
    pub const INITIAL_STEP: f64 = 5.0;
    /// Accuracy bar the first record must clear.
    pub const BASELINE_ACCURACY: f64 = 0.2;
    /// Gain triple the search starts from.
    pub const INITIAL_GAINS: (f64, f64, f64) = (0.92, 1.6, 0.1);
    /// Token supply distributed across the simulated population.
    pub const TOTAL_SUPPLY: f64 = 2.1e9;
    /// Node population size.
    pub const NODE_COUNT: usize = 100;
    /// Simulated slots per trial.
    pub const RUN_SLOTS: usize = 5000;
    /// Staked-ratio target of the primary controller.
    pub const STAKE_TARGET: f64 = 0.35;
    /// Fixed gains of the primary winning-frequency controller.
    ///
    /// The search tunes the secondary reward controller; every trial runs
    /// the primary loop at these pre-tuned values.
    pub const REFERENCE_KP: f64 = -0.010399999999938556;
    pub const REFERENCE_KI: f64 = -0.0365999996461878;
    pub const REFERENCE_KD: f64 = 0.03840000000000491;
}

/// One gain dimension of the PID controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Kp,
    Ki,
    Kd,
}

impl Dimension {
    /// Crawl order of the outer loop.
    pub const ALL: [Dimension; 3] = [Dimension::Kp, Dimension::Ki, Dimension::Kd];

    pub fn name(self) -> &'static str {
        match self {
            Dimension::Kp => "kp",
            Dimension::Ki => "ki",
            Dimension::Kd => "kd",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The (kp, ki, kd) triple under search.
///
/// Mutated only when the trial aggregator confirms a new record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GainTriple {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl GainTriple {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd }
    }

    /// The current value along one dimension.
    pub fn get(&self, dim: Dimension) -> f64 {
        match dim {
            Dimension::Kp => self.kp,
            Dimension::Ki => self.ki,
            Dimension::Kd => self.kd,
        }
    }

    /// Copy with one dimension replaced, the other two untouched.
    pub fn with(&self, dim: Dimension, value: f64) -> Self {
        let mut gains = *self;
        match dim {
            Dimension::Kp => gains.kp = value,
            Dimension::Ki => gains.ki = value,
            Dimension::Kd => gains.kd = value,
        }
        gains
    }
}

impl Default for GainTriple {
    fn default() -> Self {
        let (kp, ki, kd) = consts::INITIAL_GAINS;
        Self { kp, ki, kd }
    }
}

impl fmt::Display for GainTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kp: {}, ki: {}, kd: {}", self.kp, self.ki, self.kd)
    }
}

/// Five scalar outputs of one stochastic simulation trial.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrialOutcome {
    /// Share of slots that produced exactly one leader.
    pub accuracy: f64,
    /// Compounded annual yield.
    pub apy: f64,
    /// Total reward issued over the trial.
    pub reward: f64,
    /// Mean staked fraction of circulating supply.
    pub stake_ratio: f64,
    /// Annualized reward rate.
    pub apr: f64,
}

/// Per-dimension search neighborhood: how wide to bracket, how finely to step.
///
/// Initialized once, adapted in place after every crawl pass, never reset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchState {
    pub range_multiplier: f64,
    pub step: f64,
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            range_multiplier: consts::INITIAL_RANGE_MULTIPLIER,
            step: consts::INITIAL_STEP,
        }
    }
}

/// Best trial-averaged result found so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BestRecord {
    pub accuracy: f64,
    pub annualized_rate: f64,
    pub stake_ratio: f64,
    pub gains: GainTriple,
    /// Invariant: |annualized_rate - target| at the time of the record.
    pub target_diff: f64,
}

impl Default for BestRecord {
    fn default() -> Self {
        Self {
            accuracy: consts::BASELINE_ACCURACY,
            annualized_rate: 0.05,
            stake_ratio: 0.3,
            gains: GainTriple::default(),
            target_diff: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gain_triple_get_with() {
        let gains = GainTriple::new(0.1, 0.2, 0.3);
        assert_eq!(gains.get(Dimension::Ki), 0.2);

        let shifted = gains.with(Dimension::Kd, -1.5);
        assert_eq!(shifted.kd, -1.5);
        // Other dimensions untouched
        assert_eq!(shifted.kp, 0.1);
        assert_eq!(shifted.ki, 0.2);
    }

    #[test]
    fn test_default_state_matches_reference_tuning() {
        let state = SearchState::default();
        assert_eq!(state.range_multiplier, 2.0);
        assert_eq!(state.step, 5.0);

        let record = BestRecord::default();
        assert_eq!(record.accuracy, 0.2);
        assert_eq!(record.gains.kp, 0.92);
    }

    #[test]
    fn test_dimension_order() {
        let names: Vec<_> = Dimension::ALL.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["kp", "ki", "kd"]);
    }
}
