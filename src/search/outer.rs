//! The open-ended outer search loop and its shared mutable context.
//!
//! The loop has one steady state: snapshot the current gains, crawl each
//! dimension in kp → ki → kd order, adapt that dimension's neighborhood,
//! repeat forever. There is no convergence criterion by design; the tuner
//! is a daemon that operators stop via the cancellation token (wired to
//! ctrl-c in the binary), checked between dimensions and between
//! candidates so shutdown never waits on a full pass.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::eval::Evaluator;
use crate::progress::LiveProgress;
use crate::record::RecordSink;
use crate::search::controller::adapt;
use crate::search::crawler::crawl_dimension;
use crate::search::SearchError;
use crate::types::{BestRecord, Dimension, GainTriple, SearchState};

/// Cooperative cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// All mutable tuning state, owned by the outer loop.
///
/// Making the shared state one explicit object keeps the crawler and
/// controller testable in isolation and keeps every write path visible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchCtx {
    /// Current global best gain triple.
    pub gains: GainTriple,
    /// Best trial-averaged result so far.
    pub best: BestRecord,
    /// Per-dimension neighborhoods.
    pub kp_state: SearchState,
    pub ki_state: SearchState,
    pub kd_state: SearchState,
}

impl SearchCtx {
    pub fn new() -> Self {
        Self {
            gains: GainTriple::default(),
            best: BestRecord::default(),
            kp_state: SearchState::default(),
            ki_state: SearchState::default(),
            kd_state: SearchState::default(),
        }
    }

    pub fn state(&self, dim: Dimension) -> SearchState {
        match dim {
            Dimension::Kp => self.kp_state,
            Dimension::Ki => self.ki_state,
            Dimension::Kd => self.kd_state,
        }
    }

    pub fn state_mut(&mut self, dim: Dimension) -> &mut SearchState {
        match dim {
            Dimension::Kp => &mut self.kp_state,
            Dimension::Ki => &mut self.ki_state,
            Dimension::Kd => &mut self.kd_state,
        }
    }
}

impl Default for SearchCtx {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the search until cancelled.
///
/// Returns Ok(()) only on cancellation; every other exit is a
/// [`SearchError`] from a pass that could not make progress.
pub fn run<E: Evaluator>(
    ctx: &mut SearchCtx,
    evaluator: &mut E,
    sink: &mut RecordSink,
    progress: &mut LiveProgress,
    settings: &Settings,
    seed: u64,
    cancel: &CancelToken,
) -> Result<(), SearchError> {
    let mut rng = StdRng::seed_from_u64(seed);

    loop {
        let prior = ctx.gains;

        for dim in Dimension::ALL {
            if cancel.is_cancelled() {
                return Ok(());
            }

            crawl_dimension(ctx, evaluator, sink, progress, &mut rng, dim, settings, cancel)?;

            let new_best = ctx.gains.get(dim);
            adapt(ctx.state_mut(dim), prior.get(dim), new_best);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::TrialRequest;
    use crate::types::TrialOutcome;

    fn test_settings() -> Settings {
        Settings {
            randomize_nodes: false,
            randomize_duration: false,
            trials_per_candidate: 1,
            ..Settings::default()
        }
    }

    fn test_sink(name: &str) -> RecordSink {
        let dir = std::env::temp_dir().join(format!("pidcrawl-outer-{name}-{}", std::process::id()));
        RecordSink::new(dir.join("highest_gain.txt")).unwrap()
    }

    #[test]
    fn test_cancel_token_shared_across_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_loop_stops_on_cancel() {
        let mut ctx = SearchCtx::new();
        let mut sink = test_sink("cancel");
        let mut progress = LiveProgress::new();
        let settings = test_settings();
        let cancel = CancelToken::new();

        // Cancel after a fixed number of trial evaluations
        let canceller = cancel.clone();
        let mut calls = 0usize;
        let mut stub = move |_req: &TrialRequest| {
            calls += 1;
            if calls >= 40 {
                canceller.cancel();
            }
            Ok(TrialOutcome {
                accuracy: 0.0,
                apr: -1.0,
                ..Default::default()
            })
        };

        let result = run(
            &mut ctx,
            &mut stub,
            &mut sink,
            &mut progress,
            &settings,
            9,
            &cancel,
        );
        assert!(result.is_ok(), "cancellation is a clean exit");
    }

    #[test]
    fn test_no_improvement_pass_adapts_all_dimensions() {
        let mut ctx = SearchCtx::new();
        // A neighborhood the crawler will not need to widen
        ctx.kp_state = SearchState {
            range_multiplier: 2.0,
            step: 0.1,
        };
        let mut sink = test_sink("no-improve");
        let mut progress = LiveProgress::new();
        let settings = test_settings();
        let cancel = CancelToken::new();

        // Accuracy pinned at the current record: no candidate ever improves
        let canceller = cancel.clone();
        let prior_states: Vec<SearchState> =
            Dimension::ALL.iter().map(|d| ctx.state(*d)).collect();

        // 500 evaluations comfortably covers more than one full cycle, so
        // every dimension sees at least one completed no-record pass
        let mut calls = 0usize;
        let mut stub = move |_req: &TrialRequest| {
            calls += 1;
            if calls >= 500 {
                canceller.cancel();
            }
            Ok(TrialOutcome {
                accuracy: 0.2,
                apr: 0.12,
                ..Default::default()
            })
        };

        run(
            &mut ctx,
            &mut stub,
            &mut sink,
            &mut progress,
            &settings,
            9,
            &cancel,
        )
        .unwrap();

        // k no-record passes leave multiplier + k and step / 10^k
        for (dim, prior) in Dimension::ALL.iter().zip(prior_states) {
            let state = ctx.state(*dim);
            let delta = state.range_multiplier - prior.range_multiplier;
            assert!(delta >= 1.0, "{dim} multiplier must grow");
            assert_eq!(delta.fract(), 0.0, "{dim} multiplier grows by whole steps");
            let expected_step = prior.step / 10f64.powi(delta as i32);
            assert!(
                (state.step - expected_step).abs() <= expected_step * 1e-9,
                "{dim} step must shrink tenfold per pass"
            );
        }
        // Gains untouched without a record
        assert_eq!(ctx.gains, GainTriple::default());
    }
}
