//! Per-dimension candidate-range construction and scanning.
//!
//! A crawl pass brackets the current best value with an asymmetric interval
//! that always spans zero: the search may push a gain across the sign
//! boundary, so the interval reaches from the negated best on one side to
//! the multiplier-widened best on the other. Degenerate brackets are
//! widened and refined until they hold at least ten candidates, the
//! candidates are shuffled to kill low-to-high scan bias, and the pass
//! stops at the first record.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::config::Settings;
use crate::eval::{population, Evaluator};
use crate::progress::LiveProgress;
use crate::record::RecordSink;
use crate::search::aggregator::evaluate_candidate;
use crate::search::outer::{CancelToken, SearchCtx};
use crate::search::SearchError;
use crate::types::{consts, Dimension};

/// Maximum ×10 step coarsenings before range construction fails loudly.
///
/// The reference behavior retries without bound; the cap turns a pathological
/// step/range pair into a diagnosable error instead of a spin.
pub const MAX_RANGE_RETRIES: usize = 8;

/// Hard cap on materialized candidates per attempt.
const MAX_CANDIDATES: usize = 1 << 20;

/// Asymmetric search interval around `start`.
///
/// Brackets zero from the side opposite the sign of `start`, widened by
/// `multiplier` on the far side: start <= 0 gives [start·m, -start], else
/// [-start, start·m].
pub fn bracket(start: f64, multiplier: f64) -> (f64, f64) {
    if start <= 0.0 {
        (start * multiplier, -start)
    } else {
        (-start, start * multiplier)
    }
}

/// Widen a degenerate bracket until it holds at least ten steps.
///
/// Both ends shift outward by the fixed constant while the step shrinks
/// tenfold, so the step count grows strictly each round and the loop
/// terminates after a handful of iterations.
pub fn widen(mut start: f64, mut end: f64, mut step: f64) -> (f64, f64, f64) {
    while (end - start) / step < consts::MIN_CANDIDATES as f64 {
        start -= consts::SHIFT;
        end += consts::SHIFT;
        step /= 10.0;
    }
    (start, end, step)
}

/// Materialize `[start, end)` at `step` spacing, coarsening the step
/// tenfold on each failed attempt.
pub fn build_candidates(
    dim: Dimension,
    start: f64,
    end: f64,
    mut step: f64,
) -> Result<Vec<f64>, SearchError> {
    for _retry in 0..=MAX_RANGE_RETRIES {
        match arange(start, end, step) {
            Some(candidates) => return Ok(candidates),
            None => step *= 10.0,
        }
    }
    Err(SearchError::RangeConstruction {
        dimension: dim,
        start,
        end,
        step,
        retries: MAX_RANGE_RETRIES,
    })
}

/// Evenly spaced values in `[start, end)`, or None when the step/range pair
/// is degenerate (non-finite, non-positive, or overflowing the cap).
fn arange(start: f64, end: f64, step: f64) -> Option<Vec<f64>> {
    if !step.is_finite() || step <= 0.0 || !start.is_finite() || !end.is_finite() {
        return None;
    }
    let count = ((end - start) / step).ceil();
    if !count.is_finite() || count < 0.0 || count > MAX_CANDIDATES as f64 {
        return None;
    }
    Some(
        (0..count as usize)
            .map(|i| start + i as f64 * step)
            .collect(),
    )
}

/// One crawl pass over `dim`: build, shuffle, scan until record or
/// exhaustion.
///
/// The other two dimensions ride along at their current best. One population
/// distribution is drawn up front and shared by every candidate in the pass.
/// A candidate whose evaluation fails (after the aggregator's retries) is
/// skipped; the pass only fails if every candidate does.
#[allow(clippy::too_many_arguments)]
pub fn crawl_dimension<E: Evaluator>(
    ctx: &mut SearchCtx,
    evaluator: &mut E,
    sink: &mut RecordSink,
    progress: &mut LiveProgress,
    rng: &mut StdRng,
    dim: Dimension,
    settings: &Settings,
    cancel: &CancelToken,
) -> Result<(), SearchError> {
    let state = ctx.state(dim);
    let start = ctx.gains.get(dim);

    let (range_start, range_end) = bracket(start, state.range_multiplier);
    let (range_start, range_end, step) = widen(range_start, range_end, state.step);
    let mut candidates = build_candidates(dim, range_start, range_end, step)?;
    candidates.shuffle(rng);

    let distribution = population(settings.node_count, settings.total_supply, rng);

    progress.begin_pass();
    let total = candidates.len();
    let mut failures = 0usize;
    let mut last_err = None;

    for (idx, value) in candidates.into_iter().enumerate() {
        if cancel.is_cancelled() {
            return Ok(());
        }

        let gains = ctx.gains.with(dim, value);
        match evaluate_candidate(ctx, evaluator, sink, rng, gains, &distribution, settings) {
            Ok(outcome) => {
                progress.record(ctx.best.accuracy, outcome.new_record);
                progress.display(dim, idx + 1, total, &outcome.summary());
                if outcome.new_record {
                    break;
                }
            }
            Err(err) => {
                failures += 1;
                if settings.debug {
                    eprintln!("skipping {dim} candidate {value}: {err}");
                }
                last_err = Some((gains, err));
            }
        }
    }

    if failures == total {
        if let Some((gains, source)) = last_err {
            return Err(SearchError::PassFailed {
                dimension: dim,
                candidates: total,
                gains,
                source,
            });
        }
    }
    Ok(())
}
