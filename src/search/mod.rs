//! The adaptive coordinate-wise gain search.
//!
//! Four collaborators, leaves first:
//! - [`aggregator`]: multi-trial candidate evaluation and record keeping
//! - [`crawler`]: per-dimension candidate ranges, shuffled and scanned
//! - [`controller`]: range/step adaptation after each crawl pass
//! - [`outer`]: the open-ended loop cycling kp → ki → kd forever
//!
//! Only the aggregator mutates shared state (gains + best record), and only
//! behind its conjunctive acceptance rule; the crawler and controller read
//! the state and shape the next neighborhood.

pub mod aggregator;
pub mod controller;
pub mod crawler;
pub mod outer;

pub use aggregator::{evaluate_candidate, CandidateOutcome};
pub use controller::adapt;
pub use crawler::{bracket, build_candidates, crawl_dimension, widen};
pub use outer::{run, CancelToken, SearchCtx};

use thiserror::Error;

use crate::eval::EvalError;
use crate::types::{Dimension, GainTriple};

/// Failures that abort a crawl pass or the whole search.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The step/range pair never materialized, even after coarsening.
    #[error(
        "cannot materialize {dimension} candidate range [{start}, {end}]: \
         step grew to {step} after {retries} coarsenings"
    )]
    RangeConstruction {
        dimension: Dimension,
        start: f64,
        end: f64,
        step: f64,
        retries: usize,
    },

    /// Every candidate in a crawl pass failed to evaluate.
    #[error(
        "all {candidates} candidates failed while crawling {dimension} around {gains}: {source}"
    )]
    PassFailed {
        dimension: Dimension,
        candidates: usize,
        gains: GainTriple,
        #[source]
        source: EvalError,
    },
}
