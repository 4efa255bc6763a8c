//! Negative-feedback adaptation of the per-dimension search neighborhood.
//!
//! After every crawl pass the controller looks at one signal only: did the
//! best value for this dimension move?
//!
//! - **No move**: the neighborhood under-resolved. Widen the bracket
//!   (multiplier + 1) and refine the step (÷10) for the next pass.
//! - **Move**: exploration is paying off, but a wider bracket with a fine
//!   step can explode the candidate count. While the padded bracket holds
//!   more than 500 steps, double the step and pull the multiplier back in.
//!
//! Each dimension's state is adapted independently; the controller never
//! touches another dimension.

use crate::search::crawler::bracket;
use crate::types::{consts, SearchState};

/// Adapt one dimension's neighborhood after a crawl pass.
///
/// `prior_best` and `new_best` are the dimension's best value before and
/// after the pass. Best values only change through confirmed records, so
/// exact equality is the right "no move" test.
pub fn adapt(state: &mut SearchState, prior_best: f64, new_best: f64) {
    if new_best == prior_best {
        state.range_multiplier += 1.0;
        state.step /= 10.0;
        return;
    }

    // The bracket the next pass would scan, padded outward by the shift
    let (start, end) = bracket(new_best, state.range_multiplier);
    let (start, end) = (start - consts::SHIFT, end + consts::SHIFT);

    // Halve the effort until the pass cost is bounded. The bracket is held
    // fixed while the step doubles, so the step count halves every round
    // and the loop terminates for any positive starting step.
    while (end - start) / state.step > consts::MAX_PASS_STEPS as f64 {
        state.step *= 2.0;
        state.range_multiplier -= 1.0;
    }
}
