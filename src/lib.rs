//! pidcrawl - adaptive coordinate-wise PID gain search for a stochastic
//! staking-reward simulation.
//!
//! An open-ended tuning daemon: it searches the three gains of the discrete
//! reward controller embedded in a staking lottery, driving the simulated
//! annualized reward rate toward a target while maximizing accuracy. The
//! lottery's primary winning-frequency controller runs fixed, pre-tuned
//! reference gains throughout.
//!
//! # Architecture
//!
//! ```text
//! Outer Loop → Dimension Crawler → Trial Aggregator → Evaluator
//!      ↓              ↓                  ↓                ↓
//!  kp→ki→kd      bracket zero,      N trials, mean,   one stochastic
//!  forever       shuffle, scan      record rule       lottery run
//!      ↓
//! Range/Step Controller (widen+refine on miss, cap cost on hit)
//! ```
//!
//! The simulation sits behind the narrow [`eval::Evaluator`] trait; plain
//! closures implement it, which is how the tests drive the search core
//! deterministically.

pub mod config;
pub mod eval;
pub mod progress;
pub mod record;
pub mod search;
pub mod sim;
pub mod types;

// Re-export core types
pub use config::Settings;
pub use eval::{ControllerKind, EvalError, Evaluator, TrialRequest};
pub use progress::LiveProgress;
pub use record::RecordSink;
pub use search::{CancelToken, SearchCtx, SearchError};
pub use sim::LotterySim;
pub use types::{BestRecord, Dimension, GainTriple, SearchState, TrialOutcome};
