//! Multi-trial candidate evaluation and record keeping.
//!
//! One candidate gain triple is judged by the arithmetic mean of
//! `trials_per_candidate` independent stochastic trials. A **record** is a
//! conjunctive decision, not a pure maximization: the mean rate must be
//! positive, the mean accuracy must beat the current best, and the rate must
//! sit within the tolerance band around the target. Accuracy improvements
//! that drift off-target are rejected, which keeps the search from
//! over-fitting accuracy at the cost of target tracking.
//!
//! Failed trials are never averaged over: each one is retried in place up
//! to [`TRIAL_RETRY_BUDGET`] times, and an exhausted budget propagates the
//! failure to the crawler.

use rand::rngs::StdRng;
use rand::Rng;

use crate::config::Settings;
use crate::eval::{ControllerKind, EvalError, Evaluator, TrialRequest};
use crate::record::RecordSink;
use crate::search::outer::SearchCtx;
use crate::types::{BestRecord, GainTriple};

/// Fresh attempts allowed per failed trial before the candidate fails.
pub const TRIAL_RETRY_BUDGET: usize = 3;

/// Averaged outcome of one candidate evaluation.
#[derive(Debug, Clone)]
pub struct CandidateOutcome {
    pub avg_accuracy: f64,
    pub avg_apy: f64,
    pub avg_reward: f64,
    pub avg_stake_ratio: f64,
    pub avg_rate: f64,
    pub gains: GainTriple,
    pub new_record: bool,
}

impl CandidateOutcome {
    /// The free-form summary line shared by the sink and the live display.
    pub fn summary(&self) -> String {
        format!(
            "avg(acc): {}, avg(apr): {}, avg(reward): {}, avg(stake ratio): {}, {}",
            self.avg_accuracy, self.avg_rate, self.avg_reward, self.avg_stake_ratio, self.gains
        )
    }
}

/// Evaluate one candidate gain triple over `trials_per_candidate` trials.
///
/// On a record, updates `ctx.gains` and `ctx.best` in place and writes the
/// sink (best-effort). The other two dimensions travel inside `gains`
/// untouched; the caller decides which dimension varied.
pub fn evaluate_candidate<E: Evaluator>(
    ctx: &mut SearchCtx,
    evaluator: &mut E,
    sink: &mut RecordSink,
    rng: &mut StdRng,
    gains: GainTriple,
    distribution: &[f64],
    settings: &Settings,
) -> Result<CandidateOutcome, EvalError> {
    let trials = settings.trials_per_candidate.max(1);

    let mut acc_sum = 0.0;
    let mut apy_sum = 0.0;
    let mut reward_sum = 0.0;
    let mut stake_sum = 0.0;
    let mut rate_sum = 0.0;

    for _ in 0..trials {
        let node_count = if settings.randomize_nodes {
            rng.gen_range(5..=settings.node_count.max(5))
        } else {
            settings.node_count
        };
        let req = TrialRequest {
            node_count,
            run_slots: settings.run_slots,
            controller: ControllerKind::Discrete,
            kp: gains.kp,
            ki: gains.ki,
            kd: gains.kd,
            reference_kp: settings.reference_kp,
            reference_ki: settings.reference_ki,
            reference_kd: settings.reference_kd,
            distribution,
            randomize_duration: settings.randomize_duration,
            high_precision: settings.high_precision,
        };

        let outcome = run_with_retry(evaluator, &req)?;
        acc_sum += outcome.accuracy;
        apy_sum += outcome.apy;
        reward_sum += outcome.reward;
        stake_sum += outcome.stake_ratio;
        rate_sum += outcome.apr;
    }

    let n = trials as f64;
    let avg_accuracy = acc_sum / n;
    let avg_apy = apy_sum / n;
    let avg_reward = reward_sum / n;
    let avg_stake_ratio = stake_sum / n;
    let avg_rate = rate_sum / n;

    let mut new_record = false;
    if avg_rate > 0.0 {
        let target_diff = (avg_rate - settings.target_rate).abs();
        if avg_accuracy > ctx.best.accuracy && target_diff < settings.rate_tolerance {
            new_record = true;
            ctx.gains = gains;
            ctx.best = BestRecord {
                accuracy: avg_accuracy,
                annualized_rate: avg_rate,
                stake_ratio: avg_stake_ratio,
                gains,
                target_diff,
            };
        }
    }

    let outcome = CandidateOutcome {
        avg_accuracy,
        avg_apy,
        avg_reward,
        avg_stake_ratio,
        avg_rate,
        gains,
        new_record,
    };

    if new_record {
        // Best-effort durability; the in-memory record stands regardless
        sink.write(&ctx.best, &outcome.summary());
    }

    Ok(outcome)
}

/// Retry-and-replace: a failed trial is re-run rather than dropped, so the
/// mean is always over the full trial count.
fn run_with_retry<E: Evaluator>(
    evaluator: &mut E,
    req: &TrialRequest,
) -> Result<crate::types::TrialOutcome, EvalError> {
    let mut last_err = None;
    for _ in 0..=TRIAL_RETRY_BUDGET {
        match evaluator.run_trial(req) {
            Ok(outcome) => return Ok(outcome),
            Err(err) => last_err = Some(err),
        }
    }
    // Loop ran at least once, so an error is always present here
    Err(last_err.unwrap_or_else(|| EvalError::Diverged("empty retry loop".into())))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::types::TrialOutcome;

    fn fixtures(name: &str) -> (SearchCtx, RecordSink, StdRng, Settings, Vec<f64>) {
        let ctx = SearchCtx::new();
        let dir = std::env::temp_dir().join(format!("pidcrawl-agg-{name}-{}", std::process::id()));
        let sink = RecordSink::new(dir.join("highest_gain.txt")).unwrap();
        let rng = StdRng::seed_from_u64(0);
        let settings = Settings {
            randomize_nodes: false,
            randomize_duration: false,
            ..Settings::default()
        };
        let distribution = vec![1.0; settings.node_count];
        (ctx, sink, rng, settings, distribution)
    }

    #[test]
    fn test_averages_are_arithmetic_means() {
        let (mut ctx, mut sink, mut rng, mut settings, distribution) = fixtures("means");
        settings.trials_per_candidate = 4;

        // Deterministic sequence of trial outputs
        let mut accs = [0.1, 0.2, 0.3, 0.4].into_iter();
        let mut stub = |_req: &TrialRequest| {
            let acc = accs.next().unwrap();
            Ok(TrialOutcome {
                accuracy: acc,
                apy: 2.0 * acc,
                reward: 10.0 * acc,
                stake_ratio: 0.5,
                apr: -1.0,
            })
        };

        let outcome = evaluate_candidate(
            &mut ctx,
            &mut stub,
            &mut sink,
            &mut rng,
            GainTriple::default(),
            &distribution,
            &settings,
        )
        .unwrap();

        assert!((outcome.avg_accuracy - 0.25).abs() < 1e-12);
        assert!((outcome.avg_apy - 0.5).abs() < 1e-12);
        assert!((outcome.avg_reward - 2.5).abs() < 1e-12);
        assert!((outcome.avg_stake_ratio - 0.5).abs() < 1e-12);
        // Negative mean rate: never a record
        assert!(!outcome.new_record);
    }

    #[test]
    fn test_on_target_improvement_records_first_call() {
        let (mut ctx, mut sink, mut rng, settings, distribution) = fixtures("first-record");

        // accuracy 0.5 > baseline 0.2, rate exactly on target
        let mut stub = |_req: &TrialRequest| {
            Ok(TrialOutcome {
                accuracy: 0.5,
                apr: 0.12,
                ..Default::default()
            })
        };

        let gains = GainTriple::new(1.0, 2.0, 3.0);
        let outcome = evaluate_candidate(
            &mut ctx, &mut stub, &mut sink, &mut rng, gains, &distribution, &settings,
        )
        .unwrap();

        assert!(outcome.new_record);
        assert_eq!(ctx.gains, gains);
        assert_eq!(ctx.best.accuracy, 0.5);
        // Mean of ten identical 0.12 rates lands within float noise of target
        assert!(ctx.best.target_diff.abs() < 1e-12);
        assert!(std::fs::read_to_string(sink.path()).unwrap().contains("kp: 1"));
    }

    #[test]
    fn test_off_target_accuracy_gain_rejected() {
        let (mut ctx, mut sink, mut rng, settings, distribution) = fixtures("off-target");

        // Big accuracy win, but rate drifted past the 0.08 band
        let mut stub = |_req: &TrialRequest| {
            Ok(TrialOutcome {
                accuracy: 0.9,
                apr: 0.25,
                ..Default::default()
            })
        };

        let outcome = evaluate_candidate(
            &mut ctx,
            &mut stub,
            &mut sink,
            &mut rng,
            GainTriple::default(),
            &distribution,
            &settings,
        )
        .unwrap();

        assert!(!outcome.new_record);
        assert_eq!(ctx.best.accuracy, 0.2);
    }

    #[test]
    fn test_acceptance_is_monotonic() {
        let (mut ctx, mut sink, mut rng, settings, distribution) = fixtures("monotonic");

        let record_at = |acc: f64| {
            move |_req: &TrialRequest| {
                Ok(TrialOutcome {
                    accuracy: acc,
                    apr: 0.12,
                    ..Default::default()
                })
            }
        };

        let mut improving = record_at(0.5);
        let outcome = evaluate_candidate(
            &mut ctx,
            &mut improving,
            &mut sink,
            &mut rng,
            GainTriple::default(),
            &distribution,
            &settings,
        )
        .unwrap();
        assert!(outcome.new_record);

        // Equal accuracy is rejected once, and stays rejected
        for _ in 0..3 {
            let mut flat = record_at(0.5);
            let outcome = evaluate_candidate(
                &mut ctx,
                &mut flat,
                &mut sink,
                &mut rng,
                GainTriple::default(),
                &distribution,
                &settings,
            )
            .unwrap();
            assert!(!outcome.new_record);
            assert_eq!(ctx.best.accuracy, 0.5);
        }
    }

    #[test]
    fn test_trials_carry_primary_controller_gains() {
        let (mut ctx, mut sink, mut rng, mut settings, distribution) = fixtures("primary-gains");
        settings.reference_kp = -0.5;

        // Searched gains vary per candidate; the primary triple is fixed
        // configuration and must reach every trial untouched
        let mut stub = |req: &TrialRequest| {
            assert_eq!(req.reference_kp, -0.5);
            assert_eq!(req.reference_ki, crate::types::consts::REFERENCE_KI);
            assert_eq!(req.reference_kd, crate::types::consts::REFERENCE_KD);
            assert_eq!(req.kp, 1.0);
            Ok(TrialOutcome {
                accuracy: 0.0,
                apr: -1.0,
                ..Default::default()
            })
        };

        evaluate_candidate(
            &mut ctx,
            &mut stub,
            &mut sink,
            &mut rng,
            GainTriple::new(1.0, 2.0, 3.0),
            &distribution,
            &settings,
        )
        .unwrap();
    }

    #[test]
    fn test_failed_trial_is_retried_not_averaged_over() {
        let (mut ctx, mut sink, mut rng, mut settings, distribution) = fixtures("retry");
        settings.trials_per_candidate = 2;

        // First attempt fails, retry succeeds; both trials still counted
        let mut calls = 0;
        let mut flaky = |_req: &TrialRequest| {
            calls += 1;
            if calls == 1 {
                Err(EvalError::Diverged("transient".into()))
            } else {
                Ok(TrialOutcome {
                    accuracy: 0.3,
                    apr: -1.0,
                    ..Default::default()
                })
            }
        };

        let outcome = evaluate_candidate(
            &mut ctx,
            &mut flaky,
            &mut sink,
            &mut rng,
            GainTriple::default(),
            &distribution,
            &settings,
        )
        .unwrap();

        assert_eq!(calls, 3);
        assert!((outcome.avg_accuracy - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_exhausted_retry_budget_propagates() {
        let (mut ctx, mut sink, mut rng, settings, distribution) = fixtures("budget");

        let mut broken =
            |_req: &TrialRequest| Err(EvalError::Diverged("permanently broken".into()));

        let result = evaluate_candidate(
            &mut ctx,
            &mut broken,
            &mut sink,
            &mut rng,
            GainTriple::default(),
            &distribution,
            &settings,
        );

        assert!(matches!(result, Err(EvalError::Diverged(_))));
        // No partial state mutation
        assert_eq!(ctx.best.accuracy, 0.2);
    }
}
