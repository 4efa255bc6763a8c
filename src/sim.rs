//! Built-in discrete-controller staking lottery simulation.
//!
//! A compact stand-in for the full research simulator, with enough real
//! dynamics to give the tuner a noisy, gain-sensitive objective:
//!
//! 1. Every node stakes a random fraction of its holdings, re-drawn each
//!    epoch (its "strategy").
//! 2. The primary discrete velocity-form PID, running the fixed reference
//!    gains, tracks the staked-ratio target by steering the lottery
//!    winning frequency `f`.
//! 3. The secondary PID, running the searched gain triple, steers the slot
//!    reward so the running annualized rate tracks the rate target.
//! 4. Each slot every node enters a lottery weighted by its stake; the
//!    expected leader count per slot equals `f`. Exactly one leader mints
//!    the slot reward.
//! 5. Accuracy is the share of slots with a unique leader; APR annualizes
//!    the issued rewards over the mean staked base. Minted rewards feed
//!    back into holdings, coupling the two loops.
//!
//! The tuner treats all of this as a black box behind [`Evaluator`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::eval::{ControllerKind, EvalError, Evaluator, TrialRequest};
use crate::types::{consts, TrialOutcome};

/// Winning-frequency clamp.
const F_MIN: f64 = 0.0001;
const F_MAX: f64 = 0.9999;
/// Per-slot reward clamp.
const REWARD_MIN: f64 = 1.0;
const REWARD_MAX: f64 = 1000.0;
/// Slots per staking strategy epoch.
const EPOCH_SLOTS: usize = 10;
/// 90-second slots.
const SLOTS_PER_YEAR: f64 = 365.25 * 24.0 * 60.0 * 60.0 / 90.0;

/// Stochastic staking lottery with a primary PID on the winning frequency
/// and a secondary PID on the slot reward.
pub struct LotterySim {
    rng: StdRng,
}

impl LotterySim {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Evaluator for LotterySim {
    fn run_trial(&mut self, req: &TrialRequest) -> Result<TrialOutcome, EvalError> {
        if req.controller != ControllerKind::Discrete {
            return Err(EvalError::UnsupportedController(req.controller));
        }
        let n = req.node_count.max(1);
        if req.distribution.len() < n {
            return Err(EvalError::ShortDistribution {
                got: req.distribution.len(),
                need: n,
            });
        }

        let rng = &mut self.rng;
        let slots = if req.randomize_duration && req.run_slots > EPOCH_SLOTS {
            rng.gen_range(EPOCH_SLOTS..=req.run_slots)
        } else {
            req.run_slots.max(1)
        };

        let mut holdings: Vec<f64> = req.distribution[..n].to_vec();
        let supply: f64 = holdings.iter().sum();
        if supply <= 0.0 {
            return Err(EvalError::Diverged(format!(
                "zero circulating supply across {n} nodes"
            )));
        }
        let mut circulating = supply;

        // Per-node staking strategy: random fraction, re-drawn each epoch
        let mut staked_frac: Vec<f64> = (0..n).map(|_| rng.gen::<f64>()).collect();

        // Primary velocity-form PID on the winning frequency (fixed
        // reference gains)
        let mut f = 0.5f64;
        let (mut fe1, mut fe2) = (0.0f64, 0.0f64);

        // Secondary velocity-form PID on the slot reward (searched gains)
        let mut reward = 0.5 * (REWARD_MIN + REWARD_MAX);
        let (mut re1, mut re2) = (0.0f64, 0.0f64);

        let mut issued = 0.0f64;
        let mut kahan_c = 0.0f64;
        let mut unique_leads = 0usize;
        let mut stake_ratio_sum = 0.0f64;

        for slot in 0..slots {
            if slot > 0 && slot % EPOCH_SLOTS == 0 {
                for frac in staked_frac.iter_mut() {
                    *frac = rng.gen();
                }
            }

            let staked: f64 = holdings
                .iter()
                .zip(&staked_frac)
                .map(|(h, frac)| h * frac)
                .sum();
            let stake_ratio = staked / circulating;
            stake_ratio_sum += stake_ratio;

            let err = consts::STAKE_TARGET - stake_ratio;
            f += req.reference_kp * (err - fe1)
                + req.reference_ki * err
                + req.reference_kd * (err - 2.0 * fe1 + fe2);
            fe2 = fe1;
            fe1 = err;
            if !f.is_finite() {
                return Err(EvalError::Diverged(format!(
                    "winning frequency diverged at slot {slot} for kp: {}, ki: {}, kd: {}",
                    req.kp, req.ki, req.kd
                )));
            }
            f = f.clamp(F_MIN, F_MAX);

            // Running annualized rate over the mean staked base so far
            let elapsed = (slot + 1) as f64;
            let staked_base = supply * (stake_ratio_sum / elapsed);
            let rate = if staked_base > 0.0 {
                issued / staked_base / (elapsed / SLOTS_PER_YEAR)
            } else {
                0.0
            };
            let rerr = consts::TARGET_RATE - rate;
            reward += req.kp * (rerr - re1) + req.ki * rerr + req.kd * (rerr - 2.0 * re1 + re2);
            re2 = re1;
            re1 = rerr;
            if !reward.is_finite() {
                return Err(EvalError::Diverged(format!(
                    "reward output diverged at slot {slot} for kp: {}, ki: {}, kd: {}",
                    req.kp, req.ki, req.kd
                )));
            }
            reward = reward.clamp(REWARD_MIN, REWARD_MAX);

            if staked <= 0.0 {
                continue;
            }

            // Stake-weighted lottery; expected leaders per slot equals f
            let mut leads = 0usize;
            let mut winner = 0usize;
            for (i, (h, frac)) in holdings.iter().zip(&staked_frac).enumerate() {
                let p = (f * h * frac / staked).clamp(0.0, 1.0);
                if rng.gen::<f64>() < p {
                    leads += 1;
                    winner = i;
                }
            }

            if leads == 1 {
                unique_leads += 1;
                holdings[winner] += reward;
                circulating += reward;
                if req.high_precision {
                    // Kahan compensated summation
                    let y = reward - kahan_c;
                    let t = issued + y;
                    kahan_c = (t - issued) - y;
                    issued = t;
                } else {
                    issued += reward;
                }
            }
        }

        let slots_f = slots as f64;
        let accuracy = unique_leads as f64 / slots_f;
        let stake_ratio = stake_ratio_sum / slots_f;
        let years = slots_f / SLOTS_PER_YEAR;
        let staked_base = supply * stake_ratio;
        let apr = if staked_base > 0.0 {
            issued / staked_base / years
        } else {
            0.0
        };
        // Monthly compounding of the annualized rate
        let apy = (1.0 + apr / 12.0).powi(12) - 1.0;

        let outcome = TrialOutcome {
            accuracy,
            apy,
            reward: issued,
            stake_ratio,
            apr,
        };
        for (metric, value) in [
            ("accuracy", outcome.accuracy),
            ("apy", outcome.apy),
            ("reward", outcome.reward),
            ("stake_ratio", outcome.stake_ratio),
            ("apr", outcome.apr),
        ] {
            if !value.is_finite() {
                return Err(EvalError::NonFinite {
                    metric,
                    kp: req.kp,
                    ki: req.ki,
                    kd: req.kd,
                });
            }
        }
        Ok(outcome)
    }
}
