//! Runtime settings, loadable from `pidcrawl.toml`.
//!
//! Every field has a reference default; a settings file only needs the keys
//! it overrides. CLI flags override the file (see `main.rs`).
//!
//! ## Example
//!
//! ```toml
//! trials-per-candidate = 10
//! target-rate = 0.12
//! rate-tolerance = 0.08
//! node-count = 100
//! run-slots = 5000
//! randomize-nodes = true
//! record-path = "log/highest_gain.txt"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::consts;

/// Everything the search loop and evaluator need at runtime.
///
/// The core search logic never interprets the precision/randomization
/// flags; they only shape the trial requests handed to the evaluator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    /// Stochastic trials averaged per candidate.
    pub trials_per_candidate: usize,
    /// Annualized rate the controller should track.
    pub target_rate: f64,
    /// Acceptance band around the target rate.
    pub rate_tolerance: f64,
    /// Population size (and distribution length).
    pub node_count: usize,
    /// Token supply spread across the population.
    pub total_supply: f64,
    /// Slots per trial.
    pub run_slots: usize,
    /// Fixed primary-controller gains applied to every trial; the search
    /// only ever tunes the secondary reward controller.
    pub reference_kp: f64,
    pub reference_ki: f64,
    pub reference_kd: f64,
    /// Compensated summation in the simulator.
    pub high_precision: bool,
    /// Randomize the per-trial node count in 5..=node_count.
    pub randomize_nodes: bool,
    /// Randomize the effective run length per trial.
    pub randomize_duration: bool,
    /// Print per-candidate skip diagnostics.
    pub debug: bool,
    /// Where the best-record line is written.
    pub record_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            trials_per_candidate: consts::TRIALS_PER_CANDIDATE,
            target_rate: consts::TARGET_RATE,
            rate_tolerance: consts::RATE_TOLERANCE,
            node_count: consts::NODE_COUNT,
            total_supply: consts::TOTAL_SUPPLY,
            run_slots: consts::RUN_SLOTS,
            reference_kp: consts::REFERENCE_KP,
            reference_ki: consts::REFERENCE_KI,
            reference_kd: consts::REFERENCE_KD,
            high_precision: false,
            randomize_nodes: true,
            randomize_duration: true,
            debug: false,
            record_path: PathBuf::from("log/highest_gain.txt"),
        }
    }
}

impl Settings {
    /// Load settings from a directory.
    ///
    /// Reads `pidcrawl.toml` if present, otherwise returns defaults.
    /// A malformed file is reported and ignored rather than fatal.
    pub fn load(directory: &Path) -> Self {
        let path = directory.join("pidcrawl.toml");
        if path.exists() {
            if let Some(settings) = Self::load_file(&path) {
                return settings;
            }
        }
        Self::default()
    }

    /// Load settings from an explicit file path.
    pub fn load_file(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match toml::from_str(&content) {
            Ok(settings) => Some(settings),
            Err(err) => {
                eprintln!("warning: ignoring {}: {err}", path.display());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_tuning() {
        let settings = Settings::default();
        assert_eq!(settings.trials_per_candidate, 10);
        assert_eq!(settings.target_rate, 0.12);
        assert_eq!(settings.rate_tolerance, 0.08);
        assert_eq!(settings.node_count, 100);
        assert_eq!(settings.run_slots, 5000);
        assert_eq!(settings.reference_kp, -0.010399999999938556);
        assert_eq!(settings.reference_kd, 0.03840000000000491);
        assert!(settings.randomize_nodes);
        assert!(!settings.high_precision);
    }

    #[test]
    fn test_partial_toml_overrides() {
        let settings: Settings = toml::from_str(
            r#"
            trials-per-candidate = 3
            target-rate = 0.2
            randomize-nodes = false
            "#,
        )
        .unwrap();

        assert_eq!(settings.trials_per_candidate, 3);
        assert_eq!(settings.target_rate, 0.2);
        assert!(!settings.randomize_nodes);
        // Untouched keys keep their defaults
        assert_eq!(settings.rate_tolerance, 0.08);
        assert_eq!(settings.record_path, PathBuf::from("log/highest_gain.txt"));
    }
}
