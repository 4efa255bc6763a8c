//! Live crawl progress for the terminal.
//!
//! One rewritten line per candidate evaluation: pass position, a sparkline
//! of the best accuracy so far, and the latest candidate summary. A colored
//! final summary prints when the search stops.

use owo_colors::OwoColorize;

use crate::search::outer::SearchCtx;
use crate::types::Dimension;

/// Live per-candidate progress display.
pub struct LiveProgress {
    accuracy_history: Vec<f64>,
    candidates_seen: usize,
    records: usize,
    passes: usize,
}

impl LiveProgress {
    pub fn new() -> Self {
        Self {
            accuracy_history: Vec::new(),
            candidates_seen: 0,
            records: 0,
            passes: 0,
        }
    }

    /// Record one candidate evaluation.
    pub fn record(&mut self, best_accuracy: f64, new_record: bool) {
        self.accuracy_history.push(best_accuracy);
        self.candidates_seen += 1;
        if new_record {
            self.records += 1;
        }
    }

    pub fn begin_pass(&mut self) {
        self.passes += 1;
    }

    /// Render a sparkline of accuracy samples on an absolute 0..=1 scale.
    ///
    /// Accuracy is bounded, so a fixed scale keeps the same value at the
    /// same glyph across passes and runs; short histories leave trailing
    /// blanks, long ones are downsampled.
    fn sparkline(values: &[f64], width: usize) -> String {
        const GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

        let mut line = String::new();
        for i in 0..width {
            let idx = if values.len() <= width {
                if i >= values.len() {
                    line.push(' ');
                    continue;
                }
                i
            } else {
                i * values.len() / width
            };
            let level = values[idx].clamp(0.0, 1.0);
            line.push(GLYPHS[((level * 7.0).round() as usize).min(7)]);
        }
        line
    }

    /// Rewrite the live line for the current candidate.
    pub fn display(&self, dim: Dimension, idx: usize, total: usize, summary: &str) {
        let best = self.accuracy_history.last().copied().unwrap_or(0.0);
        let spark = Self::sparkline(&self.accuracy_history, 20);

        // Keep the line inside one terminal row
        let summary: String = summary.chars().take(90).collect();
        print!(
            "\x1b[2K\r{dim} {idx}/{total} best[{spark}]{best:.4} {summary}",
        );

        use std::io::Write;
        std::io::stdout().flush().ok();
    }

    /// Print the final summary with full sparkline.
    pub fn final_summary(&self, ctx: &SearchCtx) {
        println!("\n");
        println!("{}", " SEARCH STOPPED ".bold().on_green());
        println!();

        println!(
            "  {}: {:.4}  (apr {:.4}, target diff {:.4}, stake ratio {:.4})",
            "Best accuracy".bold(),
            ctx.best.accuracy,
            ctx.best.annualized_rate,
            ctx.best.target_diff,
            ctx.best.stake_ratio,
        );
        println!("  {}: {}", "Best gains".bold(), ctx.best.gains);

        if !self.accuracy_history.is_empty() {
            let first = self.accuracy_history.first().copied().unwrap_or(0.0);
            let last = self.accuracy_history.last().copied().unwrap_or(0.0);
            let delta = last - first;
            let delta_str = if delta > 0.0 {
                format!("{delta:+.4}").green().to_string()
            } else {
                format!("{delta:+.4}").dimmed().to_string()
            };
            println!(
                "  {}: {first:.4} → {last:.4}  ({delta_str})",
                "Accuracy".bold()
            );
            println!(
                "            [{}]",
                Self::sparkline(&self.accuracy_history, 40).cyan()
            );
        }

        println!(
            "  {}: {} candidates, {} records, {} passes",
            "Explored".bold(),
            self.candidates_seen,
            self.records,
            self.passes,
        );
        println!();
    }
}

impl Default for LiveProgress {
    fn default() -> Self {
        Self::new()
    }
}
