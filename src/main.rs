//! pidcrawl CLI - the gain-tuning daemon.
//!
//! Wires the search core to the built-in lottery simulation, a ctrl-c
//! cancellation token, the best-record sink, and live progress. Runs until
//! stopped; records survive on disk across runs of the process.
//!
//! Examples:
//!   pidcrawl                          # tune with reference defaults
//!   pidcrawl -p --fixed-nodes         # high precision, fixed population
//!   pidcrawl --trials 5 --seed 42     # cheaper, reproducible trials

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use owo_colors::OwoColorize;

use pidcrawl::search::outer;
use pidcrawl::{CancelToken, LiveProgress, LotterySim, RecordSink, SearchCtx, Settings};

/// Adaptive coordinate-wise PID gain search for a staking-reward controller.
///
/// Crawls kp, ki, kd in turn, averaging stochastic lottery trials per
/// candidate and keeping the best on-target result. Runs until ctrl-c.
#[derive(Parser, Debug)]
#[command(name = "pidcrawl")]
#[command(version)]
#[command(about, long_about = None)]
struct Cli {
    /// Settings file (default: ./pidcrawl.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Compensated summation in the simulator
    #[arg(short = 'p', long)]
    high_precision: bool,

    /// Use the full node count for every trial instead of randomizing it
    #[arg(long)]
    fixed_nodes: bool,

    /// Simulate the full run length for every trial instead of randomizing it
    #[arg(long)]
    fixed_duration: bool,

    /// Print per-candidate skip diagnostics
    #[arg(short, long)]
    debug: bool,

    /// Trials averaged per candidate
    #[arg(long)]
    trials: Option<usize>,

    /// Where to write the best-record line
    #[arg(long)]
    record: Option<PathBuf>,

    /// RNG seed (random when omitted)
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => Settings::load_file(path)
            .with_context(|| format!("cannot load settings from {}", path.display()))?,
        None => Settings::load(std::path::Path::new(".")),
    };

    // CLI flags override the file
    settings.high_precision |= cli.high_precision;
    settings.debug |= cli.debug;
    if cli.fixed_nodes {
        settings.randomize_nodes = false;
    }
    if cli.fixed_duration {
        settings.randomize_duration = false;
    }
    if let Some(trials) = cli.trials {
        settings.trials_per_candidate = trials;
    }
    if let Some(record) = cli.record {
        settings.record_path = record;
    }

    let seed = cli.seed.unwrap_or_else(rand::random);

    println!();
    println!("{}", " PIDCRAWL GAIN SEARCH ".bold().on_magenta());
    println!();
    println!("Configuration:");
    println!("  Target rate:     {}", settings.target_rate);
    println!("  Rate tolerance:  {}", settings.rate_tolerance);
    println!("  Trials/candidate:{}", settings.trials_per_candidate);
    println!("  Nodes:           {}", settings.node_count);
    println!("  Run slots:       {}", settings.run_slots);
    println!("  High precision:  {}", settings.high_precision);
    println!("  Randomize nodes: {}", settings.randomize_nodes);
    println!("  Randomize slots: {}", settings.randomize_duration);
    println!("  Record path:     {}", settings.record_path.display());
    println!("  Seed:            {seed}");
    println!();

    let mut sink = RecordSink::new(settings.record_path.clone()).with_context(|| {
        format!(
            "cannot prepare record sink at {}",
            settings.record_path.display()
        )
    })?;

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nstopping after the current candidate...");
        handler_token.cancel();
    })
    .context("cannot install ctrl-c handler")?;

    let mut ctx = SearchCtx::new();
    let mut evaluator = LotterySim::new(seed.wrapping_add(1));
    let mut progress = LiveProgress::new();

    println!("{}", "─".repeat(65));
    println!("Searching (ctrl-c to stop)...\n");

    let result = outer::run(
        &mut ctx,
        &mut evaluator,
        &mut sink,
        &mut progress,
        &settings,
        seed,
        &cancel,
    );

    progress.final_summary(&ctx);

    match result {
        Ok(()) => Ok(()),
        // Durable best-record state already written remains valid
        Err(err) => Err(err).context("search aborted"),
    }
}
