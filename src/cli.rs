// Idiomatic Rust CLI for CADS.
//
// Single-command interface mirroring the original tool's flag set: load a
// dataset (JSONL file or `.cads` config with an inline `[packets]`
// section), run the search, print solutions after the workers join, exit 0
// iff at least one solution was found.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};

use crate::config::{CadsFile, SearchConfig};
use crate::dataset::Dataset;
use crate::ops::{ArityClass, Complexity};
use crate::search::progress::{ProgressSnapshot, format_count, format_duration};
use crate::search::{ProgressObserver, Solution, run_search};

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Checksum Algorithm Discovery System.
#[derive(Parser, Debug)]
#[command(
    name = "cads",
    version,
    about = "Discover checksum algorithms from labeled packet examples",
    after_help = "Packet data format (JSON Lines):\n  \
        {\"packet\": \"9c30010000000000\", \"checksum\": \"31\", \"description\": \"CH1\"}"
)]
struct Cli {
    /// Input packet data file (JSON Lines format).
    #[arg(short = 'i', long)]
    input: Option<PathBuf>,

    /// Load configuration (and optionally packets) from a .cads file.
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Operator complexity level.
    #[arg(short = 'c', long, value_enum)]
    complexity: Option<ComplexityArg>,

    /// Maximum fields to combine.
    #[arg(short = 'f', long = "max-fields")]
    max_fields: Option<usize>,

    /// Number of constant values to sweep.
    #[arg(short = 'k', long = "max-constants")]
    max_constants: Option<u64>,

    /// Stop after the first solution (implies --max-solutions 1).
    #[arg(short = 'e', long = "early-exit")]
    early_exit: bool,

    /// Maximum solutions to return (0 = unlimited).
    #[arg(short = 'm', long = "max-solutions")]
    max_solutions: Option<u32>,

    /// Progress update interval in milliseconds.
    #[arg(short = 'p', long = "progress-ms")]
    progress_ms: Option<u64>,

    /// Verbose output.
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Worker thread count.
    #[arg(short = 't', long, conflicts_with = "threading")]
    threads: Option<usize>,

    /// Auto-detect the thread count (one worker per logical core).
    #[arg(short = 'T', long)]
    threading: bool,

    /// Print the search summary as JSON to stderr.
    #[arg(long = "json")]
    json_output: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ComplexityArg {
    Basic,
    Intermediate,
    Advanced,
}

impl From<ComplexityArg> for Complexity {
    fn from(arg: ComplexityArg) -> Complexity {
        match arg {
            ComplexityArg::Basic => Complexity::Basic,
            ComplexityArg::Intermediate => Complexity::Intermediate,
            ComplexityArg::Advanced => Complexity::Advanced,
        }
    }
}

// ---------------------------------------------------------------------------
// Config resolution (explicit CLI flags override file values)
// ---------------------------------------------------------------------------

fn resolve_config(cli: &Cli, mut config: SearchConfig) -> SearchConfig {
    if let Some(complexity) = cli.complexity {
        config.complexity = complexity.into();
    }
    if let Some(max_fields) = cli.max_fields {
        config.max_fields = max_fields;
    }
    if let Some(max_constants) = cli.max_constants {
        config.max_constants = max_constants;
    }
    if cli.early_exit {
        config.early_exit = true;
        config.max_solutions = cli.max_solutions.unwrap_or(1);
    } else if let Some(max_solutions) = cli.max_solutions {
        config.max_solutions = max_solutions;
    }
    if let Some(progress_ms) = cli.progress_ms {
        config.progress_interval_ms = progress_ms;
    }
    if cli.verbose {
        config.verbose = true;
    }
    if cli.threading {
        config.threads = 0;
    } else if let Some(threads) = cli.threads {
        config.threads = threads;
    }
    config
}

// ---------------------------------------------------------------------------
// Terminal progress renderer
// ---------------------------------------------------------------------------

/// Renders tracker snapshots as a single overwritten stderr line. Reads
/// snapshots only; never touches search state.
struct TerminalProgress;

impl ProgressObserver for TerminalProgress {
    fn on_update(&self, snapshot: &ProgressSnapshot) {
        let stalled = snapshot.workers.iter().filter(|w| w.stalled).count();
        let stalled_note = if stalled > 0 {
            format!(" | {stalled} stalled")
        } else {
            String::new()
        };
        let line = format!(
            "Progress: {}/{} ({:.1}%) | Rate: {}/s | Elapsed: {} | ETA: {} | Solutions: {}{}",
            format_count(snapshot.completed as u128),
            format_count(snapshot.total_estimate),
            snapshot.percent,
            format_count(snapshot.rate as u128),
            format_duration(snapshot.elapsed.as_secs_f64()),
            format_duration(snapshot.eta_seconds),
            snapshot.solutions,
            stalled_note,
        );
        eprint!("\r{line:<100}");
        let _ = io::stderr().flush();
    }

    fn on_finish(&self, _snapshot: &ProgressSnapshot) {
        eprintln!();
    }
}

// ---------------------------------------------------------------------------
// Solution printing
// ---------------------------------------------------------------------------

/// Expand a solution into the step-by-step form the original tool printed,
/// following the evaluator's operand sourcing.
fn describe_solution(solution: &Solution) -> Vec<String> {
    let fields = &solution.field_indices;
    let mut steps = Vec::new();
    let mut expr = format!("field[{}]", fields[0]);
    let mut next_field = 1usize;
    for op in &solution.operations {
        match op.arity() {
            ArityClass::Unary => expr = format!("{}({expr})", op.short_name()),
            ArityClass::ConstUsing => {
                expr = format!("{}({expr}, {:#04x})", op.short_name(), solution.constant);
            }
            ArityClass::Binary => {
                if next_field >= fields.len() {
                    break;
                }
                steps.push(format!("step{} = {expr}", steps.len() + 1));
                expr = format!(
                    "step{} {} field[{}]",
                    steps.len(),
                    op.short_name(),
                    fields[next_field]
                );
                next_field += 1;
            }
        }
    }
    steps.push(format!("result = {expr}"));
    steps
}

fn print_solutions(solutions: &[Solution]) {
    for (index, solution) in solutions.iter().enumerate() {
        println!("Solution #{}: {solution}", index + 1);
        for step in describe_solution(solution) {
            println!("    {step}");
        }
    }
}

// ---------------------------------------------------------------------------
// Search command
// ---------------------------------------------------------------------------

fn run_inner(cli: Cli) -> i32 {
    // Configuration file first, then CLI overrides on top.
    let (base_config, file_dataset, config_name) = match &cli.config {
        Some(path) => match CadsFile::load(path) {
            Ok(file) => (file.config, file.dataset, file.name),
            Err(e) => {
                eprintln!("cads: config file: {}: {e}", path.display());
                return 1;
            }
        },
        None => (SearchConfig::default(), None, None),
    };
    let config = resolve_config(&cli, base_config);

    // Dataset: inline [packets] section wins; otherwise a JSONL input file
    // is required.
    let dataset = match (file_dataset, &cli.input) {
        (Some(dataset), _) => dataset,
        (None, Some(path)) => match Dataset::from_jsonl_path(path, config.checksum_size) {
            Ok(dataset) => dataset,
            Err(e) => {
                eprintln!("cads: input file: {}: {e}", path.display());
                return 1;
            }
        },
        (None, None) => {
            eprintln!("cads: no packet data: pass --input <FILE> or a config with [packets]");
            return 1;
        }
    };

    if config.verbose {
        if let Some(name) = &config_name {
            eprintln!("cads: configuration: {name}");
        }
        eprintln!(
            "cads: {} packets, min packet length {} bytes",
            dataset.len(),
            dataset.min_packet_len()
        );
        eprintln!(
            "cads: complexity {}, max fields {}, max constants {}, checksum size {}",
            config.complexity.name(),
            config.max_fields,
            config.max_constants,
            config.checksum_size
        );
    }

    let progress = TerminalProgress;
    let outcome = match run_search(&dataset, &config, Some(&progress)) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("cads: search failed: {e}");
            return 1;
        }
    };

    print_solutions(&outcome.solutions);

    let elapsed = outcome.elapsed.as_secs_f64();
    let rate = if elapsed > 0.0 {
        outcome.tests_performed as f64 / elapsed
    } else {
        0.0
    };
    eprintln!(
        "cads: {} tests in {} ({}/s), {} solution(s){}",
        format_count(outcome.tests_performed as u128),
        format_duration(elapsed),
        format_count(rate as u128),
        outcome.solutions.len(),
        if outcome.early_exit_triggered {
            " [early exit]"
        } else {
            ""
        }
    );

    if cli.json_output {
        let solutions: Vec<_> = outcome
            .solutions
            .iter()
            .map(|s| {
                serde_json::json!({
                    "fields": s.field_indices,
                    "operations": s.operations.iter().map(|op| op.config_name()).collect::<Vec<_>>(),
                    "constant": s.constant,
                    "checksum_size": s.checksum_size,
                    "validated": s.validated,
                })
            })
            .collect();
        let json = serde_json::json!({
            "packets": dataset.len(),
            "tests_performed": outcome.tests_performed,
            "elapsed_seconds": elapsed,
            "completed": outcome.completed,
            "early_exit": outcome.early_exit_triggered,
            "solutions": solutions,
        });
        match serde_json::to_string_pretty(&json) {
            Ok(text) => eprintln!("{text}"),
            Err(e) => eprintln!("cads: json summary: {e}"),
        }
    }

    if outcome.solutions.is_empty() { 1 } else { 0 }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, runs the search.
pub fn run() -> ! {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let cli = Cli::parse();
    process::exit(run_inner(cli));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
