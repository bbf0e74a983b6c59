use std::time::{Duration, Instant};

use anyhow::Context;
use chickenstack::config::Config;
use chickenstack::io::ConsoleIo;
use chickenstack::parser::parse_program_with_max_loop_depth;
use chickenstack::vm::{format_stack, run_with_stats, Machine, OpStats, RunResult};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

const DEMOS: &[(&str, &str)] = &[
    ("(10 + 20) * 2", "10 20 + 2 * ."),
    ("print HELLO", "72 \" 69 \" 76 \" 76 \" 79 \" 10 \""),
    ("count down from 5", "5 [ : . 1 - ]"),
];

/// Run a ChickenStack program.
///
/// Without a file, runs a few built-in demo programs.
/// Limits not given on the command line are read from the `CHICKENSTACK_*`
/// environment variables.
#[derive(Parser, Debug)]
#[command()]
struct Args {
    /// File containing a ChickenStack program.
    #[arg()]
    file: Option<String>,
    /// Maximum stack size.
    #[arg(long, short = 'm')]
    max_stack_size: Option<usize>,
    /// A limit for the number of executed instructions.
    /// If the limit is reached, the program will be stopped with an error.
    #[arg(long, short = 'l', value_parser = clap::value_parser!(u64).range(1..))]
    max_iterations: Option<u64>,
    /// Maximum nesting depth of loops.
    #[arg(long, short = 'd')]
    max_loop_depth: Option<usize>,
    /// Print statistics after running the program.
    #[arg(long, short = 's')]
    stats: bool,
}

/// Logs go to stderr, `RUST_LOG` overrides the default `warn` filter.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();
}

fn config_from(args: &Args) -> anyhow::Result<Config> {
    let mut config = Config::from_env()?;
    if let Some(max_stack_size) = args.max_stack_size {
        config.max_stack_size = max_stack_size;
    }
    if let Some(max_iterations) = args.max_iterations {
        config.max_iterations = max_iterations;
    }
    if let Some(max_loop_depth) = args.max_loop_depth {
        config.max_loop_depth = max_loop_depth;
    }
    Ok(config)
}

fn run_program(source: &str, config: &Config, stats: bool) -> anyhow::Result<()> {
    let program = parse_program_with_max_loop_depth(source, config.max_loop_depth)?;
    let mut machine = Machine::new(config.vm_options());
    let mut io = ConsoleIo::stdio();

    let start_time = Instant::now();
    let result = run_with_stats(&program, &mut machine, &mut io, OpStats::default())?;
    let elapsed = start_time.elapsed();
    info!(instructions = result.instruction_counter, ?elapsed, "run finished");

    eprintln!();
    eprintln!("Final stack: {}", format_stack(&result.stack));
    if stats {
        print_stats(&result, elapsed);
    }
    Ok(())
}

/// Runs every demo, reporting failures without stopping. Returns the number of failed demos.
fn run_demos(demos: &[(&str, &str)], config: &Config, stats: bool) -> usize {
    let mut failed = 0;
    for (i, (title, source)) in demos.iter().enumerate() {
        println!();
        println!("Demo {}: {title}", i + 1);
        println!("Code: {source}");
        if let Err(err) = run_program(source, config, stats) {
            eprintln!("Error: {err:#}");
            failed += 1;
        }
    }
    failed
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();
    let config = config_from(&args)?;

    match &args.file {
        Some(file) => {
            let source = std::fs::read_to_string(file).with_context(|| format!("Failed to read {file}"))?;
            run_program(&source, &config, args.stats)?;
        }
        None => {
            println!("ChickenStack demo");
            let failed = run_demos(DEMOS, &config, args.stats);
            if failed > 0 {
                anyhow::bail!("{failed} of {} demos failed", DEMOS.len());
            }
        }
    }

    Ok(())
}

fn print_stats(result: &RunResult<OpStats>, elapsed: Duration) {
    let instructions_per_second = result.instruction_counter as f64 / elapsed.as_secs_f64();
    eprintln!("Execution time: {:?}", elapsed);
    eprintln!(
        "Instructions executed: {} ({}/s)",
        result.instruction_counter,
        match instructions_per_second {
            n if n >= 1_000_000.0 => format!("{:.1}M", n / 1_000_000.0),
            n if n >= 1_000.0 => format!("{:.1}k", n / 1_000.0),
            n => format!("{:.1}", n),
        }
    );
    eprintln!("Loop jumps: {}", result.tracer.loop_jumps);
    for (name, count) in &result.tracer.counts {
        eprintln!("  {name}: {count}");
    }
}
