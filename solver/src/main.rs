use std::fs;
use std::num::NonZero;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use itertools::Itertools;
use linksat::oracle::{DimacsOracle, Oracle, VarisatOracle};
use linksat::{solve, Grid, Outcome, SolverConfig, Strategy};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Solve a Numberlink puzzle by reduction to SAT.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Puzzle file: one row per line, cells separated by commas, `.` for empty cells.
    #[arg(value_name = "FILE")]
    puzzle: PathBuf,

    /// `occupancy`, `direction`, or `escalating`.
    #[arg(short, long, default_value_t = Strategy::Escalating)]
    strategy: Strategy,

    /// External DIMACS solver to run instead of the built-in one.
    #[arg(long, value_name = "PROGRAM")]
    oracle: Option<String>,

    /// Argument passed to the external solver before the formula path. Repeatable.
    #[arg(long = "oracle-arg", value_name = "ARG", allow_hyphen_values = true)]
    oracle_args: Vec<String>,

    /// Save every formula queried under this directory.
    #[arg(long, value_name = "DIR")]
    dump_dir: Option<PathBuf>,

    #[arg(long, value_name = "N")]
    max_iterations: Option<NonZero<usize>>,

    /// Also print the path-id of every cell.
    #[arg(short, long)]
    numbered: bool,

    /// Print puzzle and formula statistics.
    #[arg(short, long)]
    info: bool,

    /// Raise log verbosity; repeat for more.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let text = fs::read_to_string(&cli.puzzle)
        .with_context(|| format!("cannot read {}", cli.puzzle.display()))?;
    let grid: Grid = text.parse()
        .with_context(|| format!("invalid puzzle {}", cli.puzzle.display()))?;
    info!(puzzle = %cli.puzzle.display(), width = grid.width(), height = grid.height(), paths = grid.num_paths(), "loaded puzzle");

    let name = cli.puzzle
        .file_stem()
        .map_or_else(|| "instance".to_string(), |stem| stem.to_string_lossy().into_owned());
    if let Some(dir) = &cli.dump_dir {
        fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
    }
    let config = SolverConfig::default()
        .with_strategy(cli.strategy)
        .with_max_iterations(cli.max_iterations)
        .with_dump_dir(cli.dump_dir.clone())
        .with_name(name);

    let oracle: Box<dyn Oracle> = match &cli.oracle {
        Some(program) => Box::new(DimacsOracle::new(program.as_str()).with_args(&cli.oracle_args)),
        None => Box::new(VarisatOracle),
    };

    if cli.info {
        eprintln!("{} x {} grid, {} paths", grid.width(), grid.height(), grid.num_paths());
    }

    let (outcome, report) = solve(&grid, oracle, config)?;

    if cli.info {
        for (index, iteration) in report.iterations.iter().enumerate() {
            eprintln!(
                "#{} {}: {} variables, {} clauses ({} blocking), {} in {:.3}s, {} loops",
                index + 1,
                iteration.theory,
                iteration.variables,
                iteration.clauses,
                iteration.blocking,
                if iteration.satisfiable { "sat" } else { "unsat" },
                iteration.elapsed.as_secs_f64(),
                iteration.cycles,
            );
        }
        let oracle_time: Duration = report.iterations.iter().map(|iteration| iteration.elapsed).sum();
        eprintln!("strategy {}, finished under {}{}", report.strategy, report.theory, if report.escalated { " after escalating" } else { "" });
        eprintln!("oracle time {:.3}s", oracle_time.as_secs_f64());
    }

    match outcome {
        Outcome::Solved(solution) => {
            print!("{solution}");
            if cli.numbered {
                println!();
                for row in solution.numbered_rows() {
                    println!("{}", row.iter().join(","));
                }
            }
        }
        Outcome::Unsolvable => println!("no solution"),
    }

    Ok(())
}
