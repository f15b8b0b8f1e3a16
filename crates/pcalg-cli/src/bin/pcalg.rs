//! pcalg CLI - estimate a CPDAG from categorical data
//!
//! Usage:
//!   pcalg <file>                             # Binary G² test, alpha 0.01
//!   pcalg <file> --test discrete --levels 3,2,3
//!   pcalg <file> --stable -o json            # Stable PC, JSON output

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, ValueEnum};
use pcalg_core::{
    run_pc, BinaryGSquare, DataMatrix, DiscreteGSquare, GSquareConfig, IndependenceTest,
    MixedEdge, PcResult, SepEntry, SkeletonMethod, SkeletonOptions, SkeletonStats,
    SparsityPolicy,
};
use serde::Serialize;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pcalg")]
#[command(version)]
#[command(about = "PC algorithm for categorical data")]
#[command(long_about = "Estimate a skeleton and CPDAG with the PC algorithm and a G² independence test")]
struct Cli {
    /// Data file: one observation per line, integer codes separated by commas or whitespace
    #[arg(value_name = "FILE")]
    file: String,

    /// Independence test
    #[arg(short, long, value_enum, default_value_t = TestKind::Binary)]
    test: TestKind,

    /// Levels per column for the discrete test (defaults to observed levels).
    /// Rejected with the binary test.
    #[arg(long, value_delimiter = ',', value_name = "L1,L2,...")]
    levels: Option<Vec<usize>>,

    /// Significance level
    #[arg(short, long, default_value_t = 0.01)]
    alpha: f64,

    /// Use the order-independent stable variant
    #[arg(long)]
    stable: bool,

    /// Largest conditioning-set size
    #[arg(long, value_name = "N")]
    max_reach: Option<usize>,

    /// Fail instead of assuming independence when a test lacks samples
    #[arg(long)]
    strict: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Summary)]
    output: OutputFormat,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Checks combinations the individual arguments cannot express.
    fn validate(&self) -> Result<(), clap::Error> {
        if self.levels.is_some() && self.test != TestKind::Discrete {
            return Err(Cli::command().error(
                ErrorKind::ArgumentConflict,
                "--levels only applies to --test discrete",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TestKind {
    Binary,
    Discrete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Summary,
    Json,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = cli.validate() {
        e.exit();
    }
    init_tracing(cli.verbose);

    let source = match std::fs::read_to_string(&cli.file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", cli.file, e);
            process::exit(1);
        }
    };

    let data = match parse_data(&source) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error parsing '{}': {}", cli.file, e);
            process::exit(1);
        }
    };
    tracing::info!(rows = data.n_rows(), cols = data.n_cols(), "data loaded");

    let sparsity = if cli.strict {
        SparsityPolicy::Strict
    } else {
        SparsityPolicy::Lenient
    };
    let test: Box<dyn IndependenceTest> = match cli.test {
        TestKind::Binary => Box::new(BinaryGSquare::new(
            GSquareConfig::binary().with_sparsity(sparsity),
        )),
        TestKind::Discrete => {
            let test = match &cli.levels {
                Some(levels) => DiscreteGSquare::new(levels.clone()),
                None => DiscreteGSquare::from_data(&data),
            };
            Box::new(test.with_config(GSquareConfig::discrete().with_sparsity(sparsity)))
        }
    };

    let options = SkeletonOptions {
        max_reach: cli.max_reach,
        method: if cli.stable {
            SkeletonMethod::Stable
        } else {
            SkeletonMethod::Original
        },
        ..SkeletonOptions::default()
    };

    let result = match run_pc(test.as_ref(), &data, cli.alpha, &options) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error estimating structure: {}", e);
            process::exit(1);
        }
    };

    match cli.output {
        OutputFormat::Json => match serde_json::to_string_pretty(&Report::new(&result)) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing to JSON: {}", e);
                process::exit(1);
            }
        },
        OutputFormat::Summary => print_summary(&cli.file, &data, &result),
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Parses one observation per line. Codes are separated by commas and/or
/// whitespace; `#` starts a comment.
fn parse_data(source: &str) -> Result<DataMatrix, String> {
    let mut rows: Vec<Vec<u32>> = Vec::new();
    for (line_no, line) in source.lines().enumerate() {
        let content = line.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }
        let row = content
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .map(|token| {
                token
                    .parse::<u32>()
                    .map_err(|e| format!("line {}: '{}': {}", line_no + 1, token, e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(row);
    }
    if rows.is_empty() {
        return Err("no observations".to_string());
    }
    DataMatrix::from_rows(&rows).map_err(|e| e.to_string())
}

fn print_summary(file: &str, data: &DataMatrix, result: &PcResult) {
    let stats = &result.skeleton.stats;
    println!(
        "✓ '{}': {} observations of {} variables\n",
        file,
        data.n_rows(),
        data.n_cols()
    );
    println!(
        "Skeleton: {} edges ({} removed, {} tests, depth {})",
        result.skeleton.graph.n_edges(),
        stats.edges_removed,
        stats.tests_run,
        stats
            .max_depth
            .map_or_else(|| "-".to_string(), |d| d.to_string())
    );

    let separated: Vec<_> = result
        .skeleton
        .sep_sets
        .iter()
        .filter(|((i, j), _)| !result.skeleton.graph.has_edge(*i, *j))
        .collect();
    if !separated.is_empty() {
        println!("\nSeparating sets ({}):", separated.len());
        for ((i, j), entry) in separated {
            match entry {
                SepEntry::Set(set) => println!("  {} ⊥ {} | {:?}", i, j, set.as_slice()),
                SepEntry::Unusable => println!("  {} ⊥ {} | (excluded)", i, j),
            }
        }
    }

    println!("\nCPDAG:");
    for edge in result.cpdag.edges() {
        match edge {
            MixedEdge::Directed { from, to } => println!("  {} -> {}", from, to),
            MixedEdge::Undirected { a, b } => println!("  {} -- {}", a, b),
        }
    }
}

/// JSON view of a run.
#[derive(Serialize)]
struct Report {
    variables: usize,
    skeleton: Vec<(usize, usize)>,
    separating_sets: Vec<SeparatingSet>,
    cpdag: Vec<MixedEdge>,
    arcs: Vec<(usize, usize)>,
    stats: SkeletonStats,
}

#[derive(Serialize)]
struct SeparatingSet {
    pair: (usize, usize),
    /// `None` when the pair was excluded up front.
    set: Option<Vec<usize>>,
}

impl Report {
    fn new(result: &PcResult) -> Self {
        let graph = &result.skeleton.graph;
        Self {
            variables: graph.n_nodes(),
            skeleton: graph.edges().collect(),
            separating_sets: result
                .skeleton
                .sep_sets
                .iter()
                .filter(|((i, j), _)| !graph.has_edge(*i, *j))
                .map(|(pair, entry)| SeparatingSet {
                    pair,
                    set: entry.as_set().map(<[usize]>::to_vec),
                })
                .collect(),
            cpdag: result.cpdag.edges().collect(),
            arcs: result.cpdag.arcs().collect(),
            stats: result.skeleton.stats,
        }
    }
}
