//! Perft runner: per-move node counts, totals and throughput, or the reference suite.
//!
//! Usage: cargo run --release --bin perft -- --depth 6 --parallel
//!        cargo run --release --bin perft -- --suite --depth 4

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use color_eyre::eyre::{bail, Result};

use magic_movegen::board::{Board, STARTING_FEN};
use magic_movegen::perft::{divide, run_suite, PerftOptions};
use magic_movegen::table_file;
use magic_movegen::tables::Tables;

#[derive(Parser, Debug)]
#[command(name = "perft")]
#[command(about = "Count the leaf nodes of the legal move tree")]
struct Args {
    /// Position to count from
    #[arg(long, default_value = STARTING_FEN)]
    fen: String,

    /// Depth in plies (the maximum depth when running the suite)
    #[arg(short, long, default_value_t = 5)]
    depth: u8,

    /// Disable the transposition cache
    #[arg(long)]
    no_cache: bool,

    /// Cache size in megabytes (default: sized from the depth)
    #[arg(long)]
    cache_mb: Option<usize>,

    /// Count root moves in parallel
    #[arg(long)]
    parallel: bool,

    /// Load slider tables from this file instead of searching magics
    #[arg(long)]
    tables: Option<PathBuf>,

    /// Run the reference positions and fail on any mismatch
    #[arg(long)]
    suite: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let start = Instant::now();
    let tables = match &args.tables {
        Some(path) => table_file::load(path)?,
        None => Tables::build()?,
    };
    println!("Tables ready in {:.3}s", start.elapsed().as_secs_f64());

    let options = PerftOptions {
        use_cache: !args.no_cache,
        cache_mb: args.cache_mb,
        parallel: args.parallel,
    };

    if args.suite {
        let results = run_suite(&tables, args.depth, &options)?;
        for result in &results {
            println!("{}", result);
        }
        let failed = results.iter().filter(|r| !r.passed()).count();
        if failed > 0 {
            bail!("{} of {} perft checks failed", failed, results.len());
        }
        println!("\nAll {} perft checks passed", results.len());
        return Ok(());
    }

    let board = Board::from_fen(&args.fen)?;
    println!("{}", board);
    println!("Perft depth {}\n", args.depth);

    let report = divide(&tables, &board, args.depth, &options);
    println!("{}", report);
    if options.use_cache {
        println!(
            "Cache: {} hits, {} misses",
            report.cache_hits, report.cache_misses
        );
    }
    Ok(())
}
