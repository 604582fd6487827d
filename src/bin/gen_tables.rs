//! Search magic multipliers, write the slider tables to a file and check that the
//! file reloads to identical tables.
//!
//! Usage: cargo run --release --bin gen_tables -- --out tables.mmvt

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use color_eyre::eyre::{ensure, Result};

use magic_movegen::magic::Slider;
use magic_movegen::table_file;
use magic_movegen::tables::Tables;

#[derive(Parser, Debug)]
#[command(name = "gen_tables")]
#[command(about = "Generate and verify the magic bitboard table file")]
struct Args {
    /// Output file
    #[arg(short, long, default_value = "tables.mmvt")]
    out: PathBuf,

    /// Build the tables a second time and require identical output
    #[arg(long)]
    check_determinism: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let start = Instant::now();
    let tables = Tables::build()?;
    println!("Magic search finished in {:.3}s", start.elapsed().as_secs_f64());
    for slider in Slider::ALL {
        let table = tables.slider(slider);
        println!(
            "  {:<6} {:>7} entries, {:>4} KiB",
            slider.name(),
            table.attack_table().len(),
            table.attack_table().len() * 8 / 1024
        );
    }

    let bytes = table_file::to_bytes(&tables);
    table_file::save(&args.out, &tables)?;
    println!("Wrote {} bytes to {}", bytes.len(), args.out.display());

    let reloaded = table_file::load(&args.out)?;
    ensure!(
        table_file::to_bytes(&reloaded) == bytes,
        "reloaded tables differ from the ones written"
    );
    println!("Reload verified");

    if args.check_determinism {
        let rebuilt = Tables::build()?;
        ensure!(
            table_file::to_bytes(&rebuilt) == bytes,
            "a second build produced different tables"
        );
        println!("Second build is byte-identical");
    }
    Ok(())
}
