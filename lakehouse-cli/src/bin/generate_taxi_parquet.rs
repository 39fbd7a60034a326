use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use lakehouse_cli::init_tracing;
use lakehouse_eval::util::{generate_taxi_dataset, TaxiDatasetOptions};

/// Writes a synthetic NYC-taxi-like parquet dataset to benchmark against.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
  /// Output directory, created if missing
  #[arg(default_value = "data/")]
  output: PathBuf,
  /// Number of parquet files to write
  #[arg(long, default_value_t = 4)]
  files: usize,
  /// Rows in every file
  #[arg(long, default_value_t = 250_000)]
  rows: usize,
  /// Maximum rows per row group
  #[arg(long, default_value_t = 65_536)]
  row_group_size: usize,
  /// Seed of the random generator
  #[arg(long, default_value_t = 42)]
  seed: u64,
}

fn main() -> Result<()> {
  let args = Args::parse();
  init_tracing();

  let options = TaxiDatasetOptions {
    files: args.files,
    rows_per_file: args.rows,
    row_group_size: args.row_group_size,
    seed: args.seed,
  };
  for path in generate_taxi_dataset(&args.output, &options)? {
    println!("{}", path.display());
  }

  Ok(())
}
