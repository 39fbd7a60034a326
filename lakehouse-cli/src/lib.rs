//! This crate holds the command-line surface of the benchmark:
//! 1. `lakehouse_bench` queries a parquet directory through every access strategy and prints one
//!    timed line per step
//! 2. `generate_taxi_parquet` writes a synthetic taxi dataset to run it against
//!
//! Argument handling and report printing live here so the binaries stay thin.

use std::path::PathBuf;

use clap::Parser;
use lakehouse_core::{
  Aggregate, AggregateFunction, BenchmarkDefinition, CompareOp, Literal, Measurement, Predicate,
  Section, StrategyKind, DEFAULT_METRIC_COLUMN, DEFAULT_PREDICATE_COLUMN, DEFAULT_RUNS,
};
use lakehouse_eval::EngineConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Benchmarks querying a parquet dataset from disk, through a filtered scanner and from memory.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct BenchArgs {
  /// Directory holding the parquet files
  #[arg(default_value = "data/")]
  pub path: PathBuf,
  /// Column the predicate filters on
  #[arg(long, default_value = DEFAULT_PREDICATE_COLUMN)]
  pub column: String,
  /// Comparison operator of the predicate
  #[arg(long, default_value = "=")]
  pub op: CompareOp,
  /// Literal the column is compared with
  #[arg(long, default_value = "6")]
  pub value: Literal,
  /// Numeric column the aggregates run over
  #[arg(long, default_value = DEFAULT_METRIC_COLUMN)]
  pub metric_column: String,
  /// Aggregates to compute, in output order (count, avg, sum, min, max)
  #[arg(long = "aggregate", value_delimiter = ',', default_values = ["count", "avg"])]
  pub aggregates: Vec<AggregateFunction>,
  /// Repetitions of every query; the first one is cold
  #[arg(long, default_value_t = DEFAULT_RUNS)]
  pub runs: usize,
  /// Strategies to run (file-scan, filtered-scan, in-memory); all of them when omitted
  #[arg(long = "strategy", value_delimiter = ',')]
  pub strategies: Vec<StrategyKind>,
  /// Engine partitions, defaults to the number of cores
  #[arg(long)]
  pub target_partitions: Option<usize>,
  /// Rows per record batch inside the engine
  #[arg(long)]
  pub batch_size: Option<usize>,
  /// Keep filters out of the parquet decoder
  #[arg(long)]
  pub no_pushdown: bool,
  /// Fail unless every strategy computes the same aggregates
  #[arg(long)]
  pub verify: bool,
}

impl BenchArgs {
  pub fn definition(&self) -> BenchmarkDefinition {
    let predicate = Predicate::new(self.column.clone(), self.op, self.value.clone());
    let aggregates = self
      .aggregates
      .iter()
      .map(|function| Aggregate::over(*function, self.metric_column.clone()))
      .collect();
    let definition = BenchmarkDefinition::new(predicate, aggregates).with_runs(self.runs);
    if self.strategies.is_empty() {
      definition
    } else {
      definition.with_strategies(&self.strategies)
    }
  }

  pub fn engine_config(&self) -> EngineConfig {
    EngineConfig {
      target_partitions: self.target_partitions,
      batch_size: self.batch_size,
      pushdown_filters: !self.no_pushdown,
    }
  }
}

/// Prints measurements to stdout, with a heading whenever the report enters a new section.
#[derive(Debug, Default)]
pub struct ReportPrinter {
  section: Option<Section>,
}

impl ReportPrinter {
  pub fn lines(&mut self, measurement: &Measurement) -> Vec<String> {
    let mut lines = Vec::with_capacity(3);
    let section = measurement.step.section();
    if self.section != Some(section) {
      if self.section.is_some() {
        lines.push(String::new());
      }
      lines.push(section.heading().to_string());
      self.section = Some(section);
    }
    lines.push(measurement.report_line());
    lines
  }

  pub fn print(&mut self, measurement: &Measurement) {
    for line in self.lines(measurement) {
      println!("{line}");
    }
  }
}

/// Logs go to stderr so stdout only carries the report.
pub fn init_tracing() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "lakehouse_eval=info,lakehouse_cli=info".into()),
    )
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .init();
}
