use anyhow::Result;
use clap::Parser;
use lakehouse_cli::{init_tracing, BenchArgs, ReportPrinter};
use lakehouse_eval::{run_benchmark, BenchContext};
use tracing::info;

/// Relative tolerance of the `--verify` check.
const VERIFY_TOLERANCE: f64 = 1e-9;

#[tokio::main]
async fn main() -> Result<()> {
  let args = BenchArgs::parse();
  init_tracing();

  let definition = args.definition();
  let context = BenchContext::connect(&args.engine_config())?;
  info!(
    path = %args.path.display(),
    predicate = %definition.predicate,
    runs = definition.runs,
    "starting benchmark"
  );

  let mut printer = ReportPrinter::default();
  let report = run_benchmark(&context, &args.path, &definition, |measurement| {
    printer.print(measurement)
  })
  .await?;

  if args.verify {
    report.check_consistency(VERIFY_TOLERANCE)?;
    info!("all strategies agree");
  }
  info!(total = ?report.total_duration(), "benchmark finished");

  Ok(())
}
