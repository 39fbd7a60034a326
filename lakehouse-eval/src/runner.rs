//! The benchmark sequence: file scan, filtered scan, load into memory, in-memory query.
//! Every step runs to completion before the next one starts.

use std::{path::Path, time::Instant};

use lakehouse_core::{BenchmarkDefinition, BenchmarkReport, Measurement, Step, StrategyKind};
use tracing::info;

use crate::{
  context::{BenchContext, Target},
  error::Result,
};

/// Runs `definition` against the parquet files under `path`.
///
/// `on_measurement` sees every measurement as soon as it is taken, so callers can print
/// progressively; the full report is returned at the end. Only the query execution (and the
/// load into memory) is timed, binding and result extraction are not.
pub async fn run_benchmark<F>(
  context: &BenchContext,
  path: impl AsRef<Path>,
  definition: &BenchmarkDefinition,
  mut on_measurement: F,
) -> Result<BenchmarkReport>
where
  F: FnMut(&Measurement),
{
  let mut report = BenchmarkReport::default();
  let dataset = context.open_dataset(path).await?;

  let mut file_targets = Vec::with_capacity(2);
  if definition.includes(StrategyKind::FileScan) {
    file_targets.push(Target::FileScan(dataset.clone()));
  }
  if definition.includes(StrategyKind::FilteredScan) {
    let scanner = context.build_filtered_scanner(&dataset, &definition.predicate)?;
    file_targets.push(Target::FilteredScan(scanner));
  }

  for target in &file_targets {
    measure_queries(context, target, definition, &mut report, &mut on_measurement).await?;
  }

  if definition.includes(StrategyKind::InMemory) {
    let start = Instant::now();
    let table = context.materialize(&dataset).await?;
    let measurement = Measurement {
      step: Step::Materialize,
      metrics: Vec::new(),
      duration: start.elapsed(),
    };
    on_measurement(&measurement);
    report.push(measurement);

    let target = Target::InMemory(table);
    measure_queries(context, &target, definition, &mut report, &mut on_measurement).await?;
  }

  Ok(report)
}

async fn measure_queries<F>(
  context: &BenchContext,
  target: &Target,
  definition: &BenchmarkDefinition,
  report: &mut BenchmarkReport,
  on_measurement: &mut F,
) -> Result<()>
where
  F: FnMut(&Measurement),
{
  let strategy = target.kind();
  let sql = definition.sql_for(strategy);
  context.bind(target)?;
  info!(%strategy, runs = definition.runs, %sql, "benchmarking strategy");

  for run in 1..=definition.runs {
    let start = Instant::now();
    let result = context.execute(&sql).await?;
    let duration = start.elapsed();

    let measurement = Measurement {
      step: Step::Query { strategy, run },
      metrics: result.metrics()?,
      duration,
    };
    on_measurement(&measurement);
    report.push(measurement);
  }
  Ok(())
}
