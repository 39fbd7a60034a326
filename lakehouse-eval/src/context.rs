//! The engine session and the operations every access strategy is built from.

use std::{fmt, path::Path, sync::Arc};

use arrow::{
  array::{Array, ArrayRef, AsArray, RecordBatch},
  compute::cast,
  datatypes::{DataType, Float64Type, Int64Type},
};
use datafusion::{
  common::Column,
  datasource::{MemTable, TableProvider},
  prelude::{lit, Expr, SessionConfig, SessionContext},
};
use lakehouse_core::{CompareOp, Literal, Metric, MetricValue, Predicate, StrategyKind};
use tracing::{debug, info};

use crate::{
  dataset::DatasetHandle,
  error::{BenchError, Result},
};

/// Knobs forwarded to the DataFusion session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
  /// Engine default (number of cores) when unset.
  pub target_partitions: Option<usize>,
  pub batch_size: Option<usize>,
  /// Evaluate filters inside the parquet decoder instead of after it.
  pub pushdown_filters: bool,
}

impl Default for EngineConfig {
  fn default() -> Self {
    EngineConfig {
      target_partitions: None,
      batch_size: None,
      pushdown_filters: true,
    }
  }
}

impl EngineConfig {
  fn session_config(&self) -> Result<SessionConfig> {
    let mut config = SessionConfig::new()
      .set_bool(
        "datafusion.execution.parquet.pushdown_filters",
        self.pushdown_filters,
      )
      .set_bool(
        "datafusion.execution.parquet.reorder_filters",
        self.pushdown_filters,
      );
    if let Some(partitions) = self.target_partitions {
      if partitions == 0 {
        return Err(BenchError::InvalidConfig(
          "target partitions must be positive".to_string(),
        ));
      }
      config = config.with_target_partitions(partitions);
    }
    if let Some(batch_size) = self.batch_size {
      if batch_size == 0 {
        return Err(BenchError::InvalidConfig(
          "batch size must be positive".to_string(),
        ));
      }
      config = config.with_batch_size(batch_size);
    }
    Ok(config)
  }
}

/// A dataset narrowed by a predicate. The engine sees it as a view, so the predicate is
/// inlined into every query and pushed into the parquet scan.
#[derive(Clone)]
pub struct FilteredScanner {
  predicate: Predicate,
  dataset: DatasetHandle,
  view: Arc<dyn TableProvider>,
}

impl FilteredScanner {
  pub fn predicate(&self) -> &Predicate {
    &self.predicate
  }

  pub fn dataset(&self) -> &DatasetHandle {
    &self.dataset
  }
}

impl fmt::Debug for FilteredScanner {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FilteredScanner")
      .field("predicate", &self.predicate.to_string())
      .field("dataset", &self.dataset)
      .finish()
  }
}

/// A dataset fully read into arrow record batches.
#[derive(Clone)]
pub struct InMemoryTable {
  table: Arc<MemTable>,
  num_rows: usize,
  memory_size: usize,
}

impl InMemoryTable {
  pub fn num_rows(&self) -> usize {
    self.num_rows
  }

  /// Bytes held by the materialized arrays.
  pub fn memory_size(&self) -> usize {
    self.memory_size
  }
}

impl fmt::Debug for InMemoryTable {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("InMemoryTable")
      .field("num_rows", &self.num_rows)
      .field("memory_size", &self.memory_size)
      .finish()
  }
}

/// Something a benchmark query can run against, bound into the session under
/// [`StrategyKind::relation`].
#[derive(Debug, Clone)]
pub enum Target {
  FileScan(DatasetHandle),
  FilteredScan(FilteredScanner),
  InMemory(InMemoryTable),
}

impl Target {
  pub fn kind(&self) -> StrategyKind {
    match self {
      Target::FileScan(_) => StrategyKind::FileScan,
      Target::FilteredScan(_) => StrategyKind::FilteredScan,
      Target::InMemory(_) => StrategyKind::InMemory,
    }
  }

  pub fn provider(&self) -> Arc<dyn TableProvider> {
    match self {
      Target::FileScan(dataset) => dataset.provider(),
      Target::FilteredScan(scanner) => scanner.view.clone(),
      Target::InMemory(table) => table.table.clone(),
    }
  }
}

/// The record batches of an aggregate query.
#[derive(Debug, Clone)]
pub struct QueryResult {
  batches: Vec<RecordBatch>,
}

impl QueryResult {
  pub fn batches(&self) -> &[RecordBatch] {
    &self.batches
  }

  pub fn num_rows(&self) -> usize {
    self.batches.iter().map(RecordBatch::num_rows).sum()
  }

  /// One metric per result column, named after the column. The result must hold exactly one row.
  pub fn metrics(&self) -> Result<Vec<Metric>> {
    let rows = self.num_rows();
    if rows != 1 {
      return Err(BenchError::UnexpectedShape(rows));
    }
    let batch = self
      .batches
      .iter()
      .find(|batch| batch.num_rows() == 1)
      .ok_or(BenchError::UnexpectedShape(rows))?;

    batch
      .schema()
      .fields()
      .iter()
      .zip(batch.columns())
      .map(|(field, column)| Ok(Metric::new(field.name(), scalar_value(field.name(), column)?)))
      .collect()
  }
}

fn scalar_value(name: &str, array: &ArrayRef) -> Result<MetricValue> {
  if array.is_null(0) {
    return Ok(MetricValue::Null);
  }
  let data_type = array.data_type();
  if data_type.is_integer() {
    let ints = cast(array, &DataType::Int64)?;
    let ints = ints.as_primitive::<Int64Type>();
    if !ints.is_null(0) {
      return Ok(MetricValue::Int(ints.value(0)));
    }
    // unsigned values above i64::MAX fall back to a float
  }
  if data_type.is_numeric() {
    let floats = cast(array, &DataType::Float64)?;
    let floats = floats.as_primitive::<Float64Type>();
    if !floats.is_null(0) {
      return Ok(MetricValue::Float(floats.value(0)));
    }
  }
  Err(BenchError::UnsupportedMetric {
    name: name.to_string(),
    data_type: data_type.clone(),
  })
}

/// Translates a predicate into a DataFusion filter expression.
pub fn predicate_expr(predicate: &Predicate) -> Expr {
  let column = Expr::Column(Column::from_name(predicate.column.as_str()));
  let value = match &predicate.value {
    Literal::Int(v) => lit(*v),
    Literal::Float(v) => lit(*v),
    Literal::Bool(v) => lit(*v),
    Literal::Str(v) => lit(v.as_str()),
  };
  match predicate.op {
    CompareOp::Eq => column.eq(value),
    CompareOp::NotEq => column.not_eq(value),
    CompareOp::Lt => column.lt(value),
    CompareOp::LtEq => column.lt_eq(value),
    CompareOp::Gt => column.gt(value),
    CompareOp::GtEq => column.gt_eq(value),
  }
}

/// Owns the engine session for one benchmark run.
pub struct BenchContext {
  ctx: SessionContext,
}

impl BenchContext {
  pub fn connect(config: &EngineConfig) -> Result<Self> {
    let ctx = SessionContext::new_with_config(config.session_config()?);
    debug!(?config, "engine session started");
    Ok(BenchContext { ctx })
  }

  pub fn session(&self) -> &SessionContext {
    &self.ctx
  }

  pub async fn open_dataset(&self, path: impl AsRef<Path>) -> Result<DatasetHandle> {
    DatasetHandle::open(&self.ctx.state(), path).await
  }

  /// Fails when the predicate references a column the dataset does not have.
  pub fn build_filtered_scanner(
    &self,
    dataset: &DatasetHandle,
    predicate: &Predicate,
  ) -> Result<FilteredScanner> {
    let view = self
      .ctx
      .read_table(dataset.provider())?
      .filter(predicate_expr(predicate))?
      .into_view();
    debug!(%predicate, "built filtered scanner");
    Ok(FilteredScanner {
      predicate: predicate.clone(),
      dataset: dataset.clone(),
      view,
    })
  }

  /// Reads every row of the dataset into memory.
  pub async fn materialize(&self, dataset: &DatasetHandle) -> Result<InMemoryTable> {
    let batches = self.ctx.read_table(dataset.provider())?.collect().await?;
    let num_rows = batches.iter().map(RecordBatch::num_rows).sum();
    let memory_size = batches
      .iter()
      .map(RecordBatch::get_array_memory_size)
      .sum();
    let table = MemTable::try_new(dataset.schema(), vec![batches])?;
    info!(
      rows = num_rows,
      bytes = memory_size,
      "materialized dataset into memory"
    );
    Ok(InMemoryTable {
      table: Arc::new(table),
      num_rows,
      memory_size,
    })
  }

  /// Registers `target` under its relation name, replacing whatever was bound there.
  pub fn bind(&self, target: &Target) -> Result<()> {
    let relation = target.kind().relation();
    self.ctx.deregister_table(relation)?;
    self.ctx.register_table(relation, target.provider())?;
    debug!(relation, "bound query target");
    Ok(())
  }

  /// Runs `sql` against whatever is currently bound.
  pub async fn execute(&self, sql: &str) -> Result<QueryResult> {
    debug!(sql, "executing query");
    let batches = self.ctx.sql(sql).await?.collect().await?;
    Ok(QueryResult { batches })
  }

  pub async fn run_query(&self, target: &Target, sql: &str) -> Result<QueryResult> {
    self.bind(target)?;
    self.execute(sql).await
  }
}

#[cfg(test)]
mod tests {
  use arrow::{
    array::{StringArray, UInt64Array},
    datatypes::{Field, Schema},
  };

  use super::*;

  fn single_row(name: &str, column: ArrayRef) -> QueryResult {
    let schema = Schema::new(vec![Field::new(name, column.data_type().clone(), true)]);
    let batch = RecordBatch::try_new(Arc::new(schema), vec![column]).unwrap();
    QueryResult {
      batches: vec![batch],
    }
  }

  #[test]
  fn test_unsigned_sum_beyond_i64_is_kept_as_float() {
    let result = single_row("sum", Arc::new(UInt64Array::from(vec![u64::MAX])));
    let metrics = result.metrics().unwrap();
    assert_eq!(metrics[0].value, MetricValue::Float(u64::MAX as f64));

    let result = single_row("sum", Arc::new(UInt64Array::from(vec![42])));
    assert_eq!(result.metrics().unwrap()[0].value, MetricValue::Int(42));
  }

  #[test]
  fn test_non_numeric_metric_is_rejected() {
    let result = single_row("name", Arc::new(StringArray::from(vec!["CMT"])));
    assert!(matches!(
      result.metrics(),
      Err(BenchError::UnsupportedMetric { name, data_type: DataType::Utf8 }) if name == "name"
    ));
  }
}
