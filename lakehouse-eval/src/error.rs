use std::path::PathBuf;

use arrow::{datatypes::DataType, error::ArrowError};
use datafusion::error::DataFusionError;
use parquet::errors::ParquetError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BenchError {
  #[error("dataset path {} does not exist or is not a directory", .0.display())]
  DatasetNotFound(PathBuf),

  #[error("no parquet files found under {}", .0.display())]
  EmptyDataset(PathBuf),

  #[error("cannot read parquet footer of {}: {source}", path.display())]
  UnreadableFile { path: PathBuf, source: ParquetError },

  #[error("invalid engine configuration: {0}")]
  InvalidConfig(String),

  #[error("query returned {0} rows, expected a single aggregate row")]
  UnexpectedShape(usize),

  #[error("metric {name} has unsupported type {data_type}")]
  UnsupportedMetric { name: String, data_type: DataType },

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  #[error("Parquet error: {0}")]
  Parquet(#[from] ParquetError),

  #[error("Arrow error: {0}")]
  Arrow(#[from] ArrowError),

  #[error("DataFusion error: {0}")]
  DataFusion(#[from] DataFusionError),
}

pub type Result<T> = std::result::Result<T, BenchError>;
