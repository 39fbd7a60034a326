//! This crate implements the evaluation infrastructure of the benchmark on top of DataFusion:
//! - [`BenchContext`]: engine session, dataset handles, filtered scanners, in-memory tables
//! - [`run_benchmark`]: the timed sequence over all configured access strategies
//! - Synthetic parquet dataset generation in [`util`]

pub mod context;
pub mod dataset;
pub mod error;
pub mod runner;
pub mod util;

pub use context::{
  predicate_expr, BenchContext, EngineConfig, FilteredScanner, InMemoryTable, QueryResult, Target,
};
pub use dataset::DatasetHandle;
pub use error::{BenchError, Result};
pub use runner::run_benchmark;
