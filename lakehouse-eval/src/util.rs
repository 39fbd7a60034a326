//! Synthetic NYC-taxi-like parquet data for tests, benches and the `generate_taxi_parquet` binary.

use std::{
  fs::File,
  path::{Path, PathBuf},
  sync::Arc,
};

use arrow::{
  array::{ArrayRef, Float64Array, Int64Array, RecordBatch},
  datatypes::{DataType, Field, Schema, SchemaRef},
};
use parquet::{
  arrow::ArrowWriter,
  basic::Compression,
  file::properties::WriterProperties,
};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};
use tracing::info;

use crate::error::Result;

/// Vendor ids that appear in the generated data, with their share in percent.
pub const VENDOR_MIX: [(i64, u32); 4] = [(1, 45), (2, 45), (5, 5), (6, 5)];

// log-normal parameters of trip_distance, roughly 1.6 miles median
const DISTANCE_MU: f64 = 0.5;
const DISTANCE_SIGMA: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxiDatasetOptions {
  pub files: usize,
  pub rows_per_file: usize,
  pub row_group_size: usize,
  pub seed: u64,
}

impl Default for TaxiDatasetOptions {
  fn default() -> Self {
    TaxiDatasetOptions {
      files: 4,
      rows_per_file: 250_000,
      row_group_size: 65_536,
      seed: 42,
    }
  }
}

pub fn taxi_schema() -> SchemaRef {
  Arc::new(Schema::new(vec![
    Field::new("VendorID", DataType::Int64, false),
    Field::new("trip_distance", DataType::Float64, false),
    Field::new("passenger_count", DataType::Int64, false),
    Field::new("fare_amount", DataType::Float64, false),
  ]))
}

fn sample_vendor(rng: &mut SmallRng) -> i64 {
  let mut roll = rng.gen_range(0..100u32);
  for (vendor, share) in VENDOR_MIX {
    if roll < share {
      return vendor;
    }
    roll -= share;
  }
  VENDOR_MIX[0].0
}

pub fn gen_taxi_batch(rng: &mut SmallRng, rows: usize) -> Result<RecordBatch> {
  let vendors: Vec<i64> = (0..rows).map(|_| sample_vendor(rng)).collect();
  let distances: Vec<f64> = StandardNormal
    .sample_iter(&mut *rng)
    .take(rows)
    .map(|z: f64| ((DISTANCE_MU + DISTANCE_SIGMA * z).exp() * 100.0).round() / 100.0)
    .collect();
  let passengers: Vec<i64> = (0..rows).map(|_| rng.gen_range(1..=6)).collect();
  let fares: Vec<f64> = distances
    .iter()
    .map(|distance| ((3.0 + 2.5 * distance) * 100.0).round() / 100.0)
    .collect();

  let columns: Vec<ArrayRef> = vec![
    Arc::new(Int64Array::from(vendors)),
    Arc::new(Float64Array::from(distances)),
    Arc::new(Int64Array::from(passengers)),
    Arc::new(Float64Array::from(fares)),
  ];
  Ok(RecordBatch::try_new(taxi_schema(), columns)?)
}

/// Writes `options.files` parquet files named `part-NNNNN.parquet` into `dir`, creating it if
/// needed. The output only depends on the options.
pub fn generate_taxi_dataset(
  dir: impl AsRef<Path>,
  options: &TaxiDatasetOptions,
) -> Result<Vec<PathBuf>> {
  let dir = dir.as_ref();
  std::fs::create_dir_all(dir)?;

  let mut rng = SmallRng::seed_from_u64(options.seed);
  let props = WriterProperties::builder()
    .set_compression(Compression::SNAPPY)
    .set_max_row_group_size(options.row_group_size.max(1))
    .build();

  let mut paths = Vec::with_capacity(options.files);
  for index in 0..options.files {
    let path = dir.join(format!("part-{index:05}.parquet"));
    let batch = gen_taxi_batch(&mut rng, options.rows_per_file)?;

    let file = File::create(&path)?;
    let mut writer = ArrowWriter::try_new(file, taxi_schema(), Some(props.clone()))?;
    writer.write(&batch)?;
    writer.close()?;

    paths.push(path);
  }

  info!(
    dir = %dir.display(),
    files = options.files,
    rows = options.files * options.rows_per_file,
    "generated taxi dataset"
  );
  Ok(paths)
}
