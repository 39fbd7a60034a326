//! Dataset handles: a directory of parquet files registered with the engine as one logical
//! table, without reading any row data.

use std::{
  fmt,
  path::{Path, PathBuf},
  sync::Arc,
};

use arrow::datatypes::SchemaRef;
use datafusion::{
  datasource::{
    file_format::parquet::ParquetFormat,
    listing::{ListingOptions, ListingTable, ListingTableConfig, ListingTableUrl},
    TableProvider,
  },
  execution::context::SessionState,
};
use futures::TryStreamExt;
use parquet::arrow::ParquetRecordBatchStreamBuilder;
use tracing::{debug, info};

use crate::error::{BenchError, Result};

pub const PARQUET_EXTENSION: &str = ".parquet";

/// An unmaterialized reference to every parquet file below a directory.
#[derive(Clone)]
pub struct DatasetHandle {
  root: PathBuf,
  files: Vec<PathBuf>,
  num_rows: u64,
  table: Arc<ListingTable>,
}

impl DatasetHandle {
  /// Lists the parquet files below `root` through the engine's object store, reads every
  /// footer and builds the listing table the engine scans.
  pub(crate) async fn open(state: &SessionState, root: impl AsRef<Path>) -> Result<Self> {
    let root = root.as_ref();
    let root = tokio::fs::canonicalize(root)
      .await
      .map_err(|_| BenchError::DatasetNotFound(root.to_path_buf()))?;
    if !tokio::fs::metadata(&root).await?.is_dir() {
      return Err(BenchError::DatasetNotFound(root));
    }

    // A trailing separator marks the url as a directory to list.
    let url = ListingTableUrl::parse(format!("{}/", root.display()))?;
    let files = list_parquet_files(state, &url).await?;
    if files.is_empty() {
      return Err(BenchError::EmptyDataset(root));
    }

    let mut num_rows = 0;
    for path in &files {
      num_rows += footer_row_count(path).await?;
    }

    let table = listing_table(state, url).await?;
    info!(
      root = %root.display(),
      files = files.len(),
      rows = num_rows,
      "opened parquet dataset"
    );

    Ok(DatasetHandle {
      root,
      files,
      num_rows,
      table: Arc::new(table),
    })
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Sorted paths of the files backing the dataset. Never empty.
  pub fn files(&self) -> &[PathBuf] {
    &self.files
  }

  /// Row count according to the parquet footers.
  pub fn num_rows(&self) -> u64 {
    self.num_rows
  }

  pub fn schema(&self) -> SchemaRef {
    self.table.schema()
  }

  pub fn provider(&self) -> Arc<dyn TableProvider> {
    self.table.clone()
  }
}

impl fmt::Debug for DatasetHandle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DatasetHandle")
      .field("root", &self.root)
      .field("files", &self.files.len())
      .field("num_rows", &self.num_rows)
      .finish()
  }
}

/// The files the listing table will scan. Directory symlinks are followed.
async fn list_parquet_files(state: &SessionState, url: &ListingTableUrl) -> Result<Vec<PathBuf>> {
  let store = state.runtime_env().object_store(url.object_store())?;
  // Local object store locations are relative to the filesystem root.
  let mut files: Vec<PathBuf> = url
    .list_all_files(state, store.as_ref(), PARQUET_EXTENSION)
    .await?
    .map_ok(|meta| PathBuf::from(format!("/{}", meta.location)))
    .try_collect()
    .await?;
  files.sort();
  Ok(files)
}

async fn footer_row_count(path: &Path) -> Result<u64> {
  let file = tokio::fs::File::open(path).await?;
  let builder = ParquetRecordBatchStreamBuilder::new(file)
    .await
    .map_err(|source| BenchError::UnreadableFile {
      path: path.to_path_buf(),
      source,
    })?;
  let metadata = builder.metadata();
  debug!(
    path = %path.display(),
    row_groups = metadata.num_row_groups(),
    rows = metadata.file_metadata().num_rows(),
    "read parquet footer"
  );
  Ok(metadata.file_metadata().num_rows().max(0) as u64)
}

async fn listing_table(state: &SessionState, url: ListingTableUrl) -> Result<ListingTable> {
  let options =
    ListingOptions::new(Arc::new(ParquetFormat::default())).with_file_extension(PARQUET_EXTENSION);
  let schema = options.infer_schema(state, &url).await?;
  let config = ListingTableConfig::new(url)
    .with_listing_options(options)
    .with_schema(schema);
  Ok(ListingTable::try_new(config)?)
}
