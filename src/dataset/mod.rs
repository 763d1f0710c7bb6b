//! Posts dataset (Arrow columnar, validated once at load)
//!
//! **Read-only design**:
//! - A dataset is loaded once (CSV, Parquet, Arrow batches or typed records)
//! - Columns are checked against a [`DatasetSchema`] and cast to canonical
//!   types at construction
//! - Nothing mutates it afterwards; every aggregate is derived on demand
//!
//! Only the columns the schema declares are kept. Extra source columns are
//! dropped during normalization.

mod record;

pub use record::{PostRecord, PostRecordBuilder};

use crate::schema::{ColumnRole, DatasetSchema, HOUR, POST_TYPE, WEEKDAY};
use crate::{Error, Result};
use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, RecordBatch, StringArray};
use arrow::compute;
use arrow::datatypes::SchemaRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Seek;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Default number of rows per CSV batch
pub const DEFAULT_CSV_BATCH_SIZE: usize = 8192;

/// CSV reader options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvOptions {
    /// Field delimiter (single ASCII character)
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Whether the first line holds column names
    #[serde(default = "default_has_header")]
    pub has_header: bool,
    /// Rows per decoded batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            has_header: default_has_header(),
            batch_size: default_batch_size(),
        }
    }
}

const fn default_delimiter() -> char {
    ','
}

const fn default_has_header() -> bool {
    true
}

const fn default_batch_size() -> usize {
    DEFAULT_CSV_BATCH_SIZE
}

impl CsvOptions {
    /// Delimiter as a byte
    ///
    /// # Errors
    /// Returns error if the delimiter is not a single ASCII character
    pub fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                Error::Config(format!(
                    "CSV delimiter must be an ASCII character, got {:?}",
                    self.delimiter
                ))
            })
    }
}

/// Immutable, schema-normalized posts dataset
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: DatasetSchema,
    batch: RecordBatch,
}

impl Dataset {
    /// Build a dataset from Arrow batches
    ///
    /// Every batch is validated against `schema`, the declared columns are
    /// cast to their canonical types and the batches are combined.
    ///
    /// # Errors
    /// Returns error if:
    /// - the schema itself is invalid
    /// - a declared column is missing from a batch
    /// - a column's type cannot serve its role (e.g. text engagement)
    pub fn try_new(batches: Vec<RecordBatch>, schema: DatasetSchema) -> Result<Self> {
        schema.validate()?;
        let target: SchemaRef = Arc::new(schema.arrow_schema());

        let normalized = batches
            .iter()
            .map(|batch| normalize_batch(batch, &schema, &target))
            .collect::<Result<Vec<_>>>()?;

        let batch = if normalized.is_empty() {
            RecordBatch::new_empty(Arc::clone(&target))
        } else {
            compute::concat_batches(&target, &normalized)
                .map_err(|e| Error::StorageError(format!("Failed to combine batches: {e}")))?
        };

        debug!(
            rows = batch.num_rows(),
            columns = batch.num_columns(),
            "dataset normalized"
        );

        Ok(Self { schema, batch })
    }

    /// Build a dataset from typed post records
    ///
    /// The schema is [`DatasetSchema::posts`] with one metric column per
    /// distinct metric name across `records` (records without a metric get a
    /// null cell).
    ///
    /// # Errors
    /// Returns error if a metric name collides with a post column
    ///
    /// # Example
    ///
    /// ```rust
    /// use engagement_insights::dataset::{Dataset, PostRecord};
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let dataset = Dataset::from_records(&[
    ///     PostRecord::new("Photo", 1, 9, 10.0),
    ///     PostRecord::builder().post_type("Video").total_interactions(80.0).build(),
    /// ])?;
    /// assert_eq!(dataset.num_rows(), 2);
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_records(records: &[PostRecord]) -> Result<Self> {
        let metric_names: BTreeSet<&str> = records
            .iter()
            .flat_map(|r| r.metrics().keys().map(String::as_str))
            .collect();
        let schema = DatasetSchema::posts(metric_names)?;

        let mut columns: Vec<ArrayRef> = Vec::new();
        for (name, role) in schema.columns() {
            let column: ArrayRef = match (role, name) {
                (ColumnRole::Engagement, _) => Arc::new(Float64Array::from(
                    records
                        .iter()
                        .map(PostRecord::total_interactions)
                        .collect::<Vec<_>>(),
                )),
                (ColumnRole::Dimension(_), POST_TYPE) => Arc::new(StringArray::from(
                    records.iter().map(PostRecord::post_type).collect::<Vec<_>>(),
                )),
                (ColumnRole::Dimension(_), WEEKDAY) => Arc::new(Int64Array::from(
                    records.iter().map(PostRecord::weekday).collect::<Vec<_>>(),
                )),
                (ColumnRole::Dimension(_), HOUR) => Arc::new(Int64Array::from(
                    records.iter().map(PostRecord::hour).collect::<Vec<_>>(),
                )),
                (ColumnRole::Metric, metric) => Arc::new(Float64Array::from(
                    records.iter().map(|r| r.metric(metric)).collect::<Vec<_>>(),
                )),
                (ColumnRole::Dimension(_), other) => {
                    return Err(Error::Other(format!(
                        "Post records have no dimension '{other}'"
                    )))
                }
            };
            columns.push(column);
        }

        let batch = RecordBatch::try_new(Arc::new(schema.arrow_schema()), columns)?;
        Self::try_new(vec![batch], schema)
    }

    /// Load a dataset from a CSV file
    ///
    /// Column types are inferred by Arrow from the whole file, then checked
    /// against `schema`. Empty cells become nulls.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed, or does not match
    /// the schema
    pub fn load_csv<P: AsRef<Path>>(
        path: P,
        schema: DatasetSchema,
        options: &CsvOptions,
    ) -> Result<Self> {
        use arrow::csv::reader::Format;
        use arrow::csv::ReaderBuilder;

        let path = path.as_ref();
        let mut file = File::open(path)
            .map_err(|e| Error::StorageError(format!("Failed to open CSV file: {e}")))?;

        let format = Format::default()
            .with_header(options.has_header)
            .with_delimiter(options.delimiter_byte()?);

        let (inferred, _) = format
            .infer_schema(&mut file, None)
            .map_err(|e| Error::StorageError(format!("Failed to infer CSV schema: {e}")))?;
        file.rewind()?;

        let reader = ReaderBuilder::new(Arc::new(inferred))
            .with_format(format)
            .with_batch_size(options.batch_size.max(1))
            .build(file)
            .map_err(|e| Error::StorageError(format!("Failed to create CSV reader: {e}")))?;

        let mut batches = Vec::new();
        for batch in reader {
            let batch = batch
                .map_err(|e| Error::StorageError(format!("Failed to read CSV record batch: {e}")))?;
            batches.push(batch);
        }

        let dataset = Self::try_new(batches, schema)?;
        info!(
            path = %path.display(),
            rows = dataset.num_rows(),
            "loaded CSV dataset"
        );
        Ok(dataset)
    }

    /// Load a dataset from a Parquet file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed, or does not match the
    /// schema
    pub fn load_parquet<P: AsRef<Path>>(path: P, schema: DatasetSchema) -> Result<Self> {
        use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| Error::StorageError(format!("Failed to open Parquet file: {e}")))?;

        let builder = ParquetRecordBatchReaderBuilder::try_new(file)
            .map_err(|e| Error::StorageError(format!("Failed to parse Parquet file: {e}")))?;

        let reader = builder
            .build()
            .map_err(|e| Error::StorageError(format!("Failed to create Parquet reader: {e}")))?;

        let mut batches = Vec::new();
        for batch in reader {
            let batch = batch
                .map_err(|e| Error::StorageError(format!("Failed to read record batch: {e}")))?;
            batches.push(batch);
        }

        let dataset = Self::try_new(batches, schema)?;
        info!(
            path = %path.display(),
            rows = dataset.num_rows(),
            "loaded Parquet dataset"
        );
        Ok(dataset)
    }

    /// Validated schema
    #[must_use]
    pub const fn schema(&self) -> &DatasetSchema {
        &self.schema
    }

    /// Normalized columnar data
    #[must_use]
    pub const fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Number of posts
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Number of declared columns
    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    /// Whether the dataset has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    /// Names of the declared columns, in storage order
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema_ref()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    /// First `n` rows (zero-copy slice)
    #[must_use]
    pub fn head(&self, n: usize) -> RecordBatch {
        self.batch.slice(0, n.min(self.batch.num_rows()))
    }

    /// Engagement column
    pub(crate) fn engagement(&self) -> Result<&Float64Array> {
        self.float_column(self.schema.engagement())
    }

    /// Numeric column (engagement or metric)
    pub(crate) fn float_column(&self, name: &str) -> Result<&Float64Array> {
        self.column(name)?
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| Error::Other(format!("Column '{name}' is not Float64")))
    }

    /// Categorical dimension column
    pub(crate) fn categorical_column(&self, name: &str) -> Result<&StringArray> {
        self.column(name)?
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| Error::Other(format!("Column '{name}' is not Utf8")))
    }

    /// Ordinal dimension column
    pub(crate) fn ordinal_column(&self, name: &str) -> Result<&Int64Array> {
        self.column(name)?
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| Error::Other(format!("Column '{name}' is not Int64")))
    }

    fn column(&self, name: &str) -> Result<&ArrayRef> {
        let index = self
            .batch
            .schema_ref()
            .index_of(name)
            .map_err(|_| Error::UnknownDimension(name.to_string()))?;
        Ok(self.batch.column(index))
    }
}

/// Select, type-check and cast the declared columns of one source batch
fn normalize_batch(
    batch: &RecordBatch,
    schema: &DatasetSchema,
    target: &SchemaRef,
) -> Result<RecordBatch> {
    let source = batch.schema_ref();
    let mut columns = Vec::with_capacity(target.fields().len());

    for (name, role) in schema.columns() {
        let index = source.index_of(name).map_err(|_| {
            Error::SchemaMismatch(format!("missing column '{name}' (declared as {role:?})"))
        })?;
        let column = batch.column(index);

        if !role.accepts_source(column.data_type()) {
            return Err(Error::SchemaMismatch(format!(
                "column '{name}' has type {:?}, which cannot be used as {role:?}",
                column.data_type()
            )));
        }

        columns.push(compute::cast(column, &role.canonical_type())?);
    }

    RecordBatch::try_new(Arc::clone(target), columns)
        .map_err(|e| Error::StorageError(format!("Failed to build normalized batch: {e}")))
}
