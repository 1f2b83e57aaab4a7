//! Storage backend (Arrow tables over delimited text files)
//!
//! Both the condition catalog and the session log are small delimited
//! text files edited by hand between runs. They are loaded whole into a
//! single Arrow `RecordBatch`:
//! - Delimiter is sniffed from content (see [`sniff_delimiter`])
//! - Every column is read as `Utf8`, values are compared as strings
//! - Writes overwrite the whole file (header row, no index column)
//!
//! Single-writer assumption: no file locking is attempted. Two processes
//! appending to the same file concurrently can lose updates.

mod sniff;

pub use sniff::{sniff_delimiter, CANDIDATES, SNIFF_BYTES};

use crate::{Error, Result};
use arrow::array::{Array, ArrayRef, RecordBatch, StringArray};
use arrow::csv::reader::Format;
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::util::display::array_value_to_string;
use std::fs::{self, File};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Delimiter used when a single-column file gives nothing to sniff
pub const DEFAULT_DELIMITER: u8 = b',';

/// A delimited text table held in memory as one Arrow record batch
#[derive(Debug, Clone)]
pub struct DelimitedTable {
    path: PathBuf,
    batch: RecordBatch,
    delimiter: u8,
}

impl DelimitedTable {
    /// Wrap an existing batch
    ///
    /// Useful for testing and for synthesizing new tables
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, batch: RecordBatch, delimiter: u8) -> Self {
        Self {
            path: path.into(),
            batch,
            delimiter,
        }
    }

    /// Create a table with the given columns and no rows
    #[must_use]
    pub fn empty(path: impl Into<PathBuf>, columns: &[String], delimiter: u8) -> Self {
        let batch = RecordBatch::new_empty(utf8_schema(columns.iter().map(String::as_str)));
        Self::new(path, batch, delimiter)
    }

    /// Load a table, re-serializing it in place
    ///
    /// # Errors
    /// See [`DelimitedTable::load_with`]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        Self::load_with(path, DEFAULT_DELIMITER, true)
    }

    /// Load a table from a delimited text file.
    ///
    /// Returns `Ok(None)` when `path` does not exist or is not a regular file.
    ///
    /// # Arguments
    ///
    /// * `path` - File to read
    /// * `fallback` - Delimiter to use when sniffing finds none
    /// * `normalize` - Rewrite the file with the detected delimiter right after reading
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed, or if
    /// `normalize` is set and the file cannot be overwritten
    pub fn load_with<P: AsRef<Path>>(path: P, fallback: u8, normalize: bool) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.is_file() {
            debug!(path = %path.display(), "table not found");
            return Ok(None);
        }

        let content = fs::read(path)?;
        let delimiter = sniff_delimiter(&content).unwrap_or_else(|| {
            warn!(
                path = %path.display(),
                fallback = %char::from(fallback).escape_default(),
                "could not sniff delimiter, using fallback"
            );
            fallback
        });

        let batch = parse(&content, delimiter).map_err(|e| {
            Error::StorageError(format!("Failed to parse {}: {e}", path.display()))
        })?;
        debug!(
            path = %path.display(),
            rows = batch.num_rows(),
            columns = batch.num_columns(),
            "loaded table"
        );

        let table = Self::new(path, batch, delimiter);
        if normalize {
            table.persist()?;
        }
        Ok(Some(table))
    }

    /// Overwrite the backing file with the table content
    ///
    /// # Errors
    /// Returns [`Error::Unwritable`] if the file cannot be created or written
    pub fn persist(&self) -> Result<()> {
        self.write_batch(&self.batch)
    }

    /// Overwrite the backing file with `batch`, leaving the in-memory table as is
    ///
    /// # Errors
    /// Returns [`Error::Unwritable`] if the file cannot be created or written
    pub fn write_batch(&self, batch: &RecordBatch) -> Result<()> {
        let unwritable = |source| Error::Unwritable {
            path: self.path.clone(),
            source,
        };

        let file = File::create(&self.path).map_err(unwritable)?;
        let mut writer = WriterBuilder::new()
            .with_header(true)
            .with_delimiter(self.delimiter)
            .build(file);
        writer.write(batch).map_err(|e| match e {
            arrow::error::ArrowError::IoError(_, source) => unwritable(source),
            other => Error::Arrow(other),
        })?;

        debug!(path = %self.path.display(), rows = batch.num_rows(), "persisted table");
        Ok(())
    }

    /// Backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Field delimiter used for writes
    #[must_use]
    pub const fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// Underlying record batch
    #[must_use]
    pub const fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Replace the table content (the file is untouched until [`persist`](Self::persist))
    pub fn replace_batch(&mut self, batch: RecordBatch) {
        self.batch = batch;
    }

    /// Number of data rows
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Column names in file order
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    /// Position of a column, if present
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.batch.schema().index_of(name).ok()
    }

    /// Cell content as a string (nulls read as the empty string)
    ///
    /// # Errors
    /// Returns error if the cell cannot be formatted
    ///
    /// # Panics
    /// Panics if `row` or `column` is out of bounds
    pub fn value(&self, row: usize, column: usize) -> Result<String> {
        let array = self.batch.column(column);
        if array.is_null(row) {
            return Ok(String::new());
        }
        Ok(array_value_to_string(array.as_ref(), row)?)
    }

    /// All cells of a column as strings
    ///
    /// # Errors
    /// Returns error if a cell cannot be formatted
    pub fn column_values(&self, column: usize) -> Result<Vec<String>> {
        (0..self.num_rows()).map(|row| self.value(row, column)).collect()
    }
}

/// Schema with one nullable `Utf8` field per column name
#[must_use]
pub fn utf8_schema<'a>(columns: impl IntoIterator<Item = &'a str>) -> SchemaRef {
    let fields: Vec<Field> = columns
        .into_iter()
        .map(|name| Field::new(name, DataType::Utf8, true))
        .collect();
    Arc::new(Schema::new(fields))
}

/// Build a `Utf8` column from owned strings
#[must_use]
pub fn string_column(values: Vec<String>) -> ArrayRef {
    Arc::new(StringArray::from(values))
}

/// Parse delimited text with a header row, every column as `Utf8`
fn parse(content: &[u8], delimiter: u8) -> Result<RecordBatch> {
    let format = Format::default().with_header(true).with_delimiter(delimiter);
    let (inferred, _) = format.infer_schema(Cursor::new(content), Some(0))?;
    if inferred.fields().is_empty() {
        return Err(Error::StorageError("missing header row".to_string()));
    }

    // Header names only: no type inference is applied to values
    let schema = utf8_schema(inferred.fields().iter().map(|f| f.name().as_str()));

    let reader = ReaderBuilder::new(Arc::clone(&schema))
        .with_header(true)
        .with_delimiter(delimiter)
        .build(Cursor::new(content))?;

    let mut batches = Vec::new();
    for batch in reader {
        batches.push(batch?);
    }
    Ok(arrow::compute::concat_batches(&schema, &batches)?)
}
