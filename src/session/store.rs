//! Session Store - persistent session log with schema validation

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array, RecordBatch};
use arrow::datatypes::{DataType, Field, Schema};
use tracing::info;

use super::{FactorSet, FactorValues, SessionRecord, CONDITION, DATETIME, KEEP, KEPT, PARTICIPANT, RESERVED_COLUMNS};
use crate::storage::{string_column, DelimitedTable};
use crate::{Error, Result};

/// Session log owned for the duration of one run.
///
/// ## Design
///
/// The log is read once when the store is opened and overwritten once per
/// [`save`](Self::save). There is no locking: at most one process may hold
/// a given session file at a time.
#[derive(Debug, Clone)]
pub struct SessionStore {
    table: DelimitedTable,
    factors: FactorSet,
}

impl SessionStore {
    /// Open the session log, or start an empty one if the file is absent.
    ///
    /// An existing file is loaded with the same conventions as the catalog
    /// (sniffed delimiter, string cells) and its columns are checked against
    /// `factors`. A new log is only created in memory; the file appears on
    /// the first [`save`](Self::save).
    ///
    /// # Arguments
    ///
    /// * `path` - Sessions file
    /// * `factors` - Declared classification factors
    /// * `default_delimiter` - Delimiter for a new file, or for a file where none can be sniffed
    /// * `normalize` - Rewrite an existing file with its detected delimiter after reading
    ///
    /// # Errors
    /// Returns error if the file cannot be parsed or rewritten, or if its
    /// columns do not match `factors` ([`Error::SchemaMismatch`])
    pub fn load_or_init<P: AsRef<Path>>(
        path: P,
        factors: &FactorSet,
        default_delimiter: u8,
        normalize: bool,
    ) -> Result<Self> {
        let path = path.as_ref();
        let table = match DelimitedTable::load_with(path, default_delimiter, normalize)? {
            Some(table) => {
                validate_columns(&table, factors)?;
                info!(
                    path = %path.display(),
                    sessions = table.num_rows(),
                    "loaded session log"
                );
                table
            }
            None => {
                info!(path = %path.display(), "starting new session log");
                DelimitedTable::empty(path, &factors.session_columns(), default_delimiter)
            }
        };

        Ok(Self {
            table,
            factors: factors.clone(),
        })
    }

    /// Sessions file
    #[must_use]
    pub fn path(&self) -> &Path {
        self.table.path()
    }

    /// Delimiter used when persisting
    #[must_use]
    pub const fn delimiter(&self) -> u8 {
        self.table.delimiter()
    }

    /// Declared factors
    #[must_use]
    pub const fn factors(&self) -> &FactorSet {
        &self.factors
    }

    /// Number of sessions in the log
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.num_rows()
    }

    /// Check if the log has no session.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.num_rows() == 0
    }

    /// Column names in file order
    #[must_use]
    pub fn columns(&self) -> Vec<String> {
        self.table.column_names()
    }

    /// Decode every session of the log.
    ///
    /// # Arguments
    ///
    /// * `conditions` - Number of catalog rows; every `condition` cell must lie in `1..=conditions`
    ///
    /// # Errors
    /// Returns [`Error::InvalidCondition`] for an empty, non-integer or
    /// out-of-range `condition` cell
    pub fn records(&self, conditions: usize) -> Result<Vec<SessionRecord>> {
        let index = |name: &str| self.required_column(name);
        let participant = self.table.column_values(index(PARTICIPANT)?)?;
        let datetime = self.table.column_values(index(DATETIME)?)?;
        let keep = self.table.column_values(index(KEEP)?)?;
        let condition = index(CONDITION)?;
        let factor_columns = self
            .factors
            .iter()
            .map(|name| Ok((name, self.table.column_values(index(name)?)?)))
            .collect::<Result<Vec<_>>>()?;

        (0..self.len())
            .map(|row| {
                let value = self.parse_condition(row, condition)?;
                if value > conditions {
                    return Err(self.invalid_condition(row, value.to_string()));
                }
                let factors: FactorValues = factor_columns
                    .iter()
                    .map(|(name, values)| ((*name).to_string(), values[row].clone()))
                    .collect();
                Ok(SessionRecord::builder(participant[row].clone(), value)
                    .datetime(datetime[row].clone())
                    .factors(factors)
                    .kept(keep[row] == KEPT)
                    .build())
            })
            .collect()
    }

    /// Append one session, marked kept, to the in-memory log.
    ///
    /// The `condition` column becomes an integer column. The file is not
    /// touched until [`persist`](Self::persist).
    ///
    /// # Errors
    /// Returns [`Error::InvalidCondition`] if an existing `condition` cell is not an integer
    pub fn append(&mut self, record: &SessionRecord) -> Result<()> {
        let batch = self.appended(record)?;
        self.table.replace_batch(batch);
        info!(
            participant = record.participant(),
            condition = record.condition(),
            sessions = self.len(),
            "appended session"
        );
        Ok(())
    }

    /// Log content with `record` appended, without touching the store
    fn appended(&self, record: &SessionRecord) -> Result<RecordBatch> {
        let schema = self.table.batch().schema();
        let mut fields = Vec::with_capacity(schema.fields().len());
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());

        for (column, field) in schema.fields().iter().enumerate() {
            let name = field.name().as_str();
            if name == CONDITION {
                let mut values = (0..self.len())
                    .map(|row| self.parse_condition(row, column).and_then(to_i64))
                    .collect::<Result<Vec<i64>>>()?;
                values.push(to_i64(record.condition())?);
                fields.push(Field::new(name, DataType::Int64, false));
                columns.push(Arc::new(Int64Array::from(values)));
            } else {
                let mut values = self.table.column_values(column)?;
                values.push(cell(record, name));
                fields.push(Field::new(name, DataType::Utf8, true));
                columns.push(string_column(values));
            }
        }

        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
    }

    /// Overwrite the sessions file with the in-memory log
    ///
    /// # Errors
    /// Returns [`Error::Unwritable`] if the file cannot be written
    pub fn persist(&self) -> Result<()> {
        self.table.persist()?;
        info!(path = %self.path().display(), sessions = self.len(), "saved session log");
        Ok(())
    }

    /// Append one kept session and write the log to disk.
    ///
    /// The in-memory log only changes once the file is written, so a failed
    /// save can be retried without duplicating the session.
    ///
    /// # Errors
    /// See [`append`](Self::append) and [`persist`](Self::persist)
    pub fn save(&mut self, record: &SessionRecord) -> Result<()> {
        let batch = self.appended(record)?;
        self.table.write_batch(&batch)?;
        self.table.replace_batch(batch);
        info!(
            participant = record.participant(),
            condition = record.condition(),
            path = %self.path().display(),
            sessions = self.len(),
            "saved session"
        );
        Ok(())
    }

    fn required_column(&self, name: &str) -> Result<usize> {
        self.table
            .column_index(name)
            .ok_or_else(|| mismatch(&self.table, &self.factors))
    }

    fn parse_condition(&self, row: usize, column: usize) -> Result<usize> {
        let value = self.table.value(row, column)?;
        match value.trim().parse::<usize>() {
            Ok(condition) if condition > 0 => Ok(condition),
            _ => Err(self.invalid_condition(row, value)),
        }
    }

    fn invalid_condition(&self, row: usize, value: String) -> Error {
        Error::InvalidCondition {
            path: self.path().to_path_buf(),
            row: row + 1,
            value,
        }
    }
}

/// Cell content of `record` for a session log column
fn cell(record: &SessionRecord, column: &str) -> String {
    match column {
        PARTICIPANT => record.participant().to_string(),
        DATETIME => record.datetime().to_string(),
        // Appended sessions are always kept
        KEEP => KEPT.to_string(),
        factor => record.factor(factor).unwrap_or_default().to_string(),
    }
}

fn to_i64(condition: usize) -> Result<i64> {
    i64::try_from(condition)
        .map_err(|_| Error::StorageError(format!("condition {condition} does not fit in i64")))
}

/// Columns minus the reserved ones must be exactly the declared factors
fn validate_columns(table: &DelimitedTable, factors: &FactorSet) -> Result<()> {
    let columns: BTreeSet<String> = table.column_names().into_iter().collect();
    let has_reserved = RESERVED_COLUMNS.iter().all(|c| columns.contains(*c));
    let found: BTreeSet<String> = columns
        .into_iter()
        .filter(|c| !RESERVED_COLUMNS.contains(&c.as_str()))
        .collect();

    if has_reserved && &found == factors.as_set() {
        Ok(())
    } else {
        Err(mismatch(table, factors))
    }
}

fn mismatch(table: &DelimitedTable, factors: &FactorSet) -> Error {
    Error::SchemaMismatch {
        path: table.path().to_path_buf(),
        expected: factors.iter().map(str::to_string).collect(),
        found: table
            .column_names()
            .into_iter()
            .filter(|c| !RESERVED_COLUMNS.contains(&c.as_str()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use std::fs;
    use tempfile::TempDir;

    fn factors() -> FactorSet {
        FactorSet::new(["age"]).unwrap()
    }

    #[test]
    fn test_init_when_absent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions.csv");

        let store = SessionStore::load_or_init(&path, &factors(), b';', true).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.delimiter(), b';');
        assert_eq!(
            store.columns(),
            vec!["participant", "datetime", "age", "condition", "keep"]
        );
        // Nothing written before the first save
        assert!(!path.exists());
    }

    #[test]
    fn test_load_validates_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions.csv");
        fs::write(&path, "participant,datetime,site,condition,keep\n").unwrap();

        let err = SessionStore::load_or_init(&path, &factors(), b';', true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
        assert!(err.to_string().contains("sessions.csv"));
    }

    #[test]
    fn test_load_requires_superset_equality() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions.csv");
        fs::write(&path, "participant,datetime,age,site,condition,keep\n").unwrap();

        let err = SessionStore::load_or_init(&path, &factors(), b';', true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
    }

    #[test]
    fn test_load_requires_keep_column() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions.csv");
        fs::write(&path, "participant,datetime,age,condition\nP01,d,young,1\n").unwrap();

        let err = SessionStore::load_or_init(&path, &factors(), b';', true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
    }

    #[test]
    fn test_records_decode() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions.csv");
        fs::write(
            &path,
            "participant,datetime,age,condition,keep\nP01,d1,young,2,yes\nP02,d2,old,1,no\n",
        )
        .unwrap();

        let store = SessionStore::load_or_init(&path, &factors(), b';', true).unwrap();
        let records = store.records(3).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].participant(), "P01");
        assert_eq!(records[0].condition(), 2);
        assert_eq!(records[0].factor("age"), Some("young"));
        assert!(records[0].is_kept());
        assert!(!records[1].is_kept());
    }

    #[test]
    fn test_records_reject_out_of_range_condition() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions.csv");
        fs::write(&path, "participant,datetime,age,condition,keep\nP01,d1,young,4,yes\n").unwrap();

        let store = SessionStore::load_or_init(&path, &factors(), b';', true).unwrap();
        let err = store.records(3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCondition);
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn test_records_reject_non_integer_condition() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions.csv");
        fs::write(&path, "participant,datetime,age,condition,keep\nP01,d1,young,two,yes\n").unwrap();

        let store = SessionStore::load_or_init(&path, &factors(), b';', true).unwrap();
        assert_eq!(store.records(3).unwrap_err().kind(), ErrorKind::InvalidCondition);
    }

    #[test]
    fn test_append_marks_kept_and_types_condition() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions.csv");
        fs::write(&path, "participant,datetime,age,condition,keep\nP01,d1,young,2,yes\n").unwrap();

        let mut store = SessionStore::load_or_init(&path, &factors(), b';', true).unwrap();
        let record = SessionRecord::builder("P02", 1)
            .datetime("d2")
            .factor("age", "old")
            .build();
        store.append(&record).unwrap();

        assert_eq!(store.len(), 2);
        let schema = store.table.batch().schema();
        assert_eq!(schema.field_with_name(CONDITION).unwrap().data_type(), &DataType::Int64);

        let records = store.records(3).unwrap();
        assert!(records[1].is_kept());
        assert_eq!(records[1].factor("age"), Some("old"));
    }

    #[test]
    fn test_failed_save_leaves_log_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions.csv");
        let mut store = SessionStore::load_or_init(&path, &factors(), b';', true).unwrap();
        let record = SessionRecord::builder("P01", 1)
            .datetime("d1")
            .factor("age", "young")
            .build();

        // A directory in place of the file cannot be overwritten
        fs::create_dir(&path).unwrap();
        let err = store.save(&record).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unwritable);
        assert!(store.is_empty());

        fs::remove_dir(&path).unwrap();
        store.save(&record).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "participant;datetime;age;condition;keep\nP01;d1;young;1;yes\n"
        );
    }

    #[test]
    fn test_save_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions.csv");

        let mut store = SessionStore::load_or_init(&path, &factors(), b';', true).unwrap();
        let record = SessionRecord::builder("P01", 3)
            .datetime("2024-03-01_10h15.02.113")
            .factor("age", "young")
            .build();
        store.save(&record).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "participant;datetime;age;condition;keep\nP01;2024-03-01_10h15.02.113;young;3;yes\n"
        );
    }
}
