//! Condition catalog
//!
//! One row per experimental condition, arbitrary columns. The 1-based row
//! position is the condition index recorded in the session log.

use crate::storage::{DelimitedTable, DEFAULT_DELIMITER};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Ordered, immutable table of conditions
#[derive(Debug, Clone)]
pub struct ConditionCatalog {
    table: DelimitedTable,
}

impl ConditionCatalog {
    /// Load the catalog from a delimited text file.
    ///
    /// # Arguments
    ///
    /// * `path` - Conditions file
    /// * `normalize` - Rewrite the file with its detected delimiter after reading
    ///
    /// # Errors
    /// Returns error if:
    /// - The file does not exist ([`Error::CatalogNotFound`])
    /// - The file cannot be parsed or, with `normalize`, overwritten
    /// - The file has no condition row ([`Error::EmptyCatalog`])
    pub fn load<P: AsRef<Path>>(path: P, normalize: bool) -> Result<Self> {
        let path = path.as_ref();
        let table = DelimitedTable::load_with(path, DEFAULT_DELIMITER, normalize)?.ok_or_else(
            || Error::CatalogNotFound {
                path: path.to_path_buf(),
            },
        )?;
        let catalog = Self::from_table(table)?;
        info!(
            path = %path.display(),
            conditions = catalog.len(),
            "loaded condition catalog"
        );
        Ok(catalog)
    }

    /// Build a catalog from an already loaded table
    ///
    /// # Errors
    /// Returns [`Error::EmptyCatalog`] if the table has no rows
    pub fn from_table(table: DelimitedTable) -> Result<Self> {
        if table.num_rows() == 0 {
            return Err(Error::EmptyCatalog {
                path: table.path().to_path_buf(),
            });
        }
        Ok(Self { table })
    }

    /// Number of conditions
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.num_rows()
    }

    /// Always `false` for a successfully built catalog
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.num_rows() == 0
    }

    /// Conditions file
    #[must_use]
    pub fn path(&self) -> &Path {
        self.table.path()
    }

    /// Column names in file order
    #[must_use]
    pub fn columns(&self) -> Vec<String> {
        self.table.column_names()
    }

    /// Resolve a condition row by its 1-based index
    ///
    /// # Errors
    /// Returns [`Error::InvalidCondition`] if `condition` is outside `1..=len`
    pub fn row(&self, condition: usize) -> Result<ConditionRow> {
        if condition == 0 || condition > self.len() {
            return Err(Error::InvalidCondition {
                path: self.path().to_path_buf(),
                row: condition,
                value: condition.to_string(),
            });
        }

        let row = condition - 1;
        let fields = self
            .columns()
            .into_iter()
            .enumerate()
            .map(|(column, name)| Ok((name, self.table.value(row, column)?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(ConditionRow {
            condition,
            catalog: self.path().to_path_buf(),
            fields,
        })
    }
}

/// Column values of one catalog row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionRow {
    condition: usize,
    catalog: PathBuf,
    fields: Vec<(String, String)>,
}

impl ConditionRow {
    /// 1-based condition index
    #[must_use]
    pub const fn condition(&self) -> usize {
        self.condition
    }

    /// Value of a catalog column
    ///
    /// # Errors
    /// Returns [`Error::UnknownColumn`] naming the column and the catalog file
    pub fn get(&self, column: &str) -> Result<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
            .ok_or_else(|| Error::UnknownColumn {
                column: column.to_string(),
                catalog: self.catalog.clone(),
            })
    }

    /// `(column, value)` pairs in catalog column order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use std::fs;
    use tempfile::TempDir;

    fn catalog(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("conditions.csv");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_catalog_load() {
        let dir = TempDir::new().unwrap();
        let path = catalog(&dir, "stimulus,soa\na.png,100\nb.png,200\nc.png,300\n");

        let catalog = ConditionCatalog::load(&path, true).unwrap();
        assert_eq!(catalog.len(), 3);
        assert!(!catalog.is_empty());
        assert_eq!(catalog.columns(), vec!["stimulus", "soa"]);
    }

    #[test]
    fn test_catalog_not_found() {
        let dir = TempDir::new().unwrap();
        let err = ConditionCatalog::load(dir.path().join("conditions.csv"), true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CatalogNotFound);
        assert!(err.to_string().contains("conditions.csv"));
    }

    #[test]
    fn test_catalog_empty() {
        let dir = TempDir::new().unwrap();
        let path = catalog(&dir, "stimulus,soa\n");

        let err = ConditionCatalog::load(&path, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyCatalog);
    }

    #[test]
    fn test_row_lookup() {
        let dir = TempDir::new().unwrap();
        let path = catalog(&dir, "stimulus;soa\na.png;100\nb.png;200\n");
        let catalog = ConditionCatalog::load(&path, false).unwrap();

        let row = catalog.row(2).unwrap();
        assert_eq!(row.condition(), 2);
        assert_eq!(row.get("stimulus").unwrap(), "b.png");
        assert_eq!(row.get("soa").unwrap(), "200");
        assert_eq!(
            row.fields().collect::<Vec<_>>(),
            vec![("stimulus", "b.png"), ("soa", "200")]
        );
    }

    #[test]
    fn test_row_unknown_column() {
        let dir = TempDir::new().unwrap();
        let path = catalog(&dir, "stimulus\na.png\n");
        let catalog = ConditionCatalog::load(&path, false).unwrap();

        let err = catalog.row(1).unwrap().get("duration").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownColumn);
        let message = err.to_string();
        assert!(message.contains("'duration'"));
        assert!(message.contains("conditions.csv"));
    }

    #[test]
    fn test_row_out_of_range() {
        let dir = TempDir::new().unwrap();
        let path = catalog(&dir, "stimulus\na.png\n");
        let catalog = ConditionCatalog::load(&path, false).unwrap();

        assert!(catalog.row(0).is_err());
        assert!(catalog.row(2).is_err());
    }
}
