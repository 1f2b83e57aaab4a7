//! Error types for condition balancing
//!
//! Every failure halts an assignment: there is no recoverable category.
//! Messages name the offending file or field so the experimenter can fix
//! the configuration without reading code.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Condition balancer error types
#[derive(Error, Debug)]
pub enum Error {
    /// The condition catalog does not exist (or is not a regular file)
    #[error("File {} not found", path.display())]
    CatalogNotFound {
        /// Expected catalog location
        path: PathBuf,
    },

    /// The condition catalog has a header but no condition rows
    #[error("File {} does not define any condition", path.display())]
    EmptyCatalog {
        /// Catalog location
        path: PathBuf,
    },

    /// A table exists but could not be overwritten
    #[error("File {} exists but it is not possible to overwrite it.\nCheck its permission modes or whether it is locked by another program.", path.display())]
    Unwritable {
        /// File that could not be written
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The classification info lacks a required field
    #[error("The Experiment info must have the field '{0}'")]
    MissingField(String),

    /// The classification info carries a field reserved for the session log
    #[error("The Experiment info must not have the field '{0}'")]
    ForbiddenField(String),

    /// No classification factor remains once bookkeeping fields are removed
    #[error("The Experiment info must have at least one field besides the bookkeeping ones")]
    EmptyFactorSet,

    /// Session log columns drifted from the declared factors
    #[error("Mismatch between the fields in the Experiment info and the column names in file {}\nExpected factors: {expected:?}\nFound factors: {found:?}", path.display())]
    SchemaMismatch {
        /// Session log location
        path: PathBuf,
        /// Factors declared by the classification info
        expected: Vec<String>,
        /// Non-reserved columns found in the session log
        found: Vec<String>,
    },

    /// Lookup of a column the catalog does not declare
    #[error("There is no column '{column}' in file '{}'", catalog.display())]
    UnknownColumn {
        /// Requested column
        column: String,
        /// Catalog location
        catalog: PathBuf,
    },

    /// A session row references a condition the catalog does not have
    #[error("Invalid condition '{value}' at row {row} of file {}", path.display())]
    InvalidCondition {
        /// Session log location
        path: PathBuf,
        /// 1-based data row
        row: usize,
        /// Offending cell
        value: String,
    },

    /// The assignment was already appended to the session log
    #[error("Session for participant '{0}' was already saved")]
    AlreadyFinished(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error (delimited text parsing, schema handling)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

/// Discriminant of [`Error`], for callers that branch on the failure class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`Error::CatalogNotFound`]
    CatalogNotFound,
    /// See [`Error::EmptyCatalog`]
    EmptyCatalog,
    /// See [`Error::Unwritable`]
    Unwritable,
    /// See [`Error::MissingField`]
    MissingField,
    /// See [`Error::ForbiddenField`]
    ForbiddenField,
    /// See [`Error::EmptyFactorSet`]
    EmptyFactorSet,
    /// See [`Error::SchemaMismatch`]
    SchemaMismatch,
    /// See [`Error::UnknownColumn`]
    UnknownColumn,
    /// See [`Error::InvalidCondition`]
    InvalidCondition,
    /// See [`Error::AlreadyFinished`]
    AlreadyFinished,
    /// See [`Error::Config`]
    Config,
    /// See [`Error::Io`]
    Io,
    /// Arrow and parsing failures
    Storage,
}

impl Error {
    /// Failure class of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::CatalogNotFound { .. } => ErrorKind::CatalogNotFound,
            Self::EmptyCatalog { .. } => ErrorKind::EmptyCatalog,
            Self::Unwritable { .. } => ErrorKind::Unwritable,
            Self::MissingField(_) => ErrorKind::MissingField,
            Self::ForbiddenField(_) => ErrorKind::ForbiddenField,
            Self::EmptyFactorSet => ErrorKind::EmptyFactorSet,
            Self::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
            Self::UnknownColumn { .. } => ErrorKind::UnknownColumn,
            Self::InvalidCondition { .. } => ErrorKind::InvalidCondition,
            Self::AlreadyFinished(_) => ErrorKind::AlreadyFinished,
            Self::Config(_) => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Io,
            Self::StorageError(_) | Self::Arrow(_) => ErrorKind::Storage,
        }
    }
}
