//! Assignment of the current participant to a condition
//!
//! ## Lifecycle
//!
//! ```text
//! Assignment::new ──> get_field(...)* ──> finish ──> Summary
//!   load catalog        chosen row          append kept row
//!   load session log                        persist log
//!   choose condition                        summarize
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use condition_balancer::assignment::{Assignment, AssignmentConfig, ClassificationInfo};
//!
//! let info = ClassificationInfo::new()
//!     .with("participant", "P01")
//!     .with("age", "young");
//!
//! let mut assignment = Assignment::new(AssignmentConfig::default(), &info)?;
//! let stimulus = assignment.get_field("stimulus")?.to_string();
//!
//! // ... run the experiment with `stimulus` ...
//!
//! let summary = assignment.finish()?;
//! println!("{summary}");
//! # Ok::<(), condition_balancer::Error>(())
//! ```

mod config;
mod info;
mod summary;

pub use config::{
    AssignmentConfig, AssignmentConfigBuilder, GroupSize, DEFAULT_CONDITIONS, DEFAULT_SESSIONS,
    DEFAULT_SESSION_DELIMITER,
};
pub use info::{ClassificationInfo, InfoField, BOOKKEEPING_FIELDS, DATE, FORBIDDEN_FIELDS};
pub use summary::{GroupCount, Summary};

use chrono::Local;
use tracing::info;

use crate::balance::{self, BalanceReport};
use crate::catalog::{ConditionCatalog, ConditionRow};
use crate::session::{FactorValues, SessionRecord, SessionStore};
use crate::{Error, Result};

/// Timestamp format used when the host supplies no date
pub const DATETIME_FORMAT: &str = "%Y-%m-%d_%Hh%M.%S.%3f";

/// Condition chosen for the current participant, pending its log entry
#[derive(Debug)]
pub struct Assignment {
    config: AssignmentConfig,
    participant: String,
    datetime: String,
    factors: FactorValues,
    conditions: usize,
    row: ConditionRow,
    report: BalanceReport,
    store: SessionStore,
    finished: bool,
}

impl Assignment {
    /// Choose a condition for the participant described by `info`.
    ///
    /// Loads the catalog and the session log named in `config`, checks that
    /// the log columns match the factors of `info`, then picks the least used
    /// condition among kept sessions with the same factor values.
    ///
    /// # Errors
    /// Returns error if:
    /// - `info` lacks `participant` or carries `condition`/`keep`
    /// - The catalog is missing, empty or unwritable
    /// - `info` has no factor besides the bookkeeping fields
    /// - The session log columns do not match the factors
    /// - The session log references a condition the catalog does not have
    pub fn new(config: AssignmentConfig, info: &ClassificationInfo) -> Result<Self> {
        info.validate()?;
        let participant = info.participant()?.to_string();
        let datetime = info
            .date()
            .map_or_else(|| Local::now().format(DATETIME_FORMAT).to_string(), str::to_string);

        let catalog = ConditionCatalog::load(config.conditions(), config.normalize_on_read())?;
        let factor_set = info.factor_set()?;
        let store = SessionStore::load_or_init(
            config.sessions(),
            &factor_set,
            config.delimiter_byte()?,
            config.normalize_on_read(),
        )?;

        let factors = info.factor_values();
        let records = store.records(catalog.len())?;
        let report = balance::choose(&catalog, &records, &factors)?;
        let row = catalog.row(report.condition())?;

        info!(
            participant = %participant,
            condition = report.condition(),
            matching = report.chosen_count(),
            "assigned condition"
        );

        Ok(Self {
            config,
            participant,
            datetime,
            factors,
            conditions: catalog.len(),
            row,
            report,
            store,
            finished: false,
        })
    }

    /// Participant identifier
    #[must_use]
    pub fn participant(&self) -> &str {
        &self.participant
    }

    /// Session timestamp
    #[must_use]
    pub fn datetime(&self) -> &str {
        &self.datetime
    }

    /// Chosen condition (1-based catalog row)
    #[must_use]
    pub const fn condition(&self) -> usize {
        self.report.condition()
    }

    /// Factor values of the participant
    #[must_use]
    pub const fn factors(&self) -> &FactorValues {
        &self.factors
    }

    /// Matching kept sessions per condition, as seen when choosing
    #[must_use]
    pub fn counts(&self) -> &[usize] {
        self.report.counts()
    }

    /// Catalog row of the chosen condition
    #[must_use]
    pub const fn row(&self) -> &ConditionRow {
        &self.row
    }

    /// Value of a catalog column for the chosen condition
    ///
    /// # Errors
    /// Returns [`Error::UnknownColumn`] naming the column and the conditions file
    pub fn get_field(&self, column: &str) -> Result<&str> {
        self.row.get(column)
    }

    /// Whether [`finish`](Self::finish) already saved this session
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Session record this assignment appends on [`finish`](Self::finish)
    #[must_use]
    pub fn record(&self) -> SessionRecord {
        SessionRecord::builder(self.participant.clone(), self.condition())
            .datetime(self.datetime.clone())
            .factors(self.factors.clone())
            .kept(true)
            .build()
    }

    /// Participant, factor values and condition, one per line
    #[must_use]
    pub fn info_message(&self) -> String {
        let mut lines = vec![format!("participant: {}", self.participant)];
        lines.extend(self.factors.iter().map(|(name, value)| format!("{name}: {value}")));
        lines.push(format!("condition: {}", self.condition()));
        lines.join("\n")
    }

    /// Kept sessions per factor combination in the current log
    ///
    /// # Errors
    /// Returns error if the session log holds an invalid condition
    pub fn summarize(&self) -> Result<Summary> {
        let records = self.store.records(self.conditions)?;
        Ok(Summary::from_records(
            &records,
            self.store.factors(),
            self.config.group_size(),
        ))
    }

    /// Append this session to the log as kept, save the log, and summarize it.
    ///
    /// The returned summary already counts the new session.
    ///
    /// # Errors
    /// Returns [`Error::AlreadyFinished`] on a second call, or any error of
    /// appending and writing the session log
    pub fn finish(&mut self) -> Result<Summary> {
        if self.finished {
            return Err(Error::AlreadyFinished(self.participant.clone()));
        }

        self.store.save(&self.record())?;
        self.finished = true;
        self.summarize()
    }
}
