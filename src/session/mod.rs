//! Session log schema
//!
//! The session log is the single source of truth between runs: one row per
//! completed assignment, append-only.
//!
//! ## Columns
//!
//! ```text
//! participant | datetime | <factor>... | condition | keep
//! ```
//!
//! `condition` is the 1-based catalog row. `keep` is `"yes"` for sessions
//! that count toward balancing; any other value excludes the row.
//!
//! ## Usage
//!
//! ```rust
//! use condition_balancer::session::{FactorSet, SessionRecord};
//!
//! let factors = FactorSet::new(["age", "site"])?;
//! assert_eq!(factors.len(), 2);
//!
//! let record = SessionRecord::builder("P01", 2)
//!     .datetime("2024-03-01_10h15.02.113")
//!     .factor("age", "young")
//!     .factor("site", "A")
//!     .kept(true)
//!     .build();
//! assert!(record.is_kept());
//! # Ok::<(), condition_balancer::Error>(())
//! ```

mod record;
mod store;

pub use record::{SessionRecord, SessionRecordBuilder};
pub use store::SessionStore;

use crate::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};

/// Participant identifier column
pub const PARTICIPANT: &str = "participant";
/// Session timestamp column
pub const DATETIME: &str = "datetime";
/// Chosen condition column (1-based catalog row)
pub const CONDITION: &str = "condition";
/// Validity flag column
pub const KEEP: &str = "keep";
/// `keep` value marking a session that counts toward balancing
pub const KEPT: &str = "yes";

/// Columns of the session log that are not classification factors
pub const RESERVED_COLUMNS: [&str; 4] = [PARTICIPANT, DATETIME, CONDITION, KEEP];

/// Factor name to factor value, for one participant
pub type FactorValues = BTreeMap<String, String>;

/// Set of classification factors balancing is stratified on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactorSet(BTreeSet<String>);

impl FactorSet {
    /// Build a factor set.
    ///
    /// # Errors
    /// Returns error if:
    /// - The set is empty ([`Error::EmptyFactorSet`])
    /// - It contains a session log column name such as `datetime` or
    ///   `condition` ([`Error::ForbiddenField`])
    pub fn new<I, S>(factors: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let factors: BTreeSet<String> = factors.into_iter().map(Into::into).collect();
        if let Some(forbidden) = RESERVED_COLUMNS.iter().find(|f| factors.contains(**f)) {
            return Err(Error::ForbiddenField((*forbidden).to_string()));
        }
        if factors.is_empty() {
            return Err(Error::EmptyFactorSet);
        }
        Ok(Self(factors))
    }

    /// Number of factors
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false` for a successfully built set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `name` is a factor
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    /// Factor names in lexicographic order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Column layout of a fresh session log for these factors
    #[must_use]
    pub fn session_columns(&self) -> Vec<String> {
        let mut columns = vec![PARTICIPANT.to_string(), DATETIME.to_string()];
        columns.extend(self.0.iter().cloned());
        columns.push(CONDITION.to_string());
        columns.push(KEEP.to_string());
        columns
    }

    pub(crate) const fn as_set(&self) -> &BTreeSet<String> {
        &self.0
    }
}
