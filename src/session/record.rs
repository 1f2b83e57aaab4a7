//! Session Record - one row of the session log

use super::{FactorValues, KEPT};
use serde::{Deserialize, Serialize};

/// Session Record represents one assignment of a participant to a condition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionRecord {
    participant: String,
    datetime: String,
    factors: FactorValues,
    condition: usize,
    keep: bool,
}

impl SessionRecord {
    /// Create a record that is not yet kept, with no factors.
    ///
    /// # Arguments
    ///
    /// * `participant` - Participant identifier
    /// * `datetime` - Session timestamp, as recorded by the host
    /// * `condition` - 1-based catalog row
    #[must_use]
    pub fn new(participant: impl Into<String>, datetime: impl Into<String>, condition: usize) -> Self {
        Self {
            participant: participant.into(),
            datetime: datetime.into(),
            factors: FactorValues::new(),
            condition,
            keep: false,
        }
    }

    /// Create a builder for constructing a record with optional fields.
    #[must_use]
    pub fn builder(participant: impl Into<String>, condition: usize) -> SessionRecordBuilder {
        SessionRecordBuilder::new(participant, condition)
    }

    /// Get the participant identifier.
    #[must_use]
    pub fn participant(&self) -> &str {
        &self.participant
    }

    /// Get the session timestamp.
    #[must_use]
    pub fn datetime(&self) -> &str {
        &self.datetime
    }

    /// Get the factor values.
    #[must_use]
    pub const fn factors(&self) -> &FactorValues {
        &self.factors
    }

    /// Get one factor value.
    #[must_use]
    pub fn factor(&self, name: &str) -> Option<&str> {
        self.factors.get(name).map(String::as_str)
    }

    /// Get the 1-based condition index.
    #[must_use]
    pub const fn condition(&self) -> usize {
        self.condition
    }

    /// Whether the session counts toward balancing.
    #[must_use]
    pub const fn is_kept(&self) -> bool {
        self.keep
    }

    /// Mark the session as kept.
    pub fn keep(&mut self) {
        self.keep = true;
    }

    /// `keep` column content for this record
    #[must_use]
    pub const fn keep_value(&self) -> &'static str {
        if self.keep {
            KEPT
        } else {
            "no"
        }
    }

    /// Whether every given factor has exactly the same value in this record.
    ///
    /// A factor missing from the record never matches.
    #[must_use]
    pub fn matches(&self, factors: &FactorValues) -> bool {
        factors
            .iter()
            .all(|(name, value)| self.factor(name) == Some(value.as_str()))
    }
}

/// Builder for `SessionRecord`.
#[derive(Debug)]
pub struct SessionRecordBuilder {
    participant: String,
    datetime: String,
    factors: FactorValues,
    condition: usize,
    keep: bool,
}

impl SessionRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(participant: impl Into<String>, condition: usize) -> Self {
        Self {
            participant: participant.into(),
            datetime: String::new(),
            factors: FactorValues::new(),
            condition,
            keep: false,
        }
    }

    /// Set the session timestamp.
    #[must_use]
    pub fn datetime(mut self, datetime: impl Into<String>) -> Self {
        self.datetime = datetime.into();
        self
    }

    /// Set one factor value.
    #[must_use]
    pub fn factor(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.factors.insert(name.into(), value.into());
        self
    }

    /// Replace all factor values.
    #[must_use]
    pub fn factors(mut self, factors: FactorValues) -> Self {
        self.factors = factors;
        self
    }

    /// Set the keep flag.
    #[must_use]
    pub const fn kept(mut self, keep: bool) -> Self {
        self.keep = keep;
        self
    }

    /// Build the `SessionRecord`.
    #[must_use]
    pub fn build(self) -> SessionRecord {
        SessionRecord {
            participant: self.participant,
            datetime: self.datetime,
            factors: self.factors,
            condition: self.condition,
            keep: self.keep,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_defaults_not_kept() {
        let record = SessionRecord::new("P01", "2024-03-01", 1);
        assert!(!record.is_kept());
        assert_eq!(record.keep_value(), "no");
        assert!(record.factors().is_empty());
    }

    #[test]
    fn test_record_keep() {
        let mut record = SessionRecord::new("P01", "2024-03-01", 1);
        record.keep();
        assert!(record.is_kept());
        assert_eq!(record.keep_value(), "yes");
    }

    #[test]
    fn test_matches_is_conjunctive() {
        let record = SessionRecord::builder("P01", 1)
            .factor("age", "young")
            .factor("site", "A")
            .build();

        let mut query = FactorValues::new();
        query.insert("age".into(), "young".into());
        assert!(record.matches(&query));

        query.insert("site".into(), "B".into());
        assert!(!record.matches(&query));

        query.insert("site".into(), "A".into());
        assert!(record.matches(&query));

        query.insert("arm".into(), "1".into());
        assert!(!record.matches(&query));
    }

    #[test]
    fn test_matches_exact_string() {
        let record = SessionRecord::builder("P01", 1).factor("age", "Young").build();
        let query = FactorValues::from([("age".to_string(), "young".to_string())]);
        assert!(!record.matches(&query));
    }
}
