//! Classification info supplied by the host for the current participant

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::session::{FactorSet, FactorValues, CONDITION, DATETIME, KEEP, PARTICIPANT};
use crate::{Error, Result};

/// Session date field
pub const DATE: &str = "date";

/// Host bookkeeping fields, never used as factors
pub const BOOKKEEPING_FIELDS: [&str; 5] = [PARTICIPANT, DATE, "expName", "psychopyVersion", "frameRate"];

/// Fields the host must not supply, they are session log columns
pub const FORBIDDEN_FIELDS: [&str; 3] = [DATETIME, CONDITION, KEEP];

/// Field name to value mapping describing the current participant.
///
/// Must contain `participant`. Every field that is not a bookkeeping field
/// is a classification factor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassificationInfo {
    fields: BTreeMap<String, String>,
}

impl ClassificationInfo {
    /// Create an empty info mapping
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a field, replacing any previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Value of a field
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Participant identifier
    ///
    /// # Errors
    /// Returns [`Error::MissingField`] if `participant` is absent
    pub fn participant(&self) -> Result<&str> {
        self.get(PARTICIPANT)
            .ok_or_else(|| Error::MissingField(PARTICIPANT.to_string()))
    }

    /// Session date, when the host provides one
    #[must_use]
    pub fn date(&self) -> Option<&str> {
        self.get(DATE)
    }

    /// Check required and forbidden fields
    ///
    /// # Errors
    /// Returns [`Error::MissingField`] or [`Error::ForbiddenField`]
    pub fn validate(&self) -> Result<()> {
        self.participant()?;
        if let Some(field) = FORBIDDEN_FIELDS.iter().find(|f| self.fields.contains_key(**f)) {
            return Err(Error::ForbiddenField((*field).to_string()));
        }
        Ok(())
    }

    /// Classification factors: every field except the bookkeeping ones
    ///
    /// # Errors
    /// Returns [`Error::EmptyFactorSet`] or [`Error::ForbiddenField`]
    pub fn factor_set(&self) -> Result<FactorSet> {
        FactorSet::new(self.factor_names())
    }

    /// Factor values of the current participant
    #[must_use]
    pub fn factor_values(&self) -> FactorValues {
        self.fields
            .iter()
            .filter(|(name, _)| !BOOKKEEPING_FIELDS.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    fn factor_names(&self) -> impl Iterator<Item = &str> {
        self.fields
            .keys()
            .map(String::as_str)
            .filter(|name| !BOOKKEEPING_FIELDS.contains(name))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ClassificationInfo {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// One `name=value` field, as given on a command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoField {
    /// Field name
    pub name: String,
    /// Field value
    pub value: String,
}

impl FromStr for InfoField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => Ok(Self {
                name: name.trim().to_string(),
                value: value.to_string(),
            }),
            _ => Err(Error::Config(format!("expected name=value, got '{s}'"))),
        }
    }
}

impl FromIterator<InfoField> for ClassificationInfo {
    fn from_iter<I: IntoIterator<Item = InfoField>>(iter: I) -> Self {
        iter.into_iter().map(|f| (f.name, f.value)).collect()
    }
}
