//! Assignment configuration

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default conditions file
pub const DEFAULT_CONDITIONS: &str = "conditions.csv";
/// Default sessions file
pub const DEFAULT_SESSIONS: &str = "sessions.csv";
/// Default delimiter of a newly created sessions file
pub const DEFAULT_SESSION_DELIMITER: char = ';';

/// Desired number of kept sessions per factor combination.
///
/// Advisory only: it is reported in the summary, never enforced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GroupSizeRepr", into = "GroupSizeRepr")]
pub enum GroupSize {
    /// No target
    #[default]
    Unbounded,
    /// Target number of sessions per group
    Target(usize),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum GroupSizeRepr {
    Count(usize),
    Keyword(String),
}

impl TryFrom<GroupSizeRepr> for GroupSize {
    type Error = Error;

    fn try_from(repr: GroupSizeRepr) -> Result<Self> {
        match repr {
            GroupSizeRepr::Count(n) => Ok(Self::Target(n)),
            GroupSizeRepr::Keyword(s) => s.parse(),
        }
    }
}

impl From<GroupSize> for GroupSizeRepr {
    fn from(size: GroupSize) -> Self {
        match size {
            GroupSize::Unbounded => Self::Keyword("unbounded".to_string()),
            GroupSize::Target(n) => Self::Count(n),
        }
    }
}

impl FromStr for GroupSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("unbounded") || s.eq_ignore_ascii_case("inf") {
            return Ok(Self::Unbounded);
        }
        s.parse()
            .map(Self::Target)
            .map_err(|_| Error::Config(format!("group size must be a number or 'unbounded', got '{s}'")))
    }
}

impl fmt::Display for GroupSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => write!(f, "unbounded"),
            Self::Target(n) => write!(f, "{n}"),
        }
    }
}

/// Where the catalog and session log live and how they are handled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignmentConfig {
    conditions: PathBuf,
    sessions: PathBuf,
    delimiter: char,
    group_size: GroupSize,
    normalize_on_read: bool,
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            conditions: PathBuf::from(DEFAULT_CONDITIONS),
            sessions: PathBuf::from(DEFAULT_SESSIONS),
            delimiter: DEFAULT_SESSION_DELIMITER,
            group_size: GroupSize::Unbounded,
            normalize_on_read: true,
        }
    }
}

impl AssignmentConfig {
    /// Create a configuration builder
    #[must_use]
    pub fn builder() -> AssignmentConfigBuilder {
        AssignmentConfigBuilder::default()
    }

    /// Load a configuration from a JSON file; missing keys take their defaults
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is not a valid configuration
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.delimiter_byte()?;
        Ok(config)
    }

    /// Conditions file
    #[must_use]
    pub fn conditions(&self) -> &Path {
        &self.conditions
    }

    /// Sessions file
    #[must_use]
    pub fn sessions(&self) -> &Path {
        &self.sessions
    }

    /// Delimiter of a newly created sessions file
    #[must_use]
    pub const fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Delimiter as a byte
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the delimiter is not a single ASCII character
    pub fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                Error::Config(format!("delimiter must be ASCII, got '{}'", self.delimiter))
            })
    }

    /// Advisory group size
    #[must_use]
    pub const fn group_size(&self) -> GroupSize {
        self.group_size
    }

    /// Whether files are rewritten right after being read
    #[must_use]
    pub const fn normalize_on_read(&self) -> bool {
        self.normalize_on_read
    }
}

/// Builder for `AssignmentConfig`
#[derive(Debug, Default)]
pub struct AssignmentConfigBuilder {
    config: AssignmentConfig,
}

impl AssignmentConfigBuilder {
    /// Start from an existing configuration
    #[must_use]
    pub const fn from_config(config: AssignmentConfig) -> Self {
        Self { config }
    }

    /// Set the conditions file
    #[must_use]
    pub fn conditions(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.conditions = path.into();
        self
    }

    /// Set the sessions file
    #[must_use]
    pub fn sessions(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.sessions = path.into();
        self
    }

    /// Set the delimiter of a newly created sessions file
    #[must_use]
    pub const fn delimiter(mut self, delimiter: char) -> Self {
        self.config.delimiter = delimiter;
        self
    }

    /// Set the advisory group size
    #[must_use]
    pub const fn group_size(mut self, size: GroupSize) -> Self {
        self.config.group_size = size;
        self
    }

    /// Choose whether files are rewritten right after being read
    #[must_use]
    pub const fn normalize_on_read(mut self, normalize: bool) -> Self {
        self.config.normalize_on_read = normalize;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the delimiter is not ASCII
    pub fn build(self) -> Result<AssignmentConfig> {
        self.config.delimiter_byte()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AssignmentConfig::default();
        assert_eq!(config.conditions(), Path::new("conditions.csv"));
        assert_eq!(config.sessions(), Path::new("sessions.csv"));
        assert_eq!(config.delimiter_byte().unwrap(), b';');
        assert_eq!(config.group_size(), GroupSize::Unbounded);
        assert!(config.normalize_on_read());
    }

    #[test]
    fn test_builder() {
        let config = AssignmentConfig::builder()
            .conditions("c.csv")
            .sessions("s.csv")
            .delimiter(',')
            .group_size(GroupSize::Target(20))
            .normalize_on_read(false)
            .build()
            .unwrap();

        assert_eq!(config.sessions(), Path::new("s.csv"));
        assert_eq!(config.delimiter_byte().unwrap(), b',');
        assert_eq!(config.group_size(), GroupSize::Target(20));
        assert!(!config.normalize_on_read());
    }

    #[test]
    fn test_builder_rejects_non_ascii_delimiter() {
        assert!(AssignmentConfig::builder().delimiter('§').build().is_err());
    }

    #[test]
    fn test_group_size_parse() {
        assert_eq!("unbounded".parse::<GroupSize>().unwrap(), GroupSize::Unbounded);
        assert_eq!(" 12 ".parse::<GroupSize>().unwrap(), GroupSize::Target(12));
        assert!("lots".parse::<GroupSize>().is_err());
    }

    #[test]
    fn test_json_partial() {
        let config: AssignmentConfig =
            serde_json::from_str(r#"{"sessions": "log.csv", "group_size": 15}"#).unwrap();
        assert_eq!(config.sessions(), Path::new("log.csv"));
        assert_eq!(config.conditions(), Path::new("conditions.csv"));
        assert_eq!(config.group_size(), GroupSize::Target(15));
    }

    #[test]
    fn test_json_group_size_keyword() {
        let config: AssignmentConfig =
            serde_json::from_str(r#"{"group_size": "unbounded"}"#).unwrap();
        assert_eq!(config.group_size(), GroupSize::Unbounded);

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["group_size"], "unbounded");
    }
}
