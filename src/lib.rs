//! # Condition Balancer: count-balanced assignment of participants
//!
//! Assigns each new participant of an experiment to one of the conditions
//! listed in a catalog file, keeping the number of participants per
//! condition as even as possible within every combination of
//! classification factors (age group, site, counterbalancing arm, ...).
//! Every decision is appended to a session log that later runs read back.
//!
//! ## Files
//!
//! - **Conditions file**: one row per condition, arbitrary columns; row order
//!   is the condition index.
//! - **Sessions file**: `participant, datetime, <factors...>, condition, keep`.
//!   Only rows with `keep = yes` count toward balancing.
//!
//! Delimiters are sniffed from file content (`,` `;` tab `|` `:`).
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use condition_balancer::assignment::{Assignment, AssignmentConfig, ClassificationInfo};
//! use condition_balancer::host::{unwrap_or_halt, ConsoleHost};
//!
//! let mut host = ConsoleHost::new(true);
//! let info = ClassificationInfo::new()
//!     .with("participant", "P07")
//!     .with("age", "old");
//!
//! let mut assignment = unwrap_or_halt(Assignment::new(AssignmentConfig::default(), &info), &mut host);
//! println!("stimulus list: {}", unwrap_or_halt(assignment.get_field("list"), &mut host));
//!
//! let summary = unwrap_or_halt(assignment.finish(), &mut host);
//! println!("{summary}");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod assignment;
pub mod balance;
pub mod catalog;
pub mod error;
pub mod host;
pub mod session;
pub mod storage;

pub use assignment::{Assignment, AssignmentConfig, ClassificationInfo, GroupSize, Summary};
pub use error::{Error, ErrorKind, Result};
