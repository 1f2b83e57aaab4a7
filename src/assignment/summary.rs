//! Group occupancy report

use std::collections::BTreeMap;
use std::fmt;

use super::GroupSize;
use crate::session::{FactorSet, FactorValues, SessionRecord};

/// Kept sessions sharing one combination of factor values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCount {
    factors: Vec<(String, String)>,
    count: usize,
}

impl GroupCount {
    /// `(factor, value)` pairs, in factor order
    #[must_use]
    pub fn factors(&self) -> &[(String, String)] {
        &self.factors
    }

    /// Number of kept sessions in the group
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }
}

/// Kept sessions per distinct factor combination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    groups: Vec<GroupCount>,
    target: GroupSize,
}

impl Summary {
    /// Group the kept sessions of `records` by their values for `factors`
    #[must_use]
    pub fn from_records(records: &[SessionRecord], factors: &FactorSet, target: GroupSize) -> Self {
        let mut counts: BTreeMap<Vec<(String, String)>, usize> = BTreeMap::new();
        for record in records.iter().filter(|r| r.is_kept()) {
            let key = factors
                .iter()
                .map(|f| (f.to_string(), record.factor(f).unwrap_or_default().to_string()))
                .collect();
            *counts.entry(key).or_default() += 1;
        }

        let groups = counts
            .into_iter()
            .map(|(factors, count)| GroupCount { factors, count })
            .collect();
        Self { groups, target }
    }

    /// Groups sorted by factor values
    #[must_use]
    pub fn groups(&self) -> &[GroupCount] {
        &self.groups
    }

    /// Advisory group size
    #[must_use]
    pub const fn target(&self) -> GroupSize {
        self.target
    }

    /// Kept sessions whose factor values equal `factors`
    #[must_use]
    pub fn count_for(&self, factors: &FactorValues) -> usize {
        self.groups
            .iter()
            .find(|g| {
                g.factors.len() == factors.len()
                    && g.factors
                        .iter()
                        .all(|(name, value)| factors.get(name) == Some(value))
            })
            .map_or(0, GroupCount::count)
    }

    /// Total kept sessions
    #[must_use]
    pub fn total(&self) -> usize {
        self.groups.iter().map(GroupCount::count).sum()
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for group in &self.groups {
            let label = group
                .factors
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(f, "{label}: {}", group.count)?;
        }
        if let GroupSize::Target(n) = self.target {
            writeln!(f, "target group size: {n}")?;
        }
        Ok(())
    }
}
