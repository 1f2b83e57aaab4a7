//! Count-minimizing condition selection
//!
//! **Problem**: participants arrive one at a time and each must be given a
//! condition so that, within every stratum of classification factors, the
//! conditions end up used about equally often.
//!
//! **Solution**: greedy balancing. Count the kept sessions of the stratum
//! per condition and pick the least used one. Ties go to the lowest
//! condition index, so identical history always yields the same choice.
//!
//! This is not a combinatorial design (no Latin squares, no sequence
//! randomization): only per-condition counts matter.

use crate::catalog::ConditionCatalog;
use crate::session::{FactorValues, SessionRecord};
use crate::{Error, Result};
use tracing::{debug, info, warn};

/// Outcome of one balancing run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceReport {
    condition: usize,
    counts: Vec<usize>,
}

impl BalanceReport {
    /// Chosen condition (1-based)
    #[must_use]
    pub const fn condition(&self) -> usize {
        self.condition
    }

    /// Matching kept sessions per condition, index 0 is condition 1
    #[must_use]
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Matching kept sessions of the chosen condition
    #[must_use]
    pub fn chosen_count(&self) -> usize {
        self.counts[self.condition - 1]
    }
}

/// Count kept sessions matching `factors`, per condition.
///
/// A session counts when it is kept and every entry of `factors` equals the
/// session's value for that factor. Sessions whose condition lies outside
/// `1..=conditions` are skipped; the session store rejects them on load.
///
/// # Examples
///
/// ```rust
/// use condition_balancer::balance::tally;
/// use condition_balancer::session::{FactorValues, SessionRecord};
///
/// let history = vec![
///     SessionRecord::builder("P01", 1).factor("age", "young").kept(true).build(),
///     SessionRecord::builder("P02", 1).factor("age", "old").kept(true).build(),
///     SessionRecord::builder("P03", 2).factor("age", "young").kept(false).build(),
/// ];
/// let young = FactorValues::from([("age".to_string(), "young".to_string())]);
///
/// assert_eq!(tally(&history, 3, &young), vec![1, 0, 0]);
/// ```
#[must_use]
pub fn tally(records: &[SessionRecord], conditions: usize, factors: &FactorValues) -> Vec<usize> {
    let mut counts = vec![0; conditions];
    for record in records
        .iter()
        .filter(|r| r.is_kept() && r.matches(factors))
    {
        match counts.get_mut(record.condition().wrapping_sub(1)) {
            Some(count) => *count += 1,
            None => warn!(
                participant = record.participant(),
                condition = record.condition(),
                conditions,
                "skipping session with out-of-range condition"
            ),
        }
    }
    counts
}

/// Lowest 1-based index holding the minimum count, `None` if `counts` is empty
///
/// # Examples
///
/// ```rust
/// use condition_balancer::balance::least_used;
///
/// assert_eq!(least_used(&[2, 2, 1, 1]), Some(3));
/// assert_eq!(least_used(&[]), None);
/// ```
#[must_use]
pub fn least_used(counts: &[usize]) -> Option<usize> {
    let min = counts.iter().min()?;
    counts.iter().position(|c| c == min).map(|i| i + 1)
}

/// Choose the next condition for a participant with the given factor values.
///
/// # Arguments
/// * `catalog` - Condition catalog, its row count is the number of conditions
/// * `records` - Full session log
/// * `factors` - Current participant's factor values
///
/// # Errors
/// Returns [`Error::EmptyCatalog`] if the catalog has no condition
pub fn choose(
    catalog: &ConditionCatalog,
    records: &[SessionRecord],
    factors: &FactorValues,
) -> Result<BalanceReport> {
    let counts = tally(records, catalog.len(), factors);
    debug!(?counts, "tallied matching kept sessions");

    let condition = least_used(&counts).ok_or_else(|| Error::EmptyCatalog {
        path: catalog.path().to_path_buf(),
    })?;
    info!(condition, ?factors, "chose least used condition");

    Ok(BalanceReport { condition, counts })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kept(condition: usize, age: &str) -> SessionRecord {
        SessionRecord::builder("P", condition)
            .factor("age", age)
            .kept(true)
            .build()
    }

    fn young() -> FactorValues {
        FactorValues::from([("age".to_string(), "young".to_string())])
    }

    #[test]
    fn test_least_used_tie_breaks_low() {
        assert_eq!(least_used(&[0, 0, 0]), Some(1));
        assert_eq!(least_used(&[2, 2, 1, 1]), Some(3));
        assert_eq!(least_used(&[1, 0]), Some(2));
    }

    #[test]
    fn test_tally_filters_by_factors() {
        let records = vec![kept(1, "young"), kept(2, "old"), kept(2, "young"), kept(2, "young")];
        assert_eq!(tally(&records, 3, &young()), vec![1, 2, 0]);
    }

    #[test]
    fn test_tally_ignores_unkept() {
        let mut records = vec![kept(1, "young")];
        records.push(SessionRecord::builder("P", 2).factor("age", "young").build());
        assert_eq!(tally(&records, 2, &young()), vec![1, 0]);
    }

    #[test]
    fn test_tally_skips_out_of_range() {
        let records = vec![kept(0, "young"), kept(5, "young"), kept(1, "young")];
        assert_eq!(tally(&records, 2, &young()), vec![1, 0]);
    }

    #[test]
    fn test_report_chosen_count() {
        let report = BalanceReport {
            condition: 2,
            counts: vec![3, 1, 1],
        };
        assert_eq!(report.chosen_count(), 1);
    }
}
