//! Recall@k scoring against ground truth.
//!
//! Recall is pooled over the whole query set: the total number of matched
//! ids divided by the total number of valid ground-truth ids. It is not a
//! mean of per-query recalls, so a query with fewer ground-truth entries
//! weighs proportionally less.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::index::SearchOutput;
use crate::vector::NeighborId;

/// Keeps the first `k` entries of each list, in file order.
pub fn truncate_groundtruth(mut lists: Vec<Vec<i32>>, k: usize) -> Vec<Vec<i32>> {
    for list in &mut lists {
        list.truncate(k);
    }
    lists
}

/// Aggregate recall of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecallReport {
    /// Returned ids that appear in the ground truth, summed over queries.
    pub matched: usize,
    /// `min(k, |gt[q]|)` summed over queries.
    pub valid: usize,
    pub n_queries: usize,
}

impl RecallReport {
    /// `matched / valid`. `valid` is never zero for a report produced by [`score`].
    pub fn recall(&self) -> f64 {
        self.matched as f64 / self.valid as f64
    }
}

/// Scores search output against (already truncated) ground truth.
///
/// Both sides are compared as sets: duplicates count once, order is
/// irrelevant, and ids equal to `padding` are ignored.
///
/// # Errors
///
/// - [`Error::CountMismatch`] if the query counts differ
/// - [`Error::EmptyGroundTruth`] if no query has any valid ground truth
///
/// # Example
///
/// ```
/// use filterbench_core::{recall, SearchOutput};
///
/// let gt = vec![vec![3, 5, 7]];
/// let out = SearchOutput::from_parts(3, vec![3, 3, 5], vec![0.0; 3]).unwrap();
/// let report = recall::score(&gt, &out, 3, Some(-1)).unwrap();
/// assert_eq!(report.matched, 2);
/// assert_eq!(report.valid, 3);
/// ```
pub fn score(
    groundtruth: &[Vec<i32>],
    output: &SearchOutput,
    k: usize,
    padding: Option<NeighborId>,
) -> Result<RecallReport> {
    if groundtruth.len() != output.n_queries() {
        return Err(Error::CountMismatch {
            what: "ground truth vs search results",
            left: groundtruth.len(),
            right: output.n_queries(),
        });
    }

    let mut matched = 0;
    let mut valid = 0;
    for (q, truth) in groundtruth.iter().enumerate() {
        valid += k.min(truth.len());

        let truth = id_set(truth.iter().take(k).map(|&id| NeighborId::from(id)), padding);
        let found = id_set(output.ids(q).iter().copied(), padding);
        matched += intersection_size(&truth, &found);
    }

    if valid == 0 {
        return Err(Error::EmptyGroundTruth);
    }

    Ok(RecallReport {
        matched,
        valid,
        n_queries: groundtruth.len(),
    })
}

/// Sorted, deduplicated ids with padding removed.
fn id_set<I>(ids: I, padding: Option<NeighborId>) -> Vec<NeighborId>
where
    I: IntoIterator<Item = NeighborId>,
{
    let mut set: Vec<NeighborId> = ids.into_iter().filter(|&id| Some(id) != padding).collect();
    set.sort_unstable();
    set.dedup();
    set
}

/// Size of the intersection of two sorted, deduplicated slices.
fn intersection_size(a: &[NeighborId], b: &[NeighborId]) -> usize {
    let (mut i, mut j, mut count) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                count += 1;
                i += 1;
                j += 1;
            }
        }
    }
    count
}
