//! Flat index for exact filtered nearest neighbor search.
//!
//! Computes the distance from each query to every admissible item. O(n) per
//! query, but with 100% recall, which makes it the ceiling other engines are
//! measured against.

use std::cmp::Ordering;

use crate::distance::Metric;
use crate::error::{Error, Result};
use crate::filter::FilterBitmap;
use crate::index::{validate_search, AnnIndex, SearchOutput, DEFAULT_PADDING_ID};
use crate::vector::{NeighborId, VectorSet};

/// Build parameters for [`FlatIndex`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlatParams {
    pub metric: Metric,
}

/// Exact index over an owned copy of the database vectors.
///
/// # Example
///
/// ```
/// use filterbench_core::{AnnIndex, FilterBitmap, FlatIndex, FlatParams, VectorSet};
///
/// let vectors = VectorSet::from_rows(&[[0.0f32, 0.0], [1.0, 0.0], [5.0, 5.0]]).unwrap();
/// let index = FlatIndex::build(&FlatParams::default(), &vectors, &[0; 3]).unwrap();
///
/// let queries = VectorSet::from_rows(&[[0.9f32, 0.0]]).unwrap();
/// let mut bitmap = FilterBitmap::all_admissible(1, 3);
/// bitmap.set(0, 1, false);
///
/// let out = index.search(&queries, 2, &bitmap).unwrap();
/// assert_eq!(out.ids(0), &[0, 2]);
/// ```
#[derive(Debug, Clone)]
pub struct FlatIndex {
    metric: Metric,
    vectors: VectorSet,
    metadata: Vec<i32>,
}

impl FlatIndex {
    /// The distance metric used by this index.
    #[inline]
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Opaque per-item metadata supplied at build time.
    pub fn metadata(&self) -> &[i32] {
        &self.metadata
    }

    /// Ranked admissible hits for one query, ties broken by ascending id.
    fn search_one(&self, query: &[f32], k: usize, admissible: &[bool]) -> Vec<(NeighborId, f32)> {
        let mut candidates: Vec<(NeighborId, f32)> = self
            .vectors
            .rows()
            .enumerate()
            .filter(|(i, _)| admissible[*i])
            .map(|(i, row)| (i as NeighborId, self.metric.compute(query, row)))
            .collect();

        candidates.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        candidates.truncate(k);
        candidates
    }
}

impl AnnIndex for FlatIndex {
    type Params = FlatParams;

    fn build(params: &FlatParams, vectors: &VectorSet, metadata: &[i32]) -> Result<Self> {
        if metadata.len() != vectors.len() {
            return Err(Error::CountMismatch {
                what: "metadata vs vectors",
                left: metadata.len(),
                right: vectors.len(),
            });
        }
        Ok(Self {
            metric: params.metric,
            vectors: vectors.clone(),
            metadata: metadata.to_vec(),
        })
    }

    /// Exact search has no breadth knob.
    fn configure_search(&mut self, _ef_search: usize) {}

    fn search(&self, queries: &VectorSet, k: usize, bitmap: &FilterBitmap) -> Result<SearchOutput> {
        validate_search(self, queries, bitmap)?;

        let mut output = SearchOutput::padded(queries.len(), k, DEFAULT_PADDING_ID);
        if k == 0 {
            return Ok(output);
        }
        for (q, query) in queries.rows().enumerate() {
            output.fill_row(q, self.search_one(query, k, bitmap.row(q)));
        }
        Ok(output)
    }

    fn padding_id(&self) -> Option<NeighborId> {
        Some(DEFAULT_PADDING_ID)
    }

    #[inline]
    fn len(&self) -> usize {
        self.vectors.len()
    }

    #[inline]
    fn dimension(&self) -> usize {
        self.vectors.dimension()
    }
}
