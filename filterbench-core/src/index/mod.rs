//! The ANN index port and the bundled engines.
//!
//! The harness only talks to an index through [`AnnIndex`], so any engine
//! that can build over a [`VectorSet`] and answer bitmap-filtered top-k
//! queries can be benchmarked.
//!
//! - [`FlatIndex`] - exact filtered scan, the recall ceiling
//! - [`HnswIndex`] - filtered HNSW graph with ACORN-style `M`/`gamma`/`M_beta`

pub mod flat;
pub mod hnsw;
pub mod storage;

pub use flat::{FlatIndex, FlatParams};
pub use hnsw::{HnswIndex, HnswParams};

use crate::error::{Error, Result};
use crate::filter::FilterBitmap;
use crate::vector::{NeighborId, VectorSet};

/// Padding id used by the bundled engines for slots with no admissible neighbor.
pub const DEFAULT_PADDING_ID: NeighborId = -1;

/// Contract between the benchmark driver and an ANN engine.
pub trait AnnIndex: Sized {
    /// Engine-specific build parameters.
    type Params;

    /// Builds an index over `vectors`.
    ///
    /// `metadata` holds one opaque integer per item. Its meaning, if any, is
    /// up to the engine.
    fn build(params: &Self::Params, vectors: &VectorSet, metadata: &[i32]) -> Result<Self>;

    /// Sets the search breadth used by subsequent searches.
    fn configure_search(&mut self, ef_search: usize);

    /// Returns `k` neighbors per query, drawn only from items admissible for
    /// that query in `bitmap`. Slots beyond the available matches hold
    /// [`padding_id`](Self::padding_id).
    fn search(&self, queries: &VectorSet, k: usize, bitmap: &FilterBitmap) -> Result<SearchOutput>;

    /// The id this engine writes into unfilled result slots, if it defines one.
    fn padding_id(&self) -> Option<NeighborId>;

    /// Number of indexed items.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimension of indexed vectors.
    fn dimension(&self) -> usize;
}

/// Neighbor ids and distances for a batch of queries, `k` slots per query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutput {
    k: usize,
    ids: Vec<NeighborId>,
    distances: Vec<f32>,
}

impl SearchOutput {
    /// Output with every slot set to `padding` and an infinite distance.
    pub fn padded(n_queries: usize, k: usize, padding: NeighborId) -> Self {
        Self {
            k,
            ids: vec![padding; n_queries * k],
            distances: vec![f32::INFINITY; n_queries * k],
        }
    }

    /// Wraps flat row-major buffers of `n_queries × k` entries.
    pub fn from_parts(k: usize, ids: Vec<NeighborId>, distances: Vec<f32>) -> Result<Self> {
        if ids.len() != distances.len() {
            return Err(Error::CountMismatch {
                what: "neighbor ids vs distances",
                left: ids.len(),
                right: distances.len(),
            });
        }
        if k == 0 && !ids.is_empty() {
            return Err(Error::InvalidConfig("k must be positive".into()));
        }
        if k > 0 && ids.len() % k != 0 {
            return Err(Error::CountMismatch {
                what: "result slots vs multiple of k",
                left: ids.len(),
                right: k,
            });
        }
        Ok(Self { k, ids, distances })
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    pub fn n_queries(&self) -> usize {
        if self.k == 0 {
            0
        } else {
            self.ids.len() / self.k
        }
    }

    /// Neighbor ids of query `q`.
    #[inline]
    pub fn ids(&self, q: usize) -> &[NeighborId] {
        &self.ids[q * self.k..(q + 1) * self.k]
    }

    /// Distances of query `q`, parallel to [`ids`](Self::ids).
    #[inline]
    pub fn distances(&self, q: usize) -> &[f32] {
        &self.distances[q * self.k..(q + 1) * self.k]
    }

    /// Writes ranked `(id, distance)` hits into query `q`'s slots.
    /// Hits beyond `k` are ignored; slots beyond the hits are left untouched.
    pub fn fill_row<I>(&mut self, q: usize, hits: I)
    where
        I: IntoIterator<Item = (NeighborId, f32)>,
    {
        let range = q * self.k..(q + 1) * self.k;
        let ids = &mut self.ids[range.clone()];
        let distances = &mut self.distances[range];
        for ((slot_id, slot_dist), (id, dist)) in ids.iter_mut().zip(distances.iter_mut()).zip(hits) {
            *slot_id = id;
            *slot_dist = dist;
        }
    }

    /// Mutable flat buffers, for engines that fill rows in parallel.
    pub(crate) fn buffers_mut(&mut self) -> (&mut [NeighborId], &mut [f32]) {
        (&mut self.ids, &mut self.distances)
    }
}

/// Checks the shape of a search request against an index.
pub(crate) fn validate_search<I: AnnIndex>(
    index: &I,
    queries: &VectorSet,
    bitmap: &FilterBitmap,
) -> Result<()> {
    if !queries.is_empty() && queries.dimension() != index.dimension() {
        return Err(Error::DimensionMismatch {
            expected: index.dimension(),
            got: queries.dimension(),
        });
    }
    if bitmap.n_queries() != queries.len() {
        return Err(Error::CountMismatch {
            what: "bitmap rows vs queries",
            left: bitmap.n_queries(),
            right: queries.len(),
        });
    }
    if bitmap.n_items() != index.len() {
        return Err(Error::CountMismatch {
            what: "bitmap columns vs indexed items",
            left: bitmap.n_items(),
            right: index.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_output() {
        let out = SearchOutput::padded(2, 3, DEFAULT_PADDING_ID);
        assert_eq!(out.n_queries(), 2);
        assert_eq!(out.ids(1), &[-1, -1, -1]);
        assert!(out.distances(0).iter().all(|d| d.is_infinite()));
    }

    #[test]
    fn test_fill_row_partial() {
        let mut out = SearchOutput::padded(2, 3, -1);
        out.fill_row(1, vec![(7, 0.5), (9, 1.5)]);
        assert_eq!(out.ids(0), &[-1, -1, -1]);
        assert_eq!(out.ids(1), &[7, 9, -1]);
        assert_eq!(out.distances(1)[1], 1.5);
    }

    #[test]
    fn test_fill_row_ignores_extra_hits() {
        let mut out = SearchOutput::padded(1, 1, -1);
        out.fill_row(0, vec![(1, 0.0), (2, 0.1)]);
        assert_eq!(out.ids(0), &[1]);
    }

    #[test]
    fn test_from_parts_validation() {
        assert!(SearchOutput::from_parts(2, vec![1, 2, 3, 4], vec![0.0; 4]).is_ok());
        assert!(SearchOutput::from_parts(2, vec![1, 2, 3], vec![0.0; 3]).is_err());
        assert!(SearchOutput::from_parts(2, vec![1, 2], vec![0.0; 3]).is_err());
        assert_eq!(
            SearchOutput::from_parts(0, vec![], vec![]).unwrap().n_queries(),
            0
        );
    }
}
