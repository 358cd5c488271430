//! # filterbench core
//!
//! Core library for benchmarking attribute-filtered approximate nearest
//! neighbor search.
//!
//! A run loads vectors and attribute files, evaluates a per-(query, item)
//! admissibility bitmap, hands it to an ANN engine, and scores the results
//! against ground truth while timing each phase and watching process
//! resources.
//!
//! ## Core Types
//!
//! ### Inputs
//!
//! - [`codec::vecs`] - `.fvecs` / `.ivecs` binary vector files
//! - [`codec::attributes`] - line-oriented attribute files for each [`FilterType`]
//!
//! ### Filtering
//!
//! - [`FilterType`] - `EM`, `R`, `EMIS` and `EM_R` predicate schemas
//! - [`FilterBitmap`] - dense `[query][item]` admissibility matrix
//!
//! ### Indexes
//!
//! - [`AnnIndex`] - the engine contract the driver talks to
//! - [`FlatIndex`] - exact filtered scan
//! - [`HnswIndex`] - filtered HNSW graph with ACORN-style parameters
//!
//! ### Measurement
//!
//! - [`recall`] - pooled recall@k
//! - [`probe`] - peak thread count and peak memory
//! - [`QueryBenchmark`] / [`ConstructionBenchmark`] - timed runs producing reports

pub mod bench;
pub mod codec;
pub mod distance;
pub mod error;
pub mod filter;
pub mod index;
pub mod probe;
pub mod recall;
pub mod vector;

// Re-exports for convenient access
pub use bench::{
    ConstructionBenchmark, ConstructionConfig, ConstructionReport, Phase, QueryBenchmark,
    QueryConfig, QueryReport, Throughput,
};
pub use distance::Metric;
pub use error::{Error, Result};
pub use filter::{
    build_bitmap, EmRangeItem, EmRangeQuery, FilterBitmap, FilterType, ItemAttributes,
    QueryAttributes, Range,
};
pub use index::{AnnIndex, FlatIndex, FlatParams, HnswIndex, HnswParams, SearchOutput};
pub use recall::RecallReport;
pub use vector::{NeighborId, VectorSet};

/// Re-export commonly used types for convenience.
///
/// # Example
///
/// ```rust
/// use filterbench_core::prelude::*;
///
/// let items = ItemAttributes::R(vec![1, 5, 9]);
/// let queries = QueryAttributes::R(vec![Range::new(4, 10)]);
/// let bitmap = build_bitmap(&items, &queries).unwrap();
///
/// let vectors = VectorSet::from_rows(&[[1.0f32], [5.0], [9.0]]).unwrap();
/// let index = FlatIndex::build(&FlatParams::default(), &vectors, &[0; 3]).unwrap();
/// let out = index
///     .search(&VectorSet::from_rows(&[[0.0f32]]).unwrap(), 1, &bitmap)
///     .unwrap();
/// assert_eq!(out.ids(0), &[1]);
/// ```
pub mod prelude {
    pub use crate::{
        build_bitmap, AnnIndex, ConstructionBenchmark, ConstructionConfig, Error, FilterBitmap,
        FilterType, FlatIndex, FlatParams, HnswIndex, HnswParams, ItemAttributes, Metric,
        QueryAttributes, QueryBenchmark, QueryConfig, Range, Result, SearchOutput, VectorSet,
    };
}
