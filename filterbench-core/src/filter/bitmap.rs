//! Dense admissibility bitmap.
//!
//! The bitmap is a plain `n_queries × n_items` matrix of `bool`, row-major.
//! Construction evaluates every (query, item) pair with no pruning or
//! indexing, so its cost can be timed separately from the index search.

use crate::error::{Error, Result};
use crate::filter::{ItemAttributes, QueryAttributes};

/// Row-major `[query][item]` admissibility matrix.
///
/// # Example
///
/// ```
/// use filterbench_core::{build_bitmap, ItemAttributes, QueryAttributes};
///
/// let items = ItemAttributes::Em(vec![0, 1, 0]);
/// let queries = QueryAttributes::Em(vec![0]);
/// let bitmap = build_bitmap(&items, &queries).unwrap();
///
/// assert_eq!(bitmap.row(0), &[true, false, true]);
/// assert_eq!(bitmap.admissible_count(0), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterBitmap {
    n_queries: usize,
    n_items: usize,
    bits: Vec<bool>,
}

impl FilterBitmap {
    /// A bitmap with every pair inadmissible.
    pub fn new(n_queries: usize, n_items: usize) -> Self {
        Self {
            n_queries,
            n_items,
            bits: vec![false; n_queries * n_items],
        }
    }

    /// A bitmap with every pair admissible (unfiltered search).
    pub fn all_admissible(n_queries: usize, n_items: usize) -> Self {
        Self {
            n_queries,
            n_items,
            bits: vec![true; n_queries * n_items],
        }
    }

    /// Builds a bitmap by evaluating `admissible(q, i)` for every pair.
    pub fn from_fn<F>(n_queries: usize, n_items: usize, mut admissible: F) -> Self
    where
        F: FnMut(usize, usize) -> bool,
    {
        let mut bits = vec![false; n_queries * n_items];
        for q in 0..n_queries {
            let row = &mut bits[q * n_items..(q + 1) * n_items];
            for (i, bit) in row.iter_mut().enumerate() {
                *bit = admissible(q, i);
            }
        }
        Self {
            n_queries,
            n_items,
            bits,
        }
    }

    #[inline]
    pub fn n_queries(&self) -> usize {
        self.n_queries
    }

    #[inline]
    pub fn n_items(&self) -> usize {
        self.n_items
    }

    /// Whether item `i` may be returned for query `q`.
    #[inline]
    pub fn get(&self, q: usize, i: usize) -> bool {
        self.bits[q * self.n_items + i]
    }

    /// Sets one pair.
    #[inline]
    pub fn set(&mut self, q: usize, i: usize, admissible: bool) {
        self.bits[q * self.n_items + i] = admissible;
    }

    /// All items' admissibility for query `q`.
    #[inline]
    pub fn row(&self, q: usize) -> &[bool] {
        &self.bits[q * self.n_items..(q + 1) * self.n_items]
    }

    /// Number of admissible items for query `q`.
    pub fn admissible_count(&self, q: usize) -> usize {
        self.row(q).iter().filter(|&&b| b).count()
    }

    /// Fraction of admissible pairs over the whole matrix.
    pub fn selectivity(&self) -> f64 {
        if self.bits.is_empty() {
            return 0.0;
        }
        self.bits.iter().filter(|&&b| b).count() as f64 / self.bits.len() as f64
    }

    /// The flat row-major buffer.
    #[inline]
    pub fn as_slice(&self) -> &[bool] {
        &self.bits
    }
}

/// Evaluates the schema predicate for every (query, item) pair.
///
/// # Errors
///
/// Returns [`Error::SchemaMismatch`] if items and queries were decoded under
/// different schemas.
pub fn build_bitmap(items: &ItemAttributes, queries: &QueryAttributes) -> Result<FilterBitmap> {
    let n_items = items.len();
    let n_queries = queries.len();

    let bitmap = match (items, queries) {
        (ItemAttributes::Em(item_values), QueryAttributes::Em(query_values)) => {
            FilterBitmap::from_fn(n_queries, n_items, |q, i| {
                item_values[i] == query_values[q]
            })
        }
        (ItemAttributes::R(item_values), QueryAttributes::R(ranges)) => {
            FilterBitmap::from_fn(n_queries, n_items, |q, i| ranges[q].contains(item_values[i]))
        }
        (ItemAttributes::Emis(item_sets), QueryAttributes::Emis(query_values)) => {
            // linear membership scan, no hashing
            FilterBitmap::from_fn(n_queries, n_items, |q, i| {
                item_sets[i].contains(&query_values[q])
            })
        }
        (ItemAttributes::EmR(item_pairs), QueryAttributes::EmR(query_triples)) => {
            FilterBitmap::from_fn(n_queries, n_items, |q, i| {
                query_triples[q].matches(&item_pairs[i])
            })
        }
        _ => {
            return Err(Error::SchemaMismatch {
                items: items.filter_type().as_str(),
                queries: queries.filter_type().as_str(),
            })
        }
    };

    Ok(bitmap)
}
