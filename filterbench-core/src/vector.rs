//! Dense vector collections.

use crate::error::{Error, Result};

/// Identifier of an item as reported by an index. Positional: item `i` of the
/// database file has id `i`. Signed so engines can use negative padding.
pub type NeighborId = i64;

/// An ordered, immutable collection of fixed-dimension `f32` rows.
///
/// Rows are stored flat in row-major order, the layout every engine consumes.
///
/// # Example
///
/// ```
/// use filterbench_core::VectorSet;
///
/// let set = VectorSet::from_rows(&[vec![1.0f32, 2.0], vec![3.0, 4.0]]).unwrap();
/// assert_eq!(set.len(), 2);
/// assert_eq!(set.dimension(), 2);
/// assert_eq!(set.row(1), &[3.0, 4.0]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorSet {
    dimension: usize,
    data: Vec<f32>,
}

impl VectorSet {
    /// Creates an empty set with the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    /// Wraps a flat buffer. Its length must be a multiple of `dimension`.
    pub fn from_flat(dimension: usize, data: Vec<f32>) -> Result<Self> {
        if dimension == 0 {
            if !data.is_empty() {
                return Err(Error::DimensionMismatch {
                    expected: 0,
                    got: data.len(),
                });
            }
        } else if data.len() % dimension != 0 {
            return Err(Error::DimensionMismatch {
                expected: dimension,
                got: data.len() % dimension,
            });
        }
        Ok(Self { dimension, data })
    }

    /// Builds a set from owned rows; all rows must share the first row's dimension.
    pub fn from_rows<R: AsRef<[f32]>>(rows: &[R]) -> Result<Self> {
        let dimension = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        let mut set = Self::new(dimension);
        for row in rows {
            set.push(row.as_ref())?;
        }
        Ok(set)
    }

    /// Appends a row.
    pub fn push(&mut self, row: &[f32]) -> Result<()> {
        if row.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                got: row.len(),
            });
        }
        self.data.extend_from_slice(row);
        Ok(())
    }

    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shared dimension of all rows.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Returns row `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= len()`.
    #[inline]
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dimension..(i + 1) * self.dimension]
    }

    /// Iterates over rows in order.
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> + '_ {
        // chunks_exact panics on a zero chunk size
        self.data.chunks_exact(self.dimension.max(1))
    }

    /// The flat row-major buffer.
    #[inline]
    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }
}
