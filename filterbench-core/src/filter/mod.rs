//! Attribute predicates and the per-(query, item) admissibility bitmap.
//!
//! Four predicate schemas are supported:
//!
//! | Schema | Item record | Query record | Match |
//! |--------|-------------|--------------|-------|
//! | `EM`   | `v`         | `q`          | `v == q` |
//! | `R`    | `v`         | `[s, e]`     | `s <= v <= e` |
//! | `EMIS` | `{v1, ..}`  | `q`          | `q ∈ {v1, ..}` |
//! | `EM_R` | `(em, r)`   | `(em', [s, e])` | `em == em' && s <= r <= e` |

pub mod bitmap;

pub use bitmap::{build_bitmap, FilterBitmap};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The predicate schema a run filters with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterType {
    /// Exact match.
    #[serde(rename = "EM")]
    Em,
    /// Inclusive range.
    #[serde(rename = "R")]
    R,
    /// Exact match against an item's value set.
    #[serde(rename = "EMIS")]
    Emis,
    /// Exact match plus range.
    #[serde(rename = "EM_R")]
    EmR,
}

impl FilterType {
    pub const ALL: [FilterType; 4] = [FilterType::Em, FilterType::R, FilterType::Emis, FilterType::EmR];

    /// The token used on the command line and in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterType::Em => "EM",
            FilterType::R => "R",
            FilterType::Emis => "EMIS",
            FilterType::EmR => "EM_R",
        }
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::UnsupportedFilterType(s.to_string()))
    }
}

/// Inclusive integer range `[start, end]`. A range with `start > end` is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: i32,
    pub end: i32,
}

impl Range {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn contains(&self, value: i32) -> bool {
        self.start <= value && value <= self.end
    }
}

/// `EM_R` item record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmRangeItem {
    pub em: i32,
    pub r: i32,
}

/// `EM_R` query record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmRangeQuery {
    pub em: i32,
    pub range: Range,
}

impl EmRangeQuery {
    #[inline]
    pub fn matches(&self, item: &EmRangeItem) -> bool {
        self.em == item.em && self.range.contains(item.r)
    }
}

/// Decoded per-item attributes, one variant per schema.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemAttributes {
    Em(Vec<i32>),
    R(Vec<i32>),
    Emis(Vec<Vec<i32>>),
    EmR(Vec<EmRangeItem>),
}

impl ItemAttributes {
    pub fn filter_type(&self) -> FilterType {
        match self {
            ItemAttributes::Em(_) => FilterType::Em,
            ItemAttributes::R(_) => FilterType::R,
            ItemAttributes::Emis(_) => FilterType::Emis,
            ItemAttributes::EmR(_) => FilterType::EmR,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ItemAttributes::Em(v) | ItemAttributes::R(v) => v.len(),
            ItemAttributes::Emis(v) => v.len(),
            ItemAttributes::EmR(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decoded per-query attributes, one variant per schema.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryAttributes {
    Em(Vec<i32>),
    R(Vec<Range>),
    Emis(Vec<i32>),
    EmR(Vec<EmRangeQuery>),
}

impl QueryAttributes {
    pub fn filter_type(&self) -> FilterType {
        match self {
            QueryAttributes::Em(_) => FilterType::Em,
            QueryAttributes::R(_) => FilterType::R,
            QueryAttributes::Emis(_) => FilterType::Emis,
            QueryAttributes::EmR(_) => FilterType::EmR,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            QueryAttributes::Em(v) | QueryAttributes::Emis(v) => v.len(),
            QueryAttributes::R(v) => v.len(),
            QueryAttributes::EmR(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
