//! Input file codecs.
//!
//! - [`vecs`] decodes length-prefixed binary vector and integer-list files
//! - [`attributes`] parses the line-oriented attribute files of each predicate schema

pub mod attributes;
pub mod vecs;

pub use attributes::{load_item_attributes, load_query_attributes};
pub use vecs::{decode_fvecs, decode_ivecs, read_fvecs, read_ivecs, write_fvecs, write_ivecs, IdLists};
