//! Duplicate detection
//!
//! Similarity scoring and greedy grouping of ingredient names.

pub mod similarity;

pub use similarity::{
    group_duplicates, similarity, DuplicateGroup, GroupMember, DEFAULT_DUPLICATE_THRESHOLD,
};
