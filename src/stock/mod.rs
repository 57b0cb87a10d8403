//! Stock tracking
//!
//! Count history, report reconciliation and variant resolution.

pub mod usage;
pub mod variants;

pub use usage::{
    format_usage, history_with_usage, reconcile_reports, usage, CountReading, HistoryEntry,
    ItemUsage, UsageDirection,
};
pub use variants::{
    default_selection, menu_ingredients, resolve_candidates, ResolveMode,
    VariantCandidate, VariantOption,
};
