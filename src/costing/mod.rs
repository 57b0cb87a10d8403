//! Costing module
//!
//! Unit conversions and cost normalization for ingredients and variants.

pub mod normalizer;
pub mod units;

pub use normalizer::{
    bottle_ounces, cost_per_ounce, normalize_cost, round_cost, unit_bottle_price,
    CostNormalization,
};
pub use units::{is_liquid_unit, ounces_per_unit, to_canonical_ounces, CANONICAL_UNIT, ML_PER_OZ};
