//! Cost normalization
//!
//! Turns a purchase (price, quantity, unit) into a comparable cost per
//! canonical unit, and prices product variants per ounce.

use serde::{Deserialize, Serialize};

use super::units::{is_liquid_unit, to_canonical_ounces, CANONICAL_UNIT, ML_PER_LITER, ML_PER_OZ};

/// Sizes below this are assumed to have been entered in liters
const LITER_ENTRY_CUTOFF: f64 = 10.0;

/// Result of normalizing a purchase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostNormalization {
    pub cost_per_unit: f64,
    pub canonical_unit: String,
}

/// Round to 4 decimal places for storage
pub fn round_cost(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Normalize a purchase into cost per canonical unit.
///
/// Liquids are costed per ounce; every other unit is costed per purchase
/// unit and keeps its label. Non-positive or non-finite price or quantity
/// produces a zero cost and leaves the unit untouched.
pub fn normalize_cost(purchase_price: f64, purchase_quantity: f64, purchase_unit: &str) -> CostNormalization {
    if !positive(purchase_price) || !positive(purchase_quantity) {
        return CostNormalization {
            cost_per_unit: 0.0,
            canonical_unit: purchase_unit.to_string(),
        };
    }

    if is_liquid_unit(purchase_unit) {
        let total_ounces = to_canonical_ounces(purchase_quantity, purchase_unit);
        let cost = if total_ounces > 0.0 {
            purchase_price / total_ounces
        } else {
            0.0
        };
        return CostNormalization {
            cost_per_unit: round_cost(cost),
            canonical_unit: CANONICAL_UNIT.to_string(),
        };
    }

    CostNormalization {
        cost_per_unit: round_cost(purchase_price / purchase_quantity),
        canonical_unit: purchase_unit.to_string(),
    }
}

/// Bottle volume in ounces from a variant's `size_ml`.
///
/// Values under 10 are read as liters (a "1.75" bottle is 1750 ml).
pub fn bottle_ounces(size_ml: f64) -> f64 {
    if !positive(size_ml) {
        return 0.0;
    }
    let ml = if size_ml < LITER_ENTRY_CUTOFF {
        size_ml * ML_PER_LITER
    } else {
        size_ml
    };
    ml / ML_PER_OZ
}

/// Price of a single bottle.
///
/// With case pricing the case price is split across the bottles in the case;
/// if the case data is unusable the bottle price is used instead.
pub fn unit_bottle_price(
    purchase_price: f64,
    case_price: Option<f64>,
    bottles_per_case: Option<i64>,
    use_case_pricing: bool,
) -> f64 {
    if use_case_pricing {
        if let (Some(case), Some(count)) = (case_price, bottles_per_case) {
            if positive(case) && count > 0 {
                return case / count as f64;
            }
        }
    }
    if positive(purchase_price) {
        purchase_price
    } else {
        0.0
    }
}

/// Cost per ounce of a bottle, or None when price or size is unusable
pub fn cost_per_ounce(bottle_price: f64, size_ml: f64) -> Option<f64> {
    let ounces = bottle_ounces(size_ml);
    if !positive(bottle_price) || ounces <= 0.0 {
        return None;
    }
    Some(bottle_price / ounces)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_price_or_quantity() {
        for unit in ["ml", "each", "g", "weird"] {
            let r = normalize_cost(0.0, 5.0, unit);
            assert_eq!(r.cost_per_unit, 0.0);
            assert_eq!(r.canonical_unit, unit);

            let r = normalize_cost(12.0, 0.0, unit);
            assert_eq!(r.cost_per_unit, 0.0);
            assert_eq!(r.canonical_unit, unit);
        }
    }

    #[test]
    fn test_negative_inputs_never_produce_negative_cost() {
        assert_eq!(normalize_cost(-5.0, 2.0, "ml").cost_per_unit, 0.0);
        assert_eq!(normalize_cost(5.0, -2.0, "each").cost_per_unit, 0.0);
        assert_eq!(normalize_cost(f64::NAN, 2.0, "oz").cost_per_unit, 0.0);
    }

    #[test]
    fn test_liquid_normalizes_to_ounces() {
        // One ounce of liquid sold as 29.5735 ml for $1
        let r = normalize_cost(1.0, 29.5735, "ml");
        assert_eq!(r.canonical_unit, "oz");
        assert!((r.cost_per_unit - 1.0).abs() < 1e-4);

        // Price per ml times 29.5735 is the price per ounce
        let r = normalize_cost(29.5735, 1.0, "ml");
        assert_eq!(r.canonical_unit, "oz");
        assert!((r.cost_per_unit - round_cost(29.5735 * 29.5735)).abs() < 1e-9);

        let r = normalize_cost(30.0, 1.0, "L");
        assert_eq!(r.canonical_unit, "oz");
        assert!((r.cost_per_unit - round_cost(30.0 / (1000.0 / 29.5735))).abs() < 1e-9);
    }

    #[test]
    fn test_discrete_keeps_unit() {
        let r = normalize_cost(10.0, 4.0, "each");
        assert_eq!(r.cost_per_unit, 2.5);
        assert_eq!(r.canonical_unit, "each");

        // Grams are not a liquid unit for costing purposes
        let r = normalize_cost(9.0, 450.0, "g");
        assert_eq!(r.cost_per_unit, 0.02);
        assert_eq!(r.canonical_unit, "g");
    }

    #[test]
    fn test_rounds_to_four_places() {
        let r = normalize_cost(10.0, 3.0, "each");
        assert_eq!(r.cost_per_unit, 3.3333);
    }

    #[test]
    fn test_bottle_ounces_liter_heuristic() {
        assert!((bottle_ounces(750.0) - 750.0 / 29.5735).abs() < 1e-9);
        assert!((bottle_ounces(1.75) - 1750.0 / 29.5735).abs() < 1e-9);
        assert_eq!(bottle_ounces(0.0), 0.0);
    }

    #[test]
    fn test_case_pricing_cost_per_ounce() {
        // 12 x 750ml case at $180
        let bottle = unit_bottle_price(22.0, Some(180.0), Some(12), true);
        assert_eq!(bottle, 15.0);
        let per_oz = cost_per_ounce(bottle, 750.0).unwrap();
        assert!((per_oz - 0.5915).abs() < 1e-3);

        // Case pricing disabled uses the bottle price
        assert_eq!(unit_bottle_price(22.0, Some(180.0), Some(12), false), 22.0);
        // Unusable case data falls back to the bottle price
        assert_eq!(unit_bottle_price(22.0, Some(180.0), Some(0), true), 22.0);
    }

    #[test]
    fn test_cost_per_ounce_requires_price_and_size() {
        assert_eq!(cost_per_ounce(0.0, 750.0), None);
        assert_eq!(cost_per_ounce(20.0, 0.0), None);
    }
}
