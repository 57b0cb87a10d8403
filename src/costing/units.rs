//! Unit table and conversion to canonical ounces
//!
//! Every volume (and, approximately, weight) unit used on a bar menu is
//! mapped to fluid ounces so costs can be compared across package sizes.

// ============================================================================
// Conversion Constants
// ============================================================================

/// Milliliters per fluid ounce
pub const ML_PER_OZ: f64 = 29.5735;
/// Grams per ounce
pub const G_PER_OZ: f64 = 28.3495;
/// Milliliters per centiliter
pub const ML_PER_CL: f64 = 10.0;
/// Milliliters per liter
pub const ML_PER_LITER: f64 = 1000.0;
/// Fluid ounces per quart (US)
pub const OZ_PER_QUART: f64 = 32.0;
/// Milliliters per dash
pub const ML_PER_DASH: f64 = 0.625;
/// Milliliters per barspoon
pub const ML_PER_BARSPOON: f64 = 5.0;
/// Milliliters per teaspoon
pub const ML_PER_TSP: f64 = 5.0;
/// Milliliters per tablespoon
pub const ML_PER_TBSP: f64 = 15.0;
/// Milliliters per cup (US)
pub const ML_PER_CUP: f64 = 236.588;

/// Canonical unit label for liquid costs
pub const CANONICAL_UNIT: &str = "oz";

fn normalize(unit: &str) -> String {
    unit.trim().to_lowercase()
}

/// Ounces per one of `unit`, or None when the unit is not in the table
pub fn ounces_per_unit(unit: &str) -> Option<f64> {
    match normalize(unit).as_str() {
        "oz" | "fl oz" => Some(1.0),
        "ml" => Some(1.0 / ML_PER_OZ),
        "cl" => Some(ML_PER_CL / ML_PER_OZ),
        "l" => Some(ML_PER_LITER / ML_PER_OZ),
        "qt" => Some(OZ_PER_QUART),
        "dash" => Some(ML_PER_DASH / ML_PER_OZ),
        "barspoon" => Some(ML_PER_BARSPOON / ML_PER_OZ),
        "tsp" => Some(ML_PER_TSP / ML_PER_OZ),
        "tbsp" => Some(ML_PER_TBSP / ML_PER_OZ),
        "cup" => Some(ML_PER_CUP / ML_PER_OZ),
        // Grams are treated as if the ingredient had the density of water.
        "g" => Some(1.0 / G_PER_OZ),
        _ => None,
    }
}

/// Convert an amount in `unit` to ounces.
///
/// A non-finite amount yields 0. An unknown unit returns the amount
/// unchanged, i.e. it is assumed to already be canonical.
pub fn to_canonical_ounces(amount: f64, unit: &str) -> f64 {
    if !amount.is_finite() {
        return 0.0;
    }

    match ounces_per_unit(unit) {
        Some(factor) => amount * factor,
        None => {
            tracing::debug!("Unknown unit '{}', treating {} as ounces", unit, amount);
            amount
        }
    }
}

/// Whether `unit` is costed per ounce
pub fn is_liquid_unit(unit: &str) -> bool {
    matches!(
        normalize(unit).as_str(),
        "ml" | "cl" | "l" | "oz" | "fl oz" | "qt"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_ounces_table() {
        assert_eq!(ounces_per_unit("oz"), Some(1.0));
        assert_eq!(ounces_per_unit("FL OZ"), Some(1.0));
        assert_eq!(ounces_per_unit("qt"), Some(32.0));
        assert!(approx(to_canonical_ounces(29.5735, "ml"), 1.0));
        assert!(approx(to_canonical_ounces(1.0, "l"), 1000.0 / 29.5735));
        assert!(approx(to_canonical_ounces(1.0, "cl"), 10.0 / 29.5735));
        assert!(approx(to_canonical_ounces(1.0, "cup"), 236.588 / 29.5735));
        assert!(approx(to_canonical_ounces(2.0, "dash"), 1.25 / 29.5735));
        assert!(approx(to_canonical_ounces(28.3495, "g"), 1.0));
    }

    #[test]
    fn test_unit_match_is_case_insensitive() {
        assert!(approx(to_canonical_ounces(750.0, " ML "), 750.0 / 29.5735));
        assert!(approx(to_canonical_ounces(1.0, "Barspoon"), 5.0 / 29.5735));
    }

    #[test]
    fn test_unknown_unit_passes_through() {
        assert_eq!(to_canonical_ounces(3.0, "each"), 3.0);
        assert_eq!(to_canonical_ounces(3.0, "sprig"), 3.0);
        assert_eq!(ounces_per_unit("sprig"), None);
    }

    #[test]
    fn test_invalid_amount_is_zero() {
        assert_eq!(to_canonical_ounces(f64::NAN, "ml"), 0.0);
        assert_eq!(to_canonical_ounces(f64::INFINITY, "oz"), 0.0);
    }

    #[test]
    fn test_liquid_conversion_is_linear() {
        for unit in ["ml", "cl", "l", "oz", "fl oz", "qt"] {
            for x in [0.5, 1.0, 7.25, 750.0] {
                let single = to_canonical_ounces(x, unit);
                let double = to_canonical_ounces(2.0 * x, unit);
                assert!(approx(double, 2.0 * single), "{} not linear", unit);
            }
        }
    }

    #[test]
    fn test_liquid_units() {
        for unit in ["ml", "Fl Oz", "qt", " L "] {
            assert!(is_liquid_unit(unit), "{}", unit);
        }
        for unit in ["g", "tsp", "each", "dash"] {
            assert!(!is_liquid_unit(unit), "{}", unit);
        }
    }
}
