//! Variant resolution for stocking inventory or placing orders
//!
//! Given ingredients and their purchasable variants, work out which variants
//! are already tracked, which are the best value per ounce, which can be
//! selected without asking, and which ingredients need a choice at all.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{Ingredient, ProductVariant, Recipe, RecipeIngredient};

/// Cost comparisons closer than this are ties
const COST_EPSILON: f64 = 1e-9;

/// What the candidate list is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolveMode {
    /// Adding variants to an account's tracked inventory
    #[default]
    Inventory,
    /// Building a purchase order; nothing is "tracked"
    Order,
}

impl FromStr for ResolveMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inventory" => Ok(ResolveMode::Inventory),
            "order" => Ok(ResolveMode::Order),
            other => Err(format!("Unknown mode '{}': expected \"inventory\" or \"order\"", other)),
        }
    }
}

/// One variant as offered to the user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantOption {
    pub variant_id: i64,
    pub size_ml: f64,
    pub sku_number: Option<String>,
    pub bottle_price: f64,
    pub cost_per_ounce: Option<f64>,
    pub best_value: bool,
    pub tracked: bool,
    pub selected: bool,
}

/// An ingredient whose variants are offered for selection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantCandidate {
    pub ingredient_id: i64,
    pub ingredient_name: String,
    pub category: Option<String>,
    pub variants: Vec<VariantOption>,
    /// More than one variant, so the user has to pick
    pub needs_choice: bool,
}

/// Ingredients a menu should stock.
///
/// Bottled batches contribute the ingredient linked to their sub-recipe,
/// whatever its category. Other recipes contribute only the alcoholic
/// ingredients their lines name. Each ingredient appears once, in first-seen
/// order.
pub fn menu_ingredients<'a>(
    recipes: &[(Recipe, Vec<RecipeIngredient>)],
    ingredients: &'a [Ingredient],
    alcoholic_categories: &[String],
) -> Vec<&'a Ingredient> {
    let mut seen = HashSet::new();
    let mut included = Vec::new();

    for (recipe, lines) in recipes {
        if recipe.is_tracked_batch() {
            match ingredients.iter().find(|i| i.sub_recipe_id == Some(recipe.id)) {
                Some(batch) => {
                    if seen.insert(batch.id) {
                        included.push(batch);
                    }
                }
                None => tracing::debug!(
                    "Recipe '{}' is a bottled batch but no ingredient links to it",
                    recipe.name
                ),
            }
            continue;
        }

        for line in lines {
            let matched = ingredients.iter().find(|i| i.matches_name(&line.ingredient_name));
            if let Some(ingredient) = matched {
                if ingredient.is_alcoholic(alcoholic_categories) && seen.insert(ingredient.id) {
                    included.push(ingredient);
                }
            }
        }
    }

    included
}

/// Build the candidate list for the given ingredients.
///
/// `tracked_variant_ids` is ignored in order mode. The result is a pure
/// function of its inputs, so reloading with unchanged data yields the same
/// list.
pub fn resolve_candidates(
    ingredients: &[&Ingredient],
    variants: &[ProductVariant],
    tracked_variant_ids: &HashSet<i64>,
    mode: ResolveMode,
) -> Vec<VariantCandidate> {
    let mut by_ingredient: HashMap<i64, Vec<&ProductVariant>> = HashMap::new();
    for variant in variants {
        by_ingredient.entry(variant.ingredient_id).or_default().push(variant);
    }

    let mut candidates = Vec::new();
    for ingredient in ingredients {
        let own = match by_ingredient.get(&ingredient.id) {
            Some(v) if !v.is_empty() => v,
            _ => continue,
        };

        let is_tracked = |v: &ProductVariant| {
            mode == ResolveMode::Inventory && tracked_variant_ids.contains(&v.id)
        };

        if mode == ResolveMode::Inventory && own.iter().all(|v| is_tracked(v)) {
            continue;
        }

        let costs: Vec<Option<f64>> = own.iter().map(|v| v.cost_per_ounce()).collect();
        let best = if own.len() > 1 {
            costs
                .iter()
                .flatten()
                .copied()
                .filter(|c| *c > 0.0)
                .fold(None, |min: Option<f64>, c| Some(min.map_or(c, |m| m.min(c))))
        } else {
            None
        };

        let single = own.len() == 1;
        let options = own
            .iter()
            .zip(costs)
            .map(|(variant, cost)| {
                let tracked = is_tracked(variant);
                VariantOption {
                    variant_id: variant.id,
                    size_ml: variant.size_ml,
                    sku_number: variant.sku_number.clone(),
                    bottle_price: variant.bottle_price(),
                    cost_per_ounce: cost,
                    best_value: match (best, cost) {
                        (Some(b), Some(c)) => (c - b).abs() < COST_EPSILON,
                        _ => false,
                    },
                    tracked,
                    selected: single && !tracked,
                }
            })
            .collect();

        candidates.push(VariantCandidate {
            ingredient_id: ingredient.id,
            ingredient_name: ingredient.name.clone(),
            category: ingredient.category.clone(),
            variants: options,
            needs_choice: !single,
        });
    }

    candidates
}

/// Variant IDs selected by default (single-variant ingredients)
pub fn default_selection(candidates: &[VariantCandidate]) -> Vec<i64> {
    candidates
        .iter()
        .flat_map(|c| c.variants.iter())
        .filter(|v| v.selected)
        .map(|v| v.variant_id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BatchSettings;

    fn ingredient(id: i64, name: &str, category: Option<&str>) -> Ingredient {
        Ingredient {
            id,
            name: name.to_string(),
            category: category.map(str::to_string),
            supplier: None,
            purchase_price: 0.0,
            purchase_quantity: 0.0,
            purchase_unit: "each".to_string(),
            cost_per_unit: 0.0,
            unit: "each".to_string(),
            aliases: Vec::new(),
            prep_actions: Vec::new(),
            sub_recipe_id: None,
            is_liquor_portfolio: false,
            tier: None,
            exclusive: false,
            image_url: None,
            notes: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn variant(id: i64, ingredient_id: i64, size_ml: f64, price: f64) -> ProductVariant {
        ProductVariant {
            id,
            ingredient_id,
            size_ml,
            purchase_price: price,
            case_price: None,
            bottles_per_case: None,
            sku_number: None,
            use_case_pricing: false,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn recipe(id: i64, name: &str, batch: bool) -> Recipe {
        Recipe {
            id,
            name: name.to_string(),
            batch_settings: batch.then(|| BatchSettings {
                track_as_bottled: true,
                yield_amount: None,
                yield_unit: None,
            }),
            notes: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn line(recipe_id: i64, name: &str) -> RecipeIngredient {
        RecipeIngredient {
            id: 0,
            recipe_id,
            ingredient_name: name.to_string(),
            amount: 1.0,
            unit: "oz".to_string(),
        }
    }

    fn categories() -> Vec<String> {
        vec!["spirit".to_string(), "liqueur".to_string()]
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(" Order ".parse::<ResolveMode>(), Ok(ResolveMode::Order));
        assert_eq!("inventory".parse::<ResolveMode>(), Ok(ResolveMode::Inventory));
        assert!("orders".parse::<ResolveMode>().is_err());
    }

    #[test]
    fn test_best_value_marked_only_with_multiple_variants() {
        let vodka = ingredient(1, "Tito's Vodka", Some("Spirit"));
        let variants = vec![
            variant(10, 1, 750.0, 20.0),
            variant(11, 1, 1.75, 36.0), // liters
        ];
        let candidates =
            resolve_candidates(&[&vodka], &variants, &HashSet::new(), ResolveMode::Inventory);
        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert!(c.needs_choice);
        assert!(!c.variants[0].best_value);
        assert!(c.variants[1].best_value);
        assert!(c.variants.iter().all(|v| !v.selected));

        let single = vec![variant(10, 1, 750.0, 20.0)];
        let candidates =
            resolve_candidates(&[&vodka], &single, &HashSet::new(), ResolveMode::Inventory);
        assert!(!candidates[0].variants[0].best_value);
        assert!(candidates[0].variants[0].selected);
        assert!(!candidates[0].needs_choice);
    }

    #[test]
    fn test_excludes_fully_tracked_and_variantless() {
        let gin = ingredient(1, "Gin", Some("Spirit"));
        let rum = ingredient(2, "Rum", Some("Spirit"));
        let variants = vec![variant(10, 1, 750.0, 20.0)];
        let tracked: HashSet<i64> = [10].into_iter().collect();

        let candidates =
            resolve_candidates(&[&gin, &rum], &variants, &tracked, ResolveMode::Inventory);
        assert!(candidates.is_empty());

        // Order mode has no tracked state
        let candidates = resolve_candidates(&[&gin, &rum], &variants, &tracked, ResolveMode::Order);
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].variants[0].selected);
        assert!(!candidates[0].variants[0].tracked);
    }

    #[test]
    fn test_partially_tracked_keeps_ingredient() {
        let gin = ingredient(1, "Gin", Some("Spirit"));
        let variants = vec![variant(10, 1, 750.0, 20.0), variant(11, 1, 1000.0, 25.0)];
        let tracked: HashSet<i64> = [10].into_iter().collect();
        let candidates = resolve_candidates(&[&gin], &variants, &tracked, ResolveMode::Inventory);
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].variants[0].tracked);
        assert!(!candidates[0].variants[1].tracked);
    }

    #[test]
    fn test_resolution_is_repeatable() {
        let gin = ingredient(1, "Gin", Some("Spirit"));
        let variants = vec![variant(10, 1, 750.0, 20.0), variant(11, 1, 1000.0, 25.0)];
        let first = resolve_candidates(&[&gin], &variants, &HashSet::new(), ResolveMode::Inventory);
        let second = resolve_candidates(&[&gin], &variants, &HashSet::new(), ResolveMode::Inventory);
        assert_eq!(first, second);
    }

    #[test]
    fn test_menu_ingredients_rules() {
        let mut house_batch = ingredient(1, "House Negroni Batch", Some("Prep"));
        house_batch.sub_recipe_id = Some(100);
        let mut cointreau = ingredient(2, "Cointreau", Some("Liqueur"));
        cointreau.aliases = vec!["Triple Sec".to_string()];
        let lime = ingredient(3, "Lime Juice", Some("Juice"));
        let mut portfolio = ingredient(4, "House Bitters", Some("Prep"));
        portfolio.is_liquor_portfolio = true;
        let campari = ingredient(5, "Campari", Some("Liqueur"));
        let all = vec![house_batch, cointreau, lime, portfolio, campari];

        let recipes = vec![
            (
                recipe(100, "Negroni Batch", true),
                vec![line(100, "Campari")],
            ),
            (
                recipe(101, "Margarita", false),
                vec![line(101, "triple sec"), line(101, "Lime Juice"), line(101, "House Bitters")],
            ),
            (
                recipe(102, "Sidecar", false),
                vec![line(102, "Cointreau")],
            ),
        ];

        let included = menu_ingredients(&recipes, &all, &categories());
        let names: Vec<&str> = included.iter().map(|i| i.name.as_str()).collect();
        // Batch ingredient regardless of category; batch components not exploded
        assert_eq!(names, vec!["House Negroni Batch", "Cointreau", "House Bitters"]);
    }

    #[test]
    fn test_default_selection() {
        let gin = ingredient(1, "Gin", Some("Spirit"));
        let rum = ingredient(2, "Rum", Some("Spirit"));
        let variants = vec![
            variant(10, 1, 750.0, 20.0),
            variant(20, 2, 750.0, 20.0),
            variant(21, 2, 1000.0, 24.0),
        ];
        let candidates =
            resolve_candidates(&[&gin, &rum], &variants, &HashSet::new(), ResolveMode::Inventory);
        assert_eq!(default_selection(&candidates), vec![10]);
    }
}
