//! Ingredient MCP Tools
//!
//! Add, update, look up, de-duplicate and merge ingredients.

use std::collections::HashSet;

use serde::Serialize;

use crate::db::Database;
use crate::dedupe::group_duplicates;
use crate::models::{
    AppSettings, Ingredient, IngredientCreate, IngredientUpdate, ProductVariant, Recipe,
    RecipeIngredient,
};
use crate::tools::bulk::{run_chunked, Applied};

/// Summary of an ingredient for list/search results
#[derive(Debug, Serialize)]
pub struct IngredientSummary {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub supplier: Option<String>,
    pub cost_per_unit: f64,
    pub unit: String,
}

impl From<&Ingredient> for IngredientSummary {
    fn from(item: &Ingredient) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            category: item.category.clone(),
            supplier: item.supplier.clone(),
            cost_per_unit: item.cost_per_unit,
            unit: item.unit.clone(),
        }
    }
}

/// Variant as shown under an ingredient
#[derive(Debug, Serialize)]
pub struct VariantSummary {
    pub id: i64,
    pub size_ml: f64,
    pub sku_number: Option<String>,
    pub bottle_price: f64,
    pub cost_per_ounce: Option<f64>,
}

impl From<&ProductVariant> for VariantSummary {
    fn from(v: &ProductVariant) -> Self {
        Self {
            id: v.id,
            size_ml: v.size_ml,
            sku_number: v.sku_number.clone(),
            bottle_price: v.bottle_price(),
            cost_per_ounce: v.cost_per_ounce(),
        }
    }
}

/// Full ingredient detail
#[derive(Debug, Serialize)]
pub struct IngredientDetail {
    #[serde(flatten)]
    pub ingredient: Ingredient,
    pub variants: Vec<VariantSummary>,
    pub recipe_line_count: i64,
}

/// Response for search/list
#[derive(Debug, Serialize)]
pub struct ListIngredientsResponse {
    pub items: Vec<IngredientSummary>,
    pub total: usize,
}

/// Response for update_ingredient
#[derive(Debug, Serialize)]
pub struct UpdateIngredientResponse {
    pub ingredient: IngredientSummary,
    /// Previous name when the update renamed the ingredient
    pub renamed_from: Option<String>,
    pub recipes_updated: usize,
    pub errors: Vec<String>,
}

/// One member of a duplicate group
#[derive(Debug, Serialize)]
pub struct DuplicateMember {
    pub id: i64,
    pub name: String,
    pub score: f64,
}

/// A group of likely duplicates around an anchor ingredient
#[derive(Debug, Serialize)]
pub struct DuplicateGroupView {
    pub anchor_id: i64,
    pub anchor_name: String,
    pub members: Vec<DuplicateMember>,
}

/// Response for find_duplicate_ingredients
#[derive(Debug, Serialize)]
pub struct FindDuplicatesResponse {
    pub threshold: f64,
    pub groups: Vec<DuplicateGroupView>,
}

/// Response for merge_ingredients
#[derive(Debug, Serialize)]
pub struct MergeIngredientsResponse {
    pub primary_id: i64,
    pub merged_ids: Vec<i64>,
    pub recipe_lines_updated: usize,
    pub variants_moved: usize,
    pub aliases: Vec<String>,
    pub failed: usize,
    pub errors: Vec<String>,
}

fn clean_aliases(aliases: Vec<String>, own_name: &str) -> Vec<String> {
    let own = own_name.trim().to_lowercase();
    let mut seen = HashSet::new();
    aliases
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty() && a.to_lowercase() != own && seen.insert(a.to_lowercase()))
        .collect()
}

fn check_purchase_numbers(price: Option<f64>, quantity: Option<f64>) -> Result<(), String> {
    if price.map_or(false, |p| !p.is_finite()) {
        return Err("purchase_price must be a finite number".to_string());
    }
    if quantity.map_or(false, |q| !q.is_finite()) {
        return Err("purchase_quantity must be a finite number".to_string());
    }
    Ok(())
}

/// Add a new ingredient
pub fn add_ingredient(db: &Database, mut data: IngredientCreate) -> Result<Ingredient, String> {
    let name = data.name.trim().to_string();
    if name.is_empty() {
        return Err("Ingredient name cannot be empty".to_string());
    }
    check_purchase_numbers(Some(data.purchase_price), Some(data.purchase_quantity))?;
    data.name = name;
    data.aliases = clean_aliases(std::mem::take(&mut data.aliases), &data.name);

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    if Ingredient::get_by_name(&conn, &data.name)
        .map_err(|e| format!("Database error: {}", e))?
        .is_some()
    {
        return Err(format!("Ingredient '{}' already exists", data.name));
    }

    let item = Ingredient::create(&conn, &data)
        .map_err(|e| format!("Failed to create ingredient: {}", e))?;
    tracing::info!("Added ingredient {} '{}' at {} per {}", item.id, item.name, item.cost_per_unit, item.unit);
    Ok(item)
}

/// Update an ingredient; a rename rewrites every recipe line using the old name
pub fn update_ingredient(
    db: &Database,
    settings: &AppSettings,
    id: i64,
    mut data: IngredientUpdate,
) -> Result<Option<UpdateIngredientResponse>, String> {
    check_purchase_numbers(data.purchase_price, data.purchase_quantity)?;

    let (updated, renamed_from) = {
        let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
        let existing = match Ingredient::get_by_id(&conn, id).map_err(|e| format!("Database error: {}", e))? {
            Some(e) => e,
            None => return Ok(None),
        };

        let mut renamed_from = None;
        if let Some(ref new_name) = data.name {
            let new_name = new_name.trim().to_string();
            if new_name.is_empty() {
                return Err("Ingredient name cannot be empty".to_string());
            }
            if let Some(other) = Ingredient::get_by_name(&conn, &new_name)
                .map_err(|e| format!("Database error: {}", e))?
            {
                if other.id != id {
                    return Err(format!("Ingredient '{}' already exists", new_name));
                }
            }
            if new_name != existing.name {
                renamed_from = Some(existing.name.clone());
            }
            data.name = Some(new_name);
        }

        if let Some(aliases) = data.aliases.take() {
            let own = data.name.as_deref().unwrap_or(&existing.name);
            data.aliases = Some(clean_aliases(aliases, own));
        }

        let updated = Ingredient::update(&conn, id, &data)
            .map_err(|e| format!("Failed to update ingredient: {}", e))?
            .ok_or_else(|| format!("Ingredient {} disappeared during update", id))?;
        (updated, renamed_from)
    };

    let mut recipes_updated = 0;
    let mut errors = Vec::new();
    if let Some(ref old_name) = renamed_from {
        let recipe_ids = db
            .with_conn(|conn| Recipe::ids_referencing_ingredient(conn, old_name))
            .map_err(|e| format!("Database error: {}", e))?;

        let new_name = updated.name.as_str();
        let outcome = run_chunked(
            &recipe_ids,
            settings.bulk_chunk_size,
            |recipe_id| {
                let rows = db
                    .with_conn(|conn| RecipeIngredient::rename_in_recipe(conn, *recipe_id, old_name, new_name))
                    .map_err(|e| format!("Recipe {}: {}", recipe_id, e))?;
                Ok(if rows > 0 { Applied::Done } else { Applied::Skipped })
            },
            |p| tracing::debug!("Rename propagation {}/{}", p.completed, p.total),
        );
        tracing::info!(
            "Renamed ingredient '{}' to '{}': {} recipes updated, {} failed",
            old_name, new_name, outcome.succeeded, outcome.failed
        );
        recipes_updated = outcome.succeeded;
        errors = outcome.errors;
    }

    Ok(Some(UpdateIngredientResponse {
        ingredient: IngredientSummary::from(&updated),
        renamed_from,
        recipes_updated,
        errors,
    }))
}

/// Get full ingredient detail with variants
pub fn get_ingredient(db: &Database, id: i64) -> Result<Option<IngredientDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let ingredient = match Ingredient::get_by_id(&conn, id).map_err(|e| format!("Database error: {}", e))? {
        Some(i) => i,
        None => return Ok(None),
    };
    let variants = ProductVariant::list_for_ingredient(&conn, id)
        .map_err(|e| format!("Database error: {}", e))?;
    let recipe_line_count = RecipeIngredient::count_references(&conn, &ingredient.name)
        .map_err(|e| format!("Database error: {}", e))?;

    Ok(Some(IngredientDetail {
        ingredient,
        variants: variants.iter().map(VariantSummary::from).collect(),
        recipe_line_count,
    }))
}

/// Search ingredients by name, supplier or category
pub fn search_ingredients(db: &Database, query: &str, limit: i64) -> Result<ListIngredientsResponse, String> {
    let limit = limit.clamp(1, 200);
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let items = Ingredient::search(&conn, query, limit).map_err(|e| format!("Database error: {}", e))?;
    let summaries: Vec<IngredientSummary> = items.iter().map(IngredientSummary::from).collect();
    let total = summaries.len();
    Ok(ListIngredientsResponse { items: summaries, total })
}

/// All ingredients in creation order
pub fn list_ingredients(db: &Database) -> Result<ListIngredientsResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let items = Ingredient::list(&conn).map_err(|e| format!("Database error: {}", e))?;
    let summaries: Vec<IngredientSummary> = items.iter().map(IngredientSummary::from).collect();
    let total = summaries.len();
    Ok(ListIngredientsResponse { items: summaries, total })
}

/// Group ingredients whose names look like duplicates
pub fn find_duplicate_ingredients(db: &Database, threshold: f64) -> Result<FindDuplicatesResponse, String> {
    if !(threshold > 0.0 && threshold <= 1.0) {
        return Err("threshold must be in (0, 1]".to_string());
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let items = Ingredient::list(&conn).map_err(|e| format!("Database error: {}", e))?;
    let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();

    let groups = group_duplicates(&names, threshold)
        .into_iter()
        .map(|g| DuplicateGroupView {
            anchor_id: items[g.anchor].id,
            anchor_name: items[g.anchor].name.clone(),
            members: g
                .members
                .iter()
                .map(|m| DuplicateMember {
                    id: items[m.index].id,
                    name: items[m.index].name.clone(),
                    score: m.score,
                })
                .collect(),
        })
        .collect::<Vec<_>>();

    tracing::info!("Found {} duplicate groups among {} ingredients", groups.len(), items.len());
    Ok(FindDuplicatesResponse { threshold, groups })
}

fn merge_one(db: &Database, primary: &mut Ingredient, duplicate_id: i64) -> Result<(usize, usize), String> {
    db.with_conn(|conn| {
        let duplicate = Ingredient::get_by_id(conn, duplicate_id)?.ok_or_else(|| {
            crate::db::DbError::Validation(format!("Ingredient {} not found", duplicate_id))
        })?;

        let mut lines = 0;
        for recipe_id in Recipe::ids_referencing_ingredient(conn, &duplicate.name)? {
            lines += RecipeIngredient::rename_in_recipe(conn, recipe_id, &duplicate.name, &primary.name)?;
        }

        let moved = ProductVariant::reassign_ingredient(conn, duplicate.id, primary.id)?;

        let mut aliases = primary.aliases.clone();
        aliases.push(duplicate.name.clone());
        aliases.extend(duplicate.aliases.iter().cloned());
        let aliases = clean_aliases(aliases, &primary.name);

        // Variants are already moved; deleting cascades to whatever is left
        Ingredient::delete(conn, duplicate.id)?;
        let update = IngredientUpdate {
            aliases: Some(aliases),
            ..Default::default()
        };
        if let Some(updated) = Ingredient::update(conn, primary.id, &update)? {
            *primary = updated;
        }

        Ok((lines, moved))
    })
    .map_err(|e| format!("Merging ingredient {}: {}", duplicate_id, e))
}

/// Fold duplicates into a primary ingredient
pub fn merge_ingredients(db: &Database, primary_id: i64, duplicate_ids: &[i64]) -> Result<MergeIngredientsResponse, String> {
    let mut primary = db
        .with_conn(|conn| Ingredient::get_by_id(conn, primary_id))
        .map_err(|e| format!("Database error: {}", e))?
        .ok_or_else(|| format!("Primary ingredient {} not found", primary_id))?;

    let mut response = MergeIngredientsResponse {
        primary_id,
        merged_ids: Vec::new(),
        recipe_lines_updated: 0,
        variants_moved: 0,
        aliases: Vec::new(),
        failed: 0,
        errors: Vec::new(),
    };

    let mut seen = HashSet::new();
    for &duplicate_id in duplicate_ids {
        if duplicate_id == primary_id || !seen.insert(duplicate_id) {
            continue;
        }
        match merge_one(db, &mut primary, duplicate_id) {
            Ok((lines, moved)) => {
                response.merged_ids.push(duplicate_id);
                response.recipe_lines_updated += lines;
                response.variants_moved += moved;
            }
            Err(e) => {
                tracing::warn!("{}", e);
                response.failed += 1;
                response.errors.push(e);
            }
        }
    }

    tracing::info!(
        "Merged {} ingredients into '{}' ({} failed)",
        response.merged_ids.len(), primary.name, response.failed
    );
    response.aliases = primary.aliases;
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProductVariantCreate, RecipeCreate, RecipeIngredientCreate};
    use crate::tools::test_db;

    fn add(db: &Database, name: &str) -> Ingredient {
        add_ingredient(db, IngredientCreate::named(name)).unwrap()
    }

    fn recipe_with_line(db: &Database, recipe: &str, line: &str) -> i64 {
        db.with_conn(|conn| {
            let r = Recipe::create(conn, &RecipeCreate {
                name: recipe.to_string(),
                batch_settings: None,
                notes: None,
            })?;
            RecipeIngredient::create(conn, &RecipeIngredientCreate {
                recipe_id: r.id,
                ingredient_name: line.to_string(),
                amount: 1.5,
                unit: "oz".to_string(),
            })?;
            Ok(r.id)
        })
        .unwrap()
    }

    #[test]
    fn test_add_rejects_blank_and_duplicate_names() {
        let db = test_db();
        assert!(add_ingredient(&db, IngredientCreate::named("   ")).is_err());
        add(&db, "Campari");
        let err = add_ingredient(&db, IngredientCreate::named("campari")).unwrap_err();
        assert!(err.contains("already exists"));
    }

    #[test]
    fn test_add_cleans_aliases() {
        let db = test_db();
        let mut data = IngredientCreate::named("Cointreau");
        data.aliases = vec![" Triple Sec ".into(), "triple sec".into(), "".into(), "COINTREAU".into()];
        let item = add_ingredient(&db, data).unwrap();
        assert_eq!(item.aliases, vec!["Triple Sec".to_string()]);
    }

    #[test]
    fn test_rename_propagates_to_recipes() {
        let db = test_db();
        let settings = AppSettings::default();
        let gin = add(&db, "Gin");
        let a = recipe_with_line(&db, "Martini", "gin");
        let b = recipe_with_line(&db, "Gimlet", "Gin");
        recipe_with_line(&db, "Daiquiri", "Rum");

        let update = IngredientUpdate {
            name: Some("London Dry Gin".to_string()),
            ..Default::default()
        };
        let result = update_ingredient(&db, &settings, gin.id, update).unwrap().unwrap();
        assert_eq!(result.renamed_from.as_deref(), Some("Gin"));
        assert_eq!(result.recipes_updated, 2);
        assert!(result.errors.is_empty());

        let lines = db.with_conn(|c| RecipeIngredient::get_for_recipe(c, a)).unwrap();
        assert_eq!(lines[0].ingredient_name, "London Dry Gin");
        let lines = db.with_conn(|c| RecipeIngredient::get_for_recipe(c, b)).unwrap();
        assert_eq!(lines[0].ingredient_name, "London Dry Gin");
    }

    #[test]
    fn test_update_missing_returns_none() {
        let db = test_db();
        let result = update_ingredient(&db, &AppSettings::default(), 999, IngredientUpdate::default()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_find_duplicates() {
        let db = test_db();
        add(&db, "Lime Juice");
        add(&db, "Fresh Lime Juice");
        add(&db, "Orgeat");

        let result = find_duplicate_ingredients(&db, 0.6).unwrap();
        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.groups[0].anchor_name, "Lime Juice");
        assert_eq!(result.groups[0].members[0].name, "Fresh Lime Juice");
        assert!(find_duplicate_ingredients(&db, 0.0).is_err());
    }

    #[test]
    fn test_merge_moves_lines_variants_and_aliases() {
        let db = test_db();
        let primary = add(&db, "Lime Juice");
        let dup = {
            let mut data = IngredientCreate::named("Fresh Lime Juice");
            data.aliases = vec!["FLJ".to_string()];
            add_ingredient(&db, data).unwrap()
        };
        let recipe_id = recipe_with_line(&db, "Daiquiri", "Fresh Lime Juice");
        db.with_conn(|c| {
            ProductVariant::create(c, &ProductVariantCreate {
                ingredient_id: dup.id,
                size_ml: 1000.0,
                purchase_price: 8.0,
                case_price: None,
                bottles_per_case: None,
                sku_number: None,
                use_case_pricing: false,
            })
        })
        .unwrap();

        let result = merge_ingredients(&db, primary.id, &[dup.id, 424242]).unwrap();
        assert_eq!(result.merged_ids, vec![dup.id]);
        assert_eq!(result.recipe_lines_updated, 1);
        assert_eq!(result.variants_moved, 1);
        assert_eq!(result.failed, 1);
        assert_eq!(result.aliases, vec!["Fresh Lime Juice".to_string(), "FLJ".to_string()]);

        let lines = db.with_conn(|c| RecipeIngredient::get_for_recipe(c, recipe_id)).unwrap();
        assert_eq!(lines[0].ingredient_name, "Lime Juice");
        assert!(get_ingredient(&db, dup.id).unwrap().is_none());
        assert_eq!(get_ingredient(&db, primary.id).unwrap().unwrap().variants.len(), 1);
    }
}
