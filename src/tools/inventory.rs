//! Inventory MCP Tools
//!
//! Accounts, product variants, and stocking an account's inventory from a
//! menu or an ingredient list.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::models::{
    Account, Ingredient, InventoryItem, InventoryItemCreate, InventoryItemDetail, Menu,
    ProductVariant, ProductVariantCreate, ProductVariantUpdate, RecipeIngredient, TrackOutcome,
    AppSettings,
};
use crate::stock::{default_selection, menu_ingredients, resolve_candidates, ResolveMode, VariantCandidate};
use crate::tools::bulk::{run_chunked, Applied, ChunkProgress};

/// Where candidate ingredients come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    Ingredients(Vec<i64>),
    Menu(i64),
}

/// Response for load_inventory_candidates
#[derive(Debug, Serialize)]
pub struct CandidatesResponse {
    pub account_id: i64,
    pub mode: ResolveMode,
    pub candidates: Vec<VariantCandidate>,
    /// Variants chosen without asking (single-variant ingredients)
    pub default_selection: Vec<i64>,
    pub needs_choice: usize,
}

/// Response for confirm_inventory_selection
#[derive(Debug, Serialize)]
pub struct ConfirmSelectionResponse {
    pub account_id: i64,
    pub requested: usize,
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

/// Response for list_inventory
#[derive(Debug, Serialize)]
pub struct ListInventoryResponse {
    pub account_id: i64,
    pub items: Vec<InventoryItemDetail>,
    pub needs_reorder: usize,
}

/// Create an account
pub fn create_account(db: &Database, name: &str) -> Result<Account, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Account name cannot be empty".to_string());
    }
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    Account::create(&conn, name).map_err(|e| format!("Failed to create account: {}", e))
}

pub fn list_accounts(db: &Database) -> Result<Vec<Account>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    Account::list(&conn).map_err(|e| format!("Database error: {}", e))
}

fn check_variant_numbers(size_ml: Option<f64>, price: Option<f64>, case_price: Option<f64>) -> Result<(), String> {
    if let Some(size) = size_ml {
        if !size.is_finite() || size <= 0.0 {
            return Err("size_ml must be greater than 0".to_string());
        }
    }
    if price.map_or(false, |p| !p.is_finite() || p < 0.0) {
        return Err("purchase_price cannot be negative".to_string());
    }
    if case_price.map_or(false, |p| !p.is_finite() || p < 0.0) {
        return Err("case_price cannot be negative".to_string());
    }
    Ok(())
}

/// Add a purchasable size of an ingredient
pub fn add_variant(db: &Database, data: ProductVariantCreate) -> Result<ProductVariant, String> {
    check_variant_numbers(Some(data.size_ml), Some(data.purchase_price), data.case_price)?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    if Ingredient::get_by_id(&conn, data.ingredient_id)
        .map_err(|e| format!("Database error: {}", e))?
        .is_none()
    {
        return Err(format!("Ingredient {} not found", data.ingredient_id));
    }
    if let Some(sku) = data.sku_number.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        if ProductVariant::get_by_sku(&conn, sku)
            .map_err(|e| format!("Database error: {}", e))?
            .is_some()
        {
            return Err(format!("SKU '{}' is already in use", sku));
        }
    }

    ProductVariant::create(&conn, &data).map_err(|e| format!("Failed to create variant: {}", e))
}

pub fn update_variant(db: &Database, id: i64, data: ProductVariantUpdate) -> Result<Option<ProductVariant>, String> {
    check_variant_numbers(data.size_ml, data.purchase_price, data.case_price)?;
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    ProductVariant::update(&conn, id, &data).map_err(|e| format!("Failed to update variant: {}", e))
}

/// An account's tracked inventory
pub fn list_inventory(db: &Database, account_id: i64) -> Result<ListInventoryResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let items = InventoryItem::list_details_for_account(&conn, account_id)
        .map_err(|e| format!("Database error: {}", e))?;
    let needs_reorder = items.iter().filter(|i| i.needs_reorder).count();
    Ok(ListInventoryResponse { account_id, items, needs_reorder })
}

pub fn set_reorder_point(db: &Database, inventory_item_id: i64, reorder_point: f64) -> Result<bool, String> {
    if !reorder_point.is_finite() || reorder_point < 0.0 {
        return Err("reorder_point must be a non-negative number".to_string());
    }
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    InventoryItem::set_reorder_point(&conn, inventory_item_id, reorder_point)
        .map_err(|e| format!("Database error: {}", e))
}

/// Build the variant candidate list for an account
pub fn load_inventory_candidates(
    db: &Database,
    settings: &AppSettings,
    account_id: i64,
    source: &CandidateSource,
    mode: ResolveMode,
) -> Result<CandidatesResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    if Account::get_by_id(&conn, account_id)
        .map_err(|e| format!("Database error: {}", e))?
        .is_none()
    {
        return Err(format!("Account {} not found", account_id));
    }

    let all_ingredients;
    let picked: Vec<&Ingredient> = match source {
        CandidateSource::Ingredients(ids) => {
            all_ingredients = Ingredient::list_by_ids(&conn, ids)
                .map_err(|e| format!("Database error: {}", e))?;
            all_ingredients.iter().collect()
        }
        CandidateSource::Menu(menu_id) => {
            let menu = Menu::get_by_id(&conn, *menu_id)
                .map_err(|e| format!("Database error: {}", e))?
                .ok_or_else(|| format!("Menu {} not found", menu_id))?;
            if menu.account_id != account_id {
                return Err(format!("Menu {} belongs to another account", menu_id));
            }

            let recipes = Menu::recipes(&conn, menu.id).map_err(|e| format!("Database error: {}", e))?;
            let mut with_lines = Vec::with_capacity(recipes.len());
            for recipe in recipes {
                let lines = RecipeIngredient::get_for_recipe(&conn, recipe.id)
                    .map_err(|e| format!("Database error: {}", e))?;
                with_lines.push((recipe, lines));
            }

            all_ingredients = Ingredient::list(&conn).map_err(|e| format!("Database error: {}", e))?;
            menu_ingredients(&with_lines, &all_ingredients, &settings.alcoholic_categories)
        }
    };

    let variants = ProductVariant::list(&conn).map_err(|e| format!("Database error: {}", e))?;
    let tracked = match mode {
        ResolveMode::Inventory => InventoryItem::tracked_variant_ids(&conn, account_id)
            .map_err(|e| format!("Database error: {}", e))?,
        ResolveMode::Order => HashSet::new(),
    };

    let candidates = resolve_candidates(&picked, &variants, &tracked, mode);
    let selection = default_selection(&candidates);
    let needs_choice = candidates.iter().filter(|c| c.needs_choice).count();

    tracing::info!(
        "Loaded {} candidates for account {} ({} need a choice)",
        candidates.len(), account_id, needs_choice
    );

    Ok(CandidatesResponse {
        account_id,
        mode,
        candidates,
        default_selection: selection,
        needs_choice,
    })
}

/// Track the chosen variants for an account.
///
/// Variants already tracked are skipped, unknown variants are errors, and
/// the rest are created concurrently a chunk at a time. `progress` is called
/// after each chunk.
pub fn confirm_inventory_selection<P>(
    db: &Database,
    settings: &AppSettings,
    account_id: i64,
    variant_ids: &[i64],
    progress: P,
) -> Result<ConfirmSelectionResponse, String>
where
    P: FnMut(ChunkProgress),
{
    let (to_create, mut skipped, mut errors) = {
        let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
        if Account::get_by_id(&conn, account_id)
            .map_err(|e| format!("Database error: {}", e))?
            .is_none()
        {
            return Err(format!("Account {} not found", account_id));
        }

        let tracked = InventoryItem::tracked_variant_ids(&conn, account_id)
            .map_err(|e| format!("Database error: {}", e))?;
        let mut seen = HashSet::new();
        let mut to_create = Vec::new();
        let mut skipped = 0;
        let mut errors = Vec::new();
        for &id in variant_ids {
            if !seen.insert(id) {
                continue;
            }
            if tracked.contains(&id) {
                skipped += 1;
                continue;
            }
            match ProductVariant::get_by_id(&conn, id).map_err(|e| format!("Database error: {}", e))? {
                Some(_) => to_create.push(id),
                None => errors.push(format!("Variant {} not found", id)),
            }
        }
        (to_create, skipped, errors)
    };

    let unit = settings.inventory_unit.clone();
    let outcome = run_chunked(
        &to_create,
        settings.bulk_chunk_size,
        |variant_id| {
            let data = InventoryItemCreate {
                account_id,
                product_variant_id: *variant_id,
                current_stock: 0.0,
                reorder_point: 0.0,
                unit: unit.clone(),
            };
            match db.with_conn(|conn| InventoryItem::create_if_untracked(conn, &data)) {
                Ok(TrackOutcome::Created(_)) => Ok(Applied::Done),
                Ok(TrackOutcome::AlreadyTracked) => Ok(Applied::Skipped),
                Err(e) => Err(format!("Variant {}: {}", variant_id, e)),
            }
        },
        progress,
    );

    skipped += outcome.skipped;
    let failed = errors.len() + outcome.failed;
    errors.extend(outcome.errors);

    tracing::info!(
        "Account {}: {} variants tracked, {} skipped, {} failed",
        account_id, outcome.succeeded, skipped, failed
    );

    Ok(ConfirmSelectionResponse {
        account_id,
        requested: variant_ids.len(),
        created: outcome.succeeded,
        skipped,
        failed,
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BatchSettings, IngredientCreate, Recipe, RecipeCreate, RecipeIngredientCreate,
    };
    use crate::tools::test_db;

    fn ingredient(db: &Database, name: &str, category: &str) -> Ingredient {
        let mut data = IngredientCreate::named(name);
        data.category = Some(category.to_string());
        db.with_conn(|c| Ingredient::create(c, &data)).unwrap()
    }

    fn variant(db: &Database, ingredient_id: i64, size_ml: f64, price: f64) -> ProductVariant {
        add_variant(db, ProductVariantCreate {
            ingredient_id,
            size_ml,
            purchase_price: price,
            case_price: None,
            bottles_per_case: None,
            sku_number: None,
            use_case_pricing: false,
        })
        .unwrap()
    }

    #[test]
    fn test_add_variant_validation() {
        let db = test_db();
        let gin = ingredient(&db, "Gin", "Spirit");
        let bad = ProductVariantCreate {
            ingredient_id: gin.id,
            size_ml: 0.0,
            purchase_price: 10.0,
            case_price: None,
            bottles_per_case: None,
            sku_number: None,
            use_case_pricing: false,
        };
        assert!(add_variant(&db, bad.clone()).is_err());

        let missing = ProductVariantCreate { ingredient_id: 999, size_ml: 750.0, ..bad.clone() };
        assert!(add_variant(&db, missing).is_err());

        let with_sku = ProductVariantCreate { size_ml: 750.0, sku_number: Some("G-750".into()), ..bad };
        add_variant(&db, with_sku.clone()).unwrap();
        assert!(add_variant(&db, with_sku).unwrap_err().contains("already in use"));
    }

    #[test]
    fn test_confirm_twice_creates_once() {
        let db = test_db();
        let settings = AppSettings::default();
        let account = create_account(&db, "Main Bar").unwrap();
        let gin = ingredient(&db, "Gin", "Spirit");
        let rum = ingredient(&db, "Rum", "Spirit");
        let v1 = variant(&db, gin.id, 750.0, 20.0);
        let v2 = variant(&db, rum.id, 750.0, 18.0);

        let mut chunks = 0;
        let first = confirm_inventory_selection(&db, &settings, account.id, &[v1.id, v2.id, 999], |_| chunks += 1).unwrap();
        assert_eq!(first.created, 2);
        assert_eq!(first.failed, 1);
        assert_eq!(chunks, 1);

        let second = confirm_inventory_selection(&db, &settings, account.id, &[v1.id, v2.id], |_| {}).unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.skipped, 2);

        let inventory = list_inventory(&db, account.id).unwrap();
        assert_eq!(inventory.items.len(), 2);
        assert_eq!(inventory.items[0].unit, "bottle");
    }

    #[test]
    fn test_confirm_in_chunks() {
        let db = test_db();
        let settings = AppSettings { bulk_chunk_size: 3, ..AppSettings::default() };
        let account = create_account(&db, "Main Bar").unwrap();
        let ids: Vec<i64> = (0..7)
            .map(|n| {
                let ing = ingredient(&db, &format!("Spirit {}", n), "Spirit");
                variant(&db, ing.id, 750.0, 20.0).id
            })
            .collect();

        let mut progress = Vec::new();
        let result = confirm_inventory_selection(&db, &settings, account.id, &ids, |p| progress.push(p.completed)).unwrap();
        assert_eq!(result.created, 7);
        assert_eq!(progress, vec![3, 6, 7]);
    }

    #[test]
    fn test_candidates_from_ingredient_list_exclude_tracked() {
        let db = test_db();
        let settings = AppSettings::default();
        let account = create_account(&db, "Main Bar").unwrap();
        let gin = ingredient(&db, "Gin", "Spirit");
        let rum = ingredient(&db, "Rum", "Spirit");
        let g = variant(&db, gin.id, 750.0, 20.0);
        variant(&db, rum.id, 750.0, 18.0);
        variant(&db, rum.id, 1.75, 36.0);

        let source = CandidateSource::Ingredients(vec![gin.id, rum.id]);
        let loaded = load_inventory_candidates(&db, &settings, account.id, &source, ResolveMode::Inventory).unwrap();
        assert_eq!(loaded.candidates.len(), 2);
        assert_eq!(loaded.default_selection, vec![g.id]);
        assert_eq!(loaded.needs_choice, 1);

        confirm_inventory_selection(&db, &settings, account.id, &[g.id], |_| {}).unwrap();
        let reloaded = load_inventory_candidates(&db, &settings, account.id, &source, ResolveMode::Inventory).unwrap();
        assert_eq!(reloaded.candidates.len(), 1);
        assert_eq!(reloaded.candidates[0].ingredient_name, "Rum");

        let order = load_inventory_candidates(&db, &settings, account.id, &source, ResolveMode::Order).unwrap();
        assert_eq!(order.candidates.len(), 2);
    }

    #[test]
    fn test_candidates_from_menu() {
        let db = test_db();
        let settings = AppSettings::default();
        let account = create_account(&db, "Main Bar").unwrap();
        let tequila = ingredient(&db, "Tequila", "Spirit");
        let lime = ingredient(&db, "Lime Juice", "Juice");
        variant(&db, tequila.id, 750.0, 25.0);
        variant(&db, lime.id, 1000.0, 8.0);

        let (menu_id, batch_ing) = db
            .with_conn(|c| {
                let menu = Menu::create(c, account.id, "Spring")?;
                let margarita = Recipe::create(c, &RecipeCreate {
                    name: "Margarita".into(),
                    batch_settings: None,
                    notes: None,
                })?;
                for name in ["tequila", "Lime Juice"] {
                    RecipeIngredient::create(c, &RecipeIngredientCreate {
                        recipe_id: margarita.id,
                        ingredient_name: name.into(),
                        amount: 1.0,
                        unit: "oz".into(),
                    })?;
                }
                let batch = Recipe::create(c, &RecipeCreate {
                    name: "House Punch".into(),
                    batch_settings: Some(BatchSettings {
                        track_as_bottled: true,
                        yield_amount: Some(1.0),
                        yield_unit: Some("l".into()),
                    }),
                    notes: None,
                })?;
                let mut data = IngredientCreate::named("House Punch Batch");
                data.category = Some("Prep".into());
                data.sub_recipe_id = Some(batch.id);
                let batch_ing = Ingredient::create(c, &data)?;
                Menu::add_recipe(c, menu.id, margarita.id)?;
                Menu::add_recipe(c, menu.id, batch.id)?;
                Ok((menu.id, batch_ing))
            })
            .unwrap();
        let punch = variant(&db, batch_ing.id, 1000.0, 0.0);

        let loaded = load_inventory_candidates(
            &db, &settings, account.id, &CandidateSource::Menu(menu_id), ResolveMode::Inventory,
        )
        .unwrap();
        let names: Vec<&str> = loaded.candidates.iter().map(|c| c.ingredient_name.as_str()).collect();
        assert_eq!(names, vec!["Tequila", "House Punch Batch"]);
        assert!(loaded.default_selection.contains(&punch.id));

        let other = create_account(&db, "Other Bar").unwrap();
        assert!(load_inventory_candidates(
            &db, &settings, other.id, &CandidateSource::Menu(menu_id), ResolveMode::Inventory,
        )
        .is_err());
    }
}
