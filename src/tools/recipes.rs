//! Recipe and Menu MCP Tools
//!
//! Recipes with their ingredient lines and pour costs, and menus that group
//! recipes for an account.

use serde::{Deserialize, Serialize};

use crate::costing::{round_cost, to_canonical_ounces, CANONICAL_UNIT};
use crate::db::Database;
use crate::models::{
    Account, BatchSettings, Ingredient, Menu, Recipe, RecipeCreate, RecipeIngredient,
    RecipeIngredientCreate, RecipeUpdate,
};

/// A recipe line as submitted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeLineInput {
    pub ingredient_name: String,
    pub amount: f64,
    pub unit: Option<String>,
}

/// A recipe line with its cost when the ingredient is known
#[derive(Debug, Serialize)]
pub struct RecipeLineDetail {
    pub id: i64,
    pub ingredient_name: String,
    pub amount: f64,
    pub unit: String,
    pub ingredient_id: Option<i64>,
    pub cost: Option<f64>,
}

/// Full recipe detail
#[derive(Debug, Serialize)]
pub struct RecipeDetail {
    pub id: i64,
    pub name: String,
    pub batch_settings: Option<BatchSettings>,
    pub notes: Option<String>,
    pub lines: Vec<RecipeLineDetail>,
    /// Sum of the lines that could be costed
    pub total_cost: f64,
    /// Lines whose ingredient or unit could not be costed
    pub uncosted_lines: usize,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct RecipeSummary {
    pub id: i64,
    pub name: String,
    pub tracked_batch: bool,
}

/// Menu with its recipes in order
#[derive(Debug, Serialize)]
pub struct MenuDetail {
    pub menu: Menu,
    pub recipes: Vec<RecipeSummary>,
}

/// Cost of `amount` `unit` of an ingredient, if the units line up
pub fn line_cost(ingredient: &Ingredient, amount: f64, unit: &str) -> Option<f64> {
    if ingredient.unit.eq_ignore_ascii_case(CANONICAL_UNIT) {
        return Some(round_cost(to_canonical_ounces(amount, unit) * ingredient.cost_per_unit));
    }
    if ingredient.unit.trim().eq_ignore_ascii_case(unit.trim()) {
        return Some(round_cost(amount * ingredient.cost_per_unit));
    }
    None
}

fn build_detail(recipe: Recipe, lines: Vec<RecipeIngredient>, ingredients: &[Ingredient]) -> RecipeDetail {
    let lines: Vec<RecipeLineDetail> = lines
        .into_iter()
        .map(|line| {
            let matched = ingredients.iter().find(|i| i.matches_name(&line.ingredient_name));
            RecipeLineDetail {
                id: line.id,
                ingredient_id: matched.map(|i| i.id),
                cost: matched.and_then(|i| line_cost(i, line.amount, &line.unit)),
                ingredient_name: line.ingredient_name,
                amount: line.amount,
                unit: line.unit,
            }
        })
        .collect();

    RecipeDetail {
        id: recipe.id,
        name: recipe.name,
        batch_settings: recipe.batch_settings,
        notes: recipe.notes,
        total_cost: round_cost(lines.iter().filter_map(|l| l.cost).sum()),
        uncosted_lines: lines.iter().filter(|l| l.cost.is_none()).count(),
        lines,
        created_at: recipe.created_at,
        updated_at: recipe.updated_at,
    }
}

fn check_line(line: &RecipeLineInput) -> Result<(), String> {
    if line.ingredient_name.trim().is_empty() {
        return Err("ingredient_name cannot be empty".to_string());
    }
    if !line.amount.is_finite() || line.amount < 0.0 {
        return Err(format!("amount for '{}' must be a non-negative number", line.ingredient_name.trim()));
    }
    Ok(())
}

/// Create a recipe with its lines
pub fn create_recipe(
    db: &Database,
    name: &str,
    batch_settings: Option<BatchSettings>,
    notes: Option<String>,
    lines: &[RecipeLineInput],
) -> Result<RecipeDetail, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Recipe name cannot be empty".to_string());
    }
    for line in lines {
        check_line(line)?;
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let recipe = Recipe::create(&conn, &RecipeCreate {
        name: name.to_string(),
        batch_settings,
        notes,
    })
    .map_err(|e| format!("Failed to create recipe: {}", e))?;

    for line in lines {
        RecipeIngredient::create(&conn, &RecipeIngredientCreate {
            recipe_id: recipe.id,
            ingredient_name: line.ingredient_name.clone(),
            amount: line.amount,
            unit: line.unit.clone().unwrap_or_else(|| CANONICAL_UNIT.to_string()),
        })
        .map_err(|e| format!("Failed to add line '{}': {}", line.ingredient_name, e))?;
    }

    drop(conn);
    get_recipe(db, recipe.id)?.ok_or_else(|| format!("Recipe {} not found after create", recipe.id))
}

/// Recipe with lines and costs
pub fn get_recipe(db: &Database, id: i64) -> Result<Option<RecipeDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let recipe = match Recipe::get_by_id(&conn, id).map_err(|e| format!("Database error: {}", e))? {
        Some(r) => r,
        None => return Ok(None),
    };
    let lines = RecipeIngredient::get_for_recipe(&conn, id).map_err(|e| format!("Database error: {}", e))?;
    let ingredients = Ingredient::list(&conn).map_err(|e| format!("Database error: {}", e))?;
    Ok(Some(build_detail(recipe, lines, &ingredients)))
}

pub fn list_recipes(db: &Database, query: Option<&str>, limit: i64, offset: i64) -> Result<Vec<RecipeSummary>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let recipes = Recipe::list(&conn, query, limit.clamp(1, 200), offset.max(0))
        .map_err(|e| format!("Database error: {}", e))?;
    Ok(recipes
        .into_iter()
        .map(|r| RecipeSummary {
            tracked_batch: r.is_tracked_batch(),
            id: r.id,
            name: r.name,
        })
        .collect())
}

pub fn update_recipe(db: &Database, id: i64, data: RecipeUpdate) -> Result<Option<RecipeDetail>, String> {
    if data.name.as_deref().map_or(false, |n| n.trim().is_empty()) {
        return Err("Recipe name cannot be empty".to_string());
    }
    {
        let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
        if Recipe::update(&conn, id, &data)
            .map_err(|e| format!("Failed to update recipe: {}", e))?
            .is_none()
        {
            return Ok(None);
        }
    }
    get_recipe(db, id)
}

pub fn delete_recipe(db: &Database, id: i64) -> Result<bool, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    Recipe::delete(&conn, id).map_err(|e| format!("Database error: {}", e))
}

pub fn add_recipe_line(db: &Database, recipe_id: i64, line: &RecipeLineInput) -> Result<RecipeIngredient, String> {
    check_line(line)?;
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    if Recipe::get_by_id(&conn, recipe_id)
        .map_err(|e| format!("Database error: {}", e))?
        .is_none()
    {
        return Err(format!("Recipe {} not found", recipe_id));
    }
    RecipeIngredient::create(&conn, &RecipeIngredientCreate {
        recipe_id,
        ingredient_name: line.ingredient_name.clone(),
        amount: line.amount,
        unit: line.unit.clone().unwrap_or_else(|| CANONICAL_UNIT.to_string()),
    })
    .map_err(|e| format!("Failed to add line: {}", e))
}

pub fn remove_recipe_line(db: &Database, line_id: i64) -> Result<bool, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    RecipeIngredient::delete(&conn, line_id).map_err(|e| format!("Database error: {}", e))
}

pub fn create_menu(db: &Database, account_id: i64, name: &str) -> Result<Menu, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Menu name cannot be empty".to_string());
    }
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    if Account::get_by_id(&conn, account_id)
        .map_err(|e| format!("Database error: {}", e))?
        .is_none()
    {
        return Err(format!("Account {} not found", account_id));
    }
    Menu::create(&conn, account_id, name).map_err(|e| format!("Failed to create menu: {}", e))
}

/// Add a recipe to a menu; false if it was already there
pub fn add_recipe_to_menu(db: &Database, menu_id: i64, recipe_id: i64) -> Result<bool, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    if Menu::get_by_id(&conn, menu_id).map_err(|e| format!("Database error: {}", e))?.is_none() {
        return Err(format!("Menu {} not found", menu_id));
    }
    if Recipe::get_by_id(&conn, recipe_id).map_err(|e| format!("Database error: {}", e))?.is_none() {
        return Err(format!("Recipe {} not found", recipe_id));
    }
    Menu::add_recipe(&conn, menu_id, recipe_id).map_err(|e| format!("Database error: {}", e))
}

pub fn get_menu(db: &Database, menu_id: i64) -> Result<Option<MenuDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let menu = match Menu::get_by_id(&conn, menu_id).map_err(|e| format!("Database error: {}", e))? {
        Some(m) => m,
        None => return Ok(None),
    };
    let recipes = Menu::recipes(&conn, menu_id)
        .map_err(|e| format!("Database error: {}", e))?
        .into_iter()
        .map(|r| RecipeSummary {
            tracked_batch: r.is_tracked_batch(),
            id: r.id,
            name: r.name,
        })
        .collect();
    Ok(Some(MenuDetail { menu, recipes }))
}

pub fn list_menus(db: &Database, account_id: i64) -> Result<Vec<Menu>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    Menu::list_for_account(&conn, account_id).map_err(|e| format!("Database error: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IngredientCreate;
    use crate::tools::test_db;

    fn line(name: &str, amount: f64, unit: Option<&str>) -> RecipeLineInput {
        RecipeLineInput {
            ingredient_name: name.to_string(),
            amount,
            unit: unit.map(str::to_string),
        }
    }

    #[test]
    fn test_recipe_costs_lines() {
        let db = test_db();
        db.with_conn(|c| {
            // $30 per liter -> per ounce
            let mut gin = IngredientCreate::named("Gin");
            gin.purchase_price = 30.0;
            gin.purchase_quantity = 1.0;
            gin.purchase_unit = "l".into();
            Ingredient::create(c, &gin)?;

            let mut limes = IngredientCreate::named("Lime");
            limes.purchase_price = 10.0;
            limes.purchase_quantity = 40.0;
            limes.purchase_unit = "each".into();
            Ingredient::create(c, &limes)
        })
        .unwrap();

        let detail = create_recipe(&db, "Gimlet", None, None, &[
            line("gin", 2.0, None),
            line("Lime", 1.0, Some("each")),
            line("Simple Syrup", 0.75, Some("oz")),
        ])
        .unwrap();

        let per_oz = round_cost(30.0 / (1000.0 / 29.5735));
        assert_eq!(detail.lines[0].cost, Some(round_cost(2.0 * per_oz)));
        assert_eq!(detail.lines[1].cost, Some(0.25));
        assert_eq!(detail.lines[2].cost, None);
        assert_eq!(detail.uncosted_lines, 1);
        assert!(detail.total_cost > 0.25);
    }

    #[test]
    fn test_validation() {
        let db = test_db();
        assert!(create_recipe(&db, " ", None, None, &[]).is_err());
        assert!(create_recipe(&db, "Bad", None, None, &[line("Gin", -1.0, None)]).is_err());
        assert!(create_menu(&db, 999, "Spring").is_err());
    }

    #[test]
    fn test_menu_membership() {
        let db = test_db();
        let account = crate::tools::inventory::create_account(&db, "Main Bar").unwrap();
        let menu = create_menu(&db, account.id, "Spring").unwrap();
        let a = create_recipe(&db, "Negroni", None, None, &[]).unwrap();
        let b = create_recipe(&db, "Americano", None, None, &[]).unwrap();

        assert!(add_recipe_to_menu(&db, menu.id, a.id).unwrap());
        assert!(add_recipe_to_menu(&db, menu.id, b.id).unwrap());
        assert!(!add_recipe_to_menu(&db, menu.id, a.id).unwrap());

        let detail = get_menu(&db, menu.id).unwrap().unwrap();
        let names: Vec<&str> = detail.recipes.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Negroni", "Americano"]);
    }
}
