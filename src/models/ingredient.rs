//! Ingredient model
//!
//! A purchasable ingredient. `cost_per_unit` and `unit` are derived from the
//! purchase fields on every write that touches them.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::costing::normalize_cost;
use crate::db::{DbError, DbResult};
use super::json_field::{from_column, to_column};

/// A prep step producing a yield (e.g. "juice" -> 1.5 oz per lime)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrepAction {
    pub name: String,
    pub yield_amount: f64,
    pub yield_unit: String,
}

/// Prep action as submitted; incomplete entries are dropped before saving
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrepActionInput {
    pub name: Option<String>,
    pub yield_amount: Option<f64>,
    pub yield_unit: Option<String>,
}

/// Keep only prep actions with a name, a yield amount and a yield unit
pub fn complete_prep_actions(inputs: Vec<PrepActionInput>) -> Vec<PrepAction> {
    inputs
        .into_iter()
        .filter_map(|p| {
            let name = p.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())?;
            let yield_amount = p.yield_amount.filter(|a| a.is_finite())?;
            let yield_unit = p
                .yield_unit
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty())?;
            Some(PrepAction {
                name,
                yield_amount,
                yield_unit,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub supplier: Option<String>,
    pub purchase_price: f64,
    pub purchase_quantity: f64,
    pub purchase_unit: String,
    pub cost_per_unit: f64,
    pub unit: String,
    pub aliases: Vec<String>,
    pub prep_actions: Vec<PrepAction>,
    pub sub_recipe_id: Option<i64>,
    pub is_liquor_portfolio: bool,
    pub tier: Option<String>,
    pub exclusive: bool,
    pub image_url: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a new ingredient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientCreate {
    pub name: String,
    pub category: Option<String>,
    pub supplier: Option<String>,
    #[serde(default)]
    pub purchase_price: f64,
    #[serde(default)]
    pub purchase_quantity: f64,
    #[serde(default = "default_purchase_unit")]
    pub purchase_unit: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub prep_actions: Vec<PrepAction>,
    pub sub_recipe_id: Option<i64>,
    #[serde(default)]
    pub is_liquor_portfolio: bool,
    pub tier: Option<String>,
    #[serde(default)]
    pub exclusive: bool,
    pub image_url: Option<String>,
    pub notes: Option<String>,
}

fn default_purchase_unit() -> String {
    "each".to_string()
}

impl IngredientCreate {
    /// Minimal create data with just a name
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            category: None,
            supplier: None,
            purchase_price: 0.0,
            purchase_quantity: 0.0,
            purchase_unit: default_purchase_unit(),
            aliases: Vec::new(),
            prep_actions: Vec::new(),
            sub_recipe_id: None,
            is_liquor_portfolio: false,
            tier: None,
            exclusive: false,
            image_url: None,
            notes: None,
        }
    }
}

/// Data for updating an ingredient
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngredientUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub supplier: Option<String>,
    pub purchase_price: Option<f64>,
    pub purchase_quantity: Option<f64>,
    pub purchase_unit: Option<String>,
    pub aliases: Option<Vec<String>>,
    pub prep_actions: Option<Vec<PrepAction>>,
    pub sub_recipe_id: Option<i64>,
    pub is_liquor_portfolio: Option<bool>,
    pub tier: Option<String>,
    pub exclusive: Option<bool>,
    pub image_url: Option<String>,
    pub notes: Option<String>,
}

impl IngredientUpdate {
    /// Whether any field feeding the cost normalizer is set
    pub fn touches_purchase(&self) -> bool {
        self.purchase_price.is_some()
            || self.purchase_quantity.is_some()
            || self.purchase_unit.is_some()
    }
}

impl Ingredient {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let id: i64 = row.get("id")?;
        Ok(Self {
            id,
            name: row.get("name")?,
            category: row.get("category")?,
            supplier: row.get("supplier")?,
            purchase_price: row.get("purchase_price")?,
            purchase_quantity: row.get("purchase_quantity")?,
            purchase_unit: row.get("purchase_unit")?,
            cost_per_unit: row.get("cost_per_unit")?,
            unit: row.get("unit")?,
            aliases: from_column(row.get("aliases")?, "ingredients", "aliases", id),
            prep_actions: from_column(row.get("prep_actions")?, "ingredients", "prep_actions", id),
            sub_recipe_id: row.get("sub_recipe_id")?,
            is_liquor_portfolio: row.get::<_, i32>("is_liquor_portfolio")? != 0,
            tier: row.get("tier")?,
            exclusive: row.get::<_, i32>("exclusive")? != 0,
            image_url: row.get("image_url")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Whether this ingredient answers to `name` (its own name or an alias)
    pub fn matches_name(&self, name: &str) -> bool {
        let wanted = name.trim().to_lowercase();
        if wanted.is_empty() {
            return false;
        }
        self.name.trim().to_lowercase() == wanted
            || self.aliases.iter().any(|a| a.trim().to_lowercase() == wanted)
    }

    /// Alcoholic if flagged for the liquor portfolio or in an alcoholic category
    pub fn is_alcoholic(&self, alcoholic_categories: &[String]) -> bool {
        if self.is_liquor_portfolio {
            return true;
        }
        match &self.category {
            Some(category) => {
                let category = category.trim().to_lowercase();
                alcoholic_categories
                    .iter()
                    .any(|c| c.trim().to_lowercase() == category)
            }
            None => false,
        }
    }

    /// Insert a new ingredient, normalizing its cost
    pub fn create(conn: &Connection, data: &IngredientCreate) -> DbResult<Self> {
        let cost = normalize_cost(data.purchase_price, data.purchase_quantity, &data.purchase_unit);

        conn.execute(
            r#"
            INSERT INTO ingredients (
                name, category, supplier,
                purchase_price, purchase_quantity, purchase_unit, cost_per_unit, unit,
                aliases, prep_actions, sub_recipe_id, is_liquor_portfolio,
                tier, exclusive, image_url, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
            params![
                data.name.trim(),
                data.category,
                data.supplier,
                data.purchase_price,
                data.purchase_quantity,
                data.purchase_unit,
                cost.cost_per_unit,
                cost.canonical_unit,
                to_column(&data.aliases)?,
                to_column(&data.prep_actions)?,
                data.sub_recipe_id,
                data.is_liquor_portfolio as i32,
                data.tier,
                data.exclusive as i32,
                data.image_url,
                data.notes,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?
            .ok_or_else(|| DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    /// Get an ingredient by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM ingredients WHERE id = ?1")?;
        match stmt.query_row([id], Self::from_row) {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get an ingredient by name, ignoring case and surrounding whitespace
    pub fn get_by_name(conn: &Connection, name: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM ingredients WHERE name = ?1 COLLATE NOCASE"
        )?;
        match stmt.query_row([name.trim()], Self::from_row) {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All ingredients in creation order
    pub fn list(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM ingredients ORDER BY id ASC")?;
        let items = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Ingredients with the given IDs, in the order requested
    pub fn list_by_ids(conn: &Connection, ids: &[i64]) -> DbResult<Vec<Self>> {
        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(item) = Self::get_by_id(conn, *id)? {
                items.push(item);
            }
        }
        Ok(items)
    }

    /// Search ingredients by name, supplier or category
    pub fn search(conn: &Connection, query: &str, limit: i64) -> DbResult<Vec<Self>> {
        let pattern = format!("%{}%", query.trim());
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM ingredients
            WHERE name LIKE ?1 OR supplier LIKE ?1 OR category LIKE ?1
            ORDER BY name ASC
            LIMIT ?2
            "#
        )?;
        let items = stmt
            .query_map(params![pattern, limit], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Update an ingredient, recomputing cost when purchase fields change
    pub fn update(conn: &Connection, id: i64, data: &IngredientUpdate) -> DbResult<Option<Self>> {
        let existing = match Self::get_by_id(conn, id)? {
            Some(e) => e,
            None => return Ok(None),
        };

        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        macro_rules! add_update {
            ($field:ident, $col:expr) => {
                if let Some(ref val) = data.$field {
                    updates.push(format!("{} = ?{}", $col, params_vec.len() + 1));
                    params_vec.push(Box::new(val.clone()));
                }
            };
        }

        if let Some(ref name) = data.name {
            updates.push(format!("name = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(name.trim().to_string()));
        }
        add_update!(category, "category");
        add_update!(supplier, "supplier");
        add_update!(purchase_price, "purchase_price");
        add_update!(purchase_quantity, "purchase_quantity");
        add_update!(purchase_unit, "purchase_unit");
        add_update!(sub_recipe_id, "sub_recipe_id");
        add_update!(tier, "tier");
        add_update!(image_url, "image_url");
        add_update!(notes, "notes");

        if let Some(flag) = data.is_liquor_portfolio {
            updates.push(format!("is_liquor_portfolio = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(flag as i32));
        }
        if let Some(flag) = data.exclusive {
            updates.push(format!("exclusive = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(flag as i32));
        }
        if let Some(ref aliases) = data.aliases {
            updates.push(format!("aliases = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(to_column(aliases)?));
        }
        if let Some(ref prep) = data.prep_actions {
            updates.push(format!("prep_actions = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(to_column(prep)?));
        }

        if data.touches_purchase() {
            let price = data.purchase_price.unwrap_or(existing.purchase_price);
            let quantity = data.purchase_quantity.unwrap_or(existing.purchase_quantity);
            let unit = data
                .purchase_unit
                .clone()
                .unwrap_or_else(|| existing.purchase_unit.clone());
            let cost = normalize_cost(price, quantity, &unit);

            updates.push(format!("cost_per_unit = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(cost.cost_per_unit));
            updates.push(format!("unit = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(cost.canonical_unit));
        }

        if updates.is_empty() {
            return Ok(Some(existing));
        }

        updates.push("updated_at = datetime('now')".to_string());

        let sql = format!(
            "UPDATE ingredients SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );
        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_id(conn, id)
    }

    /// Recompute and store the normalized cost from the stored purchase fields
    pub fn refresh_cost(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let existing = match Self::get_by_id(conn, id)? {
            Some(e) => e,
            None => return Ok(None),
        };
        let cost = normalize_cost(
            existing.purchase_price,
            existing.purchase_quantity,
            &existing.purchase_unit,
        );
        conn.execute(
            "UPDATE ingredients SET cost_per_unit = ?1, unit = ?2, updated_at = datetime('now') WHERE id = ?3",
            params![cost.cost_per_unit, cost.canonical_unit, id],
        )?;
        Self::get_by_id(conn, id)
    }

    /// Raw JSON columns for auditing: (id, name, aliases, prep_actions)
    pub fn raw_json_columns(conn: &Connection) -> DbResult<Vec<(i64, String, String, String)>> {
        let mut stmt = conn.prepare(
            "SELECT id, name, aliases, prep_actions FROM ingredients ORDER BY id"
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Count all ingredients
    pub fn count(conn: &Connection) -> DbResult<i64> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM ingredients", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Delete an ingredient. Its variants go with it.
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM ingredients WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}
