//! Recipe Ingredient model
//!
//! A line in a recipe. Lines point at ingredients by name, so renames and
//! merges rewrite them.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub id: i64,
    pub recipe_id: i64,
    pub ingredient_name: String,
    pub amount: f64,
    pub unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeIngredientCreate {
    pub recipe_id: i64,
    pub ingredient_name: String,
    #[serde(default)]
    pub amount: f64,
    #[serde(default = "default_line_unit")]
    pub unit: String,
}

fn default_line_unit() -> String {
    "oz".to_string()
}

impl RecipeIngredient {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            recipe_id: row.get("recipe_id")?,
            ingredient_name: row.get("ingredient_name")?,
            amount: row.get("amount")?,
            unit: row.get("unit")?,
        })
    }

    pub fn create(conn: &Connection, data: &RecipeIngredientCreate) -> DbResult<Self> {
        conn.execute(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_name, amount, unit) VALUES (?1, ?2, ?3, ?4)",
            params![data.recipe_id, data.ingredient_name.trim(), data.amount, data.unit],
        )?;
        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?
            .ok_or_else(|| DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM recipe_ingredients WHERE id = ?1")?;
        match stmt.query_row([id], Self::from_row) {
            Ok(line) => Ok(Some(line)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_for_recipe(conn: &Connection, recipe_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM recipe_ingredients WHERE recipe_id = ?1 ORDER BY id"
        )?;
        let lines = stmt
            .query_map([recipe_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines)
    }

    /// Point a recipe's lines for `old_name` at `new_name`
    pub fn rename_in_recipe(conn: &Connection, recipe_id: i64, old_name: &str, new_name: &str) -> DbResult<usize> {
        let rows = conn.execute(
            r#"
            UPDATE recipe_ingredients
            SET ingredient_name = ?1, updated_at = datetime('now')
            WHERE recipe_id = ?2 AND TRIM(ingredient_name) = ?3 COLLATE NOCASE
            "#,
            params![new_name.trim(), recipe_id, old_name.trim()],
        )?;
        Ok(rows)
    }

    /// Number of lines referencing an ingredient name
    pub fn count_references(conn: &Connection, ingredient_name: &str) -> DbResult<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM recipe_ingredients WHERE TRIM(ingredient_name) = ?1 COLLATE NOCASE",
            [ingredient_name.trim()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM recipe_ingredients WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}
