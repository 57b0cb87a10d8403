//! Recipe model
//!
//! A cocktail or prepared batch. Batch settings decide whether the recipe is
//! tracked as its own bottled ingredient.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};
use super::json_field::{from_column, to_column};

/// How a prepared recipe is batched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSettings {
    /// Track the bottled batch in inventory instead of its components
    #[serde(default)]
    pub track_as_bottled: bool,
    pub yield_amount: Option<f64>,
    pub yield_unit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: i64,
    pub name: String,
    pub batch_settings: Option<BatchSettings>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a new recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeCreate {
    pub name: String,
    pub batch_settings: Option<BatchSettings>,
    pub notes: Option<String>,
}

/// Data for updating a recipe
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeUpdate {
    pub name: Option<String>,
    pub batch_settings: Option<BatchSettings>,
    pub notes: Option<String>,
}

impl Recipe {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let id: i64 = row.get("id")?;
        Ok(Self {
            id,
            name: row.get("name")?,
            batch_settings: from_column(row.get("batch_settings")?, "recipes", "batch_settings", id),
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Whether this recipe is tracked as a bottled batch
    pub fn is_tracked_batch(&self) -> bool {
        self.batch_settings
            .as_ref()
            .map(|b| b.track_as_bottled)
            .unwrap_or(false)
    }

    pub fn create(conn: &Connection, data: &RecipeCreate) -> DbResult<Self> {
        let batch = match &data.batch_settings {
            Some(b) => Some(to_column(b)?),
            None => None,
        };
        conn.execute(
            "INSERT INTO recipes (name, batch_settings, notes) VALUES (?1, ?2, ?3)",
            params![data.name.trim(), batch, data.notes],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?
            .ok_or_else(|| DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM recipes WHERE id = ?1")?;
        match stmt.query_row([id], Self::from_row) {
            Ok(recipe) => Ok(Some(recipe)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List recipes, optionally filtered by name
    pub fn list(conn: &Connection, query: Option<&str>, limit: i64, offset: i64) -> DbResult<Vec<Self>> {
        let mut stmt;
        let recipes = match query {
            Some(q) => {
                stmt = conn.prepare(
                    "SELECT * FROM recipes WHERE name LIKE ?1 ORDER BY name ASC LIMIT ?2 OFFSET ?3"
                )?;
                stmt.query_map(params![format!("%{}%", q), limit, offset], Self::from_row)?
                    .collect::<Result<Vec<_>, _>>()?
            }
            None => {
                stmt = conn.prepare("SELECT * FROM recipes ORDER BY name ASC LIMIT ?1 OFFSET ?2")?;
                stmt.query_map(params![limit, offset], Self::from_row)?
                    .collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(recipes)
    }

    /// Recipes with any ingredient line naming `ingredient_name`
    pub fn ids_referencing_ingredient(conn: &Connection, ingredient_name: &str) -> DbResult<Vec<i64>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT DISTINCT recipe_id FROM recipe_ingredients
            WHERE TRIM(ingredient_name) = ?1 COLLATE NOCASE
            ORDER BY recipe_id
            "#
        )?;
        let ids = stmt
            .query_map([ingredient_name.trim()], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    pub fn update(conn: &Connection, id: i64, data: &RecipeUpdate) -> DbResult<Option<Self>> {
        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref name) = data.name {
            updates.push(format!("name = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(name.trim().to_string()));
        }
        if let Some(ref batch) = data.batch_settings {
            updates.push(format!("batch_settings = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(to_column(batch)?));
        }
        if let Some(ref notes) = data.notes {
            updates.push(format!("notes = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(notes.clone()));
        }

        if updates.is_empty() {
            return Self::get_by_id(conn, id);
        }

        updates.push("updated_at = datetime('now')".to_string());

        let sql = format!(
            "UPDATE recipes SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );
        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_id(conn, id)
    }

    /// Raw batch settings column for auditing: (id, name, batch_settings)
    pub fn raw_json_columns(conn: &Connection) -> DbResult<Vec<(i64, String, Option<String>)>> {
        let mut stmt = conn.prepare("SELECT id, name, batch_settings FROM recipes ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Delete a recipe; its ingredient lines cascade
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM recipes WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}
