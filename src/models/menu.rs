//! Menu model
//!
//! An account's list of recipes, the usual source for stocking inventory.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};
use super::Recipe;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Menu {
    pub id: i64,
    pub account_id: i64,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Menu {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            account_id: row.get("account_id")?,
            name: row.get("name")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn create(conn: &Connection, account_id: i64, name: &str) -> DbResult<Self> {
        conn.execute(
            "INSERT INTO menus (account_id, name) VALUES (?1, ?2)",
            params![account_id, name.trim()],
        )?;
        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?
            .ok_or_else(|| DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM menus WHERE id = ?1")?;
        match stmt.query_row([id], Self::from_row) {
            Ok(menu) => Ok(Some(menu)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_for_account(conn: &Connection, account_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM menus WHERE account_id = ?1 ORDER BY name ASC")?;
        let menus = stmt
            .query_map([account_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(menus)
    }

    /// Add a recipe at the end of the menu; re-adding is a no-op
    pub fn add_recipe(conn: &Connection, menu_id: i64, recipe_id: i64) -> DbResult<bool> {
        let rows = conn.execute(
            r#"
            INSERT INTO menu_recipes (menu_id, recipe_id, position)
            VALUES (?1, ?2, (SELECT COALESCE(MAX(position), 0) + 1 FROM menu_recipes WHERE menu_id = ?1))
            ON CONFLICT(menu_id, recipe_id) DO NOTHING
            "#,
            params![menu_id, recipe_id],
        )?;
        Ok(rows > 0)
    }

    /// Recipes on a menu in menu order
    pub fn recipes(conn: &Connection, menu_id: i64) -> DbResult<Vec<Recipe>> {
        let mut stmt = conn.prepare(
            "SELECT recipe_id FROM menu_recipes WHERE menu_id = ?1 ORDER BY position ASC"
        )?;
        let ids = stmt
            .query_map([menu_id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;

        let mut recipes = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(recipe) = Recipe::get_by_id(conn, id)? {
                recipes.push(recipe);
            }
        }
        Ok(recipes)
    }
}
