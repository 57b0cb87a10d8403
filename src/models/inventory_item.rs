//! Inventory Item model
//!
//! A product variant tracked by an account. At most one row exists per
//! (account, variant); the schema enforces it.

use std::collections::HashSet;

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: i64,
    pub account_id: i64,
    pub product_variant_id: i64,
    pub current_stock: f64,
    pub reorder_point: f64,
    pub unit: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItemCreate {
    pub account_id: i64,
    pub product_variant_id: i64,
    #[serde(default)]
    pub current_stock: f64,
    #[serde(default)]
    pub reorder_point: f64,
    pub unit: String,
}

/// Result of inserting a tracked variant
#[derive(Debug, Clone)]
pub enum TrackOutcome {
    Created(InventoryItem),
    /// The (account, variant) pair was already tracked
    AlreadyTracked,
}

/// Inventory item joined with its variant and ingredient, for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItemDetail {
    pub id: i64,
    pub product_variant_id: i64,
    pub ingredient_id: i64,
    pub ingredient_name: String,
    pub size_ml: f64,
    pub current_stock: f64,
    pub reorder_point: f64,
    pub unit: String,
    pub needs_reorder: bool,
}

impl InventoryItem {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            account_id: row.get("account_id")?,
            product_variant_id: row.get("product_variant_id")?,
            current_stock: row.get("current_stock")?,
            reorder_point: row.get("reorder_point")?,
            unit: row.get("unit")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Insert unless the account already tracks this variant
    pub fn create_if_untracked(conn: &Connection, data: &InventoryItemCreate) -> DbResult<TrackOutcome> {
        let inserted = conn.execute(
            r#"
            INSERT INTO inventory_items (account_id, product_variant_id, current_stock, reorder_point, unit)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(account_id, product_variant_id) DO NOTHING
            "#,
            params![
                data.account_id,
                data.product_variant_id,
                data.current_stock,
                data.reorder_point,
                data.unit,
            ],
        )?;

        if inserted == 0 {
            return Ok(TrackOutcome::AlreadyTracked);
        }

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?
            .map(TrackOutcome::Created)
            .ok_or_else(|| DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM inventory_items WHERE id = ?1")?;
        match stmt.query_row([id], Self::from_row) {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_for_account(conn: &Connection, account_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM inventory_items WHERE account_id = ?1 ORDER BY id ASC"
        )?;
        let items = stmt
            .query_map([account_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Inventory for an account with ingredient names, by ingredient then size
    pub fn list_details_for_account(conn: &Connection, account_id: i64) -> DbResult<Vec<InventoryItemDetail>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT ii.id, ii.product_variant_id, pv.ingredient_id, i.name AS ingredient_name,
                   pv.size_ml, ii.current_stock, ii.reorder_point, ii.unit
            FROM inventory_items ii
            INNER JOIN product_variants pv ON pv.id = ii.product_variant_id
            INNER JOIN ingredients i ON i.id = pv.ingredient_id
            WHERE ii.account_id = ?1
            ORDER BY i.name ASC, pv.size_ml ASC
            "#
        )?;
        let items = stmt
            .query_map([account_id], |row| {
                let current_stock: f64 = row.get("current_stock")?;
                let reorder_point: f64 = row.get("reorder_point")?;
                Ok(InventoryItemDetail {
                    id: row.get("id")?,
                    product_variant_id: row.get("product_variant_id")?,
                    ingredient_id: row.get("ingredient_id")?,
                    ingredient_name: row.get("ingredient_name")?,
                    size_ml: row.get("size_ml")?,
                    current_stock,
                    reorder_point,
                    unit: row.get("unit")?,
                    needs_reorder: reorder_point > 0.0 && current_stock <= reorder_point,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// IDs of the variants an account already tracks
    pub fn tracked_variant_ids(conn: &Connection, account_id: i64) -> DbResult<HashSet<i64>> {
        let mut stmt = conn.prepare(
            "SELECT product_variant_id FROM inventory_items WHERE account_id = ?1"
        )?;
        let ids = stmt
            .query_map([account_id], |row| row.get(0))?
            .collect::<Result<HashSet<i64>, _>>()?;
        Ok(ids)
    }

    /// Record the latest counted stock level
    pub fn set_current_stock(conn: &Connection, id: i64, stock: f64) -> DbResult<bool> {
        let rows = conn.execute(
            "UPDATE inventory_items SET current_stock = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![stock, id],
        )?;
        Ok(rows > 0)
    }

    pub fn set_reorder_point(conn: &Connection, id: i64, reorder_point: f64) -> DbResult<bool> {
        let rows = conn.execute(
            "UPDATE inventory_items SET reorder_point = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![reorder_point, id],
        )?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::models::{Account, Ingredient, IngredientCreate, ProductVariant, ProductVariantCreate};

    #[test]
    fn test_second_insert_is_already_tracked() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let account = Account::create(&conn, "Main Bar").unwrap();
        let gin = Ingredient::create(&conn, &IngredientCreate::named("Tanqueray")).unwrap();
        let variant = ProductVariant::create(&conn, &ProductVariantCreate {
            ingredient_id: gin.id,
            size_ml: 750.0,
            purchase_price: 24.0,
            case_price: None,
            bottles_per_case: None,
            sku_number: None,
            use_case_pricing: false,
        }).unwrap();

        let data = InventoryItemCreate {
            account_id: account.id,
            product_variant_id: variant.id,
            current_stock: 0.0,
            reorder_point: 0.0,
            unit: "bottle".to_string(),
        };
        assert!(matches!(
            InventoryItem::create_if_untracked(&conn, &data).unwrap(),
            TrackOutcome::Created(_)
        ));
        assert!(matches!(
            InventoryItem::create_if_untracked(&conn, &data).unwrap(),
            TrackOutcome::AlreadyTracked
        ));

        let tracked = InventoryItem::tracked_variant_ids(&conn, account.id).unwrap();
        assert_eq!(tracked.len(), 1);
        assert!(tracked.contains(&variant.id));
        assert_eq!(InventoryItem::list_details_for_account(&conn, account.id).unwrap()[0].ingredient_name, "Tanqueray");
    }
}
