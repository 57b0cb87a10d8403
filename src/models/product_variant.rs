//! Product Variant model
//!
//! One purchasable package size of an ingredient (750ml, 1.75L, ...).

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::costing::{cost_per_ounce, unit_bottle_price};
use crate::db::{DbError, DbResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: i64,
    pub ingredient_id: i64,
    pub size_ml: f64,
    pub purchase_price: f64,
    pub case_price: Option<f64>,
    pub bottles_per_case: Option<i64>,
    pub sku_number: Option<String>,
    pub use_case_pricing: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a variant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductVariantCreate {
    pub ingredient_id: i64,
    pub size_ml: f64,
    #[serde(default)]
    pub purchase_price: f64,
    pub case_price: Option<f64>,
    pub bottles_per_case: Option<i64>,
    pub sku_number: Option<String>,
    #[serde(default)]
    pub use_case_pricing: bool,
}

/// Data for updating a variant
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductVariantUpdate {
    pub size_ml: Option<f64>,
    pub purchase_price: Option<f64>,
    pub case_price: Option<f64>,
    pub bottles_per_case: Option<i64>,
    pub sku_number: Option<String>,
    pub use_case_pricing: Option<bool>,
}

impl ProductVariant {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            ingredient_id: row.get("ingredient_id")?,
            size_ml: row.get("size_ml")?,
            purchase_price: row.get("purchase_price")?,
            case_price: row.get("case_price")?,
            bottles_per_case: row.get("bottles_per_case")?,
            sku_number: row.get("sku_number")?,
            use_case_pricing: row.get::<_, i32>("use_case_pricing")? != 0,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Effective price of one bottle, honoring case pricing
    pub fn bottle_price(&self) -> f64 {
        unit_bottle_price(
            self.purchase_price,
            self.case_price,
            self.bottles_per_case,
            self.use_case_pricing,
        )
    }

    /// Cost per ounce of this variant, if priced and sized
    pub fn cost_per_ounce(&self) -> Option<f64> {
        cost_per_ounce(self.bottle_price(), self.size_ml)
    }

    pub fn create(conn: &Connection, data: &ProductVariantCreate) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO product_variants (
                ingredient_id, size_ml, purchase_price, case_price,
                bottles_per_case, sku_number, use_case_pricing
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                data.ingredient_id,
                data.size_ml,
                data.purchase_price,
                data.case_price,
                data.bottles_per_case,
                data.sku_number.as_deref().map(str::trim),
                data.use_case_pricing as i32,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?
            .ok_or_else(|| DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM product_variants WHERE id = ?1")?;
        match stmt.query_row([id], Self::from_row) {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Look up a variant by its SKU
    pub fn get_by_sku(conn: &Connection, sku: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM product_variants WHERE sku_number = ?1")?;
        match stmt.query_row([sku.trim()], Self::from_row) {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All variants, grouped by ingredient then size
    pub fn list(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM product_variants ORDER BY ingredient_id ASC, size_ml ASC, id ASC"
        )?;
        let variants = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(variants)
    }

    pub fn list_for_ingredient(conn: &Connection, ingredient_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM product_variants WHERE ingredient_id = ?1 ORDER BY size_ml ASC, id ASC"
        )?;
        let variants = stmt
            .query_map([ingredient_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(variants)
    }

    pub fn update(conn: &Connection, id: i64, data: &ProductVariantUpdate) -> DbResult<Option<Self>> {
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

        add_update!(size_ml, "size_ml");
        add_update!(purchase_price, "purchase_price");
        add_update!(case_price, "case_price");
        add_update!(bottles_per_case, "bottles_per_case");
        add_update!(sku_number, "sku_number");

        if let Some(flag) = data.use_case_pricing {
            updates.push(format!("use_case_pricing = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(flag as i32));
        }

        if updates.is_empty() {
            return Self::get_by_id(conn, id);
        }

        updates.push("updated_at = datetime('now')".to_string());

        let sql = format!(
            "UPDATE product_variants SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );
        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_id(conn, id)
    }

    /// Move every variant of one ingredient onto another
    pub fn reassign_ingredient(conn: &Connection, from_ingredient: i64, to_ingredient: i64) -> DbResult<usize> {
        let rows = conn.execute(
            "UPDATE product_variants SET ingredient_id = ?1, updated_at = datetime('now') WHERE ingredient_id = ?2",
            params![to_ingredient, from_ingredient],
        )?;
        Ok(rows)
    }

    /// Move a single variant onto another ingredient
    pub fn set_ingredient(conn: &Connection, id: i64, ingredient_id: i64) -> DbResult<bool> {
        let rows = conn.execute(
            "UPDATE product_variants SET ingredient_id = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![ingredient_id, id],
        )?;
        Ok(rows > 0)
    }

    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM product_variants WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}
