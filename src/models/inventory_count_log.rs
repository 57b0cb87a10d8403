//! Inventory Count Log model
//!
//! Append-only snapshots of counted stock. There is no update
//! or delete; the schema rejects updates.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};
use crate::stock::CountReading;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryCountLog {
    pub id: i64,
    pub inventory_item_id: i64,
    pub counted_quantity: f64,
    pub count_date: String,
    pub counted_by: Option<String>,
    pub report_id: Option<i64>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryCountLogCreate {
    pub inventory_item_id: i64,
    pub counted_quantity: f64,
    pub count_date: String,
    pub counted_by: Option<String>,
    pub report_id: Option<i64>,
}

impl CountReading for InventoryCountLog {
    fn inventory_item_id(&self) -> i64 {
        self.inventory_item_id
    }

    fn counted_quantity(&self) -> f64 {
        self.counted_quantity
    }

    fn count_date(&self) -> &str {
        &self.count_date
    }
}

impl InventoryCountLog {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            inventory_item_id: row.get("inventory_item_id")?,
            counted_quantity: row.get("counted_quantity")?,
            count_date: row.get("count_date")?,
            counted_by: row.get("counted_by")?,
            report_id: row.get("report_id")?,
            created_at: row.get("created_at")?,
        })
    }

    pub fn create(conn: &Connection, data: &InventoryCountLogCreate) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO inventory_count_logs (inventory_item_id, counted_quantity, count_date, counted_by, report_id)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                data.inventory_item_id,
                data.counted_quantity,
                data.count_date,
                data.counted_by,
                data.report_id,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?
            .ok_or_else(|| DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM inventory_count_logs WHERE id = ?1")?;
        match stmt.query_row([id], Self::from_row) {
            Ok(log) => Ok(Some(log)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Logs for an item, newest count first
    pub fn list_for_item(conn: &Connection, inventory_item_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM inventory_count_logs
            WHERE inventory_item_id = ?1
            ORDER BY count_date DESC, id DESC
            "#
        )?;
        let logs = stmt
            .query_map([inventory_item_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(logs)
    }

    /// Newest count for an item; the last recorded wins on a tie
    pub fn latest_for_item(conn: &Connection, inventory_item_id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM inventory_count_logs
            WHERE inventory_item_id = ?1
            ORDER BY count_date DESC, id DESC
            LIMIT 1
            "#
        )?;
        match stmt.query_row([inventory_item_id], Self::from_row) {
            Ok(log) => Ok(Some(log)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_for_report(conn: &Connection, report_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM inventory_count_logs WHERE report_id = ?1 ORDER BY inventory_item_id ASC, id ASC"
        )?;
        let logs = stmt
            .query_map([report_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(logs)
    }
}
