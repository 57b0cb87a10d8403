//! Inventory Report model
//!
//! A named snapshot event grouping the counts taken together.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryReport {
    pub id: i64,
    pub account_id: i64,
    pub name: String,
    pub report_date: String,
    pub notes: Option<String>,
    pub created_at: String,
}

impl InventoryReport {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            account_id: row.get("account_id")?,
            name: row.get("name")?,
            report_date: row.get("report_date")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
        })
    }

    pub fn create(
        conn: &Connection,
        account_id: i64,
        name: &str,
        report_date: &str,
        notes: Option<&str>,
    ) -> DbResult<Self> {
        conn.execute(
            "INSERT INTO inventory_reports (account_id, name, report_date, notes) VALUES (?1, ?2, ?3, ?4)",
            params![account_id, name, report_date, notes],
        )?;
        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?
            .ok_or_else(|| DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM inventory_reports WHERE id = ?1")?;
        match stmt.query_row([id], Self::from_row) {
            Ok(report) => Ok(Some(report)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Reports for an account, newest first
    pub fn list_for_account(conn: &Connection, account_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM inventory_reports WHERE account_id = ?1 ORDER BY report_date DESC, id DESC"
        )?;
        let reports = stmt
            .query_map([account_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reports)
    }
}
