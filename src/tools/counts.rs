//! Inventory Count MCP Tools
//!
//! Record counts, read an item's history with usage, take report snapshots
//! and compare two reports.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{Database, DbResult};
use crate::models::{InventoryCountLog, InventoryCountLogCreate, InventoryItem, InventoryReport};
use crate::stock::{history_with_usage, reconcile_reports, HistoryEntry, UsageDirection};

/// One count inside a report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportCount {
    pub inventory_item_id: i64,
    pub counted_quantity: f64,
}

/// Response for get_item_history
#[derive(Debug, Serialize)]
pub struct ItemHistoryResponse {
    pub inventory_item_id: i64,
    pub current_stock: f64,
    pub entries: Vec<HistoryEntry<InventoryCountLog>>,
}

/// Response for create_inventory_report
#[derive(Debug, Serialize)]
pub struct CreateReportResponse {
    pub report: InventoryReport,
    pub logged: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

/// One item in a report comparison
#[derive(Debug, Serialize)]
pub struct ReportComparisonLine {
    pub inventory_item_id: i64,
    pub ingredient_name: Option<String>,
    pub size_ml: Option<f64>,
    pub start: f64,
    pub end: f64,
    pub usage: f64,
    pub direction: UsageDirection,
    pub display: String,
}

/// Response for compare_reports
#[derive(Debug, Serialize)]
pub struct CompareReportsResponse {
    pub older: InventoryReport,
    pub newer: InventoryReport,
    pub items: Vec<ReportComparisonLine>,
    pub total_start: f64,
    pub total_end: f64,
    pub total_usage: f64,
    pub depleted_items: usize,
    pub restocked_items: usize,
}

/// Stored form of every count and report date
const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Accept `YYYY-MM-DD` or RFC 3339 and store it as UTC; default to now.
///
/// Dates are ordered as text, so they must all share one form.
fn resolve_count_date(raw: Option<&str>) -> Result<String, String> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(date) => {
            if let Ok(day) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
                return Ok(day.and_time(NaiveTime::MIN).and_utc().format(DATE_FORMAT).to_string());
            }
            DateTime::parse_from_rfc3339(date)
                .map(|dt| dt.with_timezone(&Utc).format(DATE_FORMAT).to_string())
                .map_err(|_| format!("Invalid date '{}': expected YYYY-MM-DD or RFC 3339", date))
        }
        None => Ok(Utc::now().format(DATE_FORMAT).to_string()),
    }
}

/// Set an item's stock from its newest count, so a backfilled count
/// never replaces a later one
fn sync_current_stock(conn: &rusqlite::Connection, inventory_item_id: i64) -> DbResult<()> {
    if let Some(latest) = InventoryCountLog::latest_for_item(conn, inventory_item_id)? {
        InventoryItem::set_current_stock(conn, inventory_item_id, latest.counted_quantity)?;
    }
    Ok(())
}

fn check_quantity(quantity: f64) -> Result<(), String> {
    if !quantity.is_finite() || quantity < 0.0 {
        return Err("counted_quantity must be a non-negative number".to_string());
    }
    Ok(())
}

/// Append a count and refresh the item's current stock
pub fn record_count(
    db: &Database,
    inventory_item_id: i64,
    counted_quantity: f64,
    count_date: Option<&str>,
    counted_by: Option<String>,
) -> Result<InventoryCountLog, String> {
    check_quantity(counted_quantity)?;
    let count_date = resolve_count_date(count_date)?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    if InventoryItem::get_by_id(&conn, inventory_item_id)
        .map_err(|e| format!("Database error: {}", e))?
        .is_none()
    {
        return Err(format!("Inventory item {} not found", inventory_item_id));
    }

    let log = InventoryCountLog::create(&conn, &InventoryCountLogCreate {
        inventory_item_id,
        counted_quantity,
        count_date,
        counted_by,
        report_id: None,
    })
    .map_err(|e| format!("Failed to record count: {}", e))?;

    sync_current_stock(&conn, inventory_item_id).map_err(|e| format!("Database error: {}", e))?;

    tracing::debug!("Recorded count {} for item {}", counted_quantity, inventory_item_id);
    Ok(log)
}

/// An item's counts, newest first, with usage against the previous count
pub fn get_item_history(db: &Database, inventory_item_id: i64) -> Result<Option<ItemHistoryResponse>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let item = match InventoryItem::get_by_id(&conn, inventory_item_id).map_err(|e| format!("Database error: {}", e))? {
        Some(i) => i,
        None => return Ok(None),
    };
    let logs = InventoryCountLog::list_for_item(&conn, inventory_item_id)
        .map_err(|e| format!("Database error: {}", e))?;

    Ok(Some(ItemHistoryResponse {
        inventory_item_id,
        current_stock: item.current_stock,
        entries: history_with_usage(logs),
    }))
}

/// Record a set of counts taken together.
///
/// Every count is tagged with the new report. Counts for unknown items or
/// items of another account are reported as errors; the rest are kept.
pub fn create_inventory_report(
    db: &Database,
    account_id: i64,
    name: &str,
    report_date: Option<&str>,
    notes: Option<&str>,
    counted_by: Option<String>,
    counts: &[ReportCount],
) -> Result<CreateReportResponse, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Report name cannot be empty".to_string());
    }
    let report_date = resolve_count_date(report_date)?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let items: HashMap<i64, InventoryItem> = InventoryItem::list_for_account(&conn, account_id)
        .map_err(|e| format!("Database error: {}", e))?
        .into_iter()
        .map(|i| (i.id, i))
        .collect();

    let report = InventoryReport::create(&conn, account_id, name, &report_date, notes)
        .map_err(|e| format!("Failed to create report: {}", e))?;

    let mut logged = 0;
    let mut errors = Vec::new();
    for count in counts {
        let result = check_quantity(count.counted_quantity).and_then(|_| {
            if !items.contains_key(&count.inventory_item_id) {
                return Err(format!("Inventory item {} not found for account {}", count.inventory_item_id, account_id));
            }
            InventoryCountLog::create(&conn, &InventoryCountLogCreate {
                inventory_item_id: count.inventory_item_id,
                counted_quantity: count.counted_quantity,
                count_date: report_date.clone(),
                counted_by: counted_by.clone(),
                report_id: Some(report.id),
            })
            .and_then(|_| sync_current_stock(&conn, count.inventory_item_id))
            .map_err(|e| format!("Item {}: {}", count.inventory_item_id, e))
        });

        match result {
            Ok(_) => logged += 1,
            Err(e) => {
                tracing::warn!("Report '{}': {}", report.name, e);
                errors.push(e);
            }
        }
    }

    tracing::info!("Report {} '{}': {} counts logged, {} failed", report.id, report.name, logged, errors.len());
    Ok(CreateReportResponse {
        report,
        logged,
        failed: errors.len(),
        errors,
    })
}

pub fn list_reports(db: &Database, account_id: i64) -> Result<Vec<InventoryReport>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    InventoryReport::list_for_account(&conn, account_id).map_err(|e| format!("Database error: {}", e))
}

/// Per-item usage between two reports of the same account
pub fn compare_reports(db: &Database, older_id: i64, newer_id: i64) -> Result<CompareReportsResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let fetch = |id: i64| -> Result<InventoryReport, String> {
        InventoryReport::get_by_id(&conn, id)
            .map_err(|e| format!("Database error: {}", e))?
            .ok_or_else(|| format!("Report {} not found", id))
    };
    let mut older = fetch(older_id)?;
    let mut newer = fetch(newer_id)?;
    if older.account_id != newer.account_id {
        return Err("Reports belong to different accounts".to_string());
    }
    if older.report_date > newer.report_date {
        tracing::debug!("Reports {} and {} given newest first; swapping", older_id, newer_id);
        std::mem::swap(&mut older, &mut newer);
    }

    let older_logs = InventoryCountLog::list_for_report(&conn, older.id).map_err(|e| format!("Database error: {}", e))?;
    let newer_logs = InventoryCountLog::list_for_report(&conn, newer.id).map_err(|e| format!("Database error: {}", e))?;

    let details: HashMap<i64, (String, f64)> = InventoryItem::list_details_for_account(&conn, older.account_id)
        .map_err(|e| format!("Database error: {}", e))?
        .into_iter()
        .map(|d| (d.id, (d.ingredient_name, d.size_ml)))
        .collect();

    let items: Vec<ReportComparisonLine> = reconcile_reports(&older_logs, &newer_logs)
        .into_iter()
        .map(|u| {
            let detail = details.get(&u.inventory_item_id);
            ReportComparisonLine {
                inventory_item_id: u.inventory_item_id,
                ingredient_name: detail.map(|d| d.0.clone()),
                size_ml: detail.map(|d| d.1),
                start: u.start,
                end: u.end,
                usage: u.usage,
                direction: u.direction,
                display: u.display,
            }
        })
        .collect();

    Ok(CompareReportsResponse {
        total_start: items.iter().map(|i| i.start).sum(),
        total_end: items.iter().map(|i| i.end).sum(),
        total_usage: items.iter().map(|i| i.usage).sum(),
        depleted_items: items.iter().filter(|i| i.direction == UsageDirection::Depletion).count(),
        restocked_items: items.iter().filter(|i| i.direction == UsageDirection::Restock).count(),
        older,
        newer,
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Account, Ingredient, IngredientCreate, InventoryItemCreate, ProductVariant,
        ProductVariantCreate, TrackOutcome,
    };
    use crate::tools::test_db;

    fn tracked_item(db: &Database, account_id: i64, name: &str) -> i64 {
        db.with_conn(|c| {
            let ing = Ingredient::create(c, &IngredientCreate::named(name))?;
            let v = ProductVariant::create(c, &ProductVariantCreate {
                ingredient_id: ing.id,
                size_ml: 750.0,
                purchase_price: 20.0,
                case_price: None,
                bottles_per_case: None,
                sku_number: None,
                use_case_pricing: false,
            })?;
            match InventoryItem::create_if_untracked(c, &InventoryItemCreate {
                account_id,
                product_variant_id: v.id,
                current_stock: 0.0,
                reorder_point: 0.0,
                unit: "bottle".into(),
            })? {
                TrackOutcome::Created(item) => Ok(item.id),
                TrackOutcome::AlreadyTracked => unreachable!(),
            }
        })
        .unwrap()
    }

    fn account(db: &Database) -> i64 {
        db.with_conn(|c| Account::create(c, "Main Bar")).unwrap().id
    }

    #[test]
    fn test_record_count_validates_and_updates_stock() {
        let db = test_db();
        let item = tracked_item(&db, account(&db), "Rye");

        assert!(record_count(&db, item, -1.0, None, None).is_err());
        assert!(record_count(&db, item, f64::NAN, None, None).is_err());
        assert!(record_count(&db, item, 1.0, Some("March 1st"), None).is_err());
        assert!(record_count(&db, 999, 1.0, None, None).is_err());

        let log = record_count(&db, item, 4.5, Some("2026-03-01"), Some("sam".into())).unwrap();
        assert_eq!(log.count_date, "2026-03-01T00:00:00Z");
        let defaulted = record_count(&db, item, 4.0, None, None).unwrap();
        assert!(defaulted.count_date.ends_with('Z'));

        let history = get_item_history(&db, item).unwrap().unwrap();
        assert_eq!(history.current_stock, 4.0);
    }

    #[test]
    fn test_history_usage_display() {
        let db = test_db();
        let item = tracked_item(&db, account(&db), "Rye");
        record_count(&db, item, 12.6, Some("2026-03-01"), None).unwrap();
        record_count(&db, item, 12.12, Some("2026-03-08"), None).unwrap();
        record_count(&db, item, 13.12, Some("2026-03-15"), None).unwrap();

        let history = get_item_history(&db, item).unwrap().unwrap();
        let displays: Vec<Option<&str>> = history.entries.iter().map(|e| e.display.as_deref()).collect();
        assert_eq!(displays, vec![Some("+1.00"), Some("-0.48"), None]);
        assert!(get_item_history(&db, 999).unwrap().is_none());
    }

    #[test]
    fn test_compare_reports_with_missing_items() {
        let db = test_db();
        let acct = account(&db);
        let rye = tracked_item(&db, acct, "Rye");
        let gin = tracked_item(&db, acct, "Gin");
        let rum = tracked_item(&db, acct, "Rum");

        let first = create_inventory_report(&db, acct, "Week 1", Some("2026-03-01"), None, None, &[
            ReportCount { inventory_item_id: rye, counted_quantity: 10.0 },
            ReportCount { inventory_item_id: gin, counted_quantity: 3.0 },
            ReportCount { inventory_item_id: 999, counted_quantity: 1.0 },
        ])
        .unwrap();
        assert_eq!(first.logged, 2);
        assert_eq!(first.failed, 1);

        let second = create_inventory_report(&db, acct, "Week 2", Some("2026-03-08"), None, None, &[
            ReportCount { inventory_item_id: rye, counted_quantity: 6.0 },
            ReportCount { inventory_item_id: rum, counted_quantity: 2.0 },
        ])
        .unwrap();

        // Argument order does not matter; dates decide
        let cmp = compare_reports(&db, second.report.id, first.report.id).unwrap();
        assert_eq!(cmp.older.id, first.report.id);
        assert_eq!(cmp.items.len(), 3);
        assert_eq!(cmp.total_start, 13.0);
        assert_eq!(cmp.total_end, 8.0);
        assert_eq!(cmp.total_usage, 5.0);
        assert_eq!(cmp.depleted_items, 2);
        assert_eq!(cmp.restocked_items, 1);
        assert_eq!(cmp.items[0].ingredient_name.as_deref(), Some("Rye"));
        assert_eq!(cmp.items[0].display, "-4.00");
    }

    #[test]
    fn test_dates_stored_as_utc() {
        assert_eq!(resolve_count_date(Some("2026-03-08T23:00:00-05:00")).unwrap(), "2026-03-09T04:00:00Z");
        assert_eq!(resolve_count_date(Some(" 2026-03-09 ")).unwrap(), "2026-03-09T00:00:00Z");
        assert_eq!(resolve_count_date(Some("2026-03-09T02:00:00Z")).unwrap(), "2026-03-09T02:00:00Z");
    }

    #[test]
    fn test_history_orders_mixed_offsets_by_instant() {
        let db = test_db();
        let item = tracked_item(&db, account(&db), "Rye");
        // 04:00Z on the 9th, recorded first but counted last
        record_count(&db, item, 5.0, Some("2026-03-08T23:00:00-05:00"), None).unwrap();
        record_count(&db, item, 8.0, Some("2026-03-09T02:00:00Z"), None).unwrap();

        let history = get_item_history(&db, item).unwrap().unwrap();
        assert_eq!(history.entries[0].log.counted_quantity, 5.0);
        assert_eq!(history.entries[0].display.as_deref(), Some("-3.00"));
        assert_eq!(history.current_stock, 5.0);
    }

    #[test]
    fn test_backfilled_count_keeps_current_stock() {
        let db = test_db();
        let acct = account(&db);
        let item = tracked_item(&db, acct, "Rye");
        record_count(&db, item, 5.0, Some("2026-03-15"), None).unwrap();
        record_count(&db, item, 10.0, Some("2026-03-01"), None).unwrap();

        let history = get_item_history(&db, item).unwrap().unwrap();
        assert_eq!(history.current_stock, 5.0);
        assert_eq!(history.entries[0].log.counted_quantity, 5.0);

        create_inventory_report(&db, acct, "Late entry", Some("2026-02-20"), None, None, &[
            ReportCount { inventory_item_id: item, counted_quantity: 12.0 },
        ])
        .unwrap();
        assert_eq!(get_item_history(&db, item).unwrap().unwrap().current_stock, 5.0);
    }

    #[test]
    fn test_compare_reports_orders_offsets_by_instant() {
        let db = test_db();
        let acct = account(&db);
        let rye = tracked_item(&db, acct, "Rye");
        let later = create_inventory_report(&db, acct, "Close", Some("2026-03-08T23:00:00-05:00"), None, None, &[
            ReportCount { inventory_item_id: rye, counted_quantity: 5.0 },
        ])
        .unwrap();
        let earlier = create_inventory_report(&db, acct, "Open", Some("2026-03-09T02:00:00Z"), None, None, &[
            ReportCount { inventory_item_id: rye, counted_quantity: 8.0 },
        ])
        .unwrap();

        let cmp = compare_reports(&db, later.report.id, earlier.report.id).unwrap();
        assert_eq!(cmp.older.id, earlier.report.id);
        assert_eq!(cmp.items[0].display, "-3.00");
    }
}
