//! Inventory usage between counts
//!
//! Usage is the older count minus the newer count: positive means stock went
//! down (depletion), negative means it went up (restock). The oldest count in
//! a history has nothing to compare against and has no usage at all.

use std::collections::BTreeMap;

use serde::Serialize;

/// Anything carrying a counted quantity for an inventory item at a date
pub trait CountReading {
    fn inventory_item_id(&self) -> i64;
    fn counted_quantity(&self) -> f64;
    /// ISO date or timestamp; compared lexicographically
    fn count_date(&self) -> &str;
}

/// Direction of a change between two counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageDirection {
    Depletion,
    Restock,
    Unchanged,
}

impl UsageDirection {
    pub fn of(usage: f64) -> Self {
        if usage > 0.0 {
            UsageDirection::Depletion
        } else if usage < 0.0 {
            UsageDirection::Restock
        } else {
            UsageDirection::Unchanged
        }
    }
}

/// Usage between an older and a newer count of the same item
pub fn usage<C: CountReading>(older: &C, newer: &C) -> f64 {
    older.counted_quantity() - newer.counted_quantity()
}

/// Display form: depletion as "-X", restock as "+X", two decimals
pub fn format_usage(usage: f64) -> String {
    let magnitude = usage.abs();
    match UsageDirection::of(usage) {
        UsageDirection::Depletion => format!("-{:.2}", magnitude),
        UsageDirection::Restock => format!("+{:.2}", magnitude),
        UsageDirection::Unchanged => format!("{:.2}", 0.0),
    }
}

/// One row of an item's count history
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry<C> {
    pub log: C,
    /// None for the oldest count
    pub usage: Option<f64>,
    pub direction: Option<UsageDirection>,
    pub display: Option<String>,
}

/// Sort counts newest first and attach usage against the next-older count
pub fn history_with_usage<C: CountReading + Clone>(mut logs: Vec<C>) -> Vec<HistoryEntry<C>> {
    // Stable sort keeps insertion order for counts on the same date
    logs.sort_by(|a, b| b.count_date().cmp(a.count_date()));

    let mut entries = Vec::with_capacity(logs.len());
    for i in 0..logs.len() {
        let used = logs.get(i + 1).map(|older| usage(older, &logs[i]));
        entries.push(HistoryEntry {
            log: logs[i].clone(),
            usage: used,
            direction: used.map(UsageDirection::of),
            display: used.map(format_usage),
        });
    }
    entries
}

/// Per-item comparison between two reports
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemUsage {
    pub inventory_item_id: i64,
    pub start: f64,
    pub end: f64,
    pub usage: f64,
    pub direction: UsageDirection,
    pub display: String,
}

/// Compare an older report's counts against a newer report's counts.
///
/// Every item present on either side is reported; a missing side counts as
/// zero. If an item was counted more than once in a report, the last count
/// wins.
pub fn reconcile_reports<C: CountReading>(older: &[C], newer: &[C]) -> Vec<ItemUsage> {
    let mut sides: BTreeMap<i64, (f64, f64)> = BTreeMap::new();

    for log in older {
        sides.entry(log.inventory_item_id()).or_insert((0.0, 0.0)).0 = log.counted_quantity();
    }
    for log in newer {
        sides.entry(log.inventory_item_id()).or_insert((0.0, 0.0)).1 = log.counted_quantity();
    }

    sides
        .into_iter()
        .map(|(inventory_item_id, (start, end))| {
            let used = start - end;
            ItemUsage {
                inventory_item_id,
                start,
                end,
                usage: used,
                direction: UsageDirection::of(used),
                display: format_usage(used),
            }
        })
        .collect()
}
