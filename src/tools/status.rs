//! Barkeep Status Tool
//!
//! Runtime status of the service and the inventory workflow guide.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;
use crate::models::AppSettings;

/// Inventory workflow instructions for AI assistants
pub const INVENTORY_INSTRUCTIONS: &str = r#"
# Barkeep Inventory Instructions

## Costing

Ingredients carry a purchase price, quantity and unit. The cost per unit is
derived on every save:

| Purchase unit | Stored cost |
|---------------|-------------|
| ml, cl, l, oz, fl oz, qt | per ounce (unit = "oz") |
| anything else (each, g, case, ...) | per purchase unit |

A price or quantity of 0 stores a cost of 0. Costs are rounded to 4 decimals.

Recipe lines are costed by converting the line amount to ounces
(oz, ml, cl, l, qt, dash, barspoon, tsp, tbsp, cup, g) when the ingredient is
costed per ounce, or by matching the line unit to the ingredient's unit.

## Variants

Each purchasable size is a product variant (`add_variant`). Sizes are in ml;
values under 10 are read as liters (1.75 means 1.75 L). Case pricing divides
the case price by bottles per case when `use_case_pricing` is set.

## Stocking Inventory

1. `load_inventory_candidates` with a `menu_id` or a list of `ingredient_ids`.
   - From a menu: bottled batch recipes contribute their batch ingredient;
     other recipes contribute only their alcoholic ingredients.
   - Ingredients whose variants are all tracked, or that have no variants,
     are left out.
   - `best_value` marks the cheapest per ounce when there is a choice.
   - `default_selection` lists variants picked automatically (single size).
2. Ask the user to choose a size for every candidate with `needs_choice`.
3. `confirm_inventory_selection` with the chosen variant IDs. Already tracked
   variants are skipped, never duplicated.

Use `mode: "order"` to build a purchase list instead; nothing is tracked.

## Counting

- `record_count` for a single item (date defaults to now; dates are stored
  in UTC). Current stock always follows the newest count, so backfilling
  an older count is safe.
- `create_inventory_report` for a full count taken together.
- `get_item_history` shows usage between counts: "-0.48" is depletion,
  "+1.00" is a restock. The oldest count has no usage.
- `compare_reports` shows per-item usage between two reports. Items missing
  from one report count as 0 there.

## Duplicates

`find_duplicate_ingredients` groups similar names around the earliest one.
Review the groups, then `merge_ingredients` with the ingredient to keep as
`primary_id`. Recipes, variants and aliases move to the primary.
"#;

/// Status response
#[derive(Debug, Clone, Serialize)]
pub struct BarkeepStatus {
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,
    pub database_path: String,
    pub database_size_bytes: Option<u64>,
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
    pub settings: AppSettings,
}

/// Tracks service runtime status
pub struct StatusTracker {
    start_time: Instant,
    database_path: PathBuf,
}

impl StatusTracker {
    pub fn new(database_path: PathBuf) -> Self {
        Self {
            start_time: Instant::now(),
            database_path,
        }
    }

    pub fn get_status(&self, settings: &AppSettings) -> BarkeepStatus {
        let build_info = BuildInfo::current();

        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());

        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        BarkeepStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
            settings: settings.clone(),
        }
    }
}
