//! Maintenance Tasks
//!
//! Cost recalculation and JSON column auditing, shared by the maintenance
//! binaries and the server.

use serde::Serialize;

use crate::db::Database;
use crate::models::json_field::validate_column;
use crate::models::{BatchSettings, Ingredient, PrepAction, Recipe};

/// One ingredient whose stored cost changed
#[derive(Debug, Serialize)]
pub struct CostChange {
    pub id: i64,
    pub name: String,
    pub old_cost: f64,
    pub new_cost: f64,
    pub old_unit: String,
    pub new_unit: String,
}

#[derive(Debug, Default, Serialize)]
pub struct RecalculateCostsResult {
    pub checked: usize,
    pub changed: Vec<CostChange>,
    pub errors: Vec<String>,
}

/// A stored JSON value that fails strict decoding
#[derive(Debug, Serialize)]
pub struct JsonFieldIssue {
    pub table: &'static str,
    pub column: &'static str,
    pub id: i64,
    pub name: String,
    pub raw: String,
    pub error: String,
}

/// Recompute every ingredient's normalized cost from its purchase fields
pub fn recalculate_costs(db: &Database) -> Result<RecalculateCostsResult, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let ingredients = Ingredient::list(&conn).map_err(|e| format!("Database error: {}", e))?;
    let mut result = RecalculateCostsResult::default();

    for before in ingredients {
        result.checked += 1;
        match Ingredient::refresh_cost(&conn, before.id) {
            Ok(Some(after)) => {
                if after.cost_per_unit != before.cost_per_unit || after.unit != before.unit {
                    result.changed.push(CostChange {
                        id: after.id,
                        name: after.name,
                        old_cost: before.cost_per_unit,
                        new_cost: after.cost_per_unit,
                        old_unit: before.unit,
                        new_unit: after.unit,
                    });
                }
            }
            Ok(None) => {}
            Err(e) => result.errors.push(format!("Ingredient {} ({}): {}", before.id, before.name, e)),
        }
    }

    tracing::info!(
        "Recalculated costs for {} ingredients: {} changed, {} errors",
        result.checked, result.changed.len(), result.errors.len()
    );
    Ok(result)
}

/// List stored JSON columns that do not decode into their types
pub fn audit_json_fields(db: &Database) -> Result<Vec<JsonFieldIssue>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let mut issues = Vec::new();

    for (id, name, aliases, prep_actions) in
        Ingredient::raw_json_columns(&conn).map_err(|e| format!("Database error: {}", e))?
    {
        if let Err(error) = validate_column::<Vec<String>>(&aliases) {
            issues.push(JsonFieldIssue {
                table: "ingredients",
                column: "aliases",
                id,
                name: name.clone(),
                raw: aliases,
                error,
            });
        }
        if let Err(error) = validate_column::<Vec<PrepAction>>(&prep_actions) {
            issues.push(JsonFieldIssue {
                table: "ingredients",
                column: "prep_actions",
                id,
                name,
                raw: prep_actions,
                error,
            });
        }
    }

    for (id, name, batch) in Recipe::raw_json_columns(&conn).map_err(|e| format!("Database error: {}", e))? {
        let Some(raw) = batch.filter(|b| !b.trim().is_empty()) else {
            continue;
        };
        if let Err(error) = validate_column::<BatchSettings>(&raw) {
            issues.push(JsonFieldIssue {
                table: "recipes",
                column: "batch_settings",
                id,
                name,
                raw,
                error,
            });
        }
    }

    Ok(issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IngredientCreate;
    use crate::tools::test_db;

    #[test]
    fn test_audit_finds_legacy_values() {
        let db = test_db();
        db.with_conn(|c| {
            Ingredient::create(c, &IngredientCreate::named("Clean"))?;
            c.execute_batch(
                r#"
                INSERT INTO ingredients (name, aliases) VALUES ('Legacy', '[orgeat, "almond syrup",]');
                INSERT INTO recipes (name, batch_settings) VALUES ('Old Batch', '{track_as_bottled: true}');
                "#,
            )?;
            Ok(())
        })
        .unwrap();

        let issues = audit_json_fields(&db).unwrap();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].column, "aliases");
        assert_eq!(issues[0].name, "Legacy");
        assert_eq!(issues[1].table, "recipes");

        // Reads still succeed with an empty value
        let legacy = db.with_conn(|c| Ingredient::get_by_name(c, "Legacy")).unwrap().unwrap();
        assert!(legacy.aliases.is_empty());
    }

    #[test]
    fn test_recalculate_fixes_stale_costs() {
        let db = test_db();
        db.with_conn(|c| {
            c.execute_batch(
                r#"
                INSERT INTO ingredients (name, purchase_price, purchase_quantity, purchase_unit, cost_per_unit, unit)
                VALUES ('Stale Rum', 20.0, 750.0, 'ml', 9.99, 'ml');
                "#,
            )?;
            Ok(())
        })
        .unwrap();

        let result = recalculate_costs(&db).unwrap();
        assert_eq!(result.checked, 1);
        assert_eq!(result.changed.len(), 1);
        assert_eq!(result.changed[0].new_unit, "oz");
        assert!((result.changed[0].new_cost - 0.7886).abs() < 1e-4);

        let again = recalculate_costs(&db).unwrap();
        assert!(again.changed.is_empty());
    }
}
