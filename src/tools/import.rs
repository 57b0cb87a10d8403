//! Bulk Ingredient Import
//!
//! Catalog rows keyed by SKU. A dry run classifies every row against what is
//! stored; a live run upserts the ingredient by name and the variant by SKU.

use rmcp::schemars;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::{Database, DbError, DbResult};
use crate::models::{
    Ingredient, IngredientCreate, IngredientUpdate, ProductVariant, ProductVariantCreate,
    ProductVariantUpdate,
};

/// Numbers closer than this are the same
const PRICE_TOLERANCE: f64 = 0.01;

/// One catalog row
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ImportRow {
    pub name: String,
    pub sku_number: Option<String>,
    pub size_ml: Option<f64>,
    pub purchase_price: Option<f64>,
    pub case_price: Option<f64>,
    pub bottles_per_case: Option<i64>,
    pub supplier: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub tier: Option<String>,
    pub exclusive: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ImportStatus {
    New,
    Update,
    Same,
    Invalid,
}

/// Dry-run classification of one row
#[derive(Debug, Serialize)]
pub struct ImportPreviewRow {
    pub row: usize,
    pub name: String,
    pub sku_number: Option<String>,
    pub status: ImportStatus,
    pub changed_fields: Vec<String>,
    pub error: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct ImportPreview {
    pub rows: Vec<ImportPreviewRow>,
    pub new: usize,
    pub update: usize,
    pub same: usize,
    pub invalid: usize,
}

#[derive(Debug, Default, Serialize)]
pub struct ImportResult {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub errors: Vec<String>,
}

fn numbers_differ(incoming: Option<f64>, stored: Option<f64>) -> bool {
    match (incoming, stored) {
        (None, _) => false,
        (Some(a), Some(b)) => (a - b).abs() > PRICE_TOLERANCE,
        (Some(_), None) => true,
    }
}

fn strings_differ(incoming: &Option<String>, stored: &Option<String>) -> bool {
    match incoming {
        None => false,
        Some(a) => Some(a.trim()) != stored.as_deref().map(str::trim),
    }
}

fn trimmed_sku(row: &ImportRow) -> Option<&str> {
    row.sku_number.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn check_row(row: &ImportRow) -> Result<&str, String> {
    if row.name.trim().is_empty() {
        return Err("name is required".to_string());
    }
    let sku = trimmed_sku(row).ok_or_else(|| "sku_number is required".to_string())?;
    if row.size_ml.map_or(false, |v| !v.is_finite() || v <= 0.0) {
        return Err("size_ml must be greater than 0".to_string());
    }
    for (field, value) in [
        ("purchase_price", row.purchase_price),
        ("case_price", row.case_price),
    ] {
        if value.map_or(false, |v| !v.is_finite() || v < 0.0) {
            return Err(format!("{} must be a non-negative number", field));
        }
    }
    Ok(sku)
}

/// Ingredient fields the row would change. The name is the lookup key and
/// matches case-insensitively, so it is never a change.
fn ingredient_changes(row: &ImportRow, ingredient: &Ingredient) -> Vec<&'static str> {
    let mut changed = Vec::new();
    if strings_differ(&row.supplier, &ingredient.supplier) {
        changed.push("supplier");
    }
    if strings_differ(&row.category, &ingredient.category) {
        changed.push("category");
    }
    if strings_differ(&row.image_url, &ingredient.image_url) {
        changed.push("image_url");
    }
    if strings_differ(&row.tier, &ingredient.tier) {
        changed.push("tier");
    }
    if row.exclusive.map_or(false, |e| e != ingredient.exclusive) {
        changed.push("exclusive");
    }
    changed
}

/// Fields on the stored variant the row would change
fn variant_changes(row: &ImportRow, variant: &ProductVariant) -> Vec<&'static str> {
    let mut changed = Vec::new();
    if numbers_differ(row.size_ml, Some(variant.size_ml)) {
        changed.push("size_ml");
    }
    if numbers_differ(row.purchase_price, Some(variant.purchase_price)) {
        changed.push("purchase_price");
    }
    if numbers_differ(row.case_price, variant.case_price) {
        changed.push("case_price");
    }
    if row.bottles_per_case.map_or(false, |b| Some(b) != variant.bottles_per_case) {
        changed.push("bottles_per_case");
    }
    changed
}

/// What importing one valid row would do; shared by the dry run and the
/// live run so both classify rows the same way
struct RowPlan {
    /// Ingredient matched by name; None means one is created
    ingredient: Option<Ingredient>,
    ingredient_changes: Vec<&'static str>,
    /// Variant matched by SKU; None means one is created
    variant: Option<ProductVariant>,
    variant_changes: Vec<&'static str>,
}

impl RowPlan {
    fn load(conn: &Connection, row: &ImportRow, sku: &str) -> DbResult<Self> {
        let ingredient = Ingredient::get_by_name(conn, row.name.trim())?;
        let variant = ProductVariant::get_by_sku(conn, sku)?;

        let ingredient_changes = ingredient
            .as_ref()
            .map(|i| ingredient_changes(row, i))
            .unwrap_or_default();

        let mut variant_changes = Vec::new();
        if let Some(ref v) = variant {
            if ingredient.as_ref().map(|i| i.id) != Some(v.ingredient_id) {
                variant_changes.push("ingredient");
            }
            variant_changes.extend(self::variant_changes(row, v));
        }

        Ok(Self {
            ingredient,
            ingredient_changes,
            variant,
            variant_changes,
        })
    }

    /// A row that creates its variant needs a usable bottle size
    fn check(&self, row: &ImportRow) -> Result<(), String> {
        if self.variant.is_none() && row.size_ml.is_none() {
            return Err("size_ml is required for a new SKU".to_string());
        }
        Ok(())
    }

    fn status(&self) -> ImportStatus {
        if self.variant.is_none() {
            ImportStatus::New
        } else if self.ingredient_changes.is_empty() && self.variant_changes.is_empty() {
            ImportStatus::Same
        } else {
            ImportStatus::Update
        }
    }

    fn changed_fields(&self) -> Vec<String> {
        if self.variant.is_none() {
            return Vec::new();
        }
        self.ingredient_changes
            .iter()
            .chain(self.variant_changes.iter())
            .map(|f| f.to_string())
            .collect()
    }
}

fn preview_row(conn: &Connection, index: usize, row: &ImportRow) -> DbResult<ImportPreviewRow> {
    let mut preview = ImportPreviewRow {
        row: index + 1,
        name: row.name.trim().to_string(),
        sku_number: trimmed_sku(row).map(str::to_string),
        status: ImportStatus::Invalid,
        changed_fields: Vec::new(),
        error: None,
    };

    let sku = match check_row(row) {
        Ok(sku) => sku,
        Err(e) => {
            preview.error = Some(e);
            return Ok(preview);
        }
    };

    let plan = RowPlan::load(conn, row, sku)?;
    if let Err(e) = plan.check(row) {
        preview.error = Some(e);
        return Ok(preview);
    }
    preview.status = plan.status();
    preview.changed_fields = plan.changed_fields();
    Ok(preview)
}

/// Classify rows without writing anything
pub fn preview_import(db: &Database, rows: &[ImportRow]) -> Result<ImportPreview, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let mut result = ImportPreview::default();

    for (index, row) in rows.iter().enumerate() {
        let preview = preview_row(&conn, index, row).map_err(|e| format!("Database error: {}", e))?;
        match preview.status {
            ImportStatus::New => result.new += 1,
            ImportStatus::Update => result.update += 1,
            ImportStatus::Same => result.same += 1,
            ImportStatus::Invalid => result.invalid += 1,
        }
        result.rows.push(preview);
    }

    Ok(result)
}

enum RowOutcome {
    Created,
    Updated,
    Unchanged,
}

fn upsert_row(conn: &Connection, row: &ImportRow, sku: &str) -> DbResult<RowOutcome> {
    let plan = RowPlan::load(conn, row, sku)?;
    plan.check(row).map_err(DbError::Validation)?;
    let status = plan.status();

    let ingredient = match plan.ingredient {
        // Matched case-insensitively; the stored spelling is kept
        Some(existing) if plan.ingredient_changes.is_empty() => existing,
        Some(existing) => {
            let update = IngredientUpdate {
                supplier: row.supplier.clone(),
                category: row.category.clone(),
                image_url: row.image_url.clone(),
                tier: row.tier.clone(),
                exclusive: row.exclusive,
                ..Default::default()
            };
            Ingredient::update(conn, existing.id, &update)?.unwrap_or(existing)
        }
        None => {
            let mut data = IngredientCreate::named(row.name.trim());
            data.supplier = row.supplier.clone();
            data.category = row.category.clone();
            data.image_url = row.image_url.clone();
            data.tier = row.tier.clone();
            data.exclusive = row.exclusive.unwrap_or(false);
            Ingredient::create(conn, &data)?
        }
    };

    match plan.variant {
        Some(variant) => {
            if variant.ingredient_id != ingredient.id {
                tracing::info!(
                    "SKU {} moves from ingredient {} to {} '{}'",
                    sku, variant.ingredient_id, ingredient.id, ingredient.name
                );
                ProductVariant::set_ingredient(conn, variant.id, ingredient.id)?;
            }
            if !variant_changes(row, &variant).is_empty() {
                let update = ProductVariantUpdate {
                    size_ml: row.size_ml,
                    purchase_price: row.purchase_price,
                    case_price: row.case_price,
                    bottles_per_case: row.bottles_per_case,
                    ..Default::default()
                };
                ProductVariant::update(conn, variant.id, &update)?;
            }
        }
        None => {
            ProductVariant::create(conn, &ProductVariantCreate {
                ingredient_id: ingredient.id,
                size_ml: row.size_ml.unwrap_or_default(),
                purchase_price: row.purchase_price.unwrap_or(0.0),
                case_price: row.case_price,
                bottles_per_case: row.bottles_per_case,
                sku_number: Some(sku.to_string()),
                use_case_pricing: false,
            })?;
        }
    }

    Ok(match status {
        ImportStatus::New => RowOutcome::Created,
        ImportStatus::Update => RowOutcome::Updated,
        _ => RowOutcome::Unchanged,
    })
}

/// Upsert every row; failed rows are reported and skipped
pub fn run_import(db: &Database, rows: &[ImportRow]) -> Result<ImportResult, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let mut result = ImportResult::default();

    for (index, row) in rows.iter().enumerate() {
        let outcome = check_row(row)
            .and_then(|sku| upsert_row(&conn, row, sku).map_err(|e| e.to_string()))
            .map_err(|e| format!("Row {} ({}): {}", index + 1, row.name.trim(), e));

        match outcome {
            Ok(RowOutcome::Created) => result.created += 1,
            Ok(RowOutcome::Updated) => result.updated += 1,
            Ok(RowOutcome::Unchanged) => result.unchanged += 1,
            Err(e) => {
                tracing::warn!("Import {}", e);
                result.errors.push(e);
            }
        }
    }

    tracing::info!(
        "Import finished: {} created, {} updated, {} unchanged, {} errors",
        result.created, result.updated, result.unchanged, result.errors.len()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_db;

    fn row(name: &str, sku: &str, price: f64) -> ImportRow {
        ImportRow {
            name: name.to_string(),
            sku_number: Some(sku.to_string()),
            size_ml: Some(750.0),
            purchase_price: Some(price),
            supplier: Some("Southern".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_preview_classifies_rows() {
        let db = test_db();
        run_import(&db, &[row("Tito's Vodka", "TITO-750", 19.99)]).unwrap();

        let rows = vec![
            row("Tito's Vodka", "TITO-750", 19.995), // within tolerance
            row("Tito's Vodka", "TITO-750", 21.50),
            row("Ketel One", "KETEL-750", 24.0),
            row("", "X", 1.0),
            ImportRow { name: "No Sku".into(), ..Default::default() },
        ];
        let preview = preview_import(&db, &rows).unwrap();
        let statuses: Vec<ImportStatus> = preview.rows.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![ImportStatus::Same, ImportStatus::Update, ImportStatus::New, ImportStatus::Invalid, ImportStatus::Invalid]
        );
        assert_eq!(preview.rows[1].changed_fields, vec!["purchase_price".to_string()]);
        assert_eq!(preview.same, 1);
        assert_eq!(preview.invalid, 2);
    }

    #[test]
    fn test_absent_fields_are_not_compared() {
        let db = test_db();
        let mut full = row("Campari", "CAMP-1L", 30.0);
        full.case_price = Some(330.0);
        full.tier = Some("well".into());
        run_import(&db, &[full]).unwrap();

        let sparse = ImportRow {
            name: "Campari".into(),
            sku_number: Some("CAMP-1L".into()),
            ..Default::default()
        };
        let preview = preview_import(&db, &[sparse]).unwrap();
        assert_eq!(preview.rows[0].status, ImportStatus::Same);
    }

    #[test]
    fn test_live_run_counts() {
        let db = test_db();
        let first = run_import(&db, &[
            row("Tito's Vodka", "TITO-750", 19.99),
            row("Tito's Vodka", "TITO-1L", 25.99),
            row("", "BAD", 1.0),
        ])
        .unwrap();
        assert_eq!(first.created, 2);
        assert_eq!(first.errors.len(), 1);

        let second = run_import(&db, &[
            row("tito's vodka", "TITO-750", 19.99),
            row("Tito's Vodka", "TITO-1L", 27.00),
        ])
        .unwrap();
        assert_eq!(second.unchanged, 1);
        assert_eq!(second.updated, 1);
        assert_eq!(second.created, 0);

        let stored = db.with_conn(|c| ProductVariant::get_by_sku(c, "TITO-1L")).unwrap().unwrap();
        assert_eq!(stored.purchase_price, 27.0);
        let ingredients = db.with_conn(|c| Ingredient::list(c)).unwrap();
        assert_eq!(ingredients.len(), 1);
    }

    fn live_status(result: &ImportResult) -> ImportStatus {
        match (result.created, result.updated, result.unchanged) {
            (1, 0, 0) => ImportStatus::New,
            (0, 1, 0) => ImportStatus::Update,
            (0, 0, 1) => ImportStatus::Same,
            _ => ImportStatus::Invalid,
        }
    }

    #[test]
    fn test_preview_matches_live_outcome() {
        let db = test_db();
        run_import(&db, &[row("Tito's Vodka", "TITO-750", 19.99)]).unwrap();

        // Name differing only in case, and an existing SKU under a new name
        let cases = [
            (row("tito's vodka", "TITO-750", 19.99), ImportStatus::Same),
            (row("Ketel One", "TITO-750", 19.99), ImportStatus::Update),
        ];
        for (input, expected) in cases {
            let preview = preview_import(&db, std::slice::from_ref(&input)).unwrap();
            assert_eq!(preview.rows[0].status, expected, "{}", input.name);
            let live = run_import(&db, std::slice::from_ref(&input)).unwrap();
            assert_eq!(live_status(&live), expected, "{}", input.name);
        }

        let preview = preview_import(&db, &[row("Ketel One", "TITO-750", 19.99)]).unwrap();
        assert_eq!(preview.rows[0].status, ImportStatus::Same);
    }

    #[test]
    fn test_existing_sku_moves_to_named_ingredient() {
        let db = test_db();
        run_import(&db, &[row("Tito's Vodka", "TITO-750", 19.99)]).unwrap();

        let preview = preview_import(&db, &[row("Ketel One", "TITO-750", 19.99)]).unwrap();
        assert_eq!(preview.rows[0].changed_fields, vec!["ingredient".to_string()]);

        let result = run_import(&db, &[row("Ketel One", "TITO-750", 19.99)]).unwrap();
        assert_eq!(result.updated, 1);
        assert_eq!(result.created, 0);

        let variant = db.with_conn(|c| ProductVariant::get_by_sku(c, "TITO-750")).unwrap().unwrap();
        let owner = db.with_conn(|c| Ingredient::get_by_id(c, variant.ingredient_id)).unwrap().unwrap();
        assert_eq!(owner.name, "Ketel One");
    }

    #[test]
    fn test_new_sku_requires_size() {
        let db = test_db();
        let mut sizeless = row("Aperol", "APEROL-1L", 22.0);
        sizeless.size_ml = None;
        let mut zero = row("Aperol", "APEROL-750", 18.0);
        zero.size_ml = Some(0.0);

        let preview = preview_import(&db, &[sizeless.clone(), zero.clone()]).unwrap();
        assert_eq!(preview.invalid, 2);

        let result = run_import(&db, &[sizeless, zero]).unwrap();
        assert_eq!(result.errors.len(), 2);
        assert!(db.with_conn(|c| ProductVariant::get_by_sku(c, "APEROL-1L")).unwrap().is_none());
    }
}
