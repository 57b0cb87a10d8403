//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
    }

    Ok(())
}

/// Migration v1: Initial schema
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- ACCOUNTS
        -- A bar or venue that owns inventory and menus
        -- ============================================
        CREATE TABLE accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- ============================================
        -- RECIPES
        -- Cocktails and prepared batches
        -- ============================================
        CREATE TABLE recipes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            batch_settings TEXT,                 -- JSON BatchSettings, NULL when not batched
            notes TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_recipes_name ON recipes(name);

        -- ============================================
        -- RECIPE INGREDIENTS
        -- Lines reference ingredients by name, not id
        -- ============================================
        CREATE TABLE recipe_ingredients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
            ingredient_name TEXT NOT NULL,
            amount REAL NOT NULL DEFAULT 0,
            unit TEXT NOT NULL DEFAULT 'oz',
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_recipe_ingredients_recipe ON recipe_ingredients(recipe_id);
        CREATE INDEX idx_recipe_ingredients_name ON recipe_ingredients(ingredient_name COLLATE NOCASE);

        -- ============================================
        -- MENUS
        -- ============================================
        CREATE TABLE menus (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE menu_recipes (
            menu_id INTEGER NOT NULL REFERENCES menus(id) ON DELETE CASCADE,
            recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
            position INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (menu_id, recipe_id)
        );

        -- ============================================
        -- INGREDIENTS
        -- Purchasable ingredients with normalized cost
        -- ============================================
        CREATE TABLE ingredients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            category TEXT,
            supplier TEXT,
            purchase_price REAL NOT NULL DEFAULT 0,
            purchase_quantity REAL NOT NULL DEFAULT 0,
            purchase_unit TEXT NOT NULL DEFAULT 'each',
            cost_per_unit REAL NOT NULL DEFAULT 0 CHECK(cost_per_unit >= 0),
            unit TEXT NOT NULL DEFAULT 'each',   -- canonical unit of cost_per_unit
            aliases TEXT NOT NULL DEFAULT '[]',  -- JSON array of strings
            prep_actions TEXT NOT NULL DEFAULT '[]', -- JSON array of PrepAction
            sub_recipe_id INTEGER REFERENCES recipes(id) ON DELETE SET NULL,
            is_liquor_portfolio INTEGER NOT NULL DEFAULT 0,
            tier TEXT,
            exclusive INTEGER NOT NULL DEFAULT 0,
            image_url TEXT,
            notes TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE UNIQUE INDEX idx_ingredients_name ON ingredients(name COLLATE NOCASE);
        CREATE INDEX idx_ingredients_sub_recipe ON ingredients(sub_recipe_id);

        -- ============================================
        -- PRODUCT VARIANTS
        -- Purchasable package sizes of an ingredient
        -- ============================================
        CREATE TABLE product_variants (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ingredient_id INTEGER NOT NULL REFERENCES ingredients(id) ON DELETE CASCADE,
            size_ml REAL NOT NULL DEFAULT 0,     -- values under 10 are liters
            purchase_price REAL NOT NULL DEFAULT 0,
            case_price REAL,
            bottles_per_case INTEGER,
            sku_number TEXT,
            use_case_pricing INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_product_variants_ingredient ON product_variants(ingredient_id);
        CREATE UNIQUE INDEX idx_product_variants_sku ON product_variants(sku_number)
            WHERE sku_number IS NOT NULL;

        -- ============================================
        -- INVENTORY ITEMS
        -- One tracked variant per account
        -- ============================================
        CREATE TABLE inventory_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
            product_variant_id INTEGER NOT NULL REFERENCES product_variants(id) ON DELETE RESTRICT,
            current_stock REAL NOT NULL DEFAULT 0,
            reorder_point REAL NOT NULL DEFAULT 0,
            unit TEXT NOT NULL DEFAULT 'bottle',
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),

            UNIQUE(account_id, product_variant_id)
        );

        CREATE INDEX idx_inventory_items_account ON inventory_items(account_id);

        -- ============================================
        -- INVENTORY REPORTS
        -- A set of counts taken together
        -- ============================================
        CREATE TABLE inventory_reports (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            report_date TEXT NOT NULL,
            notes TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_inventory_reports_account ON inventory_reports(account_id);

        -- ============================================
        -- INVENTORY COUNT LOGS
        -- Append-only count snapshots
        -- ============================================
        CREATE TABLE inventory_count_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            inventory_item_id INTEGER NOT NULL REFERENCES inventory_items(id) ON DELETE CASCADE,
            counted_quantity REAL NOT NULL CHECK(counted_quantity >= 0),
            count_date TEXT NOT NULL,
            counted_by TEXT,
            report_id INTEGER REFERENCES inventory_reports(id),
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_count_logs_item_date ON inventory_count_logs(inventory_item_id, count_date);
        CREATE INDEX idx_count_logs_report ON inventory_count_logs(report_id);

        CREATE TRIGGER trg_count_logs_append_only
        BEFORE UPDATE ON inventory_count_logs
        BEGIN
            SELECT RAISE(ABORT, 'inventory count logs are append-only');
        END;

        -- ============================================
        -- APP SETTINGS
        -- Key/value process configuration
        -- ============================================
        CREATE TABLE app_settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        "#,
    )?;

    Ok(())
}

/// Get the current schema version
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);
    Ok(version)
}

/// Check if the database needs migration
pub fn needs_migration(conn: &Connection) -> DbResult<bool> {
    let current = get_schema_version(conn)?;
    Ok(current < SCHEMA_VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(needs_migration(&conn).unwrap_or(true));
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), 1);
        assert!(!needs_migration(&conn).unwrap());
    }
}
