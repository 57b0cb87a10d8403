//! Application settings
//!
//! Process-wide configuration persisted as key/value rows. Loaded once at
//! startup and saved on change; callers receive it explicitly.

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult, POOL_SIZE};
use crate::dedupe::DEFAULT_DUPLICATE_THRESHOLD;

const KEY_BULK_CHUNK_SIZE: &str = "bulk_chunk_size";
const KEY_DUPLICATE_THRESHOLD: &str = "duplicate_threshold";
const KEY_INVENTORY_UNIT: &str = "inventory_unit";
const KEY_ALCOHOLIC_CATEGORIES: &str = "alcoholic_categories";

/// Categories counted as alcoholic when deriving inventory from a menu
pub const DEFAULT_ALCOHOLIC_CATEGORIES: &[&str] = &[
    "spirit", "spirits", "liqueur", "liqueurs", "wine", "sparkling wine", "fortified wine",
    "vermouth", "beer", "cider", "sake", "amaro", "aperitif", "bitters",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Writes issued concurrently per wave in bulk operations
    pub bulk_chunk_size: usize,
    /// Similarity score at which ingredients are flagged as duplicates
    pub duplicate_threshold: f64,
    /// Unit given to newly tracked inventory items
    pub inventory_unit: String,
    pub alcoholic_categories: Vec<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            bulk_chunk_size: 10,
            duplicate_threshold: DEFAULT_DUPLICATE_THRESHOLD,
            inventory_unit: "bottle".to_string(),
            alcoholic_categories: DEFAULT_ALCOHOLIC_CATEGORIES
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

/// Partial settings change
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppSettingsUpdate {
    pub bulk_chunk_size: Option<usize>,
    pub duplicate_threshold: Option<f64>,
    pub inventory_unit: Option<String>,
    pub alcoholic_categories: Option<Vec<String>>,
}

fn read_value(conn: &Connection, key: &str) -> DbResult<Option<String>> {
    let mut stmt = conn.prepare("SELECT value FROM app_settings WHERE key = ?1")?;
    match stmt.query_row([key], |row| row.get(0)) {
        Ok(v) => Ok(Some(v)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn parse_or_default<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        Some(r) => r.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid setting {}='{}'", key, r);
            default
        }),
        None => default,
    }
}

impl AppSettings {
    /// Load settings, using defaults for missing or invalid keys
    pub fn load(conn: &Connection) -> DbResult<Self> {
        let defaults = Self::default();

        let alcoholic_categories = match read_value(conn, KEY_ALCOHOLIC_CATEGORIES)? {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid setting {}: {}", KEY_ALCOHOLIC_CATEGORIES, e);
                defaults.alcoholic_categories.clone()
            }),
            None => defaults.alcoholic_categories.clone(),
        };

        let loaded = Self {
            bulk_chunk_size: parse_or_default(
                KEY_BULK_CHUNK_SIZE,
                read_value(conn, KEY_BULK_CHUNK_SIZE)?,
                defaults.bulk_chunk_size,
            ),
            duplicate_threshold: parse_or_default(
                KEY_DUPLICATE_THRESHOLD,
                read_value(conn, KEY_DUPLICATE_THRESHOLD)?,
                defaults.duplicate_threshold,
            ),
            inventory_unit: read_value(conn, KEY_INVENTORY_UNIT)?
                .filter(|u| !u.trim().is_empty())
                .unwrap_or(defaults.inventory_unit),
            alcoholic_categories,
        };

        match loaded.validate() {
            Ok(()) => Ok(loaded),
            Err(e) => {
                tracing::warn!("Stored settings invalid ({}), using defaults", e);
                Ok(Self::default())
            }
        }
    }

    /// Check ranges before saving
    pub fn validate(&self) -> DbResult<()> {
        if self.bulk_chunk_size == 0 || self.bulk_chunk_size > POOL_SIZE as usize {
            return Err(DbError::Validation(format!(
                "bulk_chunk_size must be between 1 and {}",
                POOL_SIZE
            )));
        }
        if !(self.duplicate_threshold > 0.0 && self.duplicate_threshold <= 1.0) {
            return Err(DbError::Validation(
                "duplicate_threshold must be in (0, 1]".to_string(),
            ));
        }
        if self.inventory_unit.trim().is_empty() {
            return Err(DbError::Validation("inventory_unit cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Apply a partial change, returning the new settings
    pub fn apply(&self, update: &AppSettingsUpdate) -> Self {
        let mut next = self.clone();
        if let Some(size) = update.bulk_chunk_size {
            next.bulk_chunk_size = size;
        }
        if let Some(threshold) = update.duplicate_threshold {
            next.duplicate_threshold = threshold;
        }
        if let Some(ref unit) = update.inventory_unit {
            next.inventory_unit = unit.trim().to_string();
        }
        if let Some(ref categories) = update.alcoholic_categories {
            next.alcoholic_categories = categories
                .iter()
                .map(|c| c.trim().to_lowercase())
                .filter(|c| !c.is_empty())
                .collect();
        }
        next
    }

    /// Persist all settings
    pub fn save(&self, conn: &Connection) -> DbResult<()> {
        self.validate()?;

        let values = [
            (KEY_BULK_CHUNK_SIZE, self.bulk_chunk_size.to_string()),
            (KEY_DUPLICATE_THRESHOLD, self.duplicate_threshold.to_string()),
            (KEY_INVENTORY_UNIT, self.inventory_unit.clone()),
            (KEY_ALCOHOLIC_CATEGORIES, serde_json::to_string(&self.alcoholic_categories)?),
        ];

        for (key, value) in values.iter() {
            conn.execute(
                r#"
                INSERT INTO app_settings (key, value) VALUES (?1, ?2)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')
                "#,
                params![key, value],
            )?;
        }
        Ok(())
    }
}
