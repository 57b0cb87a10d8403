//! Settings MCP Tools

use crate::db::Database;
use crate::models::{AppSettings, AppSettingsUpdate};

/// Apply a change to `current`, persist it, and return the new settings.
/// Nothing is saved if the result is out of range.
pub fn update_settings(db: &Database, current: &AppSettings, update: &AppSettingsUpdate) -> Result<AppSettings, String> {
    let next = current.apply(update);
    next.validate().map_err(|e| e.to_string())?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    next.save(&conn).map_err(|e| format!("Failed to save settings: {}", e))?;
    tracing::info!("Settings updated: {:?}", next);
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_db;

    #[test]
    fn test_update_persists_and_rejects_out_of_range() {
        let db = test_db();
        let current = AppSettings::default();

        let bad = AppSettingsUpdate { bulk_chunk_size: Some(0), ..Default::default() };
        assert!(update_settings(&db, &current, &bad).is_err());

        let good = AppSettingsUpdate {
            duplicate_threshold: Some(0.8),
            alcoholic_categories: Some(vec![" Mezcal ".into(), "".into()]),
            ..Default::default()
        };
        let next = update_settings(&db, &current, &good).unwrap();
        assert_eq!(next.alcoholic_categories, vec!["mezcal".to_string()]);

        let loaded = db.with_conn(AppSettings::load).unwrap();
        assert_eq!(loaded, next);
    }
}
