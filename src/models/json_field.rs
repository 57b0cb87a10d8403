//! JSON column helpers
//!
//! List-valued fields are stored as JSON text. Writes are strictly
//! serialized; reads of legacy malformed values degrade to the default for
//! that one record instead of failing the whole query.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::db::DbResult;

/// Serialize a value for storage in a JSON column
pub fn to_column<T: Serialize>(value: &T) -> DbResult<String> {
    Ok(serde_json::to_string(value)?)
}

/// Decode a JSON column, falling back to `T::default()` with a warning
pub fn from_column<T>(raw: Option<String>, table: &str, column: &str, id: i64) -> T
where
    T: DeserializeOwned + Default,
{
    let raw = match raw {
        Some(r) if !r.trim().is_empty() => r,
        _ => return T::default(),
    };

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(
                "Malformed JSON in {}.{} for id {}: {} (using empty value)",
                table,
                column,
                id,
                e
            );
            T::default()
        }
    }
}

/// Check a stored JSON column without decoding it into a model
pub fn validate_column<T: DeserializeOwned>(raw: &str) -> Result<(), String> {
    serde_json::from_str::<T>(raw)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_list() {
        let raw = to_column(&vec!["a".to_string()]).unwrap();
        let back: Vec<String> = from_column(Some(raw), "t", "c", 1);
        assert_eq!(back, vec!["a".to_string()]);
    }

    #[test]
    fn test_malformed_falls_back_to_default() {
        let back: Vec<String> = from_column(Some("[name: 'x',]".to_string()), "t", "c", 1);
        assert!(back.is_empty());
        let back: Vec<String> = from_column(None, "t", "c", 1);
        assert!(back.is_empty());
    }

    #[test]
    fn test_validate_column() {
        assert!(validate_column::<Vec<String>>(r#"["x"]"#).is_ok());
        assert!(validate_column::<Vec<String>>("{bad").is_err());
    }
}
