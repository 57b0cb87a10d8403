//! Barkeep Tools module
//!
//! Operations behind the MCP tools. Each returns `Result<_, String>` with a
//! message fit to show the user.

pub mod bulk;
pub mod counts;
pub mod import;
pub mod ingredients;
pub mod inventory;
pub mod maintenance;
pub mod recipes;
pub mod settings;
pub mod status;

/// In-memory database with the schema applied
#[cfg(test)]
pub(crate) fn test_db() -> crate::db::Database {
    let db = crate::db::Database::in_memory().unwrap();
    db.with_conn(crate::db::migrations::run_migrations).unwrap();
    db
}
