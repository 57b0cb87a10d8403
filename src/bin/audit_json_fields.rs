//! Report stored JSON columns that fail strict decoding
//! Usage: cargo run --bin audit_json_fields
//!
//! Exits with status 1 when any row is malformed.

use barkeep::tools::maintenance;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let db_path = barkeep::config::database_path();
    println!("Database: {}", db_path.display());

    let database = barkeep::db::Database::new(&db_path)?;
    database.with_conn(barkeep::db::migrations::run_migrations)?;

    let issues = maintenance::audit_json_fields(&database)?;
    if issues.is_empty() {
        println!("All JSON columns are valid");
        return Ok(());
    }

    for issue in &issues {
        println!("{}.{} id={} ({})", issue.table, issue.column, issue.id, issue.name);
        println!("  raw:   {}", issue.raw);
        println!("  error: {}", issue.error);
    }
    println!("\n{} malformed values", issues.len());
    std::process::exit(1);
}
