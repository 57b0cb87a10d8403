//! Recompute every ingredient's cost per unit from its purchase fields
//! Usage: cargo run --bin recalculate_costs

use barkeep::tools::maintenance;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let db_path = barkeep::config::database_path();
    println!("Database: {}", db_path.display());

    let database = barkeep::db::Database::new(&db_path)?;
    database.with_conn(barkeep::db::migrations::run_migrations)?;

    let result = maintenance::recalculate_costs(&database)?;

    for change in &result.changed {
        println!(
            "{} ({}): {:.4}/{} -> {:.4}/{}",
            change.name, change.id, change.old_cost, change.old_unit, change.new_cost, change.new_unit
        );
    }
    for error in &result.errors {
        eprintln!("Error: {}", error);
    }

    println!(
        "\nChecked {} ingredients, {} changed, {} errors",
        result.checked,
        result.changed.len(),
        result.errors.len()
    );
    Ok(())
}
