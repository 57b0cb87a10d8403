//! Data models
//!
//! Rust structs representing database entities.

mod account;
mod ingredient;
mod inventory_count_log;
mod inventory_item;
mod inventory_report;
pub mod json_field;
mod menu;
mod product_variant;
mod recipe;
mod recipe_ingredient;
mod settings;

pub use account::Account;
pub use ingredient::{
    complete_prep_actions, Ingredient, IngredientCreate, IngredientUpdate, PrepAction,
    PrepActionInput,
};
pub use inventory_count_log::{InventoryCountLog, InventoryCountLogCreate};
pub use inventory_item::{InventoryItem, InventoryItemCreate, InventoryItemDetail, TrackOutcome};
pub use inventory_report::InventoryReport;
pub use menu::Menu;
pub use product_variant::{ProductVariant, ProductVariantCreate, ProductVariantUpdate};
pub use recipe::{BatchSettings, Recipe, RecipeCreate, RecipeUpdate};
pub use recipe_ingredient::{RecipeIngredient, RecipeIngredientCreate};
pub use settings::{AppSettings, AppSettingsUpdate, DEFAULT_ALCOHOLIC_CATEGORIES};
