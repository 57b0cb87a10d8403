//! Barkeep MCP Server Implementation
//!
//! Implements the MCP server with all Barkeep tools.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::db::Database;
use crate::models::{
    complete_prep_actions, AppSettings, AppSettingsUpdate, BatchSettings, IngredientCreate,
    IngredientUpdate, PrepActionInput, ProductVariantCreate, ProductVariantUpdate, RecipeUpdate,
};
use crate::stock::ResolveMode;
use crate::tools::counts::{self, ReportCount};
use crate::tools::import::{self, ImportRow};
use crate::tools::ingredients;
use crate::tools::inventory::{self, CandidateSource};
use crate::tools::maintenance;
use crate::tools::recipes::{self, RecipeLineInput};
use crate::tools::settings;
use crate::tools::status::{StatusTracker, INVENTORY_INSTRUCTIONS};

/// Barkeep MCP Service
#[derive(Clone)]
pub struct BarkeepService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    database: Database,
    settings: Arc<RwLock<AppSettings>>,
    tool_router: ToolRouter<BarkeepService>,
}

impl BarkeepService {
    pub fn new(database_path: PathBuf, database: Database, settings: AppSettings) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(database_path))),
            database,
            settings: Arc::new(RwLock::new(settings)),
            tool_router: Self::tool_router(),
        }
    }

    /// Snapshot of the current settings
    fn settings(&self) -> Result<AppSettings, McpError> {
        self.settings
            .read()
            .map(|s| s.clone())
            .map_err(|_| McpError::internal_error("Settings lock poisoned", None))
    }
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn not_found(kind: &str, id: i64) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(format!(
        r#"{{"error": "{} not found", "id": {}}}"#,
        kind, id
    ))]))
}

fn tool_error(e: String) -> McpError {
    McpError::internal_error(e, None)
}

// ============================================================================
// Shared Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct IdParams {
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AccountParams {
    pub account_id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct NameParams {
    pub name: String,
}

// ============================================================================
// Ingredient Parameter Structs
// ============================================================================

/// A prep step; entries missing any field are dropped
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PrepActionParam {
    pub name: Option<String>,
    pub yield_amount: Option<f64>,
    pub yield_unit: Option<String>,
}

fn prep_actions(params: Vec<PrepActionParam>) -> Vec<crate::models::PrepAction> {
    complete_prep_actions(
        params
            .into_iter()
            .map(|p| PrepActionInput {
                name: p.name,
                yield_amount: p.yield_amount,
                yield_unit: p.yield_unit,
            })
            .collect(),
    )
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddIngredientParams {
    pub name: String,
    pub category: Option<String>,
    pub supplier: Option<String>,
    /// Price paid for purchase_quantity of purchase_unit
    #[serde(default)]
    pub purchase_price: f64,
    #[serde(default)]
    pub purchase_quantity: f64,
    /// ml, cl, l, oz, fl oz, qt are costed per ounce; anything else per unit
    #[serde(default = "default_purchase_unit")]
    pub purchase_unit: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub prep_actions: Vec<PrepActionParam>,
    /// Recipe this ingredient is a bottled batch of
    pub sub_recipe_id: Option<i64>,
    #[serde(default)]
    pub is_liquor_portfolio: bool,
    pub tier: Option<String>,
    #[serde(default)]
    pub exclusive: bool,
    pub image_url: Option<String>,
    pub notes: Option<String>,
}

fn default_purchase_unit() -> String { "each".to_string() }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateIngredientParams {
    pub id: i64,
    /// Renaming rewrites recipe lines that use the old name
    pub name: Option<String>,
    pub category: Option<String>,
    pub supplier: Option<String>,
    pub purchase_price: Option<f64>,
    pub purchase_quantity: Option<f64>,
    pub purchase_unit: Option<String>,
    pub aliases: Option<Vec<String>>,
    pub prep_actions: Option<Vec<PrepActionParam>>,
    pub sub_recipe_id: Option<i64>,
    pub is_liquor_portfolio: Option<bool>,
    pub tier: Option<String>,
    pub exclusive: Option<bool>,
    pub image_url: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchParams {
    pub query: String,
    #[serde(default = "default_search_limit")]
    pub limit: i64,
}

fn default_search_limit() -> i64 { 20 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FindDuplicatesParams {
    /// Similarity score in (0, 1]; defaults to the configured threshold
    pub threshold: Option<f64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MergeIngredientsParams {
    /// Ingredient to keep
    pub primary_id: i64,
    /// Ingredients to fold into the primary and delete
    pub duplicate_ids: Vec<i64>,
}

// ============================================================================
// Variant / Inventory Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddVariantParams {
    pub ingredient_id: i64,
    /// Bottle size in ml; values under 10 are liters
    pub size_ml: f64,
    #[serde(default)]
    pub purchase_price: f64,
    pub case_price: Option<f64>,
    pub bottles_per_case: Option<i64>,
    pub sku_number: Option<String>,
    #[serde(default)]
    pub use_case_pricing: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateVariantParams {
    pub id: i64,
    pub size_ml: Option<f64>,
    pub purchase_price: Option<f64>,
    pub case_price: Option<f64>,
    pub bottles_per_case: Option<i64>,
    pub sku_number: Option<String>,
    pub use_case_pricing: Option<bool>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ReorderPointParams {
    pub inventory_item_id: i64,
    pub reorder_point: f64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LoadCandidatesParams {
    pub account_id: i64,
    /// Derive ingredients from this menu
    pub menu_id: Option<i64>,
    /// Or use these ingredients
    #[serde(default)]
    pub ingredient_ids: Vec<i64>,
    /// "inventory" (default) or "order"
    pub mode: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ConfirmSelectionParams {
    pub account_id: i64,
    pub variant_ids: Vec<i64>,
}

// ============================================================================
// Count Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RecordCountParams {
    pub inventory_item_id: i64,
    pub counted_quantity: f64,
    /// YYYY-MM-DD or RFC 3339; defaults to now
    pub count_date: Option<String>,
    pub counted_by: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ItemHistoryParams {
    pub inventory_item_id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ReportCountParam {
    pub inventory_item_id: i64,
    pub counted_quantity: f64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateReportParams {
    pub account_id: i64,
    pub name: String,
    pub report_date: Option<String>,
    pub notes: Option<String>,
    pub counted_by: Option<String>,
    pub counts: Vec<ReportCountParam>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CompareReportsParams {
    pub older_report_id: i64,
    pub newer_report_id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ImportParams {
    pub rows: Vec<ImportRow>,
}

// ============================================================================
// Recipe / Menu Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct BatchSettingsParam {
    /// Track the bottled batch in inventory instead of its components
    #[serde(default)]
    pub track_as_bottled: bool,
    pub yield_amount: Option<f64>,
    pub yield_unit: Option<String>,
}

impl From<BatchSettingsParam> for BatchSettings {
    fn from(p: BatchSettingsParam) -> Self {
        Self {
            track_as_bottled: p.track_as_bottled,
            yield_amount: p.yield_amount,
            yield_unit: p.yield_unit,
        }
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RecipeLineParam {
    /// Ingredient name or alias
    pub ingredient_name: String,
    pub amount: f64,
    /// Defaults to oz
    pub unit: Option<String>,
}

impl From<RecipeLineParam> for RecipeLineInput {
    fn from(p: RecipeLineParam) -> Self {
        Self {
            ingredient_name: p.ingredient_name,
            amount: p.amount,
            unit: p.unit,
        }
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateRecipeParams {
    pub name: String,
    pub batch_settings: Option<BatchSettingsParam>,
    pub notes: Option<String>,
    #[serde(default)]
    pub lines: Vec<RecipeLineParam>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListRecipesParams {
    pub query: Option<String>,
    #[serde(default = "default_list_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_list_limit() -> i64 { 50 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateRecipeParams {
    pub id: i64,
    pub name: Option<String>,
    pub batch_settings: Option<BatchSettingsParam>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddRecipeLineParams {
    pub recipe_id: i64,
    pub ingredient_name: String,
    pub amount: f64,
    pub unit: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateMenuParams {
    pub account_id: i64,
    pub name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MenuRecipeParams {
    pub menu_id: i64,
    pub recipe_id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateSettingsParams {
    /// Concurrent writes per chunk in bulk operations (1-10)
    pub bulk_chunk_size: Option<usize>,
    pub duplicate_threshold: Option<f64>,
    /// Unit for newly tracked inventory items
    pub inventory_unit: Option<String>,
    pub alcoholic_categories: Option<Vec<String>>,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl BarkeepService {
    // --- Status ---

    #[tool(description = "Get the current status of the Barkeep service including build info, database status, settings and process information")]
    async fn barkeep_status(&self) -> Result<CallToolResult, McpError> {
        let settings = self.settings()?;
        let tracker = self.status_tracker.lock().await;
        json_result(&tracker.get_status(&settings))
    }

    #[tool(description = "Get instructions for costing, stocking inventory, counting and merging duplicates. Call this when starting an inventory session.")]
    fn inventory_instructions(&self) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::success(vec![Content::text(INVENTORY_INSTRUCTIONS)]))
    }

    #[tool(description = "Get the current application settings")]
    fn get_settings(&self) -> Result<CallToolResult, McpError> {
        json_result(&self.settings()?)
    }

    #[tool(description = "Update application settings (bulk chunk size, duplicate threshold, inventory unit, alcoholic categories)")]
    fn update_settings(&self, Parameters(p): Parameters<UpdateSettingsParams>) -> Result<CallToolResult, McpError> {
        let update = AppSettingsUpdate {
            bulk_chunk_size: p.bulk_chunk_size,
            duplicate_threshold: p.duplicate_threshold,
            inventory_unit: p.inventory_unit,
            alcoholic_categories: p.alcoholic_categories,
        };
        let mut guard = self
            .settings
            .write()
            .map_err(|_| McpError::internal_error("Settings lock poisoned", None))?;
        let next = settings::update_settings(&self.database, &guard, &update).map_err(tool_error)?;
        *guard = next.clone();
        json_result(&next)
    }

    // --- Accounts ---

    #[tool(description = "Create an account (a bar or venue)")]
    fn create_account(&self, Parameters(p): Parameters<NameParams>) -> Result<CallToolResult, McpError> {
        json_result(&inventory::create_account(&self.database, &p.name).map_err(tool_error)?)
    }

    #[tool(description = "List all accounts")]
    fn list_accounts(&self) -> Result<CallToolResult, McpError> {
        json_result(&inventory::list_accounts(&self.database).map_err(tool_error)?)
    }

    // --- Ingredients ---

    #[tool(description = "Add an ingredient. Cost per unit is derived from the purchase fields (liquids per ounce).")]
    fn add_ingredient(&self, Parameters(p): Parameters<AddIngredientParams>) -> Result<CallToolResult, McpError> {
        let data = IngredientCreate {
            name: p.name, category: p.category, supplier: p.supplier,
            purchase_price: p.purchase_price, purchase_quantity: p.purchase_quantity,
            purchase_unit: p.purchase_unit, aliases: p.aliases,
            prep_actions: prep_actions(p.prep_actions), sub_recipe_id: p.sub_recipe_id,
            is_liquor_portfolio: p.is_liquor_portfolio, tier: p.tier, exclusive: p.exclusive,
            image_url: p.image_url, notes: p.notes,
        };
        json_result(&ingredients::add_ingredient(&self.database, data).map_err(tool_error)?)
    }

    #[tool(description = "Update an ingredient. Purchase changes recompute cost; a rename rewrites every recipe line using the old name.")]
    fn update_ingredient(&self, Parameters(p): Parameters<UpdateIngredientParams>) -> Result<CallToolResult, McpError> {
        let settings = self.settings()?;
        let data = IngredientUpdate {
            name: p.name, category: p.category, supplier: p.supplier,
            purchase_price: p.purchase_price, purchase_quantity: p.purchase_quantity,
            purchase_unit: p.purchase_unit, aliases: p.aliases,
            prep_actions: p.prep_actions.map(prep_actions), sub_recipe_id: p.sub_recipe_id,
            is_liquor_portfolio: p.is_liquor_portfolio, tier: p.tier, exclusive: p.exclusive,
            image_url: p.image_url, notes: p.notes,
        };
        match ingredients::update_ingredient(&self.database, &settings, p.id, data).map_err(tool_error)? {
            Some(result) => json_result(&result),
            None => not_found("Ingredient", p.id),
        }
    }

    #[tool(description = "Get an ingredient with its variants and recipe usage")]
    fn get_ingredient(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        match ingredients::get_ingredient(&self.database, p.id).map_err(tool_error)? {
            Some(detail) => json_result(&detail),
            None => not_found("Ingredient", p.id),
        }
    }

    #[tool(description = "Search ingredients by name, supplier or category")]
    fn search_ingredients(&self, Parameters(p): Parameters<SearchParams>) -> Result<CallToolResult, McpError> {
        json_result(&ingredients::search_ingredients(&self.database, &p.query, p.limit).map_err(tool_error)?)
    }

    #[tool(description = "List all ingredients")]
    fn list_ingredients(&self) -> Result<CallToolResult, McpError> {
        json_result(&ingredients::list_ingredients(&self.database).map_err(tool_error)?)
    }

    #[tool(description = "Find groups of ingredients with similar names that are likely duplicates")]
    fn find_duplicate_ingredients(&self, Parameters(p): Parameters<FindDuplicatesParams>) -> Result<CallToolResult, McpError> {
        let threshold = match p.threshold {
            Some(t) => t,
            None => self.settings()?.duplicate_threshold,
        };
        json_result(&ingredients::find_duplicate_ingredients(&self.database, threshold).map_err(tool_error)?)
    }

    #[tool(description = "Merge duplicate ingredients into a primary: recipe lines, variants and aliases move to the primary and the duplicates are deleted")]
    fn merge_ingredients(&self, Parameters(p): Parameters<MergeIngredientsParams>) -> Result<CallToolResult, McpError> {
        json_result(&ingredients::merge_ingredients(&self.database, p.primary_id, &p.duplicate_ids).map_err(tool_error)?)
    }

    // --- Variants & Inventory ---

    #[tool(description = "Add a purchasable size (product variant) of an ingredient")]
    fn add_variant(&self, Parameters(p): Parameters<AddVariantParams>) -> Result<CallToolResult, McpError> {
        let data = ProductVariantCreate {
            ingredient_id: p.ingredient_id, size_ml: p.size_ml, purchase_price: p.purchase_price,
            case_price: p.case_price, bottles_per_case: p.bottles_per_case,
            sku_number: p.sku_number, use_case_pricing: p.use_case_pricing,
        };
        json_result(&inventory::add_variant(&self.database, data).map_err(tool_error)?)
    }

    #[tool(description = "Update a product variant's size, prices or SKU")]
    fn update_variant(&self, Parameters(p): Parameters<UpdateVariantParams>) -> Result<CallToolResult, McpError> {
        let data = ProductVariantUpdate {
            size_ml: p.size_ml, purchase_price: p.purchase_price, case_price: p.case_price,
            bottles_per_case: p.bottles_per_case, sku_number: p.sku_number,
            use_case_pricing: p.use_case_pricing,
        };
        match inventory::update_variant(&self.database, p.id, data).map_err(tool_error)? {
            Some(variant) => json_result(&variant),
            None => not_found("Variant", p.id),
        }
    }

    #[tool(description = "List an account's tracked inventory with stock levels and reorder flags")]
    fn list_inventory(&self, Parameters(p): Parameters<AccountParams>) -> Result<CallToolResult, McpError> {
        json_result(&inventory::list_inventory(&self.database, p.account_id).map_err(tool_error)?)
    }

    #[tool(description = "Set the reorder point of an inventory item")]
    fn set_reorder_point(&self, Parameters(p): Parameters<ReorderPointParams>) -> Result<CallToolResult, McpError> {
        let updated = inventory::set_reorder_point(&self.database, p.inventory_item_id, p.reorder_point)
            .map_err(tool_error)?;
        json_result(&serde_json::json!({ "success": updated, "inventory_item_id": p.inventory_item_id }))
    }

    #[tool(description = "Load variant candidates for an account from a menu or an ingredient list. Shows tracked state, best value and default selection.")]
    fn load_inventory_candidates(&self, Parameters(p): Parameters<LoadCandidatesParams>) -> Result<CallToolResult, McpError> {
        let settings = self.settings()?;
        let source = match p.menu_id {
            Some(menu_id) => CandidateSource::Menu(menu_id),
            None => CandidateSource::Ingredients(p.ingredient_ids),
        };
        let mode = match p.mode.as_deref() {
            Some(raw) => raw.parse::<ResolveMode>().map_err(tool_error)?,
            None => ResolveMode::default(),
        };
        json_result(
            &inventory::load_inventory_candidates(&self.database, &settings, p.account_id, &source, mode)
                .map_err(tool_error)?,
        )
    }

    #[tool(description = "Track the selected variants for an account. Already tracked variants are skipped.")]
    fn confirm_inventory_selection(&self, Parameters(p): Parameters<ConfirmSelectionParams>) -> Result<CallToolResult, McpError> {
        let settings = self.settings()?;
        let result = inventory::confirm_inventory_selection(
            &self.database,
            &settings,
            p.account_id,
            &p.variant_ids,
            |progress| tracing::info!("Tracking variants: {}/{}", progress.completed, progress.total),
        )
        .map_err(tool_error)?;
        json_result(&result)
    }

    // --- Counts & Reports ---

    #[tool(description = "Record a count for an inventory item and update its current stock")]
    fn record_count(&self, Parameters(p): Parameters<RecordCountParams>) -> Result<CallToolResult, McpError> {
        json_result(
            &counts::record_count(&self.database, p.inventory_item_id, p.counted_quantity, p.count_date.as_deref(), p.counted_by)
                .map_err(tool_error)?,
        )
    }

    #[tool(description = "Get an item's count history, newest first, with usage between counts")]
    fn get_item_history(&self, Parameters(p): Parameters<ItemHistoryParams>) -> Result<CallToolResult, McpError> {
        match counts::get_item_history(&self.database, p.inventory_item_id).map_err(tool_error)? {
            Some(history) => json_result(&history),
            None => not_found("Inventory item", p.inventory_item_id),
        }
    }

    #[tool(description = "Create an inventory report: a named set of counts taken together")]
    fn create_inventory_report(&self, Parameters(p): Parameters<CreateReportParams>) -> Result<CallToolResult, McpError> {
        let report_counts: Vec<ReportCount> = p
            .counts
            .into_iter()
            .map(|c| ReportCount { inventory_item_id: c.inventory_item_id, counted_quantity: c.counted_quantity })
            .collect();
        json_result(
            &counts::create_inventory_report(
                &self.database,
                p.account_id,
                &p.name,
                p.report_date.as_deref(),
                p.notes.as_deref(),
                p.counted_by,
                &report_counts,
            )
            .map_err(tool_error)?,
        )
    }

    #[tool(description = "List an account's inventory reports, newest first")]
    fn list_reports(&self, Parameters(p): Parameters<AccountParams>) -> Result<CallToolResult, McpError> {
        json_result(&counts::list_reports(&self.database, p.account_id).map_err(tool_error)?)
    }

    #[tool(description = "Compare two inventory reports: per-item start, end and usage, with totals")]
    fn compare_reports(&self, Parameters(p): Parameters<CompareReportsParams>) -> Result<CallToolResult, McpError> {
        json_result(&counts::compare_reports(&self.database, p.older_report_id, p.newer_report_id).map_err(tool_error)?)
    }

    // --- Import ---

    #[tool(description = "Dry run an ingredient catalog import: classify each row as NEW, UPDATE or SAME by SKU")]
    fn preview_import(&self, Parameters(p): Parameters<ImportParams>) -> Result<CallToolResult, McpError> {
        json_result(&import::preview_import(&self.database, &p.rows).map_err(tool_error)?)
    }

    #[tool(description = "Import an ingredient catalog: upsert ingredients by name and variants by SKU")]
    fn run_import(&self, Parameters(p): Parameters<ImportParams>) -> Result<CallToolResult, McpError> {
        json_result(&import::run_import(&self.database, &p.rows).map_err(tool_error)?)
    }

    // --- Recipes ---

    #[tool(description = "Create a recipe with its ingredient lines")]
    fn create_recipe(&self, Parameters(p): Parameters<CreateRecipeParams>) -> Result<CallToolResult, McpError> {
        let lines: Vec<RecipeLineInput> = p.lines.into_iter().map(Into::into).collect();
        json_result(
            &recipes::create_recipe(&self.database, &p.name, p.batch_settings.map(Into::into), p.notes, &lines)
                .map_err(tool_error)?,
        )
    }

    #[tool(description = "Get a recipe with its lines and pour cost")]
    fn get_recipe(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        match recipes::get_recipe(&self.database, p.id).map_err(tool_error)? {
            Some(detail) => json_result(&detail),
            None => not_found("Recipe", p.id),
        }
    }

    #[tool(description = "List recipes with optional name search and pagination")]
    fn list_recipes(&self, Parameters(p): Parameters<ListRecipesParams>) -> Result<CallToolResult, McpError> {
        json_result(&recipes::list_recipes(&self.database, p.query.as_deref(), p.limit, p.offset).map_err(tool_error)?)
    }

    #[tool(description = "Update a recipe's name, batch settings or notes")]
    fn update_recipe(&self, Parameters(p): Parameters<UpdateRecipeParams>) -> Result<CallToolResult, McpError> {
        let data = RecipeUpdate {
            name: p.name,
            batch_settings: p.batch_settings.map(Into::into),
            notes: p.notes,
        };
        match recipes::update_recipe(&self.database, p.id, data).map_err(tool_error)? {
            Some(detail) => json_result(&detail),
            None => not_found("Recipe", p.id),
        }
    }

    #[tool(description = "Delete a recipe and its lines")]
    fn delete_recipe(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let deleted = recipes::delete_recipe(&self.database, p.id).map_err(tool_error)?;
        json_result(&serde_json::json!({ "success": deleted, "deleted_id": p.id }))
    }

    #[tool(description = "Add an ingredient line to a recipe")]
    fn add_recipe_line(&self, Parameters(p): Parameters<AddRecipeLineParams>) -> Result<CallToolResult, McpError> {
        let line = RecipeLineInput { ingredient_name: p.ingredient_name, amount: p.amount, unit: p.unit };
        json_result(&recipes::add_recipe_line(&self.database, p.recipe_id, &line).map_err(tool_error)?)
    }

    #[tool(description = "Remove an ingredient line from a recipe")]
    fn remove_recipe_line(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let removed = recipes::remove_recipe_line(&self.database, p.id).map_err(tool_error)?;
        json_result(&serde_json::json!({ "success": removed, "deleted_id": p.id }))
    }

    // --- Menus ---

    #[tool(description = "Create a menu for an account")]
    fn create_menu(&self, Parameters(p): Parameters<CreateMenuParams>) -> Result<CallToolResult, McpError> {
        json_result(&recipes::create_menu(&self.database, p.account_id, &p.name).map_err(tool_error)?)
    }

    #[tool(description = "Add a recipe to the end of a menu")]
    fn add_recipe_to_menu(&self, Parameters(p): Parameters<MenuRecipeParams>) -> Result<CallToolResult, McpError> {
        let added = recipes::add_recipe_to_menu(&self.database, p.menu_id, p.recipe_id).map_err(tool_error)?;
        json_result(&serde_json::json!({ "added": added, "menu_id": p.menu_id, "recipe_id": p.recipe_id }))
    }

    #[tool(description = "Get a menu with its recipes in order")]
    fn get_menu(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        match recipes::get_menu(&self.database, p.id).map_err(tool_error)? {
            Some(detail) => json_result(&detail),
            None => not_found("Menu", p.id),
        }
    }

    #[tool(description = "List an account's menus")]
    fn list_menus(&self, Parameters(p): Parameters<AccountParams>) -> Result<CallToolResult, McpError> {
        json_result(&recipes::list_menus(&self.database, p.account_id).map_err(tool_error)?)
    }

    // --- Maintenance ---

    #[tool(description = "Recompute every ingredient's cost per unit from its purchase fields")]
    fn recalculate_costs(&self) -> Result<CallToolResult, McpError> {
        json_result(&maintenance::recalculate_costs(&self.database).map_err(tool_error)?)
    }

    #[tool(description = "List stored aliases, prep actions and batch settings that are not valid JSON for their type")]
    fn audit_json_fields(&self) -> Result<CallToolResult, McpError> {
        json_result(&maintenance::audit_json_fields(&self.database).map_err(tool_error)?)
    }
}

#[tool_handler]
impl ServerHandler for BarkeepService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "barkeep".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("Barkeep".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Barkeep - bar ingredient costing and inventory. \
                 IMPORTANT: Call inventory_instructions before stocking or counting inventory. \
                 Accounts: create_account/list_accounts. \
                 Ingredients: add/update/get/search/list_ingredient(s), find_duplicate_ingredients, merge_ingredients. \
                 Variants: add_variant/update_variant. \
                 Inventory: load_inventory_candidates, confirm_inventory_selection, list_inventory, set_reorder_point. \
                 Counts: record_count, get_item_history, create_inventory_report, list_reports, compare_reports. \
                 Import: preview_import (dry run), run_import. \
                 Recipes: create/get/list/update/delete_recipe, add/remove_recipe_line. \
                 Menus: create_menu, add_recipe_to_menu, get_menu, list_menus. \
                 Settings: get_settings/update_settings. Maintenance: recalculate_costs, audit_json_fields."
                    .into(),
            ),
        }
    }
}
