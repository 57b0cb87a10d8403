//! Barkeep Library
//!
//! Ingredient costing, duplicate detection and inventory reconciliation
//! for bars.

pub mod build_info;
pub mod config;
pub mod costing;
pub mod db;
pub mod dedupe;
pub mod mcp;
pub mod models;
pub mod stock;
pub mod tools;
