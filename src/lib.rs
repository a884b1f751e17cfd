//! arcgis-mcp: MCP server for read-only ArcGIS discovery and analysis.
//!
//! This library exposes five tools to LLM clients:
//! - `search_layers`: find hosted feature services
//! - `search_content`: find any portal item
//! - `get_feature_table`: preview a layer's attributes as CSV
//! - `get_item_definition`: read an item's description and data JSON
//! - `summarize_field`: descriptive statistics for one field
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              MCP Server (rmcp)              │
//! │         JSON-RPC over stdin/stdout          │
//! └─────────────────┬───────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────┐
//! │               Tool Router                    │
//! │  search_layers, search_content, table, ...  │
//! └───────┬─────────────────────────┬───────────┘
//!         │                         │
//! ┌───────▼────────┐       ┌────────▼──────────┐
//! │  Portal trait  │       │  fmt + services   │
//! │ (ArcGisClient) │       │ (text, CSV, stats)│
//! └───────┬────────┘       └───────────────────┘
//!         │
//! ┌───────▼──────────────────────────────────────┐
//! │   ArcGIS sharing API / feature services      │
//! │            (reqwest, f=json)                 │
//! └──────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod fmt;
pub mod portal;
pub mod server;
pub mod services;
pub mod tools;
pub mod types;
pub mod validate;

pub use config::Config;
pub use error::{Result, ServerError};
pub use portal::{ArcGisClient, Portal};
pub use server::ArcGisServer;
pub use types::{FieldType, ItemId};
