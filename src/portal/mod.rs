//! Access to an ArcGIS portal and its hosted feature services.
//!
//! [`Portal`] is the seam between the tools and the network. The production
//! implementation is [`ArcGisClient`]; tests substitute an in-memory fake.

mod client;
pub mod models;

pub use client::ArcGisClient;
pub use models::{
    Feature, FeatureQuery, FeatureSet, Field, Item, LayerInfo, LayerRef, SearchPage,
    SearchRequest, ServiceInfo, SortOrder,
};

use crate::error::PortalResult;
use crate::types::ItemId;
use async_trait::async_trait;
use serde_json::Value;

/// Read-only operations against a portal and its feature services.
#[async_trait]
pub trait Portal: Send + Sync {
    /// Portal root URL, used in output text.
    fn portal_url(&self) -> &str;

    /// Runs a content search.
    async fn search(&self, request: &SearchRequest) -> PortalResult<SearchPage>;

    /// Fetches an item's description.
    async fn item(&self, id: &ItemId) -> PortalResult<Item>;

    /// Fetches an item's data resource (web map JSON, app config, ...).
    ///
    /// Returns `None` when the item has no JSON data.
    async fn item_data(&self, id: &ItemId) -> PortalResult<Option<Value>>;

    /// Fetches service root metadata (layer and table list).
    async fn service_info(&self, service_url: &str) -> PortalResult<ServiceInfo>;

    /// Fetches layer metadata (fields, geometry type).
    async fn layer_info(&self, layer_url: &str) -> PortalResult<LayerInfo>;

    /// Queries a layer's features without geometry.
    async fn query(&self, layer_url: &str, query: &FeatureQuery) -> PortalResult<FeatureSet>;

    /// Counts features matching a where clause.
    async fn count(&self, layer_url: &str, where_clause: &str) -> PortalResult<u64>;
}
