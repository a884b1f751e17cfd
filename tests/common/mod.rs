//! Common test utilities for arcgis-mcp integration tests.
//!
//! Provides `FakePortal`, an in-memory `Portal` with a small parcels layer,
//! a couple of portal items and a search index, plus knobs for simulating
//! ArcGIS failures.

#![allow(dead_code)] // Test utilities may not all be used in every test file

use arcgis_mcp::error::{PortalError, PortalResult};
use arcgis_mcp::portal::{
    Feature, FeatureQuery, FeatureSet, Item, LayerInfo, SearchPage, SearchRequest, ServiceInfo,
};
use arcgis_mcp::{ItemId, Portal};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

pub const PORTAL_URL: &str = "https://example.maps.arcgis.com";
pub const SERVICE_URL: &str = "https://services.example.com/arcgis/rest/services/Parcels/FeatureServer";
pub const LAYER_URL: &str = "https://services.example.com/arcgis/rest/services/Parcels/FeatureServer/0";
pub const SERVICE_ITEM_ID: &str = "0123456789abcdef0123456789abcdef";
pub const WEBMAP_ITEM_ID: &str = "fedcba9876543210fedcba9876543210";

/// In-memory portal backed by fixture JSON.
pub struct FakePortal {
    pub layers: HashMap<String, LayerInfo>,
    pub features: HashMap<String, Vec<Feature>>,
    pub services: HashMap<String, ServiceInfo>,
    pub items: HashMap<String, Item>,
    pub item_data: HashMap<String, Value>,
    pub search_results: Vec<Item>,
    pub search_total: u64,
    /// Service-side record cap; queries asking for more are cut and flagged.
    pub max_record_count: usize,
    /// Every call fails with this ArcGIS error envelope.
    pub api_error: Option<(i64, String)>,
    pub count_fails: bool,
    pub searches: Mutex<Vec<SearchRequest>>,
    pub queries: Mutex<Vec<FeatureQuery>>,
    pub counts: Mutex<Vec<String>>,
}

impl FakePortal {
    /// Creates a portal with no content.
    pub fn empty() -> Self {
        Self {
            layers: HashMap::new(),
            features: HashMap::new(),
            services: HashMap::new(),
            items: HashMap::new(),
            item_data: HashMap::new(),
            search_results: Vec::new(),
            search_total: 0,
            max_record_count: 1000,
            api_error: None,
            count_fails: false,
            searches: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
            counts: Mutex::new(Vec::new()),
        }
    }

    /// Creates a portal with the parcels service, its item and a web map.
    pub fn new() -> Self {
        let mut portal = Self::empty();

        portal
            .layers
            .insert(LAYER_URL.to_string(), parcels_layer());
        portal
            .features
            .insert(LAYER_URL.to_string(), parcels_features());
        portal.services.insert(
            SERVICE_URL.to_string(),
            serde_json::from_value(json!({
                "serviceDescription": "County parcels",
                "layers": [{"id": 0, "name": "Parcels", "geometryType": "esriGeometryPolygon"}],
                "tables": [{"id": 1, "name": "Sales"}]
            }))
            .expect("service fixture"),
        );

        let service_item = service_item();
        let webmap_item = webmap_item();
        portal
            .items
            .insert(SERVICE_ITEM_ID.to_string(), service_item.clone());
        portal
            .items
            .insert(WEBMAP_ITEM_ID.to_string(), webmap_item.clone());
        portal.item_data.insert(
            WEBMAP_ITEM_ID.to_string(),
            json!({
                "operationalLayers": [{"title": "Parcels", "url": LAYER_URL}],
                "baseMap": {"title": "Topographic"}
            }),
        );

        portal.search_results = vec![service_item, webmap_item];
        portal.search_total = 2;
        portal
    }

    /// Fails every call with an ArcGIS error envelope.
    pub fn failing(code: i64, message: &str) -> Self {
        let mut portal = Self::new();
        portal.api_error = Some((code, message.to_string()));
        portal
    }

    pub fn last_search(&self) -> Option<SearchRequest> {
        self.searches.lock().unwrap().last().cloned()
    }

    pub fn last_query(&self) -> Option<FeatureQuery> {
        self.queries.lock().unwrap().last().cloned()
    }

    pub fn count_calls(&self) -> usize {
        self.counts.lock().unwrap().len()
    }

    fn check(&self) -> PortalResult<()> {
        match &self.api_error {
            Some((code, message)) => Err(PortalError::Api {
                code: *code,
                message: message.clone(),
                details: vec!["Fake portal failure".to_string()],
            }),
            None => Ok(()),
        }
    }

    fn not_found(what: &str) -> PortalError {
        PortalError::Api {
            code: 400,
            message: format!("{what} does not exist or is inaccessible."),
            details: Vec::new(),
        }
    }
}

impl Default for FakePortal {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Portal for FakePortal {
    fn portal_url(&self) -> &str {
        PORTAL_URL
    }

    async fn search(&self, request: &SearchRequest) -> PortalResult<SearchPage> {
        self.searches.lock().unwrap().push(request.clone());
        self.check()?;

        let results: Vec<Item> = self
            .search_results
            .iter()
            .take(request.num)
            .cloned()
            .collect();
        let num = results.len() as u64;
        let next_start = if num < self.search_total {
            num as i64 + 1
        } else {
            -1
        };
        Ok(SearchPage {
            total: self.search_total,
            start: 1,
            num,
            next_start,
            results,
        })
    }

    async fn item(&self, id: &ItemId) -> PortalResult<Item> {
        self.check()?;
        self.items
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| Self::not_found("Item"))
    }

    async fn item_data(&self, id: &ItemId) -> PortalResult<Option<Value>> {
        self.check()?;
        Ok(self.item_data.get(id.as_str()).cloned())
    }

    async fn service_info(&self, service_url: &str) -> PortalResult<ServiceInfo> {
        self.check()?;
        self.services
            .get(service_url)
            .cloned()
            .ok_or_else(|| Self::not_found("Service"))
    }

    async fn layer_info(&self, layer_url: &str) -> PortalResult<LayerInfo> {
        self.check()?;
        self.layers
            .get(layer_url)
            .cloned()
            .ok_or_else(|| Self::not_found("Layer"))
    }

    async fn query(&self, layer_url: &str, query: &FeatureQuery) -> PortalResult<FeatureSet> {
        self.queries.lock().unwrap().push(query.clone());
        self.check()?;

        let all = self
            .features
            .get(layer_url)
            .ok_or_else(|| Self::not_found("Layer"))?;
        let limit = query.result_record_count.min(self.max_record_count);

        let features = all
            .iter()
            .take(limit)
            .map(|f| match &query.out_fields {
                Some(fields) => Feature {
                    attributes: f
                        .attributes
                        .iter()
                        .filter(|(k, _)| fields.iter().any(|n| n.eq_ignore_ascii_case(k)))
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                },
                None => f.clone(),
            })
            .collect();

        Ok(FeatureSet {
            features,
            exceeded_transfer_limit: all.len() > self.max_record_count
                && query.result_record_count > self.max_record_count,
        })
    }

    async fn count(&self, layer_url: &str, where_clause: &str) -> PortalResult<u64> {
        self.counts.lock().unwrap().push(where_clause.to_string());
        self.check()?;
        if self.count_fails {
            return Err(PortalError::Status {
                status: 500,
                body: "count unavailable".to_string(),
            });
        }
        Ok(self.features.get(layer_url).map_or(0, |f| f.len() as u64))
    }
}

/// Parcels layer metadata: OID, geometry, text, numeric and date fields.
pub fn parcels_layer() -> LayerInfo {
    serde_json::from_value(json!({
        "id": 0,
        "name": "Parcels",
        "type": "Feature Layer",
        "geometryType": "esriGeometryPolygon",
        "objectIdField": "OBJECTID",
        "maxRecordCount": 1000,
        "fields": [
            {"name": "OBJECTID", "type": "esriFieldTypeOID", "alias": "Object ID"},
            {"name": "Shape", "type": "esriFieldTypeGeometry"},
            {"name": "OWNER", "type": "esriFieldTypeString", "alias": "Owner"},
            {"name": "ZONING", "type": "esriFieldTypeString"},
            {"name": "ACRES", "type": "esriFieldTypeDouble"},
            {"name": "SALE_DATE", "type": "esriFieldTypeDate"}
        ]
    }))
    .expect("layer fixture")
}

/// Five parcels. ACRES: 1.5, 2, 2, null, 4.5. ZONING: R1 x3, C2, null.
pub fn parcels_features() -> Vec<Feature> {
    let rows = [
        json!({"OBJECTID": 1, "OWNER": "Smith, J", "ZONING": "R1", "ACRES": 1.5, "SALE_DATE": 1_577_836_800_000_i64}),
        json!({"OBJECTID": 2, "OWNER": "Lee", "ZONING": "R1", "ACRES": 2, "SALE_DATE": 1_583_020_800_000_i64}),
        json!({"OBJECTID": 3, "OWNER": "O\"Brien", "ZONING": "C2", "ACRES": 2.0, "SALE_DATE": null}),
        json!({"OBJECTID": 4, "OWNER": null, "ZONING": "R1", "ACRES": null, "SALE_DATE": 1_609_459_200_000_i64}),
        json!({"OBJECTID": 5, "OWNER": "Park", "ZONING": null, "ACRES": 4.5, "SALE_DATE": null}),
    ];
    rows.into_iter()
        .map(|attributes| {
            serde_json::from_value(json!({ "attributes": attributes })).expect("feature fixture")
        })
        .collect()
}

pub fn service_item() -> Item {
    serde_json::from_value(json!({
        "id": SERVICE_ITEM_ID,
        "title": "County Parcels",
        "type": "Feature Service",
        "owner": "county_gis",
        "url": SERVICE_URL,
        "snippet": "Tax parcels for the county",
        "tags": ["parcels", "cadastral"],
        "created": 1_577_836_800_000_i64,
        "modified": 1_609_459_200_000_i64,
        "numViews": 1234,
        "access": "public"
    }))
    .expect("item fixture")
}

pub fn webmap_item() -> Item {
    serde_json::from_value(json!({
        "id": WEBMAP_ITEM_ID,
        "title": "Parcel Viewer",
        "type": "Web Map",
        "owner": "county_gis",
        "snippet": "Parcels over a topographic basemap",
        "tags": ["parcels"],
        "modified": 1_609_459_200_000_i64,
        "access": "public"
    }))
    .expect("item fixture")
}
