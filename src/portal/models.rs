//! Serde models for the ArcGIS sharing and feature service REST responses.
//!
//! Only the fields the tools read are modelled; everything is lenient so
//! that older servers and partially populated items still decode.

use crate::types::FieldType;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Treats an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// A portal content item (`/sharing/rest/content/items/{id}` and search results).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Item {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub owner: String,
    pub url: Option<String>,
    pub snippet: Option<String>,
    pub description: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub type_keywords: Vec<String>,
    /// Epoch milliseconds.
    pub created: Option<i64>,
    /// Epoch milliseconds.
    pub modified: Option<i64>,
    pub num_views: Option<u64>,
    pub access: Option<String>,
    /// Every other item property, kept so definitions round-trip in full.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One page of `/sharing/rest/search` results.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchPage {
    pub total: u64,
    pub start: i64,
    pub num: u64,
    /// `-1` when there are no further pages.
    pub next_start: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub results: Vec<Item>,
}

impl SearchPage {
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.next_start > 0
    }
}

/// Portal search parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub q: String,
    pub num: usize,
    pub sort_field: Option<String>,
    pub sort_order: Option<SortOrder>,
}

impl SearchRequest {
    #[must_use]
    pub fn new(q: impl Into<String>, num: usize) -> Self {
        Self {
            q: q.into(),
            num,
            sort_field: None,
            sort_order: None,
        }
    }
}

/// Sort direction accepted by the search endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Reference to a layer or table in a service's root metadata.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayerRef {
    pub id: i64,
    pub name: String,
    pub geometry_type: Option<String>,
}

/// Service root metadata (`.../FeatureServer?f=json`).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceInfo {
    pub service_description: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub layers: Vec<LayerRef>,
    #[serde(deserialize_with = "null_as_default")]
    pub tables: Vec<LayerRef>,
}

/// A field definition in layer metadata.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub alias: Option<String>,
}

/// Layer or table metadata (`.../FeatureServer/0?f=json`).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayerInfo {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub layer_type: Option<String>,
    pub geometry_type: Option<String>,
    pub description: Option<String>,
    pub object_id_field: Option<String>,
    pub max_record_count: Option<u64>,
    #[serde(deserialize_with = "null_as_default")]
    pub fields: Vec<Field>,
}

impl LayerInfo {
    /// Case-insensitive field lookup.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .or_else(|| self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name)))
    }

    /// Comma-separated field names, for error messages.
    #[must_use]
    pub fn field_names(&self) -> String {
        self.fields
            .iter()
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Parameters for a layer `/query` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureQuery {
    pub where_clause: String,
    /// `None` requests `*`.
    pub out_fields: Option<Vec<String>>,
    pub result_record_count: usize,
    pub order_by: Option<String>,
}

impl FeatureQuery {
    #[must_use]
    pub fn new(where_clause: impl Into<String>, result_record_count: usize) -> Self {
        Self {
            where_clause: where_clause.into(),
            out_fields: None,
            result_record_count,
            order_by: None,
        }
    }

    #[must_use]
    pub fn with_out_fields(mut self, fields: Vec<String>) -> Self {
        self.out_fields = Some(fields);
        self
    }

    /// The `outFields` request parameter.
    #[must_use]
    pub fn out_fields_param(&self) -> String {
        match &self.out_fields {
            Some(fields) if !fields.is_empty() => fields.join(","),
            _ => "*".to_string(),
        }
    }
}

/// A single feature; geometry is never requested.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Feature {
    pub attributes: Map<String, Value>,
}

/// `/query` response.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeatureSet {
    #[serde(deserialize_with = "null_as_default")]
    pub features: Vec<Feature>,
    pub exceeded_transfer_limit: bool,
}

/// `returnCountOnly=true` response.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct CountResponse {
    pub count: u64,
}
