//! Portal search tools: feature layers and general content.

use crate::error::{Result, ValidationError};
use crate::portal::{Item, Portal, SearchRequest, SortOrder};
use crate::validate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Item type that backs hosted feature layers.
const FEATURE_SERVICE_TYPE: &str = "Feature Service";

/// Upper bound on results per search.
pub const MAX_SEARCH_RESULTS: usize = 100;

fn default_max_results() -> usize {
    10
}

/// Input for the search_layers tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchLayersInput {
    /// Search terms, e.g. 'county boundaries' or 'tags:hydrology'. Empty lists all feature services.
    #[serde(default)]
    pub query: String,
    /// Maximum results (1-100, default: 10)
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Also fetch each service's layer list and print layer URLs (one extra request per result)
    #[serde(default)]
    pub include_layers: bool,
}

/// Output for the search_layers tool.
#[derive(Debug, Serialize)]
pub struct SearchLayersOutput {
    pub query: String,
    pub total: u64,
    pub has_more: bool,
    pub services: Vec<ServiceResult>,
}

/// A feature service found by search_layers.
#[derive(Debug, Serialize)]
pub struct ServiceResult {
    pub title: String,
    pub id: String,
    pub owner: String,
    pub url: Option<String>,
    /// Populated when `include_layers` was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layers: Option<LayerListing>,
}

/// Result of listing one service's layers.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerListing {
    Layers(Vec<LayerEntry>),
    Unavailable(String),
}

/// A layer or table within a service.
#[derive(Debug, Serialize)]
pub struct LayerEntry {
    pub url: String,
    pub name: String,
    /// `None` for tables.
    pub geometry_type: Option<String>,
}

/// Builds the portal query restricting results to feature services.
#[must_use]
pub fn layer_search_query(query: &str) -> String {
    let query = query.trim();
    if query.is_empty() {
        format!("type:\"{FEATURE_SERVICE_TYPE}\"")
    } else {
        format!("({query}) AND type:\"{FEATURE_SERVICE_TYPE}\"")
    }
}

/// Executes the search_layers tool.
///
/// # Errors
///
/// Returns a `ServerError` if arguments are invalid or the search request fails.
/// Failure to list one service's layers is reported inline instead.
pub async fn execute_search_layers(
    portal: &dyn Portal,
    input: SearchLayersInput,
) -> Result<SearchLayersOutput> {
    let max_results =
        validate::check_range("max_results", input.max_results, 1, MAX_SEARCH_RESULTS)?;

    let request = SearchRequest::new(layer_search_query(&input.query), max_results);
    let page = portal.search(&request).await?;
    tracing::debug!(total = page.total, returned = page.results.len(), "layer search");

    let mut services = Vec::with_capacity(page.results.len());
    for item in &page.results {
        let layers = if input.include_layers {
            Some(list_layers(portal, item.url.as_deref()).await)
        } else {
            None
        };
        services.push(ServiceResult {
            title: item.title.clone(),
            id: item.id.clone(),
            owner: item.owner.clone(),
            url: item.url.clone(),
            layers,
        });
    }

    Ok(SearchLayersOutput {
        query: input.query,
        total: page.total,
        has_more: page.has_more(),
        services,
    })
}

async fn list_layers(portal: &dyn Portal, url: Option<&str>) -> LayerListing {
    let Some(raw) = url else {
        return LayerListing::Unavailable("item has no service URL".to_string());
    };
    let service_url = match validate::validate_service_url(raw) {
        Ok(u) => u,
        Err(e) => return LayerListing::Unavailable(e.to_string()),
    };

    match portal.service_info(&service_url).await {
        Ok(info) => {
            let entries = info
                .layers
                .into_iter()
                .chain(info.tables)
                .map(|l| LayerEntry {
                    url: format!("{service_url}/{}", l.id),
                    name: l.name,
                    geometry_type: l.geometry_type,
                })
                .collect();
            LayerListing::Layers(entries)
        }
        Err(e) => {
            tracing::debug!(%service_url, error = %e, "service info unavailable");
            LayerListing::Unavailable(e.to_string())
        }
    }
}

/// Input for the search_content tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchContentInput {
    /// Search terms (portal search syntax), e.g. 'wildfire perimeters'
    #[serde(default)]
    pub query: String,
    /// Restrict to an item type, e.g. 'Web Map', 'Feature Service', 'CSV'
    #[serde(default)]
    pub item_type: Option<String>,
    /// Restrict to items owned by this username
    #[serde(default)]
    pub owner: Option<String>,
    /// Maximum results (1-100, default: 10)
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Sort field: title, created, modified, numviews, avgrating
    #[serde(default)]
    pub sort_field: Option<String>,
    /// Sort order: asc or desc
    #[serde(default)]
    pub sort_order: Option<SortOrder>,
}

/// Output for the search_content tool.
#[derive(Debug, Serialize)]
pub struct SearchContentOutput {
    pub query: String,
    pub total: u64,
    pub has_more: bool,
    pub items: Vec<Item>,
}

/// Builds the portal query for content search.
///
/// # Errors
///
/// Returns `ValidationError::EmptyQuery` when neither terms nor filters are given.
pub fn content_search_query(
    query: &str,
    item_type: Option<&str>,
    owner: Option<&str>,
) -> std::result::Result<String, ValidationError> {
    let mut clauses = Vec::new();

    let query = query.trim();
    if !query.is_empty() {
        clauses.push(format!("({query})"));
    }
    if let Some(t) = item_type.map(str::trim).filter(|t| !t.is_empty()) {
        clauses.push(format!("type:\"{}\"", t.replace('"', "")));
    }
    if let Some(o) = owner.map(str::trim).filter(|o| !o.is_empty()) {
        clauses.push(format!("owner:{}", o.replace([' ', '"'], "")));
    }

    match clauses.len() {
        0 => Err(ValidationError::EmptyQuery {
            hint: "provide search terms, an item_type or an owner",
        }),
        // A single bare term group needs no parentheses.
        1 if !query.is_empty() => Ok(query.to_string()),
        _ => Ok(clauses.join(" AND ")),
    }
}

/// Executes the search_content tool.
///
/// # Errors
///
/// Returns a `ServerError` if arguments are invalid or the search request fails.
pub async fn execute_search_content(
    portal: &dyn Portal,
    input: SearchContentInput,
) -> Result<SearchContentOutput> {
    let max_results =
        validate::check_range("max_results", input.max_results, 1, MAX_SEARCH_RESULTS)?;
    let q = content_search_query(
        &input.query,
        input.item_type.as_deref(),
        input.owner.as_deref(),
    )?;

    let mut request = SearchRequest::new(q, max_results);
    request.sort_field = input
        .sort_field
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty());
    request.sort_order = input.sort_order;

    let page = portal.search(&request).await?;
    tracing::debug!(total = page.total, returned = page.results.len(), "content search");

    Ok(SearchContentOutput {
        query: input.query,
        total: page.total,
        has_more: page.has_more(),
        items: page.results,
    })
}
