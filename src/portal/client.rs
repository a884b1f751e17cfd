//! reqwest-backed [`Portal`] implementation.

use super::models::{
    CountResponse, FeatureQuery, FeatureSet, Item, LayerInfo, SearchPage, SearchRequest,
    ServiceInfo,
};
use super::Portal;
use crate::config::Config;
use crate::error::{PortalError, PortalResult};
use crate::types::ItemId;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Longest slice of an unexpected response body kept in error messages.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// HTTP client for an ArcGIS portal and the feature services it references.
pub struct ArcGisClient {
    http: Client,
    config: Config,
}

impl ArcGisClient {
    /// Creates a client from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `PortalError::Http` if the TLS backend cannot be initialized,
    /// or `PortalError::Url` if the referer is not a valid header value.
    pub fn new(config: Config) -> PortalResult<Self> {
        let mut headers = HeaderMap::new();
        if let Some(referer) = &config.referer {
            let value = HeaderValue::from_str(referer).map_err(|e| PortalError::Url {
                url: referer.clone(),
                reason: e.to_string(),
            })?;
            headers.insert(REFERER, value);
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("arcgis-mcp/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        Ok(Self { http, config })
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn sharing_url(&self, path: &str) -> String {
        sharing_url(&self.config.portal_url, path)
    }

    /// Issues a GET with `f=json` (and the token, if any) and returns the raw body.
    async fn get_text(&self, url: &str, params: &[(&str, String)]) -> PortalResult<String> {
        tracing::debug!(url, ?params, "GET");

        let mut request = self.http.get(url).query(params).query(&[("f", "json")]);
        if let Some(token) = &self.config.token {
            request = request.query(&[("token", token.as_str())]);
        }

        // reqwest errors embed the request URL, which carries the token.
        let response = request.send().await.map_err(reqwest::Error::without_url)?;
        let status = response.status();
        let body = response.text().await.map_err(reqwest::Error::without_url)?;

        if !status.is_success() {
            tracing::warn!(url, status = status.as_u16(), "request failed");
            return Err(PortalError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        Ok(body)
    }

    /// GETs a JSON document, unwrapping the ArcGIS error envelope.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> PortalResult<T> {
        let body = self.get_text(url, params).await?;
        let value: Value = serde_json::from_str(&body).map_err(|_| PortalError::Decode {
            url: url.to_string(),
            reason: format!("expected JSON, got: {}", truncate_body(&body)),
        })?;
        check_api_error(&value)?;
        serde_json::from_value(value).map_err(|e| PortalError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl Portal for ArcGisClient {
    fn portal_url(&self) -> &str {
        &self.config.portal_url
    }

    async fn search(&self, request: &SearchRequest) -> PortalResult<SearchPage> {
        let mut params = vec![
            ("q", request.q.clone()),
            ("num", request.num.to_string()),
            ("start", "1".to_string()),
        ];
        if let Some(field) = &request.sort_field {
            params.push(("sortField", field.clone()));
        }
        if let Some(order) = request.sort_order {
            params.push(("sortOrder", order.as_str().to_string()));
        }
        self.get_json(&self.sharing_url("search"), &params).await
    }

    async fn item(&self, id: &ItemId) -> PortalResult<Item> {
        let url = self.sharing_url(&format!("content/items/{id}"));
        self.get_json(&url, &[]).await
    }

    async fn item_data(&self, id: &ItemId) -> PortalResult<Option<Value>> {
        let url = self.sharing_url(&format!("content/items/{id}/data"));
        let body = self.get_text(&url, &[]).await?;
        parse_item_data(&body)
    }

    async fn service_info(&self, service_url: &str) -> PortalResult<ServiceInfo> {
        self.get_json(service_url, &[]).await
    }

    async fn layer_info(&self, layer_url: &str) -> PortalResult<LayerInfo> {
        self.get_json(layer_url, &[]).await
    }

    async fn query(&self, layer_url: &str, query: &FeatureQuery) -> PortalResult<FeatureSet> {
        let mut params = vec![
            ("where", query.where_clause.clone()),
            ("outFields", query.out_fields_param()),
            ("returnGeometry", "false".to_string()),
            ("resultRecordCount", query.result_record_count.to_string()),
        ];
        if let Some(order_by) = &query.order_by {
            params.push(("orderByFields", order_by.clone()));
        }
        self.get_json(&format!("{layer_url}/query"), &params).await
    }

    async fn count(&self, layer_url: &str, where_clause: &str) -> PortalResult<u64> {
        let params = [
            ("where", where_clause.to_string()),
            ("returnCountOnly", "true".to_string()),
        ];
        let response: CountResponse = self
            .get_json(&format!("{layer_url}/query"), &params)
            .await?;
        Ok(response.count)
    }
}

/// Builds a sharing API URL under the portal root.
fn sharing_url(portal_url: &str, path: &str) -> String {
    format!("{}/sharing/rest/{}", portal_url.trim_end_matches('/'), path)
}

/// Maps the `{"error": {...}}` envelope to `PortalError::Api`.
fn check_api_error(value: &Value) -> PortalResult<()> {
    let Some(error) = value.get("error").filter(|e| e.is_object()) else {
        return Ok(());
    };

    let code = error.get("code").and_then(Value::as_i64).unwrap_or(500);
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("Unknown error")
        .to_string();
    let details = error
        .get("details")
        .and_then(Value::as_array)
        .map(|d| {
            d.iter()
                .filter_map(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    tracing::warn!(code, %message, "ArcGIS API error");
    Err(PortalError::Api {
        code,
        message,
        details,
    })
}

/// Item data may be absent (empty body) or a non-JSON file.
fn parse_item_data(body: &str) -> PortalResult<Option<Value>> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    match serde_json::from_str::<Value>(body) {
        Ok(value) => {
            check_api_error(&value)?;
            Ok(Some(value))
        }
        Err(_) => Ok(None),
    }
}

fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_ERROR_BODY_CHARS {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
    out.push_str("...");
    out
}
