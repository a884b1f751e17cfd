//! Input validation for tool arguments.
//!
//! Tool arguments arrive from an LLM and are forwarded to a remote
//! service, so they are checked before any request is made:
//! - Service URLs must be plain http(s) endpoints without embedded credentials
//! - Layer URLs must end in a numeric layer id under a Feature/Map server
//! - Where clauses are length-limited and may not chain statements
//!
//! The remote service remains the authority on what a where clause means;
//! these checks only keep obviously malformed input off the wire.

use crate::error::ValidationError;
use reqwest::Url;

/// Longest where clause forwarded to a feature service.
pub const MAX_WHERE_LEN: usize = 2000;

/// Where clause selecting every feature.
pub const WHERE_ALL: &str = "1=1";

/// Validates and normalizes a portal or service URL.
///
/// Query string and fragment are dropped and a trailing `/` is removed, so
/// `https://host/arcgis/rest/services/X/FeatureServer/0/?f=pjson` becomes
/// `https://host/arcgis/rest/services/X/FeatureServer/0`.
///
/// # Example
///
/// ```
/// use arcgis_mcp::validate::validate_service_url;
///
/// let url = validate_service_url("https://services.arcgis.com/abc/FeatureServer/?f=json").unwrap();
/// assert_eq!(url, "https://services.arcgis.com/abc/FeatureServer");
///
/// assert!(validate_service_url("file:///etc/passwd").is_err());
/// assert!(validate_service_url("https://user:pw@host/FeatureServer").is_err());
/// ```
pub fn validate_service_url(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    let reject = |reason| ValidationError::ServiceUrl {
        url: trimmed.to_string(),
        reason,
    };

    let mut url = Url::parse(trimmed).map_err(|_| reject("not an absolute URL"))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(reject("only http and https are supported"));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(reject("missing host"));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(reject("credentials must not be embedded in the URL"));
    }

    url.set_query(None);
    url.set_fragment(None);

    let mut normalized = url.to_string();
    while normalized.ends_with('/') {
        normalized.pop();
    }
    Ok(normalized)
}

/// Validates a layer (or table) URL: `.../FeatureServer/<id>` or `.../MapServer/<id>`.
pub fn validate_layer_url(raw: &str) -> Result<String, ValidationError> {
    let normalized = validate_service_url(raw)?;

    let mut segments = normalized.rsplit('/');
    let layer_id = segments.next().unwrap_or_default();
    let server = segments.next().unwrap_or_default();

    let is_server = server.eq_ignore_ascii_case("FeatureServer")
        || server.eq_ignore_ascii_case("MapServer");

    if !is_server {
        return Err(ValidationError::ServiceUrl {
            url: raw.trim().to_string(),
            reason: "expected a layer URL ending in /FeatureServer/<layer id> or /MapServer/<layer id>",
        });
    }
    if layer_id.is_empty() || !layer_id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::ServiceUrl {
            url: raw.trim().to_string(),
            reason: "layer id must be numeric (e.g. append /0 to the service URL)",
        });
    }

    Ok(normalized)
}

/// Validates an optional where clause, defaulting to [`WHERE_ALL`].
pub fn validate_where(raw: Option<&str>) -> Result<String, ValidationError> {
    let clause = match raw.map(str::trim) {
        None => return Ok(WHERE_ALL.to_string()),
        Some(c) => c,
    };

    if clause.is_empty() {
        return Err(ValidationError::Where {
            reason: "clause is empty (omit it to select all features)",
        });
    }
    if clause.len() > MAX_WHERE_LEN {
        return Err(ValidationError::Where {
            reason: "clause exceeds 2000 characters",
        });
    }
    if clause.contains(';') {
        return Err(ValidationError::Where {
            reason: "statement separators are not allowed",
        });
    }
    if clause.contains("--") || clause.contains("/*") {
        return Err(ValidationError::Where {
            reason: "SQL comments are not allowed",
        });
    }

    Ok(clause.to_string())
}

/// Checks that a numeric argument lies within `min..=max`.
pub fn check_range(
    name: &'static str,
    value: usize,
    min: usize,
    max: usize,
) -> Result<usize, ValidationError> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::OutOfRange {
            name,
            value,
            min,
            max,
        })
    }
}
