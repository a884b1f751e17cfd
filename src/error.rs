//! Error types for arcgis-mcp.
//!
//! Uses thiserror for ergonomic error handling with proper
//! error chain propagation.

use thiserror::Error;

/// Top-level server error.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Portal error: {0}")]
    Portal(#[from] PortalError),

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors raised while talking to a portal or feature service.
#[derive(Error, Debug)]
pub enum PortalError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// ArcGIS reports most failures as HTTP 200 with an `error` envelope.
    #[error("ArcGIS error {code}: {message}")]
    Api {
        code: i64,
        message: String,
        details: Vec<String>,
    },

    #[error("Unexpected response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("Invalid URL '{url}': {reason}")]
    Url { url: String, reason: String },
}

/// Input validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("'{url}' is not a usable service URL: {reason}")]
    ServiceUrl { url: String, reason: &'static str },

    #[error("'{value}' is not a valid item id (expected 32 hex characters)")]
    ItemId { value: String },

    #[error("search query is empty: {hint}")]
    EmptyQuery { hint: &'static str },

    #[error("where clause rejected: {reason}")]
    Where { reason: &'static str },

    #[error("Field '{field}' not found. Available fields: {available}")]
    UnknownField { field: String, available: String },

    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: usize,
        min: usize,
        max: usize,
    },
}

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Result type alias for portal operations.
pub type PortalResult<T> = std::result::Result<T, PortalError>;

// Error code implementations for machine-readable error responses
impl ServerError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Portal(e) => e.code(),
            Self::Validation(e) => e.code(),
            Self::Config(_) => "CONFIG_ERROR",
        }
    }
}

impl PortalError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Http(_) => "HTTP_ERROR",
            Self::Status { .. } => "HTTP_STATUS",
            Self::Api { code: 498 | 499, .. } => "INVALID_TOKEN",
            Self::Api { code: 403, .. } => "FORBIDDEN",
            Self::Api { code: 400, .. } => "BAD_REQUEST",
            Self::Api { code: 404, .. } => "NOT_FOUND",
            Self::Api { .. } => "ARCGIS_ERROR",
            Self::Decode { .. } => "DECODE_ERROR",
            Self::Url { .. } => "INVALID_URL",
        }
    }
}

impl ValidationError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ServiceUrl { .. } => "INVALID_SERVICE_URL",
            Self::ItemId { .. } => "INVALID_ITEM_ID",
            Self::EmptyQuery { .. } => "EMPTY_QUERY",
            Self::Where { .. } => "INVALID_WHERE",
            Self::UnknownField { .. } => "UNKNOWN_FIELD",
            Self::OutOfRange { .. } => "OUT_OF_RANGE",
        }
    }
}

// Conversion to rmcp protocol errors
impl From<ServerError> for rmcp::ErrorData {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::Validation(e) => rmcp::ErrorData::invalid_params(e.to_string(), None),
            other => rmcp::ErrorData::internal_error(other.to_string(), None),
        }
    }
}
