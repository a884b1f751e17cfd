//! Runtime configuration for the portal client.
//!
//! Values come from CLI flags with `ARCGIS_*` environment fallbacks (see
//! `main.rs`); a `.env` file in the working directory is loaded first so
//! credentials can live next to the MCP client configuration.

use crate::error::{Result, ServerError};
use crate::validate;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default portal: ArcGIS Online.
pub const DEFAULT_PORTAL_URL: &str = "https://www.arcgis.com";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client configuration shared by every tool.
#[derive(Clone)]
pub struct Config {
    /// Portal root, e.g. `https://www.arcgis.com` or `https://gis.example.com/portal`.
    pub portal_url: String,
    /// Pre-issued token or API key appended to every request.
    pub token: Option<String>,
    /// Referer header for referer-bound tokens.
    pub referer: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Config {
    /// Builds a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if the portal URL is unusable or the
    /// timeout is zero.
    pub fn new(
        portal_url: &str,
        token: Option<String>,
        referer: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let portal_url = validate::validate_service_url(portal_url)
            .map_err(|e| ServerError::Config(e.to_string()))?;

        if timeout_secs == 0 {
            return Err(ServerError::Config(
                "timeout must be at least 1 second".to_string(),
            ));
        }

        Ok(Self {
            portal_url,
            token: token.filter(|t| !t.trim().is_empty()),
            referer: referer.filter(|r| !r.trim().is_empty()),
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Whether requests will carry a token.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            portal_url: DEFAULT_PORTAL_URL.to_string(),
            token: None,
            referer: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

// Token stays out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("portal_url", &self.portal_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("referer", &self.referer)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Loads `.env` from `path` if given, otherwise searches the working directory
/// and its parents. A missing file is not an error.
///
/// Runs before logging is set up, so the loaded path is returned for the
/// caller to log.
///
/// # Errors
///
/// Returns `ServerError::Config` if a file exists but cannot be parsed.
pub fn load_dotenv(path: Option<&Path>) -> Result<Option<PathBuf>> {
    let loaded = match path {
        Some(p) => dotenvy::from_path(p).map(|()| p.to_path_buf()),
        None => dotenvy::dotenv(),
    };

    match loaded {
        Ok(p) => Ok(Some(p)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(ServerError::Config(format!("failed to load .env: {e}"))),
    }
}
