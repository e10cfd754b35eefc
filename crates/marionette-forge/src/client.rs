//! HTTP client for the Forge v3 API.

use crate::error::{ForgeError, Result};
use crate::types::{ModuleData, ReleaseData};
use marionette_core::Slug;
use semver::Version;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default public Forge endpoint.
pub const DEFAULT_FORGE_URL: &str = "https://forgeapi.puppetlabs.com";

/// Forge client configuration.
#[derive(Debug, Clone)]
pub struct ForgeClientConfig {
    /// Request timeout.
    pub timeout: Duration,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// User agent string.
    pub user_agent: String,
}

impl Default for ForgeClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("Marionette/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Client for one Forge endpoint.
///
/// Requests are not retried: a transport failure surfaces as
/// [`ForgeError::Unavailable`] and aborts the resolution.
#[derive(Debug, Clone)]
pub struct ForgeClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl ForgeClient {
    /// Create a client for the given endpoint with default configuration.
    pub fn new(endpoint: Url) -> Result<Self> {
        Self::with_config(endpoint, ForgeClientConfig::default())
    }

    /// Create a client with custom configuration.
    pub fn with_config(endpoint: Url, config: ForgeClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent)
            .gzip(true)
            .build()
            .map_err(|e| ForgeError::InvalidConfig {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self { http, endpoint })
    }

    /// The endpoint this client talks to.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Fetch the module record for a slug.
    pub async fn module(&self, slug: &Slug) -> Result<ModuleData> {
        self.get(&format!("v3/modules/{slug}")).await
    }

    /// Fetch one release record for a slug and version.
    pub async fn release(&self, slug: &Slug, version: &Version) -> Result<ReleaseData> {
        self.get(&format!("v3/releases/{slug}-{version}")).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}/{path}", self.endpoint.as_str().trim_end_matches('/'));
        debug!(url = %url, "forge request");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| ForgeError::Unavailable {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ForgeError::Status {
                url,
                status: status.as_u16(),
            });
        }

        response.json().await.map_err(|e| ForgeError::Decode {
            url,
            reason: e.to_string(),
        })
    }
}
