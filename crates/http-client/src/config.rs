//! Client configuration.
//!
//! A [`ClientConfig`] is built explicitly by the caller and handed to
//! [`HttpClient::with_config`](crate::client::HttpClient::with_config) or
//! [`Dispatcher::new`](crate::dispatch::Dispatcher::new). There is no process
//! wide configuration: two clients with different settings can live side by
//! side, and tests construct exactly what they need.
//!
//! Every field has a default, so a JSON document only has to name what it
//! changes:
//!
//! ```
//! use micro_http_client::config::{ClientConfig, HttpsPolicy};
//!
//! let config = ClientConfig::from_json(r#"{ "read_buffer_size": 8192, "https": "plaintext" }"#).unwrap();
//! assert_eq!(config.read_buffer_size, 8192);
//! assert_eq!(config.https, HttpsPolicy::Plaintext);
//! assert_eq!(config.default_content_type, "application/json");
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Size of one socket read
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4 * 1024;

/// Upper bound of the body attached to an `HTTP error`
pub const DEFAULT_MAX_ERROR_BODY: usize = 64 * 1024;

/// What to do with `https://` URLs, given that no TLS transport exists.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HttpsPolicy {
    /// Fail with `UnsupportedScheme`.
    #[default]
    Reject,
    /// Connect in plaintext to the https port and log a warning.
    Plaintext,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub read_buffer_size: usize,
    pub max_error_body: usize,
    pub connect_timeout_ms: Option<u64>,
    pub default_content_type: String,
    pub user_agent: Option<String>,
    pub https: HttpsPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_error_body: DEFAULT_MAX_ERROR_BODY,
            connect_timeout_ms: None,
            default_content_type: mime::APPLICATION_JSON.essence_str().to_string(),
            user_agent: None,
            https: HttpsPolicy::Reject,
        }
    }
}

impl ClientConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.filter(|ms| *ms > 0).map(Duration::from_millis)
    }

    /// The read size actually used; a configured zero falls back to the default.
    pub fn read_size(&self) -> usize {
        if self.read_buffer_size == 0 { DEFAULT_READ_BUFFER_SIZE } else { self.read_buffer_size }
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    pub fn with_https(mut self, https: HttpsPolicy) -> Self {
        self.https = https;
        self
    }

    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }
}
