//! Application configuration.
//!
//! Values come from the environment (a `.env` file is loaded first when
//! present). CLI flags override them field by field.

use std::env;

use crate::error::ConfigError;

/// Remote publishing API base. `/posts` is appended per request.
pub const DEFAULT_API_BASE: &str = "https://api.yextapis.com/v2/accounts/me";

/// Default HTTP server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Maximum accepted upload size for the HTTP server (in bytes).
///
/// 10 MB limit.
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Spreadsheet template users fill in before uploading.
pub const TEMPLATE_URL: &str =
    "https://docs.google.com/spreadsheets/d/1MTcZ5hbNIje7YvAMBEr7wxnhmEVqL9H1BUlKjUlHRWc/edit?usp=sharing";

const ENV_API_KEY: &str = "BULKPOST_API_KEY";
const ENV_API_BASE: &str = "BULKPOST_API_BASE";
const ENV_FORWARDING_PREFIX: &str = "BULKPOST_FORWARDING_PREFIX";
const ENV_PORT: &str = "BULKPOST_PORT";

/// Where requests go.
///
/// The forwarding prefix is prepended verbatim to the full target URL, the
/// way cross-origin relays such as `https://corsproxy.io/?` expect it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub forwarding_prefix: String,
    pub api_base: String,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            forwarding_prefix: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

impl Endpoint {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            forwarding_prefix: String::new(),
            api_base: api_base.into(),
        }
    }

    pub fn with_forwarding_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.forwarding_prefix = prefix.into();
        self
    }

    /// Full URL for creating posts with the given credential and version token.
    pub fn posts_url(&self, api_key: &str, version: &str) -> String {
        format!(
            "{}{}/posts?api_key={}&v={}",
            self.forwarding_prefix,
            self.api_base.trim_end_matches('/'),
            api_key,
            version
        )
    }
}

/// Runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Default credential, used when none is passed explicitly.
    pub api_key: Option<String>,
    pub endpoint: Endpoint,
    pub port: u16,
}

impl Settings {
    /// Load settings from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup(ENV_API_KEY).filter(|k| !k.is_empty());
        let api_base = lookup(ENV_API_BASE).unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let forwarding_prefix = lookup(ENV_FORWARDING_PREFIX).unwrap_or_default();

        let port = match lookup(ENV_PORT) {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidVar {
                name: ENV_PORT,
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            api_key,
            endpoint: Endpoint {
                forwarding_prefix,
                api_base,
            },
            port,
        })
    }
}
