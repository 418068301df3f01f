//! Client and provider configuration.
//!
//! [`ClientConfig`] is the immutable value every stream client call reads from.
//! It is built once from the provider configuration block ([`ProviderConfig`])
//! and never changed afterwards; a client for a different API version is made
//! by deriving a new value with [`ClientConfig::to_v7`].

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default v6 API endpoint, as used by the rest of the ThousandEyes provider.
pub const DEFAULT_API_ENDPOINT: &str = "https://api.thousandeyes.com/v6";

/// User agent sent on every request.
pub const USER_AGENT: &str = concat!("thousandeyes-stream-provider/", env!("CARGO_PKG_VERSION"));

/// Environment variable holding the bearer token.
pub const ENV_TOKEN: &str = "TE_TOKEN";

/// Environment variable holding the account group id.
pub const ENV_ACCOUNT_GROUP_ID: &str = "TE_AID";

/// Environment variable overriding the API endpoint.
pub const ENV_API_ENDPOINT: &str = "TE_API_ENDPOINT";

/// Settings for the outbound request rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Maximum number of requests allowed per period
    pub max_requests: u32,
    /// Length of the period in seconds
    pub period_seconds: u64,
    /// Requests that may be made back to back before waiting starts
    pub burst_size: u32,
}

impl Default for RateLimiterConfig {
    /// The ThousandEyes default of 240 requests per minute.
    fn default() -> Self {
        Self {
            max_requests: 240,
            period_seconds: 60,
            burst_size: 10,
        }
    }
}

/// Immutable settings shared by every call a stream client makes.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base endpoint; request paths are appended to it.
    pub api_endpoint: String,
    /// Bearer token.
    pub auth_token: String,
    /// Value of the `user-agent` header.
    pub user_agent: String,
    /// Account group sent as the `aid` query parameter.
    pub account_group_id: Option<String>,
    /// Rate limiting applied before every request, if any.
    pub rate_limit: Option<RateLimiterConfig>,
    /// Whole-request timeout; `None` keeps the transport default.
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    /// Create a configuration for `api_endpoint` authenticating with `auth_token`.
    pub fn new(api_endpoint: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            api_endpoint: api_endpoint.into(),
            auth_token: auth_token.into(),
            user_agent: USER_AGENT.to_string(),
            account_group_id: None,
            rate_limit: None,
            timeout: None,
        }
    }

    /// Scope requests to an account group. An empty id means no scoping.
    pub fn with_account_group_id(mut self, account_group_id: impl Into<String>) -> Self {
        let id = account_group_id.into();
        self.account_group_id = if id.is_empty() { None } else { Some(id) };
        self
    }

    /// Set the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Enable rate limiting.
    pub fn with_rate_limit(mut self, rate_limit: RateLimiterConfig) -> Self {
        self.rate_limit = Some(rate_limit);
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Derive an independent configuration pointing at the v7 API.
    ///
    /// Every occurrence of `v6` in the endpoint becomes `v7`; all other
    /// settings are copied. `self` is left untouched.
    pub fn to_v7(&self) -> ClientConfig {
        ClientConfig {
            api_endpoint: self.api_endpoint.replace("v6", "v7"),
            ..self.clone()
        }
    }

    /// Check the settings can produce a working client.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth_token.is_empty() {
            return Err(ConfigError::MissingToken);
        }
        if !(self.api_endpoint.starts_with("https://") || self.api_endpoint.starts_with("http://"))
        {
            return Err(ConfigError::InvalidEndpoint(self.api_endpoint.clone()));
        }
        Ok(())
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_endpoint", &self.api_endpoint)
            .field("auth_token", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("account_group_id", &self.account_group_id)
            .field("rate_limit", &self.rate_limit)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// The provider configuration block as supplied by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Bearer token; falls back to `TE_TOKEN`.
    pub token: Option<String>,
    /// Account group id; falls back to `TE_AID`.
    pub account_group_id: Option<String>,
    /// API endpoint; falls back to `TE_API_ENDPOINT`, then the v6 default.
    pub api_endpoint: Option<String>,
    /// Request timeout in seconds.
    pub timeout: Option<u64>,
    /// Rate limiter settings.
    pub rate_limit: Option<RateLimiterConfig>,
}

impl ProviderConfig {
    /// Parse the configuration block. `null` yields the empty configuration.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Fill unset fields from the process environment.
    pub fn with_env(self) -> Self {
        self.with_env_lookup(|key| std::env::var(key).ok())
    }

    /// Fill unset fields using `lookup` to resolve environment variables.
    pub fn with_env_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        if !non_empty(&self.token) {
            self.token = lookup(ENV_TOKEN);
        }
        if !non_empty(&self.account_group_id) {
            self.account_group_id = lookup(ENV_ACCOUNT_GROUP_ID);
        }
        if !non_empty(&self.api_endpoint) {
            self.api_endpoint = lookup(ENV_API_ENDPOINT);
        }
        self
    }

    /// Build the base (v6) client configuration.
    pub fn into_client_config(self) -> Result<ClientConfig, ConfigError> {
        let token = self
            .token
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingToken)?;
        let endpoint = self
            .api_endpoint
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string());

        let mut config = ClientConfig::new(endpoint.trim_end_matches('/'), token)
            .with_account_group_id(self.account_group_id.unwrap_or_default());
        if let Some(rate_limit) = self.rate_limit {
            config = config.with_rate_limit(rate_limit);
        }
        if let Some(secs) = self.timeout {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        config.validate()?;
        Ok(config)
    }
}
