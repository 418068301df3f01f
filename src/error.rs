//! Error types for the ThousandEyes stream provider.
//!
//! There are three layers:
//!
//! - [`ClientError`]: failures of a single HTTP call made by the stream client.
//! - [`ConfigError`]: problems building a client from provider configuration.
//! - [`ProviderError`]: what resource handlers hand back to the hosting framework.

use std::fmt;

use thiserror::Error;

/// A REST operation performed against the stream endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `POST /stream`
    Create,
    /// `GET /stream/{id}`
    Get,
    /// `PUT /stream/{id}`
    Update,
    /// `DELETE /stream/{id}`
    Delete,
}

impl Operation {
    /// The HTTP method used by this operation.
    pub fn method(self) -> reqwest::Method {
        match self {
            Self::Create => reqwest::Method::POST,
            Self::Get => reqwest::Method::GET,
            Self::Update => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
        }
    }

    /// The exact status code a successful response must carry.
    pub fn expected_status(self) -> reqwest::StatusCode {
        match self {
            Self::Create => reqwest::StatusCode::CREATED,
            Self::Get | Self::Update => reqwest::StatusCode::OK,
            Self::Delete => reqwest::StatusCode::NO_CONTENT,
        }
    }

    /// Lower-case verb used in error messages and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Get => "get",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by one call of the stream client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request payload could not be serialized.
    #[error("failed to encode {operation} stream payload: {source}")]
    Encoding {
        /// The operation being attempted.
        operation: Operation,
        /// The underlying serializer error.
        #[source]
        source: serde_json::Error,
    },

    /// The request could not be sent or its body could not be read.
    #[error("failed to {operation} stream: {source}")]
    Transport {
        /// The operation being attempted.
        operation: Operation,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a status code the call site does not accept.
    #[error("failed to {operation} stream, response code {status}")]
    UnexpectedStatus {
        /// The operation being attempted.
        operation: Operation,
        /// The observed HTTP status code.
        status: u16,
    },

    /// The response body did not parse into a stream.
    #[error("could not decode JSON response to {operation} stream: {source}")]
    Decoding {
        /// The operation being attempted.
        operation: Operation,
        /// The underlying deserializer error.
        #[source]
        source: serde_json::Error,
    },
}

impl ClientError {
    /// The operation that failed.
    pub fn operation(&self) -> Operation {
        match self {
            Self::Encoding { operation, .. }
            | Self::Transport { operation, .. }
            | Self::UnexpectedStatus { operation, .. }
            | Self::Decoding { operation, .. } => *operation,
        }
    }

    /// The HTTP status code, if the failure was a status mismatch.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors raised while turning provider configuration into a client.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No API token was supplied in configuration or environment.
    #[error("missing API token: set `token` or the TE_TOKEN environment variable")]
    MissingToken,

    /// The API endpoint is not an absolute http(s) URL.
    #[error("invalid API endpoint: {0}")]
    InvalidEndpoint(String),

    /// The rate limiter settings cannot produce a quota.
    #[error("invalid rate limit: {0}")]
    InvalidRateLimit(String),

    /// The provider configuration block could not be parsed.
    #[error("malformed provider configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Errors returned from provider and resource handler calls.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested resource was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The resource state did not have the expected shape.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The provider configuration was rejected.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// A resource call arrived before `configure`.
    #[error("Provider not configured")]
    NotConfigured,

    /// The requested resource type is not served by this provider.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A call to the ThousandEyes API failed.
    #[error("API error: {0}")]
    Api(#[from] ClientError),
}

impl ProviderError {
    /// Get the error message without the category prefix.
    pub fn message(&self) -> String {
        match self {
            Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::UnknownResource(msg) => msg.clone(),
            Self::Configuration(err) => err.to_string(),
            Self::NotConfigured => "provider not configured".to_string(),
            Self::Api(err) => err.to_string(),
        }
    }

    /// Whether this error means the remote stream does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Api(err) => err.status() == Some(404),
            _ => false,
        }
    }
}
