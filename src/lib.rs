//! ThousandEyes stream provider
//!
//! This crate manages ThousandEyes data streams (OpenTelemetry export
//! destinations) as a declarative infrastructure resource, using the v7
//! `/stream` REST endpoint.
//!
//! # Overview
//!
//! - **HTTP client**: [`StreamClient`] performs one authenticated JSON call per
//!   operation, with optional rate limiting and account-group scoping
//! - **Data model**: [`Stream`] and its test/tag filters
//! - **Resource handlers**: [`resource`] maps resource state to streams and back
//! - **Provider service**: [`ThousandEyesProvider`] serves the
//!   `thousandeyes_stream` resource type through [`ProviderService`]
//! - **Error types**: [`ClientError`] for calls, [`ProviderError`] for handlers
//! - **Logging**: `tracing` integration writing to stderr
//!
//! # Quick Start
//!
//! ```ignore
//! use thousandeyes_stream_provider::{init_logging, ProviderService, ThousandEyesProvider};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!
//!     let provider = ThousandEyesProvider::new();
//!     provider.configure(json!({"token": std::env::var("TE_TOKEN")?})).await?;
//!
//!     let state = provider
//!         .create("thousandeyes_stream", json!({
//!             "enabled": true,
//!             "type": "opentelemetry",
//!             "endpoint_type": "grpc",
//!             "stream_endpoint_url": "https://collector.example.com:4317",
//!             "test_match": [{"id": "123456", "domain": "cea"}]
//!         }))
//!         .await?;
//!     tracing::info!(id = %state["id"], "stream created");
//!     Ok(())
//! }
//! ```
//!
//! # Request format
//!
//! Every call is `{endpoint}/stream[/{id}].json[?aid={account group}]` with
//! `accept`, `authorization: Bearer {token}`, `content-type` and `user-agent`
//! headers. A call fails unless the status is in `200..=299` and also equals
//! the operation's expected status (201 for create, 200 for get and update,
//! 204 for delete).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod provider;
pub mod rate_limiter;
pub mod resource;
pub mod schema;
pub mod stream;
pub mod testing;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use client::StreamClient;
pub use config::{ClientConfig, ProviderConfig, RateLimiterConfig};
pub use error::{ClientError, ConfigError, Operation, ProviderError};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::{ProviderService, ThousandEyesProvider};
pub use rate_limiter::RateLimiter;
pub use resource::ResourceData;
pub use schema::ProviderSchema;
pub use stream::{Stream, StreamTagMatch, StreamTestMatch, STREAM_RESOURCE};
pub use types::{AttributeChange, ImportedResource, PlanResult};
pub use validation::{is_valid, validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
