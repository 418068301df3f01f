//! HTTP client for the ThousandEyes v7 stream endpoint.
//!
//! Every call goes through the same cycle:
//!
//! 1. wait on the rate limiter, if one is configured
//! 2. build `{endpoint}{path}.json[?aid=...]` with auth and content headers
//! 3. reject any status outside `200..=299`
//! 4. reject any status other than the one the operation expects
//! 5. decode the body into a [`Stream`] (except for delete)
//!
//! # Example
//!
//! ```ignore
//! use thousandeyes_stream_provider::{ClientConfig, Stream, StreamClient};
//!
//! let base = ClientConfig::new("https://api.thousandeyes.com/v6", token);
//! let client = StreamClient::from_v6(&base)?;
//!
//! let created = client.create_stream(&Stream { enabled: true, ..Default::default() }).await?;
//! client.delete_stream(&created.id).await?;
//! ```

use std::sync::Arc;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, ConfigError, Operation};
use crate::rate_limiter::RateLimiter;
use crate::stream::Stream;

const JSON: &str = "application/json";

/// Client for the `/stream` family of endpoints.
///
/// The configuration is read-only once the client exists, so a client can be
/// shared between concurrent handler calls behind an `Arc`.
#[derive(Debug, Clone)]
pub struct StreamClient {
    config: Arc<ClientConfig>,
    http: reqwest::Client,
    limiter: Option<RateLimiter>,
}

impl StreamClient {
    /// Create a client that talks to `config.api_endpoint` as given.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ConfigError::HttpClient)?;

        let limiter = config.rate_limit.as_ref().map(RateLimiter::new).transpose()?;

        Ok(Self {
            config: Arc::new(config),
            http,
            limiter,
        })
    }

    /// Create a v7 client from a v6 provider configuration.
    pub fn from_v6(config: &ClientConfig) -> Result<Self, ConfigError> {
        Self::new(config.to_v7())
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Create a stream. The server assigns its id.
    #[instrument(skip(self, stream), name = "stream.create")]
    pub async fn create_stream(&self, stream: &Stream) -> Result<Stream, ClientError> {
        let response = self.send(Operation::Create, "/stream", Some(stream)).await?;
        expect_status(Operation::Create, &response)?;
        self.decode_json(Operation::Create, response).await
    }

    /// Fetch a stream by id.
    #[instrument(skip(self), name = "stream.get")]
    pub async fn get_stream(&self, id: &str) -> Result<Stream, ClientError> {
        let path = format!("/stream/{}", id);
        let response = self.send(Operation::Get, &path, None::<&Stream>).await?;
        expect_status(Operation::Get, &response)?;
        self.decode_json(Operation::Get, response).await
    }

    /// Replace the stream `id` with `stream`. Fields left at their zero value
    /// are not sent.
    #[instrument(skip(self, stream), name = "stream.update")]
    pub async fn update_stream(&self, id: &str, stream: &Stream) -> Result<Stream, ClientError> {
        let path = format!("/stream/{}", id);
        let response = self.send(Operation::Update, &path, Some(stream)).await?;
        expect_status(Operation::Update, &response)?;
        self.decode_json(Operation::Update, response).await
    }

    /// Delete a stream by id. The response body is never decoded.
    #[instrument(skip(self), name = "stream.delete")]
    pub async fn delete_stream(&self, id: &str) -> Result<(), ClientError> {
        let path = format!("/stream/{}", id);
        let response = self.send(Operation::Delete, &path, None::<&Stream>).await?;
        expect_status(Operation::Delete, &response)
    }

    /// Perform one authenticated call and return the raw response.
    ///
    /// Fails unless the status is in `200..=299`.
    async fn send<B: Serialize + ?Sized>(
        &self,
        operation: Operation,
        path: &str,
        payload: Option<&B>,
    ) -> Result<Response, ClientError> {
        if let Some(limiter) = &self.limiter {
            limiter.wait().await;
        }

        let url = format!("{}{}.json", self.config.api_endpoint, path);
        debug!(method = %operation.method(), url = %url, "Sending request");

        let mut request = self
            .http
            .request(operation.method(), &url)
            .header(ACCEPT, JSON)
            .header(AUTHORIZATION, format!("Bearer {}", self.config.auth_token))
            .header(CONTENT_TYPE, JSON)
            .header(USER_AGENT, self.config.user_agent.as_str());

        if let Some(aid) = &self.config.account_group_id {
            request = request.query(&[("aid", aid)]);
        }

        if let Some(payload) = payload {
            let body = serde_json::to_vec(payload)
                .map_err(|source| ClientError::Encoding { operation, source })?;
            request = request.body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|source| ClientError::Transport { operation, source })?;

        let status = response.status();
        debug!(status = status.as_u16(), "Received response");

        if !status.is_success() {
            warn!(status = status.as_u16(), %operation, "API call failed");
            return Err(ClientError::UnexpectedStatus {
                operation,
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    /// Read the whole body and decode it. Consumes the response.
    async fn decode_json<T: DeserializeOwned>(
        &self,
        operation: Operation,
        response: Response,
    ) -> Result<T, ClientError> {
        let body = response
            .bytes()
            .await
            .map_err(|source| ClientError::Transport { operation, source })?;
        serde_json::from_slice(&body).map_err(|source| ClientError::Decoding { operation, source })
    }
}

/// Check the operation-specific status on a response the adapter already
/// accepted as `2xx`.
fn expect_status(operation: Operation, response: &Response) -> Result<(), ClientError> {
    let status = response.status();
    if status == operation.expected_status() {
        Ok(())
    } else {
        warn!(
            status = status.as_u16(),
            expected = operation.expected_status().as_u16(),
            %operation,
            "Unexpected response status"
        );
        Err(ClientError::UnexpectedStatus {
            operation,
            status: status.as_u16(),
        })
    }
}
