//! The provider service: the surface a host calls into.
//!
//! [`ProviderService`] is the host-facing trait, working on JSON state values.
//! [`ThousandEyesProvider`] implements it for the `thousandeyes_stream`
//! resource by delegating to the handlers in [`crate::resource`].

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::client::StreamClient;
use crate::config::ProviderConfig;
use crate::error::{ConfigError, ProviderError};
use crate::resource::{self, ResourceData};
use crate::schema::{Attribute, Block, Diagnostic, NestedBlock, ProviderSchema, Schema};
use crate::stream::{attr, stream_schema, STREAM_RESOURCE};
use crate::types::{AttributeChange, ImportedResource, PlanResult};
use crate::validation::validate;

/// Operations a provider exposes to its host.
///
/// # Example
///
/// ```ignore
/// use thousandeyes_stream_provider::{ProviderService, ThousandEyesProvider};
/// use serde_json::json;
///
/// let provider = ThousandEyesProvider::new();
/// provider.configure(json!({"token": "..."})).await?;
/// let state = provider.create("thousandeyes_stream", json!({
///     "type": "opentelemetry",
///     "stream_endpoint_url": "https://collector.example.com:4317"
/// })).await?;
/// ```
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    /// The provider and resource schemas.
    fn schema(&self) -> ProviderSchema;

    /// Resource type names, sorted.
    fn resource_types(&self) -> Vec<String> {
        let mut names: Vec<String> = self.schema().resources.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Configure credentials and endpoints. Returns diagnostics.
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Check a resource configuration against its schema.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let schema = self.schema();
        let schema = schema
            .resources
            .get(resource_type)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))?;
        Ok(validate(schema, &config))
    }

    /// Compute the changes needed to go from `prior_state` to `proposed_state`.
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError>;

    /// Create a resource and return its state.
    async fn create(&self, resource_type: &str, planned_state: Value)
        -> Result<Value, ProviderError>;

    /// Refresh a resource and return its state.
    async fn read(&self, resource_type: &str, current_state: Value)
        -> Result<Value, ProviderError>;

    /// Update a resource and return its state.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete a resource.
    async fn delete(&self, resource_type: &str, current_state: Value)
        -> Result<(), ProviderError>;

    /// Bring an existing resource under management.
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError>;
}

/// Provider serving the ThousandEyes stream resource.
///
/// `configure` builds one v7 [`StreamClient`]; all handler calls share it.
#[derive(Debug, Default)]
pub struct ThousandEyesProvider {
    client: RwLock<Option<Arc<StreamClient>>>,
}

impl ThousandEyesProvider {
    /// Create an unconfigured provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider that already has a client.
    pub fn with_client(client: StreamClient) -> Self {
        Self {
            client: RwLock::new(Some(Arc::new(client))),
        }
    }

    async fn client(&self) -> Result<Arc<StreamClient>, ProviderError> {
        self.client
            .read()
            .await
            .clone()
            .ok_or(ProviderError::NotConfigured)
    }
}

fn check_resource_type(resource_type: &str) -> Result<(), ProviderError> {
    if resource_type == STREAM_RESOURCE {
        Ok(())
    } else {
        Err(ProviderError::UnknownResource(resource_type.to_string()))
    }
}

/// Schema of the provider configuration block.
pub fn provider_config_schema() -> Schema {
    Schema::v0()
        .with_attribute(
            "token",
            Attribute::optional_string()
                .sensitive()
                .with_description("Bearer token. Defaults to TE_TOKEN."),
        )
        .with_attribute(
            "account_group_id",
            Attribute::optional_string().with_description("Account group id. Defaults to TE_AID."),
        )
        .with_attribute(
            "api_endpoint",
            Attribute::optional_string()
                .with_description("v6 API endpoint. Defaults to TE_API_ENDPOINT."),
        )
        .with_attribute(
            "timeout",
            Attribute::optional_int64().with_description("Request timeout in seconds."),
        )
        .with_block(
            "rate_limit",
            NestedBlock::single(
                Block::new()
                    .with_attribute("max_requests", Attribute::required_int64())
                    .with_attribute("period_seconds", Attribute::required_int64())
                    .with_attribute("burst_size", Attribute::required_int64()),
            ),
        )
}

#[async_trait::async_trait]
impl ProviderService for ThousandEyesProvider {
    fn schema(&self) -> ProviderSchema {
        ProviderSchema::new()
            .with_provider_config(provider_config_schema())
            .with_resource(STREAM_RESOURCE, stream_schema())
    }

    #[instrument(skip_all, name = "provider.configure")]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let mut diagnostics = validate(&provider_config_schema(), &config);
        if diagnostics.iter().any(Diagnostic::is_error) {
            return Ok(diagnostics);
        }

        let base = match ProviderConfig::from_value(config)?
            .with_env()
            .into_client_config()
        {
            Ok(base) => base,
            Err(ConfigError::MissingToken) => {
                return Ok(vec![Diagnostic::error("Missing API token")
                    .with_detail(ConfigError::MissingToken.to_string())
                    .with_attribute("token")]);
            },
            Err(err) => return Err(err.into()),
        };

        if !base.api_endpoint.contains("v6") {
            warn!(endpoint = %base.api_endpoint, "API endpoint has no v6 segment");
            diagnostics.push(
                Diagnostic::warning("API endpoint is not a v6 endpoint")
                    .with_detail(format!(
                        "streams are served by v7, derived by replacing 'v6' in the endpoint; \
                         '{}' will be used unchanged",
                        base.api_endpoint
                    ))
                    .with_attribute("api_endpoint"),
            );
        }

        let client = StreamClient::from_v6(&base)?;
        info!(endpoint = %client.config().api_endpoint, "Provider configured");
        *self.client.write().await = Some(Arc::new(client));
        Ok(diagnostics)
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        check_resource_type(resource_type)?;
        let is_create = prior_state.is_none();
        debug!(resource_type, is_create, "Planning stream");

        let prior = prior_state.unwrap_or(Value::Null);
        let mut planned = proposed_state;
        let Value::Object(planned_map) = &mut planned else {
            return Err(ProviderError::Validation(
                "proposed state must be an object".to_string(),
            ));
        };
        planned_map.insert(
            attr::ID.to_string(),
            prior.get(attr::ID).cloned().unwrap_or(Value::Null),
        );

        let changes: Vec<AttributeChange> = attr::CONFIGURABLE
            .iter()
            .filter_map(|key| AttributeChange::between(key, prior.get(*key), planned.get(*key)))
            .collect();

        if changes.is_empty() {
            Ok(PlanResult::no_change(planned))
        } else {
            Ok(PlanResult::with_changes(planned, changes, false))
        }
    }

    #[instrument(skip_all, name = "provider.create")]
    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        check_resource_type(resource_type)?;
        let client = self.client().await?;
        let mut data = ResourceData::from_state(planned_state)?;
        if let Err(err) = resource::create(&client, &mut data).await {
            error!(error = %err, "Create failed");
            return Err(err);
        }
        Ok(data.into_state())
    }

    #[instrument(skip_all, name = "provider.read")]
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        check_resource_type(resource_type)?;
        let client = self.client().await?;
        let mut data = ResourceData::from_state(current_state)?;
        resource::read(&client, &mut data).await?;
        Ok(data.into_state())
    }

    #[instrument(skip_all, name = "provider.update")]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        check_resource_type(resource_type)?;
        let client = self.client().await?;
        let mut data = ResourceData::from_change(prior_state, planned_state)?;
        if let Err(err) = resource::update(&client, &mut data).await {
            error!(error = %err, "Update failed");
            return Err(err);
        }
        Ok(data.into_state())
    }

    #[instrument(skip_all, name = "provider.delete")]
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        check_resource_type(resource_type)?;
        let client = self.client().await?;
        let mut data = ResourceData::from_state(current_state)?;
        resource::delete(&client, &mut data).await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        check_resource_type(resource_type)?;
        let data = resource::import(id)?;
        Ok(vec![ImportedResource::new(STREAM_RESOURCE, data.into_state())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::schema::DiagnosticSeverity;
    use serde_json::json;

    #[tokio::test]
    async fn test_calls_before_configure() {
        let provider = ThousandEyesProvider::new();
        let err = provider
            .read(STREAM_RESOURCE, json!({"id": "s-1"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured));
    }

    #[tokio::test]
    async fn test_unknown_resource_type() {
        let provider = ThousandEyesProvider::with_client(
            StreamClient::new(ClientConfig::new("http://127.0.0.1:9/v7", "tok")).unwrap(),
        );
        let err = provider
            .create("thousandeyes_http_server", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }

    #[tokio::test]
    async fn test_configure_derives_v7_client() {
        let provider = ThousandEyesProvider::new();
        let diagnostics = provider
            .configure(json!({
                "token": "tok",
                "account_group_id": "77",
                "api_endpoint": "https://api.example.com/v6"
            }))
            .await
            .unwrap();
        assert!(diagnostics.is_empty());

        let client = provider.client().await.unwrap();
        assert_eq!(client.config().api_endpoint, "https://api.example.com/v7");
        assert_eq!(client.config().account_group_id.as_deref(), Some("77"));
    }

    #[tokio::test]
    async fn test_configure_warns_on_non_v6_endpoint() {
        let provider = ThousandEyesProvider::new();
        let diagnostics = provider
            .configure(json!({"token": "tok", "api_endpoint": "https://api.example.com/v7"}))
            .await
            .unwrap();

        assert_eq!(diagnostics.len(), 1);
        assert!(!diagnostics[0].is_error());
        assert_eq!(diagnostics[0].severity, DiagnosticSeverity::Warning);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("api_endpoint"));

        // Still configured, against the endpoint as given.
        let client = provider.client().await.unwrap();
        assert_eq!(client.config().api_endpoint, "https://api.example.com/v7");
    }

    #[tokio::test]
    async fn test_configure_rejects_bad_types() {
        let provider = ThousandEyesProvider::new();
        let diagnostics = provider.configure(json!({"timeout": "soon"})).await.unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("timeout"));
        assert!(provider.client().await.is_err());
    }

    #[tokio::test]
    async fn test_plan_create() {
        let provider = ThousandEyesProvider::new();
        let plan = provider
            .plan(
                STREAM_RESOURCE,
                None,
                json!({"type": "opentelemetry", "enabled": true}),
                json!({}),
            )
            .await
            .unwrap();

        assert_eq!(plan.planned_state["id"], Value::Null);
        let paths: Vec<_> = plan.changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["enabled", "type"]);
        assert!(!plan.requires_replace);
    }

    #[tokio::test]
    async fn test_plan_update_carries_id() {
        let provider = ThousandEyesProvider::new();
        let prior = json!({"id": "s-1", "type": "opentelemetry", "enabled": true});
        let plan = provider
            .plan(
                STREAM_RESOURCE,
                Some(prior),
                json!({"type": "opentelemetry", "enabled": false}),
                json!({}),
            )
            .await
            .unwrap();

        assert_eq!(plan.planned_state["id"], "s-1");
        assert_eq!(plan.changes.len(), 1);
        assert_eq!(plan.changes[0].path, "enabled");
    }

    #[tokio::test]
    async fn test_import_passthrough() {
        let provider = ThousandEyesProvider::new();
        let imported = provider
            .import_resource(STREAM_RESOURCE, "s-42")
            .await
            .unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].resource_type, STREAM_RESOURCE);
        assert_eq!(imported[0].state, json!({"id": "s-42"}));
    }

    #[tokio::test]
    async fn test_validate_resource_config() {
        let provider = ThousandEyesProvider::new();
        let diagnostics = provider
            .validate_resource_config(STREAM_RESOURCE, json!({"type": "opentelemetry"}))
            .await
            .unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].attribute.as_deref(),
            Some("stream_endpoint_url")
        );

        let err = provider
            .validate_resource_config("other", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }

    #[test]
    fn test_resource_types() {
        let provider = ThousandEyesProvider::new();
        assert_eq!(provider.resource_types(), vec![STREAM_RESOURCE.to_string()]);
    }
}
