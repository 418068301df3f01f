//! Resource state and the create/read/update/delete handlers for streams.
//!
//! [`ResourceData`] is the declarative side: an id plus an attribute bag, with
//! the prior attributes kept around during an update so changed fields can be
//! told apart. The handlers move data between it and a [`StreamClient`], which
//! is passed in explicitly on every call.

use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::client::StreamClient;
use crate::error::ProviderError;
use crate::stream::{attr, Stream};
use crate::types::non_zero;

/// Attribute bag for one resource instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceData {
    id: String,
    attributes: Map<String, Value>,
    prior: Option<Map<String, Value>>,
}

impl ResourceData {
    /// Load from a state object. `null` gives an empty resource.
    pub fn from_state(state: Value) -> Result<Self, ProviderError> {
        let (id, attributes) = split_state(state)?;
        Ok(Self {
            id,
            attributes,
            prior: None,
        })
    }

    /// Load a planned update. The id is taken from `planned` if present,
    /// otherwise from `prior`.
    pub fn from_change(prior: Value, planned: Value) -> Result<Self, ProviderError> {
        let (prior_id, prior) = split_state(prior)?;
        let (planned_id, attributes) = split_state(planned)?;
        Ok(Self {
            id: if planned_id.is_empty() {
                prior_id
            } else {
                planned_id
            },
            attributes,
            prior: Some(prior),
        })
    }

    /// A resource known only by id, as produced by import.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// The remote identifier; empty when the resource does not exist.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Set the identifier. An empty id marks the resource as gone.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Current value of an attribute.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Set an attribute.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.attributes.insert(key.into(), value);
    }

    /// Whether `key` differs from the prior state. Null and zero values count
    /// as unset, so without prior state any non-zero attribute is a change.
    pub fn has_change(&self, key: &str) -> bool {
        let current = non_zero(self.get(key));
        match &self.prior {
            None => current.is_some(),
            Some(prior) => non_zero(prior.get(key)) != current,
        }
    }

    /// Convert back into a state object. The id is `null` when empty.
    pub fn into_state(self) -> Value {
        let mut state = self.attributes;
        let id = if self.id.is_empty() {
            Value::Null
        } else {
            Value::String(self.id)
        };
        state.insert(attr::ID.to_string(), id);
        Value::Object(state)
    }
}

fn split_state(state: Value) -> Result<(String, Map<String, Value>), ProviderError> {
    let mut attributes = match state {
        Value::Null => return Ok((String::new(), Map::new())),
        Value::Object(map) => map,
        other => {
            return Err(ProviderError::Validation(format!(
                "resource state must be an object, got {}",
                other
            )))
        },
    };

    let id = match attributes.remove(attr::ID) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(id)) => id,
        Some(other) => {
            return Err(ProviderError::Validation(format!(
                "attribute 'id' must be a string, got {}",
                other
            )))
        },
    };
    Ok((id, attributes))
}

/// Create the stream described by `data`, store its id, then refresh every
/// attribute from the server.
#[instrument(skip_all, name = "resource.create")]
pub async fn create(client: &StreamClient, data: &mut ResourceData) -> Result<(), ProviderError> {
    info!("Creating ThousandEyes stream");
    let local = Stream::from_resource(data)?;

    let remote = client.create_stream(&local).await?;
    if remote.id.is_empty() {
        return Err(ProviderError::Validation(
            "server created a stream without an id".to_string(),
        ));
    }
    data.set_id(remote.id);
    read(client, data).await
}

/// Refresh `data` from the server.
///
/// On failure the id is cleared so the host treats the resource as gone,
/// and the error is returned.
#[instrument(skip_all, name = "resource.read", fields(stream_id = %data.id()))]
pub async fn read(client: &StreamClient, data: &mut ResourceData) -> Result<(), ProviderError> {
    info!("Reading ThousandEyes stream");
    match client.get_stream(data.id()).await {
        Ok(remote) => {
            remote.write_to(data);
            Ok(())
        },
        Err(err) => {
            warn!(error = %err, "Stream read failed, marking resource as absent");
            data.set_id("");
            Err(err.into())
        },
    }
}

/// Send the changed attributes of `data` to the server, then refresh.
///
/// When nothing would go on the wire the update request is skipped and only
/// the refresh happens.
#[instrument(skip_all, name = "resource.update", fields(stream_id = %data.id()))]
pub async fn update(client: &StreamClient, data: &mut ResourceData) -> Result<(), ProviderError> {
    info!("Updating ThousandEyes stream");
    let changes = Stream::changes_from_resource(data)?;
    if changes == Stream::default() {
        debug!("No stream fields to send, skipping update request");
    } else {
        client.update_stream(data.id(), &changes).await?;
    }
    read(client, data).await
}

/// Delete the stream and clear the id.
#[instrument(skip_all, name = "resource.delete", fields(stream_id = %data.id()))]
pub async fn delete(client: &StreamClient, data: &mut ResourceData) -> Result<(), ProviderError> {
    info!("Deleting ThousandEyes stream");
    client.delete_stream(data.id()).await?;
    data.set_id("");
    Ok(())
}

/// Import by id. Only the id is recorded; the host reads the rest afterwards.
///
/// The id becomes a URL path segment, so ids containing `/`, `?` or `#` are
/// rejected.
pub fn import(id: &str) -> Result<ResourceData, ProviderError> {
    if id.is_empty() {
        return Err(ProviderError::Validation(
            "import requires a stream id".to_string(),
        ));
    }
    if let Some(c) = id.chars().find(|c| matches!(c, '/' | '?' | '#')) {
        return Err(ProviderError::Validation(format!(
            "invalid stream id '{}': must not contain '{}'",
            id, c
        )));
    }
    Ok(ResourceData::with_id(id))
}
