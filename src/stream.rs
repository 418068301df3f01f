//! The stream entity, its resource schema, and the mapping between the two.
//!
//! On the wire a stream uses camelCase names (`streamEndpointUrl`); in
//! resource state it uses snake_case attribute names (`stream_endpoint_url`).

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::ProviderError;
use crate::resource::ResourceData;
use crate::schema::{Attribute, Block, NestedBlock, Schema};

/// Resource type name of the stream resource.
pub const STREAM_RESOURCE: &str = "thousandeyes_stream";

/// State attribute names.
pub mod attr {
    /// Server-assigned identifier.
    pub const ID: &str = "id";
    /// Whether the stream is active.
    pub const ENABLED: &str = "enabled";
    /// Stream type, e.g. `opentelemetry`.
    pub const TYPE: &str = "type";
    /// Endpoint protocol, e.g. `grpc` or `http`.
    pub const ENDPOINT_TYPE: &str = "endpoint_type";
    /// Collector URL.
    pub const STREAM_ENDPOINT_URL: &str = "stream_endpoint_url";
    /// Data model version.
    pub const DATA_MODEL_VERSION: &str = "data_model_version";
    /// Test filters.
    pub const TEST_MATCH: &str = "test_match";
    /// Tag filters.
    pub const TAG_MATCH: &str = "tag_match";

    /// Every attribute a user can set, in schema order.
    pub const CONFIGURABLE: [&str; 7] = [
        ENABLED,
        TYPE,
        ENDPOINT_TYPE,
        STREAM_ENDPOINT_URL,
        DATA_MODEL_VERSION,
        TEST_MATCH,
        TAG_MATCH,
    ];
}

/// A data-export destination.
///
/// Every field is left out of the JSON body while it holds its zero value,
/// and decodes back to the zero value when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Stream {
    /// Assigned by the server on create; empty before that.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Whether data is being exported.
    #[serde(skip_serializing_if = "is_false")]
    pub enabled: bool,
    /// Stream type, e.g. `opentelemetry`.
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub stream_type: String,
    /// Collector protocol.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub endpoint_type: String,
    /// Collector URL.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stream_endpoint_url: String,
    /// Exported data model version.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub data_model_version: String,
    /// Tests feeding the stream, in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub test_match: Vec<StreamTestMatch>,
    /// Tag filters, in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tag_match: Vec<StreamTagMatch>,
}

/// Selects a test feeding the stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamTestMatch {
    /// Test id.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Test domain, e.g. `cea` or `endpoint`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub domain: String,
}

impl StreamTestMatch {
    /// Create a test filter.
    pub fn new(id: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            domain: domain.into(),
        }
    }
}

/// Selects resources by tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamTagMatch {
    /// Tag key.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub key: String,
    /// Tag value.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub value: String,
}

impl StreamTagMatch {
    /// Create a tag filter.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Stream {
    /// Build a stream from every configurable attribute in `data`.
    ///
    /// The id is not copied; the server owns it.
    pub fn from_resource(data: &ResourceData) -> Result<Self, ProviderError> {
        let mut stream = Stream::default();
        for key in attr::CONFIGURABLE {
            stream.set_attribute(key, data.get(key))?;
        }
        Ok(stream)
    }

    /// Build a stream holding only the attributes that changed in `data`.
    pub fn changes_from_resource(data: &ResourceData) -> Result<Self, ProviderError> {
        let mut stream = Stream::default();
        for key in attr::CONFIGURABLE.into_iter().filter(|k| data.has_change(k)) {
            stream.set_attribute(key, data.get(key))?;
        }
        Ok(stream)
    }

    /// Copy every configurable field into `data`. The id is left alone.
    pub fn write_to(&self, data: &mut ResourceData) {
        data.set(attr::ENABLED, Value::Bool(self.enabled));
        data.set(attr::TYPE, Value::String(self.stream_type.clone()));
        data.set(attr::ENDPOINT_TYPE, Value::String(self.endpoint_type.clone()));
        data.set(
            attr::STREAM_ENDPOINT_URL,
            Value::String(self.stream_endpoint_url.clone()),
        );
        data.set(
            attr::DATA_MODEL_VERSION,
            Value::String(self.data_model_version.clone()),
        );
        data.set(
            attr::TEST_MATCH,
            self.test_match
                .iter()
                .map(|m| json!({"id": m.id, "domain": m.domain}))
                .collect(),
        );
        data.set(
            attr::TAG_MATCH,
            self.tag_match
                .iter()
                .map(|m| json!({"key": m.key, "value": m.value}))
                .collect(),
        );
    }

    fn set_attribute(&mut self, key: &str, value: Option<&Value>) -> Result<(), ProviderError> {
        let Some(value) = value.filter(|v| !v.is_null()) else {
            return Ok(());
        };

        match key {
            attr::ENABLED => {
                self.enabled = value.as_bool().ok_or_else(|| type_error(key, "bool"))?;
            },
            attr::TYPE => self.stream_type = string_value(key, value)?,
            attr::ENDPOINT_TYPE => self.endpoint_type = string_value(key, value)?,
            attr::STREAM_ENDPOINT_URL => self.stream_endpoint_url = string_value(key, value)?,
            attr::DATA_MODEL_VERSION => self.data_model_version = string_value(key, value)?,
            attr::TEST_MATCH => {
                self.test_match = list_of_objects(key, value)?
                    .into_iter()
                    .map(|obj| {
                        Ok(StreamTestMatch::new(
                            nested_string(key, obj, "id")?,
                            nested_string(key, obj, "domain")?,
                        ))
                    })
                    .collect::<Result<Vec<_>, ProviderError>>()?;
            },
            attr::TAG_MATCH => {
                self.tag_match = list_of_objects(key, value)?
                    .into_iter()
                    .map(|obj| {
                        Ok(StreamTagMatch::new(
                            nested_string(key, obj, "key")?,
                            nested_string(key, obj, "value")?,
                        ))
                    })
                    .collect::<Result<Vec<_>, ProviderError>>()?;
            },
            other => {
                return Err(ProviderError::Validation(format!(
                    "unknown stream attribute '{}'",
                    other
                )))
            },
        }
        Ok(())
    }
}

fn type_error(key: &str, expected: &str) -> ProviderError {
    ProviderError::Validation(format!("attribute '{}' must be a {}", key, expected))
}

fn string_value(key: &str, value: &Value) -> Result<String, ProviderError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| type_error(key, "string"))
}

fn list_of_objects<'a>(
    key: &str,
    value: &'a Value,
) -> Result<Vec<&'a Map<String, Value>>, ProviderError> {
    value
        .as_array()
        .ok_or_else(|| type_error(key, "list"))?
        .iter()
        .map(|item| item.as_object().ok_or_else(|| type_error(key, "list of objects")))
        .collect()
}

fn nested_string(
    key: &str,
    obj: &Map<String, Value>,
    field: &str,
) -> Result<String, ProviderError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(v) => string_value(&format!("{}.{}", key, field), v),
    }
}

/// Schema of the `thousandeyes_stream` resource.
pub fn stream_schema() -> Schema {
    Schema::v0()
        .with_description(
            "This resource allows you to create an OpenTelemetry data stream. For more \
             information, see [Streams](https://developer.cisco.com/docs/thousandeyes/list-data-streams/).",
        )
        .with_attribute(
            attr::ID,
            Attribute::computed_string().with_description("Unique ID of the stream."),
        )
        .with_attribute(
            attr::ENABLED,
            Attribute::optional_bool().with_description("Whether the stream is enabled."),
        )
        .with_attribute(
            attr::TYPE,
            Attribute::required_string().with_description("Stream type, e.g. `opentelemetry`."),
        )
        .with_attribute(
            attr::ENDPOINT_TYPE,
            Attribute::optional_string()
                .with_description("Protocol used by the collector endpoint: `grpc` or `http`."),
        )
        .with_attribute(
            attr::STREAM_ENDPOINT_URL,
            Attribute::required_string().with_description("URL the data is sent to."),
        )
        .with_attribute(
            attr::DATA_MODEL_VERSION,
            Attribute::optional_string().with_description("Version of the exported data model."),
        )
        .with_block(
            attr::TEST_MATCH,
            NestedBlock::list(
                Block::new()
                    .with_description("Tests whose results feed the stream.")
                    .with_attribute("id", Attribute::optional_string())
                    .with_attribute("domain", Attribute::optional_string()),
            ),
        )
        .with_block(
            attr::TAG_MATCH,
            NestedBlock::list(
                Block::new()
                    .with_description("Tags selecting the tests that feed the stream.")
                    .with_attribute("key", Attribute::optional_string())
                    .with_attribute("value", Attribute::optional_string()),
            ),
        )
}
