//! Document type, typed metadata values and their JSON conversions

use crate::error::{Result, VectorDbError};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;

/// A typed metadata value attached to a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// Metadata map. Key order is irrelevant.
pub type Metadata = HashMap<String, MetadataValue>;

impl MetadataValue {
    /// Numeric view used by range predicates. Only `Int` and non-NaN `Float` qualify.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Int(i) => Some(*i as f64),
            MetadataValue::Float(f) if !f.is_nan() => Some(*f),
            _ => None,
        }
    }

    /// Convert a scalar JSON value. Arrays and objects have no metadata equivalent.
    pub fn from_json(value: &JsonValue) -> Result<Self> {
        match value {
            JsonValue::Null => Ok(MetadataValue::Null),
            JsonValue::Bool(b) => Ok(MetadataValue::Bool(*b)),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(MetadataValue::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(MetadataValue::Float(f))
                } else {
                    Err(VectorDbError::invalid_argument(format!(
                        "Number out of range: {}",
                        n
                    )))
                }
            }
            JsonValue::String(s) => Ok(MetadataValue::String(s.clone())),
            JsonValue::Array(_) | JsonValue::Object(_) => Err(VectorDbError::invalid_argument(
                format!("Metadata values must be scalars, got {}", value),
            )),
        }
    }

    /// Convert to JSON. Non-finite floats become `null`, as JSON has no encoding for them.
    pub fn to_json(&self) -> JsonValue {
        match self {
            MetadataValue::Null => JsonValue::Null,
            MetadataValue::Bool(b) => JsonValue::Bool(*b),
            MetadataValue::Int(i) => JsonValue::from(*i),
            MetadataValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            MetadataValue::String(s) => JsonValue::String(s.clone()),
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Null => write!(f, "null"),
            MetadataValue::Bool(b) => write!(f, "{}", b),
            MetadataValue::Int(i) => write!(f, "{}", i),
            MetadataValue::Float(x) => write!(f, "{}", x),
            MetadataValue::String(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

impl From<i32> for MetadataValue {
    fn from(value: i32) -> Self {
        MetadataValue::Int(value as i64)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Int(value)
    }
}

impl From<f32> for MetadataValue {
    fn from(value: f32) -> Self {
        MetadataValue::Float(value as f64)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Float(value)
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::String(value)
    }
}

/// Build a metadata map from a JSON object.
pub fn metadata_from_json(value: &JsonValue) -> Result<Metadata> {
    let object = value.as_object().ok_or_else(|| {
        VectorDbError::invalid_argument(format!("Metadata must be a JSON object, got {}", value))
    })?;
    object
        .iter()
        .map(|(key, v)| Ok((key.clone(), MetadataValue::from_json(v)?)))
        .collect()
}

/// Render a metadata map as a JSON object.
pub fn metadata_to_json(metadata: &Metadata) -> JsonValue {
    JsonValue::Object(
        metadata
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}

/// A stored embedding with its metadata. The id is assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: u64,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    pub fn new(id: u64, embedding: Vec<f32>, metadata: Metadata) -> Self {
        Self {
            id,
            embedding,
            metadata,
        }
    }

    /// Dimension of the embedding
    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }

    /// Look up a metadata field.
    pub fn field(&self, key: &str) -> Option<&MetadataValue> {
        self.metadata.get(key)
    }
}

/// Parse an embedding from a comma-separated string such as `"1.0, 2.0, 3.0"`.
pub fn parse_embedding(s: &str) -> Result<Vec<f32>> {
    s.split(',')
        .map(|x| {
            x.trim().parse::<f32>().map_err(|_| {
                VectorDbError::invalid_argument(format!("Invalid float: {:?}", x.trim()))
            })
        })
        .collect()
}
