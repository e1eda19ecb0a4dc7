//! Core wire types for Testwire
//!
//! Everything here crosses the HTTP boundary between the bridge endpoints and
//! the bridge commands, serialized as JSON. Field names follow the wire
//! contract (`_token`, `makeOnly`, `method`), not Rust convention.

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Attribute filter / override map, as sent by the test runner.
pub type AttributeMap = Map<String, Value>;

/// A single named route read from the host application's route table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDescriptor {
    pub name: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub action: String,
    /// URI template with `{param}` and trailing-optional `{param?}` segments.
    pub uri: String,
    /// Declared HTTP methods, first one is the canonical navigation method.
    #[serde(rename = "method")]
    pub methods: Vec<String>,
}

/// A model instance: an attribute map plus the names of attributes the host
/// considers hidden. Hidden attributes never serialize; a record that crossed
/// the wire therefore has an empty hidden set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    attributes: AttributeMap,
    hidden: Vec<String>,
}

impl Record {
    pub fn new(attributes: AttributeMap) -> Self {
        Self {
            attributes,
            hidden: Vec::new(),
        }
    }

    pub fn with_hidden<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hidden = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.attributes.insert(name.into(), value);
    }

    /// Identity key, when the record has been persisted.
    pub fn id(&self) -> Option<&Value> {
        self.attributes.get("id")
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    pub fn hidden(&self) -> &[String] {
        &self.hidden
    }

    fn is_hidden(&self, name: &str) -> bool {
        self.hidden.iter().any(|h| h == name)
    }

    /// True when every filter entry matches this record's attributes.
    pub fn matches(&self, filter: &AttributeMap) -> bool {
        filter
            .iter()
            .all(|(k, v)| self.attributes.get(k) == Some(v))
    }

    /// Attributes with hidden ones stripped, the only shape that may leave
    /// the server.
    pub fn public_attributes(&self) -> AttributeMap {
        self.attributes
            .iter()
            .filter(|(k, _)| !self.is_hidden(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let visible = self
            .attributes
            .iter()
            .filter(|(k, _)| !self.is_hidden(k))
            .count();
        let mut map = serializer.serialize_map(Some(visible))?;
        for (k, v) in &self.attributes {
            if !self.is_hidden(k) {
                map.serialize_entry(k, v)?;
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let attributes = AttributeMap::deserialize(deserializer)?;
        Ok(Record {
            attributes,
            hidden: Vec::new(),
        })
    }
}

/// Result of a factory call, decided by the requested count: `times == 1`
/// yields `Single`, anything else `Many`. On the wire this is a bare object
/// or a bare array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactoryOutcome {
    Many(Vec<Record>),
    Single(Record),
}

impl FactoryOutcome {
    /// Build the outcome from produced records per the count contract.
    pub fn from_records(times: u32, mut records: Vec<Record>) -> Self {
        if times == 1 && records.len() == 1 {
            FactoryOutcome::Single(records.remove(0))
        } else {
            FactoryOutcome::Many(records)
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FactoryOutcome::Single(_) => 1,
            FactoryOutcome::Many(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn single(&self) -> Option<&Record> {
        match self {
            FactoryOutcome::Single(record) => Some(record),
            FactoryOutcome::Many(_) => None,
        }
    }

    pub fn into_records(self) -> Vec<Record> {
        match self {
            FactoryOutcome::Single(record) => vec![record],
            FactoryOutcome::Many(records) => records,
        }
    }
}

// ============================================================================
// Request bodies
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub attributes: AttributeMap,
    #[serde(rename = "_token")]
    pub token: String,
}

/// Body for endpoints that carry nothing besides the anti-forgery token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRequest {
    #[serde(rename = "_token")]
    pub token: String,
}

fn default_times() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactoryRequest {
    pub model: String,
    #[serde(default = "default_times")]
    pub times: u32,
    #[serde(default)]
    pub attributes: AttributeMap,
    #[serde(default, rename = "makeOnly")]
    pub make_only: bool,
    #[serde(rename = "_token")]
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRequest {
    pub command: String,
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(rename = "_token")]
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalRequest {
    pub command: String,
    #[serde(rename = "_token")]
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalResponse {
    pub result: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationUrlRequest {
    #[serde(default)]
    pub attributes: AttributeMap,
    #[serde(rename = "_token")]
    pub token: String,
}
