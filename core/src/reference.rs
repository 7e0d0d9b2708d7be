//! Pointers from a campaign to the resources it uses.
//!
//! The API only ever needs `{"name": ...}` on write, but callers may hold a
//! full resource, just a name, or a raw map they built themselves.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::resource::Resource;
use crate::validation::is_blank;

/// Resources that can be referred to by name.
pub trait Named {
    fn name(&self) -> &str;
}

/// A campaign's link to a template, page, SMTP profile or group.
#[derive(Debug, Clone)]
pub enum Reference<R> {
    Resource(Box<R>),
    Name(String),
    Raw(Map<String, Value>),
}

impl<R> Reference<R> {
    pub fn from_resource(resource: R) -> Self {
        Reference::Resource(Box::new(resource))
    }

    pub fn named(name: impl Into<String>) -> Self {
        Reference::Name(name.into())
    }

    /// The full resource, when this reference holds one.
    pub fn resource(&self) -> Option<&R> {
        match self {
            Reference::Resource(resource) => Some(resource.as_ref()),
            _ => None,
        }
    }
}

impl<R: Named> Reference<R> {
    pub fn name(&self) -> Option<&str> {
        match self {
            Reference::Resource(resource) => Some(resource.name()),
            Reference::Name(name) => Some(name.as_str()),
            Reference::Raw(map) => map.get("name").and_then(Value::as_str),
        }
    }

    pub fn has_name(&self) -> bool {
        self.name().is_some_and(|name| !is_blank(name))
    }

    /// Wire form: never the full nested object.
    pub fn to_json(&self) -> Value {
        match self {
            Reference::Resource(resource) => json!({ "name": resource.name() }),
            Reference::Name(name) => json!({ "name": name }),
            Reference::Raw(map) => Value::Object(map.clone()),
        }
    }
}

impl<R: Resource> Reference<R> {
    /// Read side: strings are names, objects become typed resources when
    /// they decode, raw maps otherwise.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::String(name) => Reference::Name(name),
            Value::Object(map) => match R::from_json(Value::Object(map.clone())) {
                Ok(resource) => Reference::Resource(Box::new(resource)),
                Err(_) => Reference::Raw(map),
            },
            _ => Reference::Raw(Map::new()),
        }
    }
}

impl<R> From<&str> for Reference<R> {
    fn from(name: &str) -> Self {
        Reference::Name(name.to_string())
    }
}

impl<R> From<String> for Reference<R> {
    fn from(name: String) -> Self {
        Reference::Name(name)
    }
}

impl<R> From<Map<String, Value>> for Reference<R> {
    fn from(map: Map<String, Value>) -> Self {
        Reference::Raw(map)
    }
}

impl<R: Named> Serialize for Reference<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de, R: Resource> Deserialize<'de> for Reference<R> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Reference::from_json)
    }
}
