//! Generic CRUD behaviour shared by every Gophish resource.
//!
//! # Design
//! A concrete resource is a pair of a serde attribute struct (its wire
//! schema) and a [`Record`] (id, persistence flags, dirty set, errors). The
//! [`Resource`] trait asks each type for its schema, create body and
//! validation rules and provides everything else: path derivation, list /
//! find / save / destroy, hydration and dirty tracking.
//!
//! Hydration normalizes server keys to snake case and deserializes through
//! the attribute struct, so unknown keys are dropped by construction.
//!
//! Save and destroy report server rejections through the error collection
//! and an `Ok(false)`; only transport and decoding failures are `Err`.

use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::client::{check_found, check_ok, parse_json, server_message, Client};
use crate::error::ApiError;
use crate::http::HttpResponse;
use crate::inflect::{normalize_keys, pluralize, resource_name};
use crate::validation::{Errors, BASE};

/// Persistence state carried by every resource instance.
#[derive(Debug, Clone, Default)]
pub struct Record {
    id: Option<i64>,
    persisted: bool,
    destroyed: bool,
    changes: Vec<(&'static str, Value)>,
    errors: Errors,
}

impl Record {
    /// State of an object that came from the server. Only an object with an
    /// id counts as persisted.
    pub fn loaded(id: Option<i64>) -> Self {
        Self {
            id,
            persisted: id.is_some(),
            ..Self::default()
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted && self.id.is_some()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn errors(&self) -> &Errors {
        &self.errors
    }

    pub fn errors_mut(&mut self) -> &mut Errors {
        &mut self.errors
    }

    /// Names of attributes changed since the last load or save, in the
    /// order they were first changed.
    pub fn changed_attributes(&self) -> Vec<&'static str> {
        self.changes.iter().map(|(name, _)| *name).collect()
    }

    /// Value `attribute` had before its pending change.
    pub fn attribute_was(&self, attribute: &str) -> Option<&Value> {
        self.changes
            .iter()
            .find(|(name, _)| *name == attribute)
            .map(|(_, value)| value)
    }

    /// Store `value` into `slot`, recording `attribute` as dirty when its
    /// wire form changes. An equal wire form still replaces the value.
    pub fn assign<T: Serialize>(
        &mut self,
        attribute: &'static str,
        slot: &mut T,
        value: T,
    ) -> Result<(), ApiError> {
        if self.destroyed {
            return Err(ApiError::Frozen);
        }
        let current = snapshot(&*slot)?;
        if current != snapshot(&value)? && self.attribute_was(attribute).is_none() {
            self.changes.push((attribute, current));
        }
        *slot = value;
        Ok(())
    }

    fn mark_destroyed(&mut self) {
        self.persisted = false;
        self.destroyed = true;
        self.changes.clear();
    }
}

fn snapshot<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::SerializationError(e.to_string()))
}

/// A server-side entity with CRUD semantics.
pub trait Resource: Sized {
    /// Simple type name the endpoint path is derived from.
    const TYPE_NAME: &'static str;

    /// Wire schema of the resource, without its id.
    type Attributes: Serialize + DeserializeOwned + Default;

    fn from_parts(attributes: Self::Attributes, record: Record) -> Self;
    fn attributes(&self) -> &Self::Attributes;
    fn record(&self) -> &Record;
    fn record_mut(&mut self) -> &mut Record;

    /// Body sent on POST.
    fn create_body(&self) -> Value;

    /// Type-specific rules; messages go into `errors`.
    fn validate(&self, errors: &mut Errors);

    /// `/` followed by the pluralized, dash-separated type name.
    fn path() -> String {
        format!("/{}", pluralize(&resource_name(Self::TYPE_NAME)))
    }

    /// Body sent on PUT: the create body plus the id.
    fn update_body(&self) -> Value {
        let mut body = self.create_body();
        if let (Value::Object(map), Some(id)) = (&mut body, self.id()) {
            map.insert("id".to_string(), Value::from(id));
        }
        body
    }

    /// Build a persisted instance from a server JSON object.
    fn from_json(value: Value) -> Result<Self, ApiError> {
        let (attributes, id) = decode::<Self>(value)?;
        Ok(Self::from_parts(attributes, Record::loaded(id)))
    }

    fn all(client: &Client) -> Result<Vec<Self>, ApiError> {
        let response = client.get(&format!("{}/", Self::path()))?;
        check_ok(&response)?;
        let items: Vec<Value> = parse_json(&response)?;
        items.into_iter().map(Self::from_json).collect()
    }

    fn find(client: &Client, id: i64) -> Result<Self, ApiError> {
        let path = format!("{}/{id}", Self::path());
        let response = client.get(&path)?;
        check_found(&response, &path)?;
        Self::from_json(parse_json(&response)?)
    }

    fn id(&self) -> Option<i64> {
        self.record().id()
    }

    fn is_persisted(&self) -> bool {
        self.record().is_persisted()
    }

    fn is_destroyed(&self) -> bool {
        self.record().is_destroyed()
    }

    fn errors(&self) -> &Errors {
        self.record().errors()
    }

    fn changed_attributes(&self) -> Vec<&'static str> {
        self.record().changed_attributes()
    }

    fn is_changed(&self) -> bool {
        !self.record().changed_attributes().is_empty()
    }

    fn attribute_was(&self, attribute: &str) -> Option<&Value> {
        self.record().attribute_was(attribute)
    }

    /// Clear previous errors and re-run every rule.
    fn is_valid(&mut self) -> bool {
        let mut errors = Errors::default();
        self.validate(&mut errors);
        let valid = errors.is_empty();
        *self.record_mut().errors_mut() = errors;
        valid
    }

    /// Validate, then create or update. Invalid objects never hit the wire.
    fn save(&mut self, client: &Client) -> Result<bool, ApiError> {
        if self.is_destroyed() {
            return Err(ApiError::Frozen);
        }
        if !self.is_valid() {
            return Ok(false);
        }
        if self.is_persisted() {
            self.update(client)
        } else {
            self.create(client)
        }
    }

    fn create(&mut self, client: &Client) -> Result<bool, ApiError> {
        let response = client.post(&format!("{}/", Self::path()), &self.create_body())?;
        self.apply_write(response)
    }

    /// PUT the full body, but only when something changed.
    fn update(&mut self, client: &Client) -> Result<bool, ApiError> {
        let id = match self.id() {
            Some(id) if self.is_persisted() => id,
            _ => return Err(ApiError::NotPersisted),
        };
        if !self.is_changed() {
            return Ok(true);
        }
        let response = client.put(&format!("{}/{id}/", Self::path()), &self.update_body())?;
        self.apply_write(response)
    }

    fn destroy(&mut self, client: &Client) -> Result<bool, ApiError> {
        let id = match self.id() {
            Some(id) if self.is_persisted() => id,
            _ => return Ok(false),
        };
        let response = client.delete(&format!("{}/{id}", Self::path()))?;
        if !response.is_success() {
            self.reject(&response);
            return Ok(false);
        }
        self.record_mut().mark_destroyed();
        Ok(true)
    }

    /// Replace local state with the server's copy.
    fn reload(&mut self, client: &Client) -> Result<(), ApiError> {
        let id = self.id().ok_or(ApiError::NotPersisted)?;
        *self = Self::find(client, id)?;
        Ok(())
    }

    #[doc(hidden)]
    fn apply_write(&mut self, response: HttpResponse) -> Result<bool, ApiError> {
        if !response.is_success() {
            self.reject(&response);
            return Ok(false);
        }
        let (attributes, id) = decode::<Self>(parse_json(&response)?)?;
        let Some(id) = id.or(self.id()) else {
            warn!("{} write returned no id", Self::TYPE_NAME);
            self.record_mut().errors_mut().add(BASE, "server response is missing an id");
            return Ok(false);
        };
        *self = Self::from_parts(attributes, Record::loaded(Some(id)));
        Ok(true)
    }

    #[doc(hidden)]
    fn reject(&mut self, response: &HttpResponse) {
        let message = server_message(response);
        warn!("{} request rejected ({}): {message}", Self::TYPE_NAME, response.status);
        self.record_mut().errors_mut().add(BASE, message);
    }
}

fn decode<R: Resource>(value: Value) -> Result<(R::Attributes, Option<i64>), ApiError> {
    let value = normalize_keys(value);
    let id = value.get("id").and_then(Value::as_i64);
    let attributes = serde_json::from_value(value)
        .map_err(|e| ApiError::DeserializationError(e.to_string()))?;
    Ok((attributes, id))
}
