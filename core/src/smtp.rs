//! SMTP sending profiles.

use std::ops::Deref;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use serde_with::{serde_as, DefaultOnNull};

use crate::error::ApiError;
use crate::reference::{Named, Reference};
use crate::resource::{Record, Resource};
use crate::validation::{is_blank, is_from_address, Errors};

const DEFAULT_INTERFACE_TYPE: &str = "SMTP";

/// Extra header added to every message sent through the profile.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Header {
    #[serde_as(as = "DefaultOnNull")]
    pub key: String,
    #[serde_as(as = "DefaultOnNull")]
    pub value: String,
}

impl Header {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpAttributes {
    #[serde_as(as = "DefaultOnNull")]
    pub name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub host: String,
    #[serde_as(as = "DefaultOnNull")]
    pub from_address: String,
    #[serde_as(as = "DefaultOnNull")]
    pub username: String,
    #[serde_as(as = "DefaultOnNull")]
    pub password: String,
    #[serde(deserialize_with = "interface_type_or_default")]
    pub interface_type: String,
    #[serde_as(as = "DefaultOnNull")]
    pub ignore_cert_errors: bool,
    #[serde_as(as = "DefaultOnNull")]
    pub headers: Vec<Header>,
    pub modified_date: Option<DateTime<Utc>>,
}

fn interface_type_or_default<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<String, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.unwrap_or_else(|| DEFAULT_INTERFACE_TYPE.to_string()))
}

impl Default for SmtpAttributes {
    fn default() -> Self {
        Self {
            name: String::new(),
            host: String::new(),
            from_address: String::new(),
            username: String::new(),
            password: String::new(),
            interface_type: DEFAULT_INTERFACE_TYPE.to_string(),
            ignore_cert_errors: false,
            headers: Vec::new(),
            modified_date: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Smtp {
    attributes: SmtpAttributes,
    record: Record,
}

impl Smtp {
    pub fn new(attributes: SmtpAttributes) -> Self {
        Self::from_parts(attributes, Record::default())
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), ApiError> {
        self.record.assign("name", &mut self.attributes.name, name.into())
    }

    pub fn set_host(&mut self, host: impl Into<String>) -> Result<(), ApiError> {
        self.record.assign("host", &mut self.attributes.host, host.into())
    }

    pub fn set_from_address(&mut self, address: impl Into<String>) -> Result<(), ApiError> {
        self.record
            .assign("from_address", &mut self.attributes.from_address, address.into())
    }

    pub fn set_username(&mut self, username: impl Into<String>) -> Result<(), ApiError> {
        self.record.assign("username", &mut self.attributes.username, username.into())
    }

    pub fn set_password(&mut self, password: impl Into<String>) -> Result<(), ApiError> {
        self.record.assign("password", &mut self.attributes.password, password.into())
    }

    pub fn set_interface_type(
        &mut self,
        interface_type: impl Into<String>,
    ) -> Result<(), ApiError> {
        self.record.assign(
            "interface_type",
            &mut self.attributes.interface_type,
            interface_type.into(),
        )
    }

    pub fn set_ignore_cert_errors(&mut self, ignore: bool) -> Result<(), ApiError> {
        self.record
            .assign("ignore_cert_errors", &mut self.attributes.ignore_cert_errors, ignore)
    }

    pub fn set_headers(&mut self, headers: Vec<Header>) -> Result<(), ApiError> {
        self.record.assign("headers", &mut self.attributes.headers, headers)
    }

    pub fn add_header(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), ApiError> {
        let mut headers = self.attributes.headers.clone();
        headers.push(Header::new(key, value));
        self.set_headers(headers)
    }

    /// Drop every header named `key`. Returns whether any was removed.
    pub fn remove_header(&mut self, key: &str) -> Result<bool, ApiError> {
        let mut headers = self.attributes.headers.clone();
        headers.retain(|header| header.key != key);
        if headers.len() == self.attributes.headers.len() {
            return Ok(false);
        }
        self.set_headers(headers)?;
        Ok(true)
    }

    /// Both a username and a password are configured.
    pub fn has_authentication(&self) -> bool {
        !is_blank(&self.attributes.username) && !is_blank(&self.attributes.password)
    }
}

impl Deref for Smtp {
    type Target = SmtpAttributes;

    fn deref(&self) -> &SmtpAttributes {
        &self.attributes
    }
}

impl Named for Smtp {
    fn name(&self) -> &str {
        &self.attributes.name
    }
}

impl From<Smtp> for Reference<Smtp> {
    fn from(smtp: Smtp) -> Self {
        Reference::from_resource(smtp)
    }
}

impl Resource for Smtp {
    const TYPE_NAME: &'static str = "Smtp";
    type Attributes = SmtpAttributes;

    /// The API serves sending profiles from the singular `/smtp`.
    fn path() -> String {
        "/smtp".to_string()
    }

    fn from_parts(attributes: SmtpAttributes, record: Record) -> Self {
        Self { attributes, record }
    }

    fn attributes(&self) -> &SmtpAttributes {
        &self.attributes
    }

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn create_body(&self) -> Value {
        let a = &self.attributes;
        json!({
            "name": a.name,
            "username": a.username,
            "password": a.password,
            "host": a.host,
            "interface_type": a.interface_type,
            "from_address": a.from_address,
            "ignore_cert_errors": a.ignore_cert_errors,
            "headers": a.headers,
        })
    }

    fn validate(&self, errors: &mut Errors) {
        errors.require("name", &self.attributes.name);
        errors.require("host", &self.attributes.host);
        if is_blank(&self.attributes.from_address) {
            errors.add("from_address", "can't be blank");
        } else if !is_from_address(&self.attributes.from_address) {
            errors.add("from_address", "is not a valid email address");
        }
        for (index, header) in self.attributes.headers.iter().enumerate() {
            if is_blank(&header.key) {
                errors.add("headers", format!("at index {index} is missing key"));
            }
            if is_blank(&header.value) {
                errors.add("headers", format!("at index {index} is missing value"));
            }
        }
    }
}
