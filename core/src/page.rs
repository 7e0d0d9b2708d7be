//! Landing pages.

use std::ops::Deref;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use serde_with::{serde_as, DefaultOnNull};

use crate::client::{check_ok, parse_json, Client};
use crate::error::ApiError;
use crate::inflect::normalize_keys;
use crate::reference::{Named, Reference};
use crate::resource::{Record, Resource};
use crate::validation::Errors;

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageAttributes {
    #[serde_as(as = "DefaultOnNull")]
    pub name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub html: String,
    #[serde_as(as = "DefaultOnNull")]
    pub capture_credentials: bool,
    #[serde_as(as = "DefaultOnNull")]
    pub capture_passwords: bool,
    #[serde_as(as = "DefaultOnNull")]
    pub redirect_url: String,
    pub modified_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct Page {
    attributes: PageAttributes,
    record: Record,
}

impl Page {
    pub fn new(attributes: PageAttributes) -> Self {
        Self::from_parts(attributes, Record::default())
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), ApiError> {
        self.record.assign("name", &mut self.attributes.name, name.into())
    }

    pub fn set_html(&mut self, html: impl Into<String>) -> Result<(), ApiError> {
        self.record.assign("html", &mut self.attributes.html, html.into())
    }

    pub fn set_capture_credentials(&mut self, capture: bool) -> Result<(), ApiError> {
        self.record
            .assign("capture_credentials", &mut self.attributes.capture_credentials, capture)
    }

    pub fn set_capture_passwords(&mut self, capture: bool) -> Result<(), ApiError> {
        self.record
            .assign("capture_passwords", &mut self.attributes.capture_passwords, capture)
    }

    pub fn set_redirect_url(&mut self, url: impl Into<String>) -> Result<(), ApiError> {
        self.record
            .assign("redirect_url", &mut self.attributes.redirect_url, url.into())
    }

    /// Have the server clone the page at `url`. With `include_resources`
    /// the stylesheets, scripts and images are fetched as well.
    pub fn import_site(
        client: &Client,
        url: &str,
        include_resources: bool,
    ) -> Result<PageAttributes, ApiError> {
        let body = json!({ "url": url, "include_resources": include_resources });
        let response = client.post("/import/site", &body)?;
        check_ok(&response)?;
        let value: Value = parse_json(&response)?;
        serde_json::from_value(normalize_keys(value))
            .map_err(|e| ApiError::DeserializationError(e.to_string()))
    }
}

impl Deref for Page {
    type Target = PageAttributes;

    fn deref(&self) -> &PageAttributes {
        &self.attributes
    }
}

impl Named for Page {
    fn name(&self) -> &str {
        &self.attributes.name
    }
}

impl From<Page> for Reference<Page> {
    fn from(page: Page) -> Self {
        Reference::from_resource(page)
    }
}

impl Resource for Page {
    const TYPE_NAME: &'static str = "Page";
    type Attributes = PageAttributes;

    fn from_parts(attributes: PageAttributes, record: Record) -> Self {
        Self { attributes, record }
    }

    fn attributes(&self) -> &PageAttributes {
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
            "html": a.html,
            "capture_credentials": a.capture_credentials,
            "capture_passwords": a.capture_passwords,
            "redirect_url": a.redirect_url,
        })
    }

    fn validate(&self, errors: &mut Errors) {
        errors.require("name", &self.attributes.name);
        errors.require("html", &self.attributes.html);
    }
}
