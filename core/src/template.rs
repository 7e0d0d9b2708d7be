//! Email templates.

use std::ops::Deref;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use serde_with::{serde_as, DefaultOnNull};

use crate::client::{check_ok, parse_json, Client};
use crate::error::ApiError;
use crate::inflect::normalize_keys;
use crate::reference::{Named, Reference};
use crate::resource::{Record, Resource};
use crate::validation::{is_blank, Errors, BASE};

/// A file attached to every email sent from the template.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attachment {
    /// Base64 encoded file content.
    #[serde_as(as = "DefaultOnNull")]
    pub content: String,
    /// MIME type.
    #[serde_as(as = "DefaultOnNull")]
    pub r#type: String,
    #[serde_as(as = "DefaultOnNull")]
    pub name: String,
}

impl Attachment {
    pub fn decoded_content(&self) -> Result<Vec<u8>, ApiError> {
        STANDARD
            .decode(self.content.as_bytes())
            .map_err(|e| ApiError::DeserializationError(e.to_string()))
    }
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateAttributes {
    #[serde_as(as = "DefaultOnNull")]
    pub name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub envelope_sender: String,
    #[serde_as(as = "DefaultOnNull")]
    pub subject: String,
    #[serde_as(as = "DefaultOnNull")]
    pub text: String,
    #[serde_as(as = "DefaultOnNull")]
    pub html: String,
    #[serde_as(as = "DefaultOnNull")]
    pub attachments: Vec<Attachment>,
    pub modified_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct Template {
    attributes: TemplateAttributes,
    record: Record,
}

impl Template {
    pub fn new(attributes: TemplateAttributes) -> Self {
        Self::from_parts(attributes, Record::default())
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), ApiError> {
        self.record.assign("name", &mut self.attributes.name, name.into())
    }

    pub fn set_envelope_sender(&mut self, sender: impl Into<String>) -> Result<(), ApiError> {
        self.record
            .assign("envelope_sender", &mut self.attributes.envelope_sender, sender.into())
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) -> Result<(), ApiError> {
        self.record.assign("subject", &mut self.attributes.subject, subject.into())
    }

    pub fn set_text(&mut self, text: impl Into<String>) -> Result<(), ApiError> {
        self.record.assign("text", &mut self.attributes.text, text.into())
    }

    pub fn set_html(&mut self, html: impl Into<String>) -> Result<(), ApiError> {
        self.record.assign("html", &mut self.attributes.html, html.into())
    }

    pub fn set_attachments(&mut self, attachments: Vec<Attachment>) -> Result<(), ApiError> {
        self.record
            .assign("attachments", &mut self.attributes.attachments, attachments)
    }

    /// Base64 encode `content` and append it as an attachment.
    pub fn add_attachment(
        &mut self,
        content: impl AsRef<[u8]>,
        mime_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<(), ApiError> {
        let mut attachments = self.attributes.attachments.clone();
        attachments.push(Attachment {
            content: STANDARD.encode(content),
            r#type: mime_type.into(),
            name: name.into(),
        });
        self.set_attachments(attachments)
    }

    /// Drop every attachment called `name`. Returns whether any was removed.
    pub fn remove_attachment(&mut self, name: &str) -> Result<bool, ApiError> {
        let mut attachments = self.attributes.attachments.clone();
        attachments.retain(|attachment| attachment.name != name);
        if attachments.len() == self.attributes.attachments.len() {
            return Ok(false);
        }
        self.set_attachments(attachments)?;
        Ok(true)
    }

    /// Ask the server to turn a raw RFC 822 message into template fields.
    ///
    /// With `convert_links` the server rewrites links to the tracking URL.
    pub fn import_email(
        client: &Client,
        content: &str,
        convert_links: bool,
    ) -> Result<TemplateAttributes, ApiError> {
        let body = json!({ "content": content, "convert_links": convert_links });
        let response = client.post("/import/email", &body)?;
        check_ok(&response)?;
        let value: Value = parse_json(&response)?;
        serde_json::from_value(normalize_keys(value))
            .map_err(|e| ApiError::DeserializationError(e.to_string()))
    }
}

impl Deref for Template {
    type Target = TemplateAttributes;

    fn deref(&self) -> &TemplateAttributes {
        &self.attributes
    }
}

impl Named for Template {
    fn name(&self) -> &str {
        &self.attributes.name
    }
}

impl From<Template> for Reference<Template> {
    fn from(template: Template) -> Self {
        Reference::from_resource(template)
    }
}

impl Resource for Template {
    const TYPE_NAME: &'static str = "Template";
    type Attributes = TemplateAttributes;

    fn from_parts(attributes: TemplateAttributes, record: Record) -> Self {
        Self { attributes, record }
    }

    fn attributes(&self) -> &TemplateAttributes {
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
            "envelope_sender": a.envelope_sender,
            "subject": a.subject,
            "text": a.text,
            "html": a.html,
            "attachments": a.attachments,
        })
    }

    fn validate(&self, errors: &mut Errors) {
        errors.require("name", &self.attributes.name);
        if is_blank(&self.attributes.text) && is_blank(&self.attributes.html) {
            errors.add(BASE, "must specify plaintext or HTML");
        }
        for (index, attachment) in self.attributes.attachments.iter().enumerate() {
            let fields = [
                ("content", &attachment.content),
                ("type", &attachment.r#type),
                ("name", &attachment.name),
            ];
            for (field, value) in fields {
                if is_blank(value) {
                    errors.add("attachments", format!("at index {index} is missing {field}"));
                }
            }
        }
    }
}
