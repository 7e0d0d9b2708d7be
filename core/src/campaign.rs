//! Campaigns and the per-recipient data the server reports back for them.
//!
//! # Design
//! A campaign points at a template, a landing page, an SMTP profile and one
//! or more groups. Each pointer is a [`Reference`], so callers may pass a
//! full resource, a bare name or a raw map; on the wire every one of them
//! becomes `{"name": ...}`. Results and the event timeline are read-only
//! mirrors of server state.

use std::ops::Deref;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use serde_with::{serde_as, DefaultOnNull};

use crate::client::{check_found, parse_json, server_message, Client};
use crate::error::ApiError;
use crate::group::Group;
use crate::page::Page;
use crate::reference::{Named, Reference};
use crate::resource::{Record, Resource};
use crate::smtp::Smtp;
use crate::template::Template;
use crate::validation::{is_blank, Errors};

pub const STATUS_IN_PROGRESS: &str = "In progress";
pub const STATUS_COMPLETED: &str = "Completed";

/// Outcome of sending to one recipient.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignResult {
    /// Recipient id used in tracking links.
    #[serde_as(as = "DefaultOnNull")]
    pub id: String,
    #[serde_as(as = "DefaultOnNull")]
    pub first_name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub last_name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub position: String,
    #[serde_as(as = "DefaultOnNull")]
    pub email: String,
    #[serde_as(as = "DefaultOnNull")]
    pub status: String,
    #[serde_as(as = "DefaultOnNull")]
    pub ip: String,
    #[serde_as(as = "DefaultOnNull")]
    pub latitude: f64,
    #[serde_as(as = "DefaultOnNull")]
    pub longitude: f64,
    pub send_date: Option<DateTime<Utc>>,
    #[serde_as(as = "DefaultOnNull")]
    pub reported: bool,
    pub modified_date: Option<DateTime<Utc>>,
}

/// One entry of a campaign's timeline.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
    #[serde_as(as = "DefaultOnNull")]
    pub email: String,
    pub time: Option<DateTime<Utc>>,
    #[serde_as(as = "DefaultOnNull")]
    pub message: String,
    /// JSON document encoded as a string.
    #[serde_as(as = "DefaultOnNull")]
    pub details: String,
}

impl Event {
    /// Decoded `details`; an empty object when they are blank or malformed.
    pub fn parsed_details(&self) -> Value {
        serde_json::from_str(&self.details).unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

/// Response of `GET /campaigns/{id}/results`.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CampaignResults {
    pub id: i64,
    #[serde_as(as = "DefaultOnNull")]
    pub name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub status: String,
    #[serde_as(as = "DefaultOnNull")]
    pub results: Vec<CampaignResult>,
    #[serde_as(as = "DefaultOnNull")]
    pub timeline: Vec<Event>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CampaignStats {
    pub total: i64,
    pub sent: i64,
    pub opened: i64,
    pub clicked: i64,
    pub submitted_data: i64,
    pub email_reported: i64,
    pub error: i64,
}

/// Response of `GET /campaigns/{id}/summary`.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CampaignSummary {
    pub id: i64,
    #[serde_as(as = "DefaultOnNull")]
    pub name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub status: String,
    pub created_date: Option<DateTime<Utc>>,
    pub launch_date: Option<DateTime<Utc>>,
    pub send_by_date: Option<DateTime<Utc>>,
    pub completed_date: Option<DateTime<Utc>>,
    pub stats: CampaignStats,
}

/// Gophish's `{success, message, data}` envelope.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiMessage {
    pub success: bool,
    #[serde_as(as = "DefaultOnNull")]
    pub message: String,
    pub data: Value,
}

#[serde_as]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignAttributes {
    #[serde_as(as = "DefaultOnNull")]
    pub name: String,
    pub template: Option<Reference<Template>>,
    pub page: Option<Reference<Page>>,
    #[serde_as(as = "DefaultOnNull")]
    pub groups: Vec<Reference<Group>>,
    pub smtp: Option<Reference<Smtp>>,
    #[serde_as(as = "DefaultOnNull")]
    pub url: String,
    pub created_date: Option<DateTime<Utc>>,
    pub launch_date: Option<DateTime<Utc>>,
    pub send_by_date: Option<DateTime<Utc>>,
    pub completed_date: Option<DateTime<Utc>>,
    #[serde_as(as = "DefaultOnNull")]
    pub status: String,
    #[serde_as(as = "DefaultOnNull")]
    pub results: Vec<CampaignResult>,
    #[serde_as(as = "DefaultOnNull")]
    pub timeline: Vec<Event>,
}

#[derive(Debug, Clone, Default)]
pub struct Campaign {
    attributes: CampaignAttributes,
    record: Record,
}

impl Campaign {
    pub fn new(attributes: CampaignAttributes) -> Self {
        Self::from_parts(attributes, Record::default())
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), ApiError> {
        self.record.assign("name", &mut self.attributes.name, name.into())
    }

    pub fn set_template(
        &mut self,
        template: impl Into<Reference<Template>>,
    ) -> Result<(), ApiError> {
        self.record
            .assign("template", &mut self.attributes.template, Some(template.into()))
    }

    pub fn set_page(&mut self, page: impl Into<Reference<Page>>) -> Result<(), ApiError> {
        self.record.assign("page", &mut self.attributes.page, Some(page.into()))
    }

    pub fn set_smtp(&mut self, smtp: impl Into<Reference<Smtp>>) -> Result<(), ApiError> {
        self.record.assign("smtp", &mut self.attributes.smtp, Some(smtp.into()))
    }

    pub fn set_groups(&mut self, groups: Vec<Reference<Group>>) -> Result<(), ApiError> {
        self.record.assign("groups", &mut self.attributes.groups, groups)
    }

    pub fn add_group(&mut self, group: impl Into<Reference<Group>>) -> Result<(), ApiError> {
        let mut groups = self.attributes.groups.clone();
        groups.push(group.into());
        self.set_groups(groups)
    }

    pub fn set_url(&mut self, url: impl Into<String>) -> Result<(), ApiError> {
        self.record.assign("url", &mut self.attributes.url, url.into())
    }

    pub fn set_launch_date(&mut self, date: Option<DateTime<Utc>>) -> Result<(), ApiError> {
        self.record.assign("launch_date", &mut self.attributes.launch_date, date)
    }

    pub fn set_send_by_date(&mut self, date: Option<DateTime<Utc>>) -> Result<(), ApiError> {
        self.record
            .assign("send_by_date", &mut self.attributes.send_by_date, date)
    }

    pub fn is_in_progress(&self) -> bool {
        self.attributes.status == STATUS_IN_PROGRESS
    }

    pub fn is_completed(&self) -> bool {
        self.attributes.status == STATUS_COMPLETED
    }

    /// The launch date has been reached.
    pub fn is_launched(&self) -> bool {
        self.attributes
            .launch_date
            .is_some_and(|launch| launch <= Utc::now())
    }

    /// Ask the server to stop the campaign.
    ///
    /// The local status only flips to "Completed" when the server reports
    /// success; otherwise its reply is handed back and nothing changes.
    pub fn complete(&mut self, client: &Client) -> Result<ApiMessage, ApiError> {
        let id = self.persisted_id()?;
        let response = client.get(&format!("{}/{id}/complete", Self::path()))?;
        let message = parse_json::<ApiMessage>(&response).unwrap_or_else(|_| ApiMessage {
            success: false,
            message: server_message(&response),
            data: Value::Null,
        });
        if response.is_success() && message.success {
            self.attributes.status = STATUS_COMPLETED.to_string();
        }
        Ok(message)
    }

    pub fn results(&self, client: &Client) -> Result<CampaignResults, ApiError> {
        Self::results_by_id(client, self.persisted_id()?)
    }

    pub fn summary(&self, client: &Client) -> Result<CampaignSummary, ApiError> {
        Self::summary_by_id(client, self.persisted_id()?)
    }

    pub fn results_by_id(client: &Client, id: i64) -> Result<CampaignResults, ApiError> {
        Self::fetch(client, id, "results")
    }

    pub fn summary_by_id(client: &Client, id: i64) -> Result<CampaignSummary, ApiError> {
        Self::fetch(client, id, "summary")
    }

    pub fn complete_by_id(client: &Client, id: i64) -> Result<ApiMessage, ApiError> {
        Self::fetch(client, id, "complete")
    }

    fn fetch<T: serde::de::DeserializeOwned>(
        client: &Client,
        id: i64,
        action: &str,
    ) -> Result<T, ApiError> {
        let path = format!("{}/{id}/{action}", Self::path());
        let response = client.get(&path)?;
        check_found(&response, &path)?;
        parse_json(&response)
    }

    fn persisted_id(&self) -> Result<i64, ApiError> {
        match self.id() {
            Some(id) if self.is_persisted() => Ok(id),
            _ => Err(ApiError::NotPersisted),
        }
    }
}

impl Deref for Campaign {
    type Target = CampaignAttributes;

    fn deref(&self) -> &CampaignAttributes {
        &self.attributes
    }
}

impl Named for Campaign {
    fn name(&self) -> &str {
        &self.attributes.name
    }
}

fn require_reference<R: Named>(
    errors: &mut Errors,
    attribute: &str,
    reference: &Option<Reference<R>>,
) {
    if !reference.as_ref().is_some_and(Reference::has_name) {
        errors.add(attribute, "can't be blank");
    }
}

impl Resource for Campaign {
    const TYPE_NAME: &'static str = "Campaign";
    type Attributes = CampaignAttributes;

    fn from_parts(attributes: CampaignAttributes, record: Record) -> Self {
        Self { attributes, record }
    }

    fn attributes(&self) -> &CampaignAttributes {
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
        let groups: Vec<Value> = a.groups.iter().map(Reference::to_json).collect();
        let mut body = json!({
            "name": a.name,
            "template": a.template.as_ref().map(Reference::to_json),
            "page": a.page.as_ref().map(Reference::to_json),
            "groups": groups,
            "smtp": a.smtp.as_ref().map(Reference::to_json),
            "url": a.url,
        });
        if let Some(date) = a.launch_date {
            body["launch_date"] = json!(date);
        }
        if let Some(date) = a.send_by_date {
            body["send_by_date"] = json!(date);
        }
        body
    }

    fn validate(&self, errors: &mut Errors) {
        let a = &self.attributes;
        errors.require("name", &a.name);
        require_reference(errors, "template", &a.template);
        require_reference(errors, "page", &a.page);
        require_reference(errors, "smtp", &a.smtp);
        if a.groups.is_empty() {
            errors.add("groups", "can't be blank");
        }
        for (index, group) in a.groups.iter().enumerate() {
            if !group.has_name() {
                errors.add("groups", format!("at index {index} is missing a name"));
            }
        }
        errors.require("url", &a.url);
        for (index, result) in a.results.iter().enumerate() {
            if is_blank(&result.email) {
                errors.add("results", format!("at index {index} is missing email"));
            }
        }
        for (index, event) in a.timeline.iter().enumerate() {
            if event.time.is_none() {
                errors.add("timeline", format!("at index {index} is missing time"));
            }
            if is_blank(&event.message) {
                errors.add("timeline", format!("at index {index} is missing message"));
            }
        }
    }
}
