//! Target groups: named lists of people a campaign sends to.

use std::ops::Deref;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use serde_with::{serde_as, DefaultOnNull};

use crate::error::ApiError;
use crate::reference::{Named, Reference};
use crate::resource::{Record, Resource};
use crate::validation::{is_blank, is_email, Errors};

/// One recipient.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Target {
    #[serde_as(as = "DefaultOnNull")]
    pub first_name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub last_name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub email: String,
    #[serde_as(as = "DefaultOnNull")]
    pub position: String,
}

impl Target {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        position: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            position: position.into(),
        }
    }
}

// Column names of the CSV export the Gophish UI produces.
#[derive(Deserialize)]
struct CsvTarget {
    #[serde(rename = "First Name")]
    first_name: String,
    #[serde(rename = "Last Name")]
    last_name: String,
    #[serde(rename = "Email")]
    email: String,
    #[serde(rename = "Position")]
    position: String,
}

impl From<CsvTarget> for Target {
    fn from(row: CsvTarget) -> Self {
        Target::new(row.first_name, row.last_name, row.email, row.position)
    }
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupAttributes {
    #[serde_as(as = "DefaultOnNull")]
    pub name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub targets: Vec<Target>,
    pub modified_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct Group {
    attributes: GroupAttributes,
    record: Record,
}

impl Group {
    pub fn new(attributes: GroupAttributes) -> Self {
        Self::from_parts(attributes, Record::default())
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), ApiError> {
        self.record.assign("name", &mut self.attributes.name, name.into())
    }

    pub fn set_targets(&mut self, targets: Vec<Target>) -> Result<(), ApiError> {
        self.record.assign("targets", &mut self.attributes.targets, targets)
    }

    /// Replace the target list with the rows of a
    /// `First Name,Last Name,Email,Position` CSV document.
    pub fn import_csv(&mut self, text: &str) -> Result<(), ApiError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());
        let targets = reader
            .deserialize::<CsvTarget>()
            .map(|row| row.map(Target::from))
            .collect::<Result<Vec<_>, _>>()?;
        self.set_targets(targets)
    }
}

impl Deref for Group {
    type Target = GroupAttributes;

    fn deref(&self) -> &GroupAttributes {
        &self.attributes
    }
}

impl Named for Group {
    fn name(&self) -> &str {
        &self.attributes.name
    }
}

impl From<Group> for Reference<Group> {
    fn from(group: Group) -> Self {
        Reference::from_resource(group)
    }
}

impl Resource for Group {
    const TYPE_NAME: &'static str = "Group";
    type Attributes = GroupAttributes;

    fn from_parts(attributes: GroupAttributes, record: Record) -> Self {
        Self { attributes, record }
    }

    fn attributes(&self) -> &GroupAttributes {
        &self.attributes
    }

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn create_body(&self) -> Value {
        json!({
            "name": self.attributes.name,
            "targets": self.attributes.targets,
        })
    }

    fn validate(&self, errors: &mut Errors) {
        errors.require("name", &self.attributes.name);
        for (index, target) in self.attributes.targets.iter().enumerate() {
            let fields = [
                ("first_name", &target.first_name),
                ("last_name", &target.last_name),
                ("position", &target.position),
            ];
            for (field, value) in fields {
                if is_blank(value) {
                    errors.add("targets", format!("at index {index} is missing {field}"));
                }
            }
            if is_blank(&target.email) {
                errors.add("targets", format!("at index {index} is missing email"));
            } else if !is_email(&target.email) {
                errors.add("targets", format!("at index {index} has an invalid email"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::MockTransport;
    use crate::{Client, Config};

    fn client_with(transport: &Arc<MockTransport>) -> Client {
        Client::with_transport(Config::new("https://localhost:3333", "k"), transport.clone())
            .unwrap()
    }

    fn valid_group() -> Group {
        Group::new(GroupAttributes {
            name: "T".to_string(),
            targets: vec![Target::new("A", "B", "a@b.com", "X")],
            ..Default::default()
        })
    }

    const CSV: &str = "First Name,Last Name,Email,Position\n\
                       Ada,Lovelace,ada@example.com,Analyst\n\
                       Alan,Turing,alan@example.com,Cryptographer\n";

    #[test]
    fn path_is_pluralized() {
        assert_eq!(Group::path(), "/groups");
    }

    #[test]
    fn valid_group_passes() {
        let mut group = valid_group();
        assert!(group.is_valid());
        assert!(group.errors().is_empty());
    }

    #[test]
    fn blank_name_adds_one_error() {
        let mut group = valid_group();
        group.set_name("").unwrap();
        assert!(!group.is_valid());
        assert_eq!(group.errors().len(), 1);
        assert_eq!(group.errors().get("name"), vec!["can't be blank"]);
    }

    #[test]
    fn each_blank_target_field_is_reported_once() {
        for field in ["first_name", "last_name", "position", "email"] {
            let mut target = Target::new("A", "B", "a@b.com", "X");
            match field {
                "first_name" => target.first_name.clear(),
                "last_name" => target.last_name.clear(),
                "position" => target.position.clear(),
                _ => target.email.clear(),
            }
            let mut group = valid_group();
            group.set_targets(vec![target]).unwrap();
            assert!(!group.is_valid(), "{field}");
            assert_eq!(
                group.errors().get("targets"),
                vec![format!("at index 0 is missing {field}").as_str()]
            );
        }
    }

    #[test]
    fn malformed_email_has_its_own_message() {
        let mut group = valid_group();
        group
            .set_targets(vec![Target::new("A", "B", "not-an-email", "X")])
            .unwrap();
        assert!(!group.is_valid());
        assert_eq!(group.errors().get("targets"), vec!["at index 0 has an invalid email"]);
    }

    #[test]
    fn import_csv_replaces_targets_in_order() {
        let mut group = Group::new(GroupAttributes {
            name: "Staff".to_string(),
            targets: vec![Target::new("Old", "Entry", "old@example.com", "Gone")],
            ..Default::default()
        });
        group.import_csv(CSV).unwrap();

        assert_eq!(group.targets.len(), 2);
        assert_eq!(group.targets[0], Target::new("Ada", "Lovelace", "ada@example.com", "Analyst"));
        assert_eq!(group.targets[1].first_name, "Alan");
        assert_eq!(group.changed_attributes(), vec!["targets"]);

        let keys: Vec<String> = serde_json::to_value(&group.targets[0])
            .unwrap()
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys.len(), 4);
        for key in ["first_name", "last_name", "email", "position"] {
            assert!(keys.iter().any(|k| k == key));
        }
    }

    #[test]
    fn import_csv_with_wrong_headers_fails() {
        let mut group = valid_group();
        let err = group
            .import_csv("first,last,mail,role\nA,B,a@b.com,X\n")
            .unwrap_err();
        assert!(matches!(err, ApiError::Csv(_)));
        assert_eq!(group.targets.len(), 1);
    }

    #[test]
    fn import_csv_with_ragged_rows_fails() {
        let mut group = valid_group();
        let err = group
            .import_csv("First Name,Last Name,Email,Position\nA,B\n")
            .unwrap_err();
        assert!(matches!(err, ApiError::Csv(_)));
    }

    #[test]
    fn create_then_persisted() {
        let transport = Arc::new(MockTransport::new());
        transport.respond_json(
            201,
            json!({
                "id": 5,
                "name": "T",
                "targets": [
                    {"first_name": "A", "last_name": "B", "email": "a@b.com", "position": "X"}
                ],
                "modified_date": "2024-03-01T10:00:00Z"
            }),
        );
        let client = client_with(&transport);

        let mut group = valid_group();
        assert!(group.save(&client).unwrap());

        assert_eq!(group.id(), Some(5));
        assert!(group.is_persisted());
        assert!(!group.is_changed());
        assert!(group.modified_date.is_some());

        let request = &transport.requests()[0];
        assert_eq!(request.url, "https://localhost:3333/api/groups/");
        let body = transport.body(0);
        assert_eq!(body["name"], "T");
        assert_eq!(body["targets"][0]["email"], "a@b.com");
        assert!(body.get("id").is_none());
    }

    #[test]
    fn invalid_group_never_hits_the_wire() {
        let transport = Arc::new(MockTransport::new());
        let client = client_with(&transport);
        let mut group = Group::default();
        assert!(!group.save(&client).unwrap());
        assert_eq!(transport.call_count(), 0);
        assert!(group.errors().contains("name"));
    }

    #[test]
    fn rejected_create_reports_server_message() {
        let transport = Arc::new(MockTransport::new());
        transport.respond_json(
            409,
            json!({"success": false, "message": "Group name already in use", "data": null}),
        );
        let client = client_with(&transport);

        let mut group = valid_group();
        assert!(!group.save(&client).unwrap());
        assert!(!group.is_persisted());
        assert_eq!(group.errors().get("base"), vec!["Group name already in use"]);
    }

    #[test]
    fn update_puts_full_body_with_id() {
        let transport = Arc::new(MockTransport::new());
        transport.respond_json(200, json!({"id": 5, "name": "Renamed", "targets": []}));
        let client = client_with(&transport);

        let mut group = Group::from_json(json!({"id": 5, "name": "T", "targets": []})).unwrap();
        group.set_name("Renamed").unwrap();
        assert!(group.save(&client).unwrap());

        let request = &transport.requests()[0];
        assert_eq!(request.url, "https://localhost:3333/api/groups/5/");
        let body = transport.body(0);
        assert_eq!(body["id"], 5);
        assert_eq!(body["name"], "Renamed");
        assert!(body["targets"].is_array());
        assert_eq!(group.name, "Renamed");
    }

    #[test]
    fn scalar_targets_fail_hydration() {
        let err = Group::from_json(json!({"id": 1, "name": "G", "targets": ["bob"]})).unwrap_err();
        assert!(matches!(err, ApiError::DeserializationError(_)));
    }

    #[test]
    fn null_fields_hydrate_to_defaults() {
        let group = Group::from_json(json!({"id": 2, "name": null, "targets": null})).unwrap();
        assert!(group.name.is_empty());
        assert!(group.targets.is_empty());
    }
}
