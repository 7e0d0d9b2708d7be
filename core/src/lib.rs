//! Synchronous, typed client for the Gophish phishing-simulation REST API.
//!
//! # Overview
//! Groups, templates, landing pages, SMTP profiles and campaigns are local
//! objects with CRUD semantics. Build them in memory, validate, `save` them
//! through a [`Client`], and load them back with `all` / `find`.
//!
//! ```no_run
//! use gophish::{Client, Config, Group, GroupAttributes, Resource, Target};
//!
//! # fn main() -> Result<(), gophish::ApiError> {
//! let client = Client::new(Config::new("https://localhost:3333", "api-key"))?;
//!
//! let mut group = Group::new(GroupAttributes {
//!     name: "Finance".to_string(),
//!     targets: vec![Target::new("Ada", "Lovelace", "ada@example.com", "Analyst")],
//!     ..Default::default()
//! });
//! if !group.save(&client)? {
//!     eprintln!("{:?}", group.errors().full_messages());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Design
//! - `Client` owns an immutable `Config` and a pluggable `Transport`; every
//!   resource operation borrows it.
//! - Each resource is a serde attribute struct plus a `Record` holding id,
//!   persistence flags, dirty set and validation errors. The shared CRUD
//!   logic lives on the `Resource` trait.
//! - Validation and rejected writes return `Ok(false)` and fill the error
//!   collection; lookups, imports and transport failures return `Err`.

pub mod campaign;
pub mod client;
pub mod config;
pub mod error;
pub mod group;
pub mod http;
pub mod inflect;
pub mod page;
pub mod reference;
pub mod resource;
pub mod smtp;
pub mod template;
pub mod validation;

#[cfg(test)]
mod testing;

pub use campaign::{
    ApiMessage, Campaign, CampaignAttributes, CampaignResult, CampaignResults, CampaignStats,
    CampaignSummary, Event,
};
pub use client::Client;
pub use config::Config;
pub use error::ApiError;
pub use group::{Group, GroupAttributes, Target};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use page::{Page, PageAttributes};
pub use reference::{Named, Reference};
pub use resource::{Record, Resource};
pub use smtp::{Header, Smtp, SmtpAttributes};
pub use template::{Attachment, Template, TemplateAttributes};
pub use validation::Errors;
