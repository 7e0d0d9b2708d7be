//! Attribute-scoped validation messages and the shared checks behind them.

use once_cell::sync::Lazy;
use regex::Regex;

/// Key for messages that belong to the whole resource.
pub const BASE: &str = "base";

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s.]+(\.[^@\s.]+)+$").expect("email pattern compiles")
});

// Accepts a bare address or `Display Name <address>`, brackets paired.
static FROM_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^(?:[^@\s<>]+@[^@\s<>.]+(?:\.[^@\s<>.]+)+",
        r"|[^<>]*<\s*[^@\s<>]+@[^@\s<>.]+(?:\.[^@\s<>.]+)+\s*>)$"
    ))
    .expect("from address pattern compiles")
});

/// Ordered collection of validation and server messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Errors {
    entries: Vec<(String, String)>,
}

impl Errors {
    pub fn add(&mut self, attribute: &str, message: impl Into<String>) {
        self.entries.push((attribute.to_string(), message.into()));
    }

    /// Record "can't be blank" against `attribute` when `value` is blank.
    pub fn require(&mut self, attribute: &str, value: &str) {
        if is_blank(value) {
            self.add(attribute, "can't be blank");
        }
    }

    pub fn get(&self, attribute: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(key, _)| key == attribute)
            .map(|(_, message)| message.as_str())
            .collect()
    }

    pub fn contains(&self, attribute: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == attribute)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, message)| (key.as_str(), message.as_str()))
    }

    /// `"name can't be blank"`, with base messages left unprefixed.
    pub fn full_messages(&self) -> Vec<String> {
        self.iter()
            .map(|(key, message)| match key {
                BASE => message.to_string(),
                _ => format!("{key} {message}"),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// `local@domain.tld` with no whitespace.
pub fn is_email(value: &str) -> bool {
    EMAIL.is_match(value.trim())
}

pub fn is_from_address(value: &str) -> bool {
    FROM_ADDRESS.is_match(value.trim())
}
