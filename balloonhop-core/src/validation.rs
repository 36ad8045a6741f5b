//! Request bodies are checked with `garde` and reported zod-style:
//! `{ "formErrors": [...], "fieldErrors": { "email": ["not a valid email"] } }`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationErrors {
    pub form_errors: Vec<String>,
    pub field_errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn form(message: impl Into<String>) -> Self {
        Self {
            form_errors: vec![message.into()],
            field_errors: BTreeMap::new(),
        }
    }

    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.field_errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn add_form(&mut self, message: impl Into<String>) {
        self.form_errors.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.form_errors.is_empty() && self.field_errors.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.field_errors.contains_key(field)
    }

    /// `Ok(value)` when nothing was recorded.
    pub fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

/// Reports are keyed by the wire name of the top-level field, so
/// `launch_location.coordinates[0]` lands under `launchLocation`.
impl From<garde::Report> for ValidationErrors {
    fn from(report: garde::Report) -> Self {
        let mut errors = Self::new();
        for (path, error) in report.iter() {
            let path = path.to_string();
            let root = path.split(['.', '[']).next().unwrap_or_default();
            if root.is_empty() {
                errors.add_form(error.to_string());
            } else {
                errors.add(&camel_case(root), error.to_string());
            }
        }
        errors
    }
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts: Vec<String> = self.form_errors.clone();
        for (field, messages) in &self.field_errors {
            parts.push(format!("{}: {}", field, messages.join(", ")));
        }
        f.write_str(&parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// A request body that passes its `garde` rules and is then normalized
/// into the value handlers work with.
pub trait Checked: garde::Validate + Sized {
    type Output;

    /// Only called once the `garde` rules hold.
    fn normalize(self) -> Result<Self::Output, ValidationErrors>;

    fn check_with(self, ctx: &Self::Context) -> Result<Self::Output, ValidationErrors> {
        self.validate_with(ctx)?;
        self.normalize()
    }

    fn check(self) -> Result<Self::Output, ValidationErrors>
    where
        Self::Context: Default,
    {
        self.check_with(&<Self::Context as Default>::default())
    }
}

/// Reference instant for time-relative rules. Defaults to the current time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Now(pub DateTime<Utc>);

impl Default for Now {
    fn default() -> Self {
        Self(Utc::now())
    }
}

// Shared field rules and serde helpers for request bodies.

pub(crate) fn valid_uuid<C>(value: &str, _: &C) -> garde::Result {
    Uuid::parse_str(value)
        .map(|_| ())
        .map_err(|_| garde::Error::new("not a valid uuid"))
}

pub(crate) fn parse_uuid(field: &str, value: &str) -> Result<Uuid, ValidationErrors> {
    Uuid::parse_str(value).map_err(|_| ValidationErrors::field(field, "not a valid uuid"))
}

/// Deserializes a string with surrounding whitespace removed.
pub(crate) fn trimmed<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    String::deserialize(de).map(|s| s.trim().to_string())
}

pub(crate) fn trimmed_opt<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    Option::<String>::deserialize(de).map(|s| s.map(|s| s.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use garde::Validate;

    #[derive(Debug, Deserialize, Validate)]
    #[serde(rename_all = "camelCase")]
    struct Contact {
        #[serde(default, deserialize_with = "trimmed")]
        #[garde(length(chars, min = 1))]
        first_name: String,
        #[serde(default, deserialize_with = "trimmed")]
        #[garde(email)]
        email_address: String,
        #[serde(default)]
        #[garde(custom(valid_uuid))]
        flight_id: String,
    }

    fn contact(body: serde_json::Value) -> Contact {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_report_is_keyed_by_wire_name() {
        let report = contact(serde_json::json!({
            "firstName": "   ",
            "emailAddress": "nope",
            "flightId": "123"
        }))
        .validate()
        .unwrap_err();
        let errors = ValidationErrors::from(report);
        assert!(errors.has_field("firstName"));
        assert!(errors.has_field("emailAddress"));
        assert_eq!(errors.field_errors["flightId"], vec!["not a valid uuid"]);
        assert!(errors.form_errors.is_empty());
    }

    #[test]
    fn test_trimmed_values_pass() {
        let ok = contact(serde_json::json!({
            "firstName": " Ada ",
            "emailAddress": " ada@example.com ",
            "flightId": Uuid::new_v4().to_string()
        }));
        assert!(ok.validate().is_ok());
        assert_eq!(ok.first_name, "Ada");
    }

    #[test]
    fn test_flattened_shape() {
        let mut errors = ValidationErrors::form("email or phoneNumber required");
        errors.add("zipCode", "length is lower than 3");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["formErrors"][0], "email or phoneNumber required");
        assert_eq!(json["fieldErrors"]["zipCode"][0], "length is lower than 3");
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("home_zip_code"), "homeZipCode");
        assert_eq!(camel_case("email"), "email");
    }
}
