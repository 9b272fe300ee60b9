//! Domain types returned by the record-store API.
//!
//! # Design
//! The five system fields (`id`, `collectionId`, `collectionName`, `created`,
//! `updated`) are kept as opaque strings exactly as the server sent them.
//! They are empty on a record that has not been created yet. Changing them
//! locally has no effect on the server; only `fields` is ever sent back.

use crate::value::{Fields, Value};

/// A single record of a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub id: String,
    pub collection_id: String,
    pub collection_name: String,
    pub created: String,
    pub updated: String,
    pub fields: Fields,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: Fields) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    /// Returns the value of `name`, or `None` when the field is absent or
    /// explicitly empty. Use [`Record::is_empty_field`] to tell them apart.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).and_then(Option::as_ref)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// True when the field is present but holds no value.
    pub fn is_empty_field(&self, name: &str) -> bool {
        matches!(self.fields.get(name), Some(None))
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(name.into(), Some(value.into()));
        self
    }

    /// Marks the field as empty; it is sent as `null` on the next write.
    pub fn clear(&mut self, name: impl Into<String>) -> &mut Self {
        self.fields.insert(name.into(), None);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<Option<Value>> {
        self.fields.remove(name)
    }
}

/// One page of a collection listing.
///
/// Totals are `None` when the server skipped counting (it reports `-1`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub page: u64,
    pub per_page: u64,
    pub total_pages: Option<u64>,
    pub total_items: Option<u64>,
    pub items: Vec<Record>,
}

/// Result of a password authentication against an auth collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAuth {
    pub token: String,
    pub record: Record,
}

impl UserAuth {
    pub fn email(&self) -> Option<&str> {
        self.record.get("email").and_then(Value::as_scalar)
    }

    pub fn username(&self) -> Option<&str> {
        self.record.get("username").and_then(Value::as_scalar)
    }

    pub fn verified(&self) -> bool {
        self.flag("verified")
    }

    pub fn email_visibility(&self) -> bool {
        self.flag("emailVisibility")
    }

    fn flag(&self, name: &str) -> bool {
        self.record.get(name).and_then(Value::as_scalar) == Some("true")
    }
}

/// Result of an admin password authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminAuth {
    pub token: String,
    pub id: String,
    pub created: String,
    pub updated: String,
    pub email: String,
    pub avatar: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_marker_is_distinct_from_absent() {
        let mut record = Record::new();
        record.set("title", "Hello").clear("tags");

        assert_eq!(record.get("title"), Some(&Value::scalar("Hello")));
        assert!(record.get("tags").is_none());
        assert!(record.is_empty_field("tags"));
        assert!(record.contains("tags"));
        assert!(!record.contains("missing"));
        assert!(!record.is_empty_field("missing"));
    }

    #[test]
    fn user_auth_flags_read_scalar_fields() {
        let mut record = Record::new();
        record
            .set("email", "a@b.c")
            .set("verified", "true")
            .set("emailVisibility", "false");
        let auth = UserAuth {
            token: "t".to_string(),
            record,
        };
        assert_eq!(auth.email(), Some("a@b.c"));
        assert!(auth.verified());
        assert!(!auth.email_visibility());
        assert!(auth.username().is_none());
    }
}
