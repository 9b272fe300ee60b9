//! Mapping between JSON documents and records.
//!
//! # Design
//! Records are schemaless from the client's point of view, so decoding walks
//! the JSON object by hand instead of deriving `Deserialize`: the five system
//! keys go to fixed attributes and everything else is classified by shape.
//!
//! An empty JSON array decodes to the explicit empty marker (`None`), not to
//! an empty list. The server reports a cleared multi-value field as `[]`, and
//! it must come back out as `null` when the record is written again.

use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};

use crate::error::CoreError;
use crate::types::{AdminAuth, Page, Record, UserAuth};
use crate::value::{Fields, Value};

/// Decode one record from a JSON object.
pub fn decode_record(json: &JsonValue) -> Result<Record, CoreError> {
    let object = json
        .as_object()
        .ok_or_else(|| CoreError::Decode(format!("expected a record object, got {json}")))?;

    let mut record = Record::new();
    for (key, value) in object {
        match key.as_str() {
            "id" => record.id = fixed_field(key, value)?,
            "collectionId" => record.collection_id = fixed_field(key, value)?,
            "collectionName" => record.collection_name = fixed_field(key, value)?,
            "created" => record.created = fixed_field(key, value)?,
            "updated" => record.updated = fixed_field(key, value)?,
            _ => {
                let decoded = decode_value(key, value)?;
                record.fields.insert(key.clone(), decoded);
            }
        }
    }
    Ok(record)
}

/// Encode a field map into the JSON body of a create or update request.
///
/// Empty fields are written as an explicit `null` so the server clears them.
/// File references cannot travel as JSON; use the multipart path instead.
pub fn encode_fields(fields: &Fields) -> Result<JsonValue, CoreError> {
    let mut object = Map::new();
    for (name, value) in fields {
        let encoded = match value {
            None => JsonValue::Null,
            Some(Value::Scalar(s)) => JsonValue::String(s.clone()),
            Some(Value::List(items)) => {
                JsonValue::Array(items.iter().cloned().map(JsonValue::String).collect())
            }
            Some(Value::FileRefs(_)) => {
                return Err(CoreError::InvalidValue(format!(
                    "field `{name}` holds file references; send it as multipart"
                )));
            }
        };
        object.insert(name.clone(), encoded);
    }
    Ok(JsonValue::Object(object))
}

/// Decode a paginated listing.
pub fn decode_page(json: &JsonValue) -> Result<Page, CoreError> {
    let items = json
        .get("items")
        .and_then(JsonValue::as_array)
        .ok_or_else(|| CoreError::Decode("page is missing the `items` array".to_string()))?;

    Ok(Page {
        page: page_number(json, "page")?,
        per_page: page_number(json, "perPage")?,
        total_pages: page_total(json, "totalPages")?,
        total_items: page_total(json, "totalItems")?,
        items: items.iter().map(decode_record).collect::<Result<_, _>>()?,
    })
}

/// Decode the `{token, record}` answer of a user password authentication.
pub fn decode_user_auth(json: &JsonValue) -> Result<UserAuth, CoreError> {
    let token = json
        .get("token")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| CoreError::Decode("auth response is missing `token`".to_string()))?;
    let record = json
        .get("record")
        .ok_or_else(|| CoreError::Decode("auth response is missing `record`".to_string()))?;

    Ok(UserAuth {
        token: token.to_string(),
        record: decode_record(record)?,
    })
}

#[derive(Deserialize)]
struct AdminEnvelope {
    token: String,
    admin: AdminPayload,
}

#[derive(Deserialize)]
struct AdminPayload {
    id: String,
    created: String,
    updated: String,
    email: String,
    #[serde(default)]
    avatar: i64,
}

/// Decode the `{token, admin}` answer of an admin password authentication.
pub fn decode_admin_auth(json: &JsonValue) -> Result<AdminAuth, CoreError> {
    let envelope = AdminEnvelope::deserialize(json)
        .map_err(|e| CoreError::Decode(format!("admin auth response: {e}")))?;
    let admin = envelope.admin;
    Ok(AdminAuth {
        token: envelope.token,
        id: admin.id,
        created: admin.created,
        updated: admin.updated,
        email: admin.email,
        avatar: admin.avatar,
    })
}

fn fixed_field(key: &str, value: &JsonValue) -> Result<String, CoreError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| CoreError::Decode(format!("system field `{key}` must be a string, got {value}")))
}

fn decode_value(key: &str, value: &JsonValue) -> Result<Option<Value>, CoreError> {
    match value {
        JsonValue::Null => Ok(None),
        JsonValue::Array(elements) if elements.is_empty() => Ok(None),
        JsonValue::Array(elements) => {
            let items = elements
                .iter()
                .map(|element| {
                    element.as_str().map(str::to_string).ok_or_else(|| {
                        CoreError::Decode(format!(
                            "field `{key}` has a non-string list element: {element}"
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Some(Value::List(items)))
        }
        JsonValue::String(s) => Ok(Some(Value::Scalar(s.clone()))),
        JsonValue::Bool(_) | JsonValue::Number(_) | JsonValue::Object(_) => {
            Ok(Some(Value::Scalar(value.to_string())))
        }
    }
}

fn page_field(json: &JsonValue, key: &str) -> Result<i64, CoreError> {
    let raw = json
        .get(key)
        .ok_or_else(|| CoreError::Decode(format!("page is missing `{key}`")))?;
    let parsed = match raw {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| CoreError::Decode(format!("page field `{key}` is not numeric: {raw}")))
}

fn page_number(json: &JsonValue, key: &str) -> Result<u64, CoreError> {
    let n = page_field(json, key)?;
    u64::try_from(n).map_err(|_| CoreError::Decode(format!("page field `{key}` is negative: {n}")))
}

fn page_total(json: &JsonValue, key: &str) -> Result<Option<u64>, CoreError> {
    Ok(u64::try_from(page_field(json, key)?).ok())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample() -> JsonValue {
        json!({
            "id": "rec1234567890ab",
            "collectionId": "pbc_1",
            "collectionName": "posts",
            "created": "2024-01-01 10:00:00.123Z",
            "updated": "2024-01-02 11:30:00.000Z",
            "title": "Hello",
            "tags": ["a", "b"],
            "views": 42,
            "published": true,
            "attachments": []
        })
    }

    #[test]
    fn decodes_fixed_fields_verbatim() {
        let record = decode_record(&sample()).unwrap();
        assert_eq!(record.id, "rec1234567890ab");
        assert_eq!(record.collection_id, "pbc_1");
        assert_eq!(record.collection_name, "posts");
        assert_eq!(record.created, "2024-01-01 10:00:00.123Z");
        assert_eq!(record.updated, "2024-01-02 11:30:00.000Z");
        assert!(!record.contains("id"));
    }

    #[test]
    fn classifies_fields_by_shape() {
        let record = decode_record(&sample()).unwrap();
        assert_eq!(record.get("title"), Some(&Value::scalar("Hello")));
        assert_eq!(record.get("tags"), Some(&Value::list(["a", "b"])));
        assert_eq!(record.get("views"), Some(&Value::scalar("42")));
        assert_eq!(record.get("published"), Some(&Value::scalar("true")));
    }

    #[test]
    fn empty_array_becomes_explicit_empty_marker() {
        let record = decode_record(&sample()).unwrap();
        assert!(record.is_empty_field("attachments"));
        assert!(!record.is_empty_field("missing"));
        assert!(!record.contains("missing"));
    }

    #[test]
    fn nested_object_is_kept_as_json_text() {
        let record = decode_record(&json!({"meta": {"k": 1}})).unwrap();
        assert_eq!(record.get("meta"), Some(&Value::scalar(r#"{"k":1}"#)));
    }

    #[test]
    fn non_string_fixed_field_fails() {
        let err = decode_record(&json!({"id": 5})).unwrap_err();
        assert!(matches!(err, CoreError::Decode(_)));
    }

    #[test]
    fn non_string_list_element_fails() {
        let err = decode_record(&json!({"tags": ["a", 1]})).unwrap_err();
        assert!(matches!(err, CoreError::Decode(_)));
    }

    #[test]
    fn decode_then_encode_reproduces_user_fields() {
        let source = json!({
            "id": "x",
            "collectionId": "c",
            "collectionName": "posts",
            "created": "t1",
            "updated": "t2",
            "title": "Hello",
            "tags": ["a", "b"]
        });
        let record = decode_record(&source).unwrap();
        let encoded = encode_fields(&record.fields).unwrap();
        assert_eq!(encoded, json!({"title": "Hello", "tags": ["a", "b"]}));
    }

    #[test]
    fn encode_writes_explicit_null() {
        let mut fields = Fields::new();
        fields.insert("title".to_string(), None);
        assert_eq!(encode_fields(&fields).unwrap(), json!({"title": null}));
    }

    #[test]
    fn encode_rejects_file_refs() {
        let mut fields = Fields::new();
        fields.insert("avatar".to_string(), Some(Value::files(["a.png"])));
        let err = encode_fields(&fields).unwrap_err();
        assert!(matches!(err, CoreError::InvalidValue(_)));
    }

    #[test]
    fn decodes_page_with_numeric_and_string_counters() {
        let page = decode_page(&json!({
            "page": 2,
            "perPage": "2",
            "totalPages": 3,
            "totalItems": "5",
            "items": [{"id": "a", "title": "one"}, {"id": "b", "title": "two"}]
        }))
        .unwrap();
        assert_eq!(page.page, 2);
        assert_eq!(page.per_page, 2);
        assert_eq!(page.total_pages, Some(3));
        assert_eq!(page.total_items, Some(5));
        let ids: Vec<&str> = page.items.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn skipped_totals_decode_as_none() {
        let page = decode_page(&json!({
            "page": 1, "perPage": 500, "totalPages": -1, "totalItems": -1, "items": []
        }))
        .unwrap();
        assert!(page.total_pages.is_none());
        assert!(page.total_items.is_none());
    }

    #[test]
    fn page_with_missing_or_non_numeric_counter_fails() {
        let missing = decode_page(&json!({"page": 1, "perPage": 1, "totalPages": 1, "items": []}));
        assert!(matches!(missing, Err(CoreError::Decode(_))));

        let garbage = decode_page(&json!({
            "page": "one", "perPage": 1, "totalPages": 1, "totalItems": 1, "items": []
        }));
        assert!(matches!(garbage, Err(CoreError::Decode(_))));
    }

    #[test]
    fn decodes_user_auth() {
        let auth = decode_user_auth(&json!({
            "token": "jwt",
            "record": {"id": "u1", "collectionName": "users", "email": "a@b.c", "verified": true}
        }))
        .unwrap();
        assert_eq!(auth.token, "jwt");
        assert_eq!(auth.record.id, "u1");
        assert_eq!(auth.email(), Some("a@b.c"));
        assert!(auth.verified());
    }

    #[test]
    fn decodes_admin_auth() {
        let auth = decode_admin_auth(&json!({
            "token": "jwt",
            "admin": {"id": "a1", "created": "c", "updated": "u", "email": "root@x.y", "avatar": 3}
        }))
        .unwrap();
        assert_eq!(auth.id, "a1");
        assert_eq!(auth.avatar, 3);
        assert_eq!(auth.email, "root@x.y");

        let err = decode_admin_auth(&json!({"token": "jwt"})).unwrap_err();
        assert!(matches!(err, CoreError::Decode(_)));
    }
}
