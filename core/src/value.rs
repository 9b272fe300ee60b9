//! Field values stored in a record.
//!
//! # Design
//! A record field holds exactly one of three shapes. `FileRefs` only ever
//! flows from the caller to the server through a multipart upload; the server
//! answers with file names, which decode as `Scalar` or `List`.
//!
//! A field that exists but carries no content is represented one level up,
//! as `None` inside [`Fields`], so "present but empty" and "absent" stay
//! distinguishable.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Field name to field content. `None` marks a field that is present but
/// empty, and is sent to the server as an explicit `null`.
pub type Fields = BTreeMap<String, Option<Value>>;

/// The content of a single record field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Scalar(String),
    List(Vec<String>),
    /// Local files to upload. Never produced by decoding a response.
    FileRefs(Vec<PathBuf>),
}

impl Value {
    pub fn scalar(value: impl Into<String>) -> Self {
        Value::Scalar(value.into())
    }

    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::List(values.into_iter().map(Into::into).collect())
    }

    pub fn files<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Value::FileRefs(paths.into_iter().map(Into::into).collect())
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Value::Scalar(s) => Some(s),
            Value::List(_) | Value::FileRefs(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(items) => Some(items),
            Value::Scalar(_) | Value::FileRefs(_) => None,
        }
    }

    pub fn as_file_refs(&self) -> Option<&[PathBuf]> {
        match self {
            Value::FileRefs(paths) => Some(paths),
            Value::Scalar(_) | Value::List(_) => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Scalar(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Scalar(value)
    }
}

impl From<Vec<String>> for Value {
    fn from(values: Vec<String>) -> Self {
        Value::List(values)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(s) => f.write_str(s),
            Value::List(items) => f.write_str(&items.join(", ")),
            Value::FileRefs(paths) => {
                let names: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
                f.write_str(&names.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_only_return_the_populated_case() {
        let scalar = Value::scalar("hello");
        assert_eq!(scalar.as_scalar(), Some("hello"));
        assert!(scalar.as_list().is_none());
        assert!(scalar.as_file_refs().is_none());

        let list = Value::list(["a", "b"]);
        assert_eq!(list.as_list(), Some(&["a".to_string(), "b".to_string()][..]));
        assert!(list.as_scalar().is_none());

        let files = Value::files(["/tmp/a.png"]);
        assert_eq!(files.as_file_refs().map(<[PathBuf]>::len), Some(1));
        assert!(files.as_list().is_none());
    }

    #[test]
    fn display_joins_lists() {
        assert_eq!(Value::list(["x", "y"]).to_string(), "x, y");
        assert_eq!(Value::from("plain").to_string(), "plain");
    }
}
