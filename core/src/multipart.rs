//! `multipart/form-data` encoding for uploads.
//!
//! # Design
//! Multi-value fields become repeated parts under the same name, which the
//! server folds back into a list. Files are read in full before the request
//! is built; nothing is streamed.

use std::path::Path;

use tracing::debug;
use uuid::Uuid;

use crate::error::CoreError;
use crate::http::FileSystem;
use crate::value::{Fields, Value};

const OCTET_STREAM: &str = "application/octet-stream";

/// One part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    /// Set for file parts only.
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl Part {
    fn text(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            file_name: None,
            content_type: None,
            data: value.as_bytes().to_vec(),
        }
    }
}

/// A fully materialized multipart body.
#[derive(Debug, Clone)]
pub struct MultipartBody {
    boundary: String,
    parts: Vec<Part>,
}

impl MultipartBody {
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Value for the `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for part in &self.parts {
            out.extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
            let disposition = match &part.file_name {
                Some(file_name) => format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    quote(&part.name),
                    quote(file_name)
                ),
                None => format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n",
                    quote(&part.name)
                ),
            };
            out.extend_from_slice(disposition.as_bytes());
            if let Some(content_type) = &part.content_type {
                out.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
            }
            out.extend_from_slice(b"\r\n");
            out.extend_from_slice(&part.data);
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        out
    }
}

/// Encode a field map as multipart parts, reading files through `fs`.
///
/// Empty fields are sent as an empty text part, which clears them.
pub fn encode_multipart<F: FileSystem + ?Sized>(
    fields: &Fields,
    fs: &F,
) -> Result<MultipartBody, CoreError> {
    let mut parts = Vec::new();
    for (name, value) in fields {
        match value {
            None => parts.push(Part::text(name, "")),
            Some(Value::Scalar(s)) => parts.push(Part::text(name, s)),
            Some(Value::List(items)) => {
                parts.extend(items.iter().map(|item| Part::text(name, item)));
            }
            Some(Value::FileRefs(paths)) => {
                for path in paths {
                    parts.push(file_part(name, path, fs)?);
                }
            }
        }
    }

    let boundary = unique_boundary(&parts);
    Ok(MultipartBody { boundary, parts })
}

fn file_part<F: FileSystem + ?Sized>(name: &str, path: &Path, fs: &F) -> Result<Part, CoreError> {
    let data = fs.read_bytes(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            CoreError::InvalidValue(format!("`{}` does not name a file", path.display()))
        })?;
    Ok(Part {
        name: name.to_string(),
        file_name: Some(file_name),
        content_type: Some(content_type_for(path)),
        data,
    })
}

/// Guess a content type from the extension, falling back to octet-stream.
pub fn content_type_for(path: &Path) -> String {
    match mime_guess::from_path(path).first() {
        Some(mime) => mime.essence_str().to_string(),
        None => {
            debug!(path = %path.display(), "unrecognized file type, sending as {OCTET_STREAM}");
            OCTET_STREAM.to_string()
        }
    }
}

fn unique_boundary(parts: &[Part]) -> String {
    loop {
        let candidate = format!("----RecordBoundary{}", Uuid::new_v4().simple());
        let needle = candidate.as_bytes();
        let collides = parts.iter().any(|part| {
            part.data.windows(needle.len()).any(|w| w == needle)
                || part.name.contains(&candidate)
                || part.file_name.as_deref().is_some_and(|f| f.contains(&candidate))
        });
        if !collides {
            return candidate;
        }
    }
}

fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
