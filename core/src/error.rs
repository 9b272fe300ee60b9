//! Error types for the record-store client.
//!
//! # Design
//! `Domain` is the expected outcome of a request the server rejected and
//! carries the server's per-field validation detail. Every other variant
//! means the client and server disagree about the wire format, the caller
//! misused the API, or the transport failed. None of them are retried.

use std::fmt;

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::warn;

use crate::http::TransportError;

const UNKNOWN_CODE: &str = "Unknown Code";
const UNKNOWN_MESSAGE: &str = "Unknown Error";

/// Errors returned by the client's parse methods and the [`Connection`](crate::Connection) facade.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A success response did not have the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// A failure response whose body is not a recognizable error document.
    /// The raw status and body are kept so callers can still report them.
    #[error("HTTP {status} with unrecognized error body: {body}")]
    MalformedErrorBody { status: u16, body: String },

    /// The caller passed a value that cannot be sent on this path, such as
    /// file references through a JSON request.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// The server rejected the request.
    #[error("{0}")]
    Domain(#[from] DomainError),

    /// A status the operation does not accept, e.g. `200` on delete.
    #[error("unexpected response: HTTP {status}: {body}")]
    UnexpectedResponse { status: u16, body: String },

    /// The request payload could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Reading an upload or writing a download failed.
    #[error("file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The transport could not complete the exchange.
    #[error("transport failed: {0}")]
    Transport(#[source] TransportError),
}

impl CoreError {
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            CoreError::Domain(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.domain().is_some_and(|err| err.status_code == 404)
    }
}

/// One field-scoped validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub code: String,
    pub message: String,
}

/// An error reported by the server in its `{code, message, data}` envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainError {
    pub status_code: u16,
    pub message: String,
    /// Empty for general errors. Ordered as the server listed them.
    pub field_errors: Vec<FieldError>,
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.status_code)?;
        for err in &self.field_errors {
            write!(f, "\n\t{}: {} ({})", err.field, err.message, err.code)?;
        }
        Ok(())
    }
}

impl std::error::Error for DomainError {}

/// Map a failure response body into a [`DomainError`].
///
/// Fails with [`CoreError::MalformedErrorBody`] when the body is not JSON or
/// lacks the top-level `code`/`message`. A malformed entry under `data` does
/// not fail the mapping; it is reported with a placeholder code and message.
pub fn map_error_body(status: u16, body: &str) -> Result<DomainError, CoreError> {
    let malformed = || CoreError::MalformedErrorBody {
        status,
        body: body.to_string(),
    };

    let json: JsonValue = serde_json::from_str(body).map_err(|_| malformed())?;
    let object = json.as_object().ok_or_else(malformed)?;
    let status_code = object
        .get("code")
        .and_then(JsonValue::as_u64)
        .and_then(|code| u16::try_from(code).ok())
        .ok_or_else(malformed)?;
    let message = object
        .get("message")
        .and_then(JsonValue::as_str)
        .ok_or_else(malformed)?
        .to_string();

    let field_errors = match object.get("data").and_then(JsonValue::as_object) {
        Some(data) => data
            .iter()
            .map(|(field, detail)| field_error(field, detail))
            .collect(),
        None => Vec::new(),
    };

    Ok(DomainError {
        status_code,
        message,
        field_errors,
    })
}

fn field_error(field: &str, detail: &JsonValue) -> FieldError {
    let code = detail.get("code").and_then(|code| match code {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    });
    let message = detail.get("message").and_then(JsonValue::as_str);

    match (code, message) {
        (Some(code), Some(message)) => FieldError {
            field: field.to_string(),
            code,
            message: message.to_string(),
        },
        _ => {
            warn!(field = %field, "unrecognized field error entry: {detail}");
            FieldError {
                field: field.to_string(),
                code: UNKNOWN_CODE.to_string(),
                message: UNKNOWN_MESSAGE.to_string(),
            }
        }
    }
}
