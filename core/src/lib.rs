//! Synchronous client core for a record-store HTTP API.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). Schemaless records are mapped
//! to and from JSON by hand, server errors become typed [`DomainError`]s, and
//! uploads are encoded as `multipart/form-data`.
//!
//! # Design
//! - `PocketBase` is stateless; it holds only `base_url`.
//! - Each operation is split into `build_*` (produces request) and
//!   `parse_*` (consumes response), so the I/O boundary is explicit.
//! - [`Connection`] executes both halves through a [`Transport`] and a
//!   [`FileSystem`] for callers who do not need the split.
//! - Field values are a proper sum type ([`Value`]); a present-but-empty field
//!   is `None` in [`Fields`].

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod http;
pub mod mapper;
pub mod multipart;
pub mod query;
pub mod types;
pub mod value;

pub use client::PocketBase;
pub use config::ClientConfig;
pub use connection::Connection;
pub use error::{map_error_body, CoreError, DomainError, FieldError};
pub use http::{FileSystem, HttpMethod, HttpRequest, HttpResponse, LocalFs, Transport, TransportError, UreqTransport};
pub use mapper::{decode_page, decode_record, encode_fields};
pub use multipart::{encode_multipart, MultipartBody, Part};
pub use query::Query;
pub use types::{AdminAuth, Page, Record, UserAuth};
pub use value::{Fields, Value};
