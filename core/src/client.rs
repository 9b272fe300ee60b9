//! Stateless request builder and response parser for the record-store API.
//!
//! # Design
//! `PocketBase` holds only a `base_url`. Each operation is split into a
//! `build_*` method that produces an `HttpRequest` and a `parse_*` method that
//! consumes an `HttpResponse`; the caller executes the round-trip in between.
//! [`Connection`](crate::Connection) wires the two halves to a transport.
//!
//! Every `parse_*` method routes statuses the same way: `>= 400` goes through
//! the error mapper, any other status outside what the operation accepts is
//! an unexpected response, and the rest is decoded.

use serde_json::{json, Value as JsonValue};
use tracing::debug;

use crate::error::{map_error_body, CoreError};
use crate::http::{FileSystem, HttpMethod, HttpRequest, HttpResponse};
use crate::mapper::{decode_admin_auth, decode_page, decode_record, decode_user_auth, encode_fields};
use crate::multipart::encode_multipart;
use crate::query::{escape, Query};
use crate::types::{AdminAuth, Page, Record, UserAuth};
use crate::value::Fields;

const JSON: &str = "application/json";

/// Synchronous, stateless client for the record-store API.
#[derive(Debug, Clone)]
pub struct PocketBase {
    base_url: String,
}

impl PocketBase {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn records_url(&self, collection: &str) -> String {
        format!("{}/api/collections/{collection}/records", self.base_url)
    }

    fn record_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{id}", self.records_url(collection))
    }

    pub fn build_create_record(
        &self,
        collection: &str,
        fields: &Fields,
        auth: Option<&str>,
    ) -> Result<HttpRequest, CoreError> {
        json_request(HttpMethod::Post, self.records_url(collection), fields, auth)
    }

    pub fn build_create_record_with_files<F: FileSystem + ?Sized>(
        &self,
        collection: &str,
        fields: &Fields,
        auth: Option<&str>,
        fs: &F,
    ) -> Result<HttpRequest, CoreError> {
        multipart_request(HttpMethod::Post, self.records_url(collection), fields, auth, fs)
    }

    pub fn build_read_record(&self, collection: &str, id: &str, auth: Option<&str>) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: self.record_url(collection, id),
            headers: auth_headers(auth),
            body: None,
        }
    }

    /// Without a query the server applies its own paging defaults.
    pub fn build_read_page(
        &self,
        collection: &str,
        query: Option<&Query>,
        auth: Option<&str>,
    ) -> HttpRequest {
        let mut url = self.records_url(collection);
        if let Some(query) = query {
            url.push('?');
            url.push_str(&escape(&query.render()));
        }
        HttpRequest {
            method: HttpMethod::Get,
            url,
            headers: auth_headers(auth),
            body: None,
        }
    }

    pub fn build_update_record(
        &self,
        collection: &str,
        id: &str,
        fields: &Fields,
        auth: Option<&str>,
    ) -> Result<HttpRequest, CoreError> {
        json_request(HttpMethod::Patch, self.record_url(collection, id), fields, auth)
    }

    pub fn build_update_record_with_files<F: FileSystem + ?Sized>(
        &self,
        collection: &str,
        id: &str,
        fields: &Fields,
        auth: Option<&str>,
        fs: &F,
    ) -> Result<HttpRequest, CoreError> {
        multipart_request(HttpMethod::Patch, self.record_url(collection, id), fields, auth, fs)
    }

    pub fn build_delete_record(&self, collection: &str, id: &str, auth: Option<&str>) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Delete,
            url: self.record_url(collection, id),
            headers: auth_headers(auth),
            body: None,
        }
    }

    pub fn build_authenticate_user(
        &self,
        collection: &str,
        identity: &str,
        password: &str,
    ) -> Result<HttpRequest, CoreError> {
        let url = format!("{}/api/collections/{collection}/auth-with-password", self.base_url);
        credentials_request(url, identity, password)
    }

    pub fn build_authenticate_admin(&self, identity: &str, password: &str) -> Result<HttpRequest, CoreError> {
        let url = format!("{}/api/admins/auth-with-password", self.base_url);
        credentials_request(url, identity, password)
    }

    /// `thumb` is a size such as `100x100`, honored by the server for images.
    pub fn build_download_file(
        &self,
        collection: &str,
        id: &str,
        file_name: &str,
        thumb: Option<&str>,
        auth: Option<&str>,
    ) -> HttpRequest {
        let mut url = format!("{}/api/files/{collection}/{id}/{file_name}", self.base_url);
        if let Some(thumb) = thumb {
            url.push_str("?thumb=");
            url.push_str(thumb);
        }
        HttpRequest {
            method: HttpMethod::Get,
            url,
            headers: auth_headers(auth),
            body: None,
        }
    }

    /// Parse the record returned by create, read and update.
    pub fn parse_record(&self, response: HttpResponse) -> Result<Record, CoreError> {
        let json = success_json(&response)?;
        decode_record(&json)
    }

    pub fn parse_page(&self, response: HttpResponse) -> Result<Page, CoreError> {
        let json = success_json(&response)?;
        let page = decode_page(&json)?;
        debug!(page = page.page, items = page.items.len(), "decoded page");
        Ok(page)
    }

    /// Succeeds only on `204 No Content`.
    pub fn parse_delete(&self, response: HttpResponse) -> Result<(), CoreError> {
        check_status(&response)?;
        if response.status == 204 {
            return Ok(());
        }
        Err(unexpected(&response))
    }

    pub fn parse_user_auth(&self, response: HttpResponse) -> Result<UserAuth, CoreError> {
        let json = success_json(&response)?;
        decode_user_auth(&json)
    }

    pub fn parse_admin_auth(&self, response: HttpResponse) -> Result<AdminAuth, CoreError> {
        let json = success_json(&response)?;
        decode_admin_auth(&json)
    }

    /// Returns the raw file bytes.
    pub fn parse_download(&self, response: HttpResponse) -> Result<Vec<u8>, CoreError> {
        check_status(&response)?;
        Ok(response.body)
    }
}

fn auth_headers(auth: Option<&str>) -> Vec<(String, String)> {
    auth.map(|token| vec![("authorization".to_string(), token.to_string())])
        .unwrap_or_default()
}

fn json_request(
    method: HttpMethod,
    url: String,
    fields: &Fields,
    auth: Option<&str>,
) -> Result<HttpRequest, CoreError> {
    let body = encode_fields(fields)?;
    json_body_request(method, url, &body, auth)
}

fn json_body_request(
    method: HttpMethod,
    url: String,
    body: &JsonValue,
    auth: Option<&str>,
) -> Result<HttpRequest, CoreError> {
    let body = serde_json::to_vec(body).map_err(|e| CoreError::Serialization(e.to_string()))?;
    let mut headers = vec![("content-type".to_string(), JSON.to_string())];
    headers.extend(auth_headers(auth));
    Ok(HttpRequest {
        method,
        url,
        headers,
        body: Some(body),
    })
}

fn multipart_request<F: FileSystem + ?Sized>(
    method: HttpMethod,
    url: String,
    fields: &Fields,
    auth: Option<&str>,
    fs: &F,
) -> Result<HttpRequest, CoreError> {
    let multipart = encode_multipart(fields, fs)?;
    let mut headers = vec![("content-type".to_string(), multipart.content_type())];
    headers.extend(auth_headers(auth));
    Ok(HttpRequest {
        method,
        url,
        headers,
        body: Some(multipart.to_bytes()),
    })
}

fn credentials_request(url: String, identity: &str, password: &str) -> Result<HttpRequest, CoreError> {
    let body = json!({ "identity": identity, "password": password });
    json_body_request(HttpMethod::Post, url, &body, None)
}

/// Route error statuses: `>= 400` through the error mapper, anything else
/// outside 2xx as unexpected.
fn check_status(response: &HttpResponse) -> Result<(), CoreError> {
    if response.status >= 400 {
        let err = map_error_body(response.status, &response.text())?;
        return Err(CoreError::Domain(err));
    }
    if !response.is_success() {
        return Err(unexpected(response));
    }
    Ok(())
}

fn success_json(response: &HttpResponse) -> Result<JsonValue, CoreError> {
    check_status(response)?;
    serde_json::from_slice(&response.body).map_err(|e| CoreError::Decode(e.to_string()))
}

fn unexpected(response: &HttpResponse) -> CoreError {
    CoreError::UnexpectedResponse {
        status: response.status,
        body: response.text(),
    }
}
