//! Blocking facade that executes `PocketBase` requests through a transport.
//!
//! Each operation performs exactly one request/response exchange. The stored
//! auth token is only changed by the caller; authenticating does not log the
//! connection in.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::client::PocketBase;
use crate::config::ClientConfig;
use crate::error::CoreError;
use crate::http::{FileSystem, HttpRequest, HttpResponse, LocalFs, Transport, UreqTransport};
use crate::query::Query;
use crate::types::{AdminAuth, Page, Record, UserAuth};
use crate::value::Fields;

#[derive(Debug, Clone)]
pub struct Connection<T, F = LocalFs> {
    client: PocketBase,
    transport: T,
    fs: F,
    auth_token: Option<String>,
}

impl Connection<UreqTransport, LocalFs> {
    pub fn from_config(config: &ClientConfig) -> Self {
        let mut conn = Self::new(&config.base_url, UreqTransport::new());
        conn.auth_token = config.auth_token.clone();
        conn
    }
}

impl<T: Transport> Connection<T, LocalFs> {
    pub fn new(base_url: &str, transport: T) -> Self {
        Self::with_fs(base_url, transport, LocalFs)
    }
}

impl<T: Transport, F: FileSystem> Connection<T, F> {
    pub fn with_fs(base_url: &str, transport: T, fs: F) -> Self {
        Self {
            client: PocketBase::new(base_url),
            transport,
            fs,
            auth_token: None,
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn set_auth_token(&mut self, token: impl Into<String>) {
        self.auth_token = Some(token.into());
    }

    pub fn clear_auth_token(&mut self) {
        self.auth_token = None;
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    pub fn client(&self) -> &PocketBase {
        &self.client
    }

    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, CoreError> {
        debug!(method = request.method.as_str(), url = %request.url, "executing request");
        self.transport.send(request).map_err(CoreError::Transport)
    }

    pub fn create_record(&self, collection: &str, fields: &Fields) -> Result<Record, CoreError> {
        let req = self.client.build_create_record(collection, fields, self.auth_token())?;
        self.client.parse_record(self.execute(req)?)
    }

    pub fn create_record_with_files(&self, collection: &str, fields: &Fields) -> Result<Record, CoreError> {
        let req = self
            .client
            .build_create_record_with_files(collection, fields, self.auth_token(), &self.fs)?;
        self.client.parse_record(self.execute(req)?)
    }

    pub fn read_record(&self, collection: &str, id: &str) -> Result<Record, CoreError> {
        let req = self.client.build_read_record(collection, id, self.auth_token());
        self.client.parse_record(self.execute(req)?)
    }

    pub fn read_page(&self, collection: &str, query: Option<&Query>) -> Result<Page, CoreError> {
        let req = self.client.build_read_page(collection, query, self.auth_token());
        self.client.parse_page(self.execute(req)?)
    }

    pub fn update_record(&self, collection: &str, id: &str, fields: &Fields) -> Result<Record, CoreError> {
        let req = self
            .client
            .build_update_record(collection, id, fields, self.auth_token())?;
        self.client.parse_record(self.execute(req)?)
    }

    pub fn update_record_with_files(
        &self,
        collection: &str,
        id: &str,
        fields: &Fields,
    ) -> Result<Record, CoreError> {
        let req = self.client.build_update_record_with_files(
            collection,
            id,
            fields,
            self.auth_token(),
            &self.fs,
        )?;
        self.client.parse_record(self.execute(req)?)
    }

    pub fn delete_record(&self, collection: &str, id: &str) -> Result<(), CoreError> {
        let req = self.client.build_delete_record(collection, id, self.auth_token());
        self.client.parse_delete(self.execute(req)?)
    }

    pub fn authenticate_user(
        &self,
        collection: &str,
        identity: &str,
        password: &str,
    ) -> Result<UserAuth, CoreError> {
        let req = self.client.build_authenticate_user(collection, identity, password)?;
        self.client.parse_user_auth(self.execute(req)?)
    }

    pub fn authenticate_admin(&self, identity: &str, password: &str) -> Result<AdminAuth, CoreError> {
        let req = self.client.build_authenticate_admin(identity, password)?;
        self.client.parse_admin_auth(self.execute(req)?)
    }

    /// Download a record's file to `save_path`, replacing any existing file.
    pub fn download_file(
        &self,
        collection: &str,
        id: &str,
        file_name: &str,
        thumb: Option<&str>,
        save_path: &Path,
    ) -> Result<PathBuf, CoreError> {
        let req = self
            .client
            .build_download_file(collection, id, file_name, thumb, self.auth_token());
        let bytes = self.client.parse_download(self.execute(req)?)?;
        self.fs.write_bytes(save_path, &bytes)?;
        debug!(path = %save_path.display(), bytes = bytes.len(), "saved download");
        Ok(save_path.to_path_buf())
    }
}
