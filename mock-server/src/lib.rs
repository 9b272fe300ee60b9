//! In-memory record-store server speaking the same wire format as the real
//! API: collections of schemaless records, paginated listing with a small
//! filter grammar, password authentication, and file attachments.
//!
//! Every collection requires a non-blank `title` so validation errors can be
//! exercised end to end.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, FromRequest, Multipart, Path, Query, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const USER_EMAIL: &str = "user@example.com";
pub const USER_PASSWORD: &str = "user-password";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-password";

const DEFAULT_PER_PAGE: usize = 30;

type JsonMap = Map<String, Value>;

#[derive(Default)]
pub struct Store {
    /// Records per collection, in insertion order.
    records: HashMap<String, Vec<JsonMap>>,
    /// File bytes keyed by `collection/id/name`.
    files: HashMap<String, Vec<u8>>,
    /// Fields per collection that have held a list. A single value sent
    /// later for one of them is stored as a one-element list.
    list_fields: HashMap<String, HashSet<String>>,
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route(
            "/api/collections/{collection}/records",
            get(list_records).post(create_record),
        )
        .route(
            "/api/collections/{collection}/records/{id}",
            get(get_record).patch(update_record).delete(delete_record),
        )
        .route(
            "/api/collections/{collection}/auth-with-password",
            post(authenticate_user),
        )
        .route("/api/admins/auth-with-password", post(authenticate_admin))
        .route("/api/files/{collection}/{id}/{file}", get(get_file))
        .fallback(|| async { not_found() })
        .layer(DefaultBodyLimit::disable())
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    info!(addr = ?listener.local_addr().ok(), "mock server listening");
    axum::serve(listener, app()).await
}

// ---------------------------------------------------------------------------
// Error envelope
// ---------------------------------------------------------------------------

fn api_error(status: StatusCode, message: &str, data: Value) -> Response {
    let body = json!({ "code": status.as_u16(), "message": message, "data": data });
    (status, Json(body)).into_response()
}

fn not_found() -> Response {
    api_error(
        StatusCode::NOT_FOUND,
        "The requested resource wasn't found.",
        json!({}),
    )
}

fn bad_request(message: &str) -> Response {
    api_error(StatusCode::BAD_REQUEST, message, json!({}))
}

fn blank_title() -> Response {
    api_error(
        StatusCode::BAD_REQUEST,
        "Failed to validate.",
        json!({ "title": { "code": "validation_required", "message": "Missing required value." } }),
    )
}

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

struct Upload {
    field: String,
    file_name: String,
    data: Bytes,
}

#[derive(Default)]
struct Payload {
    fields: JsonMap,
    uploads: Vec<Upload>,
}

async fn read_payload(request: Request) -> Result<Payload, Response> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    if is_multipart {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(IntoResponse::into_response)?;
        return read_multipart(multipart).await;
    }

    let bytes = axum::body::to_bytes(request.into_body(), usize::MAX)
        .await
        .map_err(|_| bad_request("Failed to read the request body."))?;
    let fields: JsonMap = serde_json::from_slice(&bytes).map_err(|_| {
        bad_request("Failed to load the submitted data due to invalid formatting.")
    })?;
    Ok(Payload {
        fields,
        uploads: Vec::new(),
    })
}

async fn read_multipart(mut multipart: Multipart) -> Result<Payload, Response> {
    let invalid = || bad_request("Failed to read the multipart body.");
    let mut payload = Payload::default();
    while let Some(field) = multipart.next_field().await.map_err(|_| invalid())? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let data = field.bytes().await.map_err(|_| invalid())?;

        match file_name {
            Some(file_name) => payload.uploads.push(Upload {
                field: name,
                file_name,
                data,
            }),
            None => {
                let text = Value::String(String::from_utf8_lossy(&data).into_owned());
                // Repeated text parts fold into a list.
                match payload.fields.get_mut(&name) {
                    Some(Value::Array(items)) => items.push(text),
                    Some(existing) => *existing = Value::Array(vec![existing.take(), text]),
                    None => {
                        payload.fields.insert(name, text);
                    }
                }
            }
        }
    }
    Ok(payload)
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

fn now() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3fZ").to_string()
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string().chars().take(15).collect()
}

/// Apply a payload to a stored record: plain fields overwrite, uploads
/// replace the field's file list.
fn apply_payload(store: &mut Store, collection: &str, record: &mut JsonMap, payload: Payload) {
    let id = record
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let list_fields = store.list_fields.entry(collection.to_string()).or_default();
    for (key, value) in payload.fields {
        if matches!(key.as_str(), "id" | "collectionId" | "collectionName" | "created" | "updated") {
            continue;
        }
        let value = match value {
            Value::Array(items) => {
                list_fields.insert(key.clone());
                Value::Array(items)
            }
            Value::String(text) if list_fields.contains(&key) => as_list(text),
            other => other,
        };
        record.insert(key, value);
    }

    let mut uploaded: HashMap<String, Vec<Value>> = HashMap::new();
    for upload in payload.uploads {
        store.files.insert(
            format!("{collection}/{id}/{}", upload.file_name),
            upload.data.to_vec(),
        );
        uploaded
            .entry(upload.field)
            .or_default()
            .push(Value::String(upload.file_name));
    }
    let list_fields = store.list_fields.entry(collection.to_string()).or_default();
    for (field, names) in uploaded {
        list_fields.insert(field.clone());
        record.insert(field, Value::Array(names));
    }
    record.insert("updated".to_string(), Value::String(now()));
}

/// A single text value for a list field. Empty text clears the list.
fn as_list(text: String) -> Value {
    if text.is_empty() {
        Value::Array(Vec::new())
    } else {
        Value::Array(vec![Value::String(text)])
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    page: Option<usize>,
    per_page: Option<usize>,
    skip_total: Option<String>,
    sort: Option<String>,
    filter: Option<String>,
}

async fn list_records(
    State(db): State<Db>,
    Path(collection): Path<String>,
    Query(params): Query<ListParams>,
) -> Response {
    debug!(?params, collection = %collection, "list records");
    let store = db.read().await;
    let mut items: Vec<JsonMap> = store.records.get(&collection).cloned().unwrap_or_default();

    if let Some(filter) = params.filter.as_deref() {
        let clauses = match parse_filter(filter) {
            Some(clauses) => clauses,
            None => return bad_request("Invalid filter parameters."),
        };
        items.retain(|record| clauses.iter().all(|clause| clause.matches(record)));
    }
    if let Some(sort) = params.sort.as_deref() {
        let (field, descending) = match sort.strip_prefix('-') {
            Some(field) => (field, true),
            None => (sort.trim_start_matches('+'), false),
        };
        items.sort_by_key(|record| field_text(record, field));
        if descending {
            items.reverse();
        }
    }

    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(DEFAULT_PER_PAGE).max(1);
    let skip_total = matches!(params.skip_total.as_deref(), Some("1" | "true"));
    let total = items.len();
    let (total_items, total_pages) = if skip_total {
        (-1, -1)
    } else {
        (total as i64, total.div_ceil(per_page) as i64)
    };
    let page_items: Vec<Value> = items
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .map(Value::Object)
        .collect();

    Json(json!({
        "page": page,
        "perPage": per_page,
        "totalItems": total_items,
        "totalPages": total_pages,
        "items": page_items,
    }))
    .into_response()
}

async fn create_record(
    State(db): State<Db>,
    Path(collection): Path<String>,
    request: Request,
) -> Response {
    let payload = match read_payload(request).await {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    if is_blank(payload.fields.get("title")) {
        return blank_title();
    }

    let created = now();
    let mut record = JsonMap::new();
    record.insert("id".to_string(), Value::String(new_id()));
    record.insert("collectionId".to_string(), Value::String(format!("pbc_{collection}")));
    record.insert("collectionName".to_string(), Value::String(collection.clone()));
    record.insert("created".to_string(), Value::String(created));

    let mut store = db.write().await;
    apply_payload(&mut store, &collection, &mut record, payload);
    store
        .records
        .entry(collection)
        .or_default()
        .push(record.clone());
    Json(Value::Object(record)).into_response()
}

async fn get_record(
    State(db): State<Db>,
    Path((collection, id)): Path<(String, String)>,
) -> Response {
    let store = db.read().await;
    match find(&store, &collection, &id) {
        Some(record) => Json(Value::Object(record.clone())).into_response(),
        None => not_found(),
    }
}

async fn update_record(
    State(db): State<Db>,
    Path((collection, id)): Path<(String, String)>,
    request: Request,
) -> Response {
    let payload = match read_payload(request).await {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    if payload.fields.contains_key("title") && is_blank(payload.fields.get("title")) {
        return blank_title();
    }

    let mut store = db.write().await;
    let Some(mut record) = find(&store, &collection, &id).cloned() else {
        return not_found();
    };
    apply_payload(&mut store, &collection, &mut record, payload);
    if let Some(slot) = store
        .records
        .get_mut(&collection)
        .and_then(|records| records.iter_mut().find(|r| has_id(r, &id)))
    {
        *slot = record.clone();
    }
    Json(Value::Object(record)).into_response()
}

async fn delete_record(
    State(db): State<Db>,
    Path((collection, id)): Path<(String, String)>,
) -> Response {
    let mut store = db.write().await;
    let Some(records) = store.records.get_mut(&collection) else {
        return not_found();
    };
    let before = records.len();
    records.retain(|r| !has_id(r, &id));
    if records.len() == before {
        return not_found();
    }
    let prefix = format!("{collection}/{id}/");
    store.files.retain(|key, _| !key.starts_with(&prefix));
    StatusCode::NO_CONTENT.into_response()
}

fn find<'a>(store: &'a Store, collection: &str, id: &str) -> Option<&'a JsonMap> {
    store.records.get(collection)?.iter().find(|r| has_id(r, id))
}

fn has_id(record: &JsonMap, id: &str) -> bool {
    record.get("id").and_then(Value::as_str) == Some(id)
}

fn field_text(record: &JsonMap, field: &str) -> String {
    match record.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Filters: `field = "value"` / `field != "value"` joined with `&&`
// ---------------------------------------------------------------------------

struct Clause {
    field: String,
    negate: bool,
    value: String,
}

impl Clause {
    fn matches(&self, record: &JsonMap) -> bool {
        (field_text(record, &self.field) == self.value) != self.negate
    }
}

fn parse_filter(filter: &str) -> Option<Vec<Clause>> {
    filter
        .split("&&")
        .map(|clause| {
            let clause = clause.trim().trim_start_matches('(').trim_end_matches(')');
            let (field, negate, value) = if let Some((f, v)) = clause.split_once("!=") {
                (f, true, v)
            } else {
                let (f, v) = clause.split_once('=')?;
                (f, false, v)
            };
            let field = field.trim();
            if field.is_empty() {
                return None;
            }
            let value = value.trim().trim_matches(|c: char| c == '"' || c == '\'');
            Some(Clause {
                field: field.to_string(),
                negate,
                value: value.to_string(),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct Credentials {
    identity: String,
    password: String,
}

fn failed_auth() -> Response {
    bad_request("Failed to authenticate.")
}

async fn authenticate_user(
    Path(collection): Path<String>,
    Json(credentials): Json<Credentials>,
) -> Response {
    if credentials.identity != USER_EMAIL || credentials.password != USER_PASSWORD {
        return failed_auth();
    }
    let stamp = now();
    Json(json!({
        "token": format!("user-token-{}", new_id()),
        "record": {
            "id": "user00000000001",
            "collectionId": format!("pbc_{collection}"),
            "collectionName": collection,
            "created": stamp,
            "updated": stamp,
            "username": "user",
            "email": USER_EMAIL,
            "emailVisibility": false,
            "verified": true,
            "avatar": ""
        }
    }))
    .into_response()
}

async fn authenticate_admin(Json(credentials): Json<Credentials>) -> Response {
    if credentials.identity != ADMIN_EMAIL || credentials.password != ADMIN_PASSWORD {
        return failed_auth();
    }
    let stamp = now();
    Json(json!({
        "token": format!("admin-token-{}", new_id()),
        "admin": {
            "id": "admin0000000001",
            "created": stamp,
            "updated": stamp,
            "avatar": 0,
            "email": ADMIN_EMAIL
        }
    }))
    .into_response()
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

async fn get_file(
    State(db): State<Db>,
    Path((collection, id, file)): Path<(String, String, String)>,
) -> Response {
    let store = db.read().await;
    match store.files.get(&format!("{collection}/{id}/{file}")) {
        Some(bytes) => (
            [(header::CONTENT_TYPE, "application/octet-stream")],
            bytes.clone(),
        )
            .into_response(),
        None => not_found(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_parses_conjunctions() {
        let clauses = parse_filter(r#"title = "Hello" && (status != 'draft')"#).unwrap();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].field, "title");
        assert_eq!(clauses[0].value, "Hello");
        assert!(!clauses[0].negate);
        assert_eq!(clauses[1].field, "status");
        assert_eq!(clauses[1].value, "draft");
        assert!(clauses[1].negate);
    }

    #[test]
    fn filter_rejects_garbage() {
        assert!(parse_filter("views > 5").is_none());
        assert!(parse_filter(r#" = "x""#).is_none());
    }

    #[test]
    fn clause_compares_textual_values() {
        let mut record = JsonMap::new();
        record.insert("views".to_string(), json!(5));
        let clause = Clause {
            field: "views".to_string(),
            negate: false,
            value: "5".to_string(),
        };
        assert!(clause.matches(&record));
    }

    #[test]
    fn blank_detection() {
        assert!(is_blank(None));
        assert!(is_blank(Some(&Value::Null)));
        assert!(is_blank(Some(&json!("  "))));
        assert!(!is_blank(Some(&json!("x"))));
        assert!(!is_blank(Some(&json!(["x"]))));
    }

    #[test]
    fn single_value_for_a_list_field_stays_a_list() {
        let mut store = Store::default();
        let mut record = JsonMap::new();
        record.insert("id".to_string(), json!("r1"));

        let mut first = Payload::default();
        first.fields.insert("tags".to_string(), json!(["a", "b"]));
        apply_payload(&mut store, "posts", &mut record, first);

        let mut second = Payload::default();
        second.fields.insert("tags".to_string(), json!("only"));
        second.fields.insert("title".to_string(), json!("plain"));
        apply_payload(&mut store, "posts", &mut record, second);
        assert_eq!(record["tags"], json!(["only"]));
        assert_eq!(record["title"], json!("plain"));

        let mut cleared = Payload::default();
        cleared.fields.insert("tags".to_string(), json!(""));
        apply_payload(&mut store, "posts", &mut record, cleared);
        assert_eq!(record["tags"], json!([]));
    }

    #[test]
    fn ids_are_fifteen_chars() {
        assert_eq!(new_id().len(), 15);
    }
}
