//! In-memory stand-in for the Fieldbook REST API.
//!
//! Serves `/v1/{book}/{sheet}` and `/v1/{book}/{sheet}/{id}` with the same
//! response shapes as the real service: bare arrays for unbounded lists,
//! `{"items", "count"}` pages when `limit` is given, and
//! `{"code", "message"}` error bodies. Sheets are created by their first
//! insert; reading an unknown sheet is a 404.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use percent_encoding::percent_decode_str;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;

pub type Fields = Map<String, Value>;

#[derive(Debug, Default)]
struct Sheet {
    next_id: u64,
    rows: BTreeMap<u64, Fields>,
}

impl Sheet {
    fn insert(&mut self, fields: Fields) -> u64 {
        self.next_id += 1;
        self.rows.insert(self.next_id, fields);
        self.next_id
    }
}

/// Shared server state: sheets keyed by `(book, sheet)` and the optional
/// credentials required for writes.
#[derive(Clone, Default)]
pub struct Db {
    sheets: Arc<RwLock<HashMap<(String, String), Sheet>>>,
    auth: Option<Arc<str>>,
}

impl Db {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require HTTP Basic `key:secret` on POST, PATCH and DELETE.
    /// Reads stay public.
    pub fn with_credentials(mut self, key: &str, secret: &str) -> Self {
        let encoded = STANDARD.encode(format!("{key}:{secret}"));
        self.auth = Some(Arc::from(format!("Basic {encoded}")));
        self
    }

    /// Seed a sheet with `rows`, assigning ids 1.. in order. Non-object rows
    /// and any `id` fields are ignored. Call before the server starts.
    pub fn with_sheet(self, book: &str, sheet: &str, rows: Vec<Value>) -> Self {
        if let Ok(mut sheets) = self.sheets.try_write() {
            let target = sheets
                .entry((book.to_string(), sheet.to_string()))
                .or_default();
            for row in rows {
                if let Value::Object(mut fields) = row {
                    fields.remove("id");
                    target.insert(fields);
                }
            }
        }
        self
    }
}

/// Error response in the API's `{"code", "message"}` shape.
#[derive(Debug)]
pub struct ApiFailure {
    status: StatusCode,
    message: String,
}

impl ApiFailure {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not found")
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let body = json!({"code": self.status.as_u16(), "message": self.message});
        (self.status, Json(body)).into_response()
    }
}

/// Query parameters understood by the list and get endpoints.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ListParams {
    pub limit: Option<u64>,
    pub offset: u64,
    pub filters: Vec<(String, String)>,
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
}

/// Parse a raw query string. Each `&`-separated part is percent-decoded as
/// a whole before splitting on its first `=`, so filters encoded as a single
/// unit come back intact.
pub fn parse_params(raw: Option<&str>) -> Result<ListParams, ApiFailure> {
    let mut params = ListParams::default();
    for part in raw.unwrap_or_default().split('&').filter(|p| !p.is_empty()) {
        let decoded = percent_decode_str(part)
            .decode_utf8()
            .map_err(|_| ApiFailure::bad_request("Query string is not valid UTF-8"))?;
        let (key, value) = decoded.split_once('=').unwrap_or((&*decoded, ""));
        match key {
            "limit" => params.limit = Some(parse_number(key, value)?),
            "offset" => params.offset = parse_number(key, value)?,
            "include" => params.include = Some(csv(value)),
            "exclude" => params.exclude = Some(csv(value)),
            _ => params.filters.push((key.to_string(), value.to_string())),
        }
    }
    Ok(params)
}

fn parse_number(key: &str, value: &str) -> Result<u64, ApiFailure> {
    value
        .parse()
        .map_err(|_| ApiFailure::bad_request(format!("Invalid {key}: {value}")))
}

fn csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .filter(|field| !field.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn app(db: Db) -> Router {
    Router::new()
        .route("/v1/{book}/{sheet}", get(list_records).post(create_record))
        .route(
            "/v1/{book}/{sheet}/{id}",
            get(get_record).patch(update_record).delete(delete_record),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app(db)).await
}

fn record(id: u64, fields: Fields) -> Value {
    let mut out = Map::new();
    out.insert("id".to_string(), json!(id));
    out.extend(fields);
    Value::Object(out)
}

fn project(fields: &Fields, params: &ListParams) -> Fields {
    fields
        .iter()
        .filter(|(name, _)| {
            params.include.as_ref().map_or(true, |include| include.contains(name))
                && params.exclude.as_ref().map_or(true, |exclude| !exclude.contains(name))
        })
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

fn matches(fields: &Fields, filters: &[(String, String)]) -> bool {
    filters.iter().all(|(key, expected)| match fields.get(key) {
        Some(Value::String(actual)) => actual == expected,
        Some(other) => other.to_string() == *expected,
        None => false,
    })
}

fn authorize(db: &Db, headers: &HeaderMap) -> Result<(), ApiFailure> {
    let Some(expected) = db.auth.as_deref() else {
        return Ok(());
    };
    let given = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    if given == Some(expected) {
        Ok(())
    } else {
        Err(ApiFailure::new(StatusCode::UNAUTHORIZED, "Authentication required"))
    }
}

fn fields_from_body(body: &[u8]) -> Result<Fields, ApiFailure> {
    let fields = match serde_json::from_slice(body) {
        Ok(Value::Object(fields)) => fields,
        _ => return Err(ApiFailure::bad_request("Request body must be a JSON object")),
    };
    if fields.contains_key("id") {
        return Err(ApiFailure::bad_request("Field 'id' is assigned by the server"));
    }
    Ok(fields)
}

async fn list_records(
    State(db): State<Db>,
    Path((book, sheet)): Path<(String, String)>,
    RawQuery(raw): RawQuery,
) -> Result<Json<Value>, ApiFailure> {
    let params = parse_params(raw.as_deref())?;
    let sheets = db.sheets.read().await;
    let sheet = sheets.get(&(book, sheet)).ok_or_else(ApiFailure::not_found)?;

    let matching: Vec<Value> = sheet
        .rows
        .iter()
        .filter(|(_, fields)| matches(fields, &params.filters))
        .map(|(id, fields)| record(*id, project(fields, &params)))
        .collect();

    let Some(limit) = params.limit else {
        return Ok(Json(Value::Array(matching)));
    };
    let count = matching.len();
    let items: Vec<Value> = matching
        .into_iter()
        .skip(usize::try_from(params.offset).unwrap_or(usize::MAX))
        .take(usize::try_from(limit).unwrap_or(usize::MAX))
        .collect();
    Ok(Json(json!({"items": items, "count": count})))
}

async fn get_record(
    State(db): State<Db>,
    Path((book, sheet, id)): Path<(String, String, u64)>,
    RawQuery(raw): RawQuery,
) -> Result<Json<Value>, ApiFailure> {
    let params = parse_params(raw.as_deref())?;
    let sheets = db.sheets.read().await;
    let fields = sheets
        .get(&(book, sheet))
        .and_then(|sheet| sheet.rows.get(&id))
        .ok_or_else(ApiFailure::not_found)?;
    Ok(Json(record(id, project(fields, &params))))
}

async fn create_record(
    State(db): State<Db>,
    Path((book, sheet)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiFailure> {
    authorize(&db, &headers)?;
    let fields = fields_from_body(&body)?;
    let mut sheets = db.sheets.write().await;
    let id = sheets
        .entry((book.clone(), sheet.clone()))
        .or_default()
        .insert(fields.clone());
    debug!(%book, %sheet, id, "created record");
    Ok((StatusCode::CREATED, Json(record(id, fields))))
}

async fn update_record(
    State(db): State<Db>,
    Path((book, sheet, id)): Path<(String, String, u64)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiFailure> {
    authorize(&db, &headers)?;
    let changes = fields_from_body(&body)?;
    let mut sheets = db.sheets.write().await;
    let fields = sheets
        .get_mut(&(book, sheet))
        .and_then(|sheet| sheet.rows.get_mut(&id))
        .ok_or_else(ApiFailure::not_found)?;
    fields.extend(changes);
    Ok(Json(record(id, fields.clone())))
}

async fn delete_record(
    State(db): State<Db>,
    Path((book, sheet, id)): Path<(String, String, u64)>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiFailure> {
    authorize(&db, &headers)?;
    let mut sheets = db.sheets.write().await;
    sheets
        .get_mut(&(book, sheet))
        .and_then(|sheet| sheet.rows.remove(&id))
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(ApiFailure::not_found)
}
