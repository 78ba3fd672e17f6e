//! In-memory stand-in for the VMS backend.
//!
//! Serves both API flavours the console speaks: the legacy paginated
//! collections under `/api/{collection}` and the FastAPI bulk query plus
//! composite-key REST endpoints over a fixed table registry. Rows of the
//! registry tables are stored with lower-cased field names, as the real
//! backend returns them. Cookie sessions back `/api/auth/*`.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "vms_session";

/// Registry tables and their key fields.
pub const TABLES: &[(&str, &[&str])] = &[
    ("MGMT_CCTV", &["CCTV_ID"]),
    ("MGMT_FMS", &["FMS_ID"]),
    ("MGMT_MEDIA_INFO", &["SEQ"]),
    ("MGMT_CODE", &["GRP_GBN", "GRP_CODE", "CODE"]),
    ("MGMT_VERSION", &["KEY"]),
    ("MGMT_TRANS", &["TRANS_ID"]),
    ("MGMT_FTS", &["FTS_ID"]),
];

pub struct MockUser {
    pub id: &'static str,
    pub password: &'static str,
    pub name: &'static str,
    pub email: &'static str,
}

pub const USERS: &[MockUser] = &[MockUser {
    id: "admin",
    password: "admin",
    name: "Administrator",
    email: "admin@example.com",
}];

pub type Row = Map<String, Value>;

#[derive(Debug, Default)]
pub struct MockState {
    collections: HashMap<String, Vec<Row>>,
    tables: HashMap<String, Vec<Row>>,
    sessions: HashMap<String, String>,
    require_session: bool,
}

pub type Db = Arc<RwLock<MockState>>;

#[derive(Debug, Error)]
pub enum MockError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}: Field required")]
    MissingField(String),
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            MockError::BadRequest(message) => (StatusCode::BAD_REQUEST, json!(message)),
            MockError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, json!(message)),
            MockError::NotFound(message) => (StatusCode::NOT_FOUND, json!(message)),
            MockError::MissingField(field) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!([{ "loc": ["body", field], "msg": "Field required", "type": "missing" }]),
            ),
        };
        debug!(status = status.as_u16(), error = %self, "request rejected");
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

pub fn app() -> Router {
    router(Db::default())
}

/// Like `app`, but every data endpoint answers 401 without a live session.
pub fn app_requiring_session() -> Router {
    router(Arc::new(RwLock::new(MockState {
        require_session: true,
        ..MockState::default()
    })))
}

fn router(db: Db) -> Router {
    let data = Router::new()
        .route("/api/get-db-array", post(get_db_array))
        .route(
            "/api/rest-access-page/{table}",
            get(rest_get).post(rest_post).put(rest_put).delete(rest_delete),
        )
        .route("/api/{collection}", get(list_collection).post(create_in_collection))
        .route(
            "/api/{collection}/{id}",
            put(update_in_collection).delete(delete_from_collection),
        )
        .route_layer(middleware::from_fn_with_state(db.clone(), require_session));

    Router::new()
        .route("/health", get(health))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
        .route("/api/auth/logout", post(logout))
        .merge(data)
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    serve(listener, app()).await
}

pub async fn serve(listener: TcpListener, app: Router) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock VMS backend listening");
    }
    axum::serve(listener, app).await
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn require_session(
    State(db): State<Db>,
    request: Request,
    next: Next,
) -> Result<Response, MockError> {
    {
        let state = db.read().await;
        let live = session_token(request.headers())
            .is_some_and(|token| state.sessions.contains_key(&token));
        if state.require_session && !live {
            return Err(MockError::Unauthorized("Not authenticated".to_string()));
        }
    }
    Ok(next.run(request).await)
}

// --- legacy paginated collections ---

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "first_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

fn first_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    100
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Page {
    pub items: Vec<Value>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

/// Transcoding channels are keyed by `ch_id`, everything else by `id`.
pub fn collection_key(collection: &str) -> &'static str {
    if collection == "video-conversion-info" {
        "ch_id"
    } else {
        "id"
    }
}

async fn list_collection(
    State(db): State<Db>,
    Path(collection): Path<String>,
    Query(query): Query<PageQuery>,
) -> Json<Page> {
    let state = db.read().await;
    let rows = state
        .collections
        .get(&collection)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let page = query.page.max(1);
    let page_size = query.page_size.max(1);
    let start = ((page - 1) * page_size) as usize;

    Json(Page {
        items: rows
            .iter()
            .skip(start)
            .take(page_size as usize)
            .cloned()
            .map(Value::Object)
            .collect(),
        total: rows.len() as u64,
        page,
        page_size,
    })
}

async fn create_in_collection(
    State(db): State<Db>,
    Path(collection): Path<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), MockError> {
    let mut row = into_row(body)?;
    let key = collection_key(&collection);
    if value_text(row.get(key).unwrap_or(&Value::Null)).is_empty() {
        if key != "id" {
            return Err(MockError::MissingField(key.to_string()));
        }
        row.insert(key.to_string(), Value::String(Uuid::new_v4().to_string()));
    }

    db.write()
        .await
        .collections
        .entry(collection)
        .or_default()
        .push(row.clone());
    Ok((StatusCode::CREATED, Json(Value::Object(row))))
}

async fn update_in_collection(
    State(db): State<Db>,
    Path((collection, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, MockError> {
    let updates = into_row(body)?;
    let key = collection_key(&collection);

    let mut state = db.write().await;
    let row = state
        .collections
        .get_mut(&collection)
        .and_then(|rows| rows.iter_mut().find(|row| field_text(row, key) == id))
        .ok_or_else(record_not_found)?;
    row.extend(updates.into_iter().filter(|(field, _)| field != key));
    Ok(Json(Value::Object(row.clone())))
}

async fn delete_from_collection(
    State(db): State<Db>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<StatusCode, MockError> {
    let key = collection_key(&collection);
    let mut state = db.write().await;
    let rows = state
        .collections
        .get_mut(&collection)
        .ok_or_else(record_not_found)?;
    let index = rows
        .iter()
        .position(|row| field_text(row, key) == id)
        .ok_or_else(record_not_found)?;
    rows.remove(index);
    Ok(StatusCode::NO_CONTENT)
}

// --- bulk query and composite-key REST ---

#[derive(Debug, Deserialize)]
pub struct DbArrayRequest {
    pub target: String,
    /// Equality filters; a field repeated across entries matches any of its
    /// values.
    #[serde(default)]
    pub query: Vec<Row>,
    #[serde(default)]
    pub order: String,
}

/// Canonical table name and lower-cased key fields.
pub fn table_key(table: &str) -> Result<(&'static str, Vec<String>), MockError> {
    TABLES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(table))
        .map(|(name, key)| (*name, key.iter().map(|f| f.to_lowercase()).collect()))
        .ok_or_else(|| MockError::NotFound(format!("Table {table} not found")))
}

async fn get_db_array(
    State(db): State<Db>,
    Json(request): Json<DbArrayRequest>,
) -> Result<Json<Vec<Value>>, MockError> {
    let (name, _) = table_key(request.target.trim_matches('/'))?;

    let mut filters: Vec<(String, Vec<String>)> = Vec::new();
    for (field, value) in request.query.iter().flatten() {
        let value = value_text(value);
        match filters.iter_mut().find(|(f, _)| f.eq_ignore_ascii_case(field)) {
            Some((_, values)) => values.push(value),
            None => filters.push((field.clone(), vec![value])),
        }
    }

    let state = db.read().await;
    let mut rows: Vec<Row> = state
        .tables
        .get(name)
        .into_iter()
        .flatten()
        .filter(|row| {
            filters
                .iter()
                .all(|(field, values)| values.contains(&field_text(row, field)))
        })
        .cloned()
        .collect();
    sort_rows(&mut rows, &request.order);
    Ok(Json(rows.into_iter().map(Value::Object).collect()))
}

async fn rest_get(
    State(db): State<Db>,
    Path(table): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<Value>>, MockError> {
    let (name, keys) = table_key(&table)?;
    let mut order = String::new();
    let mut filters = Vec::new();
    for (field, value) in params {
        match field.as_str() {
            "SQL_ORDER" => order = value,
            "key" if keys.len() == 1 => filters.push((keys[0].clone(), value)),
            _ => filters.push((field, value)),
        }
    }

    let state = db.read().await;
    let mut rows: Vec<Row> = state
        .tables
        .get(name)
        .into_iter()
        .flatten()
        .filter(|row| key_matches(row, &filters))
        .cloned()
        .collect();
    sort_rows(&mut rows, &order);
    Ok(Json(rows.into_iter().map(Value::Object).collect()))
}

async fn rest_post(
    State(db): State<Db>,
    Path(table): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, MockError> {
    let (name, _) = table_key(&table)?;
    let row: Row = into_row(body)?
        .into_iter()
        .map(|(field, value)| (field.to_lowercase(), value))
        .collect();

    db.write()
        .await
        .tables
        .entry(name.to_string())
        .or_default()
        .push(row.clone());
    Ok(Json(Value::Object(row)))
}

async fn rest_put(
    State(db): State<Db>,
    Path(table): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, MockError> {
    let (name, keys) = table_key(&table)?;
    let body = into_row(body)?;

    let mut key_values = Vec::with_capacity(keys.len());
    for key in &keys {
        let value = body
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(key))
            .map(|(_, value)| value_text(value))
            .ok_or_else(|| {
                MockError::BadRequest(format!("Key field {} not found", key.to_uppercase()))
            })?;
        key_values.push((key.clone(), value));
    }

    let updates: Row = body
        .into_iter()
        .filter(|(field, _)| !keys.iter().any(|key| key.eq_ignore_ascii_case(field)))
        .map(|(field, value)| (field.to_lowercase(), value))
        .collect();
    if updates.is_empty() {
        return Err(MockError::BadRequest("No fields to update".to_string()));
    }

    let mut state = db.write().await;
    let row = state
        .tables
        .get_mut(name)
        .and_then(|rows| rows.iter_mut().find(|row| key_matches(row, &key_values)))
        .ok_or_else(record_not_found)?;
    row.extend(updates);
    Ok(Json(Value::Object(row.clone())))
}

async fn rest_delete(
    State(db): State<Db>,
    Path(table): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Value>, MockError> {
    let (name, keys) = table_key(&table)?;
    let key_values = delete_key(&keys, &params)?;

    let mut state = db.write().await;
    let rows = state.tables.get_mut(name).ok_or_else(record_not_found)?;
    let index = rows
        .iter()
        .position(|row| key_matches(row, &key_values))
        .ok_or_else(record_not_found)?;
    Ok(Json(Value::Object(rows.remove(index))))
}

/// Key of a DELETE: `key=<v>` for single-key tables; the key fields as
/// parameters, or `key=a,b,c`, for composite ones.
pub fn delete_key(
    keys: &[String],
    params: &[(String, String)],
) -> Result<Vec<(String, String)>, MockError> {
    let param = |name: &str| {
        params
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    };
    let missing = || MockError::BadRequest("Key parameter not found".to_string());

    if let [key] = keys {
        let value = param("key").or_else(|| param(key)).ok_or_else(missing)?;
        return Ok(vec![(key.clone(), value)]);
    }

    let by_field: Option<Vec<(String, String)>> = keys
        .iter()
        .map(|key| param(key).map(|value| (key.clone(), value)))
        .collect();
    if let Some(pairs) = by_field {
        return Ok(pairs);
    }

    let joined = param("key").ok_or_else(missing)?;
    let values: Vec<&str> = joined.split(',').map(str::trim).collect();
    if values.len() != keys.len() {
        return Err(MockError::BadRequest(format!(
            "Key must have {} comma-separated values",
            keys.len()
        )));
    }
    Ok(keys
        .iter()
        .cloned()
        .zip(values.into_iter().map(str::to_string))
        .collect())
}

// --- cookie sessions ---

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub password: String,
}

fn user_payload(user: &MockUser) -> Value {
    json!({ "id": user.id, "name": user.name, "email": user.email })
}

fn find_user(id: &str) -> Option<&'static MockUser> {
    USERS.iter().find(|user| user.id == id)
}

async fn login(
    State(db): State<Db>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, MockError> {
    let user_id = request.user_id.trim();
    if user_id.is_empty() {
        return Err(MockError::BadRequest("user_id required".to_string()));
    }
    if request.password.is_empty() {
        return Err(MockError::BadRequest("password required".to_string()));
    }
    let user = find_user(user_id)
        .filter(|user| user.password == request.password)
        .ok_or_else(|| MockError::Unauthorized("Invalid user_id or password".to_string()))?;

    let token = Uuid::new_v4().simple().to_string();
    db.write()
        .await
        .sessions
        .insert(token.clone(), user.id.to_string());
    info!(user = user.id, "login");

    let cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax");
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "user": user_payload(user) })),
    )
        .into_response())
}

async fn me(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Value>, MockError> {
    let state = db.read().await;
    let user = session_token(&headers)
        .and_then(|token| state.sessions.get(&token).cloned())
        .and_then(|user_id| find_user(&user_id))
        .ok_or_else(|| MockError::Unauthorized("Not authenticated".to_string()))?;
    Ok(Json(json!({ "user": user_payload(user) })))
}

async fn logout(State(db): State<Db>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        db.write().await.sessions.remove(&token);
    }
    let cookie = format!("{SESSION_COOKIE}=; Path=/; Max-Age=0");
    ([(header::SET_COOKIE, cookie)], Json(json!({ "ok": true }))).into_response()
}

/// Value of the session cookie, if the request carries one.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token.to_string())
}

// --- row helpers ---

fn into_row(body: Value) -> Result<Row, MockError> {
    match body {
        Value::Object(row) => Ok(row),
        _ => Err(MockError::BadRequest("Expected a JSON object".to_string())),
    }
}

fn record_not_found() -> MockError {
    MockError::NotFound("Record not found".to_string())
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Field rendered as text, field name matched case-insensitively.
pub fn field_text(row: &Row, field: &str) -> String {
    row.iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(field))
        .map(|(_, value)| value_text(value))
        .unwrap_or_default()
}

fn key_matches(row: &Row, key: &[(String, String)]) -> bool {
    key.iter().all(|(field, value)| field_text(row, field) == *value)
}

/// Orders by the first field of an `ORDER BY`-style string, e.g.
/// `"cctv_id DESC"`.
pub fn sort_rows(rows: &mut [Row], order: &str) {
    let mut parts = order.split_whitespace();
    let Some(field) = parts.next().map(|f| f.trim_end_matches(',')) else {
        return;
    };
    let descending = parts
        .next()
        .is_some_and(|direction| direction.eq_ignore_ascii_case("desc"));
    rows.sort_by_key(|row| field_text(row, field));
    if descending {
        rows.reverse();
    }
}
