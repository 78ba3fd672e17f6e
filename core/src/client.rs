//! Stateless HTTP request builder and response parser for the VMS API.
//!
//! # Design
//! `VmsClient` holds only the base URL and the optional legacy bearer token
//! and carries no mutable state between calls. Every endpoint is split into a
//! `build_*` method that produces an `HttpRequest` and a `parse_*` method
//! that consumes an `HttpResponse`. The round-trip itself happens in a
//! `Transport`, keeping this layer deterministic.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{AuthUser, DbArrayQuery, PaginatedResponse, RecordKey};

pub const GET_DB_ARRAY_PATH: &str = "/get-db-array";
pub const REST_ACCESS_PATH: &str = "/rest-access-page";
pub const SESSION_PROBE_PATH: &str = "/auth/me";
pub const LOGOUT_PATH: &str = "/auth/logout";

#[derive(Debug, Clone)]
pub struct VmsClient {
    base_url: String,
    bearer_token: Option<String>,
}

impl VmsClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer_token: None,
        }
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bearer_token: config.bearer_token.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve an endpoint against the base URL. Absolute URLs pass through.
    pub fn url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return endpoint.to_string();
        }
        if endpoint.starts_with('/') {
            format!("{}{endpoint}", self.base_url)
        } else {
            format!("{}/{endpoint}", self.base_url)
        }
    }

    /// Whether `url` targets the session probe, whose 401 means "not logged in".
    pub fn is_session_probe(&self, url: &str) -> bool {
        url.trim_end_matches('/').ends_with(SESSION_PROBE_PATH)
    }

    /// Generic request with an optional JSON body.
    pub fn build(
        &self,
        method: HttpMethod,
        endpoint: &str,
        query: Vec<(String, String)>,
        body: Option<&Value>,
    ) -> Result<HttpRequest, ApiError> {
        let mut request = HttpRequest::new(method, self.url(endpoint)).with_query(query);
        if let Some(token) = &self.bearer_token {
            request = request.with_header("authorization", format!("Bearer {token}"));
        }
        if let Some(body) = body {
            let body =
                serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
            request = request.with_json_body(body);
        }
        Ok(request)
    }

    // --- legacy paginated collections ---

    pub fn build_list_page(
        &self,
        endpoint: &str,
        page: u64,
        page_size: u64,
    ) -> Result<HttpRequest, ApiError> {
        let query = vec![
            ("page".to_string(), page.to_string()),
            ("page_size".to_string(), page_size.to_string()),
        ];
        self.build(HttpMethod::Get, endpoint, query, None)
    }

    pub fn build_create(&self, endpoint: &str, body: &Value) -> Result<HttpRequest, ApiError> {
        self.build(HttpMethod::Post, endpoint, Vec::new(), Some(body))
    }

    pub fn build_update(
        &self,
        endpoint: &str,
        id: &RecordKey,
        body: &Value,
    ) -> Result<HttpRequest, ApiError> {
        let path = format!("{}/{}", endpoint.trim_end_matches('/'), id.path_segment());
        self.build(HttpMethod::Put, &path, Vec::new(), Some(body))
    }

    pub fn build_delete(&self, endpoint: &str, id: &RecordKey) -> Result<HttpRequest, ApiError> {
        let path = format!("{}/{}", endpoint.trim_end_matches('/'), id.path_segment());
        self.build(HttpMethod::Delete, &path, Vec::new(), None)
    }

    // --- FastAPI bulk query and composite REST ---

    pub fn build_get_db_array(
        &self,
        table: &str,
        query: &DbArrayQuery,
    ) -> Result<HttpRequest, ApiError> {
        let mut body =
            serde_json::to_value(query).map_err(|e| ApiError::Serialization(e.to_string()))?;
        if let Value::Object(fields) = &mut body {
            fields.insert("target".to_string(), Value::String(format!("/{table}/")));
        }
        let body =
            serde_json::to_string(&body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest::new(HttpMethod::Post, self.url(GET_DB_ARRAY_PATH)).with_json_body(body))
    }

    /// Composite REST call. The key travels as query parameters for GET and
    /// DELETE; `data` is the JSON body for the other methods.
    pub fn build_rest_access(
        &self,
        table: &str,
        method: HttpMethod,
        data: Option<&Value>,
        key: Option<&RecordKey>,
    ) -> Result<HttpRequest, ApiError> {
        let url = self.url(&format!("{REST_ACCESS_PATH}/{table}"));
        let mut request = HttpRequest::new(method, url);
        match method {
            HttpMethod::Get | HttpMethod::Delete => {
                if let Some(key) = key {
                    request = request.with_query(key.query_params());
                }
            }
            _ => {
                if let Some(data) = data {
                    let body = serde_json::to_string(data)
                        .map_err(|e| ApiError::Serialization(e.to_string()))?;
                    request = request.with_json_body(body);
                }
            }
        }
        Ok(request)
    }

    // --- session ---

    pub fn build_session_probe(&self) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.url(SESSION_PROBE_PATH))
    }

    pub fn build_logout(&self) -> HttpRequest {
        HttpRequest::new(HttpMethod::Post, self.url(LOGOUT_PATH))
    }

    // --- parsers ---

    pub fn parse_json<T: DeserializeOwned>(&self, response: HttpResponse) -> Result<T, ApiError> {
        check_status(&response)?;
        decode(&response.body)
    }

    pub fn parse_page<T: DeserializeOwned>(
        &self,
        response: HttpResponse,
    ) -> Result<PaginatedResponse<T>, ApiError> {
        self.parse_json(response)
    }

    pub fn parse_db_array<T: DeserializeOwned>(
        &self,
        response: HttpResponse,
    ) -> Result<Vec<T>, ApiError> {
        self.parse_json(response)
    }

    /// `Some(user)` when the probe returned a user with a non-empty id.
    pub fn parse_session_probe(
        &self,
        response: HttpResponse,
    ) -> Result<Option<AuthUser>, ApiError> {
        let body: Value = self.parse_json(response)?;
        let user = match body.get("user") {
            Some(user) if !user.is_null() => user.clone(),
            _ => return Ok(None),
        };
        let user: AuthUser = serde_json::from_value(user)
            .map_err(|e| ApiError::Deserialization(e.to_string()))?;
        Ok(if user.id.is_empty() { None } else { Some(user) })
    }

    pub fn parse_empty(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }
}

/// Map non-success status codes to `ApiError::Http`.
pub(crate) fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError::Http {
        status: response.status,
        body: response.body.clone(),
    })
}

/// Decode a body, treating an empty body as JSON `null`.
pub(crate) fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    let body = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(body).map_err(|e| ApiError::Deserialization(e.to_string()))
}
