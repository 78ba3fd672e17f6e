//! The HTTP client wrapper every store talks through.
//!
//! # Design
//! `Api` pairs the stateless `VmsClient` with a `Transport` and adds the
//! cross-cutting behaviour: request/response logging, status checking, and
//! session teardown on 401. Any 401 clears the shared `Session`, except a
//! 401 from the session probe, which only means "not logged in".
//!
//! The FastAPI bulk-query and composite REST calls live under `fastapi()`.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::client::{decode, VmsClient};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::session::Session;
use crate::types::{DbArrayQuery, RecordKey};

/// Response envelope returned by the verb methods.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub data: Value,
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl ApiResponse {
    fn from_http(response: HttpResponse) -> Result<Self, ApiError> {
        Ok(Self {
            data: decode(&response.body)?,
            status: response.status,
            headers: response.headers,
        })
    }

    pub fn into_data<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        serde_json::from_value(self.data).map_err(|e| ApiError::Deserialization(e.to_string()))
    }
}

pub struct Api {
    client: VmsClient,
    transport: Arc<dyn Transport>,
    session: Session,
}

impl std::fmt::Debug for Api {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Api")
            .field("client", &self.client)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl Api {
    pub fn new(client: VmsClient, transport: Arc<dyn Transport>, session: Session) -> Self {
        Self {
            client,
            transport,
            session,
        }
    }

    pub fn client(&self) -> &VmsClient {
        &self.client
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn get(
        &self,
        url: &str,
        query: Vec<(String, String)>,
    ) -> Result<ApiResponse, ApiError> {
        self.verb(HttpMethod::Get, url, query, None).await
    }

    pub async fn post(&self, url: &str, data: Option<&Value>) -> Result<ApiResponse, ApiError> {
        self.verb(HttpMethod::Post, url, Vec::new(), data).await
    }

    pub async fn put(&self, url: &str, data: Option<&Value>) -> Result<ApiResponse, ApiError> {
        self.verb(HttpMethod::Put, url, Vec::new(), data).await
    }

    pub async fn patch(&self, url: &str, data: Option<&Value>) -> Result<ApiResponse, ApiError> {
        self.verb(HttpMethod::Patch, url, Vec::new(), data).await
    }

    pub async fn delete(
        &self,
        url: &str,
        query: Vec<(String, String)>,
    ) -> Result<ApiResponse, ApiError> {
        self.verb(HttpMethod::Delete, url, query, None).await
    }

    pub fn fastapi(&self) -> FastApi<'_> {
        FastApi { api: self }
    }

    async fn verb(
        &self,
        method: HttpMethod,
        url: &str,
        query: Vec<(String, String)>,
        data: Option<&Value>,
    ) -> Result<ApiResponse, ApiError> {
        let request = self.client.build(method, url, query, data)?;
        self.call(request).await
    }

    /// Execute a prebuilt request and decode its JSON body.
    pub async fn call(&self, request: HttpRequest) -> Result<ApiResponse, ApiError> {
        ApiResponse::from_http(self.send(request).await?)
    }

    /// Execute a prebuilt request. Non-2xx responses become `ApiError::Http`.
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let method = request.method.as_str();
        let url = request.url.clone();
        debug!(
            method,
            url = %url,
            query = ?request.query,
            headers = ?redacted(&request.headers),
            body = request.body.as_deref().unwrap_or(""),
            "API request"
        );

        let response = match self.transport.execute(request).await {
            Ok(response) => response,
            Err(err) => {
                error!(
                    method,
                    url = %url,
                    error = %err,
                    "no response from backend; check that the server is running, the base URL, \
                     CORS and firewall settings"
                );
                return Err(err);
            }
        };

        debug!(
            method,
            url = %url,
            status = response.status,
            headers = ?response.headers,
            body = %response.body,
            "API response"
        );

        if response.is_success() {
            return Ok(response);
        }

        self.on_error_status(method, &url, &response);
        Err(ApiError::Http {
            status: response.status,
            body: response.body,
        })
    }

    fn on_error_status(&self, method: &str, url: &str, response: &HttpResponse) {
        let status = response.status;
        match status {
            401 if self.client.is_session_probe(url) => {
                debug!(url, "session probe: not logged in");
            }
            401 => {
                warn!(method, url, "authentication failed, clearing session");
                self.session.clear();
            }
            403 => error!(method, url, status, body = %response.body, "access denied"),
            404 => error!(
                method,
                url,
                status,
                body = %response.body,
                "resource not found; check the endpoint path and that the route is registered"
            ),
            s if s >= 500 => error!(method, url, status, body = %response.body, "server error"),
            _ => error!(method, url, status, body = %response.body, "request failed"),
        }
    }
}

fn redacted(headers: &[(String, String)]) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            if name.eq_ignore_ascii_case("authorization") {
                (name.clone(), "<redacted>".to_string())
            } else {
                (name.clone(), value.clone())
            }
        })
        .collect()
}

/// FastAPI-flavour calls: bulk query and composite-key REST.
#[derive(Debug, Clone, Copy)]
pub struct FastApi<'a> {
    api: &'a Api,
}

impl FastApi<'_> {
    pub async fn get_db_array<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &DbArrayQuery,
    ) -> Result<Vec<T>, ApiError> {
        let request = self.api.client.build_get_db_array(table, query)?;
        let response = self.api.send(request).await?;
        self.api.client.parse_db_array(response)
    }

    pub async fn rest_access(
        &self,
        table: &str,
        method: HttpMethod,
        data: Option<&Value>,
        key: Option<&RecordKey>,
    ) -> Result<ApiResponse, ApiError> {
        let request = self.api.client.build_rest_access(table, method, data, key)?;
        ApiResponse::from_http(self.api.send(request).await?)
    }
}
