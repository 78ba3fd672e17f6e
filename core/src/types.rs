//! Wire DTOs and key types shared by the client, the API wrapper and the
//! stores.
//!
//! # Design
//! These mirror the mock-server's schema but are defined independently;
//! integration tests catch drift between the two crates.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One page of a legacy collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

/// Body of a bulk query, minus the `target` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DbArrayQuery {
    pub layout: Vec<Value>,
    pub query: Vec<Value>,
    #[serde(rename = "where")]
    pub where_clause: String,
    pub order: String,
}

impl DbArrayQuery {
    /// Every column of every row, unordered.
    pub fn all() -> Self {
        Self {
            layout: vec![json!({ "field": "*" })],
            query: Vec::new(),
            where_clause: String::new(),
            order: String::new(),
        }
    }

    pub fn order_by(mut self, order: impl Into<String>) -> Self {
        self.order = order.into();
        self
    }

    /// Adds an equality filter; repeated fields become an `IN` on the server.
    pub fn filter(mut self, field: &str, value: impl Into<Value>) -> Self {
        let value: Value = value.into();
        self.query.push(json!({ field: value }));
        self
    }
}

impl Default for DbArrayQuery {
    fn default() -> Self {
        Self::all()
    }
}

/// Names of the primary key field(s) of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySpec {
    Single(String),
    Composite(Vec<String>),
}

impl KeySpec {
    pub fn single(field: &str) -> Self {
        KeySpec::Single(field.to_string())
    }

    pub fn composite(fields: &[&str]) -> Self {
        KeySpec::Composite(fields.iter().map(|f| f.to_string()).collect())
    }

    pub fn fields(&self) -> Vec<&str> {
        match self {
            KeySpec::Single(field) => vec![field.as_str()],
            KeySpec::Composite(fields) => fields.iter().map(String::as_str).collect(),
        }
    }
}

/// A primary key value: one value, or one value per composite key field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordKey {
    Single(String),
    Composite(Vec<(String, String)>),
}

impl RecordKey {
    pub fn composite(pairs: &[(&str, &str)]) -> Self {
        RecordKey::Composite(
            pairs
                .iter()
                .map(|(field, value)| (field.to_string(), value.to_string()))
                .collect(),
        )
    }

    /// Path form used by legacy endpoints: `id` or `a/b/c`, each value
    /// percent-encoded.
    pub fn path_segment(&self) -> String {
        match self {
            RecordKey::Single(value) => urlencoding::encode(value).into_owned(),
            RecordKey::Composite(pairs) => pairs
                .iter()
                .map(|(_, value)| urlencoding::encode(value))
                .collect::<Vec<_>>()
                .join("/"),
        }
    }

    /// Query form used by the composite REST endpoint.
    pub fn query_params(&self) -> Vec<(String, String)> {
        match self {
            RecordKey::Single(value) => vec![("key".to_string(), value.clone())],
            RecordKey::Composite(pairs) => pairs.clone(),
        }
    }

    /// Field/value pairs for payloads, resolving a single value against the
    /// key field it belongs to.
    pub fn pairs(&self, single_field: &str) -> Vec<(String, String)> {
        match self {
            RecordKey::Single(value) => vec![(single_field.to_string(), value.clone())],
            RecordKey::Composite(pairs) => pairs.clone(),
        }
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKey::Single(value) => write!(f, "{value}"),
            RecordKey::Composite(pairs) => {
                let rendered: Vec<String> =
                    pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();
                write!(f, "{}", rendered.join("&"))
            }
        }
    }
}

impl From<&str> for RecordKey {
    fn from(value: &str) -> Self {
        RecordKey::Single(value.to_string())
    }
}

impl From<String> for RecordKey {
    fn from(value: String) -> Self {
        RecordKey::Single(value)
    }
}

/// A FastAPI table binding: selects the bulk-query / composite REST path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub key: KeySpec,
}

impl Table {
    pub fn new(name: &str, key: KeySpec) -> Self {
        Self {
            name: name.to_string(),
            key,
        }
    }
}

/// The logged-in user as reported by the session probe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}
