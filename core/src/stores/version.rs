//! Application version metadata (`MGMT_VERSION`).
//!
//! The table names its columns `key`, `product` and `path`; the console uses
//! `version_id`, `product_name` and `storage_path`. Both directions accept
//! either spelling.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{expect_object, matches_query, opt_text, text};
use crate::api::Api;
use crate::error::ApiError;
use crate::store::{
    field_text, to_fields, ApiStoreHelper, Entity, StoreState, DEFAULT_CACHE_TTL,
};
use crate::types::{KeySpec, RecordKey, Table};

pub const ENDPOINT: &str = "/version-mgt";
pub const TABLE: &str = "MGMT_VERSION";
pub const TABLE_KEY: &str = "KEY";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Version {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub version_id: String,
    pub product_name: String,
    pub version: String,
    pub storage_path: Option<String>,
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Backend column for a console field name, `None` for fields the table
/// does not have.
fn backend_field(name: &str) -> Option<&'static str> {
    match name.to_ascii_lowercase().as_str() {
        "key" | "version_id" => Some("key"),
        "product" | "product_name" => Some("product"),
        "path" | "storage_path" => Some("path"),
        "version" => Some("version"),
        "release_date" => Some("release_date"),
        _ => None,
    }
}

fn is_backend_spelling(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "key" | "product" | "path" | "version" | "release_date"
    )
}

impl Entity for Version {
    fn from_api(data: Value) -> Result<Self, serde_json::Error> {
        expect_object(&data)?;
        let either = |backend: &str, frontend: &str| {
            opt_text(&data, backend).or_else(|| opt_text(&data, frontend))
        };
        Ok(Self {
            id: data.get("id").and_then(Value::as_i64),
            version_id: either("key", "version_id").unwrap_or_default(),
            product_name: either("product", "product_name").unwrap_or_default(),
            version: text(&data, "version"),
            storage_path: either("path", "storage_path"),
            release_date: opt_text(&data, "release_date"),
            created_at: opt_text(&data, "created_at"),
            updated_at: opt_text(&data, "updated_at"),
        })
    }

    /// Renames to the table's columns and drops fields it does not have.
    /// A backend spelling wins over the console spelling of the same column.
    fn to_api(fields: Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::new();
        let (backend, console): (Vec<_>, Vec<_>) = fields
            .into_iter()
            .partition(|(name, _)| is_backend_spelling(name));
        for (name, value) in console.into_iter().chain(backend) {
            let Some(column) = backend_field(&name) else {
                continue;
            };
            if value.is_null() && out.contains_key(column) {
                continue;
            }
            out.insert(column.to_string(), value);
        }
        out
    }

    /// Keys are looked up under the table's column names.
    fn key_value(&self, field: &str) -> Option<String> {
        let api = Version::to_api(to_fields(self).ok()?);
        field_text(&Value::Object(api), field)
    }
}

pub struct VersionStore {
    helper: ApiStoreHelper<Version>,
    table: Table,
}

impl VersionStore {
    pub fn new(api: Arc<Api>) -> Self {
        Self {
            helper: ApiStoreHelper::new(ENDPOINT, StoreState::new(), api),
            table: Table::new(TABLE, KeySpec::single(TABLE_KEY)),
        }
    }

    pub fn state(&self) -> &Arc<StoreState<Version>> {
        self.helper.state()
    }

    pub async fn fetch_versions(&self, force_refresh: bool) {
        self.helper
            .fetch_all(force_refresh, DEFAULT_CACHE_TTL, "versions", Some(TABLE))
            .await;
    }

    pub async fn create_version(&self, version: &Version) -> Result<Option<Version>, ApiError> {
        self.helper
            .create(to_fields(version)?, Some(&self.table))
            .await
    }

    pub async fn update_version(
        &self,
        version_id: &str,
        patch: Map<String, Value>,
    ) -> Result<Option<Version>, ApiError> {
        self.helper
            .update(&RecordKey::from(version_id), patch, Some(&self.table))
            .await
    }

    pub async fn delete_version(&self, version_id: &str) -> Result<Option<()>, ApiError> {
        self.helper
            .delete(&RecordKey::from(version_id), Some(&self.table))
            .await
    }

    pub async fn delete_versions(&self, version_ids: &[String]) -> Result<Option<()>, ApiError> {
        let keys: Vec<RecordKey> = version_ids.iter().cloned().map(RecordKey::from).collect();
        self.helper.delete_many(&keys, Some(&self.table)).await
    }

    pub fn clear(&self) {
        self.helper.clear();
    }

    pub fn items(&self) -> Vec<Version> {
        self.helper.items()
    }

    pub fn total_count(&self) -> usize {
        self.helper.total_count()
    }

    pub fn is_loading(&self) -> bool {
        self.helper.is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.helper.error()
    }

    pub fn get_by_id(&self, version_id: &str) -> Option<Version> {
        self.helper.find(|v| v.version_id == version_id)
    }

    pub fn get_by_product(&self, product_name: &str) -> Vec<Version> {
        let needle = product_name.to_lowercase();
        self.helper
            .filter(|v| v.product_name.to_lowercase().contains(&needle))
    }

    pub fn search(&self, query: &str) -> Vec<Version> {
        self.helper
            .filter(|v| matches_query(query, &[&v.version_id, &v.product_name, &v.version]))
    }
}
