//! Media (streaming) servers (`MGMT_FMS`).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{expect_object, matches_query, number, opt_text, text};
use crate::api::Api;
use crate::error::ApiError;
use crate::store::{to_fields, ApiStoreHelper, Entity, StoreState, DEFAULT_CACHE_TTL};
use crate::types::{KeySpec, RecordKey, Table};

pub const ENDPOINT: &str = "/media-server-info";
pub const TABLE: &str = "MGMT_FMS";
pub const TABLE_KEY: &str = "FMS_ID";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaServer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub fms_id: String,
    pub fms_name: String,
    pub fms_ip: String,
    pub fms_ext_ip: Option<String>,
    pub fms_con_id: String,
    pub fms_passwd: String,
    pub fms_port: i64,
    pub svr_type: String,
    pub alive: String,
    pub alive_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Entity for MediaServer {
    fn from_api(data: Value) -> Result<Self, serde_json::Error> {
        expect_object(&data)?;
        Ok(Self {
            id: data.get("id").and_then(Value::as_i64),
            fms_id: text(&data, "fms_id"),
            fms_name: text(&data, "fms_name"),
            fms_ip: text(&data, "fms_ip"),
            fms_ext_ip: opt_text(&data, "fms_ext_ip"),
            fms_con_id: text(&data, "fms_con_id"),
            fms_passwd: text(&data, "fms_passwd"),
            fms_port: number(&data, "fms_port"),
            svr_type: text(&data, "svr_type"),
            alive: text(&data, "alive"),
            alive_time: opt_text(&data, "alive_time"),
            created_at: opt_text(&data, "created_at"),
            updated_at: opt_text(&data, "updated_at"),
        })
    }
}

pub struct MediaServerStore {
    helper: ApiStoreHelper<MediaServer>,
    table: Table,
}

impl MediaServerStore {
    pub fn new(api: Arc<Api>) -> Self {
        Self {
            helper: ApiStoreHelper::new(ENDPOINT, StoreState::new(), api),
            table: Table::new(TABLE, KeySpec::single(TABLE_KEY)),
        }
    }

    pub fn state(&self) -> &Arc<StoreState<MediaServer>> {
        self.helper.state()
    }

    pub async fn fetch_media_servers(&self, force_refresh: bool) {
        self.helper
            .fetch_all(force_refresh, DEFAULT_CACHE_TTL, "media servers", Some(TABLE))
            .await;
    }

    pub async fn create_media_server(
        &self,
        server: &MediaServer,
    ) -> Result<Option<MediaServer>, ApiError> {
        self.helper
            .create(to_fields(server)?, Some(&self.table))
            .await
    }

    pub async fn update_media_server(
        &self,
        fms_id: &str,
        patch: Map<String, Value>,
    ) -> Result<Option<MediaServer>, ApiError> {
        self.helper
            .update(&RecordKey::from(fms_id), patch, Some(&self.table))
            .await
    }

    pub async fn delete_media_server(&self, fms_id: &str) -> Result<Option<()>, ApiError> {
        self.helper
            .delete(&RecordKey::from(fms_id), Some(&self.table))
            .await
    }

    pub async fn delete_media_servers(&self, fms_ids: &[String]) -> Result<Option<()>, ApiError> {
        let keys: Vec<RecordKey> = fms_ids.iter().cloned().map(RecordKey::from).collect();
        self.helper.delete_many(&keys, Some(&self.table)).await
    }

    pub fn clear(&self) {
        self.helper.clear();
    }

    pub fn items(&self) -> Vec<MediaServer> {
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

    pub fn get_by_id(&self, fms_id: &str) -> Option<MediaServer> {
        self.helper.find(|server| server.fms_id == fms_id)
    }

    pub fn search(&self, query: &str) -> Vec<MediaServer> {
        self.helper
            .filter(|s| matches_query(query, &[&s.fms_id, &s.fms_name, &s.fms_ip, &s.svr_type]))
    }
}
