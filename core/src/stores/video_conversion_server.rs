//! Transcoding servers (`MGMT_TRANS`).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{expect_object, matches_query, number, opt_text, text, text_or};
use crate::api::Api;
use crate::error::ApiError;
use crate::store::{to_fields, ApiStoreHelper, Entity, StoreState, DEFAULT_CACHE_TTL};
use crate::types::{KeySpec, RecordKey, Table};

pub const ENDPOINT: &str = "/video-conversion-server-info";
pub const TABLE: &str = "MGMT_TRANS";
pub const TABLE_KEY: &str = "TRANS_ID";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoConversionServer {
    pub trans_id: String,
    pub trans_name: String,
    pub trans_ip: String,
    pub trans_port: i64,
    pub alive: String,
    pub alive_time: Option<String>,
    pub json_job: String,
    pub json_yn: String,
    pub json_date: Option<String>,
    pub version: String,
    pub build_date: Option<String>,
    pub start_date: Option<String>,
}

impl Entity for VideoConversionServer {
    fn from_api(data: Value) -> Result<Self, serde_json::Error> {
        expect_object(&data)?;
        Ok(Self {
            trans_id: text(&data, "trans_id"),
            trans_name: text(&data, "trans_name"),
            trans_ip: text(&data, "trans_ip"),
            trans_port: number(&data, "trans_port"),
            alive: text_or(&data, "alive", "N"),
            alive_time: opt_text(&data, "alive_time"),
            json_job: text(&data, "json_job"),
            json_yn: text_or(&data, "json_yn", "N"),
            json_date: opt_text(&data, "json_date"),
            version: text(&data, "version"),
            build_date: opt_text(&data, "build_date"),
            start_date: opt_text(&data, "start_date"),
        })
    }
}

pub struct VideoConversionServerStore {
    helper: ApiStoreHelper<VideoConversionServer>,
    table: Table,
}

impl VideoConversionServerStore {
    pub fn new(api: Arc<Api>) -> Self {
        Self {
            helper: ApiStoreHelper::new(ENDPOINT, StoreState::new(), api),
            table: Table::new(TABLE, KeySpec::single(TABLE_KEY)),
        }
    }

    pub fn state(&self) -> &Arc<StoreState<VideoConversionServer>> {
        self.helper.state()
    }

    pub async fn fetch_servers(&self, force_refresh: bool) {
        self.helper
            .fetch_all(
                force_refresh,
                DEFAULT_CACHE_TTL,
                "video conversion servers",
                Some(TABLE),
            )
            .await;
    }

    pub async fn create_server(
        &self,
        server: &VideoConversionServer,
    ) -> Result<Option<VideoConversionServer>, ApiError> {
        self.helper
            .create(to_fields(server)?, Some(&self.table))
            .await
    }

    pub async fn update_server(
        &self,
        trans_id: &str,
        patch: Map<String, Value>,
    ) -> Result<Option<VideoConversionServer>, ApiError> {
        self.helper
            .update(&RecordKey::from(trans_id), patch, Some(&self.table))
            .await
    }

    pub async fn delete_server(&self, trans_id: &str) -> Result<Option<()>, ApiError> {
        self.helper
            .delete(&RecordKey::from(trans_id), Some(&self.table))
            .await
    }

    pub async fn delete_servers(&self, trans_ids: &[String]) -> Result<Option<()>, ApiError> {
        let keys: Vec<RecordKey> = trans_ids.iter().cloned().map(RecordKey::from).collect();
        self.helper.delete_many(&keys, Some(&self.table)).await
    }

    pub fn clear(&self) {
        self.helper.clear();
    }

    pub fn items(&self) -> Vec<VideoConversionServer> {
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

    pub fn get_by_id(&self, trans_id: &str) -> Option<VideoConversionServer> {
        self.helper.find(|server| server.trans_id == trans_id)
    }

    pub fn search(&self, query: &str) -> Vec<VideoConversionServer> {
        self.helper
            .filter(|s| matches_query(query, &[&s.trans_id, &s.trans_name, &s.trans_ip]))
    }
}
