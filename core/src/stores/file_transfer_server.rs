//! Video file transfer servers (`MGMT_FTS`).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{expect_object, matches_query, opt_text, text};
use crate::api::Api;
use crate::error::ApiError;
use crate::store::{to_fields, ApiStoreHelper, Entity, StoreState, DEFAULT_CACHE_TTL};
use crate::types::{KeySpec, RecordKey, Table};

pub const ENDPOINT: &str = "/video-file-transfer-server";
pub const TABLE: &str = "MGMT_FTS";
pub const TABLE_KEY: &str = "FTS_ID";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileTransferServer {
    pub fts_id: String,
    pub fts_name: String,
    pub fts_type: String,
    pub ip_addr: String,
    pub fts_target_ip: String,
    pub fts_target_root_dir: String,
    pub user_id: String,
    pub password: String,
    pub reg_date: Option<String>,
}

impl Entity for FileTransferServer {
    fn from_api(data: Value) -> Result<Self, serde_json::Error> {
        expect_object(&data)?;
        Ok(Self {
            fts_id: text(&data, "fts_id"),
            fts_name: text(&data, "fts_name"),
            fts_type: text(&data, "fts_type"),
            ip_addr: text(&data, "ip_addr"),
            fts_target_ip: text(&data, "fts_target_ip"),
            fts_target_root_dir: text(&data, "fts_target_root_dir"),
            user_id: text(&data, "user_id"),
            password: text(&data, "password"),
            reg_date: opt_text(&data, "reg_date"),
        })
    }
}

pub struct FileTransferServerStore {
    helper: ApiStoreHelper<FileTransferServer>,
    table: Table,
}

impl FileTransferServerStore {
    pub fn new(api: Arc<Api>) -> Self {
        Self {
            helper: ApiStoreHelper::new(ENDPOINT, StoreState::new(), api),
            table: Table::new(TABLE, KeySpec::single(TABLE_KEY)),
        }
    }

    pub fn state(&self) -> &Arc<StoreState<FileTransferServer>> {
        self.helper.state()
    }

    pub async fn fetch_transfer_servers(&self, force_refresh: bool) {
        self.helper
            .fetch_all(
                force_refresh,
                DEFAULT_CACHE_TTL,
                "file transfer servers",
                Some(TABLE),
            )
            .await;
    }

    pub async fn create_transfer_server(
        &self,
        server: &FileTransferServer,
    ) -> Result<Option<FileTransferServer>, ApiError> {
        self.helper
            .create(to_fields(server)?, Some(&self.table))
            .await
    }

    pub async fn update_transfer_server(
        &self,
        fts_id: &str,
        patch: Map<String, Value>,
    ) -> Result<Option<FileTransferServer>, ApiError> {
        self.helper
            .update(&RecordKey::from(fts_id), patch, Some(&self.table))
            .await
    }

    pub async fn delete_transfer_server(&self, fts_id: &str) -> Result<Option<()>, ApiError> {
        self.helper
            .delete(&RecordKey::from(fts_id), Some(&self.table))
            .await
    }

    pub async fn delete_transfer_servers(
        &self,
        fts_ids: &[String],
    ) -> Result<Option<()>, ApiError> {
        let keys: Vec<RecordKey> = fts_ids.iter().cloned().map(RecordKey::from).collect();
        self.helper.delete_many(&keys, Some(&self.table)).await
    }

    pub fn clear(&self) {
        self.helper.clear();
    }

    pub fn items(&self) -> Vec<FileTransferServer> {
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

    pub fn get_by_id(&self, fts_id: &str) -> Option<FileTransferServer> {
        self.helper.find(|server| server.fts_id == fts_id)
    }

    pub fn search(&self, query: &str) -> Vec<FileTransferServer> {
        self.helper.filter(|s| {
            matches_query(
                query,
                &[&s.fts_id, &s.fts_name, &s.ip_addr, &s.fts_target_ip],
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::api::testing::{api, ScriptedTransport};

    #[tokio::test]
    async fn create_appends_backend_row() {
        let transport = ScriptedTransport::new();
        transport.respond_json(
            200,
            json!({ "fts_id": "FTS01", "fts_name": "archive", "ip_addr": "10.0.0.5" }),
        );
        let store = FileTransferServerStore::new(api(transport.clone()));

        let server = FileTransferServer {
            fts_id: "FTS01".to_string(),
            fts_name: "archive".to_string(),
            ip_addr: "10.0.0.5".to_string(),
            ..FileTransferServer::default()
        };
        let created = store.create_transfer_server(&server).await.unwrap().unwrap();

        assert_eq!(created.fts_target_ip, "");
        assert_eq!(store.search("10.0.0").len(), 1);
        let sent = transport.requests();
        assert!(sent[0].url.ends_with("/rest-access-page/MGMT_FTS"));
        assert_eq!(sent[0].method, crate::http::HttpMethod::Post);
    }
}
