//! Promotional video entries (`MGMT_MEDIA_INFO`).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{expect_object, matches_query, opt_text, text, text_or};
use crate::api::Api;
use crate::error::ApiError;
use crate::store::{to_fields, ApiStoreHelper, Entity, StoreState, DEFAULT_CACHE_TTL};
use crate::types::{KeySpec, RecordKey, Table};

pub const ENDPOINT: &str = "/media-info";
pub const TABLE: &str = "MGMT_MEDIA_INFO";
pub const TABLE_KEY: &str = "SEQ";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub seq: String,
    pub gbn: String,
    pub camid: String,
    pub title: String,
    pub rtmp: String,
    pub live: String,
    pub stream: String,
    pub stream1: String,
    pub kt_cctv: String,
    pub state: String,
    pub reg_date: Option<String>,
}

impl Entity for Media {
    fn from_api(data: Value) -> Result<Self, serde_json::Error> {
        expect_object(&data)?;
        Ok(Self {
            seq: text(&data, "seq"),
            gbn: text(&data, "gbn"),
            camid: text(&data, "camid"),
            title: text(&data, "title"),
            rtmp: text(&data, "rtmp"),
            live: text(&data, "live"),
            stream: text(&data, "stream"),
            stream1: text(&data, "stream1"),
            kt_cctv: text(&data, "kt_cctv"),
            state: text_or(&data, "state", "N"),
            reg_date: opt_text(&data, "reg_date"),
        })
    }
}

pub struct MediaStore {
    helper: ApiStoreHelper<Media>,
    table: Table,
}

impl MediaStore {
    pub fn new(api: Arc<Api>) -> Self {
        Self {
            helper: ApiStoreHelper::new(ENDPOINT, StoreState::new(), api),
            table: Table::new(TABLE, KeySpec::single(TABLE_KEY)),
        }
    }

    pub fn state(&self) -> &Arc<StoreState<Media>> {
        self.helper.state()
    }

    pub async fn fetch_media_list(&self, force_refresh: bool) {
        self.helper
            .fetch_all(force_refresh, DEFAULT_CACHE_TTL, "media", Some(TABLE))
            .await;
    }

    pub async fn create_media(&self, media: &Media) -> Result<Option<Media>, ApiError> {
        self.helper
            .create(to_fields(media)?, Some(&self.table))
            .await
    }

    pub async fn update_media(
        &self,
        seq: &str,
        patch: Map<String, Value>,
    ) -> Result<Option<Media>, ApiError> {
        self.helper
            .update(&RecordKey::from(seq), patch, Some(&self.table))
            .await
    }

    pub async fn delete_media(&self, seq: &str) -> Result<Option<()>, ApiError> {
        self.helper
            .delete(&RecordKey::from(seq), Some(&self.table))
            .await
    }

    pub async fn delete_media_list(&self, seqs: &[String]) -> Result<Option<()>, ApiError> {
        let keys: Vec<RecordKey> = seqs.iter().cloned().map(RecordKey::from).collect();
        self.helper.delete_many(&keys, Some(&self.table)).await
    }

    pub fn clear(&self) {
        self.helper.clear();
    }

    pub fn items(&self) -> Vec<Media> {
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

    pub fn get_by_id(&self, seq: &str) -> Option<Media> {
        self.helper.find(|media| media.seq == seq)
    }

    pub fn search(&self, query: &str) -> Vec<Media> {
        self.helper
            .filter(|m| matches_query(query, &[&m.seq, &m.camid, &m.title]))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::api::testing::{api, ScriptedTransport};

    #[tokio::test]
    async fn numeric_seq_matches_string_key() {
        let transport = ScriptedTransport::new();
        transport.respond_json(200, json!([{ "seq": 3, "camid": 101, "title": "Spring" }]));
        transport.respond_json(200, json!({ "seq": 3, "camid": 101, "title": "Summer" }));
        let store = MediaStore::new(api(transport));
        store.fetch_media_list(true).await;

        let media = store.get_by_id("3").unwrap();
        assert_eq!(media.camid, "101");
        assert_eq!(media.state, "N");

        let mut patch = Map::new();
        patch.insert("title".to_string(), json!("Summer"));
        store.update_media("3", patch).await.unwrap();
        assert_eq!(store.get_by_id("3").unwrap().title, "Summer");
    }
}
