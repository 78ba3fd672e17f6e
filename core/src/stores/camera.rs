//! Cameras (`MGMT_CCTV`).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{expect_object, matches_query, opt_text, text, text_or};
use crate::api::Api;
use crate::error::ApiError;
use crate::store::{to_fields, ApiStoreHelper, Entity, StoreState, DEFAULT_CACHE_TTL};
use crate::types::{KeySpec, RecordKey, Table};

pub const ENDPOINT: &str = "/camera-info";
pub const TABLE: &str = "MGMT_CCTV";
pub const TABLE_KEY: &str = "CCTV_ID";

/// One camera. Numeric backend columns are carried as text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub cctv_id: String,
    pub camera_no: String,
    pub hq_code: String,
    pub branch_code: String,
    pub route_code: String,
    pub location: String,
    pub camera_area: String,
    pub enc_url: String,
    pub trans_wms_port: String,
    pub link_id_s: String,
    pub link_id_e: String,
    pub vlink_id_s: String,
    pub vlink_id_e: String,
    pub road_id: String,
    pub road_name: String,
    pub milepost: String,
    pub bound: String,
    pub lat: String,
    pub lng: String,
    pub fileurl_wmv: String,
    pub fileurl_mp4: String,
    pub fileurl_img: String,
    pub stat: String,
    pub alive: String,
    pub alive_yn: String,
    pub update_date: Option<String>,
    pub last_cctv_time: Option<String>,
    pub hls_url: String,
    pub hls_alive: String,
    pub hls_duration: String,
    pub hls_emergency: Option<String>,
    pub ftp_sent_date: Option<String>,
    pub reg_date: Option<String>,
}

impl Entity for Camera {
    fn from_api(data: Value) -> Result<Self, serde_json::Error> {
        expect_object(&data)?;
        Ok(Self {
            cctv_id: text(&data, "cctv_id"),
            camera_no: text(&data, "camera_no"),
            hq_code: text(&data, "hq_code"),
            branch_code: text(&data, "branch_code"),
            route_code: text(&data, "route_code"),
            location: text(&data, "location"),
            camera_area: text(&data, "camera_area"),
            enc_url: text(&data, "enc_url"),
            trans_wms_port: text(&data, "trans_wms_port"),
            link_id_s: text(&data, "link_id_s"),
            link_id_e: text(&data, "link_id_e"),
            vlink_id_s: text(&data, "vlink_id_s"),
            vlink_id_e: text(&data, "vlink_id_e"),
            road_id: text(&data, "road_id"),
            road_name: text(&data, "road_name"),
            milepost: text(&data, "milepost"),
            bound: text(&data, "bound"),
            lat: text(&data, "lat"),
            lng: text(&data, "lng"),
            fileurl_wmv: text(&data, "fileurl_wmv"),
            fileurl_mp4: text(&data, "fileurl_mp4"),
            fileurl_img: text(&data, "fileurl_img"),
            stat: text_or(&data, "stat", "N"),
            alive: text_or(&data, "alive", "N"),
            alive_yn: text_or(&data, "alive_yn", "N"),
            update_date: opt_text(&data, "update_date"),
            last_cctv_time: opt_text(&data, "last_cctv_time"),
            hls_url: text(&data, "hls_url"),
            hls_alive: text_or(&data, "hls_alive", "N"),
            hls_duration: text_or(&data, "hls_duration", "0"),
            hls_emergency: opt_text(&data, "hls_emergency"),
            ftp_sent_date: opt_text(&data, "ftp_sent_date"),
            reg_date: opt_text(&data, "reg_date"),
        })
    }
}

pub struct CameraStore {
    helper: ApiStoreHelper<Camera>,
    table: Table,
}

impl CameraStore {
    pub fn new(api: Arc<Api>) -> Self {
        Self {
            helper: ApiStoreHelper::new(ENDPOINT, StoreState::new(), api),
            table: Table::new(TABLE, KeySpec::single(TABLE_KEY)),
        }
    }

    pub fn state(&self) -> &Arc<StoreState<Camera>> {
        self.helper.state()
    }

    pub async fn fetch_cameras(&self, force_refresh: bool) {
        self.helper
            .fetch_all(force_refresh, DEFAULT_CACHE_TTL, "cameras", Some(TABLE))
            .await;
    }

    pub async fn create_camera(&self, camera: &Camera) -> Result<Option<Camera>, ApiError> {
        self.helper
            .create(to_fields(camera)?, Some(&self.table))
            .await
    }

    pub async fn update_camera(
        &self,
        cctv_id: &str,
        patch: Map<String, Value>,
    ) -> Result<Option<Camera>, ApiError> {
        self.helper
            .update(&RecordKey::from(cctv_id), patch, Some(&self.table))
            .await
    }

    pub async fn delete_camera(&self, cctv_id: &str) -> Result<Option<()>, ApiError> {
        self.helper
            .delete(&RecordKey::from(cctv_id), Some(&self.table))
            .await
    }

    pub async fn delete_cameras(&self, cctv_ids: &[String]) -> Result<Option<()>, ApiError> {
        let keys: Vec<RecordKey> = cctv_ids.iter().cloned().map(RecordKey::from).collect();
        self.helper.delete_many(&keys, Some(&self.table)).await
    }

    pub fn clear(&self) {
        self.helper.clear();
    }

    pub fn items(&self) -> Vec<Camera> {
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

    pub fn get_by_id(&self, cctv_id: &str) -> Option<Camera> {
        self.helper.find(|camera| camera.cctv_id == cctv_id)
    }

    pub fn search(&self, query: &str) -> Vec<Camera> {
        self.helper.filter(|c| {
            matches_query(
                query,
                &[
                    &c.cctv_id,
                    &c.camera_no,
                    &c.hq_code,
                    &c.branch_code,
                    &c.route_code,
                    &c.location,
                    &c.road_name,
                ],
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::api::testing::{api, ScriptedTransport};

    #[test]
    fn from_api_coerces_and_defaults() {
        let camera = Camera::from_api(json!({
            "cctv_id": "CCTV00000001",
            "camera_no": 17,
            "lat": 37.5665,
            "road_name": "Gyeongbu",
            "stat": null,
        }))
        .unwrap();
        assert_eq!(camera.camera_no, "17");
        assert_eq!(camera.lat, "37.5665");
        assert_eq!(camera.stat, "N");
        assert_eq!(camera.alive_yn, "N");
        assert_eq!(camera.hls_duration, "0");
        assert_eq!(camera.location, "");
        assert!(camera.reg_date.is_none());
    }

    #[tokio::test]
    async fn fetch_and_search() {
        let transport = ScriptedTransport::new();
        transport.respond_json(
            200,
            json!([
                { "cctv_id": "C1", "road_name": "Gyeongbu", "location": "Seoul" },
                { "cctv_id": "C2", "road_name": "Honam", "location": "Gwangju" },
            ]),
        );
        let store = CameraStore::new(api(transport.clone()));

        store.fetch_cameras(false).await;
        store.fetch_cameras(false).await;

        assert_eq!(transport.request_count(), 1);
        assert_eq!(store.total_count(), 2);
        assert_eq!(store.get_by_id("C2").unwrap().road_name, "Honam");
        assert_eq!(store.search("SEOUL").len(), 1);
        assert_eq!(store.search("c").len(), 2);
    }

    #[tokio::test]
    async fn delete_uses_table_key() {
        let transport = ScriptedTransport::new();
        transport.respond_json(200, json!([{ "cctv_id": "C1" }, { "cctv_id": "C2" }]));
        transport.respond(200, "");
        let store = CameraStore::new(api(transport.clone()));
        store.fetch_cameras(true).await;

        store.delete_camera("C1").await.unwrap();

        assert_eq!(store.total_count(), 1);
        let sent = transport.requests();
        assert!(sent[1].url.ends_with("/rest-access-page/MGMT_CCTV"));
        assert_eq!(sent[1].query, vec![("key".to_string(), "C1".to_string())]);
    }
}
