//! Transcoding channels, served by the legacy `/video-conversion-info`
//! collection and keyed by `ch_id`.
//!
//! After a fetch the channels' headquarters, branch and route codes are
//! resolved to display names through the common-code store. That step is
//! best effort: when the codes are still loading past the wait bound, or
//! are unavailable, the names stay empty and the store error is untouched.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::common_code::CommonCodeStore;
use super::{expect_object, matches_query, opt_number, opt_text, text};
use crate::api::Api;
use crate::error::ApiError;
use crate::store::{to_fields, ApiStoreHelper, Entity, StoreState, DEFAULT_CACHE_TTL};
use crate::types::RecordKey;

pub const ENDPOINT: &str = "/video-conversion-info";
pub const KEY_FIELD: &str = "ch_id";

/// Common-code groups the channel codes belong to.
pub const HQ_GROUP: &str = "HQ";
pub const BRANCH_GROUP: &str = "BRANCH";
pub const ROUTE_GROUP: &str = "ROUTE";

/// How long enrichment waits for an in-flight common-code load.
pub const ENRICHMENT_WAIT: Duration = Duration::from_secs(5);

const DISPLAY_FIELDS: [&str; 3] = ["hq_name", "branch_name", "route_name"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConversion {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub ch_id: String,
    pub hq_code: Option<String>,
    pub branch_code: Option<String>,
    pub route_code: Option<String>,
    pub area: Option<String>,
    pub server_id: Option<String>,
    pub trans_name: Option<String>,
    pub media_server_id: Option<String>,
    pub live_yn: Option<String>,
    pub status: Option<String>,
    pub jpg_yn: Option<String>,
    pub wmv_yn: Option<String>,
    pub send_yn: Option<String>,
    pub save_yn: Option<String>,
    pub format: Option<String>,
    pub size: Option<String>,
    pub fps: Option<String>,
    pub kbps: Option<String>,
    pub wmv_conv_yn: Option<String>,
    pub wmv_size: Option<String>,
    pub wmv_fps: Option<String>,
    pub wmv_kbps: Option<String>,
    pub jpg_res: Option<String>,
    pub max_save: Option<String>,
    pub jpg_kbps: Option<String>,
    pub date_display_yn: Option<String>,
    pub sms_yn: Option<String>,
    pub sms_server: Option<String>,
    pub last_check: Option<String>,
    pub reg_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hq_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_name: Option<String>,
}

impl Entity for VideoConversion {
    /// Columns arrive as whatever the backend stored; numbers are kept as
    /// their text form.
    fn from_api(data: Value) -> Result<Self, serde_json::Error> {
        expect_object(&data)?;
        Ok(Self {
            id: opt_number(&data, "id"),
            ch_id: text(&data, KEY_FIELD),
            hq_code: opt_text(&data, "hq_code"),
            branch_code: opt_text(&data, "branch_code"),
            route_code: opt_text(&data, "route_code"),
            area: opt_text(&data, "area"),
            server_id: opt_text(&data, "server_id"),
            trans_name: opt_text(&data, "trans_name"),
            media_server_id: opt_text(&data, "media_server_id"),
            live_yn: opt_text(&data, "live_yn"),
            status: opt_text(&data, "status"),
            jpg_yn: opt_text(&data, "jpg_yn"),
            wmv_yn: opt_text(&data, "wmv_yn"),
            send_yn: opt_text(&data, "send_yn"),
            save_yn: opt_text(&data, "save_yn"),
            format: opt_text(&data, "format"),
            size: opt_text(&data, "size"),
            fps: opt_text(&data, "fps"),
            kbps: opt_text(&data, "kbps"),
            wmv_conv_yn: opt_text(&data, "wmv_conv_yn"),
            wmv_size: opt_text(&data, "wmv_size"),
            wmv_fps: opt_text(&data, "wmv_fps"),
            wmv_kbps: opt_text(&data, "wmv_kbps"),
            jpg_res: opt_text(&data, "jpg_res"),
            max_save: opt_text(&data, "max_save"),
            jpg_kbps: opt_text(&data, "jpg_kbps"),
            date_display_yn: opt_text(&data, "date_display_yn"),
            sms_yn: opt_text(&data, "sms_yn"),
            sms_server: opt_text(&data, "sms_server"),
            last_check: opt_text(&data, "last_check"),
            reg_date: opt_text(&data, "reg_date"),
            created_at: opt_text(&data, "created_at"),
            updated_at: opt_text(&data, "updated_at"),
            hq_name: opt_text(&data, "hq_name"),
            branch_name: opt_text(&data, "branch_name"),
            route_name: opt_text(&data, "route_name"),
        })
    }

    /// Display names are client-side only.
    fn to_api(mut fields: Map<String, Value>) -> Map<String, Value> {
        for field in DISPLAY_FIELDS {
            fields.remove(field);
        }
        fields
    }
}

pub struct VideoConversionStore {
    helper: ApiStoreHelper<VideoConversion>,
    codes: Arc<CommonCodeStore>,
}

impl VideoConversionStore {
    pub fn new(api: Arc<Api>, codes: Arc<CommonCodeStore>) -> Self {
        Self {
            helper: ApiStoreHelper::new(ENDPOINT, StoreState::new(), api).with_key_field(KEY_FIELD),
            codes,
        }
    }

    pub fn state(&self) -> &Arc<StoreState<VideoConversion>> {
        self.helper.state()
    }

    pub async fn fetch_video_conversions(&self, force_refresh: bool) {
        self.helper
            .fetch_all(force_refresh, DEFAULT_CACHE_TTL, "video conversion channels", None)
            .await;
        self.enrich(ENRICHMENT_WAIT).await;
    }

    /// Resolve code columns to display names. Returns whether names were
    /// applied.
    pub async fn enrich(&self, wait: Duration) -> bool {
        if self.helper.total_count() == 0 {
            return false;
        }
        if !self.codes.wait_until_idle(wait).await {
            warn!("common codes still loading, skipping channel enrichment");
            return false;
        }
        if self.codes.total_count() == 0 {
            self.codes.fetch_common_codes(false).await;
        }

        let names: HashMap<(String, String), String> = self
            .codes
            .items()
            .into_iter()
            .map(|code| ((code.grp_code, code.code), code.code_name))
            .collect();
        if names.is_empty() {
            debug!("no common codes available, skipping channel enrichment");
            return false;
        }

        let lookup = |group: &str, code: &Option<String>| {
            code.as_ref()
                .and_then(|code| names.get(&(group.to_string(), code.clone())))
                .cloned()
        };
        self.helper.state().update_each(|channel| {
            channel.hq_name = lookup(HQ_GROUP, &channel.hq_code);
            channel.branch_name = lookup(BRANCH_GROUP, &channel.branch_code);
            channel.route_name = lookup(ROUTE_GROUP, &channel.route_code);
        });
        true
    }

    pub async fn create_video_conversion(
        &self,
        channel: &VideoConversion,
    ) -> Result<Option<VideoConversion>, ApiError> {
        self.helper.create(to_fields(channel)?, None).await
    }

    pub async fn update_video_conversion(
        &self,
        ch_id: &str,
        patch: Map<String, Value>,
    ) -> Result<Option<VideoConversion>, ApiError> {
        self.helper
            .update(&RecordKey::from(ch_id), patch, None)
            .await
    }

    /// Apply the same patch to several channels.
    pub async fn batch_update(
        &self,
        ch_ids: &[String],
        patch: Map<String, Value>,
    ) -> Result<Option<Vec<VideoConversion>>, ApiError> {
        let keys: Vec<RecordKey> = ch_ids.iter().cloned().map(RecordKey::from).collect();
        self.helper.update_many(&keys, patch, None).await
    }

    pub async fn delete_video_conversion(&self, ch_id: &str) -> Result<Option<()>, ApiError> {
        self.helper.delete(&RecordKey::from(ch_id), None).await
    }

    pub async fn delete_video_conversions(
        &self,
        ch_ids: &[String],
    ) -> Result<Option<()>, ApiError> {
        let keys: Vec<RecordKey> = ch_ids.iter().cloned().map(RecordKey::from).collect();
        self.helper.delete_many(&keys, None).await
    }

    pub fn clear(&self) {
        self.helper.clear();
    }

    pub fn items(&self) -> Vec<VideoConversion> {
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

    pub fn get_by_id(&self, ch_id: &str) -> Option<VideoConversion> {
        self.helper.find(|channel| channel.ch_id == ch_id)
    }

    pub fn search(&self, query: &str) -> Vec<VideoConversion> {
        self.helper.filter(|c| {
            let mut fields = vec![c.ch_id.as_str()];
            fields.extend(
                [&c.hq_code, &c.branch_code, &c.route_code, &c.area]
                    .into_iter()
                    .flatten()
                    .map(String::as_str),
            );
            matches_query(query, &fields)
        })
    }
}
