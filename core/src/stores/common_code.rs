//! Common reference codes (`MGMT_CODE`), keyed by
//! `(grp_gbn, grp_code, code)`.
//!
//! Other stores resolve code values to display names through `code_name`.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{expect_object, matches_query, number, opt_number, opt_text, text};
use crate::api::Api;
use crate::error::ApiError;
use crate::store::{to_fields, ApiStoreHelper, Entity, StoreState, DEFAULT_CACHE_TTL};
use crate::types::{KeySpec, RecordKey, Table};

pub const ENDPOINT: &str = "/common-code";
pub const TABLE: &str = "MGMT_CODE";
pub const TABLE_KEY: [&str; 3] = ["GRP_GBN", "GRP_CODE", "CODE"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommonCode {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_id: Option<String>,
    pub grp_gbn: String,
    pub grp_code: String,
    pub code: String,
    pub code_name: String,
    pub short_code_name: String,
    pub remarks: Option<String>,
    pub ord: i64,
    pub use_yn: String,
    pub reg_timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Entity for CommonCode {
    /// Any column may be null; nulls read as empty text or zero.
    fn from_api(data: Value) -> Result<Self, serde_json::Error> {
        expect_object(&data)?;
        Ok(Self {
            id: opt_number(&data, "id"),
            code_id: opt_text(&data, "code_id"),
            grp_gbn: text(&data, "grp_gbn"),
            grp_code: text(&data, "grp_code"),
            code: text(&data, "code"),
            code_name: text(&data, "code_name"),
            short_code_name: text(&data, "short_code_name"),
            remarks: opt_text(&data, "remarks"),
            ord: number(&data, "ord"),
            use_yn: text(&data, "use_yn"),
            reg_timestamp: opt_text(&data, "reg_timestamp"),
            created_at: opt_text(&data, "created_at"),
            updated_at: opt_text(&data, "updated_at"),
        })
    }
}

/// `"<grp_gbn>_<grp_code>_<code>"`, the key string used by list selections.
pub fn composite_key(item: &CommonCode) -> String {
    format!("{}_{}_{}", item.grp_gbn, item.grp_code, item.code)
}

/// Inverse of `composite_key`. The code part may itself contain `_`.
pub fn parse_composite_key(key: &str) -> Option<RecordKey> {
    let mut parts = key.splitn(3, '_');
    let grp_gbn = parts.next().filter(|p| !p.is_empty())?;
    let grp_code = parts.next().filter(|p| !p.is_empty())?;
    let code = parts.next().filter(|p| !p.is_empty())?;
    Some(record_key(grp_gbn, grp_code, code))
}

fn record_key(grp_gbn: &str, grp_code: &str, code: &str) -> RecordKey {
    RecordKey::composite(&[
        (TABLE_KEY[0], grp_gbn),
        (TABLE_KEY[1], grp_code),
        (TABLE_KEY[2], code),
    ])
}

pub struct CommonCodeStore {
    helper: ApiStoreHelper<CommonCode>,
    table: Table,
}

impl CommonCodeStore {
    pub fn new(api: Arc<Api>) -> Self {
        Self {
            helper: ApiStoreHelper::new(ENDPOINT, StoreState::new(), api),
            table: Table::new(TABLE, KeySpec::composite(&TABLE_KEY)),
        }
    }

    pub fn state(&self) -> &Arc<StoreState<CommonCode>> {
        self.helper.state()
    }

    pub async fn fetch_common_codes(&self, force_refresh: bool) {
        self.helper
            .fetch_all(force_refresh, DEFAULT_CACHE_TTL, "common codes", Some(TABLE))
            .await;
    }

    pub async fn create_common_code(
        &self,
        code: &CommonCode,
    ) -> Result<Option<CommonCode>, ApiError> {
        self.helper
            .create(to_fields(code)?, Some(&self.table))
            .await
    }

    pub async fn update_common_code(
        &self,
        grp_gbn: &str,
        grp_code: &str,
        code: &str,
        patch: Map<String, Value>,
    ) -> Result<Option<CommonCode>, ApiError> {
        self.helper
            .update(&record_key(grp_gbn, grp_code, code), patch, Some(&self.table))
            .await
    }

    pub async fn delete_common_code(
        &self,
        grp_gbn: &str,
        grp_code: &str,
        code: &str,
    ) -> Result<Option<()>, ApiError> {
        self.helper
            .delete(&record_key(grp_gbn, grp_code, code), Some(&self.table))
            .await
    }

    /// Delete by `composite_key` strings. A malformed key fails the whole
    /// call before anything is sent.
    pub async fn delete_common_codes(&self, keys: &[String]) -> Result<Option<()>, ApiError> {
        let record_keys = keys
            .iter()
            .map(|key| parse_composite_key(key).ok_or_else(|| ApiError::InvalidKey(key.clone())))
            .collect::<Result<Vec<_>, _>>()?;
        self.helper.delete_many(&record_keys, Some(&self.table)).await
    }

    pub fn clear(&self) {
        self.helper.clear();
    }

    pub fn items(&self) -> Vec<CommonCode> {
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

    /// Wait for an in-flight load to finish. `false` on timeout.
    pub async fn wait_until_idle(&self, timeout: Duration) -> bool {
        self.helper.state().wait_until_idle(timeout).await
    }

    pub fn get_by_id(&self, key: &str) -> Option<CommonCode> {
        self.helper.find(|item| composite_key(item) == key)
    }

    pub fn get_by_key(&self, grp_code: &str, code: &str) -> Option<CommonCode> {
        self.helper
            .find(|item| item.grp_code == grp_code && item.code == code)
    }

    pub fn get_by_code_group(&self, grp_code: &str) -> Vec<CommonCode> {
        self.helper.filter(|item| item.grp_code == grp_code)
    }

    /// Display name of `code` within group `grp_code`.
    pub fn code_name(&self, grp_code: &str, code: &str) -> Option<String> {
        self.get_by_key(grp_code, code).map(|item| item.code_name)
    }

    pub fn search(&self, query: &str) -> Vec<CommonCode> {
        self.helper.filter(|c| {
            matches_query(
                query,
                &[
                    &c.grp_gbn,
                    &c.grp_code,
                    &c.code,
                    &c.code_name,
                    &c.short_code_name,
                ],
            )
        })
    }
}
