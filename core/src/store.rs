//! Generic TTL-cached CRUD synchronization between one backend collection
//! and one client-side array.
//!
//! # Design
//! Every domain store owns an `Arc<StoreState<T>>` and hands a clone to its
//! `ApiStoreHelper`, which mutates it only through the `StoreState` methods.
//! The mutex is never held across an `.await`: each method locks, mutates and
//! releases.
//!
//! Mutations are guarded by the `is_loading` flag. The check-and-set happens
//! under the lock, so two concurrent `create` calls cannot both start; the
//! loser gets `Ok(None)` without touching the network. `fetch_all` does not
//! take the guard and may overwrite a concurrent mutation's array update.
//!
//! `is_loading` is also published on a `watch` channel so another store can
//! await the end of an in-flight load (`wait_until_idle`).
//!
//! Two backend flavours are selected per call. `None` uses the legacy
//! paginated collection at `endpoint`; `Some(table)` uses the bulk query and
//! the composite-key REST endpoint.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::api::Api;
use crate::error::{parse_backend_error, ApiError, CONNECTIVITY_MESSAGE};
use crate::http::HttpMethod;
use crate::types::{DbArrayQuery, PaginatedResponse};

pub use crate::types::{KeySpec, RecordKey, Table};

/// Page size of the request that only learns `total`.
pub const PROBE_PAGE_SIZE: u64 = 100;
/// Page size used to pull the whole legacy collection.
pub const PAGE_SIZE: u64 = 1000;
/// Cache lifetime used by every domain store.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
/// Key field of legacy collections unless the store overrides it.
pub const DEFAULT_KEY_FIELD: &str = "id";

/// A record type synchronized by a store.
///
/// The defaults are passthrough: serde decides the shape on both sides.
/// Entities whose backend field names differ override `from_api`/`to_api`.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn from_api(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Maps frontend field names to backend field names. Works on a field map
    /// so partial updates can be transformed too.
    fn to_api(fields: Map<String, Value>) -> Map<String, Value> {
        fields
    }

    /// Value of `field` on this record, matched case-insensitively against the
    /// serialized field names. Numbers and booleans are rendered as text.
    fn key_value(&self, field: &str) -> Option<String> {
        let value = serde_json::to_value(self).ok()?;
        field_text(&value, field)
    }
}

impl Entity for Value {}

/// Text of `field` in a JSON object, looked up case-insensitively.
pub fn field_text(value: &Value, field: &str) -> Option<String> {
    let object = value.as_object()?;
    let found = object
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(field))
        .map(|(_, value)| value)?;
    match found {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Serialize a record into the field map `create`/`update` take.
pub fn to_fields<T: Serialize>(record: &T) -> Result<Map<String, Value>, ApiError> {
    match serde_json::to_value(record).map_err(|e| ApiError::Serialization(e.to_string()))? {
        Value::Object(fields) => Ok(fields),
        other => Err(ApiError::Serialization(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

/// Whether `record` is identified by `id` under `key`.
pub fn matches_key<T: Entity>(record: &T, id: &RecordKey, key: &KeySpec) -> bool {
    match id {
        RecordKey::Single(value) => key
            .fields()
            .first()
            .and_then(|field| record.key_value(field))
            .is_some_and(|found| &found == value),
        RecordKey::Composite(pairs) => pairs
            .iter()
            .all(|(field, value)| record.key_value(field).as_deref() == Some(value.as_str())),
    }
}

#[derive(Debug, Clone)]
pub struct CollectionState<T> {
    pub items: Vec<T>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub last_fetched: Option<Instant>,
}

impl<T> Default for CollectionState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            is_loading: false,
            error: None,
            last_fetched: None,
        }
    }
}

/// Store-owned collection state plus the `is_loading` broadcast.
#[derive(Debug)]
pub struct StoreState<T> {
    inner: Mutex<CollectionState<T>>,
    loading: watch::Sender<bool>,
}

impl<T> Default for StoreState<T> {
    fn default() -> Self {
        let (loading, _) = watch::channel(false);
        Self {
            inner: Mutex::new(CollectionState::default()),
            loading,
        }
    }
}

impl<T: Clone> StoreState<T> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn snapshot(&self) -> CollectionState<T> {
        self.inner.lock().clone()
    }

    pub fn items(&self) -> Vec<T> {
        self.inner.lock().items.clone()
    }

    pub fn total_count(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn find(&self, predicate: impl Fn(&T) -> bool) -> Option<T> {
        self.inner.lock().items.iter().find(|item| predicate(item)).cloned()
    }

    pub fn filter(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.inner
            .lock()
            .items
            .iter()
            .filter(|item| predicate(item))
            .cloned()
            .collect()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.lock().is_loading
    }

    pub fn error(&self) -> Option<String> {
        self.inner.lock().error.clone()
    }

    pub fn last_fetched(&self) -> Option<Instant> {
        self.inner.lock().last_fetched
    }

    pub fn set_error(&self, message: impl Into<String>) {
        self.inner.lock().error = Some(message.into());
    }

    /// Reset items, error and last_fetched.
    pub fn clear(&self) {
        let mut state = self.inner.lock();
        state.items.clear();
        state.error = None;
        state.last_fetched = None;
    }

    /// Replace the whole array, as after a successful fetch.
    pub fn replace_items(&self, items: Vec<T>) {
        let mut state = self.inner.lock();
        state.items = items;
        state.last_fetched = Some(Instant::now());
        state.error = None;
    }

    pub fn push(&self, item: T) {
        let mut state = self.inner.lock();
        state.items.push(item);
        state.last_fetched = Some(Instant::now());
    }

    /// Replace the first element matching `predicate`. Returns whether one
    /// matched; the array is left as is otherwise.
    pub fn replace_where(&self, predicate: impl Fn(&T) -> bool, item: T) -> bool {
        let mut state = self.inner.lock();
        state.last_fetched = Some(Instant::now());
        match state.items.iter_mut().find(|existing| predicate(existing)) {
            Some(slot) => {
                *slot = item;
                true
            }
            None => false,
        }
    }

    /// Decorate every cached element in place. `last_fetched` is untouched.
    pub fn update_each(&self, mut apply: impl FnMut(&mut T)) {
        self.inner.lock().items.iter_mut().for_each(|item| apply(item));
    }

    pub fn retain(&self, keep: impl Fn(&T) -> bool) {
        let mut state = self.inner.lock();
        state.items.retain(|item| keep(item));
        state.last_fetched = Some(Instant::now());
    }

    /// Whether the last successful fetch is younger than `ttl`.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.inner
            .lock()
            .last_fetched
            .is_some_and(|at| at.elapsed() < ttl)
    }

    /// Mark a load as started, unconditionally. Clears the error.
    pub fn begin_load(&self) -> LoadingGuard<'_, T> {
        {
            let mut state = self.inner.lock();
            state.is_loading = true;
            state.error = None;
        }
        self.loading.send_replace(true);
        LoadingGuard { state: self }
    }

    /// Start a mutation unless one is already in flight.
    pub fn try_begin(&self) -> Option<LoadingGuard<'_, T>> {
        {
            let mut state = self.inner.lock();
            if state.is_loading {
                return None;
            }
            state.is_loading = true;
            state.error = None;
        }
        self.loading.send_replace(true);
        Some(LoadingGuard { state: self })
    }

    /// Wait until no operation is in flight. Returns `false` on timeout.
    pub async fn wait_until_idle(&self, timeout: Duration) -> bool {
        let mut rx = self.loading.subscribe();
        let idle = async {
            loop {
                if !*rx.borrow_and_update() {
                    return true;
                }
                if rx.changed().await.is_err() {
                    return false;
                }
            }
        };
        tokio::time::timeout(timeout, idle).await.unwrap_or(false)
    }

    fn finish(&self) {
        self.inner.lock().is_loading = false;
        self.loading.send_replace(false);
    }
}

/// Clears `is_loading` when dropped, on every exit path.
pub struct LoadingGuard<'a, T: Clone> {
    state: &'a StoreState<T>,
}

impl<T: Clone> Drop for LoadingGuard<'_, T> {
    fn drop(&mut self) {
        self.state.finish();
    }
}

pub struct ApiStoreHelper<T: Entity> {
    endpoint: String,
    state: Arc<StoreState<T>>,
    api: Arc<Api>,
    key_field: String,
}

impl<T: Entity> ApiStoreHelper<T> {
    pub fn new(endpoint: &str, state: Arc<StoreState<T>>, api: Arc<Api>) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            state,
            api,
            key_field: DEFAULT_KEY_FIELD.to_string(),
        }
    }

    /// Key field of the legacy collection, when it is not `id`.
    pub fn with_key_field(mut self, field: &str) -> Self {
        self.key_field = field.to_string();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn state(&self) -> &Arc<StoreState<T>> {
        &self.state
    }

    pub fn api(&self) -> &Arc<Api> {
        &self.api
    }

    /// Key fields for a call: the table's when given, else the helper's.
    pub fn key_spec(&self, table: Option<&Table>) -> KeySpec {
        match table {
            Some(table) => table.key.clone(),
            None => KeySpec::Single(self.key_field.clone()),
        }
    }

    // --- accessors ---

    pub fn items(&self) -> Vec<T> {
        self.state.items()
    }

    pub fn total_count(&self) -> usize {
        self.state.total_count()
    }

    pub fn find(&self, predicate: impl Fn(&T) -> bool) -> Option<T> {
        self.state.find(predicate)
    }

    pub fn filter(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.state.filter(predicate)
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.state.error()
    }

    pub fn last_fetched(&self) -> Option<Instant> {
        self.state.last_fetched()
    }

    pub fn clear(&self) {
        self.state.clear();
    }

    // --- fetch ---

    /// Load the whole collection unless the cache is younger than
    /// `cache_ttl`. Failures land in the state's `error`; items loaded
    /// earlier stay available.
    pub async fn fetch_all(
        &self,
        force_refresh: bool,
        cache_ttl: Duration,
        label: &str,
        table: Option<&str>,
    ) {
        if !force_refresh && self.state.is_fresh(cache_ttl) {
            debug!(label, "using cached data");
            return;
        }

        let _guard = self.state.begin_load();
        let loaded = match table {
            Some(table) => self.load_table(table).await,
            None => self.load_pages().await,
        };
        let items = loaded.and_then(|raw| {
            raw.into_iter()
                .map(T::from_api)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ApiError::Deserialization(e.to_string()))
        });

        match items {
            Ok(items) => {
                info!(label, count = items.len(), "loaded");
                if let Some(first) = items.first().and_then(|item| to_fields(item).ok()) {
                    debug!(label, fields = ?first.keys().collect::<Vec<_>>(), "first item");
                }
                self.state.replace_items(items);
            }
            Err(err) => {
                let message = if err.is_network() {
                    CONNECTIVITY_MESSAGE.to_string()
                } else {
                    parse_backend_error(&err)
                };
                warn!(label, error = %message, "fetch failed");
                self.state.set_error(message);
            }
        }
    }

    async fn load_table(&self, table: &str) -> Result<Vec<Value>, ApiError> {
        self.api
            .fastapi()
            .get_db_array(table, &DbArrayQuery::all())
            .await
    }

    async fn load_pages(&self) -> Result<Vec<Value>, ApiError> {
        let probe = self.fetch_page(1, PROBE_PAGE_SIZE).await?;
        let total_pages = probe.total.div_ceil(PAGE_SIZE);
        debug!(endpoint = %self.endpoint, total = probe.total, total_pages, "paging");

        let mut all = Vec::new();
        for page in 1..=total_pages {
            let page = self.fetch_page(page, PAGE_SIZE).await?;
            all.extend(page.items);
        }
        Ok(all)
    }

    async fn fetch_page(
        &self,
        page: u64,
        page_size: u64,
    ) -> Result<PaginatedResponse<Value>, ApiError> {
        let client = self.api.client();
        let request = client.build_list_page(&self.endpoint, page, page_size)?;
        let response = self.api.send(request).await?;
        client.parse_page(response)
    }

    // --- mutations ---

    pub async fn create(
        &self,
        fields: Map<String, Value>,
        table: Option<&Table>,
    ) -> Result<Option<T>, ApiError> {
        let Some(_guard) = self.state.try_begin() else {
            warn!(endpoint = %self.endpoint, "operation in progress, create skipped");
            return Ok(None);
        };

        match self.send_create(fields, table).await {
            Ok(created) => {
                self.state.push(created.clone());
                Ok(Some(created))
            }
            Err(err) => Err(self.record_error(err)),
        }
    }

    async fn send_create(
        &self,
        fields: Map<String, Value>,
        table: Option<&Table>,
    ) -> Result<T, ApiError> {
        let body = Value::Object(T::to_api(fields));
        let response = match table {
            Some(table) => {
                self.api
                    .fastapi()
                    .rest_access(&table.name, HttpMethod::Post, Some(&body), None)
                    .await?
            }
            None => {
                let request = self.api.client().build_create(&self.endpoint, &body)?;
                self.api.call(request).await?
            }
        };
        T::from_api(response.data).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    /// Send `patch` for the record `id`. The cached element with that key is
    /// replaced by the backend's answer; when none matches the array is left
    /// unchanged.
    pub async fn update(
        &self,
        id: &RecordKey,
        patch: Map<String, Value>,
        table: Option<&Table>,
    ) -> Result<Option<T>, ApiError> {
        let Some(_guard) = self.state.try_begin() else {
            warn!(endpoint = %self.endpoint, key = %id, "operation in progress, update skipped");
            return Ok(None);
        };

        let key = self.key_spec(table);
        match self.send_update(id, &key, patch, table).await {
            Ok(updated) => {
                if !self
                    .state
                    .replace_where(|item| matches_key(item, id, &key), updated.clone())
                {
                    debug!(endpoint = %self.endpoint, key = %id, "updated record not cached");
                }
                Ok(Some(updated))
            }
            Err(err) => Err(self.record_error(err)),
        }
    }

    /// Apply one patch to several records concurrently. Every update must
    /// succeed before the cached array is touched; otherwise the error names
    /// the keys the backend accepted and the ones it rejected.
    pub async fn update_many(
        &self,
        ids: &[RecordKey],
        patch: Map<String, Value>,
        table: Option<&Table>,
    ) -> Result<Option<Vec<T>>, ApiError> {
        let Some(_guard) = self.state.try_begin() else {
            warn!(endpoint = %self.endpoint, count = ids.len(), "operation in progress, update skipped");
            return Ok(None);
        };

        let key = self.key_spec(table);
        let results = join_all(
            ids.iter()
                .map(|id| self.send_update(id, &key, patch.clone(), table)),
        )
        .await;

        let mut updated = Vec::with_capacity(results.len());
        let mut accepted = Vec::new();
        let mut failed = Vec::new();
        let mut first_error = None;
        for (id, result) in ids.iter().zip(results) {
            match result {
                Ok(record) => {
                    accepted.push(id.to_string());
                    updated.push(record);
                }
                Err(err) => {
                    failed.push(id.to_string());
                    first_error.get_or_insert(err);
                }
            }
        }

        if let Some(source) = first_error {
            warn!(endpoint = %self.endpoint, updated = ?accepted, ?failed, "batch update partially failed");
            return Err(self.record_error(ApiError::PartialUpdate {
                updated: accepted,
                failed,
                source: Box::new(source),
            }));
        }
        for (id, record) in ids.iter().zip(&updated) {
            self.state
                .replace_where(|item| matches_key(item, id, &key), record.clone());
        }
        Ok(Some(updated))
    }

    async fn send_update(
        &self,
        id: &RecordKey,
        key: &KeySpec,
        mut patch: Map<String, Value>,
        table: Option<&Table>,
    ) -> Result<T, ApiError> {
        let primary = key.fields().first().copied().unwrap_or(DEFAULT_KEY_FIELD);
        for (field, value) in id.pairs(primary) {
            patch.retain(|name, _| !name.eq_ignore_ascii_case(&field));
            patch.insert(field, Value::String(value));
        }
        let body = Value::Object(T::to_api(patch));

        let response = match table {
            Some(table) => {
                self.api
                    .fastapi()
                    .rest_access(&table.name, HttpMethod::Put, Some(&body), Some(id))
                    .await?
            }
            None => {
                let request = self.api.client().build_update(&self.endpoint, id, &body)?;
                self.api.call(request).await?
            }
        };
        T::from_api(response.data).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    pub async fn delete(
        &self,
        id: &RecordKey,
        table: Option<&Table>,
    ) -> Result<Option<()>, ApiError> {
        let Some(_guard) = self.state.try_begin() else {
            warn!(endpoint = %self.endpoint, key = %id, "operation in progress, delete skipped");
            return Ok(None);
        };

        match self.send_delete(id, table).await {
            Ok(()) => {
                let key = self.key_spec(table);
                self.state.retain(|item| !matches_key(item, id, &key));
                Ok(Some(()))
            }
            Err(err) => Err(self.record_error(err)),
        }
    }

    /// Delete several records concurrently and wait for all of them. The
    /// cached array changes only when every deletion succeeded; otherwise
    /// the error names the keys the backend accepted and the ones it
    /// rejected.
    pub async fn delete_many(
        &self,
        ids: &[RecordKey],
        table: Option<&Table>,
    ) -> Result<Option<()>, ApiError> {
        let Some(_guard) = self.state.try_begin() else {
            warn!(endpoint = %self.endpoint, count = ids.len(), "operation in progress, delete skipped");
            return Ok(None);
        };

        let results = join_all(ids.iter().map(|id| self.send_delete(id, table))).await;

        let mut deleted = Vec::new();
        let mut failed = Vec::new();
        let mut first_error = None;
        for (id, result) in ids.iter().zip(results) {
            match result {
                Ok(()) => deleted.push(id.to_string()),
                Err(err) => {
                    failed.push(id.to_string());
                    first_error.get_or_insert(err);
                }
            }
        }

        if let Some(source) = first_error {
            warn!(endpoint = %self.endpoint, ?deleted, ?failed, "batch delete partially failed");
            return Err(self.record_error(ApiError::PartialDelete {
                deleted,
                failed,
                source: Box::new(source),
            }));
        }

        let key = self.key_spec(table);
        self.state
            .retain(|item| !ids.iter().any(|id| matches_key(item, id, &key)));
        Ok(Some(()))
    }

    async fn send_delete(&self, id: &RecordKey, table: Option<&Table>) -> Result<(), ApiError> {
        match table {
            Some(table) => {
                self.api
                    .fastapi()
                    .rest_access(&table.name, HttpMethod::Delete, None, Some(id))
                    .await?;
            }
            None => {
                let request = self.api.client().build_delete(&self.endpoint, id)?;
                self.api.send(request).await?;
            }
        }
        Ok(())
    }

    fn record_error(&self, err: ApiError) -> ApiError {
        let message = match &err {
            ApiError::PartialDelete {
                deleted, failed, ..
            } => format!(
                "{} (deleted: {}; failed: {})",
                parse_backend_error(&err),
                deleted.join(", "),
                failed.join(", ")
            ),
            ApiError::PartialUpdate {
                updated, failed, ..
            } => format!(
                "{} (updated: {}; failed: {})",
                parse_backend_error(&err),
                updated.join(", "),
                failed.join(", ")
            ),
            _ => parse_backend_error(&err),
        };
        self.state.set_error(message);
        err
    }
}
