//! The console's service graph, built once and passed around explicitly.

use std::sync::Arc;

use tracing::info;

use crate::api::Api;
use crate::client::VmsClient;
use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::http::Transport;
use crate::session::Session;
use crate::stores::{
    AlertStore, AuthStore, CameraStore, CartStore, CommonCodeStore, FileTransferServerStore,
    KeyValueStorage, MediaServerStore, MediaStore, NavigationStore, PreferenceStore, UserStore,
    VersionStore, VideoConversionServerStore, VideoConversionStore,
};
use crate::transport::ReqwestTransport;

/// One `Api` shared by every store. The video conversion store receives the
/// common code store it enriches from.
pub struct Console {
    pub api: Arc<Api>,
    pub auth: AuthStore,
    pub cameras: CameraStore,
    pub media_servers: MediaServerStore,
    pub media: MediaStore,
    pub common_codes: Arc<CommonCodeStore>,
    pub versions: VersionStore,
    pub video_conversions: VideoConversionStore,
    pub video_conversion_servers: VideoConversionServerStore,
    pub file_transfer_servers: FileTransferServerStore,
    pub user: UserStore,
    pub cart: CartStore,
    pub alert: AlertStore,
    pub navigation: NavigationStore,
    pub preferences: PreferenceStore,
}

impl Console {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Console configured from `VMS_API_*` environment variables.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::new(ApiConfig::from_env())
    }

    pub fn with_transport(config: ApiConfig, transport: Arc<dyn Transport>) -> Self {
        info!(base_url = %config.base_url, "building console");
        let api = Arc::new(Api::new(
            VmsClient::from_config(&config),
            transport,
            Session::new(),
        ));
        let common_codes = Arc::new(CommonCodeStore::new(api.clone()));

        Self {
            auth: AuthStore::new(api.clone()),
            cameras: CameraStore::new(api.clone()),
            media_servers: MediaServerStore::new(api.clone()),
            media: MediaStore::new(api.clone()),
            versions: VersionStore::new(api.clone()),
            video_conversions: VideoConversionStore::new(api.clone(), common_codes.clone()),
            video_conversion_servers: VideoConversionServerStore::new(api.clone()),
            file_transfer_servers: FileTransferServerStore::new(api.clone()),
            common_codes,
            user: UserStore::new(),
            cart: CartStore::new(),
            alert: AlertStore::new(),
            navigation: NavigationStore::new(),
            preferences: PreferenceStore::in_memory(),
            api,
        }
    }

    /// Replace the in-memory preference storage, e.g. with a `FileStorage`.
    pub fn with_preference_storage(mut self, storage: Box<dyn KeyValueStorage>) -> Self {
        self.preferences = PreferenceStore::new(storage);
        self
    }

    /// Drop every cached collection. Used after logout.
    pub fn clear_caches(&self) {
        self.cameras.clear();
        self.media_servers.clear();
        self.media.clear();
        self.common_codes.clear();
        self.versions.clear();
        self.video_conversions.clear();
        self.video_conversion_servers.clear();
        self.file_transfer_servers.clear();
    }
}
