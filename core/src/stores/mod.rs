//! Domain stores.
//!
//! API-backed stores are thin configurations of `ApiStoreHelper`: an
//! endpoint, an optional FastAPI table binding, and the entity's field
//! mapping. The local stores hold client-only state.

pub mod alert;
pub mod auth;
pub mod camera;
pub mod cart;
pub mod common_code;
pub mod file_transfer_server;
pub mod media;
pub mod media_server;
pub mod navigation;
pub mod preference;
pub mod user;
pub mod version;
pub mod video_conversion;
pub mod video_conversion_server;

use serde_json::Value;

pub use alert::{Alert, AlertKind, AlertStore};
pub use auth::AuthStore;
pub use camera::{Camera, CameraStore};
pub use cart::{CartItem, CartStore};
pub use common_code::{CommonCode, CommonCodeStore};
pub use file_transfer_server::{FileTransferServer, FileTransferServerStore};
pub use media::{Media, MediaStore};
pub use media_server::{MediaServer, MediaServerStore};
pub use navigation::NavigationStore;
pub use preference::{FileStorage, KeyValueStorage, MemoryStorage, PreferenceStore};
pub use user::{PreferencesPatch, UserPreferences, UserProfile, UserStore};
pub use version::{Version, VersionStore};
pub use video_conversion::{VideoConversion, VideoConversionStore};
pub use video_conversion_server::{VideoConversionServer, VideoConversionServerStore};

/// Case-insensitive substring match of `query` against any of `fields`.
pub(crate) fn matches_query<S: AsRef<str>>(query: &str, fields: &[S]) -> bool {
    let query = query.to_lowercase();
    fields
        .iter()
        .any(|field| field.as_ref().to_lowercase().contains(&query))
}

/// Field rendered as text; `""` when missing or null.
pub(crate) fn text(data: &Value, field: &str) -> String {
    opt_text(data, field).unwrap_or_default()
}

/// Field rendered as text, falling back to `default` when missing, null or
/// empty.
pub(crate) fn text_or(data: &Value, field: &str, default: &str) -> String {
    opt_text(data, field).unwrap_or_else(|| default.to_string())
}

/// Field rendered as text; numbers become their decimal form. Empty strings
/// count as absent.
pub(crate) fn opt_text(data: &Value, field: &str) -> Option<String> {
    match data.get(field)? {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Field as an integer, accepting numeric strings; `0` otherwise.
pub(crate) fn number(data: &Value, field: &str) -> i64 {
    match data.get(field) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or_default(),
        Some(Value::String(s)) => s.trim().parse().unwrap_or_default(),
        _ => 0,
    }
}

/// Field as an integer when it holds a number or a numeric string.
pub(crate) fn opt_number(data: &Value, field: &str) -> Option<i64> {
    match data.get(field)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Every API entity's `from_api` takes an object; anything else is rejected.
pub(crate) fn expect_object(data: &Value) -> Result<(), serde_json::Error> {
    if data.is_object() {
        Ok(())
    } else {
        Err(serde::de::Error::custom(format!(
            "expected a JSON object, got {data}"
        )))
    }
}
