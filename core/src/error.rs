//! Error types for the VMS API client and backend error normalisation.
//!
//! # Design
//! Transport failures (no response at all) and HTTP error responses are kept
//! apart because the stores render them differently: an unreachable backend
//! gets a fixed connectivity message, while an error response carries a
//! FastAPI-style `detail` body that `parse_backend_error` turns into text.

use serde_json::Value;
use thiserror::Error;

/// Shown when a fetch could not reach the backend at all.
pub const CONNECTIVITY_MESSAGE: &str = "Unable to connect to the backend server.";

/// Last-resort message when nothing better can be extracted.
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred.";

#[derive(Debug, Error)]
pub enum ApiError {
    /// No response was received (connection refused, timeout, broken body).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// A record key string could not be split into its fields.
    #[error("invalid record key: {0}")]
    InvalidKey(String),

    /// Some deletions of a batch were rejected. `deleted` lists the keys the
    /// backend accepted, `failed` the ones it rejected.
    #[error("deletion failed for {failed:?}: {source}")]
    PartialDelete {
        deleted: Vec<String>,
        failed: Vec<String>,
        #[source]
        source: Box<ApiError>,
    },

    /// Some updates of a batch were rejected. `updated` lists the keys the
    /// backend accepted, `failed` the ones it rejected.
    #[error("update failed for {failed:?}: {source}")]
    PartialUpdate {
        updated: Vec<String>,
        failed: Vec<String>,
        #[source]
        source: Box<ApiError>,
    },
}

impl ApiError {
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::PartialDelete { source, .. } | ApiError::PartialUpdate { source, .. } => {
                source.status()
            }
            _ => None,
        }
    }
}

/// Normalise a backend error into one human-readable line.
///
/// FastAPI bodies of the form `{"detail": ...}` are handled in three shapes:
/// a list of field errors (`"loc.path: msg"`, comma separated), a plain
/// string, or any other JSON value (rendered as JSON text).
pub fn parse_backend_error(error: &ApiError) -> String {
    let message = match error {
        ApiError::Http { body, .. } => match detail_message(body) {
            Some(message) => message,
            None if !body.trim().is_empty() => body.clone(),
            None => error.to_string(),
        },
        ApiError::PartialDelete { source, .. } | ApiError::PartialUpdate { source, .. } => {
            parse_backend_error(source)
        }
        other => other.to_string(),
    };

    if message.trim().is_empty() {
        UNKNOWN_ERROR_MESSAGE.to_string()
    } else {
        message
    }
}

fn detail_message(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    let detail = parsed.get("detail")?;

    let message = match detail {
        Value::Array(entries) => entries
            .iter()
            .map(field_error)
            .collect::<Vec<_>>()
            .join(", "),
        Value::String(text) => text.clone(),
        Value::Null => return None,
        other => other.to_string(),
    };
    Some(message)
}

fn field_error(entry: &Value) -> String {
    if let Value::String(text) = entry {
        return text.clone();
    }

    let loc = entry
        .get("loc")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .map(|part| match part {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(".")
        })
        .unwrap_or_default();
    let msg = entry.get("msg").and_then(Value::as_str).unwrap_or_default();

    format!("{loc}: {msg}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16, body: &str) -> ApiError {
        ApiError::Http {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn field_errors_are_joined() {
        let err = http(422, r#"{"detail":[{"loc":["body","code"],"msg":"required"}]}"#);
        assert_eq!(parse_backend_error(&err), "body.code: required");

        let err = http(
            422,
            r#"{"detail":[{"loc":["body","code"],"msg":"required"},{"loc":["query",0],"msg":"bad"},"plain"]}"#,
        );
        assert_eq!(
            parse_backend_error(&err),
            "body.code: required, query.0: bad, plain"
        );
    }

    #[test]
    fn string_detail_passes_through() {
        let err = http(404, r#"{"detail":"Record not found"}"#);
        assert_eq!(parse_backend_error(&err), "Record not found");
    }

    #[test]
    fn object_detail_is_stringified() {
        let err = http(400, r#"{"detail":{"reason":"locked"}}"#);
        assert_eq!(parse_backend_error(&err), r#"{"reason":"locked"}"#);
    }

    #[test]
    fn body_without_detail_falls_back_to_raw_body() {
        let err = http(500, "internal error");
        assert_eq!(parse_backend_error(&err), "internal error");
    }

    #[test]
    fn empty_body_falls_back_to_display() {
        let err = http(502, "");
        assert_eq!(parse_backend_error(&err), "HTTP 502: ");
    }

    #[test]
    fn network_error_uses_display() {
        let err = ApiError::Network("connection refused".to_string());
        assert_eq!(parse_backend_error(&err), "network error: connection refused");
        assert!(err.is_network());
    }

    #[test]
    fn partial_delete_reports_underlying_detail() {
        let err = ApiError::PartialDelete {
            deleted: vec!["a".to_string()],
            failed: vec!["b".to_string()],
            source: Box::new(http(404, r#"{"detail":"Record not found"}"#)),
        };
        assert_eq!(parse_backend_error(&err), "Record not found");
        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().starts_with(r#"deletion failed for ["b"]"#));
    }
}
