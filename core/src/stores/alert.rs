//! Modal alert state.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    #[default]
    Info,
    Success,
    Error,
    Warning,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alert {
    pub visible: bool,
    pub message: String,
    pub kind: AlertKind,
}

#[derive(Debug, Default)]
pub struct AlertStore {
    state: RwLock<Alert>,
}

impl AlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Alert {
        self.state.read().clone()
    }

    /// Show `message`; `None` means `AlertKind::Info`.
    pub fn show(&self, message: impl Into<String>, kind: Option<AlertKind>) {
        let mut state = self.state.write();
        state.message = message.into();
        state.kind = kind.unwrap_or_default();
        state.visible = true;
    }

    pub fn close(&self) {
        self.state.write().visible = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_and_close() {
        let alerts = AlertStore::new();
        alerts.show("saved", None);
        assert_eq!(alerts.current().kind, AlertKind::Info);
        assert!(alerts.current().visible);

        alerts.show("failed", Some(AlertKind::Error));
        alerts.close();
        let alert = alerts.current();
        assert!(!alert.visible);
        assert_eq!(alert.message, "failed");
        assert_eq!(alert.kind, AlertKind::Error);
    }
}
