//! Local profile and UI preferences.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub theme: String,
    pub language: String,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            language: "ko".to_string(),
        }
    }
}

/// A partial preference update; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct PreferencesPatch {
    pub theme: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Default)]
struct UserState {
    profile: Option<UserProfile>,
    preferences: UserPreferences,
}

#[derive(Debug, Default)]
pub struct UserStore {
    state: RwLock<UserState>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.state.read().profile.clone()
    }

    pub fn preferences(&self) -> UserPreferences {
        self.state.read().preferences.clone()
    }

    pub fn user_name(&self) -> String {
        self.state
            .read()
            .profile
            .as_ref()
            .map_or_else(|| "Guest".to_string(), |p| p.name.clone())
    }

    pub fn user_email(&self) -> String {
        self.state
            .read()
            .profile
            .as_ref()
            .map(|p| p.email.clone())
            .unwrap_or_default()
    }

    pub fn user_role(&self) -> String {
        self.state
            .read()
            .profile
            .as_ref()
            .and_then(|p| p.role.clone())
            .unwrap_or_else(|| "user".to_string())
    }

    pub fn set_profile(&self, profile: UserProfile) {
        self.state.write().profile = Some(profile);
    }

    pub fn update_preferences(&self, patch: PreferencesPatch) {
        let mut state = self.state.write();
        if let Some(theme) = patch.theme {
            state.preferences.theme = theme;
        }
        if let Some(language) = patch.language {
            state.preferences.language = language;
        }
    }

    pub fn clear_profile(&self) {
        self.state.write().profile = None;
    }
}
