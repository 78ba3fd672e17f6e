//! Shared login state.
//!
//! The `Api` clears it when a request comes back 401; `AuthStore` fills it
//! from the session probe. Both hold clones of the same handle.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::types::AuthUser;

#[derive(Debug, Default)]
struct SessionState {
    user: Option<AuthUser>,
    auth_ready: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    inner: Arc<RwLock<SessionState>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(&self) -> Option<AuthUser> {
        self.inner.read().user.clone()
    }

    pub fn set_user(&self, user: Option<AuthUser>) {
        self.inner.write().user = user;
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.read().user.is_some()
    }

    /// Whether the session probe has completed at least once.
    pub fn auth_ready(&self) -> bool {
        self.inner.read().auth_ready
    }

    pub fn mark_ready(&self) {
        self.inner.write().auth_ready = true;
    }

    /// Client-side teardown: forget the user, keep `auth_ready`.
    pub fn clear(&self) {
        self.inner.write().user = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let session = Session::new();
        let other = session.clone();
        session.set_user(Some(AuthUser {
            id: "admin".to_string(),
            name: "Admin".to_string(),
            email: String::new(),
        }));
        assert!(other.is_authenticated());

        other.mark_ready();
        other.clear();
        assert!(!session.is_authenticated());
        assert!(session.auth_ready());
    }
}
