//! Cookie-session authentication.
//!
//! The session itself lives in an httpOnly cookie held by the transport;
//! this store only mirrors who is logged in. It shares its `Session` with
//! the `Api`, which clears it on any 401.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::api::Api;
use crate::error::ApiError;
use crate::session::Session;
use crate::types::AuthUser;

pub struct AuthStore {
    api: Arc<Api>,
    session: Session,
}

impl AuthStore {
    pub fn new(api: Arc<Api>) -> Self {
        let session = api.session().clone();
        Self { api, session }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.session.user()
    }

    pub fn auth_ready(&self) -> bool {
        self.session.auth_ready()
    }

    pub fn set_user(&self, user: Option<AuthUser>) {
        self.session.set_user(user);
    }

    pub fn login(&self, user: AuthUser) {
        self.session.set_user(Some(user));
        self.session.mark_ready();
    }

    pub fn clear_auth(&self) {
        self.session.clear();
    }

    /// Ask the backend who owns the session cookie. Runs once; any failure
    /// means "not logged in". `auth_ready` is set either way.
    pub async fn fetch_user(&self) {
        if self.session.auth_ready() {
            return;
        }

        let client = self.api.client();
        let user = match self.api.send(client.build_session_probe()).await {
            Ok(response) => client.parse_session_probe(response).unwrap_or_else(|err| {
                warn!(error = %err, "unreadable session probe response");
                None
            }),
            Err(err) => {
                debug!(error = %err, "no active session");
                None
            }
        };
        self.session.set_user(user);
        self.session.mark_ready();
    }

    /// Drop the server-side session. The local user is cleared even when the
    /// call fails; the failure is still returned.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let client = self.api.client();
        let result = match self.api.send(client.build_logout()).await {
            Ok(response) => client.parse_empty(response),
            Err(err) => Err(err),
        };
        self.session.clear();
        result
    }
}
