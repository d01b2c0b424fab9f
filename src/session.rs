use std::sync::Arc;

use parking_lot::RwLock;

use crate::api::UserId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: UserId,
    pub username: String,
}

#[derive(Debug, Default)]
struct SessionState {
    user: Option<CurrentUser>,
    unread_notifications: u32,
}

/// Signed-in user and the counters shared across views.
///
/// Created once at the application root and cloned into whatever needs it;
/// clones share the same state. `sign_out` clears everything.
#[derive(Debug, Clone, Default)]
pub struct Session {
    state: Arc<RwLock<SessionState>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(user: CurrentUser) -> Self {
        let session = Self::new();
        session.sign_in(user);
        session
    }

    pub fn sign_in(&self, user: CurrentUser) {
        tracing::info!(user = %user.id, "signed in");
        let mut state = self.state.write();
        *state = SessionState {
            user: Some(user),
            unread_notifications: 0,
        };
    }

    pub fn sign_out(&self) {
        let mut state = self.state.write();
        if let Some(user) = state.user.take() {
            tracing::info!(user = %user.id, "signed out");
        }
        *state = SessionState::default();
    }

    pub fn current_user(&self) -> Option<CurrentUser> {
        self.state.read().user.clone()
    }

    pub fn current_user_id(&self) -> Option<UserId> {
        self.state.read().user.as_ref().map(|u| u.id.clone())
    }

    pub fn is_signed_in(&self) -> bool {
        self.state.read().user.is_some()
    }

    pub fn is_self(&self, user: &UserId) -> bool {
        self.state
            .read()
            .user
            .as_ref()
            .is_some_and(|u| &u.id == user)
    }

    pub fn unread_notifications(&self) -> u32 {
        self.state.read().unread_notifications
    }

    /// Ignored while signed out.
    pub fn set_unread_notifications(&self, count: u32) {
        let mut state = self.state.write();
        if state.user.is_some() {
            state.unread_notifications = count;
        }
    }

    pub fn mark_notifications_read(&self) {
        self.state.write().unread_notifications = 0;
    }
}
