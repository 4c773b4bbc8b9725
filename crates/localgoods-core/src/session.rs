//! Session provider seam and the watch-backed handle clients publish into.

use std::sync::Arc;

use tokio::sync::watch;

use crate::auth::AuthSession;

/// Source of the currently identified session, if any
pub trait SessionProvider: Send + Sync {
    fn current_session(&self) -> Option<AuthSession>;

    fn current_user_id(&self) -> Option<String> {
        self.current_session().map(|session| session.user.id)
    }
}

/// Publishes login/logout transitions to every subscriber.
///
/// Construct once per client process and share clones; the Reconciler
/// subscribes through [`SessionHandle::subscribe`].
#[derive(Clone)]
pub struct SessionHandle {
    sender: Arc<watch::Sender<Option<AuthSession>>>,
}

impl SessionHandle {
    pub fn new(initial: Option<AuthSession>) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Replace the session; subscribers observe the change
    pub fn set_session(&self, session: Option<AuthSession>) {
        let user = session.as_ref().map(|session| session.user.id.clone());
        self.sender.send_replace(session);
        tracing::debug!(signed_in = user.is_some(), "Session changed");
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<AuthSession>> {
        self.sender.subscribe()
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new(None)
    }
}

impl SessionProvider for SessionHandle {
    fn current_session(&self) -> Option<AuthSession> {
        self.sender.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthUser;

    fn session(user: &str) -> AuthSession {
        AuthSession {
            access_token: "token".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: i64::MAX,
            user: AuthUser {
                id: user.to_string(),
                email: None,
            },
        }
    }

    #[test]
    fn handle_reports_current_user() {
        let handle = SessionHandle::default();
        assert_eq!(handle.current_user_id(), None);

        handle.set_session(Some(session("u-1")));
        assert_eq!(handle.current_user_id().as_deref(), Some("u-1"));

        handle.set_session(None);
        assert!(handle.current_session().is_none());
    }

    #[tokio::test]
    async fn subscribers_observe_login() {
        let handle = SessionHandle::default();
        let mut receiver = handle.subscribe();

        handle.set_session(Some(session("u-2")));
        receiver.changed().await.unwrap();
        let user = receiver.borrow_and_update().as_ref().map(|s| s.user.id.clone());
        assert_eq!(user.as_deref(), Some("u-2"));
    }
}
