//! User-facing feedback for saved-item actions.
//!
//! Notifications are fire-and-forget. A surface that drops or fails to
//! render a message never affects the mutation that triggered it.

use std::time::Duration;

use crate::local_store::LocalStore;

const SHORT_TOAST: Duration = Duration::from_millis(2_500);
const LONG_TOAST: Duration = Duration::from_millis(6_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub duration: Duration,
}

/// Whatever displays toasts on this client
pub trait NotificationSurface: Send + Sync {
    fn show(&self, notification: &Notification);
}

impl<T: NotificationSurface + ?Sized> NotificationSurface for std::sync::Arc<T> {
    fn show(&self, notification: &Notification) {
        (**self).show(notification);
    }
}

/// Surface for headless clients: notifications become log lines
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotificationSurface;

impl NotificationSurface for TracingNotificationSurface {
    fn show(&self, notification: &Notification) {
        match notification.kind {
            NotificationKind::Info => {
                tracing::info!(title = %notification.title, "{}", notification.body);
            }
            NotificationKind::Error => {
                tracing::warn!(title = %notification.title, "{}", notification.body);
            }
        }
    }
}

/// Builds the saved-item messages and throttles the sign-in nudge
pub struct Notifier {
    surface: Box<dyn NotificationSurface>,
    nudge_interval_ms: i64,
}

impl Notifier {
    pub fn new(surface: impl NotificationSurface + 'static, nudge_interval_ms: i64) -> Self {
        Self {
            surface: Box::new(surface),
            nudge_interval_ms,
        }
    }

    pub fn favorite_added(&self, signed_in: bool, title: &str) {
        let body = if signed_in {
            format!("{title} was added to your favorites.")
        } else {
            format!("{title} was saved on this device. Sign in to keep it in sync.")
        };
        let title = if signed_in {
            "Added to favorites"
        } else {
            "Saved locally"
        };
        self.info(title, body);
    }

    pub fn favorite_removed(&self, title: &str) {
        self.info(
            "Removed from favorites",
            format!("{title} is no longer in your favorites."),
        );
    }

    pub fn recent_views_cleared(&self) {
        self.info("History cleared", "Your recently viewed list is empty.".to_string());
    }

    pub fn sync_completed(&self, pushed: usize, adopted: usize) {
        self.info(
            "Saved items synced",
            format!("Sent {pushed} and received {adopted} saved items."),
        );
    }

    pub fn sync_failed(&self) {
        self.surface.show(&Notification {
            kind: NotificationKind::Error,
            title: "Sync failed".to_string(),
            body: "Your saved items are safe on this device. We'll try again later.".to_string(),
            duration: LONG_TOAST,
        });
    }

    /// Show the "sign in to sync across devices" prompt unless it was shown
    /// within the nudge interval. Returns whether it was shown.
    pub fn maybe_nudge_sign_in(&self, store: &LocalStore, now_ms: i64) -> bool {
        if let Some(last) = store.last_nudge_at() {
            if now_ms.saturating_sub(last) < self.nudge_interval_ms {
                return false;
            }
        }

        self.surface.show(&Notification {
            kind: NotificationKind::Info,
            title: "Sync across devices".to_string(),
            body: "Sign in to see your favorites and recently viewed listings everywhere."
                .to_string(),
            duration: LONG_TOAST,
        });
        store.record_nudge_at(now_ms);
        true
    }

    fn info(&self, title: &str, body: String) {
        self.surface.show(&Notification {
            kind: NotificationKind::Info,
            title: title.to_string(),
            body,
            duration: SHORT_TOAST,
        });
    }
}
