use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use localgoods_core::auth::AuthSession;
use localgoods_core::config::BackendConfig;
use localgoods_core::notify::{Notification, NotificationKind, NotificationSurface};
use localgoods_core::remote::{
    RemoteError, RemoteRecord, RemoteResult, RemoteSavedItems, SupabaseSavedItemsClient,
};
use localgoods_core::session::{SessionHandle, SessionProvider};
use localgoods_core::storage::SqliteStorage;
use localgoods_core::util::normalize_text_option;
use localgoods_core::{ListingSnapshot, SavedItem, SavedKind, SmartSave};
use serde::Serialize;

use crate::auth::{auth_client, restore_session, CliAuthClient};
use crate::cli::SnapshotArgs;
use crate::config::CliConfig;
use crate::error::CliError;

/// Remote store for the CLI: Supabase when configured, otherwise local-only
pub enum CliRemote {
    Supabase(SupabaseSavedItemsClient),
    Disabled,
}

impl RemoteSavedItems for CliRemote {
    async fn upsert(
        &self,
        session: &AuthSession,
        kind: SavedKind,
        records: &[RemoteRecord],
    ) -> RemoteResult<()> {
        match self {
            Self::Supabase(client) => client.upsert(session, kind, records).await,
            Self::Disabled => Err(RemoteError::NotConfigured),
        }
    }

    async fn delete(&self, session: &AuthSession, kind: SavedKind, subject_id: &str)
        -> RemoteResult<()> {
        match self {
            Self::Supabase(client) => client.delete(session, kind, subject_id).await,
            Self::Disabled => Err(RemoteError::NotConfigured),
        }
    }

    async fn delete_all(&self, session: &AuthSession, kind: SavedKind) -> RemoteResult<()> {
        match self {
            Self::Supabase(client) => client.delete_all(session, kind).await,
            Self::Disabled => Err(RemoteError::NotConfigured),
        }
    }

    async fn list(&self, session: &AuthSession, kind: SavedKind) -> RemoteResult<Vec<RemoteRecord>> {
        match self {
            Self::Supabase(client) => client.list(session, kind).await,
            Self::Disabled => Err(RemoteError::NotConfigured),
        }
    }
}

/// Prints notifications to stderr so stdout stays machine-readable
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotificationSurface;

impl NotificationSurface for ConsoleNotificationSurface {
    fn show(&self, notification: &Notification) {
        eprintln!("{}", render_notification(notification));
    }
}

pub fn render_notification(notification: &Notification) -> String {
    match notification.kind {
        NotificationKind::Info => format!("{}: {}", notification.title, notification.body),
        NotificationKind::Error => format!("! {}: {}", notification.title, notification.body),
    }
}

/// Everything a command needs: the store, the session and the auth client
pub struct CliContext {
    pub smart: SmartSave<CliRemote>,
    pub sessions: SessionHandle,
    pub backend: Option<BackendConfig>,
    pub auth: Option<CliAuthClient>,
}

impl CliContext {
    pub async fn open(db_path: &Path) -> Result<Self, CliError> {
        let config = CliConfig::load().map_err(CliError::Config)?;
        let backend = config.backend()?;
        let timeout = config.smart_save.remote_timeout();
        let auth = backend
            .as_ref()
            .map(|backend| auth_client(backend, timeout))
            .transpose()?;
        let session = restore_session(auth.as_ref()).await;
        Self::open_with(db_path, config, backend, auth, session)
    }

    pub fn open_with(
        db_path: &Path,
        config: CliConfig,
        backend: Option<BackendConfig>,
        auth: Option<CliAuthClient>,
        session: Option<AuthSession>,
    ) -> Result<Self, CliError> {
        let remote = match backend.as_ref() {
            Some(backend) => CliRemote::Supabase(SupabaseSavedItemsClient::new(
                backend.rest_url(),
                backend.supabase_anon_key.clone(),
                config.smart_save.remote_timeout(),
            )?),
            None => CliRemote::Disabled,
        };
        let storage = SqliteStorage::open(db_path)?;
        let sessions = SessionHandle::new(session);
        let smart = SmartSave::new(
            config.smart_save,
            storage,
            remote,
            Arc::new(sessions.clone()),
            ConsoleNotificationSurface,
        )?;

        Ok(Self {
            smart,
            sessions,
            backend,
            auth,
        })
    }

    pub fn current_session(&self) -> Option<AuthSession> {
        self.sessions.current_session()
    }

    pub fn require_auth(&self) -> Result<&CliAuthClient, CliError> {
        self.auth.as_ref().ok_or(CliError::BackendNotConfigured)
    }
}

#[derive(Debug, Serialize)]
pub struct SavedListItem {
    pub id: String,
    pub listing_id: String,
    pub title: String,
    pub price: Option<String>,
    pub seller: Option<String>,
    pub image_url: Option<String>,
    pub saved_at: i64,
    pub relative_time: String,
    pub synced: bool,
}

pub fn saved_item_to_list_item(item: &SavedItem, now_ms: i64) -> SavedListItem {
    let snapshot = item.snapshot.as_ref();
    SavedListItem {
        id: item.id.to_string(),
        listing_id: item.subject_id.clone(),
        title: item.display_title().to_string(),
        price: snapshot.and_then(ListingSnapshot::display_price),
        seller: snapshot.and_then(|snapshot| snapshot.seller_name.clone()),
        image_url: snapshot.and_then(|snapshot| snapshot.image_url.clone()),
        saved_at: item.timestamp,
        relative_time: format_relative_time(item.timestamp, now_ms),
        synced: item.synced,
    }
}

pub fn format_saved_lines(items: &[SavedItem], now_ms: i64) -> Vec<String> {
    items
        .iter()
        .map(|item| {
            let listing_id = truncate_chars(&item.subject_id, 16);
            let title = truncate_chars(item.display_title(), 36);
            let price = item
                .snapshot
                .as_ref()
                .and_then(ListingSnapshot::display_price)
                .unwrap_or_default();
            let relative_time = format_relative_time(item.timestamp, now_ms);
            let marker = if item.synced { "" } else { "  (not synced)" };
            format!("{listing_id:<16}  {title:<36}  {price:>9}  {relative_time}{marker}")
        })
        .collect()
}

pub fn print_saved_items(
    items: &[SavedItem],
    limit: usize,
    as_json: bool,
    empty_message: &str,
) -> Result<(), CliError> {
    let now_ms = Utc::now().timestamp_millis();
    let items = &items[..items.len().min(limit)];

    if as_json {
        let json_items = items
            .iter()
            .map(|item| saved_item_to_list_item(item, now_ms))
            .collect::<Vec<SavedListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if items.is_empty() {
        println!("{empty_message}");
    } else {
        for line in format_saved_lines(items, now_ms) {
            println!("{line}");
        }
    }
    Ok(())
}

pub fn truncate_chars(value: &str, max_chars: usize) -> String {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let mut truncated = collapsed
            .chars()
            .take(max_chars.saturating_sub(3))
            .collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else {
        format!("{}w ago", diff / week)
    }
}

pub fn normalize_listing_id(listing_id: &str) -> Result<String, CliError> {
    let trimmed = listing_id.trim();
    if trimmed.is_empty() {
        return Err(CliError::EmptyListingId);
    }
    Ok(trimmed.to_string())
}

/// `None` when no snapshot flag was given
pub fn snapshot_from_args(args: SnapshotArgs) -> Option<ListingSnapshot> {
    ListingSnapshot {
        title: normalize_text_option(args.title),
        price_cents: args.price_cents,
        image_url: normalize_text_option(args.image_url),
        seller_name: normalize_text_option(args.seller),
    }
    .non_empty()
}
