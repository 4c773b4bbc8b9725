//! PostgREST client for the `favorites` and `recently_viewed` tables.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::{RemoteError, RemoteRecord, RemoteResult, RemoteSavedItems};
use crate::auth::{parse_api_error, AuthSession};
use crate::models::{ListingSnapshot, SavedKind};

const DEFAULT_LIST_LIMIT: usize = 500;

/// Table and column names backing one saved list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTable {
    pub name: String,
    pub subject_column: String,
    pub timestamp_column: String,
}

impl RemoteTable {
    pub fn favorites() -> Self {
        Self {
            name: "favorites".to_string(),
            subject_column: "listing_id".to_string(),
            timestamp_column: "created_at".to_string(),
        }
    }

    pub fn recently_viewed() -> Self {
        Self {
            name: "recently_viewed".to_string(),
            subject_column: "listing_id".to_string(),
            timestamp_column: "viewed_at".to_string(),
        }
    }
}

pub struct SupabaseSavedItemsClient {
    rest_url: String,
    anon_key: String,
    client: Client,
    favorites: RemoteTable,
    recent_views: RemoteTable,
    list_limit: usize,
}

impl SupabaseSavedItemsClient {
    /// `rest_url` is the project's `/rest/v1` base
    pub fn new(
        rest_url: impl Into<String>,
        anon_key: impl Into<String>,
        timeout: Duration,
    ) -> RemoteResult<Self> {
        let rest_url = rest_url.into().trim().trim_end_matches('/').to_string();
        if !crate::util::is_http_url(&rest_url) {
            return Err(RemoteError::InvalidConfiguration(
                "REST URL must include http:// or https://".to_string(),
            ));
        }
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(RemoteError::InvalidConfiguration(
                "anon key must not be empty".to_string(),
            ));
        }

        Ok(Self {
            rest_url,
            anon_key,
            client: Client::builder().timeout(timeout).build()?,
            favorites: RemoteTable::favorites(),
            recent_views: RemoteTable::recently_viewed(),
            list_limit: DEFAULT_LIST_LIMIT,
        })
    }

    const fn table(&self, kind: SavedKind) -> &RemoteTable {
        match kind {
            SavedKind::Favorite => &self.favorites,
            SavedKind::RecentView => &self.recent_views,
        }
    }

    fn table_url(&self, kind: SavedKind) -> String {
        format!("{}/{}", self.rest_url, self.table(kind).name)
    }

    fn authorized(&self, request: RequestBuilder, session: &AuthSession) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .header("Accept", "application/json")
    }

    async fn send(request: RequestBuilder) -> RemoteResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = parse_api_error(status, &body);
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            Err(RemoteError::Unauthorized(message))
        } else {
            Err(RemoteError::Api(message))
        }
    }
}

impl RemoteSavedItems for SupabaseSavedItemsClient {
    async fn upsert(
        &self,
        session: &AuthSession,
        kind: SavedKind,
        records: &[RemoteRecord],
    ) -> RemoteResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let table = self.table(kind);
        let rows = records
            .iter()
            .map(|record| upsert_row(table, session.user_id(), record))
            .collect::<RemoteResult<Vec<_>>>()?;

        let request = self
            .client
            .post(self.table_url(kind))
            .query(&[(
                "on_conflict",
                format!("user_id,{}", table.subject_column),
            )])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&rows);
        Self::send(self.authorized(request, session)).await?;
        tracing::debug!(kind = kind.label(), count = rows.len(), "Upserted remote rows");
        Ok(())
    }

    async fn delete(
        &self,
        session: &AuthSession,
        kind: SavedKind,
        subject_id: &str,
    ) -> RemoteResult<()> {
        let table = self.table(kind);
        let request = self.client.delete(self.table_url(kind)).query(&[
            ("user_id", eq_filter(session.user_id())),
            (table.subject_column.as_str(), eq_filter(subject_id)),
        ]);
        Self::send(self.authorized(request, session)).await?;
        Ok(())
    }

    async fn delete_all(&self, session: &AuthSession, kind: SavedKind) -> RemoteResult<()> {
        let request = self
            .client
            .delete(self.table_url(kind))
            .query(&[("user_id", eq_filter(session.user_id()))]);
        Self::send(self.authorized(request, session)).await?;
        Ok(())
    }

    async fn list(&self, session: &AuthSession, kind: SavedKind) -> RemoteResult<Vec<RemoteRecord>> {
        let table = self.table(kind);
        let request = self.client.get(self.table_url(kind)).query(&[
            ("select", select_columns(table)),
            ("user_id", eq_filter(session.user_id())),
            ("order", format!("{}.desc", table.timestamp_column)),
            ("limit", self.list_limit.to_string()),
        ]);
        let body = Self::send(self.authorized(request, session))
            .await?
            .text()
            .await?;
        parse_rows(table, &body)
    }
}

fn eq_filter(value: &str) -> String {
    format!("eq.{value}")
}

fn select_columns(table: &RemoteTable) -> String {
    format!(
        "id,{},{},snapshot",
        table.subject_column, table.timestamp_column
    )
}

#[derive(Debug, Serialize)]
struct UpsertRow<'a> {
    user_id: &'a str,
    #[serde(flatten)]
    columns: serde_json::Map<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot: Option<&'a ListingSnapshot>,
}

fn upsert_row<'a>(
    table: &RemoteTable,
    user_id: &'a str,
    record: &'a RemoteRecord,
) -> RemoteResult<UpsertRow<'a>> {
    let timestamp = DateTime::<Utc>::from_timestamp_millis(record.timestamp).ok_or_else(|| {
        RemoteError::InvalidPayload(format!("timestamp {} out of range", record.timestamp))
    })?;
    let mut columns = serde_json::Map::new();
    columns.insert(
        table.subject_column.clone(),
        serde_json::Value::String(record.subject_id.clone()),
    );
    columns.insert(
        table.timestamp_column.clone(),
        serde_json::Value::String(timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    Ok(UpsertRow {
        user_id,
        columns,
        snapshot: record.snapshot.as_ref(),
    })
}

#[derive(Debug, Deserialize)]
struct ListedRow {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    snapshot: Option<ListingSnapshot>,
    #[serde(flatten)]
    columns: serde_json::Map<String, serde_json::Value>,
}

fn parse_rows(table: &RemoteTable, body: &str) -> RemoteResult<Vec<RemoteRecord>> {
    let rows: Vec<ListedRow> = serde_json::from_str(body)
        .map_err(|error| RemoteError::InvalidPayload(error.to_string()))?;

    rows.into_iter()
        .map(|row| {
            let subject_id = match row.columns.get(&table.subject_column) {
                Some(serde_json::Value::String(value)) => value.clone(),
                Some(serde_json::Value::Number(value)) => value.to_string(),
                _ => {
                    return Err(RemoteError::InvalidPayload(format!(
                        "row missing '{}'",
                        table.subject_column
                    )))
                }
            };
            let timestamp = row
                .columns
                .get(&table.timestamp_column)
                .and_then(serde_json::Value::as_str)
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|parsed| parsed.timestamp_millis())
                .ok_or_else(|| {
                    RemoteError::InvalidPayload(format!(
                        "row for '{subject_id}' has no valid '{}'",
                        table.timestamp_column
                    ))
                })?;
            let id = row
                .id
                .as_ref()
                .and_then(serde_json::Value::as_str)
                .and_then(|raw| raw.parse().ok());

            Ok(RemoteRecord {
                id,
                subject_id,
                timestamp,
                snapshot: row.snapshot.and_then(ListingSnapshot::non_empty),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::SavedItemId;

    #[test]
    fn new_rejects_invalid_configuration() {
        let timeout = Duration::from_secs(1);
        assert!(SupabaseSavedItemsClient::new("project.supabase.co", "anon", timeout).is_err());
        assert!(SupabaseSavedItemsClient::new("https://p.supabase.co/rest/v1", " ", timeout).is_err());
    }

    #[test]
    fn table_url_strips_trailing_slash() {
        let client = SupabaseSavedItemsClient::new(
            "https://p.supabase.co/rest/v1/",
            "anon",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            client.table_url(SavedKind::RecentView),
            "https://p.supabase.co/rest/v1/recently_viewed"
        );
    }

    #[test]
    fn upsert_row_uses_table_columns_and_iso_timestamps() {
        let record = RemoteRecord {
            id: None,
            subject_id: "sku-42".to_string(),
            timestamp: 1_700_000_000_123,
            snapshot: None,
        };
        let row = upsert_row(&RemoteTable::recently_viewed(), "user-1", &record).unwrap();
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "user_id": "user-1",
                "listing_id": "sku-42",
                "viewed_at": "2023-11-14T22:13:20.123Z",
            })
        );
    }

    #[test]
    fn parse_rows_reads_ids_timestamps_and_snapshots() {
        let id = SavedItemId::new();
        let body = format!(
            r#"[
                {{"id":"{id}","listing_id":"sku-1","created_at":"2023-11-14T22:13:20.123+00:00","snapshot":{{"title":"Honey"}}}},
                {{"id":17,"listing_id":42,"created_at":"2023-11-14T22:13:21Z","snapshot":null}}
            ]"#
        );
        let rows = parse_rows(&RemoteTable::favorites(), &body).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, Some(id));
        assert_eq!(rows[0].timestamp, 1_700_000_000_123);
        assert_eq!(
            rows[0].snapshot.as_ref().and_then(|s| s.title.as_deref()),
            Some("Honey")
        );
        assert_eq!(rows[1].id, None);
        assert_eq!(rows[1].subject_id, "42");
        assert_eq!(rows[1].timestamp, 1_700_000_001_000);
    }

    #[test]
    fn parse_rows_rejects_rows_without_timestamps() {
        let body = r#"[{"listing_id":"sku-1"}]"#;
        let error = parse_rows(&RemoteTable::favorites(), body).unwrap_err();
        assert!(matches!(error, RemoteError::InvalidPayload(_)));
    }
}
