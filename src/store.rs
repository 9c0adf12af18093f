//! Settings store: one SQLite table of key/value pairs holding the session
//! and destination configuration.
//!
//! Writes go through [`SettingsStore::persist`], which applies a whole patch
//! in a single transaction, so related keys can never be observed half
//! updated.
use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use sqlx::{Row, SqlitePool};
use tracing::instrument;

use crate::error::SyncError;
use crate::model::{AuthMethod, AuthSession, SyncConfig, WorkspaceDatabase};

pub type Pool = SqlitePool;

/// Well-known settings keys.
pub mod keys {
    pub const TOKEN: &str = "notionToken";
    pub const REFRESH_TOKEN: &str = "notionRefreshToken";
    /// Epoch milliseconds; absent for non-expiring sessions.
    pub const TOKEN_EXPIRES_AT: &str = "notionTokenExpiresAt";
    pub const WORKSPACE_ID: &str = "notionWorkspaceId";
    pub const WORKSPACE_NAME: &str = "notionWorkspaceName";
    pub const WORKSPACE_ICON: &str = "notionWorkspaceIcon";
    pub const AUTH_METHOD: &str = "authMethod";
    pub const DATABASE_ID: &str = "databaseId";
    pub const DATABASE_NAME: &str = "databaseName";
    pub const SELECTED_PARENT_PAGE_ID: &str = "selectedParentPageId";
    /// JSON-encoded candidate list awaiting a user choice.
    pub const AVAILABLE_DATABASES: &str = "availableDatabases";
}

const SESSION_KEYS: [&str; 7] = [
    keys::TOKEN,
    keys::REFRESH_TOKEN,
    keys::TOKEN_EXPIRES_AT,
    keys::WORKSPACE_ID,
    keys::WORKSPACE_NAME,
    keys::WORKSPACE_ICON,
    keys::AUTH_METHOD,
];

const DESTINATION_KEYS: [&str; 4] = [
    keys::DATABASE_ID,
    keys::DATABASE_NAME,
    keys::SELECTED_PARENT_PAGE_ID,
    keys::AVAILABLE_DATABASES,
];

#[derive(Clone)]
pub struct SettingsStore {
    pool: Pool,
}

impl SettingsStore {
    pub async fn open(database_url: &str) -> Result<Self, SyncError> {
        let normalized = prepare_sqlite_url(database_url);
        let pool = SqlitePool::connect(&normalized).await?;
        // WAL plus full sync: a crash mid-write must not lose the token.
        sqlx::query("PRAGMA journal_mode=WAL;").execute(&pool).await?;
        sqlx::query("PRAGMA synchronous=FULL;").execute(&pool).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, SyncError> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    pub async fn snapshot(&self) -> Result<HashMap<String, String>, SyncError> {
        let rows = sqlx::query("SELECT key, value FROM settings")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| (r.get("key"), r.get("value"))).collect())
    }

    pub async fn updated_at(&self, key: &str) -> Result<Option<DateTime<Utc>>, SyncError> {
        let at = sqlx::query_scalar::<_, DateTime<Utc>>(
            "SELECT updated_at FROM settings WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(at)
    }

    /// Apply a patch atomically: `Some` upserts the key, `None` deletes it.
    #[instrument(skip_all, fields(keys = patch.len()))]
    pub async fn persist(&self, patch: &[(&str, Option<String>)]) -> Result<(), SyncError> {
        let mut tx = self.pool.begin().await?;
        for (key, value) in patch {
            match value {
                Some(value) => {
                    sqlx::query(
                        "INSERT INTO settings (key, value) VALUES (?, ?) \
                         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
                    )
                    .bind(key)
                    .bind(value)
                    .execute(&mut *tx)
                    .await?;
                }
                None => {
                    sqlx::query("DELETE FROM settings WHERE key = ?")
                        .bind(key)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }
        tx.commit().await?;
        Ok(())
    }

    /// The stored session, or `None` when no token is present at all.
    pub async fn auth_session(&self) -> Result<Option<AuthSession>, SyncError> {
        let snap = self.snapshot().await?;
        let access_token = match snap.get(keys::TOKEN) {
            Some(token) if !token.is_empty() => token.clone(),
            _ => return Ok(None),
        };
        let expires_at = snap
            .get(keys::TOKEN_EXPIRES_AT)
            .and_then(|ms| ms.parse::<i64>().ok())
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single());
        let auth_method = snap
            .get(keys::AUTH_METHOD)
            .map(|s| AuthMethod::parse(s))
            .unwrap_or(AuthMethod::Manual);
        Ok(Some(AuthSession {
            access_token,
            refresh_token: snap.get(keys::REFRESH_TOKEN).cloned(),
            expires_at,
            workspace_id: snap.get(keys::WORKSPACE_ID).cloned(),
            workspace_name: snap.get(keys::WORKSPACE_NAME).cloned(),
            workspace_icon: snap.get(keys::WORKSPACE_ICON).cloned(),
            auth_method,
        }))
    }

    pub async fn save_auth_session(&self, session: &AuthSession) -> Result<(), SyncError> {
        let patch: Vec<(&str, Option<String>)> = vec![
            (keys::TOKEN, Some(session.access_token.clone())),
            (keys::REFRESH_TOKEN, session.refresh_token.clone()),
            (
                keys::TOKEN_EXPIRES_AT,
                session.expires_at.map(|at| at.timestamp_millis().to_string()),
            ),
            (keys::WORKSPACE_ID, session.workspace_id.clone()),
            (keys::WORKSPACE_NAME, session.workspace_name.clone()),
            (keys::WORKSPACE_ICON, session.workspace_icon.clone()),
            (keys::AUTH_METHOD, Some(session.auth_method.as_str().to_string())),
        ];
        self.persist(&patch).await
    }

    /// Drop the session but keep the destination configuration.
    pub async fn clear_auth_session(&self) -> Result<(), SyncError> {
        let patch: Vec<(&str, Option<String>)> =
            SESSION_KEYS.iter().map(|k| (*k, None)).collect();
        self.persist(&patch).await
    }

    /// Drop everything: session and destination configuration.
    pub async fn clear_connection(&self) -> Result<(), SyncError> {
        let patch: Vec<(&str, Option<String>)> = SESSION_KEYS
            .iter()
            .chain(DESTINATION_KEYS.iter())
            .map(|k| (*k, None))
            .collect();
        self.persist(&patch).await
    }

    /// Snapshot of the destination configuration for one sync run.
    pub async fn sync_config(&self) -> Result<Option<SyncConfig>, SyncError> {
        let snap = self.snapshot().await?;
        let token = match snap.get(keys::TOKEN) {
            Some(token) if !token.is_empty() => token.clone(),
            _ => return Ok(None),
        };
        Ok(Some(SyncConfig {
            token,
            database_id: snap.get(keys::DATABASE_ID).cloned(),
            database_name: snap.get(keys::DATABASE_NAME).cloned(),
            selected_parent_page_id: snap.get(keys::SELECTED_PARENT_PAGE_ID).cloned(),
        }))
    }

    /// Candidate databases persisted by a user-select setup run.
    pub async fn available_databases(&self) -> Result<Vec<WorkspaceDatabase>, SyncError> {
        match self.get(keys::AVAILABLE_DATABASES).await? {
            Some(json) => serde_json::from_str(&json).map_err(|e| {
                SyncError::SetupFailed(format!("stored candidate list is unreadable: {e}"))
            }),
            None => Ok(Vec::new()),
        }
    }
}

/// For file-backed SQLite URLs, expand a leading `~/` and create the parent
/// directory. In-memory URLs and other schemes pass through untouched.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || url.starts_with("sqlite::memory") {
        return url.to_string();
    }
    let rest = &url["sqlite:".len()..];
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let (path, query) = match rest.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (rest, None),
    };
    if path.is_empty() {
        return url.to_string();
    }
    let expanded = match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(tail), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), tail),
        _ => path.to_string(),
    };
    if let Some(parent) = std::path::Path::new(&expanded).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }
    match query {
        Some(q) => format!("sqlite://{expanded}?{q}"),
        None => format!("sqlite://{expanded}"),
    }
}
