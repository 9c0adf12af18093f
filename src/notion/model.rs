//! Wire models for the Notion REST API. Response shapes keep only the fields
//! the engine reads; everything else is dropped on deserialization.
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize, Debug)]
pub struct SearchResp {
    pub results: Vec<SearchItem>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// One `/v1/search` result. Pages carry `properties`; databases carry a
/// top-level `title` array and a `properties` map of their schema.
#[derive(Deserialize, Debug)]
pub struct SearchItem {
    pub object: String,
    pub id: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub parent: Option<ParentRef>,
    #[serde(default)]
    pub properties: serde_json::Map<String, Value>,
    #[serde(default)]
    pub title: Vec<Value>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub last_edited_time: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Debug)]
pub struct ParentRef {
    #[serde(rename = "type")]
    pub typ: String,
    #[serde(default)]
    pub page_id: Option<String>,
    #[serde(default)]
    pub database_id: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct DatabaseProperty {
    pub id: String,
    #[serde(rename = "type")]
    pub typ: String,
}

#[derive(Deserialize, Debug)]
pub struct RetrieveDatabaseResp {
    pub id: String,
    pub title: Vec<Value>,
    pub properties: std::collections::HashMap<String, DatabaseProperty>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CreatedDatabase {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CreatedPage {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// `/v1/users/me`, used to probe whether a token is still live.
#[derive(Deserialize, Debug)]
pub struct BotUser {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Raw body of the OAuth token endpoint.
#[derive(Deserialize, Debug)]
pub struct TokenResp {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub workspace_id: Option<String>,
    #[serde(default)]
    pub workspace_name: Option<String>,
    #[serde(default)]
    pub workspace_icon: Option<String>,
}

/// A token grant normalized for storage: the announced lifetime is converted
/// to an absolute instant, and absent means non-expiring.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub workspace_id: Option<String>,
    pub workspace_name: Option<String>,
    pub workspace_icon: Option<String>,
}

impl TokenGrant {
    pub fn from_resp(resp: TokenResp, now: DateTime<Utc>) -> Self {
        TokenGrant {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token,
            expires_at: resp.expires_in.map(|secs| now + chrono::Duration::seconds(secs)),
            workspace_id: resp.workspace_id,
            workspace_name: resp.workspace_name,
            workspace_icon: resp.workspace_icon,
        }
    }
}

/// Standard error body. Servers are not guaranteed to send it, so parsing is
/// best-effort and the caller falls back to the raw text.
#[derive(Deserialize, Debug)]
pub struct ApiError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
