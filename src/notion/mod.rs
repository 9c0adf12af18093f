use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode, Url};
use serde_json::{json, Map, Value};
use std::fmt;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::discovery;
use crate::error::SyncError;
use crate::fields::Lang;
use crate::model::{WorkspaceDatabase, WorkspacePage};
use crate::notion::model::{
    ApiError, BotUser, CreatedDatabase, CreatedPage, RetrieveDatabaseResp, SearchResp, TokenGrant,
    TokenResp,
};

pub mod model;

const NOTION_API_BASE: &str = "https://api.notion.com/";

/// OAuth application credentials, needed only for the token endpoints.
#[derive(Clone)]
pub struct OauthApp {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Clone)]
pub struct NotionClient {
    http: Client,
    base_url: Url,
    version: String,
    oauth: Option<OauthApp>,
}

impl fmt::Debug for NotionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotionClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Workspace operations the engine needs. Implemented by [`NotionClient`];
/// tests substitute recording fakes.
#[async_trait]
pub trait WorkspaceService: Send + Sync {
    async fn list_pages(&self, token: &str) -> Result<Vec<WorkspacePage>, SyncError>;

    async fn list_databases(
        &self,
        token: &str,
        parent_page_id: Option<&str>,
    ) -> Result<Vec<WorkspaceDatabase>, SyncError>;

    async fn create_database(
        &self,
        token: &str,
        parent_page_id: &str,
        name: &str,
        lang: Lang,
    ) -> Result<CreatedDatabase, SyncError>;

    async fn create_page(&self, token: &str, body: &Value) -> Result<CreatedPage, SyncError>;

    /// Property names of a database schema, for language detection and
    /// compatibility scoring.
    async fn database_fields(
        &self,
        token: &str,
        database_id: &str,
    ) -> Result<Vec<String>, SyncError>;
}

/// The OAuth token endpoints, split from [`WorkspaceService`] so session
/// tests can fake grants without faking the whole workspace.
#[async_trait]
pub trait TokenService: Send + Sync {
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenGrant, SyncError>;

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, SyncError>;
}

impl NotionClient {
    pub fn new(version: String) -> Self {
        let base_url = Url::parse(NOTION_API_BASE).expect("valid default Notion URL");
        Self::with_base_url(version, base_url)
    }

    pub fn with_base_url(version: String, base_url: Url) -> Self {
        let http = Client::builder()
            .user_agent("jobsync/0.1")
            .no_proxy()
            .build()
            .expect("reqwest client");
        Self { http, base_url, version, oauth: None }
    }

    pub fn from_config(cfg: &Config) -> Self {
        let mut client = Self::new(cfg.notion.version.clone());
        if !cfg.oauth.client_id.is_empty() {
            client = client.with_oauth(OauthApp {
                client_id: cfg.oauth.client_id.clone(),
                client_secret: cfg.oauth.client_secret.clone(),
            });
        }
        client
    }

    pub fn with_oauth(mut self, oauth: OauthApp) -> Self {
        self.oauth = Some(oauth);
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url, SyncError> {
        self.base_url
            .join(path)
            .map_err(|e| SyncError::BadUrl(format!("{path}: {e}")))
    }

    /// Build the page-creation request; separated out so header conventions
    /// stay testable without a live endpoint.
    pub fn page_request(&self, token: &str, body: &Value) -> Result<reqwest::Request, SyncError> {
        let endpoint = self.endpoint("v1/pages")?;
        self.http
            .post(endpoint)
            .header("Authorization", format!("Bearer {token}"))
            .header("Notion-Version", &self.version)
            .header("Content-Type", "application/json")
            .json(body)
            .build()
            .map_err(SyncError::Http)
    }

    async fn execute(&self, request: reqwest::Request) -> Result<(StatusCode, String), SyncError> {
        debug!(url = %request.url(), method = %request.method(), "notion api request");
        let res = self.http.execute(request).await?;
        let status = res.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("rate limited by notion");
        }
        let body = res.text().await?;
        Ok((status, body))
    }

    async fn search(&self, token: &str, object: &str) -> Result<SearchResp, SyncError> {
        let body = json!({
            "filter": { "property": "object", "value": object },
            "sort": { "direction": "descending", "timestamp": "last_edited_time" },
        });
        let endpoint = self.endpoint("v1/search")?;
        let request = self
            .http
            .post(endpoint)
            .header("Authorization", format!("Bearer {token}"))
            .header("Notion-Version", &self.version)
            .header("Content-Type", "application/json")
            .json(&body)
            .build()
            .map_err(SyncError::Http)?;
        let (status, body) = self.execute(request).await?;
        if !status.is_success() {
            return Err(SyncError::DiscoveryFailed(format!(
                "search for {object}s returned {status}: {}",
                api_message(&body)
            )));
        }
        let resp: SearchResp = serde_json::from_str(&body)
            .map_err(|e| SyncError::DiscoveryFailed(format!("invalid search response: {e}")))?;
        if resp.has_more {
            debug!(object, "search result truncated to the first page");
        }
        Ok(resp)
    }

    pub async fn retrieve_database(
        &self,
        token: &str,
        database_id: &str,
    ) -> Result<RetrieveDatabaseResp, SyncError> {
        let endpoint = self.endpoint(&format!("v1/databases/{database_id}"))?;
        let res = self
            .http
            .get(endpoint)
            .header("Authorization", format!("Bearer {token}"))
            .header("Notion-Version", &self.version)
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(SyncError::DiscoveryFailed(format!(
                "retrieve database returned {status}: {}",
                api_message(&body)
            )));
        }
        Ok(res.json::<RetrieveDatabaseResp>().await?)
    }

    /// Probe the token against `/v1/users/me`.
    pub async fn current_user(&self, token: &str) -> Result<BotUser, SyncError> {
        let endpoint = self.endpoint("v1/users/me")?;
        let res = self
            .http
            .get(endpoint)
            .header("Authorization", format!("Bearer {token}"))
            .header("Notion-Version", &self.version)
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(SyncError::AuthorizationError(format!(
                "token check returned {status}: {}",
                api_message(&body)
            )));
        }
        Ok(res.json::<BotUser>().await?)
    }

    async fn token_endpoint(&self, body: Value) -> Result<TokenGrant, SyncError> {
        let Some(oauth) = &self.oauth else {
            return Err(SyncError::AuthorizationError(
                "oauth client credentials are not configured".into(),
            ));
        };
        let endpoint = self.endpoint("v1/oauth/token")?;
        let res = self
            .http
            .post(endpoint)
            .basic_auth(&oauth.client_id, Some(&oauth.client_secret))
            .header("Notion-Version", &self.version)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!(%status, "token endpoint rejected the request");
            return Err(SyncError::TokenExchangeFailed {
                status: status.as_u16(),
                message: api_message(&body),
            });
        }
        let resp: TokenResp = res.json().await?;
        Ok(TokenGrant::from_resp(resp, Utc::now()))
    }
}

#[async_trait]
impl WorkspaceService for NotionClient {
    async fn list_pages(&self, token: &str) -> Result<Vec<WorkspacePage>, SyncError> {
        let resp = self.search(token, "page").await?;
        let pages = discovery::rank_pages(resp.results);
        debug!(count = pages.len(), "workspace pages discovered");
        Ok(pages)
    }

    async fn list_databases(
        &self,
        token: &str,
        parent_page_id: Option<&str>,
    ) -> Result<Vec<WorkspaceDatabase>, SyncError> {
        let resp = self.search(token, "database").await?;
        let databases = discovery::rank_databases(resp.results, parent_page_id);
        debug!(count = databases.len(), "workspace databases discovered");
        Ok(databases)
    }

    async fn create_database(
        &self,
        token: &str,
        parent_page_id: &str,
        name: &str,
        lang: Lang,
    ) -> Result<CreatedDatabase, SyncError> {
        let body = build_database_request(parent_page_id, name, lang);
        let endpoint = self.endpoint("v1/databases")?;
        let request = self
            .http
            .post(endpoint)
            .header("Authorization", format!("Bearer {token}"))
            .header("Notion-Version", &self.version)
            .header("Content-Type", "application/json")
            .json(&body)
            .build()
            .map_err(|e| SyncError::DatabaseCreationFailed(e.to_string()))?;
        let (status, body) = self
            .execute(request)
            .await
            .map_err(|e| SyncError::DatabaseCreationFailed(e.to_string()))?;
        if !status.is_success() {
            warn!(%status, "database creation rejected");
            return Err(SyncError::DatabaseCreationFailed(format!(
                "{status}: {}",
                api_message(&body)
            )));
        }
        let created: CreatedDatabase = serde_json::from_str(&body)
            .map_err(|e| SyncError::DatabaseCreationFailed(format!("invalid response: {e}")))?;
        info!(database = %created.id, "created database");
        Ok(created)
    }

    async fn create_page(&self, token: &str, body: &Value) -> Result<CreatedPage, SyncError> {
        let request = self.page_request(token, body)?;
        let (status, body) = self.execute(request).await?;
        if !status.is_success() {
            warn!(%status, "page creation rejected");
            return Err(SyncError::UploadFailed(format!("{status}: {}", api_message(&body))));
        }
        let created: CreatedPage = serde_json::from_str(&body)
            .map_err(|e| SyncError::UploadFailed(format!("invalid response: {e}")))?;
        info!(page = %created.id, "created page");
        Ok(created)
    }

    async fn database_fields(
        &self,
        token: &str,
        database_id: &str,
    ) -> Result<Vec<String>, SyncError> {
        let db = self.retrieve_database(token, database_id).await?;
        Ok(db.properties.keys().cloned().collect())
    }
}

#[async_trait]
impl TokenService for NotionClient {
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenGrant, SyncError> {
        self.token_endpoint(json!({
            "grant_type": "authorization_code",
            "code": code,
            "redirect_uri": redirect_uri,
        }))
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, SyncError> {
        self.token_endpoint(json!({
            "grant_type": "refresh_token",
            "refresh_token": refresh_token,
        }))
        .await
    }
}

/// Prefer the server's structured message over the raw body.
fn api_message(body: &str) -> String {
    match serde_json::from_str::<ApiError>(body) {
        Ok(ApiError { message: Some(m), .. }) => m,
        _ => body.to_string(),
    }
}

fn select_options(options: &[(&str, &str)]) -> Value {
    let options: Vec<Value> = options
        .iter()
        .map(|(name, color)| json!({ "name": name, "color": color }))
        .collect();
    json!({ "select": { "options": options } })
}

/// Schema payload for a new job-tracking database under the given page.
pub fn build_database_request(parent_page_id: &str, name: &str, lang: Lang) -> Value {
    let f = lang.catalog();
    let mut properties = Map::new();
    properties.insert(f.job_title.into(), json!({ "title": {} }));
    for field in [
        f.company,
        f.location,
        f.salary,
        f.responsibilities,
        f.required_skills,
        f.preferred_skills,
        f.tools_frameworks,
        f.language_requirements,
        f.soft_skills,
        f.industry_domains,
        f.benefits_highlights,
        f.original_experience,
        f.ai_model,
    ] {
        properties.insert(field.into(), json!({ "rich_text": {} }));
    }
    properties.insert(
        f.job_type.into(),
        select_options(&[
            (f.job_type_full_time, "blue"),
            (f.job_type_part_time, "green"),
            (f.job_type_contract, "orange"),
            (f.job_type_internship, "yellow"),
            (f.job_type_remote, "purple"),
        ]),
    );
    properties.insert(f.min_experience_years.into(), json!({ "number": { "format": "number" } }));
    properties.insert(
        f.experience_level.into(),
        select_options(&[
            ("Entry", "green"),
            ("Junior", "blue"),
            ("Mid-level", "orange"),
            ("Senior", "red"),
            ("Lead", "purple"),
        ]),
    );
    properties.insert(
        f.education_requirement.into(),
        select_options(&[
            ("High School", "gray"),
            ("Associate", "blue"),
            ("Bachelor", "green"),
            ("Master", "orange"),
            ("PhD", "red"),
        ]),
    );
    properties.insert(
        f.status.into(),
        select_options(&[
            (f.status_pending, "yellow"),
            (f.status_applied, "blue"),
            (f.status_interview, "orange"),
            (f.status_accepted, "green"),
            (f.status_rejected, "red"),
            (f.status_not_suitable, "gray"),
        ]),
    );
    properties.insert(
        f.priority.into(),
        select_options(&[
            (f.priority_high, "red"),
            (f.priority_medium, "orange"),
            (f.priority_low, "gray"),
        ]),
    );
    properties.insert(f.link.into(), json!({ "url": {} }));
    properties.insert(f.scrape_time.into(), json!({ "date": {} }));
    properties.insert(f.ai_processed.into(), json!({ "checkbox": {} }));

    json!({
        "parent": { "type": "page_id", "page_id": parent_page_id },
        "icon": { "type": "emoji", "emoji": "💼" },
        "title": [ { "type": "text", "text": { "content": name } } ],
        "properties": Value::Object(properties),
    })
}
