use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use jobsync::error::SyncError;
use jobsync::fields::Lang;
use jobsync::model::{JobPosting, JobRecord, SyncConfig, WorkspaceDatabase, WorkspacePage};
use jobsync::notion::model::{CreatedDatabase, CreatedPage};
use jobsync::notion::WorkspaceService;
use jobsync::sync;

fn config(database_id: Option<&str>) -> SyncConfig {
    SyncConfig {
        token: "tok-1".into(),
        database_id: database_id.map(str::to_string),
        database_name: None,
        selected_parent_page_id: None,
    }
}

fn record() -> JobRecord {
    JobRecord::Scraped(JobPosting {
        title: Some("Backend Engineer".into()),
        company: Some("Acme".into()),
        ..JobPosting::default()
    })
}

#[derive(Clone, Default)]
struct RecordingWorkspace {
    fields: Arc<Mutex<VecDeque<Result<Vec<String>, SyncError>>>>,
    pages: Arc<Mutex<VecDeque<Result<CreatedPage, SyncError>>>>,
    field_queries: Arc<Mutex<Vec<String>>>,
    page_bodies: Arc<Mutex<Vec<Value>>>,
}

impl RecordingWorkspace {
    async fn field_queries(&self) -> Vec<String> {
        self.field_queries.lock().await.clone()
    }

    async fn page_bodies(&self) -> Vec<Value> {
        self.page_bodies.lock().await.clone()
    }
}

#[async_trait]
impl WorkspaceService for RecordingWorkspace {
    async fn list_pages(&self, _token: &str) -> Result<Vec<WorkspacePage>, SyncError> {
        Ok(Vec::new())
    }

    async fn list_databases(
        &self,
        _token: &str,
        _parent_page_id: Option<&str>,
    ) -> Result<Vec<WorkspaceDatabase>, SyncError> {
        Ok(Vec::new())
    }

    async fn create_database(
        &self,
        _token: &str,
        _parent_page_id: &str,
        _name: &str,
        _lang: Lang,
    ) -> Result<CreatedDatabase, SyncError> {
        Ok(CreatedDatabase { id: "db-created".into(), url: None })
    }

    async fn create_page(&self, _token: &str, body: &Value) -> Result<CreatedPage, SyncError> {
        self.page_bodies.lock().await.push(body.clone());
        self.pages
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(CreatedPage { id: "page-1".into(), url: None }))
    }

    async fn database_fields(
        &self,
        _token: &str,
        database_id: &str,
    ) -> Result<Vec<String>, SyncError> {
        self.field_queries.lock().await.push(database_id.to_string());
        self.fields.lock().await.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

fn en_fields() -> Vec<String> {
    ["Job Title", "Company", "Status", "Location", "Salary", "Link", "AI Processed"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[tokio::test]
async fn destination_language_overrides_requested() {
    let svc = RecordingWorkspace::default();
    svc.fields.lock().await.push_back(Ok(en_fields()));

    let page = sync::upload(&svc, &record(), &config(Some("db-1")), Lang::Zh).await.unwrap();
    assert_eq!(page.id, "page-1");
    assert_eq!(svc.field_queries().await, vec!["db-1".to_string()]);

    let bodies = svc.page_bodies().await;
    assert_eq!(bodies.len(), 1);
    let body = &bodies[0];
    assert_eq!(body["parent"]["database_id"], "db-1");
    // The English schema was detected even though Chinese was requested.
    assert!(body["properties"].get("Job Title").is_some());
    assert!(body["properties"].get("職位名稱").is_none());
}

#[tokio::test]
async fn unrecognized_schema_falls_back_to_requested() {
    let svc = RecordingWorkspace::default();
    svc.fields
        .lock()
        .await
        .push_back(Ok(vec!["Name".to_string(), "Tags".to_string()]));

    sync::upload(&svc, &record(), &config(Some("db-1")), Lang::Zh).await.unwrap();

    let bodies = svc.page_bodies().await;
    assert!(bodies[0]["properties"].get("職位名稱").is_some());
}

#[tokio::test]
async fn schema_fetch_failure_uses_requested_language() {
    let svc = RecordingWorkspace::default();
    svc.fields
        .lock()
        .await
        .push_back(Err(SyncError::DiscoveryFailed("database not shared".into())));

    let page = sync::upload(&svc, &record(), &config(Some("db-1")), Lang::En).await.unwrap();
    assert_eq!(page.id, "page-1");

    let bodies = svc.page_bodies().await;
    assert!(bodies[0]["properties"].get("Job Title").is_some());
}

#[tokio::test]
async fn missing_destination_fails_without_api_calls() {
    let svc = RecordingWorkspace::default();

    let err = sync::upload(&svc, &record(), &config(None), Lang::Zh).await.unwrap_err();
    assert!(matches!(err, SyncError::SetupFailed(_)));
    assert!(svc.field_queries().await.is_empty());
    assert!(svc.page_bodies().await.is_empty());
}

#[tokio::test]
async fn rejected_upload_surfaces() {
    let svc = RecordingWorkspace::default();
    svc.fields.lock().await.push_back(Ok(en_fields()));
    svc.pages
        .lock()
        .await
        .push_back(Err(SyncError::UploadFailed("400: body failed validation".into())));

    let err = sync::upload(&svc, &record(), &config(Some("db-1")), Lang::En).await.unwrap_err();
    assert!(matches!(err, SyncError::UploadFailed(_)));
}
