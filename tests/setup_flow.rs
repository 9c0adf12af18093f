use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::Value;
use tokio::sync::Mutex;

use jobsync::compat;
use jobsync::error::SyncError;
use jobsync::fields::Lang;
use jobsync::model::{ParentType, WorkspaceDatabase, WorkspacePage};
use jobsync::notion::model::{CreatedDatabase, CreatedPage};
use jobsync::notion::WorkspaceService;
use jobsync::setup::{self, SetupMode};
use jobsync::store::{keys, SettingsStore};

async fn memory_store() -> SettingsStore {
    SettingsStore::open("sqlite::memory:").await.unwrap()
}

fn page(id: &str, title: &str, parent_type: ParentType, day: u32) -> WorkspacePage {
    WorkspacePage {
        id: id.into(),
        title: title.into(),
        parent_type,
        last_edited_time: Utc.with_ymd_and_hms(2024, 5, day, 0, 0, 0).unwrap(),
        url: None,
    }
}

fn database(id: &str, title: &str, field_names: &[&str]) -> WorkspaceDatabase {
    let field_names: Vec<String> = field_names.iter().map(|s| s.to_string()).collect();
    WorkspaceDatabase {
        id: id.into(),
        title: title.into(),
        compatibility: compat::score(&field_names),
        field_names,
        parent_page_id: Some("page-1".into()),
        last_edited_time: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
        url: None,
    }
}

#[derive(Clone, Default)]
struct RecordingWorkspace {
    pages: Arc<Mutex<VecDeque<Result<Vec<WorkspacePage>, SyncError>>>>,
    databases: Arc<Mutex<VecDeque<Result<Vec<WorkspaceDatabase>, SyncError>>>>,
    creations: Arc<Mutex<VecDeque<Result<CreatedDatabase, SyncError>>>>,
    create_calls: Arc<Mutex<Vec<(String, String, Lang)>>>,
    database_queries: Arc<Mutex<Vec<Option<String>>>>,
}

impl RecordingWorkspace {
    async fn create_calls(&self) -> Vec<(String, String, Lang)> {
        self.create_calls.lock().await.clone()
    }

    async fn database_queries(&self) -> Vec<Option<String>> {
        self.database_queries.lock().await.clone()
    }
}

#[async_trait]
impl WorkspaceService for RecordingWorkspace {
    async fn list_pages(&self, _token: &str) -> Result<Vec<WorkspacePage>, SyncError> {
        self.pages.lock().await.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn list_databases(
        &self,
        _token: &str,
        parent_page_id: Option<&str>,
    ) -> Result<Vec<WorkspaceDatabase>, SyncError> {
        self.database_queries.lock().await.push(parent_page_id.map(str::to_string));
        self.databases.lock().await.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn create_database(
        &self,
        _token: &str,
        parent_page_id: &str,
        name: &str,
        lang: Lang,
    ) -> Result<CreatedDatabase, SyncError> {
        self.create_calls.lock().await.push((parent_page_id.into(), name.into(), lang));
        self.creations
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(CreatedDatabase { id: "db-created".into(), url: None }))
    }

    async fn create_page(&self, _token: &str, _body: &Value) -> Result<CreatedPage, SyncError> {
        Ok(CreatedPage { id: "page-created".into(), url: None })
    }

    async fn database_fields(
        &self,
        _token: &str,
        _database_id: &str,
    ) -> Result<Vec<String>, SyncError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn existing_databases_become_candidates() {
    let store = memory_store().await;
    // Stale destination from an earlier connection should not survive setup.
    store
        .persist(&[
            (keys::DATABASE_ID, Some("db-stale".into())),
            (keys::DATABASE_NAME, Some("Old tracker".into())),
        ])
        .await
        .unwrap();

    let svc = RecordingWorkspace::default();
    svc.pages.lock().await.push_back(Ok(vec![
        page("page-sub", "Notes", ParentType::PageId, 20),
        page("page-root", "Projects", ParentType::Workspace, 2),
    ]));
    svc.databases.lock().await.push_back(Ok(vec![
        database("db-1", "求職追蹤", &["職位名稱", "公司", "狀態", "地點", "薪資", "連結", "AI 處理"]),
        database("db-2", "Reading list", &["Name", "Author"]),
    ]));

    let outcome = setup::run(&svc, &store, "tok-1", None, Lang::Zh).await.unwrap();

    assert_eq!(outcome.mode, SetupMode::UserSelect);
    // Top-level pages win over more recently edited sub-pages.
    assert_eq!(outcome.parent.id, "page-root");
    assert_eq!(outcome.candidates.len(), 2);
    assert!(outcome.created.is_none());
    assert_eq!(svc.database_queries().await, vec![Some("page-root".to_string())]);
    assert!(svc.create_calls().await.is_empty());

    assert_eq!(store.get(keys::TOKEN).await.unwrap().as_deref(), Some("tok-1"));
    assert_eq!(
        store.get(keys::SELECTED_PARENT_PAGE_ID).await.unwrap().as_deref(),
        Some("page-root")
    );
    assert_eq!(store.get(keys::DATABASE_ID).await.unwrap(), None);
    assert_eq!(store.get(keys::DATABASE_NAME).await.unwrap(), None);

    let candidates = store.available_databases().await.unwrap();
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].id, "db-1");
}

#[tokio::test]
async fn empty_workspace_creates_database() {
    let store = memory_store().await;
    let svc = RecordingWorkspace::default();
    svc.pages
        .lock()
        .await
        .push_back(Ok(vec![page("page-1", "Job hunt", ParentType::Workspace, 1)]));
    svc.databases.lock().await.push_back(Ok(Vec::new()));
    svc.creations
        .lock()
        .await
        .push_back(Ok(CreatedDatabase { id: "db-new".into(), url: Some("https://n/db-new".into()) }));

    let outcome = setup::run(&svc, &store, "tok-1", None, Lang::Zh).await.unwrap();

    assert_eq!(outcome.mode, SetupMode::AutoCreated);
    assert_eq!(outcome.created.as_ref().map(|c| c.id.as_str()), Some("db-new"));
    assert_eq!(
        svc.create_calls().await,
        vec![("page-1".to_string(), "求職追蹤資料庫".to_string(), Lang::Zh)]
    );

    assert_eq!(store.get(keys::TOKEN).await.unwrap().as_deref(), Some("tok-1"));
    assert_eq!(store.get(keys::DATABASE_ID).await.unwrap().as_deref(), Some("db-new"));
    assert_eq!(store.get(keys::DATABASE_NAME).await.unwrap().as_deref(), Some("求職追蹤資料庫"));
    assert_eq!(
        store.get(keys::SELECTED_PARENT_PAGE_ID).await.unwrap().as_deref(),
        Some("page-1")
    );
    assert!(store.available_databases().await.unwrap().is_empty());
}

#[tokio::test]
async fn named_database_overrides_catalog_default() {
    let store = memory_store().await;
    let svc = RecordingWorkspace::default();
    svc.pages
        .lock()
        .await
        .push_back(Ok(vec![page("page-1", "Career", ParentType::Workspace, 1)]));
    svc.databases.lock().await.push_back(Ok(Vec::new()));

    setup::run(&svc, &store, "tok-1", Some("My Jobs"), Lang::En).await.unwrap();

    assert_eq!(
        svc.create_calls().await,
        vec![("page-1".to_string(), "My Jobs".to_string(), Lang::En)]
    );
    assert_eq!(store.get(keys::DATABASE_NAME).await.unwrap().as_deref(), Some("My Jobs"));
}

#[tokio::test]
async fn creation_failure_leaves_config_untouched() {
    let store = memory_store().await;
    store
        .persist(&[
            (keys::TOKEN, Some("tok-old".into())),
            (keys::DATABASE_ID, Some("db-old".into())),
        ])
        .await
        .unwrap();

    let svc = RecordingWorkspace::default();
    svc.pages
        .lock()
        .await
        .push_back(Ok(vec![page("page-1", "Job hunt", ParentType::Workspace, 1)]));
    svc.databases.lock().await.push_back(Ok(Vec::new()));
    svc.creations
        .lock()
        .await
        .push_back(Err(SyncError::DatabaseCreationFailed("403: restricted".into())));

    let err = setup::run(&svc, &store, "tok-new", None, Lang::Zh).await.unwrap_err();
    assert!(matches!(err, SyncError::DatabaseCreationFailed(_)));

    // Nothing was persisted, the old connection still works.
    assert_eq!(store.get(keys::TOKEN).await.unwrap().as_deref(), Some("tok-old"));
    assert_eq!(store.get(keys::DATABASE_ID).await.unwrap().as_deref(), Some("db-old"));
}

#[tokio::test]
async fn no_shared_pages_fails_setup() {
    let store = memory_store().await;
    let svc = RecordingWorkspace::default();
    svc.pages.lock().await.push_back(Ok(Vec::new()));

    let err = setup::run(&svc, &store, "tok-1", None, Lang::Zh).await.unwrap_err();
    assert!(matches!(err, SyncError::SetupFailed(_)));
    assert!(store.snapshot().await.unwrap().is_empty());
    assert!(svc.database_queries().await.is_empty());
}

#[tokio::test]
async fn commit_database_choice_stores_candidate_title() {
    let store = memory_store().await;
    let candidates = vec![
        database("db-1", "求職追蹤", &["職位名稱", "公司", "狀態"]),
        database("db-2", "Backup", &["職位名稱", "公司", "狀態"]),
    ];
    store
        .persist(&[(
            keys::AVAILABLE_DATABASES,
            Some(serde_json::to_string(&candidates).unwrap()),
        )])
        .await
        .unwrap();

    setup::commit_database_choice(&store, "db-1", None).await.unwrap();

    assert_eq!(store.get(keys::DATABASE_ID).await.unwrap().as_deref(), Some("db-1"));
    assert_eq!(store.get(keys::DATABASE_NAME).await.unwrap().as_deref(), Some("求職追蹤"));
    // The pending list is consumed by the choice.
    assert!(store.available_databases().await.unwrap().is_empty());
}

#[tokio::test]
async fn commit_unknown_database_keeps_explicit_name() {
    let store = memory_store().await;
    setup::commit_database_choice(&store, "db-outside", Some("Hand-picked")).await.unwrap();
    assert_eq!(store.get(keys::DATABASE_ID).await.unwrap().as_deref(), Some("db-outside"));
    assert_eq!(store.get(keys::DATABASE_NAME).await.unwrap().as_deref(), Some("Hand-picked"));
}
