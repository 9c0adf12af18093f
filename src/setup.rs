//! One-shot destination setup: pick a parent page, then either surface the
//! existing databases under it for a user choice or create a fresh one.
//!
//! Persistence is all-or-nothing per branch. A creation failure leaves the
//! previously stored configuration untouched.
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::discovery;
use crate::error::SyncError;
use crate::fields::Lang;
use crate::model::{WorkspaceDatabase, WorkspacePage};
use crate::notion::model::CreatedDatabase;
use crate::notion::WorkspaceService;
use crate::store::{keys, SettingsStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SetupMode {
    /// Existing databases were found; the user has to pick one.
    UserSelect,
    AutoCreated,
}

impl SetupMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SetupMode::UserSelect => "user-select",
            SetupMode::AutoCreated => "auto-created",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SetupOutcome {
    pub mode: SetupMode,
    pub parent: WorkspacePage,
    /// Ranked candidates, only for [`SetupMode::UserSelect`].
    pub candidates: Vec<WorkspaceDatabase>,
    /// The new database, only for [`SetupMode::AutoCreated`].
    pub created: Option<CreatedDatabase>,
}

/// Run the whole setup workflow with a valid token.
///
/// `database_name` overrides the catalog default when a database has to be
/// created.
#[instrument(skip_all, fields(lang = %lang))]
pub async fn run(
    svc: &dyn WorkspaceService,
    store: &SettingsStore,
    token: &str,
    database_name: Option<&str>,
    lang: Lang,
) -> Result<SetupOutcome, SyncError> {
    let pages = svc.list_pages(token).await?;
    if pages.is_empty() {
        return Err(SyncError::SetupFailed(
            "no pages are shared with the integration".into(),
        ));
    }
    let parent = discovery::select_parent_page(&pages)?.clone();
    info!(parent = %parent.title, "selected parent page");

    let databases = svc.list_databases(token, Some(&parent.id)).await?;
    if !databases.is_empty() {
        let candidates_json = serde_json::to_string(&databases)
            .map_err(|e| SyncError::SetupFailed(format!("cannot encode candidate list: {e}")))?;
        // Stale destination keys are cleared so nothing points at a database
        // the user has not confirmed.
        store
            .persist(&[
                (keys::TOKEN, Some(token.to_string())),
                (keys::SELECTED_PARENT_PAGE_ID, Some(parent.id.clone())),
                (keys::AVAILABLE_DATABASES, Some(candidates_json)),
                (keys::DATABASE_ID, None),
                (keys::DATABASE_NAME, None),
            ])
            .await?;
        info!(count = databases.len(), "existing databases found; waiting for a choice");
        return Ok(SetupOutcome {
            mode: SetupMode::UserSelect,
            parent,
            candidates: databases,
            created: None,
        });
    }

    let name = database_name
        .map(str::to_string)
        .unwrap_or_else(|| lang.catalog().default_database_name.to_string());
    let created = svc.create_database(token, &parent.id, &name, lang).await?;
    store
        .persist(&[
            (keys::TOKEN, Some(token.to_string())),
            (keys::DATABASE_ID, Some(created.id.clone())),
            (keys::DATABASE_NAME, Some(name.clone())),
            (keys::SELECTED_PARENT_PAGE_ID, Some(parent.id.clone())),
            (keys::AVAILABLE_DATABASES, None),
        ])
        .await?;
    info!(database = %created.id, name = %name, "destination database created");
    Ok(SetupOutcome {
        mode: SetupMode::AutoCreated,
        parent,
        candidates: Vec::new(),
        created: Some(created),
    })
}

/// Commit a database choice after a user-select setup run.
#[instrument(skip_all, fields(database_id))]
pub async fn commit_database_choice(
    store: &SettingsStore,
    database_id: &str,
    database_name: Option<&str>,
) -> Result<(), SyncError> {
    let candidates = store.available_databases().await?;
    let known = candidates.iter().find(|d| d.id == database_id);
    if known.is_none() && !candidates.is_empty() {
        warn!(database_id, "chosen database is not in the stored candidate list");
    }
    let name = known
        .map(|d| d.title.clone())
        .or_else(|| database_name.map(str::to_string));
    store
        .persist(&[
            (keys::DATABASE_ID, Some(database_id.to_string())),
            (keys::DATABASE_NAME, name),
            (keys::AVAILABLE_DATABASES, None),
        ])
        .await?;
    info!(database_id, "destination database selected");
    Ok(())
}
