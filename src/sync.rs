//! Executes one job-record upload against the configured destination.
use tracing::{debug, info, instrument, warn};

use crate::assemble;
use crate::compat;
use crate::error::SyncError;
use crate::fields::Lang;
use crate::model::{JobRecord, SyncConfig};
use crate::notion::model::CreatedPage;
use crate::notion::WorkspaceService;

/// Upload one record. The destination schema language is detected from the
/// database's property names; when detection is impossible the requested
/// language is used instead. Failures surface immediately; nothing retries.
#[instrument(skip_all, fields(requested = %requested))]
pub async fn upload(
    svc: &dyn WorkspaceService,
    record: &JobRecord,
    config: &SyncConfig,
    requested: Lang,
) -> Result<CreatedPage, SyncError> {
    let Some(database_id) = config.database_id.as_deref() else {
        return Err(SyncError::SetupFailed(
            "no destination database is configured; run setup first".into(),
        ));
    };

    let lang = match svc.database_fields(&config.token, database_id).await {
        Ok(names) => match compat::score(&names).language {
            Some(detected) => detected,
            None => {
                warn!("destination schema matches neither language; using the requested one");
                requested
            }
        },
        Err(err) => {
            warn!(error = %err, "schema fetch failed; using the requested language");
            requested
        }
    };
    debug!(lang = %lang, "assembling document");

    let payload = assemble::page_payload(record, database_id, lang);
    let page = svc.create_page(&config.token, &payload).await?;
    info!(page = %page.id, "job record synced");
    Ok(page)
}
