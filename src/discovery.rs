//! Turns raw search results into ranked candidate lists and picks the parent
//! page for auto-setup.
use std::cmp::Reverse;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::compat;
use crate::error::SyncError;
use crate::model::{ParentType, WorkspaceDatabase, WorkspacePage};
use crate::notion::model::SearchItem;

/// Candidate parent pages shown to the user; discovery never returns more.
pub const PAGE_LIMIT: usize = 15;

static JOB_KEYWORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)jobs?|careers?|hiring|求職|工作|職缺").expect("keyword regex"));

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn rich_text_content(fragment: &Value) -> Option<String> {
    let text = fragment.get("text")?.get("content")?.as_str()?;
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn title_property_content(prop: &Value) -> Option<String> {
    prop.get("title")?.as_array()?.first().and_then(rich_text_content)
}

/// Best-effort page title: the `title` property, then `Name`, then the first
/// property typed as a title. Pages where none resolves are unusable.
fn page_title(item: &SearchItem) -> Option<String> {
    if let Some(t) = item.properties.get("title").and_then(title_property_content) {
        return Some(t);
    }
    if let Some(t) = item.properties.get("Name").and_then(title_property_content) {
        return Some(t);
    }
    item.properties
        .values()
        .find(|p| p.get("type").and_then(Value::as_str) == Some("title"))
        .and_then(title_property_content)
}

fn database_title(item: &SearchItem) -> String {
    item.title
        .first()
        .and_then(rich_text_content)
        .or_else(|| {
            item.title
                .first()
                .and_then(|f| f.get("plain_text"))
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("Database {}", short_id(&item.id)))
}

fn parent_type(item: &SearchItem) -> ParentType {
    item.parent
        .as_ref()
        .map(|p| ParentType::from_wire(&p.typ))
        .unwrap_or(ParentType::Unknown)
}

fn edited_at(item: &SearchItem) -> DateTime<Utc> {
    item.last_edited_time.unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Rank pages for parent selection: workspace-level pages first, then by
/// recency. Archived and untitled pages are dropped; at most [`PAGE_LIMIT`]
/// survive.
pub fn rank_pages(items: Vec<SearchItem>) -> Vec<WorkspacePage> {
    let mut pages: Vec<WorkspacePage> = items
        .into_iter()
        .filter(|item| item.object == "page" && !item.archived)
        .filter_map(|item| {
            let title = page_title(&item)?;
            Some(WorkspacePage {
                title,
                parent_type: parent_type(&item),
                last_edited_time: edited_at(&item),
                url: item.url,
                id: item.id,
            })
        })
        .collect();
    pages.sort_by_key(|p| {
        let tier = if p.parent_type == ParentType::Workspace { 0u8 } else { 1 };
        (tier, Reverse(p.last_edited_time))
    });
    pages.truncate(PAGE_LIMIT);
    pages
}

/// Rank databases best match first. With `parent_page_id` set, only direct
/// children of that page are kept.
pub fn rank_databases(items: Vec<SearchItem>, parent_page_id: Option<&str>) -> Vec<WorkspaceDatabase> {
    let mut databases: Vec<WorkspaceDatabase> = items
        .into_iter()
        .filter(|item| item.object == "database" && !item.archived)
        .filter_map(|item| {
            let db_parent = item.parent.as_ref().and_then(|p| p.page_id.clone());
            if let Some(wanted) = parent_page_id {
                if db_parent.as_deref() != Some(wanted) {
                    return None;
                }
            }
            let field_names: Vec<String> = item.properties.keys().cloned().collect();
            let compatibility = compat::score(&field_names);
            Some(WorkspaceDatabase {
                title: database_title(&item),
                field_names,
                parent_page_id: db_parent,
                last_edited_time: edited_at(&item),
                url: item.url,
                compatibility,
                id: item.id,
            })
        })
        .collect();
    databases.sort_by_key(|d| (d.compatibility.level, Reverse(d.last_edited_time)));
    databases
}

/// Pick the parent page for a new database.
///
/// Priority: any workspace-level page, then a page whose title mentions job
/// hunting, then the most recently edited page. The input keeps discovery
/// order, so ties resolve to the earlier candidate.
pub fn select_parent_page(pages: &[WorkspacePage]) -> Result<&WorkspacePage, SyncError> {
    if pages.is_empty() {
        return Err(SyncError::NoPagesAvailable);
    }
    if let Some(page) = pages.iter().find(|p| p.parent_type == ParentType::Workspace) {
        return Ok(page);
    }
    if let Some(page) = pages.iter().find(|p| JOB_KEYWORDS.is_match(&p.title)) {
        return Ok(page);
    }
    let mut by_recency: Vec<&WorkspacePage> = pages.iter().collect();
    by_recency.sort_by_key(|p| Reverse(p.last_edited_time));
    Ok(by_recency[0])
}
