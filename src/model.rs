//! Domain model shared across the engine.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::compat::CompatibilityReport;

/// How the stored credential was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// Integration token pasted by the user; never expires, never refreshed.
    Manual,
    Oauth,
}

impl AuthMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthMethod::Manual => "manual",
            AuthMethod::Oauth => "oauth",
        }
    }

    /// Sessions persisted before the method marker existed are manual tokens.
    pub fn parse(s: &str) -> Self {
        match s {
            "oauth" => AuthMethod::Oauth,
            _ => AuthMethod::Manual,
        }
    }
}

/// A stored workspace credential plus its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Absent for manual tokens and for grants without an announced lifetime.
    pub expires_at: Option<DateTime<Utc>>,
    pub workspace_id: Option<String>,
    pub workspace_name: Option<String>,
    pub workspace_icon: Option<String>,
    pub auth_method: AuthMethod,
}

impl AuthSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(at) => now >= at,
            None => false,
        }
    }
}

/// Where a discovered object hangs in the workspace tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentType {
    Workspace,
    PageId,
    DatabaseId,
    Unknown,
}

impl ParentType {
    pub fn from_wire(t: &str) -> Self {
        match t {
            "workspace" => ParentType::Workspace,
            "page_id" => ParentType::PageId,
            "database_id" => ParentType::DatabaseId,
            _ => ParentType::Unknown,
        }
    }
}

/// A page usable as a parent for the destination database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspacePage {
    pub id: String,
    pub title: String,
    pub parent_type: ParentType,
    pub last_edited_time: DateTime<Utc>,
    pub url: Option<String>,
}

/// A discovered database together with its compatibility verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceDatabase {
    pub id: String,
    pub title: String,
    pub field_names: Vec<String>,
    pub parent_page_id: Option<String>,
    pub last_edited_time: DateTime<Utc>,
    pub url: Option<String>,
    pub compatibility: CompatibilityReport,
}

/// The scraped portion of a job record. Every field is optional; the
/// assembler substitutes catalog sentinels for anything missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobPosting {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub job_type: Option<String>,
    pub experience: Option<String>,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub benefits: Option<String>,
    pub url: Option<String>,
    pub scraped_at: Option<DateTime<Utc>>,
}

/// Structured output of the upstream AI analyzer. Narrative fields are plain
/// text (possibly multi-paragraph); empty means the analyzer had nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiAnalysis {
    pub responsibilities: String,
    pub required_skills: String,
    pub preferred_skills: String,
    pub tools_frameworks: String,
    pub min_experience_years: Option<f64>,
    pub experience_level: String,
    pub education_requirement: String,
    pub language_requirements: String,
    pub soft_skills: String,
    pub industry_domains: String,
    pub benefits_highlights: String,
    #[serde(rename = "aiProvider")]
    pub provider: String,
    #[serde(rename = "aiModel")]
    pub model: String,
}

impl AiAnalysis {
    /// `"provider:model"` tag written into the AI Model property.
    pub fn model_tag(&self) -> String {
        if self.model.is_empty() {
            String::new()
        } else {
            format!("{}:{}", self.provider, self.model)
        }
    }
}

/// A job record as handed to the sync executor. The variant decides which
/// properties and document sections exist; a plain scraped record gets no AI
/// markers at all.
#[derive(Debug, Clone, PartialEq)]
pub enum JobRecord {
    Scraped(JobPosting),
    Analyzed(JobPosting, AiAnalysis),
}

impl JobRecord {
    pub fn posting(&self) -> &JobPosting {
        match self {
            JobRecord::Scraped(p) | JobRecord::Analyzed(p, _) => p,
        }
    }

    pub fn analysis(&self) -> Option<&AiAnalysis> {
        match self {
            JobRecord::Scraped(_) => None,
            JobRecord::Analyzed(_, a) => Some(a),
        }
    }
}

/// Flat wire form of a record file: posting fields, the `aiProcessed` flag
/// and, when analyzed, the AI fields all at the top level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawJobRecord {
    #[serde(flatten)]
    pub posting: JobPosting,
    #[serde(default)]
    pub ai_processed: bool,
    #[serde(flatten)]
    pub analysis: AiAnalysis,
}

impl From<RawJobRecord> for JobRecord {
    fn from(raw: RawJobRecord) -> Self {
        if raw.ai_processed {
            JobRecord::Analyzed(raw.posting, raw.analysis)
        } else {
            JobRecord::Scraped(raw.posting)
        }
    }
}

/// Immutable snapshot of the destination configuration taken at the start of
/// a sync run. Settings written while a run is in flight do not affect it.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    pub token: String,
    pub database_id: Option<String>,
    pub database_name: Option<String>,
    pub selected_parent_page_id: Option<String>,
}
