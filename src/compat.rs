//! Database compatibility scoring.
//!
//! A destination database is judged purely by which property names it carries;
//! property types are not inspected. The scorer also decides which schema
//! language the database speaks, which the assembler later uses to pick the
//! matching field catalog.
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::fields::{self, Lang};

/// Verdict levels, best first. The derived order is what database listings
/// sort by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompatLevel {
    /// All required fields plus at least three important ones.
    Perfect,
    /// All required fields.
    Good,
    /// At least two required fields.
    Partial,
    Poor,
}

impl CompatLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            CompatLevel::Perfect => "perfect",
            CompatLevel::Good => "good",
            CompatLevel::Partial => "partial",
            CompatLevel::Poor => "poor",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityReport {
    pub level: CompatLevel,
    /// `None` when no required field of either language is present; the
    /// database is then scored against the Chinese set.
    pub language: Option<Lang>,
    pub found_required: usize,
    pub found_important: usize,
    /// Required fields of the detected language that are absent.
    pub missing_fields: Vec<String>,
}

fn hits(names: &HashSet<&str>, wanted: &[&str]) -> usize {
    wanted.iter().filter(|w| names.contains(*w)).count()
}

/// Score a database by its property names.
///
/// Language detection counts required-field hits per language; the Chinese
/// set wins ties so that bilingual schemas get a stable verdict.
pub fn score(field_names: &[String]) -> CompatibilityReport {
    let names: HashSet<&str> = field_names.iter().map(String::as_str).collect();

    let zh_required = hits(&names, &fields::required_fields(Lang::Zh));
    let en_required = hits(&names, &fields::required_fields(Lang::En));

    let language = if zh_required == 0 && en_required == 0 {
        None
    } else if zh_required >= en_required {
        Some(Lang::Zh)
    } else {
        Some(Lang::En)
    };
    let scored_as = language.unwrap_or(Lang::Zh);

    let required = fields::required_fields(scored_as);
    let important = fields::important_fields(scored_as);
    let found_required = hits(&names, &required);
    let found_important = hits(&names, &important);
    let missing_fields: Vec<String> = required
        .iter()
        .filter(|w| !names.contains(*w))
        .map(|w| w.to_string())
        .collect();

    let level = if found_required == required.len() && found_important >= 3 {
        CompatLevel::Perfect
    } else if found_required == required.len() {
        CompatLevel::Good
    } else if found_required >= 2 {
        CompatLevel::Partial
    } else {
        CompatLevel::Poor
    };

    CompatibilityReport { level, language, found_required, found_important, missing_fields }
}
