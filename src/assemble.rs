//! Assembles the Notion page payload for one job record: the property map
//! and the document body, with all text chunked to API limits.
//!
//! Everything here is pure. Limits are counted in characters, not bytes, and
//! chunk boundaries always land on character boundaries, so CJK text never
//! splits mid-character.
use serde_json::{json, Map, Value};

use crate::fields::{FieldCatalog, Lang};
use crate::model::{AiAnalysis, JobPosting, JobRecord};

/// Title and rich-text property values are cut to this many characters.
pub const TEXT_PROPERTY_LIMIT: usize = 2000;
/// Select option labels are cut to this many characters.
pub const SELECT_LIMIT: usize = 100;
/// Upper bound for one paragraph block.
pub const BLOCK_TEXT_LIMIT: usize = 1800;
/// Blocks one text field may contribute to the document.
pub const FIELD_BLOCK_CAP: usize = 10;
/// Blocks one document may carry in total.
pub const DOCUMENT_BLOCK_CAP: usize = 90;

/// Chunking result: the emitted chunks plus how many characters the field cap
/// cut off.
#[derive(Debug, PartialEq, Eq)]
pub struct Chunked {
    pub chunks: Vec<String>,
    pub truncated: usize,
}

fn char_pos(window: &str, byte_idx: usize) -> usize {
    window[..byte_idx].chars().count()
}

/// Byte offset to split `window` at, or `None` for a hard cut at the window
/// end. Preference order: paragraph break past half the window, sentence end
/// past 60%, line break past 70%, space past 80%. All delimiters are ASCII,
/// so the returned offsets stay on character boundaries.
fn split_point(window: &str, max_len: usize) -> Option<usize> {
    let max = max_len as f64;
    if let Some(idx) = window.rfind("\n\n") {
        if char_pos(window, idx) as f64 > max * 0.5 {
            return Some(idx + 2);
        }
    }
    let sentence = [". ", "! ", "? "]
        .iter()
        .filter_map(|d| window.rfind(d))
        .max();
    if let Some(idx) = sentence {
        if char_pos(window, idx) as f64 > max * 0.6 {
            return Some(idx + 2);
        }
    }
    if let Some(idx) = window.rfind('\n') {
        if char_pos(window, idx) as f64 > max * 0.7 {
            return Some(idx + 1);
        }
    }
    if let Some(idx) = window.rfind(' ') {
        if char_pos(window, idx) as f64 > max * 0.8 {
            return Some(idx + 1);
        }
    }
    None
}

/// Split `text` into chunks of at most `max_len` characters, preferring
/// natural boundaries. Chunks concatenate back to the input exactly; nothing
/// is trimmed. At most `cap` chunks are produced and the character count of
/// anything beyond them is reported as `truncated`.
pub fn chunk_text(text: &str, max_len: usize, cap: usize) -> Chunked {
    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() && chunks.len() < cap {
        let Some((window_end, _)) = rest.char_indices().nth(max_len) else {
            chunks.push(rest.to_string());
            rest = "";
            break;
        };
        let window = &rest[..window_end];
        let split = split_point(window, max_len).unwrap_or(window_end);
        chunks.push(rest[..split].to_string());
        rest = &rest[split..];
    }
    Chunked { chunks, truncated: rest.chars().count() }
}

/// Cut to at most `max` characters on a character boundary.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Normalize a scraped string into a select option label: commas become
/// pipes (Notion rejects commas in option names), whitespace collapses, and
/// the result is cut to the label limit.
fn clean_select(value: &str) -> String {
    let replaced = value.replace(',', " | ");
    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_chars(&collapsed, SELECT_LIMIT).to_string()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn rich_text_value(text: &str) -> Value {
    json!({ "rich_text": [ { "text": { "content": text } } ] })
}

fn select_value(option: &str) -> Value {
    json!({ "select": { "name": option } })
}

fn paragraph(text: &str) -> Value {
    json!({
        "object": "block",
        "type": "paragraph",
        "paragraph": { "rich_text": [ { "text": { "content": text } } ] },
    })
}

fn note_paragraph(text: &str) -> Value {
    json!({
        "object": "block",
        "type": "paragraph",
        "paragraph": {
            "rich_text": [ {
                "text": { "content": text },
                "annotations": { "italic": true, "color": "gray" },
            } ],
        },
    })
}

fn heading_2(text: &str) -> Value {
    json!({
        "object": "block",
        "type": "heading_2",
        "heading_2": { "rich_text": [ { "text": { "content": text } } ] },
    })
}

fn heading_3(text: &str) -> Value {
    json!({
        "object": "block",
        "type": "heading_3",
        "heading_3": { "rich_text": [ { "text": { "content": text } } ] },
    })
}

fn divider() -> Value {
    json!({ "object": "block", "type": "divider", "divider": {} })
}

/// Paragraph blocks for one text field, with a notice appended when the
/// field cap cut content off.
fn text_blocks(text: &str) -> Vec<Value> {
    let chunked = chunk_text(text, BLOCK_TEXT_LIMIT, FIELD_BLOCK_CAP);
    let mut blocks: Vec<Value> = chunked.chunks.iter().map(|c| paragraph(c)).collect();
    if chunked.truncated > 0 {
        blocks.push(note_paragraph(&format!(
            "… content truncated ({} characters omitted); see the original posting.",
            chunked.truncated
        )));
    }
    blocks
}

fn base_properties(posting: &JobPosting, f: &FieldCatalog) -> Map<String, Value> {
    let mut props = Map::new();
    let title = non_empty(&posting.title).unwrap_or(f.unknown_title);
    props.insert(
        f.job_title.into(),
        json!({ "title": [ { "text": { "content": truncate_chars(title, TEXT_PROPERTY_LIMIT) } } ] }),
    );
    props.insert(
        f.company.into(),
        rich_text_value(truncate_chars(
            non_empty(&posting.company).unwrap_or(f.unknown_company),
            TEXT_PROPERTY_LIMIT,
        )),
    );
    props.insert(
        f.location.into(),
        rich_text_value(truncate_chars(
            non_empty(&posting.location).unwrap_or(f.unknown_location),
            TEXT_PROPERTY_LIMIT,
        )),
    );
    props.insert(
        f.salary.into(),
        rich_text_value(truncate_chars(
            non_empty(&posting.salary).unwrap_or(f.unknown_salary),
            TEXT_PROPERTY_LIMIT,
        )),
    );
    props.insert(
        f.job_type.into(),
        select_value(&clean_select(non_empty(&posting.job_type).unwrap_or(f.unspecified))),
    );
    props.insert(
        f.original_experience.into(),
        rich_text_value(truncate_chars(
            non_empty(&posting.experience).unwrap_or(f.unspecified),
            TEXT_PROPERTY_LIMIT,
        )),
    );
    props.insert(f.status.into(), select_value(f.status_pending));
    if let Some(url) = non_empty(&posting.url) {
        props.insert(f.link.into(), json!({ "url": url }));
    }
    let scraped = posting.scraped_at.unwrap_or_else(chrono::Utc::now);
    props.insert(
        f.scrape_time.into(),
        json!({ "date": { "start": scraped.format("%Y-%m-%d").to_string() } }),
    );
    props.insert(f.priority.into(), select_value(f.priority_medium));
    props
}

fn ai_properties(analysis: &AiAnalysis, f: &FieldCatalog) -> Map<String, Value> {
    let mut props = Map::new();
    for (field, text) in [
        (f.responsibilities, &analysis.responsibilities),
        (f.required_skills, &analysis.required_skills),
        (f.preferred_skills, &analysis.preferred_skills),
        (f.tools_frameworks, &analysis.tools_frameworks),
        (f.language_requirements, &analysis.language_requirements),
        (f.soft_skills, &analysis.soft_skills),
        (f.industry_domains, &analysis.industry_domains),
        (f.benefits_highlights, &analysis.benefits_highlights),
    ] {
        props.insert(field.into(), rich_text_value(truncate_chars(text, TEXT_PROPERTY_LIMIT)));
    }
    if let Some(years) = analysis.min_experience_years {
        props.insert(f.min_experience_years.into(), json!({ "number": years }));
    }
    if !analysis.experience_level.is_empty() {
        props.insert(f.experience_level.into(), select_value(&clean_select(&analysis.experience_level)));
    }
    if !analysis.education_requirement.is_empty() {
        props.insert(
            f.education_requirement.into(),
            select_value(&clean_select(&analysis.education_requirement)),
        );
    }
    props.insert(f.ai_processed.into(), json!({ "checkbox": true }));
    props.insert(f.ai_model.into(), rich_text_value(&analysis.model_tag()));
    props
}

/// Document body: the AI analysis group (when present) followed by the
/// original posting text, capped at [`DOCUMENT_BLOCK_CAP`] blocks.
fn children(record: &JobRecord, f: &FieldCatalog) -> Vec<Value> {
    let posting = record.posting();
    let mut blocks = Vec::new();

    if let Some(analysis) = record.analysis() {
        blocks.push(heading_2(f.ai_analysis_summary));
        for (heading, text) in [
            (f.main_responsibilities, &analysis.responsibilities),
            (f.required_skills_heading, &analysis.required_skills),
            (f.preferred_skills_heading, &analysis.preferred_skills),
            (f.tools_frameworks_heading, &analysis.tools_frameworks),
            (f.soft_skills_heading, &analysis.soft_skills),
            (f.benefits_highlights_heading, &analysis.benefits_highlights),
        ] {
            if !text.is_empty() {
                blocks.push(heading_3(heading));
                blocks.extend(text_blocks(text));
            }
        }
        blocks.push(note_paragraph(&format!(
            "{} ({}) {}",
            f.ai_processed_by,
            analysis.model_tag(),
            f.analysis_processed
        )));
        blocks.push(divider());
    }

    blocks.push(heading_2(f.job_description));
    blocks.extend(text_blocks(non_empty(&posting.description).unwrap_or(f.no_description)));
    if let Some(requirements) = non_empty(&posting.requirements) {
        blocks.push(heading_2(f.requirements));
        blocks.extend(text_blocks(requirements));
    }
    if let Some(benefits) = non_empty(&posting.benefits) {
        blocks.push(heading_2(f.benefits));
        blocks.extend(text_blocks(benefits));
    }

    if blocks.len() > DOCUMENT_BLOCK_CAP {
        blocks.truncate(DOCUMENT_BLOCK_CAP - 1);
        blocks.push(note_paragraph(
            "… document truncated: the block limit was reached; see the original posting.",
        ));
    }
    blocks
}

/// Complete page-creation payload for one record against a database whose
/// schema speaks `lang`.
pub fn page_payload(record: &JobRecord, database_id: &str, lang: Lang) -> Value {
    let f = lang.catalog();
    let mut properties = base_properties(record.posting(), f);
    if let Some(analysis) = record.analysis() {
        properties.append(&mut ai_properties(analysis, f));
    }
    json!({
        "parent": { "database_id": database_id },
        "properties": Value::Object(properties),
        "children": children(record, f),
    })
}
