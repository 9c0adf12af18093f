//! Bilingual field catalog.
//!
//! All user-visible strings of a destination database live here: property
//! names, select option labels, document headings and the sentinel values
//! substituted for missing scraper output. The rest of the crate never embeds
//! one of these strings directly; it goes through [`Lang::catalog`] so a
//! single record can be rendered against either a Chinese or an English
//! database schema.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Schema language of a destination database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Zh,
    En,
}

impl Lang {
    pub fn as_str(self) -> &'static str {
        match self {
            Lang::Zh => "zh",
            Lang::En => "en",
        }
    }

    pub fn catalog(self) -> &'static FieldCatalog {
        match self {
            Lang::Zh => &ZH,
            Lang::En => &EN,
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lang {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zh" | "zh-tw" | "zh_tw" => Ok(Lang::Zh),
            "en" => Ok(Lang::En),
            other => Err(format!("unsupported language {other:?} (expected \"zh\" or \"en\")")),
        }
    }
}

/// Every named string of one schema language.
#[derive(Debug)]
pub struct FieldCatalog {
    // Property names.
    pub job_title: &'static str,
    pub company: &'static str,
    pub location: &'static str,
    pub salary: &'static str,
    pub job_type: &'static str,
    pub responsibilities: &'static str,
    pub required_skills: &'static str,
    pub preferred_skills: &'static str,
    pub tools_frameworks: &'static str,
    pub min_experience_years: &'static str,
    pub experience_level: &'static str,
    pub education_requirement: &'static str,
    pub language_requirements: &'static str,
    pub soft_skills: &'static str,
    pub industry_domains: &'static str,
    pub benefits_highlights: &'static str,
    pub original_experience: &'static str,
    pub status: &'static str,
    pub link: &'static str,
    pub scrape_time: &'static str,
    pub priority: &'static str,
    pub ai_processed: &'static str,
    pub ai_model: &'static str,

    // Select option labels.
    pub status_pending: &'static str,
    pub status_applied: &'static str,
    pub status_interview: &'static str,
    pub status_accepted: &'static str,
    pub status_rejected: &'static str,
    pub status_not_suitable: &'static str,
    pub priority_high: &'static str,
    pub priority_medium: &'static str,
    pub priority_low: &'static str,
    pub job_type_full_time: &'static str,
    pub job_type_part_time: &'static str,
    pub job_type_contract: &'static str,
    pub job_type_internship: &'static str,
    pub job_type_remote: &'static str,

    // Document headings and footer fragments.
    pub ai_analysis_summary: &'static str,
    pub main_responsibilities: &'static str,
    pub required_skills_heading: &'static str,
    pub preferred_skills_heading: &'static str,
    pub tools_frameworks_heading: &'static str,
    pub soft_skills_heading: &'static str,
    pub benefits_highlights_heading: &'static str,
    pub ai_processed_by: &'static str,
    pub analysis_processed: &'static str,
    pub job_description: &'static str,
    pub requirements: &'static str,
    pub benefits: &'static str,

    // Sentinels for missing scraper output.
    pub unknown_title: &'static str,
    pub unknown_company: &'static str,
    pub unknown_location: &'static str,
    pub unknown_salary: &'static str,
    pub unspecified: &'static str,
    pub no_description: &'static str,

    pub default_database_name: &'static str,
}

pub static ZH: FieldCatalog = FieldCatalog {
    job_title: "職位名稱",
    company: "公司",
    location: "地點",
    salary: "薪資",
    job_type: "工作類型",
    responsibilities: "職責",
    required_skills: "必備技能",
    preferred_skills: "加分技能",
    tools_frameworks: "工具框架",
    min_experience_years: "最低經驗年數",
    experience_level: "經驗等級",
    education_requirement: "學歷要求",
    language_requirements: "語言要求",
    soft_skills: "軟技能",
    industry_domains: "產業領域",
    benefits_highlights: "福利亮點",
    original_experience: "原始經驗要求",
    status: "狀態",
    link: "連結",
    scrape_time: "抓取時間",
    priority: "優先級",
    ai_processed: "AI 處理",
    ai_model: "AI 模型",

    status_pending: "待申請",
    status_applied: "已申請",
    status_interview: "面試中",
    status_accepted: "已錄取",
    status_rejected: "已拒絕",
    status_not_suitable: "不適合",
    priority_high: "高",
    priority_medium: "中",
    priority_low: "低",
    job_type_full_time: "全職",
    job_type_part_time: "兼職",
    job_type_contract: "約聘",
    job_type_internship: "實習",
    job_type_remote: "遠距",

    ai_analysis_summary: "🤖 AI 分析摘要",
    main_responsibilities: "👔 主要職責",
    required_skills_heading: "⚡ 必備技能",
    preferred_skills_heading: "✨ 加分技能",
    tools_frameworks_heading: "🛠️ 工具與框架",
    soft_skills_heading: "🤝 軟技能",
    benefits_highlights_heading: "🌟 福利亮點",
    ai_processed_by: "✨ 此職缺已由 AI",
    analysis_processed: "分析處理",
    job_description: "📄 Job Description",
    requirements: "📌 Requirements",
    benefits: "🎁 Benefits",

    unknown_title: "未知職位",
    unknown_company: "未知公司",
    unknown_location: "未知",
    unknown_salary: "未提供",
    unspecified: "未指定",
    no_description: "無描述",

    default_database_name: "求職追蹤資料庫",
};

pub static EN: FieldCatalog = FieldCatalog {
    job_title: "Job Title",
    company: "Company",
    location: "Location",
    salary: "Salary",
    job_type: "Job Type",
    responsibilities: "Responsibilities",
    required_skills: "Required Skills",
    preferred_skills: "Preferred Skills",
    tools_frameworks: "Tools & Frameworks",
    min_experience_years: "Min Years of Experience",
    experience_level: "Experience Level",
    education_requirement: "Education Requirement",
    language_requirements: "Language Requirements",
    soft_skills: "Soft Skills",
    industry_domains: "Industry Domains",
    benefits_highlights: "Benefits Highlights",
    original_experience: "Original Experience Text",
    status: "Status",
    link: "Link",
    scrape_time: "Scrape Time",
    priority: "Priority",
    ai_processed: "AI Processed",
    ai_model: "AI Model",

    status_pending: "Pending",
    status_applied: "Applied",
    status_interview: "Interview",
    status_accepted: "Accepted",
    status_rejected: "Rejected",
    status_not_suitable: "Not Suitable",
    priority_high: "High",
    priority_medium: "Medium",
    priority_low: "Low",
    job_type_full_time: "Full-time",
    job_type_part_time: "Part-time",
    job_type_contract: "Contract",
    job_type_internship: "Internship",
    job_type_remote: "Remote",

    ai_analysis_summary: "🤖 AI Analysis Summary",
    main_responsibilities: "👔 Main Responsibilities",
    required_skills_heading: "⚡ Required Skills",
    preferred_skills_heading: "✨ Preferred Skills",
    tools_frameworks_heading: "🛠️ Tools & Frameworks",
    soft_skills_heading: "🤝 Soft Skills",
    benefits_highlights_heading: "🌟 Benefits Highlights",
    ai_processed_by: "✨ This job has been processed by AI",
    analysis_processed: "analysis",
    job_description: "📄 Job Description",
    requirements: "📌 Requirements",
    benefits: "🎁 Benefits",

    unknown_title: "Unknown Position",
    unknown_company: "Unknown Company",
    unknown_location: "Unknown",
    unknown_salary: "Not Provided",
    unspecified: "Unspecified",
    no_description: "No description",

    default_database_name: "Job Tracking Database",
};

/// Property names that must exist for a database to count as compatible.
pub fn required_fields(lang: Lang) -> [&'static str; 3] {
    let f = lang.catalog();
    [f.job_title, f.company, f.status]
}

/// Property names that upgrade a compatible database to a perfect match.
pub fn important_fields(lang: Lang) -> [&'static str; 4] {
    let f = lang.catalog();
    [f.location, f.salary, f.link, f.ai_processed]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lang_parses_common_spellings() {
        assert_eq!("zh".parse::<Lang>().unwrap(), Lang::Zh);
        assert_eq!("ZH-TW".parse::<Lang>().unwrap(), Lang::Zh);
        assert_eq!(" en ".parse::<Lang>().unwrap(), Lang::En);
        assert!("fr".parse::<Lang>().is_err());
    }

    #[test]
    fn catalogs_disagree_on_required_fields() {
        assert_eq!(required_fields(Lang::Zh), ["職位名稱", "公司", "狀態"]);
        assert_eq!(required_fields(Lang::En), ["Job Title", "Company", "Status"]);
        assert_eq!(important_fields(Lang::Zh), ["地點", "薪資", "連結", "AI 處理"]);
        assert_eq!(important_fields(Lang::En), ["Location", "Salary", "Link", "AI Processed"]);
    }
}
