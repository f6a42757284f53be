use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Site category used to pick an extraction template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionType {
    Pubmed,
    ClinicalTrial,
    MedicalJournal,
    HealthOrganization,
    Generic,
}

impl ExtractionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pubmed => "pubmed",
            Self::ClinicalTrial => "clinical_trial",
            Self::MedicalJournal => "medical_journal",
            Self::HealthOrganization => "health_organization",
            Self::Generic => "generic",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "pubmed" => Some(Self::Pubmed),
            "clinical_trial" => Some(Self::ClinicalTrial),
            "medical_journal" => Some(Self::MedicalJournal),
            "health_organization" => Some(Self::HealthOrganization),
            "generic" => Some(Self::Generic),
            _ => None,
        }
    }
}

impl fmt::Display for ExtractionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Schema and instruction sent to `/extract` for one category
#[derive(Debug, Clone)]
pub struct ExtractionTemplate {
    pub kind: ExtractionType,
    pub schema: Value,
    pub prompt: &'static str,
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
}

/// Categories in match order; the first hit wins
static DETECTION_RULES: Lazy<Vec<(ExtractionType, Vec<Regex>)>> = Lazy::new(|| {
    vec![
        (
            ExtractionType::Pubmed,
            compile(&[
                r"(?i)pubmed\.ncbi\.nlm\.nih\.gov",
                r"(?i)ncbi\.nlm\.nih\.gov/pmc",
                r"(?i)europepmc\.org",
            ]),
        ),
        (
            ExtractionType::ClinicalTrial,
            compile(&[
                r"(?i)clinicaltrials\.gov",
                r"(?i)isrctn\.com",
                r"(?i)clinicaltrialsregister\.eu",
                r"(?i)anzctr\.org\.au",
            ]),
        ),
        (
            ExtractionType::MedicalJournal,
            compile(&[
                r"(?i)nejm\.org",
                r"(?i)thelancet\.com",
                r"(?i)jamanetwork\.com",
                r"(?i)bmj\.com",
                r"(?i)nature\.com/articles",
                r"(?i)sciencedirect\.com",
                r"(?i)journals\.lww\.com",
            ]),
        ),
        (
            ExtractionType::HealthOrganization,
            compile(&[
                r"(?i)(^|[/.])who\.int",
                r"(?i)(^|[/.])cdc\.gov",
                r"(?i)(^|[/.])nih\.gov",
                r"(?i)(^|[/.])nhs\.uk",
                r"(?i)(^|[/.])health\.gov\.au",
            ]),
        ),
    ]
});

/// Picks the extraction category for a URL
///
/// ```
/// use clinic_scout::extract::{detect_extraction_type, ExtractionType};
///
/// assert_eq!(
///     detect_extraction_type("https://clinicaltrials.gov/study/NCT05012345"),
///     ExtractionType::ClinicalTrial
/// );
/// assert_eq!(
///     detect_extraction_type("https://clinic.example/blog/knee-pain"),
///     ExtractionType::Generic
/// );
/// ```
pub fn detect_extraction_type(url: &str) -> ExtractionType {
    DETECTION_RULES
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|re| re.is_match(url)))
        .map(|(kind, _)| *kind)
        .unwrap_or(ExtractionType::Generic)
}

static TEMPLATES: Lazy<Vec<ExtractionTemplate>> = Lazy::new(|| {
    vec![
        ExtractionTemplate {
            kind: ExtractionType::Pubmed,
            schema: json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string"},
                    "authors": {"type": "array", "items": {"type": "string"}},
                    "journal": {"type": "string"},
                    "publication_date": {"type": "string"},
                    "pmid": {"type": "string"},
                    "doi": {"type": "string"},
                    "abstract": {"type": "string"},
                    "keywords": {"type": "array", "items": {"type": "string"}},
                    "study_type": {"type": "string"}
                },
                "required": ["title", "abstract"]
            }),
            prompt: "Extract the bibliographic record of this research article: title, \
                     authors, journal, publication date, PMID, DOI, the full abstract, \
                     keywords and the study design.",
        },
        ExtractionTemplate {
            kind: ExtractionType::ClinicalTrial,
            schema: json!({
                "type": "object",
                "properties": {
                    "trial_id": {"type": "string"},
                    "title": {"type": "string"},
                    "status": {"type": "string"},
                    "phase": {"type": "string"},
                    "conditions": {"type": "array", "items": {"type": "string"}},
                    "interventions": {"type": "array", "items": {"type": "string"}},
                    "sponsor": {"type": "string"},
                    "enrollment": {"type": "number"},
                    "start_date": {"type": "string"},
                    "completion_date": {"type": "string"},
                    "primary_outcomes": {"type": "array", "items": {"type": "string"}},
                    "eligibility": {"type": "string"}
                },
                "required": ["trial_id", "title", "status"]
            }),
            prompt: "Extract the registry entry for this clinical trial: identifier, title, \
                     recruitment status, phase, conditions, interventions, sponsor, \
                     enrollment, dates, primary outcomes and eligibility criteria.",
        },
        ExtractionTemplate {
            kind: ExtractionType::MedicalJournal,
            schema: json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string"},
                    "authors": {"type": "array", "items": {"type": "string"}},
                    "journal": {"type": "string"},
                    "publication_date": {"type": "string"},
                    "doi": {"type": "string"},
                    "abstract": {"type": "string"},
                    "key_findings": {"type": "array", "items": {"type": "string"}},
                    "conclusions": {"type": "string"},
                    "limitations": {"type": "string"}
                },
                "required": ["title"]
            }),
            prompt: "Extract this journal article: title, authors, journal, publication \
                     date, DOI, abstract, key findings, conclusions and stated limitations. \
                     Do not infer findings that are not in the text.",
        },
        ExtractionTemplate {
            kind: ExtractionType::HealthOrganization,
            schema: json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string"},
                    "organization": {"type": "string"},
                    "summary": {"type": "string"},
                    "recommendations": {"type": "array", "items": {"type": "string"}},
                    "target_population": {"type": "string"},
                    "last_updated": {"type": "string"},
                    "references": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["title", "summary"]
            }),
            prompt: "Extract the guidance published on this public-health page: title, \
                     issuing organization, summary, recommendations, target population, \
                     last update date and references.",
        },
        ExtractionTemplate {
            kind: ExtractionType::Generic,
            schema: json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string"},
                    "summary": {"type": "string"},
                    "author": {"type": "string"},
                    "published_date": {"type": "string"},
                    "main_points": {"type": "array", "items": {"type": "string"}},
                    "sources": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["title"]
            }),
            prompt: "Extract the main content of this page: title, a short summary, author, \
                     publication date, the main points and any cited sources.",
        },
    ]
});

/// Returns the static template for a category
pub fn template_for(kind: ExtractionType) -> &'static ExtractionTemplate {
    // The table holds one entry per variant, Generic last.
    TEMPLATES
        .iter()
        .find(|t| t.kind == kind)
        .unwrap_or(&TEMPLATES[TEMPLATES.len() - 1])
}
