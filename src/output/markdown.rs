//! Markdown report for a parsed medical page
//!
//! Summarizes the extraction and every review warning so that an editor can
//! work through the flagged sentences.

use crate::research::MedicalParseResult;
use crate::review::{ReviewOutcome, WarningKind};
use serde_json::Value;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown report for `result` to `output_path`
pub fn write_medical_report(result: &MedicalParseResult, output_path: &Path) -> std::io::Result<()> {
    let markdown = format_medical_report(result);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

fn warning_label(kind: WarningKind) -> &'static str {
    match kind {
        WarningKind::MarketingSuperlative => "Marketing superlative",
        WarningKind::UnsubstantiatedClaim => "Unsubstantiated claim",
        WarningKind::MissingEvidence => "Missing evidence",
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "_empty_".to_string(),
        Value::String(s) if s.trim().is_empty() => "_empty_".to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) if items.is_empty() => "_empty_".to_string(),
        Value::Array(items) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_string(),
    }
}

/// Formats a medical parse result as markdown
pub fn format_medical_report(result: &MedicalParseResult) -> String {
    let mut md = String::new();

    md.push_str("# Medical Content Report\n\n");
    md.push_str(&format!("- **URL**: {}\n", result.url));
    if let Some(title) = result
        .scrape
        .metadata
        .as_ref()
        .and_then(|m| m.title.as_deref())
    {
        md.push_str(&format!("- **Title**: {}\n", title));
    }
    md.push_str(&format!(
        "- **Scraped**: {}\n\n",
        result.scrape.scraped_at.to_rfc3339()
    ));

    if let Some(error) = &result.error {
        md.push_str(&format!("**Failed**: {}\n", error));
        return md;
    }

    md.push_str("## Extraction\n\n");
    match &result.extraction {
        Some(extraction) => {
            md.push_str(&format!(
                "- **Template**: {}\n- **Confidence**: {:?}\n\n",
                extraction.extraction_type, extraction.confidence
            ));
            match extraction.extracted_data.as_ref().and_then(Value::as_object) {
                Some(fields) => {
                    md.push_str("| Field | Value |\n");
                    md.push_str("|-------|-------|\n");
                    for (name, value) in fields {
                        md.push_str(&format!(
                            "| {} | {} |\n",
                            name,
                            render_value(value).replace('|', "\\|")
                        ));
                    }
                    md.push('\n');
                }
                None => md.push_str(&format!(
                    "No data extracted ({})\n\n",
                    extraction.error.as_deref().unwrap_or("unknown error")
                )),
            }
        }
        None => md.push_str("Not run\n\n"),
    }

    md.push_str("## Content Review\n\n");
    match &result.review {
        Some(review) if review.outcome == ReviewOutcome::Clean => {
            md.push_str("No warnings.\n");
        }
        Some(review) => {
            md.push_str(&format!(
                "**Needs human review**: {} warnings\n\n",
                review.warnings.len()
            ));
            for warning in &review.warnings {
                md.push_str(&format!(
                    "- **{}** `{}`: {}\n",
                    warning_label(warning.kind),
                    warning.phrase,
                    warning.excerpt
                ));
            }
        }
        None => md.push_str("Not run\n"),
    }

    md
}
