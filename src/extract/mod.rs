//! Structured-extraction templates
//!
//! A static table maps site categories (literature index, trial registry,
//! journal, public-health body, anything else) to a JSON schema and an
//! instruction. The category is detected from the URL with ordered regex
//! lists. Caller schemas and prompts are merged on top of the template, and
//! returned data is given a heuristic confidence.

mod confidence;
mod merge;
mod templates;

pub use confidence::{score_confidence, Confidence};
pub use merge::{merge_prompt, merge_schema};
pub use templates::{detect_extraction_type, template_for, ExtractionTemplate, ExtractionType};
