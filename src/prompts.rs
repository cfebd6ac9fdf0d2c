//! Prompts for briefing analysis and multi-document consolidation.
//!
//! All prompt text lives here so it can be reviewed and tested without an
//! LLM. Callers can override the system prompt via
//! [`crate::config::GeneratorConfig::system_prompt`].
//!
//! Every template asks for exactly the markdown subset the renderer
//! understands: `# ` sections, `## ` sub-sections, blank-line separated
//! paragraphs and `- ` bullets. The document title is added by the renderer,
//! so the model is told not to write one.

use crate::config::DocumentType;

/// Formatting rules shared by every system prompt.
const FORMAT_RULES: &str = r####"Formatting rules:
- Start directly with the first "# " section; do not write a document title
- Use "# " for main sections and "## " for sub-sections; never use "###" or deeper
- Separate paragraphs with a blank line
- Use "- " for list items, one item per line; do not nest lists
- Write plain text: no bold, italics, tables, links, images or code blocks
- Output ONLY the document; no commentary and no ```markdown fences"####;

const ANIMAL_BOARDING_PROMPT: &str = r#"You are an expert in emergency animal boarding programs. Analyse the document and restructure its content into a clear operational briefing with these sections:

# Executive Summary
Two or three paragraphs covering the key points.

# Key Information
- Critical facts, one per bullet

# Operational Procedures
## <Procedure name>
- Step-by-step instructions, required resources and safety considerations

# Contact Information
## Primary Contacts
- <Name or role>: <contact details>

# Resource Requirements
## Equipment
- Required equipment
## Supplies
- Required supplies
## Staffing
- Staff requirements and roles

# Legal Requirements
- Legal requirements and compliance items

# Timeline
- Key dates and milestones"#;

const SHELTER_PLAN_PROMPT: &str = r#"You are an expert in multi-community shelter planning. Analyse the document and restructure its content into a clear shelter plan with these sections:

# Executive Summary
Two or three paragraphs covering the key points.

# Facility Details
## Location
- Address and access information
## Capacity
- Number of people and animals
- Space requirements

# Resource Allocation
## Staffing
- Required staff and roles
## Equipment
- Required equipment
## Supplies
- Required supplies

# Coordination Procedures
## Communication
- Communication protocols
## Transportation
- Transportation arrangements
## Security
- Security measures

# Emergency Protocols
- Emergency response procedures
- Evacuation plans"#;

const GENERAL_PROMPT: &str = r#"You are an emergency management documents expert. Analyse the document and restructure its content into a clear briefing with these sections:

# Executive Summary
Two or three paragraphs covering the key points.

# Key Components
- Critical information, one per bullet

# Operational Procedures
## <Procedure name>
- Step-by-step instructions, required resources and safety considerations

# Contact Information
- Key contacts and their roles

# Resource Requirements
- Required resources

# Legal Requirements
- Legal requirements and compliance items

# Timeline
- Key dates and milestones"#;

/// System message for the consolidation call.
pub const MERGE_SYSTEM_PROMPT: &str =
    "You are an expert in creating consolidated emergency management plans from multiple sources.";

/// The built-in system prompt for `document_type`, formatting rules included.
pub fn system_prompt(document_type: DocumentType) -> String {
    let template = match document_type {
        DocumentType::AnimalBoarding => ANIMAL_BOARDING_PROMPT,
        DocumentType::ShelterPlan => SHELTER_PLAN_PROMPT,
        DocumentType::General => GENERAL_PROMPT,
    };
    format!("{template}\n\n{FORMAT_RULES}")
}

/// User message carrying the document text.
///
/// `text` should already be truncated to the configured input limit.
pub fn analysis_prompt(text: &str) -> String {
    format!(
        r#"Analyse this emergency management document and extract ALL critical, actionable information. Focus on:
1. Key operational procedures and protocols
2. Contact information and responsible parties
3. Resource requirements and logistics
4. Legal and compliance requirements
5. Timeline and scheduling information

DOCUMENT CONTENT:
"""
{text}
""""#
    )
}

/// User message asking the model to merge several analyses into one.
pub fn merge_prompt(analyses: &[String], document_type: DocumentType) -> String {
    let mut sources = String::new();
    for (i, analysis) in analyses.iter().enumerate() {
        sources.push_str(&format!("--- SOURCE {} ---\n{}\n\n", i + 1, analysis.trim()));
    }
    let label = document_type.as_str().replace('_', " ");
    format!(
        r#"You are creating a comprehensive emergency management plan. The following analyses were extracted from {count} separate documents:

{sources}Create one unified {label} document that merges all of this information without repetition. Keep it practical and actionable. Where sources conflict, keep the most comprehensive version.

{FORMAT_RULES}"#,
        count = analyses.len(),
    )
}

/// Cut `text` to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
