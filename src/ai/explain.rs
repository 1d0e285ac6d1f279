use futures_util::future;
use tracing::{debug, warn};

use super::{AiError, TextGenerator};
use crate::error::{AppError, AppResult};

pub const MIN_SELECTION_CHARS: usize = 3;
pub const MIN_DOCUMENT_CHARS: usize = 10;
pub const ANALYSIS_CHUNK_CHARS: usize = 10_000;
pub const ANALYSIS_SEPARATOR: &str = "\n\n---\n\n";

pub const DEFAULT_SELECTION_PROMPT: &str = "EXPLAIN_SELECTION";
pub const DEFAULT_DOCUMENT_PROMPT: &str = "EXPLAIN_DOCUMENT";

const EXPLAIN_SELECTION: &str = r####"You are a Knowledge Explainer AI that transforms complex information into clear, accessible explanations.

Response Format Rules:
1. ALWAYS begin with "### Explanation:" header
2. First paragraph: Core concept in simple terms (1-2 sentences)
3. Second paragraph: Key details (bullet points if helpful)
4. Third paragraph: Practical example/analogy (if applicable)
5. Use markdown formatting (## headers, **bold**, bullets)
6. Language level: 8th grade readability
7. Length: 50-100 words max"####;

const EXPLAIN_DOCUMENT: &str = r#"You are a Professional Document Analyst that provides comprehensive yet concise overviews.

Response Format Rules:
1. ALWAYS use this structure:
   ### Document Analysis
   #### Overview
   [2-3 sentence summary]

   #### Key Themes
   - Theme 1
   - Theme 2
   - Theme 3

   #### Important Terms
   • Term1: Definition
   • Term2: Definition

   #### Conclusion
   [Main takeaway]"#;

const LEGAL_TRANSLATION: &str = r#"You are a Legal Translator AI that converts complex legal language into plain English.

Response Format Rules:
1. ALWAYS structure as:
   ### Legal Translation
   #### Original Meaning
   [Brief summary]

   #### Plain Language Version
   [Rewritten text]

   #### Key Implications
   - Effect 1
   - Effect 2

   #### Examples
   [Practical scenario]"#;

const SCIENTIFIC_EXPLANATION: &str = r#"You are a Science Communicator AI that makes technical concepts accessible.

Response Format Rules:
1. Required structure:
   ### Scientific Explanation
   #### Concept
   [Simple definition]

   #### How It Works
   [Process description]

   #### Why It Matters
   [Significance]

   #### Real-World Example
   [Practical application]"#;

const SUMMARY: &str = r#"You are a Summary Specialist AI that extracts key information efficiently.

Response Format Rules:
1. ALWAYS format as:
   ### Summary
   #### Core Message
   [1 sentence]

   #### Key Points
   - Point 1
   - Point 2
   - Point 3

   #### Action Items
   [If applicable]"#;

/// Unrecognized prompt types fall back to the selection template.
fn system_instruction(prompt_type: &str) -> &'static str {
    match prompt_type {
        "EXPLAIN_SELECTION" => EXPLAIN_SELECTION,
        "EXPLAIN_DOCUMENT" => EXPLAIN_DOCUMENT,
        "LEGAL_TRANSLATION" => LEGAL_TRANSLATION,
        "SCIENTIFIC_EXPLANATION" => SCIENTIFIC_EXPLANATION,
        "SUMMARY" => SUMMARY,
        _ => EXPLAIN_SELECTION,
    }
}

/// A custom prompt takes precedence over the template preamble; the
/// template still rides along so format rules apply either way.
fn compose_prompt(content: &str, prompt_type: &str, custom_prompt: Option<&str>) -> String {
    let instruction = system_instruction(prompt_type);
    match custom_prompt.map(str::trim).filter(|s| !s.is_empty()) {
        Some(custom) => {
            format!("{custom}:\n\n\"{content}\"\n\nFollow the format rules above.\n\n{instruction}")
        }
        None => format!("{instruction}\n\nContent to analyze:\n\n{content}"),
    }
}

/// Strips a markdown code-fence wrapper and collapses runs of three or
/// more newlines down to a blank line.
pub fn clean_model_output(raw: &str) -> String {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```markdown") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }

    let mut cleaned = String::with_capacity(text.len());
    let mut run = 0usize;
    for ch in text.chars() {
        if ch == '\n' {
            run += 1;
            if run <= 2 {
                cleaned.push(ch);
            }
        } else {
            run = 0;
            cleaned.push(ch);
        }
    }
    cleaned.trim().to_string()
}

/// Fixed-size chunks on char boundaries; the last chunk carries the
/// remainder.
fn chunk_text(text: &str, chunk_chars: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut count = 0usize;
    for (idx, _) in text.char_indices() {
        if count == chunk_chars {
            chunks.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        chunks.push(&text[start..]);
    }
    chunks
}

async fn generate_cleaned(ai: &dyn TextGenerator, prompt: String) -> Result<String, AiError> {
    let raw = ai.generate(&prompt).await?;
    Ok(clean_model_output(&raw))
}

pub(crate) fn upstream_failure(err: AiError) -> AppError {
    warn!(error = %err, "ai provider call failed");
    AppError::internal("analysis failed, please try again later")
}

/// Explains a user-selected span of text.
pub async fn explain_selection(
    ai: &dyn TextGenerator,
    text: &str,
    prompt_type: &str,
    custom_prompt: Option<&str>,
) -> AppResult<String> {
    if text.trim().chars().count() < MIN_SELECTION_CHARS {
        return Err(AppError::bad_request(
            "Selected text must be at least 3 characters long",
        ));
    }

    generate_cleaned(ai, compose_prompt(text, prompt_type, custom_prompt))
        .await
        .map_err(upstream_failure)
}

/// Analyzes a full document. Content above the chunk threshold is split
/// into fixed-size chunks which are explained concurrently and joined in
/// chunk order; each chunk is analyzed independently, with no
/// cross-chunk context.
pub async fn analyze_document(ai: &dyn TextGenerator, full_text: &str) -> AppResult<String> {
    if full_text.trim().chars().count() < MIN_DOCUMENT_CHARS {
        return Err(AppError::bad_request(
            "Document content too short (minimum 10 characters required)",
        ));
    }

    let chunks = chunk_text(full_text, ANALYSIS_CHUNK_CHARS);
    debug!(chunks = chunks.len(), "analyzing document");

    let analyses = future::try_join_all(chunks.into_iter().map(|chunk| {
        generate_cleaned(ai, compose_prompt(chunk, DEFAULT_DOCUMENT_PROMPT, None))
    }))
    .await
    .map_err(upstream_failure)?;

    let title = DEFAULT_DOCUMENT_PROMPT.replace('_', " ");
    Ok(format!(
        "### Comprehensive {title}\n\n{}\n\n[End of Analysis]",
        analyses.join(ANALYSIS_SEPARATOR)
    ))
}
