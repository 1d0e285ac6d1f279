use tracing::debug;

use super::explain::{clean_model_output, MIN_DOCUMENT_CHARS};
use super::TextGenerator;
use crate::error::{AppError, AppResult};

pub const MIN_QUESTIONS: u32 = 1;
pub const MAX_QUESTIONS: u32 = 10;
pub const DEFAULT_QUESTIONS: u32 = 5;

const ANSWER_QUESTION: &str = r#"You are a Document Q&A Assistant that answers questions strictly from the provided document.

Response Format Rules:
1. Answer only from the document; if the document does not contain the answer, say so plainly
2. Lead with the direct answer (1-2 sentences)
3. Follow with supporting detail quoted or paraphrased from the document
4. Use markdown formatting where it helps
5. Length: 150 words max"#;

const GENERATE_QUESTIONS: &str = r#"You are a Study Question Generator AI that writes comprehension questions about the provided document.

Response Format Rules:
1. Output ONLY a numbered list, one question per line
2. Every question must be answerable from the document alone
3. Cover different sections and themes, no duplicates
4. Plain questions, no preamble, no answers"#;

pub async fn answer_question(
    ai: &dyn TextGenerator,
    document_text: &str,
    question: &str,
) -> AppResult<String> {
    if document_text.trim().chars().count() < MIN_DOCUMENT_CHARS {
        return Err(AppError::bad_request(
            "Document content too short (minimum 10 characters required)",
        ));
    }
    let question = question.trim();
    if question.is_empty() {
        return Err(AppError::bad_request("question is required"));
    }

    let prompt = format!("{ANSWER_QUESTION}\n\nDocument:\n\n{document_text}\n\nQuestion: {question}");
    let raw = ai
        .generate(&prompt)
        .await
        .map_err(super::explain::upstream_failure)?;
    Ok(clean_model_output(&raw))
}

pub async fn generate_questions(
    ai: &dyn TextGenerator,
    document_text: &str,
    requested: Option<u32>,
) -> AppResult<Vec<String>> {
    if document_text.trim().chars().count() < MIN_DOCUMENT_CHARS {
        return Err(AppError::bad_request(
            "Document content too short (minimum 10 characters required)",
        ));
    }

    let count = requested
        .unwrap_or(DEFAULT_QUESTIONS)
        .clamp(MIN_QUESTIONS, MAX_QUESTIONS);
    debug!(count, "generating questions");

    let prompt = format!(
        "{GENERATE_QUESTIONS}\n\nGenerate exactly {count} questions.\n\nDocument:\n\n{document_text}"
    );
    let raw = ai
        .generate(&prompt)
        .await
        .map_err(super::explain::upstream_failure)?;

    Ok(parse_question_list(&clean_model_output(&raw), count as usize))
}

/// Splits the model reply into one question per line, stripping list
/// markers; tolerant of bullets and stray blank lines.
fn parse_question_list(text: &str, limit: usize) -> Vec<String> {
    text.lines()
        .map(strip_list_marker)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .take(limit)
        .collect()
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    let unnumbered = line
        .split_once(|c: char| c == '.' || c == ')')
        .filter(|(prefix, _)| !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_digit()))
        .map(|(_, rest)| rest)
        .unwrap_or(line);
    unnumbered
        .trim_start_matches(['-', '*', '•'])
        .trim()
}
