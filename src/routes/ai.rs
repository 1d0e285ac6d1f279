use axum::extract::{Json, State};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::ai::explain::{self, DEFAULT_SELECTION_PROMPT};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ExplainRequest {
    pub text: Option<String>,
    #[serde(rename = "fullText")]
    pub full_text: Option<String>,
    #[serde(rename = "promptType")]
    pub prompt_type: Option<String>,
    #[serde(rename = "customPrompt")]
    pub custom_prompt: Option<String>,
}

/// Explains a selection or analyzes a whole document, depending on
/// which content field the caller supplies. Selection wins when both
/// are present.
pub async fn explain_content(
    State(state): State<AppState>,
    Json(payload): Json<ExplainRequest>,
) -> AppResult<Json<Value>> {
    let ExplainRequest {
        text,
        full_text,
        prompt_type,
        custom_prompt,
    } = payload;

    if text.is_none() && full_text.is_none() {
        return Err(AppError::bad_request(
            "Please provide either selected text or full document content",
        ));
    }

    if let Some(text) = text {
        let prompt_type = prompt_type.as_deref().unwrap_or(DEFAULT_SELECTION_PROMPT);
        debug!(prompt_type, chars = text.chars().count(), "explaining selection");
        let explanation = explain::explain_selection(
            state.ai.as_ref(),
            &text,
            prompt_type,
            custom_prompt.as_deref(),
        )
        .await?;
        return Ok(Json(json!({ "explanation": explanation })));
    }

    let full_text = full_text.unwrap_or_default();
    debug!(chars = full_text.chars().count(), "analyzing document");
    let analysis = explain::analyze_document(state.ai.as_ref(), &full_text).await?;
    Ok(Json(json!({ "analysis": analysis })))
}
