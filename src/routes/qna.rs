use axum::extract::{Json, State};
use serde::{Deserialize, Serialize};

use crate::ai::qna;
use crate::error::AppResult;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AskQuestionRequest {
    #[serde(rename = "documentText")]
    pub document_text: Option<String>,
    pub question: Option<String>,
}

#[derive(Serialize)]
pub struct AnswerResponse {
    pub answer: String,
}

#[derive(Deserialize)]
pub struct GenerateQuestionsRequest {
    #[serde(rename = "documentText")]
    pub document_text: Option<String>,
    #[serde(rename = "numQuestions")]
    pub num_questions: Option<u32>,
}

#[derive(Serialize)]
pub struct QuestionsResponse {
    pub questions: Vec<String>,
}

pub async fn ask_question(
    State(state): State<AppState>,
    Json(payload): Json<AskQuestionRequest>,
) -> AppResult<Json<AnswerResponse>> {
    let document_text = payload.document_text.unwrap_or_default();
    let question = payload.question.unwrap_or_default();
    let answer = qna::answer_question(state.ai.as_ref(), &document_text, &question).await?;
    Ok(Json(AnswerResponse { answer }))
}

pub async fn generate_questions(
    State(state): State<AppState>,
    Json(payload): Json<GenerateQuestionsRequest>,
) -> AppResult<Json<QuestionsResponse>> {
    let document_text = payload.document_text.unwrap_or_default();
    let questions =
        qna::generate_questions(state.ai.as_ref(), &document_text, payload.num_questions).await?;
    Ok(Json(QuestionsResponse { questions }))
}
