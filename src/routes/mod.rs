use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod ai;
pub mod documents;
pub mod health;
pub mod qna;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|value| {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| {
                    trimmed
                        .parse::<HeaderValue>()
                        .expect("invalid CORS allowed origin")
                })
            })
            .collect();

        let allow_origin = AllowOrigin::list(headers);

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    };

    let documents_routes = Router::new()
        .route("/", get(documents::list_documents))
        .route("/upload", post(documents::upload_documents))
        .route("/tag-documents", post(documents::tag_documents))
        .route(
            "/:id",
            get(documents::get_document).delete(documents::delete_document),
        )
        .route("/:id/view", get(documents::view_document))
        .route("/:id/download", get(documents::download_document))
        .route("/:id/protect", patch(documents::protect_document))
        .route("/:id/verify", post(documents::verify_document));

    let ai_routes = Router::new().route("/explain", post(ai::explain_content));

    let qna_routes = Router::new()
        .route("/ask-question", post(qna::ask_question))
        .route("/generate-questions", post(qna::generate_questions));

    Router::new()
        .nest("/api/documents", documents_routes)
        .nest("/api/ai", ai_routes)
        .nest("/api/ai-qna", qna_routes)
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024 * 512))
}
