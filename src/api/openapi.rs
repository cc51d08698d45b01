//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use super::handlers::{host, public, system};

/// OpenAPI documentation for the quiz server.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "livequiz-server API",
        description = "Quiz authoring, participation and results. Live sessions run over the WebSocket at /ws/quiz/{quiz_id}/."
    ),
    paths(
        system::health_handler,
        host::create_quiz,
        host::get_quiz,
        host::delete_quiz,
        host::list_questions,
        host::add_question,
        host::update_question,
        host::delete_question,
        host::confirm_quiz,
        host::leaderboard,
        host::download_results,
        public::list_quizzes,
        public::get_quiz,
        public::join,
        public::submit_answer,
        public::leaderboard,
    ),
    tags(
        (name = "System", description = "Service health"),
        (name = "Host", description = "Quiz authoring and results, authorized by host token"),
        (name = "Public", description = "Browsing, joining and answering"),
    )
)]
pub struct ApiDoc;

/// Swagger UI at `/swagger-ui`, serving the document at
/// `/api-docs/openapi.json`.
#[cfg(feature = "swagger-ui")]
pub fn swagger_ui() -> utoipa_swagger_ui::SwaggerUi {
    utoipa_swagger_ui::SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
