//! Host handlers: quiz authoring, confirmation, and results.
//!
//! Every route except creation needs `Authorization: Bearer <host_token>`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::auth::HostToken;
use crate::api::dto::{
    ConfirmQuizRequest, CreateQuestionRequest, CreateQuizRequest, CreateQuizResponse,
    HostQuizDetail, LeaderboardResponse, QuestionDto, QuestionListResponse, QuizDto,
    UpdateQuestionRequest,
};
use crate::app_state::AppState;
use crate::domain::QuizId;
use crate::error::{ErrorResponse, QuizError};

/// `POST /api/quiz/host`: Create a quiz.
///
/// # Errors
///
/// Returns [`QuizError::InvalidRequest`] for a bad title or timing.
#[utoipa::path(
    post,
    path = "/api/quiz/host",
    tag = "Host",
    summary = "Create a quiz",
    description = "Creates a draft quiz and returns it with the host token needed for every other host operation.",
    request_body = CreateQuizRequest,
    responses(
        (status = 201, description = "Quiz created", body = CreateQuizResponse),
        (status = 400, description = "Invalid title or timing", body = ErrorResponse),
    )
)]
pub async fn create_quiz(
    State(state): State<AppState>,
    body: Result<Json<CreateQuizRequest>, JsonRejection>,
) -> Result<impl IntoResponse, QuizError> {
    let Json(req) = body?;
    let quiz = state.quiz_service.create_quiz(req.into()).await?;
    let response = CreateQuizResponse {
        quiz: QuizDto::from(&quiz),
        host_token: quiz.host_token,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// `GET /api/quiz/host/{id}`: Quiz detail with answers.
///
/// # Errors
///
/// Returns [`QuizError::QuizNotFound`] or an authorization error.
#[utoipa::path(
    get,
    path = "/api/quiz/host/{id}",
    tag = "Host",
    summary = "Get quiz detail",
    description = "Returns the quiz, its participant count, and every question including the correct answer.",
    params(("id" = Uuid, Path, description = "Quiz UUID")),
    responses(
        (status = 200, description = "Quiz detail", body = HostQuizDetail),
        (status = 401, description = "Missing host token", body = ErrorResponse),
        (status = 403, description = "Wrong host token", body = ErrorResponse),
        (status = 404, description = "Quiz not found", body = ErrorResponse),
    )
)]
pub async fn get_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    token: HostToken,
) -> Result<impl IntoResponse, QuizError> {
    let overview = state
        .quiz_service
        .host_overview(QuizId::from_uuid(id), token.as_deref())
        .await?;
    Ok(Json(HostQuizDetail::from(overview)))
}

/// `DELETE /api/quiz/host/{id}`: Delete a quiz.
///
/// # Errors
///
/// Returns [`QuizError::QuizNotFound`] or an authorization error.
#[utoipa::path(
    delete,
    path = "/api/quiz/host/{id}",
    tag = "Host",
    summary = "Delete a quiz",
    description = "Deletes the quiz together with its questions, participants and answers.",
    params(("id" = Uuid, Path, description = "Quiz UUID")),
    responses(
        (status = 204, description = "Quiz deleted"),
        (status = 403, description = "Wrong host token", body = ErrorResponse),
        (status = 404, description = "Quiz not found", body = ErrorResponse),
    )
)]
pub async fn delete_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    token: HostToken,
) -> Result<impl IntoResponse, QuizError> {
    state
        .quiz_service
        .delete_quiz(QuizId::from_uuid(id), token.as_deref())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/quiz/host/{id}/questions`: List questions.
///
/// # Errors
///
/// Returns [`QuizError::QuizNotFound`] or an authorization error.
#[utoipa::path(
    get,
    path = "/api/quiz/host/{id}/questions",
    tag = "Host",
    summary = "List questions",
    params(("id" = Uuid, Path, description = "Quiz UUID")),
    responses(
        (status = 200, description = "Questions in order", body = QuestionListResponse),
        (status = 404, description = "Quiz not found", body = ErrorResponse),
    )
)]
pub async fn list_questions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    token: HostToken,
) -> Result<impl IntoResponse, QuizError> {
    let questions = state
        .quiz_service
        .list_questions(QuizId::from_uuid(id), token.as_deref())
        .await?;
    Ok(Json(QuestionListResponse {
        data: questions.iter().map(QuestionDto::from).collect(),
    }))
}

/// `POST /api/quiz/host/{id}/questions`: Add a question.
///
/// # Errors
///
/// Returns [`QuizError::Conflict`] once the quiz is live, or a validation
/// or authorization error.
#[utoipa::path(
    post,
    path = "/api/quiz/host/{id}/questions",
    tag = "Host",
    summary = "Add a question",
    description = "Adds a multiple-choice question while the quiz is draft or ready.",
    params(("id" = Uuid, Path, description = "Quiz UUID")),
    request_body = CreateQuestionRequest,
    responses(
        (status = 201, description = "Question added", body = QuestionDto),
        (status = 400, description = "Invalid question", body = ErrorResponse),
        (status = 409, description = "Quiz is no longer editable", body = ErrorResponse),
    )
)]
pub async fn add_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    token: HostToken,
    body: Result<Json<CreateQuestionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, QuizError> {
    let Json(req) = body?;
    let question = state
        .quiz_service
        .add_question(QuizId::from_uuid(id), token.as_deref(), req.into())
        .await?;
    Ok((StatusCode::CREATED, Json(QuestionDto::from(&question))))
}

/// `PUT /api/quiz/host/{id}/questions/{question_id}`: Update a question.
///
/// # Errors
///
/// Returns [`QuizError::QuestionNotFound`], [`QuizError::Conflict`], or a
/// validation or authorization error.
#[utoipa::path(
    put,
    path = "/api/quiz/host/{id}/questions/{question_id}",
    tag = "Host",
    summary = "Update a question",
    description = "Partial update: absent fields keep their current value.",
    params(
        ("id" = Uuid, Path, description = "Quiz UUID"),
        ("question_id" = Uuid, Path, description = "Question UUID"),
    ),
    request_body = UpdateQuestionRequest,
    responses(
        (status = 200, description = "Question updated", body = QuestionDto),
        (status = 404, description = "Question not found", body = ErrorResponse),
        (status = 409, description = "Quiz is no longer editable", body = ErrorResponse),
    )
)]
pub async fn update_question(
    State(state): State<AppState>,
    Path((id, question_id)): Path<(Uuid, Uuid)>,
    token: HostToken,
    body: Result<Json<UpdateQuestionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, QuizError> {
    let Json(req) = body?;
    let question = state
        .quiz_service
        .update_question(QuizId::from_uuid(id), token.as_deref(), question_id, req.into())
        .await?;
    Ok(Json(QuestionDto::from(&question)))
}

/// `DELETE /api/quiz/host/{id}/questions/{question_id}`: Remove a question.
///
/// # Errors
///
/// Returns [`QuizError::QuestionNotFound`], [`QuizError::Conflict`], or an
/// authorization error.
#[utoipa::path(
    delete,
    path = "/api/quiz/host/{id}/questions/{question_id}",
    tag = "Host",
    summary = "Remove a question",
    params(
        ("id" = Uuid, Path, description = "Quiz UUID"),
        ("question_id" = Uuid, Path, description = "Question UUID"),
    ),
    responses(
        (status = 204, description = "Question removed"),
        (status = 404, description = "Question not found", body = ErrorResponse),
        (status = 409, description = "Quiz is no longer editable", body = ErrorResponse),
    )
)]
pub async fn delete_question(
    State(state): State<AppState>,
    Path((id, question_id)): Path<(Uuid, Uuid)>,
    token: HostToken,
) -> Result<impl IntoResponse, QuizError> {
    state
        .quiz_service
        .delete_question(QuizId::from_uuid(id), token.as_deref(), question_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/quiz/host/{id}/confirm`: Mark the quiz ready.
///
/// # Errors
///
/// Returns [`QuizError::InvalidRequest`] when the quiz has no questions,
/// [`QuizError::Conflict`] once live, or an authorization error.
#[utoipa::path(
    post,
    path = "/api/quiz/host/{id}/confirm",
    tag = "Host",
    summary = "Confirm a quiz",
    description = "Moves the quiz to `ready` so participants can join. Optionally sets the time per question.",
    params(("id" = Uuid, Path, description = "Quiz UUID")),
    request_body(content = ConfirmQuizRequest, description = "Optional settings"),
    responses(
        (status = 200, description = "Quiz confirmed", body = QuizDto),
        (status = 400, description = "No questions or bad timing", body = ErrorResponse),
        (status = 409, description = "Quiz already live or completed", body = ErrorResponse),
    )
)]
pub async fn confirm_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    token: HostToken,
    body: Result<Option<Json<ConfirmQuizRequest>>, JsonRejection>,
) -> Result<impl IntoResponse, QuizError> {
    let Json(req) = body?.unwrap_or_default();
    let quiz = state
        .quiz_service
        .confirm_quiz(QuizId::from_uuid(id), token.as_deref(), req.time_per_question)
        .await?;
    Ok(Json(QuizDto::from(&quiz)))
}

/// `GET /api/quiz/host/{id}/leaderboard`: Current leaderboard.
///
/// # Errors
///
/// Returns [`QuizError::QuizNotFound`] or an authorization error.
#[utoipa::path(
    get,
    path = "/api/quiz/host/{id}/leaderboard",
    tag = "Host",
    summary = "Host leaderboard",
    params(("id" = Uuid, Path, description = "Quiz UUID")),
    responses(
        (status = 200, description = "Ranked participants", body = LeaderboardResponse),
        (status = 404, description = "Quiz not found", body = ErrorResponse),
    )
)]
pub async fn leaderboard(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    token: HostToken,
) -> Result<impl IntoResponse, QuizError> {
    let leaderboard = state
        .quiz_service
        .host_leaderboard(QuizId::from_uuid(id), token.as_deref())
        .await?;
    Ok(Json(LeaderboardResponse { leaderboard }))
}

/// `GET /api/quiz/host/{id}/results/download`: Results as CSV.
///
/// # Errors
///
/// Returns [`QuizError::QuizNotFound`] or an authorization error.
#[utoipa::path(
    get,
    path = "/api/quiz/host/{id}/results/download",
    tag = "Host",
    summary = "Download results",
    description = "CSV attachment with `Player Nickname,Total Score` rows, best score first.",
    params(("id" = Uuid, Path, description = "Quiz UUID")),
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv", body = String),
        (status = 404, description = "Quiz not found", body = ErrorResponse),
    )
)]
pub async fn download_results(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    token: HostToken,
) -> Result<impl IntoResponse, QuizError> {
    let csv = state
        .quiz_service
        .export_results_csv(QuizId::from_uuid(id), token.as_deref())
        .await?;
    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"quiz_{id}_results.csv\""),
        ),
    ];
    Ok((headers, csv))
}

/// Host routes, relative to `/api/quiz`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/host", post(create_quiz))
        .route("/host/{id}", get(get_quiz).delete(delete_quiz))
        .route("/host/{id}/questions", get(list_questions).post(add_question))
        .route(
            "/host/{id}/questions/{question_id}",
            put(update_question).delete(delete_question),
        )
        .route("/host/{id}/confirm", post(confirm_quiz))
        .route("/host/{id}/leaderboard", get(leaderboard))
        .route("/host/{id}/results/download", get(download_results))
}
