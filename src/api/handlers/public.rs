//! Public handlers: browsing, joining, answering, leaderboard.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::dto::{
    JoinRequest, JoinResponse, LeaderboardResponse, PublicQuizDetail, QuizDto, QuizListResponse,
    SubmitAnswerRequest, SubmitAnswerResponse,
};
use crate::app_state::AppState;
use crate::domain::QuizId;
use crate::error::{ErrorResponse, QuizError};

/// `GET /api/quiz/public`: List joinable quizzes.
///
/// # Errors
///
/// Returns [`QuizError::Persistence`] on database failure.
#[utoipa::path(
    get,
    path = "/api/quiz/public",
    tag = "Public",
    summary = "List joinable quizzes",
    description = "Returns every quiz in `ready` or `live` status, newest first.",
    responses(
        (status = 200, description = "Joinable quizzes", body = QuizListResponse),
    )
)]
pub async fn list_quizzes(State(state): State<AppState>) -> Result<impl IntoResponse, QuizError> {
    let quizzes = state.quiz_service.list_public().await?;
    Ok(Json(QuizListResponse {
        data: quizzes.iter().map(QuizDto::from).collect(),
    }))
}

/// `GET /api/quiz/public/{id}`: Public quiz view.
///
/// # Errors
///
/// Returns [`QuizError::QuizNotFound`] if the quiz does not exist.
#[utoipa::path(
    get,
    path = "/api/quiz/public/{id}",
    tag = "Public",
    summary = "Get a quiz",
    description = "Returns the quiz and its questions without correct answers.",
    params(("id" = Uuid, Path, description = "Quiz UUID")),
    responses(
        (status = 200, description = "Public quiz view", body = PublicQuizDetail),
        (status = 404, description = "Quiz not found", body = ErrorResponse),
    )
)]
pub async fn get_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, QuizError> {
    let overview = state
        .quiz_service
        .public_overview(QuizId::from_uuid(id))
        .await?;
    Ok(Json(PublicQuizDetail::from(overview)))
}

/// `POST /api/quiz/public/{id}/join`: Join under a nickname.
///
/// # Errors
///
/// Returns [`QuizError::InvalidRequest`] for a bad nickname or
/// [`QuizError::Conflict`] when the quiz is not accepting participants.
#[utoipa::path(
    post,
    path = "/api/quiz/public/{id}/join",
    tag = "Public",
    summary = "Join a quiz",
    description = "Get-or-create on the nickname. Returns 201 for a new participant and 200 when rejoining.",
    params(("id" = Uuid, Path, description = "Quiz UUID")),
    request_body = JoinRequest,
    responses(
        (status = 201, description = "Participant created", body = JoinResponse),
        (status = 200, description = "Participant already existed", body = JoinResponse),
        (status = 400, description = "Invalid nickname", body = ErrorResponse),
        (status = 409, description = "Quiz not joinable", body = ErrorResponse),
    )
)]
pub async fn join(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<JoinRequest>, JsonRejection>,
) -> Result<impl IntoResponse, QuizError> {
    let Json(req) = body?;
    let outcome = state
        .quiz_service
        .join(QuizId::from_uuid(id), &req.nickname)
        .await?;
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(JoinResponse::from(&outcome))))
}

/// `POST /api/quiz/public/{id}/submit_answer`: Submit an answer.
///
/// # Errors
///
/// Returns [`QuizError::Conflict`] unless the quiz is live, a not-found
/// error for an unknown participant or question, or
/// [`QuizError::InvalidRequest`] for a bad option.
#[utoipa::path(
    post,
    path = "/api/quiz/public/{id}/submit_answer",
    tag = "Public",
    summary = "Submit an answer",
    description = "Scores the answer, replaces any earlier answer to the same question, and broadcasts the leaderboard.",
    params(("id" = Uuid, Path, description = "Quiz UUID")),
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Answer scored", body = SubmitAnswerResponse),
        (status = 400, description = "Invalid option or response time", body = ErrorResponse),
        (status = 404, description = "Participant or question not found", body = ErrorResponse),
        (status = 409, description = "Quiz not live", body = ErrorResponse),
    )
)]
pub async fn submit_answer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<SubmitAnswerRequest>, JsonRejection>,
) -> Result<impl IntoResponse, QuizError> {
    let Json(req) = body?;
    let outcome = state
        .quiz_service
        .submit_answer(QuizId::from_uuid(id), req.into())
        .await?;
    Ok(Json(SubmitAnswerResponse::from(&outcome)))
}

/// `GET /api/quiz/public/{id}/leaderboard`: Current leaderboard.
///
/// # Errors
///
/// Returns [`QuizError::QuizNotFound`] if the quiz does not exist.
#[utoipa::path(
    get,
    path = "/api/quiz/public/{id}/leaderboard",
    tag = "Public",
    summary = "Leaderboard",
    params(("id" = Uuid, Path, description = "Quiz UUID")),
    responses(
        (status = 200, description = "Ranked participants", body = LeaderboardResponse),
        (status = 404, description = "Quiz not found", body = ErrorResponse),
    )
)]
pub async fn leaderboard(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, QuizError> {
    let leaderboard = state
        .quiz_service
        .leaderboard(QuizId::from_uuid(id))
        .await?;
    Ok(Json(LeaderboardResponse { leaderboard }))
}

/// Public routes, relative to `/api/quiz`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/public", get(list_quizzes))
        .route("/public/{id}", get(get_quiz))
        .route("/public/{id}/join", post(join))
        .route("/public/{id}/submit_answer", post(submit_answer))
        .route("/public/{id}/leaderboard", get(leaderboard))
}
