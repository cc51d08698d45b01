//! Quiz service: lifecycle, participation and scoring, with broadcasts.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::channels::ChannelLayer;
use crate::domain::participant::{rank_participants, validate_nickname};
use crate::domain::quiz::{DEFAULT_TIME_PER_QUESTION, validate_time_per_question, validate_title};
use crate::domain::scoring::{normalize_response_time, score_answer};
use crate::domain::{
    Answer, AnswerOption, Difficulty, LeaderboardEntry, Participant, Question, QuestionDraft,
    QuestionPatch, Quiz, QuizId, QuizLocks, QuizStatus,
};
use crate::error::QuizError;
use crate::persistence::QuizStore;
use crate::ws::messages::{QuestionPayload, QuizStateData, ServerMessage};

/// Input for [`QuizService::create_quiz`].
#[derive(Debug, Clone)]
pub struct NewQuiz {
    /// Title, trimmed before storing.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Advertised difficulty.
    pub difficulty: Difficulty,
    /// Seconds per question; defaults to 30.
    pub time_per_question: Option<i32>,
}

/// A quiz with its questions and participant count.
#[derive(Debug, Clone)]
pub struct QuizOverview {
    /// The quiz.
    pub quiz: Quiz,
    /// Questions in presentation order.
    pub questions: Vec<Question>,
    /// Number of participants who joined.
    pub participant_count: i64,
}

/// Result of [`QuizService::join`].
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    /// The (possibly pre-existing) participant.
    pub participant: Participant,
    /// Whether this call created the participant.
    pub created: bool,
    /// Participant count after joining.
    pub participant_count: i64,
}

/// An answer as submitted by a participant.
#[derive(Debug, Clone)]
pub struct Submission {
    /// Nickname used when joining.
    pub nickname: String,
    /// Question answered.
    pub question_id: Uuid,
    /// Raw option letter; blank or absent means no answer.
    pub selected_option: Option<String>,
    /// Seconds taken.
    pub response_time: f64,
}

/// Result of [`QuizService::submit_answer`].
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    /// The stored answer.
    pub answer: Answer,
    /// The participant with refreshed totals.
    pub participant: Participant,
}

/// What a socket receives right after connecting.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// Quiz state.
    pub state: QuizStateData,
    /// The current question when live, or the final leaderboard when
    /// completed.
    pub followup: Option<ServerMessage>,
}

/// Orchestration layer for every quiz operation.
///
/// Owns the [`QuizStore`] for state and the [`ChannelLayer`] for group
/// broadcasts. Every mutation on one quiz follows the same pattern: take
/// the quiz lock, load, check host token and status, write, broadcast.
#[derive(Debug, Clone)]
pub struct QuizService {
    store: QuizStore,
    channels: ChannelLayer,
    locks: Arc<QuizLocks>,
}

impl QuizService {
    /// Creates a new `QuizService`.
    #[must_use]
    pub fn new(store: QuizStore, channels: ChannelLayer) -> Self {
        Self {
            store,
            channels,
            locks: Arc::new(QuizLocks::new()),
        }
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &QuizStore {
        &self.store
    }

    /// Returns the channel layer used for broadcasts.
    #[must_use]
    pub fn channels(&self) -> &ChannelLayer {
        &self.channels
    }

    // ── Quiz management ─────────────────────────────────────────────────

    /// Creates a `draft` quiz with a fresh host token.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::InvalidRequest`] for a bad title or timing, or
    /// [`QuizError::Persistence`].
    pub async fn create_quiz(&self, input: NewQuiz) -> Result<Quiz, QuizError> {
        let title = validate_title(&input.title)?;
        let time_per_question = validate_time_per_question(
            input.time_per_question.unwrap_or(DEFAULT_TIME_PER_QUESTION),
        )?;
        let now = Utc::now();
        let quiz = Quiz {
            id: QuizId::new(),
            host_token: Uuid::new_v4().to_string(),
            title,
            description: input.description.trim().to_string(),
            difficulty: input.difficulty,
            status: QuizStatus::Draft,
            time_per_question,
            current_question_index: 0,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        };
        self.store.insert_quiz(&quiz).await?;
        tracing::info!(quiz_id = %quiz.id, title = %quiz.title, "quiz created");
        Ok(quiz)
    }

    /// Loads a quiz without any authorization.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::QuizNotFound`] or [`QuizError::Persistence`].
    pub async fn get_quiz(&self, quiz_id: QuizId) -> Result<Quiz, QuizError> {
        self.store.get_quiz(quiz_id).await
    }

    /// Host view: the quiz with questions (including answers).
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::QuizNotFound`], an authorization error, or
    /// [`QuizError::Persistence`].
    pub async fn host_overview(
        &self,
        quiz_id: QuizId,
        token: Option<&str>,
    ) -> Result<QuizOverview, QuizError> {
        let quiz = self.store.get_quiz(quiz_id).await?;
        quiz.authorize_host(token, "view this quiz")?;
        self.overview(quiz).await
    }

    /// Public view of a quiz. Callers must strip correct answers.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::QuizNotFound`] or [`QuizError::Persistence`].
    pub async fn public_overview(&self, quiz_id: QuizId) -> Result<QuizOverview, QuizError> {
        let quiz = self.store.get_quiz(quiz_id).await?;
        self.overview(quiz).await
    }

    async fn overview(&self, quiz: Quiz) -> Result<QuizOverview, QuizError> {
        let questions = self.store.list_questions(quiz.id).await?;
        let participant_count = self.store.count_participants(quiz.id).await?;
        Ok(QuizOverview {
            quiz,
            questions,
            participant_count,
        })
    }

    /// Lists quizzes participants can currently join.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::Persistence`].
    pub async fn list_public(&self) -> Result<Vec<Quiz>, QuizError> {
        self.store.list_joinable_quizzes().await
    }

    /// Deletes a quiz and everything attached to it.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::QuizNotFound`], an authorization error, or
    /// [`QuizError::Persistence`].
    pub async fn delete_quiz(&self, quiz_id: QuizId, token: Option<&str>) -> Result<(), QuizError> {
        let _guard = self.locks.lock(quiz_id).await;
        let quiz = self.store.get_quiz(quiz_id).await?;
        quiz.authorize_host(token, "delete this quiz")?;
        if !self.store.delete_quiz(quiz_id).await? {
            return Err(QuizError::QuizNotFound(*quiz_id.as_uuid()));
        }
        tracing::info!(%quiz_id, "quiz deleted");
        Ok(())
    }

    // ── Questions ───────────────────────────────────────────────────────

    /// Lists a quiz's questions for its host.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::QuizNotFound`], an authorization error, or
    /// [`QuizError::Persistence`].
    pub async fn list_questions(
        &self,
        quiz_id: QuizId,
        token: Option<&str>,
    ) -> Result<Vec<Question>, QuizError> {
        let quiz = self.store.get_quiz(quiz_id).await?;
        quiz.authorize_host(token, "list questions")?;
        self.store.list_questions(quiz_id).await
    }

    /// Adds a question to an editable quiz.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::Conflict`] once the quiz is live or completed,
    /// [`QuizError::InvalidRequest`] for bad content, and the usual lookup,
    /// authorization and persistence errors.
    pub async fn add_question(
        &self,
        quiz_id: QuizId,
        token: Option<&str>,
        draft: QuestionDraft,
    ) -> Result<Question, QuizError> {
        let _guard = self.locks.lock(quiz_id).await;
        self.editable_quiz(quiz_id, token, "add questions").await?;
        draft.validate()?;

        let [option_a, option_b, option_c, option_d] = draft.options;
        let question = Question {
            id: Uuid::new_v4(),
            quiz_id,
            question_text: draft.question_text.trim().to_string(),
            option_a,
            option_b,
            option_c,
            option_d,
            correct_answer: draft.correct_answer,
            explanation: draft.explanation,
            order: draft.order,
            created_at: Utc::now(),
        };
        self.store.insert_question(&question).await?;
        tracing::info!(%quiz_id, question_id = %question.id, "question added");
        Ok(question)
    }

    /// Applies a partial update to a question of an editable quiz.
    ///
    /// # Errors
    ///
    /// Same as [`Self::add_question`], plus [`QuizError::QuestionNotFound`].
    pub async fn update_question(
        &self,
        quiz_id: QuizId,
        token: Option<&str>,
        question_id: Uuid,
        patch: QuestionPatch,
    ) -> Result<Question, QuizError> {
        let _guard = self.locks.lock(quiz_id).await;
        self.editable_quiz(quiz_id, token, "edit questions").await?;
        let existing = self.store.get_question(quiz_id, question_id).await?;

        let draft = patch.apply(QuestionDraft::from(&existing));
        draft.validate()?;
        let [option_a, option_b, option_c, option_d] = draft.options;
        let question = Question {
            question_text: draft.question_text.trim().to_string(),
            option_a,
            option_b,
            option_c,
            option_d,
            correct_answer: draft.correct_answer,
            explanation: draft.explanation,
            order: draft.order,
            ..existing
        };
        self.store.update_question(&question).await?;
        Ok(question)
    }

    /// Removes a question from an editable quiz.
    ///
    /// # Errors
    ///
    /// Same as [`Self::update_question`].
    pub async fn delete_question(
        &self,
        quiz_id: QuizId,
        token: Option<&str>,
        question_id: Uuid,
    ) -> Result<(), QuizError> {
        let _guard = self.locks.lock(quiz_id).await;
        self.editable_quiz(quiz_id, token, "delete questions").await?;
        if !self.store.delete_question(quiz_id, question_id).await? {
            return Err(QuizError::QuestionNotFound(question_id));
        }
        Ok(())
    }

    async fn editable_quiz(
        &self,
        quiz_id: QuizId,
        token: Option<&str>,
        action: &str,
    ) -> Result<Quiz, QuizError> {
        let quiz = self.store.get_quiz(quiz_id).await?;
        quiz.authorize_host(token, action)?;
        if !quiz.status.is_editable() {
            return Err(QuizError::Conflict(format!(
                "cannot {action} while the quiz is {}",
                quiz.status
            )));
        }
        Ok(quiz)
    }

    /// Marks a quiz `ready`, optionally updating its timing.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::InvalidRequest`] when the quiz has no questions
    /// or the timing is out of range, [`QuizError::Conflict`] once live, and
    /// the usual lookup, authorization and persistence errors.
    pub async fn confirm_quiz(
        &self,
        quiz_id: QuizId,
        token: Option<&str>,
        time_per_question: Option<i32>,
    ) -> Result<Quiz, QuizError> {
        let _guard = self.locks.lock(quiz_id).await;
        let mut quiz = self.editable_quiz(quiz_id, token, "confirm this quiz").await?;
        if self.store.count_questions(quiz_id).await? == 0 {
            return Err(QuizError::InvalidRequest(
                "add at least one question before confirming".to_string(),
            ));
        }
        if let Some(seconds) = time_per_question {
            quiz.time_per_question = validate_time_per_question(seconds)?;
        }
        quiz.status = QuizStatus::Ready;
        self.store.update_quiz(&mut quiz).await?;
        tracing::info!(%quiz_id, "quiz confirmed");
        Ok(quiz)
    }

    // ── Live session ────────────────────────────────────────────────────

    /// Starts a `ready` quiz and broadcasts its first question.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::Conflict`] unless the quiz is `ready`, and the
    /// usual lookup, authorization and persistence errors.
    pub async fn start_quiz(&self, quiz_id: QuizId, token: Option<&str>) -> Result<Quiz, QuizError> {
        let _guard = self.locks.lock(quiz_id).await;
        let mut quiz = self.store.get_quiz(quiz_id).await?;
        quiz.authorize_host(token, "start the quiz")?;
        quiz.require_status(QuizStatus::Ready)?;
        let Some(first) = self.store.question_at(quiz_id, 0).await? else {
            return Err(QuizError::Conflict("quiz has no questions".to_string()));
        };

        quiz.status = QuizStatus::Live;
        quiz.started_at = Some(Utc::now());
        quiz.current_question_index = 0;
        self.store.update_quiz(&mut quiz).await?;
        tracing::info!(%quiz_id, "quiz started");

        self.broadcast(quiz_id, &question_message(&quiz, &first)).await;
        Ok(quiz)
    }

    /// Advances a live quiz, completing it after the last question.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::Conflict`] unless the quiz is `live`, and the
    /// usual lookup, authorization and persistence errors.
    pub async fn next_question(&self, quiz_id: QuizId, token: Option<&str>) -> Result<Quiz, QuizError> {
        let _guard = self.locks.lock(quiz_id).await;
        let mut quiz = self.store.get_quiz(quiz_id).await?;
        quiz.authorize_host(token, "advance the quiz")?;
        quiz.require_status(QuizStatus::Live)?;

        let next_index = quiz.current_question_index.saturating_add(1);
        match self.store.question_at(quiz_id, next_index).await? {
            Some(question) => {
                quiz.current_question_index = next_index;
                self.store.update_quiz(&mut quiz).await?;
                tracing::info!(%quiz_id, index = next_index, "advanced to next question");
                self.broadcast(quiz_id, &question_message(&quiz, &question)).await;
            }
            None => self.complete(&mut quiz).await?,
        }
        Ok(quiz)
    }

    /// Ends a live quiz immediately.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::Conflict`] unless the quiz is `live`, and the
    /// usual lookup, authorization and persistence errors.
    pub async fn end_quiz(&self, quiz_id: QuizId, token: Option<&str>) -> Result<Quiz, QuizError> {
        let _guard = self.locks.lock(quiz_id).await;
        let mut quiz = self.store.get_quiz(quiz_id).await?;
        quiz.authorize_host(token, "end the quiz")?;
        quiz.require_status(QuizStatus::Live)?;
        self.complete(&mut quiz).await?;
        Ok(quiz)
    }

    /// Caller must hold the quiz lock.
    async fn complete(&self, quiz: &mut Quiz) -> Result<(), QuizError> {
        quiz.status = QuizStatus::Completed;
        quiz.completed_at = Some(Utc::now());
        self.store.update_quiz(quiz).await?;
        tracing::info!(quiz_id = %quiz.id, "quiz completed");

        let leaderboard = self.ranked(quiz.id).await?;
        self.broadcast(quiz.id, &ServerMessage::QuizCompleted { leaderboard })
            .await;
        Ok(())
    }

    /// Builds what a newly connected socket should receive.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::QuizNotFound`] or [`QuizError::Persistence`].
    pub async fn session_snapshot(&self, quiz_id: QuizId) -> Result<SessionSnapshot, QuizError> {
        let quiz = self.store.get_quiz(quiz_id).await?;
        let participant_count = self.store.count_participants(quiz_id).await?;
        let followup = match quiz.status {
            QuizStatus::Live => self
                .store
                .question_at(quiz_id, quiz.current_question_index)
                .await?
                .map(|q| question_message(&quiz, &q)),
            QuizStatus::Completed => Some(ServerMessage::QuizCompleted {
                leaderboard: self.ranked(quiz_id).await?,
            }),
            QuizStatus::Draft | QuizStatus::Ready => None,
        };
        Ok(SessionSnapshot {
            state: QuizStateData::new(&quiz, participant_count),
            followup,
        })
    }

    /// Broadcasts the current participant count to the quiz group.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::Persistence`].
    pub async fn announce_participants(&self, quiz_id: QuizId) -> Result<i64, QuizError> {
        let participant_count = self.store.count_participants(quiz_id).await?;
        self.broadcast(quiz_id, &ServerMessage::ParticipantUpdate { participant_count })
            .await;
        Ok(participant_count)
    }

    // ── Participation & scoring ─────────────────────────────────────────

    /// Joins (or rejoins) a quiz under `nickname`.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::InvalidRequest`] for a bad nickname,
    /// [`QuizError::Conflict`] unless the quiz is `ready` or `live`, and
    /// lookup or persistence errors.
    pub async fn join(&self, quiz_id: QuizId, nickname: &str) -> Result<JoinOutcome, QuizError> {
        let nickname = validate_nickname(nickname)?;
        let _guard = self.locks.lock(quiz_id).await;
        let quiz = self.store.get_quiz(quiz_id).await?;
        if !quiz.status.is_joinable() {
            return Err(QuizError::Conflict(format!(
                "quiz is {} and not accepting participants",
                quiz.status
            )));
        }
        let (participant, created) = self.store.get_or_create_participant(quiz_id, &nickname).await?;
        if created {
            tracing::info!(%quiz_id, %nickname, "participant joined");
        }
        let participant_count = self.announce_participants(quiz_id).await?;
        Ok(JoinOutcome {
            participant,
            created,
            participant_count,
        })
    }

    /// Scores and stores an answer, then broadcasts the leaderboard.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::Conflict`] unless the quiz is `live`,
    /// [`QuizError::ParticipantNotFound`] / [`QuizError::QuestionNotFound`]
    /// for unknown references, [`QuizError::InvalidRequest`] for a bad
    /// option or response time, and persistence errors.
    pub async fn submit_answer(
        &self,
        quiz_id: QuizId,
        submission: Submission,
    ) -> Result<SubmitOutcome, QuizError> {
        let selected = AnswerOption::parse_submission(submission.selected_option.as_deref())?;
        let Some(response_time) = normalize_response_time(submission.response_time) else {
            return Err(QuizError::InvalidRequest(
                "response_time must be a finite number".to_string(),
            ));
        };

        let _guard = self.locks.lock(quiz_id).await;
        let quiz = self.store.get_quiz(quiz_id).await?;
        quiz.require_status(QuizStatus::Live)?;
        let nickname = submission.nickname.trim();
        let participant = self
            .store
            .find_participant(quiz_id, nickname)
            .await?
            .ok_or_else(|| QuizError::ParticipantNotFound(nickname.to_string()))?;
        let question = self.store.get_question(quiz_id, submission.question_id).await?;

        let scored = score_answer(
            selected,
            question.correct_answer,
            response_time,
            quiz.time_per_question,
        );
        let answer = self
            .store
            .upsert_answer(&Answer {
                id: Uuid::new_v4(),
                participant_id: participant.id,
                question_id: question.id,
                selected_option: selected,
                is_correct: scored.is_correct,
                response_time,
                score: scored.score,
                answered_at: Utc::now(),
            })
            .await?;
        let participant = self.store.refresh_participant_totals(participant.id).await?;
        tracing::debug!(
            %quiz_id,
            nickname = %participant.nickname,
            score = answer.score,
            total = participant.total_score,
            "answer scored"
        );

        let data = self.ranked(quiz_id).await?;
        self.broadcast(quiz_id, &ServerMessage::Leaderboard { data }).await;
        Ok(SubmitOutcome { answer, participant })
    }

    /// Returns the ranked leaderboard of a quiz.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::QuizNotFound`] or [`QuizError::Persistence`].
    pub async fn leaderboard(&self, quiz_id: QuizId) -> Result<Vec<LeaderboardEntry>, QuizError> {
        self.store.get_quiz(quiz_id).await?;
        self.ranked(quiz_id).await
    }

    /// Host-only leaderboard.
    ///
    /// # Errors
    ///
    /// Same as [`Self::leaderboard`], plus authorization errors.
    pub async fn host_leaderboard(
        &self,
        quiz_id: QuizId,
        token: Option<&str>,
    ) -> Result<Vec<LeaderboardEntry>, QuizError> {
        let quiz = self.store.get_quiz(quiz_id).await?;
        quiz.authorize_host(token, "view the leaderboard")?;
        self.ranked(quiz_id).await
    }

    /// Renders the results as CSV: `Player Nickname,Total Score`, best
    /// score first.
    ///
    /// # Errors
    ///
    /// Returns lookup, authorization and persistence errors, or
    /// [`QuizError::Internal`] if the CSV cannot be written.
    pub async fn export_results_csv(
        &self,
        quiz_id: QuizId,
        token: Option<&str>,
    ) -> Result<String, QuizError> {
        let entries = self.host_leaderboard(quiz_id, token).await?;
        let mut writer = csv::Writer::from_writer(Vec::new());
        let csv_error = |e: csv::Error| QuizError::Internal(format!("csv export failed: {e}"));
        writer
            .write_record(["Player Nickname", "Total Score"])
            .map_err(csv_error)?;
        for entry in &entries {
            writer
                .write_record([entry.nickname.as_str(), &entry.total_score.to_string()])
                .map_err(csv_error)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| QuizError::Internal(format!("csv export failed: {e}")))?;
        String::from_utf8(bytes).map_err(|e| QuizError::Internal(e.to_string()))
    }

    async fn ranked(&self, quiz_id: QuizId) -> Result<Vec<LeaderboardEntry>, QuizError> {
        let participants = self.store.list_participants(quiz_id).await?;
        Ok(rank_participants(participants))
    }

    /// Delivery failures are logged; the database already holds the state.
    async fn broadcast(&self, quiz_id: QuizId, message: &ServerMessage) {
        if let Err(e) = self.channels.group_send(&quiz_id.group_name(), message).await {
            tracing::warn!(%quiz_id, error = %e, "group broadcast failed");
        }
    }
}

fn question_message(quiz: &Quiz, question: &Question) -> ServerMessage {
    ServerMessage::Question {
        question: QuestionPayload::new(question, quiz.current_question_index),
        time_limit: quiz.time_per_question,
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::persistence::Database;

    async fn make_service() -> QuizService {
        let Ok(db) = Database::in_memory().await else {
            panic!("in-memory database");
        };
        QuizService::new(QuizStore::new(db), ChannelLayer::in_memory(32))
    }

    async fn watch(service: &QuizService, quiz_id: QuizId) -> mpsc::Receiver<ServerMessage> {
        let (channel, rx) = service.channels().new_channel().await;
        let Ok(()) = service.channels().group_add(&quiz_id.group_name(), &channel).await else {
            panic!("group_add failed");
        };
        rx
    }

    fn new_quiz(title: &str) -> NewQuiz {
        NewQuiz {
            title: title.to_string(),
            description: String::new(),
            difficulty: Difficulty::Medium,
            time_per_question: Some(20),
        }
    }

    fn draft(text: &str, correct: AnswerOption) -> QuestionDraft {
        QuestionDraft {
            question_text: text.to_string(),
            options: ["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer: correct,
            explanation: String::new(),
            order: 0,
        }
    }

    /// Creates a confirmed quiz with two questions.
    async fn ready_quiz(service: &QuizService) -> (Quiz, Vec<Question>) {
        let Ok(quiz) = service.create_quiz(new_quiz("Capitals")).await else {
            panic!("create failed");
        };
        let token = Some(quiz.host_token.as_str());
        let mut questions = Vec::new();
        for (i, correct) in [AnswerOption::A, AnswerOption::B].into_iter().enumerate() {
            let mut d = draft(&format!("q{i}"), correct);
            d.order = i32::try_from(i).unwrap_or_default();
            let Ok(q) = service.add_question(quiz.id, token, d).await else {
                panic!("add question failed");
            };
            questions.push(q);
        }
        let Ok(quiz) = service.confirm_quiz(quiz.id, token, None).await else {
            panic!("confirm failed");
        };
        (quiz, questions)
    }

    #[tokio::test]
    async fn create_quiz_is_draft_with_token() {
        let service = make_service().await;
        let Ok(quiz) = service.create_quiz(new_quiz("  Trimmed  ")).await else {
            panic!("create failed");
        };
        assert_eq!(quiz.status, QuizStatus::Draft);
        assert_eq!(quiz.title, "Trimmed");
        assert!(!quiz.host_token.is_empty());
    }

    #[tokio::test]
    async fn create_quiz_rejects_bad_timing() {
        let service = make_service().await;
        let mut input = new_quiz("Timing");
        input.time_per_question = Some(0);
        assert!(matches!(
            service.create_quiz(input).await,
            Err(QuizError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn confirm_requires_questions() {
        let service = make_service().await;
        let Ok(quiz) = service.create_quiz(new_quiz("Empty")).await else {
            panic!("create failed");
        };
        let result = service
            .confirm_quiz(quiz.id, Some(&quiz.host_token), None)
            .await;
        assert!(matches!(result, Err(QuizError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn host_token_is_checked() {
        let service = make_service().await;
        let (quiz, _) = ready_quiz(&service).await;
        assert!(matches!(
            service.start_quiz(quiz.id, None).await,
            Err(QuizError::Unauthorized(_))
        ));
        assert!(matches!(
            service.start_quiz(quiz.id, Some("nope")).await,
            Err(QuizError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn start_requires_ready() {
        let service = make_service().await;
        let Ok(quiz) = service.create_quiz(new_quiz("Draft")).await else {
            panic!("create failed");
        };
        assert!(matches!(
            service.start_quiz(quiz.id, Some(&quiz.host_token)).await,
            Err(QuizError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn questions_are_frozen_once_live() {
        let service = make_service().await;
        let (quiz, questions) = ready_quiz(&service).await;
        let token = Some(quiz.host_token.as_str());
        assert!(service.start_quiz(quiz.id, token).await.is_ok());

        let add = service
            .add_question(quiz.id, token, draft("late", AnswerOption::C))
            .await;
        assert!(matches!(add, Err(QuizError::Conflict(_))));
        let Some(first) = questions.first() else {
            panic!("questions exist");
        };
        let delete = service.delete_question(quiz.id, token, first.id).await;
        assert!(matches!(delete, Err(QuizError::Conflict(_))));
    }

    #[tokio::test]
    async fn partial_update_keeps_other_fields() {
        let service = make_service().await;
        let Ok(quiz) = service.create_quiz(new_quiz("Edit")).await else {
            panic!("create failed");
        };
        let token = Some(quiz.host_token.as_str());
        let Ok(q) = service
            .add_question(quiz.id, token, draft("before", AnswerOption::A))
            .await
        else {
            panic!("add failed");
        };
        let patch = QuestionPatch {
            question_text: Some("after".to_string()),
            ..QuestionPatch::default()
        };
        let Ok(updated) = service.update_question(quiz.id, token, q.id, patch).await else {
            panic!("update failed");
        };
        assert_eq!(updated.question_text, "after");
        assert_eq!(updated.correct_answer, AnswerOption::A);
        assert_eq!(updated.option_b, "b");
    }

    #[tokio::test]
    async fn start_broadcasts_first_question() {
        let service = make_service().await;
        let (quiz, questions) = ready_quiz(&service).await;
        let mut rx = watch(&service, quiz.id).await;

        let Ok(live) = service.start_quiz(quiz.id, Some(&quiz.host_token)).await else {
            panic!("start failed");
        };
        assert_eq!(live.status, QuizStatus::Live);
        assert!(live.started_at.is_some());

        let Some(ServerMessage::Question { question, time_limit }) = rx.recv().await else {
            panic!("expected question broadcast");
        };
        assert_eq!(Some(question.id), questions.first().map(|q| q.id));
        assert_eq!(question.index, 0);
        assert_eq!(time_limit, 20);
    }

    #[tokio::test]
    async fn next_after_last_question_completes() {
        let service = make_service().await;
        let (quiz, _) = ready_quiz(&service).await;
        let token = Some(quiz.host_token.as_str());
        assert!(service.start_quiz(quiz.id, token).await.is_ok());
        let mut rx = watch(&service, quiz.id).await;

        let Ok(second) = service.next_question(quiz.id, token).await else {
            panic!("next failed");
        };
        assert_eq!(second.current_question_index, 1);
        assert!(matches!(
            rx.recv().await,
            Some(ServerMessage::Question { .. })
        ));

        let Ok(done) = service.next_question(quiz.id, token).await else {
            panic!("next failed");
        };
        assert_eq!(done.status, QuizStatus::Completed);
        assert!(done.completed_at.is_some());
        assert!(matches!(
            rx.recv().await,
            Some(ServerMessage::QuizCompleted { .. })
        ));
        assert!(matches!(
            service.next_question(quiz.id, token).await,
            Err(QuizError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn end_quiz_completes_early() {
        let service = make_service().await;
        let (quiz, _) = ready_quiz(&service).await;
        let token = Some(quiz.host_token.as_str());
        assert!(service.start_quiz(quiz.id, token).await.is_ok());
        let Ok(done) = service.end_quiz(quiz.id, token).await else {
            panic!("end failed");
        };
        assert_eq!(done.status, QuizStatus::Completed);
    }

    #[tokio::test]
    async fn join_requires_confirmed_quiz() {
        let service = make_service().await;
        let Ok(quiz) = service.create_quiz(new_quiz("Draft")).await else {
            panic!("create failed");
        };
        assert!(matches!(
            service.join(quiz.id, "ana").await,
            Err(QuizError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn join_is_get_or_create_and_announces() {
        let service = make_service().await;
        let (quiz, _) = ready_quiz(&service).await;
        let mut rx = watch(&service, quiz.id).await;

        let Ok(first) = service.join(quiz.id, " ana ").await else {
            panic!("join failed");
        };
        assert!(first.created);
        assert_eq!(first.participant.nickname, "ana");
        assert_eq!(
            rx.recv().await,
            Some(ServerMessage::ParticipantUpdate { participant_count: 1 })
        );

        let Ok(again) = service.join(quiz.id, "ana").await else {
            panic!("rejoin failed");
        };
        assert!(!again.created);
        assert_eq!(again.participant_count, 1);
    }

    #[tokio::test]
    async fn submit_scores_and_broadcasts_leaderboard() {
        let service = make_service().await;
        let (quiz, questions) = ready_quiz(&service).await;
        let token = Some(quiz.host_token.as_str());
        let _ = service.join(quiz.id, "ana").await;
        let _ = service.join(quiz.id, "ben").await;
        assert!(service.start_quiz(quiz.id, token).await.is_ok());
        let mut rx = watch(&service, quiz.id).await;
        let Some(q0) = questions.first() else {
            panic!("questions exist");
        };

        let submit = |nickname: &str, option: &str, time: f64| Submission {
            nickname: nickname.to_string(),
            question_id: q0.id,
            selected_option: Some(option.to_string()),
            response_time: time,
        };

        let Ok(ana) = service.submit_answer(quiz.id, submit("ana", "a", 10.0)).await else {
            panic!("submit failed");
        };
        assert!(ana.answer.is_correct);
        assert_eq!(ana.answer.score, 125);
        assert_eq!(ana.participant.total_score, 125);

        let Ok(ben) = service.submit_answer(quiz.id, submit("ben", "C", 1.0)).await else {
            panic!("submit failed");
        };
        assert!(!ben.answer.is_correct);
        assert_eq!(ben.answer.score, 0);

        let _first = rx.recv().await;
        let Some(ServerMessage::Leaderboard { data }) = rx.recv().await else {
            panic!("expected leaderboard broadcast");
        };
        let names: Vec<&str> = data.iter().map(|e| e.nickname.as_str()).collect();
        assert_eq!(names, ["ana", "ben"]);
        assert_eq!(data.first().map(|e| e.rank), Some(1));
    }

    #[tokio::test]
    async fn resubmitting_replaces_previous_answer() {
        let service = make_service().await;
        let (quiz, questions) = ready_quiz(&service).await;
        let _ = service.join(quiz.id, "ana").await;
        assert!(service.start_quiz(quiz.id, Some(&quiz.host_token)).await.is_ok());
        let Some(q0) = questions.first() else {
            panic!("questions exist");
        };

        for (option, time) in [("B", 3.0), ("A", 0.0)] {
            let _ = service
                .submit_answer(
                    quiz.id,
                    Submission {
                        nickname: "ana".to_string(),
                        question_id: q0.id,
                        selected_option: Some(option.to_string()),
                        response_time: time,
                    },
                )
                .await;
        }
        let Ok(board) = service.leaderboard(quiz.id).await else {
            panic!("leaderboard failed");
        };
        let Some(entry) = board.first() else {
            panic!("ana is ranked");
        };
        assert_eq!(entry.total_score, 150);
        assert_eq!(entry.correct_answers, 1);
        assert!(entry.total_response_time.abs() < 1e-9);
    }

    #[tokio::test]
    async fn submit_validates_references() {
        let service = make_service().await;
        let (quiz, _) = ready_quiz(&service).await;
        let _ = service.join(quiz.id, "ana").await;
        assert!(service.start_quiz(quiz.id, Some(&quiz.host_token)).await.is_ok());

        let unknown_question = Submission {
            nickname: "ana".to_string(),
            question_id: Uuid::new_v4(),
            selected_option: None,
            response_time: 1.0,
        };
        assert!(matches!(
            service.submit_answer(quiz.id, unknown_question.clone()).await,
            Err(QuizError::QuestionNotFound(_))
        ));

        let unknown_player = Submission {
            nickname: "zed".to_string(),
            ..unknown_question.clone()
        };
        assert!(matches!(
            service.submit_answer(quiz.id, unknown_player).await,
            Err(QuizError::ParticipantNotFound(_))
        ));

        let bad_option = Submission {
            selected_option: Some("E".to_string()),
            ..unknown_question
        };
        assert!(matches!(
            service.submit_answer(quiz.id, bad_option).await,
            Err(QuizError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn submit_requires_live() {
        let service = make_service().await;
        let (quiz, questions) = ready_quiz(&service).await;
        let _ = service.join(quiz.id, "ana").await;
        let Some(q0) = questions.first() else {
            panic!("questions exist");
        };
        let result = service
            .submit_answer(
                quiz.id,
                Submission {
                    nickname: "ana".to_string(),
                    question_id: q0.id,
                    selected_option: Some("A".to_string()),
                    response_time: 1.0,
                },
            )
            .await;
        assert!(matches!(result, Err(QuizError::Conflict(_))));
    }

    #[tokio::test]
    async fn snapshot_includes_current_question_when_live() {
        let service = make_service().await;
        let (quiz, _) = ready_quiz(&service).await;
        let Ok(before) = service.session_snapshot(quiz.id).await else {
            panic!("snapshot failed");
        };
        assert!(before.followup.is_none());
        assert_eq!(before.state.status, QuizStatus::Ready);

        assert!(service.start_quiz(quiz.id, Some(&quiz.host_token)).await.is_ok());
        let Ok(live) = service.session_snapshot(quiz.id).await else {
            panic!("snapshot failed");
        };
        assert!(matches!(live.followup, Some(ServerMessage::Question { .. })));
    }

    #[tokio::test]
    async fn csv_export_orders_by_score() {
        let service = make_service().await;
        let (quiz, questions) = ready_quiz(&service).await;
        let token = Some(quiz.host_token.as_str());
        let _ = service.join(quiz.id, "low").await;
        let _ = service.join(quiz.id, "high").await;
        assert!(service.start_quiz(quiz.id, token).await.is_ok());
        let Some(q0) = questions.first() else {
            panic!("questions exist");
        };
        let _ = service
            .submit_answer(
                quiz.id,
                Submission {
                    nickname: "high".to_string(),
                    question_id: q0.id,
                    selected_option: Some("A".to_string()),
                    response_time: 20.0,
                },
            )
            .await;

        let Ok(csv) = service.export_results_csv(quiz.id, token).await else {
            panic!("export failed");
        };
        assert_eq!(csv, "Player Nickname,Total Score\nhigh,100\nlow,0\n");
        assert!(matches!(
            service.export_results_csv(quiz.id, None).await,
            Err(QuizError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn delete_quiz_removes_everything() {
        let service = make_service().await;
        let (quiz, _) = ready_quiz(&service).await;
        assert!(matches!(
            service.delete_quiz(quiz.id, Some("wrong")).await,
            Err(QuizError::Forbidden(_))
        ));
        assert!(service.delete_quiz(quiz.id, Some(&quiz.host_token)).await.is_ok());
        assert!(matches!(
            service.get_quiz(quiz.id).await,
            Err(QuizError::QuizNotFound(_))
        ));
    }

    #[tokio::test]
    async fn unknown_quizzes_leave_no_lock_entries() {
        let service = make_service().await;
        for _ in 0..100 {
            let id = QuizId::new();
            assert!(matches!(
                service.join(id, "ana").await,
                Err(QuizError::QuizNotFound(_))
            ));
            let submission = Submission {
                nickname: "ana".to_string(),
                question_id: Uuid::new_v4(),
                selected_option: Some("A".to_string()),
                response_time: 1.0,
            };
            assert!(service.submit_answer(id, submission).await.is_err());
        }
        assert!(service.locks.is_empty());
    }

    #[tokio::test]
    async fn finished_quiz_releases_its_lock_entry() {
        let service = make_service().await;
        let (quiz, _) = ready_quiz(&service).await;
        let token = Some(quiz.host_token.as_str());
        assert!(service.start_quiz(quiz.id, token).await.is_ok());
        assert!(service.end_quiz(quiz.id, token).await.is_ok());
        assert!(service.locks.is_empty());
    }
}
