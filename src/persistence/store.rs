//! Quiz data access shared by both database backends.
//!
//! Every query is plain SQL that SQLite and PostgreSQL both accept.
//! Placeholders are numbered in order of appearance and never reused.

use chrono::Utc;
use uuid::Uuid;

use super::database::{Database, with_pool};
use super::models::{AnswerRow, ParticipantRow, QuestionRow, QuizRow};
use crate::domain::{Answer, Participant, Question, Quiz, QuizId};
use crate::error::QuizError;

const QUIZ_COLUMNS: &str = "id, host_token, title, description, difficulty, status, \
     time_per_question, current_question_index, created_at, updated_at, started_at, completed_at";

const QUESTION_COLUMNS: &str = "id, quiz_id, question_text, option_a, option_b, option_c, \
     option_d, correct_answer, explanation, position, created_at";

const PARTICIPANT_COLUMNS: &str =
    "id, quiz_id, nickname, joined_at, total_score, correct_answers, total_response_time";

const ANSWER_COLUMNS: &str = "id, participant_id, question_id, selected_option, is_correct, \
     response_time, score, answered_at";

/// Repository for quizzes, questions, participants and answers.
#[derive(Debug, Clone)]
pub struct QuizStore {
    db: Database,
}

impl QuizStore {
    /// Wraps an open (and migrated) database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns the underlying database.
    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    // ── Quizzes ─────────────────────────────────────────────────────────

    /// Inserts a new quiz.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::Persistence`] on database failure.
    pub async fn insert_quiz(&self, quiz: &Quiz) -> Result<(), QuizError> {
        let sql = format!(
            "INSERT INTO quizzes ({QUIZ_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
        );
        with_pool!(&self.db, |pool| {
            sqlx::query(&sql)
                .bind(*quiz.id.as_uuid())
                .bind(&quiz.host_token)
                .bind(&quiz.title)
                .bind(&quiz.description)
                .bind(quiz.difficulty.as_str())
                .bind(quiz.status.as_str())
                .bind(quiz.time_per_question)
                .bind(quiz.current_question_index)
                .bind(quiz.created_at)
                .bind(quiz.updated_at)
                .bind(quiz.started_at)
                .bind(quiz.completed_at)
                .execute(pool)
                .await?;
        });
        Ok(())
    }

    /// Loads a quiz by ID.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::Persistence`] on database failure.
    pub async fn find_quiz(&self, quiz_id: QuizId) -> Result<Option<Quiz>, QuizError> {
        let sql = format!("SELECT {QUIZ_COLUMNS} FROM quizzes WHERE id = $1");
        let row: Option<QuizRow> = with_pool!(&self.db, |pool| {
            sqlx::query_as(&sql)
                .bind(*quiz_id.as_uuid())
                .fetch_optional(pool)
                .await?
        });
        row.map(Quiz::try_from).transpose()
    }

    /// Loads a quiz by ID, failing if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::QuizNotFound`] or [`QuizError::Persistence`].
    pub async fn get_quiz(&self, quiz_id: QuizId) -> Result<Quiz, QuizError> {
        self.find_quiz(quiz_id)
            .await?
            .ok_or(QuizError::QuizNotFound(*quiz_id.as_uuid()))
    }

    /// Lists quizzes participants can join (`ready` or `live`), newest first.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::Persistence`] on database failure.
    pub async fn list_joinable_quizzes(&self) -> Result<Vec<Quiz>, QuizError> {
        let sql = format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes WHERE status IN ($1, $2) ORDER BY created_at DESC"
        );
        let rows: Vec<QuizRow> = with_pool!(&self.db, |pool| {
            sqlx::query_as(&sql)
                .bind("ready")
                .bind("live")
                .fetch_all(pool)
                .await?
        });
        rows.into_iter().map(Quiz::try_from).collect()
    }

    /// Persists the mutable fields of `quiz` and bumps `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::QuizNotFound`] if the row is gone, or
    /// [`QuizError::Persistence`] on database failure.
    pub async fn update_quiz(&self, quiz: &mut Quiz) -> Result<(), QuizError> {
        quiz.updated_at = Utc::now();
        let sql = "UPDATE quizzes SET title = $1, description = $2, difficulty = $3, status = $4, \
                   time_per_question = $5, current_question_index = $6, updated_at = $7, \
                   started_at = $8, completed_at = $9 WHERE id = $10";
        let affected = with_pool!(&self.db, |pool| {
            sqlx::query(sql)
                .bind(&quiz.title)
                .bind(&quiz.description)
                .bind(quiz.difficulty.as_str())
                .bind(quiz.status.as_str())
                .bind(quiz.time_per_question)
                .bind(quiz.current_question_index)
                .bind(quiz.updated_at)
                .bind(quiz.started_at)
                .bind(quiz.completed_at)
                .bind(*quiz.id.as_uuid())
                .execute(pool)
                .await?
                .rows_affected()
        });
        if affected == 0 {
            return Err(QuizError::QuizNotFound(*quiz.id.as_uuid()));
        }
        Ok(())
    }

    /// Deletes a quiz along with its questions, participants and answers.
    ///
    /// Returns `false` if the quiz did not exist.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::Persistence`] on database failure.
    pub async fn delete_quiz(&self, quiz_id: QuizId) -> Result<bool, QuizError> {
        let affected = with_pool!(&self.db, |pool| {
            sqlx::query("DELETE FROM quizzes WHERE id = $1")
                .bind(*quiz_id.as_uuid())
                .execute(pool)
                .await?
                .rows_affected()
        });
        Ok(affected > 0)
    }

    // ── Questions ───────────────────────────────────────────────────────

    /// Inserts a question.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::Persistence`] on database failure.
    pub async fn insert_question(&self, question: &Question) -> Result<(), QuizError> {
        let sql = format!(
            "INSERT INTO questions ({QUESTION_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        );
        with_pool!(&self.db, |pool| {
            sqlx::query(&sql)
                .bind(question.id)
                .bind(*question.quiz_id.as_uuid())
                .bind(&question.question_text)
                .bind(&question.option_a)
                .bind(&question.option_b)
                .bind(&question.option_c)
                .bind(&question.option_d)
                .bind(question.correct_answer.as_str())
                .bind(&question.explanation)
                .bind(question.order)
                .bind(question.created_at)
                .execute(pool)
                .await?;
        });
        Ok(())
    }

    /// Overwrites the content of an existing question.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::QuestionNotFound`] or [`QuizError::Persistence`].
    pub async fn update_question(&self, question: &Question) -> Result<(), QuizError> {
        let sql = "UPDATE questions SET question_text = $1, option_a = $2, option_b = $3, \
                   option_c = $4, option_d = $5, correct_answer = $6, explanation = $7, \
                   position = $8 WHERE id = $9 AND quiz_id = $10";
        let affected = with_pool!(&self.db, |pool| {
            sqlx::query(sql)
                .bind(&question.question_text)
                .bind(&question.option_a)
                .bind(&question.option_b)
                .bind(&question.option_c)
                .bind(&question.option_d)
                .bind(question.correct_answer.as_str())
                .bind(&question.explanation)
                .bind(question.order)
                .bind(question.id)
                .bind(*question.quiz_id.as_uuid())
                .execute(pool)
                .await?
                .rows_affected()
        });
        if affected == 0 {
            return Err(QuizError::QuestionNotFound(question.id));
        }
        Ok(())
    }

    /// Deletes a question from a quiz. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::Persistence`] on database failure.
    pub async fn delete_question(&self, quiz_id: QuizId, question_id: Uuid) -> Result<bool, QuizError> {
        let affected = with_pool!(&self.db, |pool| {
            sqlx::query("DELETE FROM questions WHERE id = $1 AND quiz_id = $2")
                .bind(question_id)
                .bind(*quiz_id.as_uuid())
                .execute(pool)
                .await?
                .rows_affected()
        });
        Ok(affected > 0)
    }

    /// Loads one question of a quiz.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::QuestionNotFound`] or [`QuizError::Persistence`].
    pub async fn get_question(&self, quiz_id: QuizId, question_id: Uuid) -> Result<Question, QuizError> {
        let sql = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1 AND quiz_id = $2");
        let row: Option<QuestionRow> = with_pool!(&self.db, |pool| {
            sqlx::query_as(&sql)
                .bind(question_id)
                .bind(*quiz_id.as_uuid())
                .fetch_optional(pool)
                .await?
        });
        row.ok_or(QuizError::QuestionNotFound(question_id))
            .and_then(Question::try_from)
    }

    /// Lists a quiz's questions in presentation order.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::Persistence`] on database failure.
    pub async fn list_questions(&self, quiz_id: QuizId) -> Result<Vec<Question>, QuizError> {
        let sql = format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE quiz_id = $1 \
             ORDER BY position ASC, created_at ASC"
        );
        let rows: Vec<QuestionRow> = with_pool!(&self.db, |pool| {
            sqlx::query_as(&sql)
                .bind(*quiz_id.as_uuid())
                .fetch_all(pool)
                .await?
        });
        rows.into_iter().map(Question::try_from).collect()
    }

    /// Loads the question at `index` in presentation order, if any.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::Persistence`] on database failure.
    pub async fn question_at(&self, quiz_id: QuizId, index: i32) -> Result<Option<Question>, QuizError> {
        if index < 0 {
            return Ok(None);
        }
        let sql = format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE quiz_id = $1 \
             ORDER BY position ASC, created_at ASC LIMIT 1 OFFSET $2"
        );
        let row: Option<QuestionRow> = with_pool!(&self.db, |pool| {
            sqlx::query_as(&sql)
                .bind(*quiz_id.as_uuid())
                .bind(i64::from(index))
                .fetch_optional(pool)
                .await?
        });
        row.map(Question::try_from).transpose()
    }

    /// Counts a quiz's questions.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::Persistence`] on database failure.
    pub async fn count_questions(&self, quiz_id: QuizId) -> Result<i64, QuizError> {
        let count: i64 = with_pool!(&self.db, |pool| {
            sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE quiz_id = $1")
                .bind(*quiz_id.as_uuid())
                .fetch_one(pool)
                .await?
        });
        Ok(count)
    }

    // ── Participants ────────────────────────────────────────────────────

    /// Returns the participant with `nickname`, creating it if needed.
    ///
    /// The boolean is `true` when this call created the row.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::Persistence`] on database failure.
    pub async fn get_or_create_participant(
        &self,
        quiz_id: QuizId,
        nickname: &str,
    ) -> Result<(Participant, bool), QuizError> {
        let sql = format!(
            "INSERT INTO participants ({PARTICIPANT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (quiz_id, nickname) DO NOTHING"
        );
        let inserted = with_pool!(&self.db, |pool| {
            sqlx::query(&sql)
                .bind(Uuid::new_v4())
                .bind(*quiz_id.as_uuid())
                .bind(nickname)
                .bind(Utc::now())
                .bind(0_i32)
                .bind(0_i32)
                .bind(0.0_f64)
                .execute(pool)
                .await?
                .rows_affected()
        });
        let participant = self
            .find_participant(quiz_id, nickname)
            .await?
            .ok_or_else(|| QuizError::Internal(format!("participant {nickname:?} vanished")))?;
        Ok((participant, inserted > 0))
    }

    /// Looks up a participant by nickname.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::Persistence`] on database failure.
    pub async fn find_participant(
        &self,
        quiz_id: QuizId,
        nickname: &str,
    ) -> Result<Option<Participant>, QuizError> {
        let sql = format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE quiz_id = $1 AND nickname = $2"
        );
        let row: Option<ParticipantRow> = with_pool!(&self.db, |pool| {
            sqlx::query_as(&sql)
                .bind(*quiz_id.as_uuid())
                .bind(nickname)
                .fetch_optional(pool)
                .await?
        });
        Ok(row.map(Participant::from))
    }

    /// Lists every participant of a quiz in join order.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::Persistence`] on database failure.
    pub async fn list_participants(&self, quiz_id: QuizId) -> Result<Vec<Participant>, QuizError> {
        let sql = format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE quiz_id = $1 ORDER BY joined_at ASC"
        );
        let rows: Vec<ParticipantRow> = with_pool!(&self.db, |pool| {
            sqlx::query_as(&sql)
                .bind(*quiz_id.as_uuid())
                .fetch_all(pool)
                .await?
        });
        Ok(rows.into_iter().map(Participant::from).collect())
    }

    /// Counts a quiz's participants.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::Persistence`] on database failure.
    pub async fn count_participants(&self, quiz_id: QuizId) -> Result<i64, QuizError> {
        let count: i64 = with_pool!(&self.db, |pool| {
            sqlx::query_scalar("SELECT COUNT(*) FROM participants WHERE quiz_id = $1")
                .bind(*quiz_id.as_uuid())
                .fetch_one(pool)
                .await?
        });
        Ok(count)
    }

    // ── Answers ─────────────────────────────────────────────────────────

    /// Inserts or replaces the participant's answer to a question and
    /// returns the stored row.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::Persistence`] on database failure.
    pub async fn upsert_answer(&self, answer: &Answer) -> Result<Answer, QuizError> {
        let sql = format!(
            "INSERT INTO answers ({ANSWER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (participant_id, question_id) DO UPDATE SET \
             selected_option = excluded.selected_option, is_correct = excluded.is_correct, \
             response_time = excluded.response_time, score = excluded.score, \
             answered_at = excluded.answered_at"
        );
        let selected = answer.selected_option.map_or("", |o| o.as_str());
        with_pool!(&self.db, |pool| {
            sqlx::query(&sql)
                .bind(answer.id)
                .bind(answer.participant_id)
                .bind(answer.question_id)
                .bind(selected)
                .bind(answer.is_correct)
                .bind(answer.response_time)
                .bind(answer.score)
                .bind(answer.answered_at)
                .execute(pool)
                .await?;
        });

        let sql = format!(
            "SELECT {ANSWER_COLUMNS} FROM answers WHERE participant_id = $1 AND question_id = $2"
        );
        let row: AnswerRow = with_pool!(&self.db, |pool| {
            sqlx::query_as(&sql)
                .bind(answer.participant_id)
                .bind(answer.question_id)
                .fetch_one(pool)
                .await?
        });
        Answer::try_from(row)
    }

    /// Recomputes a participant's cached totals from their stored answers
    /// and returns the updated participant.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::Persistence`] on database failure.
    pub async fn refresh_participant_totals(&self, participant_id: Uuid) -> Result<Participant, QuizError> {
        let sql = "UPDATE participants SET \
                   total_score = (SELECT COALESCE(SUM(score), 0) FROM answers WHERE participant_id = $1), \
                   correct_answers = (SELECT COUNT(*) FROM answers WHERE participant_id = $2 AND is_correct = $3), \
                   total_response_time = (SELECT COALESCE(SUM(response_time), 0) FROM answers WHERE participant_id = $4) \
                   WHERE id = $5";
        with_pool!(&self.db, |pool| {
            sqlx::query(sql)
                .bind(participant_id)
                .bind(participant_id)
                .bind(true)
                .bind(participant_id)
                .bind(participant_id)
                .execute(pool)
                .await?;
        });

        let sql = format!("SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE id = $1");
        let row: ParticipantRow = with_pool!(&self.db, |pool| {
            sqlx::query_as(&sql).bind(participant_id).fetch_one(pool).await?
        });
        Ok(Participant::from(row))
    }

    /// Lists a participant's answers.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::Persistence`] on database failure.
    #[cfg(test)]
    pub(crate) async fn list_answers(&self, participant_id: Uuid) -> Result<Vec<Answer>, QuizError> {
        let sql = format!(
            "SELECT {ANSWER_COLUMNS} FROM answers WHERE participant_id = $1 ORDER BY answered_at ASC"
        );
        let rows: Vec<AnswerRow> = with_pool!(&self.db, |pool| {
            sqlx::query_as(&sql).bind(participant_id).fetch_all(pool).await?
        });
        rows.into_iter().map(Answer::try_from).collect()
    }
}
